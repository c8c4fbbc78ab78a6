/// The game-playing state machine.
pub mod automaton;
/// Health check service.
pub mod health_service;
/// Randomized delays between rounds.
pub mod pacing;
/// Spawning and tracking automaton runs.
pub mod play_service;
/// Answer store connection supervisor with reconnect backoff.
pub mod storage_supervisor;
