//! Game-state input for the reset policy.

use serde::{Deserialize, Serialize};

/// The primary game phase as reported by the game controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    Initial,
    Ready,
    Set,
    Playing,
    Finished,
}

impl Default for GamePhase {
    fn default() -> Self {
        GamePhase::Initial
    }
}

/// The secondary game state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SecondaryState {
    Normal,
    PenaltyShootout,
    Overtime,
}

impl Default for SecondaryState {
    fn default() -> Self {
        SecondaryState::Normal
    }
}

/// The per-cycle game state snapshot.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct GameState {
    pub phase: GamePhase,
    pub secondary: SecondaryState,
    /// Whether this robot is currently penalized.
    pub penalized: bool,
}
