//! Simulation context.
//!
//! Process-wide switches (freeze everything, freeze the player) travel with
//! every tick call instead of living in globals.

use serde::{Deserialize, Serialize};

/// Why the whole simulation is frozen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum FreezeReason {
    /// Not frozen.
    #[default]
    Running,
    /// Paused by the player (menu, inventory).
    Paused,
    /// Frozen for a cutscene or dialogue.
    Cutscene,
    /// Frozen during a scene transition.
    Transition,
}

/// Per-tick simulation context.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimContext {
    /// Global freeze state. Anything but `Running` halts every countdown.
    pub freeze: FreezeReason,
    /// Freeze only player-tagged combatants.
    pub freeze_player: bool,
    /// Simulated seconds advanced so far (excludes frozen ticks).
    pub elapsed: f64,
    /// Number of unfrozen ticks advanced so far.
    pub tick: u64,
}

impl SimContext {
    /// Create a running context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the whole simulation is frozen.
    #[must_use]
    pub const fn is_frozen(&self) -> bool {
        !matches!(self.freeze, FreezeReason::Running)
    }

    /// Freeze everything.
    pub fn freeze_all(&mut self, reason: FreezeReason) {
        self.freeze = reason;
    }

    /// Resume after a global freeze.
    pub fn resume(&mut self) {
        self.freeze = FreezeReason::Running;
    }

    /// Record a tick. Frozen ticks do not count toward elapsed time.
    pub fn advance(&mut self, dt: f32) {
        if self.is_frozen() {
            return;
        }
        self.elapsed += f64::from(dt);
        self.tick += 1;
    }
}
