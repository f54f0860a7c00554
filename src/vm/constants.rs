//! Simulation constants - fixed caps the output depends on
//!
//! Changing any of these changes what the pipeline emits.

// Interpreter
pub const MAX_STEPS: usize = 1000;

// Cycle search (turns simulated per HP checkpoint)
pub const TURN_HORIZON: usize = 20;
pub const EXTENDED_TURN_HORIZON: usize = 40;

// Board state
pub const FULL_HP: i32 = 100;
pub const DEFAULT_ENEMY_COUNT: i32 = 999;

// Enemies-remaining sweep, simulated from the largest count down
pub const MAX_SWEEP_ENEMIES: i32 = 6;
pub const MIN_SWEEP_ENEMIES: i32 = 1;

/// Enemy counts visited by the enemies-remaining sweep, largest first
pub fn sweep_counts() -> impl Iterator<Item = i32> {
    (MIN_SWEEP_ENEMIES..=MAX_SWEEP_ENEMIES).rev()
}
