//! Script simulation
//!
//! - `context`: registers and timed-effect bookkeeping
//! - `interpreter`: one turn of the program counter
//! - `explorer`: one turn with every player-dependent branch folded in

pub mod constants;
pub mod context;
pub mod explorer;
pub mod interpreter;

pub use context::Context;
pub use explorer::explore;
pub use interpreter::{run_turn, BranchObservations, TurnExit, TurnOutcome};
