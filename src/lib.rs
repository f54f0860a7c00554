//! Enemy Skillset - turns monster AI scripts into readable movesets
//!
//! Raw opcodes are decoded into behavior nodes, the script is simulated turn
//! by turn with every player-dependent branch explored, and the resulting
//! turn sequences are folded into HP-banded, cycle-aware movesets.

pub mod core;
pub mod decode;
pub mod moveset;
pub mod script;
pub mod vm;
