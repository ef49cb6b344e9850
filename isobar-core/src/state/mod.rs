//! Node lifecycle state machine
//!
//! The control loop only executes ticks while the node is running. Hardware
//! initialisation failures halt the node; an external shutdown stops it.

pub mod events;
pub mod machine;

pub use events::Event;
pub use machine::{FaultKind, NodeState};
