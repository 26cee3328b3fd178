//! Agent orchestration state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions. The
//! runtime feeds events in and executes the returned effects.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;


pub use effect::Effect;
pub use event::{Event, ToolResult};
pub use state::{AgentContext, AgentState};
pub use transition::{transition, TransitionError, TransitionResult};
