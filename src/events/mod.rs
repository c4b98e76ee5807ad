//! Runtime event boundary and classification into [`StreamEvent`](crate::types::StreamEvent).

pub mod classify;
pub mod raw;

pub use classify::classify;
pub use raw::{AgentRef, RawRunEvent, ResponseDelta, RunItem};
