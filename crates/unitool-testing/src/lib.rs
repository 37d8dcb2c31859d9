//! # Unitool Testing
//!
//! Test doubles for exercising the orchestrator and the tool adapters
//! without a real model or tool server.
//!
//! - [`ScriptedBackend`]: a chat backend replaying a script of turns
//! - [`MockSession`]: an in-memory remote tool session
//! - [`CallRecorder`]: tools that log their start and end

pub mod backend;
pub mod recorder;
pub mod session;

pub use backend::{ScriptedBackend, ScriptedTurn, tool_call};
pub use recorder::{CallEvent, CallRecorder};
pub use session::MockSession;
