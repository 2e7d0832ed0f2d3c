//! Process execution: explicit execution context, environment stacking
//! and child-process invocation.

pub mod command_executor;
pub mod env_stack;
pub mod execution_context;

pub use command_executor::{CommandExecutor, CommandExecutorError, ExecutionResult};
pub use env_stack::{EnvFrame, EnvironmentStack};
pub use execution_context::ExecutionContext;
