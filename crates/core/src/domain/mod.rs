mod context;
mod plan;
mod session;
mod state;

pub use context::{ExecutionContext, StateTransition};
pub use plan::{StepResult, StepStatus, TaskPlan, TaskStep, ToolCall};
pub use session::SessionDescriptor;
pub use state::AgentState;
