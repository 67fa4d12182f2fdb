use agent_core::{TaskPlan, TaskStep};

pub const DEFAULT_SUCCESS_CRITERIA: &str = "Task completed successfully";

/// Turns a (context-augmented) request into a plan.
pub trait Planner: Send + Sync {
    fn build_plan(&self, goal: &str, max_retries: u32) -> TaskPlan;
}

/// Wraps the whole request in a single step.
///
/// The backend is still asked for a plan, but its reply is not parsed back
/// into steps.
#[derive(Debug, Default, Clone, Copy)]
pub struct SingleStepPlanner;

impl Planner for SingleStepPlanner {
    fn build_plan(&self, goal: &str, max_retries: u32) -> TaskPlan {
        let step = TaskStep::new(goal, DEFAULT_SUCCESS_CRITERIA, max_retries);
        TaskPlan::new(goal, vec![step])
    }
}
