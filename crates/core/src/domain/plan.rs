use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "kebab-case")]
pub enum StepStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
    Skipped,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

/// A tool invocation a step asks the backend to perform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ToolCall {
    pub tool_name: String,
    #[cfg_attr(feature = "typescript", ts(type = "Record<string, unknown>"))]
    pub args: serde_json::Value,
}

impl ToolCall {
    pub fn new(tool_name: impl Into<String>, args: serde_json::Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            args,
        }
    }
}

/// Minimal unit of work with its own success criterion and retry budget.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct TaskStep {
    pub id: Uuid,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolCall>,
    pub success_criteria: String,
    pub status: StepStatus,
    pub retry_count: u32,
    pub max_retries: u32,
}

impl TaskStep {
    pub fn new(
        description: impl Into<String>,
        success_criteria: impl Into<String>,
        max_retries: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: description.into(),
            tool_call: None,
            success_criteria: success_criteria.into(),
            status: StepStatus::default(),
            retry_count: 0,
            max_retries,
        }
    }

    pub fn with_tool_call(mut self, tool_call: ToolCall) -> Self {
        self.tool_call = Some(tool_call);
        self
    }

    pub fn has_retries_left(&self) -> bool {
        self.retry_count < self.max_retries
    }
}

/// A goal decomposed into an ordered list of steps.
///
/// Step order is fixed once execution begins; afterwards only a step's
/// `status` and `retry_count` change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct TaskPlan {
    pub id: Uuid,
    pub goal: String,
    pub steps: Vec<TaskStep>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskPlan {
    pub fn new(goal: impl Into<String>, steps: Vec<TaskStep>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            goal: goal.into(),
            steps,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step(&self, index: usize) -> Option<&TaskStep> {
        self.steps.get(index)
    }

    pub fn step_mut(&mut self, index: usize) -> Option<&mut TaskStep> {
        self.updated_at = Utc::now();
        self.steps.get_mut(index)
    }
}

/// Outcome of executing one step. Appended to the context; the last entry
/// belongs to the step at the context's current index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct StepResult {
    pub step_id: Uuid,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolCall>,
    pub verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,
}

impl StepResult {
    pub fn succeeded(step_id: Uuid, tool_call: Option<ToolCall>) -> Self {
        Self {
            step_id,
            success: true,
            output: None,
            error: None,
            tool_call,
            verified: false,
            verified_at: None,
        }
    }

    pub fn failed(step_id: Uuid, error: impl Into<String>) -> Self {
        Self {
            step_id,
            success: false,
            output: None,
            error: Some(error.into()),
            tool_call: None,
            verified: false,
            verified_at: None,
        }
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn mark_verified(&mut self) {
        self.verified = true;
        self.verified_at = Some(Utc::now());
    }
}
