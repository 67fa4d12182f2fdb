//! Success-criterion check applied to a step's result.

use agent_core::StepResult;

/// Outcome of validating a step. A failed validation is a decision the
/// Validating handler acts on, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    Valid,
    Invalid,
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

impl From<bool> for Validation {
    fn from(valid: bool) -> Self {
        if valid {
            Self::Valid
        } else {
            Self::Invalid
        }
    }
}

/// Keyword heuristic over the free-text criterion:
///
/// 1. an unsuccessful result is invalid;
/// 2. criteria mentioning "completed" or "success" accept any successful result;
/// 3. criteria mentioning "output" need a non-empty output;
/// 4. anything else accepts the successful result.
pub fn validate_step_result(success_criteria: &str, result: &StepResult) -> Validation {
    if !result.success {
        return Validation::Invalid;
    }

    let criteria = success_criteria.to_lowercase();
    if criteria.contains("completed") || criteria.contains("success") {
        return Validation::from(result.success);
    }

    let has_output = result.output.as_deref().is_some_and(|o| !o.is_empty());
    if criteria.contains("output") && !has_output {
        return Validation::Invalid;
    }

    Validation::from(result.success)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::TaskStep;

    fn ok() -> StepResult {
        StepResult::succeeded(TaskStep::new("step", "criteria", 1).id, None)
    }

    #[test]
    fn test_failed_result_is_invalid_regardless_of_criteria() {
        let failed = StepResult::failed(TaskStep::new("step", "criteria", 1).id, "boom");
        assert_eq!(
            validate_step_result("Task completed successfully", &failed),
            Validation::Invalid
        );
        assert_eq!(validate_step_result("", &failed), Validation::Invalid);
    }

    #[test]
    fn test_completion_keywords_accept_success() {
        assert!(validate_step_result("Task completed successfully", &ok()).is_valid());
        assert!(validate_step_result("Report SUCCESS", &ok()).is_valid());
        // "completed" wins over "output"
        assert!(validate_step_result("output completed", &ok()).is_valid());
    }

    #[test]
    fn test_output_keyword_needs_output() {
        assert_eq!(
            validate_step_result("Produces output", &ok()),
            Validation::Invalid
        );
        assert_eq!(
            validate_step_result("Produces output", &ok().with_output("")),
            Validation::Invalid
        );
        assert!(validate_step_result("Produces output", &ok().with_output("3 files")).is_valid());
    }

    #[test]
    fn test_other_criteria_accept_success() {
        assert!(validate_step_result("Note is renamed", &ok()).is_valid());
        assert!(validate_step_result("", &ok()).is_valid());
    }
}
