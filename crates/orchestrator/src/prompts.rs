use agent_core::TaskStep;

use crate::services::RetrievedContexts;

pub struct AgentPrompts;

impl AgentPrompts {
    pub fn planning(request: &str) -> String {
        format!(
            r#"Generate a plan for the following request.

## Request
{request}

## Required Output
Break the request into an ordered list of steps. For each step give:
1. What the step does
2. The tool to call, if any, with its arguments
3. How to tell the step succeeded

Do NOT execute anything yet. Only create the plan."#
        )
    }

    pub fn step_execution(
        step: &TaskStep,
        index: usize,
        total: usize,
        context: &RetrievedContexts,
    ) -> String {
        let mut prompt = format!(
            "Execute step {number} of {total}.\n\n## Step\n{description}\n",
            number = index + 1,
            description = step.description,
        );

        if let Some(call) = &step.tool_call {
            prompt.push_str(&format!(
                "\n## Tool\nCall `{name}` with arguments:\n```json\n{args}\n```\n",
                name = call.tool_name,
                args = serde_json::to_string_pretty(&call.args).unwrap_or_else(|_| "{}".into()),
            ));
        }

        prompt.push_str(&format!(
            "\n## Success Criteria\n{}\n",
            step.success_criteria
        ));

        if !context.is_empty() {
            prompt.push_str("\n## Relevant Notes\n");
            prompt.push_str(&context.render());
        }

        prompt
    }
}
