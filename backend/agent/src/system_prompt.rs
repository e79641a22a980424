//! System prompt rendering.
//!
//! Templates use `{tools}`, `{tool_names}` and `{stopping_condition}`
//! placeholders; anything else is left as written. `{tools}` lists each tool
//! with its description and the JSON schema of its input.

use navigator_core::ToolRegistry;

pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are a virtual QA automation engineer. Given the URL of a web application, \
you explore it, identify the functionality worth testing, generate automated \
test scripts for each test case and finish by writing a test plan.

You have access to the following tools:

{tools}

Use the following format:

Question: the task you must complete
Thought: think about what to do next
Action: the action to take, exactly one of [{tool_names}]
Action Input: the input to the action
Observation: the result of the action
... (this Thought/Action/Action Input/Observation can repeat N times)
Thought: I now know the final answer
{stopping_condition} a short summary of the test scripts and test plan you produced

Open pages with the navigator before writing tests for them. Pass JSON objects \
as Action Input where a tool asks for JSON.";

/// Sent once after a malformed reply; never stored in history.
pub const FORMAT_REMINDER: &str = "\
Your last reply could not be used. Reply again using exactly this format:
Thought: <your reasoning>
Action: <one tool name>
Action Input: <the tool input>
or finish with the stopping phrase followed by your final answer.";

pub struct PromptBuilder;

impl PromptBuilder {
    pub fn build(template: &str, registry: &ToolRegistry, stopping_condition: &str) -> String {
        let tools = registry
            .specs()
            .iter()
            .map(|spec| {
                format!(
                    "{}: {}\n  Input schema: {}",
                    spec.name,
                    spec.description,
                    spec.input_schema()
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        let tool_names = registry.list().join(", ");

        template
            .replace("{tools}", &tools)
            .replace("{tool_names}", &tool_names)
            .replace("{stopping_condition}", stopping_condition)
    }

    pub fn format_reminder(error: &str) -> String {
        format!("{FORMAT_REMINDER}\nProblem: {error}")
    }
}
