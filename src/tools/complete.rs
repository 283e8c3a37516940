//! Reserved completion tool
//!
//! Calling `mark_task_complete` ends an agent's conversation loop in the turn
//! it is invoked.

use crate::tools::registry::{SyncTool, COMPLETE_TOOL};
use crate::types::Result;
use serde_json::{json, Value};

pub struct MarkTaskComplete;

impl SyncTool for MarkTaskComplete {
    fn name(&self) -> &str {
        COMPLETE_TOOL
    }

    fn description(&self) -> &str {
        "Signal that the research task is finished. Call this once your answer is complete."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "task_summary": {
                    "type": "string",
                    "description": "Brief summary of what was accomplished"
                },
                "completion_message": {
                    "type": "string",
                    "description": "Message to the user confirming completion"
                }
            },
            "required": ["task_summary", "completion_message"]
        })
    }

    fn call(&self, args: Value) -> Result<Value> {
        let summary = args
            .get("task_summary")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        let message = args
            .get("completion_message")
            .and_then(|v| v.as_str())
            .unwrap_or("Task completed");

        Ok(json!({
            "status": "completed",
            "task_summary": summary,
            "message": message
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_tolerates_missing_fields() {
        let result = MarkTaskComplete.call(json!({})).unwrap();
        assert_eq!(result["status"], "completed");
        assert_eq!(result["message"], "Task completed");
    }

    #[test]
    fn schema_requires_summary() {
        let schema = MarkTaskComplete.parameters_schema();
        assert_eq!(schema["required"][0], "task_summary");
    }
}
