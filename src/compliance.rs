//! Compliance validation capability
//!
//! The [`ComplianceStore`] collects checklist results during a document
//! validation run and renders the final markdown report. As with the people
//! report, the store is the authoritative outcome; the chat transcript is
//! only how the results got there.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::error::Result;
use crate::tool::{Tool, ToolResult};

/// Outcome of a single checklist item. Closed set: anything else fails
/// validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Passed,
    Failed,
}

/// One validated checklist item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub section: String,
    pub item: String,
    pub status: CheckStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Default)]
struct ComplianceState {
    results: Vec<CheckResult>,
    complete: bool,
}

/// Shared mutable store behind the validation tools.
#[derive(Clone, Default)]
pub struct ComplianceStore {
    inner: Arc<Mutex<ComplianceState>>,
}

impl ComplianceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the store to its freshly-constructed state. Idempotent.
    pub fn reset(&self) {
        if let Ok(mut state) = self.inner.lock() {
            state.results.clear();
            state.complete = false;
        }
    }

    pub fn is_complete(&self) -> bool {
        self.inner.lock().map(|s| s.complete).unwrap_or(false)
    }

    pub fn mark_complete(&self) {
        if let Ok(mut state) = self.inner.lock() {
            state.complete = true;
        }
    }

    /// All saved results, in insertion order.
    pub fn results(&self) -> Vec<CheckResult> {
        self.inner.lock().map(|s| s.results.clone()).unwrap_or_default()
    }

    /// Results grouped by section, sections in first-seen order, items in
    /// insertion order within each section.
    pub fn summary(&self) -> Vec<(String, Vec<CheckResult>)> {
        let mut grouped: Vec<(String, Vec<CheckResult>)> = Vec::new();
        for result in self.results() {
            match grouped.iter_mut().find(|(section, _)| *section == result.section) {
                Some((_, items)) => items.push(result),
                None => grouped.push((result.section.clone(), vec![result])),
            }
        }
        grouped
    }

    /// Renders the validation results as a markdown checklist report.
    pub fn markdown_report(&self) -> String {
        let summary = self.summary();
        if summary.is_empty() {
            return "No validation results recorded.".to_string();
        }

        let mut report = String::from("# Validation Report\n");
        let mut passed = 0usize;
        let mut total = 0usize;

        for (section, items) in &summary {
            report.push_str(&format!("\n## {}\n\n", section));
            for result in items {
                total += 1;
                let checkbox = match result.status {
                    CheckStatus::Passed => {
                        passed += 1;
                        "✅"
                    }
                    CheckStatus::Failed => "❌",
                };
                report.push_str(&format!("- {} {}", checkbox, result.item));
                if let Some(details) = &result.details {
                    report.push_str(&format!(" — {}", details));
                }
                report.push('\n');
            }
        }

        report.push_str(&format!("\n**{} of {} checks passed.**\n", passed, total));
        report
    }

    /// Validates and appends a single result supplied as a JSON object.
    /// On a validation problem the store is left untouched and a descriptive
    /// error string is returned.
    pub fn save_result(&self, raw: &str) -> std::result::Result<CheckResult, String> {
        let result: CheckResult = serde_json::from_str(raw)
            .map_err(|e| format!("Error parsing validation result: {}", e))?;

        if result.section.trim().is_empty() {
            return Err("Error: validation result is missing a section".to_string());
        }
        if result.item.trim().is_empty() {
            return Err("Error: validation result is missing an item".to_string());
        }

        if let Ok(mut state) = self.inner.lock() {
            state.results.push(result.clone());
        }
        debug!(section = %result.section, item = %result.item, "Saved validation result");
        Ok(result)
    }

    /// The result-save tool handed to the validating agent.
    pub fn save_result_tool(&self) -> Arc<dyn Tool> {
        Arc::new(SaveValidationResultTool {
            store: self.clone(),
        })
    }

    /// The completion-flag tool handed to the reporting agent.
    pub fn mark_complete_tool(&self) -> Arc<dyn Tool> {
        Arc::new(MarkValidationCompleteTool {
            store: self.clone(),
        })
    }
}

struct SaveValidationResultTool {
    store: ComplianceStore,
}

impl std::fmt::Debug for SaveValidationResultTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaveValidationResultTool").finish()
    }
}

#[async_trait]
impl Tool for SaveValidationResultTool {
    fn name(&self) -> &str {
        "save_validation_result"
    }

    fn description(&self) -> &str {
        "Save the outcome of one checklist item as a JSON object with \
         section, item, status (passed or failed) and optional details."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "validation_data": {
                    "type": "string",
                    "description": "JSON object with section, item, status and optional details"
                }
            },
            "required": ["validation_data"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<ToolResult> {
        let raw = match arguments.get("validation_data") {
            Some(Value::String(s)) => s.clone(),
            Some(v @ Value::Object(_)) => v.to_string(),
            _ => return Ok(ToolResult::error("Missing required field: validation_data")),
        };

        match self.store.save_result(&raw) {
            Ok(result) => Ok(ToolResult::success(Value::String(format!(
                "Saved result for '{}' in section '{}'",
                result.item, result.section
            )))),
            Err(message) => Ok(ToolResult::error(message)),
        }
    }
}

struct MarkValidationCompleteTool {
    store: ComplianceStore,
}

impl std::fmt::Debug for MarkValidationCompleteTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkValidationCompleteTool").finish()
    }
}

#[async_trait]
impl Tool for MarkValidationCompleteTool {
    fn name(&self) -> &str {
        "mark_validation_complete"
    }

    fn description(&self) -> &str {
        "Mark the validation as complete once every checklist item has been saved."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _arguments: Value) -> Result<ToolResult> {
        self.store.mark_complete();
        Ok(ToolResult::success(Value::String(
            "Validation marked as complete".to_string(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn result_json(section: &str, item: &str, status: &str) -> String {
        serde_json::json!({"section": section, "item": item, "status": status}).to_string()
    }

    #[test]
    fn test_save_and_read_results() {
        let store = ComplianceStore::new();
        store
            .save_result(&result_json("Header", "Municipality named", "passed"))
            .unwrap();
        store
            .save_result(&result_json("Body", "Purpose stated", "failed"))
            .unwrap();

        let results = store.results();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].status, CheckStatus::Passed);
        assert_eq!(results[1].status, CheckStatus::Failed);
        assert_eq!(results[0].details, None);
    }

    #[test]
    fn test_invalid_status_rejected() {
        let store = ComplianceStore::new();
        let err = store
            .save_result(&result_json("Header", "Municipality named", "maybe"))
            .unwrap_err();
        assert!(err.contains("maybe") || err.contains("unknown variant"));
        assert!(store.results().is_empty());
    }

    #[test]
    fn test_missing_field_rejected() {
        let store = ComplianceStore::new();
        let raw = serde_json::json!({"section": "Header", "status": "passed"}).to_string();
        let err = store.save_result(&raw).unwrap_err();
        assert!(err.contains("item"));
        assert!(store.results().is_empty());
    }

    #[test]
    fn test_details_default_to_none() {
        let store = ComplianceStore::new();
        let saved = store
            .save_result(&result_json("Header", "Date present", "passed"))
            .unwrap();
        assert_eq!(saved.details, None);
    }

    #[test]
    fn test_summary_groups_by_first_seen_section() {
        let store = ComplianceStore::new();
        store
            .save_result(&result_json("Header", "A", "passed"))
            .unwrap();
        store.save_result(&result_json("Body", "B", "passed")).unwrap();
        store
            .save_result(&result_json("Header", "C", "failed"))
            .unwrap();

        let summary = store.summary();
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].0, "Header");
        assert_eq!(summary[0].1.len(), 2);
        assert_eq!(summary[1].0, "Body");
    }

    #[test]
    fn test_markdown_report() {
        let store = ComplianceStore::new();
        store
            .save_result(&result_json("Header", "Municipality named", "passed"))
            .unwrap();
        store
            .save_result(
                &serde_json::json!({
                    "section": "Body",
                    "item": "Purpose stated",
                    "status": "failed",
                    "details": "No purpose section found"
                })
                .to_string(),
            )
            .unwrap();

        let report = store.markdown_report();
        assert!(report.contains("# Validation Report"));
        assert!(report.contains("## Header"));
        assert!(report.contains("✅ Municipality named"));
        assert!(report.contains("❌ Purpose stated"));
        assert!(report.contains("No purpose section found"));
        assert!(report.contains("1 of 2 checks passed."));
    }

    #[test]
    fn test_markdown_report_empty() {
        let store = ComplianceStore::new();
        assert_eq!(store.markdown_report(), "No validation results recorded.");
    }

    #[test]
    fn test_reset_is_idempotent() {
        let store = ComplianceStore::new();
        store
            .save_result(&result_json("Header", "A", "passed"))
            .unwrap();
        store.mark_complete();

        store.reset();
        store.reset();
        assert!(store.results().is_empty());
        assert!(!store.is_complete());
    }

    #[tokio::test]
    async fn test_save_validation_result_tool() {
        let store = ComplianceStore::new();
        let tool = store.save_result_tool();

        let result = tool
            .execute(serde_json::json!({
                "validation_data": result_json("Header", "Date present", "passed")
            }))
            .await
            .unwrap();
        assert!(result.error.is_none());
        assert_eq!(store.results().len(), 1);

        let result = tool
            .execute(serde_json::json!({
                "validation_data": result_json("Header", "Date present", "unknown")
            }))
            .await
            .unwrap();
        assert!(result.error.is_some());
        assert_eq!(store.results().len(), 1);
    }

    #[tokio::test]
    async fn test_mark_validation_complete_tool() {
        let store = ComplianceStore::new();
        let tool = store.mark_complete_tool();

        tool.execute(serde_json::json!({})).await.unwrap();
        assert!(store.is_complete());
    }
}
