//! People report capability
//!
//! The [`ReportStore`] is the authoritative result of an address verification
//! run: whatever the agents discussed, only the records saved here count.
//! Agents write through the `save_people_data` and `mark_complete` tools;
//! the service reads the store directly after the chat ends.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::error::Result;
use crate::tool::{Tool, ToolResult};

/// Whether a person is the one requesting the document or one of the people
/// the request is about. Closed set: anything else fails validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersonKind {
    Requestor,
    Requested,
}

/// A person record as saved by the reporting agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub firstname: String,
    pub lastname: String,
    #[serde(rename = "type")]
    pub kind: PersonKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

impl Person {
    pub fn new(
        firstname: impl Into<String>,
        lastname: impl Into<String>,
        kind: PersonKind,
    ) -> Self {
        Self {
            firstname: firstname.into().trim().to_string(),
            lastname: lastname.into().trim().to_string(),
            kind,
            address: None,
            city: None,
        }
    }

    pub fn with_address(mut self, address: impl Into<String>, city: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self.city = Some(city.into());
        self
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.firstname, self.lastname)
    }

    /// `address, city` when both parts are known, otherwise whichever part
    /// exists, otherwise `None`.
    pub fn full_address(&self) -> Option<String> {
        match (&self.address, &self.city) {
            (Some(address), Some(city)) => Some(format!("{}, {}", address, city)),
            (Some(address), None) => Some(address.clone()),
            (None, Some(city)) => Some(city.clone()),
            (None, None) => None,
        }
    }
}

#[derive(Default)]
struct ReportState {
    people: Vec<Person>,
    complete: bool,
}

/// Shared mutable store behind the people reporting tools.
///
/// Clones share the same underlying state, which is how the service and the
/// tools it hands to agents see each other's effects within one run.
#[derive(Clone, Default)]
pub struct ReportStore {
    inner: Arc<Mutex<ReportState>>,
}

impl ReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the store to its freshly-constructed state. Idempotent.
    pub fn reset(&self) {
        if let Ok(mut state) = self.inner.lock() {
            state.people.clear();
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

    /// All saved records, in insertion order.
    pub fn people(&self) -> Vec<Person> {
        self.inner.lock().map(|s| s.people.clone()).unwrap_or_default()
    }

    /// The first record marked as the requestor, if any.
    pub fn requestor(&self) -> Option<Person> {
        self.inner
            .lock()
            .ok()
            .and_then(|s| s.people.iter().find(|p| p.kind == PersonKind::Requestor).cloned())
    }

    /// Every record that is not the requestor, in insertion order.
    pub fn requested_people(&self) -> Vec<Person> {
        self.inner
            .lock()
            .map(|s| {
                s.people
                    .iter()
                    .filter(|p| p.kind == PersonKind::Requested)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Full name paired with the formatted address for every saved record,
    /// in insertion order.
    pub fn addresses(&self) -> Vec<(String, Option<String>)> {
        self.inner
            .lock()
            .map(|s| {
                s.people
                    .iter()
                    .map(|p| (p.full_name(), p.full_address()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Validates and appends a batch of person records supplied as a JSON
    /// array. On any validation problem the store is left untouched and a
    /// descriptive error string is returned for the agent to act on.
    pub fn save_batch(&self, raw: &str) -> std::result::Result<usize, String> {
        let people: Vec<Person> = serde_json::from_str(raw)
            .map_err(|e| format!("Error parsing people data: {}", e))?;

        for (i, person) in people.iter().enumerate() {
            if person.firstname.trim().is_empty() {
                return Err(format!("Error: record {} is missing a firstname", i));
            }
            if person.lastname.trim().is_empty() {
                return Err(format!("Error: record {} is missing a lastname", i));
            }
        }

        let count = people.len();
        if let Ok(mut state) = self.inner.lock() {
            state.people.extend(people);
            state.complete = true;
        }
        debug!(count, "Saved people batch");
        Ok(count)
    }

    /// The batch-save tool handed to the reporting agent.
    pub fn save_people_tool(&self) -> Arc<dyn Tool> {
        Arc::new(SavePeopleDataTool {
            store: self.clone(),
        })
    }

    /// The completion-flag tool handed to the reporting agent.
    pub fn mark_complete_tool(&self) -> Arc<dyn Tool> {
        Arc::new(MarkCompleteTool {
            store: self.clone(),
        })
    }
}

struct SavePeopleDataTool {
    store: ReportStore,
}

impl std::fmt::Debug for SavePeopleDataTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SavePeopleDataTool").finish()
    }
}

#[async_trait]
impl Tool for SavePeopleDataTool {
    fn name(&self) -> &str {
        "save_people_data"
    }

    fn description(&self) -> &str {
        "Save the verified people as a JSON array. Each record requires \
         firstname, lastname and type (requestor or requested); address and \
         city are optional. Submit all people in a single call."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "people_data": {
                    "type": "string",
                    "description": "JSON array of person records"
                }
            },
            "required": ["people_data"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<ToolResult> {
        // The model sometimes passes the array directly instead of a string.
        let raw = match arguments.get("people_data") {
            Some(Value::String(s)) => s.clone(),
            Some(v @ Value::Array(_)) => v.to_string(),
            _ => return Ok(ToolResult::error("Missing required field: people_data")),
        };

        match self.store.save_batch(&raw) {
            Ok(count) => Ok(ToolResult::success(Value::String(format!(
                "Successfully saved data for {} people",
                count
            )))),
            Err(message) => Ok(ToolResult::error(message)),
        }
    }
}

struct MarkCompleteTool {
    store: ReportStore,
}

impl std::fmt::Debug for MarkCompleteTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkCompleteTool").finish()
    }
}

#[async_trait]
impl Tool for MarkCompleteTool {
    fn name(&self) -> &str {
        "mark_complete"
    }

    fn description(&self) -> &str {
        "Mark the people report as complete once every person has been saved."
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
            "Report marked as complete".to_string(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_batch() -> String {
        serde_json::json!([
            {
                "firstname": "Hans",
                "lastname": "Muster",
                "type": "requestor",
                "address": "Bahnhofstrasse 12",
                "city": "8001 Zürich"
            },
            {
                "firstname": "Anna",
                "lastname": "Beispiel",
                "type": "requested",
                "address": "Dorfweg 3",
                "city": "3011 Bern"
            },
            {
                "firstname": "Peter",
                "lastname": "Probe",
                "type": "requested"
            }
        ])
        .to_string()
    }

    #[test]
    fn test_batch_round_trip_in_order() {
        let store = ReportStore::new();
        let count = store.save_batch(&sample_batch()).unwrap();
        assert_eq!(count, 3);
        assert!(store.is_complete());

        let people = store.people();
        assert_eq!(people.len(), 3);
        assert_eq!(people[0].full_name(), "Hans Muster");
        assert_eq!(people[1].full_name(), "Anna Beispiel");
        assert_eq!(people[2].full_name(), "Peter Probe");

        let requestor = store.requestor().unwrap();
        assert_eq!(requestor.firstname, "Hans");

        let requested = store.requested_people();
        assert_eq!(requested.len(), 2);
        assert_eq!(requested[0].firstname, "Anna");
    }

    #[test]
    fn test_addresses_view() {
        let store = ReportStore::new();
        store.save_batch(&sample_batch()).unwrap();

        let addresses = store.addresses();
        assert_eq!(addresses.len(), 3);
        assert_eq!(
            addresses[0],
            (
                "Hans Muster".to_string(),
                Some("Bahnhofstrasse 12, 8001 Zürich".to_string())
            )
        );
        assert_eq!(addresses[2], ("Peter Probe".to_string(), None));
    }

    #[test]
    fn test_missing_field_rejected_store_untouched() {
        let store = ReportStore::new();
        let raw = serde_json::json!([{"firstname": "Hans", "type": "requestor"}]).to_string();

        let err = store.save_batch(&raw).unwrap_err();
        assert!(err.contains("lastname"));
        assert!(store.people().is_empty());
        assert!(!store.is_complete());
    }

    #[test]
    fn test_out_of_enum_kind_rejected() {
        let store = ReportStore::new();
        let raw = serde_json::json!([
            {"firstname": "Hans", "lastname": "Muster", "type": "witness"}
        ])
        .to_string();

        let err = store.save_batch(&raw).unwrap_err();
        assert!(err.contains("witness") || err.contains("unknown variant"));
        assert!(store.people().is_empty());
    }

    #[test]
    fn test_malformed_json_rejected() {
        let store = ReportStore::new();
        let err = store.save_batch("not json at all").unwrap_err();
        assert!(err.starts_with("Error parsing people data"));
        assert!(store.people().is_empty());
    }

    #[test]
    fn test_duplicates_allowed() {
        let store = ReportStore::new();
        let raw = serde_json::json!([
            {"firstname": "Anna", "lastname": "Beispiel", "type": "requested"},
            {"firstname": "Anna", "lastname": "Beispiel", "type": "requested"}
        ])
        .to_string();

        assert_eq!(store.save_batch(&raw).unwrap(), 2);
        assert_eq!(store.people().len(), 2);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let store = ReportStore::new();
        store.save_batch(&sample_batch()).unwrap();

        store.reset();
        assert!(store.people().is_empty());
        assert!(!store.is_complete());

        store.reset();
        assert!(store.people().is_empty());
        assert!(!store.is_complete());
    }

    #[test]
    fn test_person_serde_uses_type_key() {
        let person = Person::new("Hans", "Muster", PersonKind::Requestor);
        let json = serde_json::to_value(&person).unwrap();
        assert_eq!(json["type"], "requestor");
        assert!(json.get("address").is_none());
    }

    #[tokio::test]
    async fn test_save_people_tool() {
        let store = ReportStore::new();
        let tool = store.save_people_tool();

        let result = tool
            .execute(serde_json::json!({"people_data": sample_batch()}))
            .await
            .unwrap();
        assert!(result.error.is_none());
        assert_eq!(
            result.output,
            Value::String("Successfully saved data for 3 people".to_string())
        );
        assert_eq!(store.people().len(), 3);
    }

    #[tokio::test]
    async fn test_save_people_tool_accepts_inline_array() {
        let store = ReportStore::new();
        let tool = store.save_people_tool();

        let result = tool
            .execute(serde_json::json!({
                "people_data": [
                    {"firstname": "Anna", "lastname": "Beispiel", "type": "requested"}
                ]
            }))
            .await
            .unwrap();
        assert!(result.error.is_none());
        assert_eq!(store.people().len(), 1);
    }

    #[tokio::test]
    async fn test_save_people_tool_missing_argument() {
        let store = ReportStore::new();
        let tool = store.save_people_tool();

        let result = tool.execute(serde_json::json!({})).await.unwrap();
        assert_eq!(
            result.error.as_deref(),
            Some("Missing required field: people_data")
        );
    }

    #[tokio::test]
    async fn test_mark_complete_tool() {
        let store = ReportStore::new();
        let tool = store.mark_complete_tool();

        assert!(!store.is_complete());
        tool.execute(serde_json::json!({})).await.unwrap();
        assert!(store.is_complete());
    }
}
