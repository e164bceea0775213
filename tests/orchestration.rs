//! End-to-end tests for the two task services, driven entirely by scripted
//! providers: every selection decision and every agent reply comes from the
//! same response queue, in the order the orchestrator makes provider calls.

use std::sync::Arc;

use amtlich_agents::{
    AddressVerificationService, DocumentContext, DocumentService, Error, PersonDirectory,
    ScriptedProvider, Person, PersonKind, MAX_CHAT_TURNS,
};
use async_trait::async_trait;
use pretty_assertions::assert_eq;

/// Directory stub answering with canned Atom feeds per person.
struct StubDirectory;

#[async_trait]
impl PersonDirectory for StubDirectory {
    async fn search(&self, name: &str, _location: &str) -> String {
        if name.contains("Hans") {
            feed_with_address("Muster, Hans", "Bahnhofstrasse 12, 8001 Zürich")
        } else if name.contains("Anna") {
            feed_with_address("Beispiel, Anna", "Dorfweg 3, 3011 Bern")
        } else {
            empty_feed()
        }
    }
}

fn feed_with_address(title: &str, address_line: &str) -> String {
    format!(
        r#"<?xml version="1.0"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <title type="html">{}</title>
    <content type="html">{}
{}</content>
  </entry>
</feed>"#,
        title, title, address_line
    )
}

fn empty_feed() -> String {
    r#"<?xml version="1.0"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <openSearch:totalResults>0</openSearch:totalResults>
</feed>"#
        .to_string()
}

fn verification_context() -> DocumentContext {
    DocumentContext::new(
        Person::new("Hans", "Muster", PersonKind::Requestor),
        vec![
            Person::new("Anna", "Beispiel", PersonKind::Requested),
            Person::new("Peter", "Probe", PersonKind::Requested),
        ],
        "Zürich",
        "Inheritance proceedings",
    )
    .unwrap()
}

fn people_batch() -> String {
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

#[tokio::test]
async fn address_verification_end_to_end() {
    // Provider calls, in order: selection, three lookups plus the reply
    // within the retriever turn, selection, the save plus the reply within
    // the report turn.
    let provider = Arc::new(
        ScriptedProvider::new("scripted")
            .with_message("Retriever_Agent")
            .with_tool_call(
                "search_person",
                serde_json::json!({"name": "Hans Muster", "location": "Zürich"}),
            )
            .with_tool_call(
                "search_person",
                serde_json::json!({"name": "Anna Beispiel", "location": "Zürich"}),
            )
            .with_tool_call(
                "search_person",
                serde_json::json!({"name": "Peter Probe", "location": "Zürich"}),
            )
            .with_message(
                "Hans Muster: Bahnhofstrasse 12, 8001 Zürich. Anna Beispiel: \
                 Dorfweg 3, 3011 Bern. Peter Probe: no directory entry.",
            )
            .with_message("Report_Agent")
            .with_tool_call(
                "save_people_data",
                serde_json::json!({"people_data": people_batch()}),
            )
            .with_message("All people saved. COMPLETE"),
    );

    let service = AddressVerificationService::new(provider, Arc::new(StubDirectory));
    let verification = service
        .verify_addresses(&verification_context())
        .await
        .unwrap();

    assert_eq!(verification.addresses.len(), 3);
    assert_eq!(
        verification.addresses[0],
        (
            "Hans Muster".to_string(),
            Some("Bahnhofstrasse 12, 8001 Zürich".to_string())
        )
    );
    assert_eq!(
        verification.addresses[1],
        (
            "Anna Beispiel".to_string(),
            Some("Dorfweg 3, 3011 Bern".to_string())
        )
    );
    assert_eq!(verification.addresses[2], ("Peter Probe".to_string(), None));

    assert_eq!(
        verification.summary,
        "- Hans Muster: Bahnhofstrasse 12, 8001 Zürich\n\
         - Anna Beispiel: Dorfweg 3, 3011 Bern\n\
         - Peter Probe: NOT FOUND"
    );

    // Two agent turns made it into the transcript, attributed by name.
    let speakers: Vec<_> = verification
        .transcript
        .iter()
        .filter_map(|m| m.name.clone())
        .collect();
    assert_eq!(speakers, vec!["Retriever_Agent", "Report_Agent"]);
}

#[tokio::test]
async fn address_verification_recovers_from_rejected_batch() {
    // The first save is missing the type field; the error string comes back
    // into the turn and the agent retries with a corrected batch.
    let bad_batch = serde_json::json!([
        {"firstname": "Hans", "lastname": "Muster"}
    ])
    .to_string();

    let provider = Arc::new(
        ScriptedProvider::new("scripted")
            .with_message("Report_Agent")
            .with_tool_call(
                "save_people_data",
                serde_json::json!({"people_data": bad_batch}),
            )
            .with_tool_call(
                "save_people_data",
                serde_json::json!({"people_data": people_batch()}),
            )
            .with_message("Saved after fixing the records. COMPLETE"),
    );

    let service = AddressVerificationService::new(provider, Arc::new(StubDirectory));
    let verification = service
        .verify_addresses(&verification_context())
        .await
        .unwrap();

    // Only the corrected batch landed.
    assert_eq!(verification.addresses.len(), 3);
}

#[tokio::test]
async fn address_verification_fails_without_completion_marker() {
    // The queue is empty from the start: every selection gets filler text
    // (falling back to the initial agent) and every turn is a filler reply
    // without the marker, so the budget runs out.
    let provider = Arc::new(ScriptedProvider::new("scripted"));

    let service = AddressVerificationService::new(provider, Arc::new(StubDirectory));
    let err = service
        .verify_addresses(&verification_context())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::MaxTurnsExceeded {
            max_turns: MAX_CHAT_TURNS
        }
    ));
}

#[tokio::test]
async fn document_validation_end_to_end() {
    let passed = serde_json::json!({
        "section": "Header",
        "item": "Municipality named",
        "status": "passed"
    })
    .to_string();
    let failed = serde_json::json!({
        "section": "Body",
        "item": "Purpose stated",
        "status": "failed",
        "details": "No purpose section found"
    })
    .to_string();

    let provider = Arc::new(
        ScriptedProvider::new("scripted")
            .with_message("Validator_Agent")
            .with_tool_call(
                "save_validation_result",
                serde_json::json!({"validation_data": passed}),
            )
            .with_tool_call(
                "save_validation_result",
                serde_json::json!({"validation_data": failed}),
            )
            .with_message("Recorded both checklist items.")
            .with_message("ComplianceReporter_Agent")
            .with_tool_call("mark_validation_complete", serde_json::json!({}))
            .with_message("Validation finished. COMPLETE"),
    );

    let service = DocumentService::new(provider);
    let report = service
        .validate_document("Official Decree — Zürich …")
        .await
        .unwrap();

    assert_eq!(report.results.len(), 2);
    assert!(report.report.contains("✅ Municipality named"));
    assert!(report.report.contains("❌ Purpose stated"));
    assert!(report.report.contains("No purpose section found"));
    assert!(report.report.contains("1 of 2 checks passed."));

    let speakers: Vec<_> = report
        .transcript
        .iter()
        .filter_map(|m| m.name.clone())
        .collect();
    assert_eq!(speakers, vec!["Validator_Agent", "ComplianceReporter_Agent"]);
}

#[tokio::test]
async fn document_validation_fails_without_completion_marker() {
    let provider = Arc::new(ScriptedProvider::new("scripted"));
    let service = DocumentService::new(provider);

    let err = service
        .validate_document("Official Decree — Zürich …")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::MaxTurnsExceeded {
            max_turns: MAX_CHAT_TURNS
        }
    ));
}

#[tokio::test]
async fn marker_from_non_terminating_agent_keeps_run_alive() {
    // The Validator emits COMPLETE; the run must not end on it. With the
    // queue then exhausted, the run falls back to filler replies and fails
    // on the budget.
    let provider = Arc::new(
        ScriptedProvider::new("scripted")
            .with_message("Validator_Agent")
            .with_message("I believe we are done here. COMPLETE"),
    );

    let service = DocumentService::new(provider);
    let err = service
        .validate_document("Official Decree — Zürich …")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::MaxTurnsExceeded { .. }));
}
