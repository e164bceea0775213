//! Document generation and validation service
//!
//! Two operations over the same templates: `generate_document` is a single
//! prompt that drafts the decree text, `validate_document` runs a
//! Validator/ComplianceReporter group chat over the checklist and returns
//! the compliance store's markdown report as the authoritative outcome.

use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::agent::Agent;
use crate::chat::{GroupChat, RunStatus, MAX_CHAT_TURNS};
use crate::compliance::{CheckResult, ComplianceStore};
use crate::context::DocumentContext;
use crate::error::{Error, Result};
use crate::items::Message;
use crate::model::ModelProvider;
use crate::selector::PromptSelector;

/// Agent that works through the checklist item by item.
pub const VALIDATOR_AGENT: &str = "Validator_Agent";
/// Agent that closes the validation and terminates the chat.
pub const COMPLIANCE_AGENT: &str = "ComplianceReporter_Agent";

const VALIDATOR_INSTRUCTIONS: &str = "\
You are the validation agent in a document compliance workflow. Work through \
the checklist one item at a time: decide from the document text whether the \
item passes or fails, then record it with save_validation_result as a JSON \
object with section, item, status ('passed' or 'failed') and details where \
the outcome needs explanation. If saving fails, read the error, fix the data \
and try again. Do not skip items and do not declare the validation complete.";

const COMPLIANCE_INSTRUCTIONS: &str = "\
You are the compliance reporting agent in a document compliance workflow. \
Once the validation agent has recorded a result for every checklist item, \
call mark_validation_complete and reply with a short confirmation ending in \
the word COMPLETE. Do not validate items yourself.";

const SELECTION_RULES: &str = "\
Agents: Validator_Agent, ComplianceReporter_Agent. Choose Validator_Agent \
while any checklist item still has no recorded result. Choose \
ComplianceReporter_Agent only after every item has been recorded.";

const DEFAULT_DECREE_TEMPLATE: &str = "\
Official Decree — {municipality}

On request of {requestor}, and for the purpose of {purpose}, the following \
persons are named in this decree:

{requested_people}

The municipality of {municipality} confirms the registered addresses listed \
above as of the date of issue.";

const DEFAULT_CHECKLIST_TEMPLATE: &str = "\
Section: Header
- The issuing municipality is named
- The requestor is named in full

Section: Body
- The purpose of the request is stated
- Every requested person is listed with an address or marked as not found

Section: Closing
- The decree confirms the addresses as of the date of issue";

/// The decree and checklist texts the service operates on.
#[derive(Debug, Clone)]
pub struct DocumentTemplates {
    pub decree: String,
    pub checklist: String,
}

impl Default for DocumentTemplates {
    fn default() -> Self {
        Self {
            decree: DEFAULT_DECREE_TEMPLATE.to_string(),
            checklist: DEFAULT_CHECKLIST_TEMPLATE.to_string(),
        }
    }
}

impl DocumentTemplates {
    /// Loads both templates from files.
    pub fn from_files(decree: impl AsRef<Path>, checklist: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            decree: std::fs::read_to_string(decree)?,
            checklist: std::fs::read_to_string(checklist)?,
        })
    }
}

/// The outcome of a successful validation run.
#[derive(Debug)]
pub struct ValidationReport {
    /// Markdown checklist report rendered from the compliance store.
    pub report: String,
    /// The individual results, in recorded order.
    pub results: Vec<CheckResult>,
    /// The full chat transcript of the run.
    pub transcript: Vec<Message>,
}

/// Generates decree documents and validates them against the checklist.
pub struct DocumentService {
    provider: Arc<dyn ModelProvider>,
    templates: DocumentTemplates,
}

impl DocumentService {
    pub fn new(provider: Arc<dyn ModelProvider>) -> Self {
        Self {
            provider,
            templates: DocumentTemplates::default(),
        }
    }

    pub fn with_templates(mut self, templates: DocumentTemplates) -> Self {
        self.templates = templates;
        self
    }

    fn fill_template(&self, context: &DocumentContext) -> String {
        let requested = context
            .requested_people
            .iter()
            .map(|p| match p.full_address() {
                Some(address) => format!("- {}, {}", p.full_name(), address),
                None => format!("- {}, address not found", p.full_name()),
            })
            .collect::<Vec<_>>()
            .join("\n");

        self.templates
            .decree
            .replace("{municipality}", &context.municipality)
            .replace("{purpose}", &context.purpose)
            .replace("{requestor}", &context.requestor.full_name())
            .replace("{requested_people}", &requested)
    }

    /// Drafts the decree text in a single model call.
    pub async fn generate_document(&self, context: &DocumentContext) -> Result<String> {
        let prompt = format!(
            "Produce the final text of the following official decree. Keep the \
             structure and facts exactly as given, only polish the wording into \
             formal administrative language:\n\n{}",
            self.fill_template(context)
        );

        info!(municipality = %context.municipality, "Generating document");

        let (response, _usage) = self
            .provider
            .complete(vec![Message::user(prompt)], vec![], Some(0.7), None)
            .await?;

        match response.content {
            Some(content) if !content.trim().is_empty() => Ok(content.trim().to_string()),
            _ => Err(Error::ModelBehavior {
                message: "document generation returned no content".to_string(),
            }),
        }
    }

    /// Runs one validation chat over the checklist and returns the report.
    ///
    /// Builds fresh agents, store and chat per call; on failure the
    /// orchestrator error propagates and no partial results are exposed.
    pub async fn validate_document(&self, document_text: &str) -> Result<ValidationReport> {
        if document_text.trim().is_empty() {
            return Err(Error::InvalidInput {
                message: "document text must not be empty".to_string(),
            });
        }

        info!("Starting document validation");

        let store = ComplianceStore::new();
        store.reset();

        let validator = Agent::simple(VALIDATOR_AGENT, VALIDATOR_INSTRUCTIONS)
            .with_tool(store.save_result_tool())
            .with_temperature(0.2);

        let reporter = Agent::simple(COMPLIANCE_AGENT, COMPLIANCE_INSTRUCTIONS)
            .with_tool(store.mark_complete_tool())
            .with_temperature(0.2);

        let selector = Arc::new(PromptSelector::new(self.provider.clone(), SELECTION_RULES));

        let mut chat = GroupChat::builder()
            .agent(validator)
            .agent(reporter)
            .selector(selector)
            .provider(self.provider.clone())
            .initial_agent(VALIDATOR_AGENT)
            .terminating_agent(COMPLIANCE_AGENT)
            .max_turns(MAX_CHAT_TURNS)
            .build()?;

        chat.seed(format!(
            "Validate the document below against the checklist.\n\n\
             Checklist:\n{}\n\nDocument:\n{}",
            self.templates.checklist, document_text
        ));
        let run = chat.run().await;

        match run.status {
            RunStatus::Completed => {
                let results = store.results();
                debug!(turns = run.turns, results = results.len(), "Validation completed");
                Ok(ValidationReport {
                    report: store.markdown_report(),
                    results,
                    transcript: run.transcript,
                })
            }
            RunStatus::Failed(e) => {
                debug!(turns = run.turns, error = %e, "Validation failed");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ScriptedProvider;
    use crate::report::{Person, PersonKind};
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn context() -> DocumentContext {
        DocumentContext::new(
            Person::new("Hans", "Muster", PersonKind::Requestor),
            vec![
                Person::new("Anna", "Beispiel", PersonKind::Requested)
                    .with_address("Dorfweg 3", "3011 Bern"),
                Person::new("Peter", "Probe", PersonKind::Requested),
            ],
            "Zürich",
            "Inheritance proceedings",
        )
        .unwrap()
    }

    #[test]
    fn test_fill_template() {
        let service = DocumentService::new(Arc::new(ScriptedProvider::new("scripted")));
        let filled = service.fill_template(&context());

        assert!(filled.contains("Official Decree — Zürich"));
        assert!(filled.contains("Hans Muster"));
        assert!(filled.contains("Inheritance proceedings"));
        assert!(filled.contains("- Anna Beispiel, Dorfweg 3, 3011 Bern"));
        assert!(filled.contains("- Peter Probe, address not found"));
    }

    #[tokio::test]
    async fn test_generate_document() {
        let provider = Arc::new(
            ScriptedProvider::new("scripted").with_message("  The decree text.  "),
        );
        let service = DocumentService::new(provider);

        let document = service.generate_document(&context()).await.unwrap();
        assert_eq!(document, "The decree text.");
    }

    #[tokio::test]
    async fn test_generate_document_empty_reply_is_error() {
        let provider = Arc::new(ScriptedProvider::new("scripted").with_message("   "));
        let service = DocumentService::new(provider);

        let err = service.generate_document(&context()).await.unwrap_err();
        assert!(matches!(err, Error::ModelBehavior { .. }));
    }

    #[tokio::test]
    async fn test_validate_document_rejects_empty_text() {
        let service = DocumentService::new(Arc::new(ScriptedProvider::new("scripted")));
        let err = service.validate_document("   ").await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput { .. }));
    }

    #[test]
    fn test_templates_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let decree_path = dir.path().join("decree.txt");
        let checklist_path = dir.path().join("checklist.txt");
        std::fs::File::create(&decree_path)
            .unwrap()
            .write_all(b"decree {municipality}")
            .unwrap();
        std::fs::File::create(&checklist_path)
            .unwrap()
            .write_all(b"- a check")
            .unwrap();

        let templates = DocumentTemplates::from_files(&decree_path, &checklist_path).unwrap();
        assert_eq!(templates.decree, "decree {municipality}");
        assert_eq!(templates.checklist, "- a check");
    }

    #[test]
    fn test_templates_from_missing_file_is_io_error() {
        let err = DocumentTemplates::from_files("/nonexistent/a", "/nonexistent/b").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
