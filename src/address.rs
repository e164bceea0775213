//! Address verification service
//!
//! Wires a Retriever and a Report agent into a group chat over a fresh
//! [`ReportStore`] per run. The chat transcript is advisory; what the run
//! *returns* is read from the store after the Report agent declares
//! completion.

use std::sync::Arc;
use tracing::{debug, info};

use crate::agent::Agent;
use crate::chat::{GroupChat, RunStatus, COMPLETION_MARKER, MAX_CHAT_TURNS};
use crate::context::DocumentContext;
use crate::error::{Error, Result};
use crate::items::Message;
use crate::model::ModelProvider;
use crate::report::ReportStore;
use crate::selector::PromptSelector;
use crate::telsearch::{PersonDirectory, SearchPersonTool};

/// Agent that queries the phone directory.
pub const RETRIEVER_AGENT: &str = "Retriever_Agent";
/// Agent that saves the verified data and terminates the chat.
pub const REPORT_AGENT: &str = "Report_Agent";

const RETRIEVER_INSTRUCTIONS: &str = "\
You are the retrieval agent in an address verification workflow. For every \
person named in the task, call search_person with the person's full name and \
the municipality to look up their registered address. Report each result in \
the chat, including lookups that found nothing. Never invent or guess an \
address; if the directory has no entry, say so. Do not save any data and do \
not declare the task complete.";

const REPORT_INSTRUCTIONS: &str = "\
You are the reporting agent in an address verification workflow. Once the \
retrieval agent has reported a lookup result for every person, save all \
people in a single save_people_data call as a JSON array. Every record needs \
firstname, lastname and type ('requestor' or 'requested'); include address \
and city when the lookup found them and omit them otherwise. If saving fails, \
read the error, fix the data and try again. After the data is saved, reply \
with a short confirmation ending in the word COMPLETE.";

const SELECTION_RULES: &str = "\
Agents: Retriever_Agent, Report_Agent. Choose Retriever_Agent while any \
person in the task still has no reported lookup result. Choose Report_Agent \
only after every person has a reported result, or when a save attempt \
failed and must be corrected.";

/// The outcome of a successful verification run.
#[derive(Debug)]
pub struct Verification {
    /// Full name paired with the formatted address, in saved order; `None`
    /// when the directory had no entry.
    pub addresses: Vec<(String, Option<String>)>,
    /// Human-readable `- Name: address` summary.
    pub summary: String,
    /// The full chat transcript of the run.
    pub transcript: Vec<Message>,
}

/// Orchestrates address verification chats.
pub struct AddressVerificationService {
    provider: Arc<dyn ModelProvider>,
    directory: Arc<dyn PersonDirectory>,
}

impl AddressVerificationService {
    pub fn new(provider: Arc<dyn ModelProvider>, directory: Arc<dyn PersonDirectory>) -> Self {
        Self {
            provider,
            directory,
        }
    }

    fn seed_prompt(context: &DocumentContext) -> String {
        let mut prompt = format!(
            "Verify the registered residential addresses of the following people \
             in {}:\n",
            context.municipality
        );
        for person in context.all_people() {
            prompt.push_str(&format!("- {}\n", person.full_name()));
        }
        prompt.push_str(&format!(
            "\nThe requestor is {}; everyone else is a requested person.\n\
             Look up each person in the phone directory, then save the verified \
             data. Example record:\n\
             {{\"firstname\": \"Hans\", \"lastname\": \"Muster\", \"type\": \
             \"requestor\", \"address\": \"Bahnhofstrasse 12\", \"city\": \
             \"8001 Zürich\"}}",
            context.requestor.full_name()
        ));
        prompt
    }

    fn render_summary(addresses: &[(String, Option<String>)]) -> String {
        if addresses.is_empty() {
            return "No addresses found.".to_string();
        }
        addresses
            .iter()
            .map(|(name, address)| match address {
                Some(address) => format!("- {}: {}", name, address),
                None => format!("- {}: NOT FOUND", name),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Runs one verification chat and returns the saved addresses.
    ///
    /// Builds fresh agents, store and chat for every call, so concurrent and
    /// repeated runs never see each other's state. On failure the
    /// orchestrator error propagates and no partial store state is exposed.
    pub async fn verify_addresses(&self, context: &DocumentContext) -> Result<Verification> {
        if context.municipality.trim().is_empty() {
            return Err(Error::InvalidInput {
                message: "municipality must not be empty".to_string(),
            });
        }

        info!(
            municipality = %context.municipality,
            people = context.all_people().len(),
            "Starting address verification"
        );

        let store = ReportStore::new();
        store.reset();

        let retriever = Agent::simple(RETRIEVER_AGENT, RETRIEVER_INSTRUCTIONS)
            .with_tool(Arc::new(SearchPersonTool::new(self.directory.clone())))
            .with_temperature(0.2);

        let reporter = Agent::simple(REPORT_AGENT, REPORT_INSTRUCTIONS)
            .with_tool(store.save_people_tool())
            .with_tool(store.mark_complete_tool())
            .with_temperature(0.2);

        let selector = Arc::new(PromptSelector::new(self.provider.clone(), SELECTION_RULES));

        let mut chat = GroupChat::builder()
            .agent(retriever)
            .agent(reporter)
            .selector(selector)
            .provider(self.provider.clone())
            .initial_agent(RETRIEVER_AGENT)
            .terminating_agent(REPORT_AGENT)
            .max_turns(MAX_CHAT_TURNS)
            .build()?;

        chat.seed(Self::seed_prompt(context));
        let run = chat.run().await;

        match run.status {
            RunStatus::Completed => {
                debug_assert!(run
                    .transcript
                    .last()
                    .is_some_and(|m| m.content.contains(COMPLETION_MARKER)));
                let addresses = store.addresses();
                let summary = Self::render_summary(&addresses);
                debug!(turns = run.turns, saved = addresses.len(), "Verification completed");
                Ok(Verification {
                    addresses,
                    summary,
                    transcript: run.transcript,
                })
            }
            RunStatus::Failed(e) => {
                debug!(turns = run.turns, error = %e, "Verification failed");
                Err(e)
            }
        }
    }
}
