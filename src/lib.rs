//! # Multi-agent address verification and document validation
//!
//! This crate orchestrates small groups of cooperating LLM agents over a
//! shared, turn-taking chat: one agent looks facts up, another writes the
//! authoritative result through tools, and a selection policy decides who
//! speaks next. Two services are wired on top of the same machinery:
//!
//! - **Address verification**: a Retriever agent queries the tel.search.ch
//!   phone directory and a Report agent saves the verified people records.
//! - **Document validation**: a Validator agent works through a compliance
//!   checklist and a ComplianceReporter agent closes the run.
//!
//! A run ends when the designated terminating agent emits the `COMPLETE`
//! marker, or fails once the turn budget (20 turns) is exhausted. The
//! authoritative result of a run is always the capability store the agents
//! wrote through their tools, never the chat transcript itself.
//!
//! ## Getting Started
//!
//! Set your OpenAI API key in the `OPENAI_API_KEY` environment variable.
//!
//! ```rust,no_run
//! use amtlich_agents::{
//!     AddressVerificationService, DocumentContext, OpenAIProvider, Person, PersonKind,
//!     TelsearchClient,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> amtlich_agents::Result<()> {
//! let provider = Arc::new(OpenAIProvider::new("gpt-4o"));
//! let directory = Arc::new(TelsearchClient::new());
//! let service = AddressVerificationService::new(provider, directory);
//!
//! let context = DocumentContext::new(
//!     Person::new("Hans", "Muster", PersonKind::Requestor),
//!     vec![Person::new("Anna", "Beispiel", PersonKind::Requested)],
//!     "Zürich",
//!     "Inheritance proceedings",
//! )?;
//!
//! let verification = service.verify_addresses(&context).await?;
//! println!("{}", verification.summary);
//! # Ok(())
//! # }
//! ```

pub mod address;
pub mod agent;
pub mod chat;
pub mod compliance;
pub mod context;
pub mod document;
pub mod error;
pub mod items;
pub mod model;
pub mod report;
pub mod runner;
pub mod selector;
pub mod telsearch;
pub mod tool;
pub mod usage;

// Public re-exports for convenience
pub use address::{AddressVerificationService, Verification, REPORT_AGENT, RETRIEVER_AGENT};
pub use agent::{Agent, AgentConfig};
pub use chat::{ChatRun, GroupChat, RunStatus, COMPLETION_MARKER, MAX_CHAT_TURNS};
pub use compliance::{CheckResult, CheckStatus, ComplianceStore};
pub use context::DocumentContext;
pub use document::{
    DocumentService, DocumentTemplates, ValidationReport, COMPLIANCE_AGENT, VALIDATOR_AGENT,
};
pub use error::{Error, Result};
pub use items::{Message, ModelResponse, Role, ToolCall};
pub use model::{ModelProvider, OpenAIProvider, ScriptedProvider};
pub use report::{Person, PersonKind, ReportStore};
pub use selector::{PromptSelector, ScriptedSelector, Selector};
pub use telsearch::{AddressComponents, PersonDirectory, SearchPersonTool, TelsearchClient};
pub use tool::{FunctionTool, Tool, ToolResult};
pub use usage::Usage;
