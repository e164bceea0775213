//! Speaker selection policy
//!
//! Before every turn the orchestrator asks a [`Selector`] which agent speaks
//! next. The selector returns whatever identity it came up with, raw; the
//! orchestrator owns the fallback rule for output it does not recognize, so a
//! sloppy selection policy can never wedge a run.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::error::Result;
use crate::items::Message;
use crate::model::ModelProvider;

/// Policy deciding which agent takes the next turn.
#[async_trait]
pub trait Selector: Send + Sync {
    /// Pick the next speaker given the full shared history. The returned
    /// string may be anything; resolution happens in the orchestrator.
    async fn select(&self, history: &[Message]) -> Result<String>;
}

/// Renders the shared history the way the selection prompt presents it:
/// one `Speaker: content` line per message.
pub(crate) fn render_transcript(history: &[Message]) -> String {
    history
        .iter()
        .map(|m| format!("{}: {}", m.speaker(), m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Model-driven selector: shows the transcript to the model together with
/// per-task selection rules and takes the reply verbatim as the chosen agent.
pub struct PromptSelector {
    provider: Arc<dyn ModelProvider>,
    rules: String,
}

impl PromptSelector {
    /// `rules` describes, in prose, which agent should speak when. It must
    /// instruct the model to answer with exactly one agent name.
    pub fn new(provider: Arc<dyn ModelProvider>, rules: impl Into<String>) -> Self {
        Self {
            provider,
            rules: rules.into(),
        }
    }
}

#[async_trait]
impl Selector for PromptSelector {
    async fn select(&self, history: &[Message]) -> Result<String> {
        let prompt = format!(
            "Examine the conversation below and determine which agent should take \
             the next turn.\n\n{}\n\nConversation:\n{}\n\nRespond with exactly one \
             agent name and nothing else.",
            self.rules,
            render_transcript(history)
        );

        let (response, _usage) = self
            .provider
            .complete(vec![Message::user(prompt)], vec![], Some(0.0), None)
            .await?;

        let choice = response.content.unwrap_or_default().trim().to_string();
        debug!(choice = %choice, "Selector picked");
        Ok(choice)
    }
}

/// Deterministic selector replaying a fixed sequence of agent names. Once the
/// sequence is exhausted it keeps returning the last entry. Public so
/// integration tests can drive the orchestrator without a selection model.
pub struct ScriptedSelector {
    sequence: Mutex<VecDeque<String>>,
    last: Mutex<Option<String>>,
}

impl ScriptedSelector {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sequence: Mutex::new(names.into_iter().map(Into::into).collect()),
            last: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Selector for ScriptedSelector {
    async fn select(&self, _history: &[Message]) -> Result<String> {
        let next = self
            .sequence
            .lock()
            .ok()
            .and_then(|mut sequence| sequence.pop_front());

        if let Ok(mut last) = self.last.lock() {
            match next {
                Some(name) => {
                    *last = Some(name.clone());
                    Ok(name)
                }
                None => Ok(last.clone().unwrap_or_default()),
            }
        } else {
            Ok(next.unwrap_or_default())
        }
    }
}
