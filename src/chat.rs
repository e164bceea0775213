//! # Group chat orchestrator (orientation)
//!
//! `GroupChat` owns the shared transcript and drives the turn loop: select a
//! speaker, let it take one turn, append the reply, and stop either when the
//! terminating agent signals completion or when the turn budget runs out.
//! `run` consumes the chat, so a finished run can never be resumed.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::agent::Agent;
use crate::error::{Error, Result};
use crate::items::Message;
use crate::model::ModelProvider;
use crate::runner::{format_messages_for_log, take_turn_with};
use crate::selector::Selector;
use crate::usage::Usage;

/// Default turn budget for a group chat.
pub const MAX_CHAT_TURNS: usize = 20;

/// Substring the terminating agent emits to end the chat successfully.
pub const COMPLETION_MARKER: &str = "COMPLETE";

/// How a chat run ended.
#[derive(Debug)]
pub enum RunStatus {
    /// The terminating agent emitted the completion marker.
    Completed,
    /// The run ended without completion; the cause is preserved.
    Failed(Error),
}

/// The outcome of a consumed [`GroupChat`].
#[derive(Debug)]
pub struct ChatRun {
    pub status: RunStatus,
    /// The full shared transcript, including the seed message and any system
    /// diagnostic appended on failure.
    pub transcript: Vec<Message>,
    /// Number of agent turns actually executed.
    pub turns: usize,
    /// Aggregate token usage across selection and agent turns.
    pub usage: Usage,
}

impl ChatRun {
    pub fn is_completed(&self) -> bool {
        matches!(self.status, RunStatus::Completed)
    }

    /// Consumes the run, returning the transcript on completion or the
    /// failure cause otherwise.
    pub fn into_result(self) -> Result<Vec<Message>> {
        match self.status {
            RunStatus::Completed => Ok(self.transcript),
            RunStatus::Failed(e) => Err(e),
        }
    }
}

/// Builder for [`GroupChat`].
pub struct GroupChatBuilder {
    agents: Vec<Agent>,
    selector: Option<Arc<dyn Selector>>,
    provider: Option<Arc<dyn ModelProvider>>,
    initial_agent: Option<String>,
    terminating_agent: Option<String>,
    max_turns: usize,
}

impl GroupChatBuilder {
    fn new() -> Self {
        Self {
            agents: Vec::new(),
            selector: None,
            provider: None,
            initial_agent: None,
            terminating_agent: None,
            max_turns: MAX_CHAT_TURNS,
        }
    }

    pub fn agent(mut self, agent: Agent) -> Self {
        self.agents.push(agent);
        self
    }

    pub fn selector(mut self, selector: Arc<dyn Selector>) -> Self {
        self.selector = Some(selector);
        self
    }

    pub fn provider(mut self, provider: Arc<dyn ModelProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// The agent that speaks when the selector's output is unrecognized.
    pub fn initial_agent(mut self, name: impl Into<String>) -> Self {
        self.initial_agent = Some(name.into());
        self
    }

    /// The only agent whose completion marker ends the chat.
    pub fn terminating_agent(mut self, name: impl Into<String>) -> Self {
        self.terminating_agent = Some(name.into());
        self
    }

    pub fn max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }

    pub fn build(self) -> Result<GroupChat> {
        let invalid = |message: String| Error::InvalidInput { message };

        if self.agents.is_empty() {
            return Err(invalid("a group chat needs at least one agent".into()));
        }
        for (i, a) in self.agents.iter().enumerate() {
            if self.agents[..i].iter().any(|b| b.name() == a.name()) {
                return Err(invalid(format!("duplicate agent name '{}'", a.name())));
            }
        }

        let selector = self
            .selector
            .ok_or_else(|| invalid("a group chat needs a selector".into()))?;
        let provider = self
            .provider
            .ok_or_else(|| invalid("a group chat needs a model provider".into()))?;
        let initial_agent = self
            .initial_agent
            .ok_or_else(|| invalid("a group chat needs an initial agent".into()))?;
        let terminating_agent = self
            .terminating_agent
            .ok_or_else(|| invalid("a group chat needs a terminating agent".into()))?;

        for name in [&initial_agent, &terminating_agent] {
            if !self.agents.iter().any(|a| a.name() == name.as_str()) {
                return Err(invalid(format!("agent '{}' is not registered", name)));
            }
        }

        Ok(GroupChat {
            agents: self.agents,
            selector,
            provider,
            initial_agent,
            terminating_agent,
            max_turns: self.max_turns,
            history: Vec::new(),
        })
    }
}

/// A turn-taking chat between registered agents over one shared transcript.
pub struct GroupChat {
    agents: Vec<Agent>,
    selector: Arc<dyn Selector>,
    provider: Arc<dyn ModelProvider>,
    initial_agent: String,
    terminating_agent: String,
    max_turns: usize,
    history: Vec<Message>,
}

impl std::fmt::Debug for GroupChat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupChat")
            .field("initial_agent", &self.initial_agent)
            .field("terminating_agent", &self.terminating_agent)
            .field("max_turns", &self.max_turns)
            .field("history", &self.history)
            .finish_non_exhaustive()
    }
}

impl GroupChat {
    pub fn builder() -> GroupChatBuilder {
        GroupChatBuilder::new()
    }

    /// Injects the task message that starts the conversation.
    pub fn seed(&mut self, task: impl Into<String>) {
        self.history.push(Message::user(task));
    }

    /// Read access to the transcript accumulated so far.
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    fn resolve_agent(&self, raw: &str) -> &Agent {
        let trimmed = raw.trim();
        match self.agents.iter().find(|a| a.name() == trimmed) {
            Some(agent) => agent,
            None => {
                warn!(
                    raw = %trimmed,
                    fallback = %self.initial_agent,
                    "Selector output unrecognized, falling back to initial agent"
                );
                // The builder guarantees the initial agent is registered.
                self.agents
                    .iter()
                    .find(|a| a.name() == self.initial_agent)
                    .unwrap_or(&self.agents[0])
            }
        }
    }

    /// Drives the chat to a terminal state. Consumes the chat: completed and
    /// failed runs alike cannot be re-run.
    pub async fn run(mut self) -> ChatRun {
        let mut turns = 0;
        let mut usage = Usage::empty();

        if self.history.is_empty() {
            let err = Error::InvalidInput {
                message: "chat has not been seeded with a task message".to_string(),
            };
            return self.fail(err, turns, usage);
        }

        info!(
            agents = self.agents.len(),
            max_turns = self.max_turns,
            "Starting group chat"
        );

        loop {
            if turns >= self.max_turns {
                info!(turns, "Turn budget exhausted");
                let err = Error::MaxTurnsExceeded {
                    max_turns: self.max_turns,
                };
                return self.fail(err, turns, usage);
            }

            let raw_choice = match self.selector.select(&self.history).await {
                Ok(choice) => choice,
                Err(e) => return self.fail(e, turns, usage),
            };

            let agent = self.resolve_agent(&raw_choice).clone();
            debug!(turn = turns + 1, agent = %agent.name(), "Starting turn");

            let reply = match take_turn_with(&agent, &self.provider, &self.history).await {
                Ok(reply) => reply,
                Err(e) => return self.fail(e, turns, usage),
            };

            usage.add_usage(&reply.usage);
            turns += 1;

            let is_terminator = reply.message.name.as_deref() == Some(&self.terminating_agent);
            let has_marker = reply.message.content.contains(COMPLETION_MARKER);
            self.history.push(reply.message);

            debug!(
                target: "chat::transcript",
                "\n=== Transcript after turn {} ===\n{}\n=== end ===",
                turns,
                format_messages_for_log(&self.history)
            );

            if is_terminator && has_marker {
                info!(turns, "Chat completed");
                return ChatRun {
                    status: RunStatus::Completed,
                    transcript: self.history,
                    turns,
                    usage,
                };
            }
        }
    }

    fn fail(mut self, cause: Error, turns: usize, usage: Usage) -> ChatRun {
        warn!(turns, error = %cause, "Chat failed");
        self.history.push(Message::system(format!("Error: {}", cause)));
        ChatRun {
            status: RunStatus::Failed(cause),
            transcript: self.history,
            turns,
            usage,
        }
    }
}
