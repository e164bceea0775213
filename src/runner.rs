//! # Turn execution (orientation)
//!
//! Executes one agent turn against the shared chat history: prime the model
//! with the agent's system message, let it call tools until it produces a
//! content-only reply, and return that reply as the agent's single transcript
//! message. Tool exchanges stay local to the turn; only the final reply is
//! visible to the other chat participants.

use std::sync::Arc;
use tracing::debug;

use crate::agent::Agent;
use crate::error::{Error, Result};
use crate::items::{Message, Role};
use crate::model::ModelProvider;
use crate::usage::Usage;

/// Upper bound on model/tool exchanges within a single turn. An agent that
/// keeps issuing tool calls past this never settles on a reply, which is a
/// model behavior problem rather than a budget question.
pub const MAX_TOOL_ROUNDS: usize = 8;

/// The outcome of a single agent turn.
#[derive(Debug, Clone)]
pub struct TurnReply {
    /// The agent's reply, attributed to the agent by name.
    pub message: Message,
    /// Token usage across every provider call made during the turn.
    pub usage: Usage,
}

fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() > max {
        let mut out = s.chars().take(max).collect::<String>();
        out.push('…');
        out
    } else {
        s.to_string()
    }
}

pub(crate) fn format_messages_for_log(messages: &[Message]) -> String {
    let mut lines = Vec::new();
    for (idx, m) in messages.iter().enumerate() {
        match m.role {
            Role::User => {
                lines.push(format!(
                    "{:02} USER     | {}",
                    idx,
                    truncate_for_log(&m.content, 160)
                ));
            }
            Role::System => {
                lines.push(format!(
                    "{:02} SYSTEM   | {}",
                    idx,
                    truncate_for_log(&m.content, 160)
                ));
            }
            Role::Assistant => {
                if let Some(tool_calls) = &m.tool_calls {
                    let calls: Vec<String> = tool_calls
                        .iter()
                        .map(|tc| format!("id={}, name={}", tc.id, tc.name))
                        .collect();
                    lines.push(format!(
                        "{:02} ASSIST   | tool_calls=[{}] content=\"{}\"",
                        idx,
                        calls.join(", "),
                        truncate_for_log(&m.content, 120)
                    ));
                } else {
                    lines.push(format!(
                        "{:02} {:8} | {}",
                        idx,
                        m.name.as_deref().unwrap_or("ASSIST"),
                        truncate_for_log(&m.content, 160)
                    ));
                }
            }
            Role::Tool => {
                let tcid = m.tool_call_id.as_deref().unwrap_or("<missing>");
                lines.push(format!(
                    "{:02} TOOL     | tool_call_id={} payload={}",
                    idx,
                    tcid,
                    truncate_for_log(&m.content, 120)
                ));
            }
        }
    }
    lines.join("\n")
}

/// Executes one agent turn and returns the agent's reply.
///
/// Tool errors and unknown tool names are fed back to the model as
/// `Error: …` tool messages so the agent can correct itself within the same
/// turn; only provider failures and the round guard abort the turn.
pub async fn take_turn(
    agent: &Agent,
    provider: &dyn ModelProvider,
    history: &[Message],
) -> Result<TurnReply> {
    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.push(agent.build_system_message());
    messages.extend_from_slice(history);

    let mut usage_total = Usage::empty();

    for round in 0..MAX_TOOL_ROUNDS {
        debug!(
            target: "runner::messages",
            "\n=== Sending to provider (agent: {}, round: {}) ===\n{}\n=== end ===",
            agent.name(),
            round,
            format_messages_for_log(&messages)
        );

        let (response, usage) = provider
            .complete(
                messages.clone(),
                agent.config.tools.clone(),
                agent.config.temperature,
                agent.config.max_tokens,
            )
            .await?;
        usage_total.add_usage(&usage);

        if response.tool_calls.is_empty() {
            let content = response.content.unwrap_or_default();
            debug!(agent = %agent.name(), rounds = round + 1, "Turn finished");
            return Ok(TurnReply {
                message: Message::agent(agent.name(), content),
                usage: usage_total,
            });
        }

        messages.push(Message::assistant_with_tool_calls(
            response.content.clone().unwrap_or_default(),
            response.tool_calls.clone(),
        ));

        for tool_call in &response.tool_calls {
            let tool = agent
                .tools()
                .iter()
                .find(|t| t.name() == tool_call.name)
                .cloned();

            match tool {
                Some(tool) => {
                    debug!(agent = %agent.name(), tool = %tool_call.name, "Executing tool");
                    match tool.execute(tool_call.arguments.clone()).await {
                        Ok(result) => {
                            if let Some(err) = result.error {
                                messages
                                    .push(Message::tool(format!("Error: {}", err), &tool_call.id));
                            } else {
                                let content = serde_json::to_string(&result.output)
                                    .unwrap_or_else(|_| "null".to_string());
                                messages.push(Message::tool(content, &tool_call.id));
                            }
                        }
                        Err(e) => {
                            messages.push(Message::tool(format!("Error: {}", e), &tool_call.id));
                        }
                    }
                }
                None => {
                    messages.push(Message::tool(
                        format!("Error: Unknown tool '{}'", tool_call.name),
                        &tool_call.id,
                    ));
                }
            }
        }
    }

    Err(Error::ToolRoundsExceeded {
        agent: agent.name().to_string(),
        max_rounds: MAX_TOOL_ROUNDS,
    })
}

/// Hands an `Arc`'d provider through to [`take_turn`].
pub async fn take_turn_with(
    agent: &Agent,
    provider: &Arc<dyn ModelProvider>,
    history: &[Message],
) -> Result<TurnReply> {
    take_turn(agent, provider.as_ref(), history).await
}
