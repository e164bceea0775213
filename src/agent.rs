//! # Agent (orientation)
//!
//! An `Agent` is a configured participant in a group chat: a name, fixed
//! instructions, and the subset of tools it is authorized to call. Agents
//! never pick the next speaker themselves; that is the selector's job, so an
//! agent's whole surface is "given the shared history, produce one reply".

use std::sync::Arc;

use crate::items::Message;
use crate::tool::Tool;

/// Defines the complete configuration for an [`Agent`].
#[derive(Clone)]
pub struct AgentConfig {
    /// The name of the agent, used for identification, selection, and in logs.
    pub name: String,

    /// The system instructions that define the agent's role in the chat.
    pub instructions: String,

    /// The tools this agent is authorized to call. Tools not listed here are
    /// invisible to the agent even when another chat participant holds them.
    pub tools: Vec<Arc<dyn Tool>>,

    /// The name of the LLM model used for this agent's replies.
    pub model: String,

    /// Sampling temperature for the agent's replies.
    pub temperature: Option<f32>,

    /// Maximum number of tokens per generated reply. `None` uses the model's
    /// default limit.
    pub max_tokens: Option<u32>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "Assistant".to_string(),
            instructions: "You are a helpful assistant.".to_string(),
            tools: vec![],
            model: "gpt-4o".to_string(),
            temperature: Some(0.7),
            max_tokens: None,
        }
    }
}

/// A named participant in a group chat.
///
/// ## Example
///
/// ```rust
/// use amtlich_agents::{Agent, tool::FunctionTool};
/// use std::sync::Arc;
///
/// let lookup = Arc::new(FunctionTool::simple(
///     "lookup",
///     "Looks up a person in the directory.",
///     |name: String| format!("No entry for {}", name),
/// ));
///
/// let agent = Agent::simple("Retriever_Agent", "You look up addresses.")
///     .with_model("gpt-4o-mini")
///     .with_tool(lookup)
///     .with_temperature(0.2);
///
/// assert_eq!(agent.config.model, "gpt-4o-mini");
/// assert_eq!(agent.tools().len(), 1);
/// ```
#[derive(Clone)]
pub struct Agent {
    /// The configuration that defines the agent's behavior and capabilities.
    pub config: AgentConfig,
}

impl Agent {
    /// Creates a new agent with the given configuration.
    pub fn new(config: AgentConfig) -> Self {
        Self { config }
    }

    /// Creates a simple agent with just a name and instructions. All other
    /// settings use their defaults.
    pub fn simple(name: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self::new(AgentConfig {
            name: name.into(),
            instructions: instructions.into(),
            ..Default::default()
        })
    }

    /// Sets the model for the agent.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    /// Adds a tool to the agent.
    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.config.tools.push(tool);
        self
    }

    /// Adds multiple tools to the agent.
    pub fn with_tools(mut self, tools: Vec<Arc<dyn Tool>>) -> Self {
        self.config.tools.extend(tools);
        self
    }

    /// Sets the sampling temperature for the agent's replies.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = Some(temperature);
        self
    }

    /// Sets the maximum number of tokens for a single reply.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.config.max_tokens = Some(max_tokens);
        self
    }

    /// Returns the agent's name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Returns the agent's instructions.
    pub fn instructions(&self) -> &str {
        &self.config.instructions
    }

    /// Returns a slice of the tools available to the agent.
    pub fn tools(&self) -> &[Arc<dyn Tool>] {
        &self.config.tools
    }

    /// Checks if the agent has any tools.
    pub fn has_tools(&self) -> bool {
        !self.config.tools.is_empty()
    }

    /// Constructs the system message priming the LLM with the agent's
    /// instructions and the descriptions of its available tools.
    pub fn build_system_message(&self) -> Message {
        let mut content = self.config.instructions.clone();

        if !self.config.tools.is_empty() {
            content.push_str("\n\nYou have access to the following tools:\n");
            for tool in &self.config.tools {
                content.push_str(&format!("- {}: {}\n", tool.name(), tool.description()));
            }
        }

        Message::system(content)
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.config.name)
            .field("model", &self.config.model)
            .field("tools_count", &self.config.tools.len())
            .finish()
    }
}
