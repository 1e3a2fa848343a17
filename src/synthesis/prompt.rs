//! Prompt construction for context-grounded answers

use serde::{Deserialize, Serialize};

/// Default opening line of every prompt
pub const DEFAULT_PERSONA: &str = "You are a C++ expert assistant.";

/// Separator placed between context chunks
const CHUNK_SEPARATOR: &str = "\n\n";

/// Who produced a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    fn label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

/// One entry of a conversation log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A rendered prompt plus how much context made it in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub text: String,
    /// Number of context chunks included, counting a cut first chunk
    pub chunks_used: usize,
    /// Whether any context was dropped or cut to fit the budget
    pub truncated: bool,
}

/// Builds bounded prompts from a question, retrieved chunks and history
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    persona: String,
    max_context_chars: usize,
    history_turns: usize,
}

impl PromptBuilder {
    pub fn new(max_context_chars: usize) -> Self {
        Self {
            persona: DEFAULT_PERSONA.to_string(),
            max_context_chars,
            history_turns: 0,
        }
    }

    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = persona.into();
        self
    }

    /// Render at most this many of the latest history turns
    pub fn with_history_turns(mut self, turns: usize) -> Self {
        self.history_turns = turns;
        self
    }

    pub fn build(&self, query: &str, chunks: &[String], history: &[Turn]) -> Prompt {
        let (context, chunks_used, truncated) = self.context(chunks);

        let mut text = String::new();
        text.push_str(&self.persona);
        text.push_str("\nAnswer the question clearly using ONLY the provided context.\n");
        text.push_str("Context:\n");
        text.push_str(&context);
        text.push('\n');

        let skip = history.len().saturating_sub(self.history_turns);
        let recent = &history[skip..];
        if !recent.is_empty() {
            text.push_str("Conversation so far:\n");
            for turn in recent {
                text.push_str(turn.role.label());
                text.push_str(": ");
                text.push_str(&turn.content);
                text.push('\n');
            }
        }

        text.push_str("Question:\n");
        text.push_str(query);
        text.push_str("\nAnswer:");

        Prompt {
            text,
            chunks_used,
            truncated,
        }
    }

    /// Join chunks in retrieved order within `max_context_chars`.
    ///
    /// Whole chunks are dropped from the tail; a first chunk that alone
    /// exceeds the budget is cut to it.
    fn context(&self, chunks: &[String]) -> (String, usize, bool) {
        let budget = self.max_context_chars;
        let separator_len = CHUNK_SEPARATOR.chars().count();

        let mut context = String::new();
        let mut used_chars = 0;
        let mut used = 0;

        for chunk in chunks {
            let chunk_len = chunk.chars().count();

            if used == 0 {
                if chunk_len > budget {
                    context.extend(chunk.chars().take(budget));
                    return (context, 1, true);
                }
                context.push_str(chunk);
                used_chars = chunk_len;
            } else {
                if used_chars + separator_len + chunk_len > budget {
                    break;
                }
                context.push_str(CHUNK_SEPARATOR);
                context.push_str(chunk);
                used_chars += separator_len + chunk_len;
            }
            used += 1;
        }

        (context, used, used < chunks.len())
    }
}
