//! Conversation sessions
//!
//! A [`ChatSession`] pairs a shared [`Retriever`] with an optional
//! [`AnswerSynthesizer`] and keeps the conversation as an explicit, ordered
//! log of turns owned by the session.
use crate::error::Result;
use crate::retrieval::{Retriever, ScoredChunk};
use crate::synthesis::{AnswerSynthesizer, Turn};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// Result of one question
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub question: String,

    /// Generated answer; `None` when synthesis is off or degraded
    pub answer: Option<String>,

    /// Retrieved chunks, nearest first
    pub sources: Vec<ScoredChunk>,

    /// Synthesis failed and only sources are returned
    pub degraded: bool,

    /// Why synthesis was skipped, when degraded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// An interactive question-answering session
pub struct ChatSession {
    id: Uuid,
    started_at: DateTime<Utc>,
    retriever: Arc<Retriever>,
    synthesizer: Option<Arc<AnswerSynthesizer>>,
    k: usize,
    degrade_to_retrieval: bool,
    turns: Vec<Turn>,
}

impl ChatSession {
    /// Create a new session retrieving `k` chunks per question
    pub fn new(
        retriever: Arc<Retriever>,
        synthesizer: Option<Arc<AnswerSynthesizer>>,
        k: usize,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            retriever,
            synthesizer,
            k,
            degrade_to_retrieval: false,
            turns: Vec::new(),
        }
    }

    /// Return sources only, instead of an error, when synthesis fails
    pub fn with_degrade_to_retrieval(mut self, degrade: bool) -> Self {
        self.degrade_to_retrieval = degrade;
        self
    }

    /// Retrieve context for `question` and, if enabled, synthesize an answer.
    ///
    /// The turn log is only extended once the whole exchange succeeded.
    pub async fn ask(&mut self, question: &str) -> Result<Answer> {
        let sources = self.retriever.query(question, self.k).await?;

        let mut degraded = false;
        let mut error = None;
        let answer = match &self.synthesizer {
            None => None,
            Some(synthesizer) => {
                let context: Vec<String> = sources
                    .iter()
                    .map(|source| source.text().to_string())
                    .collect();

                match synthesizer
                    .synthesize_with_history(question, &context, &self.turns)
                    .await
                {
                    Ok(text) => Some(text),
                    Err(e) if self.degrade_to_retrieval => {
                        tracing::warn!("Answer generation failed, returning sources only: {}", e);
                        degraded = true;
                        error = Some(e.to_string());
                        None
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        };

        self.turns.push(Turn::user(question));
        if let Some(text) = &answer {
            self.turns.push(Turn::assistant(text.clone()));
        }

        Ok(Answer {
            question: question.to_string(),
            answer,
            sources,
            degraded,
            error,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Conversation so far, oldest first
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Forget the conversation, keeping the session
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn k(&self) -> usize {
        self.k
    }
}
