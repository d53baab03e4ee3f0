//! Message composers: pluggable writers for notification copy.
//!
//! `TemplateComposer` is deterministic and always available. `LlmComposer`
//! personalizes the text and falls back to the template if the LLM fails.
//! `AppState` holds an `Arc<dyn MessageComposer>` chosen at startup.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use crate::llm_client::LlmClient;
use crate::models::user::User;
use crate::notifications::prompts::{CELEBRATION_PROMPT, CELEBRATION_SYSTEM};

const MAX_CONTENT_CHARS: usize = 160;

pub struct CelebrationContext<'a> {
    pub recipient: &'a User,
    pub author: &'a User,
    pub commitment_text: &'a str,
}

impl CelebrationContext<'_> {
    fn is_self(&self) -> bool {
        self.recipient.id == self.author.id
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComposedMessage {
    pub content: String,
    /// -1.0 (negative) to 1.0 (positive); only the LLM backend scores sentiment.
    pub sentiment: Option<f64>,
}

#[async_trait]
pub trait MessageComposer: Send + Sync {
    async fn celebration(&self, ctx: &CelebrationContext<'_>) -> ComposedMessage;

    fn backend(&self) -> &'static str;
}

/// Name shown in messages: the local part of the email.
pub fn display_name(user: &User) -> &str {
    user.email.split('@').next().unwrap_or(&user.email)
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

pub struct TemplateComposer;

#[async_trait]
impl MessageComposer for TemplateComposer {
    async fn celebration(&self, ctx: &CelebrationContext<'_>) -> ComposedMessage {
        let commitment = truncate_chars(ctx.commitment_text, 80);
        let content = if ctx.is_self() {
            format!("You did it! \"{commitment}\" is done. That's a commitment kept.")
        } else {
            format!(
                "{} just completed \"{commitment}\". Send some encouragement!",
                display_name(ctx.author)
            )
        };
        ComposedMessage {
            content,
            sentiment: None,
        }
    }

    fn backend(&self) -> &'static str {
        "template"
    }
}

#[derive(Debug, Deserialize)]
struct LlmCelebration {
    content: String,
    sentiment: Option<f64>,
}

pub struct LlmComposer {
    llm: LlmClient,
    fallback: TemplateComposer,
}

impl LlmComposer {
    pub fn new(llm: LlmClient) -> Self {
        Self {
            llm,
            fallback: TemplateComposer,
        }
    }
}

pub fn build_celebration_prompt(ctx: &CelebrationContext<'_>) -> String {
    let audience = if ctx.is_self() {
        "the person who completed the commitment"
    } else {
        "a fellow pod member"
    };
    CELEBRATION_PROMPT
        .replace("{audience}", audience)
        .replace("{author}", display_name(ctx.author))
        .replace("{commitment}", ctx.commitment_text)
        .replace(
            "{style}",
            ctx.recipient
                .communication_style
                .as_deref()
                .unwrap_or("friendly and concise"),
        )
}

#[async_trait]
impl MessageComposer for LlmComposer {
    async fn celebration(&self, ctx: &CelebrationContext<'_>) -> ComposedMessage {
        let prompt = build_celebration_prompt(ctx);
        match self
            .llm
            .ask_json::<LlmCelebration>(CELEBRATION_SYSTEM, &prompt)
            .await
        {
            Ok(reply) if !reply.content.trim().is_empty() => ComposedMessage {
                content: truncate_chars(reply.content.trim(), MAX_CONTENT_CHARS),
                sentiment: reply.sentiment.map(|s| s.clamp(-1.0, 1.0)),
            },
            Ok(_) => {
                warn!("LLM returned an empty celebration; using template");
                self.fallback.celebration(ctx).await
            }
            Err(e) => {
                warn!("LLM celebration failed, using template: {e}");
                self.fallback.celebration(ctx).await
            }
        }
    }

    fn backend(&self) -> &'static str {
        "llm"
    }
}
