use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::dreams::form::DreamForm;
use crate::dreams::service::{form_of, get_dream};
use crate::errors::AppError;
use crate::llm_client::prompts::{language_instruction, IMMIGRATION_DISCLAIMER};
use crate::llm_client::{ChatMessage, ChatRole, LlmClient};
use crate::reports::generator::resolve_language;
use crate::reports::prompts::CHAT_SYSTEM_TEMPLATE;
use crate::usage::limits::ToolKind;
use crate::usage::tracker::{reserve, settle, UsageDecision, UsageTracker};

pub const MAX_CHAT_MESSAGES: usize = 20;
pub const MAX_MESSAGE_CHARS: usize = 4000;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub user_id: Uuid,
    pub messages: Vec<ChatMessage>,
    pub dream_id: Option<Uuid>,
    pub language: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatReply {
    pub reply: ChatMessage,
    pub usage: UsageDecision,
}

/// 1..=20 messages, each 1..=4000 characters, ending with a user turn.
pub fn validate_conversation(messages: &[ChatMessage]) -> Result<(), AppError> {
    if messages.is_empty() || messages.len() > MAX_CHAT_MESSAGES {
        return Err(AppError::Validation(format!(
            "A conversation must have between 1 and {MAX_CHAT_MESSAGES} messages"
        )));
    }
    for (i, message) in messages.iter().enumerate() {
        let chars = message.content.trim().chars().count();
        if chars == 0 || chars > MAX_MESSAGE_CHARS {
            return Err(AppError::Validation(format!(
                "Message {i} must have between 1 and {MAX_MESSAGE_CHARS} characters"
            )));
        }
    }
    if messages.last().map(|m| m.role) != Some(ChatRole::User) {
        return Err(AppError::Validation(
            "The last message must come from the user".to_string(),
        ));
    }
    Ok(())
}

pub fn build_chat_system(form: Option<&DreamForm>, language: &str) -> Result<String, AppError> {
    let dream_context = match form {
        Some(form) => {
            let json = serde_json::to_string(form).map_err(|e| {
                AppError::Internal(anyhow::anyhow!("Failed to serialize dream: {e}"))
            })?;
            format!("The user's plan (Criador de Sonhos form): {json}")
        }
        None => String::new(),
    };
    Ok(CHAT_SYSTEM_TEMPLATE
        .replace("{language_instruction}", &language_instruction(language))
        .replace("{disclaimer}", IMMIGRATION_DISCLAIMER)
        .replace("{dream_context}", &dream_context)
        .trim_end()
        .to_string())
}

pub async fn chat(
    pool: &PgPool,
    tracker: &UsageTracker,
    llm: &LlmClient,
    req: &ChatRequest,
) -> Result<ChatReply, AppError> {
    validate_conversation(&req.messages)?;
    let language = resolve_language(req.language.as_deref())?;

    let form = match req.dream_id {
        Some(id) => Some(form_of(&get_dream(pool, req.user_id, id).await?)?),
        None => None,
    };
    let system = build_chat_system(form.as_ref(), language)?;

    let now = Utc::now();
    let usage = reserve(pool, tracker, req.user_id, ToolKind::Chat, now).await?;
    let result = llm
        .chat(&system, &req.messages)
        .await
        .map_err(|e| AppError::Llm(format!("Chat LLM call failed: {e}")));
    let text = settle(pool, tracker, req.user_id, ToolKind::Chat, now, result).await?;

    debug!("Chat reply for user {} ({} chars)", req.user_id, text.len());
    Ok(ChatReply {
        reply: ChatMessage {
            role: ChatRole::Assistant,
            content: text,
        },
        usage,
    })
}
