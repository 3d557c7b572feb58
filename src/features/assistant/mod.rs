//! # Assistant Feature
//!
//! Free text that is not a reminder command is answered by a generative model.
//! Each call is single-shot: one user message in, one reply out, no history.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use openai::chat::{ChatCompletion, ChatCompletionMessage, ChatCompletionMessageRole};

#[async_trait]
pub trait Assistant: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Chat completion backend. Credentials come from `OPENAI_KEY`/`OPENAI_API_KEY`.
#[derive(Debug, Clone)]
pub struct OpenAiAssistant {
    model: String,
}

impl OpenAiAssistant {
    pub fn new(model: impl Into<String>) -> Self {
        OpenAiAssistant {
            model: model.into(),
        }
    }
}

#[async_trait]
impl Assistant for OpenAiAssistant {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let messages = vec![ChatCompletionMessage {
            role: ChatCompletionMessageRole::User,
            content: Some(prompt.to_string()),
            name: None,
            function_call: None,
            tool_call_id: None,
            tool_calls: None,
        }];

        let completion = ChatCompletion::builder(&self.model, messages)
            .create()
            .await
            .map_err(|e| anyhow::anyhow!("OpenAI API error: {}", e))?;

        if let Some(usage) = &completion.usage {
            debug!(
                "Assistant used {} prompt + {} completion tokens",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        completion
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("No response received"))
    }
}
