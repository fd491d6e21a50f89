//! OpenAI chat completion summarizer.

use super::{token_budget, truncate_words, Summarizer};
use crate::config::Prompts;
use crate::error::{Result, ShortitError};
use crate::openai::create_client;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::{debug, info, instrument};

/// Completion token allowance per requested word.
const TOKENS_PER_WORD: f64 = 2.0;

/// Summarizer backed by an OpenAI chat model.
pub struct OpenAiSummarizer {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    prompts: Prompts,
}

impl OpenAiSummarizer {
    pub fn new(model: &str, prompts: Prompts) -> Result<Self> {
        Ok(Self {
            client: create_client()?,
            model: model.to_string(),
            prompts,
        })
    }

    fn build_messages(&self, text: &str, max_words: usize) -> Result<Vec<ChatCompletionRequestMessage>> {
        let mut vars = HashMap::new();
        vars.insert("max_words".to_string(), max_words.to_string());
        vars.insert("transcript".to_string(), text.trim().to_string());
        let user_prompt = self
            .prompts
            .render_with_custom(&self.prompts.summary.user, &vars);
        let system_prompt = self
            .prompts
            .render_with_custom(&self.prompts.summary.system, &vars);

        Ok(vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system_prompt)
                .build()
                .map_err(|e| ShortitError::Summarization(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_prompt)
                .build()
                .map_err(|e| ShortitError::Summarization(e.to_string()))?
                .into(),
        ])
    }
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    fn name(&self) -> String {
        format!("openai ({})", self.model)
    }

    #[instrument(skip(self, text), fields(model = %self.model, chars = text.len()))]
    async fn summarize(&self, text: &str, max_words: usize) -> Result<String> {
        let messages = self.build_messages(text, max_words)?;
        let budget = token_budget(max_words, TOKENS_PER_WORD, 0.0);

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .max_completion_tokens(budget.max_tokens as u32)
            .temperature(0.3)
            .build()
            .map_err(|e| ShortitError::Summarization(e.to_string()))?;

        info!("Requesting summary of at most {} words", max_words);
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| ShortitError::OpenAI(format!("Failed to generate summary: {}", e)))?;

        let draft = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .ok_or_else(|| ShortitError::Summarization("Empty response from LLM".to_string()))?;
        debug!("Draft summary has {} words", draft.split_whitespace().count());

        Ok(truncate_words(draft, max_words))
    }
}
