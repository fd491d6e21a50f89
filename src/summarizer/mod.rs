//! Abstractive summarization of windowed transcripts.
//!
//! The default backend runs a pretrained encoder-decoder model (DistilBART)
//! locally through ONNX Runtime. An OpenAI chat backend is available as an
//! alternative. Both cap the result at the requested number of words.

mod generation;
mod openai;
mod seq2seq;

pub use generation::{
    banned_ngram_tokens, beam_search, log_softmax, GenerationConfig, StepScorer,
};
pub use openai::OpenAiSummarizer;
pub use seq2seq::{is_model_cached, ModelConfig, Seq2SeqModel, Seq2SeqSummarizer, MODEL_FILES};

use crate::config::{Prompts, Settings, SummarizerProvider};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for summarization backends.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Backend name for logs and diagnostics.
    fn name(&self) -> String;

    /// Summarize `text` in at most `max_words` words.
    async fn summarize(&self, text: &str, max_words: usize) -> Result<String>;
}

/// Generated length bounds, in tokens, for a word budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenBudget {
    pub max_tokens: usize,
    pub min_tokens: usize,
}

/// Convert a word budget into generation length bounds.
pub fn token_budget(max_words: usize, tokens_per_word: f64, min_length_ratio: f64) -> TokenBudget {
    let max_tokens = (max_words as f64 * tokens_per_word).floor() as usize;
    let min_tokens = (max_tokens as f64 * min_length_ratio).floor() as usize;
    TokenBudget {
        max_tokens,
        min_tokens,
    }
}

/// Keep the first `max_words` whitespace-separated words, joined by single spaces.
pub fn truncate_words(text: &str, max_words: usize) -> String {
    text.split_whitespace()
        .take(max_words)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Create the summarizer selected in the settings.
///
/// The local model is not loaded here; it is loaded on first use.
pub fn create_summarizer(settings: &Settings, prompts: Prompts) -> Result<Arc<dyn Summarizer>> {
    match settings.summarizer.provider {
        SummarizerProvider::Local => Ok(Arc::new(Seq2SeqSummarizer::new(
            settings.summarizer.clone(),
        ))),
        SummarizerProvider::OpenAI => Ok(Arc::new(OpenAiSummarizer::new(
            &settings.summarizer.openai_model,
            prompts,
        )?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_budget() {
        assert_eq!(
            token_budget(250, 1.33, 0.5),
            TokenBudget {
                max_tokens: 332,
                min_tokens: 166
            }
        );
        assert_eq!(token_budget(50, 1.33, 0.5).max_tokens, 66);
        assert_eq!(token_budget(50, 1.33, 0.5).min_tokens, 33);
    }

    #[test]
    fn test_truncate_words_exact() {
        let draft: Vec<String> = (0..40).map(|i| format!("word{}", i)).collect();
        let summary = truncate_words(&draft.join(" "), 5);

        assert_eq!(summary, "word0 word1 word2 word3 word4");
        assert_eq!(summary.split_whitespace().count(), 5);
    }

    #[test]
    fn test_truncate_words_never_exceeds_budget() {
        let text = "  the   quick brown\nfox jumps\tover the lazy dog ";
        for max_words in 0..12 {
            let truncated = truncate_words(text, max_words);
            assert!(truncated.split_whitespace().count() <= max_words);
        }
        assert_eq!(truncate_words(text, 100), "the quick brown fox jumps over the lazy dog");
    }

    #[test]
    fn test_create_local_summarizer_is_lazy() {
        let settings = Settings::default();
        let summarizer = create_summarizer(&settings, Prompts::default()).unwrap();
        assert!(summarizer.name().contains("distilbart"));
    }
}
