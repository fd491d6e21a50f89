//! Local DistilBART summarizer on ONNX Runtime.
//!
//! The model is an encoder-decoder pair exported to ONNX, loaded either from
//! a local directory or from the Hugging Face Hub by repository name.

use super::generation::{beam_search, GenerationConfig, StepScorer};
use super::{token_budget, truncate_words, Summarizer};
use crate::config::SummarizerSettings;
use crate::error::{Result, ShortitError};
use async_trait::async_trait;
use ort::session::Session;
use ort::value::Tensor;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokenizers::Tokenizer;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};

const ENCODER_FILE: &str = "onnx/encoder_model.onnx";
const DECODER_FILE: &str = "onnx/decoder_model.onnx";
const TOKENIZER_FILE: &str = "tokenizer.json";
const CONFIG_FILE: &str = "config.json";

/// Files a model repository must provide.
pub const MODEL_FILES: [&str; 4] = [CONFIG_FILE, TOKENIZER_FILE, ENCODER_FILE, DECODER_FILE];

/// Token ids and generation hints from the model's `config.json`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub decoder_start_token_id: u32,
    pub eos_token_id: u32,
    pub pad_token_id: u32,
    pub forced_bos_token_id: Option<u32>,
    pub forced_eos_token_id: Option<u32>,
    pub no_repeat_ngram_size: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            decoder_start_token_id: 2,
            eos_token_id: 2,
            pad_token_id: 1,
            forced_bos_token_id: Some(0),
            forced_eos_token_id: Some(2),
            no_repeat_ngram_size: 3,
        }
    }
}

fn ort_err(e: ort::Error) -> ShortitError {
    ShortitError::Summarization(format!("onnx runtime: {}", e))
}

/// Whether every model file is already in the local Hugging Face cache.
pub fn is_model_cached(repo: &str) -> bool {
    let local = Path::new(repo);
    if local.is_dir() {
        return MODEL_FILES.iter().all(|f| local.join(f).exists());
    }
    let cache = hf_hub::Cache::default();
    let cached = cache.model(repo.to_string());
    MODEL_FILES.iter().all(|f| cached.get(f).is_some())
}

/// Resolve the model files, downloading them when `repo` is not a local directory.
fn resolve_model_dir(repo: &str) -> Result<PathBuf> {
    let local = Path::new(repo);
    if local.is_dir() {
        for file in MODEL_FILES {
            if !local.join(file).exists() {
                return Err(ShortitError::ModelUnavailable(format!(
                    "{} is missing {}",
                    local.display(),
                    file
                )));
            }
        }
        return Ok(local.to_path_buf());
    }

    let api = hf_hub::api::sync::Api::new()
        .map_err(|e| ShortitError::ModelUnavailable(e.to_string()))?;
    let remote = api.model(repo.to_string());

    let mut config_path = None;
    for file in MODEL_FILES {
        info!("Fetching {} from {}", file, repo);
        let path = remote
            .get(file)
            .map_err(|e| ShortitError::ModelUnavailable(format!("{}/{}: {}", repo, file, e)))?;
        if file == CONFIG_FILE {
            config_path = Some(path);
        }
    }

    // Snapshot layout mirrors the repository, so config.json sits at the root
    config_path
        .as_deref()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .ok_or_else(|| ShortitError::ModelUnavailable(format!("no snapshot directory for {}", repo)))
}

fn build_session(path: &Path) -> Result<Session> {
    Session::builder()
        .map_err(ort_err)?
        .commit_from_file(path)
        .map_err(|e| ShortitError::ModelUnavailable(format!("{}: {}", path.display(), e)))
}

/// Encoder output for one input sequence.
struct Encoded {
    attention_mask: Vec<i64>,
    hidden: Vec<f32>,
    seq_len: usize,
    hidden_size: usize,
}

/// A loaded encoder-decoder summarization model.
///
/// ONNX Runtime sessions need exclusive access while running, so each one
/// sits behind a mutex. Nothing else about the model changes after loading.
pub struct Seq2SeqModel {
    name: String,
    encoder: Mutex<Session>,
    decoder: Mutex<Session>,
    tokenizer: Tokenizer,
    config: ModelConfig,
}

impl Seq2SeqModel {
    /// Load from a local directory or a Hugging Face repository name.
    pub fn load(repo: &str) -> Result<Self> {
        let dir = resolve_model_dir(repo)?;
        debug!("Loading model from {:?}", dir);

        let config_json = std::fs::read_to_string(dir.join(CONFIG_FILE))?;
        let config: ModelConfig = serde_json::from_str(&config_json)?;

        let tokenizer = Tokenizer::from_file(dir.join(TOKENIZER_FILE))
            .map_err(|e| ShortitError::ModelUnavailable(format!("tokenizer: {}", e)))?;

        let encoder = build_session(&dir.join(ENCODER_FILE))?;
        let decoder = build_session(&dir.join(DECODER_FILE))?;

        info!("Loaded summarization model {}", repo);
        Ok(Self {
            name: repo.to_string(),
            encoder: Mutex::new(encoder),
            decoder: Mutex::new(decoder),
            tokenizer,
            config,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Tokenize `text`, keeping at most `max_tokens` ids with end-of-sequence last.
    fn tokenize(&self, text: &str, max_tokens: usize) -> Result<Vec<i64>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| ShortitError::Summarization(format!("tokenization failed: {}", e)))?;

        let ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        let ids = truncate_input_ids(ids, max_tokens, self.config.eos_token_id as i64);
        if ids.is_empty() {
            return Err(ShortitError::Summarization("input produced no tokens".to_string()));
        }
        Ok(ids)
    }

    fn encode(&self, ids: &[i64]) -> Result<Encoded> {
        let seq_len = ids.len();
        let attention_mask = vec![1i64; seq_len];

        let input_ids = Tensor::from_array((vec![1, seq_len], ids.to_vec())).map_err(ort_err)?;
        let mask = Tensor::from_array((vec![1, seq_len], attention_mask.clone())).map_err(ort_err)?;

        let mut encoder = self
            .encoder
            .lock()
            .map_err(|_| ShortitError::Summarization("encoder lock poisoned".to_string()))?;
        let outputs = encoder
            .run(ort::inputs![
                "input_ids" => input_ids,
                "attention_mask" => mask
            ])
            .map_err(ort_err)?;
        let (shape, hidden) = outputs["last_hidden_state"]
            .try_extract_tensor::<f32>()
            .map_err(ort_err)?;

        if shape.len() != 3 {
            return Err(ShortitError::Summarization(format!(
                "unexpected encoder output rank {}",
                shape.len()
            )));
        }

        Ok(Encoded {
            attention_mask,
            hidden: hidden.to_vec(),
            seq_len,
            hidden_size: shape[2] as usize,
        })
    }

    /// Summarize text with beam search. Blocking.
    pub fn generate(&self, text: &str, max_input_tokens: usize, config: &GenerationConfig) -> Result<String> {
        let ids = self.tokenize(text, max_input_tokens)?;
        debug!("Encoding {} input tokens", ids.len());
        let encoded = self.encode(&ids)?;

        let mut decoder = self
            .decoder
            .lock()
            .map_err(|_| ShortitError::Summarization("decoder lock poisoned".to_string()))?;
        let mut step = DecoderStep {
            decoder: &mut *decoder,
            encoded: &encoded,
        };
        let tokens = beam_search(&mut step, config)?;
        debug!("Generated {} tokens", tokens.len());

        self.tokenizer
            .decode(&tokens, true)
            .map(|s| s.trim().to_string())
            .map_err(|e| ShortitError::Summarization(format!("detokenization failed: {}", e)))
    }
}

/// Runs the decoder over every beam prefix at once.
///
/// The decoder is re-run on whole prefixes each step.
// TODO: switch to decoder_with_past_model.onnx and carry the key/value cache between steps.
struct DecoderStep<'a> {
    decoder: &'a mut Session,
    encoded: &'a Encoded,
}

impl StepScorer for DecoderStep<'_> {
    fn next_token_logits(&mut self, prefixes: &[Vec<u32>]) -> Result<Vec<Vec<f32>>> {
        let batch = prefixes.len();
        let tgt_len = prefixes.first().map(Vec::len).unwrap_or(0);
        if batch == 0 || tgt_len == 0 {
            return Ok(Vec::new());
        }

        let encoded = self.encoded;
        let input_ids: Vec<i64> = prefixes
            .iter()
            .flat_map(|p| p.iter().map(|&t| t as i64))
            .collect();
        let mask: Vec<i64> = std::iter::repeat_n(encoded.attention_mask.iter().copied(), batch)
            .flatten()
            .collect();
        let hidden: Vec<f32> = std::iter::repeat_n(encoded.hidden.iter().copied(), batch)
            .flatten()
            .collect();

        let input_ids = Tensor::from_array((vec![batch, tgt_len], input_ids)).map_err(ort_err)?;
        let mask = Tensor::from_array((vec![batch, encoded.seq_len], mask)).map_err(ort_err)?;
        let hidden = Tensor::from_array((
            vec![batch, encoded.seq_len, encoded.hidden_size],
            hidden,
        ))
        .map_err(ort_err)?;

        let outputs = self
            .decoder
            .run(ort::inputs![
                "encoder_attention_mask" => mask,
                "input_ids" => input_ids,
                "encoder_hidden_states" => hidden
            ])
            .map_err(ort_err)?;
        let (shape, logits) = outputs["logits"].try_extract_tensor::<f32>().map_err(ort_err)?;
        let rows = last_step_rows(shape, logits, batch)?;
        Ok(rows)
    }
}

/// Keep at most `max_tokens` ids, ending on `eos` when truncated. Zero keeps everything.
pub fn truncate_input_ids(mut ids: Vec<i64>, max_tokens: usize, eos: i64) -> Vec<i64> {
    if max_tokens > 0 && ids.len() > max_tokens {
        debug!("Truncating input from {} to {} tokens", ids.len(), max_tokens);
        ids.truncate(max_tokens);
        if let Some(last) = ids.last_mut() {
            *last = eos;
        }
    }
    ids
}

/// Text fed to the encoder.
pub fn encoder_input(prompt_prefix: &str, text: &str) -> String {
    format!("{}{}", prompt_prefix, text)
}

/// Split `[batch, steps, vocab]` decoder logits into the last step of each row.
pub fn last_step_rows(shape: &[i64], logits: &[f32], batch: usize) -> Result<Vec<Vec<f32>>> {
    let dims: Vec<usize> = shape.iter().map(|&d| d.max(0) as usize).collect();
    let valid = dims.len() == 3
        && dims[0] == batch
        && dims[1] > 0
        && logits.len() == dims.iter().product::<usize>();
    if !valid {
        return Err(ShortitError::Summarization(format!(
            "unexpected decoder output shape {:?} for {} values",
            shape,
            logits.len()
        )));
    }
    let (steps, vocab) = (dims[1], dims[2]);

    Ok((0..batch)
        .map(|row| {
            let offset = (row * steps + steps - 1) * vocab;
            logits[offset..offset + vocab].to_vec()
        })
        .collect())
}

/// Build decoding parameters for a word budget.
pub fn generation_config(
    settings: &SummarizerSettings,
    model: &ModelConfig,
    max_words: usize,
) -> GenerationConfig {
    let budget = token_budget(max_words, settings.tokens_per_word, settings.min_length_ratio);
    GenerationConfig {
        max_length: budget.max_tokens,
        min_length: budget.min_tokens,
        num_beams: settings.num_beams,
        length_penalty: settings.length_penalty,
        early_stopping: settings.early_stopping,
        no_repeat_ngram_size: model.no_repeat_ngram_size,
        decoder_start_token_id: model.decoder_start_token_id,
        eos_token_id: model.eos_token_id,
        forced_bos_token_id: model.forced_bos_token_id,
        forced_eos_token_id: model.forced_eos_token_id,
    }
}

/// Summarizer backed by a lazily loaded [`Seq2SeqModel`].
///
/// The model is loaded on the first request and shared by all later ones.
pub struct Seq2SeqSummarizer {
    settings: SummarizerSettings,
    model: OnceCell<Arc<Seq2SeqModel>>,
}

impl Seq2SeqSummarizer {
    pub fn new(settings: SummarizerSettings) -> Self {
        Self {
            settings,
            model: OnceCell::new(),
        }
    }

    /// The loaded model, loading it on first use.
    pub async fn model(&self) -> Result<Arc<Seq2SeqModel>> {
        let model = self
            .model
            .get_or_try_init(|| async {
                let repo = self.settings.model.clone();
                let model = tokio::task::spawn_blocking(move || Seq2SeqModel::load(&repo))
                    .await
                    .map_err(|e| ShortitError::ModelUnavailable(format!("model loader panicked: {}", e)))??;
                Ok::<_, ShortitError>(Arc::new(model))
            })
            .await?;
        Ok(Arc::clone(model))
    }
}

#[async_trait]
impl Summarizer for Seq2SeqSummarizer {
    fn name(&self) -> String {
        format!("local ({})", self.settings.model)
    }

    #[instrument(skip(self, text), fields(model = %self.settings.model, chars = text.len()))]
    async fn summarize(&self, text: &str, max_words: usize) -> Result<String> {
        let model = self.model().await?;
        let config = generation_config(&self.settings, model.config(), max_words);
        let input = encoder_input(&self.settings.prompt_prefix, text);
        let max_input_tokens = self.settings.max_input_tokens;

        info!(
            "Summarizing with beam width {} and {}..{} tokens",
            config.num_beams, config.min_length, config.max_length
        );
        let draft = tokio::task::spawn_blocking(move || model.generate(&input, max_input_tokens, &config))
            .await
            .map_err(|e| ShortitError::Summarization(format!("generation task failed: {}", e)))??;

        Ok(truncate_words(&draft, max_words))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_config_from_distilbart_json() {
        let json = r#"{
            "_name_or_path": "sshleifer/distilbart-cnn-12-6",
            "decoder_start_token_id": 2,
            "eos_token_id": 2,
            "pad_token_id": 1,
            "forced_bos_token_id": 0,
            "forced_eos_token_id": 2,
            "no_repeat_ngram_size": 3,
            "num_beams": 4,
            "vocab_size": 50264
        }"#;
        let config: ModelConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.decoder_start_token_id, 2);
        assert_eq!(config.forced_bos_token_id, Some(0));
        assert_eq!(config.no_repeat_ngram_size, 3);
    }

    #[test]
    fn test_model_config_without_forced_tokens() {
        let json = r#"{"decoder_start_token_id": 0, "eos_token_id": 1,
                       "forced_bos_token_id": null, "forced_eos_token_id": null}"#;
        let config: ModelConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.forced_bos_token_id, None);
        assert_eq!(config.eos_token_id, 1);
        assert_eq!(config.pad_token_id, 1);
    }

    #[test]
    fn test_generation_config_from_settings() {
        let settings = SummarizerSettings::default();
        let config = generation_config(&settings, &ModelConfig::default(), 250);

        assert_eq!(config.max_length, 332);
        assert_eq!(config.min_length, 166);
        assert_eq!(config.num_beams, 4);
        assert_eq!(config.length_penalty, 2.0);
        assert!(config.early_stopping);
        assert_eq!(config.forced_bos_token_id, Some(0));
    }

    #[test]
    fn test_truncate_input_ids_ends_on_eos() {
        let ids: Vec<i64> = (10..20).collect();

        assert_eq!(truncate_input_ids(ids.clone(), 4, 2), vec![10, 11, 12, 2]);
        assert_eq!(truncate_input_ids(ids.clone(), 10, 2), ids);
        assert_eq!(truncate_input_ids(ids.clone(), 0, 2), ids);
        assert_eq!(truncate_input_ids(vec![0, 5, 2], 1024, 2), vec![0, 5, 2]);
    }

    #[test]
    fn test_encoder_input_uses_prefix() {
        let settings = SummarizerSettings::default();
        assert_eq!(
            encoder_input(&settings.prompt_prefix, " hello world"),
            "summarize:  hello world"
        );
        assert_eq!(encoder_input("", "plain"), "plain");
    }

    #[test]
    fn test_last_step_rows() {
        // batch 2, steps 3, vocab 2: value = row * 10 + step * 2 + token
        let logits: Vec<f32> = (0..2)
            .flat_map(|row| (0..3).flat_map(move |step| (0..2).map(move |t| (row * 10 + step * 2 + t) as f32)))
            .collect();

        let rows = last_step_rows(&[2, 3, 2], &logits, 2).unwrap();
        assert_eq!(rows, vec![vec![4.0, 5.0], vec![14.0, 15.0]]);

        let single = last_step_rows(&[1, 1, 3], &[0.1, 0.2, 0.3], 1).unwrap();
        assert_eq!(single, vec![vec![0.1, 0.2, 0.3]]);
    }

    #[test]
    fn test_last_step_rows_rejects_bad_shapes() {
        assert!(last_step_rows(&[2, 3], &[0.0; 6], 2).is_err());
        assert!(last_step_rows(&[1, 3, 2], &[0.0; 6], 2).is_err());
        assert!(last_step_rows(&[1, 0, 2], &[], 1).is_err());
        assert!(last_step_rows(&[1, 3, 2], &[0.0; 5], 1).is_err());
    }

    #[test]
    fn test_local_dir_missing_files_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "{}").unwrap();

        let err = Seq2SeqModel::load(dir.path().to_str().unwrap())
            .err()
            .unwrap();
        assert!(matches!(err, ShortitError::ModelUnavailable(_)));
        assert!(!is_model_cached(dir.path().to_str().unwrap()));
    }

    #[test]
    fn test_summarize_reports_unavailable_model() {
        let dir = tempfile::tempdir().unwrap();
        let settings = SummarizerSettings {
            model: dir.path().to_string_lossy().into_owned(),
            ..Default::default()
        };
        let summarizer = Seq2SeqSummarizer::new(settings);

        let err = tokio_test::block_on(summarizer.summarize(" hello world", 50)).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::UpstreamUnavailable);
    }
}
