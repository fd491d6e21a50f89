//! Beam search decoding for encoder-decoder models.
//!
//! The search is independent of any runtime: the model is reached through
//! [`StepScorer`], which returns next-token logits for a batch of decoder
//! prefixes. All prefixes in a batch have the same length.

use crate::error::{Result, ShortitError};

/// Decoding parameters.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Maximum decoder sequence length, start token included.
    pub max_length: usize,
    /// End-of-sequence is suppressed until the sequence is this long.
    pub min_length: usize,
    pub num_beams: usize,
    /// Finished hypotheses are ranked by `sum_logprobs / len^length_penalty`.
    pub length_penalty: f32,
    /// Stop as soon as `num_beams` hypotheses have finished.
    pub early_stopping: bool,
    /// Ban any n-gram of this size from occurring twice (0 disables).
    pub no_repeat_ngram_size: usize,
    pub decoder_start_token_id: u32,
    pub eos_token_id: u32,
    /// Token forced right after the decoder start token.
    pub forced_bos_token_id: Option<u32>,
    /// Token forced at the last position when `max_length` is reached.
    pub forced_eos_token_id: Option<u32>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_length: 142,
            min_length: 56,
            num_beams: 4,
            length_penalty: 2.0,
            early_stopping: true,
            no_repeat_ngram_size: 3,
            decoder_start_token_id: 2,
            eos_token_id: 2,
            forced_bos_token_id: Some(0),
            forced_eos_token_id: Some(2),
        }
    }
}

/// Source of next-token scores for a batch of decoder prefixes.
pub trait StepScorer {
    /// Return one logits vector (vocabulary sized) per prefix.
    fn next_token_logits(&mut self, prefixes: &[Vec<u32>]) -> Result<Vec<Vec<f32>>>;
}

#[derive(Debug, Clone)]
struct Beam {
    tokens: Vec<u32>,
    score: f32,
}

/// Finished hypotheses, keeping at most `num_beams` of the best.
struct Hypotheses {
    num_beams: usize,
    length_penalty: f32,
    early_stopping: bool,
    items: Vec<(f32, Vec<u32>)>,
}

impl Hypotheses {
    fn new(config: &GenerationConfig) -> Self {
        Self {
            num_beams: config.num_beams.max(1),
            length_penalty: config.length_penalty,
            early_stopping: config.early_stopping,
            items: Vec::new(),
        }
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn normalize(&self, sum_logprobs: f32, length: usize) -> f32 {
        sum_logprobs / (length.max(1) as f32).powf(self.length_penalty)
    }

    fn worst_score(&self) -> f32 {
        self.items
            .iter()
            .map(|(score, _)| *score)
            .fold(f32::INFINITY, f32::min)
    }

    /// `scored_length` excludes the end-of-sequence token, if any.
    fn add(&mut self, tokens: Vec<u32>, sum_logprobs: f32, scored_length: usize) {
        let score = self.normalize(sum_logprobs, scored_length);
        if self.items.len() < self.num_beams || score > self.worst_score() {
            self.items.push((score, tokens));
            if self.items.len() > self.num_beams {
                let worst = self
                    .items
                    .iter()
                    .enumerate()
                    .min_by(|a, b| a.1 .0.total_cmp(&b.1 .0))
                    .map(|(i, _)| i);
                if let Some(i) = worst {
                    self.items.remove(i);
                }
            }
        }
    }

    /// Whether no running beam can still beat the finished ones.
    fn is_done(&self, best_running_sum: f32, current_length: usize) -> bool {
        if self.items.len() < self.num_beams {
            return false;
        }
        if self.early_stopping {
            return true;
        }
        self.worst_score() >= self.normalize(best_running_sum, current_length)
    }

    fn best(self) -> Option<Vec<u32>> {
        self.items
            .into_iter()
            .max_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, tokens)| tokens)
    }
}

/// Numerically stable log-softmax.
pub fn log_softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if !max.is_finite() {
        return vec![f32::NEG_INFINITY; logits.len()];
    }
    let sum: f32 = logits.iter().map(|&x| (x - max).exp()).sum();
    let log_sum = sum.ln();
    logits.iter().map(|&x| x - max - log_sum).collect()
}

/// Tokens that would complete an n-gram already present in `tokens`.
pub fn banned_ngram_tokens(tokens: &[u32], n: usize) -> Vec<u32> {
    if n == 0 || tokens.len() + 1 < n {
        return Vec::new();
    }
    let prefix = &tokens[tokens.len() + 1 - n..];
    tokens
        .windows(n)
        .filter(|gram| &gram[..n - 1] == prefix)
        .map(|gram| gram[n - 1])
        .collect()
}

/// Apply length constraints, forced tokens and n-gram bans to log-probabilities.
fn constrain(scores: &mut [f32], tokens: &[u32], config: &GenerationConfig) {
    let length = tokens.len();
    let eos = config.eos_token_id as usize;

    if length < config.min_length {
        if let Some(s) = scores.get_mut(eos) {
            *s = f32::NEG_INFINITY;
        }
    }

    let forced = match (config.forced_bos_token_id, config.forced_eos_token_id) {
        (Some(bos), _) if length == 1 => Some(bos as usize),
        (_, Some(forced_eos)) if length + 1 == config.max_length => Some(forced_eos as usize),
        _ => None,
    };
    if let Some(forced) = forced {
        for (i, s) in scores.iter_mut().enumerate() {
            *s = if i == forced { 0.0 } else { f32::NEG_INFINITY };
        }
    }

    for banned in banned_ngram_tokens(tokens, config.no_repeat_ngram_size) {
        if let Some(s) = scores.get_mut(banned as usize) {
            *s = f32::NEG_INFINITY;
        }
    }
}

/// Run beam search and return the best decoder sequence.
///
/// The returned sequence starts with the decoder start token and ends with
/// the end-of-sequence token unless `max_length` cut it off.
pub fn beam_search<S: StepScorer + ?Sized>(
    scorer: &mut S,
    config: &GenerationConfig,
) -> Result<Vec<u32>> {
    let num_beams = config.num_beams.max(1);
    let mut beams = vec![Beam {
        tokens: vec![config.decoder_start_token_id],
        score: 0.0,
    }];
    let mut finished = Hypotheses::new(config);
    let mut length = 1;
    let mut done = false;

    while length < config.max_length {
        let prefixes: Vec<Vec<u32>> = beams.iter().map(|b| b.tokens.clone()).collect();
        let logits = scorer.next_token_logits(&prefixes)?;
        if logits.len() != beams.len() {
            return Err(ShortitError::Summarization(format!(
                "scorer returned {} rows for {} beams",
                logits.len(),
                beams.len()
            )));
        }

        // (total score, beam index, token)
        let mut candidates: Vec<(f32, usize, u32)> = Vec::new();
        for (beam_idx, (beam, row)) in beams.iter().zip(&logits).enumerate() {
            let mut scores = log_softmax(row);
            constrain(&mut scores, &beam.tokens, config);
            candidates.extend(
                scores
                    .iter()
                    .enumerate()
                    .filter(|(_, s)| s.is_finite())
                    .map(|(token, s)| (beam.score + s, beam_idx, token as u32)),
            );
        }

        let keep = (2 * num_beams).min(candidates.len());
        let by_rank = |a: &(f32, usize, u32), b: &(f32, usize, u32)| {
            b.0.total_cmp(&a.0)
                .then(a.1.cmp(&b.1))
                .then(a.2.cmp(&b.2))
        };
        if keep < candidates.len() {
            candidates.select_nth_unstable_by(keep, by_rank);
            candidates.truncate(keep);
        }
        candidates.sort_by(by_rank);

        let mut next_beams = Vec::with_capacity(num_beams);
        for (rank, &(score, beam_idx, token)) in candidates.iter().enumerate() {
            let parent = &beams[beam_idx];
            if token == config.eos_token_id {
                if rank < num_beams {
                    let mut tokens = parent.tokens.clone();
                    tokens.push(token);
                    finished.add(tokens, score, parent.tokens.len());
                }
            } else {
                let mut tokens = parent.tokens.clone();
                tokens.push(token);
                next_beams.push(Beam { tokens, score });
            }
            if next_beams.len() == num_beams {
                break;
            }
        }

        length += 1;

        let best_running = next_beams
            .iter()
            .map(|b| b.score)
            .max_by(|a, b| a.total_cmp(b));
        done = match best_running {
            None => true,
            Some(best) => finished.is_done(best, length),
        };
        beams = next_beams;
        if done {
            break;
        }
    }

    if !done {
        // Out of length: unfinished beams compete as they are
        for beam in beams {
            let length = beam.tokens.len();
            finished.add(beam.tokens, beam.score, length);
        }
    }

    finished
        .best()
        .ok_or_else(|| ShortitError::Summarization("beam search produced no output".to_string()))
}
