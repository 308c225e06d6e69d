use std::collections::BTreeMap;

use crate::detection::LabelScorer;
use crate::models::ScoreMap;

/// Weight-free text/label scorer based on character trigrams.
///
/// Each label is compared against every run of words in the text that has the
/// same word count as the label; its similarity is the best Dice coefficient
/// over padded character trigrams. Similarities are softmax-normalized across
/// the labels, so the scores sum to one and come back in label order.
#[derive(Debug, Clone)]
pub struct TrigramScorer {
    pub temperature: f64,
}

impl Default for TrigramScorer {
    fn default() -> Self {
        Self { temperature: 0.1 }
    }
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

fn trigrams(phrase: &str) -> BTreeMap<[char; 3], u32> {
    let padded: Vec<char> = format!("  {} ", phrase).chars().collect();
    let mut grams = BTreeMap::new();
    for w in padded.windows(3) {
        *grams.entry([w[0], w[1], w[2]]).or_insert(0) += 1;
    }
    grams
}

/// Multiset Dice coefficient of two trigram bags
fn dice(a: &BTreeMap<[char; 3], u32>, b: &BTreeMap<[char; 3], u32>) -> f64 {
    let size_a: u32 = a.values().sum();
    let size_b: u32 = b.values().sum();
    if size_a + size_b == 0 {
        return 0.0;
    }
    let shared: u32 = a
        .iter()
        .map(|(gram, n)| (*n).min(b.get(gram).copied().unwrap_or(0)))
        .sum();
    2.0 * shared as f64 / (size_a + size_b) as f64
}

impl TrigramScorer {
    /// Raw similarity of one label to the text, in `[0, 1]`
    pub fn similarity(&self, text: &str, label: &str) -> f64 {
        let label_words = words(label);
        if label_words.is_empty() {
            return 0.0;
        }
        let text_words = words(text);
        if text_words.len() < label_words.len() {
            return dice(&trigrams(&label_words.join(" ")), &trigrams(&text_words.join(" ")));
        }

        let label_grams = trigrams(&label_words.join(" "));
        text_words
            .windows(label_words.len())
            .map(|run| dice(&label_grams, &trigrams(&run.join(" "))))
            .fold(0.0, f64::max)
    }
}

impl LabelScorer for TrigramScorer {
    fn score(&self, text: &str, labels: &[String]) -> anyhow::Result<ScoreMap> {
        if self.temperature <= 0.0 {
            anyhow::bail!("temperature must be positive, got {}", self.temperature);
        }
        if labels.is_empty() {
            return Ok(ScoreMap::new());
        }

        let logits: Vec<f64> = labels
            .iter()
            .map(|label| self.similarity(text, label) / self.temperature)
            .collect();
        let max_logit = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let exps: Vec<f64> = logits.iter().map(|l| (l - max_logit).exp()).collect();
        let total: f64 = exps.iter().sum();

        Ok(labels
            .iter()
            .zip(exps)
            .map(|(label, e)| (label.as_str(), e / total))
            .collect())
    }

    fn name(&self) -> &str {
        "Trigram Scorer"
    }
}
