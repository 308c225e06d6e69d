use image::DynamicImage;

use crate::detection::crop::BACKGROUND_GRAY;
use crate::detection::RegionClassifier;
use crate::models::ScoreMap;

/// Named reference colors and the class each one stands for
const PALETTE: [(&str, [f64; 3]); 13] = [
    ("sky", [135.0, 206.0, 235.0]),
    ("foliage", [34.0, 139.0, 34.0]),
    ("water", [28.0, 107.0, 160.0]),
    ("asphalt", [64.0, 64.0, 64.0]),
    ("brick", [178.0, 34.0, 34.0]),
    ("sand", [194.0, 178.0, 128.0]),
    ("snow", [250.0, 250.0, 250.0]),
    ("shadow", [10.0, 10.0, 10.0]),
    ("concrete", [160.0, 160.0, 160.0]),
    ("wood", [133.0, 94.0, 66.0]),
    ("skin", [224.0, 172.0, 105.0]),
    ("sunflower", [255.0, 200.0, 0.0]),
    ("lavender", [150.0, 123.0, 182.0]),
];

/// Largest possible RGB distance, used to normalize
const MAX_DISTANCE: f64 = 441.672_96;

/// Weight-free classifier over the mean foreground color of a crop.
///
/// Background-gray pixels are ignored. Only the crop is seen, not the mask,
/// so an in-mask pixel of exactly that gray is skipped as well. The distances
/// to [`PALETTE`] are turned into probabilities with a temperature softmax and
/// the top `top_k` are returned in descending order.
#[derive(Debug, Clone)]
pub struct PaletteClassifier {
    pub top_k: usize,
    pub temperature: f64,
}

impl Default for PaletteClassifier {
    fn default() -> Self {
        Self {
            top_k: 5,
            temperature: 0.05,
        }
    }
}

impl PaletteClassifier {
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Mean color of pixels that are not exactly [`BACKGROUND_GRAY`], if there are any
    fn mean_foreground(crop: &DynamicImage) -> Option<[f64; 3]> {
        let rgb = crop.to_rgb8();
        let mut sum = [0u64; 3];
        let mut count = 0u64;

        for pixel in rgb.pixels() {
            if pixel.0 == [BACKGROUND_GRAY; 3] {
                continue;
            }
            for c in 0..3 {
                sum[c] += pixel[c] as u64;
            }
            count += 1;
        }

        if count == 0 {
            return None;
        }
        Some([
            sum[0] as f64 / count as f64,
            sum[1] as f64 / count as f64,
            sum[2] as f64 / count as f64,
        ])
    }
}

impl RegionClassifier for PaletteClassifier {
    fn classify(&self, crop: &DynamicImage) -> anyhow::Result<ScoreMap> {
        if self.temperature <= 0.0 {
            anyhow::bail!("temperature must be positive, got {}", self.temperature);
        }
        if crop.width() == 0 || crop.height() == 0 || self.top_k == 0 {
            return Ok(ScoreMap::new());
        }
        let Some(mean) = Self::mean_foreground(crop) else {
            return Ok(ScoreMap::new());
        };

        let logits: Vec<f64> = PALETTE
            .iter()
            .map(|(_, color)| {
                let d2: f64 = (0..3).map(|c| (mean[c] - color[c]).powi(2)).sum();
                -(d2.sqrt() / MAX_DISTANCE) / self.temperature
            })
            .collect();

        let max_logit = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let exps: Vec<f64> = logits.iter().map(|l| (l - max_logit).exp()).collect();
        let total: f64 = exps.iter().sum();

        let mut ranked: Vec<(&str, f64)> = PALETTE
            .iter()
            .zip(exps)
            .map(|((name, _), e)| (*name, e / total))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(self.top_k);

        Ok(ranked.into_iter().collect())
    }

    fn name(&self) -> &str {
        "Palette Classifier"
    }
}
