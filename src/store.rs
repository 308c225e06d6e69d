use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat};

use crate::config::PipelineConfig;
use crate::error::StoreError;

/// Results area for rendered crops.
///
/// Names are derived from the source image stem and the rank index, so a
/// later run on an image with the same name overwrites earlier crops.
#[derive(Debug, Clone)]
pub struct ResultsStore {
    dir: PathBuf,
    url_prefix: String,
}

impl ResultsStore {
    pub fn new(dir: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            url_prefix: url_prefix.into(),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.results_dir.clone(), config.results_url_prefix.clone())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name for the crop of segment `rank` (1-based) of `image_name`
    pub fn crop_name(image_name: &str, rank: usize) -> String {
        let stem = Path::new(image_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("image");
        format!("{}_seg{}.jpg", stem, rank)
    }

    /// Public reference for a stored file name
    pub fn reference(&self, name: &str) -> String {
        let prefix = self.url_prefix.trim_end_matches('/');
        if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", prefix, name)
        }
    }

    /// Write a crop as JPEG, overwriting any existing file, and return its reference
    pub fn persist(&self, name: &str, crop: &DynamicImage) -> Result<String, StoreError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(name);
        crop.to_rgb8().save_with_format(&path, ImageFormat::Jpeg)?;
        tracing::debug!(path = %path.display(), "crop stored");
        Ok(self.reference(name))
    }
}
