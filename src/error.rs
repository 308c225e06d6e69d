use thiserror::Error;

/// Fatal pipeline failures. A run that returns one of these produced no result.
///
/// Per-region classification and mapping failures are not represented here:
/// they are absorbed into the affected record and logged.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The input could not be opened or decoded
    #[error("failed to read image {name}: {source}")]
    ImageRead {
        name: String,
        #[source]
        source: ImageReadError,
    },

    #[error("region proposal failed: {0}")]
    Proposal(#[source] anyhow::Error),

    #[error("failed to render crop for segment {rank}: {source}")]
    Render {
        rank: usize,
        #[source]
        source: RenderError,
    },

    #[error("failed to store crop {name}: {source}")]
    Store {
        name: String,
        #[source]
        source: StoreError,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl PipelineError {
    pub fn is_image_read(&self) -> bool {
        matches!(self, Self::ImageRead { .. })
    }
}

/// Why an input image could not be read
#[derive(Debug, Error)]
pub enum ImageReadError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Decode(#[from] image::ImageError),
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("mask is {mask_width}x{mask_height} but image is {image_width}x{image_height}")]
    MaskMismatch {
        mask_width: u32,
        mask_height: u32,
        image_width: u32,
        image_height: u32,
    },

    #[error("box ({x1}, {y1}, {x2}, {y2}) is outside the {width}x{height} image")]
    BoxOutOfBounds {
        x1: u32,
        y1: u32,
        x2: u32,
        y2: u32,
        width: u32,
        height: u32,
    },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("results directory unavailable: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode crop: {0}")]
    Encode(#[from] image::ImageError),
}
