use std::collections::BTreeMap;

use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
use imageproc::region_labelling::{connected_components, Connectivity};

use crate::detection::{preprocessing, RegionProposer};
use crate::models::{Mask, Region};

type LabelImage = ImageBuffer<Luma<u32>, Vec<u32>>;

/// Weight-free region proposer.
///
/// Blurs the grayscale image, splits it at the Otsu level and labels the
/// 8-connected components of both the bright and the dark phase. Each
/// component of at least `min_area` pixels becomes a region whose quality is
/// its share of the image area. Only the `max_regions` largest components get
/// a mask; ties keep bright before dark, then label order.
#[derive(Debug, Clone)]
pub struct ComponentProposer {
    pub blur_sigma: f32,
    pub min_area: u32,
    pub max_regions: usize,
}

impl Default for ComponentProposer {
    fn default() -> Self {
        Self {
            blur_sigma: 1.5,
            min_area: 64,
            max_regions: 100,
        }
    }
}

/// A labelled component that passed the area filter
#[derive(Debug, Clone, Copy)]
struct Component {
    phase: usize,
    label: u32,
    count: u32,
}

impl ComponentProposer {
    pub fn with_min_area(mut self, min_area: u32) -> Self {
        self.min_area = min_area;
        self
    }

    pub fn with_blur_sigma(mut self, blur_sigma: f32) -> Self {
        self.blur_sigma = blur_sigma;
        self
    }

    pub fn with_max_regions(mut self, max_regions: usize) -> Self {
        self.max_regions = max_regions;
        self
    }

    /// Label the white pixels of one binary phase and keep components of at least `min_area`
    fn label_phase(&self, binary: &GrayImage, phase: usize) -> (LabelImage, Vec<Component>) {
        let labeled = connected_components(binary, Connectivity::Eight, Luma([0u8]));

        let mut counts: BTreeMap<u32, u32> = BTreeMap::new();
        for pixel in labeled.pixels() {
            let label = pixel[0];
            if label == 0 {
                continue; // background
            }
            *counts.entry(label).or_insert(0) += 1;
        }

        let components = counts
            .into_iter()
            .filter(|(_, count)| *count >= self.min_area)
            .map(|(label, count)| Component { phase, label, count })
            .collect();
        (labeled, components)
    }

    /// Keep the largest `max_regions` components, returned in phase then label order
    fn select(&self, mut components: Vec<Component>) -> Vec<Component> {
        if components.len() > self.max_regions {
            components.sort_by(|a, b| b.count.cmp(&a.count));
            components.truncate(self.max_regions);
            components.sort_by_key(|c| (c.phase, c.label));
        }
        components
    }

    /// Build one mask per selected component in a single pass over the label image
    fn materialize(labeled: &LabelImage, selected: &[Component], total_pixels: f32) -> Vec<Region> {
        if selected.is_empty() {
            return Vec::new();
        }

        let mut masks: BTreeMap<u32, Mask> = selected
            .iter()
            .map(|c| (c.label, Mask::new(labeled.width(), labeled.height())))
            .collect();

        for (x, y, pixel) in labeled.enumerate_pixels() {
            if let Some(mask) = masks.get_mut(&pixel[0]) {
                mask.set(x, y, true);
            }
        }

        selected
            .iter()
            .filter_map(|c| {
                let mask = masks.remove(&c.label)?;
                Some(Region::from_mask(mask, c.count as f32 / total_pixels))
            })
            .collect()
    }
}

impl RegionProposer for ComponentProposer {
    fn propose(&self, image: &DynamicImage) -> anyhow::Result<Vec<Region>> {
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            anyhow::bail!("cannot propose regions for an empty {}x{} image", width, height);
        }

        let gray = preprocessing::to_grayscale(image);
        let blurred = preprocessing::apply_blur(&gray, self.blur_sigma);
        let (bright, level) = preprocessing::binarize(&blurred);
        let dark = preprocessing::invert(&bright);

        let (bright_labels, bright_components) = self.label_phase(&bright, 0);
        let (dark_labels, dark_components) = self.label_phase(&dark, 1);

        let mut components = bright_components;
        components.extend(dark_components);
        let found = components.len();
        let selected = self.select(components);

        let (bright_selected, dark_selected): (Vec<Component>, Vec<Component>) =
            selected.into_iter().partition(|c| c.phase == 0);

        let total_pixels = (width as f32) * (height as f32);
        let mut regions = Self::materialize(&bright_labels, &bright_selected, total_pixels);
        regions.extend(Self::materialize(&dark_labels, &dark_selected, total_pixels));

        tracing::debug!(
            proposer = self.name(),
            level,
            found,
            regions = regions.len(),
            "components labelled"
        );

        Ok(regions)
    }

    fn name(&self) -> &str {
        "Connected Components"
    }
}
