use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};

/// Boolean per-pixel membership field with the same extent as its source image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    bits: Vec<bool>,
}

impl Mask {
    /// Create an all-false mask
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            bits: vec![false; (width as usize) * (height as usize)],
        }
    }

    /// Create a mask from a per-pixel predicate
    pub fn from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> bool) -> Self {
        let mut mask = Self::new(width, height);
        for y in 0..height {
            for x in 0..width {
                if f(x, y) {
                    mask.set(x, y, true);
                }
            }
        }
        mask
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Out-of-range coordinates read as false
    pub fn get(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.bits[self.index(x, y)]
    }

    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        if x < self.width && y < self.height {
            let idx = self.index(x, y);
            self.bits[idx] = value;
        }
    }

    /// Number of true pixels
    pub fn count(&self) -> usize {
        self.bits.iter().filter(|b| **b).count()
    }

    /// Tight half-open bounding rectangle of the true pixels.
    /// An empty mask yields the degenerate box at the origin.
    pub fn bounding_box(&self) -> RegionBox {
        let mut min_x = u32::MAX;
        let mut min_y = u32::MAX;
        let mut max_x = 0;
        let mut max_y = 0;
        let mut any = false;

        for y in 0..self.height {
            for x in 0..self.width {
                if self.bits[self.index(x, y)] {
                    any = true;
                    min_x = min_x.min(x);
                    min_y = min_y.min(y);
                    max_x = max_x.max(x);
                    max_y = max_y.max(y);
                }
            }
        }

        if !any {
            return RegionBox::default();
        }

        RegionBox {
            x1: min_x,
            y1: min_y,
            x2: max_x + 1,
            y2: max_y + 1,
        }
    }

    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.width as usize) + (x as usize)
    }
}

/// Integer rectangle, half-open on the high end: `[x1, x2) x [y1, y2)`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegionBox {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl RegionBox {
    pub fn width(&self) -> u32 {
        self.x2.saturating_sub(self.x1)
    }

    pub fn height(&self) -> u32 {
        self.y2.saturating_sub(self.y1)
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.area() == 0
    }
}

/// A proposed object segment
#[derive(Debug, Clone)]
pub struct Region {
    pub mask: Mask,
    pub bbox: RegionBox,
    /// Only used for ranking; higher is better
    pub quality: f32,
}

impl Region {
    /// Build a region whose box is derived from the mask
    pub fn from_mask(mask: Mask, quality: f32) -> Self {
        let bbox = mask.bounding_box();
        Self {
            mask,
            bbox,
            quality,
        }
    }
}

/// A region that survived ranking, with its 1-based position
#[derive(Debug, Clone)]
pub struct RankedRegion {
    pub rank: usize,
    pub region: Region,
}

/// Ordered label to score mapping.
///
/// Keeps the producer's ordering, which matters for tie-breaking: `top()`
/// returns the first entry holding the maximum value. Serializes as a JSON
/// object in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreMap {
    entries: Vec<(String, f64)>,
}

impl ScoreMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a score. Replacing keeps the original position.
    pub fn insert(&mut self, label: impl Into<String>, score: f64) {
        let label = label.into();
        match self.entries.iter_mut().find(|(l, _)| *l == label) {
            Some(entry) => entry.1 = score,
            None => self.entries.push((label, score)),
        }
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, s)| *s)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(l, s)| (l.as_str(), *s))
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(l, _)| l.as_str())
    }

    /// Highest-scoring entry, first seen wins on ties. NaN never wins.
    pub fn top(&self) -> Option<(&str, f64)> {
        let mut best: Option<(&str, f64)> = None;
        for (label, score) in self.iter() {
            if score.is_nan() {
                continue;
            }
            match best {
                Some((_, s)) if score <= s => {}
                _ => best = Some((label, score)),
            }
        }
        best
    }

    /// Entries sorted by score descending, ties keep insertion order
    pub fn sorted_desc(&self) -> Vec<(&str, f64)> {
        let mut items: Vec<(&str, f64)> = self.iter().collect();
        items.sort_by(|a, b| b.1.total_cmp(&a.1));
        items
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for ScoreMap {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut map = ScoreMap::new();
        for (label, score) in iter {
            map.insert(label, score);
        }
        map
    }
}

impl Serialize for ScoreMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, score) in &self.entries {
            map.serialize_entry(label, score)?;
        }
        map.end()
    }
}

/// Outcome of the confidence gate
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappingDecision {
    /// `None` means not confident enough to remap
    pub mapped_label: Option<String>,
    pub scores: ScoreMap,
}

impl MappingDecision {
    pub fn rejected(scores: ScoreMap) -> Self {
        Self {
            mapped_label: None,
            scores,
        }
    }
}

/// Per-region output unit
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentRecord {
    pub bbox: RegionBox,
    pub score: f32,
    /// Public reference to the persisted crop; absent for empty crops
    pub crop_path: Option<String>,
    pub label: Option<String>,
    pub mapped_label: Option<String>,
    pub classification: ScoreMap,
    pub semantic_scores: ScoreMap,
}

struct ScoredBox<'a> {
    bbox: &'a RegionBox,
    score: f32,
}

impl Serialize for ScoredBox<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("SegmentBox", 5)?;
        s.serialize_field("x1", &self.bbox.x1)?;
        s.serialize_field("y1", &self.bbox.y1)?;
        s.serialize_field("x2", &self.bbox.x2)?;
        s.serialize_field("y2", &self.bbox.y2)?;
        s.serialize_field("score", &self.score)?;
        s.end()
    }
}

impl Serialize for SegmentRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("SegmentRecord", 6)?;
        s.serialize_field(
            "box",
            &ScoredBox {
                bbox: &self.bbox,
                score: self.score,
            },
        )?;
        s.serialize_field("crop_path", &self.crop_path)?;
        s.serialize_field("label", &self.label)?;
        s.serialize_field("mapped_label", &self.mapped_label)?;
        s.serialize_field("classification", &self.classification)?;
        s.serialize_field("semantic_scores", &self.semantic_scores)?;
        s.end()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    /// Regions proposed, before truncation
    pub detected: usize,
    /// Records returned, after truncation
    pub returned: usize,
}

/// Everything one pipeline invocation produces
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineResult {
    pub image_name: String,
    /// Rank order, descending quality
    pub segments: Vec<SegmentRecord>,
    /// The candidate labels actually used for mapping
    pub candidate_labels: Vec<String>,
    pub totals: Totals,
}
