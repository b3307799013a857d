//! Local-feature matching used to find pages that look like a screenshot.
//!
//! ## Pipeline
//!
//! ```text
//! image ─▶ grey [0,1] ─▶ pyramid (≤3 octaves) ─▶ Harris corners + NMS
//!       ─▶ 16×16 patch ─▶ 4×4 cells × 8 orientation bins = 128-d descriptor
//! ```
//!
//! Two descriptor sets are compared with brute-force nearest neighbours and
//! the distance-ratio test: a correspondence counts only when the nearest
//! descriptor is clearly closer than the second nearest. A page is judged a
//! match when the count is strictly greater than the configured threshold.
//!
//! Descriptors are not rotation-normalised. Pages and screenshots of pages
//! are upright, and skipping orientation assignment keeps identical rasters
//! bit-identical in descriptor space.

use crate::config::EngineConfig;
use image::{DynamicImage, GrayImage};
use serde::{Deserialize, Serialize};

/// Length of one descriptor vector.
pub const DESCRIPTOR_LEN: usize = 128;

const PATCH_RADIUS: usize = 8;
const CELL: usize = 4;
const BINS: usize = 8;
const HARRIS_K: f32 = 0.04;
const HARRIS_WINDOW_RADIUS: usize = 2;
const RELATIVE_RESPONSE: f32 = 0.01;
const MIN_RESPONSE: f32 = 1e-4;
const MAX_OCTAVES: usize = 3;
const MIN_OCTAVE_SIDE: usize = 32;

/// Location of a feature in the coordinates of the original image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    /// Pyramid octave the feature was found in (0 = full resolution).
    pub octave: u8,
    pub response: f32,
}

/// A keypoint with its descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub keypoint: Keypoint,
    pub descriptor: [f32; DESCRIPTOR_LEN],
}

/// All features extracted from one image.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DescriptorSet {
    pub features: Vec<Feature>,
}

impl DescriptorSet {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Per-page outcome of the page-delete handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    /// 1-based page number.
    pub page: usize,
    pub delete: bool,
    /// Accepted correspondences behind the decision.
    pub matches: usize,
}

/// Extracts descriptors and applies the ratio test and decision rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DescriptorMatcher {
    pub ratio: f32,
    pub threshold: usize,
    pub max_keypoints: usize,
}

impl Default for DescriptorMatcher {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl DescriptorMatcher {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            ratio: config.match_ratio,
            threshold: config.match_threshold,
            max_keypoints: config.max_keypoints,
        }
    }

    pub fn extract(&self, image: &DynamicImage) -> DescriptorSet {
        extract_descriptors(image, self.max_keypoints)
    }

    pub fn score(&self, a: &DescriptorSet, b: &DescriptorSet) -> usize {
        score(a, b, self.ratio)
    }

    /// Decide whether `candidate` (page `page`, 1-based) matches `target`.
    ///
    /// An empty descriptor set on either side is never a match.
    pub fn decide(&self, target: &DescriptorSet, candidate: &DescriptorSet, page: usize) -> MatchResult {
        if target.is_empty() || candidate.is_empty() {
            return MatchResult {
                page,
                delete: false,
                matches: 0,
            };
        }
        let matches = self.score(target, candidate);
        MatchResult {
            page,
            delete: matches > self.threshold,
            matches,
        }
    }
}

/// Extract up to `max_keypoints` features, strongest corners first.
///
/// A blank or uniform image yields an empty set.
pub fn extract_descriptors(image: &DynamicImage, max_keypoints: usize) -> DescriptorSet {
    let base = Plane::from_luma(&image.to_luma8());

    let mut candidates: Vec<(Keypoint, usize, usize, usize)> = Vec::new();
    let mut octaves: Vec<Plane> = Vec::new();
    let mut level = base;

    for octave in 0..MAX_OCTAVES {
        if level.w < MIN_OCTAVE_SIDE || level.h < MIN_OCTAVE_SIDE {
            break;
        }
        let smooth = level.blur();
        let scale = (1usize << octave) as f32;
        for (x, y, response) in harris_corners(&smooth) {
            candidates.push((
                Keypoint {
                    x: x as f32 * scale,
                    y: y as f32 * scale,
                    octave: octave as u8,
                    response,
                },
                octave,
                x,
                y,
            ));
        }
        let next = level.half();
        octaves.push(smooth);
        level = next;
    }

    candidates.sort_by(|a, b| {
        b.0.response
            .total_cmp(&a.0.response)
            .then(a.1.cmp(&b.1))
            .then(a.3.cmp(&b.3))
            .then(a.2.cmp(&b.2))
    });

    let features = candidates
        .into_iter()
        .filter_map(|(keypoint, octave, x, y)| {
            describe(&octaves[octave], x, y).map(|descriptor| Feature {
                keypoint,
                descriptor,
            })
        })
        .take(max_keypoints)
        .collect();

    DescriptorSet { features }
}

/// Count correspondences from `a` into `b` that pass the ratio test.
///
/// Each descriptor of `a` is compared with its two nearest neighbours in `b`;
/// it is accepted when `nearest < ratio * second_nearest`. With fewer than two
/// descriptors in `b` there is no second neighbour and nothing is accepted.
pub fn score(a: &DescriptorSet, b: &DescriptorSet, ratio: f32) -> usize {
    if a.is_empty() || b.len() < 2 {
        return 0;
    }
    let ratio_sq = ratio * ratio;

    a.features
        .iter()
        .filter(|fa| {
            let mut best = f32::INFINITY;
            let mut second = f32::INFINITY;
            for fb in &b.features {
                let d = squared_distance(&fa.descriptor, &fb.descriptor);
                if d < best {
                    second = best;
                    best = d;
                } else if d < second {
                    second = d;
                }
            }
            best < ratio_sq * second
        })
        .count()
}

fn squared_distance(a: &[f32; DESCRIPTOR_LEN], b: &[f32; DESCRIPTOR_LEN]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

// ── Image plane helpers ──────────────────────────────────────────────────────

/// Row-major single-channel f32 image.
struct Plane {
    w: usize,
    h: usize,
    data: Vec<f32>,
}

impl Plane {
    fn from_luma(img: &GrayImage) -> Self {
        let (w, h) = img.dimensions();
        Self {
            w: w as usize,
            h: h as usize,
            data: img.as_raw().iter().map(|&v| v as f32 / 255.0).collect(),
        }
    }

    fn filled(w: usize, h: usize) -> Self {
        Self {
            w,
            h,
            data: vec![0.0; w * h],
        }
    }

    #[inline]
    fn at(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.w + x]
    }

    #[inline]
    fn clamped(&self, x: isize, y: isize) -> f32 {
        let x = x.clamp(0, self.w as isize - 1) as usize;
        let y = y.clamp(0, self.h as isize - 1) as usize;
        self.at(x, y)
    }

    /// Separable [1 2 1] / 4 smoothing with clamped edges.
    fn blur(&self) -> Plane {
        let mut tmp = Plane::filled(self.w, self.h);
        for y in 0..self.h {
            for x in 0..self.w {
                let (xi, yi) = (x as isize, y as isize);
                tmp.data[y * self.w + x] = (self.clamped(xi - 1, yi)
                    + 2.0 * self.at(x, y)
                    + self.clamped(xi + 1, yi))
                    * 0.25;
            }
        }
        let mut out = Plane::filled(self.w, self.h);
        for y in 0..self.h {
            for x in 0..self.w {
                let (xi, yi) = (x as isize, y as isize);
                out.data[y * self.w + x] = (tmp.clamped(xi, yi - 1)
                    + 2.0 * tmp.at(x, y)
                    + tmp.clamped(xi, yi + 1))
                    * 0.25;
            }
        }
        out
    }

    /// 2×2 average downsample.
    fn half(&self) -> Plane {
        let (w, h) = (self.w / 2, self.h / 2);
        let mut out = Plane::filled(w, h);
        for y in 0..h {
            for x in 0..w {
                out.data[y * w + x] = (self.at(2 * x, 2 * y)
                    + self.at(2 * x + 1, 2 * y)
                    + self.at(2 * x, 2 * y + 1)
                    + self.at(2 * x + 1, 2 * y + 1))
                    * 0.25;
            }
        }
        out
    }

    /// Sum over a (2r+1)² window with clamped edges.
    fn box_sum(&self, r: usize) -> Plane {
        let r = r as isize;
        let mut tmp = Plane::filled(self.w, self.h);
        for y in 0..self.h {
            for x in 0..self.w {
                let mut s = 0.0;
                for dx in -r..=r {
                    s += self.clamped(x as isize + dx, y as isize);
                }
                tmp.data[y * self.w + x] = s;
            }
        }
        let mut out = Plane::filled(self.w, self.h);
        for y in 0..self.h {
            for x in 0..self.w {
                let mut s = 0.0;
                for dy in -r..=r {
                    s += tmp.clamped(x as isize, y as isize + dy);
                }
                out.data[y * self.w + x] = s;
            }
        }
        out
    }

    /// Central-difference gradient at an interior pixel.
    #[inline]
    fn gradient(&self, x: usize, y: usize) -> (f32, f32) {
        let gx = (self.at(x + 1, y) - self.at(x - 1, y)) * 0.5;
        let gy = (self.at(x, y + 1) - self.at(x, y - 1)) * 0.5;
        (gx, gy)
    }
}

/// Harris corners with 3×3 non-maximum suppression.
///
/// Only positions whose full descriptor patch fits inside the plane are
/// returned.
fn harris_corners(p: &Plane) -> Vec<(usize, usize, f32)> {
    let mut ixx = Plane::filled(p.w, p.h);
    let mut iyy = Plane::filled(p.w, p.h);
    let mut ixy = Plane::filled(p.w, p.h);
    for y in 1..p.h - 1 {
        for x in 1..p.w - 1 {
            let (gx, gy) = p.gradient(x, y);
            let i = y * p.w + x;
            ixx.data[i] = gx * gx;
            iyy.data[i] = gy * gy;
            ixy.data[i] = gx * gy;
        }
    }
    let sxx = ixx.box_sum(HARRIS_WINDOW_RADIUS);
    let syy = iyy.box_sum(HARRIS_WINDOW_RADIUS);
    let sxy = ixy.box_sum(HARRIS_WINDOW_RADIUS);

    let mut response = Plane::filled(p.w, p.h);
    let mut max_r = 0.0f32;
    for i in 0..response.data.len() {
        let det = sxx.data[i] * syy.data[i] - sxy.data[i] * sxy.data[i];
        let trace = sxx.data[i] + syy.data[i];
        let r = det - HARRIS_K * trace * trace;
        response.data[i] = r;
        max_r = max_r.max(r);
    }

    let threshold = (max_r * RELATIVE_RESPONSE).max(MIN_RESPONSE);
    let border = PATCH_RADIUS + 1;
    if p.w <= 2 * border || p.h <= 2 * border {
        return Vec::new();
    }

    let mut corners = Vec::new();
    for y in border..p.h - border {
        for x in border..p.w - border {
            let r = response.at(x, y);
            if r <= threshold {
                continue;
            }
            let mut is_peak = true;
            'nms: for dy in -1isize..=1 {
                for dx in -1isize..=1 {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let n = response.at((x as isize + dx) as usize, (y as isize + dy) as usize);
                    // Plateaus keep only their first pixel in raster order.
                    let earlier = dy < 0 || (dy == 0 && dx < 0);
                    if n > r || (earlier && n == r) {
                        is_peak = false;
                        break 'nms;
                    }
                }
            }
            if is_peak {
                corners.push((x, y, r));
            }
        }
    }
    corners
}

/// Gradient-orientation histogram descriptor around (x, y).
///
/// Returns `None` for a flat patch (zero gradient energy).
fn describe(p: &Plane, x: usize, y: usize) -> Option<[f32; DESCRIPTOR_LEN]> {
    let mut desc = [0.0f32; DESCRIPTOR_LEN];
    let cells_per_row = (2 * PATCH_RADIUS) / CELL;

    for py in 0..2 * PATCH_RADIUS {
        for px in 0..2 * PATCH_RADIUS {
            let sx = x + px - PATCH_RADIUS;
            let sy = y + py - PATCH_RADIUS;
            let (gx, gy) = p.gradient(sx, sy);
            let magnitude = (gx * gx + gy * gy).sqrt();
            if magnitude == 0.0 {
                continue;
            }
            let angle = gy.atan2(gx) + std::f32::consts::PI;
            let bin = ((angle / (2.0 * std::f32::consts::PI)) * BINS as f32) as usize % BINS;
            let cell = (py / CELL) * cells_per_row + (px / CELL);
            desc[cell * BINS + bin] += magnitude;
        }
    }

    if !normalise(&mut desc) {
        return None;
    }
    // Clamp dominant gradients so one strong edge cannot swamp the vector.
    for v in desc.iter_mut() {
        *v = v.min(0.2);
    }
    if !normalise(&mut desc) {
        return None;
    }
    Some(desc)
}

fn normalise(v: &mut [f32; DESCRIPTOR_LEN]) -> bool {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm < 1e-6 {
        return false;
    }
    v.iter_mut().for_each(|x| *x /= norm);
    true
}
