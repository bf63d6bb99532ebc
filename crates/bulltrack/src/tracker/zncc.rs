//! Zero-mean normalized cross-correlation and the windowed exhaustive search.

use super::luma::GrayPatch;

/// Reference patch with its cached statistics.
#[derive(Debug, Clone)]
pub struct Template {
    patch: GrayPatch,
    mean: f64,
    /// `‖t − t̄‖₂ + eps`.
    norm: f64,
}

impl Template {
    pub(crate) fn new(patch: GrayPatch, eps: f64) -> Self {
        let n = patch.data().len().max(1) as f64;
        let mean = patch.data().iter().map(|&v| v as f64).sum::<f64>() / n;
        let ss: f64 = patch
            .data()
            .iter()
            .map(|&v| {
                let d = v as f64 - mean;
                d * d
            })
            .sum();
        Self {
            patch,
            mean,
            norm: ss.sqrt() + eps,
        }
    }

    pub fn width(&self) -> usize {
        self.patch.width()
    }

    pub fn height(&self) -> usize {
        self.patch.height()
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Zero-mean L2 norm including the regularizer.
    pub fn norm(&self) -> f64 {
        self.norm
    }

    pub fn patch(&self) -> &GrayPatch {
        &self.patch
    }
}

/// ZNCC between `template` and the same-sized block of `region` whose
/// top-left corner is `(ox, oy)`.
pub(crate) fn zncc_at(
    region: &GrayPatch,
    ox: usize,
    oy: usize,
    template: &Template,
    eps: f64,
) -> f64 {
    let tw = template.width();
    let th = template.height();
    let n = (tw * th).max(1) as f64;

    let mut sum = 0.0f64;
    for y in 0..th {
        sum += region.row(oy + y, ox, tw).iter().map(|&v| v as f64).sum::<f64>();
    }
    let g_mean = sum / n;

    let t_mean = template.mean();
    let mut dot = 0.0f64;
    let mut g_ss = 0.0f64;
    for y in 0..th {
        let g_row = region.row(oy + y, ox, tw);
        let t_row = template.patch().row(y, 0, tw);
        for (&g, &t) in g_row.iter().zip(t_row) {
            let gv = g as f64 - g_mean;
            let tv = t as f64 - t_mean;
            g_ss += gv * gv;
            dot += gv * tv;
        }
    }

    dot / ((g_ss.sqrt() + eps) * template.norm())
}

/// Best match inside `region`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SearchHit {
    /// Top-left offset inside the region.
    pub x: usize,
    pub y: usize,
    pub score: f64,
    pub n_candidates: usize,
}

/// Exhaustive search over every `stride`-th top-left offset of `region`.
///
/// Scan order is row-major (ascending y, then x) and only a strictly larger
/// score replaces the current best, so ties resolve to the first offset
/// visited. NaN scores never win.
pub(crate) fn search(
    region: &GrayPatch,
    template: &Template,
    stride: usize,
    eps: f64,
) -> Option<SearchHit> {
    let tw = template.width();
    let th = template.height();
    if tw == 0 || th == 0 || region.width() < tw || region.height() < th {
        return None;
    }
    let stride = stride.max(1);
    let max_x = region.width() - tw;
    let max_y = region.height() - th;

    let mut best: Option<SearchHit> = None;
    let mut n_candidates = 0usize;
    for y in (0..=max_y).step_by(stride) {
        for x in (0..=max_x).step_by(stride) {
            let score = zncc_at(region, x, y, template, eps);
            n_candidates += 1;
            let better = match best {
                None => !score.is_nan(),
                Some(b) => score > b.score,
            };
            if better {
                best = Some(SearchHit {
                    x,
                    y,
                    score,
                    n_candidates: 0,
                });
            }
        }
    }

    best.map(|b| SearchHit { n_candidates, ..b })
}
