//! Adaptive FTQ sizing controller.
//!
//! Invoked once per recovery, the controller resizes the FTQ from two
//! smoothed feedback ratios computed outside the front end:
//! - **utility:** fraction of fetched instructions that turned out useful;
//! - **timeliness:** fraction of fetched instructions fetched ahead of need.
//!
//! Each ratio yields a candidate capacity by growing or shrinking the current
//! one proportionally to its distance from a threshold. The configured mode
//! picks one candidate or blends both; the result is clamped to the
//! configured bounds.

use tracing::debug;

use crate::config::{BlendCoefficients, FtqConfig, SizingMode};

/// Feedback latched for the next sizing decision.
///
/// `adjust` is raised when fresh ratios are supplied and cleared once the
/// controller has consumed them.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SizingFeedback {
    /// Smoothed utility ratio.
    pub utility_ratio: f64,
    /// Smoothed timeliness ratio.
    pub timeliness_ratio: f64,
    /// Fresh feedback is pending.
    pub adjust: bool,
}

impl SizingFeedback {
    /// Latches new ratios for the next recovery.
    pub fn update(&mut self, utility_ratio: f64, timeliness_ratio: f64) {
        self.utility_ratio = utility_ratio;
        self.timeliness_ratio = timeliness_ratio;
        self.adjust = true;
    }
}

/// Closed-loop FTQ capacity controller.
#[derive(Clone, Debug)]
pub struct SizingController {
    mode: SizingMode,
    utility_threshold: f64,
    timeliness_threshold: f64,
    blend: BlendCoefficients,
    min_capacity: usize,
    max_capacity: usize,
}

impl SizingController {
    /// Creates a controller from the FTQ configuration.
    pub fn new(config: &FtqConfig) -> Self {
        Self {
            mode: config.sizing.mode,
            utility_threshold: config.sizing.utility_threshold,
            timeliness_threshold: config.sizing.timeliness_threshold,
            blend: config.sizing.blend,
            min_capacity: config.min_capacity,
            max_capacity: config.max_capacity,
        }
    }

    /// Active sizing mode.
    pub const fn mode(&self) -> SizingMode {
        self.mode
    }

    /// Candidate capacity from one ratio: below the threshold shrink by
    /// `round(capacity × (threshold − ratio))`, above it grow by
    /// `round(capacity × (ratio − threshold))`.
    ///
    /// The result is unclamped and may be negative.
    pub fn candidate(capacity: usize, ratio: f64, threshold: f64) -> i64 {
        let cap = capacity as f64;
        let current = capacity as i64;
        if ratio < threshold {
            current - (cap * (threshold - ratio)).round() as i64
        } else if ratio > threshold {
            current + (cap * (ratio - threshold)).round() as i64
        } else {
            current
        }
    }

    /// Quadratic blend of the utility and timeliness candidates.
    pub fn blend(&self, q_u: i64, q_t: i64) -> i64 {
        let (u, t) = (q_u as f64, q_t as f64);
        let c = &self.blend;
        (c.u * u + c.t * t + c.uu * u * u + c.tt * t * t + c.ut * u * t).round() as i64
    }

    /// Computes the capacity to use after this recovery.
    ///
    /// Returns `capacity` unchanged if sizing is disabled or no fresh
    /// feedback is pending; otherwise consumes the feedback.
    pub fn resize(&self, capacity: usize, feedback: &mut SizingFeedback) -> usize {
        if self.mode == SizingMode::Disabled || !feedback.adjust {
            return capacity;
        }
        feedback.adjust = false;

        let q_u = || Self::candidate(capacity, feedback.utility_ratio, self.utility_threshold);
        let q_t = || {
            Self::candidate(
                capacity,
                feedback.timeliness_ratio,
                self.timeliness_threshold,
            )
        };
        let raw = match self.mode {
            SizingMode::Disabled => capacity as i64,
            SizingMode::Utility => q_u(),
            SizingMode::Timeliness => q_t(),
            SizingMode::Combined => self.blend(q_u(), q_t()),
        };
        let resized = self.clamp(raw);

        debug!(
            mode = ?self.mode,
            utility = feedback.utility_ratio,
            timeliness = feedback.timeliness_ratio,
            old = capacity,
            new = resized,
            "FTQ resized"
        );
        resized
    }

    fn clamp(&self, raw: i64) -> usize {
        raw.clamp(self.min_capacity as i64, self.max_capacity as i64) as usize
    }
}
