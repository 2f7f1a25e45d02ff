//! Delay policies between download attempts.
//!
//! The attempt bound lives on the [`FetchRequest`](super::FetchRequest); a
//! [`Backoff`] only decides how long to wait after a failed attempt.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use neurofetch::fetch::Backoff;
//!
//! let backoff = Backoff::linear(Duration::from_secs(5));
//! assert_eq!(backoff.delay_for_attempt(1), Duration::from_secs(5));
//! assert_eq!(backoff.delay_for_attempt(2), Duration::from_secs(10));
//! ```

use std::str::FromStr;
use std::time::Duration;

/// Default base delay for linear backoff (5 seconds).
pub const DEFAULT_BACKOFF_BASE_SECS: u64 = 5;

/// Default maximum delay for exponential backoff (5 minutes).
pub const DEFAULT_MAX_DELAY_SECS: u64 = 300;

/// Default multiplier for exponential backoff.
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// How long to sleep after a failed attempt.
///
/// Every shape is monotonically non-decreasing in the attempt number.
#[derive(Clone, Debug, PartialEq)]
pub enum Backoff {
    /// Retry immediately.
    None,

    /// Constant delay between attempts.
    Fixed {
        /// Delay after every failed attempt.
        delay: Duration,
    },

    /// `base * attempt` after the n-th failed attempt.
    Linear {
        /// Delay after the first failure.
        base: Duration,
    },

    /// `initial * multiplier^(attempt-1)`, capped at `max`.
    Exponential {
        /// Delay after the first failure.
        initial: Duration,
        /// Maximum delay cap.
        max: Duration,
        /// Multiplier applied after each failure (at least 1.0).
        multiplier: f64,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::linear(Duration::from_secs(DEFAULT_BACKOFF_BASE_SECS))
    }
}

impl Backoff {
    /// Creates a linear backoff with the given base delay.
    pub fn linear(base: Duration) -> Self {
        Self::Linear { base }
    }

    /// Creates a fixed backoff.
    pub fn fixed(delay: Duration) -> Self {
        Self::Fixed { delay }
    }

    /// Creates an exponential backoff with the default cap and multiplier.
    pub fn exponential(initial: Duration) -> Self {
        Self::Exponential {
            initial,
            max: Duration::from_secs(DEFAULT_MAX_DELAY_SECS),
            multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }

    /// Returns a copy of this policy using `base` as its base delay.
    ///
    /// `None` stays `None`.
    pub fn with_base(&self, base: Duration) -> Self {
        match self {
            Self::None => Self::None,
            Self::Fixed { .. } => Self::Fixed { delay: base },
            Self::Linear { .. } => Self::Linear { base },
            Self::Exponential {
                max, multiplier, ..
            } => Self::Exponential {
                initial: base,
                max: *max,
                multiplier: *multiplier,
            },
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        match self {
            Self::None => Duration::ZERO,
            Self::Fixed { delay } => *delay,
            Self::Linear { base } => base.saturating_mul(attempt),
            // 0 * inf would be NaN once the factor overflows.
            Self::Exponential { initial, .. } if initial.is_zero() => Duration::ZERO,
            Self::Exponential {
                initial,
                max,
                multiplier,
            } => {
                let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
                let factor = multiplier.max(1.0).powi(exponent);
                let delay_ms = initial.as_millis() as f64 * factor;
                let capped = delay_ms.min(max.as_millis() as f64);
                Duration::from_millis(capped as u64).min(*max)
            }
        }
    }

    /// Base delay (`Duration::ZERO` for `None`).
    pub fn base(&self) -> Duration {
        match self {
            Self::None => Duration::ZERO,
            Self::Fixed { delay } => *delay,
            Self::Linear { base } => *base,
            Self::Exponential { initial, .. } => *initial,
        }
    }

    /// Short name used in config files.
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Fixed { .. } => "fixed",
            Self::Linear { .. } => "linear",
            Self::Exponential { .. } => "exponential",
        }
    }
}

impl FromStr for Backoff {
    type Err = String;

    /// Parses a backoff shape name; the base delay takes the default.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let base = Duration::from_secs(DEFAULT_BACKOFF_BASE_SECS);
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "fixed" => Ok(Self::fixed(base)),
            "linear" => Ok(Self::linear(base)),
            "exponential" => Ok(Self::exponential(base)),
            other => Err(format!(
                "unknown backoff '{}' (expected none, fixed, linear or exponential)",
                other
            )),
        }
    }
}
