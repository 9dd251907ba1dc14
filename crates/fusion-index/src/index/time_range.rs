//! Time-range descriptors and NaN handling hints for index queries.

use crate::error::{IndexError, Result};
use std::fmt;
use std::str::FromStr;

/// How a time-range query treats entries without a P1 time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NanHint {
    /// Keep NaN entries that lie between the matched start and stop positions.
    ///
    /// This is positional: a NaN entry is returned because of where it sits
    /// in the file, not because its time falls inside the interval.
    #[default]
    IncludeNans,
    /// Return every NaN entry in the index, inside the matched range or not.
    AllNans,
    /// Return only entries that have a valid time.
    RemoveNans,
}

impl NanHint {
    /// Returns the canonical name of the hint.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::IncludeNans => "include_nans",
            Self::AllNans => "all_nans",
            Self::RemoveNans => "remove_nans",
        }
    }
}

impl FromStr for NanHint {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "include_nans" => Ok(Self::IncludeNans),
            "all_nans" => Ok(Self::AllNans),
            "remove_nans" => Ok(Self::RemoveNans),
            other => Err(IndexError::InvalidArgument(format!(
                "Unrecognized NaN hint '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for NanHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A time window given either in absolute P1 time or relative to a reference.
///
/// # Examples
/// ```rust,ignore
/// use fusion_index::index::TimeRange;
///
/// // The first 30 seconds of the log.
/// let head = TimeRange::relative(None, Some(30.0));
///
/// // An absolute window of P1 time.
/// let window = TimeRange::absolute(Some(1_000.0), Some(1_060.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TimeRange {
    /// Start of the window (inclusive), or unbounded.
    pub start: Option<f64>,
    /// End of the window (exclusive), or unbounded.
    pub end: Option<f64>,
    /// If true, `start`/`end` are P1 times; otherwise offsets from a reference.
    pub absolute: bool,
    /// Reference P1 time for relative windows. Defaults to the index's `t0`.
    pub p1_t0: Option<f64>,
}

impl TimeRange {
    /// Creates a window in absolute P1 time.
    pub fn absolute(start: Option<f64>, end: Option<f64>) -> Self {
        Self {
            start,
            end,
            absolute: true,
            p1_t0: None,
        }
    }

    /// Creates a window relative to the index's first valid time.
    pub fn relative(start: Option<f64>, end: Option<f64>) -> Self {
        Self {
            start,
            end,
            absolute: false,
            p1_t0: None,
        }
    }

    /// Sets an explicit reference time for a relative window.
    pub fn with_p1_t0(mut self, p1_t0: f64) -> Self {
        self.p1_t0 = Some(p1_t0);
        self
    }

    /// Returns true if neither bound is set.
    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Resolves the window to absolute `(start, stop)` bounds.
    ///
    /// `default_t0` is used for relative windows without an explicit `p1_t0`.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::InvalidArgument` if a relative bound is set but no
    /// reference time is available.
    pub fn resolve(&self, default_t0: Option<f64>) -> Result<(Option<f64>, Option<f64>)> {
        if self.absolute || self.is_unbounded() {
            return Ok((self.start, self.end));
        }

        let t0 = self.p1_t0.or(default_t0).ok_or_else(|| {
            IndexError::InvalidArgument(
                "Relative time range requires a reference P1 time".to_string(),
            )
        })?;
        Ok((self.start.map(|s| s + t0), self.end.map(|e| e + t0)))
    }
}
