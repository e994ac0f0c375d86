//! Progress accounting for document ingestion.
//!
//! Ingestion runs in two phases. Reading the source covers the fraction
//! range `[0, READ_PHASE_CEILING]`; page extraction covers the rest, ending
//! at exactly `1.0`.

use std::fmt;

/// Share of the overall progress reserved for reading the source.
pub const READ_PHASE_CEILING: f64 = 0.5;

/// A progress value in the range `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Progress(f64);

impl Progress {
    /// Nothing done yet.
    pub const START: Self = Self(0.0);

    /// Everything done.
    pub const DONE: Self = Self(1.0);

    /// Creates a progress value, clamping into `[0.0, 1.0]`.
    #[must_use]
    pub fn new(fraction: f64) -> Self {
        Self(fraction.clamp(0.0, 1.0))
    }

    /// Progress after `done` of `total` chunks have been read.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn reading(done: usize, total: usize) -> Self {
        if total == 0 {
            return Self(READ_PHASE_CEILING);
        }
        Self::new(READ_PHASE_CEILING * (done as f64 / total as f64))
    }

    /// Progress after `done` of `total` pages have been extracted.
    #[must_use]
    pub fn extracting(done: u32, total: u32) -> Self {
        if total == 0 || done >= total {
            return Self::DONE;
        }
        let extract_share = 1.0 - READ_PHASE_CEILING;
        Self::new(READ_PHASE_CEILING + extract_share * (f64::from(done) / f64::from(total)))
    }

    /// Progress as a fraction in `[0.0, 1.0]`.
    #[must_use]
    pub const fn fraction(self) -> f64 {
        self.0
    }

    /// Progress as a percentage in `[0.0, 100.0]`.
    #[must_use]
    pub fn percent(self) -> f64 {
        self.0 * 100.0
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.0}%", self.percent())
    }
}

/// Receives progress reports during ingestion.
///
/// Reports arrive in increasing chunk, then page, order. Closures taking a
/// [`Progress`] implement this trait.
///
/// # Examples
///
/// ```
/// use docchat::core::{Progress, ProgressObserver};
/// use std::sync::Mutex;
///
/// let seen = Mutex::new(Vec::new());
/// let observer = |p: Progress| seen.lock().unwrap().push(p.percent());
/// observer.on_progress(Progress::DONE);
/// assert_eq!(*seen.lock().unwrap(), vec![100.0]);
/// ```
pub trait ProgressObserver: Send + Sync {
    /// Called after each chunk read and each page extracted.
    fn on_progress(&self, progress: Progress);
}

impl<F> ProgressObserver for F
where
    F: Fn(Progress) + Send + Sync,
{
    fn on_progress(&self, progress: Progress) {
        self(progress);
    }
}

/// Observer that ignores every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_progress(&self, _progress: Progress) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_phase_bounds() {
        assert!((Progress::reading(0, 4).fraction() - 0.0).abs() < f64::EPSILON);
        assert!((Progress::reading(2, 4).fraction() - 0.25).abs() < f64::EPSILON);
        assert!((Progress::reading(4, 4).fraction() - READ_PHASE_CEILING).abs() < f64::EPSILON);
        assert!((Progress::reading(0, 0).fraction() - READ_PHASE_CEILING).abs() < f64::EPSILON);
    }

    #[test]
    fn test_extracting_phase_bounds() {
        assert!((Progress::extracting(0, 2).fraction() - 0.5).abs() < f64::EPSILON);
        assert!((Progress::extracting(1, 2).fraction() - 0.75).abs() < f64::EPSILON);
        assert_eq!(Progress::extracting(3, 3), Progress::DONE);
        assert_eq!(Progress::extracting(3, 3).percent(), 100.0);
    }

    #[test]
    fn test_clamping() {
        assert_eq!(Progress::new(1.7), Progress::DONE);
        assert_eq!(Progress::new(-0.2), Progress::START);
    }

    #[test]
    fn test_display() {
        assert_eq!(Progress::new(0.5).to_string(), "50%");
        assert_eq!(Progress::DONE.to_string(), "100%");
    }

    #[test]
    fn test_no_progress_is_silent() {
        NoProgress.on_progress(Progress::DONE);
    }
}
