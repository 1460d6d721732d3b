//! Progress reporting.

/// Upper end of the progress scale.
pub const PROGRESS_MAX: u16 = 1000;

/// Receives progress milestones as a value in `[0, PROGRESS_MAX]` and a status line.
///
/// Any `FnMut(u16, &str)` closure is a sink.
pub trait ProgressSink {
    fn report(&mut self, progress: u16, status: &str);
}

impl<F> ProgressSink for F
where
    F: FnMut(u16, &str),
{
    fn report(&mut self, progress: u16, status: &str) {
        self(progress, status)
    }
}

/// Discards every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _progress: u16, _status: &str) {}
}

/// Forwards reports to a sink, never letting the value decrease or exceed the maximum.
pub(crate) struct Progress<'a> {
    sink: &'a mut dyn ProgressSink,
    last: u16,
}

impl<'a> Progress<'a> {
    pub(crate) fn new(sink: &'a mut dyn ProgressSink) -> Self {
        Self { sink, last: 0 }
    }

    pub(crate) fn report(&mut self, value: u16, status: &str) {
        let value = value.clamp(self.last, PROGRESS_MAX);
        self.last = value;
        tracing::debug!(progress = value, "{status}");
        self.sink.report(value, status);
    }

    /// Reports `fraction` of the way from `from` to `to`.
    pub(crate) fn report_between(&mut self, from: u16, to: u16, fraction: f64, status: &str) {
        let span = f64::from(to.saturating_sub(from));
        let value = f64::from(from) + span * fraction.clamp(0.0, 1.0);
        self.report(value.round() as u16, status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_is_monotonic_and_capped() {
        let mut seen = Vec::new();
        let mut sink = |p: u16, _: &str| seen.push(p);
        {
            let mut progress = Progress::new(&mut sink);
            progress.report(100, "a");
            progress.report(50, "b");
            progress.report_between(300, 700, 0.5, "c");
            progress.report(2000, "d");
        }
        assert_eq!(seen, vec![100, 100, 500, 1000]);
    }
}
