//! Progress reporting surface used by the workflows.

use std::sync::Arc;

/// Sink for transfer progress.
///
/// Updates may arrive from the native notification thread while the workflow
/// is blocked in a native call, so every method must be a short write.
/// Repeated values simply overwrite the previous one.
pub trait ProgressReporter: Send + Sync {
    fn start(&self, label: &str);
    /// `percent` is clamped to 0..=100 by implementations.
    fn set_percent(&self, percent: u8);
    fn set_label(&self, label: &str);
    /// Idempotent; stopping an idle reporter does nothing.
    fn stop(&self);
}

/// Reporter that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn start(&self, _label: &str) {}
    fn set_percent(&self, _percent: u8) {}
    fn set_label(&self, _label: &str) {}
    fn stop(&self) {}
}

/// Stops the reporter when dropped.
pub struct ProgressScope {
    reporter: Arc<dyn ProgressReporter>,
}

impl ProgressScope {
    pub fn start(reporter: Arc<dyn ProgressReporter>, label: &str) -> Self {
        reporter.start(label);
        Self { reporter }
    }
}

impl Drop for ProgressScope {
    fn drop(&mut self) {
        self.reporter.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl ProgressReporter for Recorder {
        fn start(&self, label: &str) {
            self.0.lock().unwrap().push(format!("start:{label}"));
        }
        fn set_percent(&self, percent: u8) {
            self.0.lock().unwrap().push(format!("percent:{percent}"));
        }
        fn set_label(&self, label: &str) {
            self.0.lock().unwrap().push(format!("label:{label}"));
        }
        fn stop(&self) {
            self.0.lock().unwrap().push("stop".to_string());
        }
    }

    #[test]
    fn test_scope_stops_reporter_on_drop() {
        let recorder = Arc::new(Recorder::default());
        let scope = ProgressScope::start(recorder.clone(), "Downloading...");
        recorder.set_percent(50);
        assert_eq!(recorder.0.lock().unwrap().len(), 2);

        drop(scope);
        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec!["start:Downloading...", "percent:50", "stop"]
        );
    }
}
