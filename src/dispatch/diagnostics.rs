//! Best-effort text sink for error descriptions.

/// Receives the human-readable text of every forwarded Error occurrence.
///
/// Called on the bus pump thread before the bus handler sees the error.
#[cfg_attr(test, mockall::automock)]
pub trait DiagnosticSink: Send + Sync {
    fn on_diagnostic(&self, message: &str);
}

impl<F> DiagnosticSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn on_diagnostic(&self, message: &str) {
        self(message)
    }
}

/// Default sink: logs through `tracing` at error level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl DiagnosticSink for TracingDiagnostics {
    fn on_diagnostic(&self, message: &str) {
        tracing::error!(target: "mediabridge_rs::diagnostics", "{}", message);
    }
}

/// Text surfaced for an error: the description, plus debug detail if wanted.
pub fn format_error(description: &str, debug: Option<&str>, include_debug: bool) -> String {
    match debug {
        Some(debug) if include_debug && !debug.is_empty() => {
            format!("{description}\nDebugging info: {debug}")
        }
        _ => description.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error() {
        assert_eq!(format_error("boom", None, true), "boom");
        assert_eq!(format_error("boom", Some("detail"), false), "boom");
        assert_eq!(
            format_error("boom", Some("detail"), true),
            "boom\nDebugging info: detail"
        );
    }

    #[test]
    fn test_closure_sink() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let sink = move |msg: &str| {
            tx.send(msg.to_string()).unwrap();
        };
        sink.on_diagnostic("hello");
        assert_eq!(rx.try_recv().unwrap(), "hello");
    }
}
