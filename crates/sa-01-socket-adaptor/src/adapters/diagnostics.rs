//! Diagnostic sinks.

use parking_lot::Mutex;
use tracing::{error, warn};

use crate::domain::ErrorClass;
use crate::ports::{Diagnostic, DiagnosticSink};

/// Default sink: one log line per diagnostic.
///
/// Resource exhaustion is an error since the system cannot reach the
/// requested mode until it clears; everything else is a warning.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl DiagnosticSink for TracingDiagnostics {
    fn report(&self, diagnostic: Diagnostic) {
        match &diagnostic {
            Diagnostic::ApiRejected { api, error } => {
                warn!(api, %error, class = ?error.class(), "[sa-01] request rejected");
            }
            Diagnostic::ResourceExhausted {
                group,
                connection,
                error,
            } => {
                error!(%group, ?connection, %error, class = ?ErrorClass::ResourceExhaustion, "[sa-01] transport resources exhausted");
            }
            Diagnostic::ModeQueueOverflow { connection } => {
                warn!(%connection, class = ?ErrorClass::QueueOverflow, "[sa-01] mode queue overflow");
            }
        }
    }
}

/// Sink that keeps every diagnostic for later inspection.
#[derive(Debug, Default)]
pub struct CollectingDiagnostics {
    reports: Mutex<Vec<Diagnostic>>,
}

impl CollectingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<Diagnostic> {
        self.reports.lock().clone()
    }

    pub fn count_class(&self, class: ErrorClass) -> usize {
        self.reports
            .lock()
            .iter()
            .filter(|d| d.class() == class)
            .count()
    }
}

impl DiagnosticSink for CollectingDiagnostics {
    fn report(&self, diagnostic: Diagnostic) {
        self.reports.lock().push(diagnostic);
    }
}
