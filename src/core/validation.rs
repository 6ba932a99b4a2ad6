//! Validation findings attached to steps and build outcomes

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};

/// How serious a validation finding is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => f.write_str("info"),
            Severity::Warning => f.write_str("warning"),
            Severity::Error => f.write_str("error"),
        }
    }
}

/// A user-triggerable fix for a finding
#[derive(Clone)]
struct Remediation {
    label: String,
    action: Arc<dyn Fn() + Send + Sync>,
}

/// One issue found about a step or a built target.
///
/// Immutable once created: a validation pass clears the owning list and
/// repopulates it with fresh values rather than mutating old ones.
#[derive(Clone)]
pub struct ValidationResult {
    severity: Severity,
    message: String,
    remediation: Option<Remediation>,
}

impl ValidationResult {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            remediation: None,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    /// Attach a zero-argument fix action with a button-style label
    pub fn with_fix<F>(mut self, label: impl Into<String>, action: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.remediation = Some(Remediation {
            label: label.into(),
            action: Arc::new(action),
        });
        self
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Label of the attached fix, if any
    pub fn fix_label(&self) -> Option<&str> {
        self.remediation.as_ref().map(|r| r.label.as_str())
    }

    /// Run the attached fix. Returns false when there is none.
    ///
    /// Callers are expected to revalidate afterwards; the finding itself
    /// stays as it was.
    pub fn remediate(&self) -> bool {
        match &self.remediation {
            Some(remediation) => {
                (remediation.action)();
                true
            }
            None => false,
        }
    }

    /// Log the finding through the severity-matched level
    pub fn log(&self) {
        match self.severity {
            Severity::Error => error!("{}", self.message),
            Severity::Warning => warn!("{}", self.message),
            Severity::Info => info!("{}", self.message),
        }
    }
}

impl fmt::Debug for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationResult")
            .field("severity", &self.severity)
            .field("message", &self.message)
            .field("fix", &self.remediation.as_ref().map(|r| r.label.as_str()))
            .finish()
    }
}
