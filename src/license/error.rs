//! Validation outcomes.

use crate::license::model::License;
use std::fmt;
use std::sync::Arc;

/// Why a license was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LicenseErrorReason {
    /// No license could be resolved.
    NullLicense,
    /// A license was resolved but failed a check.
    InvalidLicense,
    /// A license was resolved and is otherwise valid, but has expired.
    ExpiredLicense,
}

impl fmt::Display for LicenseErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            LicenseErrorReason::NullLicense => "no license",
            LicenseErrorReason::InvalidLicense => "invalid license",
            LicenseErrorReason::ExpiredLicense => "expired license",
        };
        f.write_str(text)
    }
}

/// Immutable record of a failed validation.
#[derive(Debug, Clone)]
pub struct LicenseError {
    component: String,
    reason: LicenseErrorReason,
    message: String,
    license: Option<Arc<License>>,
}

impl LicenseError {
    /// Create a new error record.
    pub fn new(
        component: impl Into<String>,
        reason: LicenseErrorReason,
        message: impl Into<String>,
        license: Option<Arc<License>>,
    ) -> Self {
        Self {
            component: component.into(),
            reason,
            message: message.into(),
            license,
        }
    }

    /// Identity of the component being validated.
    pub fn component(&self) -> &str {
        &self.component
    }

    /// Failure category.
    pub fn reason(&self) -> LicenseErrorReason {
        self.reason
    }

    /// Human-readable detail.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The offending license, if one was resolved.
    pub fn license(&self) -> Option<&Arc<License>> {
        self.license.as_ref()
    }

    /// Message used when the error is raised by the enforcing API.
    pub fn exception_message(&self) -> String {
        format!(
            "License validation failed for {} ({}): {}",
            self.component, self.reason, self.message
        )
    }
}

impl fmt::Display for LicenseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.exception_message())
    }
}

impl std::error::Error for LicenseError {}
