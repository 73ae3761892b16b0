//! Quality-controller error types.
//!
//! Nothing in this crate surfaces an error to the viewer: every variant here
//! is recovered close to where it is produced, either by falling back to a
//! conservative default or by degrading visual fidelity.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use quantum_core::error::CoreResult;
//!
//! let caps = probe.probe().unwrap_or_default();
//! ```

use std::fmt;

/// Top-level error enum for the quality controller.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreError {
    /// The throwaway GPU probe could not create an instance or adapter, or
    /// could not read its parameters.  Treated as "signal unknown".
    ProbeUnavailable {
        /// Backend-reported reason.
        reason: String,
    },

    /// The outer-shell icosphere could not be built at the requested
    /// subdivision level.
    ShellGeometry {
        /// Subdivision level that was rejected.
        detail: u32,
        /// Backend-reported reason.
        reason: String,
    },

    /// A configuration value is outside its safe operating range.
    InvalidSetting {
        /// Name of the setting (for logging).
        name: &'static str,
        /// The value that was rejected.
        value: f32,
        /// Human-readable description of the safe range.
        safe_range: &'static str,
    },
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::ProbeUnavailable { reason } => {
                write!(f, "GPU capability probe unavailable: {}", reason)
            }
            CoreError::ShellGeometry { detail, reason } => write!(
                f,
                "outer shell geometry failed at subdivision {}: {}",
                detail, reason
            ),
            CoreError::InvalidSetting {
                name,
                value,
                safe_range,
            } => write!(
                f,
                "setting '{}' = {} is outside safe range {}",
                name, value, safe_range
            ),
        }
    }
}

impl std::error::Error for CoreError {}

/// Convenience alias: a `Result` using `CoreError` as the error type.
pub type CoreResult<T> = Result<T, CoreError>;

// ── Validation helpers ────────────────────────────────────────────────────────

/// Returns an error unless `value` is finite and strictly positive.
pub fn validate_positive(name: &'static str, value: f32) -> CoreResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(CoreError::InvalidSetting {
            name,
            value,
            safe_range: "(0.0, ∞)",
        })
    }
}

/// Returns an error unless `value` lies in `(0.0, 1.0]`.
pub fn validate_unit_fraction(name: &'static str, value: f32) -> CoreResult<()> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(CoreError::InvalidSetting {
            name,
            value,
            safe_range: "(0.0, 1.0]",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_rejects_zero_and_nan() {
        assert!(validate_positive("window", 0.25).is_ok());
        assert!(validate_positive("window", 0.0).is_err());
        assert!(validate_positive("window", f32::NAN).is_err());
    }

    #[test]
    fn invalid_setting_message_names_the_setting() {
        let err = validate_unit_fraction("scale_step", 1.5).unwrap_err();
        assert_eq!(
            err.to_string(),
            "setting 'scale_step' = 1.5 is outside safe range (0.0, 1.0]"
        );
    }
}
