//! Notices destinées à l'utilisateur

use tracing::{info, warn};

use crate::error::DrillError;

/// Gravité d'une notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Information (refus de garde, export lancé)
    Info,
    /// Capacité non supportée, export partiel
    Warning,
    /// Échec récupérable (fetch)
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }

    pub fn from_error(err: &DrillError) -> Self {
        let severity = match err {
            DrillError::Guard(_) => Severity::Info,
            DrillError::Unsupported(_) => Severity::Warning,
            _ => Severity::Error,
        };
        Self {
            severity,
            message: err.to_string(),
        }
    }
}

/// Canal des notices vers la couche de présentation
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Notifier par défaut : les notices deviennent des événements de log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.severity {
            Severity::Info => info!(target: "drillmap::notice", "{}", notice.message),
            Severity::Warning | Severity::Error => {
                warn!(target: "drillmap::notice", "{}", notice.message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FetchError, GuardViolation};
    use crate::types::Level;

    #[test]
    fn test_severity_mapping() {
        let guard: DrillError = GuardViolation::AtTerminalLevel(Level::District).into();
        assert_eq!(Notice::from_error(&guard).severity, Severity::Info);

        let fetch: DrillError = FetchError::not_found("1", Level::City).into();
        assert_eq!(Notice::from_error(&fetch).severity, Severity::Error);
    }
}
