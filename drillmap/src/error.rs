//! Types d'erreurs pour le crate drillmap

use std::time::Duration;

use thiserror::Error;

use crate::types::Level;

/// Échec de récupération d'une ressource géographique
#[derive(Debug, Error)]
pub enum FetchError {
    /// Réponse HTTP non 2xx
    #[error("HTTP {status} from {locator}")]
    Status { locator: String, status: u16 },

    /// Erreur réseau (connexion, TLS, lecture du corps)
    #[error("Request failed for {locator}: {reason}")]
    Transport { locator: String, reason: String },

    /// Corps reçu mais pas une FeatureCollection exploitable
    #[error("Malformed payload from {locator}: {reason}")]
    Malformed { locator: String, reason: String },

    /// Aucune ressource pour ce couple identifiant / niveau
    #[error("No resource for {id} at level {level}")]
    NotFound { id: String, level: Level },

    /// Le fetch du nœud `target` n'a pas abouti dans le délai imparti
    #[error("Timed out after {after:?} fetching {target}")]
    Timeout { target: String, after: Duration },
}

impl FetchError {
    /// Crée une erreur de payload invalide avec contexte
    pub fn malformed(locator: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            locator: locator.into(),
            reason: reason.into(),
        }
    }

    /// Crée une erreur de ressource absente
    pub fn not_found(id: impl Into<String>, level: Level) -> Self {
        Self::NotFound {
            id: id.into(),
            level,
        }
    }
}

/// Geste refusé par le contrôleur. Ce n'est pas une vraie erreur :
/// l'utilisateur reçoit une notice et aucune requête n'est émise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GuardViolation {
    /// Drill-in demandé au niveau le plus fin
    #[error("Already at the deepest level ({0})")]
    AtTerminalLevel(Level),

    /// Roll-up demandé à la racine
    #[error("Already at the top level ({0})")]
    AtRootLevel(Level),
}

/// Capacité demandée qu'un fournisseur n'implémente pas
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{provider} does not support {capability}")]
pub struct UnsupportedOperation {
    pub provider: &'static str,
    pub capability: String,
}

impl UnsupportedOperation {
    pub fn new(provider: &'static str, capability: impl Into<String>) -> Self {
        Self {
            provider,
            capability: capability.into(),
        }
    }
}

/// Erreur globale de navigation
#[derive(Debug, Error)]
pub enum DrillError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Guard(#[from] GuardViolation),

    #[error(transparent)]
    Unsupported(#[from] UnsupportedOperation),

    /// Une autre transition est en cours ; le geste est ignoré
    #[error("Another navigation is in progress")]
    Busy,

    /// Erreur d'I/O côté export
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Tâche d'export interrompue (panic, annulation)
    #[error("Export task failed: {0}")]
    Task(String),
}

impl DrillError {
    /// `true` pour les refus de garde (notice informative, pas d'échec)
    pub fn is_guard(&self) -> bool {
        matches!(self, DrillError::Guard(_))
    }
}

pub type Result<T, E = DrillError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = FetchError::not_found("330106", Level::District);
        assert_eq!(err.to_string(), "No resource for 330106 at level district");

        let err: DrillError = GuardViolation::AtRootLevel(Level::Country).into();
        assert!(err.is_guard());
        assert_eq!(err.to_string(), "Already at the top level (country)");

        let err = FetchError::Timeout {
            target: "330100".to_string(),
            after: Duration::from_secs(2),
        };
        assert_eq!(err.to_string(), "Timed out after 2s fetching 330100");

        let err: DrillError = UnsupportedOperation::new("registry", "precision tiers").into();
        assert_eq!(err.to_string(), "registry does not support precision tiers");
    }
}
