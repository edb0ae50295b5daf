//! Rapport d'export en masse
//!
//! Collecte le résultat de chaque niveau exporté sous une région : un niveau
//! en échec n'empêche pas les autres d'aboutir.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;

use drillmap::{Level, LevelOutcome};

/// Statut global de l'export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExportStatus {
    /// Tous les niveaux ont été écrits
    Success,
    /// Certains niveaux ont échoué
    PartialSuccess,
    /// Aucun niveau écrit
    Failed,
}

/// Résultat d'un niveau
#[derive(Debug, Clone, Serialize)]
pub struct LevelReport {
    pub level: Level,
    /// Nombre de features écrites
    pub features: usize,
    /// Fichier produit
    pub file: Option<PathBuf>,
    /// Message d'erreur si le niveau a échoué
    pub error: Option<String>,
}

/// Rapport complet d'export
#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    /// Fournisseur utilisé
    pub provider: String,
    /// Région parente
    pub parent_id: String,
    pub parent_name: String,
    pub duration_secs: f64,
    pub status: ExportStatus,
    pub levels: Vec<LevelReport>,
}

impl ExportReport {
    pub fn new(provider: &str, parent_id: &str, parent_name: &str) -> Self {
        Self {
            provider: provider.to_string(),
            parent_id: parent_id.to_string(),
            parent_name: parent_name.to_string(),
            duration_secs: 0.0,
            status: ExportStatus::Success,
            levels: Vec::new(),
        }
    }

    /// Enregistre un niveau écrit
    pub fn record_success(&mut self, level: Level, features: usize, file: Option<PathBuf>) {
        self.levels.push(LevelReport {
            level,
            features,
            file,
            error: None,
        });
    }

    /// Enregistre un niveau en échec
    pub fn record_failure(&mut self, level: Level, message: &str) {
        self.levels.push(LevelReport {
            level,
            features: 0,
            file: None,
            error: Some(message.to_string()),
        });
    }

    /// Enregistre le résultat d'une tâche d'export ; `file_for` donne le
    /// fichier écrit pour un niveau réussi
    pub fn record_outcome(&mut self, outcome: LevelOutcome, file_for: impl Fn(Level) -> PathBuf) {
        match outcome.result {
            Ok(count) => self.record_success(outcome.level, count, Some(file_for(outcome.level))),
            Err(err) => self.record_failure(outcome.level, &err.to_string()),
        }
    }

    pub fn set_duration(&mut self, duration: Duration) {
        self.duration_secs = duration.as_secs_f64();
    }

    /// Détermine le statut final
    pub fn finalize(&mut self) {
        self.levels.sort_by_key(|l| l.level);

        let failed = self.failed_levels();
        self.status = if failed == 0 {
            ExportStatus::Success
        } else if failed < self.levels.len() {
            ExportStatus::PartialSuccess
        } else {
            ExportStatus::Failed
        };
    }

    pub fn failed_levels(&self) -> usize {
        self.levels.iter().filter(|l| l.error.is_some()).count()
    }

    pub fn total_features(&self) -> usize {
        self.levels.iter().map(|l| l.features).sum()
    }

    /// Affiche le rapport sur la console
    pub fn display(&self) {
        println!("\n{}", "=".repeat(60));
        println!(
            "EXPORT REPORT - {} ({}) via {}",
            self.parent_name, self.parent_id, self.provider
        );
        println!("{}", "=".repeat(60));

        println!("\nStatus: {:?}", self.status);
        println!("Duration: {:.2}s", self.duration_secs);

        println!("\n--- LEVELS ---");
        for l in &self.levels {
            match (&l.error, &l.file) {
                (Some(err), _) => println!("  {}: FAILED {}", l.level, err),
                (None, Some(file)) => {
                    println!("  {}: {} features -> {}", l.level, l.features, file.display())
                }
                (None, None) => println!("  {}: {} features", l.level, l.features),
            }
        }

        println!("\n{}", "=".repeat(60));
    }

    /// Sauvegarde le rapport en JSON
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Affichage compact pour le résumé
    pub fn summary(&self) -> String {
        format!(
            "{}: {} level(s), {} features, {} failed",
            self.parent_id,
            self.levels.len(),
            self.total_features(),
            self.failed_levels()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drillmap::{DrillError, FetchError};

    #[test]
    fn test_finalize_success() {
        let mut report = ExportReport::new("registry", "330000", "浙江省");
        report.record_success(Level::District, 90, None);
        report.record_success(Level::City, 11, None);
        report.finalize();

        assert_eq!(report.status, ExportStatus::Success);
        assert_eq!(report.levels[0].level, Level::City);
        assert_eq!(report.total_features(), 101);
    }

    #[test]
    fn test_finalize_partial_success() {
        let mut report = ExportReport::new("tiled", "CHN.30_1", "Zhejiang");
        report.record_success(Level::City, 11, None);
        report.record_failure(Level::District, "HTTP 404");
        report.finalize();

        assert_eq!(report.status, ExportStatus::PartialSuccess);
        assert_eq!(report.failed_levels(), 1);
    }

    #[test]
    fn test_finalize_failed() {
        let mut report = ExportReport::new("tiled", "CHN.30_1", "Zhejiang");
        report.record_outcome(
            LevelOutcome {
                level: Level::City,
                result: Err(DrillError::from(FetchError::Status {
                    locator: "http://x/city/low.json".to_string(),
                    status: 500,
                })),
            },
            |level| PathBuf::from(format!("CHN.30_1_{}.json", level)),
        );
        report.finalize();

        assert_eq!(report.status, ExportStatus::Failed);
        assert!(report.levels[0].file.is_none());
        assert!(report.levels[0].error.as_deref().unwrap().contains("500"));
    }

    #[test]
    fn test_record_outcome_success() {
        let mut report = ExportReport::new("registry", "330000", "浙江省");
        report.record_outcome(
            LevelOutcome {
                level: Level::City,
                result: Ok(11),
            },
            |level| PathBuf::from(format!("330000_{}.json", level)),
        );

        assert_eq!(report.levels[0].file, Some(PathBuf::from("330000_city.json")));
        assert_eq!(report.summary(), "330000: 1 level(s), 11 features, 0 failed");
    }

    #[test]
    fn test_save_to_file() {
        let path = std::env::temp_dir().join("drillmap_test_report.json");
        let mut report = ExportReport::new("registry", "330000", "浙江省");
        report.record_success(Level::City, 11, None);
        report.finalize();
        report.save_to_file(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains(r#""status": "Success""#));
        assert!(content.contains(r#""level": "city""#));

        std::fs::remove_file(path).ok();
    }
}
