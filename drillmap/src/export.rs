//! Export en masse des descendants d'une feature sélectionnée
//!
//! Une tâche tokio indépendante par niveau : pas d'ordre garanti, pas
//! d'agrégation, et l'échec d'un niveau n'interrompt pas les autres.

use async_trait::async_trait;
use futures::future::join_all;
use tokio::task::JoinHandle;

use crate::error::{DrillError, Result};
use crate::types::{GeometryResult, Identifier, Level};

/// Un lot de features à écrire
#[derive(Debug, Clone)]
pub struct ExportItem {
    /// Nom de base de la sortie (ex: `330000_city`)
    pub label: String,
    pub level: Level,
    /// Parent demandé, `None` pour un export du nœud courant
    pub parent: Option<Identifier>,
    pub data: GeometryResult,
}

impl ExportItem {
    pub fn descendants(parent: &Identifier, level: Level, data: GeometryResult) -> Self {
        Self {
            label: format!("{}_{}", parent, level),
            level,
            parent: Some(parent.clone()),
            data,
        }
    }
}

/// Destination des exports (fichier, presse-papier, mémoire...)
#[async_trait]
pub trait ExportSink: Send + Sync {
    async fn export(&self, item: ExportItem) -> Result<()>;
}

/// Résultat d'un niveau exporté
#[derive(Debug)]
pub struct LevelOutcome {
    pub level: Level,
    /// Nombre de features exportées
    pub result: Result<usize>,
}

/// Tâches d'export lancées, une par niveau.
///
/// Dropper le lot laisse les tâches tourner (fire-and-forget) ; `join`
/// attend la fin de toutes sans les ordonner entre elles.
#[derive(Debug, Default)]
pub struct ExportBatch {
    tasks: Vec<(Level, JoinHandle<Result<usize>>)>,
}

impl ExportBatch {
    pub(crate) fn push(&mut self, level: Level, handle: JoinHandle<Result<usize>>) {
        self.tasks.push((level, handle));
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn levels(&self) -> Vec<Level> {
        self.tasks.iter().map(|(l, _)| *l).collect()
    }

    /// Attend toutes les tâches ; l'ordre du résultat suit l'ordre de lancement
    pub async fn join(self) -> Vec<LevelOutcome> {
        let (levels, handles): (Vec<_>, Vec<_>) = self.tasks.into_iter().unzip();
        join_all(handles)
            .await
            .into_iter()
            .zip(levels)
            .map(|(joined, level)| LevelOutcome {
                level,
                result: joined.unwrap_or_else(|e| Err(DrillError::Task(e.to_string()))),
            })
            .collect()
    }
}
