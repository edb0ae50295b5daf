//! État de navigation et transitions pures
//!
//! Les transitions calculent un nouvel état sans toucher à l'ancien : le
//! contrôleur ne remplace l'état courant qu'une fois le fetch réussi.

use serde::Serialize;

use crate::error::GuardViolation;
use crate::types::{Identifier, Level};

/// Position courante dans la hiérarchie.
///
/// `ancestor_code_1` / `ancestor_code_2` mémorisent les nœuds province et
/// ville traversés lors des drill-in : le roll-up ne peut pas retrouver la
/// lignée à partir de l'identifiant courant seul.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavigationState {
    pub current_id: Identifier,
    pub parent_id: Identifier,
    pub level: Level,
    pub ancestor_code_1: Option<Identifier>,
    pub ancestor_code_2: Option<Identifier>,
}

impl NavigationState {
    /// État initial : la racine, sans lignée
    pub fn root(root: Identifier) -> Self {
        Self {
            current_id: root.clone(),
            parent_id: root,
            level: Level::Country,
            ancestor_code_1: None,
            ancestor_code_2: None,
        }
    }

    /// Code ancêtre retenu pour `level` (province ou ville uniquement)
    pub fn ancestor(&self, level: Level) -> Option<&Identifier> {
        match level {
            Level::Province => self.ancestor_code_1.as_ref(),
            Level::City => self.ancestor_code_2.as_ref(),
            Level::Country | Level::District => None,
        }
    }

    fn set_ancestor(&mut self, level: Level, id: Option<Identifier>) {
        match level {
            Level::Province => self.ancestor_code_1 = id,
            Level::City => self.ancestor_code_2 = id,
            Level::Country | Level::District => {}
        }
    }

    /// Oublie la lignée plus fine que `level`
    fn truncate_below(&mut self, level: Level) {
        for deeper in level.below() {
            self.set_ancestor(deeper, None);
        }
    }

    /// État après un drill-in vers `next_id`.
    ///
    /// `harvested` contient les codes ancêtres lus sur la feature cliquée ;
    /// le nœud atteint devient lui-même l'ancêtre de son niveau.
    pub fn drilled(
        &self,
        next_id: Identifier,
        harvested: impl IntoIterator<Item = (Level, Identifier)>,
    ) -> Result<Self, GuardViolation> {
        let level = self
            .level
            .next()
            .ok_or(GuardViolation::AtTerminalLevel(self.level))?;

        let mut next = Self {
            current_id: next_id.clone(),
            parent_id: self.current_id.clone(),
            level,
            ancestor_code_1: self.ancestor_code_1.clone(),
            ancestor_code_2: self.ancestor_code_2.clone(),
        };
        for (ancestor_level, id) in harvested {
            if ancestor_level < level {
                next.set_ancestor(ancestor_level, Some(id));
            }
        }
        next.set_ancestor(level, Some(next_id));
        next.truncate_below(level);
        Ok(next)
    }

    /// État après un roll-up : le parent mémorisé devient le nœud courant et
    /// son propre parent est relu dans la lignée.
    pub fn rolled_up(&self, root: &Identifier) -> Result<Self, GuardViolation> {
        let level = self
            .level
            .prev()
            .ok_or(GuardViolation::AtRootLevel(self.level))?;

        let parent_id = match level.prev() {
            None | Some(Level::Country) => root.clone(),
            Some(grand) => self.ancestor(grand).cloned().unwrap_or_else(|| root.clone()),
        };

        let mut next = Self {
            current_id: if level.is_root() {
                root.clone()
            } else {
                self.parent_id.clone()
            },
            parent_id,
            level,
            ancestor_code_1: self.ancestor_code_1.clone(),
            ancestor_code_2: self.ancestor_code_2.clone(),
        };
        next.truncate_below(level);
        Ok(next)
    }
}

/// Niveau des features affichées quand le curseur est à `level` : un nœud
/// s'affiche par ses subdivisions, un district par lui-même.
pub fn displayed_level(level: Level) -> Level {
    level.next().unwrap_or(level)
}

/// Variante dense demandée pour un nœud cible : partout sauf pour un
/// district, qui n'a pas de sous-régions à embarquer.
pub fn wants_full(target: Level) -> bool {
    target != Level::District
}
