//! Contrôleur drill-in / roll-up
//!
//! Une seule transition de navigation à la fois : la porte (`gate`) est tenue
//! pendant tout le fetch, et un geste reçu entre-temps est ignoré
//! ([`DrillError::Busy`]). L'état n'est remplacé qu'après un fetch réussi.

use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use geojson::Feature;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{DrillError, FetchError, Result};
use crate::export::{ExportBatch, ExportItem, ExportSink};
use crate::notice::{Notice, Notifier};
use crate::source::{GeoDataSource, ProviderKind, SourceFactory};
use crate::state::{displayed_level, wants_full, NavigationState};
use crate::types::{
    ChildRequest, FetchOptions, GeometryResult, Identifier, Level, Precision, SelectedFeature,
};

/// Ce que lit la couche de présentation
struct View {
    source: Arc<dyn GeoDataSource>,
    state: NavigationState,
    geometry: Arc<GeometryResult>,
    selected: Option<SelectedFeature>,
}

pub struct RegionNavigator {
    factory: SourceFactory,
    notifier: Arc<dyn Notifier>,
    fetch_timeout: Duration,
    gate: Mutex<()>,
    view: RwLock<View>,
}

fn empty_collection() -> GeometryResult {
    GeometryResult {
        bbox: None,
        features: Vec::new(),
        foreign_members: None,
    }
}

/// Borne un fetch dans le temps
async fn with_timeout<F>(after: Duration, target: &Identifier, fut: F) -> Result<GeometryResult>
where
    F: Future<Output = Result<GeometryResult>>,
{
    match tokio::time::timeout(after, fut).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout {
            target: target.to_string(),
            after,
        }
        .into()),
    }
}

impl RegionNavigator {
    /// Crée un navigateur à la racine du fournisseur `kind`. Aucune I/O :
    /// appeler [`RegionNavigator::load_root`] pour obtenir la géométrie initiale.
    pub fn new(factory: SourceFactory, kind: ProviderKind, notifier: Arc<dyn Notifier>) -> Self {
        let source = factory.create(kind);
        let fetch_timeout = factory.config().fetch_timeout();
        let state = NavigationState::root(source.root_id());
        Self {
            factory,
            notifier,
            fetch_timeout,
            gate: Mutex::new(()),
            view: RwLock::new(View {
                source,
                state,
                geometry: Arc::new(empty_collection()),
                selected: None,
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, View> {
        self.view.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, View> {
        self.view.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copie de l'état de navigation
    pub fn state(&self) -> NavigationState {
        self.read().state.clone()
    }

    /// Géométrie affichée
    pub fn geometry(&self) -> Arc<GeometryResult> {
        Arc::clone(&self.read().geometry)
    }

    pub fn selected(&self) -> Option<SelectedFeature> {
        self.read().selected.clone()
    }

    pub fn provider(&self) -> ProviderKind {
        self.read().source.kind()
    }

    pub fn source(&self) -> Arc<dyn GeoDataSource> {
        Arc::clone(&self.read().source)
    }

    /// `true` tant qu'une transition est en vol
    pub fn is_busy(&self) -> bool {
        self.gate.try_lock().is_err()
    }

    /// Feature affichée dont l'identifiant (au sens du fournisseur actif) vaut `id`
    pub fn find_feature(&self, id: &Identifier) -> Option<Feature> {
        let view = self.read();
        view.geometry
            .features
            .iter()
            .find(|f| &view.source.feature_id(f) == id)
            .cloned()
    }

    fn snapshot(&self) -> (Arc<dyn GeoDataSource>, NavigationState) {
        let view = self.read();
        (Arc::clone(&view.source), view.state.clone())
    }

    fn reject(&self, gesture: &str, err: DrillError) -> DrillError {
        if err.is_guard() {
            info!(gesture, "{}", err);
        } else {
            warn!(gesture, error = %err, "navigation failed, state unchanged");
        }
        self.notifier.notify(Notice::from_error(&err));
        err
    }

    /// Applique une transition réussie, ou notifie l'échec sans rien toucher
    /// d'autre que la sélection
    fn finish(
        &self,
        gesture: &str,
        outcome: Result<(NavigationState, GeometryResult)>,
    ) -> Result<NavigationState> {
        match outcome {
            Ok((state, geometry)) => {
                let mut view = self.write();
                view.state = state.clone();
                view.geometry = Arc::new(geometry);
                view.selected = None;
                info!(
                    gesture,
                    level = %state.level,
                    id = %state.current_id,
                    parent = %state.parent_id,
                    features = view.geometry.features.len(),
                    "navigation applied"
                );
                Ok(state)
            }
            Err(err) => {
                self.write().selected = None;
                Err(self.reject(gesture, err))
            }
        }
    }

    async fn fetch_node(
        &self,
        source: &dyn GeoDataSource,
        id: &Identifier,
        level: Level,
        opts: FetchOptions,
    ) -> Result<GeometryResult> {
        with_timeout(
            self.fetch_timeout,
            id,
            source.fetch_by_identifier(id, level, opts),
        )
        .await
    }

    /// Ramène le curseur à la racine du fournisseur actif et charge sa géométrie
    pub async fn load_root(&self) -> Result<NavigationState> {
        let Ok(_gate) = self.gate.try_lock() else {
            debug!("load ignored, navigation in progress");
            return Err(DrillError::Busy);
        };
        let (source, _) = self.snapshot();
        let state = NavigationState::root(source.root_id());
        let outcome = self
            .fetch_node(&*source, &state.current_id, state.level, FetchOptions::full(true))
            .await
            .map(|geometry| (state, geometry));
        self.finish("load", outcome)
    }

    /// Double-clic sur une feature : descend d'un niveau
    pub async fn drill_in(&self, feature: &Feature) -> Result<NavigationState> {
        let Ok(_gate) = self.gate.try_lock() else {
            debug!("drill-in ignored, navigation in progress");
            return Err(DrillError::Busy);
        };
        let (source, state) = self.snapshot();

        let outcome = async {
            let next_id = source.feature_id(feature);
            let harvested = source.ancestor_fields().harvest(feature);
            let next = state.drilled(next_id, harvested)?;
            let opts = FetchOptions::full(wants_full(next.level));
            let geometry = self
                .fetch_node(&*source, &next.current_id, next.level, opts)
                .await?;
            Ok::<_, DrillError>((next, geometry))
        }
        .await;

        self.finish("drill-in", outcome)
    }

    /// Double-clic sur le fond : remonte au parent mémorisé
    pub async fn roll_up(&self) -> Result<NavigationState> {
        let Ok(_gate) = self.gate.try_lock() else {
            debug!("roll-up ignored, navigation in progress");
            return Err(DrillError::Busy);
        };
        let (source, state) = self.snapshot();

        let outcome = async {
            let next = state.rolled_up(&source.root_id())?;
            let opts = FetchOptions::full(wants_full(next.level));
            let geometry = self
                .fetch_node(&*source, &next.current_id, next.level, opts)
                .await?;
            Ok::<_, DrillError>((next, geometry))
        }
        .await;

        self.finish("roll-up", outcome)
    }

    /// Change de fournisseur. Les identifiants n'étant pas portables, le
    /// curseur revient toujours à la racine, même si le fetch initial échoue
    /// (la géométrie affichée est alors vide).
    pub async fn switch_provider(&self, kind: ProviderKind) -> Result<NavigationState> {
        let Ok(_gate) = self.gate.try_lock() else {
            debug!(%kind, "provider switch ignored, navigation in progress");
            return Err(DrillError::Busy);
        };
        let source = self.factory.create(kind);
        let state = NavigationState::root(source.root_id());
        let fetched = self
            .fetch_node(&*source, &state.current_id, state.level, FetchOptions::full(true))
            .await;

        let mut view = self.write();
        view.source = source;
        view.state = state.clone();
        view.selected = None;
        match fetched {
            Ok(geometry) => {
                info!(provider = %kind, version = %view.source.config().version, features = geometry.features.len(), "provider switched");
                view.geometry = Arc::new(geometry);
                Ok(state)
            }
            Err(err) => {
                view.geometry = Arc::new(empty_collection());
                drop(view);
                Err(self.reject("switch-provider", err))
            }
        }
    }

    /// Clic simple : mémorise la feature pour l'export, sans transition
    pub fn select_feature(&self, feature: &Feature) -> SelectedFeature {
        let mut view = self.write();
        let selected = SelectedFeature {
            name: view.source.feature_name(feature),
            id: view.source.feature_id(feature),
            level: displayed_level(view.state.level),
            feature: feature.clone(),
        };
        debug!(id = %selected.id, name = %selected.name, level = %selected.level, "feature selected");
        view.selected = Some(selected.clone());
        selected
    }

    /// Lance un export par niveau demandé sous la feature sélectionnée.
    ///
    /// Chaque niveau est une tâche tokio indépendante : pas d'ordre, pas
    /// d'agrégation, un échec reste local à son niveau. Hors runtime tokio,
    /// rien n'est lancé et une notice d'erreur est émise.
    pub fn export_descendants(&self, levels: &[Level], sink: Arc<dyn ExportSink>) -> ExportBatch {
        let (source, selected) = {
            let view = self.read();
            (Arc::clone(&view.source), view.selected.clone())
        };
        let mut batch = ExportBatch::default();

        let Some(selected) = selected else {
            self.notifier
                .notify(Notice::info("Select a region before exporting its subdivisions"));
            return batch;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(selected = %selected.id, "export requested outside a tokio runtime");
            self.notifier
                .notify(Notice::error("Export needs a running tokio runtime"));
            return batch;
        };

        let mut seen = Vec::new();
        for &level in levels {
            if level <= selected.level || seen.contains(&level) {
                warn!(%level, selected = %selected.level, "skipping export level");
                continue;
            }
            seen.push(level);

            let req = ChildRequest::new(selected.id.clone(), selected.level, level);
            let source = Arc::clone(&source);
            let sink = Arc::clone(&sink);
            let notifier = Arc::clone(&self.notifier);
            let after = self.fetch_timeout;

            batch.push(
                level,
                runtime.spawn(async move {
                    let outcome = async {
                        let data =
                            with_timeout(after, &req.parent_id, source.fetch_children(&req)).await?;
                        let count = data.features.len();
                        sink.export(ExportItem::descendants(&req.parent_id, level, data))
                            .await?;
                        Ok::<_, DrillError>(count)
                    }
                    .await;

                    match &outcome {
                        Ok(count) => info!(parent = %req.parent_id, %level, features = count, "export done"),
                        Err(err) => {
                            warn!(parent = %req.parent_id, %level, error = %err, "export failed");
                            notifier.notify(Notice::from_error(err));
                        }
                    }
                    outcome
                }),
            );
        }

        if !batch.is_empty() {
            self.notifier.notify(Notice::info(format!(
                "Exporting {} level(s) under {}",
                batch.len(),
                selected.name
            )));
        }
        batch
    }

    /// Télécharge le niveau courant au palier de précision demandé
    pub async fn export_current(&self, precision: Precision, sink: &dyn ExportSink) -> Result<usize> {
        let (source, state) = self.snapshot();
        let opts = FetchOptions::full(wants_full(state.level)).with_precision(precision);

        let outcome = async {
            let data = self
                .fetch_node(&*source, &state.current_id, state.level, opts)
                .await?;
            let count = data.features.len();
            sink.export(ExportItem {
                label: state.current_id.to_string(),
                level: displayed_level(state.level),
                parent: None,
                data,
            })
            .await?;
            Ok::<_, DrillError>(count)
        }
        .await;

        outcome.map_err(|err| self.reject("export-current", err))
    }

    /// Exporte la feature sélectionnée seule
    pub async fn export_selected(&self, sink: &dyn ExportSink) -> Result<usize> {
        let Some(selected) = self.selected() else {
            self.notifier.notify(Notice::info("No region selected"));
            return Ok(0);
        };
        let item = ExportItem {
            label: selected.id.to_string(),
            level: selected.level,
            parent: None,
            data: GeometryResult {
                bbox: None,
                features: vec![selected.feature],
                foreign_members: None,
            },
        };
        sink.export(item)
            .await
            .map(|_| 1)
            .map_err(|err| self.reject("export-selected", err))
    }
}
