//! Lifecycle-aware location apps screen
//!
//! The population pass runs once per screen as its own task and publishes
//! its outcome on a watch channel. Each [`LocationAppsScreen::refresh`] waits
//! for that outcome, reads the store on the blocking pool and hands the items
//! to the host, unless the host lifecycle leaves `Resumed` first.

use crate::inventory::PackageInventory;
use crate::presenter::{self, AppLocationItem, PermissionTable, PopulationSummary};
use crate::storage::LocationAppsDb;
use crate::{Error, Result};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Host lifecycle states, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    Resumed,
    Paused,
    Destroyed,
}

/// Lifecycle of the host showing the screen
pub struct Lifecycle {
    tx: watch::Sender<LifecycleState>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(LifecycleState::Created);
        Self { tx }
    }

    pub fn state(&self) -> LifecycleState {
        *self.tx.borrow()
    }

    pub fn resume(&self) {
        self.transition(LifecycleState::Resumed);
    }

    pub fn pause(&self) {
        self.transition(LifecycleState::Paused);
    }

    pub fn destroy(&self) {
        self.transition(LifecycleState::Destroyed);
    }

    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.tx.subscribe()
    }

    fn transition(&self, state: LifecycleState) {
        let previous = self.tx.send_replace(state);
        tracing::debug!(?previous, current = ?state, "Lifecycle transition");
    }
}

/// The surface the listing is rendered on
pub trait HostShell: Send {
    fn set_progress_visible(&mut self, visible: bool);

    /// Replace everything currently listed with `items`
    fn show_items(&mut self, items: Vec<AppLocationItem>);
}

/// Result of a finished population pass
#[derive(Debug, Clone)]
pub struct Populated {
    pub permissions: Arc<PermissionTable>,
    pub summary: PopulationSummary,
}

/// `None` while the pass is running
type PopulationState = Option<std::result::Result<Populated, Arc<Error>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Rendered { items: usize },
    /// The lifecycle left `Resumed` first; nothing reached the host
    Abandoned,
}

pub struct LocationAppsScreen {
    db: LocationAppsDb,
    inventory: Arc<dyn PackageInventory>,
    population: watch::Receiver<PopulationState>,
    population_task: JoinHandle<()>,
}

impl LocationAppsScreen {
    /// Create the screen and start its population pass.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(db: LocationAppsDb, inventory: Arc<dyn PackageInventory>) -> Self {
        let (tx, population) = watch::channel(None);

        let population_task = tokio::spawn({
            let db = db.clone();
            let inventory = Arc::clone(&inventory);
            async move {
                let result = tokio::task::spawn_blocking(move || presenter::populate(inventory.as_ref(), &db)).await;
                let state = match result {
                    Ok(Ok((permissions, summary))) => Ok(Populated {
                        permissions: Arc::new(permissions),
                        summary,
                    }),
                    Ok(Err(e)) => {
                        tracing::error!("Population pass failed: {}", e);
                        Err(Arc::new(e))
                    }
                    Err(e) => {
                        tracing::error!("Population task did not complete: {}", e);
                        Err(Arc::new(Error::Task(e.to_string())))
                    }
                };
                tx.send_replace(Some(state));
            }
        });

        Self {
            db,
            inventory,
            population,
            population_task,
        }
    }

    /// Wait for the population pass without blocking a worker thread
    pub async fn wait_populated(&self) -> Result<Populated> {
        let mut rx = self.population.clone();
        let state = rx
            .wait_for(Option::is_some)
            .await
            .map_err(|_| Error::Task("population task ended without reporting".to_string()))?
            .clone();

        match state {
            Some(Ok(populated)) => Ok(populated),
            Some(Err(e)) => Err(Error::Population(e)),
            None => Err(Error::Task("population task ended without reporting".to_string())),
        }
    }

    /// Load the listing and hand it to `host`.
    ///
    /// Does nothing unless `lifecycle` is `Resumed`. If it leaves `Resumed`
    /// before the listing is ready, the listing is dropped and the host is
    /// left as it was (progress still shown).
    pub async fn refresh(&self, host: &mut dyn HostShell, lifecycle: &Lifecycle) -> Result<RefreshOutcome> {
        let mut lifecycle_rx = lifecycle.subscribe();
        if *lifecycle_rx.borrow_and_update() != LifecycleState::Resumed {
            return Ok(RefreshOutcome::Abandoned);
        }

        host.set_progress_visible(true);

        let load = async {
            let populated = self.wait_populated().await?;
            let db = self.db.clone();
            let inventory = Arc::clone(&self.inventory);
            tokio::task::spawn_blocking(move || {
                presenter::load_items(&db, &populated.permissions, inventory.as_ref())
            })
            .await
            .map_err(|e| Error::Task(e.to_string()))?
        };

        let left_resumed = async {
            // A dropped lifecycle counts as leaving
            let _ = lifecycle_rx.wait_for(|state| *state != LifecycleState::Resumed).await;
        };

        tokio::select! {
            result = load => match result {
                Ok(items) => {
                    let count = items.len();
                    host.show_items(items);
                    host.set_progress_visible(false);
                    tracing::info!("Listed {} location apps", count);
                    Ok(RefreshOutcome::Rendered { items: count })
                }
                Err(e) => {
                    host.set_progress_visible(false);
                    Err(e)
                }
            },
            _ = left_resumed => {
                tracing::warn!("Screen left resumed state, discarding listing");
                Ok(RefreshOutcome::Abandoned)
            }
        }
    }
}

impl Drop for LocationAppsScreen {
    fn drop(&mut self) {
        self.population_task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::LocationAccessType;
    use crate::inventory::{
        AppMetadata, InstalledPackage, RequestedPermission, ACCESS_FINE_LOCATION, REQUESTED_PERMISSION_GRANTED,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{mpsc, Mutex};
    use std::time::Duration;

    #[derive(Debug, PartialEq)]
    enum HostEvent {
        Progress(bool),
        Items(Vec<String>),
    }

    #[derive(Default)]
    struct RecordingShell {
        events: Vec<HostEvent>,
    }

    impl HostShell for RecordingShell {
        fn set_progress_visible(&mut self, visible: bool) {
            self.events.push(HostEvent::Progress(visible));
        }

        fn show_items(&mut self, items: Vec<AppLocationItem>) {
            self.events.push(HostEvent::Items(items.into_iter().map(|i| i.title).collect()));
        }
    }

    /// Inventory whose enumeration waits for a signal and counts its calls
    struct GatedInventory {
        gate: Option<Mutex<mpsc::Receiver<()>>>,
        calls: AtomicUsize,
        fail: bool,
    }

    impl GatedInventory {
        fn open() -> Self {
            Self { gate: None, calls: AtomicUsize::new(0), fail: false }
        }
    }

    impl PackageInventory for GatedInventory {
        fn installed_packages(&self) -> Result<Vec<InstalledPackage>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.lock().unwrap().recv().ok();
            }
            if self.fail {
                return Err(Error::Inventory("device offline".to_string()));
            }
            Ok(vec![
                InstalledPackage::new(
                    "com.example.maps",
                    Some(vec![RequestedPermission::new(ACCESS_FINE_LOCATION, REQUESTED_PERMISSION_GRANTED)]),
                ),
                InstalledPackage::new(
                    "com.example.bike",
                    Some(vec![RequestedPermission::new(ACCESS_FINE_LOCATION, 0)]),
                ),
            ])
        }

        fn application_info(&self, package_name: &str) -> Option<AppMetadata> {
            (package_name == "com.example.maps").then(|| AppMetadata {
                label: Some("Maps".to_string()),
                icon: None,
            })
        }
    }

    fn temp_db() -> (tempfile::TempDir, LocationAppsDb) {
        let dir = tempfile::tempdir().unwrap();
        let db = LocationAppsDb::open(dir.path().join("location_apps.db")).unwrap();
        (dir, db)
    }

    #[tokio::test]
    async fn test_refresh_renders_after_population() {
        let (_dir, db) = temp_db();
        let inventory = Arc::new(GatedInventory::open());
        let screen = LocationAppsScreen::start(db.clone(), inventory.clone());
        let lifecycle = Lifecycle::new();
        lifecycle.resume();

        let mut host = RecordingShell::default();
        let outcome = screen.refresh(&mut host, &lifecycle).await.unwrap();

        assert_eq!(outcome, RefreshOutcome::Rendered { items: 2 });
        assert_eq!(
            host.events,
            vec![
                HostEvent::Progress(true),
                HostEvent::Items(vec!["com.example.bike".to_string(), "Maps".to_string()]),
                HostEvent::Progress(false),
            ]
        );
        assert_eq!(db.get("com.example.bike").unwrap().map(|r| r.access_type), Some(LocationAccessType::NoLocation));
    }

    #[tokio::test]
    async fn test_population_runs_once_across_refreshes() {
        let (_dir, db) = temp_db();
        let inventory = Arc::new(GatedInventory::open());
        let screen = LocationAppsScreen::start(db, inventory.clone());
        let lifecycle = Lifecycle::new();
        lifecycle.resume();

        let mut host = RecordingShell::default();
        screen.refresh(&mut host, &lifecycle).await.unwrap();
        lifecycle.pause();
        lifecycle.resume();
        screen.refresh(&mut host, &lifecycle).await.unwrap();

        assert_eq!(inventory.calls.load(Ordering::SeqCst), 1);
        assert_eq!(screen.wait_populated().await.unwrap().summary.newly_recorded, 2);
    }

    #[tokio::test]
    async fn test_refresh_abandoned_when_paused() {
        let (_dir, db) = temp_db();
        let (release, gate) = mpsc::channel();
        let inventory = Arc::new(GatedInventory {
            gate: Some(Mutex::new(gate)),
            ..GatedInventory::open()
        });
        let screen = LocationAppsScreen::start(db, inventory);
        let lifecycle = Lifecycle::new();
        lifecycle.resume();

        let mut host = RecordingShell::default();
        let (outcome, _) = tokio::join!(screen.refresh(&mut host, &lifecycle), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            lifecycle.pause();
        });

        assert_eq!(outcome.unwrap(), RefreshOutcome::Abandoned);
        assert_eq!(lifecycle.state(), LifecycleState::Paused);
        assert_eq!(host.events, vec![HostEvent::Progress(true)]);

        release.send(()).unwrap();
        assert_eq!(screen.wait_populated().await.unwrap().summary.location_packages, 2);
    }

    #[tokio::test]
    async fn test_refresh_skipped_unless_resumed() {
        let (_dir, db) = temp_db();
        let screen = LocationAppsScreen::start(db, Arc::new(GatedInventory::open()));
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.state(), LifecycleState::Created);

        let mut host = RecordingShell::default();
        assert_eq!(screen.refresh(&mut host, &lifecycle).await.unwrap(), RefreshOutcome::Abandoned);
        assert!(host.events.is_empty());

        lifecycle.destroy();
        assert_eq!(lifecycle.state(), LifecycleState::Destroyed);
        assert_eq!(screen.refresh(&mut host, &lifecycle).await.unwrap(), RefreshOutcome::Abandoned);
        assert!(host.events.is_empty());
    }

    #[tokio::test]
    async fn test_population_failure_reaches_refresh() {
        let (_dir, db) = temp_db();
        let inventory = Arc::new(GatedInventory { fail: true, ..GatedInventory::open() });
        let screen = LocationAppsScreen::start(db.clone(), inventory);
        let lifecycle = Lifecycle::new();
        lifecycle.resume();

        let mut host = RecordingShell::default();
        let err = screen.refresh(&mut host, &lifecycle).await.unwrap_err();

        assert!(matches!(err, Error::Population(ref inner) if matches!(**inner, Error::Inventory(_))));
        assert_eq!(host.events, vec![HostEvent::Progress(true), HostEvent::Progress(false)]);
        assert_eq!(db.stats().unwrap().total, 0);
    }
}
