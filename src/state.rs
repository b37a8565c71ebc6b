use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};

use crate::config::{DashboardConfig, HTTP_CLIENT_TIMEOUT_SECS, INTENT_CHANNEL_SIZE};
use crate::db::DashboardDb;
use crate::links::ParsedAccount;
use crate::log_capture::LogState;
use crate::session::{SessionCoordinator, SessionIntent};
use crate::store::StoreConfig;

pub type SharedState = Arc<DashboardState>;

/// Process-wide state. The coordinator behind its lock is the sole writer of
/// session records and state; everything else reads derived snapshots.
pub struct DashboardState {
    pub config: DashboardConfig,
    pub coordinator: RwLock<SessionCoordinator>,
    /// Working account set accumulated from link intake; fixed into a
    /// session on submit.
    pub accounts: RwLock<Vec<ParsedAccount>>,
    /// Materialized export bundle from the most recent completed session.
    pub export_config: RwLock<Option<String>>,
    pub store: RwLock<Option<StoreConfig>>,
    pub db: DashboardDb,
    pub logs: LogState,
    pub intent_tx: broadcast::Sender<SessionIntent>,
    pub shutdown_tx: broadcast::Sender<()>,
    pub http_client: reqwest::Client,
}

impl DashboardState {
    pub fn new(config: DashboardConfig, db: DashboardDb) -> Self {
        let (intent_tx, _) = broadcast::channel(INTENT_CHANNEL_SIZE);
        let (shutdown_tx, _) = broadcast::channel(1);
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_CLIENT_TIMEOUT_SECS))
            .pool_max_idle_per_host(4)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            config,
            coordinator: RwLock::new(SessionCoordinator::new()),
            accounts: RwLock::new(Vec::new()),
            export_config: RwLock::new(None),
            store: RwLock::new(None),
            db,
            logs: LogState::new(),
            intent_tx,
            shutdown_tx,
            http_client,
        }
    }

    /// Fan an intent out to connected dashboard clients. Send failure just
    /// means nobody is watching.
    pub fn broadcast(&self, intent: SessionIntent) {
        let _ = self.intent_tx.send(intent);
    }
}
