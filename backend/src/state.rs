use crate::config::Config;
use crate::db::{self, Db};
use crate::errors::ApiError;
use credential_core::Ledger;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub ledger: Arc<Ledger>,
    pub config: Arc<Config>,
    writer: Arc<Mutex<()>>,
}

impl AppState {
    /// Rebuild the in-memory ledger from the persisted event log.
    ///
    /// Fails closed: a log with gaps or a broken hash chain refuses to load.
    pub async fn load(db: Db, config: Config) -> Result<Self, ApiError> {
        let events = db::load_events(&db).await?;
        let ledger = Ledger::replay(events)?;

        let summary = ledger.summary()?;
        tracing::info!(
            height = summary.height,
            total_supply = summary.total_supply,
            head = %summary.head,
            "ledger restored"
        );

        Ok(Self {
            db,
            ledger: Arc::new(ledger),
            config: Arc::new(config),
            writer: Arc::new(Mutex::new(())),
        })
    }

    /// Exclusive access to the write path.
    ///
    /// Held across stage, persist and apply so the staged entry is still the next link
    /// of the chain when it is committed.
    pub async fn writer(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().await
    }
}
