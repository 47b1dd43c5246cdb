use std::{sync::Arc, time::Duration};

use anyhow::Error;
use bank::{
    Catalog, StoreClient,
    models::{AuditEntry, SystemSettings},
    remote::{AUDIT_LOGS, SYSTEM_SETTINGS},
    rows::SystemSettingsRow,
};
use tokio::{sync::RwLock, task::JoinHandle, time::interval};
use tracing::{info, warn};

use super::{auth::SessionStore, chat::ChatClient, config::Config};

pub struct State {
    pub config: Config,
    pub store: StoreClient,
    pub catalog: RwLock<Catalog>,
    pub settings: RwLock<SystemSettings>,
    pub sessions: SessionStore,
    pub chat: Option<ChatClient>,
}

impl State {
    pub async fn new(config: Config) -> Result<Arc<Self>, Error> {
        let store = StoreClient::new(&config.store_url, &config.store_key)?;

        let (catalog, settings) = tokio::join!(
            load_catalog(&store, &config),
            load_settings(&store)
        );

        Self::build(config, store, catalog, settings)
    }

    /// State over a catalog already in hand; nothing is fetched.
    pub fn with_catalog(config: Config, catalog: Catalog) -> Result<Arc<Self>, Error> {
        let store = StoreClient::new(&config.store_url, &config.store_key)?;

        Self::build(config, store, catalog, SystemSettings::default())
    }

    fn build(
        config: Config,
        store: StoreClient,
        catalog: Catalog,
        settings: SystemSettings,
    ) -> Result<Arc<Self>, Error> {
        let chat = config.chat.as_ref().map(ChatClient::new).transpose()?;

        Ok(Arc::new(Self {
            sessions: SessionStore::new(config.session_ttl_mins),
            config,
            store,
            catalog: RwLock::new(catalog),
            settings: RwLock::new(settings),
            chat,
        }))
    }

    /// Keeps the current catalog when the store cannot be reached.
    pub async fn refresh_catalog(&self) -> Result<usize, Error> {
        let catalog = Catalog::fetch(&self.store).await?;
        let count = catalog.resources.len();

        *self.catalog.write().await = catalog;

        Ok(count)
    }

    /// Best effort: the action already happened, a lost audit row is only logged.
    pub async fn audit(&self, entry: AuditEntry) {
        if let Err(e) = self.store.append(AUDIT_LOGS, &entry).await {
            warn!("Failed to record audit entry {}: {e:#}", entry.action);
        }
    }
}

async fn load_catalog(store: &StoreClient, config: &Config) -> Catalog {
    match Catalog::fetch(store).await {
        Ok(catalog) => {
            info!("Loaded {} resources from store", catalog.resources.len());
            return catalog;
        }
        Err(e) => warn!("Catalog fetch failed, trying snapshot: {e:#}"),
    }

    match Catalog::read(&config.snapshot_path) {
        Ok(catalog) => {
            info!("Loaded {} resources from snapshot", catalog.resources.len());
            catalog
        }
        Err(e) => {
            warn!("No usable snapshot, starting with an empty catalog: {e:#}");
            Catalog::default()
        }
    }
}

pub async fn fetch_settings(store: &StoreClient) -> Result<SystemSettings, Error> {
    let rows: Vec<SystemSettingsRow> = store.select(SYSTEM_SETTINGS, &[("limit", "1")]).await?;

    Ok(rows.into_iter().next().map(Into::into).unwrap_or_default())
}

async fn load_settings(store: &StoreClient) -> SystemSettings {
    fetch_settings(store).await.unwrap_or_else(|e| {
        warn!("Settings fetch failed, using defaults: {e:#}");
        SystemSettings::default()
    })
}

pub fn spawn_refresh(state: Arc<State>) -> JoinHandle<()> {
    let period = Duration::from_secs(state.config.refresh_secs.max(10));

    tokio::spawn(async move {
        let mut ticker = interval(period);
        // first tick fires immediately and the catalog was just loaded
        ticker.tick().await;

        loop {
            ticker.tick().await;

            match state.refresh_catalog().await {
                Ok(count) => info!("Catalog refreshed: {count} resources"),
                Err(e) => warn!("Catalog refresh failed, keeping previous: {e:#}"),
            }

            match fetch_settings(&state.store).await {
                Ok(settings) => *state.settings.write().await = settings,
                Err(e) => warn!("Settings refresh failed, keeping previous: {e:#}"),
            }

            let purged = state.sessions.purge_expired().await;
            if purged > 0 {
                info!("Purged {purged} expired sessions");
            }
        }
    })
}
