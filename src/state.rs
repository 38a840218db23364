use std::sync::Arc;

use tracing::info;

use crate::auth::{
    memory::MemoryUserStore,
    repo::{PgUserStore, UserStore},
};
use crate::config::AppConfig;
use crate::mail::{LogMailer, Mailer};

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub mailer: Arc<dyn Mailer>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let users: Arc<dyn UserStore> = if config.database_url.starts_with("memory://") {
            info!("using in-memory user store");
            Arc::new(MemoryUserStore::new())
        } else {
            let store = PgUserStore::connect(&config.database_url, config.max_connections).await?;
            store.migrate().await;
            Arc::new(store)
        };

        Ok(Self {
            users,
            mailer: Arc::new(LogMailer),
            config,
        })
    }

    pub fn from_parts(
        users: Arc<dyn UserStore>,
        mailer: Arc<dyn Mailer>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            users,
            mailer,
            config,
        }
    }
}
