use std::sync::Arc;

use tracing::warn;

use crate::config::AppConfig;
use crate::db;
use crate::users::{
    repo::{InMemoryUserRepository, PgUserRepository, UserRepository},
    services::UserService,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: UserService,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let repo: Arc<dyn UserRepository> = match &config.database_url {
            Some(url) => Arc::new(PgUserRepository::new(db::connect(&config, url).await?)),
            None => {
                warn!("DATABASE_URL not set; users are kept in memory only");
                Arc::new(InMemoryUserRepository::new())
            }
        };

        Ok(Self::from_parts(config, repo))
    }

    pub fn from_parts(config: Arc<AppConfig>, repo: Arc<dyn UserRepository>) -> Self {
        Self {
            config,
            users: UserService::new(repo),
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        let config = Arc::new(AppConfig {
            database_url: None,
            db_max_connections: 1,
            host: "127.0.0.1".into(),
            port: 0,
        });
        Self::from_parts(config, Arc::new(InMemoryUserRepository::new()))
    }
}
