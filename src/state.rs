use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    auth::{
        jwt::JwtKeys,
        repo::{PgUserStore, UserStore},
        services::SessionIssuer,
    },
    config::AppConfig,
    images::repo::{PgResultStore, ResultStore},
    search::{pexels::PexelsClient, SearchProxy},
};

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub results: Arc<dyn ResultStore>,
    pub sessions: SessionIssuer,
    pub search: SearchProxy,
}

impl AppState {
    /// Postgres-backed stores and the Pexels proxy.
    pub fn init(config: AppConfig, db: PgPool) -> anyhow::Result<Self> {
        let search = match PexelsClient::from_config(&config.pexels)? {
            Some(client) => SearchProxy::new(Arc::new(client)),
            None => {
                tracing::warn!("PEXELS_API_KEY is not set; image search will fail until configured");
                SearchProxy::unconfigured()
            }
        };

        Self::from_parts(
            &config,
            Arc::new(PgUserStore::new(db.clone())),
            Arc::new(PgResultStore::new(db)),
            search,
        )
    }

    pub fn from_parts(
        config: &AppConfig,
        users: Arc<dyn UserStore>,
        results: Arc<dyn ResultStore>,
        search: SearchProxy,
    ) -> anyhow::Result<Self> {
        let sessions = SessionIssuer::new(
            users.clone(),
            JwtKeys::from_config(&config.jwt)?,
            config.password_min_len,
        );
        Ok(Self {
            users,
            results,
            sessions,
            search,
        })
    }

    /// In-memory stores and a stub provider that always finds a photo.
    #[cfg(test)]
    pub fn fake() -> Self {
        Self::fake_with_provider(Arc::new(crate::testing::StubProvider::default()))
    }

    #[cfg(test)]
    pub fn fake_with_provider(provider: Arc<dyn crate::search::SearchProvider>) -> Self {
        Self::fake_with_search(SearchProxy::new(provider))
    }

    #[cfg(test)]
    pub fn fake_with_search(search: SearchProxy) -> Self {
        use crate::testing::{test_config, MemoryResultStore, MemoryUserStore};

        Self::from_parts(
            &test_config(),
            Arc::new(MemoryUserStore::default()),
            Arc::new(MemoryResultStore::default()),
            search,
        )
        .expect("test config is valid")
    }
}
