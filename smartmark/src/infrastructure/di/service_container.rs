// smartmark/src/infrastructure/di/service_container.rs
use crate::application::error::{ApplicationError, ApplicationResult};
use crate::application::services::bookmark_store::BookmarkStore;
use crate::application::BookmarkStoreClient;
use crate::config::Settings;
use crate::domain::session_provider::SessionProvider;
use crate::infrastructure::accounts::AccountDirectory;
use crate::infrastructure::sqlite::SqliteSessionProvider;
use std::path::Path;
use std::sync::Arc;

/// Production service container - single source of truth for service creation
pub struct ServiceContainer {
    pub bookmark_store: Arc<dyn BookmarkStore>,
}

impl ServiceContainer {
    pub fn new(config: &Settings) -> ApplicationResult<Self> {
        let session_provider = Self::create_session_provider(config)?;
        let bookmark_store: Arc<dyn BookmarkStore> =
            Arc::new(BookmarkStoreClient::new(session_provider));

        Ok(Self { bookmark_store })
    }

    fn create_session_provider(config: &Settings) -> ApplicationResult<Arc<dyn SessionProvider>> {
        if !Path::new(&config.db_url).exists() {
            return Err(ApplicationError::Other(format!(
                "Database not found at '{}'. Create it with 'smartmark create-db' or set SMARTMARK_DB_URL",
                config.db_url
            )));
        }

        let provider =
            SqliteSessionProvider::from_url(&config.db_url, AccountDirectory::new(&config.accounts))
                .map_err(|e| {
                    ApplicationError::Other(format!("Failed to open bookmark database: {}", e))
                })?
                .with_poll_interval(config.feed_poll_interval());

        Ok(Arc::new(provider))
    }
}

impl std::fmt::Debug for ServiceContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContainer")
            .field("bookmark_store", &"Arc<dyn BookmarkStore>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_missing_database_when_building_container_then_hint() {
        let settings = Settings {
            db_url: "/definitely/not/here/smartmark.db".to_string(),
            ..Settings::default()
        };
        let err = ServiceContainer::new(&settings).unwrap_err();
        assert!(err.to_string().contains("create-db"));
    }

    #[test]
    fn given_existing_database_when_building_container_then_ok() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("smartmark.db");
        SqliteSessionProvider::from_url(path.to_str().unwrap(), AccountDirectory::default())
            .unwrap();

        let settings = Settings {
            db_url: path.to_string_lossy().to_string(),
            ..Settings::default()
        };
        assert!(ServiceContainer::new(&settings).is_ok());
    }
}
