use log::{error, info};
use std::future::Future;
use std::sync::Arc;

use crate::analysis::Analyzer;
use crate::configuration::config::Config;
use crate::error_handling::types::*;
use crate::storage::DatabaseStorage;
use crate::web_interface::WebServer;

/// Owns the service lifecycle: opens the store, builds the analyzer, serves the API and closes
/// the store once the server has stopped.
pub struct Controller {
    pub config: Config,
}

impl Controller {
    pub fn new(config: Config) -> Result<Self, ControllerError> {
        config.validate().map_err(|e| {
            error!("Invalid configuration: {}", e);
            ControllerError::ConfigurationError(e)
        })?;
        Ok(Self { config })
    }

    /// Run until `shutdown` completes.
    pub async fn run<F>(&self, shutdown: F) -> Result<(), ControllerError>
    where
        F: Future<Output = ()> + Send,
    {
        let addr = self
            .config
            .socket_addr()
            .map_err(ControllerError::ConfigurationError)?;

        info!("Opening database {}", self.config.database_path.display());
        let storage = Arc::new(
            DatabaseStorage::new_file(&self.config.database_path, self.config.max_connections)
                .await
                .map_err(ControllerError::StorageError)?,
        );

        let analyzer = Analyzer::new(storage.clone(), self.config.analyzer_settings())
            .await
            .map_err(ControllerError::AnalysisError)?;
        let server = WebServer::new(Arc::new(analyzer), self.config.query_limits());

        let served = server
            .start(addr, shutdown)
            .await
            .map_err(ControllerError::WebError);

        info!("Closing database");
        storage.close().await.map_err(ControllerError::StorageError)?;
        served
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = Config {
            bind_address: "localhost".into(),
            ..Default::default()
        };
        assert!(matches!(
            Controller::new(config),
            Err(ControllerError::ConfigurationError(ConfigError::BadIPFormatting(_)))
        ));
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown_and_keeps_database() {
        let dir = TempDir::new().unwrap();
        let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = probe.local_addr().unwrap().port();
        drop(probe);

        let db_path = dir.path().join("nested").join("vigie.sqlite3");
        let controller = Controller::new(Config {
            bind_address: "127.0.0.1".into(),
            port,
            database_path: db_path.clone(),
            ..Default::default()
        })
        .unwrap();

        controller
            .run(tokio::time::sleep(std::time::Duration::from_millis(50)))
            .await
            .unwrap();
        assert!(db_path.exists());
    }
}
