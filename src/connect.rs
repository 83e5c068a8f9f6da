use crate::config::SeedOpts;
use crate::error::SeedError;
use crate::mongodb::MongoTarget;
use crate::target::Connector;
use async_trait::async_trait;
use bson::doc;
use mongodb::options::{ClientOptions, Credential};
use mongodb::Client;

const APP_NAME: &str = "mongo-seed";

/// Opens a new MongoDB client for every seed operation.
#[derive(Clone, Debug)]
pub struct MongoConnector {
    opts: SeedOpts,
}

impl MongoConnector {
    pub fn new(opts: SeedOpts) -> Self {
        Self { opts }
    }

    fn connection_error(&self, source: mongodb::error::Error) -> SeedError {
        SeedError::Connection {
            target: self.opts.masked_connection_string(),
            source: Box::new(source),
        }
    }

    /// Driver options for the configured server, credentials and timeouts.
    pub async fn client_options(&self) -> Result<ClientOptions, SeedError> {
        let mut options = ClientOptions::parse(self.opts.server_uri())
            .await
            .map_err(|e| self.connection_error(e))?;

        if let Some((username, password)) = self.opts.credentials() {
            options.credential = Some(
                Credential::builder()
                    .username(username.to_string())
                    .password(password.to_string())
                    .build(),
            );
        }
        if let Some(timeout) = self.opts.connect_timeout {
            options.connect_timeout = Some(timeout);
            options.server_selection_timeout = Some(timeout);
        }
        options.app_name = Some(APP_NAME.to_string());

        Ok(options)
    }
}

#[async_trait]
impl Connector for MongoConnector {
    type Target = MongoTarget;

    async fn connect(&self) -> Result<MongoTarget, SeedError> {
        tracing::debug!(
            "Connecting to MongoDB at {}",
            self.opts.masked_connection_string()
        );
        let options = self.client_options().await?;
        let client = Client::with_options(options).map_err(|e| self.connection_error(e))?;
        let database = client.database(&self.opts.dbname);

        // The driver connects lazily; ping so that failures surface here
        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| self.connection_error(e))?;

        tracing::info!(
            "Connected to MongoDB database '{}' at {}",
            self.opts.dbname,
            self.opts.masked_connection_string()
        );
        Ok(MongoTarget::new(client, database))
    }

    fn database_name(&self) -> &str {
        &self.opts.dbname
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_client_options_with_credentials() {
        let opts = SeedOpts::new("localhost", "cit_test")
            .with_port(27018)
            .with_credentials("root", "p@ss:word")
            .with_connect_timeout(Duration::from_secs(3));
        let options = MongoConnector::new(opts).client_options().await.unwrap();

        let credential = options.credential.unwrap();
        assert_eq!(credential.username.as_deref(), Some("root"));
        assert_eq!(credential.password.as_deref(), Some("p@ss:word"));
        assert_eq!(options.connect_timeout, Some(Duration::from_secs(3)));
        assert_eq!(options.server_selection_timeout, Some(Duration::from_secs(3)));
        assert_eq!(options.hosts.len(), 1);
    }

    #[tokio::test]
    async fn test_client_options_without_credentials() {
        let opts = SeedOpts::new("localhost", "cit_test");
        let options = MongoConnector::new(opts).client_options().await.unwrap();
        assert!(options.credential.is_none());
        assert_eq!(options.app_name.as_deref(), Some(APP_NAME));
    }
}
