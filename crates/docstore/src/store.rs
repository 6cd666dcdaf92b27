use std::sync::Arc;

use {
    chanstore_channels::MessageGateway,
    chanstore_config::ChanstoreConfig,
    chanstore_discord::DiscordGateway,
    serde::{Serialize, de::DeserializeOwned},
    tracing::info,
};

use crate::{Result, document::Document, repository::DocumentRepository};

/// Public entry point: one gateway connection plus the repository over it.
pub struct DocumentStore<G: ?Sized> {
    gateway: Arc<G>,
    repository: DocumentRepository<G>,
}

impl DocumentStore<DiscordGateway> {
    /// Validate `config`, open the Discord session, and wire a repository.
    ///
    /// Returns before the session is ready; await [`is_ready`](Self::is_ready)
    /// before issuing document calls.
    pub async fn connect(config: &ChanstoreConfig) -> Result<Self> {
        chanstore_config::validate(config).into_result()?;

        let gateway = Arc::new(DiscordGateway::new(config.discord.clone()));
        gateway.connect().await?;
        info!(guild_id = gateway.guild_id(), "document store connected");
        Ok(Self::with_gateway(gateway))
    }

    pub async fn shutdown(&self) {
        self.gateway.shutdown().await;
    }
}

impl<G: MessageGateway + ?Sized> DocumentStore<G> {
    pub fn with_gateway(gateway: Arc<G>) -> Self {
        let repository = DocumentRepository::new(Arc::clone(&gateway));
        Self {
            gateway,
            repository,
        }
    }

    pub fn gateway(&self) -> &Arc<G> {
        &self.gateway
    }

    pub fn repository(&self) -> &DocumentRepository<G> {
        &self.repository
    }

    /// Wait for the connection to come up or stop, then report whether it
    /// is ready.
    pub async fn is_ready(&self) -> bool {
        self.gateway.wait_until_ready().await;
        self.gateway.is_ready()
    }

    pub async fn insert<T: Serialize + ?Sized>(&self, collection: &str, data: &T) -> Result<String> {
        self.repository.insert(collection, data).await
    }

    pub async fn find_all<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<Document<T>>> {
        self.repository.find_all(collection).await
    }

    pub async fn find_by_id<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document<T>>> {
        self.repository.find_by_id(collection, id).await
    }

    pub async fn update<P: Serialize + ?Sized>(
        &self,
        collection: &str,
        id: &str,
        partial: &P,
    ) -> Result<bool> {
        self.repository.update(collection, id, partial).await
    }

    pub async fn delete(&self, collection: &str, id: &str) -> Result<bool> {
        self.repository.delete(collection, id).await
    }
}
