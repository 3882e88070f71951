use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// A per-session grouping in the remote store, holding the uploaded
/// sources and the merged artifact together.
#[derive(Debug, Clone)]
pub struct RemoteFolder {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
}

/// Link pair returned once a file has been made publicly readable.
#[derive(Debug, Clone)]
pub struct ShareLinks {
    pub view_link: String,
    pub download_link: String,
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct RemoteStoreError(pub String);

/// The remote object-store operations this service relies on. The
/// concrete client is an external collaborator injected at startup;
/// the publisher and the retention sweeper only ever see this trait,
/// which keeps both testable against an in-memory fake.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn create_folder(
        &self,
        name: &str,
        parent_id: &str,
    ) -> Result<RemoteFolder, RemoteStoreError>;

    async fn upload_file(
        &self,
        folder_id: &str,
        name: &str,
        content_type: &str,
        payload: Vec<u8>,
    ) -> Result<RemoteFile, RemoteStoreError>;

    /// Grants public read access to a file and returns its link pair.
    async fn share_file(&self, file_id: &str) -> Result<ShareLinks, RemoteStoreError>;

    async fn list_folders(&self, parent_id: &str) -> Result<Vec<RemoteFolder>, RemoteStoreError>;

    /// Removes a folder together with everything inside it.
    async fn delete_folder(&self, folder_id: &str) -> Result<(), RemoteStoreError>;
}
