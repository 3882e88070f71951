use std::io;
use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;
use uuid::Uuid;

use crate::remote::{RemoteStore, RemoteStoreError};
use crate::storage::FileStorage;

/// A published merge output on the local filesystem.
#[derive(Debug, Clone)]
pub struct MergeArtifact {
    pub filename: String,
    /// Relative link the client can GET to retrieve the artifact
    pub download_link: String,
}

/// A file published to the remote store, with its shareable links.
#[derive(Debug, Clone)]
pub struct RemoteArtifact {
    pub name: String,
    pub id: String,
    pub view_link: String,
    pub download_link: String,
}

#[derive(Debug)]
pub struct CloudPublishOutcome {
    pub folder_name: String,
    pub folder_id: String,
    pub uploaded_files: Vec<RemoteArtifact>,
    pub merged_file: RemoteArtifact,
}

#[derive(Debug, thiserror::Error)]
pub enum CloudPublishError {
    #[error("could not create the remote grouping folder")]
    FolderCreation(#[source] RemoteStoreError),
    #[error("could not upload the merged document")]
    MergedUpload(#[source] RemoteStoreError),
}

/// Time-derived artifact name, unique per request. The UUID half makes
/// the name collision-resistant even when two merges finish within the
/// same millisecond.
fn artifact_filename() -> String {
    format!(
        "{}_{}_merged.pdf",
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple()
    )
}

/// Publishes merged payloads into the local merged-artifacts directory
/// and hands back a `/merged/...` download link.
#[derive(Debug, Clone)]
pub struct LocalPublisher {
    storage: FileStorage,
}

impl LocalPublisher {
    pub fn new(storage: FileStorage) -> Self {
        Self { storage }
    }

    /// Persists the payload under a fresh unique name. Operates purely on
    /// the in-memory payload; the session scratch space is never touched.
    #[instrument(skip(self, payload))]
    pub fn publish(&self, payload: &[u8]) -> Result<MergeArtifact, io::Error> {
        let filename = artifact_filename();
        self.storage.store_file(&filename, payload)?;

        tracing::info!(
            "Published merged PDF. filename={filename} bytes={}",
            payload.len()
        );

        Ok(MergeArtifact {
            download_link: format!("/merged/{filename}"),
            filename,
        })
    }
}

/// Publishes a whole session to the remote store: one grouping folder
/// holding the uploaded sources and the merged result, all shared.
pub struct CloudPublisher {
    store: Arc<dyn RemoteStore>,
    parent_folder_id: String,
}

impl CloudPublisher {
    pub fn new(store: Arc<dyn RemoteStore>, parent_folder_id: String) -> Self {
        Self {
            store,
            parent_folder_id,
        }
    }

    /// Creates the grouping folder first; if that fails nothing is
    /// uploaded at all. A single source upload failure is logged and
    /// skipped, matching the tolerant per-file policy of the merge
    /// itself. Only a failure to upload the merged result is fatal.
    #[instrument(skip(self, sources, merged_payload))]
    pub async fn publish(
        &self,
        folder_name: &str,
        sources: &[(String, Vec<u8>)],
        merged_payload: &[u8],
    ) -> Result<CloudPublishOutcome, CloudPublishError> {
        let folder = self
            .store
            .create_folder(folder_name, &self.parent_folder_id)
            .await
            .map_err(CloudPublishError::FolderCreation)?;

        let mut uploaded_files = Vec::with_capacity(sources.len());
        for (name, payload) in sources {
            match self.upload_and_share(&folder.id, name, payload.clone()).await {
                Ok(artifact) => uploaded_files.push(artifact),
                Err(error) => {
                    tracing::warn!("Skipping source upload. file={name} error={error}");
                }
            }
        }

        let merged_file = self
            .upload_and_share(&folder.id, &artifact_filename(), merged_payload.to_vec())
            .await
            .map_err(CloudPublishError::MergedUpload)?;

        tracing::info!(
            "Published session to remote store. folder={} sources={}",
            folder.name,
            uploaded_files.len()
        );

        Ok(CloudPublishOutcome {
            folder_name: folder.name,
            folder_id: folder.id,
            uploaded_files,
            merged_file,
        })
    }

    async fn upload_and_share(
        &self,
        folder_id: &str,
        name: &str,
        payload: Vec<u8>,
    ) -> Result<RemoteArtifact, RemoteStoreError> {
        let file = self
            .store
            .upload_file(folder_id, name, "application/pdf", payload)
            .await?;
        let links = self.store.share_file(&file.id).await?;

        Ok(RemoteArtifact {
            name: file.name,
            id: file.id,
            view_link: links.view_link,
            download_link: links.download_link,
        })
    }
}
