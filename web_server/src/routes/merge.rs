use std::path::PathBuf;
use std::sync::Arc;

use actix_multipart::{Field, Multipart};
use actix_web::{HttpResponse, web};
use futures::TryStreamExt;
use merger::pdf::merge::{MergeError, MergeOutcome, merge_documents};
use serde::Serialize;
use tracing::instrument;

use crate::error::ApiError;
use crate::publisher::{CloudPublishError, CloudPublisher, RemoteArtifact};
use crate::session::{UploadSession, UploadedFile};
use crate::startup::AppServices;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LocalMergeResponse {
    merged_file: DownloadLinkBody,
    page_count: usize,
    skipped_files: Vec<SkippedFileBody>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DownloadLinkBody {
    download_link: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CloudMergeResponse {
    folder_name: String,
    folder_id: String,
    uploaded_files: Vec<RemoteFileBody>,
    merged_file: RemoteFileBody,
    page_count: usize,
    skipped_files: Vec<SkippedFileBody>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RemoteFileBody {
    name: String,
    id: String,
    view_link: String,
    download_link: String,
}

#[derive(Serialize)]
struct SkippedFileBody {
    filename: String,
    reason: String,
}

impl From<RemoteArtifact> for RemoteFileBody {
    fn from(artifact: RemoteArtifact) -> Self {
        Self {
            name: artifact.name,
            id: artifact.id,
            view_link: artifact.view_link,
            download_link: artifact.download_link,
        }
    }
}

/// `POST /upload`: receive N PDF parts in client order, merge their
/// pages into one document and publish it.
///
/// The session directory lives for the scope of this function; its Drop
/// removes it on every exit path, success or failure.
#[instrument(skip(payload, services))]
pub async fn merge_upload(
    payload: Multipart,
    services: web::Data<Arc<AppServices>>,
) -> Result<HttpResponse, ApiError> {
    let settings = &services.settings;
    let session = UploadSession::create(&settings.storage.uploads_dir)?;

    let files = receive_files(payload, &session, settings.storage.max_file_size_bytes).await?;
    if files.is_empty() {
        return Err(ApiError::NoFilesProvided);
    }

    tracing::info!(
        "Merging uploaded PDFs. session={} files={}",
        session.token(),
        files.len()
    );

    // The merge is pure CPU and file IO over the session files, so it
    // runs off the async worker threads.
    let paths: Vec<PathBuf> = files.iter().map(|file| file.path.clone()).collect();
    let outcome = tokio::task::spawn_blocking(move || merge_documents(&paths))
        .await
        .map_err(|error| ApiError::Processing(format!("merge task failed: {error}")))?
        .map_err(|error| match error {
            MergeError::NoPages => ApiError::MergeProducedNoPages,
            other => ApiError::Processing(other.to_string()),
        })?;

    let response = match (&services.remote, &settings.remote) {
        (Some(store), Some(remote_settings)) => {
            let publisher =
                CloudPublisher::new(store.clone(), remote_settings.parent_folder_id.clone());
            publish_remote(&publisher, &session, &files, outcome).await?
        }
        _ => {
            let artifact = services.publisher.publish(&outcome.payload)?;
            HttpResponse::Ok().json(LocalMergeResponse {
                merged_file: DownloadLinkBody {
                    download_link: artifact.download_link,
                },
                page_count: outcome.page_count,
                skipped_files: skipped_bodies(&outcome),
            })
        }
    };

    Ok(response)
}

/// Drains the multipart stream in arrival order, validating and storing
/// each file part into the session. Part order is the merge order; the
/// filesystem is never re-listed to recover it.
async fn receive_files(
    mut payload: Multipart,
    session: &UploadSession,
    max_bytes: usize,
) -> Result<Vec<UploadedFile>, ApiError> {
    let mut files = Vec::new();

    while let Some(mut field) = payload.try_next().await? {
        let Some(filename) = field
            .content_disposition()
            .get_filename()
            .map(str::to_owned)
        else {
            // Non-file form fields carry nothing we merge
            drain_field(&mut field).await?;
            continue;
        };

        // Parameters such as `name=` or `charset=` do not change what
        // the part is, so only the type/subtype pair is checked.
        match field.content_type() {
            Some(content_type)
                if content_type.essence_str() == mime::APPLICATION_PDF.essence_str() => {}
            _ => return Err(ApiError::InvalidFileType(filename)),
        }

        let mut data = web::BytesMut::new();
        while let Some(chunk) = field.try_next().await? {
            if data.len() + chunk.len() > max_bytes {
                return Err(ApiError::FileTooLarge(filename));
            }
            data.extend_from_slice(&chunk);
        }

        files.push(session.store_file(&filename, &data)?);
    }

    Ok(files)
}

async fn drain_field(field: &mut Field) -> Result<(), ApiError> {
    while let Some(_chunk) = field.try_next().await? {}
    Ok(())
}

async fn publish_remote(
    publisher: &CloudPublisher,
    session: &UploadSession,
    files: &[UploadedFile],
    outcome: MergeOutcome,
) -> Result<HttpResponse, ApiError> {
    // The sources go up alongside the merged result, in session order
    let mut sources = Vec::with_capacity(files.len());
    for file in files {
        sources.push((file.filename.clone(), tokio::fs::read(&file.path).await?));
    }

    let published = publisher
        .publish(session.token(), &sources, &outcome.payload)
        .await
        .map_err(|error| match error {
            CloudPublishError::FolderCreation(source) => ApiError::RemoteFolderCreation(source),
            CloudPublishError::MergedUpload(source) => ApiError::Remote(source),
        })?;

    Ok(HttpResponse::Ok().json(CloudMergeResponse {
        folder_name: published.folder_name,
        folder_id: published.folder_id,
        uploaded_files: published
            .uploaded_files
            .into_iter()
            .map(RemoteFileBody::from)
            .collect(),
        merged_file: RemoteFileBody::from(published.merged_file),
        page_count: outcome.page_count,
        skipped_files: skipped_bodies(&outcome),
    }))
}

fn skipped_bodies(outcome: &MergeOutcome) -> Vec<SkippedFileBody> {
    outcome
        .skipped
        .iter()
        .map(|skipped| SkippedFileBody {
            filename: skipped.filename.clone(),
            reason: skipped.reason.clone(),
        })
        .collect()
}
