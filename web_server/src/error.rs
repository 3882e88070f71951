use actix_multipart::MultipartError;
use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;

use crate::remote::RemoteStoreError;

/// Everything that can go wrong while handling a merge request.
///
/// Client-input problems map to 400 and carry a descriptive message;
/// processing problems map to 500 with a generic message, with the
/// detail logged server-side only.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("No PDF files were uploaded.")]
    NoFilesProvided,

    #[error("Only PDF files are allowed. filename={0}")]
    InvalidFileType(String),

    #[error("File exceeds the allowed size limit. filename={0}")]
    FileTooLarge(String),

    #[error("Could not merge the provided PDFs.")]
    MergeProducedNoPages,

    #[error("Could not read the uploaded files.")]
    BadUpload(#[from] MultipartError),

    #[error("An error occurred while merging the PDFs.")]
    Storage(#[from] std::io::Error),

    #[error("An error occurred while merging the PDFs.")]
    RemoteFolderCreation(#[source] RemoteStoreError),

    #[error("An error occurred while merging the PDFs.")]
    Remote(#[from] RemoteStoreError),

    #[error("An error occurred while merging the PDFs.")]
    Processing(String),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NoFilesProvided
            | ApiError::InvalidFileType(_)
            | ApiError::FileTooLarge(_)
            | ApiError::MergeProducedNoPages
            | ApiError::BadUpload(_) => StatusCode::BAD_REQUEST,
            ApiError::Storage(_)
            | ApiError::RemoteFolderCreation(_)
            | ApiError::Remote(_)
            | ApiError::Processing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            // The Display message stays generic; the detail is only logged.
            tracing::error!("Merge request failed. error={self:?}");
        }
        HttpResponse::build(status).json(json!({ "message": self.to_string() }))
    }
}
