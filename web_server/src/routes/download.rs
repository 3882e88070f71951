use std::io::Read;
use std::sync::Arc;

use actix_web::{HttpResponse, web};
use tracing::instrument;

use crate::startup::AppServices;

/// Serves a previously published artifact from the merged directory.
#[instrument(skip(services))]
pub async fn download_artifact(
    path: web::Path<String>,
    services: web::Data<Arc<AppServices>>,
) -> HttpResponse {
    let filename = path.into_inner();

    // Generated artifact names never contain path separators; anything
    // else is not ours to serve.
    if filename.contains(['/', '\\']) || filename.contains("..") {
        return HttpResponse::NotFound().finish();
    }

    match services.artifacts.get_file(&filename) {
        Some(mut file) => {
            let mut payload = Vec::new();
            if let Err(error) = file.read_to_end(&mut payload) {
                tracing::error!("Failed to read artifact. filename={filename} error={error}");
                return HttpResponse::InternalServerError().finish();
            }
            HttpResponse::Ok()
                .content_type("application/pdf")
                .body(payload)
        }
        None => HttpResponse::NotFound().finish(),
    }
}
