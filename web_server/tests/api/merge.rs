use std::fs;

use reqwest::multipart::{Form, Part};

use crate::helpers::{TEST_MAX_FILE_SIZE, TestApp, page_contents, pdf_with_pages, spawn_app};

async fn upload(app: &TestApp, parts: Vec<(&str, Vec<u8>, &str)>) -> reqwest::Response {
    let mut form = Form::new();
    for (filename, payload, mime) in parts {
        let part = Part::bytes(payload)
            .file_name(filename.to_string())
            .mime_str(mime)
            .expect("Invalid test mime type");
        form = form.part("files", part);
    }

    reqwest::Client::new()
        .post(format!("{}/upload", &app.address))
        .multipart(form)
        .send()
        .await
        .expect("Failed to execute upload request")
}

async fn download(app: &TestApp, link: &str) -> Vec<u8> {
    let response = reqwest::Client::new()
        .get(format!("{}{}", &app.address, link))
        .send()
        .await
        .expect("Failed to download artifact");
    assert!(response.status().is_success());
    response.bytes().await.expect("Failed to read artifact").to_vec()
}

fn entry_count(dir: &std::path::Path) -> usize {
    fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}

#[tokio::test]
async fn merging_two_pdfs_preserves_submission_order() {
    let app = spawn_app().await;

    let response = upload(
        &app,
        vec![
            ("a.pdf", pdf_with_pages(&["A1", "A2"]), "application/pdf"),
            ("b.pdf", pdf_with_pages(&["B1"]), "application/pdf"),
        ],
    )
    .await;

    assert!(response.status().is_success());
    let body: serde_json::Value = response.json().await.expect("Response is not JSON");
    assert_eq!(body["pageCount"], 3);
    assert_eq!(body["skippedFiles"].as_array().unwrap().len(), 0);

    let link = body["mergedFile"]["downloadLink"]
        .as_str()
        .expect("Missing download link");
    assert!(link.starts_with("/merged/"));

    let payload = download(&app, link).await;
    let contents = page_contents(&payload);
    assert_eq!(contents.len(), 3);
    assert!(contents[0].contains("A1"));
    assert!(contents[1].contains("A2"));
    assert!(contents[2].contains("B1"));
}

#[tokio::test]
async fn reordering_inputs_reorders_output() {
    let app = spawn_app().await;

    let response = upload(
        &app,
        vec![
            ("b.pdf", pdf_with_pages(&["B1"]), "application/pdf"),
            ("a.pdf", pdf_with_pages(&["A1"]), "application/pdf"),
        ],
    )
    .await;

    let body: serde_json::Value = response.json().await.expect("Response is not JSON");
    let link = body["mergedFile"]["downloadLink"].as_str().unwrap();

    let contents = page_contents(&download(&app, link).await);
    assert!(contents[0].contains("B1"));
    assert!(contents[1].contains("A1"));
}

#[tokio::test]
async fn upload_without_files_returns_400() {
    let app = spawn_app().await;

    let form = Form::new().text("note", "no files in here");
    let response = reqwest::Client::new()
        .post(format!("{}/upload", &app.address))
        .multipart(form)
        .send()
        .await
        .expect("Failed to execute upload request");

    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.expect("Response is not JSON");
    assert_eq!(body["message"], "No PDF files were uploaded.");
    // nothing was published
    assert_eq!(entry_count(&app.merged_dir), 0);
}

#[tokio::test]
async fn non_pdf_part_is_rejected() {
    let app = spawn_app().await;

    let response = upload(
        &app,
        vec![("notes.txt", b"plain text".to_vec(), "text/plain")],
    )
    .await;

    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.expect("Response is not JSON");
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .contains("Only PDF files are allowed")
    );
    assert_eq!(entry_count(&app.merged_dir), 0);
}

#[tokio::test]
async fn oversize_file_is_rejected() {
    let app = spawn_app().await;

    let oversized = vec![0_u8; TEST_MAX_FILE_SIZE * 2];
    let response = upload(&app, vec![("big.pdf", oversized, "application/pdf")]).await;

    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.expect("Response is not JSON");
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .contains("exceeds the allowed size limit")
    );
    assert_eq!(entry_count(&app.merged_dir), 0);
}

#[tokio::test]
async fn session_scratch_is_removed_after_success() {
    let app = spawn_app().await;

    let response = upload(
        &app,
        vec![("a.pdf", pdf_with_pages(&["A1"]), "application/pdf")],
    )
    .await;
    assert!(response.status().is_success());

    // The per-session directory is gone; only the published artifact remains
    assert_eq!(entry_count(&app.uploads_dir), 0);
    assert_eq!(entry_count(&app.merged_dir), 1);
}

#[tokio::test]
async fn session_scratch_is_removed_after_failure() {
    let app = spawn_app().await;

    // Every input is unparseable, so the merge produces no pages
    let response = upload(
        &app,
        vec![("junk.pdf", b"not a pdf at all".to_vec(), "application/pdf")],
    )
    .await;

    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.expect("Response is not JSON");
    assert_eq!(body["message"], "Could not merge the provided PDFs.");

    assert_eq!(entry_count(&app.uploads_dir), 0);
    assert_eq!(entry_count(&app.merged_dir), 0);
}

#[tokio::test]
async fn corrupt_input_is_skipped_and_reported() {
    let app = spawn_app().await;

    let response = upload(
        &app,
        vec![
            ("a.pdf", pdf_with_pages(&["A1"]), "application/pdf"),
            ("junk.pdf", b"garbage bytes".to_vec(), "application/pdf"),
        ],
    )
    .await;

    assert!(response.status().is_success());
    let body: serde_json::Value = response.json().await.expect("Response is not JSON");
    assert_eq!(body["pageCount"], 1);

    let skipped = body["skippedFiles"].as_array().unwrap();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0]["filename"], "junk.pdf");
}

#[tokio::test]
async fn merging_the_same_files_twice_yields_distinct_artifacts() {
    let app = spawn_app().await;

    let first = upload(
        &app,
        vec![("a.pdf", pdf_with_pages(&["A1"]), "application/pdf")],
    )
    .await;
    let second = upload(
        &app,
        vec![("a.pdf", pdf_with_pages(&["A1"]), "application/pdf")],
    )
    .await;

    let first_body: serde_json::Value = first.json().await.unwrap();
    let second_body: serde_json::Value = second.json().await.unwrap();

    let first_link = first_body["mergedFile"]["downloadLink"].as_str().unwrap();
    let second_link = second_body["mergedFile"]["downloadLink"].as_str().unwrap();
    assert_ne!(first_link, second_link);

    // distinct names, equal page content
    let first_pages = page_contents(&download(&app, first_link).await);
    let second_pages = page_contents(&download(&app, second_link).await);
    assert_eq!(first_pages, second_pages);
}

#[tokio::test]
async fn content_type_parameters_do_not_reject_a_pdf_part() {
    let app = spawn_app().await;

    let response = upload(
        &app,
        vec![(
            "a.pdf",
            pdf_with_pages(&["A1"]),
            "application/pdf; name=a.pdf",
        )],
    )
    .await;

    assert!(response.status().is_success());
    let body: serde_json::Value = response.json().await.expect("Response is not JSON");
    assert_eq!(body["pageCount"], 1);
}

#[tokio::test]
async fn download_route_rejects_traversal_attempts() {
    let app = spawn_app().await;

    // A file one level above the merged directory must stay unreachable
    let outside = app.merged_dir.parent().unwrap().join("secret.pdf");
    fs::write(outside, b"not yours").unwrap();

    for path in [
        "/merged/..%2Fsecret.pdf",
        "/merged/..%5Csecret.pdf",
        "/merged/..secret.pdf",
    ] {
        let response = reqwest::Client::new()
            .get(format!("{}{}", &app.address, path))
            .send()
            .await
            .expect("Failed to execute request");

        assert_eq!(response.status(), 404, "served {path}");
    }
}

#[tokio::test]
async fn download_route_rejects_unknown_artifacts() {
    let app = spawn_app().await;

    let response = reqwest::Client::new()
        .get(format!("{}/merged/never_published.pdf", &app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 404);
}
