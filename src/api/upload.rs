// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! File relay to the content store.
//!
//! Accepts one multipart `file` field and pins its bytes unchanged. The
//! relay does not inspect or decrypt what it forwards.

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use tracing::info;

use super::{record_outcome, ActiveSession};
use crate::{
    error::ApiError,
    models::UploadResponse,
    state::AppState,
    storage::{AuditEvent, AuditEventType},
};

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

const FILE_FIELD: &str = "file";
const FALLBACK_FILE_NAME: &str = "upload.bin";

#[utoipa::path(
    post,
    path = "/v1/upload",
    tag = "Upload",
    params(("X-Wallet-Address" = String, Header, description = "Uploading wallet")),
    request_body(content_type = "multipart/form-data", description = "Form with a `file` field"),
    responses(
        (status = 201, description = "File pinned", body = UploadResponse),
        (status = 400, description = "Missing or malformed file field"),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 403, description = "Wallet belongs to another user"),
        (status = 413, description = "File too large"),
        (status = 503, description = "Content store unavailable")
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_file(
    ActiveSession(session): ActiveSession,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(multipart_error)?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = sanitize_file_name(field.file_name());
        let bytes = field
            .bytes()
            .await
            .map_err(multipart_error)?;
        upload = Some((file_name, bytes));
        break;
    }

    let (file_name, bytes) =
        upload.ok_or_else(|| ApiError::bad_request("Multipart field `file` is required"))?;
    if bytes.is_empty() {
        return Err(ApiError::unprocessable("Uploaded file is empty"));
    }
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(file_too_large());
    }

    let size = bytes.len();
    let result = state.content.put_file(&file_name, bytes.to_vec()).await;
    let mut event = AuditEvent::new(AuditEventType::ContentUploaded)
        .with_actor(session.address())
        .with_details(json!({ "file_name": file_name, "size": size }));
    if let Ok(id) = &result {
        event = event.with_resource("content", id);
    }
    record_outcome(&state, event, &result);

    let id = result?;
    info!(uploader = %session.address(), content_id = %id, size, "File relayed to content store");

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            ipfs_hash: id.to_string(),
            file_name,
            size,
        }),
    ))
}

fn file_too_large() -> ApiError {
    ApiError::new(
        StatusCode::PAYLOAD_TOO_LARGE,
        "FILE_TOO_LARGE",
        format!("Uploads are limited to {MAX_UPLOAD_BYTES} bytes"),
    )
}

/// A body cut off by the request size limit is a 413, not a bad form.
fn multipart_error(err: MultipartError) -> ApiError {
    match err.status() {
        StatusCode::PAYLOAD_TOO_LARGE => file_too_large(),
        _ => ApiError::bad_request(err.body_text()),
    }
}

/// Keep only the final path component of a client-supplied name.
fn sanitize_file_name(raw: Option<&str>) -> String {
    raw.and_then(|name| name.rsplit(['/', '\\']).next())
        .map(str::trim)
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
        .unwrap_or(FALLBACK_FILE_NAME)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::TestApp;
    use crate::content::{ContentId, ContentStore};
    use axum::{
        body::Body,
        extract::FromRequest,
        http::{header::CONTENT_TYPE, Request},
    };

    async fn multipart(parts: &[(&str, Option<&str>, &str)]) -> Multipart {
        let mut body = String::new();
        for (name, file_name, content) in parts {
            body.push_str("--BOUNDARY\r\n");
            match file_name {
                Some(file_name) => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n"
                )),
                None => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"\r\n"
                )),
            }
            body.push_str("Content-Type: application/octet-stream\r\n\r\n");
            body.push_str(content);
            body.push_str("\r\n");
        }
        body.push_str("--BOUNDARY--\r\n");

        let request = Request::builder()
            .method("POST")
            .uri("/v1/upload")
            .header(CONTENT_TYPE, "multipart/form-data; boundary=BOUNDARY")
            .body(Body::from(body))
            .unwrap();
        Multipart::from_request(request, &()).await.unwrap()
    }

    #[tokio::test]
    async fn file_field_is_pinned_verbatim() {
        let app = TestApp::new();
        let address = app.wallet();
        let form = multipart(&[
            ("note", None, "ignored"),
            ("file", Some("../../aadhaar.png"), "scan-bytes"),
        ])
        .await;

        let (status, Json(uploaded)) =
            upload_file(ActiveSession(app.session(address)), State(app.state.clone()), form)
                .await
                .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(uploaded.file_name, "aadhaar.png");
        assert_eq!(uploaded.size, 10);

        let stored = app
            .content
            .get(&ContentId::new(uploaded.ipfs_hash))
            .await
            .unwrap();
        assert_eq!(stored, b"scan-bytes");
    }

    #[tokio::test]
    async fn missing_file_field_is_bad_request() {
        let app = TestApp::new();
        let address = app.wallet();
        let form = multipart(&[("note", None, "hello")]).await;

        let err = upload_file(ActiveSession(app.session(address)), State(app.state.clone()), form)
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(app.content.put_count(), 0);
    }

    #[test]
    fn file_names_lose_directories() {
        assert_eq!(sanitize_file_name(Some("a/b/c.pdf")), "c.pdf");
        assert_eq!(sanitize_file_name(Some("C:\\docs\\id.jpg")), "id.jpg");
        assert_eq!(sanitize_file_name(Some("..")), FALLBACK_FILE_NAME);
        assert_eq!(sanitize_file_name(None), FALLBACK_FILE_NAME);
    }
}
