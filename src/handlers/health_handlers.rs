//! Health & readiness handlers.
//!
//! - GET /healthz  -> simple liveness ("ok")
//! - GET /readyz   -> readiness that checks every category folder is writable

use crate::{models::category::Category, state::AppState};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::{collections::BTreeMap, path::Path};
use tokio::fs;
use uuid::Uuid;

/// `GET /healthz`
///
/// Very small liveness probe — always returns 200 OK with a plain JSON body.
/// This endpoint should be cheap and never perform I/O.
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
        }),
    )
}

/// `GET /readyz`
///
/// Performs a write/read/delete of a probe file in each category folder.
///
/// HTTP 200 when all checks pass, HTTP 503 when any fails.
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let mut checks = BTreeMap::new();
    for category in Category::ALL {
        let dir = state.uploads.category_root(category);
        let check = match probe_dir(&dir).await {
            Ok(()) => CheckStatus {
                ok: true,
                error: None,
            },
            Err(e) => CheckStatus {
                ok: false,
                error: Some(e),
            },
        };
        checks.insert(category.folder(), check);
    }

    let overall_ok = checks.values().all(|c| c.ok);
    let body = ReadyResponse {
        status: if overall_ok {
            "ok".into()
        } else {
            "error".into()
        },
        checks,
    };

    let status = if overall_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

async fn probe_dir(dir: &Path) -> Result<(), String> {
    let tmp_path = dir.join(format!(".readyz-{}", Uuid::new_v4()));
    fs::write(&tmp_path, b"readyz")
        .await
        .map_err(|e| format!("could not write tmp file: {}", e))?;

    let result = match fs::read(&tmp_path).await {
        Ok(bytes) if bytes == b"readyz" => Ok(()),
        Ok(_) => Err("file content mismatch".to_string()),
        Err(e) => Err(format!("could not read tmp file: {}", e)),
    };

    match fs::remove_file(&tmp_path).await {
        Ok(_) => result,
        Err(e) => result.and(Err(format!("could not remove tmp file: {}", e))),
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: String,
    checks: BTreeMap<&'static str, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<String>,
}

#[cfg(test)]
mod tests {
    use crate::{
        models::category::UploadPolicy,
        routes::routes::app,
        services::{flash_service::FlashSigner, upload_service::UploadService},
        state::AppState,
    };
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::{Value, json};
    use tempfile::TempDir;

    fn server(dir: &TempDir) -> (TestServer, UploadService) {
        let uploads = UploadService::new(dir.path().join("uploaded_files"), UploadPolicy::default());
        let state = AppState {
            uploads: uploads.clone(),
            flash: FlashSigner::new("test-secret-key-for-testing-only").unwrap(),
        };
        let server = TestServer::new(app(state)).expect("Failed to create test server");
        (server, uploads)
    }

    #[tokio::test]
    async fn healthz_is_ok() {
        let dir = TempDir::new().unwrap();
        let (server, _) = server(&dir);

        let response = server.get("/healthz").await;

        response.assert_status_ok();
        response.assert_json(&json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn readyz_checks_every_folder() {
        let dir = TempDir::new().unwrap();
        let (server, uploads) = server(&dir);
        uploads.init_folders().await.unwrap();

        let response = server.get("/readyz").await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["status"], "ok");
        for folder in ["pdf", "doc", "image"] {
            assert_eq!(body["checks"][folder]["ok"], true);
        }
        // probe files are cleaned up
        for folder in ["pdf", "doc", "image"] {
            let dir = uploads.base_path.join(folder);
            assert_eq!(std::fs::read_dir(dir).unwrap().count(), 0);
        }
    }

    #[tokio::test]
    async fn readyz_reports_missing_folders() {
        let dir = TempDir::new().unwrap();
        let (server, _) = server(&dir);

        let response = server.get("/readyz").await;

        response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
        let body: Value = response.json();
        assert_eq!(body["status"], "error");
        assert_eq!(body["checks"]["pdf"]["ok"], false);
    }
}
