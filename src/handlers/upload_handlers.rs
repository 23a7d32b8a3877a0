//! HTTP handlers for the upload form.
//! `GET /` renders the form plus any pending flash; `POST /` streams the
//! `file` field to `UploadService` and always answers with a redirect.

use crate::{
    errors::AppError,
    models::{category::UploadPolicy, upload::StoredFile},
    services::{
        flash_service::{self, Flash, FlashSigner},
        upload_service::{UploadError, UploadResult, UploadService},
    },
    state::AppState,
};
use axum::{
    extract::{Multipart, State, multipart::MultipartRejection},
    http::{HeaderMap, header},
    response::{Html, IntoResponse, Redirect, Response},
};
use futures::StreamExt;
use std::io::{self, ErrorKind};
use tracing::{debug, error, info, warn};

const INDEX_TEMPLATE: &str = include_str!("../../templates/index.html");

/// `GET /` — the upload form. A pending flash is shown once and cleared.
pub async fn upload_form(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let cookie = flash_service::cookie_value(&headers);
    let flash = cookie.and_then(|value| state.flash.open(value));
    let body = render_form(&state.uploads.policy, flash.as_ref());

    match cookie {
        Some(_) => (
            [(header::SET_COOKIE, flash_service::clear_cookie())],
            Html(body),
        )
            .into_response(),
        None => Html(body).into_response(),
    }
}

/// `POST /` — accept one multipart `file` field and sort it into its folder.
///
/// Every outcome, including a body that cannot be parsed or breaks off
/// mid-file, ends in a redirect carrying a flash.
pub async fn upload_file(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, AppError> {
    let outcome = match multipart {
        Ok(multipart) => receive_upload(&state.uploads, multipart).await,
        Err(rejection) => {
            debug!("request is not a multipart form: {}", rejection);
            Err(UploadError::MissingFileField)
        }
    };

    let flash = match outcome {
        Ok(stored) => {
            info!(
                path = %stored.path.display(),
                folder = stored.folder,
                size_bytes = stored.size_bytes,
                md5 = %stored.md5,
                "stored upload"
            );
            Flash::success(success_message(&stored))
        }
        Err(err @ UploadError::Interrupted(_)) => {
            warn!("upload body interrupted: {}", err);
            Flash::error(rejection_message(&err, &state.uploads.policy))
        }
        Err(err @ UploadError::Io(_)) => {
            error!("failed to save upload: {}", err);
            Flash::error(rejection_message(&err, &state.uploads.policy))
        }
        Err(err) => {
            warn!("rejected upload: {}", err);
            Flash::error(rejection_message(&err, &state.uploads.policy))
        }
    };

    redirect_with_flash(&state.flash, &flash)
}

/// Walk the form until the first `file` field that carries a filename and
/// stream it to disk. Other fields are skipped.
///
/// The form is read leniently: if it stops parsing before a file part shows
/// up, the request is treated as having no file part.
async fn receive_upload(
    service: &UploadService,
    mut multipart: Multipart,
) -> UploadResult<StoredFile> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                debug!("multipart body stopped parsing before a file part: {}", err);
                break;
            }
        };

        if field.name() != Some("file") {
            continue;
        }
        // A plain text field named `file` is not a file part.
        let Some(raw_name) = field.file_name().map(str::to_string) else {
            continue;
        };

        let upload = service.classify(&raw_name)?;
        debug!(
            raw_name = %raw_name,
            filename = %upload.filename,
            extension = %upload.extension,
            folder = upload.category.folder(),
            "accepted upload"
        );

        let stream = field.map(|chunk| chunk.map_err(|err| io::Error::new(ErrorKind::Other, err)));
        return service.store_stream(&upload, stream).await;
    }

    Err(UploadError::MissingFileField)
}

fn success_message(stored: &StoredFile) -> String {
    let filename = stored
        .path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!(
        "Success! File \"{}\" was uploaded and saved in the {} folder.",
        filename, stored.folder
    )
}

fn rejection_message(err: &UploadError, policy: &UploadPolicy) -> String {
    match err {
        UploadError::MissingFileField => {
            "No file part in the request. Please select a file.".to_string()
        }
        UploadError::EmptyFilename => {
            "No file selected. Please select a file to upload.".to_string()
        }
        UploadError::DisallowedExtension(_) => format!(
            "Invalid file type. Allowed types are: {}.",
            policy.describe()
        ),
        UploadError::InvalidFilename(_) => {
            "Invalid file name. Please rename the file and try again.".to_string()
        }
        UploadError::Interrupted(_) => {
            "The upload was interrupted. Please try again.".to_string()
        }
        UploadError::Io(_) => {
            "The file could not be saved. Please try again later.".to_string()
        }
    }
}

fn redirect_with_flash(signer: &FlashSigner, flash: &Flash) -> Result<Response, AppError> {
    let cookie = signer.set_cookie(flash)?;
    Ok(([(header::SET_COOKIE, cookie)], Redirect::to("/")).into_response())
}

fn render_form(policy: &UploadPolicy, flash: Option<&Flash>) -> String {
    let banner = flash
        .map(|f| {
            format!(
                r#"<div class="{}" role="status">{}</div>"#,
                f.level.css_class(),
                html_escape(&f.message)
            )
        })
        .unwrap_or_default();

    INDEX_TEMPLATE
        .replace("{{ accept }}", &html_escape(&policy.accept_attr()))
        .replace("{{ allowed }}", &html_escape(&policy.describe()))
        .replace("{{ flash }}", &banner)
}

fn html_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
