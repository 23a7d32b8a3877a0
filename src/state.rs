use crate::services::{flash_service::FlashSigner, upload_service::UploadService};

/// Shared, read-only state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub uploads: UploadService,
    pub flash: FlashSigner,
}
