//! src/services/upload_service.rs
//!
//! UploadService — validates client file names against the upload policy and
//! streams accepted files to `base_path/{category}/{filename}`. There is no
//! index of what was uploaded; the directory tree is the only record.

use crate::models::{
    category::{Category, UploadPolicy},
    upload::{StoredFile, UploadedFile, extension_of, secure_filename},
};
use bytes::Bytes;
use futures::{Stream, StreamExt, pin_mut};
use md5::Context;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("no file part in the request")]
    MissingFileField,
    #[error("no file selected")]
    EmptyFilename,
    #[error("file type of `{0}` is not allowed")]
    DisallowedExtension(String),
    #[error("`{0}` does not leave a usable file name")]
    InvalidFilename(String),
    #[error("upload body interrupted: {0}")]
    Interrupted(#[source] io::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type UploadResult<T> = Result<T, UploadError>;

/// UploadService sorts uploads into category folders:
/// - `classify` turns a client file name into an [`UploadedFile`] or a rejection
/// - `store_stream` writes the bytes, replacing any file of the same name
/// - `init_folders` creates the folder tree at startup
#[derive(Clone)]
pub struct UploadService {
    /// Root directory holding one folder per category.
    pub base_path: PathBuf,

    /// Accepted extensions and their folders.
    pub policy: Arc<UploadPolicy>,
}

impl UploadService {
    pub fn new(base_path: impl Into<PathBuf>, policy: UploadPolicy) -> Self {
        Self {
            base_path: base_path.into(),
            policy: Arc::new(policy),
        }
    }

    /// Ensure the root and every category folder exist. Safe to call on
    /// every startup.
    pub async fn init_folders(&self) -> io::Result<()> {
        fs::create_dir_all(&self.base_path).await?;
        for category in Category::ALL {
            let dir = self.category_root(category);
            if fs::try_exists(&dir).await? {
                debug!("category folder {} present", dir.display());
            } else {
                fs::create_dir_all(&dir).await?;
                info!("created category folder {}", dir.display());
            }
        }
        Ok(())
    }

    /// Folder for one category. Does not check for existence.
    pub fn category_root(&self, category: Category) -> PathBuf {
        self.base_path.join(category.folder())
    }

    /// Validate a client-supplied file name.
    ///
    /// Checks run in order: empty name, extension of the raw name, then the
    /// sanitized name must still be non-empty and carry an allowed extension.
    pub fn classify(&self, raw_name: &str) -> UploadResult<UploadedFile> {
        if raw_name.is_empty() {
            return Err(UploadError::EmptyFilename);
        }

        let raw_allowed = extension_of(raw_name)
            .map(|ext| self.policy.is_allowed(&ext))
            .unwrap_or(false);
        if !raw_allowed {
            return Err(UploadError::DisallowedExtension(raw_name.to_string()));
        }

        let filename = secure_filename(raw_name);
        let (stem, extension) = match filename.rsplit_once('.') {
            Some((stem, ext)) => (stem, ext.to_ascii_lowercase()),
            None => return Err(UploadError::InvalidFilename(raw_name.to_string())),
        };
        if stem.is_empty() {
            return Err(UploadError::InvalidFilename(raw_name.to_string()));
        }
        let category = self
            .policy
            .category_for(&extension)
            .ok_or_else(|| UploadError::InvalidFilename(raw_name.to_string()))?;

        Ok(UploadedFile {
            filename,
            extension,
            category,
        })
    }

    /// Final path for an accepted upload.
    pub fn destination(&self, upload: &UploadedFile) -> PathBuf {
        self.category_root(upload.category).join(&upload.filename)
    }

    /// Stream an upload to disk.
    ///
    /// - Writes chunks to a temp file next to the destination.
    /// - Computes size and MD5 while streaming.
    /// - Renames over the destination, so an existing file is replaced whole.
    ///
    /// A failing source stream yields `Interrupted`; a failing disk yields
    /// `Io`. Either way the temp file is removed.
    pub async fn store_stream<S>(&self, upload: &UploadedFile, stream: S) -> UploadResult<StoredFile>
    where
        S: Stream<Item = io::Result<Bytes>>,
    {
        let file_path = self.destination(upload);
        let parent = file_path.parent().map(Path::to_path_buf).ok_or_else(|| {
            UploadError::Io(io::Error::new(
                ErrorKind::Other,
                "upload path missing parent directory",
            ))
        })?;
        fs::create_dir_all(&parent).await?;
        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));
        let mut file = File::create(&tmp_path).await?;

        let mut size_bytes: u64 = 0;
        let mut digest = Context::new();
        pin_mut!(stream);
        while let Some(chunk_res) = stream.next().await {
            let chunk = match chunk_res {
                Ok(chunk) => chunk,
                Err(err) => {
                    let _ = fs::remove_file(&tmp_path).await;
                    return Err(UploadError::Interrupted(err));
                }
            };
            size_bytes += chunk.len() as u64;
            digest.consume(&chunk);
            if let Err(err) = file.write_all(&chunk).await {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(UploadError::Io(err));
            }
        }
        if let Err(err) = file.flush().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(UploadError::Io(err));
        }
        if let Err(err) = file.sync_all().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(UploadError::Io(err));
        }
        drop(file);

        if let Err(err) = fs::rename(&tmp_path, &file_path).await {
            if err.kind() == ErrorKind::AlreadyExists {
                if let Err(err) = replace_existing(&tmp_path, &file_path).await {
                    let _ = fs::remove_file(&tmp_path).await;
                    return Err(UploadError::Io(err));
                }
            } else {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(UploadError::Io(err));
            }
        }

        Ok(StoredFile {
            path: file_path,
            folder: upload.category.folder(),
            size_bytes,
            md5: format!("{:x}", digest.compute()),
        })
    }
}

/// Platforms where rename refuses to overwrite need the old file gone first.
async fn replace_existing(tmp_path: &Path, file_path: &Path) -> io::Result<()> {
    fs::remove_file(file_path).await?;
    fs::rename(tmp_path, file_path).await
}
