//! Storage of images uploaded from the recipe editor.
//!
//! The type of an upload is decided from its first bytes only; the declared
//! content type and file name are never consulted. Files are named
//! `<unix nanos>_<8 hex digits>.<ext>` so concurrent uploads need no
//! coordination, and are created exclusively so an existing file is never
//! overwritten.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use axum::{body::Bytes, extract::multipart::Field};
use image::ImageFormat;
use tokio::{fs::OpenOptions, io::AsyncWriteExt};

use crate::errors::UploadError;

/// How much of the upload is inspected to decide its type.
pub const SNIFF_LEN: usize = 512;

/// Whole-request budget for `POST /api/images/upload`.
pub const MAX_UPLOAD_BYTES: usize = 10 << 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum ImageKind {
    Jpeg,
    Png,
    Gif,
    WebP,
}

impl ImageKind {
    pub fn extension(self) -> &'static str {
        match self {
            ImageKind::Jpeg => "jpg",
            ImageKind::Png => "png",
            ImageKind::Gif => "gif",
            ImageKind::WebP => "webp",
        }
    }
}

/// Classify an upload by its magic number.
pub fn sniff(header: &[u8]) -> Option<ImageKind> {
    let header = &header[..header.len().min(SNIFF_LEN)];
    match image::guess_format(header).ok()? {
        ImageFormat::Jpeg => Some(ImageKind::Jpeg),
        ImageFormat::Png => Some(ImageKind::Png),
        ImageFormat::Gif => Some(ImageKind::Gif),
        ImageFormat::WebP => Some(ImageKind::WebP),
        _ => None,
    }
}

/// A fresh name for an upload taken at `nanos`.
///
/// The timestamp alone repeats within one clock tick and the random part alone
/// could collide under bursts; together a clash is negligible.
pub fn upload_filename(nanos: i64, kind: ImageKind) -> String {
    format!("{}_{:08x}.{}", nanos, rand::random::<u32>(), kind.extension())
}

/// Something an upload's bytes can be pulled from, one chunk at a time.
#[async_trait]
pub trait ChunkSource: Send {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, UploadError>;
}

#[async_trait]
impl<'a> ChunkSource for Field<'a> {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, UploadError> {
        Ok(self.chunk().await?)
    }
}

#[derive(Clone, Debug)]
pub struct ImageStore {
    dir: PathBuf,
    public_prefix: String,
}

impl ImageStore {
    pub fn new(dir: impl Into<PathBuf>, public_prefix: &str) -> Self {
        Self {
            dir: dir.into(),
            public_prefix: public_prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Validate and persist one upload, returning its public URL.
    ///
    /// Nothing is written unless the first bytes are a supported image.
    pub async fn ingest<C: ChunkSource>(&self, source: &mut C) -> Result<String, UploadError> {
        let mut header = Vec::with_capacity(SNIFF_LEN);
        let mut buffered = Vec::new();
        while header.len() < SNIFF_LEN {
            let Some(chunk) = source.next_chunk().await? else {
                break;
            };
            let take = chunk.len().min(SNIFF_LEN - header.len());
            header.extend_from_slice(&chunk[..take]);
            buffered.push(chunk);
        }
        let kind = sniff(&header).ok_or(UploadError::Unsupported)?;

        tokio::fs::create_dir_all(&self.dir).await.map_err(|err| {
            tracing::error!(dir = %self.dir.display(), error = %err, "creating upload directory failed");
            UploadError::Storage(err)
        })?;

        let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let filename = upload_filename(nanos, kind);
        let path = self.dir.join(&filename);
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(UploadError::Save)?;

        if let Err(err) = copy_chunks(&mut file, buffered, source).await {
            drop(file);
            tracing::warn!(path = %path.display(), error = %err, "discarding partial upload");
            if let Err(remove_err) = tokio::fs::remove_file(&path).await {
                tracing::warn!(path = %path.display(), error = %remove_err, "removing partial upload failed");
            }
            return Err(err);
        }

        tracing::info!(path = %path.display(), %kind, "image stored");
        Ok(format!("{}/{}", self.public_prefix, filename))
    }
}

/// Write what was already read, then the rest of the stream, verbatim.
async fn copy_chunks<C: ChunkSource>(
    file: &mut tokio::fs::File,
    buffered: Vec<Bytes>,
    source: &mut C,
) -> Result<(), UploadError> {
    for chunk in buffered {
        file.write_all(&chunk).await.map_err(UploadError::Save)?;
    }
    while let Some(chunk) = source.next_chunk().await? {
        file.write_all(&chunk).await.map_err(UploadError::Save)?;
    }
    file.flush().await.map_err(UploadError::Save)?;
    Ok(())
}
