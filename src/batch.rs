//! Batch open / save / export against a filesystem store.
//!
//! Saved files are content-addressed: the name is derived from the SHA-256
//! of the encoded bytes, so saving the same image twice in the same format
//! lands on the same path and rewrites identical content.
//!
//! ```text
//! saved/
//! ├── edit-3f2a9c01b7de.png
//! └── edit-91c0aa4e2f55.jpg
//! ```

use crate::imaging::{CodecError, ImageBuffer, ImageCodec, OutputFormat};
use crate::pipeline::Failure;
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info};

/// Hex digits of the content hash kept in saved file names.
const HASH_PREFIX_LEN: usize = 12;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl BatchError {
    /// Boundary view: unreadable or undecodable input is the caller's
    /// problem, anything else is ours.
    pub fn to_failure(&self) -> Failure {
        let status = match self {
            BatchError::Io { source, .. } if source.kind() == io::ErrorKind::NotFound => 400,
            BatchError::Codec(CodecError::Decode(_) | CodecError::TooLarge { .. }) => 400,
            BatchError::Io { .. } | BatchError::Codec(_) => 500,
        };
        Failure {
            status,
            message: self.to_string(),
        }
    }
}

/// Log a failed batch command before handing the result back.
fn logged<T>(command: &'static str, result: Result<T, BatchError>) -> Result<T, BatchError> {
    if let Err(err) = &result {
        error!(command, status = err.to_failure().status, error = ?err, "batch failed");
    }
    result
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> BatchError + '_ {
    move |source| BatchError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Where batch images are read from and written to.
pub trait BatchStore {
    /// Read and decode an image; the result is always three-channel.
    fn open(&self, path: &Path) -> Result<ImageBuffer, BatchError>;

    /// Encode and persist an image, returning where it was written.
    fn save(&self, image: &ImageBuffer, format: OutputFormat) -> Result<PathBuf, BatchError>;

    /// Encode an image for download without persisting it.
    fn export(&self, image: &ImageBuffer, format: OutputFormat) -> Result<Vec<u8>, BatchError>;
}

/// [`BatchStore`] rooted at a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct FsBatchStore<C: ImageCodec> {
    save_dir: PathBuf,
    codec: C,
}

impl<C: ImageCodec> FsBatchStore<C> {
    pub fn new(save_dir: impl Into<PathBuf>, codec: C) -> Self {
        Self {
            save_dir: save_dir.into(),
            codec,
        }
    }

    pub fn save_dir(&self) -> &Path {
        &self.save_dir
    }
}

/// `edit-<first 12 hex digits of SHA-256>.<ext>`
pub fn saved_file_name(bytes: &[u8], format: OutputFormat) -> String {
    let digest = format!("{:x}", Sha256::digest(bytes));
    format!(
        "edit-{}.{}",
        &digest[..HASH_PREFIX_LEN],
        format.extension()
    )
}

/// Output name for an edited input: `<stem>-<operation>.<ext>`, with the
/// operation's dots turned into underscores.
pub fn edited_file_name(input: &Path, operation: &str, format: OutputFormat) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    format!(
        "{}-{}.{}",
        stem,
        operation.replace('.', "_"),
        format.extension()
    )
}

impl<C: ImageCodec> FsBatchStore<C> {
    fn read_image(&self, path: &Path) -> Result<ImageBuffer, BatchError> {
        let bytes = fs::read(path).map_err(io_error(path))?;
        let image = self.codec.decode(&bytes)?.into_bgr();
        debug!(?path, width = image.width(), height = image.height(), "opened image");
        Ok(image)
    }

    fn write_image(&self, image: &ImageBuffer, format: OutputFormat) -> Result<PathBuf, BatchError> {
        let bytes = self.codec.encode(image, format)?;
        fs::create_dir_all(&self.save_dir).map_err(io_error(&self.save_dir))?;
        let path = self.save_dir.join(saved_file_name(&bytes, format));
        fs::write(&path, &bytes).map_err(io_error(&path))?;
        info!(?path, bytes = bytes.len(), "image saved");
        Ok(path)
    }
}

impl<C: ImageCodec> BatchStore for FsBatchStore<C> {
    fn open(&self, path: &Path) -> Result<ImageBuffer, BatchError> {
        logged("open", self.read_image(path))
    }

    fn save(&self, image: &ImageBuffer, format: OutputFormat) -> Result<PathBuf, BatchError> {
        logged("save", self.write_image(image, format))
    }

    fn export(&self, image: &ImageBuffer, format: OutputFormat) -> Result<Vec<u8>, BatchError> {
        let bytes = logged("export", self.codec.encode(image, format).map_err(BatchError::from))?;
        debug!(%format, bytes = bytes.len(), "image exported");
        Ok(bytes)
    }
}
