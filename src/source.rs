use crate::encoded::{mime_type_for_path, EncodedImage};
use crate::error::SourceError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Where the image for a diagnosis comes from
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// A file chosen by the user
    File(PathBuf),
    /// A still captured from the camera
    Capture(EncodedImage),
}

impl ImageSource {
    /// Resolve the source into the single encoded representation
    pub async fn acquire(self) -> Result<EncodedImage, SourceError> {
        match self {
            ImageSource::File(path) => from_file(&path).await,
            ImageSource::Capture(frame) => Ok(from_capture(frame)),
        }
    }
}

/// Read a user-selected file in one shot.
///
/// The MIME type is the one the file's extension claims; the bytes are not
/// inspected.
pub async fn from_file(path: &Path) -> Result<EncodedImage, SourceError> {
    debug!("Reading image file {}", path.display());

    let data = tokio::fs::read(path)
        .await
        .map_err(|source| SourceError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    if data.is_empty() {
        return Err(SourceError::Empty {
            path: path.to_path_buf(),
        });
    }

    let mime_type = mime_type_for_path(path);
    info!(
        "Loaded {} ({}, {} bytes)",
        path.display(),
        mime_type,
        data.len()
    );

    Ok(EncodedImage::new(data, mime_type))
}

/// Camera stills are already encoded
pub fn from_capture(frame: EncodedImage) -> EncodedImage {
    frame
}
