use base64::{engine::general_purpose, Engine as _};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// MIME type of every camera still
pub const JPEG_MIME: &str = "image/jpeg";

/// A compressed image ready to be sent for diagnosis.
///
/// Produced either by reading a user file or by capturing a camera frame and
/// never modified afterwards. Cloning shares the underlying bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedImage {
    data: Arc<[u8]>,
    mime_type: String,
    dimensions: Option<(u32, u32)>,
}

impl EncodedImage {
    /// Create an image from raw bytes and the MIME type claimed for them
    pub fn new(data: impl Into<Arc<[u8]>>, mime_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
            dimensions: None,
        }
    }

    /// Create a JPEG image with known pixel dimensions
    pub fn jpeg(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data: data.into(),
            mime_type: JPEG_MIME.to_string(),
            dimensions: Some((width, height)),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Pixel dimensions, when the producer knows them
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Standard base64 encoding of the image bytes
    pub fn to_base64(&self) -> String {
        general_purpose::STANDARD.encode(&self.data)
    }

    /// Displayable preview of the image as a `data:` URL
    pub fn preview_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }

    /// File extension matching the MIME type, for saving the image
    pub fn file_extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/png" => "png",
            "image/webp" => "webp",
            "image/gif" => "gif",
            "image/bmp" => "bmp",
            "image/heic" => "heic",
            "image/heif" => "heif",
            "image/tiff" => "tiff",
            _ => "jpg",
        }
    }
}

impl fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedImage")
            .field("mime_type", &self.mime_type)
            .field("len", &self.data.len())
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

/// MIME type claimed for a file, judged by its extension only.
///
/// Unknown or missing extensions are treated as JPEG. The content itself is
/// never inspected.
pub fn mime_type_for_path(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("heic") => "image/heic",
        Some("heif") => "image/heif",
        Some("tif") | Some("tiff") => "image/tiff",
        _ => JPEG_MIME,
    }
}
