//! Image payloads attached to a user turn.
//!
//! At the input boundary an image is a `data:<mime>;base64,<payload>` URI;
//! the backend wants the MIME type and the raw base64 payload separately.

use std::error::Error as StdError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex_lite::Regex;

static DATA_URI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^data:([^;,]+);base64,(.+)$").expect("valid data uri pattern")
});

#[derive(Debug)]
pub enum ImageError {
    /// The URI does not have the `data:<mime>;base64,<payload>` shape.
    MalformedDataUri,

    /// The file could not be read.
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The file does not look like an image.
    NotAnImage { path: PathBuf },

    /// Captured bytes were empty.
    Empty,
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageError::MalformedDataUri => write!(f, "Image data is not a base64 data URI"),
            ImageError::Read { path, source } => {
                write!(f, "Failed to read image {}: {}", path.display(), source)
            }
            ImageError::NotAnImage { path } => {
                write!(f, "{} is not a supported image file", path.display())
            }
            ImageError::Empty => write!(f, "Image data is empty"),
        }
    }
}

impl StdError for ImageError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ImageError::Read { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageData {
    pub mime_type: String,
    pub base64: String,
}

impl ImageData {
    pub fn from_data_uri(uri: &str) -> Result<Self, ImageError> {
        let captures = DATA_URI
            .captures(uri.trim())
            .ok_or(ImageError::MalformedDataUri)?;
        Ok(Self {
            mime_type: captures[1].to_string(),
            base64: captures[2].to_string(),
        })
    }

    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Result<Self, ImageError> {
        if bytes.is_empty() {
            return Err(ImageError::Empty);
        }
        Ok(Self {
            mime_type: mime_type.into(),
            base64: STANDARD.encode(bytes),
        })
    }

    /// Load an image file, guessing its MIME type from the extension.
    pub fn from_path(path: &Path) -> Result<Self, ImageError> {
        let mime = mime_guess::from_path(path)
            .first()
            .filter(|mime| mime.type_() == mime_guess::mime::IMAGE)
            .ok_or_else(|| ImageError::NotAnImage {
                path: path.to_path_buf(),
            })?;
        let bytes = std::fs::read(path).map_err(|source| ImageError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(mime.essence_str(), &bytes)
    }

    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }

    /// Approximate decoded size, for status display.
    pub fn approx_bytes(&self) -> usize {
        self.base64.len() / 4 * 3
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_data_uri_into_mime_and_payload() {
        let image = ImageData::from_data_uri("data:image/png;base64,iVBORw0KGgo=").expect("parse");
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.base64, "iVBORw0KGgo=");
        assert_eq!(image.to_data_uri(), "data:image/png;base64,iVBORw0KGgo=");
    }

    #[test]
    fn rejects_malformed_uris() {
        for uri in [
            "image/png;base64,AAAA",
            "data:image/png,AAAA",
            "data:;base64,AAAA",
            "data:image/png;base64,",
        ] {
            assert!(
                matches!(
                    ImageData::from_data_uri(uri),
                    Err(ImageError::MalformedDataUri)
                ),
                "{uri} should be rejected"
            );
        }
    }

    #[test]
    fn loads_image_file_with_guessed_mime() {
        let mut file = tempfile::Builder::new()
            .suffix(".jpg")
            .tempfile()
            .expect("tempfile");
        file.write_all(&[0xff, 0xd8, 0xff]).expect("write");

        let image = ImageData::from_path(file.path()).expect("load");
        assert_eq!(image.mime_type, "image/jpeg");
        assert_eq!(image.base64, "/9j/");
    }

    #[test]
    fn refuses_non_image_files() {
        let file = tempfile::Builder::new()
            .suffix(".txt")
            .tempfile()
            .expect("tempfile");
        assert!(matches!(
            ImageData::from_path(file.path()),
            Err(ImageError::NotAnImage { .. })
        ));
    }

    #[test]
    fn empty_bytes_are_rejected() {
        assert!(matches!(
            ImageData::from_bytes("image/png", &[]),
            Err(ImageError::Empty)
        ));
    }
}
