use anyhow::{Context, Result};
use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

use crate::types::GeneratedImage;

pub const DEFAULT_MIME_TYPE: &str = "image/png";
pub const DOWNLOAD_PREFIX: &str = "khayal-ai";

static DATA_URI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^data:(.+);base64,(.+)$").expect("data uri pattern is valid")
});

/// An image carried inline as `data:<mime>;base64,<payload>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub mime_type: String,
    pub payload: String,
}

impl DataUri {
    pub fn parse(uri: &str) -> Option<Self> {
        let captures = DATA_URI.captures(uri)?;
        Some(DataUri {
            mime_type: captures[1].to_string(),
            payload: captures[2].to_string(),
        })
    }

    pub fn new(mime_type: Option<&str>, payload: impl Into<String>) -> Self {
        let mime_type = mime_type
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(DEFAULT_MIME_TYPE);
        DataUri {
            mime_type: mime_type.to_string(),
            payload: payload.into(),
        }
    }

    pub fn to_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.payload)
    }

    pub fn decode(&self) -> Result<Vec<u8>> {
        base64::engine::general_purpose::STANDARD
            .decode(self.payload.as_bytes())
            .context("Invalid base64 payload")
    }
}

pub fn decode_image_bytes(uri: &str) -> Result<Vec<u8>> {
    DataUri::parse(uri)
        .ok_or_else(|| anyhow::anyhow!("Not a base64 data URI"))?
        .decode()
}

pub fn download_file_name(image: &GeneratedImage) -> String {
    format!("{}-{}.png", DOWNLOAD_PREFIX, image.id)
}

/// Writes the image into `dir` as PNG, converting if the model returned another format.
pub fn save_png(image: &GeneratedImage, dir: &Path) -> Result<PathBuf> {
    let bytes = decode_image_bytes(&image.url)?;
    let decoded = image::load_from_memory(&bytes).context("Failed to decode image")?;

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let path = dir.join(download_file_name(image));
    decoded
        .save_with_format(&path, image::ImageFormat::Png)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    tracing::info!(path = %path.display(), "saved image");
    Ok(path)
}

/// Runs [`save_png`] on the blocking pool; decoding a large image must not stall the caller.
pub async fn save_png_detached(image: GeneratedImage, dir: PathBuf) -> Result<PathBuf> {
    tokio::task::spawn_blocking(move || save_png(&image, &dir))
        .await
        .context("Image save task failed")?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AspectRatio;

    fn tiny_png_uri() -> String {
        let img = image::RgbaImage::from_pixel(2, 2, image::Rgba([200, 10, 10, 255]));
        let mut buffer = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut std::io::Cursor::new(&mut buffer), image::ImageFormat::Png)
            .unwrap();
        DataUri::new(Some("image/png"), base64::engine::general_purpose::STANDARD.encode(buffer)).to_uri()
    }

    #[test]
    fn test_parse_png_uri() {
        let uri = DataUri::parse("data:image/png;base64,AAAA").unwrap();
        assert_eq!(uri.mime_type, "image/png");
        assert_eq!(uri.payload, "AAAA");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!(DataUri::parse("image/png;base64,AAAA"), None);
        assert_eq!(DataUri::parse("data:image/png,AAAA"), None);
        assert_eq!(DataUri::parse("data:;base64,AAAA"), None);
        assert_eq!(DataUri::parse("data:image/png;base64,"), None);
        assert_eq!(DataUri::parse(""), None);
    }

    #[test]
    fn test_new_defaults_mime_type() {
        assert_eq!(DataUri::new(None, "QQ==").to_uri(), "data:image/png;base64,QQ==");
        assert_eq!(DataUri::new(Some(""), "QQ==").mime_type, "image/png");
        assert_eq!(DataUri::new(Some("image/jpeg"), "QQ==").to_uri(), "data:image/jpeg;base64,QQ==");
    }

    #[test]
    fn test_decode() {
        assert_eq!(decode_image_bytes("data:text/plain;base64,aGk=").unwrap(), b"hi");
        assert!(decode_image_bytes("data:image/png;base64,@@@").is_err());
        assert!(decode_image_bytes("nope").is_err());
    }

    #[test]
    fn test_save_png() {
        let dir = tempfile::tempdir().unwrap();
        let image = GeneratedImage {
            id: "42".to_string(),
            url: tiny_png_uri(),
            prompt: "red square".to_string(),
            aspect_ratio: AspectRatio::Square,
            timestamp: 42,
        };

        let path = save_png(&image, dir.path()).unwrap();
        assert_eq!(path.file_name().unwrap(), "khayal-ai-42.png");

        let reloaded = image::open(&path).unwrap();
        assert_eq!(reloaded.width(), 2);
    }
}
