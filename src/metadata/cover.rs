//! Cover art loading for embedding

use image::ImageFormat;
use lofty::picture::{MimeType, Picture, PictureType};
use std::path::Path;
use tracing::debug;

/// Raw cover bytes and their detected image format
#[derive(Debug, Clone)]
pub struct CoverArt {
    pub data: Vec<u8>,
    pub format: Option<ImageFormat>,
}

impl CoverArt {
    pub fn load(path: &Path) -> std::io::Result<Self> {
        Ok(Self::from_bytes(std::fs::read(path)?))
    }

    /// The bytes are embedded unchanged
    pub fn from_bytes(data: Vec<u8>) -> Self {
        let format = image::guess_format(&data).ok();
        if format.is_none() {
            debug!("Cover art format not recognised, assuming JPEG");
        }
        Self { data, format }
    }

    /// JPEG when the format is unknown
    fn lofty_mime(&self) -> MimeType {
        match self.format {
            Some(ImageFormat::Png) => MimeType::Png,
            Some(ImageFormat::Gif) => MimeType::Gif,
            Some(ImageFormat::Bmp) => MimeType::Bmp,
            Some(ImageFormat::Tiff) => MimeType::Tiff,
            Some(ImageFormat::WebP) => MimeType::Unknown("image/webp".to_string()),
            _ => MimeType::Jpeg,
        }
    }

    /// Front-cover picture frame for lofty-managed tags
    pub fn to_picture(&self) -> Picture {
        Picture::new_unchecked(
            PictureType::CoverFront,
            Some(self.lofty_mime()),
            None,
            self.data.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut out = Vec::new();
        DynamicImage::new_rgb8(width, height)
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn test_png_cover_is_described() {
        let cover = CoverArt::from_bytes(png_bytes(12, 8));
        assert_eq!(cover.to_picture().mime_type(), Some(&MimeType::Png));
    }

    #[test]
    fn test_unknown_bytes_default_to_jpeg() {
        let cover = CoverArt::from_bytes(b"definitely not an image".to_vec());
        assert_eq!(cover.to_picture().mime_type(), Some(&MimeType::Jpeg));
        assert_eq!(cover.to_picture().pic_type(), PictureType::CoverFront);
    }
}
