use anyhow::{anyhow, Result};
use image::{ColorType, DynamicImage, GenericImageView, ImageFormat};

pub fn detect_mime_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some("image/png");
    }
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("image/jpeg");
    }
    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return Some("image/gif");
    }
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return Some("image/webp");
    }
    if bytes.starts_with(b"BM") {
        return Some("image/bmp");
    }
    None
}

pub fn mime_to_format(mime_type: &str) -> Result<ImageFormat> {
    match mime_type {
        "image/png" => Ok(ImageFormat::Png),
        "image/jpeg" | "image/jpg" => Ok(ImageFormat::Jpeg),
        "image/gif" => Ok(ImageFormat::Gif),
        "image/webp" => Ok(ImageFormat::WebP),
        "image/bmp" => Ok(ImageFormat::Bmp),
        _ => Err(anyhow!("unsupported mime type: {mime_type}")),
    }
}

pub fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/bmp" => "bmp",
        _ => "bin",
    }
}

fn decode(bytes: &[u8]) -> Result<DynamicImage> {
    let mime_type = detect_mime_type(bytes).ok_or_else(|| anyhow!("unrecognized image data"))?;
    let format = mime_to_format(mime_type)?;
    image::load_from_memory_with_format(bytes, format).map_err(|err| anyhow!("decode image failed: {err}"))
}

fn has_alpha(color: ColorType) -> bool {
    matches!(
        color,
        ColorType::La8 | ColorType::Rgba8 | ColorType::La16 | ColorType::Rgba16 | ColorType::Rgba32F
    )
}

/// Checks a mask against the first source image. Problems are returned as
/// warnings; the Images API remains the authority on rejecting the pair.
pub fn inspect_mask(source: &[u8], mask: &[u8]) -> Vec<String> {
    let mask_image = match decode(mask) {
        Ok(image) => image,
        Err(err) => return vec![format!("mask could not be inspected: {err}")],
    };
    let mut warnings = Vec::new();
    if !has_alpha(mask_image.color()) {
        warnings.push("mask has no alpha channel".to_string());
    }
    match decode(source) {
        Ok(source_image) => {
            let (sw, sh) = source_image.dimensions();
            let (mw, mh) = mask_image.dimensions();
            if (sw, sh) != (mw, mh) {
                warnings.push(format!("mask is {mw}x{mh} but the first image is {sw}x{sh}"));
            }
        }
        Err(err) => warnings.push(format!("first image could not be inspected: {err}")),
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{RgbImage, RgbaImage};

    fn encode(image: DynamicImage) -> Vec<u8> {
        let mut output = Vec::new();
        image
            .write_to(&mut std::io::Cursor::new(&mut output), ImageFormat::Png)
            .unwrap();
        output
    }

    #[test]
    fn sniffs_common_formats() {
        assert_eq!(detect_mime_type(&[0xFF, 0xD8, 0xFF, 0xE0]), Some("image/jpeg"));
        assert_eq!(detect_mime_type(b"RIFF\0\0\0\0WEBPVP8 "), Some("image/webp"));
        assert_eq!(detect_mime_type(b"hello"), None);
        assert_eq!(extension_for_mime("image/jpeg"), "jpg");
    }

    #[test]
    fn matching_rgba_mask_has_no_warnings() {
        let source = encode(DynamicImage::ImageRgb8(RgbImage::new(4, 4)));
        let mask = encode(DynamicImage::ImageRgba8(RgbaImage::new(4, 4)));
        assert!(inspect_mask(&source, &mask).is_empty());
    }

    #[test]
    fn mismatched_opaque_mask_is_reported() {
        let source = encode(DynamicImage::ImageRgb8(RgbImage::new(4, 4)));
        let mask = encode(DynamicImage::ImageRgb8(RgbImage::new(2, 3)));
        let warnings = inspect_mask(&source, &mask);
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("alpha"));
        assert!(warnings[1].contains("2x3"));
    }
}
