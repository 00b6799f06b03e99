//! Avatar upload handling: multipart extraction, file filtering, and the
//! re-encode to a fixed-size PNG.

use actix_multipart::Multipart;
use futures::TryStreamExt;
use image::imageops::FilterType;
use image::ImageOutputFormat;
use std::io::Cursor;

use crate::error::AppError;

/// Upload size cap, applied to the original file before re-encoding.
pub const MAX_UPLOAD_BYTES: usize = 1024 * 1024;

/// Stored avatars are square, this many pixels per side.
pub const AVATAR_SIZE: u32 = 250;

const ALLOWED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Reads the single `avatar` file field out of a multipart payload.
///
/// The filename extension is filtered at the boundary and the size cap is
/// enforced while the chunks stream in, so an oversized upload fails before
/// it is fully buffered. Unrelated fields are skipped.
pub async fn read_upload(payload: &mut Multipart) -> Result<Vec<u8>, AppError> {
    while let Some(mut field) = payload.try_next().await? {
        if field.content_disposition().get_name() != Some("avatar") {
            continue;
        }

        let filename = field
            .content_disposition()
            .get_filename()
            .map(str::to_owned)
            .ok_or_else(|| AppError::BadRequest("Please upload an image".into()))?;

        if !has_allowed_extension(&filename) {
            return Err(AppError::BadRequest("Please upload an image".into()));
        }

        let mut data = Vec::new();
        while let Some(chunk) = field.try_next().await? {
            if data.len() + chunk.len() > MAX_UPLOAD_BYTES {
                return Err(AppError::BadRequest("File too large".into()));
            }
            data.extend_from_slice(&chunk);
        }

        if data.is_empty() {
            return Err(AppError::BadRequest("Please upload an image".into()));
        }

        return Ok(data);
    }

    Err(AppError::BadRequest("Please upload an image".into()))
}

fn has_allowed_extension(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map_or(false, |(_, extension)| {
            ALLOWED_EXTENSIONS.contains(&extension.to_ascii_lowercase().as_str())
        })
}

/// Decodes an uploaded image and re-encodes it as a 250×250 PNG.
///
/// `resize_exact` stretches to the target dimensions; the aspect ratio of
/// the input is not preserved.
pub fn to_png_avatar(data: &[u8]) -> Result<Vec<u8>, AppError> {
    let decoded = image::load_from_memory(data)?;
    let resized = decoded.resize_exact(AVATAR_SIZE, AVATAR_SIZE, FilterType::Triangle);

    let mut out = Cursor::new(Vec::new());
    resized.write_to(&mut out, ImageOutputFormat::Png)?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, RgbImage};

    fn jpeg_fixture(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(
            width,
            height,
            image::Rgb([120, 90, 200]),
        ));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageOutputFormat::Jpeg(80)).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_extension_filter() {
        assert!(has_allowed_extension("photo.jpg"));
        assert!(has_allowed_extension("photo.JPEG"));
        assert!(has_allowed_extension("weird.name.png"));

        assert!(!has_allowed_extension("photo.gif"));
        assert!(!has_allowed_extension("photo"));
        assert!(!has_allowed_extension("jpg"));
        assert!(!has_allowed_extension("archive.tar.gz"));
    }

    #[test]
    fn test_avatar_is_exactly_250_square_png() {
        let wide = jpeg_fixture(400, 100);
        let png = to_png_avatar(&wide).unwrap();

        assert_eq!(image::guess_format(&png).unwrap(), ImageFormat::Png);
        let decoded = image::load_from_memory(&png).unwrap();
        // The input's aspect ratio is discarded, not letterboxed.
        assert_eq!(decoded.width(), AVATAR_SIZE);
        assert_eq!(decoded.height(), AVATAR_SIZE);
    }

    #[test]
    fn test_undecodable_input_is_rejected() {
        let result = to_png_avatar(b"definitely not an image");
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }
}
