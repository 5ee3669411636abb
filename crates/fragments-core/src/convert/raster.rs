// ABOUTME: Image transcoding between PNG, JPEG, WebP, and GIF using the image crate.
// ABOUTME: CPU-bound; callers run it on the blocking pool rather than on an async worker.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat};

use crate::error::FragmentError;
use crate::media::Format;

fn image_format(format: Format) -> Option<ImageFormat> {
    match format {
        Format::ImagePng => Some(ImageFormat::Png),
        Format::ImageJpeg => Some(ImageFormat::Jpeg),
        Format::ImageWebp => Some(ImageFormat::WebP),
        Format::ImageGif => Some(ImageFormat::Gif),
        _ => None,
    }
}

/// Decode `data` as `source` and re-encode it as `target`.
pub fn transcode(source: Format, target: Format, data: &[u8]) -> Result<Vec<u8>, FragmentError> {
    let (Some(decode_as), Some(encode_as)) = (image_format(source), image_format(target)) else {
        return Err(FragmentError::UnsupportedConversion {
            from: source.essence().to_string(),
            extension: target.extension().to_string(),
        });
    };

    let decoded = image::load_from_memory_with_format(data, decode_as).map_err(|e| {
        FragmentError::ConversionFailed(format!("could not decode {source} image: {e}"))
    })?;

    // JPEG has no alpha channel; the other encoders all accept RGBA8.
    let prepared = match target {
        Format::ImageJpeg => DynamicImage::ImageRgb8(decoded.to_rgb8()),
        _ => DynamicImage::ImageRgba8(decoded.to_rgba8()),
    };

    let mut out = Cursor::new(Vec::new());
    prepared.write_to(&mut out, encode_as).map_err(|e| {
        FragmentError::ConversionFailed(format!("could not encode {target} image: {e}"))
    })?;
    Ok(out.into_inner())
}
