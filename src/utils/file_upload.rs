//! Client-side checks and transforms for files picked by the user.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::constants::{DEFAULT_IMAGE_MAX_HEIGHT, DEFAULT_IMAGE_MAX_WIDTH, DEFAULT_IMAGE_QUALITY};

pub const IMAGE_MIME_TYPES: [&str; 5] = [
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/svg+xml",
];

const SIZE_UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

pub fn validate_file_type(mime_type: &str, allowed: &[&str]) -> bool {
    allowed.contains(&mime_type)
}

pub fn validate_file_size(size_bytes: u64, max_size_mb: f64) -> bool {
    (size_bytes as f64) <= max_size_mb * 1024.0 * 1024.0
}

pub fn is_image_file(mime_type: &str) -> bool {
    validate_file_type(mime_type, &IMAGE_MIME_TYPES)
}

/// `1.5 KB`, `0 Bytes`, `2 MB`.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, SIZE_UNITS[unit])
}

/// Text after the last dot, lowercased.  A name without a dot is returned
/// whole.
pub fn file_extension(file_name: &str) -> String {
    file_name
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// `data:<mime>;base64,...` preview URL.
pub fn to_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressOptions {
    pub max_width: u32,
    pub max_height: u32,
    /// Encoder quality in `0.0..=1.0`.
    pub quality: f64,
}

impl Default for CompressOptions {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_IMAGE_MAX_WIDTH,
            max_height: DEFAULT_IMAGE_MAX_HEIGHT,
            quality: DEFAULT_IMAGE_QUALITY,
        }
    }
}

/// Target size for a `width`×`height` image: first fit the width, then
/// the height, keeping the aspect ratio.  Smaller images are unchanged.
pub fn scaled_dimensions(width: u32, height: u32, options: &CompressOptions) -> (u32, u32) {
    let (mut w, mut h) = (f64::from(width), f64::from(height));
    let (max_w, max_h) = (f64::from(options.max_width), f64::from(options.max_height));
    if w > max_w {
        h = (h * max_w / w).round();
        w = max_w;
    }
    if h > max_h {
        w = (w * max_h / h).round();
        h = max_h;
    }
    (w as u32, h as u32)
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Failed to load image")]
    ImageLoad,
    #[error("Canvas to Blob conversion failed")]
    Encode,
    #[error("browser API unavailable: {0}")]
    Browser(String),
}

/// Re-encode an image through a canvas, shrinking it to fit `options`.
#[cfg(target_arch = "wasm32")]
pub async fn compress_image(
    bytes: &[u8],
    mime_type: &str,
    options: CompressOptions,
) -> Result<Vec<u8>, UploadError> {
    use js_sys::{Array, Promise, Uint8Array};
    use wasm_bindgen::closure::Closure;
    use wasm_bindgen::{JsCast, JsValue};
    use wasm_bindgen_futures::JsFuture;
    use web_sys::{Blob, BlobPropertyBag, CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement, Url};

    let browser = |what: &str| UploadError::Browser(what.to_string());

    let bag = BlobPropertyBag::new();
    bag.set_type(mime_type);
    let sequence = Array::of1(&Uint8Array::from(bytes));
    let source = Blob::new_with_u8_array_sequence_and_options(&sequence, &bag)
        .map_err(|_| browser("Blob"))?;
    let url = Url::create_object_url_with_blob(&source).map_err(|_| browser("URL"))?;

    let image = HtmlImageElement::new().map_err(|_| browser("Image"))?;
    let loaded = Promise::new(&mut |resolve, reject| {
        let on_load = Closure::once_into_js(move || {
            let _ = resolve.call0(&JsValue::NULL);
        });
        let on_error = Closure::once_into_js(move || {
            let _ = reject.call0(&JsValue::NULL);
        });
        image.set_onload(Some(on_load.unchecked_ref()));
        image.set_onerror(Some(on_error.unchecked_ref()));
    });
    image.set_src(&url);
    let outcome = JsFuture::from(loaded).await;
    let _ = Url::revoke_object_url(&url);
    outcome.map_err(|_| UploadError::ImageLoad)?;

    let (width, height) = scaled_dimensions(image.width(), image.height(), &options);
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| browser("document"))?;
    let canvas: HtmlCanvasElement = document
        .create_element("canvas")
        .map_err(|_| browser("canvas"))?
        .dyn_into()
        .map_err(|_| browser("canvas"))?;
    canvas.set_width(width);
    canvas.set_height(height);
    let context: CanvasRenderingContext2d = canvas
        .get_context("2d")
        .ok()
        .flatten()
        .and_then(|ctx| ctx.dyn_into().ok())
        .ok_or_else(|| browser("2d context"))?;
    context
        .draw_image_with_html_image_element_and_dw_and_dh(&image, 0.0, 0.0, f64::from(width), f64::from(height))
        .map_err(|_| browser("drawImage"))?;

    let mut encode_error = None;
    let encoded = Promise::new(&mut |resolve, reject| {
        let on_blob = Closure::once_into_js(move |blob: JsValue| {
            if blob.is_null() {
                let _ = reject.call0(&JsValue::NULL);
            } else {
                let _ = resolve.call1(&JsValue::NULL, &blob);
            }
        });
        if canvas
            .to_blob_with_type_and_encoder_options(
                on_blob.unchecked_ref(),
                mime_type,
                &JsValue::from_f64(options.quality),
            )
            .is_err()
        {
            encode_error = Some(UploadError::Encode);
        }
    });
    if let Some(err) = encode_error {
        return Err(err);
    }
    let blob: Blob = JsFuture::from(encoded)
        .await
        .map_err(|_| UploadError::Encode)?
        .dyn_into()
        .map_err(|_| UploadError::Encode)?;
    let buffer = JsFuture::from(blob.array_buffer())
        .await
        .map_err(|_| UploadError::Encode)?;
    Ok(Uint8Array::new(&buffer).to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_and_size_checks() {
        assert!(is_image_file("image/png"));
        assert!(!is_image_file("application/pdf"));
        assert!(validate_file_type("text/csv", &["text/csv"]));
        assert!(validate_file_size(2 * 1024 * 1024, 2.0));
        assert!(!validate_file_size(2 * 1024 * 1024 + 1, 2.0));
    }

    #[test]
    fn sizes_are_human_readable() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(512), "512 Bytes");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5 MB");
        assert_eq!(format_file_size(1_288_490_189), "1.2 GB");
    }

    #[test]
    fn extensions() {
        assert_eq!(file_extension("Photo.JPG"), "jpg");
        assert_eq!(file_extension("archive.tar.gz"), "gz");
        assert_eq!(file_extension("README"), "readme");
    }

    #[test]
    fn scaling_keeps_aspect_ratio() {
        let opts = CompressOptions::default();
        assert_eq!(scaled_dimensions(400, 300, &opts), (400, 300));
        assert_eq!(scaled_dimensions(1600, 1200, &opts), (800, 600));
        assert_eq!(scaled_dimensions(1000, 4000, &opts), (200, 800));
    }

    #[test]
    fn data_url_preview() {
        assert_eq!(to_data_url("text/plain", b"hi"), "data:text/plain;base64,aGk=");
    }
}
