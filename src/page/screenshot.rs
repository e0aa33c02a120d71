//! Screenshot capture, cropping and PDF export.
//!
//! The subprocess returns captures as base64; saving and cropping happen
//! on the client side. Crops decode the capture, cut the requested
//! bounding box (clamped to the image) and re-encode.

// ============================================================================
// Imports
// ============================================================================

use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as Base64Standard;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::error::{Error, Result};
use crate::protocol::{Command, RenderCommand};

use super::Page;

// ============================================================================
// Canned Scripts
// ============================================================================

const BOUNDING_RECT: &str = "function(sel) {
    var el = document.querySelector(sel);
    if (!el) { throw new Error('no element matches: ' + sel); }
    var rect = el.getBoundingClientRect();
    return {
        top: rect.top + window.scrollY,
        left: rect.left + window.scrollX,
        width: rect.width,
        height: rect.height
    };
}";

// ============================================================================
// ImageFormat
// ============================================================================

/// Image format for screenshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    /// PNG format (lossless, larger file size).
    #[default]
    Png,
    /// JPEG format with quality (0-100).
    Jpeg(u8),
}

impl ImageFormat {
    /// Creates PNG format.
    #[inline]
    #[must_use]
    pub fn png() -> Self {
        Self::Png
    }

    /// Creates JPEG format with quality (0-100).
    #[inline]
    #[must_use]
    pub fn jpeg(quality: u8) -> Self {
        Self::Jpeg(quality.min(100))
    }

    /// Returns the format string for the protocol.
    fn format_str(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg(_) => "jpeg",
        }
    }

    /// Returns the quality value if JPEG.
    fn quality(self) -> Option<u8> {
        match self {
            Self::Png => None,
            Self::Jpeg(q) => Some(q),
        }
    }
}

// ============================================================================
// BoundingBox
// ============================================================================

/// Crop rectangle in page pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Offset from the document top.
    pub top: f64,
    /// Offset from the document left.
    pub left: f64,
    /// Rectangle width.
    pub width: f64,
    /// Rectangle height.
    pub height: f64,
}

// ============================================================================
// CropTarget
// ============================================================================

/// What to crop to: an element, or an explicit rectangle.
#[derive(Debug, Clone)]
pub enum CropTarget {
    /// First element matching a CSS selector.
    Selector(String),
    /// Explicit rectangle.
    Box(BoundingBox),
}

impl From<&str> for CropTarget {
    fn from(selector: &str) -> Self {
        Self::Selector(selector.to_string())
    }
}

impl From<BoundingBox> for CropTarget {
    fn from(rect: BoundingBox) -> Self {
        Self::Box(rect)
    }
}

// ============================================================================
// PaperSize
// ============================================================================

/// Paper description for PDF export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperSize {
    /// Page format, e.g. `A4` or `Letter`.
    pub format: String,
    /// `portrait` or `landscape`.
    pub orientation: String,
    /// Margin, e.g. `1cm`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin: Option<String>,
}

impl Default for PaperSize {
    fn default() -> Self {
        Self {
            format: "A4".to_string(),
            orientation: "portrait".to_string(),
            margin: None,
        }
    }
}

// ============================================================================
// Page - Rendering
// ============================================================================

impl Page {
    /// Saves a PNG screenshot of the current page to `path`.
    pub async fn screenshot(&self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = self.capture_bytes(ImageFormat::Png).await?;
        tokio::fs::write(path.as_ref(), bytes).await?;

        debug!(session_id = %self.shared.id, path = %path.as_ref().display(), "Screenshot saved");
        Ok(())
    }

    /// Returns a base64-encoded screenshot in the given format.
    pub async fn screenshot_base64(&self, format: ImageFormat) -> Result<String> {
        self.capture_base64(format).await
    }

    /// Saves a cropped screenshot.
    ///
    /// `target` is a CSS selector or an explicit [`BoundingBox`] in page
    /// pixel coordinates. The rectangle is clamped to the capture.
    ///
    /// # Errors
    ///
    /// - [`Error::ScriptError`] if a selector target matches nothing
    /// - [`Error::InvalidArgument`] for an empty crop rectangle
    pub async fn crop(&self, target: impl Into<CropTarget>, path: impl AsRef<Path>) -> Result<()> {
        let rect = match target.into() {
            CropTarget::Box(rect) => rect,
            CropTarget::Selector(selector) => {
                let value = self
                    .evaluate_value(BOUNDING_RECT, vec![json!(selector)])
                    .await?;
                serde_json::from_value(value).map_err(Error::Json)?
            }
        };

        let bytes = self.capture_bytes(ImageFormat::Png).await?;
        let image = image::load_from_memory(&bytes)?;
        let cropped = crop_image(&image, rect)?;
        cropped.save(path.as_ref())?;

        debug!(
            session_id = %self.shared.id,
            path = %path.as_ref().display(),
            ?rect,
            "Cropped screenshot saved"
        );
        Ok(())
    }

    /// Exports the current page as a PDF.
    pub async fn pdf(&self, path: impl AsRef<Path>, paper_size: PaperSize) -> Result<()> {
        let result = self
            .dispatch_main(Command::Render(RenderCommand::Pdf {
                paper_size: serde_json::to_value(paper_size)?,
            }))
            .await?;

        let data = result
            .get("data")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::protocol("render.pdf response carried no data"))?;
        let bytes = decode_base64(data)?;
        tokio::fs::write(path.as_ref(), bytes).await?;

        debug!(session_id = %self.shared.id, path = %path.as_ref().display(), "PDF saved");
        Ok(())
    }

    /// Captures the page and returns the raw base64 payload.
    async fn capture_base64(&self, format: ImageFormat) -> Result<String> {
        let result = self
            .dispatch_main(Command::Render(RenderCommand::Screenshot {
                format: format.format_str().to_string(),
                quality: format.quality(),
            }))
            .await?;

        result
            .get("data")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| Error::protocol("render.screenshot response carried no data"))
    }

    /// Captures the page and returns the decoded bytes.
    async fn capture_bytes(&self, format: ImageFormat) -> Result<Vec<u8>> {
        let data = self.capture_base64(format).await?;
        decode_base64(&data)
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Decodes a base64 capture payload.
fn decode_base64(data: &str) -> Result<Vec<u8>> {
    Base64Standard
        .decode(data)
        .map_err(|e| Error::protocol(format!("invalid capture payload: {e}")))
}

/// Cuts `rect` out of `image`, clamped to the image bounds.
fn crop_image(image: &image::DynamicImage, rect: BoundingBox) -> Result<image::DynamicImage> {
    use image::GenericImageView;

    let left = rect.left.max(0.0).round() as u32;
    let top = rect.top.max(0.0).round() as u32;
    let width = (rect.width.round() as u32).min(image.width().saturating_sub(left));
    let height = (rect.height.round() as u32).min(image.height().saturating_sub(top));

    if width == 0 || height == 0 {
        return Err(Error::invalid_argument(format!(
            "empty crop rectangle: {rect:?} against {}x{} capture",
            image.width(),
            image.height()
        )));
    }

    Ok(image.crop_imm(left, top, width, height))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use image::{DynamicImage, GenericImageView, RgbaImage};

    use crate::testing::{Reply, scripted_page};

    fn checker_png_base64(width: u32, height: u32) -> String {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
            if (x + y) % 2 == 0 {
                image::Rgba([255, 0, 0, 255])
            } else {
                image::Rgba([0, 0, 255, 255])
            }
        }));

        let mut bytes = Vec::new();
        image
            .write_to(
                &mut std::io::Cursor::new(&mut bytes),
                image::ImageFormat::Png,
            )
            .expect("encode");
        Base64Standard.encode(bytes)
    }

    #[test]
    fn test_image_format() {
        assert_eq!(ImageFormat::png().format_str(), "png");
        assert_eq!(ImageFormat::jpeg(80).format_str(), "jpeg");
        assert_eq!(ImageFormat::jpeg(80).quality(), Some(80));
        // Quality saturates at 100.
        assert_eq!(ImageFormat::jpeg(250).quality(), Some(100));
        assert_eq!(ImageFormat::Png.quality(), None);
    }

    #[test]
    fn test_crop_clamps_to_image() {
        let image = DynamicImage::ImageRgba8(RgbaImage::new(8, 8));
        let rect = BoundingBox {
            top: 4.0,
            left: 4.0,
            width: 100.0,
            height: 100.0,
        };

        let cropped = crop_image(&image, rect).expect("crop");
        assert_eq!(cropped.width(), 4);
        assert_eq!(cropped.height(), 4);
    }

    #[test]
    fn test_crop_rejects_empty_rect() {
        let image = DynamicImage::ImageRgba8(RgbaImage::new(8, 8));
        let rect = BoundingBox {
            top: 20.0,
            left: 0.0,
            width: 4.0,
            height: 4.0,
        };

        assert!(matches!(
            crop_image(&image, rect),
            Err(Error::InvalidArgument { .. })
        ));
    }

    #[tokio::test]
    async fn test_screenshot_base64_passthrough() {
        let payload = checker_png_base64(4, 4);
        let expected = payload.clone();

        let (_shared, page) = scripted_page(move |method, params| {
            assert_eq!(method, "render.screenshot");
            assert_eq!(params["format"], "png");
            Some((
                Reply::success(json!({ "data": payload.clone() })),
                Duration::ZERO,
            ))
        })
        .await;

        let data = page
            .screenshot_base64(ImageFormat::Png)
            .await
            .expect("capture");
        assert_eq!(data, expected);
    }

    #[tokio::test]
    async fn test_crop_box_writes_cropped_file() {
        let payload = checker_png_base64(8, 8);

        let (_shared, page) = scripted_page(move |_, _| {
            Some((
                Reply::success(json!({ "data": payload.clone() })),
                Duration::ZERO,
            ))
        })
        .await;

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("crop.png");

        let rect = BoundingBox {
            top: 2.0,
            left: 2.0,
            width: 4.0,
            height: 4.0,
        };
        page.crop(rect, &path).await.expect("crop");

        let written = image::open(&path).expect("open cropped");
        assert_eq!(written.width(), 4);
        assert_eq!(written.height(), 4);
    }
}
