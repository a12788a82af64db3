//! OCR plumbing for reading perk and perk-bar text
//!
//! Recognition is delegated to an external engine; this module prepares the
//! bitmap, cleans the engine's output and never fails the caller.

use image::{GrayImage, RgbImage};
use imageproc::contrast::{threshold, ThresholdType};

use super::capture::ScreenCapture;
use super::layout::Region;

/// OCR provider.
///
/// Returns whatever text it could recognize; empty or garbled text is a
/// normal result, not an error.
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, image: &GrayImage) -> String;
}

/// Grayscale the capture and optionally binarize it.
///
/// With a threshold, pixels at or above it become white and the rest black.
pub fn preprocess(image: &RgbImage, binarize_at: Option<u8>) -> GrayImage {
    let gray = image::imageops::grayscale(image);
    match binarize_at {
        Some(0) => GrayImage::from_pixel(gray.width(), gray.height(), image::Luma([255])),
        Some(level) => threshold(&gray, level - 1, ThresholdType::Binary),
        None => gray,
    }
}

/// Drop non-ASCII noise and collapse runs of whitespace
pub fn clean_text(raw: &str) -> String {
    raw.chars()
        .filter(char::is_ascii)
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Cleaned, lowercased text used for keyword matching
pub fn normalize_text(raw: &str) -> String {
    clean_text(raw).to_lowercase()
}

/// Check if the text contains at least one ASCII digit
pub fn has_digit(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_digit())
}

/// Captures a window region and runs it through the OCR engine
pub struct TextReader<'a> {
    capture: &'a dyn ScreenCapture,
    recognizer: &'a dyn TextRecognizer,
}

impl<'a> TextReader<'a> {
    pub fn new(capture: &'a dyn ScreenCapture, recognizer: &'a dyn TextRecognizer) -> Self {
        Self {
            capture,
            recognizer,
        }
    }

    /// Read the text in a window region.
    ///
    /// A failed capture yields an empty string.
    pub fn read_region(&self, window: &str, region: Region, binarize_at: Option<u8>) -> String {
        let Some(image) = self.capture.capture(window, Some(region)) else {
            log::warn!("[{}] Could not capture region {} for OCR", window, region);
            return String::new();
        };

        let prepared = preprocess(&image, binarize_at);
        let text = clean_text(&self.recognizer.recognize(&prepared));
        log::debug!("[{}] OCR {}: '{}'", window, region, text);
        text
    }
}
