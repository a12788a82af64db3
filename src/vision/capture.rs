//! Screen capture handling
//!
//! Capture itself is an external capability; this module defines the trait,
//! a frame-backed implementation, and the pixel helpers built on top of it.

use std::collections::HashMap;
use std::sync::RwLock;

use image::{Rgb, RgbImage};

use super::layout::{Point, Region};

/// Window capture provider.
///
/// `region` is relative to the window origin. Any failure (window missing,
/// OS capture error, region outside the window) is reported as `None`.
pub trait ScreenCapture: Send + Sync {
    fn capture(&self, window: &str, region: Option<Region>) -> Option<RgbImage>;
}

/// Capture provider serving stored full-window frames
pub struct FrameCapture {
    frames: RwLock<HashMap<String, RgbImage>>,
}

impl FrameCapture {
    /// Create an empty frame store
    pub fn new() -> Self {
        Self {
            frames: RwLock::new(HashMap::new()),
        }
    }

    /// Replace the frame for a window
    pub fn set_frame(&self, window: &str, frame: RgbImage) {
        if let Ok(mut frames) = self.frames.write() {
            frames.insert(window.to_string(), frame);
        }
    }

    /// Paint a single pixel of a stored frame
    pub fn put_pixel(&self, window: &str, at: Point, color: Rgb<u8>) {
        let Ok(mut frames) = self.frames.write() else {
            return;
        };
        if let Some(frame) = frames.get_mut(window) {
            if at.x() >= 0 && at.y() >= 0 && (at.x() as u32) < frame.width() && (at.y() as u32) < frame.height() {
                frame.put_pixel(at.x() as u32, at.y() as u32, color);
            }
        }
    }

    /// Drop the frame for a window so captures fail
    pub fn clear(&self, window: &str) {
        if let Ok(mut frames) = self.frames.write() {
            frames.remove(window);
        }
    }

    /// Check if a frame is stored for the window
    pub fn has_frame(&self, window: &str) -> bool {
        self.frames
            .read()
            .map(|frames| frames.contains_key(window))
            .unwrap_or(false)
    }
}

impl Default for FrameCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl ScreenCapture for FrameCapture {
    fn capture(&self, window: &str, region: Option<Region>) -> Option<RgbImage> {
        let frames = self.frames.read().ok()?;
        let frame = frames.get(window)?;
        match region {
            Some(region) => crop_region(frame, region),
            None => Some(frame.clone()),
        }
    }
}

/// Extract a region of a frame, `None` if it is empty or out of bounds
pub fn crop_region(frame: &RgbImage, region: Region) -> Option<RgbImage> {
    let Point(x, y) = region.top_left();
    let (width, height) = (region.width(), region.height());
    if x < 0 || y < 0 || width == 0 || height == 0 {
        return None;
    }

    let (x, y) = (x as u32, y as u32);
    if x + width > frame.width() || y + height > frame.height() {
        return None;
    }

    Some(image::imageops::crop_imm(frame, x, y, width, height).to_image())
}

/// Capture a single window-relative pixel
pub fn sample_pixel(capture: &dyn ScreenCapture, window: &str, at: Point) -> Option<Rgb<u8>> {
    let image = capture.capture(window, Some(Region::pixel(at)))?;
    image.get_pixel_checked(0, 0).copied()
}

/// Sum of absolute per-channel differences
pub fn color_distance(a: Rgb<u8>, b: Rgb<u8>) -> u32 {
    a.0.iter()
        .zip(b.0.iter())
        .map(|(&x, &y)| (x as i32 - y as i32).unsigned_abs())
        .sum()
}

/// `#RRGGBB` form of a color
pub fn hex_color(color: Rgb<u8>) -> String {
    format!("#{:02X}{:02X}{:02X}", color[0], color[1], color[2])
}
