//! Fallback backend used when no native desktop integration is available

use image::{GrayImage, RgbImage};

use super::{InputDriver, InputError, WindowHandle, WindowInfo, WindowManager};
use crate::config::Key;
use crate::vision::{Region, ScreenCapture, TextRecognizer};

/// Finds no windows, captures nothing and reads no text
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDesktop;

impl ScreenCapture for NullDesktop {
    fn capture(&self, _window: &str, _region: Option<Region>) -> Option<RgbImage> {
        None
    }
}

impl TextRecognizer for NullDesktop {
    fn recognize(&self, _image: &GrayImage) -> String {
        String::new()
    }
}

impl InputDriver for NullDesktop {
    fn click(&self, x: i32, y: i32) -> Result<(), InputError> {
        log::debug!("Null backend ignoring click at ({}, {})", x, y);
        Ok(())
    }

    fn key_chord(&self, _keys: &[Key]) -> Result<(), InputError> {
        Ok(())
    }

    fn cursor_position(&self) -> Option<(i32, i32)> {
        None
    }

    fn screen_size(&self) -> Option<(i32, i32)> {
        None
    }
}

impl WindowManager for NullDesktop {
    fn find(&self, _title: &str) -> Option<WindowInfo> {
        None
    }

    fn foreground(&self) -> Option<WindowInfo> {
        None
    }

    fn focus(&self, window: &WindowInfo) -> Result<(), InputError> {
        Err(InputError::WindowNotFound(window.title.clone()))
    }

    fn exists(&self, _handle: WindowHandle) -> bool {
        false
    }
}
