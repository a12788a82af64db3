//! Desktop capabilities
//!
//! Window lookup, clicking and key presses are provided by the host through
//! the traits below. A `Desktop` bundles one implementation of each, picked
//! at startup.

pub mod failsafe;
pub mod input;
pub mod null;
#[cfg(test)]
pub mod testing;

use std::fmt;
use std::sync::Arc;

use crate::config::Key;
use crate::vision::{Point, ScreenCapture, TextRecognizer};

pub use failsafe::{AbortFlag, AbortReason, Failsafe};
pub use input::{DeskAction, InputExecutor, InputPlanner};
pub use null::NullDesktop;

/// Opaque OS window handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub u64);

/// Snapshot of a top-level window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowInfo {
    pub handle: WindowHandle,
    pub title: String,
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

impl WindowInfo {
    pub fn origin(&self) -> Point {
        Point(self.left, self.top)
    }
}

impl fmt::Display for WindowInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' at ({}, {}), {}x{}",
            self.title, self.left, self.top, self.width, self.height
        )
    }
}

/// Input injection errors
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("Window not found: {0}")]
    WindowNotFound(String),
    #[error("Not supported by this backend: {0}")]
    Unsupported(&'static str),
    #[error("Input backend failed: {0}")]
    Backend(String),
}

/// Why an input sequence stopped
#[derive(Debug, thiserror::Error)]
pub enum DeskError {
    #[error("Aborted: {0}")]
    Abort(#[from] AbortReason),
    #[error("Input failed: {0}")]
    Input(#[from] InputError),
}

/// Mouse and keyboard injection at absolute screen coordinates
pub trait InputDriver: Send + Sync {
    fn click(&self, x: i32, y: i32) -> Result<(), InputError>;
    /// Press the keys together and release them in reverse order
    fn key_chord(&self, keys: &[Key]) -> Result<(), InputError>;
    fn cursor_position(&self) -> Option<(i32, i32)>;
    fn screen_size(&self) -> Option<(i32, i32)>;
}

/// Top-level window lookup and focus
pub trait WindowManager: Send + Sync {
    /// Window whose title equals `title` exactly
    fn find(&self, title: &str) -> Option<WindowInfo>;
    fn foreground(&self) -> Option<WindowInfo>;
    /// Un-minimize if needed and bring to the foreground
    fn focus(&self, window: &WindowInfo) -> Result<(), InputError>;
    /// Check the handle still refers to a live window
    fn exists(&self, handle: WindowHandle) -> bool;
}

/// The capability set the automation runs against
#[derive(Clone)]
pub struct Desktop {
    pub capture: Arc<dyn ScreenCapture>,
    pub ocr: Arc<dyn TextRecognizer>,
    pub input: Arc<dyn InputDriver>,
    pub windows: Arc<dyn WindowManager>,
}

impl Desktop {
    /// A desktop where nothing is found and every action is a no-op
    pub fn null() -> Self {
        let null = Arc::new(NullDesktop);
        Self {
            capture: null.clone(),
            ocr: null.clone(),
            input: null.clone(),
            windows: null,
        }
    }

    /// Pick the best backend available on this host
    pub fn detect() -> Self {
        log::warn!("No native desktop backend is available on this platform, using the null backend");
        log::warn!("Windows will never be found and no input will be sent");
        Self::null()
    }

    /// Focus the named window, if it exists.
    ///
    /// Returns the window snapshot used for the focus.
    pub fn focus_window(&self, title: &str) -> Result<WindowInfo, InputError> {
        let window = self
            .windows
            .find(title)
            .ok_or_else(|| InputError::WindowNotFound(title.to_string()))?;
        self.windows.focus(&window)?;
        Ok(window)
    }

    /// Bring a previously saved window back to the foreground.
    ///
    /// Returns `false` when the window no longer exists or refuses focus.
    pub fn restore_foreground(&self, saved: &WindowInfo) -> bool {
        if !self.windows.exists(saved.handle) {
            log::info!("Previous window no longer exists: '{}'", saved.title);
            return false;
        }
        match self.windows.focus(saved) {
            Ok(()) => {
                log::info!("Restored previous window: '{}'", saved.title);
                true
            }
            Err(e) => {
                log::warn!("Error restoring window '{}': {}", saved.title, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desktop::testing::ScriptedDesktop;

    #[test]
    fn test_null_desktop_finds_nothing() {
        let desktop = Desktop::null();
        assert!(desktop.windows.find("Emulator").is_none());
        assert!(desktop.capture.capture("Emulator", None).is_none());
        assert!(matches!(desktop.focus_window("Emulator"), Err(InputError::WindowNotFound(_))));
    }

    #[test]
    fn test_restore_foreground() {
        let scripted = ScriptedDesktop::new();
        let editor = scripted.add_window("Editor", 0, 0);
        scripted.add_window("Emulator", 100, 50);
        let desktop = scripted.desktop();

        desktop.focus_window("Emulator").unwrap();
        assert_eq!(desktop.windows.foreground().map(|w| w.title), Some("Emulator".to_string()));

        assert!(desktop.restore_foreground(&editor));
        assert_eq!(desktop.windows.foreground().map(|w| w.title), Some("Editor".to_string()));

        scripted.close_window("Editor");
        assert!(!desktop.restore_foreground(&editor));
    }

    #[test]
    fn test_window_origin() {
        let scripted = ScriptedDesktop::new();
        let info = scripted.add_window("Emulator", 100, 50);
        assert_eq!(info.origin(), Point(100, 50));
        assert_eq!(info.to_string(), "'Emulator' at (100, 50), 1400x600");
    }
}
