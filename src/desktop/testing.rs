//! Scripted desktop for tests
//!
//! Windows are in-memory frames. OCR answers come from per-region queues
//! keyed by the last captured region; the last queued answer repeats. The
//! play/pause chord flips the play button pixel of the foreground window.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use image::{GrayImage, Rgb, RgbImage};

use super::{Desktop, InputDriver, InputError, WindowHandle, WindowInfo, WindowManager};
use crate::config::{Key, PlayStateSettings};
use crate::game::state::PlayState;
use crate::vision::{FrameCapture, Point, Region, ScreenCapture, TextRecognizer};

pub const WINDOW_SIZE: (u32, u32) = (1400, 600);
pub const BACKDROP: Rgb<u8> = Rgb([20, 35, 80]);

#[derive(Default)]
struct Script {
    windows: Vec<WindowInfo>,
    foreground: Option<WindowHandle>,
    next_handle: u64,
    texts: HashMap<(String, Region), VecDeque<String>>,
    last_capture: Option<(String, Region)>,
    clicks: Vec<(i32, i32)>,
    chords: Vec<Vec<Key>>,
    focus_log: Vec<String>,
    cursor: (i32, i32),
    play_frozen: bool,
}

pub struct ScriptedDesktop {
    frames: FrameCapture,
    play: PlayStateSettings,
    script: Mutex<Script>,
}

impl ScriptedDesktop {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            frames: FrameCapture::new(),
            play: PlayStateSettings::default(),
            script: Mutex::new(Script {
                next_handle: 1,
                cursor: (960, 540),
                ..Script::default()
            }),
        })
    }

    pub fn desktop(self: &Arc<Self>) -> Desktop {
        Desktop {
            capture: self.clone(),
            ocr: self.clone(),
            input: self.clone(),
            windows: self.clone(),
        }
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap()
    }

    pub fn frames(&self) -> &FrameCapture {
        &self.frames
    }

    /// Add a running game window at the given screen position
    pub fn add_window(&self, title: &str, left: i32, top: i32) -> WindowInfo {
        let mut script = self.script();
        let info = WindowInfo {
            handle: WindowHandle(script.next_handle),
            title: title.to_string(),
            left,
            top,
            width: WINDOW_SIZE.0,
            height: WINDOW_SIZE.1,
        };
        script.next_handle += 1;
        script.windows.push(info.clone());
        drop(script);

        self.frames
            .set_frame(title, RgbImage::from_pixel(WINDOW_SIZE.0, WINDOW_SIZE.1, BACKDROP));
        self.set_play_state(title, PlayState::Running);
        info
    }

    pub fn close_window(&self, title: &str) {
        self.script().windows.retain(|w| w.title != title);
        self.frames.clear(title);
    }

    pub fn focus_title(&self, title: &str) {
        let mut script = self.script();
        script.foreground = script.windows.iter().find(|w| w.title == title).map(|w| w.handle);
    }

    /// Queue OCR answers for a region of a window
    pub fn script_text(&self, window: &str, region: Region, answers: &[&str]) {
        self.script().texts.insert(
            (window.to_string(), region),
            answers.iter().map(|a| a.to_string()).collect(),
        );
    }

    pub fn set_play_state(&self, window: &str, state: PlayState) {
        let color = match state {
            PlayState::Paused => self.play.paused_color,
            _ => self.play.running_color,
        };
        self.frames.put_pixel(window, self.play.probe, Rgb(color));
    }

    /// Stop the chord from changing the play button
    pub fn freeze_play(&self, frozen: bool) {
        self.script().play_frozen = frozen;
    }

    pub fn move_cursor(&self, x: i32, y: i32) {
        self.script().cursor = (x, y);
    }

    pub fn clicks(&self) -> Vec<(i32, i32)> {
        self.script().clicks.clone()
    }

    pub fn chords(&self) -> Vec<Vec<Key>> {
        self.script().chords.clone()
    }

    pub fn focus_log(&self) -> Vec<String> {
        self.script().focus_log.clone()
    }

    fn current_play_state(&self, window: &str) -> Option<PlayState> {
        let frame = self.frames.capture(window, Some(Region::pixel(self.play.probe)))?;
        let color = frame.get_pixel(0, 0).0;
        Some(if color == self.play.paused_color {
            PlayState::Paused
        } else {
            PlayState::Running
        })
    }
}

impl ScreenCapture for ScriptedDesktop {
    fn capture(&self, window: &str, region: Option<Region>) -> Option<RgbImage> {
        if let Some(region) = region {
            self.script().last_capture = Some((window.to_string(), region));
        }
        self.frames.capture(window, region)
    }
}

impl TextRecognizer for ScriptedDesktop {
    fn recognize(&self, _image: &GrayImage) -> String {
        let mut script = self.script();
        let Some(key) = script.last_capture.clone() else {
            return String::new();
        };
        match script.texts.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_default(),
            Some(queue) => queue.front().cloned().unwrap_or_default(),
            None => String::new(),
        }
    }
}

impl InputDriver for ScriptedDesktop {
    fn click(&self, x: i32, y: i32) -> Result<(), InputError> {
        self.script().clicks.push((x, y));
        Ok(())
    }

    fn key_chord(&self, keys: &[Key]) -> Result<(), InputError> {
        let mut script = self.script();
        script.chords.push(keys.to_vec());
        let frozen = script.play_frozen;
        let target = script
            .foreground
            .and_then(|h| script.windows.iter().find(|w| w.handle == h))
            .map(|w| w.title.clone());
        drop(script);

        if let (false, Some(title)) = (frozen, target) {
            match self.current_play_state(&title) {
                Some(PlayState::Paused) => self.set_play_state(&title, PlayState::Running),
                Some(_) => self.set_play_state(&title, PlayState::Paused),
                None => {}
            }
        }
        Ok(())
    }

    fn cursor_position(&self) -> Option<(i32, i32)> {
        Some(self.script().cursor)
    }

    fn screen_size(&self) -> Option<(i32, i32)> {
        Some((1920, 1080))
    }
}

impl WindowManager for ScriptedDesktop {
    fn find(&self, title: &str) -> Option<WindowInfo> {
        self.script().windows.iter().find(|w| w.title == title).cloned()
    }

    fn foreground(&self) -> Option<WindowInfo> {
        let script = self.script();
        let handle = script.foreground?;
        script.windows.iter().find(|w| w.handle == handle).cloned()
    }

    fn focus(&self, window: &WindowInfo) -> Result<(), InputError> {
        let mut script = self.script();
        if !script.windows.iter().any(|w| w.handle == window.handle) {
            return Err(InputError::WindowNotFound(window.title.clone()));
        }
        script.foreground = Some(window.handle);
        script.focus_log.push(window.title.clone());
        Ok(())
    }

    fn exists(&self, handle: WindowHandle) -> bool {
        self.script().windows.iter().any(|w| w.handle == handle)
    }
}

#[test]
fn test_scripted_text_repeats_last_answer() {
    let scripted = ScriptedDesktop::new();
    scripted.add_window("Emulator", 0, 0);
    let region = Region(Point(0, 0), Point(10, 10));
    scripted.script_text("Emulator", region, &["first", "second"]);

    let gray = GrayImage::new(1, 1);
    let read = || {
        scripted.capture("Emulator", Some(region));
        scripted.recognize(&gray)
    };
    assert_eq!(read(), "first");
    assert_eq!(read(), "second");
    assert_eq!(read(), "second");
}

#[test]
fn test_chord_toggles_foreground_play_state() {
    let scripted = ScriptedDesktop::new();
    scripted.add_window("Emulator", 0, 0);
    assert_eq!(scripted.current_play_state("Emulator"), Some(PlayState::Running));

    // Nothing focused: the chord goes nowhere
    scripted.key_chord(&[Key::Ctrl]).unwrap();
    assert_eq!(scripted.current_play_state("Emulator"), Some(PlayState::Running));

    scripted.focus_title("Emulator");
    scripted.key_chord(&[Key::Ctrl]).unwrap();
    assert_eq!(scripted.current_play_state("Emulator"), Some(PlayState::Paused));
}
