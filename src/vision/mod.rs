//! Vision and image processing module
//!
//! Handles window capture, coordinate profiles, OCR of the perk bar and
//! perk cards, purple background detection and the play/pause button.

pub mod capture;
pub mod layout;
pub mod ocr;
pub mod recognition;

use image::Rgb;

use crate::config::{ConfigError, Settings, TargetSettings};
use crate::game::state::PlayState;

pub use capture::{FrameCapture, ScreenCapture};
pub use layout::{AdState, Anchor, CoordinateProfile, PerkSlot, Point, ProfileResolver, Region};
pub use ocr::{TextReader, TextRecognizer};
pub use recognition::{BackgroundClassifier, PlayStateDetector, PurpleMatch};

/// What was read from one perk card
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardReading {
    pub text: String,
    pub is_purple: bool,
    pub background: Option<Rgb<u8>>,
}

/// Main vision system that coordinates all recognition for one target
pub struct VisionSystem {
    resolver: ProfileResolver,
    classifier: BackgroundClassifier,
    play_state: PlayStateDetector,
}

impl VisionSystem {
    /// Decode the layout and build the detectors
    pub fn new(settings: &Settings) -> Result<Self, ConfigError> {
        Ok(Self {
            resolver: ProfileResolver::from_layout(&settings.layout)?,
            classifier: BackgroundClassifier::new(&settings.purple),
            play_state: PlayStateDetector::new(&settings.play_state),
        })
    }

    pub fn resolver(&self) -> &ProfileResolver {
        &self.resolver
    }

    pub fn classifier(&self) -> &BackgroundClassifier {
        &self.classifier
    }

    /// Detect the ad state and pick the matching profile for the target
    pub fn profile_for(&self, capture: &dyn ScreenCapture, target: &TargetSettings) -> CoordinateProfile {
        self.resolver.resolve_detected(capture, target)
    }

    /// OCR the "new perk" bar
    pub fn read_perk_bar(
        &self,
        capture: &dyn ScreenCapture,
        ocr: &dyn TextRecognizer,
        target: &TargetSettings,
        profile: &CoordinateProfile,
    ) -> String {
        TextReader::new(capture, ocr).read_region(&target.name, profile.new_perk_region, target.ocr_threshold)
    }

    /// OCR a perk card and sample its background
    pub fn read_card(
        &self,
        capture: &dyn ScreenCapture,
        ocr: &dyn TextRecognizer,
        target: &TargetSettings,
        slot: &PerkSlot,
    ) -> CardReading {
        let text = TextReader::new(capture, ocr).read_region(&target.name, slot.text_region, target.ocr_threshold);
        let (is_purple, background) = self.classifier.sample(capture, &target.name, slot.text_region);
        CardReading {
            text,
            is_purple,
            background,
        }
    }

    /// Current state of the play/pause button
    pub fn play_state(&self, capture: &dyn ScreenCapture, window: &str) -> PlayState {
        self.play_state.detect(capture, window)
    }
}
