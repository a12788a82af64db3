//! Color-based recognition: purple perk cards and the play/pause button

use std::fmt;

use image::Rgb;

use super::capture::{color_distance, hex_color, sample_pixel, ScreenCapture};
use super::layout::{Point, Region};
use crate::config::{PlayStateSettings, PurpleSettings};
use crate::game::state::PlayState;

/// Which heuristic recognized a purple card
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurpleMatch {
    /// Close to the dark purple card background, with a near-zero green channel
    Background { distance: u32 },
    /// Close to the bright magenta card border
    Border { distance: u32 },
    /// Blue-dominant dark color with almost no green
    DarkPurple,
    /// High red, low green, very high blue
    BrightMagenta,
}

impl fmt::Display for PurpleMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PurpleMatch::Background { distance } => write!(f, "purple background (distance {distance})"),
            PurpleMatch::Border { distance } => write!(f, "purple border (distance {distance})"),
            PurpleMatch::DarkPurple => write!(f, "dark purple pattern"),
            PurpleMatch::BrightMagenta => write!(f, "bright magenta pattern"),
        }
    }
}

/// Classifies a sampled card background as purple.
///
/// Four independent checks are OR-combined so capture and compression color
/// drift does not hide a purple card.
#[derive(Debug, Clone)]
pub struct BackgroundClassifier {
    background: Rgb<u8>,
    border: Rgb<u8>,
    tolerance: u32,
    green_ceiling: u8,
    dark_blue_floor: u8,
    dark_red_ceiling: u8,
    magenta_red_floor: u8,
    magenta_green_ceiling: u8,
    magenta_blue_floor: u8,
    sample_offset: Point,
}

impl BackgroundClassifier {
    pub fn new(settings: &PurpleSettings) -> Self {
        Self {
            background: Rgb(settings.background_color),
            border: Rgb(settings.border_color),
            tolerance: settings.tolerance,
            green_ceiling: settings.green_ceiling,
            dark_blue_floor: settings.dark_blue_floor,
            dark_red_ceiling: settings.dark_red_ceiling,
            magenta_red_floor: settings.magenta_red_floor,
            magenta_green_ceiling: settings.magenta_green_ceiling,
            magenta_blue_floor: settings.magenta_blue_floor,
            sample_offset: settings.sample_offset,
        }
    }

    /// Every heuristic that fires for the color, in evaluation order
    pub fn matches(&self, color: Rgb<u8>) -> Vec<PurpleMatch> {
        let [r, g, b] = color.0;
        let mut hits = Vec::new();

        let distance = color_distance(color, self.background);
        if distance <= self.tolerance && g < self.green_ceiling {
            hits.push(PurpleMatch::Background { distance });
        }

        let distance = color_distance(color, self.border);
        if distance <= self.tolerance {
            hits.push(PurpleMatch::Border { distance });
        }

        if b > r && b > g && g < self.green_ceiling && b > self.dark_blue_floor && r < self.dark_red_ceiling {
            hits.push(PurpleMatch::DarkPurple);
        }

        if r > self.magenta_red_floor && g < self.magenta_green_ceiling && b > self.magenta_blue_floor {
            hits.push(PurpleMatch::BrightMagenta);
        }

        hits
    }

    /// The first heuristic that fires
    pub fn detect(&self, color: Rgb<u8>) -> Option<PurpleMatch> {
        self.matches(color).into_iter().next()
    }

    pub fn classify(&self, color: Rgb<u8>) -> bool {
        self.detect(color).is_some()
    }

    /// Where to sample the background of a perk card
    pub fn sample_point(&self, text_region: Region) -> Point {
        text_region
            .top_left()
            .offset(self.sample_offset.x(), self.sample_offset.y())
    }

    /// Sample a perk card and classify it.
    ///
    /// A failed sample is treated as not purple.
    pub fn sample(
        &self,
        capture: &dyn ScreenCapture,
        window: &str,
        text_region: Region,
    ) -> (bool, Option<Rgb<u8>>) {
        let at = self.sample_point(text_region);
        let Some(color) = sample_pixel(capture, window, at) else {
            log::warn!("[{}] Could not sample perk background at {}", window, at);
            return (false, None);
        };

        match self.detect(color) {
            Some(hit) => {
                log::info!("[{}] Background {} at {} -> {}", window, hex_color(color), at, hit);
                (true, Some(color))
            }
            None => {
                log::debug!("[{}] Background {} at {} -> not purple", window, hex_color(color), at);
                (false, Some(color))
            }
        }
    }
}

impl Default for BackgroundClassifier {
    fn default() -> Self {
        Self::new(&PurpleSettings::default())
    }
}

/// Reads the play/pause button to tell whether the game is paused
#[derive(Debug, Clone)]
pub struct PlayStateDetector {
    probe: Point,
    paused_color: Rgb<u8>,
    running_color: Rgb<u8>,
    tolerance: u32,
}

impl PlayStateDetector {
    pub fn new(settings: &PlayStateSettings) -> Self {
        Self {
            probe: settings.probe,
            paused_color: Rgb(settings.paused_color),
            running_color: Rgb(settings.running_color),
            tolerance: settings.tolerance,
        }
    }

    /// Nearest reference color wins; the paused color is checked first
    /// when both are within tolerance
    pub fn classify_color(&self, color: Rgb<u8>) -> PlayState {
        let paused = color_distance(color, self.paused_color);
        let running = color_distance(color, self.running_color);

        if paused <= self.tolerance {
            PlayState::Paused
        } else if running <= self.tolerance {
            PlayState::Running
        } else if paused < running {
            log::debug!("Play button color {} closer to paused", hex_color(color));
            PlayState::Paused
        } else {
            log::debug!("Play button color {} closer to running", hex_color(color));
            PlayState::Running
        }
    }

    /// Sample the button; `Unknown` if the capture fails
    pub fn detect(&self, capture: &dyn ScreenCapture, window: &str) -> PlayState {
        match sample_pixel(capture, window, self.probe) {
            Some(color) => self.classify_color(color),
            None => PlayState::Unknown,
        }
    }
}

impl Default for PlayStateDetector {
    fn default() -> Self {
        Self::new(&PlayStateSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::capture::FrameCapture;
    use image::RgbImage;

    #[test]
    fn test_reference_colors() {
        let classifier = BackgroundClassifier::default();
        assert!(classifier.classify(Rgb([31, 3, 82])));
        assert!(classifier.classify(Rgb([239, 23, 253])));
        assert!(!classifier.classify(Rgb([200, 200, 200])));
    }

    #[test]
    fn test_background_heuristic_only() {
        // With default limits every background hit is also a dark purple hit,
        // so tighten the red ceiling of the pattern check to isolate it
        let settings = PurpleSettings {
            dark_red_ceiling: 20,
            ..PurpleSettings::default()
        };
        let classifier = BackgroundClassifier::new(&settings);
        assert_eq!(
            classifier.matches(Rgb([40, 5, 80])),
            vec![PurpleMatch::Background { distance: 13 }]
        );
    }

    #[test]
    fn test_background_needs_low_green() {
        let classifier = BackgroundClassifier::default();
        // Within distance of the background but green too high
        assert_eq!(classifier.detect(Rgb([31, 25, 82])), None);
    }

    #[test]
    fn test_border_heuristic_only() {
        // Border hits overlap the magenta pattern by default
        let settings = PurpleSettings {
            magenta_blue_floor: 255,
            ..PurpleSettings::default()
        };
        let classifier = BackgroundClassifier::new(&settings);
        assert_eq!(
            classifier.matches(Rgb([239, 23, 253])),
            vec![PurpleMatch::Border { distance: 0 }]
        );
    }

    #[test]
    fn test_dark_purple_heuristic_only() {
        let classifier = BackgroundClassifier::default();
        assert_eq!(classifier.matches(Rgb([10, 2, 150])), vec![PurpleMatch::DarkPurple]);
    }

    #[test]
    fn test_bright_magenta_heuristic_only() {
        let classifier = BackgroundClassifier::default();
        assert_eq!(classifier.matches(Rgb([190, 70, 210])), vec![PurpleMatch::BrightMagenta]);
    }

    #[test]
    fn test_reference_background_reports_first_hit() {
        let classifier = BackgroundClassifier::default();
        assert_eq!(
            classifier.detect(Rgb([31, 3, 82])),
            Some(PurpleMatch::Background { distance: 0 })
        );
    }

    #[test]
    fn test_dark_blue_card_is_not_purple() {
        let classifier = BackgroundClassifier::default();
        assert!(!classifier.classify(Rgb([20, 35, 80])));
    }

    #[test]
    fn test_sample_uses_offset() {
        let classifier = BackgroundClassifier::default();
        let capture = FrameCapture::new();
        capture.set_frame("win", RgbImage::from_pixel(100, 100, Rgb([20, 35, 80])));
        capture.put_pixel("win", Point(30, 50), Rgb([31, 3, 82]));

        let region = Region(Point(20, 40), Point(90, 90));
        assert_eq!(classifier.sample(&capture, "win", region), (true, Some(Rgb([31, 3, 82]))));

        let region = Region(Point(0, 0), Point(90, 90));
        assert_eq!(classifier.sample(&capture, "win", region), (false, Some(Rgb([20, 35, 80]))));

        assert_eq!(classifier.sample(&capture, "gone", region), (false, None));
    }

    #[test]
    fn test_play_state_classification() {
        let detector = PlayStateDetector::default();
        assert_eq!(detector.classify_color(Rgb([0xB6, 0xB8, 0xCD])), PlayState::Paused);
        assert_eq!(detector.classify_color(Rgb([0x1B, 0x1E, 0x38])), PlayState::Running);
        // Outside tolerance, nearest wins
        assert_eq!(detector.classify_color(Rgb([150, 150, 170])), PlayState::Paused);
        assert_eq!(detector.classify_color(Rgb([60, 60, 90])), PlayState::Running);
    }

    #[test]
    fn test_play_state_capture_failure() {
        let detector = PlayStateDetector::default();
        let capture = FrameCapture::new();
        assert_eq!(detector.detect(&capture, "win"), PlayState::Unknown);
    }
}
