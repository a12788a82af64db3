//! Window-relative coordinate profiles
//!
//! The game UI shifts when an interstitial ad is showing, so every anchor the
//! automation clicks or reads comes from one of two profiles. Profiles are
//! decoded once from configuration and then only looked up.

use std::collections::BTreeMap;
use std::fmt;

use image::Rgb;
use serde::{Deserialize, Serialize};

use super::capture::{sample_pixel, ScreenCapture};
use crate::config::{ConfigError, LayoutSettings, TargetSettings};

/// A pixel offset relative to a window origin, serialized as `[x, y]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point(pub i32, pub i32);

impl Point {
    pub fn x(&self) -> i32 {
        self.0
    }

    pub fn y(&self) -> i32 {
        self.1
    }

    /// Move the point by the given delta
    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Point(self.0 + dx, self.1 + dy)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.0, self.1)
    }
}

/// A rectangle given by its top-left and bottom-right corners,
/// serialized as `[[x1, y1], [x2, y2]]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region(pub Point, pub Point);

impl Region {
    pub fn top_left(&self) -> Point {
        self.0
    }

    pub fn bottom_right(&self) -> Point {
        self.1
    }

    pub fn width(&self) -> u32 {
        (self.1 .0 - self.0 .0).max(0) as u32
    }

    pub fn height(&self) -> u32 {
        (self.1 .1 - self.0 .1).max(0) as u32
    }

    /// Move both corners by the given delta
    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Region(self.0.offset(dx, dy), self.1.offset(dx, dy))
    }

    /// A 1x1 region covering a single pixel
    pub fn pixel(at: Point) -> Self {
        Region(at, at.offset(1, 1))
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.0, self.1)
    }
}

/// A configured anchor: either a click point or a rectangular region.
///
/// The two shapes are told apart once, when the configuration is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Anchor {
    Point(Point),
    Region(Region),
}

/// Whether an ad overlay is covering part of the window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdState {
    Showing,
    Absent,
}

impl fmt::Display for AdState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdState::Showing => write!(f, "ad showing"),
            AdState::Absent => write!(f, "no ad"),
        }
    }
}

/// One perk card: where to click it and where its text sits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PerkSlot {
    pub option: Point,
    pub text_region: Region,
}

/// Typed set of anchors for one UI state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinateProfile {
    pub name: String,
    pub play_pause: Point,
    pub play_pause_region: Option<Region>,
    pub new_perk_bar: Point,
    pub close_x: Point,
    pub new_perk_region: Region,
    pub perk_slots: Vec<PerkSlot>,
}

impl CoordinateProfile {
    /// Decode a raw anchor map into a profile.
    ///
    /// `perk_option_1`/`perk1_text_region` and the second slot are required,
    /// the third slot is optional.
    pub fn decode(name: &str, anchors: &BTreeMap<String, Anchor>) -> Result<Self, ConfigError> {
        let decoder = AnchorDecoder { profile: name, anchors };

        let mut perk_slots = Vec::new();
        for idx in 1..=3 {
            let option_key = format!("perk_option_{idx}");
            let region_key = format!("perk{idx}_text_region");
            if idx == 3 && !anchors.contains_key(&option_key) && !anchors.contains_key(&region_key) {
                break;
            }
            perk_slots.push(PerkSlot {
                option: decoder.point(&option_key)?,
                text_region: decoder.region(&region_key)?,
            });
        }

        Ok(Self {
            name: name.to_string(),
            play_pause: decoder.point("play_pause")?,
            play_pause_region: decoder.optional_region("play_pause_region")?,
            new_perk_bar: decoder.point("new_perk_bar")?,
            close_x: decoder.point("close_x")?,
            new_perk_region: decoder.region("new_perk_region")?,
            perk_slots,
        })
    }

    /// Copy of this profile with every anchor moved by `(dx, dy)`
    pub fn shifted(&self, name: &str, dx: i32, dy: i32) -> Self {
        Self {
            name: name.to_string(),
            play_pause: self.play_pause.offset(dx, dy),
            play_pause_region: self.play_pause_region.map(|r| r.offset(dx, dy)),
            new_perk_bar: self.new_perk_bar.offset(dx, dy),
            close_x: self.close_x.offset(dx, dy),
            new_perk_region: self.new_perk_region.offset(dx, dy),
            perk_slots: self
                .perk_slots
                .iter()
                .map(|slot| PerkSlot {
                    option: slot.option.offset(dx, dy),
                    text_region: slot.text_region.offset(dx, dy),
                })
                .collect(),
        }
    }

    /// Shift the perk cards vertically so the first card's text region
    /// starts at `top`. Other anchors are left alone.
    pub fn with_first_perk_top(&self, top: i32) -> Self {
        let Some(first) = self.perk_slots.first() else {
            return self.clone();
        };
        let delta = top - first.text_region.top_left().y();

        let mut adjusted = self.clone();
        for slot in &mut adjusted.perk_slots {
            slot.option = slot.option.offset(0, delta);
            slot.text_region = slot.text_region.offset(0, delta);
        }
        adjusted
    }

    /// The first `count` perk slots (fewer if the profile has fewer)
    pub fn slots(&self, count: usize) -> &[PerkSlot] {
        &self.perk_slots[..count.min(self.perk_slots.len())]
    }
}

struct AnchorDecoder<'a> {
    profile: &'a str,
    anchors: &'a BTreeMap<String, Anchor>,
}

impl AnchorDecoder<'_> {
    fn get(&self, key: &str) -> Result<&Anchor, ConfigError> {
        self.anchors.get(key).ok_or_else(|| ConfigError::MissingAnchor {
            profile: self.profile.to_string(),
            anchor: key.to_string(),
        })
    }

    fn point(&self, key: &str) -> Result<Point, ConfigError> {
        match self.get(key)? {
            Anchor::Point(p) => Ok(*p),
            Anchor::Region(_) => Err(self.wrong_kind(key, "point")),
        }
    }

    fn region(&self, key: &str) -> Result<Region, ConfigError> {
        match self.get(key)? {
            Anchor::Region(r) => Ok(*r),
            Anchor::Point(_) => Err(self.wrong_kind(key, "region")),
        }
    }

    fn optional_region(&self, key: &str) -> Result<Option<Region>, ConfigError> {
        if self.anchors.contains_key(key) {
            self.region(key).map(Some)
        } else {
            Ok(None)
        }
    }

    fn wrong_kind(&self, key: &str, expected: &'static str) -> ConfigError {
        ConfigError::AnchorKind {
            profile: self.profile.to_string(),
            anchor: key.to_string(),
            expected,
        }
    }
}

/// Picks the profile matching the current ad state
#[derive(Debug, Clone)]
pub struct ProfileResolver {
    with_ad: CoordinateProfile,
    no_ad: CoordinateProfile,
    ad_probes: [Point; 2],
    fallback: AdState,
}

impl ProfileResolver {
    /// Build a resolver from two explicit profiles
    pub fn new(with_ad: CoordinateProfile, no_ad: CoordinateProfile, ad_probes: [Point; 2]) -> Self {
        Self {
            with_ad,
            no_ad,
            ad_probes,
            fallback: AdState::Absent,
        }
    }

    /// Build a resolver whose ad profile is the no-ad profile shifted
    /// horizontally by `dx`
    pub fn with_horizontal_offset(no_ad: CoordinateProfile, dx: i32, ad_probes: [Point; 2]) -> Self {
        let with_ad = no_ad.shifted("with_ad", dx, 0);
        Self::new(with_ad, no_ad, ad_probes)
    }

    /// Decode both profiles from the layout settings
    pub fn from_layout(layout: &LayoutSettings) -> Result<Self, ConfigError> {
        let mut resolver = Self::new(
            CoordinateProfile::decode("with_ad", &layout.with_ad)?,
            CoordinateProfile::decode("no_ad", &layout.no_ad)?,
            layout.ad_probes,
        );
        resolver.fallback = layout.fallback;
        Ok(resolver)
    }

    /// Set the profile used when ad detection is impossible
    pub fn with_fallback(mut self, fallback: AdState) -> Self {
        self.fallback = fallback;
        self
    }

    /// Profile for a known ad state
    pub fn resolve(&self, ad_state: AdState) -> CoordinateProfile {
        match ad_state {
            AdState::Showing => self.with_ad.clone(),
            AdState::Absent => self.no_ad.clone(),
        }
    }

    /// Profile for a target, applying the fallback when the ad state is
    /// unknown and the target's own adjustments
    pub fn resolve_for(&self, target: &TargetSettings, ad_state: Option<AdState>) -> CoordinateProfile {
        let ad_state = ad_state.unwrap_or_else(|| {
            log::warn!(
                "[{}] Ad state unknown, falling back to the {} profile",
                target.name,
                self.fallback
            );
            self.fallback
        });

        let profile = self.resolve(ad_state);
        match target.align_first_perk_y {
            Some(top) => {
                let adjusted = profile.with_first_perk_top(top);
                log::debug!("[{}] Aligned perk cards to y={}", target.name, top);
                adjusted
            }
            None => profile,
        }
    }

    /// Sample the two probe pixels; identical colors mean no ad.
    ///
    /// Returns `None` when either pixel cannot be captured.
    pub fn detect_ad_state(&self, capture: &dyn ScreenCapture, window: &str) -> Option<AdState> {
        let first = sample_pixel(capture, window, self.ad_probes[0]);
        let second = sample_pixel(capture, window, self.ad_probes[1]);

        let (Some(first), Some(second)) = (first, second) else {
            log::warn!("[{}] Could not capture ad detection pixels", window);
            return None;
        };

        let state = ad_state_from_probes(first, second);
        log::debug!(
            "[{}] Ad check {}: RGB{:?} vs {}: RGB{:?} -> {}",
            window,
            self.ad_probes[0],
            first.0,
            self.ad_probes[1],
            second.0,
            state
        );
        Some(state)
    }

    /// Detect the ad state and resolve the target's profile in one go
    pub fn resolve_detected(
        &self,
        capture: &dyn ScreenCapture,
        target: &TargetSettings,
    ) -> CoordinateProfile {
        let ad_state = self.detect_ad_state(capture, &target.name);
        self.resolve_for(target, ad_state)
    }
}

/// Exact equality of the probe colors means the background is unobstructed
pub fn ad_state_from_probes(first: Rgb<u8>, second: Rgb<u8>) -> AdState {
    if first == second {
        AdState::Absent
    } else {
        AdState::Showing
    }
}
