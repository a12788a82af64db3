//! Emergency stop
//!
//! Moving the mouse into any screen corner, or raising the abort flag,
//! stops the automation at the next check.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::InputDriver;

/// Why the automation stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AbortReason {
    #[error("mouse moved into a screen corner at ({x}, {y})")]
    CornerCursor { x: i32, y: i32 },
    #[error("stop requested")]
    Requested,
}

/// Shared stop request, e.g. from a Ctrl+C handler
#[derive(Debug, Clone, Default)]
pub struct AbortFlag(Arc<AtomicBool>);

impl AbortFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Corner-of-screen abort check
#[derive(Debug, Clone)]
pub struct Failsafe {
    margin: i32,
    flag: AbortFlag,
}

impl Failsafe {
    pub fn new(margin: i32, flag: AbortFlag) -> Self {
        Self { margin, flag }
    }

    pub fn flag(&self) -> &AbortFlag {
        &self.flag
    }

    /// Check if the point lies within `margin` of a screen corner.
    ///
    /// Without a known screen size only the top-left corner counts.
    pub fn in_corner(&self, (x, y): (i32, i32), screen: Option<(i32, i32)>) -> bool {
        let left = x <= self.margin;
        let top = y <= self.margin;
        match screen {
            Some((width, height)) => {
                let right = x >= width - self.margin;
                let bottom = y >= height - self.margin;
                (left || right) && (top || bottom)
            }
            None => left && top,
        }
    }

    pub fn check(&self, input: &dyn InputDriver) -> Result<(), AbortReason> {
        if self.flag.is_requested() {
            return Err(AbortReason::Requested);
        }
        if let Some((x, y)) = input.cursor_position() {
            if self.in_corner((x, y), input.screen_size()) {
                log::warn!("FAILSAFE: mouse in corner at ({}, {}), stopping", x, y);
                self.flag.request();
                return Err(AbortReason::CornerCursor { x, y });
            }
        }
        Ok(())
    }

    /// Sleep in slices, checking for an abort before each one
    pub fn sleep(&self, input: &dyn InputDriver, total: Duration, slice: Duration) -> Result<(), AbortReason> {
        self.check(input)?;
        if slice.is_zero() {
            std::thread::sleep(total);
            return Ok(());
        }

        let mut remaining = total;
        while !remaining.is_zero() {
            let step = remaining.min(slice);
            std::thread::sleep(step);
            remaining -= step;
            self.check(input)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desktop::testing::ScriptedDesktop;

    #[test]
    fn test_corners() {
        let failsafe = Failsafe::new(10, AbortFlag::new());
        let screen = Some((1920, 1080));

        assert!(failsafe.in_corner((0, 0), screen));
        assert!(failsafe.in_corner((1915, 5), screen));
        assert!(failsafe.in_corner((3, 1075), screen));
        assert!(failsafe.in_corner((1910, 1070), screen));
        assert!(!failsafe.in_corner((960, 0), screen));
        assert!(!failsafe.in_corner((0, 540), screen));
        assert!(!failsafe.in_corner((1915, 5), None));
    }

    #[test]
    fn test_check_aborts_and_latches() {
        let scripted = ScriptedDesktop::new();
        let failsafe = Failsafe::new(10, AbortFlag::new());

        scripted.move_cursor(500, 500);
        assert!(failsafe.check(scripted.as_ref()).is_ok());

        scripted.move_cursor(2, 2);
        assert_eq!(
            failsafe.check(scripted.as_ref()),
            Err(AbortReason::CornerCursor { x: 2, y: 2 })
        );

        // The flag stays raised after the cursor leaves the corner
        scripted.move_cursor(500, 500);
        assert_eq!(failsafe.check(scripted.as_ref()), Err(AbortReason::Requested));
    }

    #[test]
    fn test_sleep_stops_on_request() {
        let scripted = ScriptedDesktop::new();
        let flag = AbortFlag::new();
        let failsafe = Failsafe::new(10, flag.clone());
        assert!(failsafe
            .sleep(scripted.as_ref(), Duration::from_millis(5), Duration::from_millis(1))
            .is_ok());

        flag.request();
        assert_eq!(
            failsafe.sleep(scripted.as_ref(), Duration::from_secs(60), Duration::from_millis(1)),
            Err(AbortReason::Requested)
        );
    }
}
