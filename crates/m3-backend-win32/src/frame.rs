#![forbid(unsafe_code)]

//! Active-frame bookkeeping for the GDI drawing calls.
//!
//! One window at a time may be inside `begin_frame`/`end_frame`. The clip
//! stack is a count of `SaveDC` levels on that window's memory DC; the
//! transform is remembered so it can be reapplied after `RestoreDC`.

use m3_backend::Mat3;
use m3_core::{Error, Handle, Result};

/// Deepest nesting of `push_clip`.
pub const CLIP_STACK_CAPACITY: u32 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameState {
    active: Option<Handle>,
    clip_depth: u32,
    transform: Option<Mat3>,
}

impl FrameState {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            active: None,
            clip_depth: 0,
            transform: None,
        }
    }

    /// Window currently being drawn, or [`Error::State`] outside a frame.
    pub fn active(&self) -> Result<Handle> {
        self.active.ok_or(Error::State)
    }

    #[must_use]
    pub fn is_active(&self, window: Handle) -> bool {
        self.active == Some(window)
    }

    #[must_use]
    pub fn clip_depth(&self) -> u32 {
        self.clip_depth
    }

    /// Transform set during this frame; `None` means identity.
    #[must_use]
    pub fn transform(&self) -> Option<&Mat3> {
        self.transform.as_ref()
    }

    pub fn check_begin(&self) -> Result<()> {
        if self.active.is_some() {
            return Err(Error::State);
        }
        Ok(())
    }

    /// Enter a frame on `window`, resetting clip and transform.
    ///
    /// Returns the number of stale clip levels to unwind.
    pub fn begin(&mut self, window: Handle) -> u32 {
        let stale = self.clip_depth;
        self.active = Some(window);
        self.clip_depth = 0;
        self.transform = None;
        stale
    }

    pub fn check_end(&self, window: Handle) -> Result<()> {
        if !self.is_active(window) {
            return Err(Error::State);
        }
        Ok(())
    }

    /// Leave the frame; returns the clip levels still to unwind.
    pub fn end(&mut self) -> u32 {
        self.active = None;
        std::mem::take(&mut self.clip_depth)
    }

    pub fn check_push_clip(&self) -> Result<()> {
        if self.clip_depth >= CLIP_STACK_CAPACITY {
            return Err(Error::Overflow);
        }
        Ok(())
    }

    pub fn clip_pushed(&mut self) {
        self.clip_depth += 1;
    }

    pub fn check_pop_clip(&self) -> Result<()> {
        if self.clip_depth == 0 {
            return Err(Error::State);
        }
        Ok(())
    }

    pub fn clip_popped(&mut self) {
        self.clip_depth = self.clip_depth.saturating_sub(1);
    }

    pub fn set_transform(&mut self, transform: Mat3) {
        self.transform = Some(transform);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const W1: Handle = Handle::new(1, 1);
    const W2: Handle = Handle::new(2, 1);

    #[test]
    fn drawing_requires_a_frame() {
        let frame = FrameState::new();
        assert_eq!(frame.active(), Err(Error::State));
        assert!(!frame.is_active(W1));
    }

    #[test]
    fn single_active_frame() {
        let mut frame = FrameState::new();
        frame.check_begin().unwrap();
        assert_eq!(frame.begin(W1), 0);
        assert_eq!(frame.active(), Ok(W1));
        assert_eq!(frame.check_begin(), Err(Error::State));
        assert_eq!(frame.check_end(W2), Err(Error::State));
        frame.check_end(W1).unwrap();
        assert_eq!(frame.end(), 0);
        assert_eq!(frame.active(), Err(Error::State));
    }

    #[test]
    fn clip_stack_is_bounded() {
        let mut frame = FrameState::new();
        frame.begin(W1);
        assert_eq!(frame.check_pop_clip(), Err(Error::State));
        for _ in 0..CLIP_STACK_CAPACITY {
            frame.check_push_clip().unwrap();
            frame.clip_pushed();
        }
        assert_eq!(frame.check_push_clip(), Err(Error::Overflow));
        frame.check_pop_clip().unwrap();
        frame.clip_popped();
        assert_eq!(frame.clip_depth(), CLIP_STACK_CAPACITY - 1);
        assert_eq!(frame.end(), CLIP_STACK_CAPACITY - 1);
        assert_eq!(frame.clip_depth(), 0);
    }

    #[test]
    fn begin_forgets_previous_transform() {
        let mut frame = FrameState::new();
        frame.begin(W1);
        frame.set_transform(Mat3::translate(3.0, 4.0));
        assert_eq!(frame.transform(), Some(&Mat3::translate(3.0, 4.0)));
        frame.end();
        frame.begin(W2);
        assert_eq!(frame.transform(), None);
    }
}
