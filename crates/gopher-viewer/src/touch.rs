//! Latest touch position, shared between the input path and the frame loop.

use std::sync::atomic::{AtomicU32, Ordering};

/// One (x, y) sample in surface pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TouchSample {
    pub x: f32,
    pub y: f32,
}

impl TouchSample {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Last-write-wins touch cell.
///
/// x and y are stored independently, so a reader racing a writer may see the
/// new x with the old y. That shows up as one frame of jitter at most and is
/// accepted; no history is kept.
#[derive(Debug, Default)]
pub struct TouchState {
    x: AtomicU32,
    y: AtomicU32,
}

impl TouchState {
    pub fn new(initial: TouchSample) -> Self {
        Self {
            x: AtomicU32::new(initial.x.to_bits()),
            y: AtomicU32::new(initial.y.to_bits()),
        }
    }

    pub fn set(&self, sample: TouchSample) {
        self.x.store(sample.x.to_bits(), Ordering::Relaxed);
        self.y.store(sample.y.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> TouchSample {
        TouchSample {
            x: f32::from_bits(self.x.load(Ordering::Relaxed)),
            y: f32::from_bits(self.y.load(Ordering::Relaxed)),
        }
    }
}
