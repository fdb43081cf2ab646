//! Pointer smoothing for cursor control.

use crate::history::HistoryBuffer;
use crate::landmarks::Landmark;

#[derive(Debug, Clone)]
pub struct CursorSmoother {
    xs: HistoryBuffer,
    ys: HistoryBuffer,
    width: u32,
    height: u32,
    sensitivity: f32,
}

impl CursorSmoother {
    pub fn new(smoothing_len: usize, width: u32, height: u32, sensitivity: f32) -> Self {
        Self {
            xs: HistoryBuffer::new(smoothing_len),
            ys: HistoryBuffer::new(smoothing_len),
            width,
            height,
            sensitivity,
        }
    }

    /// Map a fingertip to screen pixels and return the smoothed position.
    /// X is mirrored so moving the hand right moves the cursor right.
    pub fn push(&mut self, tip: Landmark) -> (f32, f32) {
        let x = self.to_screen(1.0 - tip.x, self.width);
        let y = self.to_screen(tip.y, self.height);
        self.xs.push(x);
        self.ys.push(y);
        // both buffers were just written
        (self.xs.mean().unwrap_or(x), self.ys.mean().unwrap_or(y))
    }

    fn to_screen(&self, norm: f32, dim: u32) -> f32 {
        let gained = (norm - 0.5) * self.sensitivity + 0.5;
        let max = dim.saturating_sub(1) as f32;
        (gained * dim as f32).clamp(0.0, max)
    }

    pub fn samples(&self) -> usize {
        self.xs.len()
    }
}
