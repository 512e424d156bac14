//! Decoded frames, crops and the frame source seam.

use std::convert::Infallible;
use std::sync::Arc;

use crate::tracker::Rect;

/// One decoded frame, row-major and interleaved (`height * width * channels` bytes).
#[derive(Debug, Clone)]
pub struct Frame {
    /// Position of the frame in its stream
    pub index: u64,
    pub width: u32,
    pub height: u32,
    pub channels: u32,
    data: Arc<[u8]>,
}

impl Frame {
    /// Wrap decoded pixels. Returns `None` when the buffer length does not match
    /// the given geometry.
    pub fn new(index: u64, width: u32, height: u32, channels: u32, data: Vec<u8>) -> Option<Self> {
        let expected = width as usize * height as usize * channels as usize;
        (data.len() == expected).then(|| Self {
            index,
            width,
            height,
            channels,
            data: data.into(),
        })
    }

    /// A black three-channel frame.
    pub fn blank(index: u64, width: u32, height: u32) -> Self {
        let data = vec![0u8; width as usize * height as usize * 3];
        Self {
            index,
            width,
            height,
            channels: 3,
            data: data.into(),
        }
    }

    /// Share the pixel buffer of `self` under a new index.
    pub(crate) fn with_index(&self, index: u64) -> Self {
        Self {
            index,
            ..self.clone()
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Cut `rect` out of the frame.
    ///
    /// Coordinates are truncated to whole pixels and clipped to the frame.
    /// Returns `None` when nothing of the region is left.
    pub fn crop(&self, rect: &Rect) -> Option<FrameCrop<'_>> {
        if !rect.is_finite() {
            return None;
        }
        let [x1, y1, x2, y2] = rect.to_tlbr();
        // Saturating float-to-int casts take care of out-of-range values.
        let x1 = (x1 as i64).clamp(0, self.width as i64) as u32;
        let y1 = (y1 as i64).clamp(0, self.height as i64) as u32;
        let x2 = (x2 as i64).clamp(0, self.width as i64) as u32;
        let y2 = (y2 as i64).clamp(0, self.height as i64) as u32;

        (x2 > x1 && y2 > y1).then_some(FrameCrop {
            frame: self,
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
        })
    }
}

/// A non-empty rectangular view into a [`Frame`].
#[derive(Debug, Clone, Copy)]
pub struct FrameCrop<'a> {
    frame: &'a Frame,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl<'a> FrameCrop<'a> {
    pub fn frame(&self) -> &'a Frame {
        self.frame
    }

    /// Pixel rows of the region, each `width * channels` bytes long.
    pub fn rows(&self) -> impl Iterator<Item = &'a [u8]> + '_ {
        let stride = self.frame.width as usize * self.frame.channels as usize;
        let start = self.x as usize * self.frame.channels as usize;
        let len = self.width as usize * self.frame.channels as usize;
        let data = self.frame.data();
        (self.y..self.y + self.height).map(move |row| {
            let offset = row as usize * stride + start;
            &data[offset..offset + len]
        })
    }

    /// Copy the region into a contiguous buffer.
    pub fn to_vec(&self) -> Vec<u8> {
        self.rows().flatten().copied().collect()
    }
}

/// Ordered, finite, non-restartable supply of frames.
pub trait FrameSource {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Next frame, or `Ok(None)` once the stream is exhausted.
    fn next_frame(&mut self) -> Result<Option<Frame>, Self::Error>;
}

/// Adapts any frame iterator into an infallible [`FrameSource`].
#[derive(Debug)]
pub struct IterSource<I>(pub I);

impl<I: Iterator<Item = Frame>> FrameSource for IterSource<I> {
    type Error = Infallible;

    fn next_frame(&mut self) -> Result<Option<Frame>, Self::Error> {
        Ok(self.0.next())
    }
}
