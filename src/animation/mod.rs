//! Frame sequences and index-based frame alignment.
//!
//! A [`FrameSequence`] yields decoded frames lazily. [`align`] walks two
//! sequences in lockstep, handing each index-aligned pair to a visitor, then
//! drains whichever sequence is longer so both frame counts and frame rates
//! are known. At most one frame pair is alive at a time.

pub mod metrics;

use crate::container::{LoopCount, fps_from_durations};
use crate::decode::PixelBuffer;
use crate::error::Result;

pub use metrics::{AnimationOutcome, FrameStats, compare_sequences};

/// One decoded animation frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Full-canvas pixels of the composited frame.
    pub pixels: PixelBuffer,
    /// Display duration in milliseconds.
    pub duration_ms: f64,
}

type FrameIter = Box<dyn Iterator<Item = Result<Frame>>>;

/// Lazily decoded, ordered animation frames.
pub struct FrameSequence {
    frames: FrameIter,
    loop_count: Option<LoopCount>,
}

impl FrameSequence {
    /// Wrap a frame iterator.
    pub fn new(frames: impl Iterator<Item = Result<Frame>> + 'static, loop_count: Option<LoopCount>) -> Self {
        Self {
            frames: Box::new(frames),
            loop_count,
        }
    }

    /// Sequence over frames that are already decoded.
    pub fn from_frames(frames: Vec<Frame>, loop_count: Option<LoopCount>) -> Self {
        Self::new(frames.into_iter().map(Ok), loop_count)
    }

    /// A static image seen as a one-frame sequence.
    pub fn single(pixels: PixelBuffer) -> Self {
        Self::from_frames(vec![Frame { pixels, duration_ms: 0.0 }], None)
    }

    /// Declared loop behavior of the source container.
    #[must_use]
    pub fn loop_count(&self) -> Option<LoopCount> {
        self.loop_count
    }
}

impl Iterator for FrameSequence {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        self.frames.next()
    }
}

impl std::fmt::Debug for FrameSequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameSequence")
            .field("loop_count", &self.loop_count)
            .finish_non_exhaustive()
    }
}

/// Frame count, frame rate and loop behavior of a fully walked sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SequenceInfo {
    /// Number of frames decoded.
    pub frame_count: u32,
    /// `1000 / mean(duration_ms)`, absent when durations are zero or missing.
    pub fps: Option<f64>,
    /// Loop count declared by the container.
    pub loop_count: Option<LoopCount>,
}

#[derive(Default)]
struct Tally {
    count: u32,
    durations: Vec<f64>,
}

impl Tally {
    fn push(&mut self, frame: &Frame) {
        self.count += 1;
        self.durations.push(frame.duration_ms);
    }

    fn finish(self, loop_count: Option<LoopCount>) -> SequenceInfo {
        SequenceInfo {
            frame_count: self.count,
            fps: fps_from_durations(&self.durations),
            loop_count,
        }
    }
}

/// Pair frame `i` of `a` with frame `i` of `b` for every index both share.
///
/// `visit` receives `(index, frame_a, frame_b)`. The remaining frames of the
/// longer sequence are decoded and counted but not compared. A frame that
/// fails to decode aborts the walk with that error.
pub fn align<F>(mut a: FrameSequence, mut b: FrameSequence, mut visit: F) -> Result<(SequenceInfo, SequenceInfo)>
where
    F: FnMut(usize, &Frame, &Frame),
{
    let (loop_a, loop_b) = (a.loop_count(), b.loop_count());
    let mut tally_a = Tally::default();
    let mut tally_b = Tally::default();
    let mut index = 0;

    loop {
        match (a.next().transpose()?, b.next().transpose()?) {
            (Some(fa), Some(fb)) => {
                tally_a.push(&fa);
                tally_b.push(&fb);
                visit(index, &fa, &fb);
                index += 1;
            }
            (Some(fa), None) => {
                tally_a.push(&fa);
                drain(&mut a, &mut tally_a)?;
                break;
            }
            (None, Some(fb)) => {
                tally_b.push(&fb);
                drain(&mut b, &mut tally_b)?;
                break;
            }
            (None, None) => break,
        }
    }

    Ok((tally_a.finish(loop_a), tally_b.finish(loop_b)))
}

fn drain(seq: &mut FrameSequence, tally: &mut Tally) -> Result<()> {
    for frame in seq {
        tally.push(&frame?);
    }
    Ok(())
}
