use std::path::Path;

use image::RgbaImage;

use crate::error::{Error, Result};

use super::{open_sink, AnimationOptions, FrameSink};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RecorderState {
    Idle,
    /// `frame` frames of `frames` have been written.
    Capturing { frame: u32, frames: u32 },
    /// Every frame is written; the sink still needs closing.
    Finalizing,
}

/// Frame-by-frame animation capture.
///
/// `begin` opens the sink, `capture` is called once per timestep with the
/// settled image, `finish` closes the sink. Dropping a recorder mid-capture
/// leaves whatever was written so far.
pub struct Recorder {
    options: AnimationOptions,
    sink: Option<Box<dyn FrameSink>>,
    state: RecorderState,
}

impl Recorder {
    pub fn new(options: AnimationOptions) -> Self {
        Self {
            options,
            sink: None,
            state: RecorderState::Idle,
        }
    }

    pub fn options(&self) -> &AnimationOptions {
        &self.options
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn begin(&mut self, destination: &Path) -> Result<()> {
        if self.state != RecorderState::Idle {
            return Err(Error::InvalidAnimation("recording already in progress".to_string()));
        }
        self.begin_with(open_sink(&self.options, destination)?);
        log::info!(
            "recording {} frames to {}",
            self.options.frame_count(),
            destination.display()
        );
        Ok(())
    }

    /// Starts capturing into an already opened sink.
    pub fn begin_with(&mut self, sink: Box<dyn FrameSink>) {
        self.sink = Some(sink);
        self.state = RecorderState::Capturing {
            frame: 0,
            frames: self.options.frame_count(),
        };
    }

    /// Index and animation time of the next frame to capture.
    pub fn next_frame(&self) -> Option<(u32, f32)> {
        match self.state {
            RecorderState::Capturing { frame, .. } => Some((frame, self.options.time_at(frame))),
            _ => None,
        }
    }

    /// Writes the next frame and returns the capture progress in `(0, 1]`.
    pub fn capture(&mut self, image: RgbaImage) -> Result<f32> {
        let (RecorderState::Capturing { frame, frames }, Some(sink)) = (self.state, self.sink.as_mut()) else {
            return Err(Error::InvalidAnimation("recorder is not capturing".to_string()));
        };
        sink.write_frame(frame, image)?;

        let written = frame + 1;
        self.state = if written == frames {
            RecorderState::Finalizing
        } else {
            RecorderState::Capturing {
                frame: written,
                frames,
            }
        };
        Ok(written as f32 / frames as f32)
    }

    pub fn finish(&mut self) -> Result<()> {
        if self.state != RecorderState::Finalizing {
            return Err(Error::InvalidAnimation("recording is not complete".to_string()));
        }
        self.state = RecorderState::Idle;
        match self.sink.take() {
            Some(sink) => sink.finish(),
            None => Ok(()),
        }
    }

    /// Drops the sink without closing it properly.
    pub fn abort(&mut self) {
        if self.sink.take().is_some() {
            log::warn!("recording aborted");
        }
        self.state = RecorderState::Idle;
    }
}
