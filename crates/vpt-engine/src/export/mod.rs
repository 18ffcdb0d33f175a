//! Animation export: options, frame sinks and the capture state machine.
//!
//! The rendering context drives a [`Recorder`]; see
//! [`RenderingContext::record_animation`](crate::context::RenderingContext::record_animation).

mod name;
mod options;
mod recorder;
mod sink;

pub use name::suggested_export_name;
pub use options::{AnimationOptions, OutputKind};
pub use recorder::{Recorder, RecorderState};
pub use sink::{open_sink, FrameSink, GifSink, ImageSequenceSink};
