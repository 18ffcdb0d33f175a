//! Frame timing and the render-loop scheduler.
//!
//! - one `FrameClock` per render loop; `tick()` once per presented frame
//! - `Ticker` fans each tick out to its subscriptions

mod frame_clock;
mod ticker;

pub use frame_clock::{FrameClock, FrameTime};
pub use ticker::{Ticker, TickerHandle};
