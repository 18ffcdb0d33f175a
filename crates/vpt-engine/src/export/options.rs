use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Container an animation is written to.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum OutputKind {
    /// One `frameNNNN.png` per timestep in a directory.
    Images,
    /// One animated GIF file.
    Video,
}

impl OutputKind {
    pub fn parse(tag: &str) -> Result<Self> {
        match tag {
            "images" => Ok(Self::Images),
            "video" => Ok(Self::Video),
            other => Err(Error::UnsupportedExportType(other.to_string())),
        }
    }
}

/// Animation export request, as read from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationOptions {
    #[serde(rename = "type")]
    pub output: String,
    pub start_time: f64,
    pub end_time: f64,
    /// Seconds each frame is left to converge before it is captured.
    pub frame_time: f64,
    pub fps: f64,
}

impl Default for AnimationOptions {
    fn default() -> Self {
        Self {
            output: "images".to_string(),
            start_time: 0.0,
            end_time: 1.0,
            frame_time: 0.1,
            fps: 10.0,
        }
    }
}

impl AnimationOptions {
    /// Checks the output type first, then the timing values.
    pub fn validate(&self) -> Result<OutputKind> {
        let kind = OutputKind::parse(&self.output)?;
        if !(self.fps.is_finite() && self.fps > 0.0) {
            return Err(Error::InvalidAnimation(format!("fps must be positive, got {}", self.fps)));
        }
        if !(self.start_time.is_finite() && self.end_time.is_finite()) || self.end_time < self.start_time {
            return Err(Error::InvalidAnimation(format!(
                "time range {}..{} is empty",
                self.start_time, self.end_time
            )));
        }
        if self.frame_time.is_nan() || self.frame_time < 0.0 {
            return Err(Error::InvalidAnimation(format!(
                "frame time must not be negative, got {}",
                self.frame_time
            )));
        }
        Ok(kind)
    }

    /// Number of captured frames; at least one.
    pub fn frame_count(&self) -> u32 {
        (((self.end_time - self.start_time) * self.fps).ceil() as u32).max(1)
    }

    /// Animation time of frame `index`.
    pub fn time_at(&self, index: u32) -> f32 {
        (self.start_time + f64::from(index) / self.fps) as f32
    }

    pub fn frame_delay_ms(&self) -> u32 {
        (1000.0 / self.fps).round() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(start: f64, end: f64, fps: f64) -> AnimationOptions {
        AnimationOptions {
            start_time: start,
            end_time: end,
            fps,
            ..AnimationOptions::default()
        }
    }

    #[test]
    fn parses_camel_case_json() {
        let json = r#"{ "type": "video", "startTime": 1, "endTime": 3, "frameTime": 0.5, "fps": 24 }"#;
        let o: AnimationOptions = serde_json::from_str(json).unwrap();
        assert_eq!(o.validate().unwrap(), OutputKind::Video);
        assert_eq!(o.frame_count(), 48);
        assert_eq!(o.time_at(24), 2.0);
    }

    #[test]
    fn frame_count_rounds_up_and_is_never_zero() {
        assert_eq!(options(0.0, 1.0, 10.0).frame_count(), 10);
        assert_eq!(options(0.0, 1.05, 10.0).frame_count(), 11);
        assert_eq!(options(2.0, 2.0, 30.0).frame_count(), 1);
    }

    #[test]
    fn frame_count_matches_double_precision_rounding() {
        // 0.7 * 10 is 7.000000000000001 in f64, so an eighth frame is captured.
        assert_eq!(options(0.0, 0.7, 10.0).frame_count(), 8);
        let json = r#"{ "type": "images", "startTime": 0, "endTime": 0.7, "frameTime": 0, "fps": 10 }"#;
        let o: AnimationOptions = serde_json::from_str(json).unwrap();
        assert_eq!(o.frame_count(), 8);
    }

    #[test]
    fn unsupported_type_is_reported_before_timing() {
        let o = AnimationOptions {
            output: "bogus".to_string(),
            fps: 0.0,
            ..AnimationOptions::default()
        };
        let err = o.validate().unwrap_err();
        assert_eq!(err.to_string(), "animation output type (bogus) not supported");
    }

    #[test]
    fn invalid_timing_is_rejected() {
        assert!(matches!(options(0.0, 1.0, 0.0).validate(), Err(Error::InvalidAnimation(_))));
        assert!(matches!(options(2.0, 1.0, 10.0).validate(), Err(Error::InvalidAnimation(_))));
    }
}
