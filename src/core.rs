use crate::error::{SitelapseError, SitelapseResult};

/// Discrete position on the rendered timeline. One frame is one schedule
/// time unit; frame 0 is the run's earliest activity start.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(transparent)]
pub struct FrameIndex(pub u64);

/// Output frames per schedule time unit. Fixed by design, not configurable.
pub const FRAMES_PER_UNIT: f64 = 1.0;

/// Playback frame rate used to convert event-frame gaps into segment
/// durations. Matches the rendering host's scene fps.
pub const DEFAULT_DRIVER_FPS: u32 = 10;

/// Color held by an object before its activity starts and after it ends.
pub const NEUTRAL_COLOR: Rgb = Rgb {
    r: 0.7,
    g: 0.7,
    b: 0.7,
};

/// Consumer-side default when a hand-off file omits color columns.
pub const FALLBACK_COLOR: Rgb = Rgb {
    r: 1.0,
    g: 0.0,
    b: 0.0,
};

/// Linear RGB color, channels in [0,1].
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    pub fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    pub fn validate(self) -> SitelapseResult<()> {
        for c in [self.r, self.g, self.b] {
            if !(0.0..=1.0).contains(&c) {
                return Err(SitelapseError::validation(format!(
                    "color channel {c} out of range [0,1]"
                )));
            }
        }
        Ok(())
    }
}
