//! Sitelapse turns a project schedule into a timed 4D build animation.
//!
//! Two components, connected by a hand-off file:
//!
//! - The **schedule compiler** ([`compile`]) normalizes raw CSV rows into a
//!   canonical frame-indexed, colored activity list and hands it to the
//!   rendering host.
//! - The **animation driver** ([`driver`]) binds activities to scene
//!   objects, authors visibility/color keyframes, renders exactly the event
//!   frames, and encodes one variable-frame-rate video per camera.
//!
//! The rendering host and the video encoder stay external: the driver talks
//! to them through [`scene::SceneHost`] and [`encode::VideoEncoder`], with
//! recording fakes for tests.
#![forbid(unsafe_code)]

pub mod anim;
pub mod camera;
pub mod color;
pub mod compile;
pub mod core;
pub mod driver;
pub mod encode;
pub mod error;
pub mod handoff;
pub mod scene;
pub mod schedule;

pub use anim::{ActivityKeys, AnimationPlan, build_plan, event_frames};
pub use camera::{CameraSelector, resolve_cameras};
pub use compile::{CompileReport, CompilerConfig, HostCommand, VisualMode, run_compiler};
pub use core::{DEFAULT_DRIVER_FPS, FRAMES_PER_UNIT, FrameIndex, Rgb};
pub use driver::{DriveReport, DriverOptions, drive, drive_handoff};
pub use encode::{FfmpegEncoder, RecordingEncoder, VideoEncoder};
pub use error::{SitelapseError, SitelapseResult};
pub use handoff::{CanonicalActivity, read_handoff_file, write_handoff_file};
pub use scene::{RecordingScene, SceneCall, SceneHost};
pub use schedule::ScheduleRecord;
