use std::collections::BTreeSet;

use crate::{
    core::{FrameIndex, NEUTRAL_COLOR, Rgb},
    handoff::CanonicalActivity,
};

/// A color keyframe on an object's material.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct ColorKey {
    pub frame: FrameIndex,
    pub value: Rgb,
}

/// A visibility keyframe on an object.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct VisibilityKey {
    pub frame: FrameIndex,
    pub visible: bool,
}

/// One activity's authored keyframes, in insertion order. Hosts overwrite
/// earlier keys at the same frame, so the order is part of the contract.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct ActivityKeys {
    pub activity: String,
    pub color: Vec<ColorKey>,
    pub visibility: Vec<VisibilityKey>,
}

/// The full derived animation for one hand-off: per-activity keyframes plus
/// the sorted set of distinct event frames. Keyframe count is proportional
/// to activity count, not timeline length.
#[derive(Clone, Debug, serde::Serialize)]
pub struct AnimationPlan {
    pub keys: Vec<ActivityKeys>,
    pub event_frames: Vec<FrameIndex>,
}

/// Derive the keyframe schedule for a single activity.
///
/// State machine per object: hidden at 0 (authored by the driver, not here),
/// optional neutral hold at start-1, visible + colored at start, color hold
/// at end-1, neutral at end. Nothing turns visibility off again: completed
/// objects stay visible.
pub fn activity_keys(activity: &CanonicalActivity) -> ActivityKeys {
    let start = activity.start_frame;
    let end = activity.end_frame;

    let mut color = Vec::with_capacity(4);
    // Skip the pre-start hold inside the initial hidden keyframe window.
    if start.0 > 2 {
        color.push(ColorKey {
            frame: FrameIndex(start.0 - 1),
            value: NEUTRAL_COLOR,
        });
    }
    color.push(ColorKey {
        frame: start,
        value: activity.color,
    });
    // Hold just before the end transition; for zero-duration activities this
    // would land before the start key, so it is skipped.
    if end > start {
        color.push(ColorKey {
            frame: FrameIndex(end.0 - 1),
            value: activity.color,
        });
    }
    color.push(ColorKey {
        frame: end,
        value: NEUTRAL_COLOR,
    });

    let visibility = vec![VisibilityKey {
        frame: start,
        visible: true,
    }];

    ActivityKeys {
        activity: activity.activity.clone(),
        color,
        visibility,
    }
}

/// The sorted, deduplicated union of every activity's start and end frame.
/// These are the only frames worth rendering, and the segment boundaries of
/// the output video.
pub fn event_frames(activities: &[CanonicalActivity]) -> Vec<FrameIndex> {
    let set: BTreeSet<FrameIndex> = activities
        .iter()
        .flat_map(|a| [a.start_frame, a.end_frame])
        .collect();
    set.into_iter().collect()
}

pub fn build_plan(activities: &[CanonicalActivity]) -> AnimationPlan {
    AnimationPlan {
        keys: activities.iter().map(activity_keys).collect(),
        event_frames: event_frames(activities),
    }
}
