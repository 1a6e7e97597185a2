use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context as _;

use crate::{
    anim::{AnimationPlan, build_plan},
    camera::{CameraSelector, resolve_cameras},
    core::{DEFAULT_DRIVER_FPS, FrameIndex},
    encode::{VideoEncoder, write_concat_manifest},
    error::{SitelapseError, SitelapseResult},
    handoff::{CanonicalActivity, read_handoff_file},
    scene::SceneHost,
};

#[derive(Clone, Debug)]
pub struct DriverOptions {
    /// Run directory; each camera gets `<out_dir>/<camera>/`.
    pub out_dir: PathBuf,
    /// Playback rate used to convert event-frame gaps into seconds.
    pub fps: u32,
    pub cam_select: CameraSelector,
    pub cam_exclude: Vec<String>,
}

impl DriverOptions {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            fps: DEFAULT_DRIVER_FPS,
            cam_select: CameraSelector::All,
            cam_exclude: Vec::new(),
        }
    }
}

/// What one drive produced.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DriveReport {
    /// Cameras actually rendered, in render order.
    pub cameras: Vec<String>,
    /// Distinct event frames in the timeline.
    pub event_frames: u64,
    /// Total renders across all cameras.
    pub frames_rendered: u64,
}

/// Read a hand-off file and drive the scene from it.
pub fn drive_handoff(
    scene: &mut dyn SceneHost,
    encoder: &mut dyn VideoEncoder,
    handoff: &Path,
    opts: &DriverOptions,
) -> SitelapseResult<DriveReport> {
    let activities = read_handoff_file(handoff)?;
    drive(scene, encoder, &activities, opts)
}

/// Animate and render one canonical activity list.
///
/// Sequential by contract: the host's active camera and frame cursor are
/// scene-global state, so cameras and frames are processed one at a time.
pub fn drive(
    scene: &mut dyn SceneHost,
    encoder: &mut dyn VideoEncoder,
    activities: &[CanonicalActivity],
    opts: &DriverOptions,
) -> SitelapseResult<DriveReport> {
    if opts.fps == 0 {
        return Err(SitelapseError::config("driver fps must be non-zero"));
    }
    if activities.is_empty() {
        return Err(SitelapseError::validation(
            "hand-off contains no activities",
        ));
    }

    let bound = bind_activities(scene, activities)?;

    // Fail selection errors before any scene mutation.
    let cameras = resolve_cameras(&opts.cam_select, &scene.camera_names(), &opts.cam_exclude)?;

    // Default state: nothing has started yet.
    for activity in &bound {
        scene.insert_visibility_key(&activity.activity, FrameIndex(0), false)?;
    }

    let plan = build_plan(&bound);
    apply_plan(scene, &plan)?;

    let mut frames_rendered = 0u64;
    for camera in &cameras {
        render_camera(scene, encoder, camera, &plan.event_frames, opts)?;
        frames_rendered += plan.event_frames.len() as u64;
        tracing::info!(camera = %camera, "encoded camera video");
    }

    Ok(DriveReport {
        cameras,
        event_frames: plan.event_frames.len() as u64,
        frames_rendered,
    })
}

/// Resolve every activity to a scene object, deduplicating exact repeats.
/// Conflicting rows for one object are a modeling inconsistency, and every
/// unresolvable name is reported, not just the first.
fn bind_activities(
    scene: &dyn SceneHost,
    activities: &[CanonicalActivity],
) -> SitelapseResult<Vec<CanonicalActivity>> {
    use std::collections::btree_map::Entry;

    let mut by_name: BTreeMap<&str, &CanonicalActivity> = BTreeMap::new();
    for activity in activities {
        match by_name.entry(activity.activity.as_str()) {
            Entry::Vacant(slot) => {
                slot.insert(activity);
            }
            Entry::Occupied(existing) => {
                if *existing.get() != activity {
                    return Err(SitelapseError::validation(format!(
                        "activity '{}' appears multiple times with conflicting frames or colors",
                        activity.activity
                    )));
                }
            }
        }
    }

    let known = scene.object_names();
    let missing: Vec<&str> = by_name
        .keys()
        .copied()
        .filter(|name| !known.iter().any(|k| k == name))
        .collect();
    if !missing.is_empty() {
        return Err(SitelapseError::binding(format!(
            "objects not found in scene: {}",
            missing.join(", ")
        )));
    }

    Ok(by_name.into_values().cloned().collect())
}

fn apply_plan(scene: &mut dyn SceneHost, plan: &AnimationPlan) -> SitelapseResult<()> {
    for keys in &plan.keys {
        // An animated material must be exclusively owned by its object.
        if scene.material_users(&keys.activity)? > 1 {
            scene.make_material_unique(&keys.activity)?;
        }
        for key in &keys.visibility {
            scene.insert_visibility_key(&keys.activity, key.frame, key.visible)?;
        }
        for key in &keys.color {
            scene.insert_color_key(&keys.activity, key.frame, key.value)?;
        }
    }
    Ok(())
}

fn render_camera(
    scene: &mut dyn SceneHost,
    encoder: &mut dyn VideoEncoder,
    camera: &str,
    event_frames: &[FrameIndex],
    opts: &DriverOptions,
) -> SitelapseResult<()> {
    scene.set_active_camera(camera)?;

    let cam_dir = opts.out_dir.join(camera);
    let frames_dir = cam_dir.join("frames");
    fs::create_dir_all(&frames_dir)
        .with_context(|| format!("failed to create frames directory '{}'", frames_dir.display()))?;

    let mut rendered = Vec::with_capacity(event_frames.len());
    for &frame in event_frames {
        scene.set_frame(frame)?;
        let path = frames_dir.join(format!("frame_{:04}.png", frame.0));
        scene.render_current_frame(&path)?;
        tracing::debug!(camera, frame = frame.0, "rendered event frame");
        rendered.push((frame, path));
    }

    let manifest = cam_dir.join("frames.txt");
    write_concat_manifest(&manifest, &rendered, opts.fps)?;
    encoder.encode(&manifest, &cam_dir.join("output.mp4"))?;

    // Success-path cleanup only; a failed camera keeps its intermediates.
    fs::remove_dir_all(&frames_dir)
        .with_context(|| format!("failed to remove frames directory '{}'", frames_dir.display()))?;
    fs::remove_file(&manifest)
        .with_context(|| format!("failed to remove concat manifest '{}'", manifest.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Rgb;
    use crate::encode::RecordingEncoder;
    use crate::scene::RecordingScene;

    fn activity(name: &str, start: u64, end: u64) -> CanonicalActivity {
        CanonicalActivity {
            activity: name.to_string(),
            start_frame: FrameIndex(start),
            end_frame: FrameIndex(end),
            color: Rgb::new(0.1, 0.2, 0.3),
        }
    }

    fn opts(dir: &Path) -> DriverOptions {
        DriverOptions {
            fps: 1,
            ..DriverOptions::new(dir)
        }
    }

    #[test]
    fn missing_objects_are_all_reported() {
        let mut scene = RecordingScene::new(["Wall"], ["Camera"]);
        let mut encoder = RecordingEncoder::new();
        let dir = tempfile::tempdir().unwrap();
        let err = drive(
            &mut scene,
            &mut encoder,
            &[
                activity("Wall", 0, 1),
                activity("Ghost", 1, 2),
                activity("Phantom", 2, 3),
            ],
            &opts(dir.path()),
        )
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Ghost") && msg.contains("Phantom"));
        assert!(!msg.contains("Wall,"));
    }

    #[test]
    fn identical_duplicate_rows_collapse() {
        let mut scene = RecordingScene::new(["Wall"], ["Camera"]);
        let mut encoder = RecordingEncoder::new();
        let dir = tempfile::tempdir().unwrap();
        let report = drive(
            &mut scene,
            &mut encoder,
            &[activity("Wall", 0, 2), activity("Wall", 0, 2)],
            &opts(dir.path()),
        )
        .unwrap();
        assert_eq!(report.event_frames, 2);
        // One hidden key plus one show key, not two of each.
        let vis_keys = scene
            .calls()
            .iter()
            .filter(|c| matches!(c, crate::scene::SceneCall::VisibilityKey { .. }))
            .count();
        assert_eq!(vis_keys, 2);
    }

    #[test]
    fn conflicting_duplicate_rows_are_rejected() {
        let mut scene = RecordingScene::new(["Wall"], ["Camera"]);
        let mut encoder = RecordingEncoder::new();
        let dir = tempfile::tempdir().unwrap();
        let err = drive(
            &mut scene,
            &mut encoder,
            &[activity("Wall", 0, 2), activity("Wall", 0, 5)],
            &opts(dir.path()),
        )
        .unwrap_err();
        assert!(err.to_string().contains("'Wall'"));
    }

    #[test]
    fn empty_handoff_is_rejected() {
        let mut scene = RecordingScene::new(["Wall"], ["Camera"]);
        let mut encoder = RecordingEncoder::new();
        let dir = tempfile::tempdir().unwrap();
        assert!(drive(&mut scene, &mut encoder, &[], &opts(dir.path())).is_err());
    }

    #[test]
    fn zero_fps_is_rejected() {
        let mut scene = RecordingScene::new(["Wall"], ["Camera"]);
        let mut encoder = RecordingEncoder::new();
        let dir = tempfile::tempdir().unwrap();
        let mut o = opts(dir.path());
        o.fps = 0;
        assert!(matches!(
            drive(&mut scene, &mut encoder, &[activity("Wall", 0, 1)], &o),
            Err(SitelapseError::Config(_))
        ));
    }

    #[test]
    fn camera_errors_fail_before_scene_mutation() {
        let mut scene = RecordingScene::new(["Wall"], ["Camera"]);
        let mut encoder = RecordingEncoder::new();
        let dir = tempfile::tempdir().unwrap();
        let mut o = opts(dir.path());
        o.cam_select = CameraSelector::Named(vec!["Drone".to_string()]);
        let err = drive(
            &mut scene,
            &mut encoder,
            &[activity("Wall", 0, 1)],
            &o,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Drone"));
        assert!(scene.calls().is_empty());
    }
}
