use std::path::Path;

use sitelapse::{
    CameraSelector, CanonicalActivity, DriverOptions, FrameIndex, RecordingEncoder,
    RecordingScene, Rgb, SceneCall, drive, drive_handoff, write_handoff_file,
};

fn activity(name: &str, start: u64, end: u64) -> CanonicalActivity {
    CanonicalActivity {
        activity: name.to_string(),
        start_frame: FrameIndex(start),
        end_frame: FrameIndex(end),
        color: Rgb::new(0.2, 0.4, 0.6),
    }
}

fn opts(dir: &Path, fps: u32) -> DriverOptions {
    DriverOptions {
        fps,
        ..DriverOptions::new(dir)
    }
}

#[test]
fn two_activity_single_camera_scenario() {
    let mut scene = RecordingScene::new(["A", "B"], ["Main"]);
    let mut encoder = RecordingEncoder::new();
    let out = tempfile::tempdir().unwrap();

    let activities = [activity("A", 0, 3), activity("B", 5, 7)];
    let report = drive(&mut scene, &mut encoder, &activities, &opts(out.path(), 1)).unwrap();

    assert_eq!(report.cameras, vec!["Main".to_string()]);
    assert_eq!(report.event_frames, 4);
    assert_eq!(report.frames_rendered, 4);

    // Both objects start keyframed hidden at frame 0.
    for object in ["A", "B"] {
        assert!(scene.calls().contains(&SceneCall::VisibilityKey {
            object: object.to_string(),
            frame: FrameIndex(0),
            visible: false,
        }));
    }

    // Exactly the event frames get rendered, in order.
    let rendered: Vec<u64> = scene
        .calls()
        .iter()
        .filter_map(|c| match c {
            SceneCall::FrameSet { frame } => Some(frame.0),
            _ => None,
        })
        .collect();
    assert_eq!(rendered, vec![0, 3, 5, 7]);

    // One encode per camera; the captured manifest has three segment
    // durations and repeats the final frame.
    assert_eq!(encoder.jobs.len(), 1);
    let manifest = &encoder.jobs[0].manifest_text;
    let durations: Vec<&str> = manifest
        .lines()
        .filter(|l| l.starts_with("duration "))
        .collect();
    assert_eq!(durations, vec!["duration 3", "duration 2", "duration 2"]);
    assert_eq!(
        manifest
            .lines()
            .filter(|l| l.ends_with("frame_0007.png'"))
            .count(),
        2
    );

    // Success-path cleanup: intermediates gone, camera dir remains.
    let cam_dir = out.path().join("Main");
    assert!(cam_dir.is_dir());
    assert!(!cam_dir.join("frames").exists());
    assert!(!cam_dir.join("frames.txt").exists());
    assert_eq!(encoder.jobs[0].out_path, cam_dir.join("output.mp4"));
}

#[test]
fn cameras_render_sequentially_sorted_by_name() {
    let mut scene = RecordingScene::new(["A"], ["North", "Aerial"]);
    let mut encoder = RecordingEncoder::new();
    let out = tempfile::tempdir().unwrap();

    let report = drive(
        &mut scene,
        &mut encoder,
        &[activity("A", 0, 2)],
        &opts(out.path(), 1),
    )
    .unwrap();

    assert_eq!(
        report.cameras,
        vec!["Aerial".to_string(), "North".to_string()]
    );
    assert_eq!(report.frames_rendered, 4);

    let activated: Vec<&str> = scene
        .calls()
        .iter()
        .filter_map(|c| match c {
            SceneCall::CameraActivated { camera } => Some(camera.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(activated, vec!["Aerial", "North"]);
    assert_eq!(encoder.jobs.len(), 2);
}

#[test]
fn camera_exclusion_applies_to_selection() {
    let mut scene = RecordingScene::new(["A"], ["North", "Aerial", "Gate"]);
    let mut encoder = RecordingEncoder::new();
    let out = tempfile::tempdir().unwrap();

    let mut options = opts(out.path(), 1);
    options.cam_select = CameraSelector::FirstN(2);
    options.cam_exclude = vec!["Aerial".to_string()];

    let report = drive(&mut scene, &mut encoder, &[activity("A", 0, 2)], &options).unwrap();
    assert_eq!(report.cameras, vec!["Gate".to_string()]);
}

#[test]
fn shared_materials_are_cloned_before_coloring() {
    let mut scene = RecordingScene::new(["A", "B", "C"], ["Main"]);
    scene.share_material(&["A", "B"]);
    let mut encoder = RecordingEncoder::new();
    let out = tempfile::tempdir().unwrap();

    drive(
        &mut scene,
        &mut encoder,
        &[
            activity("A", 0, 2),
            activity("B", 2, 4),
            activity("C", 4, 6),
        ],
        &opts(out.path(), 1),
    )
    .unwrap();

    // A is processed first and splits off its copy; B then owns the
    // original alone, and C was never shared.
    let cloned: Vec<&str> = scene
        .calls()
        .iter()
        .filter_map(|c| match c {
            SceneCall::MaterialCloned { object } => Some(object.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(cloned, vec!["A"]);

    // The clone happens before A's first color key.
    let clone_pos = scene
        .calls()
        .iter()
        .position(|c| matches!(c, SceneCall::MaterialCloned { .. }))
        .unwrap();
    let first_color_pos = scene
        .calls()
        .iter()
        .position(|c| matches!(c, SceneCall::ColorKey { object, .. } if object == "A"))
        .unwrap();
    assert!(clone_pos < first_color_pos);
}

#[test]
fn drive_handoff_reads_the_wire_format() {
    let dir = tempfile::tempdir().unwrap();
    let handoff = dir.path().join("handoff.csv");
    write_handoff_file(&handoff, &[activity("A", 0, 3), activity("B", 5, 7)]).unwrap();

    let mut scene = RecordingScene::new(["A", "B"], ["Main"]);
    let mut encoder = RecordingEncoder::new();
    let out = tempfile::tempdir().unwrap();

    let report = drive_handoff(
        &mut scene,
        &mut encoder,
        &handoff,
        &opts(out.path(), 1),
    )
    .unwrap();
    assert_eq!(report.event_frames, 4);
}
