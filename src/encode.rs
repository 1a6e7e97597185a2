use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use crate::{
    core::FrameIndex,
    error::{SitelapseError, SitelapseResult},
};

/// Seconds of display time for each segment between consecutive event
/// frames. The final frame has no trailing segment.
pub fn segment_durations(frames: &[FrameIndex], fps: u32) -> SitelapseResult<Vec<f64>> {
    if fps == 0 {
        return Err(SitelapseError::config("fps must be non-zero"));
    }
    Ok(frames
        .windows(2)
        .map(|w| (w[1].0 - w[0].0) as f64 / f64::from(fps))
        .collect())
}

/// Write the encoder's concat manifest: alternating `file`/`duration` lines,
/// with the final frame repeated once more without a duration so it gets
/// nonzero display time (concat demuxer requirement).
pub fn write_concat_manifest(
    manifest_path: &Path,
    frames: &[(FrameIndex, PathBuf)],
    fps: u32,
) -> SitelapseResult<()> {
    if frames.is_empty() {
        return Err(SitelapseError::validation(
            "concat manifest requires at least one frame",
        ));
    }
    let indices: Vec<FrameIndex> = frames.iter().map(|(f, _)| *f).collect();
    let durations = segment_durations(&indices, fps)?;

    let file = File::create(manifest_path).map_err(|e| {
        SitelapseError::config(format!(
            "failed to create concat manifest '{}': {e}",
            manifest_path.display()
        ))
    })?;
    let mut out = BufWriter::new(file);

    fn write_file_line<W: Write>(out: &mut W, path: &Path) -> SitelapseResult<()> {
        let abs = std::path::absolute(path).map_err(|e| {
            SitelapseError::config(format!(
                "failed to absolutize frame path '{}': {e}",
                path.display()
            ))
        })?;
        writeln!(out, "file '{}'", abs.display())
            .map_err(|e| SitelapseError::serde(format!("failed to write concat manifest: {e}")))
    }

    for ((_, path), duration) in frames.iter().zip(&durations) {
        write_file_line(&mut out, path)?;
        writeln!(out, "duration {duration}")
            .map_err(|e| SitelapseError::serde(format!("failed to write concat manifest: {e}")))?;
    }
    let (_, last) = &frames[frames.len() - 1];
    write_file_line(&mut out, last)?;

    out.flush()
        .map_err(|e| SitelapseError::serde(format!("failed to flush concat manifest: {e}")))?;
    Ok(())
}

/// Turns a concat manifest into one video file. The production
/// implementation shells out to `ffmpeg`; tests use [`RecordingEncoder`].
pub trait VideoEncoder {
    fn encode(&mut self, manifest: &Path, out_path: &Path) -> SitelapseResult<()>;
}

pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Encoder backed by the system `ffmpeg` binary, producing yuv420p MP4 with
/// variable frame rate so segment durations are honored exactly.
#[derive(Clone, Copy, Debug, Default)]
pub struct FfmpegEncoder;

impl FfmpegEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl VideoEncoder for FfmpegEncoder {
    fn encode(&mut self, manifest: &Path, out_path: &Path) -> SitelapseResult<()> {
        if !is_ffmpeg_on_path() {
            return Err(SitelapseError::subprocess(
                "ffmpeg is required for MP4 encoding, but was not found on PATH",
            ));
        }

        let output = Command::new("ffmpeg")
            .arg("-y")
            .args(["-f", "concat", "-safe", "0", "-i"])
            .arg(manifest)
            .args(["-fps_mode", "vfr", "-pix_fmt", "yuv420p"])
            .arg(out_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                SitelapseError::subprocess(format!(
                    "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SitelapseError::subprocess(format!(
                "ffmpeg exited with status {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

/// One captured encode request.
#[derive(Clone, Debug)]
pub struct EncodeJob {
    pub manifest: PathBuf,
    pub out_path: PathBuf,
    /// Manifest contents at encode time, before any cleanup.
    pub manifest_text: String,
}

/// In-memory encoder for tests and debugging: records each request and
/// snapshots the manifest text instead of producing video.
#[derive(Debug, Default)]
pub struct RecordingEncoder {
    pub jobs: Vec<EncodeJob>,
}

impl RecordingEncoder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VideoEncoder for RecordingEncoder {
    fn encode(&mut self, manifest: &Path, out_path: &Path) -> SitelapseResult<()> {
        let manifest_text = std::fs::read_to_string(manifest).map_err(|e| {
            SitelapseError::config(format!(
                "failed to read concat manifest '{}': {e}",
                manifest.display()
            ))
        })?;
        self.jobs.push(EncodeJob {
            manifest: manifest.to_path_buf(),
            out_path: out_path.to_path_buf(),
            manifest_text,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_durations_follow_event_gaps() {
        let frames = [FrameIndex(0), FrameIndex(3), FrameIndex(5), FrameIndex(7)];
        assert_eq!(
            segment_durations(&frames, 1).unwrap(),
            vec![3.0, 2.0, 2.0]
        );
        assert_eq!(
            segment_durations(&frames, 10).unwrap(),
            vec![0.3, 0.2, 0.2]
        );
        assert!(segment_durations(&frames, 0).is_err());
    }

    #[test]
    fn manifest_repeats_final_frame_without_duration() {
        let dir = tempfile::tempdir().unwrap();
        let frames: Vec<(FrameIndex, PathBuf)> = [0u64, 3, 5, 7]
            .iter()
            .map(|f| {
                let path = dir.path().join(format!("frame_{f:04}.png"));
                std::fs::write(&path, b"").unwrap();
                (FrameIndex(*f), path)
            })
            .collect();

        let manifest = dir.path().join("frames.txt");
        write_concat_manifest(&manifest, &frames, 1).unwrap();

        let text = std::fs::read_to_string(&manifest).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        // 4 file lines with durations after the first three, plus the
        // repeated final file line.
        assert_eq!(lines.len(), 8);
        assert!(lines[0].starts_with("file '"));
        assert!(lines[0].ends_with("frame_0000.png'"));
        assert_eq!(lines[1], "duration 3");
        assert_eq!(lines[3], "duration 2");
        assert_eq!(lines[5], "duration 2");
        // The final frame line appears twice, the repeat without a duration.
        assert_eq!(lines[6], lines[7]);
        assert!(lines[7].ends_with("frame_0007.png'"));
        assert_eq!(
            lines.iter().filter(|l| l.ends_with("frame_0007.png'")).count(),
            2
        );
        // Paths are absolute.
        let path_part = lines[0].trim_start_matches("file '").trim_end_matches('\'');
        assert!(Path::new(path_part).is_absolute());
    }

    #[test]
    fn manifest_rejects_empty_frame_list() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("frames.txt");
        assert!(write_concat_manifest(&manifest, &[], 1).is_err());
    }

    #[test]
    fn recording_encoder_snapshots_manifest_text() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("frames.txt");
        std::fs::write(&manifest, "file 'x.png'\n").unwrap();

        let mut enc = RecordingEncoder::new();
        enc.encode(&manifest, &dir.path().join("output.mp4")).unwrap();
        assert_eq!(enc.jobs.len(), 1);
        assert!(enc.jobs[0].manifest_text.contains("x.png"));
    }
}
