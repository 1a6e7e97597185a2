use std::{
    fs::File,
    io,
    path::{Path, PathBuf},
};

use crate::{
    core::{FALLBACK_COLOR, FrameIndex, Rgb},
    error::{SitelapseError, SitelapseResult},
};

/// A schedule record after filtering, coloring, validation and frame
/// quantization. Immutable once compiled; serialized to the hand-off file
/// and consumed exactly once by the animation driver.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CanonicalActivity {
    pub activity: String,
    pub start_frame: FrameIndex,
    pub end_frame: FrameIndex,
    pub color: Rgb,
}

/// Wire row of the hand-off CSV. Color columns are omissible; the consumer
/// defaults missing channels to the fixed fallback red.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct HandoffRow {
    #[serde(rename = "Activity")]
    activity: String,
    #[serde(rename = "Start Frame")]
    start_frame: u64,
    #[serde(rename = "End Frame")]
    end_frame: u64,
    #[serde(rename = "Color_R", default)]
    color_r: Option<f64>,
    #[serde(rename = "Color_G", default)]
    color_g: Option<f64>,
    #[serde(rename = "Color_B", default)]
    color_b: Option<f64>,
}

pub fn write_handoff<W: io::Write>(
    writer: W,
    activities: &[CanonicalActivity],
) -> SitelapseResult<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for activity in activities {
        let row = HandoffRow {
            activity: activity.activity.clone(),
            start_frame: activity.start_frame.0,
            end_frame: activity.end_frame.0,
            color_r: Some(activity.color.r),
            color_g: Some(activity.color.g),
            color_b: Some(activity.color.b),
        };
        wtr.serialize(row)
            .map_err(|e| SitelapseError::serde(format!("failed to write hand-off row: {e}")))?;
    }
    wtr.flush()
        .map_err(|e| SitelapseError::serde(format!("failed to flush hand-off: {e}")))?;
    Ok(())
}

pub fn write_handoff_file(path: &Path, activities: &[CanonicalActivity]) -> SitelapseResult<()> {
    let file = File::create(path).map_err(|e| {
        SitelapseError::config(format!(
            "failed to create hand-off file '{}': {e}",
            path.display()
        ))
    })?;
    write_handoff(file, activities)
}

pub fn read_handoff<R: io::Read>(reader: R) -> SitelapseResult<Vec<CanonicalActivity>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut activities = Vec::new();
    for row in rdr.deserialize::<HandoffRow>() {
        let row = row.map_err(|e| SitelapseError::serde(e.to_string()))?;
        if row.end_frame < row.start_frame {
            return Err(SitelapseError::validation(format!(
                "activity '{}' has end frame {} before start frame {}",
                row.activity, row.end_frame, row.start_frame
            )));
        }
        let color = Rgb::new(
            row.color_r.unwrap_or(FALLBACK_COLOR.r),
            row.color_g.unwrap_or(FALLBACK_COLOR.g),
            row.color_b.unwrap_or(FALLBACK_COLOR.b),
        );
        color.validate().map_err(|_| {
            SitelapseError::validation(format!(
                "activity '{}' carries a color channel outside [0,1]",
                row.activity
            ))
        })?;
        activities.push(CanonicalActivity {
            activity: row.activity,
            start_frame: FrameIndex(row.start_frame),
            end_frame: FrameIndex(row.end_frame),
            color,
        });
    }
    Ok(activities)
}

pub fn read_handoff_file(path: &Path) -> SitelapseResult<Vec<CanonicalActivity>> {
    let file = File::open(path).map_err(|e| {
        SitelapseError::config(format!(
            "failed to open hand-off file '{}': {e}",
            path.display()
        ))
    })?;
    read_handoff(file).map_err(|e| match e {
        SitelapseError::Serde(msg) => {
            SitelapseError::serde(format!("hand-off '{}': {msg}", path.display()))
        }
        other => other,
    })
}

/// Removes the hand-off file when dropped, success or failure.
pub struct HandoffGuard {
    path: PathBuf,
}

impl HandoffGuard {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for HandoffGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}
