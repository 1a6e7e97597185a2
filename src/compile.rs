use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    process::Command,
};

use anyhow::Context as _;

use crate::{
    camera::CameraSelector,
    color::{categorical_palette, daily_rate, utilization_color},
    core::{FALLBACK_COLOR, FRAMES_PER_UNIT, FrameIndex, Rgb},
    error::{SitelapseError, SitelapseResult},
    handoff::{CanonicalActivity, HandoffGuard, write_handoff_file},
    schedule::{ScheduleRecord, filter_to_root, read_schedule, validate_chronology},
};

/// How schedule rows are colored in the output animation.
///
/// A closed set: every mode's coloring rule is matched exhaustively, so a new
/// mode cannot be added without deciding its color semantics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum VisualMode {
    /// Uniform activity color (the fallback red).
    Simple,
    /// Like `Simple`, but the schedule is filtered and rerooted under a
    /// required WBS segment.
    Wbs,
    /// One palette color per `Company` value.
    Company,
    /// One palette color per `ActivityType` value.
    ActivityType,
    /// Color by normalized resource intensity (resources per time unit).
    Heatmap,
}

impl VisualMode {
    /// Grouping column driving categorical coloring, if any.
    pub fn grouping_field(self) -> Option<&'static str> {
        match self {
            Self::Company => Some("Company"),
            Self::ActivityType => Some("ActivityType"),
            Self::Simple | Self::Wbs | Self::Heatmap => None,
        }
    }
}

/// Everything one schedule file compiles into: the canonical activity list
/// plus the color metadata a legend overlay would need.
#[derive(Clone, Debug, serde::Serialize)]
pub struct CompileReport {
    pub name: String,
    pub activities: Vec<CanonicalActivity>,
    /// Category to color mapping, categorical modes only.
    pub palette: Option<BTreeMap<String, Rgb>>,
    /// Pre-normalization (min, max) daily resource rates, heatmap mode only.
    pub heatmap_range: Option<(f64, f64)>,
}

/// Transform raw schedule rows into the canonical frame-indexed, colored
/// activity list: filter → color → validate → quantize.
pub fn compile_records(
    name: &str,
    mut records: Vec<ScheduleRecord>,
    mode: VisualMode,
    top_wbs: Option<&str>,
) -> SitelapseResult<CompileReport> {
    if mode == VisualMode::Wbs && top_wbs.is_none() {
        return Err(SitelapseError::config(
            "top_wbs is required when the visualization mode is 'wbs'",
        ));
    }

    if let Some(root) = top_wbs {
        records = filter_to_root(records, root)?;
    }
    if records.is_empty() {
        return Err(SitelapseError::validation(format!(
            "schedule '{name}' contains no records"
        )));
    }

    validate_chronology(&records)?;

    let (colors, palette, heatmap_range) = assign_colors(&records, mode)?;

    // Global time shift: the earliest start across the run becomes frame 0.
    let min_start = records.iter().map(|r| r.start).fold(f64::INFINITY, f64::min);
    let activities = records
        .iter()
        .zip(colors)
        .map(|(record, color)| CanonicalActivity {
            activity: record.activity.clone(),
            start_frame: quantize(record.start, min_start),
            end_frame: quantize(record.end, min_start),
            color,
        })
        .collect();

    Ok(CompileReport {
        name: name.to_string(),
        activities,
        palette,
        heatmap_range,
    })
}

fn quantize(value: f64, min_start: f64) -> FrameIndex {
    FrameIndex(((value - min_start) * FRAMES_PER_UNIT).floor() as u64)
}

type ColorAssignment = (Vec<Rgb>, Option<BTreeMap<String, Rgb>>, Option<(f64, f64)>);

fn assign_colors(records: &[ScheduleRecord], mode: VisualMode) -> SitelapseResult<ColorAssignment> {
    match mode {
        VisualMode::Simple | VisualMode::Wbs => {
            Ok((vec![FALLBACK_COLOR; records.len()], None, None))
        }
        VisualMode::Company | VisualMode::ActivityType => {
            let field = mode
                .grouping_field()
                .unwrap_or("grouping field");
            let values = records
                .iter()
                .map(|record| {
                    group_value(record, mode).ok_or_else(|| {
                        SitelapseError::validation(format!(
                            "activity '{}' is missing the {field} field required by the chosen mode",
                            record.activity
                        ))
                    })
                })
                .collect::<SitelapseResult<Vec<&str>>>()?;

            let palette = categorical_palette(values.iter().copied());
            let colors = values.iter().map(|value| palette[*value]).collect();
            Ok((colors, Some(palette), None))
        }
        VisualMode::Heatmap => {
            let rates = records
                .iter()
                .map(|record| {
                    let resources = record.resources.ok_or_else(|| {
                        SitelapseError::validation(format!(
                            "activity '{}' is missing the Resources field required by heatmap mode",
                            record.activity
                        ))
                    })?;
                    Ok(daily_rate(resources, record.start, record.end))
                })
                .collect::<SitelapseResult<Vec<f64>>>()?;

            let min = rates.iter().copied().fold(f64::INFINITY, f64::min);
            let max = rates.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let colors = rates
                .iter()
                .map(|rate| {
                    let normalized = if max > 0.0 { rate / max } else { 0.0 };
                    utilization_color(normalized)
                })
                .collect();
            Ok((colors, None, Some((min, max))))
        }
    }
}

fn group_value(record: &ScheduleRecord, mode: VisualMode) -> Option<&str> {
    match mode {
        VisualMode::Company => record.company.as_deref(),
        VisualMode::ActivityType => record.activity_type.as_deref(),
        VisualMode::Simple | VisualMode::Wbs | VisualMode::Heatmap => None,
    }
}

/// Accept a single schedule CSV or a directory of them; directory entries
/// are processed in lexicographic path order.
pub fn discover_schedules(input: &Path) -> SitelapseResult<Vec<PathBuf>> {
    if input.is_file() {
        if !has_csv_extension(input) {
            return Err(SitelapseError::config(format!(
                "schedule input '{}' must be a CSV file or a directory",
                input.display()
            )));
        }
        return Ok(vec![input.to_path_buf()]);
    }

    if input.is_dir() {
        let entries = fs::read_dir(input)
            .with_context(|| format!("failed to read schedule directory '{}'", input.display()))?;
        let mut files = Vec::new();
        for entry in entries {
            let path = entry
                .with_context(|| {
                    format!("failed to read schedule directory '{}'", input.display())
                })?
                .path();
            if path.is_file() && has_csv_extension(&path) {
                files.push(path);
            }
        }
        files.sort();
        if files.is_empty() {
            return Err(SitelapseError::config(format!(
                "no CSV files found in schedule directory '{}'",
                input.display()
            )));
        }
        return Ok(files);
    }

    Err(SitelapseError::config(format!(
        "schedule input '{}' is neither a file nor a directory",
        input.display()
    )))
}

fn has_csv_extension(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

/// The rendering-host process the compiler hands each schedule to. The
/// contract is positional: `<program> <args...> -- <handoff> <out_dir>`,
/// followed by the camera selection flags.
#[derive(Clone, Debug)]
pub struct HostCommand {
    pub program: PathBuf,
    /// Arguments before the separator; the scene asset path goes here.
    pub args: Vec<String>,
}

impl HostCommand {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn invoke(
        &self,
        handoff: &Path,
        out_dir: &Path,
        cam_select: &CameraSelector,
        cam_exclude: &[String],
    ) -> SitelapseResult<()> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.arg("--").arg(handoff).arg(out_dir);
        cmd.arg("--cam-select").arg(cam_select.to_string());
        if !cam_exclude.is_empty() {
            cmd.arg("--cam-exclude").arg(cam_exclude.join(","));
        }

        let status = cmd.status().map_err(|e| {
            SitelapseError::subprocess(format!(
                "failed to spawn rendering host '{}': {e}",
                self.program.display()
            ))
        })?;
        if !status.success() {
            return Err(SitelapseError::subprocess(format!(
                "rendering host '{}' exited with {status}",
                self.program.display()
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct CompilerConfig {
    /// Schedule CSV file, or a directory of them.
    pub schedule_input: PathBuf,
    pub mode: VisualMode,
    pub top_wbs: Option<String>,
    /// Root under which each schedule gets its own run directory.
    pub out_root: PathBuf,
    pub host: HostCommand,
    pub cam_select: CameraSelector,
    pub cam_exclude: Vec<String>,
}

/// Compile every discovered schedule and hand each one to the rendering
/// host, strictly in order. The first failure aborts the whole batch.
#[tracing::instrument(skip(cfg), fields(input = %cfg.schedule_input.display()))]
pub fn run_compiler(cfg: &CompilerConfig) -> SitelapseResult<Vec<CompileReport>> {
    let files = discover_schedules(&cfg.schedule_input)?;
    let mut reports = Vec::with_capacity(files.len());
    for path in files {
        reports.push(compile_and_dispatch(cfg, &path)?);
    }
    Ok(reports)
}

fn compile_and_dispatch(cfg: &CompilerConfig, path: &Path) -> SitelapseResult<CompileReport> {
    let name = schedule_name(path)?;
    let records = read_schedule(path)?;
    let report = compile_records(&name, records, cfg.mode, cfg.top_wbs.as_deref())?;
    tracing::info!(
        schedule = %name,
        activities = report.activities.len(),
        "compiled schedule"
    );

    let run_dir = cfg.out_root.join(&name);
    fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create run directory '{}'", run_dir.display()))?;

    // The guard removes the hand-off whether the host succeeds or not.
    let guard = HandoffGuard::new(handoff_path());
    write_handoff_file(guard.path(), &report.activities)?;
    cfg.host
        .invoke(guard.path(), &run_dir, &cfg.cam_select, &cfg.cam_exclude)?;

    Ok(report)
}

fn schedule_name(path: &Path) -> SitelapseResult<String> {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .ok_or_else(|| {
            SitelapseError::config(format!(
                "schedule path '{}' has no file name",
                path.display()
            ))
        })
}

fn handoff_path() -> PathBuf {
    std::env::temp_dir().join(format!(
        "sitelapse_handoff_{}_{}.csv",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0)
    ))
}
