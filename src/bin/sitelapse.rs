use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};

use sitelapse::{
    CameraSelector, CompilerConfig, HostCommand, VisualMode, encode::segment_durations,
};

#[derive(Parser, Debug)]
#[command(name = "sitelapse", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile schedule CSVs and hand each one to the rendering host.
    Compile(CompileArgs),
    /// Dump the animation plan a hand-off file would produce, as JSON.
    Plan(PlanArgs),
}

#[derive(Parser, Debug)]
struct CompileArgs {
    /// Schedule CSV file, or a directory of schedule CSVs.
    #[arg(long)]
    schedule: PathBuf,

    /// 3D scene asset handed to the rendering host.
    #[arg(long)]
    scene: PathBuf,

    /// Visualization mode.
    #[arg(long, value_enum, default_value_t = ModeChoice::Simple)]
    mode: ModeChoice,

    /// WBS segment to filter and reroot under (required for --mode wbs).
    #[arg(long)]
    top_wbs: Option<String>,

    /// Camera selection: 'all', 'first:N', or comma-separated names.
    #[arg(long, default_value = "all")]
    cam_select: String,

    /// Comma-separated camera names to exclude.
    #[arg(long, default_value = "")]
    cam_exclude: String,

    /// Root directory for per-schedule outputs.
    #[arg(long, default_value = "outputs")]
    out: PathBuf,

    /// Rendering host executable.
    #[arg(long, default_value = "blender")]
    host: PathBuf,

    /// Extra host argument before the separator (repeatable).
    #[arg(long = "host-arg")]
    host_args: Vec<String>,
}

#[derive(Parser, Debug)]
struct PlanArgs {
    /// Hand-off CSV produced by the compiler.
    #[arg(long)]
    handoff: PathBuf,

    /// Playback fps used for segment durations.
    #[arg(long, default_value_t = sitelapse::DEFAULT_DRIVER_FPS)]
    fps: u32,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeChoice {
    Simple,
    Wbs,
    Company,
    ActivityType,
    Heatmap,
}

impl From<ModeChoice> for VisualMode {
    fn from(choice: ModeChoice) -> Self {
        match choice {
            ModeChoice::Simple => VisualMode::Simple,
            ModeChoice::Wbs => VisualMode::Wbs,
            ModeChoice::Company => VisualMode::Company,
            ModeChoice::ActivityType => VisualMode::ActivityType,
            ModeChoice::Heatmap => VisualMode::Heatmap,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Compile(args) => cmd_compile(args),
        Command::Plan(args) => cmd_plan(args),
    }
}

fn cmd_compile(args: CompileArgs) -> anyhow::Result<()> {
    let cam_select: CameraSelector = args.cam_select.parse()?;
    let cam_exclude = split_names(&args.cam_exclude);

    // The scene asset leads the host's own arguments; the compiler appends
    // `-- <handoff> <out_dir>` plus the camera flags per invocation.
    let mut host_args = vec![args.scene.display().to_string()];
    host_args.extend(args.host_args);

    let cfg = CompilerConfig {
        schedule_input: args.schedule,
        mode: args.mode.into(),
        top_wbs: args.top_wbs,
        out_root: args.out,
        host: HostCommand::new(args.host, host_args),
        cam_select,
        cam_exclude,
    };

    let reports = sitelapse::run_compiler(&cfg)?;
    for report in &reports {
        eprintln!(
            "compiled {} ({} activities) -> {}",
            report.name,
            report.activities.len(),
            cfg.out_root.join(&report.name).display()
        );
    }
    Ok(())
}

fn cmd_plan(args: PlanArgs) -> anyhow::Result<()> {
    let activities = sitelapse::read_handoff_file(&args.handoff)?;
    let plan = sitelapse::build_plan(&activities);
    let durations = segment_durations(&plan.event_frames, args.fps)?;

    #[derive(serde::Serialize)]
    struct PlanOutput {
        event_frames: Vec<u64>,
        segment_durations_secs: Vec<f64>,
        keys: Vec<sitelapse::ActivityKeys>,
    }

    let out = PlanOutput {
        event_frames: plan.event_frames.iter().map(|f| f.0).collect(),
        segment_durations_secs: durations,
        keys: plan.keys,
    };
    let json = serde_json::to_string_pretty(&out).with_context(|| "serialize animation plan")?;
    println!("{json}");
    Ok(())
}

fn split_names(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
