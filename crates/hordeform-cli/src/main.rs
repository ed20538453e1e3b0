use std::{fs, path::Path};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use hordeform_core::{CycleId, ObjectId, RenderSettings};
use hordeform_overlay::DisplayMode;
use hordeform_pipeline::{Scene, SceneOptions, run_scene};
use log::info;

/// Survey image calibration and displacement vector projection.
#[derive(Debug, Parser)]
#[command(author, version, about = "Displacement diagram calibration")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fit the image transform from a scene's anchors and print the projected geometry.
    Fit(FitArgs),
}

#[derive(Debug, clap::Args)]
struct FitArgs {
    /// Path to JSON file containing the scene (rows, anchors, optional transform).
    #[arg(long)]
    input: String,

    /// Optional path to JSON RenderSettings. Overrides settings stored in the scene.
    #[arg(long)]
    settings: Option<String>,

    /// Which cycles to show.
    #[arg(long, value_enum, default_value_t = ModeArg::Selected)]
    mode: ModeArg,

    /// Comma-separated cycle ids to select. All cycles if omitted.
    #[arg(long, value_delimiter = ',')]
    cycles: Option<Vec<CycleId>>,

    /// Object to show. First object if omitted.
    #[arg(long)]
    object: Option<ObjectId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    All,
    Last,
    Selected,
}

impl From<ModeArg> for DisplayMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::All => DisplayMode::AllCycles,
            ModeArg::Last => DisplayMode::LastCycle,
            ModeArg::Selected => DisplayMode::SelectedCycles,
        }
    }
}

fn load_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let data =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("failed to parse {}", path.display()))
}

fn run_fit_from_files(args: &FitArgs) -> Result<String> {
    let scene: Scene = load_json_file(Path::new(&args.input))?;
    info!(
        "loaded scene: {} rows, {} anchors",
        scene.rows.row_count(),
        scene.anchors.len()
    );

    let settings = args
        .settings
        .as_deref()
        .map(|p| load_json_file::<RenderSettings>(Path::new(p)))
        .transpose()?;

    let options = SceneOptions {
        object: args.object,
        mode: args.mode.into(),
        cycles: args.cycles.clone(),
        settings,
    };
    let report = run_scene(&scene, &options)?;
    Ok(serde_json::to_string_pretty(&report)?)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    if let Err(err) = try_main() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let args = Args::parse();
    match args.command {
        Command::Fit(fit) => {
            let json = run_fit_from_files(&fit)?;
            println!("{json}");
        }
    }
    Ok(())
}
