//! Raillabel: OpenLABEL annotations for multi-sensor train recordings.
//!
//! Raillabel loads annotated railway scenes (cameras, lidar, radar and
//! GPS/IMU, with 2D and 3D object annotations) into a typed in-memory
//! model, filters them, and writes them back as OpenLABEL 1.0 JSON. The
//! understand.ai `trains_4` predecessor format is read and converted on
//! load.
//!
//! # Modules
//!
//! - [`model`]: the scene data model (sensors, objects, frames, annotations)
//! - [`io`]: JSON reading and writing
//! - [`filter`]: predicate-based scene filtering
//! - [`pointers`]: derivation of the per-object pointer index
//! - [`builder`]: fluent construction of small scenes
//! - [`warnings`]: the non-fatal issue collector
//! - [`error`]: error types
//!
//! # Example
//!
//! ```
//! use raillabel::builder::SceneBuilder;
//! use raillabel::filter::FilterPredicate;
//! use raillabel::Warnings;
//!
//! let scene = SceneBuilder::empty()
//!     .add_bbox(1, "rgb_center", "person_0000")
//!     .add_cuboid(2, "lidar", "train_0000")
//!     .build();
//!
//! let mut warnings = Warnings::new();
//! let only_lidar = raillabel::filter(
//!     &scene,
//!     &[FilterPredicate::IncludeSensorIds(vec!["lidar".into()])],
//!     &mut warnings,
//! )?;
//! assert_eq!(only_lidar.objects.len(), 1);
//!
//! let json = raillabel::to_string(&only_lidar, &Default::default(), &mut warnings)?;
//! let reloaded = raillabel::from_str(&json, &mut warnings)?;
//! assert_eq!(reloaded, only_lidar);
//! # Ok::<(), raillabel::RaillabelError>(())
//! ```

pub mod builder;
pub mod error;
pub mod filter;
pub mod io;
pub mod model;
pub mod pointers;
pub mod summary;
pub mod warnings;

use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

pub use error::RaillabelError;
pub use filter::{filter, FilterPredicate};
pub use io::{
    from_slice, from_str, load, load_with, save, to_string, to_vec, LoadOptions, SaveOptions,
};
pub use model::Scene;
pub use pointers::derive_pointers;
pub use warnings::{Warning, WarningCode, WarningContext, Warnings};

use io::RequiredFieldsValidator;
use summary::{LoadReport, SceneSummary};

/// The raillabel CLI application.
#[derive(Parser)]
#[command(name = "raillabel")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    /// Do not log warnings.
    #[arg(long, short, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Load a scene and print a summary.
    Load(LoadArgs),
    /// Load a scene and write it back as OpenLABEL.
    Save(SaveArgs),
    /// Filter a scene with a JSON filter document.
    Filter(FilterArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Arguments for the load subcommand.
#[derive(clap::Args)]
struct LoadArgs {
    /// Scene file (OpenLABEL or understand.ai).
    input: PathBuf,

    /// Output format for the summary.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    /// Check the mandatory OpenLABEL fields before reading.
    #[arg(long)]
    validate: bool,
}

/// Arguments for the save subcommand.
#[derive(clap::Args)]
struct SaveArgs {
    /// Scene file to read.
    scene: PathBuf,

    /// Destination of the OpenLABEL output.
    output: PathBuf,

    /// Indent the output.
    #[arg(long)]
    pretty: bool,
}

/// Arguments for the filter subcommand.
#[derive(clap::Args)]
struct FilterArgs {
    /// Scene file to read.
    scene: PathBuf,

    /// JSON filter document, e.g. `{"include_sensor_ids": ["lidar"]}`.
    spec: PathBuf,

    /// Destination of the filtered scene.
    output: PathBuf,

    /// Indent the output.
    #[arg(long)]
    pretty: bool,
}

/// Run the raillabel CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), RaillabelError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Load(args)) => run_load(args, cli.quiet),
        Some(Commands::Save(args)) => run_save(args, cli.quiet),
        Some(Commands::Filter(args)) => run_filter(args, cli.quiet),
        None => {
            println!("raillabel {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Read, write and filter OpenLABEL railway annotations.");
            println!();
            println!("Run 'raillabel --help' for usage information.");
            Ok(())
        }
    }
}

fn run_load(args: LoadArgs, quiet: bool) -> Result<(), RaillabelError> {
    let mut warnings = Warnings::new();
    let validator = RequiredFieldsValidator;
    let options = LoadOptions {
        validator: args.validate.then_some(&validator as &dyn io::SchemaValidator),
    };
    let scene = io::load_with(&args.input, &options, &mut warnings)?;
    let summary = SceneSummary::new(&scene);

    match args.output {
        OutputFormat::Json => {
            let report = LoadReport {
                summary,
                warnings: &warnings,
            };
            let json = serde_json::to_string_pretty(&report).map_err(|source| {
                RaillabelError::Write {
                    path: PathBuf::from("<stdout>"),
                    source,
                }
            })?;
            println!("{json}");
        }
        OutputFormat::Text => {
            print!("{summary}");
            log_warnings(&warnings, quiet);
        }
    }
    Ok(())
}

fn run_save(args: SaveArgs, quiet: bool) -> Result<(), RaillabelError> {
    let mut warnings = Warnings::new();
    let scene = io::load(&args.scene, &mut warnings)?;
    let options = SaveOptions {
        pretty: args.pretty,
        validator: None,
    };
    io::save(&scene, &args.output, &options, &mut warnings)?;
    log_warnings(&warnings, quiet);

    println!(
        "Saved {} frames to {}",
        scene.frames.len(),
        args.output.display()
    );
    Ok(())
}

fn run_filter(args: FilterArgs, quiet: bool) -> Result<(), RaillabelError> {
    let spec = fs::read(&args.spec)?;
    let predicates = filter::parse_filter_spec(&spec)?;

    let mut warnings = Warnings::new();
    let scene = io::load(&args.scene, &mut warnings)?;
    let filtered = filter::filter(&scene, &predicates, &mut warnings)?;
    let options = SaveOptions {
        pretty: args.pretty,
        validator: None,
    };
    io::save(&filtered, &args.output, &options, &mut warnings)?;
    log_warnings(&warnings, quiet);

    println!(
        "Kept {} of {} frames, wrote {}",
        filtered.frames.len(),
        scene.frames.len(),
        args.output.display()
    );
    Ok(())
}

fn log_warnings(warnings: &Warnings, quiet: bool) {
    if quiet {
        return;
    }
    for warning in &warnings.issues {
        tracing::warn!(code = ?warning.code, context = %warning.context, "{}", warning.message);
    }
}
