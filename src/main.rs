//! seglabel CLI: replay annotation scripts and inspect label files.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use seglabel::format::label::parse_line;
use seglabel::model::ImageSize;
use seglabel::script::run_script;
use seglabel::{AppConfig, CommandOracle, Message, SessionController};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "seglabel")]
#[command(about = "Point-prompted segmentation annotator with YOLO label export")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to the platform config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open an image folder and run a command script against it.
    Run {
        /// Folder of images to annotate.
        #[arg(long)]
        images: PathBuf,

        /// Script with one command per line.
        #[arg(long)]
        script: PathBuf,

        /// Oracle command line, overriding the configured one.
        #[arg(long)]
        oracle_cmd: Option<String>,
    },

    /// Parse a label file and print what each line decodes to.
    Inspect {
        /// Label file (`.txt`).
        #[arg(long)]
        labels: PathBuf,

        /// Image the labels belong to; used for pixel coordinates.
        #[arg(long)]
        image: PathBuf,
    },
}

fn load_config(path: Option<&Path>) -> CliResult<AppConfig> {
    Ok(match path {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::load_from_default_path().unwrap_or_default(),
    })
}

fn init_logging(config: &AppConfig) {
    env_logger::Builder::new()
        .filter_level(config.preferences.log_level.to_level_filter())
        .parse_default_env()
        .init();
}

fn run(config: AppConfig, images: &Path, script: &Path, oracle_cmd: Option<String>) -> CliResult<()> {
    let oracle_cmd = oracle_cmd.unwrap_or_else(|| config.oracle.command.clone());
    let mut controller = SessionController::new(config);
    if oracle_cmd.trim().is_empty() {
        log::warn!("No oracle configured; 'segment' commands will fail");
    } else {
        controller.set_oracle(Box::new(CommandOracle::from_command_line(&oracle_cmd)?));
    }

    controller.dispatch(Message::OpenFolder(images.to_path_buf()))?;
    let source = std::fs::read_to_string(script)?;
    let summary = run_script(&mut controller, &source, images);

    println!(
        "{} commands ok, {} failed, {} images exported, {} annotations imported",
        summary.executed, summary.failed, summary.exported_images, summary.imported_annotations
    );
    if summary.failed > 0 {
        return Err(format!("{} script commands failed", summary.failed).into());
    }
    Ok(())
}

fn inspect(labels: &Path, image: &Path) -> CliResult<()> {
    let (width, height) = image::image_dimensions(image)?;
    let size = ImageSize::new(width, height);
    let content = std::fs::read_to_string(labels)?;

    let mut errors = 0;
    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_line(line) {
            Ok(label) => {
                let mask = label.rasterize(size);
                match mask.extent() {
                    Some((x0, y0, x1, y1)) => println!(
                        "{:>4}: class {} {} px, extent ({}, {})-({}, {})",
                        index + 1,
                        label.class_id(),
                        mask.count(),
                        x0,
                        y0,
                        x1,
                        y1
                    ),
                    None => println!("{:>4}: class {} (empty)", index + 1, label.class_id()),
                }
            }
            Err(e) => {
                errors += 1;
                println!("{:>4}: error: {}", index + 1, e);
            }
        }
    }
    if errors > 0 {
        log::warn!("{} of the lines in {:?} did not parse", errors, labels);
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(2);
        }
    };
    init_logging(&config);

    let result = match cli.command {
        Commands::Run {
            images,
            script,
            oracle_cmd,
        } => run(config, &images, &script, oracle_cmd),
        Commands::Inspect { labels, image } => inspect(&labels, &image),
    };
    if let Err(e) = result {
        log::error!("{}", e);
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
