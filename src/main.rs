use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use clap::error::ErrorKind;
use log::info;
use simplelog::{Config, WriteLogger};

use pixrat::app::{self, RunOptions};
use pixrat::panic_handler;
use pixrat::settings::{self, Settings};

/// Preview a PNG image as a mosaic of colored blocks
#[derive(Parser, Debug)]
#[command(name = "pixrat", version, about)]
struct Cli {
    /// PNG file to preview
    file: PathBuf,

    /// Patch width in pixels
    #[arg(long, value_name = "PIXELS")]
    patch_width: Option<u32>,

    /// Patch height in pixels
    #[arg(long, value_name = "PIXELS")]
    patch_height: Option<u32>,

    /// Compute patch colors on all cores
    #[arg(long)]
    parallel: bool,

    /// Settings file (defaults to <config dir>/pixrat/config.yaml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Write log records to this file at the configured level (default info)
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

impl Cli {
    fn apply_overrides(&self, settings: &mut Settings) {
        if let Some(width) = self.patch_width {
            settings.patch_width = width;
        }
        if let Some(height) = self.patch_height {
            settings.patch_height = height;
        }
        if self.parallel {
            settings.parallel = true;
        }
        if let Some(path) = &self.log_file {
            settings.log_file = Some(path.clone());
        }
    }
}

fn init_logging(settings: &Settings) -> Result<()> {
    let Some(path) = &settings.log_file else {
        return Ok(());
    };
    let file =
        File::create(path).with_context(|| format!("Failed to create log file {path:?}"))?;
    WriteLogger::init(settings.level_filter()?, Config::default(), file)
        .context("Failed to initialize logger")?;
    Ok(())
}

fn setup(cli: &Cli) -> Result<RunOptions> {
    let mut settings = settings::load_settings(cli.config.as_deref())?;
    cli.apply_overrides(&mut settings);
    init_logging(&settings)?;

    Ok(RunOptions {
        patch_size: settings.patch_size()?,
        parallel: settings.parallel,
    })
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            let _ = e.print();
            return ExitCode::FAILURE;
        }
    };

    let options = match setup(&cli) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("{e:#}");
            return ExitCode::FAILURE;
        }
    };

    panic_handler::initialize_panic_handler();
    info!("Starting pixrat on {:?}", cli.file);

    match app::run(&cli.file, &options) {
        Ok(stats) => {
            info!("Done: {} rows, {} glyphs", stats.rows, stats.glyphs);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
