//! pdf-watermark-remover - Remove repeated watermark text from PDF documents
//!
//! CLI entry point

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use pdf_watermark_remover::cleaner::join_keyword_list;
use pdf_watermark_remover::cli::{
    default_clean_output, default_preview_output, CleanArgs, CleanFlags, DetectArgs, PreviewArgs,
};
use pdf_watermark_remover::{
    exit_codes, CandidateDetector, CleanParams, Cli, CliProgress, Commands, Config,
    DocumentPipeline, OutputMode, PipelineError, Preview,
};

#[cfg(feature = "web")]
use pdf_watermark_remover::{cli::ServeArgs, ServerConfig, WebServer};

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let result = run(&cli);

    std::process::exit(match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            if e.downcast_ref::<PipelineError>().is_some() {
                exit_codes::PROCESSING_ERROR
            } else {
                exit_codes::GENERAL_ERROR
            }
        }
    });
}

/// Install the fmt subscriber; `RUST_LOG` wins over `-v`
fn init_tracing(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<i32> {
    let config = load_config(cli)?;
    let mode = OutputMode::from_flags(cli.quiet, cli.verbose);

    match &cli.command {
        Commands::Detect(args) => run_detect(args, &config),
        Commands::Clean(args) => run_clean(args, &config, mode),
        Commands::Preview(args) => run_preview(args, &config, mode),
        #[cfg(feature = "web")]
        Commands::Serve(args) => run_serve(args, &config),
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    match &cli.config {
        Some(path) => Config::load_from_path(path)
            .with_context(|| format!("Failed to load config file {}", path.display())),
        None => Ok(Config::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Ignoring unreadable config file");
            Config::default()
        })),
    }
}

/// Read the input PDF, or `None` after reporting that it does not exist
fn read_input(path: &Path) -> Result<Option<Vec<u8>>> {
    if !path.is_file() {
        eprintln!("Error: Input file does not exist: {}", path.display());
        return Ok(None);
    }
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(Some(bytes))
}

// ============ Detect Command ============

fn run_detect(args: &DetectArgs, config: &Config) -> Result<i32> {
    let Some(bytes) = read_input(&args.input)? else {
        return Ok(exit_codes::INPUT_NOT_FOUND);
    };

    let mut options = config.detect.to_options();
    if let Some(pages) = args.max_pages {
        options.max_pages = pages.max(1);
    }
    let detector = CandidateDetector::new(options);

    if args.json {
        let report = detector.analyze(&bytes)?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(exit_codes::SUCCESS);
    }

    let candidates = detector.detect(&bytes);
    if candidates.is_empty() {
        eprintln!("No watermark candidates found");
    } else {
        println!("{}", join_keyword_list(&candidates));
    }
    Ok(exit_codes::SUCCESS)
}

// ============ Clean Command ============

/// Merge config, flags and (with `--auto`) detected candidates
fn resolve_params(flags: &CleanFlags, config: &Config, bytes: &[u8]) -> CleanParams {
    let params = config.merge_with_cli(&flags.to_overrides());
    if !params.keywords.is_empty() || !flags.auto {
        return params;
    }

    let candidates = CandidateDetector::new(config.detect.to_options()).detect(bytes);
    tracing::info!(candidates = %join_keyword_list(&candidates), "Using detected keywords");
    CleanParams {
        keywords: candidates,
        ..params
    }
}

fn run_clean(args: &CleanArgs, config: &Config, mode: OutputMode) -> Result<i32> {
    let Some(bytes) = read_input(&args.input)? else {
        return Ok(exit_codes::INPUT_NOT_FOUND);
    };
    let params = resolve_params(&args.flags, config, &bytes);
    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| default_clean_output(&args.input));

    if mode.should_show(OutputMode::Normal) {
        println!("Cleaning: {}", args.input.display());
        if !params.keywords.is_empty() {
            println!("Keywords: {}", join_keyword_list(&params.keywords));
        }
    }

    let progress = CliProgress::new(mode);
    let pipeline = DocumentPipeline::new(params);
    let output = pipeline.process_with_progress(&bytes, &progress)?;

    std::fs::write(&output_path, &output.bytes)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    progress.print_summary(&output);
    if mode.should_show(OutputMode::Normal) {
        println!("Saved: {}", output_path.display());
    }

    if output.failed_pages().is_empty() {
        Ok(exit_codes::SUCCESS)
    } else {
        Ok(exit_codes::PARTIAL_FAILURE)
    }
}

// ============ Preview Command ============

fn run_preview(args: &PreviewArgs, config: &Config, mode: OutputMode) -> Result<i32> {
    let Some(bytes) = read_input(&args.input)? else {
        return Ok(exit_codes::INPUT_NOT_FOUND);
    };
    let params = resolve_params(&args.flags, config, &bytes);
    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| default_preview_output(&args.input));

    match DocumentPipeline::new(params).preview(&bytes)? {
        Preview::Image(png) => {
            std::fs::write(&output_path, &png)
                .with_context(|| format!("Failed to write {}", output_path.display()))?;
            if mode.should_show(OutputMode::Normal) {
                println!("Saved: {}", output_path.display());
            }
            Ok(exit_codes::SUCCESS)
        }
        Preview::Unavailable => {
            eprintln!("Error: Document has no pages, no preview available");
            Ok(exit_codes::PROCESSING_ERROR)
        }
    }
}

// ============ Serve Command (Web Server) ============

#[cfg(feature = "web")]
fn run_serve(args: &ServeArgs, config: &Config) -> Result<i32> {
    let server = &config.server;
    let server_config = ServerConfig::default()
        .with_port(args.port.unwrap_or(server.port))
        .with_bind(args.bind.clone().unwrap_or_else(|| server.bind.clone()))
        .with_upload_limit(
            args.upload_limit
                .map(|mb| mb.saturating_mul(1024 * 1024))
                .unwrap_or_else(|| server.upload_limit_bytes()),
        )
        .with_detector(config.detect.to_options());

    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(server_config.workers)
        .enable_all()
        .build()?;
    rt.block_on(async {
        WebServer::with_config(server_config)
            .run()
            .await
            .map_err(|e| anyhow::anyhow!(e))
    })?;

    Ok(exit_codes::SUCCESS)
}
