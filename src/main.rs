//! audiogen-daemon: prompt-to-audio generation service.
//!
//! This binary can run in two modes:
//! - Serve mode (default): HTTP service on the configured address
//! - One-shot mode (`--prompt`): write a single clip and print its path

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};

use audiogen_daemon::cli::Cli;
use audiogen_daemon::config::{ServiceConfig, ServiceMode};
use audiogen_daemon::generator::{AudioGenerator, ModelGenerator, SynthGenerator};
use audiogen_daemon::http::{self, AppState};
use audiogen_daemon::logging;
use audiogen_daemon::models::MusicGenLoader;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse_args();
    logging::init();

    let mut config = ServiceConfig::from_env();
    cli.apply_to(&mut config);
    if let Some(problem) = config.validate() {
        bail!("invalid configuration: {}", problem);
    }

    let generator = build_generator(&config);

    match cli.prompt.as_deref() {
        Some(prompt) => run_once(generator.as_ref(), prompt, cli.duration, cli.output.as_deref()),
        None => run_server(config, generator),
    }
}

fn build_generator(config: &ServiceConfig) -> Arc<dyn AudioGenerator> {
    let output_dir = config.effective_output_dir();
    match config.mode {
        ServiceMode::Test => {
            tracing::info!("test mode: using keyword synthesizer");
            Arc::new(SynthGenerator::new(output_dir))
        }
        ServiceMode::Model => {
            let loader = MusicGenLoader::from_config(config);
            tracing::info!(
                model_dir = %loader.model_dir.display(),
                device = %loader.device,
                "model mode: MusicGen loads on first request"
            );
            Arc::new(ModelGenerator::new(loader, output_dir))
        }
    }
}

/// Generates one clip and prints where it ended up.
fn run_once(
    generator: &dyn AudioGenerator,
    prompt: &str,
    duration_sec: f32,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let clip = generator.generate(prompt, duration_sec)?;

    let path = match output {
        Some(dest) => {
            fs::copy(&clip.path, dest)
                .with_context(|| format!("failed to copy clip to {}", dest.display()))?;
            let _ = fs::remove_file(&clip.path);
            dest.to_path_buf()
        }
        None => clip.path,
    };

    println!("{}", path.display());
    Ok(())
}

fn run_server(config: ServiceConfig, generator: Arc<dyn AudioGenerator>) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;

    runtime.block_on(async move {
        let addr = config.bind_addr();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind {}", addr))?;

        let state = AppState::new(generator, config.effective_output_dir(), config.max_duration_sec);
        http::serve(listener, state).await.context("server error")
    })
}
