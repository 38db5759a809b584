use anyhow::{Context, Result};
use flowconfig::FlowConfig;
use renderer::Renderer;
use tracing_subscriber::EnvFilter;

use crate::bindings::{apply_overrides, render_policy, renderer_config};
use crate::cli::{Cli, Command, ConfigAction, RunArgs};
use crate::paths::AppPaths;

pub fn run(cli: Cli) -> Result<()> {
    initialise_tracing();

    let paths = AppPaths::discover()?;
    tracing::debug!(config = %paths.config_dir().display(), "resolved flowpaper paths");

    match cli.command {
        Some(Command::Config(command)) => run_config(command.action, &cli.run, &paths),
        None => run_renderer(&cli.run, &paths),
    }
}

fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Loads `--config` if given, else the default file if present, else defaults.
fn load_config(args: &RunArgs, paths: &AppPaths) -> Result<FlowConfig> {
    if let Some(path) = args.config.as_ref() {
        let config = FlowConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?;
        tracing::info!(path = %path.display(), "loaded configuration");
        return Ok(config);
    }

    let default_file = paths.config_file();
    if default_file.is_file() {
        let config = FlowConfig::load(&default_file)
            .with_context(|| format!("failed to load config {}", default_file.display()))?;
        tracing::info!(path = %default_file.display(), "loaded configuration");
        Ok(config)
    } else {
        tracing::debug!(
            path = %default_file.display(),
            "no configuration file; using built-in defaults"
        );
        Ok(FlowConfig::default())
    }
}

fn resolve_config(args: &RunArgs, paths: &AppPaths) -> Result<FlowConfig> {
    let mut config = load_config(args, paths)?;
    apply_overrides(&mut config, args);
    config
        .validate()
        .context("command-line overrides produced an invalid configuration")?;
    Ok(config)
}

fn run_config(action: ConfigAction, args: &RunArgs, paths: &AppPaths) -> Result<()> {
    match action {
        ConfigAction::Where => {
            println!("config_dir = {}", paths.config_dir().display());
            println!("config_file = {}", paths.config_file().display());
            Ok(())
        }
        ConfigAction::Print => {
            let config = resolve_config(args, paths)?;
            let text = config
                .to_toml_string()
                .context("failed to render configuration")?;
            print!("{text}");
            Ok(())
        }
    }
}

fn run_renderer(args: &RunArgs, paths: &AppPaths) -> Result<()> {
    let config = resolve_config(args, paths)?;
    let policy = render_policy(&config, args);
    tracing::info!(
        scene = ?config.scene,
        width = config.window.size.0,
        height = config.window.size.1,
        ?policy,
        "starting flowpaper"
    );

    let mut renderer = Renderer::new(renderer_config(&config, policy));
    renderer.run()
}
