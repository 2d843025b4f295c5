//! Marcher CLI - Compile signed distance scenes to GLSL

mod scenes;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use marcher_sdf::{ConfigValue, GlslEmitter, ShaderConfig, Template, global, stdlib};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(name = "marcher")]
#[command(about = "Compile signed distance scenes to ray-marching shaders", long_about = None)]
#[command(version)]
struct Cli {
    /// Log compiler activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the built-in scenes
    Scenes,

    /// Compile a built-in scene to a fragment shader
    Compile {
        /// Scene name (see `marcher scenes`)
        scene: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        settings: ConfigArgs,

        /// Program template containing `// [macros]` and `// [functions]`
        #[arg(long)]
        template: Option<PathBuf>,
    },

    /// Print the `#define` block for the effective configuration
    Config {
        #[command(flatten)]
        settings: ConfigArgs,
    },
}

#[derive(clap::Args)]
struct ConfigArgs {
    /// JSON configuration file overlaid on the defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override one macro, e.g. `--set MAX_STEPS=200`
    #[arg(long = "set", value_name = "KEY=VALUE")]
    overrides: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Scenes => {
            for scene in scenes::SCENES {
                println!("{:<12} {}", scene.name, scene.description);
            }
        }
        Commands::Compile {
            scene,
            output,
            settings,
            template,
        } => {
            let config = load_config(&settings)?;
            run_compile(&scene, output.as_deref(), &config, template.as_deref())?;
        }
        Commands::Config { settings } => {
            let config = load_config(&settings)?;
            print!("{}", config.macros()?);
        }
    }

    Ok(())
}

/// Logs go to stderr; stdout carries only program text
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Get the path to the user configuration file
fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("marcher").join("config.json"))
}

/// Defaults, then the user file, then `--config`, then each `--set`
fn load_config(args: &ConfigArgs) -> Result<ShaderConfig> {
    let mut config = ShaderConfig::default();

    if let Some(path) = user_config_path().filter(|path| path.exists()) {
        debug!(path = %path.display(), "loading user configuration");
        merge_file(&mut config, &path)?;
    }
    if let Some(path) = &args.config {
        merge_file(&mut config, path)?;
    }
    for assignment in &args.overrides {
        let Some((key, value)) = assignment.split_once('=') else {
            bail!("Expected KEY=VALUE, got `{}`", assignment);
        };
        let value: ConfigValue = value
            .parse()
            .with_context(|| format!("Invalid value for `{}`", key.trim()))?;
        config.set(key.trim(), value);
    }

    Ok(config)
}

fn merge_file(config: &mut ShaderConfig, path: &Path) -> Result<()> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    config
        .merge_json_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))
}

fn run_compile(
    name: &str,
    output: Option<&Path>,
    config: &ShaderConfig,
    template: Option<&Path>,
) -> Result<()> {
    let Some(scene) = scenes::find(name) else {
        bail!("Unknown scene `{}` (run `marcher scenes` for the list)", name);
    };

    let emitter = match template {
        Some(path) => GlslEmitter::with_template(
            Template::from_file(path)
                .with_context(|| format!("Failed to load template {}", path.display()))?,
        ),
        None => GlslEmitter::new(),
    };

    let root = {
        let mut registry = global().write();
        let lib = stdlib::register(&mut registry)?;
        let root = (scene.build)(&mut registry, &lib)
            .with_context(|| format!("Failed to build scene `{}`", scene.name))?;
        registry.seal();
        root
    };

    let registry = global().read();
    let program = emitter
        .emit(&registry, &root, config)
        .with_context(|| format!("Failed to compile scene `{}`", scene.name))?;

    match output {
        Some(path) => {
            std::fs::write(path, &program)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), scene = scene.name, "wrote program");
            eprintln!("Saved to: {}", path.display());
        }
        None => print!("{}", program),
    }

    Ok(())
}
