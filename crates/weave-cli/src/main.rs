use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use weave::{
    run, Collaborators, JsonModelBuilder, ManifestParser, MirrorFetcher, RunRequest,
    BINDING_LIST_FILE, CONFIG_FILE, SOURCE_DIR, STATS_ENV,
};
use weave_codegen::{SourceEmitter, TemplateSynthesizer};
use weave_core::config::default_config_toml;
use weave_core::{is_env_enabled, Config, Outcome, TomlBindingStore};

#[derive(Parser)]
#[command(name = "weave")]
#[command(about = "Generate embedding-runtime bindings for host-language modules", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,

    /// Configuration file
    #[arg(short, long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a commented default configuration
    Init {
        /// Module path of the package to bind
        #[arg(long)]
        package: Option<String>,

        /// Version of the package
        #[arg(long)]
        version: Option<String>,

        /// Output directory
        #[arg(long)]
        out_dir: Option<String>,

        /// Build flag that disables the generated bindings
        #[arg(long)]
        dont_build_flag: Option<String>,

        /// Overwrite an existing configuration
        #[arg(long)]
        force: bool,
    },

    /// Fetch modules and generate bindings
    Generate {
        /// Directory module trees are fetched into
        #[arg(long, default_value = SOURCE_DIR)]
        src_dir: PathBuf,

        /// Local module mirror to fetch from
        #[arg(long, env = "WEAVE_MIRROR", default_value = "_mirror")]
        mirror: PathBuf,

        /// Binding list with per-binding overrides
        #[arg(long, default_value = BINDING_LIST_FILE)]
        bindings: PathBuf,

        /// Print run statistics (also enabled by WEAVE_STATS)
        #[arg(long)]
        stats: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.debug {
        tracing::Level::TRACE
    } else if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(cli.debug) // Show target module in debug mode
        .init();

    match cli.command {
        Commands::Init {
            package,
            version,
            out_dir,
            dont_build_flag,
            force,
        } => handle_init(
            &cli.config,
            out_dir.as_deref(),
            package.as_deref(),
            version.as_deref(),
            dont_build_flag.as_deref(),
            force,
        ),
        Commands::Generate {
            src_dir,
            mirror,
            bindings,
            stats,
        } => handle_generate(&cli.config, &src_dir, &mirror, &bindings, stats),
    }
}

fn handle_init(
    path: &Path,
    out_dir: Option<&str>,
    package: Option<&str>,
    version: Option<&str>,
    dont_build_flag: Option<&str>,
    force: bool,
) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    let content = default_config_toml(out_dir, package, version, dont_build_flag);
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Wrote default configuration to {}", path.display());
    Ok(())
}

fn handle_generate(
    config_path: &Path,
    src_dir: &Path,
    mirror: &Path,
    bindings: &Path,
    stats: bool,
) -> Result<()> {
    let (config, created) = Config::load_or_create_default(config_path)
        .with_context(|| format!("Failed to open config {}", config_path.display()))?;
    if created {
        println!(
            "weave: created default config at {}, edit it and run again",
            config_path.display()
        );
        return Ok(());
    }

    fs::create_dir_all(src_dir)
        .with_context(|| format!("Failed to create {}", src_dir.display()))?;

    let fetcher = MirrorFetcher::new(mirror);
    let store = TomlBindingStore::new(bindings);
    let emitter = SourceEmitter::new(&config.out_dir);
    let collaborators = Collaborators {
        fetcher: &fetcher,
        parser: &ManifestParser,
        model_builder: &JsonModelBuilder,
        synthesizer: &TemplateSynthesizer,
        binding_store: &store,
        emitter: &emitter,
    };
    let request = RunRequest {
        config: &config,
        src_dir,
    };

    let (output, warnings) = match run(&request, &collaborators) {
        Outcome::Ok(output) => (output, None),
        Outcome::PartialOk(output, diagnostics) => (output, Some(diagnostics)),
        Outcome::Err(e) => return Err(e).context("weave run failed"),
    };

    if stats || is_env_enabled(STATS_ENV) {
        println!();
        println!("====== BEGIN WEAVE STATS ======");
        println!();
        println!("{}", output.stats);
        println!("======  END WEAVE STATS  ======");
        println!();
    }
    if let Some(warnings) = warnings {
        println!("weave: {} warnings:", warnings.len());
        println!("{}", warnings.format_compact());
    }
    println!(
        "weave: wrote {}/{} bindings to {}",
        output.emit.written,
        output.emit.total,
        output.output_dir().display()
    );
    Ok(())
}
