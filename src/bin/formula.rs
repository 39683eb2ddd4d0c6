//! Formula CLI - build-from-source package runner
//!
//! Usage:
//!   formula install <formula>      Fetch, build, install and smoke-test
//!   formula fetch <formula>        Download and verify the source archive
//!   formula test <formula>         Smoke-test an installed binary
//!   formula info <formula>         Show formula details
//!   formula deps <formula>         Show dependency resolution
//!   formula audit <formula>        Check a formula for problems
//!   formula hash <file>            Print checksums for a file

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use formula_runner::helpers::acquire;
use formula_runner::{output, Config, Formula, InstallError, InstallOptions, Installer};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "formula")]
#[command(about = "Build and install packages from declarative formulas")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Installation prefix
    #[arg(short, long, global = true, env = "FORMULA_PREFIX")]
    prefix: Option<PathBuf>,

    /// Download cache directory
    #[arg(long, global = true, env = "FORMULA_CACHE")]
    cache_dir: Option<PathBuf>,

    /// Build directory (uses a temp dir if not specified)
    #[arg(short, long, global = true)]
    build_dir: Option<PathBuf>,

    /// CMake executable
    #[arg(long, global = true, env = "FORMULA_CMAKE")]
    cmake: Option<PathBuf>,

    /// Stream tool output instead of showing spinners
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, verify, build, install and smoke-test a formula
    Install {
        /// Formula name or path to a formula file
        formula: String,

        /// Skip the post-install smoke test
        #[arg(long)]
        no_test: bool,

        /// Keep the build directory afterwards
        #[arg(long)]
        keep_build: bool,
    },

    /// Download and verify the source archive only
    Fetch {
        /// Formula name or path to a formula file
        formula: String,
    },

    /// Smoke-test an already installed binary
    Test {
        /// Formula name or path to a formula file
        formula: String,
    },

    /// Show formula information
    Info {
        /// Formula name or path to a formula file
        formula: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show how each dependency resolves on this host
    Deps {
        /// Formula name or path to a formula file
        formula: String,
    },

    /// Check a formula for problems
    Audit {
        /// Formula name or path to a formula file
        formula: String,
    },

    /// Print sha256, sha512 and blake3 of a file
    Hash {
        /// File to hash
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    output::set_verbose(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<InstallError>() {
                Some(install_err) => {
                    output::error(&format!("[{}] {:#}", install_err.kind(), e));
                }
                None => output::error(&format!("{:#}", e)),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Install {
            formula,
            no_test,
            keep_build,
        } => {
            let formula = load_formula(&config, &formula)?;
            let config = Config {
                keep_build: config.keep_build || keep_build,
                ..config
            };
            let report = Installer::new(config).install(
                &formula,
                InstallOptions {
                    skip_test: no_test,
                },
            )?;
            for path in &report.installed {
                output::detail(&path.display().to_string());
            }
            if !report.smoke_tested {
                output::skip("smoke test skipped");
            }
        }

        Commands::Fetch { formula } => {
            let formula = load_formula(&config, &formula)?;
            output::action(&format!("Fetching {} {}", formula.name, formula.version));
            let archive = Installer::new(config).fetch(&formula)?;
            println!("{}", archive.display());
        }

        Commands::Test { formula } => {
            let formula = load_formula(&config, &formula)?;
            output::action(&format!("Testing {}", formula.name));
            Installer::new(config).smoke_test(&formula)?;
            output::success("smoke test passed");
        }

        Commands::Info { formula, json } => {
            let formula = load_formula(&config, &formula)?;
            if json {
                let rendered = serde_json::to_string_pretty(&formula)
                    .context("Failed to serialize formula")?;
                println!("{}", rendered);
            } else {
                show_info(&formula);
            }
        }

        Commands::Deps { formula } => {
            let formula = load_formula(&config, &formula)?;
            let installer = Installer::new(config);
            let resolution = installer.resolver().resolve(&formula);

            output::info(&format!("Dependencies for {}:", formula.name.bold()));
            if resolution.deps.is_empty() {
                println!("  {}", "(none)".dimmed());
            }
            for dep in &resolution.deps {
                output::dep_item(
                    &dep.dependency.name,
                    &format!("({})", dep.dependency.kind),
                    dep.detection.is_found(),
                );
            }

            resolution.ensure_satisfied()?;
        }

        Commands::Audit { formula } => {
            let path = config.resolve_formula(&formula)?;
            let formula = Formula::load(&path)?;
            let problems = formula.problems();
            if problems.is_empty() {
                output::success(&format!("{}: no problems found", path.display()));
            } else {
                for problem in &problems {
                    output::warning(problem);
                }
                anyhow::bail!(
                    "{} problem(s) found in {}",
                    problems.len(),
                    path.display()
                );
            }
        }

        Commands::Hash { file } => {
            let hashes = acquire::compute_hashes(&file)?;
            output::field("sha256", &hashes.sha256);
            output::field("sha512", &hashes.sha512);
            output::field("blake3", &hashes.blake3);
        }
    }

    Ok(())
}

/// Build the effective config: defaults, config file, env, then CLI flags
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load().context("Failed to load configuration")?;

    if let Some(ref prefix) = cli.prefix {
        config.prefix = prefix.clone();
    }
    if let Some(ref cache_dir) = cli.cache_dir {
        config.cache_dir = cache_dir.clone();
    }
    if let Some(ref build_dir) = cli.build_dir {
        config.build_dir = Some(build_dir.clone());
    }
    if let Some(ref cmake) = cli.cmake {
        config.cmake = cmake.clone();
    }

    Ok(config)
}

fn load_formula(config: &Config, formula: &str) -> Result<Formula> {
    let path = config.resolve_formula(formula)?;
    Ok(Formula::load(&path)?)
}

fn show_info(formula: &Formula) {
    println!("{} {}", formula.name.bold(), formula.version.green());
    if !formula.description.is_empty() {
        println!("{}", formula.description);
    }
    println!();

    if !formula.homepage.is_empty() {
        output::field("homepage", &formula.homepage);
    }
    if !formula.license.is_empty() {
        output::field("license", &formula.license);
    }
    output::field("source", &formula.source_url());
    output::field("checksum", &formula.checksum);
    if let Some(binary) = formula.test_binary() {
        output::field("test", binary);
    }

    if !formula.dependencies.is_empty() {
        println!();
        println!("{}", "Dependencies:".bold());
        for dep in &formula.dependencies {
            println!("  {} {} {}", "-".cyan(), dep.name, format!("({})", dep.kind).dimmed());
        }
    }
}
