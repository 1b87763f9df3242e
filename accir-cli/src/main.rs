//! ACCIR - Accumulator Assembly to IR
//! Command-line interface for compiling, checking and running assembly programs

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use accir_core::config::CONFIG_FILE_NAME;
use accir_core::{Compilation, Compiler, Config, Errors, Executor, Opcode, ProgramStats, Warning};
use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "accir")]
#[command(author = "ACCIR Contributors")]
#[command(version = "2026.10.16")]
#[command(about = "ACCIR - accumulator assembly to basic-block IR", long_about = None)]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (default: nearest accir.toml above the input)
    #[arg(long, global = true, value_name = "PATH", env = "ACCIR_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile assembly to IR
    Compile {
        /// Input assembly file (use - for stdin)
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output file (default: INPUT with .ll or .json extension)
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,

        /// Print the output to stdout
        #[arg(short, long)]
        print: bool,

        /// Output format
        #[arg(long, value_enum, default_value = "ir")]
        emit: Emit,

        /// Module identifier (overrides accir.toml)
        #[arg(long, value_name = "NAME")]
        module_name: Option<String>,

        /// Emitted function name (overrides accir.toml)
        #[arg(long, value_name = "NAME")]
        function_name: Option<String>,
    },

    /// Check a program without writing output
    Check {
        /// Input assembly file (use - for stdin)
        #[arg(value_name = "INPUT")]
        input: PathBuf,
    },

    /// Show program statistics
    Analyze {
        /// Input assembly file (use - for stdin)
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compile and execute a program
    Run {
        /// Input assembly file (use - for stdin)
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Maximum executed IR instructions (overrides accir.toml)
        #[arg(long, value_name = "N")]
        step_limit: Option<usize>,
    },

    /// Show information about the language
    Info,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Emit {
    /// Textual IR (.ll)
    Ir,
    /// JSON dump of the module
    Json,
}

impl Emit {
    fn extension(&self) -> &'static str {
        match self {
            Emit::Ir => "ll",
            Emit::Json => "json",
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config_path = cli.config.as_deref();
    let result = match cli.command {
        Commands::Compile {
            input,
            output,
            print,
            emit,
            module_name,
            function_name,
        } => load_config(config_path, &input).and_then(|mut config| {
            if let Some(name) = module_name {
                config.module.module_name = name;
            }
            if let Some(name) = function_name {
                config.module.function_name = name;
            }
            config.validate()?;
            compile_command(&input, output.as_deref(), print, emit, &config)
        }),
        Commands::Check { input } => {
            load_config(config_path, &input).and_then(|config| check_command(&input, &config))
        }
        Commands::Analyze { input, json } => analyze_command(&input, json),
        Commands::Run { input, step_limit } => load_config(config_path, &input).and_then(|mut config| {
            if let Some(limit) = step_limit {
                config.run.step_limit = limit;
            }
            config.validate()?;
            run_command(&input, &config)
        }),
        Commands::Info => {
            print_info();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "accir_core=debug,accir=debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn is_stdin(input: &Path) -> bool {
    input.as_os_str() == "-"
}

fn read_source(input: &Path) -> Result<String> {
    if is_stdin(input) {
        let mut source = String::new();
        io::stdin()
            .read_to_string(&mut source)
            .context("Failed to read stdin")?;
        return Ok(source);
    }
    fs::read_to_string(input).with_context(|| format!("Failed to read {}", input.display()))
}

fn display_name(input: &Path) -> String {
    if is_stdin(input) {
        "<stdin>".to_string()
    } else {
        input.display().to_string()
    }
}

/// Explicit --config, else the nearest accir.toml, else defaults
fn load_config(explicit: Option<&Path>, input: &Path) -> Result<Config> {
    if let Some(path) = explicit {
        return Ok(Config::from_file(path)?);
    }

    let start = if is_stdin(input) {
        std::env::current_dir().context("Failed to read current directory")?
    } else {
        match input.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    };

    match Config::locate(&start) {
        Some(path) => {
            debug!(path = %path.display(), "using {}", CONFIG_FILE_NAME);
            Ok(Config::from_file(&path)?)
        }
        None => Ok(Config::default()),
    }
}

fn report_warnings(warnings: &[Warning]) {
    for warning in warnings {
        eprintln!("{} {}", "warning:".yellow().bold(), warning);
    }
}

/// Print every diagnostic, then fail with a summary
fn report_errors(errors: &Errors, input: &Path) -> anyhow::Error {
    for error in errors {
        eprintln!(
            "{} {}",
            format!("error[{}]:", error.code()).red().bold(),
            error
        );
    }
    anyhow!(
        "could not compile {} due to {} previous error(s)",
        display_name(input),
        errors.len()
    )
}

fn compile_source(input: &Path, config: &Config) -> Result<Compilation> {
    let source = read_source(input)?;
    let compiler = Compiler::with_options(config.module.clone());
    let compilation = compiler
        .compile(&source)
        .map_err(|errors| report_errors(&errors, input))?;
    report_warnings(&compilation.warnings);
    Ok(compilation)
}

fn compile_command(
    input: &Path,
    output: Option<&Path>,
    print: bool,
    emit: Emit,
    config: &Config,
) -> Result<()> {
    let to_stdout = is_stdin(input) && output.is_none();
    if !to_stdout {
        eprintln!("{} {}", "Compiling".green().bold(), display_name(input).cyan());
    }

    let compilation = compile_source(input, config)?;
    let rendered = match emit {
        Emit::Ir => compilation.module.to_string(),
        Emit::Json => compilation
            .module
            .to_json()
            .context("Failed to serialize module")?,
    };

    if print || to_stdout {
        io::stdout()
            .write_all(rendered.as_bytes())
            .context("Failed to write stdout")?;
    }
    if to_stdout {
        return Ok(());
    }

    let output_path = match output {
        Some(path) => path.to_path_buf(),
        None => input.with_extension(emit.extension()),
    };
    fs::write(&output_path, &rendered)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    eprintln!(
        "{} {}",
        "   Created".green().bold(),
        output_path.display().to_string().cyan()
    );
    eprintln!("{}", "    Finished".green().bold());
    Ok(())
}

fn check_command(input: &Path, config: &Config) -> Result<()> {
    eprintln!("{} {}", "Checking".green().bold(), display_name(input).cyan());

    let compilation = compile_source(input, config)?;
    let module = &compilation.module;
    println!(
        "{} {} block(s), {} global(s), {} warning(s)",
        "✓".green(),
        module.blocks().len(),
        module.globals.len(),
        compilation.warnings.len()
    );
    Ok(())
}

fn analyze_command(input: &Path, json: bool) -> Result<()> {
    let source = read_source(input)?;
    let program = accir_core::parse(&source).map_err(|errors| report_errors(&errors, input))?;
    let stats = ProgramStats::from_program(&program);

    if json {
        let text = serde_json::to_string_pretty(&stats).context("Failed to serialize statistics")?;
        println!("{}", text);
    } else {
        println!("{} {}", "Program analysis:".bold(), display_name(input).cyan());
        println!("{}", stats);
    }
    Ok(())
}

fn run_command(input: &Path, config: &Config) -> Result<()> {
    let compilation = compile_source(input, config)?;
    eprintln!("{} {}", "Running".green().bold(), display_name(input).cyan());

    let execution = Executor::new(&compilation.module)
        .with_step_limit(config.run.step_limit)
        .run()
        .map_err(|e| anyhow!("[{}] {}", e.code(), e))?;

    println!("{}", execution);
    Ok(())
}

fn print_info() {
    println!("{}", "ACCIR - Accumulator Assembly to IR".bold());
    println!();
    println!("Lowers symbolic accumulator assembly to a basic-block IR with explicit terminators.");
    println!();
    println!("{}", "Opcodes:".bold());
    for opcode in Opcode::ALL {
        println!("  {}", opcode.synopsis());
    }
    println!();
    println!("{}", "Directives:".bold());
    println!("  START [addr]       start address (informational)");
    println!("  END                stop reading the source");
    println!("  NAME DC value      32-bit constant");
    println!("  NAME DS count      zero-initialised storage (lowered as a scalar)");
    println!();
    println!("{}", "Semantics:".bold());
    println!("  • single accumulator AREG, 32-bit two's-complement wraparound");
    println!("  • COMP computes the signed predicate AREG >= src (icmp sge)");
    println!("  • BC after COMP branches to the label or to exit, otherwise jumps");
    println!();
    println!("{}", "Commands:".bold());
    println!("  accir compile prog.asm           # Write prog.ll");
    println!("  accir compile prog.asm -p        # Compile and print");
    println!("  accir compile - < prog.asm       # stdin to stdout");
    println!("  accir check prog.asm             # Diagnostics only");
    println!("  accir analyze prog.asm --json    # Program statistics");
    println!("  accir run prog.asm               # Compile and execute");
    println!();
    println!("Configuration is read from the nearest {}.", CONFIG_FILE_NAME);
}
