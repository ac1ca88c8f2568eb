//! protogen CLI
//!
//! Usage:
//!   protogen [OPTIONS] <MODEL> [OUTPUT]
//!
//! Options:
//!   -p, --param <NAME=VALUE>  Override a root parameter (repeatable)
//!   -c, --config <FILE>       Settings file (TOML format)
//!   -o, --output <PATH>       Output file or directory, same as OUTPUT
//!   -d, --debug               Log every loaded block and its cursor
//!   --print                   Write the model to stdout instead of a file
//!   -h, --help                Print help

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use protogen::{load_model, resolve_output_path, write_artifact, GenerateError, Settings};

#[derive(Parser)]
#[command(name = "protogen")]
#[command(about = "Generate Caffe prototxt models from composable templates")]
struct Cli {
    /// Root YAML file of the model
    model: PathBuf,

    /// Output file or directory (defaults to the current directory)
    output: Option<PathBuf>,

    /// Output file or directory, same as OUTPUT
    #[arg(short = 'o', long = "output", value_name = "PATH", conflicts_with = "output")]
    output_path: Option<PathBuf>,

    /// Override a root parameter
    #[arg(short, long = "param", value_name = "NAME=VALUE", value_parser = parse_param)]
    params: Vec<(String, String)>,

    /// Settings file (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Debug mode: log every loaded block and its output cursor
    #[arg(short, long)]
    debug: bool,

    /// Write the generated model to stdout
    #[arg(long)]
    print: bool,
}

fn main() {
    let cli = Cli::parse();

    // Load settings
    let settings = match &cli.config {
        Some(path) => match Settings::from_file(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Error loading settings '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => Settings::default(),
    };

    init_logging(cli.debug, settings.logging.level.as_deref());

    let mut config = match settings.into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    for (name, value) in cli.params {
        config = config.with_param(name, value);
    }

    // Render fully before touching the output
    let model = match load_model(&cli.model, &config) {
        Ok(model) => model,
        Err(e) => {
            report(&e);
            std::process::exit(1);
        }
    };
    let text = model.generate();

    if cli.print {
        print!("{}", text);
        return;
    }

    let output = cli.output.or(cli.output_path).unwrap_or_default();
    let target = resolve_output_path(&output, model.name());
    match write_artifact(&target, &text) {
        Ok(()) => println!("Model generated: {}", target.display()),
        Err(e) => {
            report(&e);
            std::process::exit(1);
        }
    }
}

fn init_logging(debug: bool, level: Option<&str>) {
    let level = if debug { "debug" } else { level.unwrap_or("warn") };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn report(err: &GenerateError) {
    if let GenerateError::Expression { block, expr, source } = err {
        let label = if block.is_empty() {
            "<expression>".to_string()
        } else {
            format!("<{}>", block)
        };
        eprint!("{}", source.format(expr, &label));
    }
    eprintln!("Error: {}", err);
}

fn parse_param(arg: &str) -> Result<(String, String), String> {
    match arg.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected NAME=VALUE, got '{}'", arg)),
    }
}
