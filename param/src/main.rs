use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use pparam::argument;
use pparam::config::{ConfigError, Declarations};
use pparam::registry::InstanceRegistry;

#[derive(Debug, Clone, clap::ValueEnum)]
enum EmitStage {
    Manifest,
    Table,
    Fingerprint,
}

#[derive(Parser, Debug)]
#[command(
    name = "pparam",
    version,
    about = "Builds pipeline parameters from a JSON declaration file and describes the pipeline's inputs"
)]
struct Cli {
    /// Input .json declaration file
    source: PathBuf,

    /// Output form
    #[arg(long, value_enum, default_value_t = EmitStage::Manifest)]
    emit: EmitStage,

    /// Also list parameters that are bound before lowering
    #[arg(long)]
    include_bound: bool,

    /// Log construction and registration at debug level
    #[arg(long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "pparam=debug" } else { "pparam=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // ── Load declarations ──
    let decls = match Declarations::load(&cli.source) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("pparam: error: {}", e);
            std::process::exit(2);
        }
    };

    let registry = InstanceRegistry::new();
    let params = match decls.build(Some(&registry)) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("pparam: error: {}", e);
            // Contract violations are 1; bad input (types, literals) is 2.
            let code = match e {
                ConfigError::Param(_) => 1,
                _ => 2,
            };
            std::process::exit(code);
        }
    };

    tracing::debug!(live = registry.len(), "parameters registered");

    // ── Select pipeline inputs ──
    let inputs = if cli.include_bound {
        Ok(params.clone())
    } else {
        argument::infer_arguments(&params)
    };
    let descs = match inputs.and_then(|ps| argument::describe_arguments(&ps)) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("pparam: {}", e.render());
            std::process::exit(1);
        }
    };

    // ── Emit ──
    let output = match cli.emit {
        EmitStage::Manifest => serde_json::to_string_pretty(&descs),
        EmitStage::Fingerprint => argument::signature_fingerprint(&descs),
        EmitStage::Table => Ok(argument::render_table(&descs)),
    };
    match output {
        Ok(text) => println!("{}", text.trim_end()),
        Err(e) => {
            eprintln!("pparam: error: {}", e);
            std::process::exit(1);
        }
    }
}
