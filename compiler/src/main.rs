use std::collections::BTreeSet;
use std::path::PathBuf;

use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use smlc::component::ComponentKind;
use smlc::diag::{ErrorKind, TranslateError};
use smlc::network::TranslateOptions;
use smlc::observe::TracingObserver;
use smlc::pipeline::{self, Provenance};

#[derive(Debug, Clone, clap::ValueEnum)]
enum EmitStage {
    Json,
    Code,
    BuildInfo,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum KindArg {
    NeuronBody,
    Postsynaptic,
    WeightUpdate,
}

impl From<KindArg> for ComponentKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::NeuronBody => ComponentKind::NeuronBody,
            KindArg::Postsynaptic => ComponentKind::Postsynaptic,
            KindArg::WeightUpdate => ComponentKind::WeightUpdate,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "smlc",
    version,
    about = "SpineML model compiler: translates hybrid-automaton models into token-annotated simulation code"
)]
struct Cli {
    /// Low-level network document, or a component document with --kind
    source: PathBuf,

    /// Output file path (stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output stage
    #[arg(long, value_enum, default_value_t = EmitStage::Json)]
    emit: EmitStage,

    /// Simulation timestep in milliseconds
    #[arg(long, default_value_t = 0.1)]
    dt: f64,

    /// Translate a single component of this kind instead of a network
    #[arg(long, value_enum)]
    kind: Option<KindArg>,

    /// Parameter to treat as a model variable (repeatable, with --kind)
    #[arg(long = "variable")]
    variables: Vec<String>,

    /// Log translation details to stderr
    #[arg(long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "smlc=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn exit_with(err: &TranslateError) -> ! {
    eprintln!("smlc: {}", err);
    std::process::exit(if err.kind() == ErrorKind::Io { 2 } else { 1 });
}

fn to_json<T: Serialize>(value: &T) -> String {
    match serde_json::to_string_pretty(value) {
        Ok(mut json) => {
            json.push('\n');
            json
        }
        Err(e) => {
            eprintln!("smlc: error: cannot serialize output: {}", e);
            std::process::exit(1);
        }
    }
}

fn render<T: Serialize>(emit: &EmitStage, value: &T, code: String, provenance: &Provenance) -> String {
    match emit {
        EmitStage::Json => to_json(value),
        EmitStage::Code => code,
        EmitStage::BuildInfo => to_json(provenance),
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.dt.is_nan() || cli.dt <= 0.0 {
        eprintln!("smlc: error: --dt must be positive, got {}", cli.dt);
        std::process::exit(2);
    }

    tracing::debug!(source = %cli.source.display(), emit = ?cli.emit, "starting");
    let mut observer = TracingObserver;

    let text = match cli.kind {
        Some(kind) => {
            let variable_params: BTreeSet<String> = cli.variables.iter().cloned().collect();
            match pipeline::translate_component_file(
                &cli.source,
                kind.into(),
                &variable_params,
                &mut observer,
            ) {
                Ok((component, provenance)) => {
                    render(&cli.emit, &component, component.code_listing(), &provenance)
                }
                Err(e) => exit_with(&e),
            }
        }
        None => {
            if !cli.variables.is_empty() {
                tracing::warn!("--variable is ignored without --kind");
            }
            let options = TranslateOptions { dt: cli.dt };
            match pipeline::translate_network_file(&cli.source, &options, &mut observer) {
                Ok((plan, provenance)) => render(
                    &cli.emit,
                    &plan,
                    pipeline::network_code_listing(&plan),
                    &provenance,
                ),
                Err(e) => exit_with(&e),
            }
        }
    };

    match &cli.output {
        Some(path) => {
            if let Err(e) = std::fs::write(path, text) {
                eprintln!("smlc: error: {}: {}", path.display(), e);
                std::process::exit(2);
            }
        }
        None => print!("{}", text),
    }
}
