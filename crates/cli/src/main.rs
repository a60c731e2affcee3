//! VM placement controller CLI.
//!
//! This binary runs a placement policy against a scenario file under the
//! deterministic replay harness and prints the end-of-run report:
//! 1. **Scenario:** A JSON cluster + workload trace (see
//!    `vmplace_core::sim::Scenario`).
//! 2. **Config:** Optional JSON configuration; built-in defaults otherwise.
//! 3. **Policy:** Selected in the config file or overridden on the command
//!    line.

use std::path::PathBuf;
use std::{fs, process};

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use vmplace_core::config::Config;
use vmplace_core::engine::Controller;
use vmplace_core::policy::PolicyKind;
use vmplace_core::sim::{ReplayCluster, Scenario};

#[derive(Parser, Debug)]
#[command(
    name = "vmplace",
    author,
    version,
    about = "Power- and SLA-aware VM placement controller",
    long_about = "Replay a scenario (machines + task trace) through a placement policy and \
                  report per-SLA violations and cluster energy.\n\nExamples:\n  \
                  vmplace scenarios/threehost.json\n  \
                  vmplace scenarios/threehost.json --policy eeco\n  \
                  vmplace scenarios/threehost.json --config configs/pmapper.json"
)]
struct Cli {
    /// Scenario file (JSON).
    scenario: PathBuf,

    /// Configuration file (JSON). Built-in defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured placement policy.
    #[arg(short, long, value_enum)]
    policy: Option<PolicyArg>,
}

/// Command-line policy names.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum PolicyArg {
    /// First-fit placement with aggressive consolidation.
    Greedy,
    /// Energy-ordered placement with median-targeted consolidation.
    Pmapper,
    /// Two-pool (fully-on / idle) placement.
    Eeco,
}

impl From<PolicyArg> for PolicyKind {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Greedy => PolicyKind::Greedy,
            PolicyArg::Pmapper => PolicyKind::PMapper,
            PolicyArg::Eeco => PolicyKind::EEco,
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(path) => match load_config(&path) {
            Ok(config) => config,
            Err(message) => fail(&message),
        },
        None => Config::default(),
    };
    if let Some(policy) = cli.policy {
        config.policy = policy.into();
    }

    let scenario = match load_scenario(&cli.scenario) {
        Ok(scenario) => scenario,
        Err(message) => fail(&message),
    };

    let mut cluster = match ReplayCluster::new(&scenario, &config) {
        Ok(cluster) => cluster,
        Err(err) => fail(&err.to_string()),
    };
    let mut controller = Controller::new(config);
    controller.init(&mut cluster);
    if let Err(err) = cluster.drive(&mut controller) {
        fail(&err.to_string());
    }
}

fn load_config(path: &PathBuf) -> Result<Config, String> {
    let text = fs::read_to_string(path)
        .map_err(|err| format!("cannot read config {}: {err}", path.display()))?;
    serde_json::from_str(&text)
        .map_err(|err| format!("cannot parse config {}: {err}", path.display()))
}

fn load_scenario(path: &PathBuf) -> Result<Scenario, String> {
    let text = fs::read_to_string(path)
        .map_err(|err| format!("cannot read scenario {}: {err}", path.display()))?;
    Scenario::from_json(&text)
        .map_err(|err| format!("cannot parse scenario {}: {err}", path.display()))
}

fn fail(message: &str) -> ! {
    eprintln!("error: {message}");
    process::exit(1);
}
