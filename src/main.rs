//! plotgraph CLI — turn a CSV file and a request into a Vega-Lite chart.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use plotgraph_agent::{Graph, Interpreter, PlotgraphConfig};
use plotgraph_llm::OpenAiProvider;
use plotgraph_shells::{profile_csv, ShellRegistry};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "plotgraph", version = env!("CARGO_PKG_VERSION"), about = "Graph-driven chart planner: dataset + request -> validated Vega-Lite")]
struct Cli {
    /// Config file (TOML). Missing files fall back to defaults.
    #[arg(short, long, global = true, default_value = "plotgraph.toml")]
    config: PathBuf,

    /// Log as JSON lines
    #[arg(long, global = true, default_value_t = false)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a graph against a CSV dataset
    Run {
        /// CSV dataset
        #[arg(long)]
        csv: PathBuf,

        /// What the chart should show
        #[arg(short, long)]
        prompt: String,

        /// Graph file (YAML or JSON). Defaults to the builtin chart graph.
        #[arg(short, long)]
        graph: Option<PathBuf>,

        /// Override the configured model
        #[arg(long)]
        model: Option<String>,

        /// Override the configured step ceiling
        #[arg(long)]
        max_steps: Option<usize>,

        /// Print the run trace as YAML after the output
        #[arg(long, default_value_t = false)]
        trace: bool,
    },
    /// Profile a CSV dataset
    Profile {
        csv: PathBuf,
    },
    /// List the registered chart shells
    Shells,
    /// Load and check a graph without running it
    Check {
        graph: PathBuf,
    },
    /// Print the effective config as TOML
    Config,
}

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "plotgraph=info,plotgraph_agent=info".into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_graph(path: Option<&Path>) -> anyhow::Result<Graph> {
    let graph = match path {
        Some(p) => Graph::load(p).with_context(|| format!("loading graph {}", p.display()))?,
        None => Graph::default_chart()?,
    };
    Ok(graph)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_json);
    let mut config = PlotgraphConfig::load(&cli.config);

    match cli.command {
        Command::Run {
            csv,
            prompt,
            graph,
            model,
            max_steps,
            trace,
        } => {
            if let Some(model) = model {
                config.llm.model = model;
            }
            if let Some(max_steps) = max_steps {
                config.run.max_steps = max_steps;
            }
            let Some(api_key) = config.llm.api_key() else {
                bail!("{} must be set", config.llm.api_key_env);
            };
            let text = std::fs::read_to_string(&csv).with_context(|| format!("reading {}", csv.display()))?;
            let dataset_path = csv.canonicalize().unwrap_or(csv);

            let graph = load_graph(graph.as_deref())?;
            info!(csv = %dataset_path.display(), model = %config.llm.model, max_steps = config.run.max_steps, "starting run");
            let provider = Arc::new(OpenAiProvider::new(api_key).with_base_url(&config.llm.base_url));
            let interpreter = Interpreter::from_config(graph, provider, &config);

            let inputs = json!({
                "csv": text,
                "dataset_path": dataset_path.display().to_string(),
                "transcripts": [{ "role": "user", "content": prompt }],
            });
            let output = match config.run_timeout() {
                Some(timeout) => interpreter.run_with_timeout(inputs, timeout).await?,
                None => interpreter.run(inputs).await?,
            };

            println!("{}", serde_json::to_string_pretty(&output.output)?);
            if trace {
                println!("---\n{}", output.trace.to_yaml());
            }
            eprintln!("{}", output.trace.summary_line());
        }
        Command::Profile { csv } => {
            let text = std::fs::read_to_string(&csv).with_context(|| format!("reading {}", csv.display()))?;
            let profile = profile_csv(&text)?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
        Command::Shells => {
            let shells = ShellRegistry::builtin();
            for shell in shells.iter() {
                let analysis = shell.analysis.as_ref().map(|a| a.id.as_str()).unwrap_or("-");
                println!("{:<22} {:<22} analysis={}", shell.id, shell.name, analysis);
            }
            println!("\nTotal shells: {}", shells.len());
        }
        Command::Check { graph } => {
            let g = load_graph(Some(&graph))?;
            println!("✓ {} ({} nodes, start: {})", graph.display(), g.nodes.len(), g.start);
            for id in g.node_ids() {
                if let Some(node) = g.node(id) {
                    println!("  {:<10} {}", node.kind(), id);
                }
            }
        }
        Command::Config => {
            print!("{}", config.to_toml());
        }
    }

    Ok(())
}
