//! Command line front end for the bill of materials calculator.
//!
//! ```bash
//! eve-bom materials "Rifter"
//! eve-bom resolve "Rifter"
//! eve-bom copy "Rifter" --layers leaf
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;

use eve_bom::aggregate::{format_quantity, AggregateMode, MaterialTotals};
use eve_bom::bom_tree::{BomTree, Breakdown, ExpansionNode};
use eve_bom::error::AppError;
use eve_bom::loader::CatalogLoader;
use eve_bom::{AppState, Config, DatasetSource};

#[derive(Parser)]
#[command(name = "eve-bom")]
#[command(version)]
#[command(about = "Expand an item into its full manufacturing bill of materials")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding invTypes.json, industryActivityMaterials.json and marketGroups.json
    #[arg(long, global = true, conflicts_with = "data_url")]
    data_dir: Option<PathBuf>,

    /// Base URL serving the same dataset files
    #[arg(long, global = true)]
    data_url: Option<String>,

    /// Output format
    #[arg(long, short = 'o', global = true, default_value = "text", value_enum)]
    format: OutputFormat,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Layers {
    All,
    Parent,
    Leaf,
}

impl From<Layers> for AggregateMode {
    fn from(layers: Layers) -> Self {
        match layers {
            Layers::All => AggregateMode::All,
            Layers::Parent => AggregateMode::Intermediate,
            Layers::Leaf => AggregateMode::Leaf,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show the direct manufacturing materials of an item
    Materials { name: String },

    /// Resolve every layer of the bill of materials
    Resolve { name: String },

    /// Print summed quantities for export
    Copy {
        name: String,

        /// Which layers to sum
        #[arg(long, default_value = "all", value_enum)]
        layers: Layers,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let config = match (cli.data_url.clone(), cli.data_dir.clone()) {
        (Some(url), _) => Config::new(DatasetSource::Remote(url)),
        (None, Some(dir)) => Config::new(DatasetSource::Directory(dir)),
        (None, None) => Config::from_env(),
    };
    let state = AppState::new(CatalogLoader::new(config));

    match run(&cli, &state).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli, state: &AppState) -> Result<(), AppError> {
    match &cli.command {
        Commands::Materials { name } => {
            let breakdown = eve_bom::lookup_materials(name, state).await?;
            match cli.format {
                OutputFormat::Json => print_json(&breakdown),
                OutputFormat::Text => print_breakdown(&breakdown),
            }
        }
        Commands::Resolve { name } => {
            eve_bom::lookup_materials(name, state).await?;
            let tree = eve_bom::resolve_all_layers(state).await?;
            match cli.format {
                OutputFormat::Json => print_json(&tree),
                OutputFormat::Text => print_tree(&tree),
            }
        }
        Commands::Copy { name, layers } => {
            let breakdown = eve_bom::lookup_materials(name, state).await?;
            if breakdown.has_deeper_layers {
                eve_bom::resolve_all_layers(state).await?;
            }
            let totals = eve_bom::copy_layers((*layers).into(), state).await?;
            match cli.format {
                OutputFormat::Json => print_json(&totals),
                OutputFormat::Text => print_totals(&totals),
            }
        }
    }

    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize output: {}", e),
    }
}

fn print_breakdown(breakdown: &Breakdown) {
    println!("Materials for {}", breakdown.root_name);
    for node in &breakdown.direct_materials {
        println!("{} x{}", node.name, format_quantity(node.quantity));
    }
    if breakdown.has_deeper_layers {
        println!();
        println!("Further layers available, run `eve-bom resolve` to expand them.");
    }
}

fn print_tree(tree: &BomTree) {
    println!("Resolved Materials for {}", tree.root.name);
    for node in &tree.materials {
        print_node(node);
    }
}

fn print_node(node: &ExpansionNode) {
    println!(
        "{}{} x{}",
        "  ".repeat(node.depth as usize),
        node.name,
        format_quantity(node.quantity)
    );
    for child in &node.children {
        print_node(child);
    }
}

fn print_totals(totals: &MaterialTotals) {
    if !totals.is_empty() {
        println!("{}", totals.to_export_text());
    }
}
