//! CLI for building, inspecting, and querying index files.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use annforest::persistence::image;
use annforest::{compiled_features, AnnIndex, DistanceMetric, DEFAULT_LEAF_CAPACITY};

#[derive(Parser)]
#[command(name = "annforest")]
#[command(about = "Approximate nearest-neighbor search over vector files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Clone, Copy)]
enum MetricArg {
    Euclidean,
    Angular,
    Manhattan,
    Dot,
    Hamming,
}

impl From<MetricArg> for DistanceMetric {
    fn from(arg: MetricArg) -> Self {
        match arg {
            MetricArg::Euclidean => DistanceMetric::Euclidean,
            MetricArg::Angular => DistanceMetric::Angular,
            MetricArg::Manhattan => DistanceMetric::Manhattan,
            MetricArg::Dot => DistanceMetric::Dot,
            MetricArg::Hamming => DistanceMetric::Hamming,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Build an index from a text file of vectors (one per line, comma-separated)
    Build {
        /// Input vector file
        input: PathBuf,
        /// Output index file
        output: PathBuf,
        /// Vector dimension
        #[arg(long)]
        dim: usize,
        /// Distance metric
        #[arg(long, value_enum, default_value = "euclidean")]
        metric: MetricArg,
        /// Number of trees in the forest
        #[arg(long, default_value = "10")]
        trees: usize,
        /// Random seed for reproducible builds
        #[arg(long)]
        seed: Option<u64>,
        /// Maximum items per leaf node
        #[arg(long, default_value_t = DEFAULT_LEAF_CAPACITY)]
        leaf_capacity: usize,
    },
    /// Query an index file for nearest neighbors
    Query {
        /// Index file
        index: PathBuf,
        /// Vector dimension the index was built with
        #[arg(long)]
        dim: usize,
        /// Distance metric the index was built with
        #[arg(long, value_enum, default_value = "euclidean")]
        metric: MetricArg,
        /// Query vector as comma-separated values (e.g. "1.0,2.0,3.0")
        #[arg(long, conflicts_with = "item")]
        vector: Option<String>,
        /// Query by an existing item id instead of a vector
        #[arg(long)]
        item: Option<u32>,
        /// Number of neighbors to return
        #[arg(short, long, default_value = "5")]
        k: usize,
        /// Candidate budget (default: trees * k)
        #[arg(long)]
        search_k: Option<usize>,
        /// Emit results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the header of an index file
    Info {
        /// Index file
        index: PathBuf,
        /// Emit as JSON
        #[arg(long)]
        json: bool,
    },
}

fn parse_vector(s: &str) -> Result<Vec<f32>> {
    s.split(',')
        .map(|x| {
            x.trim()
                .parse::<f32>()
                .with_context(|| format!("invalid float: {x:?}"))
        })
        .collect()
}

fn cmd_build(
    input: PathBuf,
    output: PathBuf,
    dim: usize,
    metric: DistanceMetric,
    trees: usize,
    seed: Option<u64>,
    leaf_capacity: usize,
) -> Result<()> {
    let mut index = AnnIndex::with_leaf_capacity(dim, metric, leaf_capacity);
    if let Some(seed) = seed {
        index.set_seed(seed)?;
    }

    let text = fs::read_to_string(&input)
        .with_context(|| format!("reading {}", input.display()))?;
    let mut next_id = 0u32;
    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let vector =
            parse_vector(line).with_context(|| format!("line {}", line_no + 1))?;
        index.add_item(next_id, &vector)?;
        next_id += 1;
    }

    index.build(trees)?;
    index.save(&output)?;
    println!(
        "Built index: {} items, {} trees -> {}",
        index.item_count(),
        trees,
        output.display()
    );
    Ok(())
}

fn cmd_query(
    path: PathBuf,
    dim: usize,
    metric: DistanceMetric,
    vector: Option<String>,
    item: Option<u32>,
    k: usize,
    search_k: Option<usize>,
    json: bool,
) -> Result<()> {
    let index = AnnIndex::load(&path, dim, metric)?;

    let results = match (vector, item) {
        (Some(v), None) => {
            let query = parse_vector(&v)?;
            index.nearest_by_vector(&query, k, search_k)?
        }
        (None, Some(id)) => index.nearest_by_item(id, k, search_k)?,
        _ => bail!("provide exactly one of --vector or --item"),
    };

    if json {
        let rows: Vec<_> = results
            .iter()
            .map(|n| serde_json::json!({ "id": n.id, "distance": n.distance }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else if results.is_empty() {
        println!("No results found (index is empty)");
    } else {
        println!("Top {} results:", results.len());
        for (i, n) in results.iter().enumerate() {
            println!("{}. {} (distance: {:.4})", i + 1, n.id, n.distance);
        }
    }
    Ok(())
}

fn cmd_info(path: PathBuf, json: bool) -> Result<()> {
    let header = image::peek_header(&path)?;
    if json {
        let info = serde_json::json!({
            "version": header.version,
            "metric": header.metric,
            "dimension": header.dimension,
            "item_count": header.item_count,
            "tree_count": header.tree_count,
            "seed": header.seed,
            "compiled_features": compiled_features(),
        });
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!("format version: {}", header.version);
        println!("metric:         {:?}", header.metric);
        println!("dimension:      {}", header.dimension);
        println!("items:          {}", header.item_count);
        println!("trees:          {}", header.tree_count);
        println!("seed:           {}", header.seed);
        println!("cpu features:   {}", compiled_features().join(", "));
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            input,
            output,
            dim,
            metric,
            trees,
            seed,
            leaf_capacity,
        } => cmd_build(input, output, dim, metric.into(), trees, seed, leaf_capacity),
        Commands::Query {
            index,
            dim,
            metric,
            vector,
            item,
            k,
            search_k,
            json,
        } => cmd_query(index, dim, metric.into(), vector, item, k, search_k, json),
        Commands::Info { index, json } => cmd_info(index, json),
    }
}
