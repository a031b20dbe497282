mod remote;
mod server;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use cm_core::{
    Family, PipelineConfig, PipelineOutput, Record, eps_for_similarity, export_json,
    normalize_records, pairwise, parse_records, run,
};
use cm_store::{AppConfig, DataDir, Store};
use uuid::Uuid;

use crate::remote::RemoteSource;

#[derive(Parser)]
#[command(name = "cm", about = "Cluster trigger/thought/response embeddings into a graph")]
struct Cli {
    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    /// Config file (default: <data-dir>/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data directory (default: $CM_DATA_DIR or ~/.clustermap)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Where a command reads records from. Defaults to the local store.
#[derive(Args, Debug, Default)]
struct SourceArgs {
    /// Read records from a JSON file instead of the local store
    #[arg(long, conflicts_with = "url")]
    input: Option<PathBuf>,

    /// Fetch records from a remote endpoint instead of the local store
    #[arg(long)]
    url: Option<String>,
}

#[derive(Args, Debug, Default)]
struct ClusterArgs {
    /// DBSCAN neighborhood radius
    #[arg(long, allow_negative_numbers = true)]
    eps: Option<f64>,

    /// Minimum neighborhood size for a dense point
    #[arg(long)]
    min_pts: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Import record JSON files into the local store
    Import {
        /// File path(s) to import
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Fetch records from the remote source into the local store
    Fetch {
        /// Endpoint URL (default: source.url from config)
        #[arg(long)]
        url: Option<String>,
    },

    /// Cluster records and write the graph JSON
    Build {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        cluster: ClusterArgs,

        /// Relax node positions within each column
        #[arg(long)]
        refine: bool,

        /// Seed for layout refinement
        #[arg(long)]
        seed: Option<u64>,

        /// Output file (default: stdout)
        #[arg(long, short)]
        out: Option<PathBuf>,
    },

    /// Print the clusters found in each family
    Clusters {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        cluster: ClusterArgs,
    },

    /// Print pairwise cosine similarity within one family
    Similarity {
        /// trigger, thought, or response
        #[arg(long, default_value = "response")]
        family: String,

        /// Only print the N most similar pairs
        #[arg(long)]
        top: Option<usize>,

        /// Also print the eps equivalent to this similarity
        #[arg(long, allow_negative_numbers = true)]
        threshold: Option<f64>,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Show store statistics
    Stats,

    /// Serve the graph JSON over HTTP
    Serve {
        /// Address to bind (host:port)
        #[arg(long, default_value = "127.0.0.1:7878")]
        addr: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = Settings::load(&cli)?;

    match &cli.command {
        Commands::Import { files } => cmd_import(&settings, files),
        Commands::Fetch { url } => cmd_fetch(&settings, url.as_deref()).await,
        Commands::Build {
            source,
            cluster,
            refine,
            seed,
            out,
        } => {
            let mut config = settings.pipeline(cluster);
            if *refine {
                config.refine.enabled = true;
            }
            if let Some(seed) = seed {
                config.refine.seed = *seed;
            }
            cmd_build(&settings, source, &config, out.as_deref()).await
        }
        Commands::Clusters { source, cluster } => {
            cmd_clusters(&settings, source, &settings.pipeline(cluster)).await
        }
        Commands::Similarity {
            family,
            top,
            threshold,
            source,
        } => cmd_similarity(&settings, source, family, *top, *threshold).await,
        Commands::Stats => cmd_stats(&settings),
        Commands::Serve { addr } => cmd_serve(&settings, addr).await,
    }
}

/// Resolved data directory plus the loaded config file.
struct Settings {
    data_dir: DataDir,
    config: AppConfig,
}

impl Settings {
    fn load(cli: &Cli) -> Result<Self> {
        let data_dir = DataDir::resolve(cli.data_dir.as_deref());
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.config_path());
        let config = AppConfig::load(&config_path).context("failed to load config")?;
        Ok(Self { data_dir, config })
    }

    /// Pipeline config from the file, with command-line overrides applied.
    fn pipeline(&self, overrides: &ClusterArgs) -> PipelineConfig {
        let mut config = self.config.pipeline.clone();
        if let Some(eps) = overrides.eps {
            config.clustering.eps = eps;
        }
        if let Some(min_pts) = overrides.min_pts {
            config.clustering.min_pts = min_pts;
        }
        config
    }

    fn open_store(&self) -> Result<Store> {
        Store::open(&self.data_dir.db_path()).context("failed to open record store")
    }

    fn remote(&self, url: Option<&str>) -> Result<RemoteSource> {
        let url = url
            .or(self.config.source.url.as_deref())
            .context("no source URL: pass --url or set source.url in config.toml")?;
        RemoteSource::new(url, &self.config.source)
    }

    async fn records(&self, source: &SourceArgs) -> Result<Vec<Record>> {
        if let Some(path) = &source.input {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            return parse_records(&json)
                .with_context(|| format!("invalid record JSON in {}", path.display()));
        }
        if let Some(url) = &source.url {
            return self.remote(Some(url.as_str()))?.fetch().await;
        }
        self.open_store()?
            .load_records()
            .context("failed to load records")
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

/// Validate, load, and run. Config errors surface before any records are read.
async fn build_graph(
    settings: &Settings,
    source: &SourceArgs,
    config: &PipelineConfig,
) -> Result<(Vec<Record>, PipelineOutput)> {
    config.validate().context("invalid pipeline configuration")?;
    let records = settings.records(source).await?;

    let run_id = Uuid::new_v4();
    let span = tracing::info_span!("run", %run_id);
    let _guard = span.enter();
    tracing::info!(
        "clustering {} records with eps={} min_pts={}",
        records.len(),
        config.clustering.eps,
        config.clustering.min_pts
    );

    let output = run(&records, config).context("invalid pipeline configuration")?;
    for diagnostic in &output.diagnostics {
        tracing::warn!("{diagnostic}");
    }
    if let Some(outcome) = output.refine
        && !outcome.converged
    {
        tracing::warn!(
            "layout refinement stopped after {} iterations with {} overlaps left",
            outcome.iterations,
            outcome.remaining_overlaps
        );
    }
    Ok((records, output))
}

fn cmd_import(settings: &Settings, files: &[PathBuf]) -> Result<()> {
    let store = settings.open_store()?;
    for path in files {
        let n = store
            .import_json_file(path)
            .with_context(|| format!("failed to import {}", path.display()))?;
        println!("imported {} → {n} records", path.display());
    }
    println!("done. records={}", store.count()?);
    Ok(())
}

async fn cmd_fetch(settings: &Settings, url: Option<&str>) -> Result<()> {
    let remote = settings.remote(url)?;
    let records = remote.fetch().await?;
    let store = settings.open_store()?;
    let n = store
        .upsert_records(&records, url.or(settings.config.source.url.as_deref()).unwrap_or("remote"))
        .context("failed to store fetched records")?;
    println!("fetched {n} records. records={}", store.count()?);
    Ok(())
}

async fn cmd_build(
    settings: &Settings,
    source: &SourceArgs,
    config: &PipelineConfig,
    out: Option<&Path>,
) -> Result<()> {
    let (_, output) = build_graph(settings, source, config).await?;
    let json = export_json(&output, config).context("failed to serialize graph")?;

    match out {
        Some(path) => {
            std::fs::write(path, &json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!(
                "wrote {} nodes, {} links to {}",
                output.graph.nodes.len(),
                output.graph.links.len(),
                path.display()
            );
        }
        None => println!("{json}"),
    }
    Ok(())
}

async fn cmd_clusters(
    settings: &Settings,
    source: &SourceArgs,
    config: &PipelineConfig,
) -> Result<()> {
    let (records, output) = build_graph(settings, source, config).await?;

    for fc in &output.clusters {
        println!(
            "{}: {} clusters ({} dense, {} noise)",
            fc.family,
            fc.clusters.len(),
            fc.dense,
            fc.noise()
        );
        for (cluster, members) in fc.clusters.iter().enumerate() {
            let color = output
                .graph
                .regions
                .iter()
                .find(|r| r.family == fc.family && r.cluster == cluster)
                .map(|r| r.color.as_str())
                .unwrap_or("-");
            let ids: Vec<&str> = members
                .iter()
                .filter_map(|&i| records.get(i).map(|r| r.id.as_str()))
                .collect();
            println!("  #{cluster} {color} [{}]", ids.join(", "));
        }
    }
    Ok(())
}

async fn cmd_similarity(
    settings: &Settings,
    source: &SourceArgs,
    family: &str,
    top: Option<usize>,
    threshold: Option<f64>,
) -> Result<()> {
    let family = Family::parse(family)
        .with_context(|| format!("unknown family '{family}' (trigger, thought, response)"))?;
    let records = settings.records(source).await?;

    let normalized = normalize_records(&records);
    let vectors = normalized
        .iter()
        .find(|n| n.family == family)
        .map(|n| n.vectors.as_slice())
        .unwrap_or_default();
    for issue in normalized
        .iter()
        .filter(|n| n.family == family)
        .flat_map(|n| &n.issues)
    {
        tracing::warn!("skipping {family} embedding at index {}: {}", issue.index, issue.issue);
    }

    let mut pairs = pairwise(vectors);
    pairs.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    if let Some(top) = top {
        pairs.truncate(top);
    }

    for pair in &pairs {
        println!(
            "{}\t{}\t{:.4}",
            records[pair.left].id, records[pair.right].id, pair.similarity
        );
    }
    println!("{family}: {} comparable pairs", pairs.len());
    if let Some(s) = threshold {
        println!("eps for similarity {s}: {:.4}", eps_for_similarity(s));
    }
    Ok(())
}

fn cmd_stats(settings: &Settings) -> Result<()> {
    let store = settings.open_store()?;
    let last_import = store.get_metadata("last_import_at")?;
    let last_source = store.get_metadata("last_import_source")?;

    println!("data_dir:    {}", settings.data_dir.base().display());
    println!("records:     {}", store.count()?);
    println!("db_size:     {:.1}MB", store.db_size() as f64 / (1024.0 * 1024.0));
    println!(
        "last_import: {} ({})",
        last_import.as_deref().unwrap_or("never"),
        last_source.as_deref().unwrap_or("-")
    );
    let params = settings.config.pipeline.clustering;
    println!("params:      eps={} min_pts={}", params.eps, params.min_pts);
    Ok(())
}

async fn cmd_serve(settings: &Settings, addr: &str) -> Result<()> {
    settings
        .config
        .pipeline
        .validate()
        .context("invalid pipeline configuration")?;
    let store = settings.open_store()?;
    tracing::info!("serving {} records", store.count()?);
    let state = server::AppState::new(store, settings.config.pipeline.clone());
    server::serve(state, addr).await
}
