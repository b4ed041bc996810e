use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use huescope::models::messages::{Algorithm, Request, Response};
use huescope::models::taxonomy::HierarchyLevel;
use huescope::worker::PipelineWorker;

#[derive(Parser)]
#[command(name = "huescope")]
#[command(about = "Cluster a photo collection by dominant-color composition")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a corpus and run one clustering pass, printing the result as JSON
    Analyze {
        /// Image archive (tar or tar.gz), local path or http(s) URL
        #[arg(long)]
        archive: String,

        /// Taxonomy table JSON, local path or http(s) URL
        #[arg(long)]
        taxonomy: String,

        /// Dominant colors to extract per image
        #[arg(long, default_value_t = 8)]
        palette_size: u32,

        /// Hierarchy level: xkcd, design, common, or family
        #[arg(long, default_value = "family")]
        level: HierarchyLevel,

        /// Clustering algorithm: density or partition
        #[arg(long, default_value = "density")]
        algorithm: Algorithm,

        /// Neighborhood radius (eps) for the density algorithm
        #[arg(long, default_value_t = 0.25)]
        radius: f32,

        /// Minimum neighbor count (minPts) for the density algorithm
        #[arg(long, default_value_t = 2)]
        min_neighbors: u32,

        /// Cluster count for the partition algorithm
        #[arg(short, long, default_value_t = 5)]
        k: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "huescope=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            archive,
            taxonomy,
            palette_size,
            level,
            algorithm,
            radius,
            min_neighbors,
            k,
        } => {
            run_analyze(
                archive,
                taxonomy,
                palette_size,
                level,
                algorithm,
                radius,
                min_neighbors,
                k,
            )
            .await
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_analyze(
    archive: String,
    taxonomy: String,
    palette_size: u32,
    level: HierarchyLevel,
    algorithm: Algorithm,
    radius: f32,
    min_neighbors: u32,
    k: u32,
) -> anyhow::Result<()> {
    let mut handle = PipelineWorker::spawn(archive, taxonomy);

    handle
        .requests
        .send(Request::Init {
            desired_palette_size: palette_size,
        })
        .await?;

    while let Some(response) = handle.responses.recv().await {
        match response {
            Response::Progress { phase, done, total } => {
                if total == 0 && phase.contains("failed") {
                    anyhow::bail!("pipeline failure: {phase}");
                }
                tracing::debug!(phase, done, total, "progress");
            }
            Response::Ready {
                image_count,
                image_urls: _,
            } => {
                tracing::info!(image_count, "corpus ready, clustering");
                handle
                    .requests
                    .send(Request::RunCluster {
                        level,
                        algorithm,
                        radius,
                        min_neighbors,
                        k,
                        run_id: 1,
                    })
                    .await?;
            }
            result @ Response::ClusterResult { .. } => {
                println!("{}", serde_json::to_string_pretty(&result)?);
                return Ok(());
            }
        }
    }

    anyhow::bail!("pipeline worker exited without a result")
}
