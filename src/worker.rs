//! The pipeline worker: one logical task behind a message boundary.
//!
//! The worker owns all pipeline state and communicates exclusively through
//! channels: [`Request`] in, [`Response`] out. There is no shared mutable
//! state with the collaborator, and requests are handled one at a time, so
//! the distribution cache needs no locking: it has a single-writer build
//! phase and is read-only afterwards.
//!
//! Heavy work (fetch, decode, distribution build, clustering) runs on the
//! blocking thread pool so the worker task itself stays responsive.
//! Terminal errors are reported as Progress-shaped failure notifications
//! with a descriptive phase string; the worker itself never dies on a bad
//! request.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::{ClusterError, LoadError};
use crate::models::messages::{Algorithm, Request, Response};
use crate::models::taxonomy::{HierarchyLevel, Taxonomy};
use crate::services::distribution::DistributionCache;
use crate::services::{clustering, corpus_loader, distribution, summarizer};

/// Channel pair handed to the external collaborator.
pub struct WorkerHandle {
    pub requests: mpsc::Sender<Request>,
    pub responses: mpsc::Receiver<Response>,
}

/// State built by a successful initialization.
struct PipelineState {
    cache: Arc<DistributionCache>,
    image_urls: Vec<String>,
}

/// The background pipeline worker.
pub struct PipelineWorker {
    archive_source: String,
    taxonomy_source: String,
    state: Option<PipelineState>,
    tx: mpsc::Sender<Response>,
}

impl PipelineWorker {
    /// Spawn the worker task and return its message-boundary handle.
    ///
    /// `archive_source` and `taxonomy_source` are local paths or http(s)
    /// URLs; they are fetched when an `Init` request arrives.
    pub fn spawn(archive_source: impl Into<String>, taxonomy_source: impl Into<String>) -> WorkerHandle {
        let (req_tx, mut req_rx) = mpsc::channel::<Request>(32);
        let (resp_tx, resp_rx) = mpsc::channel::<Response>(256);

        let mut worker = PipelineWorker {
            archive_source: archive_source.into(),
            taxonomy_source: taxonomy_source.into(),
            state: None,
            tx: resp_tx,
        };

        tokio::spawn(async move {
            while let Some(request) = req_rx.recv().await {
                worker.handle(request).await;
            }
            tracing::debug!("request channel closed, pipeline worker exiting");
        });

        WorkerHandle {
            requests: req_tx,
            responses: resp_rx,
        }
    }

    async fn handle(&mut self, request: Request) {
        match request {
            Request::Init {
                desired_palette_size,
            } => self.handle_init(desired_palette_size).await,
            Request::RunCluster {
                level,
                algorithm,
                radius,
                min_neighbors,
                k,
                run_id,
            } => {
                self.handle_cluster(level, algorithm, radius, min_neighbors, k, run_id)
                    .await
            }
        }
    }

    async fn handle_init(&mut self, desired_palette_size: u32) {
        // Parameter errors are corrected by clamping, not reported
        let palette_size = desired_palette_size.max(1) as usize;
        let archive_source = self.archive_source.clone();
        let taxonomy_source = self.taxonomy_source.clone();
        let tx = self.tx.clone();

        // Re-initialization replaces any previous corpus wholesale
        self.state = None;

        let result = tokio::task::spawn_blocking(move || {
            initialize(&archive_source, &taxonomy_source, palette_size, &tx)
        })
        .await;

        match result {
            Ok(Ok(state)) => {
                let image_urls = state.image_urls.clone();
                let image_count = image_urls.len() as u32;
                self.state = Some(state);
                tracing::info!(image_count, "pipeline initialized");
                self.send(Response::Ready {
                    image_count,
                    image_urls,
                })
                .await;
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, phase = e.phase(), "initialization failed");
                self.fail(format!("{} failed: {e}", e.phase())).await;
            }
            Err(join_err) => {
                tracing::error!(error = %join_err, "initialization task aborted");
                self.fail(format!("initializing failed: {join_err}")).await;
            }
        }
    }

    async fn handle_cluster(
        &mut self,
        level: HierarchyLevel,
        algorithm: Algorithm,
        radius: f32,
        min_neighbors: u32,
        k: u32,
        run_id: u64,
    ) {
        let Some(state) = &self.state else {
            let e = ClusterError::NotReady;
            tracing::warn!(run_id, error = %e, "clustering request rejected");
            self.fail(format!("clustering failed: {e}")).await;
            return;
        };
        let cache = Arc::clone(&state.cache);

        let result = tokio::task::spawn_blocking(move || {
            // The run id doubles as the k-means seed, so repeating a
            // request reproduces its labels
            let labels = clustering::run(&cache, level, algorithm, radius, min_neighbors, k, run_id);
            let family_summary = summarizer::summarize(&labels, &cache);
            (labels, family_summary)
        })
        .await;

        match result {
            Ok((labels, family_summary)) => {
                tracing::debug!(
                    run_id,
                    level = %level,
                    clusters = family_summary.len(),
                    "clustering complete"
                );
                self.send(Response::ClusterResult {
                    labels,
                    level,
                    run_id,
                    family_summary,
                })
                .await;
            }
            Err(join_err) => {
                let e = ClusterError::TaskFailed(join_err.to_string());
                tracing::error!(run_id, error = %e, "clustering task aborted");
                self.fail(format!("clustering failed: {e}")).await;
            }
        }
    }

    /// Report a terminal failure as a Progress-shaped notification.
    async fn fail(&self, phase: String) {
        self.send(Response::Progress {
            phase,
            done: 0,
            total: 0,
        })
        .await;
    }

    async fn send(&self, response: Response) {
        if self.tx.send(response).await.is_err() {
            tracing::debug!("response channel closed, dropping message");
        }
    }
}

/// The 4.1 -> 4.4 initialization pipeline, run on the blocking pool.
fn initialize(
    archive_source: &str,
    taxonomy_source: &str,
    palette_size: usize,
    tx: &mpsc::Sender<Response>,
) -> Result<PipelineState, LoadError> {
    let taxonomy_bytes = corpus_loader::fetch_bytes(taxonomy_source)?;
    let taxonomy = Taxonomy::from_json(&taxonomy_bytes)?;

    let archive_bytes = corpus_loader::fetch_bytes(archive_source)?;
    let entries = corpus_loader::unpack_archive(&archive_bytes)?;

    let images = corpus_loader::decode_images(&entries, |done, total| {
        let _ = tx.blocking_send(Response::Progress {
            phase: "decoding".to_string(),
            done,
            total,
        });
    })?;

    let cache = distribution::build(&taxonomy, &images, palette_size, |done, total| {
        let _ = tx.blocking_send(Response::Progress {
            phase: "analyzing".to_string(),
            done,
            total,
        });
    })?;

    let image_urls = images.into_iter().map(|image| image.name).collect();
    Ok(PipelineState {
        cache: Arc::new(cache),
        image_urls,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cluster_before_init_is_rejected_but_worker_survives() {
        let mut handle = PipelineWorker::spawn("/nonexistent.tar.gz", "/nonexistent.json");
        handle
            .requests
            .send(Request::RunCluster {
                level: HierarchyLevel::Family,
                algorithm: Algorithm::Partition,
                radius: 0.0,
                min_neighbors: 0,
                k: 2,
                run_id: 1,
            })
            .await
            .unwrap();

        match handle.responses.recv().await.unwrap() {
            Response::Progress { phase, done, total } => {
                assert!(phase.starts_with("clustering failed"), "phase: {phase}");
                assert_eq!((done, total), (0, 0));
            }
            other => panic!("expected failure progress, got {other:?}"),
        }

        // The worker is still alive and answers further requests
        handle
            .requests
            .send(Request::RunCluster {
                level: HierarchyLevel::Family,
                algorithm: Algorithm::Density,
                radius: 0.1,
                min_neighbors: 1,
                k: 0,
                run_id: 2,
            })
            .await
            .unwrap();
        assert!(matches!(
            handle.responses.recv().await.unwrap(),
            Response::Progress { .. }
        ));
    }

    #[tokio::test]
    async fn test_init_failure_reports_fetch_phase() {
        let mut handle = PipelineWorker::spawn("/no/such/archive.tar.gz", "/no/such/taxonomy.json");
        handle
            .requests
            .send(Request::Init {
                desired_palette_size: 8,
            })
            .await
            .unwrap();

        match handle.responses.recv().await.unwrap() {
            Response::Progress { phase, .. } => {
                assert!(phase.starts_with("fetching failed"), "phase: {phase}");
            }
            other => panic!("expected failure progress, got {other:?}"),
        }
    }
}
