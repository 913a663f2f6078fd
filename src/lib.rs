//! Trace-driven cluster scheduler simulator for GPU-sharing workloads: a
//! deterministic, single-threaded mini-scheduler that replays a pod stream
//! against a fixed cluster under one of several scoring policies, tracking
//! per-GPU millifraction accounting, fragmentation, and power draw.

pub mod annotation;
pub mod cache;
pub mod config;
pub mod cycle_state;
pub mod energy;
pub mod error;
pub mod fragmentation;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod ordering;
pub mod plugins;
pub mod scheduler;

use config::RunConfig;
use error::SimError;
use metrics::RunMetrics;
use models::{NodeResource, PodResource, TypicalPodEntry, TypicalPodList};
use ordering::{order_pods, OrderingOptions};
use scheduler::{RunResult, Scheduler};

/// Runs a full simulation from a parsed `RunConfig`: builds the node set,
/// applies the pod-ordering pre-pass, drives the scheduling cycle, and
/// computes aggregate metrics (spec §4.E, §6). Returns `Err` without
/// producing a result if any pod fails ingest validation or the scheduling
/// cycle hits a fatal (non-recoverable) error (spec §7).
pub fn run(config: &RunConfig) -> Result<(RunResult, RunMetrics), SimError> {
    logging::init();

    let nodes: Vec<NodeResource> = config.nodes.iter().map(Into::into).collect();
    let mut pods: Vec<PodResource> = config.pods.iter().map(Into::into).collect();
    let typical_pods = TypicalPodList::new(
        config
            .typical_pods
            .iter()
            .map(|t| TypicalPodEntry { pod: (&t.pod).into(), percentage: t.percentage })
            .collect(),
    );

    // BadInput is fatal at parse time, before the scheduling cycle starts
    // (spec §7).
    for pod in &pods {
        pod.validate()?;
    }

    let ordering_options = OrderingOptions {
        shuffle: config.options.shuffle_pod,
        shuffle_seed: config.options.shuffle_seed,
        affinity_ordering: config.options.affinity_ordering,
    };
    order_pods(&mut pods, &ordering_options);

    let scheduler = Scheduler::new(nodes, config.policy.into(), typical_pods.clone());
    let result = scheduler.run(pods)?;
    let metrics = metrics::compute(&result, &typical_pods);
    Ok((result, metrics))
}
