//! The scheduling cycle (spec §4.E): filter → score → normalise → pick →
//! reserve → commit, run once per pod in workload order. Grounded in the
//! teacher's `scheduler.rs` for overall shape (queue-driven pod/cache
//! orchestration), generalised from the teacher's async, channel-driven loop
//! down to the synchronous single-threaded pipeline spec §5 requires, and in
//! `open_gpu_share.go`'s `Reserve`/`Unreserve` for the GPU-commit step.
//!
//! The teacher's dynamic registry (plugins registering into a process-wide
//! map keyed by name) is re-expressed here as the explicit `ScorePolicy` /
//! `GpuSelector` enums the spec's REDESIGN FLAGS call for.

use std::sync::Arc;

use crate::cache::GpuShareCache;
use crate::cycle_state::CycleState;
use crate::error::SimError;
use crate::models::{NodeResource, Placement, PodResource, TypicalPodList};
use crate::plugins::fgd::Fgd;
use crate::plugins::filter::GpuShareFilter;
use crate::plugins::gpu_select::{BestFit, RandomFit, WorstFit};
use crate::plugins::pwr::Pwr;
use crate::plugins::pwrexp::Pwrexp;
use crate::plugins::{FilterPlugin, GpuAllocator, NodeScore, ScoreExtension, ScorePlugin, MAX_NODE_SCORE};

/// A scoring+allocation strategy, combining a `ScorePlugin` with the
/// `GpuAllocator` it agrees with. Implemented by every concrete policy
/// struct below; kept as a single trait so the scheduler can hold one
/// trait object per run instead of matching on an enum at every call site.
pub trait ScoringStrategy: ScorePlugin + GpuAllocator {}
impl<T: ScorePlugin + GpuAllocator> ScoringStrategy for T {}

/// Trivial score used by the `OpenGpuShare` policies: every filterable node
/// scores `MaxNodeScore`, so the final pick is resolved entirely by the
/// lowest-node-name tie-break (spec §4.E step 5) and the interesting
/// decision is left to the GPU selector. Grounded in `open_gpu_share.go`,
/// whose `GpuSharePlugin` itself never implements `Score` — scoring and GPU
/// selection are separate registrations in the original.
struct NeutralScore<S: GpuAllocator> {
    selector: S,
}

impl<S: GpuAllocator> crate::plugins::Plugin for NeutralScore<S> {
    fn name(&self) -> &str {
        "OpenGpuShare"
    }
}

impl<S: GpuAllocator> ScorePlugin for NeutralScore<S> {
    fn score(&self, _state: &mut CycleState, _pod: &PodResource, _node: &NodeResource) -> (i64, crate::plugins::Status) {
        (MAX_NODE_SCORE, crate::plugins::Status::default())
    }

    fn score_extension(&self) -> Box<dyn ScoreExtension> {
        Box::new(crate::plugins::DefaultNormalizeScore { max_score: MAX_NODE_SCORE, reverse: false })
    }
}

impl<S: GpuAllocator> GpuAllocator for NeutralScore<S> {
    fn allocate_gpu_ids(&self, pod: &PodResource, node: &NodeResource) -> Option<Vec<usize>> {
        self.selector.allocate_gpu_ids(pod, node)
    }
}

/// Explicit policy selection (spec §6, §9 REDESIGN FLAG "dynamic plugin
/// registry").
pub enum ScorePolicy {
    Fgd,
    Pwr,
    Pwrexp,
    OpenGpuShareBestFit,
    OpenGpuShareWorstFit,
    OpenGpuShareRandom,
}

fn build_strategy(policy: &ScorePolicy, typical_pods: TypicalPodList) -> Box<dyn ScoringStrategy> {
    match policy {
        ScorePolicy::Fgd => Box::new(Fgd { typical_pods: Arc::new(typical_pods) }),
        ScorePolicy::Pwr => Box::new(Pwr),
        ScorePolicy::Pwrexp => Box::new(Pwrexp { typical_pods }),
        ScorePolicy::OpenGpuShareBestFit => Box::new(NeutralScore { selector: BestFit }),
        ScorePolicy::OpenGpuShareWorstFit => Box::new(NeutralScore { selector: WorstFit }),
        ScorePolicy::OpenGpuShareRandom => Box::new(NeutralScore { selector: RandomFit }),
    }
}

/// Outcome of scheduling a single pod.
pub enum PodOutcome {
    Placed(Placement),
    Unschedulable { pod_name: String, reason: String },
}

/// Aggregate result of a full scheduling run (spec §6 "Outputs").
pub struct RunResult {
    pub placements: Vec<Placement>,
    pub unschedulable: Vec<(String, String)>,
    pub nodes: Vec<NodeResource>,
}

/// Drives the synchronous scheduling cycle over a fixed set of nodes and a
/// pod stream, in the order given (callers apply the ordering pre-pass
/// before invoking this, see `crate::ordering`).
pub struct Scheduler {
    nodes: Vec<NodeResource>,
    cache: GpuShareCache,
    filter: GpuShareFilter,
    strategy: Box<dyn ScoringStrategy>,
}

impl Scheduler {
    pub fn new(nodes: Vec<NodeResource>, policy: ScorePolicy, typical_pods: TypicalPodList) -> Self {
        let cache = GpuShareCache::new();
        for node in &nodes {
            cache.init_node(&node.node_name, node.gpu_total());
        }
        Scheduler {
            nodes,
            cache,
            filter: GpuShareFilter,
            strategy: build_strategy(&policy, typical_pods),
        }
    }

    /// Runs the full cycle over `pods`, in the order given, and returns the
    /// aggregate result (spec §4.E, §4.F, §6). A fatal error
    /// (`InvariantViolation`/`BadInput`) aborts the run and is returned as
    /// `Err` rather than panicking; see `crate::error::SimError::is_recoverable`.
    pub fn run(mut self, pods: Vec<PodResource>) -> Result<RunResult, SimError> {
        // BadInput is fatal at parse time, before the scheduling cycle
        // starts (spec §7): validate the whole stream up front so a bad pod
        // late in the list can't leave earlier pods already reserved.
        for pod in &pods {
            pod.validate()?;
        }

        let mut placements = Vec::new();
        let mut unschedulable = Vec::new();

        for pod in pods {
            match self.schedule_one(&pod) {
                Ok(PodOutcome::Placed(placement)) => placements.push(placement),
                Ok(PodOutcome::Unschedulable { pod_name, reason }) => {
                    log::warn!("pod {pod_name} unschedulable: {reason}");
                    unschedulable.push((pod_name, reason));
                }
                Err(err) => return Err(err),
            }
        }

        Ok(RunResult { placements, unschedulable, nodes: self.nodes })
    }

    fn schedule_one(&mut self, pod: &PodResource) -> Result<PodOutcome, SimError> {
        let mut state = CycleState::default();

        // 1. Filter.
        let feasible: Vec<usize> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| self.filter.filter(&mut state, pod, node).is_success())
            .map(|(i, _)| i)
            .collect();

        if feasible.is_empty() {
            return Ok(PodOutcome::Unschedulable {
                pod_name: pod.pod_name.clone(),
                reason: "no node passed Filter".to_string(),
            });
        }

        // Pod requesting nothing binds to the first node passing Filter
        // (spec §4.F).
        if pod.requests_nothing() {
            let node_name = self.nodes[feasible[0]].node_name.clone();
            return self.reserve_and_commit(pod, &node_name);
        }

        // 2. Score.
        let mut scores: Vec<NodeScore> = Vec::with_capacity(feasible.len());
        for &i in &feasible {
            let (raw, status) = self.strategy.score(&mut state, pod, &self.nodes[i]);
            let score = if status.is_success() { raw } else { crate::plugins::MIN_NODE_SCORE };
            scores.push(NodeScore { name: self.nodes[i].node_name.clone(), score });
        }

        // 3. Normalise.
        self.strategy.score_extension().normalize_score(&state, pod, &mut scores);

        // 4. Pick: highest score, ties broken by lowest node-name (spec
        // §4.E step 5).
        let winner = scores
            .iter()
            .fold(None::<&NodeScore>, |best, candidate| match best {
                None => Some(candidate),
                Some(b) if candidate.score > b.score => Some(candidate),
                Some(b) if candidate.score == b.score && candidate.name < b.name => Some(candidate),
                Some(b) => Some(b),
            })
            .expect("feasible is non-empty");
        let node_name = winner.name.clone();

        self.reserve_and_commit(pod, &node_name)
    }

    /// Performs Reserve + Commit (spec §4.E steps 6–7), rolling back to
    /// `Unschedulable` on any allocation failure rather than aborting.
    fn reserve_and_commit(&mut self, pod: &PodResource, node_name: &str) -> Result<PodOutcome, SimError> {
        // A lookup miss here degrades to Unschedulable rather than aborting
        // the run (spec §7: NodeLookupMiss is recoverable, not fatal).
        let Some(node_idx) = self.nodes.iter().position(|n| n.node_name == node_name) else {
            log::error!("reserve failed for pod {}: node {node_name} not found", pod.pod_name);
            return Ok(PodOutcome::Unschedulable {
                pod_name: pod.pod_name.clone(),
                reason: format!("node lookup miss: {node_name}"),
            });
        };

        if pod.requests_nothing() {
            let placement = Placement { pod_name: pod.pod_name.clone(), node_name: node_name.to_string(), gpu_ids: vec![] };
            return Ok(PodOutcome::Placed(placement));
        }

        let gpu_ids = self.strategy.allocate_gpu_ids(pod, &self.nodes[node_idx]);
        let Some(gpu_ids) = gpu_ids else {
            log::error!("reserve failed for pod {}: no GPU found on node {node_name} after Score picked it", pod.pod_name);
            return Ok(PodOutcome::Unschedulable {
                pod_name: pod.pod_name.clone(),
                reason: format!("GPU allocation failed on node {node_name}"),
            });
        };

        let result = (|| -> Result<(), SimError> {
            if pod.is_gpu_share() {
                let gpu_id = gpu_ids[0];
                self.nodes[node_idx] = self.nodes[node_idx].allocate_share(gpu_id, pod.milli_cpu, pod.milli_gpu)?;
                self.cache.add_or_update_pod(&pod.pod_name, node_name, gpu_id, pod.milli_gpu)?;
            } else {
                self.nodes[node_idx] = self.nodes[node_idx].sub(pod)?;
                for &gpu_id in &gpu_ids {
                    self.cache.add_or_update_pod(&pod.pod_name, node_name, gpu_id, crate::models::MILLI)?;
                }
            }
            Ok(())
        })();

        match result {
            Ok(()) => Ok(PodOutcome::Placed(Placement {
                pod_name: pod.pod_name.clone(),
                node_name: node_name.to_string(),
                gpu_ids,
            })),
            Err(err) => {
                // Unreserve: release anything the cache may have picked up.
                self.cache.remove_pod(&pod.pod_name, node_name);
                log::error!("reserve failed for pod {}: {err}", pod.pod_name);
                if !err.is_recoverable() {
                    return Err(err);
                }
                Ok(PodOutcome::Unschedulable { pod_name: pod.pod_name.clone(), reason: err.to_string() })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TypicalPodEntry;

    fn typical_list() -> TypicalPodList {
        TypicalPodList::new(vec![TypicalPodEntry { pod: PodResource::new("typ", 0, 500, 1), percentage: 1.0 }])
    }

    #[test]
    fn cpu_only_pod_lands_on_the_only_node() {
        let node = NodeResource::new("n1", 4000, 0, "", "Intel");
        let scheduler = Scheduler::new(vec![node], ScorePolicy::Fgd, typical_list());
        let pod = PodResource::new("p1", 1000, 0, 0);
        let result = scheduler.run(vec![pod]).unwrap();
        assert_eq!(result.placements.len(), 1);
        assert_eq!(result.nodes[0].milli_cpu_left, 3000);
        assert!(result.unschedulable.is_empty());
    }

    #[test]
    fn share_pod_best_fit_picks_smallest_fitting_gpu() {
        let mut node = NodeResource::new("n1", 4000, 3, "A100", "Intel");
        node.milli_gpu_left_list = vec![1000, 300, 800];
        let scheduler = Scheduler::new(vec![node], ScorePolicy::OpenGpuShareBestFit, TypicalPodList::default());
        let pod = PodResource::new("p1", 0, 200, 1);
        let result = scheduler.run(vec![pod]).unwrap();
        let placement = &result.placements[0];
        assert_eq!(placement.gpu_ids, vec![1]);
        assert_eq!(result.nodes[0].milli_gpu_left_list, vec![1000, 100, 800]);
    }

    #[test]
    fn share_pod_worst_fit_picks_largest_fitting_gpu() {
        let mut node = NodeResource::new("n1", 4000, 3, "A100", "Intel");
        node.milli_gpu_left_list = vec![1000, 300, 800];
        let scheduler = Scheduler::new(vec![node], ScorePolicy::OpenGpuShareWorstFit, TypicalPodList::default());
        let pod = PodResource::new("p1", 0, 200, 1);
        let result = scheduler.run(vec![pod]).unwrap();
        assert_eq!(result.placements[0].gpu_ids, vec![0]);
        assert_eq!(result.nodes[0].milli_gpu_left_list, vec![800, 300, 800]);
    }

    #[test]
    fn whole_gpu_pod_picks_lowest_indexed_free_gpus() {
        let mut node = NodeResource::new("n1", 4000, 4, "A100", "Intel");
        node.milli_gpu_left_list = vec![1000, 600, 1000, 1000];
        let scheduler = Scheduler::new(vec![node], ScorePolicy::Fgd, typical_list());
        let pod = PodResource::new("p1", 0, 1000, 2);
        let result = scheduler.run(vec![pod]).unwrap();
        let mut ids = result.placements[0].gpu_ids.clone();
        ids.sort();
        assert_eq!(ids, vec![0, 2]);
        assert_eq!(result.nodes[0].milli_gpu_left_list, vec![0, 600, 0, 1000]);
    }

    #[test]
    fn unschedulable_pod_leaves_node_state_unchanged() {
        let mut node = NodeResource::new("n1", 1000, 1, "T4", "");
        node.milli_gpu_left_list = vec![100];
        let scheduler = Scheduler::new(vec![node], ScorePolicy::Fgd, typical_list());
        let mut pod = PodResource::new("p1", 0, 500, 1);
        pod.gpu_type = "T4".to_string();
        let result = scheduler.run(vec![pod]).unwrap();
        assert!(result.placements.is_empty());
        assert_eq!(result.unschedulable.len(), 1);
        assert_eq!(result.nodes[0].milli_gpu_left_list, vec![100]);
    }

    #[test]
    fn workload_conservation_holds() {
        let mut node = NodeResource::new("n1", 4000, 2, "A100", "Intel");
        node.milli_gpu_left_list = vec![1000, 1000];
        let scheduler = Scheduler::new(vec![node], ScorePolicy::Fgd, typical_list());
        let pods = vec![
            PodResource::new("p1", 0, 500, 1),
            PodResource::new("p2", 0, 500, 1),
            PodResource::new("p3", 0, 900, 1),
        ];
        let total = pods.len();
        let result = scheduler.run(pods).unwrap();
        assert_eq!(result.placements.len() + result.unschedulable.len(), total);
    }
}
