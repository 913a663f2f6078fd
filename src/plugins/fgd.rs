//! FGD (fragmentation-extend-score): minimises the *increase* in node
//! fragmentation caused by placing the pod (spec §4.D.1). Grounded
//! line-for-line in `fgd_score.go::calculateGpuShareFragExtendScore`.

use std::sync::Arc;

use crate::cycle_state::CycleState;
use crate::fragmentation::frag_amount;
use crate::models::{NodeResource, PodResource, TypicalPodList};
use crate::plugins::{DefaultNormalizeScore, GpuAllocator, Plugin, ScoreExtension, ScorePlugin, Status, MAX_NODE_SCORE};

/// `1/1000` divisor applied before the sigmoid; load-bearing for score
/// spread, kept as a named tunable per spec §9 rather than an inline magic
/// number.
const FGD_FRAG_SCALE_MILLI: f64 = 1000.0;

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

pub struct Fgd {
    pub typical_pods: Arc<TypicalPodList>,
}

impl Plugin for Fgd {
    fn name(&self) -> &str {
        "FGD"
    }
}

/// Shared by `Fgd::score` and `Fgd::allocate_gpu_ids`: the spec requires
/// these two paths to agree on which GPU wins, so both route through this
/// single hypothetical scan.
fn best_candidate(pod: &PodResource, node: &NodeResource, typical_pods: &TypicalPodList) -> (i64, Option<usize>) {
    let old = frag_amount(node, typical_pods);

    if pod.is_gpu_share() {
        let mut best_score = 0_i64;
        let mut best_gpu: Option<usize> = None;
        for i in 0..node.gpu_total() {
            if node.milli_gpu_left_list[i] < pod.milli_gpu {
                continue;
            }
            let Ok(hypothetical) = node.allocate_share(i, pod.milli_cpu, pod.milli_gpu) else {
                continue;
            };
            let new_frag = frag_amount(&hypothetical, typical_pods);
            let delta = (old - new_frag) / FGD_FRAG_SCALE_MILLI;
            let score = (sigmoid(delta) * MAX_NODE_SCORE as f64) as i64;
            if best_gpu.is_none() || score > best_score {
                best_score = score;
                best_gpu = Some(i);
            }
        }
        (best_score, best_gpu)
    } else {
        let Ok(hypothetical) = node.sub(pod) else {
            return (0, None);
        };
        let new_frag = frag_amount(&hypothetical, typical_pods);
        let delta = (old - new_frag) / FGD_FRAG_SCALE_MILLI;
        let score = (sigmoid(delta) * MAX_NODE_SCORE as f64) as i64;
        let gpu_ids = crate::models::canonical_whole_gpu_pick(&node.milli_gpu_left_list, pod.gpu_number.max(0) as usize);
        (score, gpu_ids.map(|ids| ids[0]))
    }
}

impl ScorePlugin for Fgd {
    fn score(&self, _state: &mut CycleState, pod: &PodResource, node: &NodeResource) -> (i64, Status) {
        if pod.requests_nothing() {
            return (MAX_NODE_SCORE, Status::default());
        }
        let (score, gpu) = best_candidate(pod, node, &self.typical_pods);
        if pod.gpu_number > 0 && gpu.is_none() {
            return (0, Status::unschedulable(format!("node {} has no fitting GPU", node.node_name)));
        }
        (score, Status::default())
    }

    fn score_extension(&self) -> Box<dyn ScoreExtension> {
        // FGD's raw score already sits in [0, MaxNodeScore]; no rescaling.
        Box::new(DefaultNormalizeScore { max_score: MAX_NODE_SCORE, reverse: false })
    }
}

impl GpuAllocator for Fgd {
    fn allocate_gpu_ids(&self, pod: &PodResource, node: &NodeResource) -> Option<Vec<usize>> {
        if pod.is_gpu_share() {
            let (_, gpu) = best_candidate(pod, node, &self.typical_pods);
            gpu.map(|g| vec![g])
        } else if pod.gpu_number > 0 {
            crate::models::canonical_whole_gpu_pick(&node.milli_gpu_left_list, pod.gpu_number as usize)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TypicalPodEntry;

    fn typical_favouring_500() -> Arc<TypicalPodList> {
        Arc::new(TypicalPodList::new(vec![TypicalPodEntry {
            pod: PodResource::new("typ", 0, 500, 1),
            percentage: 1.0,
        }]))
    }

    #[test]
    fn score_in_bounds_for_every_filterable_node() {
        let plugin = Fgd { typical_pods: typical_favouring_500() };
        let mut state = CycleState::default();
        let node = NodeResource::new("n1", 4000, 2, "A100", "Intel");
        let pod = PodResource::new("p1", 100, 300, 1);
        let (score, status) = plugin.score(&mut state, &pod, &node);
        assert!(status.is_success());
        assert!((0..=MAX_NODE_SCORE).contains(&score));
    }

    #[test]
    fn prefers_the_already_fragmented_node() {
        let plugin = Fgd { typical_pods: typical_favouring_500() };
        let mut state = CycleState::default();

        let mut n1 = NodeResource::new("n1", 4000, 2, "A100", "Intel");
        n1.milli_gpu_left_list = vec![1000, 1000];
        let mut n2 = NodeResource::new("n2", 4000, 2, "A100", "Intel");
        n2.milli_gpu_left_list = vec![400, 1000];

        let pod = PodResource::new("p1", 0, 300, 1);
        let (score1, _) = plugin.score(&mut state, &pod, &n1);
        let (score2, _) = plugin.score(&mut state, &pod, &n2);
        assert!(score2 >= score1);
    }

    #[test]
    fn no_resource_pod_gets_max_score() {
        let plugin = Fgd { typical_pods: typical_favouring_500() };
        let mut state = CycleState::default();
        let node = NodeResource::new("n1", 4000, 1, "A100", "Intel");
        let pod = PodResource::new("p1", 0, 0, 0);
        let (score, status) = plugin.score(&mut state, &pod, &node);
        assert!(status.is_success());
        assert_eq!(score, MAX_NODE_SCORE);
    }

    #[test]
    fn allocate_gpu_ids_agrees_with_score() {
        let plugin = Fgd { typical_pods: typical_favouring_500() };
        let mut node = NodeResource::new("n1", 4000, 2, "A100", "Intel");
        node.milli_gpu_left_list = vec![1000, 300];
        let pod = PodResource::new("p1", 0, 300, 1);
        let ids = plugin.allocate_gpu_ids(&pod, &node).unwrap();
        assert_eq!(ids, vec![1]);
    }
}
