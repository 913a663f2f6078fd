//! PWR (instantaneous power): minimises the *increase* in node power draw
//! caused by placing the pod (spec §4.D.2). In the original Go source this
//! plugin (`pwr_score.go`) is a near-empty stub — `Name()` even returns the
//! wrong constant and its `allocateGpuIdFunc` points at FGD's function
//! (`// TODO: da completare`) — per spec §9's Open Question this is treated
//! as a complete, distinct plugin rather than carried over broken, reusing
//! FGD's hypothetical-scan control structure (spec §4.D.2: "same control
//! structure as FGD") but scoring on power delta instead of fragmentation
//! delta.

use crate::cycle_state::CycleState;
use crate::energy::node_power;
use crate::models::{NodeResource, PodResource};
use crate::plugins::{GpuAllocator, MinMaxNormalizeScore, Plugin, ScoreExtension, ScorePlugin, Status, MAX_NODE_SCORE};

pub struct Pwr;

impl Plugin for Pwr {
    fn name(&self) -> &str {
        "PWR"
    }
}

/// Shared by `score` and `allocate_gpu_ids` so both paths agree on the
/// chosen GPU (spec §4.D shared contract).
fn best_candidate(pod: &PodResource, node: &NodeResource) -> (i64, Option<usize>) {
    let before = node_power(node);

    if pod.is_gpu_share() {
        let mut best_score = i64::MIN;
        let mut best_gpu: Option<usize> = None;
        for i in 0..node.gpu_total() {
            if node.milli_gpu_left_list[i] < pod.milli_gpu {
                continue;
            }
            let Ok(hypothetical) = node.allocate_share(i, pod.milli_cpu, pod.milli_gpu) else {
                continue;
            };
            let score = (before - node_power(&hypothetical)) as i64;
            if best_gpu.is_none() || score > best_score {
                best_score = score;
                best_gpu = Some(i);
            }
        }
        (if best_gpu.is_some() { best_score } else { 0 }, best_gpu)
    } else {
        let Ok(hypothetical) = node.sub(pod) else {
            return (0, None);
        };
        let score = (before - node_power(&hypothetical)) as i64;
        let gpu_ids = crate::models::canonical_whole_gpu_pick(&node.milli_gpu_left_list, pod.gpu_number.max(0) as usize);
        (score, gpu_ids.map(|ids| ids[0]))
    }
}

impl ScorePlugin for Pwr {
    fn score(&self, _state: &mut CycleState, pod: &PodResource, node: &NodeResource) -> (i64, Status) {
        if pod.requests_nothing() {
            return (MAX_NODE_SCORE, Status::default());
        }
        let (score, gpu) = best_candidate(pod, node);
        if pod.gpu_number > 0 && gpu.is_none() {
            return (0, Status::unschedulable(format!("node {} has no fitting GPU", node.node_name)));
        }
        (score, Status::default())
    }

    fn score_extension(&self) -> Box<dyn ScoreExtension> {
        Box::new(MinMaxNormalizeScore { reverse_polarity: false })
    }
}

impl GpuAllocator for Pwr {
    fn allocate_gpu_ids(&self, pod: &PodResource, node: &NodeResource) -> Option<Vec<usize>> {
        if pod.is_gpu_share() {
            let (_, gpu) = best_candidate(pod, node);
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

    #[test]
    fn prefers_already_hot_node() {
        let plugin = Pwr;
        let mut state = CycleState::default();

        // Node A already has one GPU lit up; node B is fully idle.
        let mut node_a = NodeResource::new("a", 4000, 2, "A100", "Intel");
        node_a.milli_gpu_left_list = vec![800, 1000];
        let node_b = NodeResource::new("b", 4000, 2, "A100", "Intel");

        let pod = PodResource::new("p1", 0, 200, 1);
        let (score_a, _) = plugin.score(&mut state, &pod, &node_a);
        let (score_b, _) = plugin.score(&mut state, &pod, &node_b);
        assert!(score_a > score_b);
    }

    #[test]
    fn no_resource_pod_gets_max_score() {
        let plugin = Pwr;
        let mut state = CycleState::default();
        let node = NodeResource::new("n1", 4000, 1, "A100", "Intel");
        let pod = PodResource::new("p1", 0, 0, 0);
        let (score, status) = plugin.score(&mut state, &pod, &node);
        assert!(status.is_success());
        assert_eq!(score, MAX_NODE_SCORE);
    }
}
