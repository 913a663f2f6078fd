//! PWREXP (expected power): minimises the *expected* increase in node power
//! under the target-workload distribution, rather than the power delta of
//! the pod being scored itself (spec §4.D.3). Grounded in
//! `pwrexp_score.go::calculatePWREXPShareExtendScore` /
//! `CalcExpPWRVarNode`.
//!
//! The raw score is `after - before` of the *expected* power, where lower is
//! better; normalisation flips polarity so the lowest raw score becomes the
//! highest normalised one (spec §4.D.3 explicit text — the original Go's own
//! plain min-max `NormalizeScore` and "larger is better" comment read as the
//! opposite convention, but the specification's literal wording governs
//! here; see DESIGN.md).

use crate::cycle_state::CycleState;
use crate::energy::node_power;
use crate::models::{NodeResource, PodResource, TypicalPodList};
use crate::plugins::{GpuAllocator, MinMaxNormalizeScore, Plugin, ScoreExtension, ScorePlugin, Status, MAX_NODE_SCORE};

pub struct Pwrexp {
    pub typical_pods: TypicalPodList,
}

impl Plugin for Pwrexp {
    fn name(&self) -> &str {
        "PWREXP"
    }
}

/// Best hypothetical placement of `pod` on `node`, scoring on instantaneous
/// power delta (shared by `score` and `allocate_gpu_ids`, same contract as
/// FGD/PWR).
fn best_candidate(pod: &PodResource, node: &NodeResource) -> (f64, Option<usize>) {
    let before = node_power(node);

    if pod.is_gpu_share() {
        let mut best_delta = f64::MAX;
        let mut best_gpu: Option<usize> = None;
        for i in 0..node.gpu_total() {
            if node.milli_gpu_left_list[i] < pod.milli_gpu {
                continue;
            }
            let Ok(hypothetical) = node.allocate_share(i, pod.milli_cpu, pod.milli_gpu) else {
                continue;
            };
            let delta = node_power(&hypothetical) - before;
            if best_gpu.is_none() || delta < best_delta {
                best_delta = delta;
                best_gpu = Some(i);
            }
        }
        (if best_gpu.is_some() { best_delta } else { 0.0 }, best_gpu)
    } else {
        let Ok(hypothetical) = node.sub(pod) else {
            return (0.0, None);
        };
        let delta = before - node_power(&hypothetical);
        let gpu_ids = crate::models::canonical_whole_gpu_pick(&node.milli_gpu_left_list, pod.gpu_number.max(0) as usize);
        (delta, gpu_ids.map(|ids| ids[0]))
    }
}

/// Expected power variation of placing `pod` on `node`, under the typical-pod
/// distribution (spec §4.D.3 `CalcExpPWRVarNode`): for each typical pod shape,
/// find the best hypothetical post-placement power, skipping shapes that
/// cannot be placed at all (renormalising the remaining probabilities), and
/// sum `(after_i - before) * prob_i`.
pub fn calc_exp_pwr_var_node(node: &NodeResource, typical_pods: &TypicalPodList) -> f64 {
    let before = node_power(node);

    let mut weighted_sum = 0.0;
    let mut total_weight = 0.0;

    for entry in typical_pods.valid_entries() {
        let after = if entry.pod.requests_nothing() {
            before
        } else if entry.pod.is_gpu_share() {
            let mut best: Option<f64> = None;
            for i in 0..node.gpu_total() {
                if node.milli_gpu_left_list[i] < entry.pod.milli_gpu {
                    continue;
                }
                let Ok(hypothetical) = node.allocate_share(i, entry.pod.milli_cpu, entry.pod.milli_gpu) else {
                    continue;
                };
                let power = node_power(&hypothetical);
                best = Some(best.map_or(power, |b: f64| b.min(power)));
            }
            match best {
                Some(p) => p,
                None => continue, // not allocatable to this node; skip and renormalise
            }
        } else {
            match node.sub(&entry.pod) {
                Ok(hypothetical) => node_power(&hypothetical),
                Err(_) => continue,
            }
        };

        weighted_sum += (after - before) * entry.percentage;
        total_weight += entry.percentage;
    }

    if total_weight == 0.0 {
        return 0.0;
    }
    weighted_sum / total_weight
}

impl ScorePlugin for Pwrexp {
    fn score(&self, _state: &mut CycleState, pod: &PodResource, node: &NodeResource) -> (i64, Status) {
        if pod.requests_nothing() {
            return (MAX_NODE_SCORE, Status::default());
        }
        let (_, gpu) = best_candidate(pod, node);
        if pod.gpu_number > 0 && gpu.is_none() {
            return (0, Status::unschedulable(format!("node {} has no fitting GPU", node.node_name)));
        }

        let hypothetical = if pod.is_gpu_share() {
            // gpu is Some whenever pod.gpu_number > 0 at this point (checked above).
            node.allocate_share(gpu.expect("checked above"), pod.milli_cpu, pod.milli_gpu)
        } else {
            node.sub(pod)
        };
        let Ok(hypothetical) = hypothetical else {
            return (0, Status::unschedulable(format!("node {} cannot host pod {}", node.node_name, pod.pod_name)));
        };

        let before = calc_exp_pwr_var_node(node, &self.typical_pods);
        let after = calc_exp_pwr_var_node(&hypothetical, &self.typical_pods);
        // Raw score must stay an i64 for the shared ScorePlugin contract;
        // millwatt-scale delta survives integer truncation fine at this
        // resolution. Lower is better; reverse-polarity normalisation below
        // maps the lowest raw score to the highest normalised one.
        ((after - before) as i64, Status::default())
    }

    fn score_extension(&self) -> Box<dyn ScoreExtension> {
        Box::new(MinMaxNormalizeScore { reverse_polarity: true })
    }
}

impl GpuAllocator for Pwrexp {
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
    use crate::models::TypicalPodEntry;

    fn typical_favouring_500() -> TypicalPodList {
        TypicalPodList::new(vec![TypicalPodEntry {
            pod: PodResource::new("typ", 0, 500, 1),
            percentage: 1.0,
        }])
    }

    #[test]
    fn no_resource_pod_gets_max_score() {
        let plugin = Pwrexp { typical_pods: typical_favouring_500() };
        let mut state = CycleState::default();
        let node = NodeResource::new("n1", 4000, 1, "A100", "Intel");
        let pod = PodResource::new("p1", 0, 0, 0);
        let (score, status) = plugin.score(&mut state, &pod, &node);
        assert!(status.is_success());
        assert_eq!(score, MAX_NODE_SCORE);
    }

    #[test]
    fn unschedulable_when_no_gpu_fits() {
        let plugin = Pwrexp { typical_pods: typical_favouring_500() };
        let mut state = CycleState::default();
        let mut node = NodeResource::new("n1", 4000, 1, "A100", "Intel");
        node.milli_gpu_left_list = vec![100];
        let pod = PodResource::new("p1", 0, 500, 1);
        let (_, status) = plugin.score(&mut state, &pod, &node);
        assert!(!status.is_success());
    }

    #[test]
    fn expected_power_variation_is_zero_on_fully_idle_node_with_no_typical_pods() {
        let node = NodeResource::new("n1", 4000, 2, "A100", "Intel");
        let empty = TypicalPodList::new(vec![]);
        assert_eq!(calc_exp_pwr_var_node(&node, &empty), 0.0);
    }

    #[test]
    fn allocate_gpu_ids_agrees_with_best_candidate() {
        let plugin = Pwrexp { typical_pods: typical_favouring_500() };
        let mut node = NodeResource::new("n1", 4000, 2, "A100", "Intel");
        node.milli_gpu_left_list = vec![1000, 600];
        let pod = PodResource::new("p1", 0, 500, 1);
        let ids = plugin.allocate_gpu_ids(&pod, &node).unwrap();
        assert_eq!(ids, vec![1]);
    }
}
