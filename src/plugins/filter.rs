//! Filter stage: prunes nodes that cannot host the current pod by type or
//! capacity (spec §4.C). Grounded in `open_gpu_share.go::Filter` and the
//! teacher's `FilterPlugin` trait shape (`node_resources_fit.rs`).

use crate::cycle_state::CycleState;
use crate::models::{canonical_whole_gpu_pick, NodeResource, PodResource};
use crate::plugins::{FilterPlugin, Plugin, Status};

pub struct GpuShareFilter;

impl Plugin for GpuShareFilter {
    fn name(&self) -> &str {
        "GpuShareFilter"
    }
}

impl FilterPlugin for GpuShareFilter {
    fn filter(&self, _state: &mut CycleState, pod: &PodResource, node: &NodeResource) -> Status {
        if pod.gpu_number > 0 && node.gpu_total() == 0 {
            return Status::unschedulable(format!("node {} has no GPU", node.node_name));
        }

        if !pod.gpu_type.is_empty() && node.gpu_type != pod.gpu_type {
            return Status::unschedulable(format!(
                "node {} gpu type {} does not match pod request {}",
                node.node_name, node.gpu_type, pod.gpu_type
            ));
        }
        if !pod.cpu_type.is_empty() && node.cpu_type != pod.cpu_type {
            return Status::unschedulable(format!(
                "node {} cpu type {} does not match pod request {}",
                node.node_name, node.cpu_type, pod.cpu_type
            ));
        }

        if node.milli_cpu_left < pod.milli_cpu {
            return Status::unschedulable(format!(
                "node {} has {} milli_cpu left, pod requests {}",
                node.node_name, node.milli_cpu_left, pod.milli_cpu
            ));
        }

        if pod.is_gpu_share() {
            let fits = node.milli_gpu_left_list.iter().any(|&left| left >= pod.milli_gpu);
            if !fits {
                return Status::unschedulable(format!(
                    "node {} has no GPU with {} milli free",
                    node.node_name, pod.milli_gpu
                ));
            }
        } else if pod.gpu_number > 0
            && canonical_whole_gpu_pick(&node.milli_gpu_left_list, pod.gpu_number as usize).is_none()
        {
            return Status::unschedulable(format!(
                "node {} does not have {} whole free GPUs",
                node.node_name, pod.gpu_number
            ));
        }

        Status::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::Code;

    fn node() -> NodeResource {
        let mut n = NodeResource::new("n1", 4000, 2, "A100", "Intel");
        n.milli_gpu_left_list = vec![300, 1000];
        n
    }

    #[test]
    fn cpu_only_pod_passes_regardless_of_gpu() {
        let plugin = GpuShareFilter;
        let mut state = CycleState::default();
        let pod = PodResource::new("p1", 1000, 0, 0);
        assert_eq!(plugin.filter(&mut state, &pod, &node()).code, Code::Success);
    }

    #[test]
    fn share_pod_needs_a_fitting_gpu() {
        let plugin = GpuShareFilter;
        let mut state = CycleState::default();
        let pod = PodResource::new("p1", 100, 500, 1);
        assert_eq!(plugin.filter(&mut state, &pod, &node()).code, Code::Unschedulable);

        let pod_fits = PodResource::new("p2", 100, 300, 1);
        assert_eq!(plugin.filter(&mut state, &pod_fits, &node()).code, Code::Success);
    }

    #[test]
    fn gpu_type_mismatch_is_unschedulable() {
        let plugin = GpuShareFilter;
        let mut state = CycleState::default();
        let mut pod = PodResource::new("p1", 100, 300, 1);
        pod.gpu_type = "T4".to_string();
        assert_eq!(plugin.filter(&mut state, &pod, &node()).code, Code::Unschedulable);
    }

    #[test]
    fn whole_gpu_pod_needs_enough_fully_free_gpus() {
        let plugin = GpuShareFilter;
        let mut state = CycleState::default();
        let pod = PodResource::new("p1", 100, 1000, 2);
        assert_eq!(plugin.filter(&mut state, &pod, &node()).code, Code::Unschedulable);

        let mut n = node();
        n.milli_gpu_left_list = vec![1000, 1000];
        assert_eq!(plugin.filter(&mut state, &pod, &n).code, Code::Success);
    }
}
