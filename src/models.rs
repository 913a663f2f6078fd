//! Core data model: node/pod resource records and the placement record they
//! produce once reserved. Grounded in the teacher's flat `NodeInfo`/`PodInfo`
//! shape (`models.rs`) and in the original `simontype.NodeResource` /
//! `PodResource` referenced throughout `fgd_score.go` / `pwrexp_score.go` /
//! `open_gpu_share.go`.

use crate::error::SimError;

/// One physical GPU is fully free when it holds this many milli-units.
pub const MILLI: i64 = 1000;

/// A simulated node's resource state. `milli_gpu_left_list[i]` is the
/// remaining milli-GPU on the i-th physical GPU; its length is the node's
/// GPU count and never changes after construction.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeResource {
    pub node_name: String,
    pub milli_cpu_left: i64,
    pub milli_cpu_capacity: i64,
    pub milli_gpu_left_list: Vec<i64>,
    pub gpu_type: String,
    pub cpu_type: String,
}

impl NodeResource {
    pub fn new(
        node_name: impl Into<String>,
        milli_cpu_capacity: i64,
        gpu_count: usize,
        gpu_type: impl Into<String>,
        cpu_type: impl Into<String>,
    ) -> Self {
        NodeResource {
            node_name: node_name.into(),
            milli_cpu_left: milli_cpu_capacity,
            milli_cpu_capacity,
            milli_gpu_left_list: vec![MILLI; gpu_count],
            gpu_type: gpu_type.into(),
            cpu_type: cpu_type.into(),
        }
    }

    pub fn gpu_total(&self) -> usize {
        self.milli_gpu_left_list.len()
    }

    /// Deep-copies the node so hypothetical placements can be evaluated
    /// without mutating the real state (spec §4.A).
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// Verifies the invariants of §3: every GPU's left-milli in [0, 1000],
    /// non-negative CPU left, and stable GPU count.
    pub fn check_invariants(&self) -> Result<(), SimError> {
        if self.milli_cpu_left < 0 {
            return Err(SimError::InvariantViolation(format!(
                "node {} has negative milli_cpu_left {}",
                self.node_name, self.milli_cpu_left
            )));
        }
        for (i, &left) in self.milli_gpu_left_list.iter().enumerate() {
            if !(0..=MILLI).contains(&left) {
                return Err(SimError::InvariantViolation(format!(
                    "node {} gpu {} milli_left {} out of [0,1000]",
                    self.node_name, i, left
                )));
            }
        }
        Ok(())
    }

    /// Subtracts a whole-GPU or CPU-only pod's resources from the node,
    /// returning the hypothetical resulting state. Share pods never go
    /// through `sub` — they mutate a single GPU's milli directly via
    /// `allocate_share`/`release_share`, since `sub` only knows how to pick
    /// *whole* GPUs (spec §4.A).
    pub fn sub(&self, pod: &PodResource) -> Result<NodeResource, SimError> {
        if pod.is_gpu_share() {
            return Err(SimError::InvariantViolation(
                "sub() called with a GPU-share pod; use allocate_share instead".to_string(),
            ));
        }
        let mut next = self.clone();
        if next.milli_cpu_left < pod.milli_cpu {
            return Err(SimError::InvariantViolation(format!(
                "node {} cannot subtract {} milli_cpu, only {} left",
                self.node_name, pod.milli_cpu, next.milli_cpu_left
            )));
        }
        next.milli_cpu_left -= pod.milli_cpu;

        if pod.gpu_number > 0 {
            let picked = canonical_whole_gpu_pick(&next.milli_gpu_left_list, pod.gpu_number as usize)
                .ok_or_else(|| {
                    SimError::InvariantViolation(format!(
                        "node {} does not have {} whole free GPUs",
                        self.node_name, pod.gpu_number
                    ))
                })?;
            for i in picked {
                next.milli_gpu_left_list[i] = 0;
            }
        }
        Ok(next)
    }

    /// Inverse of `sub`: restores the CPU and the named GPUs (spec §8 P2).
    pub fn add(&self, pod: &PodResource, gpu_ids: &[usize]) -> NodeResource {
        let mut next = self.clone();
        next.milli_cpu_left += pod.milli_cpu;
        for &i in gpu_ids {
            next.milli_gpu_left_list[i] = MILLI;
        }
        next
    }

    /// Allocates `milli` units of a share pod onto a specific GPU, returning
    /// the hypothetical resulting state.
    pub fn allocate_share(&self, gpu_id: usize, milli_cpu: i64, milli_gpu: i64) -> Result<NodeResource, SimError> {
        let mut next = self.clone();
        if next.milli_cpu_left < milli_cpu {
            return Err(SimError::InvariantViolation(format!(
                "node {} cannot subtract {} milli_cpu, only {} left",
                self.node_name, milli_cpu, next.milli_cpu_left
            )));
        }
        let left = next
            .milli_gpu_left_list
            .get_mut(gpu_id)
            .ok_or_else(|| SimError::InvariantViolation(format!("gpu id {gpu_id} out of range")))?;
        if *left < milli_gpu {
            return Err(SimError::InvariantViolation(format!(
                "node {} gpu {} cannot subtract {} milli, only {} left",
                self.node_name, gpu_id, milli_gpu, left
            )));
        }
        *left -= milli_gpu;
        next.milli_cpu_left -= milli_cpu;
        Ok(next)
    }

    /// Releases `milli` units previously allocated on `gpu_id` by a share pod.
    pub fn release_share(&self, gpu_id: usize, milli_cpu: i64, milli_gpu: i64) -> NodeResource {
        let mut next = self.clone();
        next.milli_cpu_left += milli_cpu;
        if let Some(left) = next.milli_gpu_left_list.get_mut(gpu_id) {
            *left = (*left + milli_gpu).min(MILLI);
        }
        next
    }
}

/// The lowest-indexed `count` GPUs that are entirely free (spec glossary:
/// "canonical whole-GPU pick"). Returns `None` if fewer than `count` qualify.
pub fn canonical_whole_gpu_pick(milli_gpu_left_list: &[i64], count: usize) -> Option<Vec<usize>> {
    let picked: Vec<usize> = milli_gpu_left_list
        .iter()
        .enumerate()
        .filter(|(_, &left)| left == MILLI)
        .map(|(i, _)| i)
        .take(count)
        .collect();
    if picked.len() == count {
        Some(picked)
    } else {
        None
    }
}

/// A pending or scheduled pod's resource request.
#[derive(Clone, Debug, PartialEq)]
pub struct PodResource {
    pub pod_name: String,
    pub milli_cpu: i64,
    pub milli_gpu: i64,
    pub gpu_number: i64,
    pub gpu_type: String,
    pub cpu_type: String,
    /// Kubernetes-style node selector carried for affinity ordering (spec
    /// §4.E pod-ordering pre-pass); empty means "no affinity requirement".
    pub node_selector: std::collections::BTreeMap<String, String>,
}

impl PodResource {
    pub fn new(pod_name: impl Into<String>, milli_cpu: i64, milli_gpu: i64, gpu_number: i64) -> Self {
        PodResource {
            pod_name: pod_name.into(),
            milli_cpu,
            milli_gpu,
            gpu_number,
            gpu_type: String::new(),
            cpu_type: String::new(),
            node_selector: std::collections::BTreeMap::new(),
        }
    }

    /// A non-empty node selector marks the pod for affinity-first ordering
    /// (spec §4.E, grounded in `affinity.go`'s `AffinityQueue.Less`).
    pub fn has_node_selector(&self) -> bool {
        !self.node_selector.is_empty()
    }

    pub fn requests_nothing(&self) -> bool {
        self.milli_cpu == 0 && self.gpu_number == 0
    }

    /// `GpuNumber == 1 ∧ MilliGpu < 1000` (glossary: share pod).
    pub fn is_gpu_share(&self) -> bool {
        self.gpu_number == 1 && self.milli_gpu < MILLI
    }

    /// `MilliGpu == 1000 ∧ GpuNumber ≥ 1` (glossary: whole-GPU pod).
    pub fn is_whole_gpu(&self) -> bool {
        self.gpu_number >= 1 && self.milli_gpu == MILLI
    }

    /// Rejects pods sharing across more than one GPU at ingest (spec §3, §7).
    pub fn validate(&self) -> Result<(), SimError> {
        if self.gpu_number > 1 && self.milli_gpu < MILLI {
            return Err(SimError::InvariantViolation(format!(
                "pod {} requests share ({} milli) on {} GPUs; sharing across >1 GPU is rejected at ingest",
                self.pod_name, self.milli_gpu, self.gpu_number
            )));
        }
        if self.gpu_number >= 1 && !(1..=MILLI).contains(&self.milli_gpu) {
            return Err(SimError::BadInput(format!(
                "pod {} requests milli_gpu {} outside [1,1000]",
                self.pod_name, self.milli_gpu
            )));
        }
        Ok(())
    }
}

/// One entry of the typical-pod catalogue: a representative pod shape and
/// its probability of occurrence in the target workload.
#[derive(Clone, Debug)]
pub struct TypicalPodEntry {
    pub pod: PodResource,
    pub percentage: f64,
}

/// The ordered, read-only target-workload distribution used by FGD/PWREXP.
#[derive(Clone, Debug, Default)]
pub struct TypicalPodList(pub Vec<TypicalPodEntry>);

impl TypicalPodList {
    pub fn new(entries: Vec<TypicalPodEntry>) -> Self {
        TypicalPodList(entries)
    }

    /// Entries whose percentage lies in [0,1]; entries outside that range are
    /// skipped per spec §4.F (logged, not treated as fatal).
    pub fn valid_entries(&self) -> impl Iterator<Item = &TypicalPodEntry> {
        self.0.iter().filter(|e| {
            let ok = (0.0..=1.0).contains(&e.percentage);
            if !ok {
                log::error!("typical pod {} has bad frequency: {}", e.pod.pod_name, e.percentage);
            }
            ok
        })
    }
}

/// `{pod-key, node-name, gpu-id-list}` appended once per successful
/// reservation (spec §3).
#[derive(Clone, Debug, PartialEq)]
pub struct Placement {
    pub pod_name: String,
    pub node_name: String,
    pub gpu_ids: Vec<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_rejects_share_pods() {
        let node = NodeResource::new("n1", 4000, 2, "A100", "Intel");
        let pod = PodResource::new("p1", 100, 300, 1);
        assert!(node.sub(&pod).is_err());
    }

    #[test]
    fn sub_picks_lowest_index_whole_gpus() {
        let mut node = NodeResource::new("n1", 4000, 4, "A100", "Intel");
        node.milli_gpu_left_list = vec![MILLI, 600, MILLI, MILLI];
        let pod = PodResource::new("p1", 100, MILLI, 2);
        let next = node.sub(&pod).unwrap();
        assert_eq!(next.milli_gpu_left_list, vec![0, 600, 0, MILLI]);
        assert_eq!(next.milli_cpu_left, 3900);
    }

    #[test]
    fn sub_then_add_is_inverse() {
        let node = NodeResource::new("n1", 4000, 2, "A100", "Intel");
        let pod = PodResource::new("p1", 100, MILLI, 1);
        let picked = canonical_whole_gpu_pick(&node.milli_gpu_left_list, 1).unwrap();
        let subbed = node.sub(&pod).unwrap();
        let restored = subbed.add(&pod, &picked);
        assert_eq!(restored, node);
    }

    #[test]
    fn validate_rejects_share_across_multiple_gpus() {
        let pod = PodResource::new("p1", 0, 500, 2);
        assert!(pod.validate().is_err());
    }

    #[test]
    fn validate_accepts_whole_gpu_pods() {
        let pod = PodResource::new("p1", 0, MILLI, 2);
        assert!(pod.validate().is_ok());
    }
}
