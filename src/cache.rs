//! The GPU-share cache: authoritative per-GPU binding state, guarded by a
//! single reader/writer lock (spec §4.B, §5). Grounded in
//! `open_gpu_share.go`'s `SchedulerCache` (`AddOrUpdatePod`, `RemovePod`,
//! `GetGpuNodeInfo`, `AllocateGpuId`) and the teacher's simpler `cache.rs`
//! for the Rust-idiomatic `HashMap`-backed-struct shape.
//!
//! In the simulator the scheduling cycle is single-threaded (spec §5), so
//! the lock never experiences contention; it is kept because the same core
//! is meant to be able to drive a real, concurrently-updated cluster (spec
//! §9).

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::SimError;
use crate::models::PodResource;

/// Per-node structure recording, for each GPU id, the pods currently bound
/// to it and the milli-units they consume (spec §3, `GpuNodeInfo`).
#[derive(Clone, Debug, Default)]
pub struct GpuNodeInfo {
    pub milli_gpu_left_list: Vec<i64>,
    /// pod-key -> (gpu id, milli consumed)
    bindings: HashMap<String, (usize, i64)>,
}

impl GpuNodeInfo {
    pub fn new(gpu_count: usize) -> Self {
        GpuNodeInfo {
            milli_gpu_left_list: vec![crate::models::MILLI; gpu_count],
            bindings: HashMap::new(),
        }
    }

    /// First (lowest-index) GPU id that satisfies the pod, or `None` (spec
    /// §4.B).
    pub fn allocate_gpu_id(&self, pod: &PodResource) -> Option<usize> {
        if pod.is_gpu_share() {
            self.milli_gpu_left_list
                .iter()
                .position(|&left| left >= pod.milli_gpu)
        } else if pod.gpu_number > 0 {
            crate::models::canonical_whole_gpu_pick(&self.milli_gpu_left_list, pod.gpu_number as usize)
                .map(|ids| ids[0])
        } else {
            None
        }
    }

    /// Snapshot view used to stamp a node's metadata after a mutation (spec
    /// §4.B "ExportGpuNodeInfoAsStr").
    pub fn export(&self) -> Vec<i64> {
        self.milli_gpu_left_list.clone()
    }
}

/// Process-wide GPU-share cache, guarded by a single reader/writer lock.
#[derive(Default)]
pub struct GpuShareCache {
    nodes: RwLock<HashMap<String, GpuNodeInfo>>,
    /// pod-key -> node-name, to make `add_or_update_pod` idempotent across
    /// relocations (spec §4.B).
    pod_location: RwLock<HashMap<String, String>>,
}

impl GpuShareCache {
    pub fn new() -> Self {
        GpuShareCache {
            nodes: RwLock::new(HashMap::new()),
            pod_location: RwLock::new(HashMap::new()),
        }
    }

    pub fn init_node(&self, node_name: &str, gpu_count: usize) {
        self.nodes
            .write()
            .expect("gpu share cache lock poisoned")
            .insert(node_name.to_string(), GpuNodeInfo::new(gpu_count));
    }

    pub fn remove_node(&self, node_name: &str) {
        self.nodes
            .write()
            .expect("gpu share cache lock poisoned")
            .remove(node_name);
    }

    /// Returns a snapshot view of the node's GPU state; fails if the node is
    /// unknown (spec §4.B).
    pub fn get_gpu_node_info(&self, node_name: &str) -> Result<GpuNodeInfo, SimError> {
        self.nodes
            .read()
            .expect("gpu share cache lock poisoned")
            .get(node_name)
            .cloned()
            .ok_or_else(|| SimError::NodeLookupMiss(node_name.to_string()))
    }

    /// Idempotent by pod-key: if the pod was previously recorded on a
    /// different node, its old allocation is released before the new one is
    /// applied (spec §4.B).
    pub fn add_or_update_pod(
        &self,
        pod_key: &str,
        node_name: &str,
        gpu_id: usize,
        milli: i64,
    ) -> Result<(), SimError> {
        let previous = self
            .pod_location
            .read()
            .expect("gpu share cache lock poisoned")
            .get(pod_key)
            .cloned();
        if let Some(prev_node) = previous {
            if prev_node != node_name {
                self.release_binding(pod_key, &prev_node);
            }
        }

        let mut nodes = self.nodes.write().expect("gpu share cache lock poisoned");
        let node = nodes
            .get_mut(node_name)
            .ok_or_else(|| SimError::NodeLookupMiss(node_name.to_string()))?;
        if let Some(&(old_gpu, old_milli)) = node.bindings.get(pod_key) {
            if let Some(left) = node.milli_gpu_left_list.get_mut(old_gpu) {
                *left = (*left + old_milli).min(crate::models::MILLI);
            }
        }
        let left = node
            .milli_gpu_left_list
            .get_mut(gpu_id)
            .ok_or_else(|| SimError::AllocationFailure {
                pod: pod_key.to_string(),
                node: node_name.to_string(),
            })?;
        if *left < milli {
            return Err(SimError::AllocationFailure {
                pod: pod_key.to_string(),
                node: node_name.to_string(),
            });
        }
        *left -= milli;
        node.bindings.insert(pod_key.to_string(), (gpu_id, milli));
        drop(nodes);

        self.pod_location
            .write()
            .expect("gpu share cache lock poisoned")
            .insert(pod_key.to_string(), node_name.to_string());
        Ok(())
    }

    /// Releases GPU milli-units held by the pod on the named node; silently
    /// no-op if the pod is unknown (spec §4.B).
    pub fn remove_pod(&self, pod_key: &str, node_name: &str) {
        self.release_binding(pod_key, node_name);
        self.pod_location
            .write()
            .expect("gpu share cache lock poisoned")
            .remove(pod_key);
    }

    fn release_binding(&self, pod_key: &str, node_name: &str) {
        let mut nodes = self.nodes.write().expect("gpu share cache lock poisoned");
        if let Some(node) = nodes.get_mut(node_name) {
            if let Some((gpu_id, milli)) = node.bindings.remove(pod_key) {
                if let Some(left) = node.milli_gpu_left_list.get_mut(gpu_id) {
                    *left = (*left + milli).min(crate::models::MILLI);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_node_lookup_fails() {
        let cache = GpuShareCache::new();
        assert!(cache.get_gpu_node_info("missing").is_err());
    }

    #[test]
    fn add_then_remove_releases_milli() {
        let cache = GpuShareCache::new();
        cache.init_node("n1", 2);
        cache.add_or_update_pod("p1", "n1", 0, 300).unwrap();
        let info = cache.get_gpu_node_info("n1").unwrap();
        assert_eq!(info.milli_gpu_left_list[0], 700);

        cache.remove_pod("p1", "n1");
        let info = cache.get_gpu_node_info("n1").unwrap();
        assert_eq!(info.milli_gpu_left_list[0], 1000);
    }

    #[test]
    fn relocating_a_pod_releases_the_old_node() {
        let cache = GpuShareCache::new();
        cache.init_node("n1", 1);
        cache.init_node("n2", 1);
        cache.add_or_update_pod("p1", "n1", 0, 300).unwrap();
        cache.add_or_update_pod("p1", "n2", 0, 300).unwrap();

        assert_eq!(cache.get_gpu_node_info("n1").unwrap().milli_gpu_left_list[0], 1000);
        assert_eq!(cache.get_gpu_node_info("n2").unwrap().milli_gpu_left_list[0], 700);
    }

    #[test]
    fn remove_unknown_pod_is_a_noop() {
        let cache = GpuShareCache::new();
        cache.init_node("n1", 1);
        cache.remove_pod("ghost", "n1");
        assert_eq!(cache.get_gpu_node_info("n1").unwrap().milli_gpu_left_list[0], 1000);
    }
}
