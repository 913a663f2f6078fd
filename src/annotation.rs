//! Annotation namespace for interoperability with real Kubernetes pod
//! objects (spec §6). Internally the scheduling cycle never reads or writes
//! these strings — bindings are structured `Placement` records
//! (`crate::models::Placement`) — these constants exist purely as the
//! external serialisation boundary, per spec §9's "annotation-as-state
//! channel" design note. Carried over verbatim from `const.go`.

pub const VENDOR: &str = "alibabacloud.com";

pub const CPU_MODEL: &str = "alibabacloud.com/cpu-model";
pub const GPU_MILLI: &str = "alibabacloud.com/gpu-milli";
pub const GPU_COUNT: &str = "alibabacloud.com/gpu-count";
pub const GPU_INDEX: &str = "alibabacloud.com/gpu-index";
pub const GPU_CARD_MODEL: &str = "alibabacloud.com/gpu-card-model";
pub const ASSUME_TIME: &str = "alibabacloud.com/assume-time";
pub const CREATION_TIME: &str = "alibabacloud.com/creation-time";
pub const DELETION_TIME: &str = "alibabacloud.com/deletion-time";

/// Serialises a `Placement` into the annotation set a real Kubernetes pod
/// object would carry, at the external boundary only.
pub fn placement_annotations(placement: &crate::models::Placement) -> std::collections::BTreeMap<String, String> {
    let mut annotations = std::collections::BTreeMap::new();
    annotations.insert(GPU_COUNT.to_string(), placement.gpu_ids.len().to_string());
    if let Some(&first) = placement.gpu_ids.first() {
        annotations.insert(GPU_INDEX.to_string(), first.to_string());
    }
    annotations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Placement;

    #[test]
    fn serialises_gpu_index_of_the_first_bound_gpu() {
        let placement = Placement { pod_name: "p1".to_string(), node_name: "n1".to_string(), gpu_ids: vec![2, 3] };
        let annotations = placement_annotations(&placement);
        assert_eq!(annotations.get(GPU_INDEX).unwrap(), "2");
        assert_eq!(annotations.get(GPU_COUNT).unwrap(), "2");
    }
}
