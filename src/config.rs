//! Deserialisable configuration contracts (spec §6 "Configuration inputs").
//! Grounded field-for-field in `types.go`'s `CustomConfig` /
//! `WorkloadInflationConfig` / `WorkloadTuningConfig` / `DescheduleConfig` /
//! `TypicalPodsConfig`; `serde` + `serde_yaml` follow the teacher's config
//! ingestion stack.

use serde::Deserialize;

/// One node in the cluster definition (spec §6).
#[derive(Debug, Clone, Deserialize)]
pub struct NodeSpec {
    pub name: String,
    #[serde(rename = "gpu-type", default)]
    pub gpu_type: String,
    #[serde(rename = "cpu-type", default)]
    pub cpu_type: String,
    #[serde(rename = "gpu-count", default)]
    pub gpu_count: usize,
    #[serde(rename = "cpu-milli-capacity")]
    pub cpu_milli_capacity: i64,
}

/// One pod in the workload definition (spec §6).
#[derive(Debug, Clone, Deserialize)]
pub struct PodSpec {
    pub name: String,
    #[serde(rename = "milli-cpu", default)]
    pub milli_cpu: i64,
    #[serde(rename = "milli-gpu", default)]
    pub milli_gpu: i64,
    #[serde(rename = "gpu-count", default)]
    pub gpu_count: i64,
    #[serde(rename = "gpu-type", default)]
    pub gpu_type: String,
    #[serde(rename = "cpu-type", default)]
    pub cpu_type: String,
    #[serde(default)]
    pub node_selector: std::collections::BTreeMap<String, String>,
}

/// `{PodResource, percentage}` catalogue entry (spec §3 `TypicalPodEntry`).
#[derive(Debug, Clone, Deserialize)]
pub struct TypicalPodSpec {
    pub pod: PodSpec,
    pub percentage: f64,
}

/// Scoring/selection policy name (spec §6 "Policy selection").
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PolicyName {
    Fgd,
    Pwr,
    Pwrexp,
    OpenGpuShareBestFit,
    OpenGpuShareWorstFit,
    OpenGpuShareRandom,
}

/// Replicates the workload by a multiplicative ratio (spec §6, `types.go`
/// `WorkloadInflationConfig`). Out-of-core-scope processing; the shape is
/// carried so a caller wiring the simulator up to real config files has
/// somewhere to deserialise it.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct WorkloadInflationConfig {
    #[serde(default)]
    pub ratio: f64,
    #[serde(default)]
    pub seed: i64,
}

/// Prunes/appends pods to reach `ratio * cluster-GPU-capacity` (spec §6,
/// `types.go` `WorkloadTuningConfig`).
#[derive(Debug, Clone, Deserialize, Default)]
pub struct WorkloadTuningConfig {
    #[serde(default)]
    pub ratio: f64,
    #[serde(default)]
    pub seed: i64,
}

/// Pass-through descheduling config; out of core scope (spec §6).
#[derive(Debug, Clone, Deserialize, Default)]
pub struct DescheduleConfig {
    #[serde(default)]
    pub ratio: f64,
    #[serde(default)]
    pub policy: String,
}

/// Parameters for deriving a typical-pod list from history; an external
/// collaborator's config, carried through unprocessed by the core (spec §6).
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TypicalPodsConfig {
    #[serde(default)]
    pub is_involved_cpu_pods: bool,
    #[serde(default)]
    pub pod_popularity_threshold: f64,
    #[serde(default)]
    pub pod_increase_step: f64,
    #[serde(default)]
    pub gpu_res_weight: f64,
}

/// Top-level options bag (spec §6 "Recognised options").
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CustomConfig {
    #[serde(default)]
    pub shuffle_pod: bool,
    #[serde(default)]
    pub shuffle_seed: u64,
    #[serde(default)]
    pub affinity_ordering: bool,
    #[serde(default)]
    pub workload_inflation_config: WorkloadInflationConfig,
    #[serde(default)]
    pub workload_tuning_config: WorkloadTuningConfig,
    #[serde(default)]
    pub deschedule_config: DescheduleConfig,
    #[serde(default)]
    pub typical_pods_config: TypicalPodsConfig,
}

/// The full run input: cluster, workload, policy, typical-pod catalogue and
/// options (spec §6).
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    pub nodes: Vec<NodeSpec>,
    pub pods: Vec<PodSpec>,
    pub policy: PolicyName,
    #[serde(default)]
    pub typical_pods: Vec<TypicalPodSpec>,
    #[serde(default)]
    pub options: CustomConfig,
}

impl From<&NodeSpec> for crate::models::NodeResource {
    fn from(spec: &NodeSpec) -> Self {
        crate::models::NodeResource::new(
            spec.name.clone(),
            spec.cpu_milli_capacity,
            spec.gpu_count,
            spec.gpu_type.clone(),
            spec.cpu_type.clone(),
        )
    }
}

impl From<PolicyName> for crate::scheduler::ScorePolicy {
    fn from(name: PolicyName) -> Self {
        match name {
            PolicyName::Fgd => crate::scheduler::ScorePolicy::Fgd,
            PolicyName::Pwr => crate::scheduler::ScorePolicy::Pwr,
            PolicyName::Pwrexp => crate::scheduler::ScorePolicy::Pwrexp,
            PolicyName::OpenGpuShareBestFit => crate::scheduler::ScorePolicy::OpenGpuShareBestFit,
            PolicyName::OpenGpuShareWorstFit => crate::scheduler::ScorePolicy::OpenGpuShareWorstFit,
            PolicyName::OpenGpuShareRandom => crate::scheduler::ScorePolicy::OpenGpuShareRandom,
        }
    }
}

impl From<&PodSpec> for crate::models::PodResource {
    fn from(spec: &PodSpec) -> Self {
        let mut pod = crate::models::PodResource::new(spec.name.clone(), spec.milli_cpu, spec.milli_gpu, spec.gpu_count);
        pod.gpu_type = spec.gpu_type.clone();
        pod.cpu_type = spec.cpu_type.clone();
        pod.node_selector = spec.node_selector.clone();
        pod
    }
}
