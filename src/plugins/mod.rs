//! Scheduler plugin contracts. Trimmed from the teacher's full
//! Kubernetes-scheduler-framework extension-point hierarchy
//! (`PreEnqueuePlugin`/`QueueSortPlugin`/`PreFilterPlugin`/
//! `PostFilterPlugin`/`PreScorePlugin`/`PermitPlugin`/`PreBindPlugin`/
//! `BindPlugin`/`PostBindPlugin`/`EnqueueExtension`) down to the three
//! extension points the scheduling cycle actually uses: `FilterPlugin`,
//! `ScorePlugin` (+ `ScoreExtension`), and `ReservePlugin` (spec §9 REDESIGN
//! FLAG "Scheduler-framework inheritance").

pub mod filter;
pub mod fgd;
pub mod gpu_select;
pub mod pwr;
pub mod pwrexp;

use crate::cycle_state::CycleState;
use crate::models::{NodeResource, PodResource};

pub const MAX_NODE_SCORE: i64 = 100;
pub const MIN_NODE_SCORE: i64 = 0;

pub trait Plugin {
    fn name(&self) -> &str;
}

/// Evaluates if a node can run a pod. Returns Success or Unschedulable; never
/// mutates state (spec §4.C).
pub trait FilterPlugin: Plugin {
    fn filter(&self, state: &mut CycleState, pod: &PodResource, node: &NodeResource) -> Status;
}

/// Plugin that ranks nodes passing the filtering phase (spec §4.D).
pub trait ScorePlugin: Plugin {
    /// Assigns a score to a node (higher = better, in the plugin's own
    /// native range).
    fn score(&self, state: &mut CycleState, pod: &PodResource, node: &NodeResource) -> (i64, Status);

    fn score_extension(&self) -> Box<dyn ScoreExtension>;
}

/// Companion to a `ScorePlugin`: picks the GPU id(s) within a chosen node
/// (spec §4.D "allocateGpuIdFunc"). Kept as a separate trait, not folded
/// into `score`'s return, so the contract the spec states explicitly holds
/// by construction: the same hypothetical scan that produced the winning
/// score is the one `allocate_gpu_ids` re-runs at reserve time.
pub trait GpuAllocator {
    /// `None` means no GPU satisfies the pod on this node.
    fn allocate_gpu_ids(&self, pod: &PodResource, node: &NodeResource) -> Option<Vec<usize>>;
}

pub struct NodeScore {
    pub name: String,
    pub score: i64,
}

pub trait ScoreExtension {
    fn normalize_score(&self, state: &CycleState, pod: &PodResource, scores: &mut [NodeScore]) -> Status;
}

/// Rescales raw scores linearly into `[0, max_score]`; `reverse` controls
/// what happens when every raw score is zero (spec `DefaultNormalizeScore`).
pub struct DefaultNormalizeScore {
    pub max_score: i64,
    pub reverse: bool,
}

impl ScoreExtension for DefaultNormalizeScore {
    fn normalize_score(&self, _state: &CycleState, _pod: &PodResource, scores: &mut [NodeScore]) -> Status {
        let max = scores.iter().map(|s| s.score).max().unwrap_or(0);
        if max == 0 {
            if self.reverse {
                for s in scores.iter_mut() {
                    s.score = self.max_score;
                }
            }
            return Status::default();
        }
        for s in scores.iter_mut() {
            s.score = self.max_score * s.score / max;
        }
        Status::default()
    }
}

/// Min-max rescale into `[0, MaxNodeScore]` used by PWR and PWREXP (spec
/// §4.D.2, §4.D.3). `reverse_polarity` flips the mapping so that the
/// *lowest* raw score becomes the *highest* normalised one, as PWREXP's
/// "after − before, lower is better" raw score requires.
pub struct MinMaxNormalizeScore {
    pub reverse_polarity: bool,
}

impl ScoreExtension for MinMaxNormalizeScore {
    fn normalize_score(&self, _state: &CycleState, _pod: &PodResource, scores: &mut [NodeScore]) -> Status {
        let Some(min) = scores.iter().map(|s| s.score).min() else {
            return Status::default();
        };
        let max = scores.iter().map(|s| s.score).max().unwrap_or(min);

        if min == max {
            for s in scores.iter_mut() {
                s.score = MAX_NODE_SCORE;
            }
            return Status::default();
        }

        for s in scores.iter_mut() {
            s.score = if self.reverse_polarity {
                (max - s.score) * MAX_NODE_SCORE / (max - min)
            } else {
                (s.score - min) * MAX_NODE_SCORE / (max - min)
            };
        }
        Status::default()
    }
}

/// Plugin that manages state updates when pods are reserved/unreserved (spec
/// §4.E, §4.F).
pub trait ReservePlugin: Plugin {
    fn reserve(&self, state: &mut CycleState, pod: &PodResource, node_name: &str, gpu_ids: &[usize]) -> Status;
    fn unreserve(&self, state: &mut CycleState, pod: &PodResource, node_name: &str);
}

#[derive(Clone, Debug)]
pub struct Status {
    pub code: Code,
    pub reasons: Vec<String>,
    pub err: String,
}

impl Default for Status {
    fn default() -> Self {
        Status {
            code: Code::Success,
            reasons: vec![],
            err: String::new(),
        }
    }
}

impl Status {
    pub fn new(code: Code, reasons: Vec<String>) -> Self {
        Status { code, reasons, err: String::new() }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Status { code: Code::Error, reasons: vec![], err: error.into() }
    }

    pub fn unschedulable(reason: impl Into<String>) -> Self {
        Status { code: Code::Unschedulable, reasons: vec![reason.into()], err: String::new() }
    }

    pub fn is_success(&self) -> bool {
        self.code == Code::Success
    }
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub enum Code {
    Success,
    Error,
    Unschedulable,
}
