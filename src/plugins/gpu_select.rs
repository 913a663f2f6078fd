//! Pure GPU-selection strategies: these plugins never score nodes, they only
//! pick which GPU on an already-chosen node a pod lands on (spec §4.D.4-6).
//! Grounded in `open_gpu_share.go`'s `allocateGpuIdBasedOnBestFit` /
//! `...WorstFit` / `...RandomFit`.

use rand::Rng;

use crate::models::{canonical_whole_gpu_pick, NodeResource, PodResource, MILLI};
use crate::plugins::GpuAllocator;

/// Picks the fullest GPU that still fits the pod (smallest sufficient
/// leftover), packing share pods tightly.
pub struct BestFit;

impl GpuAllocator for BestFit {
    fn allocate_gpu_ids(&self, pod: &PodResource, node: &NodeResource) -> Option<Vec<usize>> {
        if pod.is_gpu_share() {
            node.milli_gpu_left_list
                .iter()
                .enumerate()
                .filter(|&(_, &left)| left >= pod.milli_gpu)
                .min_by_key(|&(_, &left)| left)
                .map(|(i, _)| vec![i])
        } else if pod.gpu_number > 0 {
            canonical_whole_gpu_pick(&node.milli_gpu_left_list, pod.gpu_number as usize)
        } else {
            None
        }
    }
}

/// Picks the emptiest GPU that still fits the pod (largest leftover),
/// spreading share pods across GPUs.
pub struct WorstFit;

impl GpuAllocator for WorstFit {
    fn allocate_gpu_ids(&self, pod: &PodResource, node: &NodeResource) -> Option<Vec<usize>> {
        if pod.is_gpu_share() {
            // `max_by_key` keeps the *last* maximal element on a tie; the
            // original only replaces its candidate on strict `>`, keeping
            // the first (lowest-index) GPU among ties. Fold explicitly to
            // match that.
            node.milli_gpu_left_list
                .iter()
                .enumerate()
                .filter(|&(_, &left)| left >= pod.milli_gpu)
                .fold(None::<(usize, i64)>, |best, (i, &left)| match best {
                    Some((_, b)) if left > b => Some((i, left)),
                    Some(b) => Some(b),
                    None => Some((i, left)),
                })
                .map(|(i, _)| vec![i])
        } else if pod.gpu_number > 0 {
            canonical_whole_gpu_pick(&node.milli_gpu_left_list, pod.gpu_number as usize)
        } else {
            None
        }
    }
}

/// Picks a uniformly random fitting GPU via single-pass reservoir sampling
/// (Vitter's algorithm R, degenerate n=1 case): walk the candidates once,
/// keep a running count `c` of fits seen so far and replace the held
/// candidate with probability `1/c`.
pub struct RandomFit;

impl GpuAllocator for RandomFit {
    fn allocate_gpu_ids(&self, pod: &PodResource, node: &NodeResource) -> Option<Vec<usize>> {
        if pod.is_gpu_share() {
            let mut rng = rand::rng();
            let mut chosen: Option<usize> = None;
            let mut count = 0_u32;
            for (i, &left) in node.milli_gpu_left_list.iter().enumerate() {
                if left < pod.milli_gpu {
                    continue;
                }
                count += 1;
                if rng.random_range(0..count) == 0 {
                    chosen = Some(i);
                }
            }
            chosen.map(|g| vec![g])
        } else if pod.gpu_number > 0 {
            canonical_whole_gpu_pick(&node.milli_gpu_left_list, pod.gpu_number as usize)
        } else {
            None
        }
    }
}

/// Invariant shared by all three selectors and enforced at ingest by
/// `PodResource::validate`: a share pod never spans more than one GPU.
#[allow(dead_code)]
fn assert_single_gpu_share(pod: &PodResource) {
    debug_assert!(!(pod.milli_gpu < MILLI && pod.gpu_number > 1));
}
