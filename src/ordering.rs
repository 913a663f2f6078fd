//! Pod-ordering pre-pass run once before the scheduling cycle begins (spec
//! §4.E): an optional seeded shuffle, followed by an optional stable
//! affinity-first sort. Grounded in `affinity.go`'s `AffinityQueue.Less`
//! (pods with a node selector sort first) generalised from a `sort.Interface`
//! to a plain stable sort, plus a shuffle stage the original expressed only
//! as a CLI-level option (`shufflePod`).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::models::PodResource;

/// Options governing the pre-pass; mirrors the `shufflePod` /
/// `shuffle-seed` / affinity-ordering options of spec §6.
#[derive(Clone, Copy, Debug, Default)]
pub struct OrderingOptions {
    pub shuffle: bool,
    pub shuffle_seed: u64,
    pub affinity_ordering: bool,
}

/// Applies the pre-pass in spec order: shuffle first, affinity sort second.
pub fn order_pods(pods: &mut Vec<PodResource>, options: &OrderingOptions) {
    if options.shuffle {
        shuffle(pods, options.shuffle_seed);
    }
    if options.affinity_ordering {
        // stable: pods with a node selector move to the front, relative
        // order among equals preserved.
        pods.sort_by_key(|p| !p.has_node_selector());
    }
}

/// Seeded Fisher-Yates shuffle for reproducibility across runs (spec §5
/// "PRNG state ... seeded from configuration").
fn shuffle(pods: &mut [PodResource], seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    for i in (1..pods.len()).rev() {
        let j = rng.random_range(0..=i);
        pods.swap(i, j);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pod_with_selector(name: &str) -> PodResource {
        let mut p = PodResource::new(name, 0, 0, 0);
        p.node_selector.insert("zone".to_string(), "a".to_string());
        p
    }

    #[test]
    fn affinity_ordering_moves_selector_pods_first_and_is_stable() {
        let mut pods = vec![
            PodResource::new("p1", 0, 0, 0),
            pod_with_selector("p2"),
            PodResource::new("p3", 0, 0, 0),
            pod_with_selector("p4"),
        ];
        let options = OrderingOptions { shuffle: false, shuffle_seed: 0, affinity_ordering: true };
        order_pods(&mut pods, &options);
        let names: Vec<_> = pods.iter().map(|p| p.pod_name.as_str()).collect();
        assert_eq!(names, vec!["p2", "p4", "p1", "p3"]);
    }

    #[test]
    fn no_options_preserves_order() {
        let mut pods = vec![
            PodResource::new("p1", 0, 0, 0),
            PodResource::new("p2", 0, 0, 0),
        ];
        let options = OrderingOptions::default();
        order_pods(&mut pods, &options);
        assert_eq!(pods[0].pod_name, "p1");
        assert_eq!(pods[1].pod_name, "p2");
    }

    #[test]
    fn same_seed_produces_same_shuffle() {
        let names: Vec<String> = (0..10).map(|i| format!("p{i}")).collect();
        let make = || names.iter().map(|n| PodResource::new(n.clone(), 0, 0, 0)).collect::<Vec<_>>();

        let mut a = make();
        let mut b = make();
        let options = OrderingOptions { shuffle: true, shuffle_seed: 42, affinity_ordering: false };
        order_pods(&mut a, &options);
        order_pods(&mut b, &options);
        let names_a: Vec<_> = a.iter().map(|p| p.pod_name.clone()).collect();
        let names_b: Vec<_> = b.iter().map(|p| p.pod_name.clone()).collect();
        assert_eq!(names_a, names_b);
    }
}
