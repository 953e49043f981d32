//! Vantage-point tree over Hamming distance.
//!
//! Hamming distance on `u64` is a true metric, so a VP-tree gives sound
//! triangle-inequality pruning: each node holds a vantage item and a
//! threshold; everything within the threshold lives in the left subtree,
//! everything beyond it in the right. Search keeps a bounded max-heap of
//! the k best candidates and only descends into the far side when the
//! current k-th best distance still permits a closer match there.

use std::collections::BinaryHeap;

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::hamming;

/// One indexed signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Item {
    pub sig: u64,
    pub id: u64,
}

struct Node {
    item: Item,
    threshold: f64,
    left: Option<Box<Node>>,
    right: Option<Box<Node>>,
}

impl Node {
    fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}

/// Max-heap entry; `BinaryHeap` keeps the worst candidate on top so it can
/// be evicted in O(log k).
struct Candidate {
    dist: f64,
    item: Item,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.dist == other.dist
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.dist.total_cmp(&other.dist)
    }
}

/// A vantage-point tree, built once over the full item set and read-only
/// afterwards.
pub struct VpTree {
    root: Option<Box<Node>>,
}

impl VpTree {
    /// Build with the default pivot seed. Rebuilds over the same items
    /// produce the same tree.
    pub fn new(items: Vec<Item>) -> Self {
        Self::with_seed(items, 0x5153_7472_6565)
    }

    /// Build with an explicit pivot seed.
    pub fn with_seed(items: Vec<Item>, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        Self { root: build(items, &mut rng) }
    }

    /// The up-to-k nearest neighbours of `target` and their distances, both
    /// ascending by distance. `k == 0` and an empty tree both yield empty
    /// arrays.
    pub fn search(&self, target: u64, k: usize) -> (Vec<Item>, Vec<f64>) {
        if k == 0 {
            return (Vec::new(), Vec::new());
        }

        let mut heap = BinaryHeap::with_capacity(k + 1);
        let mut tau = f64::INFINITY;
        visit(self.root.as_deref(), target, k, &mut tau, &mut heap);

        // The heap pops worst-first; reverse into nearest-first.
        let mut items = Vec::with_capacity(heap.len());
        let mut dists = Vec::with_capacity(heap.len());
        while let Some(c) = heap.pop() {
            items.push(c.item);
            dists.push(c.dist);
        }
        items.reverse();
        dists.reverse();
        (items, dists)
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }
}

fn build(mut items: Vec<Item>, rng: &mut StdRng) -> Option<Box<Node>> {
    if items.is_empty() {
        return None;
    }

    let vantage = items.swap_remove(rng.gen_range(0..items.len()));

    if items.is_empty() {
        return Some(Box::new(Node { item: vantage, threshold: 0.0, left: None, right: None }));
    }

    // Partition the remainder around the distance of the element at the
    // midpoint: move it out of the way, sweep everything at most as close
    // to the front, then drop it back at the boundary. Left gets the
    // within-threshold half, right the rest.
    let last = items.len() - 1;
    let median = items.len() / 2;
    let pivot_dist = hamming::distance_f64(items[median].sig, vantage.sig);
    items.swap(median, last);

    let mut boundary = 0;
    for i in 0..last {
        if hamming::distance_f64(items[i].sig, vantage.sig) <= pivot_dist {
            items.swap(boundary, i);
            boundary += 1;
        }
    }
    items.swap(last, boundary);

    let threshold = hamming::distance_f64(items[boundary].sig, vantage.sig);
    let right_items = items.split_off(boundary);
    let left = build(items, rng);
    let right = build(right_items, rng);

    Some(Box::new(Node { item: vantage, threshold, left, right }))
}

fn visit(
    node: Option<&Node>,
    target: u64,
    k: usize,
    tau: &mut f64,
    heap: &mut BinaryHeap<Candidate>,
) {
    let Some(n) = node else { return };

    let dist = hamming::distance_f64(n.item.sig, target);
    if dist < *tau {
        if heap.len() == k {
            heap.pop();
        }
        heap.push(Candidate { dist, item: n.item });
        if heap.len() == k {
            if let Some(worst) = heap.peek() {
                *tau = worst.dist;
            }
        }
    }

    if n.is_leaf() {
        return;
    }

    // Nearer side first; the far side only if the k-th best distance still
    // reaches across the threshold.
    if dist < n.threshold {
        if dist - *tau <= n.threshold {
            visit(n.left.as_deref(), target, k, tau, heap);
        }
        if dist + *tau >= n.threshold {
            visit(n.right.as_deref(), target, k, tau, heap);
        }
    } else {
        if dist + *tau >= n.threshold {
            visit(n.right.as_deref(), target, k, tau, heap);
        }
        if dist - *tau <= n.threshold {
            visit(n.left.as_deref(), target, k, tau, heap);
        }
    }
}
