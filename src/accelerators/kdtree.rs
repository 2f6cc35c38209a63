//! The indexed kd-tree (§4.I) used for photon/vertex-cache nearest
//! neighbor lookups: a median-split tree over an arbitrary entry type,
//! packed into 12-byte array nodes (`IndexKdTreeArrayNode`) rather than a
//! pointer-linked tree, for cache-friendly traversal.

use crate::geometry::{Bounds3f, Point3f, Vector3f};
use crate::pbrt::Float;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// `axis = 3` marks a leaf node; non-leaf nodes use `0..=2` (§3
/// "IndexKdTreeArrayNode").
const AXIS_LEAF: u32 = 3;

/// Sentinel meaning "no right child", occupying the 29-bit
/// `rightChildIndex` field (`0x1fffffff`, all ones).
pub const RIGHT_CHILD_SENTINEL: u32 = 0x1fffffff;

/// Every payload `IndexKdTree` is built over must expose a 3D position
/// plus the two directional quantities the near-entry filter checks
/// against: the direction the entry was deposited along (for the
/// hemisphere test) and the surface normal it landed on (for the
/// normal-cosine test). Concrete payloads (photons, vertex-merging
/// records) supply these; the tree itself is payload-agnostic.
pub trait KdTreeEntry {
    fn position(&self) -> Point3f;
    fn direction(&self) -> Vector3f;
    fn landing_surface_normal(&self) -> Vector3f;
}

/// A packed 12-byte kd-tree node (§3). `node_data` bitfield layout is
/// `{axis:2, hasLeftChild:1, rightChildIndex:29}`; a leaf stores `axis =
/// 3` and `index` as the entry this node represents (the median of its
/// build range).
#[derive(Copy, Clone, Debug)]
pub struct IndexKdTreeArrayNode {
    pub split_pos: Float,
    pub index: u32,
    node_data: u32,
}

fn pack(axis: u32, has_left_child: bool, right_child_index: u32) -> u32 {
    debug_assert!(axis <= AXIS_LEAF);
    debug_assert!(right_child_index <= RIGHT_CHILD_SENTINEL);
    (axis & 0b11) | ((has_left_child as u32) << 2) | (right_child_index << 3)
}

impl IndexKdTreeArrayNode {
    fn leaf(index: u32) -> Self {
        Self {
            split_pos: 0.0,
            index,
            node_data: pack(AXIS_LEAF, false, RIGHT_CHILD_SENTINEL),
        }
    }

    fn interior(axis: u32, index: u32, split_pos: Float, has_left_child: bool, right_child_index: u32) -> Self {
        Self {
            split_pos,
            index,
            node_data: pack(axis, has_left_child, right_child_index),
        }
    }

    pub fn axis(&self) -> u32 {
        self.node_data & 0b11
    }

    pub fn is_leaf(&self) -> bool {
        self.axis() == AXIS_LEAF
    }

    pub fn has_left_child(&self) -> bool {
        (self.node_data >> 2) & 1 == 1
    }

    pub fn right_child_index(&self) -> u32 {
        self.node_data >> 3
    }
}

/// A top-down, median-split kd-tree over `entries`, indexed by position
/// rather than storing the entries themselves inline in the tree (§3).
pub struct IndexKdTree<E> {
    nodes: Vec<IndexKdTreeArrayNode>,
    entries: Vec<E>,
}

impl<E: KdTreeEntry> IndexKdTree<E> {
    /// Builds the tree by recursively choosing the longest-extent axis,
    /// partitioning around the median via `select_nth_unstable_by`
    /// (equivalent to `nth_element`), and recursing on each half. A
    /// single-element range is a leaf (§4.I "Build").
    pub fn build(entries: Vec<E>) -> Self {
        let mut nodes = Vec::with_capacity(entries.len());
        if !entries.is_empty() {
            let mut indices: Vec<u32> = (0..entries.len() as u32).collect();
            build_node(&entries, &mut indices, &mut nodes);
        }
        Self { nodes, entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entry(&self, index: usize) -> &E {
        &self.entries[index]
    }

    /// Iterative stack-based k-nearest lookup bounded by
    /// `entry_max_look_up_count`, accepting only entries passing the
    /// distance, hemisphere and surface-normal filters (§4.I "Lookup").
    /// `max_dist2` is shrunk as the bounded heap fills, letting further
    /// descent prune subtrees that can no longer contribute. Returns
    /// `(entry_index, dist2)` pairs in ascending distance order.
    pub fn get_all_near_entries(
        &self,
        query_p: Point3f,
        query_n: Vector3f,
        mut max_dist2: Float,
        entry_normal_cos_angle: Float,
        entry_max_look_up_count: usize,
    ) -> Vec<(usize, Float)> {
        let mut heap: BinaryHeap<HeapItem> = BinaryHeap::new();
        if self.nodes.is_empty() || entry_max_look_up_count == 0 {
            return Vec::new();
        }

        let mut stack = vec![0u32];
        while let Some(node_idx) = stack.pop() {
            let node = &self.nodes[node_idx as usize];
            let entry = &self.entries[node.index as usize];

            let dist2 = entry.position().distance_squared(&query_p);
            let hemisphere_ok = query_n.dot(&(-entry.direction())) > 0.0;
            let normal_ok = query_n.dot(&entry.landing_surface_normal()) > entry_normal_cos_angle;
            if dist2 < max_dist2 && hemisphere_ok && normal_ok {
                if heap.len() < entry_max_look_up_count {
                    heap.push(HeapItem { dist2, index: node.index as usize });
                    if heap.len() == entry_max_look_up_count {
                        max_dist2 = heap.peek().unwrap().dist2;
                    }
                } else if let Some(farthest) = heap.peek().copied() {
                    if dist2 < farthest.dist2 {
                        heap.pop();
                        heap.push(HeapItem { dist2, index: node.index as usize });
                        max_dist2 = heap.peek().unwrap().dist2;
                    }
                }
            }

            if node.is_leaf() {
                continue;
            }

            let axis = node.axis() as usize;
            let d = query_p[axis] - node.split_pos;
            let left = if node.has_left_child() { Some(node_idx + 1) } else { None };
            let right = if node.right_child_index() != RIGHT_CHILD_SENTINEL {
                Some(node.right_child_index())
            } else {
                None
            };
            let (near, far) = if d < 0.0 { (left, right) } else { (right, left) };

            if let Some(f) = far {
                if d * d < max_dist2 {
                    stack.push(f);
                }
            }
            if let Some(n) = near {
                stack.push(n);
            }
        }

        heap.into_sorted_vec().into_iter().map(|h| (h.index, h.dist2)).collect()
    }
}

#[derive(Copy, Clone)]
struct HeapItem {
    dist2: Float,
    index: usize,
}

impl PartialEq for HeapItem {
    fn eq(&self, other: &Self) -> bool {
        self.dist2 == other.dist2
    }
}
impl Eq for HeapItem {}
impl PartialOrd for HeapItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for HeapItem {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist2.partial_cmp(&other.dist2).unwrap_or(Ordering::Equal)
    }
}

/// Builds the subtree over `indices` (a mutable slice into the entry
/// index space, reordered in place by the median partition), pushing
/// nodes onto `nodes` and returning this subtree's root index. The left
/// child, when present, always immediately follows its parent in
/// `nodes`; the right child's position is recorded explicitly since the
/// left subtree's size varies.
fn build_node<E: KdTreeEntry>(entries: &[E], indices: &mut [u32], nodes: &mut Vec<IndexKdTreeArrayNode>) -> u32 {
    let node_idx = nodes.len() as u32;
    nodes.push(IndexKdTreeArrayNode::leaf(0));

    if indices.len() == 1 {
        nodes[node_idx as usize] = IndexKdTreeArrayNode::leaf(indices[0]);
        return node_idx;
    }

    let mut bounds = Bounds3f::default();
    for &i in indices.iter() {
        bounds = bounds.union_point(&entries[i as usize].position());
    }
    let axis: usize = bounds.maximum_extent().into();

    let mid = indices.len() / 2;
    indices.select_nth_unstable_by(mid, |&a, &b| {
        let pa = entries[a as usize].position()[axis];
        let pb = entries[b as usize].position()[axis];
        pa.partial_cmp(&pb).unwrap_or(Ordering::Equal)
    });
    let median_index = indices[mid];
    let split_pos = entries[median_index as usize].position()[axis];

    let (left, right) = indices.split_at_mut(mid);
    let right_rest = &mut right[1..];

    let has_left_child = !left.is_empty();
    if has_left_child {
        build_node(entries, left, nodes);
    }
    let right_child_index = if right_rest.is_empty() {
        RIGHT_CHILD_SENTINEL
    } else {
        build_node(entries, right_rest, nodes)
    };

    nodes[node_idx as usize] = IndexKdTreeArrayNode::interior(axis as u32, median_index, split_pos, has_left_child, right_child_index);
    node_idx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pbrt::rng::Rng;

    #[derive(Copy, Clone)]
    struct PointEntry(Point3f);

    impl KdTreeEntry for PointEntry {
        fn position(&self) -> Point3f {
            self.0
        }
        fn direction(&self) -> Vector3f {
            Vector3f::new(0.0, 0.0, -1.0)
        }
        fn landing_surface_normal(&self) -> Vector3f {
            Vector3f::new(0.0, 0.0, 1.0)
        }
    }

    #[test]
    fn single_entry_is_a_leaf() {
        let tree = IndexKdTree::build(vec![PointEntry(Point3f::new(0.5, 0.5, 0.5))]);
        assert_eq!(tree.len(), 1);
        let found = tree.get_all_near_entries(Point3f::new(0.5, 0.5, 0.5), Vector3f::new(0.0, 0.0, 1.0), Float::INFINITY, -1.0, 10);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0, 0);
    }

    #[test]
    fn knn_matches_brute_force_over_random_points() {
        let mut rng = Rng::new(7);
        let points: Vec<PointEntry> = (0..2000)
            .map(|_| PointEntry(Point3f::new(rng.uniform_float(), rng.uniform_float(), rng.uniform_float())))
            .collect();
        let query = Point3f::new(0.5, 0.5, 0.5);
        let k = 10;

        let mut brute: Vec<Float> = points.iter().map(|p| p.position().distance_squared(&query)).collect();
        brute.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let expected = &brute[..k];

        let tree = IndexKdTree::build(points);
        let found = tree.get_all_near_entries(query, Vector3f::new(0.0, 0.0, 1.0), Float::INFINITY, -1.0, k);
        assert_eq!(found.len(), k);
        let mut found_dist2: Vec<Float> = found.iter().map(|(_, d)| *d).collect();
        found_dist2.sort_by(|a, b| a.partial_cmp(b).unwrap());
        for (a, b) in found_dist2.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-6, "expected {b}, got {a}");
        }
    }

    #[test]
    fn hemisphere_filter_excludes_wrong_side_entries() {
        struct BackFacing(Point3f);
        impl KdTreeEntry for BackFacing {
            fn position(&self) -> Point3f {
                self.0
            }
            fn direction(&self) -> Vector3f {
                Vector3f::new(0.0, 0.0, 1.0)
            }
            fn landing_surface_normal(&self) -> Vector3f {
                Vector3f::new(0.0, 0.0, 1.0)
            }
        }
        let tree = IndexKdTree::build(vec![BackFacing(Point3f::new(0.0, 0.0, 0.0))]);
        let found = tree.get_all_near_entries(Point3f::new(0.0, 0.0, 0.0), Vector3f::new(0.0, 0.0, 1.0), Float::INFINITY, -1.0, 10);
        assert!(found.is_empty());
    }
}
