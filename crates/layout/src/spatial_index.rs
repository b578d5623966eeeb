//! Broad-phase proximity queries using an R*-tree.
//!
//! Each furniture item is indexed by the axis-aligned bounds of its oriented
//! footprint. Pair terms (overlap, aisle) only run their SAT narrow phase on
//! the candidate pairs this index returns.

use crate::furniture::{FurnitureItem, FurnitureKind};
use crate::geometry::Aabb;
use rstar::{RTree, RTreeObject, AABB};

/// An indexed furniture footprint.
#[derive(Debug, Clone)]
pub struct SpatialEntry {
    /// Position of the item in the layout.
    pub index: usize,
    /// Item kind.
    pub kind: FurnitureKind,
    /// Footprint bounds.
    pub bounds: Aabb,
}

impl SpatialEntry {
    /// Creates an entry for `item` at position `index`.
    pub fn from_item(index: usize, item: &FurnitureItem) -> Self {
        Self {
            index,
            kind: item.kind,
            bounds: item.obb().aabb(),
        }
    }
}

impl RTreeObject for SpatialEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.bounds.min_x, self.bounds.min_y],
            [self.bounds.max_x, self.bounds.max_y],
        )
    }
}

/// R*-tree over a layout's footprints.
#[derive(Debug)]
pub struct SpatialIndex {
    tree: RTree<SpatialEntry>,
}

impl SpatialIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    /// Bulk-loads every item.
    pub fn from_items(items: &[FurnitureItem]) -> Self {
        let entries = items
            .iter()
            .enumerate()
            .map(|(i, item)| SpatialEntry::from_item(i, item))
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Inserts one entry.
    pub fn insert(&mut self, entry: SpatialEntry) {
        self.tree.insert(entry);
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Returns true if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Entries whose bounds intersect `bounds`.
    pub fn query(&self, bounds: &Aabb) -> Vec<&SpatialEntry> {
        let envelope =
            AABB::from_corners([bounds.min_x, bounds.min_y], [bounds.max_x, bounds.max_y]);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .collect()
    }

    /// Indices of entries within `radius` of `bounds` (bounds grown by `radius`).
    pub fn neighbors(&self, bounds: &Aabb, radius: f64) -> Vec<usize> {
        self.query(&bounds.expand(radius))
            .iter()
            .map(|e| e.index)
            .collect()
    }

    /// All pairs `(i, j)` with `i < j` whose bounds come within `radius`.
    ///
    /// Sorted, so callers iterate in a deterministic order.
    pub fn candidate_pairs(&self, radius: f64) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for entry in self.tree.iter() {
            for other in self.query(&entry.bounds.expand(radius)) {
                if entry.index < other.index {
                    pairs.push((entry.index, other.index));
                }
            }
        }
        pairs.sort_unstable();
        pairs
    }
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(x: f64, y: f64) -> FurnitureItem {
        FurnitureItem::of_kind(FurnitureKind::RoundTable, x, y)
    }

    #[test]
    fn test_spatial_index_new() {
        let index = SpatialIndex::new();
        assert!(index.is_empty());
        assert_eq!(index.len(), 0);
    }

    #[test]
    fn test_query() {
        let items = vec![table(5.0, 5.0), table(25.0, 5.0), table(5.0, 25.0)];
        let index = SpatialIndex::from_items(&items);
        assert_eq!(index.len(), 3);

        let hits = index.query(&Aabb::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].index, 0);
        assert_eq!(hits[0].kind, FurnitureKind::RoundTable);

        assert!(index.query(&Aabb::new(50.0, 50.0, 60.0, 60.0)).is_empty());
        assert_eq!(index.query(&Aabb::new(-10.0, -10.0, 40.0, 40.0)).len(), 3);
    }

    #[test]
    fn test_neighbors_with_radius() {
        // Tables 10 ft apart center to center leave a 5 ft gap.
        let items = vec![table(5.0, 5.0), table(15.0, 5.0)];
        let index = SpatialIndex::from_items(&items);
        let bounds = items[0].obb().aabb();
        assert_eq!(index.neighbors(&bounds, 1.0), vec![0]);
        let mut near = index.neighbors(&bounds, 6.0);
        near.sort_unstable();
        assert_eq!(near, vec![0, 1]);
    }

    #[test]
    fn test_candidate_pairs() {
        let items = vec![table(5.0, 5.0), table(9.0, 5.0), table(40.0, 40.0), table(13.0, 5.0)];
        let index = SpatialIndex::from_items(&items);
        assert_eq!(index.candidate_pairs(0.5), vec![(0, 1), (1, 3)]);
        assert_eq!(index.candidate_pairs(4.0), vec![(0, 1), (0, 3), (1, 3)]);
    }

    #[test]
    fn test_insert() {
        let mut index = SpatialIndex::new();
        index.insert(SpatialEntry::from_item(7, &table(0.0, 0.0)));
        assert_eq!(index.len(), 1);
        assert_eq!(index.neighbors(&Aabb::new(-1.0, -1.0, 1.0, 1.0), 0.0), vec![7]);
    }
}
