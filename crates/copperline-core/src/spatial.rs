use std::collections::{BTreeMap, HashSet};

use rstar::{RTree, RTreeObject, AABB};

use crate::board::ItemId;
use crate::geometry::{BBox, Point};
use crate::layer::LayerId;

/// An entry in the R-tree spatial index, referencing a board or router item.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialEntry {
    pub id: ItemId,
    /// Bounding box of the item's copper on this layer.
    pub bbox: BBox,
}

impl RTreeObject for SpatialEntry {
    type Envelope = AABB<[i64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.bbox.min.x, self.bbox.min.y],
            [self.bbox.max.x, self.bbox.max.y],
        )
    }
}

fn envelope_of(bbox: &BBox) -> AABB<[i64; 2]> {
    AABB::from_corners([bbox.min.x, bbox.min.y], [bbox.max.x, bbox.max.y])
}

/// Per-layer spatial index for colliding-item queries.
#[derive(Debug, Default, Clone)]
pub struct SpatialIndex {
    layers: BTreeMap<LayerId, RTree<SpatialEntry>>,
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self {
            layers: BTreeMap::new(),
        }
    }

    /// Insert an item on one layer. Multi-layer items are inserted once per layer.
    pub fn insert(&mut self, id: ItemId, bbox: BBox, layer: LayerId) {
        self.layers
            .entry(layer)
            .or_default()
            .insert(SpatialEntry { id, bbox });
    }

    /// Remove an item previously inserted with the same bounding box.
    pub fn remove(&mut self, id: ItemId, bbox: BBox, layer: LayerId) -> bool {
        self.layers
            .get_mut(&layer)
            .and_then(|tree| tree.remove(&SpatialEntry { id, bbox }))
            .is_some()
    }

    /// Find all entries on `layer` whose bounding box contains the point.
    pub fn query_point(&self, point: &Point, layer: LayerId) -> Vec<&SpatialEntry> {
        match self.layers.get(&layer) {
            Some(tree) => tree
                .locate_in_envelope_intersecting(&AABB::from_point([point.x, point.y]))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Find all entries on `layer` intersecting the given box.
    pub fn query_viewport(&self, viewport: &BBox, layer: LayerId) -> Vec<&SpatialEntry> {
        match self.layers.get(&layer) {
            Some(tree) => tree
                .locate_in_envelope_intersecting(&envelope_of(viewport))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Visit every item on layers `layer_min..=layer_max` whose box intersects
    /// `bbox` and passes `filter`. Each item is visited at most once; the
    /// visitor returns `false` to stop the search. Returns the number of
    /// items visited.
    pub fn query_colliding<F, V>(
        &self,
        bbox: &BBox,
        layer_min: LayerId,
        layer_max: LayerId,
        mut filter: F,
        mut visitor: V,
    ) -> usize
    where
        F: FnMut(ItemId) -> bool,
        V: FnMut(ItemId) -> bool,
    {
        if layer_min > layer_max {
            return 0;
        }
        let envelope = envelope_of(bbox);
        let mut seen = HashSet::new();
        let mut count = 0;

        for (_, tree) in self.layers.range(layer_min..=layer_max) {
            for entry in tree.locate_in_envelope_intersecting(&envelope) {
                if !seen.insert(entry.id) || !filter(entry.id) {
                    continue;
                }
                count += 1;
                if !visitor(entry.id) {
                    return count;
                }
            }
        }
        count
    }

    /// Number of entries in the index, counting each layer separately.
    pub fn len(&self) -> usize {
        self.layers.values().map(RTree::size).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
