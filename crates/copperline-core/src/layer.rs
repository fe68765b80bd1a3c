use serde::{Deserialize, Serialize};

/// A layer identifier. Copper layers are numbered front to back starting at 0.
pub type LayerId = u32;

/// Board outline layer. Items on it mark castellated edges for the router.
pub const EDGE_CUTS: LayerId = 44;

/// Highest number of copper layers a stack may hold.
pub const MAX_COPPER_LAYERS: u32 = 32;

/// Role of a layer in the stackup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayerKind {
    Copper,
    EdgeCuts,
    Technical,
}

/// A layer of the board stackup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    pub kind: LayerKind,
    pub description: String,
}

impl Layer {
    pub fn new(id: LayerId, name: &str, kind: LayerKind) -> Self {
        Self {
            id,
            name: name.to_string(),
            kind,
            description: String::new(),
        }
    }

    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = desc.to_string();
        self
    }

    pub fn is_copper(&self) -> bool {
        self.kind == LayerKind::Copper
    }
}

/// A closed range over the ordered copper stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerRange {
    pub start: LayerId,
    pub end: LayerId,
}

impl LayerRange {
    pub fn new(a: LayerId, b: LayerId) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    pub fn single(layer: LayerId) -> Self {
        Self {
            start: layer,
            end: layer,
        }
    }

    pub fn overlaps(&self, other: &LayerRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    pub fn contains(&self, layer: LayerId) -> bool {
        layer >= self.start && layer <= self.end
    }

    pub fn is_multilayer(&self) -> bool {
        self.start != self.end
    }

    pub fn iter(&self) -> impl Iterator<Item = LayerId> {
        self.start..=self.end
    }
}

/// A set of layers stored as a bitmask (ids below 64).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerSet(u64);

impl LayerSet {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn single(layer: LayerId) -> Self {
        Self::new().with(layer)
    }

    pub fn from_range(range: LayerRange) -> Self {
        range.iter().fold(Self::new(), |set, l| set.with(l))
    }

    /// Every copper layer of a stack with `count` copper layers.
    pub fn all_copper(count: u32) -> Self {
        Self::from_range(LayerRange::new(0, count.clamp(1, MAX_COPPER_LAYERS) - 1))
    }

    pub fn with(mut self, layer: LayerId) -> Self {
        if layer < 64 {
            self.0 |= 1 << layer;
        }
        self
    }

    pub fn contains(&self, layer: LayerId) -> bool {
        layer < 64 && self.0 & (1 << layer) != 0
    }

    pub fn intersects(&self, other: &LayerSet) -> bool {
        self.0 & other.0 != 0
    }

    pub fn intersection(&self, other: &LayerSet) -> LayerSet {
        LayerSet(self.0 & other.0)
    }

    pub fn difference(&self, other: &LayerSet) -> LayerSet {
        LayerSet(self.0 & !other.0)
    }

    pub fn is_superset(&self, other: &LayerSet) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn count(&self) -> u32 {
        self.0.count_ones()
    }

    pub fn iter(&self) -> impl Iterator<Item = LayerId> + '_ {
        (0..64).filter(move |l| self.contains(*l))
    }

    /// Smallest range covering the set.
    pub fn to_range(&self) -> Option<LayerRange> {
        if self.is_empty() {
            return None;
        }
        let start = self.0.trailing_zeros();
        let end = 63 - self.0.leading_zeros();
        Some(LayerRange::new(start, end))
    }
}

/// The board stackup: copper layers front to back plus non-copper layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerStack {
    layers: Vec<Layer>,
}

impl LayerStack {
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Standard stack with `count` copper layers and the board outline layer.
    pub fn with_copper_layers(count: u32) -> Self {
        let count = count.clamp(1, MAX_COPPER_LAYERS);
        let mut stack = Self::new();
        for id in 0..count {
            let name = if id == 0 {
                "F.Cu".to_string()
            } else if id == count - 1 {
                "B.Cu".to_string()
            } else {
                format!("In{}.Cu", id)
            };
            stack.add_layer(Layer::new(id, &name, LayerKind::Copper));
        }
        stack.add_layer(
            Layer::new(EDGE_CUTS, "Edge.Cuts", LayerKind::EdgeCuts)
                .with_description("Board outline"),
        );
        stack
    }

    pub fn add_layer(&mut self, layer: Layer) {
        self.layers.push(layer);
    }

    pub fn get_layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn get_layer_by_name(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.name == name)
    }

    pub fn all_layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn copper_layer_count(&self) -> u32 {
        self.layers.iter().filter(|l| l.is_copper()).count() as u32
    }

    pub fn copper_layers(&self) -> LayerSet {
        self.layers
            .iter()
            .filter(|l| l.is_copper())
            .fold(LayerSet::new(), |set, l| set.with(l.id))
    }

    pub fn is_copper(&self, id: LayerId) -> bool {
        self.get_layer(id).map_or(false, Layer::is_copper)
    }
}

impl Default for LayerStack {
    fn default() -> Self {
        Self::with_copper_layers(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_range_overlap() {
        let through = LayerRange::new(0, 3);
        let inner = LayerRange::single(2);
        let outside = LayerRange::new(4, 5);
        assert!(through.overlaps(&inner));
        assert!(!through.overlaps(&outside));
        assert_eq!(LayerRange::new(3, 1), LayerRange::new(1, 3));
    }

    #[test]
    fn test_layer_set_ops() {
        let all = LayerSet::all_copper(4);
        assert_eq!(all.count(), 4);
        assert!(all.is_superset(&LayerSet::single(3)));
        assert!(!all.contains(4));
        assert_eq!(all.to_range(), Some(LayerRange::new(0, 3)));
        assert!(LayerSet::new().to_range().is_none());
    }

    #[test]
    fn test_standard_stack() {
        let stack = LayerStack::with_copper_layers(4);
        assert_eq!(stack.copper_layer_count(), 4);
        assert_eq!(stack.get_layer(0).unwrap().name, "F.Cu");
        assert_eq!(stack.get_layer(3).unwrap().name, "B.Cu");
        assert_eq!(stack.get_layer_by_name("In1.Cu").unwrap().id, 1);
        assert!(!stack.is_copper(EDGE_CUTS));
    }
}
