use std::collections::{BTreeMap, HashMap};

use copperline_core::board::{Board, ItemId, NetCode};
use copperline_core::layer::{LayerRange, LayerSet};

use crate::item::Item;

/// Board-side capabilities the collision engine needs.
///
/// Passed explicitly into every collision query so the predicate stays a
/// pure function of its arguments.
pub trait RouterIface {
    /// Does `item` expose copper on any layer of `layers`?
    fn is_flashed_on_layer(&self, item: &Item, layers: LayerRange) -> bool;

    fn net_name(&self, net: NetCode) -> Option<String>;
}

/// [`RouterIface`] backed by board data.
#[derive(Debug, Clone, Default)]
pub struct BoardIface {
    net_names: BTreeMap<NetCode, String>,
    unflashed: HashMap<ItemId, LayerSet>,
}

impl BoardIface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_board(board: &Board) -> Self {
        Self {
            net_names: board.net_names().clone(),
            unflashed: HashMap::new(),
        }
    }

    /// Mark copper layers on which an item has no pad copper (e.g. unused
    /// inner layers of a through-hole pad).
    pub fn set_unflashed(&mut self, id: ItemId, layers: LayerSet) {
        self.unflashed.insert(id, layers);
    }
}

impl RouterIface for BoardIface {
    fn is_flashed_on_layer(&self, item: &Item, layers: LayerRange) -> bool {
        if item.is_hole() {
            return true;
        }
        match self.unflashed.get(&item.id) {
            Some(off) => layers
                .iter()
                .any(|l| item.layers.contains(l) && !off.contains(l)),
            None => true,
        }
    }

    fn net_name(&self, net: NetCode) -> Option<String> {
        self.net_names.get(&net).cloned()
    }
}
