//! Router item model.
//!
//! Every object the router reasons about is an [`Item`]: a net, a layer span
//! and a kind-specific [`ItemBody`]. Vias and drilled pads carry their hole
//! as a separate item that points back at its parent by id.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use copperline_core::board::{ItemId, NetCode, Pad, Track, Zone};
use copperline_core::geometry::{CircularArc, Coord, Point, Seg};
use copperline_core::layer::{LayerId, LayerRange, EDGE_CUTS};
use copperline_core::shape::Shape;

use crate::iface::RouterIface;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    Segment,
    Arc,
    Via,
    Line,
    Solid,
    Hole,
    Joint,
    DiffPair,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Segment => "segment",
            ItemKind::Arc => "arc",
            ItemKind::Via => "via",
            ItemKind::Line => "line",
            ItemKind::Solid => "solid",
            ItemKind::Hole => "hole",
            ItemKind::Joint => "joint",
            ItemKind::DiffPair => "diff-pair",
        }
    }
}

/// Geometry of a via, used to recognise copies of the same via.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViaSignature {
    pub pos: Point,
    pub diameter: Coord,
    pub drill: Coord,
    pub net: NetCode,
}

/// Back-reference from a hole to the pad or via that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoleParent {
    pub id: ItemId,
    /// Set when the parent is a via.
    pub via: Option<ViaSignature>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ItemBody {
    Segment {
        seg: Seg,
        width: Coord,
    },
    Arc {
        arc: CircularArc,
        width: Coord,
    },
    Via {
        pos: Point,
        diameter: Coord,
        drill: Coord,
        hole: Box<Item>,
    },
    /// Routed path; its chain shape has no width of its own.
    Line {
        points: Vec<Point>,
        width: Coord,
        via: Option<Box<Item>>,
    },
    Solid {
        shape: Shape,
        hole: Option<Box<Item>>,
        free_pad: bool,
    },
    Hole {
        center: Point,
        diameter: Coord,
        parent: Option<HoleParent>,
    },
    Joint {
        pos: Point,
    },
    DiffPair {
        p: Vec<Point>,
        n: Vec<Point>,
        width: Coord,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub net: NetCode,
    pub layers: LayerRange,
    /// Layer of the board item this was created from, if any.
    pub parent_layer: Option<LayerId>,
    pub body: ItemBody,
}

fn chain_segments(points: &[Point], width: Coord) -> impl Iterator<Item = Shape> + '_ {
    points.windows(2).map(move |w| Shape::Segment {
        seg: Seg::new(w[0], w[1]),
        width,
    })
}

impl Item {
    fn with_body(net: NetCode, layers: LayerRange, body: ItemBody) -> Self {
        Self {
            id: Uuid::new_v4(),
            net,
            layers,
            parent_layer: None,
            body,
        }
    }

    pub fn segment(seg: Seg, width: Coord, layer: LayerId, net: NetCode) -> Self {
        Self::with_body(net, LayerRange::single(layer), ItemBody::Segment { seg, width })
    }

    pub fn arc(arc: CircularArc, width: Coord, layer: LayerId, net: NetCode) -> Self {
        Self::with_body(net, LayerRange::single(layer), ItemBody::Arc { arc, width })
    }

    /// A via together with its hole.
    pub fn via(pos: Point, diameter: Coord, drill: Coord, layers: LayerRange, net: NetCode) -> Self {
        let id = Uuid::new_v4();
        let signature = ViaSignature {
            pos,
            diameter,
            drill,
            net,
        };
        let hole = Self::hole(
            pos,
            drill,
            layers,
            net,
            Some(HoleParent {
                id,
                via: Some(signature),
            }),
        );
        Self {
            id,
            net,
            layers,
            parent_layer: None,
            body: ItemBody::Via {
                pos,
                diameter,
                drill,
                hole: Box::new(hole),
            },
        }
    }

    pub fn line(points: Vec<Point>, width: Coord, layer: LayerId, net: NetCode) -> Self {
        Self::with_body(
            net,
            LayerRange::single(layer),
            ItemBody::Line {
                points,
                width,
                via: None,
            },
        )
    }

    /// Terminate a line with a via.
    pub fn ending_with_via(mut self, via: Item) -> Self {
        if let ItemBody::Line { via: slot, .. } = &mut self.body {
            *slot = Some(Box::new(via));
        }
        self
    }

    pub fn solid(shape: Shape, layers: LayerRange, net: NetCode) -> Self {
        Self::with_body(
            net,
            layers,
            ItemBody::Solid {
                shape,
                hole: None,
                free_pad: false,
            },
        )
    }

    /// Attach a drilled hole to a solid.
    pub fn with_hole(mut self, center: Point, diameter: Coord) -> Self {
        let parent = HoleParent {
            id: self.id,
            via: None,
        };
        let hole = Self::hole(center, diameter, self.layers, self.net, Some(parent));
        if let ItemBody::Solid { hole: slot, .. } = &mut self.body {
            *slot = Some(Box::new(hole));
        }
        self
    }

    pub fn free_pad(mut self) -> Self {
        if let ItemBody::Solid { free_pad, .. } = &mut self.body {
            *free_pad = true;
        }
        self
    }

    pub fn hole(
        center: Point,
        diameter: Coord,
        layers: LayerRange,
        net: NetCode,
        parent: Option<HoleParent>,
    ) -> Self {
        Self::with_body(
            net,
            layers,
            ItemBody::Hole {
                center,
                diameter,
                parent,
            },
        )
    }

    pub fn joint(pos: Point, layers: LayerRange, net: NetCode) -> Self {
        Self::with_body(net, layers, ItemBody::Joint { pos })
    }

    pub fn diff_pair(p: Vec<Point>, n: Vec<Point>, width: Coord, layer: LayerId, nets: NetCode) -> Self {
        Self::with_body(nets, LayerRange::single(layer), ItemBody::DiffPair { p, n, width })
    }

    pub fn with_parent_layer(mut self, layer: LayerId) -> Self {
        self.parent_layer = Some(layer);
        self
    }

    // ── Board conversion ─────────────────────────────────────────────

    pub fn from_track(track: &Track) -> Self {
        let mut item = match track {
            Track::Segment(s) => Self::segment(s.seg(), s.width, s.layer, s.net),
            Track::Arc(a) => Self::arc(a.arc(), a.width, a.layer, a.net),
            Track::Via(v) => {
                let mut via = Self::via(v.position, v.diameter, v.drill, v.layers, v.net);
                // The via takes the board id below; its hole must follow.
                if let ItemBody::Via { hole, .. } = &mut via.body {
                    if let ItemBody::Hole {
                        parent: Some(parent),
                        ..
                    } = &mut hole.body
                    {
                        parent.id = v.id;
                    }
                }
                via
            }
        };
        item.id = track.id();
        item.parent_layer = Some(track.layer());
        item
    }

    pub fn from_pad(pad: &Pad) -> Self {
        let layers = pad.layers.to_range().unwrap_or(LayerRange::single(0));
        let mut item = Self::solid(pad.shape(), layers, pad.net);
        item.id = pad.id;
        item.parent_layer = Some(layers.start);
        if let Some(drill) = pad.drill {
            item = item.with_hole(pad.position, drill);
        }
        if pad.free {
            item = item.free_pad();
        }
        item
    }

    /// Keepout areas become solids on their layer; board outline zones
    /// become edge solids spanning every copper layer.
    pub fn from_zone(zone: &Zone, copper_layers: u32) -> Self {
        let (shape, layers) = if zone.layer == EDGE_CUTS {
            let mut points = zone.outline.clone();
            if let Some(first) = points.first().copied() {
                points.push(first);
            }
            (
                Shape::Chain { points },
                LayerRange::new(0, copper_layers.max(1) - 1),
            )
        } else {
            (zone.shape(), LayerRange::single(zone.layer))
        };
        let mut item = Self::solid(shape, layers, zone.net);
        item.id = zone.id;
        item.parent_layer = Some(zone.layer);
        item
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn kind(&self) -> ItemKind {
        match self.body {
            ItemBody::Segment { .. } => ItemKind::Segment,
            ItemBody::Arc { .. } => ItemKind::Arc,
            ItemBody::Via { .. } => ItemKind::Via,
            ItemBody::Line { .. } => ItemKind::Line,
            ItemBody::Solid { .. } => ItemKind::Solid,
            ItemBody::Hole { .. } => ItemKind::Hole,
            ItemBody::Joint { .. } => ItemKind::Joint,
            ItemBody::DiffPair { .. } => ItemKind::DiffPair,
        }
    }

    pub fn kind_str(&self) -> &'static str {
        self.kind().as_str()
    }

    pub fn is_hole(&self) -> bool {
        self.kind() == ItemKind::Hole
    }

    pub fn is_free_pad(&self) -> bool {
        matches!(self.body, ItemBody::Solid { free_pad: true, .. })
    }

    /// Copper (or drill) shape; `None` for joints.
    pub fn shape(&self) -> Option<Shape> {
        match &self.body {
            ItemBody::Segment { seg, width } => Some(Shape::Segment {
                seg: *seg,
                width: *width,
            }),
            ItemBody::Arc { arc, width } => Some(Shape::Arc {
                arc: *arc,
                width: *width,
            }),
            ItemBody::Via { pos, diameter, .. } => Some(Shape::Circle {
                center: *pos,
                radius: diameter / 2,
            }),
            ItemBody::Line { points, .. } => Some(Shape::Chain {
                points: points.clone(),
            }),
            ItemBody::Solid { shape, .. } => Some(shape.clone()),
            ItemBody::Hole {
                center, diameter, ..
            } => Some(Shape::Circle {
                center: *center,
                radius: diameter / 2,
            }),
            ItemBody::Joint { .. } => None,
            ItemBody::DiffPair { p, n, width } => Some(Shape::Compound(
                chain_segments(p, *width)
                    .chain(chain_segments(n, *width))
                    .collect(),
            )),
        }
    }

    /// Drilled hole carried by a via or a solid.
    pub fn hole_item(&self) -> Option<&Item> {
        match &self.body {
            ItemBody::Via { hole, .. } => Some(hole),
            ItemBody::Solid { hole: Some(hole), .. } => Some(hole),
            _ => None,
        }
    }

    pub fn hole_parent(&self) -> Option<&HoleParent> {
        match &self.body {
            ItemBody::Hole { parent, .. } => parent.as_ref(),
            _ => None,
        }
    }

    /// Via terminating a line.
    pub fn line_via(&self) -> Option<&Item> {
        match &self.body {
            ItemBody::Line { via: Some(via), .. } => Some(via),
            _ => None,
        }
    }

    /// Half the line width; zero for everything but lines, whose chain shape
    /// carries no width.
    pub fn line_half_width(&self) -> Coord {
        match &self.body {
            ItemBody::Line { width, .. } => width / 2,
            _ => 0,
        }
    }

    pub fn format(&self, iface: Option<&dyn RouterIface>) -> String {
        let net = iface
            .and_then(|i| i.net_name(self.net))
            .unwrap_or_else(|| self.net.to_string());
        format!(
            "{} net {} layers {} {}",
            self.kind_str(),
            net,
            self.layers.start,
            self.layers.end
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use copperline_core::board::{PadShape, Via};

    #[test]
    fn test_via_owns_hole() {
        let via = Item::via(Point::new(0, 0), 600, 300, LayerRange::new(0, 3), 2);
        let hole = via.hole_item().unwrap();
        assert_eq!(hole.kind(), ItemKind::Hole);
        assert_eq!(hole.hole_parent().unwrap().id, via.id);
        assert_ne!(hole.id, via.id);
        assert_eq!(hole.layers, via.layers);
    }

    #[test]
    fn test_from_board_via_keeps_id() {
        let v = Via::new(Point::new(10, 10), 600, 300, LayerRange::new(0, 1), 1);
        let item = Item::from_track(&Track::Via(v.clone()));
        assert_eq!(item.id, v.id);
        assert_eq!(item.hole_item().unwrap().hole_parent().unwrap().id, v.id);
    }

    #[test]
    fn test_pad_with_drill_has_hole() {
        let pad = Pad::through_hole(
            "J1-1",
            Point::new(0, 0),
            PadShape::Circle { diameter: 1700 },
            1000,
            4,
            3,
        );
        let item = Item::from_pad(&pad);
        assert_eq!(item.kind(), ItemKind::Solid);
        assert_eq!(item.layers, LayerRange::new(0, 3));
        assert!(item.hole_item().is_some());
    }

    #[test]
    fn test_format_without_iface() {
        let line = Item::line(vec![Point::new(0, 0), Point::new(100, 0)], 200, 1, 7);
        assert_eq!(line.format(None), "line net 7 layers 1 1");
        assert_eq!(line.line_half_width(), 100);
    }
}
