use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::geometry::{BBox, CircularArc, Coord, Point, Seg, ARC_HIGH_DEF};
use crate::layer::{LayerId, LayerRange, LayerSet, LayerStack};
use crate::shape::Shape;

/// Unique board item identifier.
pub type ItemId = Uuid;

/// Electrical net code. `0` means "not connected to any net".
pub type NetCode = u32;

pub const NETCODE_UNCONNECTED: NetCode = 0;

#[derive(Error, Debug, PartialEq)]
pub enum BoardError {
    #[error("Item {0} is already on the board")]
    DuplicateItem(ItemId),

    #[error("Item {0} is not on the board")]
    UnknownItem(ItemId),

    #[error("Item {0} is not a track")]
    NotATrack(ItemId),
}

/// Coarse item type, used to filter connectivity queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    Trace,
    Arc,
    Via,
    Pad,
    Zone,
}

impl ItemKind {
    pub const TRACKS: [ItemKind; 3] = [ItemKind::Trace, ItemKind::Arc, ItemKind::Via];
    pub const ALL: [ItemKind; 5] = [
        ItemKind::Trace,
        ItemKind::Arc,
        ItemKind::Via,
        ItemKind::Pad,
        ItemKind::Zone,
    ];
}

// ── Tracks ───────────────────────────────────────────────────────────

/// A straight trace segment on a single copper layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackSegment {
    pub id: ItemId,
    pub start: Point,
    pub end: Point,
    pub width: Coord,
    pub layer: LayerId,
    pub net: NetCode,
    pub locked: bool,
    /// Start point lies inside a connected pad.
    pub begin_on_pad: bool,
    /// End point lies inside a connected pad.
    pub end_on_pad: bool,
}

impl TrackSegment {
    pub fn new(start: Point, end: Point, width: Coord, layer: LayerId, net: NetCode) -> Self {
        Self {
            id: Uuid::new_v4(),
            start,
            end,
            width,
            layer,
            net,
            locked: false,
            begin_on_pad: false,
            end_on_pad: false,
        }
    }

    pub fn locked(mut self) -> Self {
        self.locked = true;
        self
    }

    pub fn seg(&self) -> Seg {
        Seg::new(self.start, self.end)
    }

    pub fn approx_collinear(&self, other: &TrackSegment) -> bool {
        self.seg().approx_collinear(&other.seg())
    }
}

/// A circular arc trace on a single copper layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackArc {
    pub id: ItemId,
    pub start: Point,
    pub mid: Point,
    pub end: Point,
    pub width: Coord,
    pub layer: LayerId,
    pub net: NetCode,
    pub locked: bool,
}

impl TrackArc {
    pub fn new(
        start: Point,
        mid: Point,
        end: Point,
        width: Coord,
        layer: LayerId,
        net: NetCode,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            start,
            mid,
            end,
            width,
            layer,
            net,
            locked: false,
        }
    }

    pub fn arc(&self) -> CircularArc {
        CircularArc::new(self.start, self.mid, self.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViaType {
    Through,
    BlindBuried,
    Micro,
}

/// A plated via connecting a range of copper layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Via {
    pub id: ItemId,
    pub position: Point,
    pub diameter: Coord,
    pub drill: Coord,
    pub via_type: ViaType,
    pub layers: LayerRange,
    pub net: NetCode,
    pub locked: bool,
}

impl Via {
    pub fn new(position: Point, diameter: Coord, drill: Coord, layers: LayerRange, net: NetCode) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            diameter,
            drill,
            via_type: ViaType::Through,
            layers,
            net,
            locked: false,
        }
    }

    pub fn with_type(mut self, via_type: ViaType) -> Self {
        self.via_type = via_type;
        self
    }
}

/// Any conductive track object: segment, arc or via.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Track {
    Segment(TrackSegment),
    Arc(TrackArc),
    Via(Via),
}

impl Track {
    pub fn id(&self) -> ItemId {
        match self {
            Track::Segment(s) => s.id,
            Track::Arc(a) => a.id,
            Track::Via(v) => v.id,
        }
    }

    pub fn kind(&self) -> ItemKind {
        match self {
            Track::Segment(_) => ItemKind::Trace,
            Track::Arc(_) => ItemKind::Arc,
            Track::Via(_) => ItemKind::Via,
        }
    }

    pub fn net(&self) -> NetCode {
        match self {
            Track::Segment(s) => s.net,
            Track::Arc(a) => a.net,
            Track::Via(v) => v.net,
        }
    }

    pub fn is_locked(&self) -> bool {
        match self {
            Track::Segment(s) => s.locked,
            Track::Arc(a) => a.locked,
            Track::Via(v) => v.locked,
        }
    }

    pub fn set_locked(&mut self, locked: bool) {
        match self {
            Track::Segment(s) => s.locked = locked,
            Track::Arc(a) => a.locked = locked,
            Track::Via(v) => v.locked = locked,
        }
    }

    pub fn is_via(&self) -> bool {
        matches!(self, Track::Via(_))
    }

    /// Copper width; the pad diameter for vias.
    pub fn width(&self) -> Coord {
        match self {
            Track::Segment(s) => s.width,
            Track::Arc(a) => a.width,
            Track::Via(v) => v.diameter,
        }
    }

    pub fn start(&self) -> Point {
        match self {
            Track::Segment(s) => s.start,
            Track::Arc(a) => a.start,
            Track::Via(v) => v.position,
        }
    }

    pub fn end(&self) -> Point {
        match self {
            Track::Segment(s) => s.end,
            Track::Arc(a) => a.end,
            Track::Via(v) => v.position,
        }
    }

    /// Topmost layer of the track.
    pub fn layer(&self) -> LayerId {
        match self {
            Track::Segment(s) => s.layer,
            Track::Arc(a) => a.layer,
            Track::Via(v) => v.layers.start,
        }
    }

    pub fn layer_set(&self) -> LayerSet {
        match self {
            Track::Segment(s) => LayerSet::single(s.layer),
            Track::Arc(a) => LayerSet::single(a.layer),
            Track::Via(v) => LayerSet::from_range(v.layers),
        }
    }

    /// Zero-length trace. Vias are never null.
    pub fn is_null(&self) -> bool {
        match self {
            Track::Segment(s) => s.start == s.end,
            Track::Arc(a) => a.start == a.end,
            Track::Via(_) => false,
        }
    }

    pub fn is_point_on_ends(&self, p: &Point) -> bool {
        self.start() == *p || self.end() == *p
    }

    pub fn shape(&self) -> Shape {
        match self {
            Track::Segment(s) => Shape::Segment {
                seg: s.seg(),
                width: s.width,
            },
            Track::Arc(a) => Shape::Arc {
                arc: a.arc(),
                width: a.width,
            },
            Track::Via(v) => Shape::Circle {
                center: v.position,
                radius: v.diameter / 2,
            },
        }
    }

    pub fn bbox(&self) -> BBox {
        self.shape().bbox()
    }

    pub fn hit_test(&self, p: &Point, accuracy: Coord) -> bool {
        self.shape().hit_test(p, accuracy)
    }

    /// Connection points: both ends of a trace, the center of a via.
    pub fn anchors(&self) -> Vec<Point> {
        match self {
            Track::Via(v) => vec![v.position],
            _ => vec![self.start(), self.end()],
        }
    }

    pub fn as_segment(&self) -> Option<&TrackSegment> {
        match self {
            Track::Segment(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_segment_mut(&mut self) -> Option<&mut TrackSegment> {
        match self {
            Track::Segment(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_via(&self) -> Option<&Via> {
        match self {
            Track::Via(v) => Some(v),
            _ => None,
        }
    }
}

impl From<TrackSegment> for Track {
    fn from(s: TrackSegment) -> Self {
        Track::Segment(s)
    }
}

impl From<TrackArc> for Track {
    fn from(a: TrackArc) -> Self {
        Track::Arc(a)
    }
}

impl From<Via> for Track {
    fn from(v: Via) -> Self {
        Track::Via(v)
    }
}

// ── Pads and zones ───────────────────────────────────────────────────

/// Pad copper shape, relative to the pad position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PadShape {
    Circle { diameter: Coord },
    Rect { width: Coord, height: Coord },
    Oval { width: Coord, height: Coord },
    Custom { outline: Vec<Point> },
}

/// A footprint pad.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pad {
    pub id: ItemId,
    /// Footprint reference and pad number, e.g. `U1-3`.
    pub name: String,
    pub position: Point,
    pub shape: PadShape,
    pub layers: LayerSet,
    pub drill: Option<Coord>,
    pub net: NetCode,
    /// Pin without a net yet (no-connect logic); never subject to clearance.
    pub free: bool,
}

impl Pad {
    /// Surface-mount pad on one copper layer.
    pub fn smd(name: &str, position: Point, shape: PadShape, layer: LayerId, net: NetCode) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            position,
            shape,
            layers: LayerSet::single(layer),
            drill: None,
            net,
            free: false,
        }
    }

    /// Plated through-hole pad spanning every copper layer of the stack.
    pub fn through_hole(
        name: &str,
        position: Point,
        shape: PadShape,
        drill: Coord,
        copper_layers: u32,
        net: NetCode,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            position,
            shape,
            layers: LayerSet::all_copper(copper_layers),
            drill: Some(drill),
            net,
            free: false,
        }
    }

    pub fn shape(&self) -> Shape {
        let p = self.position;
        match &self.shape {
            PadShape::Circle { diameter } => Shape::Circle {
                center: p,
                radius: diameter / 2,
            },
            PadShape::Rect { width, height } => Shape::Rect {
                bbox: BBox::new(
                    p.translate(-width / 2, -height / 2),
                    p.translate(width / 2, height / 2),
                ),
            },
            PadShape::Oval { width, height } => {
                let (w, h) = (*width, *height);
                let seg = if w >= h {
                    Seg::new(p.translate(-(w - h) / 2, 0), p.translate((w - h) / 2, 0))
                } else {
                    Seg::new(p.translate(0, -(h - w) / 2), p.translate(0, (h - w) / 2))
                };
                Shape::Segment {
                    seg,
                    width: w.min(h),
                }
            }
            PadShape::Custom { outline } => Shape::Polygon {
                outline: outline.iter().map(|o| p + *o).collect(),
            },
        }
    }

    /// Copper outline used for area comparisons.
    pub fn effective_polygon(&self) -> Vec<Point> {
        self.shape().to_polygon(ARC_HIGH_DEF).unwrap_or_default()
    }

    pub fn hit_test(&self, p: &Point) -> bool {
        self.shape().hit_test(p, 0)
    }
}

/// A copper fill or rule area on one layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: ItemId,
    pub outline: Vec<Point>,
    pub layer: LayerId,
    pub net: NetCode,
    /// Rule area forbidding copper; carries no connectivity.
    pub keepout: bool,
}

impl Zone {
    pub fn new(outline: Vec<Point>, layer: LayerId, net: NetCode) -> Self {
        Self {
            id: Uuid::new_v4(),
            outline,
            layer,
            net,
            keepout: false,
        }
    }

    pub fn keepout(outline: Vec<Point>, layer: LayerId) -> Self {
        Self {
            keepout: true,
            ..Self::new(outline, layer, NETCODE_UNCONNECTED)
        }
    }

    pub fn shape(&self) -> Shape {
        Shape::Polygon {
            outline: self.outline.clone(),
        }
    }
}

/// Borrowed view of any conductive board item.
#[derive(Debug, Clone, Copy)]
pub enum BoardItem<'a> {
    Track(&'a Track),
    Pad(&'a Pad),
    Zone(&'a Zone),
}

impl<'a> BoardItem<'a> {
    pub fn id(&self) -> ItemId {
        match self {
            BoardItem::Track(t) => t.id(),
            BoardItem::Pad(p) => p.id,
            BoardItem::Zone(z) => z.id,
        }
    }

    pub fn kind(&self) -> ItemKind {
        match self {
            BoardItem::Track(t) => t.kind(),
            BoardItem::Pad(_) => ItemKind::Pad,
            BoardItem::Zone(_) => ItemKind::Zone,
        }
    }

    pub fn net(&self) -> NetCode {
        match self {
            BoardItem::Track(t) => t.net(),
            BoardItem::Pad(p) => p.net,
            BoardItem::Zone(z) => z.net,
        }
    }

    pub fn layer_set(&self) -> LayerSet {
        match self {
            BoardItem::Track(t) => t.layer_set(),
            BoardItem::Pad(p) => p.layers,
            BoardItem::Zone(z) => LayerSet::single(z.layer),
        }
    }

    pub fn shape(&self) -> Shape {
        match self {
            BoardItem::Track(t) => t.shape(),
            BoardItem::Pad(p) => p.shape(),
            BoardItem::Zone(z) => z.shape(),
        }
    }

    pub fn hit_test(&self, p: &Point, accuracy: Coord) -> bool {
        self.shape().hit_test(p, accuracy)
    }

    pub fn anchors(&self) -> Vec<Point> {
        match self {
            BoardItem::Track(t) => t.anchors(),
            BoardItem::Pad(p) => vec![p.position],
            BoardItem::Zone(_) => Vec::new(),
        }
    }

    pub fn as_track(&self) -> Option<&'a Track> {
        match self {
            BoardItem::Track(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_pad(&self) -> Option<&'a Pad> {
        match self {
            BoardItem::Pad(p) => Some(p),
            _ => None,
        }
    }
}

// ── Board ────────────────────────────────────────────────────────────

/// The board item store: tracks, pads and zones in a stable order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    pub id: Uuid,
    pub name: String,
    pub layer_stack: LayerStack,
    tracks: Vec<Track>,
    pads: Vec<Pad>,
    zones: Vec<Zone>,
    net_names: BTreeMap<NetCode, String>,
}

impl Board {
    pub fn new(name: &str, copper_layers: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            layer_stack: LayerStack::with_copper_layers(copper_layers),
            tracks: Vec::new(),
            pads: Vec::new(),
            zones: Vec::new(),
            net_names: BTreeMap::new(),
        }
    }

    fn ensure_new(&self, id: ItemId) -> Result<(), BoardError> {
        if self.item(id).is_some() {
            Err(BoardError::DuplicateItem(id))
        } else {
            Ok(())
        }
    }

    // ── Item management ──────────────────────────────────────────────

    pub fn add_track(&mut self, track: impl Into<Track>) -> Result<ItemId, BoardError> {
        let track = track.into();
        let id = track.id();
        self.ensure_new(id)?;
        self.tracks.push(track);
        Ok(id)
    }

    pub fn add_pad(&mut self, pad: Pad) -> Result<ItemId, BoardError> {
        let id = pad.id;
        self.ensure_new(id)?;
        self.pads.push(pad);
        Ok(id)
    }

    pub fn add_zone(&mut self, zone: Zone) -> Result<ItemId, BoardError> {
        let id = zone.id;
        self.ensure_new(id)?;
        self.zones.push(zone);
        Ok(id)
    }

    pub fn track(&self, id: ItemId) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id() == id)
    }

    pub fn track_mut(&mut self, id: ItemId) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|t| t.id() == id)
    }

    pub fn pad(&self, id: ItemId) -> Option<&Pad> {
        self.pads.iter().find(|p| p.id == id)
    }

    pub fn zone(&self, id: ItemId) -> Option<&Zone> {
        self.zones.iter().find(|z| z.id == id)
    }

    pub fn item(&self, id: ItemId) -> Option<BoardItem<'_>> {
        if let Some(t) = self.track(id) {
            return Some(BoardItem::Track(t));
        }
        if let Some(p) = self.pad(id) {
            return Some(BoardItem::Pad(p));
        }
        self.zone(id).map(BoardItem::Zone)
    }

    fn missing(&self, id: ItemId) -> BoardError {
        if self.item(id).is_some() {
            BoardError::NotATrack(id)
        } else {
            BoardError::UnknownItem(id)
        }
    }

    /// Remove a track, returning it.
    pub fn remove_track(&mut self, id: ItemId) -> Result<Track, BoardError> {
        match self.tracks.iter().position(|t| t.id() == id) {
            Some(index) => Ok(self.tracks.remove(index)),
            None => Err(self.missing(id)),
        }
    }

    /// Replace a track in place (same id), returning the previous version.
    pub fn replace_track(&mut self, track: Track) -> Result<Track, BoardError> {
        let id = track.id();
        match self.tracks.iter().position(|t| t.id() == id) {
            Some(index) => Ok(std::mem::replace(&mut self.tracks[index], track)),
            None => Err(self.missing(id)),
        }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn pads(&self) -> &[Pad] {
        &self.pads
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    /// All items in board order: tracks, then pads, then zones.
    pub fn items(&self) -> impl Iterator<Item = BoardItem<'_>> {
        self.tracks
            .iter()
            .map(BoardItem::Track)
            .chain(self.pads.iter().map(BoardItem::Pad))
            .chain(self.zones.iter().map(BoardItem::Zone))
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    // ── Nets and layers ──────────────────────────────────────────────

    pub fn set_net_name(&mut self, net: NetCode, name: &str) {
        self.net_names.insert(net, name.to_string());
    }

    pub fn net_name(&self, net: NetCode) -> Option<&str> {
        self.net_names.get(&net).map(String::as_str)
    }

    pub fn net_names(&self) -> &BTreeMap<NetCode, String> {
        &self.net_names
    }

    pub fn copper_layer_count(&self) -> u32 {
        self.layer_stack.copper_layer_count()
    }

    // ── Serialization ────────────────────────────────────────────────

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
