use std::collections::{BTreeSet, HashMap, HashSet};

use copperline_core::board::{Board, BoardItem, ItemId, ItemKind, Track, TrackSegment};
use copperline_core::commit::{CommitSink, DiscardCommit};
use copperline_core::connectivity::{ConnectivityData, ConnectivityOracle};
use copperline_core::geometry::{Coord, Point, ARC_HIGH_DEF};
use copperline_core::shape::polygon_difference_is_empty;
use copperline_core::spatial::SpatialIndex;

use crate::cleanup_item::{CleanupCode, CleanupItem};
use crate::error::CleanupError;
use crate::options::CleanupOptions;

/// Items marked for removal during one pass, in discovery order.
#[derive(Debug, Default)]
struct RemovalSet {
    order: Vec<ItemId>,
    ids: HashSet<ItemId>,
}

impl RemovalSet {
    fn insert(&mut self, id: ItemId) -> bool {
        let fresh = self.ids.insert(id);
        if fresh {
            self.order.push(id);
        }
        fresh
    }

    fn contains(&self, id: &ItemId) -> bool {
        self.ids.contains(id)
    }

    fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn len(&self) -> usize {
        self.order.len()
    }
}

/// Cleans up the track network of one board.
///
/// Each phase scans the board first, collecting what to remove, then applies
/// the removals through the commit sink.
pub struct TracksCleaner<'a, C: ConnectivityOracle = ConnectivityData> {
    board: &'a mut Board,
    commit: &'a mut dyn CommitSink,
    connectivity: C,
    items: Vec<CleanupItem>,
}

impl<'a> TracksCleaner<'a> {
    pub fn new(board: &'a mut Board, commit: &'a mut dyn CommitSink) -> Self {
        Self::with_connectivity(board, commit, ConnectivityData::new())
    }
}

impl<'a, C: ConnectivityOracle> TracksCleaner<'a, C> {
    pub fn with_connectivity(
        board: &'a mut Board,
        commit: &'a mut dyn CommitSink,
        connectivity: C,
    ) -> Self {
        let mut cleaner = Self {
            board,
            commit,
            connectivity,
            items: Vec::new(),
        };
        cleaner.connectivity.rebuild(cleaner.board);
        cleaner
    }

    pub fn board(&self) -> &Board {
        self.board
    }

    /// Report items collected so far.
    pub fn items(&self) -> &[CleanupItem] {
        &self.items
    }

    pub fn take_items(&mut self) -> Vec<CleanupItem> {
        std::mem::take(&mut self.items)
    }

    /// Run every enabled phase. In a dry run the pipeline runs against a
    /// scratch copy of the board, so the report matches what a live run
    /// would do and the board is left untouched.
    pub fn cleanup_board(
        &mut self,
        options: &CleanupOptions,
    ) -> Result<&[CleanupItem], CleanupError>
    where
        C: Default,
    {
        self.items.clear();
        if options.dry_run {
            let mut scratch = self.board.clone();
            let mut discard = DiscardCommit;
            let mut preview =
                TracksCleaner::with_connectivity(&mut scratch, &mut discard, C::default());
            preview.run(options)?;
            self.items = preview.take_items();
        } else {
            self.run(options)?;
        }

        log::info!(
            "board cleanup{}: {} actions",
            if options.dry_run { " (dry run)" } else { "" },
            self.items.len()
        );
        Ok(&self.items)
    }

    fn run(&mut self, options: &CleanupOptions) -> Result<(), CleanupError> {
        self.cleanup(
            options.clean_vias,
            options.merge_segments || options.remove_misconnected,
            options.merge_segments,
            options.merge_segments,
        )?;

        if options.remove_misconnected {
            self.remove_shorting_track_segments()?;
        }
        if options.delete_tracks_in_pad {
            self.delete_tracks_in_pads()?;
        }

        let deleted =
            self.delete_dangling_tracks(options.delete_unconnected, options.delete_dangling_vias)?;

        if deleted && options.merge_segments {
            self.cleanup(false, false, false, true)?;
        }
        Ok(())
    }

    fn remove_items(&mut self, set: RemovalSet) -> Result<(), CleanupError> {
        for id in set.order {
            let removed = self.board.remove_track(id)?;
            self.commit.removed(&removed);
        }
        Ok(())
    }

    // ── Geometric cleanup ────────────────────────────────────────────

    /// Duplicate vias, zero-length segments, duplicate segments and
    /// collinear merges. The first item in board order survives a duplicate
    /// group; locked items are never removed but can be the survivor.
    pub fn cleanup(
        &mut self,
        delete_duplicate_vias: bool,
        delete_null_segments: bool,
        delete_duplicate_segments: bool,
        merge_segments: bool,
    ) -> Result<(), CleanupError> {
        self.connectivity.rebuild(self.board);
        let (report, to_remove) = self.scan_duplicates(
            delete_duplicate_vias,
            delete_null_segments,
            delete_duplicate_segments,
        );

        log::info!("geometric cleanup: {} items to remove", to_remove.len());
        self.items.extend(report);
        self.remove_items(to_remove)?;

        if merge_segments {
            self.merge_pass()?;
        }
        Ok(())
    }

    fn scan_duplicates(
        &self,
        delete_duplicate_vias: bool,
        delete_null_segments: bool,
        delete_duplicate_segments: bool,
    ) -> (Vec<CleanupItem>, RemovalSet) {
        let board = &*self.board;
        let all_copper = board.layer_stack.copper_layers();
        let mut index = SpatialIndex::new();
        let mut by_id: HashMap<ItemId, (usize, &Track)> = HashMap::new();
        for (rank, track) in board.tracks().iter().enumerate() {
            let bbox = track.bbox();
            for layer in track.layer_set().iter() {
                index.insert(track.id(), bbox, layer);
            }
            by_id.insert(track.id(), (rank, track));
        }
        // An earlier or locked twin is the one that stays.
        let survives_over = |other: ItemId, rank: usize| {
            by_id
                .get(&other)
                .is_some_and(|(r, t)| *r < rank || t.is_locked())
        };

        let mut to_remove = RemovalSet::default();
        let mut report = Vec::new();

        for (rank, track) in board.tracks().iter().enumerate() {
            let id = track.id();
            if track.is_locked() || to_remove.contains(&id) {
                continue;
            }
            let span = track.layer_set().to_range();

            if let (true, Some(via), Some(span)) = (delete_duplicate_vias, track.as_via(), span) {
                let mut twin = None;
                index.query_colliding(
                    &track.bbox(),
                    span.start,
                    span.end,
                    |other| other != id && !to_remove.contains(&other),
                    |other| {
                        let same = by_id
                            .get(&other)
                            .and_then(|(_, t)| t.as_via())
                            .is_some_and(|o| {
                                o.position == via.position
                                    && o.via_type == via.via_type
                                    && o.layers == via.layers
                            });
                        if same && survives_over(other, rank) {
                            twin = Some(other);
                            return false;
                        }
                        true
                    },
                );

                if let Some(twin) = twin {
                    log::debug!("via {} duplicates {}", id, twin);
                    report.push(CleanupItem::new(CleanupCode::RedundantVia, id));
                    to_remove.insert(id);
                } else if let Some(pad) = self
                    .connectivity
                    .connected_pads(id)
                    .into_iter()
                    .filter_map(|p| board.pad(p))
                    .find(|p| p.layers.is_superset(&all_copper))
                {
                    log::debug!("via {} sits on through-hole pad {}", id, pad.name);
                    report.push(CleanupItem::pair(CleanupCode::RedundantVia, id, pad.id));
                    to_remove.insert(id);
                }
            }

            if delete_null_segments
                && !track.is_via()
                && !to_remove.contains(&id)
                && track.is_null()
            {
                log::debug!("track {} has zero length", id);
                report.push(CleanupItem::new(CleanupCode::ZeroLengthTrack, id));
                to_remove.insert(id);
            }

            if let (true, Some(seg)) = (delete_duplicate_segments, track.as_segment()) {
                if to_remove.contains(&id) || track.is_null() {
                    continue;
                }
                let mut twin = None;
                index.query_colliding(
                    &track.bbox(),
                    seg.layer,
                    seg.layer,
                    |other| other != id && !to_remove.contains(&other),
                    |other| {
                        let same = by_id
                            .get(&other)
                            .and_then(|(_, t)| t.as_segment())
                            .is_some_and(|o| {
                                o.start != o.end
                                    && track.is_point_on_ends(&o.start)
                                    && track.is_point_on_ends(&o.end)
                                    && o.width == seg.width
                                    && o.layer == seg.layer
                            });
                        if same && survives_over(other, rank) {
                            twin = Some(other);
                            return false;
                        }
                        true
                    },
                );
                if let Some(twin) = twin {
                    log::debug!("track {} duplicates {}", id, twin);
                    report.push(CleanupItem::new(CleanupCode::DuplicateTrack, id));
                    to_remove.insert(id);
                }
            }
        }

        (report, to_remove)
    }

    /// A segment touching any trace of another width is a deliberate
    /// neck-down and is left alone.
    fn is_necked(&self, id: ItemId, width: Coord) -> bool {
        self.connectivity
            .connected_items(id, &[ItemKind::Trace])
            .into_iter()
            .filter_map(|c| self.board.track(c))
            .any(|t| t.width() != width)
    }

    fn merge_pass(&mut self) -> Result<(), CleanupError> {
        let mut merges = 0;
        loop {
            self.connectivity.rebuild(self.board);
            let mut merged = false;

            let segments: Vec<ItemId> = self
                .board
                .tracks()
                .iter()
                .filter(|t| t.as_segment().is_some())
                .map(Track::id)
                .collect();

            for id in segments {
                let Some(segment) = self.board.track(id).and_then(Track::as_segment).cloned() else {
                    continue;
                };
                if self.is_necked(id, segment.width) {
                    log::debug!("track {} is necked down, not merging", id);
                    continue;
                }

                let candidates: Vec<TrackSegment> = self
                    .connectivity
                    .connected_items(id, &[ItemKind::Trace])
                    .into_iter()
                    .filter_map(|c| self.board.track(c).and_then(Track::as_segment).cloned())
                    .collect();

                for candidate in candidates {
                    if self.is_necked(candidate.id, candidate.width)
                        || !segment.approx_collinear(&candidate)
                    {
                        continue;
                    }
                    if self.merge_collinear_segments(id, candidate.id)? {
                        merged = true;
                        merges += 1;
                        // Geometry changed; rescan on the next pass.
                        break;
                    }
                }
            }

            if !merged {
                break;
            }
        }
        log::info!("merge pass: {} merges", merges);
        Ok(())
    }

    fn segment(&self, id: ItemId) -> Result<&TrackSegment, CleanupError> {
        match self.board.item(id) {
            Some(BoardItem::Track(Track::Segment(s))) => Ok(s),
            Some(_) => Err(CleanupError::NotASegment(id)),
            None => Err(CleanupError::UnknownItem(id)),
        }
    }

    /// More than one other item meets `item` at `pos`.
    fn is_node(&self, item: ItemId, pos: Point) -> bool {
        self.connectivity
            .anchors(item)
            .iter()
            .find(|a| a.pos == pos)
            .is_some_and(|a| a.connected_items_count() > 1)
    }

    /// Try to merge two connected collinear segments into `seg1`.
    ///
    /// Returns `Ok(false)` when the merge is refused: a segment is locked,
    /// the pair has more than two connection points, or an endpoint that
    /// would disappear is a junction.
    pub fn merge_collinear_segments(
        &mut self,
        seg1: ItemId,
        seg2: ItemId,
    ) -> Result<bool, CleanupError> {
        let a = self.segment(seg1)?.clone();
        let b = self.segment(seg2)?.clone();
        if seg1 == seg2 || a.locked || b.locked {
            return Ok(false);
        }

        let mut others: Vec<ItemId> = self.connectivity.connected_items(seg1, &ItemKind::ALL);
        others.extend(self.connectivity.connected_items(seg2, &ItemKind::ALL));
        others.retain(|id| *id != seg1 && *id != seg2);
        others.sort();
        others.dedup();

        let ends = [(a.start, a.width), (a.end, a.width), (b.start, b.width), (b.end, b.width)];
        let mut touch_points = BTreeSet::new();
        for other in others {
            match self.board.item(other) {
                Some(BoardItem::Track(t)) if !t.is_via() => {
                    for (p, _) in ends {
                        if t.is_point_on_ends(&p) {
                            touch_points.insert(p);
                        }
                    }
                }
                Some(item) => {
                    for (p, width) in ends {
                        if item.hit_test(&p, (width + 1) / 2) {
                            touch_points.insert(p);
                        }
                    }
                }
                None => {}
            }
        }

        if touch_points.len() > 2 {
            log::debug!("not merging {} and {}: junction in between", seg1, seg2);
            return Ok(false);
        }

        let min_x = ends.iter().map(|(p, _)| p.x).min().unwrap_or(a.start.x);
        let min_y = ends.iter().map(|(p, _)| p.y).min().unwrap_or(a.start.y);
        let max_x = ends.iter().map(|(p, _)| p.x).max().unwrap_or(a.end.x);
        let max_y = ends.iter().map(|(p, _)| p.y).max().unwrap_or(a.end.y);

        let diagonal = if (a.start.x > a.end.x) == (a.start.y > a.end.y) {
            (Point::new(min_x, min_y), Point::new(max_x, max_y))
        } else {
            (Point::new(min_x, max_y), Point::new(max_x, min_y))
        };

        // Keep every existing connection on the merged segment.
        let mut merged = diagonal;
        for pt in &touch_points {
            if *pt == merged.0 || *pt == merged.1 {
                continue;
            }
            if merged.0.squared_distance_to(pt) < merged.1.squared_distance_to(pt) {
                merged.0 = *pt;
            } else {
                merged.1 = *pt;
            }
        }

        for (owner, p) in [(seg1, a.start), (seg1, a.end), (seg2, b.start), (seg2, b.end)] {
            let on_diagonal = p == diagonal.0 || p == diagonal.1;
            let on_merged = p == merged.0 || p == merged.1;
            if (!on_diagonal || !on_merged) && self.is_node(owner, p) {
                log::debug!(
                    "not merging {} and {}: ({}, {}) is a node",
                    seg1,
                    seg2,
                    p.x,
                    p.y
                );
                return Ok(false);
            }
        }

        log::debug!("merging {} into {}", seg2, seg1);
        self.items
            .push(CleanupItem::pair(CleanupCode::MergeTracks, seg1, seg2));

        let mut updated = a;
        updated.start = merged.0;
        updated.end = merged.1;
        let before = self.board.replace_track(Track::Segment(updated))?;
        self.commit.modified(&before);

        let removed = self.board.remove_track(seg2)?;
        self.commit.removed(&removed);

        self.connectivity.update(self.board, seg1);
        self.refresh_pad_flags(seg1);
        Ok(true)
    }

    fn refresh_pad_flags(&mut self, id: ItemId) {
        let Some((start, end)) = self.board.track(id).map(|t| (t.start(), t.end())) else {
            return;
        };
        let pads: Vec<_> = self
            .connectivity
            .connected_pads(id)
            .into_iter()
            .filter_map(|p| self.board.pad(p))
            .collect();
        let begin_on_pad = pads.iter().any(|p| p.hit_test(&start));
        let end_on_pad = pads.iter().any(|p| p.hit_test(&end));

        if let Some(seg) = self.board.track_mut(id).and_then(Track::as_segment_mut) {
            seg.begin_on_pad = begin_on_pad;
            seg.end_on_pad = end_on_pad;
        }
    }

    // ── Shorts and tracks in pads ────────────────────────────────────

    /// Remove unlocked tracks and vias touching a pad or track of another net.
    pub fn remove_shorting_track_segments(&mut self) -> Result<(), CleanupError> {
        self.connectivity.rebuild(self.board);

        let board = &*self.board;
        let mut to_remove = RemovalSet::default();
        let mut report = Vec::new();

        for track in board.tracks() {
            if track.is_locked() {
                continue;
            }
            let id = track.id();
            let net = track.net();

            let short = self
                .connectivity
                .connected_pads(id)
                .into_iter()
                .find(|p| board.pad(*p).is_some_and(|pad| pad.net != net))
                .or_else(|| {
                    self.connectivity
                        .connected_tracks(id)
                        .into_iter()
                        .find(|t| board.track(*t).is_some_and(|o| o.net() != net))
                });

            if let Some(other) = short {
                let code = if track.is_via() {
                    CleanupCode::ShortingVia
                } else {
                    CleanupCode::ShortingTrack
                };
                log::debug!("{} shorts net {} through {}", id, net, other);
                if to_remove.insert(id) {
                    report.push(CleanupItem::new(code, id));
                }
            }
        }

        log::info!("shorting cleanup: {} items to remove", to_remove.len());
        self.items.extend(report);
        self.remove_items(to_remove)
    }

    /// Remove unlocked tracks whose copper lies entirely within a connected pad.
    pub fn delete_tracks_in_pads(&mut self) -> Result<(), CleanupError> {
        self.connectivity.rebuild(self.board);

        let board = &*self.board;
        let mut to_remove = RemovalSet::default();
        let mut report = Vec::new();

        for track in board.tracks() {
            if track.is_locked() || track.is_via() {
                continue;
            }
            let Some(outline) = track.shape().to_polygon(ARC_HIGH_DEF) else {
                continue;
            };
            let (start, end) = (track.start(), track.end());

            let inside = self
                .connectivity
                .connected_pads(track.id())
                .into_iter()
                .filter_map(|p| board.pad(p))
                .find(|pad| {
                    pad.hit_test(&start)
                        && pad.hit_test(&end)
                        && polygon_difference_is_empty(&outline, &pad.effective_polygon())
                });

            if let Some(pad) = inside {
                log::debug!("track {} lies inside pad {}", track.id(), pad.name);
                to_remove.insert(track.id());
                report.push(CleanupItem::new(CleanupCode::TrackInPad, track.id()));
            }
        }

        log::info!("track-in-pad cleanup: {} items to remove", to_remove.len());
        self.items.extend(report);
        self.remove_items(to_remove)
    }

    // ── Dangling ends ────────────────────────────────────────────────

    /// Remove dangling tracks (`tracks`) and vias (`vias`) until none are
    /// left. Returns true if anything was removed.
    pub fn delete_dangling_tracks(
        &mut self,
        tracks: bool,
        vias: bool,
    ) -> Result<bool, CleanupError> {
        if !tracks && !vias {
            return Ok(false);
        }

        let mut modified = false;
        loop {
            self.connectivity.rebuild(self.board);

            let mut to_remove = RemovalSet::default();
            let mut report = Vec::new();
            for track in self.board.tracks() {
                if track.is_locked() {
                    continue;
                }
                let wanted = match track.kind() {
                    ItemKind::Via => vias,
                    _ => tracks,
                };
                if !wanted || !self.connectivity.test_endpoint_dangling(track.id()) {
                    continue;
                }
                let code = if track.is_via() {
                    CleanupCode::DanglingVia
                } else {
                    CleanupCode::DanglingTrack
                };
                log::debug!("{} is dangling", track.id());
                to_remove.insert(track.id());
                report.push(CleanupItem::new(code, track.id()));
            }

            if to_remove.is_empty() {
                break;
            }
            log::info!("dangling cleanup: {} items to remove", to_remove.len());
            self.items.extend(report);
            self.remove_items(to_remove)?;
            modified = true;
        }
        Ok(modified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use copperline_core::board::{Via, NETCODE_UNCONNECTED};
    use copperline_core::commit::BoardCommit;
    use copperline_core::layer::LayerRange;

    fn segment(board: &mut Board, a: (i64, i64), b: (i64, i64)) -> ItemId {
        board
            .add_track(TrackSegment::new(
                Point::new(a.0, a.1),
                Point::new(b.0, b.1),
                100,
                0,
                1,
            ))
            .unwrap()
    }

    #[test]
    fn test_merge_preconditions() {
        let mut board = Board::new("merge", 2);
        let s1 = segment(&mut board, (0, 0), (1000, 0));
        let via = board
            .add_track(Via::new(
                Point::new(0, 0),
                600,
                300,
                LayerRange::new(0, 1),
                NETCODE_UNCONNECTED,
            ))
            .unwrap();
        let missing = uuid_like(&board);

        let mut commit = BoardCommit::new("test");
        let mut cleaner = TracksCleaner::new(&mut board, &mut commit);
        assert_eq!(
            cleaner.merge_collinear_segments(s1, via),
            Err(CleanupError::NotASegment(via))
        );
        assert_eq!(
            cleaner.merge_collinear_segments(s1, missing),
            Err(CleanupError::UnknownItem(missing))
        );
        assert_eq!(cleaner.merge_collinear_segments(s1, s1), Ok(false));
    }

    #[test]
    fn test_locked_segment_is_not_merged() {
        let mut board = Board::new("merge", 2);
        let s1 = segment(&mut board, (0, 0), (1000, 0));
        let s2 = board
            .add_track(
                TrackSegment::new(Point::new(1000, 0), Point::new(2000, 0), 100, 0, 1).locked(),
            )
            .unwrap();

        let mut commit = BoardCommit::new("test");
        let mut cleaner = TracksCleaner::new(&mut board, &mut commit);
        assert_eq!(cleaner.merge_collinear_segments(s1, s2), Ok(false));
        assert!(cleaner.items().is_empty());
        assert!(commit.is_empty());
    }

    #[test]
    fn test_removal_set_is_ordered_and_unique() {
        let mut board = Board::new("set", 2);
        let a = segment(&mut board, (0, 0), (10, 0));
        let b = segment(&mut board, (0, 10), (10, 10));
        let mut set = RemovalSet::default();
        assert!(set.insert(b));
        assert!(set.insert(a));
        assert!(!set.insert(b));
        assert_eq!(set.order, vec![b, a]);
        assert_eq!(set.len(), 2);
    }

    fn uuid_like(board: &Board) -> ItemId {
        // An id guaranteed not to be on the board.
        let mut other = Board::new("other", 2);
        let id = segment(&mut other, (0, 0), (1, 0));
        assert!(board.item(id).is_none());
        id
    }
}
