use copperline_cleanup::{CleanupCode, CleanupOptions, TracksCleaner};
use copperline_core::board::{Board, ItemId, Pad, PadShape, TrackSegment, Via};
use copperline_core::commit::{BoardCommit, ChangeType};
use copperline_core::geometry::Point;
use copperline_core::layer::LayerRange;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn track(board: &mut Board, a: (i64, i64), b: (i64, i64), width: i64, net: u32) -> ItemId {
    board
        .add_track(TrackSegment::new(
            Point::new(a.0, a.1),
            Point::new(b.0, b.1),
            width,
            0,
            net,
        ))
        .unwrap()
}

fn via(board: &mut Board, at: (i64, i64), net: u32) -> ItemId {
    board
        .add_track(Via::new(
            Point::new(at.0, at.1),
            600,
            300,
            LayerRange::new(0, 1),
            net,
        ))
        .unwrap()
}

fn smd_pad(board: &mut Board, name: &str, at: (i64, i64), net: u32) -> ItemId {
    board
        .add_pad(Pad::smd(
            name,
            Point::new(at.0, at.1),
            PadShape::Circle { diameter: 1000 },
            0,
            net,
        ))
        .unwrap()
}

/// Nothing enabled and applied to the board.
fn live() -> CleanupOptions {
    CleanupOptions {
        dry_run: false,
        ..CleanupOptions::default()
    }
}

fn codes(items: &[copperline_cleanup::CleanupItem]) -> Vec<CleanupCode> {
    items.iter().map(|i| i.code).collect()
}

#[test]
fn test_full_cleanup_is_idempotent() {
    init_logger();
    let mut board = Board::new("idempotent", 2);
    smd_pad(&mut board, "P1", (0, 0), 1);
    smd_pad(&mut board, "P2", (30_000, 0), 1);
    let _s1 = track(&mut board, (0, 0), (10_000, 0), 250, 1);
    let s2 = track(&mut board, (10_000, 0), (20_000, 0), 250, 1);
    let s3 = track(&mut board, (20_000, 0), (30_000, 0), 250, 1);
    let stub = track(&mut board, (20_000, 0), (20_000, 5_000), 250, 1);
    let _v1 = via(&mut board, (10_000, 0), 1);
    let v2 = via(&mut board, (10_000, 0), 1);
    let null = track(&mut board, (25_000, 0), (25_000, 0), 250, 1);

    let mut commit = BoardCommit::new("cleanup");
    let mut cleaner = TracksCleaner::new(&mut board, &mut commit);
    let items = cleaner.cleanup_board(&CleanupOptions::all()).unwrap().to_vec();

    assert_eq!(
        codes(&items),
        vec![
            CleanupCode::RedundantVia,
            CleanupCode::ZeroLengthTrack,
            CleanupCode::DanglingTrack,
            CleanupCode::MergeTracks,
        ]
    );
    assert_eq!(items[0].items, vec![v2]);
    assert_eq!(items[1].items, vec![null]);
    assert_eq!(items[2].items, vec![stub]);
    assert_eq!(items[3].items, vec![s2, s3]);

    let merged = board.track(s2).unwrap();
    assert_eq!(merged.start(), Point::new(10_000, 0));
    assert_eq!(merged.end(), Point::new(30_000, 0));
    assert!(merged.as_segment().unwrap().end_on_pad);
    assert_eq!(board.track_count(), 3);
    assert!(!commit.is_empty());

    let mut second = BoardCommit::new("cleanup again");
    let mut cleaner = TracksCleaner::new(&mut board, &mut second);
    let items = cleaner.cleanup_board(&CleanupOptions::all()).unwrap();
    assert!(items.is_empty());
    assert!(second.is_empty());
    assert_eq!(board.track_count(), 3);
}

#[test]
fn test_duplicate_via_keeps_first() {
    init_logger();
    let mut board = Board::new("vias", 2);
    let first = via(&mut board, (0, 0), 1);
    let second = via(&mut board, (0, 0), 1);

    let mut commit = BoardCommit::new("vias");
    let options = CleanupOptions {
        clean_vias: true,
        ..live()
    };
    let items = TracksCleaner::new(&mut board, &mut commit)
        .cleanup_board(&options)
        .unwrap()
        .to_vec();

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].code, CleanupCode::RedundantVia);
    assert_eq!(items[0].items, vec![second]);
    assert!(board.track(first).is_some());
    assert!(board.track(second).is_none());
    assert_eq!(commit.removed_ids(), vec![second]);
}

#[test]
fn test_via_on_through_hole_pad_is_redundant() {
    init_logger();
    let mut board = Board::new("tht", 2);
    let pad = board
        .add_pad(Pad::through_hole(
            "1",
            Point::new(5_000, 0),
            PadShape::Circle { diameter: 1_500 },
            800,
            2,
            1,
        ))
        .unwrap();
    let v = via(&mut board, (5_000, 0), 1);

    let mut commit = BoardCommit::new("tht");
    let options = CleanupOptions {
        clean_vias: true,
        ..live()
    };
    let items = TracksCleaner::new(&mut board, &mut commit)
        .cleanup_board(&options)
        .unwrap()
        .to_vec();

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].code, CleanupCode::RedundantVia);
    assert_eq!(items[0].items, vec![v, pad]);
    assert_eq!(board.track_count(), 0);
}

#[test]
fn test_zero_length_tracks() {
    init_logger();
    let mut board = Board::new("null", 2);
    let null = track(&mut board, (100, 100), (100, 100), 200, 1);
    let locked = board
        .add_track(
            TrackSegment::new(Point::new(500, 500), Point::new(500, 500), 200, 0, 1).locked(),
        )
        .unwrap();

    let mut commit = BoardCommit::new("null");
    let options = CleanupOptions {
        merge_segments: true,
        ..live()
    };
    let items = TracksCleaner::new(&mut board, &mut commit)
        .cleanup_board(&options)
        .unwrap()
        .to_vec();

    assert_eq!(codes(&items), vec![CleanupCode::ZeroLengthTrack]);
    assert_eq!(items[0].items, vec![null]);
    assert!(board.track(locked).is_some());
}

#[test]
fn test_duplicate_segment_defers_to_locked_twin() {
    init_logger();
    let mut board = Board::new("dups", 2);
    let first = track(&mut board, (0, 0), (1_000, 0), 200, 1);
    let reversed = track(&mut board, (1_000, 0), (0, 0), 200, 1);
    let locked = board
        .add_track(
            TrackSegment::new(Point::new(0, 5_000), Point::new(1_000, 5_000), 200, 0, 1).locked(),
        )
        .unwrap();
    let twin = track(&mut board, (0, 5_000), (1_000, 5_000), 200, 1);

    let mut commit = BoardCommit::new("dups");
    let mut cleaner = TracksCleaner::new(&mut board, &mut commit);
    cleaner.cleanup(false, false, true, false).unwrap();
    let items = cleaner.take_items();

    assert_eq!(
        codes(&items),
        vec![CleanupCode::DuplicateTrack, CleanupCode::DuplicateTrack]
    );
    assert_eq!(items[0].items, vec![reversed]);
    assert_eq!(items[1].items, vec![twin]);
    assert!(board.track(first).is_some());
    assert!(board.track(locked).is_some());
}

#[test]
fn test_shorting_tracks_are_removed() {
    init_logger();
    let mut board = Board::new("short", 2);
    let a = track(&mut board, (0, 0), (10_000, 0), 200, 1);
    let b = track(&mut board, (10_000, 0), (20_000, 0), 200, 2);
    smd_pad(&mut board, "P1", (30_000, 0), 1);
    let stray = via(&mut board, (30_000, 0), 2);

    let mut commit = BoardCommit::new("short");
    let options = CleanupOptions {
        remove_misconnected: true,
        ..live()
    };
    let items = TracksCleaner::new(&mut board, &mut commit)
        .cleanup_board(&options)
        .unwrap()
        .to_vec();

    assert_eq!(
        codes(&items),
        vec![
            CleanupCode::ShortingTrack,
            CleanupCode::ShortingTrack,
            CleanupCode::ShortingVia,
        ]
    );
    assert_eq!(items[0].items, vec![a]);
    assert_eq!(items[1].items, vec![b]);
    assert_eq!(items[2].items, vec![stray]);
    assert_eq!(board.track_count(), 0);
}

#[test]
fn test_track_between_pads_of_different_nets() {
    init_logger();
    let mut board = Board::new("pads", 2);
    smd_pad(&mut board, "P1", (0, 0), 1);
    smd_pad(&mut board, "P2", (10_000, 0), 2);
    let bridge = track(&mut board, (0, 0), (10_000, 0), 200, 1);

    let mut commit = BoardCommit::new("pads");
    let options = CleanupOptions {
        remove_misconnected: true,
        ..live()
    };
    let items = TracksCleaner::new(&mut board, &mut commit)
        .cleanup_board(&options)
        .unwrap()
        .to_vec();

    assert_eq!(codes(&items), vec![CleanupCode::ShortingTrack]);
    assert_eq!(items[0].items, vec![bridge]);
    assert_eq!(commit.removed_ids(), vec![bridge]);
}

#[test]
fn test_locked_shorting_track_survives() {
    init_logger();
    let mut board = Board::new("short", 2);
    let a = track(&mut board, (0, 0), (10_000, 0), 200, 1);
    let b = board
        .add_track(
            TrackSegment::new(Point::new(10_000, 0), Point::new(20_000, 0), 200, 0, 2).locked(),
        )
        .unwrap();

    let mut commit = BoardCommit::new("short");
    let mut cleaner = TracksCleaner::new(&mut board, &mut commit);
    cleaner.remove_shorting_track_segments().unwrap();
    let items = cleaner.take_items();

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].items, vec![a]);
    assert!(board.track(b).is_some());
    assert!(board.track(a).is_none());
}

#[test]
fn test_junction_is_not_merged() {
    init_logger();
    let mut board = Board::new("junction", 2);
    let s1 = track(&mut board, (0, 0), (10, 0), 1, 1);
    let s2 = track(&mut board, (10, 0), (20, 0), 1, 1);
    let _branch = track(&mut board, (10, 0), (10, 10), 1, 1);

    let mut commit = BoardCommit::new("junction");
    let mut cleaner = TracksCleaner::new(&mut board, &mut commit);
    assert_eq!(cleaner.merge_collinear_segments(s1, s2), Ok(false));
    assert!(cleaner.items().is_empty());
    assert!(commit.is_empty());
    assert_eq!(board.track_count(), 3);
}

#[test]
fn test_merge_collinear_pair() {
    init_logger();
    let mut board = Board::new("merge", 2);
    let s1 = track(&mut board, (0, 0), (10, 0), 1, 1);
    let s2 = track(&mut board, (10, 0), (20, 0), 1, 1);

    let mut commit = BoardCommit::new("merge");
    let mut cleaner = TracksCleaner::new(&mut board, &mut commit);
    assert_eq!(cleaner.merge_collinear_segments(s1, s2), Ok(true));
    let items = cleaner.take_items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].code, CleanupCode::MergeTracks);
    assert_eq!(items[0].items, vec![s1, s2]);

    let merged = board.track(s1).unwrap();
    assert_eq!(merged.start(), Point::new(0, 0));
    assert_eq!(merged.end(), Point::new(20, 0));
    assert!(board.track(s2).is_none());

    let changes: Vec<_> = commit.entries().iter().map(|e| (e.change, e.item)).collect();
    assert_eq!(
        changes,
        vec![(ChangeType::Modify, s1), (ChangeType::Remove, s2)]
    );
}

#[test]
fn test_dry_run_leaves_board_untouched() {
    init_logger();
    let mut board = Board::new("preview", 2);
    let s1 = track(&mut board, (0, 0), (10, 0), 1, 1);
    let s2 = track(&mut board, (10, 0), (20, 0), 1, 1);
    let before = board.clone();

    let mut commit = BoardCommit::new("preview");
    let options = CleanupOptions {
        dry_run: true,
        merge_segments: true,
        ..CleanupOptions::default()
    };
    let items = TracksCleaner::new(&mut board, &mut commit)
        .cleanup_board(&options)
        .unwrap()
        .to_vec();

    assert_eq!(codes(&items), vec![CleanupCode::MergeTracks]);
    assert_eq!(items[0].items, vec![s1, s2]);
    assert!(commit.is_empty());
    assert_eq!(board.tracks(), before.tracks());
}

#[test]
fn test_dangling_chain_is_removed() {
    init_logger();
    let mut board = Board::new("dangling", 2);
    track(&mut board, (0, 0), (1_000, 0), 200, 1);
    track(&mut board, (1_000, 0), (2_000, 0), 200, 1);
    track(&mut board, (2_000, 0), (3_000, 0), 200, 1);

    let mut commit = BoardCommit::new("dangling");
    let options = CleanupOptions {
        delete_unconnected: true,
        ..live()
    };
    let items = TracksCleaner::new(&mut board, &mut commit)
        .cleanup_board(&options)
        .unwrap()
        .to_vec();

    assert_eq!(items.len(), 3);
    assert!(items.iter().all(|i| i.code == CleanupCode::DanglingTrack));
    assert_eq!(board.track_count(), 0);
    assert_eq!(commit.len(), 3);
}

#[test]
fn test_dangling_via_only() {
    init_logger();
    let mut board = Board::new("dangling via", 2);
    smd_pad(&mut board, "P1", (0, 0), 1);
    let stub = track(&mut board, (0, 0), (5_000, 0), 200, 1);
    let v = via(&mut board, (5_000, 0), 1);

    let mut commit = BoardCommit::new("dangling via");
    let options = CleanupOptions {
        delete_dangling_vias: true,
        ..live()
    };
    let items = TracksCleaner::new(&mut board, &mut commit)
        .cleanup_board(&options)
        .unwrap()
        .to_vec();

    assert_eq!(codes(&items), vec![CleanupCode::DanglingVia]);
    assert_eq!(items[0].items, vec![v]);
    assert!(board.track(stub).is_some());
}

#[test]
fn test_track_inside_pad() {
    init_logger();
    let mut board = Board::new("in pad", 2);
    board
        .add_pad(Pad::smd(
            "1",
            Point::new(0, 0),
            PadShape::Rect {
                width: 2_000,
                height: 2_000,
            },
            0,
            1,
        ))
        .unwrap();
    let inner = track(&mut board, (-500, 0), (500, 0), 200, 1);
    let outer = track(&mut board, (0, 0), (5_000, 0), 200, 1);

    let mut commit = BoardCommit::new("in pad");
    let options = CleanupOptions {
        delete_tracks_in_pad: true,
        ..live()
    };
    let items = TracksCleaner::new(&mut board, &mut commit)
        .cleanup_board(&options)
        .unwrap()
        .to_vec();

    assert_eq!(codes(&items), vec![CleanupCode::TrackInPad]);
    assert_eq!(items[0].items, vec![inner]);
    assert!(board.track(outer).is_some());
}

#[test]
fn test_necked_segments_are_kept() {
    init_logger();
    let mut board = Board::new("neck", 2);
    track(&mut board, (0, 0), (10, 0), 2, 1);
    track(&mut board, (10, 0), (20, 0), 2, 1);
    track(&mut board, (20, 0), (30, 0), 1, 1);

    let mut commit = BoardCommit::new("neck");
    let options = CleanupOptions {
        merge_segments: true,
        ..live()
    };
    let items = TracksCleaner::new(&mut board, &mut commit)
        .cleanup_board(&options)
        .unwrap()
        .to_vec();

    assert!(items.is_empty());
    assert_eq!(board.track_count(), 3);
}
