//! End-to-end exercises over the public API: a scripted editing session
//! driven the way a host application would drive it, with a simple
//! history stack, checking that every action replays and reverses
//! exactly.

use edit::edits::{
    append_action, consolidate_all_blanks_action, cut_action, lift_multiple_action,
    overwrite_move_action, tworoll_trim_action,
};
use edit::{
    EditAction, EditContext, GuiUpdates, InMemoryEngine, MediaEngine, NoSync, NullFrontend,
    Segment, Sequence, SourceRef, TrackKind, WaveformCache,
};

struct Host {
    frontend: NullFrontend,
    sync: NoSync,
    waveforms: WaveformCache,
}

impl Host {
    fn new() -> Self {
        Self {
            frontend: NullFrontend,
            sync: NoSync,
            waveforms: WaveformCache::new(32),
        }
    }

    fn ctx(&mut self) -> EditContext<'_> {
        EditContext {
            frontend: &mut self.frontend,
            sync: &mut self.sync,
            waveforms: &mut self.waveforms,
            gui: GuiUpdates::Enabled,
        }
    }
}

fn sequence(tracks: usize) -> Sequence<InMemoryEngine> {
    Sequence::new(
        InMemoryEngine::new(tracks),
        (0..tracks).map(|_| TrackKind::Video).collect(),
    )
}

fn seed(host: &mut Host, seq: &mut Sequence<InMemoryEngine>, track: usize, lengths: &[i64]) {
    for (i, length) in lengths.iter().enumerate() {
        let clip = seq.create_clip(SourceRef::Media("source.mp4".into()), format!("clip{i}"));
        let mut action = append_action(track, clip, 0, length - 1);
        action.do_edit(seq, &mut host.ctx()).expect("seed append");
    }
}

fn segment_lengths(seq: &Sequence<InMemoryEngine>, track: usize) -> Vec<i64> {
    seq.tracks()[track]
        .segments()
        .iter()
        .map(Segment::length)
        .collect()
}

/// The §-level invariants: the editor-side list and the engine mirror
/// agree, and the per-track frame accounting adds up.
fn assert_invariants(seq: &Sequence<InMemoryEngine>) {
    for track in 0..seq.tracks().len() {
        assert!(seq.mirror_consistent(track), "track {track} diverged");
        assert_eq!(
            seq.tracks()[track].length(),
            seq.engine().length(track),
            "track {track} length accounting broken"
        );
    }
}

#[test]
fn cutting_inside_the_second_clip_yields_four_segments() {
    let mut host = Host::new();
    let mut seq = sequence(1);
    seed(&mut host, &mut seq, 0, &[10, 20, 15]);

    // Timeline frame 15 is source frame 5 of the second clip.
    let mut cut = cut_action(0, 1, 5);
    cut.do_edit(&mut seq, &mut host.ctx()).expect("cut");
    assert_eq!(segment_lengths(&seq, 0), vec![10, 5, 15, 15]);
    assert_invariants(&seq);

    cut.undo(&mut seq, &mut host.ctx()).expect("undo");
    assert_eq!(segment_lengths(&seq, 0), vec![10, 20, 15]);
    assert_invariants(&seq);
}

#[test]
fn lift_replaces_clips_with_one_blank_of_summed_length() {
    let mut host = Host::new();
    let mut seq = sequence(1);
    seed(&mut host, &mut seq, 0, &[5, 7, 9]);
    let before = seq.tracks()[0].segments().to_vec();

    let mut lift = lift_multiple_action(0, 0, 1);
    lift.do_edit(&mut seq, &mut host.ctx()).expect("lift");
    assert_eq!(segment_lengths(&seq, 0), vec![12, 9]);
    assert!(seq.tracks()[0].segments()[0].is_blank());
    assert_invariants(&seq);

    lift.undo(&mut seq, &mut host.ctx()).expect("undo");
    assert_eq!(seq.tracks()[0].segments(), &before[..]);
}

#[test]
fn overwrite_move_onto_a_mid_clip_destination_reconstructs_on_undo() {
    let mut host = Host::new();
    let mut seq = sequence(1);
    seed(&mut host, &mut seq, 0, &[20, 8]);
    let before = seq.tracks()[0].segments().to_vec();

    let mut mv = overwrite_move_action(0, 6, 14, 1, 1);
    mv.do_edit(&mut seq, &mut host.ctx()).expect("move");
    assert_eq!(segment_lengths(&seq, 0), vec![6, 8, 6]);
    assert_invariants(&seq);

    mv.undo(&mut seq, &mut host.ctx()).expect("undo");
    assert_eq!(seq.tracks()[0].segments(), &before[..]);
    // The original single 20-frame clip is back, with no stray blank.
    assert_eq!(segment_lengths(&seq, 0), vec![20, 8]);
}

#[test]
fn overwrite_move_onto_existing_boundaries_makes_no_cuts() {
    let mut host = Host::new();
    let mut seq = sequence(1);
    seed(&mut host, &mut seq, 0, &[10, 12, 12]);
    let before = seq.tracks()[0].segments().to_vec();

    // Destination [10, 22) lines up exactly with the middle clip, so the
    // last clip replaces it wholesale; nothing gets split.
    let mut mv = overwrite_move_action(0, 10, 22, 2, 2);
    mv.do_edit(&mut seq, &mut host.ctx()).expect("move");
    assert_eq!(segment_lengths(&seq, 0), vec![10, 12]);
    assert_eq!(seq.clip(0, 1).expect("moved clip").name, "clip2");
    assert_invariants(&seq);

    mv.undo(&mut seq, &mut host.ctx()).expect("undo");
    assert_eq!(seq.tracks()[0].segments(), &before[..]);
}

#[test]
fn two_roll_trim_shifts_three_frames_and_restores_exactly() {
    let mut host = Host::new();
    let mut seq = sequence(1);
    seed(&mut host, &mut seq, 0, &[10, 20]);
    let before = seq.tracks()[0].segments().to_vec();

    let mut trim = tworoll_trim_action(0, 1, 3, 10, false, None);
    trim.do_edit(&mut seq, &mut host.ctx()).expect("trim");
    assert_eq!(segment_lengths(&seq, 0), vec![13, 17]);
    assert_invariants(&seq);

    trim.undo(&mut seq, &mut host.ctx()).expect("undo");
    assert_eq!(seq.tracks()[0].segments(), &before[..]);
}

#[test]
fn consolidate_all_merges_interior_and_trailing_runs() {
    let mut host = Host::new();
    let mut seq = sequence(1);
    seed(&mut host, &mut seq, 0, &[3, 4, 6, 9, 2, 2]);
    for index in [1, 2, 4, 5] {
        let mut lift = lift_multiple_action(0, index, index);
        lift.do_edit(&mut seq, &mut host.ctx()).expect("lift");
    }
    // Track: clip 3, blanks 4+6, clip 9, trailing blanks 2+2.
    let before = seq.tracks()[0].segments().to_vec();

    let mut consolidate = consolidate_all_blanks_action();
    consolidate
        .do_edit(&mut seq, &mut host.ctx())
        .expect("consolidate");
    assert_eq!(segment_lengths(&seq, 0), vec![3, 10, 9, 4]);
    assert_invariants(&seq);

    consolidate.undo(&mut seq, &mut host.ctx()).expect("undo");
    assert_eq!(seq.tracks()[0].segments(), &before[..]);
}

#[test]
fn a_scripted_session_unwinds_and_replays_through_a_history_stack() {
    let mut host = Host::new();
    let mut seq = sequence(2);
    seed(&mut host, &mut seq, 0, &[10, 20, 15]);
    seed(&mut host, &mut seq, 1, &[25]);
    let initial_t0 = seq.tracks()[0].segments().to_vec();
    let initial_t1 = seq.tracks()[1].segments().to_vec();

    let mut history: Vec<EditAction<InMemoryEngine>> = Vec::new();
    let mut push = |action: EditAction<InMemoryEngine>| history.push(action);

    let mut cut = cut_action(0, 1, 5);
    cut.do_edit(&mut seq, &mut host.ctx()).expect("cut");
    push(cut);

    let mut lift = lift_multiple_action(0, 1, 2);
    lift.do_edit(&mut seq, &mut host.ctx()).expect("lift");
    push(lift);

    let mut mv = overwrite_move_action(1, 10, 35, 0, 0);
    mv.do_edit(&mut seq, &mut host.ctx()).expect("move");
    push(mv);

    let mut trim = tworoll_trim_action(0, 1, -2, 10, true, None);
    trim.do_edit(&mut seq, &mut host.ctx()).expect("trim");
    push(trim);

    assert_invariants(&seq);
    let edited_t0 = seq.tracks()[0].segments().to_vec();
    let edited_t1 = seq.tracks()[1].segments().to_vec();

    for action in history.iter_mut().rev() {
        action.undo(&mut seq, &mut host.ctx()).expect("undo");
        assert_invariants(&seq);
    }
    assert_eq!(seq.tracks()[0].segments(), &initial_t0[..]);
    assert_eq!(seq.tracks()[1].segments(), &initial_t1[..]);

    for action in history.iter_mut() {
        action.redo(&mut seq, &mut host.ctx()).expect("redo");
        assert_invariants(&seq);
    }
    assert_eq!(seq.tracks()[0].segments(), &edited_t0[..]);
    assert_eq!(seq.tracks()[1].segments(), &edited_t1[..]);

    for action in history.iter_mut().rev() {
        action.undo(&mut seq, &mut host.ctx()).expect("undo again");
    }
    assert_eq!(seq.tracks()[0].segments(), &initial_t0[..]);
    assert_eq!(seq.tracks()[1].segments(), &initial_t1[..]);
}

#[test]
fn snapshot_reflects_track_state() {
    let mut host = Host::new();
    let mut seq = sequence(1);
    seed(&mut host, &mut seq, 0, &[10, 20]);

    let snapshot = seq.snapshot();
    assert_eq!(snapshot.tracks.len(), 1);
    assert_eq!(snapshot.tracks[0].length, 30);
    assert_eq!(snapshot.tracks[0].segments[1].length, 20);
    assert_eq!(snapshot.tracks[0].segments[1].clip_id, Some(2));
}
