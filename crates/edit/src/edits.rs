//! Structural edit catalog: everything that rearranges segments on
//! tracks. Each entry is an [`EditOp`] with a forward/backward pair over
//! captured inputs; factories at the bottom package them as
//! [`EditAction`]s ready for the history stack.

use tracing::{debug, info};

use crate::action::{EditAction, EditContext, EditOp};
use crate::engine::MediaEngine;
use crate::error::{EditError, Result};
use crate::segment::{Clip, ClipId, Segment};
use crate::sequence::{CutOutcome, Sequence};

/// Invoked by the insert moves with the ids of the clips that moved.
pub type MoveDoneFn = Box<dyn FnMut(&[ClipId])>;
/// Invoked once, on first run, by the two-roll trim with
/// `(track, new boundary frame, to-side was edited)`.
pub type TwoRollDoneFn = Box<dyn FnMut(usize, i64, bool)>;
/// Invoked once, on first run, by the one-roll trims with
/// `(track, index, trimmed the start)`.
pub type OneRollDoneFn = Box<dyn FnMut(usize, usize, bool)>;

pub(crate) fn taken<T>(slot: &mut Option<T>, action: &'static str) -> Result<T> {
    slot.take().ok_or(EditError::MissingUndoState { action })
}

fn clip_ids(segments: &[Segment]) -> Vec<ClipId> {
    segments
        .iter()
        .filter_map(|segment| segment.as_clip().map(|clip| clip.id))
        .collect()
}

// -------------------------------------------------------------------
// Range-splice bookkeeping shared by the overwrite family.
// -------------------------------------------------------------------

/// State captured while clearing the frame range `[over_in, over_out)`
/// on a track: the pad blank (when the range starts at or past the track
/// end), both boundary-cut outcomes, and every whole segment spliced out.
///
/// [`unsplice`] plays the exact inverse. Callers capture the trailing
/// blanks they remove after inserting their own material and restore
/// them before unsplicing, which keeps every index deterministic; there
/// is no end-of-track special case left.
#[derive(Debug)]
pub(crate) struct RangeSplice {
    padded_gap: Option<i64>,
    in_cut: CutOutcome,
    out_cut: Option<CutOutcome>,
    pub(crate) in_index: usize,
    removed: Vec<Segment>,
}

pub(crate) fn splice_out<E: MediaEngine>(
    seq: &mut Sequence<E>,
    ctx: &mut EditContext<'_>,
    track: usize,
    over_in: i64,
    over_out: i64,
    pad: bool,
) -> Result<RangeSplice> {
    let mut padded_gap = None;
    if pad && over_in >= seq.track(track)?.length() {
        let gap = over_out - seq.track(track)?.length();
        let end = seq.track(track)?.count();
        seq.insert_blank(track, end, gap)?;
        padded_gap = Some(gap);
        debug!(track, gap, "destination past track end, padded");
    }

    let in_cut = seq.cut_track_at_frame(ctx, track, over_in)?;
    let out_cut = if seq.track(track)?.length() > over_out {
        Some(seq.cut_track_at_frame(ctx, track, over_out)?)
    } else {
        None
    };

    let t = seq.track(track)?;
    let in_index = t.clip_index_at(over_in).ok_or(EditError::FrameOutOfRange {
        track,
        frame: over_in,
        length: t.length(),
    })?;
    let out_index = t.clip_index_at(over_out).unwrap_or(t.count());

    let mut removed = Vec::with_capacity(out_index - in_index);
    for _ in in_index..out_index {
        removed.push(seq.remove_segment(ctx, track, in_index)?);
    }

    Ok(RangeSplice {
        padded_gap,
        in_cut,
        out_cut,
        in_index,
        removed,
    })
}

pub(crate) fn unsplice<E: MediaEngine>(
    seq: &mut Sequence<E>,
    ctx: &mut EditContext<'_>,
    track: usize,
    over_in: i64,
    over_out: i64,
    splice: &mut RangeSplice,
) -> Result<()> {
    let in_index = splice.in_index;
    for (offset, segment) in splice.removed.drain(..).enumerate() {
        seq.insert_segment(ctx, track, in_index + offset, segment)?;
    }

    if let Some(CutOutcome::Cut { prev_in, prev_out }) = splice.out_cut {
        merge_cut(seq, ctx, track, over_out, prev_in, prev_out)?;
    }
    if let CutOutcome::Cut { prev_in, prev_out } = splice.in_cut {
        merge_cut(seq, ctx, track, over_in, prev_in, prev_out)?;
    }

    if splice.padded_gap.is_some() {
        let end = seq.track(track)?.count() - 1;
        seq.remove_segment(ctx, track, end)?;
    }
    Ok(())
}

/// Rejoins the two halves of a boundary cut at `frame` into the original
/// segment. A cut clip is restored by resizing the surviving front half
/// to its pre-split bounds and dropping the clone; a cut blank cannot be
/// resized, so a fresh blank of the pre-split length goes in instead.
fn merge_cut<E: MediaEngine>(
    seq: &mut Sequence<E>,
    ctx: &mut EditContext<'_>,
    track: usize,
    frame: i64,
    prev_in: i64,
    prev_out: i64,
) -> Result<()> {
    let t = seq.track(track)?;
    let back_index = t.clip_index_at(frame).ok_or(EditError::FrameOutOfRange {
        track,
        frame,
        length: t.length(),
    })?;
    debug_assert!(back_index > 0, "cut line must have a front half");
    seq.remove_segment(ctx, track, back_index)?;
    if seq.segment(track, back_index - 1)?.is_blank() {
        seq.remove_segment(ctx, track, back_index - 1)?;
        seq.insert_blank(track, back_index - 1, prev_out - prev_in + 1)
    } else {
        seq.set_clip_in_out(track, back_index - 1, prev_in, prev_out)
    }
}

// -------------------------------------------------------------------
// Append / insert / remove / lift
// -------------------------------------------------------------------

pub(crate) struct Append {
    track: usize,
    clip_in: i64,
    clip_out: i64,
    clip: Option<Clip>,
}

impl<E: MediaEngine> EditOp<E> for Append {
    fn name(&self) -> &'static str {
        "append"
    }

    fn forward(
        &mut self,
        seq: &mut Sequence<E>,
        ctx: &mut EditContext<'_>,
        _first: bool,
    ) -> Result<()> {
        let clip = taken(&mut self.clip, "append")?;
        seq.append_clip(ctx, self.track, clip, self.clip_in, self.clip_out)
    }

    fn backward(&mut self, seq: &mut Sequence<E>, ctx: &mut EditContext<'_>) -> Result<()> {
        let count = seq.track(self.track)?.count();
        let Some(index) = count.checked_sub(1) else {
            return Err(EditError::SegmentIndexOutOfRange {
                track: self.track,
                index: 0,
                count: 0,
            });
        };
        let Segment::Clip(clip) = seq.remove_segment(ctx, self.track, index)? else {
            return Err(EditError::NotAClip {
                track: self.track,
                index,
            });
        };
        self.clip = Some(clip);
        Ok(())
    }
}

pub(crate) struct Insert {
    track: usize,
    index: usize,
    clip_in: i64,
    clip_out: i64,
    clip: Option<Clip>,
}

impl<E: MediaEngine> EditOp<E> for Insert {
    fn name(&self) -> &'static str {
        "insert"
    }

    fn forward(
        &mut self,
        seq: &mut Sequence<E>,
        ctx: &mut EditContext<'_>,
        _first: bool,
    ) -> Result<()> {
        let clip = taken(&mut self.clip, "insert")?;
        seq.insert_clip(ctx, self.track, self.index, clip, self.clip_in, self.clip_out)
    }

    fn backward(&mut self, seq: &mut Sequence<E>, ctx: &mut EditContext<'_>) -> Result<()> {
        let Segment::Clip(clip) = seq.remove_segment(ctx, self.track, self.index)? else {
            return Err(EditError::NotAClip {
                track: self.track,
                index: self.index,
            });
        };
        self.clip = Some(clip);
        Ok(())
    }
}

pub(crate) struct RemoveMultiple {
    track: usize,
    from_index: usize,
    to_index: usize,
    removed: Vec<Segment>,
}

impl<E: MediaEngine> EditOp<E> for RemoveMultiple {
    fn name(&self) -> &'static str {
        "remove_multiple"
    }

    fn forward(
        &mut self,
        seq: &mut Sequence<E>,
        ctx: &mut EditContext<'_>,
        _first: bool,
    ) -> Result<()> {
        self.removed.clear();
        for _ in self.from_index..=self.to_index {
            self.removed
                .push(seq.remove_segment(ctx, self.track, self.from_index)?);
        }
        Ok(())
    }

    fn backward(&mut self, seq: &mut Sequence<E>, ctx: &mut EditContext<'_>) -> Result<()> {
        for (offset, segment) in self.removed.drain(..).enumerate() {
            seq.insert_segment(ctx, self.track, self.from_index + offset, segment)?;
        }
        Ok(())
    }
}

pub(crate) struct LiftMultiple {
    track: usize,
    from_index: usize,
    to_index: usize,
    lifted: Vec<Segment>,
}

impl<E: MediaEngine> EditOp<E> for LiftMultiple {
    fn name(&self) -> &'static str {
        "lift_multiple"
    }

    fn forward(
        &mut self,
        seq: &mut Sequence<E>,
        ctx: &mut EditContext<'_>,
        _first: bool,
    ) -> Result<()> {
        self.lifted.clear();
        let mut removed_length = 0;
        for _ in self.from_index..=self.to_index {
            let segment = seq.remove_segment(ctx, self.track, self.from_index)?;
            removed_length += segment.length();
            self.lifted.push(segment);
        }
        seq.insert_blank(self.track, self.from_index, removed_length)?;
        info!(
            track = self.track,
            from = self.from_index,
            to = self.to_index,
            removed_length,
            "lift applied"
        );
        Ok(())
    }

    fn backward(&mut self, seq: &mut Sequence<E>, ctx: &mut EditContext<'_>) -> Result<()> {
        let blank = seq.segment(self.track, self.from_index)?;
        if !blank.is_blank() {
            return Err(EditError::NotABlank {
                track: self.track,
                index: self.from_index,
            });
        }
        seq.remove_segment(ctx, self.track, self.from_index)?;
        for (offset, segment) in self.lifted.drain(..).enumerate() {
            seq.insert_segment(ctx, self.track, self.from_index + offset, segment)?;
        }
        Ok(())
    }
}

// -------------------------------------------------------------------
// Cut
// -------------------------------------------------------------------

pub(crate) struct Cut {
    track: usize,
    index: usize,
    cut_frame: i64,
    /// Clone created on first run and reused on every replay, so the
    /// second half keeps one identity across undo/redo cycles.
    clone: Option<Clip>,
}

impl<E: MediaEngine> EditOp<E> for Cut {
    fn name(&self) -> &'static str {
        "cut"
    }

    fn forward(
        &mut self,
        seq: &mut Sequence<E>,
        ctx: &mut EditContext<'_>,
        first: bool,
    ) -> Result<()> {
        if first {
            let original = seq.clip(self.track, self.index)?.clone();
            self.clone = Some(seq.clone_clip(&original));
        }
        let clone = self
            .clone
            .clone()
            .ok_or(EditError::MissingUndoState { action: "cut" })?;
        seq.cut_clip(ctx, self.track, self.index, self.cut_frame, clone)
    }

    fn backward(&mut self, seq: &mut Sequence<E>, ctx: &mut EditContext<'_>) -> Result<()> {
        let Segment::Clip(front) = seq.remove_segment(ctx, self.track, self.index)? else {
            return Err(EditError::NotAClip {
                track: self.track,
                index: self.index,
            });
        };
        let Segment::Clip(back) = seq.remove_segment(ctx, self.track, self.index)? else {
            return Err(EditError::NotAClip {
                track: self.track,
                index: self.index,
            });
        };
        let clip_in = front.clip_in;
        seq.insert_clip(ctx, self.track, self.index, front, clip_in, back.clip_out)
    }
}

// -------------------------------------------------------------------
// Three-point overwrite
// -------------------------------------------------------------------

pub(crate) struct ThreePointOverwrite {
    track: usize,
    clip_in: i64,
    clip_out: i64,
    in_index: usize,
    out_index: usize,
    clip: Option<Clip>,
    removed: Vec<Segment>,
}

impl<E: MediaEngine> EditOp<E> for ThreePointOverwrite {
    fn name(&self) -> &'static str {
        "three_point_overwrite"
    }

    fn forward(
        &mut self,
        seq: &mut Sequence<E>,
        ctx: &mut EditContext<'_>,
        _first: bool,
    ) -> Result<()> {
        self.removed.clear();
        for _ in self.in_index..=self.out_index {
            self.removed
                .push(seq.remove_segment(ctx, self.track, self.in_index)?);
        }
        let clip = taken(&mut self.clip, "three_point_overwrite")?;
        seq.insert_clip(ctx, self.track, self.in_index, clip, self.clip_in, self.clip_out)
    }

    fn backward(&mut self, seq: &mut Sequence<E>, ctx: &mut EditContext<'_>) -> Result<()> {
        let Segment::Clip(clip) = seq.remove_segment(ctx, self.track, self.in_index)? else {
            return Err(EditError::NotAClip {
                track: self.track,
                index: self.in_index,
            });
        };
        self.clip = Some(clip);
        for (offset, segment) in self.removed.drain(..).enumerate() {
            seq.insert_segment(ctx, self.track, self.in_index + offset, segment)?;
        }
        Ok(())
    }
}

// -------------------------------------------------------------------
// Moves
// -------------------------------------------------------------------

pub(crate) struct InsertMove {
    track: usize,
    insert_index: usize,
    selected_range_in: usize,
    selected_range_out: usize,
    move_done: Option<MoveDoneFn>,
    real_insert_index: usize,
    moved: Vec<Segment>,
}

impl<E: MediaEngine> EditOp<E> for InsertMove {
    fn name(&self) -> &'static str {
        "insert_move"
    }

    fn forward(
        &mut self,
        seq: &mut Sequence<E>,
        ctx: &mut EditContext<'_>,
        _first: bool,
    ) -> Result<()> {
        let count = self.selected_range_out - self.selected_range_in + 1;
        self.real_insert_index = self.insert_index;
        if self.real_insert_index > self.selected_range_out {
            self.real_insert_index -= count;
        }

        self.moved.clear();
        for _ in 0..count {
            self.moved
                .push(seq.remove_segment(ctx, self.track, self.selected_range_in)?);
        }
        let ids = clip_ids(&self.moved);
        for (offset, segment) in self.moved.drain(..).enumerate() {
            seq.insert_segment(ctx, self.track, self.real_insert_index + offset, segment)?;
        }
        if let Some(done) = self.move_done.as_mut() {
            done(&ids);
        }
        Ok(())
    }

    fn backward(&mut self, seq: &mut Sequence<E>, ctx: &mut EditContext<'_>) -> Result<()> {
        let count = self.selected_range_out - self.selected_range_in + 1;
        self.moved.clear();
        for _ in 0..count {
            self.moved
                .push(seq.remove_segment(ctx, self.track, self.real_insert_index)?);
        }
        let ids = clip_ids(&self.moved);
        for (offset, segment) in self.moved.drain(..).enumerate() {
            seq.insert_segment(ctx, self.track, self.selected_range_in + offset, segment)?;
        }
        if let Some(done) = self.move_done.as_mut() {
            done(&ids);
        }
        Ok(())
    }
}

pub(crate) struct MultitrackInsertMove {
    track: usize,
    to_track: usize,
    insert_index: usize,
    selected_range_in: usize,
    selected_range_out: usize,
    move_done: Option<MoveDoneFn>,
    moved: Vec<Segment>,
}

impl<E: MediaEngine> EditOp<E> for MultitrackInsertMove {
    fn name(&self) -> &'static str {
        "multitrack_insert_move"
    }

    fn forward(
        &mut self,
        seq: &mut Sequence<E>,
        ctx: &mut EditContext<'_>,
        _first: bool,
    ) -> Result<()> {
        let count = self.selected_range_out - self.selected_range_in + 1;
        self.moved.clear();
        for _ in 0..count {
            self.moved
                .push(seq.remove_segment(ctx, self.track, self.selected_range_in)?);
        }
        let ids = clip_ids(&self.moved);
        for (offset, segment) in self.moved.drain(..).enumerate() {
            seq.insert_segment(ctx, self.to_track, self.insert_index + offset, segment)?;
        }
        // Stale peaks keyed to the destination track no longer match.
        ctx.waveforms.evict_clips(&ids, self.to_track);
        if let Some(done) = self.move_done.as_mut() {
            done(&ids);
        }
        Ok(())
    }

    fn backward(&mut self, seq: &mut Sequence<E>, ctx: &mut EditContext<'_>) -> Result<()> {
        let count = self.selected_range_out - self.selected_range_in + 1;
        self.moved.clear();
        for _ in 0..count {
            self.moved
                .push(seq.remove_segment(ctx, self.to_track, self.insert_index)?);
        }
        let ids = clip_ids(&self.moved);
        for (offset, segment) in self.moved.drain(..).enumerate() {
            seq.insert_segment(ctx, self.track, self.selected_range_in + offset, segment)?;
        }
        if let Some(done) = self.move_done.as_mut() {
            done(&ids);
        }
        Ok(())
    }
}

pub(crate) struct OverwriteMove {
    track: usize,
    over_in: i64,
    over_out: i64,
    selected_range_in: usize,
    selected_range_out: usize,
    moved: Vec<Segment>,
    splice: Option<RangeSplice>,
    trailing: Vec<i64>,
}

impl OverwriteMove {
    pub(crate) fn new(
        track: usize,
        over_in: i64,
        over_out: i64,
        selected_range_in: usize,
        selected_range_out: usize,
    ) -> Self {
        Self {
            track,
            over_in,
            over_out,
            selected_range_in,
            selected_range_out,
            moved: Vec::new(),
            splice: None,
            trailing: Vec::new(),
        }
    }
}

impl<E: MediaEngine> EditOp<E> for OverwriteMove {
    fn name(&self) -> &'static str {
        "overwrite_move"
    }

    fn forward(
        &mut self,
        seq: &mut Sequence<E>,
        ctx: &mut EditContext<'_>,
        _first: bool,
    ) -> Result<()> {
        // Lift the selection, leave a blank of the destination length.
        self.moved.clear();
        for _ in self.selected_range_in..=self.selected_range_out {
            self.moved
                .push(seq.remove_segment(ctx, self.track, self.selected_range_in)?);
        }
        seq.insert_blank(self.track, self.selected_range_in, self.over_out - self.over_in)?;

        let splice = splice_out(seq, ctx, self.track, self.over_in, self.over_out, true)?;
        let in_index = splice.in_index;
        self.splice = Some(splice);

        for (offset, segment) in self.moved.drain(..).enumerate() {
            seq.insert_segment(ctx, self.track, in_index + offset, segment)?;
        }
        self.trailing = seq.remove_trailing_blanks(ctx, self.track)?;
        info!(
            track = self.track,
            over_in = self.over_in,
            over_out = self.over_out,
            "overwrite move applied"
        );
        Ok(())
    }

    fn backward(&mut self, seq: &mut Sequence<E>, ctx: &mut EditContext<'_>) -> Result<()> {
        seq.restore_trailing_blanks(self.track, &self.trailing)?;
        self.trailing.clear();

        let mut splice = taken(&mut self.splice, "overwrite_move")?;
        let count = self.selected_range_out - self.selected_range_in + 1;
        self.moved.clear();
        for _ in 0..count {
            self.moved
                .push(seq.remove_segment(ctx, self.track, splice.in_index)?);
        }

        unsplice(seq, ctx, self.track, self.over_in, self.over_out, &mut splice)?;

        let blank = seq.segment(self.track, self.selected_range_in)?;
        if !blank.is_blank() {
            return Err(EditError::NotABlank {
                track: self.track,
                index: self.selected_range_in,
            });
        }
        seq.remove_segment(ctx, self.track, self.selected_range_in)?;
        for (offset, segment) in self.moved.drain(..).enumerate() {
            seq.insert_segment(ctx, self.track, self.selected_range_in + offset, segment)?;
        }
        Ok(())
    }
}

pub(crate) struct MultitrackOverwriteMove {
    track: usize,
    to_track: usize,
    over_in: i64,
    over_out: i64,
    selected_range_in: usize,
    selected_range_out: usize,
    moved: Vec<Segment>,
    splice: Option<RangeSplice>,
    source_trailing: Vec<i64>,
    dest_trailing: Vec<i64>,
}

impl<E: MediaEngine> EditOp<E> for MultitrackOverwriteMove {
    fn name(&self) -> &'static str {
        "multitrack_overwrite_move"
    }

    fn forward(
        &mut self,
        seq: &mut Sequence<E>,
        ctx: &mut EditContext<'_>,
        _first: bool,
    ) -> Result<()> {
        self.moved.clear();
        for _ in self.selected_range_in..=self.selected_range_out {
            self.moved
                .push(seq.remove_segment(ctx, self.track, self.selected_range_in)?);
        }
        seq.insert_blank(self.track, self.selected_range_in, self.over_out - self.over_in)?;

        let splice = splice_out(seq, ctx, self.to_track, self.over_in, self.over_out, true)?;
        let in_index = splice.in_index;
        self.splice = Some(splice);

        let ids = clip_ids(&self.moved);
        for (offset, segment) in self.moved.drain(..).enumerate() {
            seq.insert_segment(ctx, self.to_track, in_index + offset, segment)?;
        }
        self.source_trailing = seq.remove_trailing_blanks(ctx, self.track)?;
        self.dest_trailing = seq.remove_trailing_blanks(ctx, self.to_track)?;

        // Stale peaks keyed to the destination track no longer match.
        ctx.waveforms.evict_clips(&ids, self.to_track);
        info!(
            track = self.track,
            to_track = self.to_track,
            over_in = self.over_in,
            over_out = self.over_out,
            "multitrack overwrite move applied"
        );
        Ok(())
    }

    fn backward(&mut self, seq: &mut Sequence<E>, ctx: &mut EditContext<'_>) -> Result<()> {
        seq.restore_trailing_blanks(self.to_track, &self.dest_trailing)?;
        self.dest_trailing.clear();
        seq.restore_trailing_blanks(self.track, &self.source_trailing)?;
        self.source_trailing.clear();

        let mut splice = taken(&mut self.splice, "multitrack_overwrite_move")?;
        let count = self.selected_range_out - self.selected_range_in + 1;
        self.moved.clear();
        for _ in 0..count {
            self.moved
                .push(seq.remove_segment(ctx, self.to_track, splice.in_index)?);
        }

        unsplice(seq, ctx, self.to_track, self.over_in, self.over_out, &mut splice)?;

        let blank = seq.segment(self.track, self.selected_range_in)?;
        if !blank.is_blank() {
            return Err(EditError::NotABlank {
                track: self.track,
                index: self.selected_range_in,
            });
        }
        seq.remove_segment(ctx, self.track, self.selected_range_in)?;
        for (offset, segment) in self.moved.drain(..).enumerate() {
            seq.insert_segment(ctx, self.track, self.selected_range_in + offset, segment)?;
        }
        Ok(())
    }
}

// -------------------------------------------------------------------
// Trims
// -------------------------------------------------------------------

pub(crate) struct TwoRollTrim {
    track: usize,
    index: usize,
    delta: i64,
    cut_frame: i64,
    to_side_edited: bool,
    done: Option<TwoRollDoneFn>,
}

impl TwoRollTrim {
    /// Both sides must keep at least one frame after the shift.
    fn check<E: MediaEngine>(&self, seq: &Sequence<E>, undo: bool) -> Result<()> {
        if self.index == 0 {
            return Err(EditError::SegmentIndexOutOfRange {
                track: self.track,
                index: 0,
                count: seq.track(self.track)?.count(),
            });
        }
        let delta = if undo { -self.delta } else { self.delta };
        let from = seq.segment(self.track, self.index - 1)?;
        let to = seq.segment(self.track, self.index)?;
        if from.is_blank() && to.is_blank() {
            return Err(EditError::NotAClip {
                track: self.track,
                index: self.index,
            });
        }
        if from.length() + delta < 1 || to.length() - delta < 1 {
            return Err(EditError::NegativeClipLength {
                clip_in: from.clip_in(),
                clip_out: from.clip_out() + delta,
            });
        }
        Ok(())
    }

    fn shift<E: MediaEngine>(
        &self,
        seq: &mut Sequence<E>,
        ctx: &mut EditContext<'_>,
        delta: i64,
    ) -> Result<()> {
        let to = seq.remove_segment(ctx, self.track, self.index)?;
        let from = seq.remove_segment(ctx, self.track, self.index - 1)?;

        match from {
            Segment::Clip(clip) => {
                let (clip_in, clip_out) = (clip.clip_in, clip.clip_out + delta);
                seq.insert_clip(ctx, self.track, self.index - 1, clip, clip_in, clip_out)?;
            }
            Segment::Blank(blank) => {
                seq.insert_blank(self.track, self.index - 1, blank.length + delta)?;
            }
        }
        match to {
            Segment::Clip(clip) => {
                let (clip_in, clip_out) = (clip.clip_in + delta, clip.clip_out);
                seq.insert_clip(ctx, self.track, self.index, clip, clip_in, clip_out)?;
            }
            Segment::Blank(blank) => {
                seq.insert_blank(self.track, self.index, blank.length - delta)?;
            }
        }
        Ok(())
    }
}

impl<E: MediaEngine> EditOp<E> for TwoRollTrim {
    fn name(&self) -> &'static str {
        "two_roll_trim"
    }

    fn forward(
        &mut self,
        seq: &mut Sequence<E>,
        ctx: &mut EditContext<'_>,
        first: bool,
    ) -> Result<()> {
        self.check(seq, false)?;
        self.shift(seq, ctx, self.delta)?;
        if first {
            if let Some(done) = self.done.as_mut() {
                done(self.track, self.cut_frame + self.delta, self.to_side_edited);
            }
        }
        Ok(())
    }

    fn backward(&mut self, seq: &mut Sequence<E>, ctx: &mut EditContext<'_>) -> Result<()> {
        self.check(seq, true)?;
        self.shift(seq, ctx, -self.delta)
    }
}

pub(crate) struct TrimStart {
    track: usize,
    index: usize,
    delta: i64,
    done: Option<OneRollDoneFn>,
}

impl<E: MediaEngine> EditOp<E> for TrimStart {
    fn name(&self) -> &'static str {
        "trim_start"
    }

    fn forward(
        &mut self,
        seq: &mut Sequence<E>,
        ctx: &mut EditContext<'_>,
        first: bool,
    ) -> Result<()> {
        let clip = seq.clip(self.track, self.index)?;
        let (clip_in, clip_out) = (clip.clip_in + self.delta, clip.clip_out);
        if clip_in > clip_out {
            return Err(EditError::NegativeClipLength { clip_in, clip_out });
        }
        let Segment::Clip(clip) = seq.remove_segment(ctx, self.track, self.index)? else {
            unreachable!("checked above");
        };
        seq.insert_clip(ctx, self.track, self.index, clip, clip_in, clip_out)?;
        if first {
            if let Some(done) = self.done.as_mut() {
                done(self.track, self.index, true);
            }
        }
        Ok(())
    }

    fn backward(&mut self, seq: &mut Sequence<E>, ctx: &mut EditContext<'_>) -> Result<()> {
        let clip = seq.clip(self.track, self.index)?;
        let (clip_in, clip_out) = (clip.clip_in - self.delta, clip.clip_out);
        let Segment::Clip(clip) = seq.remove_segment(ctx, self.track, self.index)? else {
            unreachable!("checked above");
        };
        seq.insert_clip(ctx, self.track, self.index, clip, clip_in, clip_out)
    }
}

pub(crate) struct TrimEnd {
    track: usize,
    index: usize,
    delta: i64,
    done: Option<OneRollDoneFn>,
}

impl<E: MediaEngine> EditOp<E> for TrimEnd {
    fn name(&self) -> &'static str {
        "trim_end"
    }

    fn forward(
        &mut self,
        seq: &mut Sequence<E>,
        ctx: &mut EditContext<'_>,
        first: bool,
    ) -> Result<()> {
        let clip = seq.clip(self.track, self.index)?;
        let (clip_in, clip_out) = (clip.clip_in, clip.clip_out + self.delta);
        if clip_in > clip_out {
            return Err(EditError::NegativeClipLength { clip_in, clip_out });
        }
        let Segment::Clip(clip) = seq.remove_segment(ctx, self.track, self.index)? else {
            unreachable!("checked above");
        };
        seq.insert_clip(ctx, self.track, self.index, clip, clip_in, clip_out)?;
        if first {
            if let Some(done) = self.done.as_mut() {
                done(self.track, self.index + 1, false);
            }
        }
        Ok(())
    }

    fn backward(&mut self, seq: &mut Sequence<E>, ctx: &mut EditContext<'_>) -> Result<()> {
        let clip = seq.clip(self.track, self.index)?;
        let (clip_in, clip_out) = (clip.clip_in, clip.clip_out - self.delta);
        let Segment::Clip(clip) = seq.remove_segment(ctx, self.track, self.index)? else {
            unreachable!("checked above");
        };
        seq.insert_clip(ctx, self.track, self.index, clip, clip_in, clip_out)
    }
}

pub(crate) struct TrimStartOverBlanks {
    track: usize,
    blank_index: usize,
    removed_lengths: Vec<i64>,
}

impl<E: MediaEngine> EditOp<E> for TrimStartOverBlanks {
    fn name(&self) -> &'static str {
        "trim_start_over_blanks"
    }

    fn forward(
        &mut self,
        seq: &mut Sequence<E>,
        ctx: &mut EditContext<'_>,
        _first: bool,
    ) -> Result<()> {
        self.removed_lengths = seq.remove_consecutive_blanks(ctx, self.track, self.blank_index)?;
        let total: i64 = self.removed_lengths.iter().sum();

        let clip = seq.clip(self.track, self.blank_index)?;
        let (clip_in, clip_out) = (clip.clip_in - total, clip.clip_out);
        let Segment::Clip(clip) = seq.remove_segment(ctx, self.track, self.blank_index)? else {
            unreachable!("checked above");
        };
        seq.insert_clip(ctx, self.track, self.blank_index, clip, clip_in, clip_out)
    }

    fn backward(&mut self, seq: &mut Sequence<E>, ctx: &mut EditContext<'_>) -> Result<()> {
        let total: i64 = self.removed_lengths.iter().sum();
        let clip = seq.clip(self.track, self.blank_index)?;
        let (clip_in, clip_out) = (clip.clip_in + total, clip.clip_out);
        let Segment::Clip(clip) = seq.remove_segment(ctx, self.track, self.blank_index)? else {
            unreachable!("checked above");
        };
        seq.insert_clip(ctx, self.track, self.blank_index, clip, clip_in, clip_out)?;

        for (offset, length) in self.removed_lengths.drain(..).enumerate() {
            seq.insert_blank(self.track, self.blank_index + offset, length)?;
        }
        Ok(())
    }
}

pub(crate) struct TrimEndOverBlanks {
    track: usize,
    clip_index: usize,
    removed_lengths: Vec<i64>,
}

impl<E: MediaEngine> EditOp<E> for TrimEndOverBlanks {
    fn name(&self) -> &'static str {
        "trim_end_over_blanks"
    }

    fn forward(
        &mut self,
        seq: &mut Sequence<E>,
        ctx: &mut EditContext<'_>,
        _first: bool,
    ) -> Result<()> {
        self.removed_lengths =
            seq.remove_consecutive_blanks(ctx, self.track, self.clip_index + 1)?;
        let total: i64 = self.removed_lengths.iter().sum();

        let clip = seq.clip(self.track, self.clip_index)?;
        let (clip_in, clip_out) = (clip.clip_in, clip.clip_out + total);
        let Segment::Clip(clip) = seq.remove_segment(ctx, self.track, self.clip_index)? else {
            unreachable!("checked above");
        };
        seq.insert_clip(ctx, self.track, self.clip_index, clip, clip_in, clip_out)
    }

    fn backward(&mut self, seq: &mut Sequence<E>, ctx: &mut EditContext<'_>) -> Result<()> {
        let total: i64 = self.removed_lengths.iter().sum();
        for (offset, length) in self.removed_lengths.drain(..).enumerate() {
            seq.insert_blank(self.track, self.clip_index + 1 + offset, length)?;
        }

        let clip = seq.clip(self.track, self.clip_index)?;
        let (clip_in, clip_out) = (clip.clip_in, clip.clip_out - total);
        let Segment::Clip(clip) = seq.remove_segment(ctx, self.track, self.clip_index)? else {
            unreachable!("checked above");
        };
        seq.insert_clip(ctx, self.track, self.clip_index, clip, clip_in, clip_out)
    }
}

// -------------------------------------------------------------------
// Blank consolidation
// -------------------------------------------------------------------

pub(crate) struct ConsolidateBlanks {
    track: usize,
    index: usize,
    removed_lengths: Vec<i64>,
}

impl<E: MediaEngine> EditOp<E> for ConsolidateBlanks {
    fn name(&self) -> &'static str {
        "consolidate_blanks"
    }

    fn forward(
        &mut self,
        seq: &mut Sequence<E>,
        ctx: &mut EditContext<'_>,
        _first: bool,
    ) -> Result<()> {
        self.removed_lengths = seq.remove_consecutive_blanks(ctx, self.track, self.index)?;
        if self.removed_lengths.is_empty() {
            return Err(EditError::NotABlank {
                track: self.track,
                index: self.index,
            });
        }
        let total: i64 = self.removed_lengths.iter().sum();
        seq.insert_blank(self.track, self.index, total)
    }

    fn backward(&mut self, seq: &mut Sequence<E>, ctx: &mut EditContext<'_>) -> Result<()> {
        seq.remove_segment(ctx, self.track, self.index)?;
        for (offset, length) in self.removed_lengths.drain(..).enumerate() {
            seq.insert_blank(self.track, self.index + offset, length)?;
        }
        Ok(())
    }
}

pub(crate) struct ConsolidateAllBlanks {
    consolidations: Vec<(usize, usize, Vec<i64>)>,
}

impl<E: MediaEngine> EditOp<E> for ConsolidateAllBlanks {
    fn name(&self) -> &'static str {
        "consolidate_all_blanks"
    }

    fn forward(
        &mut self,
        seq: &mut Sequence<E>,
        ctx: &mut EditContext<'_>,
        _first: bool,
    ) -> Result<()> {
        self.consolidations.clear();
        for track in 0..seq.tracks().len() {
            let mut index = 0;
            while index < seq.track(track)?.count() {
                let run_is_consolidatable = seq.track(track)?.segments()[index].is_blank()
                    && seq
                        .track(track)?
                        .segment(index + 1)
                        .is_some_and(Segment::is_blank);
                if !run_is_consolidatable {
                    index += 1;
                    continue;
                }
                let lengths = seq.remove_consecutive_blanks(ctx, track, index)?;
                let total: i64 = lengths.iter().sum();
                seq.insert_blank(track, index, total)?;
                self.consolidations.push((track, index, lengths));
                index += 1;
            }
        }
        info!(runs = self.consolidations.len(), "blanks consolidated");
        Ok(())
    }

    fn backward(&mut self, seq: &mut Sequence<E>, ctx: &mut EditContext<'_>) -> Result<()> {
        for (track, index, lengths) in self.consolidations.drain(..).rev() {
            seq.remove_segment(ctx, track, index)?;
            for (offset, length) in lengths.into_iter().enumerate() {
                seq.insert_blank(track, index + offset, length)?;
            }
        }
        Ok(())
    }
}

// -------------------------------------------------------------------
// Action factories
// -------------------------------------------------------------------

/// Appends `clip` to the track end.
pub fn append_action<E: MediaEngine>(
    track: usize,
    clip: Clip,
    clip_in: i64,
    clip_out: i64,
) -> EditAction<E> {
    EditAction::new(Box::new(Append {
        track,
        clip_in,
        clip_out,
        clip: Some(clip),
    }))
}

/// Inserts `clip` at `index`.
pub fn insert_action<E: MediaEngine>(
    track: usize,
    index: usize,
    clip: Clip,
    clip_in: i64,
    clip_out: i64,
) -> EditAction<E> {
    EditAction::new(Box::new(Insert {
        track,
        index,
        clip_in,
        clip_out,
        clip: Some(clip),
    }))
}

/// Splices out segments `[from_index, to_index]`, closing the gap.
pub fn remove_multiple_action<E: MediaEngine>(
    track: usize,
    from_index: usize,
    to_index: usize,
) -> EditAction<E> {
    EditAction::new(Box::new(RemoveMultiple {
        track,
        from_index,
        to_index,
        removed: Vec::new(),
    }))
}

/// Replaces segments `[from_index, to_index]` with one blank of their
/// summed length.
pub fn lift_multiple_action<E: MediaEngine>(
    track: usize,
    from_index: usize,
    to_index: usize,
) -> EditAction<E> {
    EditAction::new(Box::new(LiftMultiple {
        track,
        from_index,
        to_index,
        lifted: Vec::new(),
    }))
}

/// Cuts the clip at `index` in two at source frame `cut_frame`.
pub fn cut_action<E: MediaEngine>(track: usize, index: usize, cut_frame: i64) -> EditAction<E> {
    EditAction::new(Box::new(Cut {
        track,
        index,
        cut_frame,
        clone: None,
    }))
}

/// Replaces segments `[in_index, out_index]` with `clip`.
pub fn three_point_overwrite_action<E: MediaEngine>(
    track: usize,
    clip: Clip,
    clip_in: i64,
    clip_out: i64,
    in_index: usize,
    out_index: usize,
) -> EditAction<E> {
    EditAction::new(Box::new(ThreePointOverwrite {
        track,
        clip_in,
        clip_out,
        in_index,
        out_index,
        clip: Some(clip),
        removed: Vec::new(),
    }))
}

/// Splices the selected range out and back in at `insert_index`.
pub fn insert_move_action<E: MediaEngine>(
    track: usize,
    insert_index: usize,
    selected_range_in: usize,
    selected_range_out: usize,
    move_done: Option<MoveDoneFn>,
) -> EditAction<E> {
    EditAction::new(Box::new(InsertMove {
        track,
        insert_index,
        selected_range_in,
        selected_range_out,
        move_done,
        real_insert_index: 0,
        moved: Vec::new(),
    }))
}

/// Splices the selected range out of `track` and in at `insert_index` on
/// `to_track`.
pub fn multitrack_insert_move_action<E: MediaEngine>(
    track: usize,
    to_track: usize,
    insert_index: usize,
    selected_range_in: usize,
    selected_range_out: usize,
    move_done: Option<MoveDoneFn>,
) -> EditAction<E> {
    EditAction::new(Box::new(MultitrackInsertMove {
        track,
        to_track,
        insert_index,
        selected_range_in,
        selected_range_out,
        move_done,
        moved: Vec::new(),
    }))
}

/// Lifts the selected range and overwrites `[over_in, over_out)` with it,
/// splitting and removing whatever it lands on.
pub fn overwrite_move_action<E: MediaEngine>(
    track: usize,
    over_in: i64,
    over_out: i64,
    selected_range_in: usize,
    selected_range_out: usize,
) -> EditAction<E> {
    EditAction::new(Box::new(OverwriteMove::new(
        track,
        over_in,
        over_out,
        selected_range_in,
        selected_range_out,
    )))
}

/// Overwrite move where source and destination are different tracks.
pub fn multitrack_overwrite_move_action<E: MediaEngine>(
    track: usize,
    to_track: usize,
    over_in: i64,
    over_out: i64,
    selected_range_in: usize,
    selected_range_out: usize,
) -> EditAction<E> {
    EditAction::new(Box::new(MultitrackOverwriteMove {
        track,
        to_track,
        over_in,
        over_out,
        selected_range_in,
        selected_range_out,
        moved: Vec::new(),
        splice: None,
        source_trailing: Vec::new(),
        dest_trailing: Vec::new(),
    }))
}

/// Shifts the boundary between segments `index - 1` and `index` by
/// `delta` frames. `cut_frame` is the boundary's timeline frame before
/// the trim, reported back through the callback.
pub fn tworoll_trim_action<E: MediaEngine>(
    track: usize,
    index: usize,
    delta: i64,
    cut_frame: i64,
    to_side_edited: bool,
    done: Option<TwoRollDoneFn>,
) -> EditAction<E> {
    EditAction::new(Box::new(TwoRollTrim {
        track,
        index,
        delta,
        cut_frame,
        to_side_edited,
        done,
    }))
}

/// Moves the clip's in-point by `delta` frames.
pub fn trim_start_action<E: MediaEngine>(
    track: usize,
    index: usize,
    delta: i64,
    done: Option<OneRollDoneFn>,
) -> EditAction<E> {
    EditAction::new(Box::new(TrimStart {
        track,
        index,
        delta,
        done,
    }))
}

/// Moves the clip's out-point by `delta` frames.
pub fn trim_end_action<E: MediaEngine>(
    track: usize,
    index: usize,
    delta: i64,
    done: Option<OneRollDoneFn>,
) -> EditAction<E> {
    EditAction::new(Box::new(TrimEnd {
        track,
        index,
        delta,
        done,
    }))
}

/// Extends the clip after `blank_index` leftwards over every consecutive
/// blank starting there.
pub fn trim_start_over_blanks_action<E: MediaEngine>(
    track: usize,
    blank_index: usize,
) -> EditAction<E> {
    EditAction::new(Box::new(TrimStartOverBlanks {
        track,
        blank_index,
        removed_lengths: Vec::new(),
    }))
}

/// Extends the clip at `clip_index` rightwards over every consecutive
/// blank that follows it.
pub fn trim_end_over_blanks_action<E: MediaEngine>(
    track: usize,
    clip_index: usize,
) -> EditAction<E> {
    EditAction::new(Box::new(TrimEndOverBlanks {
        track,
        clip_index,
        removed_lengths: Vec::new(),
    }))
}

/// Merges the run of consecutive blanks starting at `index` into one.
pub fn consolidate_blanks_action<E: MediaEngine>(track: usize, index: usize) -> EditAction<E> {
    EditAction::new(Box::new(ConsolidateBlanks {
        track,
        index,
        removed_lengths: Vec::new(),
    }))
}

/// Merges every run of two or more consecutive blanks, on every track.
pub fn consolidate_all_blanks_action<E: MediaEngine>() -> EditAction<E> {
    EditAction::new(Box::new(ConsolidateAllBlanks {
        consolidations: Vec::new(),
    }))
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::{
        append_action, consolidate_all_blanks_action, consolidate_blanks_action, cut_action,
        insert_move_action, lift_multiple_action, multitrack_insert_move_action,
        multitrack_overwrite_move_action, overwrite_move_action, remove_multiple_action,
        three_point_overwrite_action, trim_end_action, trim_end_over_blanks_action,
        trim_start_action, trim_start_over_blanks_action, tworoll_trim_action,
    };
    use crate::engine::InMemoryEngine;
    use crate::sequence::Sequence;
    use crate::testsupport::{Harness, lengths, seed_clips, snapshot_segments};
    use crate::track::TrackKind;

    fn sequence(tracks: usize) -> Sequence<InMemoryEngine> {
        Sequence::new(
            InMemoryEngine::new(tracks),
            (0..tracks).map(|_| TrackKind::Video).collect(),
        )
    }

    #[test]
    fn append_round_trips() {
        let mut h = Harness::new();
        let mut seq = sequence(1);
        seed_clips(&mut seq, &mut h.ctx(), 0, &[10]);

        let clip = seq.create_clip(crate::segment::SourceRef::Media("b.mp4".into()), "b");
        let mut action = append_action(0, clip, 5, 14);
        action.do_edit(&mut seq, &mut h.ctx()).expect("do");
        assert_eq!(lengths(&seq, 0), vec![10, 10]);

        action.undo(&mut seq, &mut h.ctx()).expect("undo");
        assert_eq!(lengths(&seq, 0), vec![10]);

        action.redo(&mut seq, &mut h.ctx()).expect("redo");
        assert_eq!(lengths(&seq, 0), vec![10, 10]);
        assert!(seq.mirror_consistent(0));
    }

    #[test]
    fn remove_multiple_restores_exact_segments() {
        let mut h = Harness::new();
        let mut seq = sequence(1);
        seed_clips(&mut seq, &mut h.ctx(), 0, &[10, 20, 15]);
        let before = snapshot_segments(&seq, 0);

        let mut action = remove_multiple_action(0, 0, 1);
        action.do_edit(&mut seq, &mut h.ctx()).expect("do");
        assert_eq!(lengths(&seq, 0), vec![15]);

        action.undo(&mut seq, &mut h.ctx()).expect("undo");
        assert_eq!(snapshot_segments(&seq, 0), before);
    }

    #[test]
    fn lift_multiple_replaces_range_with_one_blank() {
        let mut h = Harness::new();
        let mut seq = sequence(1);
        seed_clips(&mut seq, &mut h.ctx(), 0, &[5, 7, 9]);
        let before = snapshot_segments(&seq, 0);

        let mut action = lift_multiple_action(0, 0, 1);
        action.do_edit(&mut seq, &mut h.ctx()).expect("do");
        assert_eq!(lengths(&seq, 0), vec![12, 9]);
        assert!(seq.tracks()[0].segments()[0].is_blank());

        action.undo(&mut seq, &mut h.ctx()).expect("undo");
        assert_eq!(snapshot_segments(&seq, 0), before);
    }

    #[test]
    fn cut_memoizes_the_clone_across_replays() {
        let mut h = Harness::new();
        let mut seq = sequence(1);
        seed_clips(&mut seq, &mut h.ctx(), 0, &[10, 20, 15]);
        let before = snapshot_segments(&seq, 0);

        let mut action = cut_action(0, 1, 5);
        action.do_edit(&mut seq, &mut h.ctx()).expect("do");
        assert_eq!(lengths(&seq, 0), vec![10, 5, 15, 15]);
        let clone_id = seq.clip(0, 2).expect("clone").id;

        action.undo(&mut seq, &mut h.ctx()).expect("undo");
        assert_eq!(snapshot_segments(&seq, 0), before);

        action.redo(&mut seq, &mut h.ctx()).expect("redo");
        assert_eq!(seq.clip(0, 2).expect("clone").id, clone_id);
        assert_eq!(lengths(&seq, 0), vec![10, 5, 15, 15]);
    }

    #[test]
    fn three_point_overwrite_round_trips() {
        let mut h = Harness::new();
        let mut seq = sequence(1);
        seed_clips(&mut seq, &mut h.ctx(), 0, &[10, 20, 15]);
        let before = snapshot_segments(&seq, 0);

        let clip = seq.create_clip(crate::segment::SourceRef::Media("o.mp4".into()), "o");
        let mut action = three_point_overwrite_action(0, clip, 0, 29, 0, 1);
        action.do_edit(&mut seq, &mut h.ctx()).expect("do");
        assert_eq!(lengths(&seq, 0), vec![30, 15]);

        action.undo(&mut seq, &mut h.ctx()).expect("undo");
        assert_eq!(snapshot_segments(&seq, 0), before);
    }

    #[test]
    fn insert_move_adjusts_index_when_moving_right() {
        let mut h = Harness::new();
        let mut seq = sequence(1);
        let ids = seed_clips(&mut seq, &mut h.ctx(), 0, &[10, 20, 15, 5]);
        let before = snapshot_segments(&seq, 0);

        let moved: Rc<RefCell<Vec<Vec<u64>>>> = Rc::default();
        let sink = Rc::clone(&moved);
        let mut action = insert_move_action(
            0,
            3,
            0,
            0,
            Some(Box::new(move |clips| sink.borrow_mut().push(clips.to_vec()))),
        );
        action.do_edit(&mut seq, &mut h.ctx()).expect("do");
        assert_eq!(lengths(&seq, 0), vec![20, 15, 10, 5]);
        assert_eq!(seq.clip(0, 2).expect("moved").id, ids[0]);
        assert_eq!(*moved.borrow(), vec![vec![ids[0]]]);

        action.undo(&mut seq, &mut h.ctx()).expect("undo");
        assert_eq!(snapshot_segments(&seq, 0), before);
    }

    #[test]
    fn multitrack_insert_move_crosses_tracks_and_evicts_waveforms() {
        let mut h = Harness::new();
        let mut seq = sequence(2);
        let ids = seed_clips(&mut seq, &mut h.ctx(), 0, &[10, 20]);
        seed_clips(&mut seq, &mut h.ctx(), 1, &[8]);
        h.insert_waveform(ids[1], 1);

        let mut action = multitrack_insert_move_action(0, 1, 1, 1, 1, None);
        action.do_edit(&mut seq, &mut h.ctx()).expect("do");
        assert_eq!(lengths(&seq, 0), vec![10]);
        assert_eq!(lengths(&seq, 1), vec![8, 20]);
        assert!(!h.has_waveform(ids[1], 1));

        action.undo(&mut seq, &mut h.ctx()).expect("undo");
        assert_eq!(lengths(&seq, 0), vec![10, 20]);
        assert_eq!(lengths(&seq, 1), vec![8]);
    }

    #[test]
    fn overwrite_move_into_mid_clip_splits_and_restores() {
        let mut h = Harness::new();
        let mut seq = sequence(1);
        seed_clips(&mut seq, &mut h.ctx(), 0, &[20, 8]);
        let before = snapshot_segments(&seq, 0);

        // Move the 8-frame clip onto frames [5, 13) inside the 20-frame clip.
        let mut action = overwrite_move_action(0, 5, 13, 1, 1);
        action.do_edit(&mut seq, &mut h.ctx()).expect("do");
        assert_eq!(lengths(&seq, 0), vec![5, 8, 7]);
        assert_eq!(seq.tracks()[0].length(), 20);

        action.undo(&mut seq, &mut h.ctx()).expect("undo");
        assert_eq!(snapshot_segments(&seq, 0), before);

        action.redo(&mut seq, &mut h.ctx()).expect("redo");
        assert_eq!(lengths(&seq, 0), vec![5, 8, 7]);
        action.undo(&mut seq, &mut h.ctx()).expect("undo again");
        assert_eq!(snapshot_segments(&seq, 0), before);
    }

    #[test]
    fn overwrite_move_past_track_end_pads_and_restores() {
        let mut h = Harness::new();
        let mut seq = sequence(1);
        seed_clips(&mut seq, &mut h.ctx(), 0, &[10, 8]);
        let before = snapshot_segments(&seq, 0);

        // Move the trailing clip 12 frames right: destination [22, 30).
        // The lift blank and the cut pad blank stay adjacent; adjacent
        // blanks are transient until a consolidation pass runs.
        let mut action = overwrite_move_action(0, 22, 30, 1, 1);
        action.do_edit(&mut seq, &mut h.ctx()).expect("do");
        assert_eq!(lengths(&seq, 0), vec![10, 8, 4, 8]);
        assert!(seq.tracks()[0].segments()[1].is_blank());
        assert!(seq.tracks()[0].segments()[2].is_blank());
        assert_eq!(seq.tracks()[0].length(), 30);

        action.undo(&mut seq, &mut h.ctx()).expect("undo");
        assert_eq!(snapshot_segments(&seq, 0), before);
    }

    #[test]
    fn overwrite_move_last_clip_slightly_forward_round_trips() {
        // The end-of-track case: the moved clip stays last after the move.
        let mut h = Harness::new();
        let mut seq = sequence(1);
        seed_clips(&mut seq, &mut h.ctx(), 0, &[10, 8]);
        let before = snapshot_segments(&seq, 0);

        let mut action = overwrite_move_action(0, 14, 22, 1, 1);
        action.do_edit(&mut seq, &mut h.ctx()).expect("do");
        assert_eq!(lengths(&seq, 0), vec![10, 4, 8]);
        assert!(seq.tracks()[0].segments()[1].is_blank());

        action.undo(&mut seq, &mut h.ctx()).expect("undo");
        assert_eq!(snapshot_segments(&seq, 0), before);

        action.redo(&mut seq, &mut h.ctx()).expect("redo");
        action.undo(&mut seq, &mut h.ctx()).expect("undo again");
        assert_eq!(snapshot_segments(&seq, 0), before);
    }

    #[test]
    fn overwrite_move_preserves_preexisting_trailing_blanks_on_undo() {
        let mut h = Harness::new();
        let mut seq = sequence(1);
        seed_clips(&mut seq, &mut h.ctx(), 0, &[10, 8]);
        let mut lift = lift_multiple_action(0, 1, 1);
        lift.do_edit(&mut seq, &mut h.ctx()).expect("lift");
        seed_clips(&mut seq, &mut h.ctx(), 0, &[6]);
        let mut lift_last = lift_multiple_action(0, 2, 2);
        lift_last.do_edit(&mut seq, &mut h.ctx()).expect("lift last");
        // Track is now [clip 10, blank 8, blank 6]: trailing blanks exist.
        let before = snapshot_segments(&seq, 0);

        let mut action = overwrite_move_action(0, 20, 30, 0, 0);
        action.do_edit(&mut seq, &mut h.ctx()).expect("do");
        action.undo(&mut seq, &mut h.ctx()).expect("undo");
        assert_eq!(snapshot_segments(&seq, 0), before);
    }

    #[test]
    fn multitrack_overwrite_move_round_trips_across_tracks() {
        let mut h = Harness::new();
        let mut seq = sequence(2);
        seed_clips(&mut seq, &mut h.ctx(), 0, &[10, 8]);
        seed_clips(&mut seq, &mut h.ctx(), 1, &[20]);
        let before_src = snapshot_segments(&seq, 0);
        let before_dst = snapshot_segments(&seq, 1);

        let mut action = multitrack_overwrite_move_action(0, 1, 5, 13, 1, 1);
        action.do_edit(&mut seq, &mut h.ctx()).expect("do");
        assert_eq!(lengths(&seq, 0), vec![10]);
        assert_eq!(lengths(&seq, 1), vec![5, 8, 7]);

        action.undo(&mut seq, &mut h.ctx()).expect("undo");
        assert_eq!(snapshot_segments(&seq, 0), before_src);
        assert_eq!(snapshot_segments(&seq, 1), before_dst);
    }

    #[test]
    fn tworoll_trim_shifts_the_shared_boundary() {
        let mut h = Harness::new();
        let mut seq = sequence(1);
        seed_clips(&mut seq, &mut h.ctx(), 0, &[10, 20]);
        let before = snapshot_segments(&seq, 0);

        let reported: Rc<RefCell<Vec<(usize, i64, bool)>>> = Rc::default();
        let sink = Rc::clone(&reported);
        let mut action = tworoll_trim_action(
            0,
            1,
            3,
            10,
            true,
            Some(Box::new(move |track, frame, to_side| {
                sink.borrow_mut().push((track, frame, to_side));
            })),
        );
        action.do_edit(&mut seq, &mut h.ctx()).expect("do");
        assert_eq!(lengths(&seq, 0), vec![13, 17]);
        assert_eq!(*reported.borrow(), vec![(0, 13, true)]);

        action.undo(&mut seq, &mut h.ctx()).expect("undo");
        assert_eq!(snapshot_segments(&seq, 0), before);

        // Callback fires exactly once, on the first run.
        action.redo(&mut seq, &mut h.ctx()).expect("redo");
        assert_eq!(reported.borrow().len(), 1);
    }

    #[test]
    fn tworoll_trim_substitutes_blank_on_the_blank_side() {
        let mut h = Harness::new();
        let mut seq = sequence(1);
        seed_clips(&mut seq, &mut h.ctx(), 0, &[10]);
        let mut lift = lift_multiple_action(0, 0, 0);
        lift.do_edit(&mut seq, &mut h.ctx()).expect("lift");
        seed_clips(&mut seq, &mut h.ctx(), 0, &[20]);
        // Track: [blank 10, clip 20]; grow the clip into the blank.
        let before = snapshot_segments(&seq, 0);

        let mut action = tworoll_trim_action(0, 1, -4, 10, true, None);
        action.do_edit(&mut seq, &mut h.ctx()).expect("do");
        assert_eq!(lengths(&seq, 0), vec![6, 24]);
        assert!(seq.tracks()[0].segments()[0].is_blank());

        action.undo(&mut seq, &mut h.ctx()).expect("undo");
        assert_eq!(snapshot_segments(&seq, 0), before);
    }

    #[test]
    fn one_roll_trims_move_single_edges() {
        let mut h = Harness::new();
        let mut seq = sequence(1);
        seed_clips(&mut seq, &mut h.ctx(), 0, &[10, 20]);
        let before = snapshot_segments(&seq, 0);

        let mut start = trim_start_action(0, 1, 4, None);
        start.do_edit(&mut seq, &mut h.ctx()).expect("do");
        assert_eq!(lengths(&seq, 0), vec![10, 16]);
        start.undo(&mut seq, &mut h.ctx()).expect("undo");
        assert_eq!(snapshot_segments(&seq, 0), before);

        let mut end = trim_end_action(0, 0, -3, None);
        end.do_edit(&mut seq, &mut h.ctx()).expect("do");
        assert_eq!(lengths(&seq, 0), vec![7, 20]);
        end.undo(&mut seq, &mut h.ctx()).expect("undo");
        assert_eq!(snapshot_segments(&seq, 0), before);
    }

    #[test]
    fn trim_over_blanks_absorbs_and_restores_gap_runs() {
        let mut h = Harness::new();
        let mut seq = sequence(1);
        seed_clips(&mut seq, &mut h.ctx(), 0, &[10]);
        let mut lift = lift_multiple_action(0, 0, 0);
        lift.do_edit(&mut seq, &mut h.ctx()).expect("lift");
        seed_clips(&mut seq, &mut h.ctx(), 0, &[20]);
        // Track: [blank 10, clip 20 (source 0..19)].
        let before = snapshot_segments(&seq, 0);

        let mut action = trim_start_over_blanks_action(0, 0);
        action.do_edit(&mut seq, &mut h.ctx()).expect("do");
        assert_eq!(lengths(&seq, 0), vec![30]);
        assert_eq!(seq.clip(0, 0).expect("clip").clip_in, -10);

        action.undo(&mut seq, &mut h.ctx()).expect("undo");
        assert_eq!(snapshot_segments(&seq, 0), before);
    }

    #[test]
    fn trim_end_over_blanks_round_trips() {
        let mut h = Harness::new();
        let mut seq = sequence(1);
        seed_clips(&mut seq, &mut h.ctx(), 0, &[20, 10]);
        let mut lift = lift_multiple_action(0, 1, 1);
        lift.do_edit(&mut seq, &mut h.ctx()).expect("lift");
        seed_clips(&mut seq, &mut h.ctx(), 0, &[5]);
        // Track: [clip 20, blank 10, clip 5].
        let before = snapshot_segments(&seq, 0);

        let mut action = trim_end_over_blanks_action(0, 0);
        action.do_edit(&mut seq, &mut h.ctx()).expect("do");
        assert_eq!(lengths(&seq, 0), vec![30, 5]);

        action.undo(&mut seq, &mut h.ctx()).expect("undo");
        assert_eq!(snapshot_segments(&seq, 0), before);
    }

    #[test]
    fn consolidate_blanks_merges_one_run() {
        let mut h = Harness::new();
        let mut seq = sequence(1);
        seed_clips(&mut seq, &mut h.ctx(), 0, &[10, 4, 6, 5]);
        let mut lift_a = lift_multiple_action(0, 1, 1);
        lift_a.do_edit(&mut seq, &mut h.ctx()).expect("lift");
        let mut lift_b = lift_multiple_action(0, 2, 2);
        lift_b.do_edit(&mut seq, &mut h.ctx()).expect("lift");
        // Track: [clip 10, blank 4, blank 6, clip 5].
        let before = snapshot_segments(&seq, 0);

        let mut action = consolidate_blanks_action(0, 1);
        action.do_edit(&mut seq, &mut h.ctx()).expect("do");
        assert_eq!(lengths(&seq, 0), vec![10, 10, 5]);

        action.undo(&mut seq, &mut h.ctx()).expect("undo");
        assert_eq!(snapshot_segments(&seq, 0), before);
    }

    #[test]
    fn consolidate_all_blanks_handles_interior_and_trailing_runs() {
        let mut h = Harness::new();
        let mut seq = sequence(1);
        seed_clips(&mut seq, &mut h.ctx(), 0, &[3, 4, 6, 9, 2, 2]);
        for index in [1, 2, 4, 5] {
            let mut lift = lift_multiple_action(0, index, index);
            lift.do_edit(&mut seq, &mut h.ctx()).expect("lift");
        }
        // Track: [clip 3, blank 4, blank 6, clip 9, blank 2, blank 2].
        let before = snapshot_segments(&seq, 0);

        let mut action = consolidate_all_blanks_action();
        action.do_edit(&mut seq, &mut h.ctx()).expect("do");
        assert_eq!(lengths(&seq, 0), vec![3, 10, 9, 4]);

        action.undo(&mut seq, &mut h.ctx()).expect("undo");
        assert_eq!(snapshot_segments(&seq, 0), before);
    }
}
