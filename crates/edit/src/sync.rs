//! Sync binding, audio splice, and the resynchronization engine.
//!
//! Resync actions query the synchronization collaborator for current
//! offsets and synthesize one overwrite move per drifted clip; the
//! generated moves are memoized on first run and replayed as a unit,
//! unwound in strict reverse order on undo.

use tracing::{debug, info};

use crate::action::{EditAction, EditContext, EditOp, ResyncItem};
use crate::edits::{OverwriteMove, splice_out, taken, unsplice, RangeSplice};
use crate::engine::MediaEngine;
use crate::error::{EditError, Result};
use crate::segment::{Clip, ClipId, Segment, SyncData, SyncState};
use crate::sequence::Sequence;

// -------------------------------------------------------------------
// Sync binding
// -------------------------------------------------------------------

pub(crate) struct SetSync {
    child_track: usize,
    child_index: usize,
    parent_track: usize,
    parent_index: usize,
    prev_sync: Option<Option<SyncData>>,
}

impl<E: MediaEngine> EditOp<E> for SetSync {
    fn name(&self) -> &'static str {
        "set_sync"
    }

    fn forward(
        &mut self,
        seq: &mut Sequence<E>,
        ctx: &mut EditContext<'_>,
        _first: bool,
    ) -> Result<()> {
        let parent = seq.clip(self.parent_track, self.parent_index)?;
        let parent_id = parent.id;
        let parent_start =
            seq.track(self.parent_track)?.clip_start(self.parent_index) - parent.clip_in;
        let child = seq.clip(self.child_track, self.child_index)?;
        let child_start = seq.track(self.child_track)?.clip_start(self.child_index) - child.clip_in;
        let pos_offset = child_start - parent_start;

        let child = seq.clip_mut(self.child_track, self.child_index)?;
        self.prev_sync = Some(child.sync.take());
        child.sync = Some(SyncData {
            pos_offset,
            master_clip: parent_id,
            state: SyncState::Correct,
        });
        debug!(child = child.id, master = parent_id, pos_offset, "sync set");

        let child = seq.clip(self.child_track, self.child_index)?.clone();
        ctx.sync.clip_added(&child, self.child_track);
        Ok(())
    }

    fn backward(&mut self, seq: &mut Sequence<E>, ctx: &mut EditContext<'_>) -> Result<()> {
        let prev = taken(&mut self.prev_sync, "set_sync")?;
        let child = seq.clip_mut(self.child_track, self.child_index)?;
        let child_id = child.id;
        child.sync = prev;
        ctx.sync.sync_cleared(child_id);
        Ok(())
    }
}

pub(crate) struct ClearSync {
    child_track: usize,
    child_index: usize,
    saved: Option<SyncData>,
}

impl<E: MediaEngine> EditOp<E> for ClearSync {
    fn name(&self) -> &'static str {
        "clear_sync"
    }

    fn forward(
        &mut self,
        seq: &mut Sequence<E>,
        ctx: &mut EditContext<'_>,
        _first: bool,
    ) -> Result<()> {
        let child = seq.clip_mut(self.child_track, self.child_index)?;
        let child_id = child.id;
        self.saved = Some(child.sync.take().ok_or(EditError::NoSyncData { clip: child_id })?);
        ctx.sync.sync_cleared(child_id);
        Ok(())
    }

    fn backward(&mut self, seq: &mut Sequence<E>, ctx: &mut EditContext<'_>) -> Result<()> {
        let saved = taken(&mut self.saved, "clear_sync")?;
        let child = seq.clip_mut(self.child_track, self.child_index)?;
        child.sync = Some(saved);
        let child = seq.clip(self.child_track, self.child_index)?.clone();
        ctx.sync.clip_added(&child, self.child_track);
        Ok(())
    }
}

// -------------------------------------------------------------------
// Audio splice
// -------------------------------------------------------------------

/// Overwrites `[frame, frame + len)` on a track with one clip, using the
/// same boundary-cut bookkeeping as the overwrite moves.
pub(crate) struct SyncOverwrite {
    track: usize,
    frame: i64,
    clip_in: i64,
    clip_out: i64,
    clip: Option<Clip>,
    splice: Option<RangeSplice>,
}

impl<E: MediaEngine> EditOp<E> for SyncOverwrite {
    fn name(&self) -> &'static str {
        "sync_overwrite"
    }

    fn forward(
        &mut self,
        seq: &mut Sequence<E>,
        ctx: &mut EditContext<'_>,
        _first: bool,
    ) -> Result<()> {
        let over_out = self.frame + self.clip_out - self.clip_in + 1;
        let splice = splice_out(seq, ctx, self.track, self.frame, over_out, false)?;
        let in_index = splice.in_index;
        self.splice = Some(splice);
        let clip = taken(&mut self.clip, "sync_overwrite")?;
        seq.insert_clip(ctx, self.track, in_index, clip, self.clip_in, self.clip_out)
    }

    fn backward(&mut self, seq: &mut Sequence<E>, ctx: &mut EditContext<'_>) -> Result<()> {
        let over_out = self.frame + self.clip_out - self.clip_in + 1;
        let mut splice = taken(&mut self.splice, "sync_overwrite")?;
        let Segment::Clip(clip) = seq.remove_segment(ctx, self.track, splice.in_index)? else {
            return Err(EditError::NotAClip {
                track: self.track,
                index: splice.in_index,
            });
        };
        self.clip = Some(clip);
        unsplice(seq, ctx, self.track, self.frame, over_out, &mut splice)
    }
}

/// Overwrites a range of an audio track with a clip carrying the parent
/// clip's audio, and mutes the parent's own audio.
pub(crate) struct AudioSplice {
    to_track: usize,
    over_in: i64,
    over_out: i64,
    parent_track: usize,
    parent_index: usize,
    audio_clip: Option<Clip>,
    splice: Option<RangeSplice>,
    trailing: Vec<i64>,
}

impl<E: MediaEngine> EditOp<E> for AudioSplice {
    fn name(&self) -> &'static str {
        "audio_splice"
    }

    fn forward(
        &mut self,
        seq: &mut Sequence<E>,
        ctx: &mut EditContext<'_>,
        _first: bool,
    ) -> Result<()> {
        let parent = seq.clip(self.parent_track, self.parent_index)?;
        let (clip_in, clip_out) = (parent.clip_in, parent.clip_out);

        let splice = splice_out(seq, ctx, self.to_track, self.over_in, self.over_out, true)?;
        let in_index = splice.in_index;
        self.splice = Some(splice);

        let audio_clip = taken(&mut self.audio_clip, "audio_splice")?;
        seq.insert_clip(ctx, self.to_track, in_index, audio_clip, clip_in, clip_out)?;

        let mute = seq.create_mute_filter();
        seq.mute_clip(self.parent_track, self.parent_index, mute)?;

        self.trailing = seq.remove_trailing_blanks(ctx, self.to_track)?;
        info!(
            to_track = self.to_track,
            over_in = self.over_in,
            over_out = self.over_out,
            "audio spliced"
        );
        Ok(())
    }

    fn backward(&mut self, seq: &mut Sequence<E>, ctx: &mut EditContext<'_>) -> Result<()> {
        seq.restore_trailing_blanks(self.to_track, &self.trailing)?;
        self.trailing.clear();

        seq.unmute_clip(self.parent_track, self.parent_index)?;

        let mut splice = taken(&mut self.splice, "audio_splice")?;
        let Segment::Clip(clip) = seq.remove_segment(ctx, self.to_track, splice.in_index)? else {
            return Err(EditError::NotAClip {
                track: self.to_track,
                index: splice.in_index,
            });
        };
        self.audio_clip = Some(clip);
        unsplice(seq, ctx, self.to_track, self.over_in, self.over_out, &mut splice)
    }
}

/// Binds an already placed audio clip to its parent (offset zero) and
/// mutes the parent's own audio.
pub(crate) struct AudioSyncSplice {
    parent_track: usize,
    parent_index: usize,
    child_track: usize,
    child_index: usize,
    prev_sync: Option<Option<SyncData>>,
}

impl<E: MediaEngine> EditOp<E> for AudioSyncSplice {
    fn name(&self) -> &'static str {
        "audio_sync_splice"
    }

    fn forward(
        &mut self,
        seq: &mut Sequence<E>,
        ctx: &mut EditContext<'_>,
        _first: bool,
    ) -> Result<()> {
        let parent_id = seq.clip(self.parent_track, self.parent_index)?.id;

        let child = seq.clip_mut(self.child_track, self.child_index)?;
        self.prev_sync = Some(child.sync.take());
        child.sync = Some(SyncData {
            pos_offset: 0,
            master_clip: parent_id,
            state: SyncState::Correct,
        });

        let mute = seq.create_mute_filter();
        seq.mute_clip(self.parent_track, self.parent_index, mute)?;

        let child = seq.clip(self.child_track, self.child_index)?.clone();
        ctx.sync.clip_added(&child, self.child_track);
        Ok(())
    }

    fn backward(&mut self, seq: &mut Sequence<E>, ctx: &mut EditContext<'_>) -> Result<()> {
        seq.unmute_clip(self.parent_track, self.parent_index)?;

        let prev = taken(&mut self.prev_sync, "audio_sync_splice")?;
        let child = seq.clip_mut(self.child_track, self.child_index)?;
        let child_id = child.id;
        child.sync = prev;
        ctx.sync.sync_cleared(child_id);
        Ok(())
    }
}

// -------------------------------------------------------------------
// Resynchronization engine
// -------------------------------------------------------------------

fn build_and_run_moves<E: MediaEngine>(
    seq: &mut Sequence<E>,
    ctx: &mut EditContext<'_>,
    items: Vec<ResyncItem>,
) -> Result<Vec<OverwriteMove>> {
    let mut moves = Vec::new();
    for item in items {
        let clip = seq.clip(item.track, item.index)?;
        let recorded = clip
            .sync
            .as_ref()
            .ok_or(EditError::NoSyncData { clip: clip.id })?
            .pos_offset;
        // Already where it should be: nothing to generate.
        if item.pos_offset == recorded {
            continue;
        }
        let length = clip.length();
        let diff = item.pos_offset - recorded;
        let over_in = seq.track(item.track)?.clip_start(item.index) - diff;
        let over_out = over_in + length;
        debug!(clip = item.clip, track = item.track, diff, over_in, "resyncing clip");

        let mut mv = OverwriteMove::new(item.track, over_in, over_out, item.index, item.index);
        mv.forward(seq, ctx, true)?;
        moves.push(mv);
    }
    Ok(moves)
}

pub(crate) struct ResyncAll {
    moves: Vec<OverwriteMove>,
}

impl<E: MediaEngine> EditOp<E> for ResyncAll {
    fn name(&self) -> &'static str {
        "resync_all"
    }

    fn forward(
        &mut self,
        seq: &mut Sequence<E>,
        ctx: &mut EditContext<'_>,
        first: bool,
    ) -> Result<()> {
        if first {
            let items = ctx.sync.resync_data(seq.tracks());
            self.moves = build_and_run_moves(seq, ctx, items)?;
            info!(moves = self.moves.len(), "resync all applied");
            return Ok(());
        }
        for mv in self.moves.iter_mut() {
            mv.forward(seq, ctx, false)?;
        }
        Ok(())
    }

    fn backward(&mut self, seq: &mut Sequence<E>, ctx: &mut EditContext<'_>) -> Result<()> {
        for mv in self.moves.iter_mut().rev() {
            mv.backward(seq, ctx)?;
        }
        Ok(())
    }
}

pub(crate) struct ResyncClips {
    clips: Vec<ClipId>,
    moves: Vec<OverwriteMove>,
}

impl<E: MediaEngine> EditOp<E> for ResyncClips {
    fn name(&self) -> &'static str {
        "resync_clips"
    }

    fn forward(
        &mut self,
        seq: &mut Sequence<E>,
        ctx: &mut EditContext<'_>,
        first: bool,
    ) -> Result<()> {
        if first {
            let items = ctx.sync.resync_data_for_clips(&self.clips, seq.tracks());
            self.moves = build_and_run_moves(seq, ctx, items)?;
            info!(
                requested = self.clips.len(),
                moves = self.moves.len(),
                "resync clips applied"
            );
            return Ok(());
        }
        for mv in self.moves.iter_mut() {
            mv.forward(seq, ctx, false)?;
        }
        Ok(())
    }

    fn backward(&mut self, seq: &mut Sequence<E>, ctx: &mut EditContext<'_>) -> Result<()> {
        for mv in self.moves.iter_mut().rev() {
            mv.backward(seq, ctx)?;
        }
        Ok(())
    }
}

// -------------------------------------------------------------------
// Action factories
// -------------------------------------------------------------------

/// Binds the child clip to the parent clip, recording their current
/// position offset.
pub fn set_sync_action<E: MediaEngine>(
    child_track: usize,
    child_index: usize,
    parent_track: usize,
    parent_index: usize,
) -> EditAction<E> {
    EditAction::new(Box::new(SetSync {
        child_track,
        child_index,
        parent_track,
        parent_index,
        prev_sync: None,
    }))
}

/// Unbinds the child clip from its sync master.
pub fn clear_sync_action<E: MediaEngine>(child_track: usize, child_index: usize) -> EditAction<E> {
    EditAction::new(Box::new(ClearSync {
        child_track,
        child_index,
        saved: None,
    }))
}

/// Overwrites the range starting at `frame` with `clip`.
pub fn sync_overwrite_action<E: MediaEngine>(
    track: usize,
    frame: i64,
    clip: Clip,
    clip_in: i64,
    clip_out: i64,
) -> EditAction<E> {
    EditAction::new(Box::new(SyncOverwrite {
        track,
        frame,
        clip_in,
        clip_out,
        clip: Some(clip),
        splice: None,
    }))
}

/// Overwrites `[over_in, over_out)` on `to_track` with `audio_clip` at
/// the parent clip's bounds and mutes the parent.
pub fn audio_splice_action<E: MediaEngine>(
    to_track: usize,
    over_in: i64,
    over_out: i64,
    parent_track: usize,
    parent_index: usize,
    audio_clip: Clip,
) -> EditAction<E> {
    EditAction::new(Box::new(AudioSplice {
        to_track,
        over_in,
        over_out,
        parent_track,
        parent_index,
        audio_clip: Some(audio_clip),
        splice: None,
        trailing: Vec::new(),
    }))
}

/// Binds an already placed audio clip to the parent at offset zero and
/// mutes the parent's own audio.
pub fn audio_sync_splice_action<E: MediaEngine>(
    parent_track: usize,
    parent_index: usize,
    child_track: usize,
    child_index: usize,
) -> EditAction<E> {
    EditAction::new(Box::new(AudioSyncSplice {
        parent_track,
        parent_index,
        child_track,
        child_index,
        prev_sync: None,
    }))
}

/// Repositions every clip whose offset has drifted from its master.
pub fn resync_all_action<E: MediaEngine>() -> EditAction<E> {
    EditAction::new(Box::new(ResyncAll { moves: Vec::new() }))
}

/// Repositions the listed clips if their offsets have drifted.
pub fn resync_clips_action<E: MediaEngine>(clips: Vec<ClipId>) -> EditAction<E> {
    EditAction::new(Box::new(ResyncClips {
        clips,
        moves: Vec::new(),
    }))
}
