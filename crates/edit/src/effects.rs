//! Effect lifecycle catalog: filter attach/detach/clone, mute/unmute,
//! and compositor create/delete/move. Filter and compositor objects are
//! created once, on the first forward run, and reused on every replay so
//! their identities stay stable across undo/redo cycles.

use tracing::info;

use crate::action::{EditAction, EditContext, EditOp};
use crate::edits::taken;
use crate::engine::MediaEngine;
use crate::error::{EditError, Result};
use crate::segment::{ClipId, DestroyId, Filter, FilterInfo, FilterKind};
use crate::sequence::Sequence;

/// Invoked by the filter ops with the affected clip id and its filter
/// count after the change, so the effect-stack UI can refresh.
pub type FilterDoneFn = Box<dyn FnMut(ClipId, usize)>;

fn notify(done: &mut Option<FilterDoneFn>, clip: ClipId, count: usize) {
    if let Some(done) = done.as_mut() {
        done(clip, count);
    }
}

// -------------------------------------------------------------------
// Filters
// -------------------------------------------------------------------

pub(crate) struct AddFilter {
    track: usize,
    index: usize,
    info: FilterInfo,
    filter: Option<Filter>,
    done: Option<FilterDoneFn>,
}

impl<E: MediaEngine> EditOp<E> for AddFilter {
    fn name(&self) -> &'static str {
        "add_filter"
    }

    fn forward(
        &mut self,
        seq: &mut Sequence<E>,
        _ctx: &mut EditContext<'_>,
        first: bool,
    ) -> Result<()> {
        if first {
            self.filter = Some(seq.create_filter(self.info.clone()));
        }
        let filter = self
            .filter
            .clone()
            .ok_or(EditError::MissingUndoState { action: "add_filter" })?;
        seq.attach_filter(self.track, self.index, filter)?;
        let clip = seq.clip(self.track, self.index)?;
        notify(&mut self.done, clip.id, clip.filters.len());
        Ok(())
    }

    fn backward(&mut self, seq: &mut Sequence<E>, _ctx: &mut EditContext<'_>) -> Result<()> {
        let filter_id = self
            .filter
            .as_ref()
            .ok_or(EditError::MissingUndoState { action: "add_filter" })?
            .id;
        seq.detach_filter(self.track, self.index, filter_id)?;
        let clip = seq.clip(self.track, self.index)?;
        notify(&mut self.done, clip.id, clip.filters.len());
        Ok(())
    }
}

pub(crate) struct RemoveFilter {
    track: usize,
    index: usize,
    filter_index: usize,
    removed: Option<Filter>,
    done: Option<FilterDoneFn>,
}

impl<E: MediaEngine> EditOp<E> for RemoveFilter {
    fn name(&self) -> &'static str {
        "remove_filter"
    }

    fn forward(
        &mut self,
        seq: &mut Sequence<E>,
        _ctx: &mut EditContext<'_>,
        _first: bool,
    ) -> Result<()> {
        let clip = seq.clip(self.track, self.index)?;
        if self.filter_index >= clip.filters.len() {
            return Err(EditError::FilterIndexOutOfRange {
                clip: clip.id,
                index: self.filter_index,
                count: clip.filters.len(),
            });
        }
        let filter_id = clip.filters[self.filter_index].id;
        self.removed = Some(seq.detach_filter(self.track, self.index, filter_id)?);
        let clip = seq.clip(self.track, self.index)?;
        notify(&mut self.done, clip.id, clip.filters.len());
        Ok(())
    }

    fn backward(&mut self, seq: &mut Sequence<E>, _ctx: &mut EditContext<'_>) -> Result<()> {
        let filter = taken(&mut self.removed, "remove_filter")?;
        seq.detach_all_filters(self.track, self.index)?;
        let clip = seq.clip_mut(self.track, self.index)?;
        if self.filter_index > clip.filters.len() {
            return Err(EditError::FilterIndexOutOfRange {
                clip: clip.id,
                index: self.filter_index,
                count: clip.filters.len(),
            });
        }
        clip.filters.insert(self.filter_index, filter);
        seq.attach_all_filters(self.track, self.index)?;
        let clip = seq.clip(self.track, self.index)?;
        notify(&mut self.done, clip.id, clip.filters.len());
        Ok(())
    }
}

pub(crate) struct RemoveMultipleFilters {
    clips: Vec<(usize, usize)>,
    saved: Vec<Vec<Filter>>,
}

impl<E: MediaEngine> EditOp<E> for RemoveMultipleFilters {
    fn name(&self) -> &'static str {
        "remove_multiple_filters"
    }

    fn forward(
        &mut self,
        seq: &mut Sequence<E>,
        _ctx: &mut EditContext<'_>,
        _first: bool,
    ) -> Result<()> {
        self.saved.clear();
        for (track, index) in self.clips.iter().copied() {
            seq.detach_all_filters(track, index)?;
            let clip = seq.clip_mut(track, index)?;
            self.saved.push(std::mem::take(&mut clip.filters));
        }
        info!(clips = self.clips.len(), "filters cleared");
        Ok(())
    }

    fn backward(&mut self, seq: &mut Sequence<E>, _ctx: &mut EditContext<'_>) -> Result<()> {
        // The exact prior lists move back; no copies are minted.
        for ((track, index), filters) in self.clips.iter().copied().zip(self.saved.drain(..)) {
            let clip = seq.clip_mut(track, index)?;
            clip.filters = filters;
            seq.attach_all_filters(track, index)?;
        }
        Ok(())
    }
}

pub(crate) struct CloneFilters {
    track: usize,
    index: usize,
    source_track: usize,
    source_index: usize,
    clones: Option<Vec<Filter>>,
    old: Option<Vec<Filter>>,
}

impl<E: MediaEngine> EditOp<E> for CloneFilters {
    fn name(&self) -> &'static str {
        "clone_filters"
    }

    fn forward(
        &mut self,
        seq: &mut Sequence<E>,
        _ctx: &mut EditContext<'_>,
        first: bool,
    ) -> Result<()> {
        if first {
            self.clones = Some(seq.clone_filters(self.source_track, self.source_index)?);
        }
        let clones = self
            .clones
            .clone()
            .ok_or(EditError::MissingUndoState { action: "clone_filters" })?;
        seq.detach_all_filters(self.track, self.index)?;
        let clip = seq.clip_mut(self.track, self.index)?;
        self.old = Some(std::mem::replace(&mut clip.filters, clones));
        seq.attach_all_filters(self.track, self.index)
    }

    fn backward(&mut self, seq: &mut Sequence<E>, _ctx: &mut EditContext<'_>) -> Result<()> {
        let old = taken(&mut self.old, "clone_filters")?;
        seq.detach_all_filters(self.track, self.index)?;
        let clip = seq.clip_mut(self.track, self.index)?;
        clip.filters = old;
        seq.attach_all_filters(self.track, self.index)
    }
}

// -------------------------------------------------------------------
// Mute / unmute
// -------------------------------------------------------------------

pub(crate) struct MuteClip {
    track: usize,
    index: usize,
}

impl<E: MediaEngine> EditOp<E> for MuteClip {
    fn name(&self) -> &'static str {
        "mute_clip"
    }

    fn forward(
        &mut self,
        seq: &mut Sequence<E>,
        _ctx: &mut EditContext<'_>,
        _first: bool,
    ) -> Result<()> {
        let filter = seq.create_mute_filter();
        seq.mute_clip(self.track, self.index, filter)
    }

    fn backward(&mut self, seq: &mut Sequence<E>, _ctx: &mut EditContext<'_>) -> Result<()> {
        seq.unmute_clip(self.track, self.index)?;
        Ok(())
    }
}

pub(crate) struct UnmuteClip {
    track: usize,
    index: usize,
}

impl<E: MediaEngine> EditOp<E> for UnmuteClip {
    fn name(&self) -> &'static str {
        "unmute_clip"
    }

    fn forward(
        &mut self,
        seq: &mut Sequence<E>,
        _ctx: &mut EditContext<'_>,
        _first: bool,
    ) -> Result<()> {
        seq.unmute_clip(self.track, self.index)?;
        Ok(())
    }

    fn backward(&mut self, seq: &mut Sequence<E>, _ctx: &mut EditContext<'_>) -> Result<()> {
        // A stale mute filter must not come back; an equivalent fresh one
        // goes in instead.
        let filter = seq.create_mute_filter();
        seq.mute_clip(self.track, self.index, filter)
    }
}

// -------------------------------------------------------------------
// Compositors
// -------------------------------------------------------------------

pub(crate) struct AddCompositor {
    kind_index: usize,
    in_frame: i64,
    out_frame: i64,
    a_track: usize,
    b_track: usize,
    origin_clip_id: ClipId,
    destroy_id: Option<DestroyId>,
}

impl<E: MediaEngine> EditOp<E> for AddCompositor {
    fn name(&self) -> &'static str {
        "add_compositor"
    }

    fn forward(
        &mut self,
        seq: &mut Sequence<E>,
        _ctx: &mut EditContext<'_>,
        first: bool,
    ) -> Result<()> {
        let mut compositor = seq.create_compositor(self.kind_index);
        compositor.a_track = self.a_track;
        compositor.b_track = self.b_track;
        compositor.set_in_and_out(self.in_frame, self.out_frame);
        compositor.origin_clip_id = self.origin_clip_id;

        // The engine rebuilds compositors on every restack, so the stable
        // id captured here is the only usable handle on replays.
        if first {
            self.destroy_id = Some(compositor.destroy_id);
        } else {
            compositor.destroy_id = self
                .destroy_id
                .ok_or(EditError::MissingUndoState { action: "add_compositor" })?;
        }

        info!(destroy_id = compositor.destroy_id, "compositor created");
        seq.add_compositor(compositor);
        seq.restack_compositors();
        Ok(())
    }

    fn backward(&mut self, seq: &mut Sequence<E>, _ctx: &mut EditContext<'_>) -> Result<()> {
        let destroy_id = self
            .destroy_id
            .ok_or(EditError::MissingUndoState { action: "add_compositor" })?;
        let compositor = seq.remove_compositor(destroy_id)?;
        seq.restack_compositors();
        seq.retire_compositor(compositor);
        Ok(())
    }
}

pub(crate) struct DeleteCompositor {
    destroy_id: DestroyId,
    /// Snapshot taken when the compositor leaves the sequence; the
    /// retired registry only delays destruction for the engine and may
    /// reclaim entries while this action still sits on the history stack.
    snapshot: Option<crate::compositor::Compositor>,
}

impl<E: MediaEngine> EditOp<E> for DeleteCompositor {
    fn name(&self) -> &'static str {
        "delete_compositor"
    }

    fn forward(
        &mut self,
        seq: &mut Sequence<E>,
        _ctx: &mut EditContext<'_>,
        _first: bool,
    ) -> Result<()> {
        let compositor = seq.remove_compositor(self.destroy_id)?;
        seq.restack_compositors();
        info!(destroy_id = self.destroy_id, "compositor deleted");
        self.snapshot = Some(compositor.clone());
        seq.retire_compositor(compositor);
        Ok(())
    }

    fn backward(&mut self, seq: &mut Sequence<E>, _ctx: &mut EditContext<'_>) -> Result<()> {
        let snapshot = self
            .snapshot
            .clone()
            .ok_or(EditError::MissingUndoState { action: "delete_compositor" })?;
        let mut compositor = seq.create_compositor(snapshot.kind_index);
        snapshot.clone_properties(&mut compositor);
        seq.add_compositor(compositor);
        seq.restack_compositors();
        Ok(())
    }
}

pub(crate) struct MoveCompositor {
    destroy_id: DestroyId,
    in_frame: i64,
    out_frame: i64,
    orig: Option<(i64, i64)>,
}

impl<E: MediaEngine> EditOp<E> for MoveCompositor {
    fn name(&self) -> &'static str {
        "move_compositor"
    }

    fn forward(
        &mut self,
        seq: &mut Sequence<E>,
        _ctx: &mut EditContext<'_>,
        first: bool,
    ) -> Result<()> {
        if first {
            let compositor = seq.compositor(self.destroy_id)?;
            self.orig = Some((compositor.in_frame, compositor.out_frame));
        }
        let compositor = seq.compositor_mut(self.destroy_id)?;
        compositor.set_in_and_out(self.in_frame, self.out_frame);
        Ok(())
    }

    fn backward(&mut self, seq: &mut Sequence<E>, _ctx: &mut EditContext<'_>) -> Result<()> {
        let (in_frame, out_frame) = self
            .orig
            .ok_or(EditError::MissingUndoState { action: "move_compositor" })?;
        let compositor = seq.compositor_mut(self.destroy_id)?;
        compositor.set_in_and_out(in_frame, out_frame);
        Ok(())
    }
}

// -------------------------------------------------------------------
// Action factories
// -------------------------------------------------------------------

/// Attaches a new filter built from `info` to the clip at
/// `(track, index)`. The filter object is created on first run and
/// reused across replays.
pub fn add_filter_action<E: MediaEngine>(
    track: usize,
    index: usize,
    info: FilterInfo,
    done: Option<FilterDoneFn>,
) -> EditAction<E> {
    EditAction::new(Box::new(AddFilter {
        track,
        index,
        info,
        filter: None,
        done,
    }))
}

/// Multipart variant: the filter presents as several engine-side
/// attachments that move together.
pub fn add_multipart_filter_action<E: MediaEngine>(
    track: usize,
    index: usize,
    name: impl Into<String>,
    done: Option<FilterDoneFn>,
) -> EditAction<E> {
    EditAction::new(Box::new(AddFilter {
        track,
        index,
        info: FilterInfo {
            name: name.into(),
            kind: FilterKind::Multipart,
        },
        filter: None,
        done,
    }))
}

/// Detaches the filter at `filter_index` on the clip's filter stack.
pub fn remove_filter_action<E: MediaEngine>(
    track: usize,
    index: usize,
    filter_index: usize,
    done: Option<FilterDoneFn>,
) -> EditAction<E> {
    EditAction::new(Box::new(RemoveFilter {
        track,
        index,
        filter_index,
        removed: None,
        done,
    }))
}

/// Clears the whole filter stack of every listed `(track, index)` clip;
/// undo restores the exact prior lists.
pub fn remove_multiple_filters_action<E: MediaEngine>(
    clips: Vec<(usize, usize)>,
) -> EditAction<E> {
    EditAction::new(Box::new(RemoveMultipleFilters {
        clips,
        saved: Vec::new(),
    }))
}

/// Replaces the target clip's filter stack with clones of the source
/// clip's stack.
pub fn clone_filters_action<E: MediaEngine>(
    track: usize,
    index: usize,
    source_track: usize,
    source_index: usize,
) -> EditAction<E> {
    EditAction::new(Box::new(CloneFilters {
        track,
        index,
        source_track,
        source_index,
        clones: None,
        old: None,
    }))
}

/// Attaches a zero-gain volume filter.
pub fn mute_clip_action<E: MediaEngine>(track: usize, index: usize) -> EditAction<E> {
    EditAction::new(Box::new(MuteClip { track, index }))
}

/// Detaches the mute filter; undo installs a fresh equivalent one.
pub fn unmute_clip_action<E: MediaEngine>(track: usize, index: usize) -> EditAction<E> {
    EditAction::new(Box::new(UnmuteClip { track, index }))
}

/// Creates a compositor between `a_track` and `b_track` over
/// `[in_frame, out_frame]`.
pub fn add_compositor_action<E: MediaEngine>(
    kind_index: usize,
    in_frame: i64,
    out_frame: i64,
    a_track: usize,
    b_track: usize,
    origin_clip_id: ClipId,
) -> EditAction<E> {
    EditAction::new(Box::new(AddCompositor {
        kind_index,
        in_frame,
        out_frame,
        a_track,
        b_track,
        origin_clip_id,
        destroy_id: None,
    }))
}

/// Deletes the compositor with the given stable id. The deleted entity
/// is retired, not dropped, until the engine confirms release.
pub fn delete_compositor_action<E: MediaEngine>(destroy_id: DestroyId) -> EditAction<E> {
    EditAction::new(Box::new(DeleteCompositor {
        destroy_id,
        snapshot: None,
    }))
}

/// Moves a compositor to a new frame range.
pub fn move_compositor_action<E: MediaEngine>(
    destroy_id: DestroyId,
    in_frame: i64,
    out_frame: i64,
) -> EditAction<E> {
    EditAction::new(Box::new(MoveCompositor {
        destroy_id,
        in_frame,
        out_frame,
        orig: None,
    }))
}
