use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::action::EditContext;
use crate::compositor::{Compositor, RetiredCompositors};
use crate::engine::{MediaEngine, MirrorSegment};
use crate::error::{EditError, Result};
use crate::segment::{Blank, Clip, ClipId, DestroyId, Filter, FilterInfo, Segment, SourceRef, SyncState};
use crate::track::{Track, TrackKind};

/// Result of cutting a track at a frame.
///
/// Cutting exactly on an existing segment boundary is a defined no-op,
/// reported distinctly because undo must know whether a split pair needs
/// to be reconstructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutOutcome {
    /// The frame was already a boundary; nothing changed.
    OnBoundary,
    /// A segment was split; these are its bounds before the split.
    Cut { prev_in: i64, prev_out: i64 },
}

/// The timeline: per-track segment sequences plus their engine mirror.
///
/// All structural mutation goes through the atomic operations defined
/// here; they update the editor-side segment lists and the media engine's
/// native structures in lock-step, which is the invariant everything else
/// (undo, redo, resync) leans on.
#[derive(Debug)]
pub struct Sequence<E> {
    tracks: Vec<Track>,
    engine: E,
    compositors: Vec<Compositor>,
    retired: RetiredCompositors,
    next_clip_id: u64,
    next_filter_id: u64,
    next_destroy_id: u64,
}

impl<E> Sequence<E>
where
    E: MediaEngine,
{
    /// Creates a sequence over `engine`, which must already know about
    /// the same number of tracks.
    pub fn new(engine: E, kinds: Vec<TrackKind>) -> Self {
        Self {
            tracks: kinds.into_iter().map(Track::new).collect(),
            engine,
            compositors: Vec::new(),
            retired: RetiredCompositors::default(),
            next_clip_id: 1,
            next_filter_id: 1,
            next_destroy_id: 1,
        }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track(&self, track: usize) -> Result<&Track> {
        self.tracks
            .get(track)
            .ok_or(EditError::UnknownTrack { track })
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn clip(&self, track: usize, index: usize) -> Result<&Clip> {
        let segment = self.segment(track, index)?;
        segment
            .as_clip()
            .ok_or(EditError::NotAClip { track, index })
    }

    pub fn segment(&self, track: usize, index: usize) -> Result<&Segment> {
        let t = self.track(track)?;
        t.segment(index).ok_or(EditError::SegmentIndexOutOfRange {
            track,
            index,
            count: t.count(),
        })
    }

    /// Mints a clip for insertion; bounds are set by the insert.
    pub fn create_clip(&mut self, source: SourceRef, name: impl Into<String>) -> Clip {
        Clip {
            id: self.allocate_clip_id(),
            source,
            name: name.into(),
            clip_in: 0,
            clip_out: 0,
            filters: Vec::new(),
            mute_filter: None,
            sync: None,
        }
    }

    /// Fresh producer over the same source. Filters, mute state and sync
    /// data do not travel with the clone.
    pub(crate) fn clone_clip(&mut self, clip: &Clip) -> Clip {
        Clip {
            id: self.allocate_clip_id(),
            source: clip.source.clone(),
            name: clip.name.clone(),
            clip_in: clip.clip_in,
            clip_out: clip.clip_out,
            filters: Vec::new(),
            mute_filter: None,
            sync: None,
        }
    }

    pub fn create_filter(&mut self, info: FilterInfo) -> Filter {
        Filter {
            id: self.allocate_filter_id(),
            info,
        }
    }

    /// Zero-gain volume filter used by mute/unmute and the audio splice.
    pub(crate) fn create_mute_filter(&mut self) -> Filter {
        self.create_filter(FilterInfo::single("volume=0"))
    }

    /// True when the editor-side track and the engine mirror agree slot
    /// for slot. Divergence means an atomic was only half-applied, which
    /// is fatal; debug builds assert this after every atomic.
    pub fn mirror_consistent(&self, track: usize) -> bool {
        let Some(t) = self.tracks.get(track) else {
            return false;
        };
        if self.engine.count(track) != t.count() {
            return false;
        }
        t.segments().iter().enumerate().all(|(index, segment)| {
            match (segment, self.engine.segment(track, index)) {
                (
                    Segment::Clip(clip),
                    Some(MirrorSegment::Clip {
                        id,
                        clip_in,
                        clip_out,
                    }),
                ) => clip.id == id && clip.clip_in == clip_in && clip.clip_out == clip_out,
                (Segment::Blank(blank), Some(MirrorSegment::Blank { length })) => {
                    blank.length == length
                }
                _ => false,
            }
        })
    }

    // ---------------------------------------------------------------
    // Atomic operations. The only legal mutators of a track; each one
    // validates before touching anything, then updates both
    // representations together.
    // ---------------------------------------------------------------

    pub(crate) fn append_clip(
        &mut self,
        ctx: &mut EditContext<'_>,
        track: usize,
        mut clip: Clip,
        clip_in: i64,
        clip_out: i64,
    ) -> Result<()> {
        self.track(track)?;
        check_bounds(clip_in, clip_out)?;

        clip.clip_in = clip_in;
        clip.clip_out = clip_out;
        self.engine.append(track, &clip, clip_in, clip_out);
        ctx.sync.clip_added(&clip, track);
        debug!(track, clip_id = clip.id, clip_in, clip_out, "clip appended");
        self.tracks[track].clips.push(Segment::Clip(clip));
        debug_assert!(self.mirror_consistent(track));
        Ok(())
    }

    pub(crate) fn insert_clip(
        &mut self,
        ctx: &mut EditContext<'_>,
        track: usize,
        index: usize,
        mut clip: Clip,
        clip_in: i64,
        clip_out: i64,
    ) -> Result<()> {
        let count = self.track(track)?.count();
        if index > count {
            return Err(EditError::SegmentIndexOutOfRange {
                track,
                index,
                count,
            });
        }
        check_bounds(clip_in, clip_out)?;

        clip.clip_in = clip_in;
        clip.clip_out = clip_out;
        self.engine.insert(track, &clip, index, clip_in, clip_out);
        ctx.sync.clip_added(&clip, track);
        debug!(track, index, clip_id = clip.id, clip_in, clip_out, "clip inserted");
        self.tracks[track].clips.insert(index, Segment::Clip(clip));
        debug_assert!(self.mirror_consistent(track));
        Ok(())
    }

    pub(crate) fn insert_blank(&mut self, track: usize, index: usize, length: i64) -> Result<()> {
        let count = self.track(track)?.count();
        if index > count {
            return Err(EditError::SegmentIndexOutOfRange {
                track,
                index,
                count,
            });
        }
        check_bounds(0, length - 1)?;

        self.engine.insert_blank(track, index, length);
        debug!(track, index, length, "blank inserted");
        self.tracks[track]
            .clips
            .insert(index, Segment::Blank(Blank { length }));
        debug_assert!(self.mirror_consistent(track));
        Ok(())
    }

    pub(crate) fn remove_segment(
        &mut self,
        ctx: &mut EditContext<'_>,
        track: usize,
        index: usize,
    ) -> Result<Segment> {
        let count = self.track(track)?.count();
        if index >= count {
            return Err(EditError::SegmentIndexOutOfRange {
                track,
                index,
                count,
            });
        }

        self.engine.remove(track, index);
        let segment = self.tracks[track].clips.remove(index);
        if let Segment::Clip(clip) = &segment {
            ctx.sync.clip_removed(clip);
            debug!(track, index, clip_id = clip.id, "clip removed");
        } else {
            debug!(track, index, length = segment.length(), "blank removed");
        }
        debug_assert!(self.mirror_consistent(track));
        Ok(segment)
    }

    /// Resizes a clip in place, in both representations. Blanks are never
    /// resized; a differently sized blank is a fresh insert.
    pub(crate) fn set_clip_in_out(
        &mut self,
        track: usize,
        index: usize,
        clip_in: i64,
        clip_out: i64,
    ) -> Result<()> {
        check_bounds(clip_in, clip_out)?;
        let segment = self.segment(track, index)?;
        if segment.is_blank() {
            return Err(EditError::NotAClip { track, index });
        }

        self.engine.set_in_and_out(track, index, clip_in, clip_out);
        let Some(clip) = self.tracks[track].clips[index].as_clip_mut() else {
            unreachable!("blank ruled out above");
        };
        clip.clip_in = clip_in;
        clip.clip_out = clip_out;
        debug_assert!(self.mirror_consistent(track));
        Ok(())
    }

    /// Re-inserts a previously removed segment with the bounds it carries.
    pub(crate) fn insert_segment(
        &mut self,
        ctx: &mut EditContext<'_>,
        track: usize,
        index: usize,
        segment: Segment,
    ) -> Result<()> {
        match segment {
            Segment::Clip(clip) => {
                let (clip_in, clip_out) = (clip.clip_in, clip.clip_out);
                self.insert_clip(ctx, track, index, clip, clip_in, clip_out)
            }
            Segment::Blank(blank) => self.insert_blank(track, index, blank.length),
        }
    }

    /// Splits the clip at `index` in two at source frame `cut_frame`:
    /// the original truncated to `[clip_in, cut_frame - 1]`, then `clone`
    /// covering `[cut_frame, clip_out]`.
    pub(crate) fn cut_clip(
        &mut self,
        ctx: &mut EditContext<'_>,
        track: usize,
        index: usize,
        cut_frame: i64,
        clone: Clip,
    ) -> Result<()> {
        let clip = self.clip(track, index)?;
        let (prev_in, prev_out) = (clip.clip_in, clip.clip_out);
        if clip.frame_on_cut(cut_frame) || cut_frame < prev_in || cut_frame > prev_out {
            return Err(EditError::CutOutsideSegment {
                frame: cut_frame,
                clip_in: prev_in,
                clip_out: prev_out,
            });
        }

        let Segment::Clip(original) = self.remove_segment(ctx, track, index)? else {
            unreachable!("checked above");
        };
        self.insert_clip(ctx, track, index, original, prev_in, cut_frame - 1)?;
        self.insert_clip(ctx, track, index + 1, clone, cut_frame, prev_out)?;
        Ok(())
    }

    /// Splits the blank at `index` at blank-local frame `cut_frame` into
    /// two fresh zero-origin blanks.
    pub(crate) fn cut_blank(
        &mut self,
        ctx: &mut EditContext<'_>,
        track: usize,
        index: usize,
        cut_frame: i64,
    ) -> Result<()> {
        let segment = self.segment(track, index)?;
        let Segment::Blank(blank) = segment else {
            return Err(EditError::NotABlank { track, index });
        };
        let length = blank.length;
        if cut_frame <= 0 || cut_frame >= length {
            return Err(EditError::CutOutsideSegment {
                frame: cut_frame,
                clip_in: 0,
                clip_out: length - 1,
            });
        }

        self.remove_segment(ctx, track, index)?;
        self.insert_blank(track, index, cut_frame)?;
        self.insert_blank(track, index + 1, length - cut_frame)?;
        Ok(())
    }

    /// Cuts the track at a timeline frame unless the frame is already a
    /// boundary. On a real cut the pre-split bounds come back so the
    /// caller can reconstruct the pair on undo.
    pub(crate) fn cut_track_at_frame(
        &mut self,
        ctx: &mut EditContext<'_>,
        track: usize,
        frame: i64,
    ) -> Result<CutOutcome> {
        let t = self.track(track)?;
        if t.frame_on_boundary(frame) {
            debug!(track, frame, "cut skipped: frame on boundary");
            return Ok(CutOutcome::OnBoundary);
        }
        let Some(index) = t.clip_index_at(frame) else {
            return Err(EditError::FrameOutOfRange {
                track,
                frame,
                length: t.length(),
            });
        };
        let start = t.clip_start(index);
        let segment = &t.segments()[index];
        let (prev_in, prev_out) = (segment.clip_in(), segment.clip_out());
        let clip_frame = frame - start + prev_in;

        if let Some(original) = segment.as_clip() {
            let original = original.clone();
            let clone = self.clone_clip(&original);
            self.cut_clip(ctx, track, index, clip_frame, clone)?;
        } else {
            self.cut_blank(ctx, track, index, clip_frame)?;
        }
        debug!(track, frame, index, prev_in, prev_out, "track cut");
        Ok(CutOutcome::Cut { prev_in, prev_out })
    }

    /// Removes blanks off the track end, returning their lengths in
    /// removal order (last segment first). Empty vec when the track is
    /// empty or does not end with a blank.
    pub(crate) fn remove_trailing_blanks(
        &mut self,
        ctx: &mut EditContext<'_>,
        track: usize,
    ) -> Result<Vec<i64>> {
        self.track(track)?;
        let mut lengths = Vec::new();
        while let Some(last) = self.tracks[track].clips.last() {
            if !last.is_blank() {
                break;
            }
            lengths.push(last.length());
            let index = self.tracks[track].count() - 1;
            self.remove_segment(ctx, track, index)?;
        }
        Ok(lengths)
    }

    /// Re-appends blanks removed by [`Self::remove_trailing_blanks`],
    /// taking the lengths in the order that call returned them.
    pub(crate) fn restore_trailing_blanks(&mut self, track: usize, lengths: &[i64]) -> Result<()> {
        for length in lengths.iter().rev() {
            let index = self.track(track)?.count();
            self.insert_blank(track, index, *length)?;
        }
        Ok(())
    }

    /// Removes every blank from `index` forward while segments remain
    /// blank, returning their lengths in removal order. Stops at the
    /// track end; empty vec when `index` does not name a blank.
    pub(crate) fn remove_consecutive_blanks(
        &mut self,
        ctx: &mut EditContext<'_>,
        track: usize,
        index: usize,
    ) -> Result<Vec<i64>> {
        self.track(track)?;
        let mut lengths = Vec::new();
        while index < self.tracks[track].count() && self.tracks[track].clips[index].is_blank() {
            lengths.push(self.tracks[track].clips[index].length());
            self.remove_segment(ctx, track, index)?;
        }
        Ok(lengths)
    }

    // ---------------------------------------------------------------
    // Filter attachment. Clip filter lists and the engine's attachment
    // bookkeeping always change together.
    // ---------------------------------------------------------------

    pub(crate) fn attach_filter(&mut self, track: usize, index: usize, filter: Filter) -> Result<()> {
        let clip = self.clip_mut(track, index)?;
        let clip_id = clip.id;
        let filter_id = filter.id;
        clip.filters.push(filter);
        self.engine.attach_filter(clip_id, filter_id);
        debug!(clip_id, filter_id, "filter attached");
        Ok(())
    }

    pub(crate) fn detach_filter(
        &mut self,
        track: usize,
        index: usize,
        filter_id: u64,
    ) -> Result<Filter> {
        let clip = self.clip_mut(track, index)?;
        let clip_id = clip.id;
        let position = clip
            .filters
            .iter()
            .position(|filter| filter.id == filter_id)
            .ok_or(EditError::FilterNotFound {
                clip: clip_id,
                filter: filter_id,
            })?;
        let filter = clip.filters.remove(position);
        self.engine.detach_filter(clip_id, filter_id);
        debug!(clip_id, filter_id, "filter detached");
        Ok(filter)
    }

    /// Engine-side detach of every filter on the clip; the clip's own
    /// filter list is left alone so callers can rearrange it and
    /// re-attach.
    pub(crate) fn detach_all_filters(&mut self, track: usize, index: usize) -> Result<()> {
        let clip = self.clip(track, index)?;
        let clip_id = clip.id;
        let filter_ids: Vec<u64> = clip.filters.iter().map(|filter| filter.id).collect();
        for filter_id in filter_ids {
            self.engine.detach_filter(clip_id, filter_id);
        }
        Ok(())
    }

    pub(crate) fn attach_all_filters(&mut self, track: usize, index: usize) -> Result<()> {
        let clip = self.clip(track, index)?;
        let clip_id = clip.id;
        let filter_ids: Vec<u64> = clip.filters.iter().map(|filter| filter.id).collect();
        for filter_id in filter_ids {
            self.engine.attach_filter(clip_id, filter_id);
        }
        Ok(())
    }

    /// Fresh filter instances carrying the source clip's filter setup.
    pub(crate) fn clone_filters(&mut self, track: usize, index: usize) -> Result<Vec<Filter>> {
        let infos: Vec<FilterInfo> = self
            .clip(track, index)?
            .filters
            .iter()
            .map(|filter| filter.info.clone())
            .collect();
        Ok(infos.into_iter().map(|info| self.create_filter(info)).collect())
    }

    pub(crate) fn mute_clip(&mut self, track: usize, index: usize, filter: Filter) -> Result<()> {
        let clip = self.clip_mut(track, index)?;
        let clip_id = clip.id;
        let filter_id = filter.id;
        clip.mute_filter = Some(filter);
        self.engine.attach_filter(clip_id, filter_id);
        debug!(clip_id, "clip muted");
        Ok(())
    }

    pub(crate) fn unmute_clip(&mut self, track: usize, index: usize) -> Result<Filter> {
        let clip = self.clip_mut(track, index)?;
        let clip_id = clip.id;
        let filter = clip
            .mute_filter
            .take()
            .ok_or(EditError::NoMuteFilter { clip: clip_id })?;
        self.engine.detach_filter(clip_id, filter.id);
        debug!(clip_id, "clip unmuted");
        Ok(filter)
    }

    pub(crate) fn clip_mut(&mut self, track: usize, index: usize) -> Result<&mut Clip> {
        let count = self.track(track)?.count();
        if index >= count {
            return Err(EditError::SegmentIndexOutOfRange {
                track,
                index,
                count,
            });
        }
        self.tracks[track].clips[index]
            .as_clip_mut()
            .ok_or(EditError::NotAClip { track, index })
    }

    /// Applies sync-state tags computed by the synchronization
    /// collaborator after an edit.
    pub fn apply_sync_states(&mut self, states: &[(ClipId, SyncState)]) {
        for track in &mut self.tracks {
            for segment in &mut track.clips {
                if let Segment::Clip(clip) = segment {
                    if let Some(sync) = clip.sync.as_mut() {
                        if let Some((_, state)) =
                            states.iter().find(|(id, _)| *id == clip.id)
                        {
                            sync.state = *state;
                        }
                    }
                }
            }
        }
    }

    // ---------------------------------------------------------------
    // Compositor lifecycle.
    // ---------------------------------------------------------------

    /// Mints a compositor with a fresh stable id. Frame range and tracks
    /// are filled in by the caller before [`Self::add_compositor`].
    pub fn create_compositor(&mut self, kind_index: usize) -> Compositor {
        Compositor {
            destroy_id: self.allocate_destroy_id(),
            kind_index,
            in_frame: 0,
            out_frame: 0,
            a_track: 0,
            b_track: 0,
            origin_clip_id: 0,
        }
    }

    pub fn add_compositor(&mut self, compositor: Compositor) {
        self.engine.compositor_added(compositor.destroy_id);
        debug!(destroy_id = compositor.destroy_id, "compositor added");
        self.compositors.push(compositor);
    }

    pub fn remove_compositor(&mut self, destroy_id: DestroyId) -> Result<Compositor> {
        let position = self
            .compositors
            .iter()
            .position(|compositor| compositor.destroy_id == destroy_id)
            .ok_or(EditError::CompositorNotFound { destroy_id })?;
        self.engine.compositor_removed(destroy_id);
        debug!(destroy_id, "compositor removed");
        Ok(self.compositors.remove(position))
    }

    pub fn compositor(&self, destroy_id: DestroyId) -> Result<&Compositor> {
        self.compositors
            .iter()
            .find(|compositor| compositor.destroy_id == destroy_id)
            .ok_or(EditError::CompositorNotFound { destroy_id })
    }

    pub fn compositor_mut(&mut self, destroy_id: DestroyId) -> Result<&mut Compositor> {
        self.compositors
            .iter_mut()
            .find(|compositor| compositor.destroy_id == destroy_id)
            .ok_or(EditError::CompositorNotFound { destroy_id })
    }

    pub fn compositors(&self) -> &[Compositor] {
        &self.compositors
    }

    /// Recomputes compositor stacking order and rebuilds the engine-side
    /// stack. Engine-side objects do not survive this; anything holding
    /// one must re-resolve through `destroy_id` afterwards.
    pub fn restack_compositors(&mut self) {
        self.compositors
            .sort_by_key(|compositor| (compositor.b_track, compositor.in_frame, compositor.destroy_id));
        let order: Vec<DestroyId> = self
            .compositors
            .iter()
            .map(|compositor| compositor.destroy_id)
            .collect();
        self.engine.restack_compositors(&order);
    }

    /// Parks a removed compositor in the retired registry; the engine may
    /// still be referencing it.
    pub fn retire_compositor(&mut self, compositor: Compositor) {
        self.retired.retire(compositor);
    }

    pub fn retired_compositors(&self) -> &RetiredCompositors {
        &self.retired
    }

    /// Frees retired compositors the engine no longer references.
    pub fn reclaim_retired(&mut self) -> usize {
        let engine = &self.engine;
        self.retired
            .reclaim(|destroy_id| engine.compositor_in_use(destroy_id))
    }

    // ---------------------------------------------------------------

    pub fn snapshot(&self) -> SequenceSnapshot {
        SequenceSnapshot {
            tracks: self
                .tracks
                .iter()
                .map(|track| TrackSnapshot {
                    kind: track.kind,
                    length: track.length(),
                    segments: track
                        .segments()
                        .iter()
                        .map(|segment| match segment {
                            Segment::Clip(clip) => SegmentSnapshot {
                                clip_id: Some(clip.id),
                                name: Some(clip.name.clone()),
                                clip_in: clip.clip_in,
                                clip_out: clip.clip_out,
                                length: clip.length(),
                                filters: clip.filters.len(),
                                muted: clip.mute_filter.is_some(),
                            },
                            Segment::Blank(blank) => SegmentSnapshot {
                                clip_id: None,
                                name: None,
                                clip_in: 0,
                                clip_out: blank.length - 1,
                                length: blank.length,
                                filters: 0,
                                muted: false,
                            },
                        })
                        .collect(),
                })
                .collect(),
            compositors: self
                .compositors
                .iter()
                .map(|compositor| CompositorSnapshot {
                    destroy_id: compositor.destroy_id,
                    in_frame: compositor.in_frame,
                    out_frame: compositor.out_frame,
                    a_track: compositor.a_track,
                    b_track: compositor.b_track,
                })
                .collect(),
        }
    }

    fn allocate_clip_id(&mut self) -> ClipId {
        let id = self.next_clip_id;
        self.next_clip_id += 1;
        id
    }

    fn allocate_filter_id(&mut self) -> u64 {
        let id = self.next_filter_id;
        self.next_filter_id += 1;
        id
    }

    fn allocate_destroy_id(&mut self) -> DestroyId {
        let id = self.next_destroy_id;
        self.next_destroy_id += 1;
        id
    }
}

fn check_bounds(clip_in: i64, clip_out: i64) -> Result<()> {
    if clip_out < clip_in {
        return Err(EditError::NegativeClipLength { clip_in, clip_out });
    }
    Ok(())
}

/// Immutable view of the sequence consumed by the GUI and the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceSnapshot {
    pub tracks: Vec<TrackSnapshot>,
    pub compositors: Vec<CompositorSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackSnapshot {
    pub kind: TrackKind,
    pub length: i64,
    pub segments: Vec<SegmentSnapshot>,
}

/// Snapshot of one segment; `clip_id` is `None` for blanks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentSnapshot {
    pub clip_id: Option<ClipId>,
    pub name: Option<String>,
    pub clip_in: i64,
    pub clip_out: i64,
    pub length: i64,
    pub filters: usize,
    pub muted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositorSnapshot {
    pub destroy_id: DestroyId,
    pub in_frame: i64,
    pub out_frame: i64,
    pub a_track: usize,
    pub b_track: usize,
}

#[cfg(test)]
mod tests {
    use super::{CutOutcome, Sequence};
    use crate::action::{EditContext, GuiUpdates, NoSync, NullFrontend};
    use crate::cache::WaveformCache;
    use crate::engine::{InMemoryEngine, MediaEngine};
    use crate::segment::{Segment, SourceRef};
    use crate::track::TrackKind;

    fn sequence() -> Sequence<InMemoryEngine> {
        Sequence::new(InMemoryEngine::new(2), vec![TrackKind::Video, TrackKind::Audio])
    }

    fn with_ctx<R>(f: impl FnOnce(&mut EditContext<'_>) -> R) -> R {
        let mut frontend = NullFrontend;
        let mut sync = NoSync;
        let mut waveforms = WaveformCache::new(16);
        let mut ctx = EditContext {
            frontend: &mut frontend,
            sync: &mut sync,
            waveforms: &mut waveforms,
            gui: GuiUpdates::Suppressed,
        };
        f(&mut ctx)
    }

    fn seed_clips(seq: &mut Sequence<InMemoryEngine>, ctx: &mut EditContext<'_>, lengths: &[i64]) {
        for (i, length) in lengths.iter().enumerate() {
            let clip = seq.create_clip(SourceRef::Media("a.mp4".into()), format!("c{i}"));
            seq.append_clip(ctx, 0, clip, 0, length - 1)
                .expect("append");
        }
    }

    #[test]
    fn insert_and_remove_mutate_both_representations() {
        let mut seq = sequence();
        with_ctx(|ctx| {
            seed_clips(&mut seq, ctx, &[10, 20]);
            seq.insert_blank(0, 1, 5).expect("insert blank");
            assert!(seq.mirror_consistent(0));
            assert_eq!(seq.tracks()[0].length(), 35);
            assert_eq!(seq.engine().length(0), 35);

            let removed = seq.remove_segment(ctx, 0, 1).expect("remove");
            assert!(removed.is_blank());
            assert!(seq.mirror_consistent(0));
            assert_eq!(seq.tracks()[0].count(), 2);
        });
    }

    #[test]
    fn cut_track_at_frame_splits_the_covering_clip() {
        let mut seq = sequence();
        with_ctx(|ctx| {
            seed_clips(&mut seq, ctx, &[10, 20, 15]);

            let outcome = seq.cut_track_at_frame(ctx, 0, 15).expect("cut");
            assert_eq!(
                outcome,
                CutOutcome::Cut {
                    prev_in: 0,
                    prev_out: 19
                }
            );

            let lengths: Vec<i64> = seq.tracks()[0].segments().iter().map(Segment::length).collect();
            assert_eq!(lengths, vec![10, 5, 15, 15]);
            assert_eq!(seq.tracks()[0].length(), 45);
            assert!(seq.mirror_consistent(0));
        });
    }

    #[test]
    fn cut_on_existing_boundary_is_a_no_op() {
        let mut seq = sequence();
        with_ctx(|ctx| {
            seed_clips(&mut seq, ctx, &[10, 20]);

            let outcome = seq.cut_track_at_frame(ctx, 0, 10).expect("cut");
            assert_eq!(outcome, CutOutcome::OnBoundary);
            assert_eq!(seq.tracks()[0].count(), 2);
        });
    }

    #[test]
    fn cut_inside_blank_produces_two_fresh_blanks() {
        let mut seq = sequence();
        with_ctx(|ctx| {
            seed_clips(&mut seq, ctx, &[10]);
            seq.insert_blank(0, 1, 8).expect("insert blank");

            let outcome = seq.cut_track_at_frame(ctx, 0, 13).expect("cut");
            assert_eq!(
                outcome,
                CutOutcome::Cut {
                    prev_in: 0,
                    prev_out: 7
                }
            );
            let lengths: Vec<i64> = seq.tracks()[0].segments().iter().map(Segment::length).collect();
            assert_eq!(lengths, vec![10, 3, 5]);
            assert!(seq.tracks()[0].segments()[1].is_blank());
            assert!(seq.tracks()[0].segments()[2].is_blank());
        });
    }

    #[test]
    fn remove_trailing_blanks_reports_lengths_and_restores_exactly() {
        let mut seq = sequence();
        with_ctx(|ctx| {
            seed_clips(&mut seq, ctx, &[10]);
            seq.insert_blank(0, 1, 4).expect("blank");
            seq.insert_blank(0, 2, 6).expect("blank");

            let lengths = seq.remove_trailing_blanks(ctx, 0).expect("remove");
            assert_eq!(lengths, vec![6, 4]);
            assert_eq!(seq.tracks()[0].count(), 1);

            let again = seq.remove_trailing_blanks(ctx, 0).expect("no-op");
            assert!(again.is_empty());

            seq.restore_trailing_blanks(0, &lengths).expect("restore");
            let restored: Vec<i64> = seq.tracks()[0].segments().iter().map(Segment::length).collect();
            assert_eq!(restored, vec![10, 4, 6]);
        });
    }

    #[test]
    fn remove_consecutive_blanks_round_trips_through_reinsert() {
        let mut seq = sequence();
        with_ctx(|ctx| {
            seed_clips(&mut seq, ctx, &[10]);
            seq.insert_blank(0, 1, 3).expect("blank");
            seq.insert_blank(0, 2, 7).expect("blank");
            seed_clips(&mut seq, ctx, &[5]);

            let lengths = seq.remove_consecutive_blanks(ctx, 0, 1).expect("remove");
            assert_eq!(lengths, vec![3, 7]);
            assert_eq!(seq.tracks()[0].count(), 2);

            for (i, length) in lengths.iter().enumerate() {
                seq.insert_blank(0, 1 + i, *length).expect("reinsert");
            }
            let restored: Vec<i64> = seq.tracks()[0].segments().iter().map(Segment::length).collect();
            assert_eq!(restored, vec![10, 3, 7, 5]);
        });
    }

    #[test]
    fn retired_compositors_reclaim_after_engine_release() {
        let mut seq = sequence();
        let mut compositor = seq.create_compositor(0);
        compositor.a_track = 1;
        compositor.b_track = 0;
        compositor.set_in_and_out(0, 10);
        let destroy_id = compositor.destroy_id;
        seq.add_compositor(compositor);
        seq.restack_compositors();

        let removed = seq.remove_compositor(destroy_id).expect("remove");
        seq.retire_compositor(removed);
        assert_eq!(seq.retired_compositors().len(), 1);

        seq.restack_compositors();
        assert_eq!(seq.reclaim_retired(), 1);
        assert!(seq.retired_compositors().is_empty());
    }
}
