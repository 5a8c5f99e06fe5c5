use tracing::info;

use crate::cache::WaveformCache;
use crate::engine::MediaEngine;
use crate::error::Result;
use crate::segment::{Clip, ClipId, SyncState};
use crate::sequence::Sequence;
use crate::track::Track;

/// Where an action is in its lifecycle.
///
/// Forward runs must know whether they are the first run (several ops
/// create clone clips or filter objects only once and reuse them on every
/// replay), so the state is tracked explicitly, set at construction and
/// after first execution, never inferred from which captured fields
/// happen to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Constructed, never executed.
    Created,
    /// First forward run has completed.
    FirstRun,
    /// At least one undo/redo cycle has happened.
    Replayed,
}

/// A reversible edit: a forward operation, a backward operation, and
/// whatever state the forward run captures for the backward run to use.
///
/// `forward` serves both the initial do and every redo; `first` is true
/// only on the initial run. Implementations must leave the track
/// invariants (contiguity, length accounting, mirror agreement) intact on
/// both paths.
pub trait EditOp<E: MediaEngine> {
    fn name(&self) -> &'static str;
    fn forward(&mut self, seq: &mut Sequence<E>, ctx: &mut EditContext<'_>, first: bool)
    -> Result<()>;
    fn backward(&mut self, seq: &mut Sequence<E>, ctx: &mut EditContext<'_>) -> Result<()>;
}

/// Hooks into the surrounding editor. Structural changes invalidate
/// playback position and segment selection, so both are reset around
/// every action run; `timeline_changed` fires after a run unless the
/// context suppresses GUI updates.
pub trait Frontend {
    fn stop_playback(&mut self);
    fn clear_selection(&mut self);
    fn timeline_changed(&mut self);
}

/// Frontend that does nothing; for headless embedding and tests.
#[derive(Debug, Default)]
pub struct NullFrontend;

impl Frontend for NullFrontend {
    fn stop_playback(&mut self) {}
    fn clear_selection(&mut self) {}
    fn timeline_changed(&mut self) {}
}

/// One clip the synchronization collaborator wants repositioned:
/// `pos_offset` is the clip's current offset from its sync master.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResyncItem {
    pub clip: ClipId,
    pub track: usize,
    pub index: usize,
    pub pos_offset: i64,
}

/// The dependency/child-clip synchronization collaborator.
///
/// It owns the policy (which clips follow which masters, and what their
/// offsets currently are); this crate only notifies it of membership
/// changes and applies the moves and state tags it hands back.
pub trait SyncTracker {
    fn clip_added(&mut self, clip: &Clip, track: usize);
    fn clip_removed(&mut self, clip: &Clip);
    fn sync_cleared(&mut self, clip: ClipId);
    /// Sync-state tags to apply after an edit; the sequence applies them,
    /// the collaborator never mutates segments itself.
    fn child_sync_states(&mut self, tracks: &[Track]) -> Vec<(ClipId, SyncState)>;
    fn resync_data(&mut self, tracks: &[Track]) -> Vec<ResyncItem>;
    fn resync_data_for_clips(&mut self, clips: &[ClipId], tracks: &[Track]) -> Vec<ResyncItem>;
}

/// Tracker that follows nothing; for embedders without child-clip sync.
#[derive(Debug, Default)]
pub struct NoSync;

impl SyncTracker for NoSync {
    fn clip_added(&mut self, _clip: &Clip, _track: usize) {}
    fn clip_removed(&mut self, _clip: &Clip) {}
    fn sync_cleared(&mut self, _clip: ClipId) {}
    fn child_sync_states(&mut self, _tracks: &[Track]) -> Vec<(ClipId, SyncState)> {
        Vec::new()
    }
    fn resync_data(&mut self, _tracks: &[Track]) -> Vec<ResyncItem> {
        Vec::new()
    }
    fn resync_data_for_clips(&mut self, _clips: &[ClipId], _tracks: &[Track]) -> Vec<ResyncItem> {
        Vec::new()
    }
}

/// Whether action runs refresh the GUI. Batch drivers (full resync)
/// suppress updates and redraw once at the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuiUpdates {
    Enabled,
    Suppressed,
}

/// Everything an action run needs besides the sequence itself. Built per
/// call by the embedder; there is no process-wide state.
pub struct EditContext<'a> {
    pub frontend: &'a mut dyn Frontend,
    pub sync: &'a mut dyn SyncTracker,
    pub waveforms: &'a mut WaveformCache,
    pub gui: GuiUpdates,
}

/// A packaged, replayable edit, ready for the history stack.
///
/// Lifecycle: construct, [`EditAction::do_edit`] once, hand to the
/// history collaborator, then any number of undo/redo cycles. Every run
/// stops playback and clears the segment selection first, and recomputes
/// child-clip sync states afterwards.
pub struct EditAction<E: MediaEngine> {
    op: Box<dyn EditOp<E>>,
    state: RunState,
}

impl<E> EditAction<E>
where
    E: MediaEngine,
{
    pub fn new(op: Box<dyn EditOp<E>>) -> Self {
        Self {
            op,
            state: RunState::Created,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn name(&self) -> &'static str {
        self.op.name()
    }

    /// First forward run. The caller pushes the action onto its history
    /// stack once this returns Ok.
    pub fn do_edit(&mut self, seq: &mut Sequence<E>, ctx: &mut EditContext<'_>) -> Result<()> {
        debug_assert_eq!(
            self.state,
            RunState::Created,
            "do_edit is the first run only; use redo to replay"
        );
        self.run_forward(seq, ctx, true)?;
        self.state = RunState::FirstRun;
        info!(action = self.op.name(), "edit done");
        Ok(())
    }

    pub fn undo(&mut self, seq: &mut Sequence<E>, ctx: &mut EditContext<'_>) -> Result<()> {
        ctx.frontend.stop_playback();
        ctx.frontend.clear_selection();
        self.op.backward(seq, ctx)?;
        let states = ctx.sync.child_sync_states(seq.tracks());
        seq.apply_sync_states(&states);
        if ctx.gui == GuiUpdates::Enabled {
            ctx.frontend.timeline_changed();
        }
        self.state = RunState::Replayed;
        info!(action = self.op.name(), "edit undone");
        Ok(())
    }

    pub fn redo(&mut self, seq: &mut Sequence<E>, ctx: &mut EditContext<'_>) -> Result<()> {
        self.run_forward(seq, ctx, false)?;
        self.state = RunState::Replayed;
        info!(action = self.op.name(), "edit redone");
        Ok(())
    }

    fn run_forward(
        &mut self,
        seq: &mut Sequence<E>,
        ctx: &mut EditContext<'_>,
        first: bool,
    ) -> Result<()> {
        ctx.frontend.stop_playback();
        ctx.frontend.clear_selection();
        self.op.forward(seq, ctx, first)?;
        let states = ctx.sync.child_sync_states(seq.tracks());
        seq.apply_sync_states(&states);
        if ctx.gui == GuiUpdates::Enabled {
            ctx.frontend.timeline_changed();
        }
        Ok(())
    }
}
