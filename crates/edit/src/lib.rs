//! Edit-action and undo/redo engine for a non-linear timeline editor.
//!
//! Tracks hold ordered clip/blank sequences mirrored one-for-one into an
//! external media engine; every mutation is packaged as a reversible,
//! replayable [`EditAction`] built from the atomic operations on
//! [`Sequence`].

pub mod action;
pub mod cache;
pub mod compositor;
pub mod edits;
pub mod effects;
pub mod engine;
pub mod error;
pub mod segment;
pub mod sequence;
pub mod sync;
pub mod track;

#[cfg(test)]
pub(crate) mod testsupport;

pub use action::{
    EditAction, EditContext, EditOp, Frontend, GuiUpdates, NoSync, NullFrontend, ResyncItem,
    RunState, SyncTracker,
};
pub use cache::{Waveform, WaveformCache};
pub use compositor::{Compositor, RetiredCompositors};
pub use engine::{InMemoryEngine, MediaEngine, MirrorSegment};
pub use error::{EditError, Result};
pub use segment::{
    Blank, Clip, ClipId, DestroyId, Filter, FilterId, FilterInfo, FilterKind, Segment, SourceRef,
    SyncData, SyncState,
};
pub use sequence::{CutOutcome, Sequence, SequenceSnapshot};
pub use track::{Track, TrackKind};
