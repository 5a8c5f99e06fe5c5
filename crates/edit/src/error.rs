use std::fmt::{Display, Formatter};

use crate::segment::{ClipId, DestroyId};

/// Result type used by the edit crate.
pub type Result<T> = std::result::Result<T, EditError>;

/// Errors produced by atomic operations and edit actions.
///
/// Boundary no-ops (cutting on an existing cut, trimming trailing blanks
/// off a blank-free track) are not errors; they are reported as tagged
/// values such as [`crate::sequence::CutOutcome::OnBoundary`]. Everything
/// here aborts the action before it mutates the sequence.
#[derive(Debug)]
pub enum EditError {
    UnknownTrack {
        track: usize,
    },
    SegmentIndexOutOfRange {
        track: usize,
        index: usize,
        count: usize,
    },
    FrameOutOfRange {
        track: usize,
        frame: i64,
        length: i64,
    },
    NegativeClipLength {
        clip_in: i64,
        clip_out: i64,
    },
    NotAClip {
        track: usize,
        index: usize,
    },
    NotABlank {
        track: usize,
        index: usize,
    },
    CutOutsideSegment {
        frame: i64,
        clip_in: i64,
        clip_out: i64,
    },
    FilterIndexOutOfRange {
        clip: ClipId,
        index: usize,
        count: usize,
    },
    FilterNotFound {
        clip: ClipId,
        filter: u64,
    },
    NoMuteFilter {
        clip: ClipId,
    },
    NoSyncData {
        clip: ClipId,
    },
    CompositorNotFound {
        destroy_id: DestroyId,
    },
    MissingUndoState {
        action: &'static str,
    },
}

impl Display for EditError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownTrack { track } => write!(f, "track does not exist: {track}"),
            Self::SegmentIndexOutOfRange {
                track,
                index,
                count,
            } => write!(
                f,
                "segment index {index} out of range on track {track} ({count} segments)"
            ),
            Self::FrameOutOfRange {
                track,
                frame,
                length,
            } => write!(
                f,
                "frame {frame} outside track {track} of length {length}"
            ),
            Self::NegativeClipLength { clip_in, clip_out } => {
                write!(f, "clip bounds produce negative length: {clip_in}..{clip_out}")
            }
            Self::NotAClip { track, index } => {
                write!(f, "segment at track {track} index {index} is not a clip")
            }
            Self::NotABlank { track, index } => {
                write!(f, "segment at track {track} index {index} is not a blank")
            }
            Self::CutOutsideSegment {
                frame,
                clip_in,
                clip_out,
            } => write!(
                f,
                "cut frame {frame} outside segment bounds {clip_in}..{clip_out}"
            ),
            Self::FilterIndexOutOfRange { clip, index, count } => write!(
                f,
                "filter index {index} out of range on clip {clip} ({count} filters)"
            ),
            Self::FilterNotFound { clip, filter } => {
                write!(f, "filter {filter} not attached to clip {clip}")
            }
            Self::NoMuteFilter { clip } => write!(f, "clip {clip} has no mute filter"),
            Self::NoSyncData { clip } => write!(f, "clip {clip} has no sync data"),
            Self::CompositorNotFound { destroy_id } => {
                write!(f, "no compositor for destroy id {destroy_id}")
            }
            Self::MissingUndoState { action } => {
                write!(f, "{action}: captured state missing for replay")
            }
        }
    }
}

impl std::error::Error for EditError {}
