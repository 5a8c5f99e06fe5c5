use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Opaque identifier for clips.
pub type ClipId = u64;
/// Opaque identifier for filter instances.
pub type FilterId = u64;
/// Stable identifier a compositor keeps across engine-side rebuilds.
pub type DestroyId = u64;

/// One slot of a track: media with bounds, or a gap of a given length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Segment {
    Clip(Clip),
    Blank(Blank),
}

/// A media segment with inclusive source bounds.
///
/// `clip_out` is inclusive, so the on-track length is
/// `clip_out - clip_in + 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clip {
    pub id: ClipId,
    pub source: SourceRef,
    pub name: String,
    pub clip_in: i64,
    pub clip_out: i64,
    pub filters: Vec<Filter>,
    pub mute_filter: Option<Filter>,
    pub sync: Option<SyncData>,
}

/// A gap. Blanks use the `clip_in = 0`, `clip_out = length - 1`
/// convention and are never resized in place; a differently sized blank
/// is always a fresh insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blank {
    pub length: i64,
}

/// What a clip plays back from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceRef {
    /// A media file producer.
    Media(PathBuf),
    /// A generated pattern producer (bars, color, noise).
    Generated(u32),
}

/// A filter instance attached to a clip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub id: FilterId,
    pub info: FilterInfo,
}

/// Static description of a filter type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterInfo {
    pub name: String,
    pub kind: FilterKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterKind {
    Single,
    /// Attaches as several engine-side filters that move together.
    Multipart,
}

impl FilterInfo {
    pub fn single(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FilterKind::Single,
        }
    }

    pub fn multipart(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FilterKind::Multipart,
        }
    }
}

/// Position binding between a child clip and its sync master.
///
/// `pos_offset` is the child's track start minus the master's track
/// start, both normalized by their own `clip_in`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncData {
    pub pos_offset: i64,
    pub master_clip: ClipId,
    pub state: SyncState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncState {
    Correct,
    Drifted,
}

impl Clip {
    /// On-track length in frames.
    pub fn length(&self) -> i64 {
        self.clip_out - self.clip_in + 1
    }

    /// True when `frame` (in source coordinates) lands on this clip's
    /// leading edge or one past its trailing edge.
    pub fn frame_on_cut(&self, frame: i64) -> bool {
        frame == self.clip_in || frame == self.clip_out + 1
    }
}

impl Blank {
    pub fn length(&self) -> i64 {
        self.length
    }
}

impl Segment {
    pub fn length(&self) -> i64 {
        match self {
            Self::Clip(clip) => clip.length(),
            Self::Blank(blank) => blank.length,
        }
    }

    /// Source in-point; 0 for blanks by convention.
    pub fn clip_in(&self) -> i64 {
        match self {
            Self::Clip(clip) => clip.clip_in,
            Self::Blank(_) => 0,
        }
    }

    /// Inclusive source out-point; `length - 1` for blanks.
    pub fn clip_out(&self) -> i64 {
        match self {
            Self::Clip(clip) => clip.clip_out,
            Self::Blank(blank) => blank.length - 1,
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Blank(_))
    }

    pub fn as_clip(&self) -> Option<&Clip> {
        match self {
            Self::Clip(clip) => Some(clip),
            Self::Blank(_) => None,
        }
    }

    pub fn as_clip_mut(&mut self) -> Option<&mut Clip> {
        match self {
            Self::Clip(clip) => Some(clip),
            Self::Blank(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Blank, Clip, Segment, SourceRef};

    fn clip(clip_in: i64, clip_out: i64) -> Clip {
        Clip {
            id: 1,
            source: SourceRef::Media("a.mp4".into()),
            name: "a".into(),
            clip_in,
            clip_out,
            filters: Vec::new(),
            mute_filter: None,
            sync: None,
        }
    }

    #[test]
    fn clip_length_counts_inclusive_out_frame() {
        assert_eq!(clip(10, 19).length(), 10);
        assert_eq!(clip(0, 0).length(), 1);
    }

    #[test]
    fn frame_on_cut_matches_both_edges() {
        let clip = clip(10, 19);
        assert!(clip.frame_on_cut(10));
        assert!(clip.frame_on_cut(20));
        assert!(!clip.frame_on_cut(15));
    }

    #[test]
    fn blank_bounds_follow_zero_origin_convention() {
        let blank = Segment::Blank(Blank { length: 8 });
        assert_eq!(blank.clip_in(), 0);
        assert_eq!(blank.clip_out(), 7);
        assert_eq!(blank.length(), 8);
    }
}
