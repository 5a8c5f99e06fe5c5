use serde::{Deserialize, Serialize};

use crate::segment::Segment;

/// Kind of material a track carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackKind {
    Video,
    Audio,
}

/// Ordered, contiguous, non-overlapping sequence of segments.
///
/// Segments cover `[0, length)` with no gaps other than explicit blanks;
/// `sum(segment.length) == length` at all times. The list is mutated only
/// through the atomic operations on [`crate::sequence::Sequence`], which
/// keep it index-aligned with the media engine's mirrored structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub kind: TrackKind,
    pub(crate) clips: Vec<Segment>,
}

impl Track {
    pub fn new(kind: TrackKind) -> Self {
        Self {
            kind,
            clips: Vec::new(),
        }
    }

    /// Number of segments.
    pub fn count(&self) -> usize {
        self.clips.len()
    }

    /// Total length in frames.
    pub fn length(&self) -> i64 {
        self.clips.iter().map(Segment::length).sum()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.clips
    }

    pub fn segment(&self, index: usize) -> Option<&Segment> {
        self.clips.get(index)
    }

    /// Track-relative start frame of the segment at `index`.
    pub fn clip_start(&self, index: usize) -> i64 {
        self.clips[..index].iter().map(Segment::length).sum()
    }

    /// Finds the segment covering `frame`, if any.
    pub fn clip_index_at(&self, frame: i64) -> Option<usize> {
        let mut start = 0;
        for (index, segment) in self.clips.iter().enumerate() {
            let end = start + segment.length();
            if (start..end).contains(&frame) {
                return Some(index);
            }
            start = end;
        }
        None
    }

    /// True when `frame` coincides with a segment start or the track end.
    pub fn frame_on_boundary(&self, frame: i64) -> bool {
        let mut start = 0;
        for segment in &self.clips {
            if frame == start {
                return true;
            }
            start += segment.length();
        }
        frame == start
    }
}

#[cfg(test)]
mod tests {
    use super::{Track, TrackKind};
    use crate::segment::{Blank, Clip, Segment, SourceRef};

    fn clip(id: u64, clip_in: i64, clip_out: i64) -> Segment {
        Segment::Clip(Clip {
            id,
            source: SourceRef::Media("a.mp4".into()),
            name: "a".into(),
            clip_in,
            clip_out,
            filters: Vec::new(),
            mute_filter: None,
            sync: None,
        })
    }

    fn track() -> Track {
        let mut track = Track::new(TrackKind::Video);
        track.clips.push(clip(1, 0, 9));
        track.clips.push(Segment::Blank(Blank { length: 5 }));
        track.clips.push(clip(2, 20, 34));
        track
    }

    #[test]
    fn length_sums_all_segments() {
        assert_eq!(track().length(), 30);
    }

    #[test]
    fn clip_index_at_resolves_interior_frames() {
        let track = track();
        assert_eq!(track.clip_index_at(0), Some(0));
        assert_eq!(track.clip_index_at(9), Some(0));
        assert_eq!(track.clip_index_at(10), Some(1));
        assert_eq!(track.clip_index_at(14), Some(1));
        assert_eq!(track.clip_index_at(15), Some(2));
        assert_eq!(track.clip_index_at(29), Some(2));
        assert_eq!(track.clip_index_at(30), None);
    }

    #[test]
    fn clip_start_accumulates_preceding_lengths() {
        let track = track();
        assert_eq!(track.clip_start(0), 0);
        assert_eq!(track.clip_start(1), 10);
        assert_eq!(track.clip_start(2), 15);
    }

    #[test]
    fn frame_on_boundary_includes_track_end() {
        let track = track();
        assert!(track.frame_on_boundary(0));
        assert!(track.frame_on_boundary(10));
        assert!(track.frame_on_boundary(15));
        assert!(track.frame_on_boundary(30));
        assert!(!track.frame_on_boundary(7));
    }
}
