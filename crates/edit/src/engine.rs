use std::collections::HashMap;

use crate::segment::{Clip, ClipId, DestroyId, FilterId};

/// Engine-side view of one track slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorSegment {
    Clip {
        id: ClipId,
        clip_in: i64,
        clip_out: i64,
    },
    Blank {
        length: i64,
    },
}

impl MirrorSegment {
    pub fn length(&self) -> i64 {
        match self {
            Self::Clip { clip_in, clip_out, .. } => clip_out - clip_in + 1,
            Self::Blank { length } => *length,
        }
    }
}

/// The playback/render engine's native per-track structure.
///
/// Every atomic operation mutates the editor's own segment list and this
/// mirror together, index for index; the mirror is never touched through
/// any other path. Implementations do not validate arguments; callers
/// have already validated against the editor-side track, and the two
/// representations are asserted equal after every atomic in debug builds.
pub trait MediaEngine {
    fn append(&mut self, track: usize, clip: &Clip, clip_in: i64, clip_out: i64);
    fn insert(&mut self, track: usize, clip: &Clip, index: usize, clip_in: i64, clip_out: i64);
    fn insert_blank(&mut self, track: usize, index: usize, length: i64);
    fn remove(&mut self, track: usize, index: usize);
    fn set_in_and_out(&mut self, track: usize, index: usize, clip_in: i64, clip_out: i64);

    fn segment(&self, track: usize, index: usize) -> Option<MirrorSegment>;
    fn count(&self, track: usize) -> usize;
    fn length(&self, track: usize) -> i64;

    /// Filter attachments follow the clip, not the track slot.
    fn attach_filter(&mut self, clip: ClipId, filter: FilterId);
    fn detach_filter(&mut self, clip: ClipId, filter: FilterId);

    fn compositor_added(&mut self, destroy_id: DestroyId);
    fn compositor_removed(&mut self, destroy_id: DestroyId);
    /// Rebuilds the engine-side compositor stack in the given order.
    /// Engine-side compositor objects do not survive this; only
    /// `destroy_id` identifies a compositor across calls.
    fn restack_compositors(&mut self, order: &[DestroyId]);
    /// True while the engine still holds internal references to a removed
    /// compositor. Retired compositors are reclaimed only once this
    /// reports false.
    fn compositor_in_use(&self, destroy_id: DestroyId) -> bool;
}

/// Reference engine used by the tests and the demo CLI.
///
/// Keeps the mirrored structure in plain vectors so divergence from the
/// editor-side representation is observable in tests.
#[derive(Debug, Default)]
pub struct InMemoryEngine {
    tracks: Vec<Vec<MirrorSegment>>,
    attachments: HashMap<ClipId, Vec<FilterId>>,
    compositor_stack: Vec<DestroyId>,
}

impl InMemoryEngine {
    pub fn new(track_count: usize) -> Self {
        Self {
            tracks: vec![Vec::new(); track_count],
            attachments: HashMap::new(),
            compositor_stack: Vec::new(),
        }
    }

    pub fn attached_filters(&self, clip: ClipId) -> &[FilterId] {
        self.attachments.get(&clip).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn compositor_stack(&self) -> &[DestroyId] {
        &self.compositor_stack
    }
}

impl MediaEngine for InMemoryEngine {
    fn append(&mut self, track: usize, clip: &Clip, clip_in: i64, clip_out: i64) {
        self.tracks[track].push(MirrorSegment::Clip {
            id: clip.id,
            clip_in,
            clip_out,
        });
    }

    fn insert(&mut self, track: usize, clip: &Clip, index: usize, clip_in: i64, clip_out: i64) {
        self.tracks[track].insert(
            index,
            MirrorSegment::Clip {
                id: clip.id,
                clip_in,
                clip_out,
            },
        );
    }

    fn insert_blank(&mut self, track: usize, index: usize, length: i64) {
        self.tracks[track].insert(index, MirrorSegment::Blank { length });
    }

    fn remove(&mut self, track: usize, index: usize) {
        self.tracks[track].remove(index);
    }

    fn set_in_and_out(&mut self, track: usize, index: usize, clip_in: i64, clip_out: i64) {
        match &mut self.tracks[track][index] {
            MirrorSegment::Clip {
                clip_in: c_in,
                clip_out: c_out,
                ..
            } => {
                *c_in = clip_in;
                *c_out = clip_out;
            }
            MirrorSegment::Blank { .. } => unreachable!("blanks are never resized in place"),
        }
    }

    fn segment(&self, track: usize, index: usize) -> Option<MirrorSegment> {
        self.tracks.get(track)?.get(index).copied()
    }

    fn count(&self, track: usize) -> usize {
        self.tracks[track].len()
    }

    fn length(&self, track: usize) -> i64 {
        self.tracks[track].iter().map(MirrorSegment::length).sum()
    }

    fn attach_filter(&mut self, clip: ClipId, filter: FilterId) {
        self.attachments.entry(clip).or_default().push(filter);
    }

    fn detach_filter(&mut self, clip: ClipId, filter: FilterId) {
        if let Some(filters) = self.attachments.get_mut(&clip) {
            if let Some(position) = filters.iter().position(|id| *id == filter) {
                filters.remove(position);
            }
            if filters.is_empty() {
                self.attachments.remove(&clip);
            }
        }
    }

    fn compositor_added(&mut self, destroy_id: DestroyId) {
        self.compositor_stack.push(destroy_id);
    }

    fn compositor_removed(&mut self, destroy_id: DestroyId) {
        self.compositor_stack.retain(|id| *id != destroy_id);
    }

    fn restack_compositors(&mut self, order: &[DestroyId]) {
        self.compositor_stack = order.to_vec();
    }

    fn compositor_in_use(&self, destroy_id: DestroyId) -> bool {
        self.compositor_stack.contains(&destroy_id)
    }
}

#[cfg(test)]
mod tests {
    use super::{InMemoryEngine, MediaEngine, MirrorSegment};
    use crate::segment::{Clip, SourceRef};

    fn clip(id: u64) -> Clip {
        Clip {
            id,
            source: SourceRef::Media("a.mp4".into()),
            name: "a".into(),
            clip_in: 0,
            clip_out: 9,
            filters: Vec::new(),
            mute_filter: None,
            sync: None,
        }
    }

    #[test]
    fn insert_and_remove_keep_slot_order() {
        let mut engine = InMemoryEngine::new(1);
        engine.append(0, &clip(1), 0, 9);
        engine.insert_blank(0, 1, 5);
        engine.insert(0, &clip(2), 1, 3, 7);

        assert_eq!(engine.count(0), 3);
        assert_eq!(engine.length(0), 20);
        assert_eq!(
            engine.segment(0, 1),
            Some(MirrorSegment::Clip {
                id: 2,
                clip_in: 3,
                clip_out: 7
            })
        );

        engine.remove(0, 1);
        assert_eq!(engine.count(0), 2);
        assert_eq!(engine.segment(0, 1), Some(MirrorSegment::Blank { length: 5 }));
    }

    #[test]
    fn filter_attachments_follow_the_clip_id() {
        let mut engine = InMemoryEngine::new(1);
        engine.attach_filter(7, 100);
        engine.attach_filter(7, 101);
        engine.detach_filter(7, 100);

        assert_eq!(engine.attached_filters(7), &[101]);
    }

    #[test]
    fn restack_replaces_the_compositor_stack() {
        let mut engine = InMemoryEngine::new(0);
        engine.compositor_added(1);
        engine.compositor_added(2);
        engine.restack_compositors(&[2, 1]);

        assert_eq!(engine.compositor_stack(), &[2, 1]);
        assert!(engine.compositor_in_use(1));

        engine.compositor_removed(1);
        assert!(!engine.compositor_in_use(1));
    }
}
