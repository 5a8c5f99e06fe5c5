//! Shared fixtures for the unit tests: a context harness over the no-op
//! collaborators and a few track inspection helpers.

use std::sync::Arc;

use crate::action::{EditContext, GuiUpdates, NoSync, NullFrontend};
use crate::cache::{Waveform, WaveformCache};
use crate::engine::MediaEngine;
use crate::segment::{ClipId, Segment, SourceRef};
use crate::sequence::Sequence;

pub(crate) struct Harness {
    frontend: NullFrontend,
    sync: NoSync,
    waveforms: WaveformCache,
}

impl Harness {
    pub(crate) fn new() -> Self {
        Self {
            frontend: NullFrontend,
            sync: NoSync,
            waveforms: WaveformCache::new(64),
        }
    }

    pub(crate) fn ctx(&mut self) -> EditContext<'_> {
        EditContext {
            frontend: &mut self.frontend,
            sync: &mut self.sync,
            waveforms: &mut self.waveforms,
            gui: GuiUpdates::Suppressed,
        }
    }

    pub(crate) fn insert_waveform(&mut self, clip: ClipId, track: usize) {
        self.waveforms.insert(
            clip,
            track,
            Waveform {
                levels: Arc::from(vec![0.5; 8]),
            },
        );
    }

    pub(crate) fn has_waveform(&mut self, clip: ClipId, track: usize) -> bool {
        self.waveforms.get(clip, track).is_some()
    }
}

/// Appends one clip per length, returning their ids.
pub(crate) fn seed_clips<E: MediaEngine>(
    seq: &mut Sequence<E>,
    ctx: &mut EditContext<'_>,
    track: usize,
    lengths: &[i64],
) -> Vec<ClipId> {
    let mut ids = Vec::with_capacity(lengths.len());
    for (i, length) in lengths.iter().enumerate() {
        let clip = seq.create_clip(SourceRef::Media("clip.mp4".into()), format!("clip{i}"));
        ids.push(clip.id);
        seq.append_clip(ctx, track, clip, 0, length - 1)
            .expect("seed append");
    }
    ids
}

pub(crate) fn lengths<E: MediaEngine>(seq: &Sequence<E>, track: usize) -> Vec<i64> {
    seq.tracks()[track]
        .segments()
        .iter()
        .map(Segment::length)
        .collect()
}

/// Full segment list for exact before/after comparison; also asserts the
/// representations agree and the frame accounting adds up.
pub(crate) fn snapshot_segments<E: MediaEngine>(seq: &Sequence<E>, track: usize) -> Vec<Segment> {
    assert!(seq.mirror_consistent(track), "representations diverged");
    let t = &seq.tracks()[track];
    let summed: i64 = t.segments().iter().map(Segment::length).sum();
    assert_eq!(summed, t.length(), "length accounting broken");
    t.segments().to_vec()
}
