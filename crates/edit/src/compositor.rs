use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::segment::{ClipId, DestroyId};

/// A transition entity spanning two tracks over a frame range.
///
/// The engine rebuilds its own compositor objects whenever the stack is
/// recalculated, so object identity is worthless across edits; only
/// `destroy_id` survives. All undo/redo logic resolves the live
/// compositor through [`crate::sequence::Sequence::compositor`] by that
/// id and never holds a compositor across a restack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compositor {
    pub destroy_id: DestroyId,
    /// Which transition type this is, an index into the host's registry.
    pub kind_index: usize,
    pub in_frame: i64,
    pub out_frame: i64,
    pub a_track: usize,
    pub b_track: usize,
    pub origin_clip_id: ClipId,
}

impl Compositor {
    pub fn set_in_and_out(&mut self, in_frame: i64, out_frame: i64) {
        self.in_frame = in_frame;
        self.out_frame = out_frame;
    }

    /// Copies everything that defines this compositor onto a freshly
    /// created one, including the stable id.
    pub fn clone_properties(&self, target: &mut Compositor) {
        target.destroy_id = self.destroy_id;
        target.kind_index = self.kind_index;
        target.in_frame = self.in_frame;
        target.out_frame = self.out_frame;
        target.a_track = self.a_track;
        target.b_track = self.b_track;
        target.origin_clip_id = self.origin_clip_id;
    }
}

/// Registry of deleted compositors, indexed by stable id.
///
/// The engine revisits removed compositors while its own bookkeeping
/// settles, so they must outlive their removal. Entries leave the
/// registry only through [`RetiredCompositors::reclaim`], once the engine
/// reports the id unreferenced.
#[derive(Debug, Default)]
pub struct RetiredCompositors {
    entries: HashMap<DestroyId, Compositor>,
}

impl RetiredCompositors {
    pub fn retire(&mut self, compositor: Compositor) {
        self.entries.insert(compositor.destroy_id, compositor);
    }

    pub fn get(&self, destroy_id: DestroyId) -> Option<&Compositor> {
        self.entries.get(&destroy_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every retired compositor `in_use` no longer reports, and
    /// returns how many were reclaimed.
    pub fn reclaim(&mut self, in_use: impl Fn(DestroyId) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|id, _| in_use(*id));
        before - self.entries.len()
    }
}
