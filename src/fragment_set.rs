// Copyright 2024 The Matrix.org Foundation C.I.C.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! [`FragmentSet`]: the per-conversation arena of [`EventFragment`]s.

use std::collections::HashMap;

use ruma::OwnedEventId;

use crate::{
    event::Direction,
    linked_chunk::fragment::{EventFragment, FragmentId},
    pager::Token,
};

/// Owns every [`EventFragment`] known for a single conversation, plus the
/// best-effort `event_id -> fragment` index and the distinguished live
/// fragment.
///
/// Per spec §9's design note, fragments live in an arena and neighbour links
/// are indices into it rather than owning references, so the graph can
/// contain cycles-of-convenience (a fragment pointing back through its own
/// neighbour chain) without any borrow-checker gymnastics.
#[derive(Debug, Default)]
pub struct FragmentSet {
    arena: Vec<EventFragment>,
    event_index: HashMap<OwnedEventId, FragmentId>,
    live: Option<FragmentId>,
}

impl FragmentSet {
    /// Creates an empty fragment set, with no fragments and no live
    /// fragment yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a new, empty, unlinked fragment and returns its id.
    pub fn allocate(&mut self) -> FragmentId {
        self.arena.push(EventFragment::new());
        FragmentId(self.arena.len() - 1)
    }

    /// Borrows a fragment by id.
    ///
    /// # Panics
    /// Panics if `id` was not produced by [`Self::allocate`] on this set.
    /// Slots are never removed, so a valid id never dangles.
    pub fn get(&self, id: FragmentId) -> &EventFragment {
        &self.arena[id.0]
    }

    /// Mutably borrows a fragment by id. See [`Self::get`] for panic
    /// conditions.
    pub fn get_mut(&mut self, id: FragmentId) -> &mut EventFragment {
        &mut self.arena[id.0]
    }

    /// Links `a`'s neighbour in `direction` to `b`, and symmetrically links
    /// `b`'s neighbour in the opposite direction back to `a`.
    pub fn link(&mut self, a: FragmentId, direction: Direction, b: FragmentId) {
        self.get_mut(a).set_neighbour(direction, Some(b));
        self.get_mut(b).set_neighbour(direction.opposite(), Some(a));
    }

    /// Severs any neighbour link `a` has in `direction`, along with the
    /// symmetric link on the other side.
    pub fn unlink(&mut self, a: FragmentId, direction: Direction) {
        if let Some(b) = self.get(a).neighbour(direction) {
            self.get_mut(a).set_neighbour(direction, None);
            self.get_mut(b).set_neighbour(direction.opposite(), None);
        }
    }

    /// The fragment whose forward end tracks newly synced events, if any
    /// sync has happened yet.
    pub fn live_fragment(&self) -> Option<FragmentId> {
        self.live
    }

    /// Returns the live fragment, allocating a fresh one and marking it live
    /// if none exists yet.
    pub fn ensure_live(&mut self) -> FragmentId {
        if let Some(live) = self.live {
            return live;
        }
        let id = self.allocate();
        self.live = Some(id);
        id
    }

    /// Local, best-effort lookup of the fragment currently holding `event_id`.
    /// Never issues a remote call; may return `None` even for an event that
    /// exists server-side if it has never been seen or has been evicted.
    pub fn fragment_for_event(&self, event_id: &OwnedEventId) -> Option<FragmentId> {
        self.event_index.get(event_id).copied()
    }

    /// Records that `event_id` currently lives in `fragment`. Called after
    /// every insertion so that [`Self::fragment_for_event`] stays accurate.
    pub(crate) fn index_event(&mut self, event_id: OwnedEventId, fragment: FragmentId) {
        self.event_index.insert(event_id, fragment);
    }

    /// Removes `event_id` from the index, e.g. after a trim drops it from
    /// every fragment's materialised window.
    ///
    /// Note this only affects lookups; the event may still physically sit
    /// in the fragment's `events` vector (eviction from the index and
    /// eviction from memory are independent policy decisions left to the
    /// caller).
    pub(crate) fn forget_event(&mut self, event_id: &OwnedEventId) {
        self.event_index.remove(event_id);
    }

    /// Applies a live sync batch to the conversation.
    ///
    /// Appends `events` to the forward end of the live fragment. If `gap` is
    /// `true` (the sync was "limited"), a fresh fragment is allocated and
    /// becomes the new live fragment; the old fragment is left with no
    /// forward neighbour until pagination later proves contiguity, and its
    /// forward pagination token is set to `gap_token`.
    pub fn apply_sync_batch(
        &mut self,
        events: Vec<crate::event::Event>,
        gap: bool,
        gap_token: Option<Token>,
    ) -> FragmentId {
        let live = self.ensure_live();

        for event in &events {
            self.index_event(event.event_id().to_owned(), live);
        }
        self.get_mut(live).push(events);

        if gap {
            self.get_mut(live).set_token(Direction::Forward, gap_token);
            let new_live = self.allocate();
            self.live = Some(new_live);
            new_live
        } else {
            live
        }
    }

    /// Total number of fragments allocated so far (for diagnostics/tests).
    pub fn fragment_count(&self) -> usize {
        self.arena.len()
    }
}
