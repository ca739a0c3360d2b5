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

//! [`EventFragment`]: a contiguous, append-both-ends slice of a
//! conversation's event history.

use futures_util::future::{BoxFuture, Shared};

use crate::{
    error::SharedError,
    event::{Direction, Event},
    pager::Token,
};

/// A handle into [`crate::fragment_set::FragmentSet`]'s arena.
///
/// Fragments never move once allocated and slots are never reused, so a
/// `FragmentId` obtained from a cursor or a neighbour link stays valid for
/// the lifetime of the `FragmentSet` that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FragmentId(pub(crate) usize);

/// A single-flight in-flight pagination, shared by every caller racing to
/// paginate the same fragment in the same direction.
pub(crate) type PendingPagination =
    Shared<BoxFuture<'static, Result<bool, SharedError>>>;

/// An ordered, append-both-ends sequence of events with a stable base index.
///
/// See spec §3/§4.1 for the full contract. The short version: prepending
/// events at the backward end only ever changes `base_index`, never the
/// numeric offset of a cursor that was already pointing into this fragment.
#[derive(Debug)]
pub struct EventFragment {
    events: Vec<Event>,
    base_index: i64,
    backward_token: Option<Token>,
    forward_token: Option<Token>,
    backward_neighbour: Option<FragmentId>,
    forward_neighbour: Option<FragmentId>,
    pending_back: Option<PendingPagination>,
    pending_fwd: Option<PendingPagination>,
}

impl EventFragment {
    /// Creates a new, empty, unlinked fragment.
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            base_index: 0,
            backward_token: None,
            forward_token: None,
            backward_neighbour: None,
            forward_neighbour: None,
            pending_back: None,
            pending_fwd: None,
        }
    }

    /// Smallest valid cursor offset into this fragment (non-positive).
    pub fn min_offset(&self) -> i64 {
        -self.base_index
    }

    /// One past the largest valid cursor offset into this fragment.
    pub fn max_offset(&self) -> i64 {
        self.events.len() as i64 - self.base_index
    }

    /// Read-only view of the events currently materialised in this fragment.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// The fragment's stable base index.
    pub fn base_index(&self) -> i64 {
        self.base_index
    }

    /// Converts a cursor offset into this fragment into a plain index into
    /// [`Self::events`].
    pub(crate) fn storage_index(&self, offset: i64) -> usize {
        (offset + self.base_index) as usize
    }

    /// The neighbour in the given direction, if linked.
    pub fn neighbour(&self, direction: Direction) -> Option<FragmentId> {
        match direction {
            Direction::Backward => self.backward_neighbour,
            Direction::Forward => self.forward_neighbour,
        }
    }

    /// Links this fragment's neighbour in the given direction.
    ///
    /// Callers (in practice, only [`crate::fragment_set::FragmentSet`]) are
    /// responsible for setting the symmetric link on the other side.
    pub(crate) fn set_neighbour(&mut self, direction: Direction, neighbour: Option<FragmentId>) {
        match direction {
            Direction::Backward => self.backward_neighbour = neighbour,
            Direction::Forward => self.forward_neighbour = neighbour,
        }
    }

    /// The pagination token for the given direction, if any.
    pub fn token(&self, direction: Direction) -> Option<&Token> {
        match direction {
            Direction::Backward => self.backward_token.as_ref(),
            Direction::Forward => self.forward_token.as_ref(),
        }
    }

    /// Replaces the pagination token for the given direction.
    pub fn set_token(&mut self, direction: Direction, token: Option<Token>) {
        match direction {
            Direction::Backward => self.backward_token = token,
            Direction::Forward => self.forward_token = token,
        }
    }

    /// Takes (clears) the in-flight pagination promise for the given
    /// direction, if any is registered.
    pub(crate) fn take_pending(&mut self, direction: Direction) -> Option<PendingPagination> {
        match direction {
            Direction::Backward => self.pending_back.take(),
            Direction::Forward => self.pending_fwd.take(),
        }
    }

    /// Returns a clone of the in-flight pagination promise for the given
    /// direction without clearing it.
    pub(crate) fn peek_pending(&self, direction: Direction) -> Option<PendingPagination> {
        match direction {
            Direction::Backward => self.pending_back.clone(),
            Direction::Forward => self.pending_fwd.clone(),
        }
    }

    /// Registers the single in-flight pagination promise for the given
    /// direction. Overwrites any previous value; callers must check
    /// [`Self::peek_pending`] first to honour single-flight coalescing.
    pub(crate) fn set_pending(&mut self, direction: Direction, promise: PendingPagination) {
        match direction {
            Direction::Backward => self.pending_back = Some(promise),
            Direction::Forward => self.pending_fwd = Some(promise),
        }
    }

    /// Prepends events at the backward end.
    ///
    /// Grows `base_index` by the number of prepended events, so every
    /// existing cursor offset into this fragment keeps pointing at the same
    /// logical event.
    pub fn prepend(&mut self, mut events: Vec<Event>) {
        if events.is_empty() {
            return;
        }
        self.base_index += events.len() as i64;
        events.append(&mut self.events);
        self.events = events;
    }

    /// Appends events at the forward end. `base_index` is unaffected.
    pub fn push(&mut self, events: impl IntoIterator<Item = Event>) {
        self.events.extend(events);
    }
}

impl Default for EventFragment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::evs;

    #[test]
    fn fresh_fragment_has_zero_width_offsets() {
        let f = EventFragment::new();
        assert_eq!(f.min_offset(), 0);
        assert_eq!(f.max_offset(), 0);
    }

    #[test]
    fn push_extends_max_offset_without_touching_min() {
        let mut f = EventFragment::new();
        f.push(evs(0..10));
        assert_eq!(f.min_offset(), 0);
        assert_eq!(f.max_offset(), 10);
        assert_eq!(f.events().len(), 10);
    }

    #[test]
    fn prepend_only_moves_min_offset() {
        let mut f = EventFragment::new();
        f.push(evs(10..20));
        assert_eq!(f.max_offset(), 10);

        // A cursor pointing at offset 5 should keep pointing at the same
        // logical event (e15) after a prepend.
        let before = f.events()[f.storage_index(5)].clone();

        f.prepend(evs(0..10));

        assert_eq!(f.min_offset(), -10);
        assert_eq!(f.max_offset(), 10);
        assert_eq!(f.events().len(), 20);
        assert_eq!(f.events()[f.storage_index(5)], before);
    }

    #[test]
    fn prepend_of_empty_is_a_no_op() {
        let mut f = EventFragment::new();
        f.push(evs(0..3));
        let base = f.base_index();
        f.prepend(vec![]);
        assert_eq!(f.base_index(), base);
        assert_eq!(f.events().len(), 3);
    }

    #[test]
    fn neighbour_links_round_trip() {
        let mut f = EventFragment::new();
        assert_eq!(f.neighbour(Direction::Forward), None);
        f.set_neighbour(Direction::Forward, Some(FragmentId(7)));
        assert_eq!(f.neighbour(Direction::Forward), Some(FragmentId(7)));
        assert_eq!(f.neighbour(Direction::Backward), None);
    }

    #[test]
    fn tokens_round_trip_independently_per_direction() {
        let mut f = EventFragment::new();
        f.set_token(Direction::Backward, Some(Token::new("back")));
        assert_eq!(f.token(Direction::Backward), Some(&Token::new("back")));
        assert_eq!(f.token(Direction::Forward), None);
    }
}
