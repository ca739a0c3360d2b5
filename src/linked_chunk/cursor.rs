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

//! [`TimelineIndex`]: a `(fragment, offset)` cursor that can walk across
//! fragment boundaries transparently.

use crate::{event::Direction, fragment_set::FragmentSet, linked_chunk::fragment::FragmentId};

/// A position inside the fragment graph: a fragment id plus a signed offset
/// relative to that fragment's `base_index`.
///
/// Two cursors are only meaningfully comparable if one can be reached from
/// the other by a finite sequence of [`Self::advance`]/[`Self::retreat`]
/// calls; the type itself does not attempt to detect or prevent comparing
/// unrelated cursors, since that would require graph-wide reachability
/// analysis the core doesn't otherwise need.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimelineIndex {
    fragment: FragmentId,
    offset: i64,
}

impl TimelineIndex {
    /// Builds a cursor at a specific fragment and offset.
    ///
    /// Callers are expected to only construct cursors with an offset inside
    /// `[min_offset(fragment), max_offset(fragment)]`; this isn't validated
    /// here since at construction time the fragment may still be being
    /// built up by the caller (e.g. during `load`).
    pub fn new(fragment: FragmentId, offset: i64) -> Self {
        Self { fragment, offset }
    }

    /// The fragment this cursor currently points into.
    pub fn fragment(&self) -> FragmentId {
        self.fragment
    }

    /// The cursor's offset relative to its fragment's base index.
    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// Attempts to move the cursor by `delta` (positive = forward, negative
    /// = backward). Returns the signed count actually moved; `result` has
    /// the same sign as `delta` (or is zero) and `|result| <= |delta|`.
    ///
    /// Crossing into a neighbouring fragment is a pure re-anchor and is
    /// never counted as traversing an event; a single call transparently
    /// crosses as many fragment boundaries as needed to satisfy `delta`.
    pub fn advance(&mut self, delta: i64, fragments: &FragmentSet) -> i64 {
        match delta.cmp(&0) {
            std::cmp::Ordering::Equal => 0,
            std::cmp::Ordering::Greater => self.step(delta, Direction::Forward, fragments),
            std::cmp::Ordering::Less => -self.step(-delta, Direction::Backward, fragments),
        }
    }

    /// Equivalent to `-advance(-delta)`, but requires `delta >= 0` and
    /// always returns a non-negative count.
    pub fn retreat(&mut self, delta: i64, fragments: &FragmentSet) -> i64 {
        assert!(delta >= 0, "retreat() requires a non-negative delta, got {delta}");
        self.step(delta, Direction::Backward, fragments)
    }

    /// Shared implementation of `advance`/`retreat`'s traversal loop in a
    /// single direction. `remaining` is always non-negative here; the sign
    /// is restored by the caller.
    fn step(&mut self, mut remaining: i64, direction: Direction, fragments: &FragmentSet) -> i64 {
        let mut moved = 0;

        loop {
            if remaining == 0 {
                return moved;
            }

            let fragment = fragments.get(self.fragment);

            let room = match direction {
                Direction::Forward => fragment.max_offset() - self.offset,
                Direction::Backward => self.offset - fragment.min_offset(),
            };

            if room >= remaining {
                self.offset += match direction {
                    Direction::Forward => remaining,
                    Direction::Backward => -remaining,
                };
                return moved + remaining;
            }

            // Consume all the room in this fragment, then try to step across
            // a neighbour boundary for the rest.
            self.offset = match direction {
                Direction::Forward => fragment.max_offset(),
                Direction::Backward => fragment.min_offset(),
            };
            moved += room;
            remaining -= room;

            match fragment.neighbour(direction) {
                Some(neighbour) => {
                    self.fragment = neighbour;
                    self.offset = match direction {
                        Direction::Forward => fragments.get(neighbour).min_offset(),
                        Direction::Backward => fragments.get(neighbour).max_offset(),
                    };
                    // Loop again with the remaining delta in the new fragment.
                }
                None => return moved,
            }
        }
    }
}
