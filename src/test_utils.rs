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

//! Deterministic test fixtures shared by every module's `#[cfg(test)] mod
//! tests`. Not part of the public API.

#![cfg(test)]

use ruma::{user_id, MilliSecondsSinceUnixEpoch, OwnedEventId};

use crate::event::{Event, Relation};

/// Builds a plain event with a given numeric suffix, e.g. `ev(12)` ==
/// `$e12:example.org`.
pub(crate) fn ev(n: u32) -> Event {
    ev_with_id(event_id_n(n))
}

/// The event id that [`ev`] would build for a given index, without building
/// the event itself. Useful for asserting on ids after the fact.
pub(crate) fn event_id_n(n: u32) -> OwnedEventId {
    ruma::OwnedEventId::try_from(format!("$e{n}:example.org")).unwrap()
}

pub(crate) fn ev_with_id(event_id: OwnedEventId) -> Event {
    Event::new(
        event_id,
        user_id!("@alice:example.org").to_owned(),
        MilliSecondsSinceUnixEpoch::now(),
        None,
        Relation::None,
    )
}

pub(crate) fn evs(range: std::ops::Range<u32>) -> Vec<Event> {
    range.map(ev).collect()
}
