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

//! The event data model the core treats as (mostly) opaque.
//!
//! The core never interprets event content. It only ever needs a stable
//! identity, a sender, a timestamp, and enough of the relation graph to
//! resolve thread context for receipts (see [`crate::receipts`]).

use ruma::{MilliSecondsSinceUnixEpoch, OwnedEventId, OwnedUserId};

/// How an event relates to another event, if at all.
///
/// Mirrors the handful of relation shapes the core needs to reason about;
/// anything else (reactions aside) is opaque application content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Relation {
    /// The event does not relate to any other event.
    None,
    /// `m.in_reply_to`: a rich reply to another event.
    ReplyTo(OwnedEventId),
    /// `m.replace`: an edit of another event.
    Replaces(OwnedEventId),
    /// A reply within a thread, pointing at the thread's root event.
    ThreadReply(OwnedEventId),
    /// `m.annotation`: a reaction to another event.
    Reaction(OwnedEventId),
}

/// A single timeline event.
///
/// Events are immutable once constructed: an edit or a redaction always
/// arrives as a *new* `Event` that relates back to the original, never as a
/// mutation in place. This is what lets [`crate::window::TimelineWindow`]
/// guarantee identity-stable iteration across decryption (spec §4.6).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    event_id: OwnedEventId,
    sender: OwnedUserId,
    origin_ts: MilliSecondsSinceUnixEpoch,
    thread_root_id: Option<OwnedEventId>,
    relation: Relation,
}

impl Event {
    /// Builds a new event record.
    pub fn new(
        event_id: OwnedEventId,
        sender: OwnedUserId,
        origin_ts: MilliSecondsSinceUnixEpoch,
        thread_root_id: Option<OwnedEventId>,
        relation: Relation,
    ) -> Self {
        Self { event_id, sender, origin_ts, thread_root_id, relation }
    }

    /// The event's stable, server-assigned identifier.
    pub fn event_id(&self) -> &ruma::EventId {
        &self.event_id
    }

    /// The user who sent the event.
    pub fn sender(&self) -> &ruma::UserId {
        &self.sender
    }

    /// The server-stamped origin timestamp.
    pub fn origin_ts(&self) -> MilliSecondsSinceUnixEpoch {
        self.origin_ts
    }

    /// The root of the thread this event belongs to, if any.
    pub fn thread_root_id(&self) -> Option<&ruma::EventId> {
        self.thread_root_id.as_deref()
    }

    /// How this event relates to another event, if at all.
    pub fn relation(&self) -> &Relation {
        &self.relation
    }
}

/// Direction of traversal or pagination through the fragment graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Towards the start of history (older events).
    Backward,
    /// Towards the end of history (newer events, i.e. towards live sync).
    Forward,
}

impl Direction {
    /// The opposite direction.
    pub fn opposite(self) -> Self {
        match self {
            Self::Backward => Self::Forward,
            Self::Forward => Self::Backward,
        }
    }
}
