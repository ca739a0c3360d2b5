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

//! The transport-facing [`Pager`] trait and the normalised request/response
//! shapes it deals in.
//!
//! The pager is intentionally stateless: it knows how to turn a request into
//! a normalised response, and nothing else. Deduplication, insertion, and
//! bookkeeping all happen one layer up, in
//! [`crate::window::TimelineWindow`].

use std::fmt;

use async_trait::async_trait;
use ruma::OwnedEventId;

use crate::{error::Result, event::Direction, event::Event};

/// An opaque, server-issued pagination token.
///
/// The core never interprets the contents of a token; it only stores it,
/// compares it for equality (to detect `start == end` end-of-history
/// signals), and hands it back to the [`Pager`] verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Token(String);

impl Token {
    /// Wraps a raw token string.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The raw token string, for handing back to the transport.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalised result of a `context` fetch, used by
/// [`crate::window::TimelineWindow::load`].
#[derive(Debug)]
pub struct ContextResponse {
    /// Events strictly before the target event, oldest first.
    pub events_before: Vec<Event>,
    /// The target event itself.
    pub target_event: Event,
    /// Events strictly after the target event, oldest first.
    ///
    /// Per spec §6.1 the transport delivers these newest-first; callers of
    /// [`Pager::context`] are expected to have already reversed them into
    /// chronological order by the time they reach this struct. (The
    /// reference [`Pager`] implementations in this crate's test module do
    /// this explicitly, to keep the reversal visible at the boundary where
    /// the wire format is known.)
    pub events_after: Vec<Event>,
    /// Token to paginate further backward from `events_before`'s start.
    pub start_token: Option<Token>,
    /// Token to paginate further forward from `events_after`'s end.
    pub end_token: Option<Token>,
}

/// Normalised result of a `messages` fetch, used by
/// [`crate::window::TimelineWindow::paginate`].
#[derive(Debug)]
pub struct MessagesResponse {
    /// Newly retrieved events, in chronological order regardless of the
    /// direction requested (i.e. already un-reversed for backward
    /// pagination).
    pub events: Vec<Event>,
    /// Token to continue paginating in the same direction, if any.
    pub next_token: Option<Token>,
}

impl MessagesResponse {
    /// Whether this response signals end-of-history in the requested
    /// direction: no events were returned, and there is no further token to
    /// try.
    pub fn is_end_of_history(&self) -> bool {
        self.events.is_empty() && self.next_token.is_none()
    }
}

/// Stateless transport collaborator consumed by [`crate::window::TimelineWindow`].
///
/// Implementations are expected to respect lazy-loading filters and to not
/// re-emit events the caller has already seen where the underlying protocol
/// makes that possible; final deduplication by `event_id` is still enforced
/// by the fragment graph before insertion regardless.
#[async_trait]
pub trait Pager: std::fmt::Debug + Send + Sync {
    /// Fetches events around `event_id`, along with pagination tokens on
    /// both sides.
    async fn context(&self, event_id: &OwnedEventId) -> Result<ContextResponse>;

    /// Fetches up to `size` events in `direction` starting from `token`.
    async fn messages(
        &self,
        direction: Direction,
        size: u16,
        token: Option<&Token>,
    ) -> Result<MessagesResponse>;
}
