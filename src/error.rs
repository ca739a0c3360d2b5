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

//! Error kinds raised by the timeline core.

use ruma::OwnedEventId;

/// Errors that can be produced by [`crate::window::TimelineWindow`] and its
/// collaborators.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An operation other than [`load`](crate::window::TimelineWindow::load)
    /// was called before the window finished loading.
    #[error("the window has not been loaded yet")]
    NotLoaded,

    /// A direction argument was neither backward nor forward.
    ///
    /// The core's `Direction` enum is closed, so this currently can't be
    /// constructed from within the crate; it exists for callers that plumb
    /// a direction through a less strongly typed boundary (e.g. FFI).
    #[error("direction must be either backward or forward")]
    InvalidDirection,

    /// [`load`](crate::window::TimelineWindow::load) was given an event id,
    /// but the `context` fetch that resolved it did not actually include
    /// that event.
    #[error("requested event {0} was not present in its own context response")]
    EventNotInContext(OwnedEventId),

    /// `unpaginate` was asked to drop more events than the cursor could
    /// traverse. This means the window's `event_count` bookkeeping has
    /// diverged from the fragment graph; the window should be considered
    /// poisoned, though the underlying fragment graph is unaffected.
    #[error("cannot unpaginate {requested} events: only {traversed} could be traversed")]
    CannotUnpaginate {
        /// How many events the caller asked to drop.
        requested: u32,
        /// How many events the cursor actually managed to traverse.
        traversed: u32,
    },

    /// The transport reported a failure while servicing a `context` or
    /// `messages` request. The core treats the cause as opaque: it never
    /// interprets transport-specific error bodies, only propagates them.
    #[error("transport request failed: {0}")]
    TransportFailed(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl Error {
    /// Builds a [`Error::TransportFailed`] from any boxable error.
    pub fn transport(cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::TransportFailed(Box::new(cause))
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

// `Error` is propagated across a `Shared` future for single-flight
// pagination coalescing, which requires `Clone`. Transport causes aren't
// `Clone` in general, so waiters that join an in-flight pagination observe a
// stringified copy of the original error instead of the original value.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub(crate) struct SharedError(pub(crate) String);

impl From<&Error> for SharedError {
    fn from(err: &Error) -> Self {
        Self(err.to_string())
    }
}
