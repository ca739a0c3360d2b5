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

//! A conversation is not a flat log: gappy syncs, restart-from-event jumps,
//! and redactions produce a *forest* of disjoint timeline fragments, each
//! with its own pagination state. This crate is the core that navigates that
//! forest as if it were a single, bounded, scrollable sequence.
//!
//! Start at [`window::TimelineWindow`]; it drives [`linked_chunk::TimelineIndex`]
//! cursors across the [`linked_chunk::EventFragment`]s held by a
//! [`fragment_set::FragmentSet`], calling out to a [`pager::Pager`] whenever
//! in-memory extension isn't enough.
//!
//! Out of scope, by design: wire transport and auth, end-to-end crypto, room
//! membership, and anything UI-facing. [`receipts`] exposes only the small
//! contract those layers need from the core (thread-context resolution),
//! not an implementation of them.

#![warn(missing_debug_implementations)]

pub mod error;
pub mod event;
pub mod fragment_set;
pub mod linked_chunk;
pub mod pager;
pub mod receipts;
mod test_utils;
pub mod window;

pub use error::{Error, Result};
pub use event::{Direction, Event, Relation};
pub use fragment_set::FragmentSet;
pub use linked_chunk::{EventFragment, FragmentId, TimelineIndex};
pub use pager::{ContextResponse, MessagesResponse, Pager, Token};
pub use window::{TimelineWindow, WindowEnd, WindowObserver};
