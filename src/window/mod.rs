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

//! [`TimelineWindow`]: a sliding, size-bounded view over the fragment graph,
//! and the pagination protocol that keeps it filled.

use std::sync::{Arc, Mutex};

use futures_util::future::{BoxFuture, FutureExt};
use ruma::OwnedEventId;
use tracing::{debug, instrument, trace};

use crate::{
    error::{Error, Result, SharedError},
    event::{Direction, Event},
    fragment_set::FragmentSet,
    linked_chunk::{fragment::FragmentId, TimelineIndex},
    pager::{Pager, Token},
};

#[cfg(test)]
mod tests;

/// Default cap on the number of events a [`TimelineWindow`] will keep
/// materialised at once.
pub const DEFAULT_WINDOW_LIMIT: u32 = 1000;

/// Default bound on how many remote requests a single [`TimelineWindow::paginate`]
/// call will issue before giving up, guarding against a server that keeps
/// returning non-empty tokens but no new events (spec §4.3.4 step 6).
pub const DEFAULT_PAGINATE_LOOP_LIMIT: u8 = 5;

/// Shared ownership of a conversation's fragment graph.
///
/// Every [`TimelineWindow`] open on the same conversation should be built
/// with a clone of the same `FragmentGraph`, so that sync appends and
/// pagination results from one window are visible to all of them (spec §5,
/// "shared resources"). The lock is a plain blocking mutex rather than an
/// async one: every public method that touches it does so without holding
/// the guard across an `.await`, which is also why the compiler would
/// reject a mistake here (`MutexGuard` isn't `Send`).
pub type FragmentGraph = Arc<Mutex<FragmentSet>>;

/// Which end of the window a trim or hook notification refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowEnd {
    /// The oldest end of the materialised range.
    Start,
    /// The newest end of the materialised range.
    End,
}

/// Observer hooks the application can register on a [`TimelineWindow`].
///
/// Both methods have a default no-op body: most tests and many embedders
/// only care about one of the two.
pub trait WindowObserver: std::fmt::Debug + Send + Sync {
    /// Called once per event that newly entered the materialised window,
    /// in the direction it was added.
    fn on_event_inserted(&self, _event: &Event, _direction: Direction) {}

    /// Called when `count` events were dropped from `end` to keep the
    /// window under its size cap.
    fn on_window_trimmed(&self, _count: u32, _end: WindowEnd) {}
}

/// A sliding, size-bounded view over one or more linked [`EventFragment`]s.
///
/// See spec §4.3 for the full contract of `load`/`extend`/`paginate`/
/// `unpaginate`/`can_paginate`/`get_events`.
///
/// [`EventFragment`]: crate::linked_chunk::EventFragment
#[derive(Debug)]
pub struct TimelineWindow {
    graph: FragmentGraph,
    pager: Arc<dyn Pager>,
    start: Option<TimelineIndex>,
    end: Option<TimelineIndex>,
    event_count: u32,
    window_limit: u32,
    observer: Option<Arc<dyn WindowObserver>>,
}

impl TimelineWindow {
    /// Builds a window over its own fresh, empty fragment graph.
    ///
    /// Use [`Self::with_graph`] instead when multiple windows need to share
    /// one conversation's fragment graph.
    pub fn new(pager: Arc<dyn Pager>) -> Self {
        Self::with_graph(Arc::new(Mutex::new(FragmentSet::new())), pager)
    }

    /// Builds a window over an existing, possibly shared, fragment graph.
    pub fn with_graph(graph: FragmentGraph, pager: Arc<dyn Pager>) -> Self {
        Self {
            graph,
            pager,
            start: None,
            end: None,
            event_count: 0,
            window_limit: DEFAULT_WINDOW_LIMIT,
            observer: None,
        }
    }

    /// Overrides the default window size cap.
    pub fn with_window_limit(mut self, limit: u32) -> Self {
        self.window_limit = limit;
        self
    }

    /// Registers an observer for insertion/trim notifications.
    pub fn with_observer(mut self, observer: Arc<dyn WindowObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// A clone of the shared fragment graph this window is built over.
    pub fn graph(&self) -> FragmentGraph {
        Arc::clone(&self.graph)
    }

    /// Number of events currently materialised in `[start, end)`.
    pub fn event_count(&self) -> u32 {
        self.event_count
    }

    /// The configured hard cap on materialised events.
    pub fn window_limit(&self) -> u32 {
        self.window_limit
    }

    /// Whether [`Self::load`] has completed successfully.
    pub fn is_loaded(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }

    fn cursor(&self, direction: Direction) -> Option<TimelineIndex> {
        match direction {
            Direction::Backward => self.start,
            Direction::Forward => self.end,
        }
    }

    fn set_cursor(&mut self, direction: Direction, cursor: TimelineIndex) {
        match direction {
            Direction::Backward => self.start = Some(cursor),
            Direction::Forward => self.end = Some(cursor),
        }
    }

    // ---- load --------------------------------------------------------

    /// Loads the window, either centred on `initial_event_id` or anchored to
    /// the live (forward-most) fragment if `None`. Must be called before any
    /// other method. See spec §4.3.1.
    #[instrument(skip(self))]
    pub async fn load(
        &mut self,
        initial_event_id: Option<OwnedEventId>,
        initial_size: u32,
    ) -> Result<()> {
        let fragment_id = match &initial_event_id {
            Some(event_id) => self.fragment_for_load(event_id).await?,
            None => {
                let mut graph = self.graph.lock().unwrap();
                graph.ensure_live()
            }
        };

        let graph = self.graph.lock().unwrap();
        let fragment = graph.get(fragment_id);

        let event_index = match &initial_event_id {
            Some(event_id) => fragment
                .events()
                .iter()
                .position(|e| e.event_id() == &**event_id)
                .ok_or_else(|| Error::EventNotInContext(event_id.clone()))?
                as i64,
            // Land at the forward end of the live fragment.
            None => fragment.events().len() as i64,
        };

        let len = fragment.events().len() as i64;
        let half = (initial_size as i64 + 1) / 2; // ceil(initial_size / 2)
        let end_index = len.min(event_index + half);
        let start_index = 0.max(end_index - initial_size as i64);
        let base = fragment.base_index();

        drop(graph);

        self.start = Some(TimelineIndex::new(fragment_id, start_index - base));
        self.end = Some(TimelineIndex::new(fragment_id, end_index - base));
        self.event_count = (end_index - start_index) as u32;

        trace!(event_count = self.event_count, "window loaded");

        Ok(())
    }

    /// Resolves the fragment to load from when an `initial_event_id` is
    /// given: synchronously from the in-memory index if possible (spec
    /// §4.3.1 notes this matters for UI responsiveness), otherwise via a
    /// `context` fetch.
    async fn fragment_for_load(&mut self, event_id: &OwnedEventId) -> Result<FragmentId> {
        if let Some(fragment_id) = self.graph.lock().unwrap().fragment_for_event(event_id) {
            return Ok(fragment_id);
        }

        let response = self.pager.context(event_id).await?;

        if response.target_event.event_id() != &**event_id {
            return Err(Error::EventNotInContext(event_id.clone()));
        }

        let mut graph = self.graph.lock().unwrap();
        let fragment_id = graph.allocate();

        let mut events = response.events_before;
        events.push(response.target_event);
        events.extend(response.events_after);

        for event in &events {
            graph.index_event(event.event_id().to_owned(), fragment_id);
        }

        let fragment = graph.get_mut(fragment_id);
        fragment.push(events);
        fragment.set_token(Direction::Backward, response.start_token);
        fragment.set_token(Direction::Forward, response.end_token);

        Ok(fragment_id)
    }

    // ---- extend --------------------------------------------------------

    /// Moves the window's `direction` cursor inward by up to `size` events
    /// already materialised in the fragment graph, without any network
    /// request. Returns whether anything was added. See spec §4.3.2.
    pub fn extend(&mut self, direction: Direction, size: u32) -> Result<bool> {
        if !self.is_loaded() {
            return Err(Error::NotLoaded);
        }
        if size == 0 {
            return Ok(false);
        }

        let mut cursor = self.cursor(direction).expect("loaded");
        let before = cursor;

        let graph = self.graph.lock().unwrap();
        let moved = match direction {
            Direction::Backward => cursor.retreat(size as i64, &graph),
            Direction::Forward => cursor.advance(size as i64, &graph),
        };

        if moved == 0 {
            return Ok(false);
        }

        let inserted = self.events_between(&graph, before, cursor, direction);
        drop(graph);

        self.set_cursor(direction, cursor);
        self.event_count += moved.unsigned_abs() as u32;

        if let Some(observer) = &self.observer {
            for event in &inserted {
                observer.on_event_inserted(event, direction);
            }
        }

        if self.event_count > self.window_limit {
            let excess = self.event_count - self.window_limit;
            let trimmed_end = match direction {
                Direction::Backward => WindowEnd::End,
                Direction::Forward => WindowEnd::Start,
            };
            self.unpaginate(excess, trimmed_end)?;
        }

        Ok(true)
    }

    /// Collects the events spanned by moving a single cursor from `before`
    /// to `after` in `direction`, used to drive [`WindowObserver::on_event_inserted`].
    fn events_between(
        &self,
        graph: &FragmentSet,
        before: TimelineIndex,
        after: TimelineIndex,
        direction: Direction,
    ) -> Vec<Event> {
        let (lo, hi) = match direction {
            Direction::Backward => (after, before),
            Direction::Forward => (before, after),
        };
        collect_range(graph, lo, hi)
    }

    // ---- can_paginate ----------------------------------------------------

    /// Reports whether a `paginate(direction, ...)` call is worth making:
    /// does not guarantee more events exist server-side, only that a
    /// request (or in-memory extension) is possible. See spec §4.3.3.
    pub fn can_paginate(&self, direction: Direction) -> bool {
        let Some(cursor) = self.cursor(direction) else {
            return false;
        };

        let graph = self.graph.lock().unwrap();
        let fragment = graph.get(cursor.fragment());

        let has_room = match direction {
            Direction::Backward => cursor.offset() > fragment.min_offset(),
            Direction::Forward => cursor.offset() < fragment.max_offset(),
        };

        has_room || fragment.neighbour(direction).is_some() || fragment.token(direction).is_some()
    }

    // ---- paginate ----------------------------------------------------

    /// Runs the full pagination protocol for `direction`: in-memory
    /// extension first, then a single-flighted remote `messages` fetch,
    /// bounded-retried up to `request_limit` times. See spec §4.3.4.
    #[instrument(skip(self))]
    pub fn paginate(
        &mut self,
        direction: Direction,
        size: u16,
        make_request: bool,
        request_limit: u8,
    ) -> BoxFuture<'_, Result<bool>> {
        async move {
            if !self.is_loaded() {
                return Ok(false);
            }

            if self.extend(direction, size as u32)? {
                return Ok(true);
            }

            if !make_request || request_limit == 0 {
                return Ok(false);
            }

            let fragment_id = self.cursor(direction).expect("loaded").fragment();

            let keep_going = self.fetch_and_insert(fragment_id, direction, size).await?;
            if !keep_going {
                return Ok(false);
            }

            debug!(request_limit, "recursing to integrate newly fetched events");
            self.paginate(direction, size, true, request_limit - 1).await
        }
        .boxed()
    }

    /// Drives the single-flighted, shared portion of pagination: checking
    /// for (and joining) an in-flight request on this fragment/direction,
    /// or issuing a new one. Returns whether the caller should try
    /// integrating again (`paginate`'s recursive step).
    async fn fetch_and_insert(
        &self,
        fragment_id: FragmentId,
        direction: Direction,
        size: u16,
    ) -> Result<bool> {
        let existing = self.graph.lock().unwrap().get(fragment_id).peek_pending(direction);

        if let Some(promise) = existing {
            trace!("joining in-flight pagination");
            return promise.await.map_err(|e| Error::TransportFailed(Box::new(e)));
        }

        let token = self.graph.lock().unwrap().get(fragment_id).token(direction).cloned();
        let Some(token) = token else {
            return Ok(false);
        };

        let pager = Arc::clone(&self.pager);
        let graph = Arc::clone(&self.graph);

        let fut: BoxFuture<'static, Result<bool, SharedError>> = async move {
            let result = run_fetch(&graph, &pager, fragment_id, direction, size, token).await;
            graph.lock().unwrap().get_mut(fragment_id).take_pending(direction);
            result.map_err(|e| SharedError::from(&e))
        }
        .boxed();

        let shared = fut.shared();
        self.graph.lock().unwrap().get_mut(fragment_id).set_pending(direction, shared.clone());

        shared.await.map_err(|e| Error::TransportFailed(Box::new(e)))
    }

    // ---- unpaginate ----------------------------------------------------

    /// Trims `delta` events from `end`, moving that cursor inward. See spec
    /// §4.3.5.
    ///
    /// # Errors
    /// Returns [`Error::CannotUnpaginate`] if the cursor cannot traverse the
    /// full `delta`, which would mean `event_count`'s bookkeeping has
    /// diverged from what the fragment graph can actually reach.
    pub fn unpaginate(&mut self, delta: u32, end: WindowEnd) -> Result<()> {
        debug_assert!(delta <= self.event_count, "unpaginate: delta exceeds event_count");
        if delta == 0 {
            return Ok(());
        }

        let graph = self.graph.lock().unwrap();

        let traversed = match end {
            WindowEnd::Start => {
                let mut cursor = self.start.ok_or(Error::NotLoaded)?;
                let moved = cursor.advance(delta as i64, &graph);
                self.start = Some(cursor);
                moved
            }
            WindowEnd::End => {
                let mut cursor = self.end.ok_or(Error::NotLoaded)?;
                let moved = -cursor.advance(-(delta as i64), &graph);
                self.end = Some(cursor);
                moved
            }
        };
        drop(graph);

        if traversed != delta as i64 {
            return Err(Error::CannotUnpaginate { requested: delta, traversed: traversed as u32 });
        }

        self.event_count -= delta;

        if let Some(observer) = &self.observer {
            observer.on_window_trimmed(delta, end);
        }

        Ok(())
    }

    // ---- get_events ----------------------------------------------------

    /// Enumerates the events currently materialised in `[start, end)`, in
    /// traversal order. See spec §4.3.6.
    pub fn get_events(&self) -> Vec<Event> {
        let (Some(start), Some(end)) = (self.start, self.end) else {
            return Vec::new();
        };
        let graph = self.graph.lock().unwrap();
        collect_range(&graph, start, end)
    }
}

/// Walks forward from `start.fragment()` to `end.fragment()` inclusive,
/// collecting events in `[start, end)`. Shared by `get_events` and the
/// `extend` insertion-hook bookkeeping.
fn collect_range(graph: &FragmentSet, start: TimelineIndex, end: TimelineIndex) -> Vec<Event> {
    let mut result = Vec::new();
    let mut current = start.fragment();

    loop {
        let fragment = graph.get(current);

        let lo = if current == start.fragment() { fragment.storage_index(start.offset()) } else { 0 };
        let hi = if current == end.fragment() {
            fragment.storage_index(end.offset())
        } else {
            fragment.events().len()
        };

        result.extend(fragment.events()[lo..hi].iter().cloned());

        if current == end.fragment() {
            break;
        }

        match fragment.neighbour(Direction::Forward) {
            Some(next) => current = next,
            None => break,
        }
    }

    result
}

/// The shared, single-flighted body of one round of remote pagination:
/// fetch, deduplicate, insert, update the token. Returns whether the caller
/// should keep trying (either new events arrived, or a next token exists to
/// retry the known "non-empty token, empty chunk" server anomaly).
async fn run_fetch(
    graph: &FragmentGraph,
    pager: &Arc<dyn Pager>,
    fragment_id: FragmentId,
    direction: Direction,
    size: u16,
    token: Token,
) -> Result<bool> {
    let response = pager.messages(direction, size, Some(&token)).await?;
    let keep_going = !response.is_end_of_history();

    let mut graph = graph.lock().unwrap();

    let fresh: Vec<Event> = response
        .events
        .into_iter()
        .filter(|event| graph.fragment_for_event(&event.event_id().to_owned()).is_none())
        .collect();

    for event in &fresh {
        graph.index_event(event.event_id().to_owned(), fragment_id);
    }

    match direction {
        Direction::Backward => graph.get_mut(fragment_id).prepend(fresh),
        Direction::Forward => graph.get_mut(fragment_id).push(fresh),
    }

    graph.get_mut(fragment_id).set_token(direction, response.next_token);

    Ok(keep_going)
}
