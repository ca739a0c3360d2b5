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

use std::sync::Arc;

use super::*;

fn history() -> Vec<Event> {
    evs(0..10)
}

#[tokio::test]
async fn load_centres_the_window_on_the_target_event() {
    let pager: Arc<dyn Pager> = Arc::new(FakePager::new(history(), 4, 4));
    let mut window = TimelineWindow::new(pager);

    // e5 with initial_size 4: half = 2, so event_index(5) + 2 = 7 as the end,
    // start = 7 - 4 = 3. Window should materialise e3..e7 (exclusive).
    window.load(Some(event_id_n(5)), 4).await.unwrap();

    assert!(window.is_loaded());
    let ids: Vec<_> = window.get_events().iter().map(|e| e.event_id().to_owned()).collect();
    assert_eq!(ids, vec![event_id_n(3), event_id_n(4), event_id_n(5), event_id_n(6)]);
}

#[tokio::test]
async fn load_clamps_to_the_fragment_boundary_near_the_start() {
    let pager: Arc<dyn Pager> = Arc::new(FakePager::new(history(), 4, 4));
    let mut window = TimelineWindow::new(pager);

    // e0 with a generous initial_size: there's no room before it, so the
    // window should start at e0 rather than go negative.
    window.load(Some(event_id_n(0)), 10).await.unwrap();

    let ids: Vec<_> = window.get_events().iter().map(|e| e.event_id().to_owned()).collect();
    assert_eq!(ids.first(), Some(&event_id_n(0)));
}

#[tokio::test]
async fn load_with_no_event_id_anchors_to_the_live_fragment_end() {
    let pager: Arc<dyn Pager> = Arc::new(FakePager::new(history(), 4, 4));
    let graph = Arc::new(Mutex::new(FragmentSet::new()));
    let live = graph.lock().unwrap().apply_sync_batch(evs(0..5), false, None);
    assert_eq!(graph.lock().unwrap().fragment_count(), 1);

    let mut window = TimelineWindow::with_graph(Arc::clone(&graph), pager);
    window.load(None, 3).await.unwrap();

    assert!(window.is_loaded());
    let ids: Vec<_> = window.get_events().iter().map(|e| e.event_id().to_owned()).collect();
    // Anchored at the end of the live fragment: the last 3 of e0..e5.
    assert_eq!(ids, vec![event_id_n(2), event_id_n(3), event_id_n(4)]);
    assert_eq!(graph.lock().unwrap().live_fragment(), Some(live));
}

#[tokio::test]
async fn load_resolves_synchronously_when_the_event_is_already_indexed() {
    let pager = Arc::new(FakePager::new(history(), 4, 4));
    let graph = Arc::new(Mutex::new(FragmentSet::new()));
    graph.lock().unwrap().apply_sync_batch(evs(0..10), false, None);

    // No context fetch should be necessary: the event is already indexed in
    // the shared graph by a prior sync, so `load` must not ask the pager.
    let mut window = TimelineWindow::with_graph(graph, pager.clone());
    window.load(Some(event_id_n(5)), 4).await.unwrap();
    assert!(window.is_loaded());
    assert_eq!(pager.context_call_count(), 0);
}

#[tokio::test]
async fn load_surfaces_event_not_in_context_when_the_pager_lies() {
    let pager: Arc<dyn Pager> =
        Arc::new(MismatchedContextPager { decoy: ev(99) });
    let mut window = TimelineWindow::new(pager);

    let err = window.load(Some(event_id_n(5)), 4).await.unwrap_err();
    assert!(matches!(err, Error::EventNotInContext(id) if id == event_id_n(5)));
}

#[tokio::test]
async fn methods_other_than_load_fail_before_loading() {
    let pager: Arc<dyn Pager> = Arc::new(FakePager::new(history(), 4, 4));
    let mut window = TimelineWindow::new(pager);

    assert!(matches!(window.extend(Direction::Forward, 1), Err(Error::NotLoaded)));
    assert_eq!(window.get_events(), Vec::new());
    assert!(!window.can_paginate(Direction::Forward));
}
