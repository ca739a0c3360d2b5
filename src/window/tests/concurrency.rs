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

/// Two windows sharing one fragment graph both try to paginate the same
/// fragment, in the same direction, at once. Per the single-flight
/// contract on [`crate::linked_chunk::EventFragment`], only one `messages`
/// call should reach the pager; the second caller joins the first's
/// in-flight result instead of issuing its own.
#[tokio::test]
async fn concurrent_paginate_on_a_shared_fragment_issues_one_request() {
    let history = evs(0..20);
    let pager = Arc::new(FakePager::gated(history, 4, 1));

    let graph = Arc::new(Mutex::new(FragmentSet::new()));

    let mut window_a = TimelineWindow::with_graph(Arc::clone(&graph), pager.clone());
    window_a.load(Some(event_id_n(5)), 3).await.unwrap();

    let mut window_b = TimelineWindow::with_graph(Arc::clone(&graph), pager.clone());
    window_b.load(Some(event_id_n(5)), 3).await.unwrap();

    let release_once_started = async {
        pager.wait_until_started().await;
        pager.release();
    };

    let (result_a, result_b, ()) = tokio::join!(
        window_a.paginate(Direction::Backward, 4, true, 1),
        window_b.paginate(Direction::Backward, 4, true, 1),
        release_once_started,
    );

    assert!(result_a.unwrap());
    assert!(result_b.unwrap());
    assert_eq!(pager.messages_call_count(), 1);
}
