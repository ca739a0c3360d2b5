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

mod concurrency;
mod load;

pub(crate) use fake_pager::{FakePager, MismatchedContextPager};

use super::*;
use crate::test_utils::{ev, event_id_n, evs};

/// Records every hook invocation it receives, in order, for assertion.
#[derive(Debug, Default)]
pub(crate) struct RecordingObserver {
    events: Mutex<Vec<(OwnedEventId, Direction)>>,
    trims: Mutex<Vec<(u32, WindowEnd)>>,
}

impl RecordingObserver {
    pub(crate) fn inserted(&self) -> Vec<(OwnedEventId, Direction)> {
        self.events.lock().unwrap().clone()
    }

    pub(crate) fn trimmed(&self) -> Vec<(u32, WindowEnd)> {
        self.trims.lock().unwrap().clone()
    }
}

impl WindowObserver for RecordingObserver {
    fn on_event_inserted(&self, event: &Event, direction: Direction) {
        self.events.lock().unwrap().push((event.event_id().to_owned(), direction));
    }

    fn on_window_trimmed(&self, count: u32, end: WindowEnd) {
        self.trims.lock().unwrap().push((count, end));
    }
}

/// A ten-event history (`e0..e9`), with a window loaded and centred on `e5`.
pub(crate) async fn loaded_window(
    pager: Arc<dyn Pager>,
    initial_size: u32,
) -> TimelineWindow {
    let mut window = TimelineWindow::new(pager);
    window.load(Some(event_id_n(5)), initial_size).await.unwrap();
    window
}
