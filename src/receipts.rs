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

//! Integration contract with the out-of-core receipts/unread-counting layer
//! (spec §4.6).
//!
//! Decryption and unread-count fix-up live outside this crate entirely; what
//! the core promises is that event identities never change across
//! decryption, and that [`thread_context_for`] gives a stable answer to
//! "which receipt does this event count towards" so that upstream fix-up
//! logic can recompute unread state without re-deriving thread membership
//! itself.

use ruma::OwnedEventId;

use crate::event::{Event, Relation};

/// Which receipt an event counts towards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ThreadContext {
    /// The event counts towards the main-timeline receipt.
    Main,
    /// The event counts towards the named thread's receipt.
    Thread(OwnedEventId),
}

/// Resolves the receipt thread-context for `event`, per spec §4.6:
///
/// - `Main` if the event has no thread root, *or* is itself a thread root,
///   *or* relates to a thread root by something other than a thread-reply
///   relation (e.g. a reaction to a thread root still reads on the main
///   timeline);
/// - otherwise, `Thread(event.thread_root_id())`.
///
/// `is_thread_root` must be supplied by the caller: whether a given event is
/// the root of a thread is a property of the wider relation graph (does
/// *anything* point at it as a thread root), not of the event in isolation,
/// so it can't be derived from `event` alone.
pub fn thread_context_for(event: &Event, is_thread_root: bool) -> ThreadContext {
    if is_thread_root {
        return ThreadContext::Main;
    }

    match event.thread_root_id() {
        None => ThreadContext::Main,
        Some(root) => match event.relation() {
            // A thread-reply to this very root counts towards the thread.
            Relation::ThreadReply(reply_root) if reply_root == root => {
                ThreadContext::Thread(root.to_owned())
            }
            // Any other relation (reply, edit, reaction) targeting a thread
            // root still reads on the main timeline.
            _ => ThreadContext::Main,
        },
    }
}

#[cfg(test)]
mod tests {
    use ruma::MilliSecondsSinceUnixEpoch;

    use super::*;
    use crate::test_utils::event_id_n;

    fn root_id() -> OwnedEventId {
        event_id_n(0)
    }

    fn event(thread_root_id: Option<OwnedEventId>, relation: Relation) -> Event {
        Event::new(
            event_id_n(1),
            ruma::user_id!("@alice:example.org").to_owned(),
            MilliSecondsSinceUnixEpoch::now(),
            thread_root_id,
            relation,
        )
    }

    #[test]
    fn event_with_no_thread_root_reads_on_main() {
        let e = event(None, Relation::None);
        assert_eq!(thread_context_for(&e, false), ThreadContext::Main);
    }

    #[test]
    fn thread_root_itself_reads_on_main() {
        let e = event(None, Relation::None);
        assert_eq!(thread_context_for(&e, true), ThreadContext::Main);
    }

    #[test]
    fn thread_reply_reads_on_its_thread() {
        let root = root_id();
        let e = event(Some(root.clone()), Relation::ThreadReply(root.clone()));
        assert_eq!(thread_context_for(&e, false), ThreadContext::Thread(root));
    }

    #[test]
    fn reaction_to_a_thread_root_still_reads_on_main() {
        let root = root_id();
        let e = event(Some(root.clone()), Relation::Reaction(root));
        assert_eq!(thread_context_for(&e, false), ThreadContext::Main);
    }
}
