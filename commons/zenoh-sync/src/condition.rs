//
// Copyright (c) 2022 ZettaScale Technology
//
// This program and the accompanying materials are made available under the
// terms of the Eclipse Public License 2.0 which is available at
// http://www.eclipse.org/legal/epl-2.0, or the Apache License, Version 2.0
// which is available at https://www.apache.org/licenses/LICENSE-2.0.
//
// SPDX-License-Identifier: EPL-2.0 OR Apache-2.0
//
// Contributors:
//   ZettaScale Zenoh Team, <zenoh@zettascale.tech>
//
//! An async condition variable over [`event_listener`], used where a
//! `PendingQuery` (spec.md §4.4) needs to block a synchronous caller until a
//! `RESPONSE_FINAL` or timeout notifies it — the "condition-variable waits
//! (used for pending-query synchronous retrieval via a channel)" suspension
//! point of spec.md §5. Unlike [`crate::Signal`], `notify_one`/`notify_all`
//! are not sticky: a wait that starts after the notification misses it,
//! matching `std::sync::Condvar` semantics rather than a persistent flag.

use event_listener::Event;

#[derive(Default)]
pub struct Condition {
    event: Event,
}

impl Condition {
    pub fn new() -> Self {
        Self {
            event: Event::new(),
        }
    }

    pub fn notify_one(&self) {
        self.event.notify(1);
    }

    pub fn notify_all(&self) {
        self.event.notify(usize::MAX);
    }

    /// Registers for the next notification. Callers must re-check their
    /// predicate after `listen()` resolves, since spurious wakeups across a
    /// `notify_all()` fanning out to unrelated waiters are possible.
    pub async fn listen(&self) {
        self.event.listen().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn notify_one_wakes_a_waiting_task() {
        async_std::task::block_on(async {
            let cond = Arc::new(Condition::new());
            let waiter_cond = cond.clone();
            let handle = async_std::task::spawn(async move {
                waiter_cond.listen().await;
            });
            // give the spawned task a chance to start listening
            async_std::task::sleep(std::time::Duration::from_millis(20)).await;
            cond.notify_one();
            handle.await;
        });
    }
}
