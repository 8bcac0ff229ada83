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
//! A one-shot, clonable cancellation flag: exactly the "shutdown flag
//! checked between blocking operations" of spec.md §5's suspension-points
//! discussion. A read task races `link.recv()` against `signal.wait()`;
//! `stop()` flips the flag and wakes every waiter, so a bounded join on the
//! task never blocks once the flag is set.

use event_listener::Event;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Clone)]
pub struct Signal {
    triggered: Arc<AtomicBool>,
    event: Arc<Event>,
}

impl Default for Signal {
    fn default() -> Self {
        Self::new()
    }
}

impl Signal {
    pub fn new() -> Self {
        Self {
            triggered: Arc::new(AtomicBool::new(false)),
            event: Arc::new(Event::new()),
        }
    }

    /// Sets the flag and wakes every pending and future `wait()`.
    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::SeqCst);
        self.event.notify(usize::MAX);
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Resolves immediately if already triggered, otherwise waits for the
    /// next `trigger()`.
    pub async fn wait(&self) {
        loop {
            if self.is_triggered() {
                return;
            }
            let listener = self.event.listen();
            if self.is_triggered() {
                return;
            }
            listener.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_resolves_immediately_once_triggered() {
        async_std::task::block_on(async {
            let signal = Signal::new();
            signal.trigger();
            signal.wait().await;
        });
    }

    #[test]
    fn wait_wakes_on_trigger_from_another_task() {
        async_std::task::block_on(async {
            let signal = Signal::new();
            let waiter = signal.clone();
            let handle = async_std::task::spawn(async move {
                waiter.wait().await;
            });
            signal.trigger();
            handle.await;
        });
    }
}
