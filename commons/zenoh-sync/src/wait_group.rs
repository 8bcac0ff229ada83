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
//! `WaitGroup`: bounded join of the read task and lease task on transport
//! teardown (spec.md §5, "stop operations set the flag and wait for the
//! task to observe it"). Each task clones a `Worker` on spawn and drops it
//! right before returning; `wait()` resolves once every clone (and the
//! original `WaitGroup`) has been dropped.

use flume::{Receiver, Sender};

pub struct WaitGroup {
    tx: Sender<()>,
    rx: Receiver<()>,
}

#[derive(Clone)]
pub struct Worker(Sender<()>);

impl Default for WaitGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitGroup {
    pub fn new() -> Self {
        let (tx, rx) = flume::unbounded();
        Self { tx, rx }
    }

    pub fn worker(&self) -> Worker {
        Worker(self.tx.clone())
    }

    /// Waits until every [`Worker`] (and this `WaitGroup`'s own sender) has
    /// been dropped.
    pub async fn wait(self) {
        drop(self.tx);
        // recv_async() returns Err once every sender is gone; that's the signal.
        let _ = self.rx.recv_async().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_resolves_once_all_workers_drop() {
        async_std::task::block_on(async {
            let wg = WaitGroup::new();
            let w1 = wg.worker();
            let w2 = wg.worker();
            let h1 = async_std::task::spawn(async move {
                async_std::task::sleep(std::time::Duration::from_millis(10)).await;
                drop(w1);
            });
            let h2 = async_std::task::spawn(async move {
                async_std::task::sleep(std::time::Duration::from_millis(20)).await;
                drop(w2);
            });
            wg.wait().await;
            h1.await;
            h2.await;
        });
    }
}
