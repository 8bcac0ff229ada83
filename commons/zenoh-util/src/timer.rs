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
//! A minimal periodic-event scheduler, used by the transport's lease and
//! keep-alive tasks (spec §4.5/§4.6) instead of hand-rolling a sleep loop at
//! each call site.

use async_std::task::JoinHandle;
use std::time::Duration;

/// Spawns `event` on a fixed `period`, stopping when the returned
/// [`TimerHandle`] is dropped.
pub struct Timer;

impl Timer {
    pub fn periodic<F, Fut>(period: Duration, mut event: F) -> TimerHandle
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = bool> + Send,
    {
        let handle = async_std::task::spawn(async move {
            loop {
                async_std::task::sleep(period).await;
                if !event().await {
                    break;
                }
            }
        });
        TimerHandle { handle: Some(handle) }
    }
}

/// Dropping this stops the associated periodic task the next time it wakes.
pub struct TimerHandle {
    handle: Option<JoinHandle<()>>,
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            async_std::task::spawn(async move {
                handle.cancel().await;
            });
        }
    }
}
