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
//! Scouting (spec.md §4.8): a short-lived UDP multicast SCOUT/HELLO
//! exchange, independent of any established session. Unlike the unicast/
//! multicast transports, a scout never goes through the [`zenoh_link_commons`]
//! link capability — it owns a bare datagram socket for the duration of the
//! scouting window and is gone once that window closes.

use std::future::Future;
use std::net::{Ipv4Addr, SocketAddr};
use std::pin::Pin;
use std::time::Duration;

use async_std::net::UdpSocket;
use futures::{select, FutureExt};
use log::{debug, warn};

use zenoh_core::{bail, AsyncResolve, Resolvable, Result as ZResult, Wait};
use zenoh_protocol::core::WhatAmI;
use zenoh_protocol::scouting::Hello;
use zenoh_protocol::transport::ZENOH_PROTO_VERSION;
use zenoh_sync::Signal;

use zenoh_config::Config;

const SCOUT_BUFFER_SIZE: usize = 65_535;

/// A live scouting window, returned by [`ScoutBuilder::wait`]/`.await`.
/// Dropping or calling [`Scout::stop`] closes the listening socket right
/// away instead of waiting out the rest of the configured timeout.
pub struct Scout {
    signal: Signal,
    task: Option<async_std::task::JoinHandle<()>>,
}

impl Scout {
    /// Stops listening and waits for the background task to return.
    pub async fn stop(mut self) {
        self.signal.trigger();
        if let Some(task) = self.task.take() {
            task.await;
        }
    }
}

impl Drop for Scout {
    fn drop(&mut self) {
        self.signal.trigger();
    }
}

/// Builds a scouting session (spec.md §4.8): emits SCOUT on
/// `config.scouting.multicast_address` and feeds every well-formed HELLO it
/// collects to `callback`, for up to `config.scouting.timeout`.
pub struct ScoutBuilder {
    what: WhatAmI,
    config: Config,
    callback: Option<Box<dyn FnMut(Hello) + Send + 'static>>,
}

/// Starts building a scout for peers/routers matching `what`.
pub fn scout(what: WhatAmI, config: Config) -> ScoutBuilder {
    ScoutBuilder {
        what,
        config,
        callback: None,
    }
}

impl ScoutBuilder {
    /// Sets the per-`Hello` callback. Required before resolving: scouting
    /// without a callback has nothing to report discoveries to.
    pub fn callback<F>(mut self, callback: F) -> Self
    where
        F: FnMut(Hello) + Send + 'static,
    {
        self.callback = Some(Box::new(callback));
        self
    }
}

impl Resolvable for ScoutBuilder {
    type To = ZResult<Scout>;
}

impl Wait for ScoutBuilder {
    fn wait(self) -> ZResult<Scout> {
        async_std::task::block_on(self.res_async())
    }
}

impl AsyncResolve for ScoutBuilder {
    type Future = Pin<Box<dyn Future<Output = ZResult<Scout>> + Send>>;

    fn res_async(self) -> Self::Future {
        Box::pin(async move {
            let Some(mut callback) = self.callback else {
                bail!("scout() requires a callback: call .callback(...) before resolving");
            };
            if !self.config.scouting.multicast_enabled {
                bail!("scouting/multicast/enabled is false in this config");
            }
            let group: SocketAddr = self
                .config
                .scouting
                .multicast_address
                .parse()
                .map_err(|e| zenoh_core::Error::msg(format!("invalid scouting multicast address: {e}")))?;
            let SocketAddr::V4(group_v4) = group else {
                bail!("only IPv4 scouting multicast addresses are supported");
            };

            let bind_addr: SocketAddr = (Ipv4Addr::UNSPECIFIED, group_v4.port()).into();
            let socket = UdpSocket::bind(bind_addr)
                .await
                .map_err(|e| zenoh_core::Error::msg(format!("scouting socket bind failed: {e}")))?;
            let iface = match &self.config.scouting.multicast_interface {
                Some(iface) => iface
                    .parse()
                    .map_err(|e| zenoh_core::Error::msg(format!("invalid scouting/multicast/interface: {e}")))?,
                None => Ipv4Addr::UNSPECIFIED,
            };
            socket
                .join_multicast_v4(*group_v4.ip(), iface)
                .map_err(|e| zenoh_core::Error::msg(format!("failed to join scouting multicast group: {e}")))?;

            let scout_msg = zenoh_protocol::scouting::Scout {
                version: ZENOH_PROTO_VERSION,
                what: self.what.to_bits(),
            };
            let mut wbuf = Vec::new();
            if !zenoh_codec::write_scout(&mut wbuf, &scout_msg) {
                bail!("failed to encode SCOUT message");
            }
            socket
                .send_to(&wbuf, group)
                .await
                .map_err(|e| zenoh_core::Error::msg(format!("failed to send SCOUT: {e}")))?;

            let signal = Signal::new();
            let timeout = self.config.scouting.timeout;
            let task_signal = signal.clone();
            let task = async_std::task::spawn(async move {
                run_scout_loop(socket, timeout, task_signal, &mut callback).await;
            });

            Ok(Scout {
                signal,
                task: Some(task),
            })
        })
    }
}

async fn run_scout_loop(
    socket: UdpSocket,
    timeout: Duration,
    signal: Signal,
    callback: &mut (dyn FnMut(Hello) + Send),
) {
    let deadline = async_std::task::sleep(timeout).fuse();
    futures::pin_mut!(deadline);
    loop {
        let mut buf = vec![0u8; SCOUT_BUFFER_SIZE];
        let recv_fut = socket.recv_from(&mut buf).fuse();
        let stop_fut = signal.wait().fuse();
        futures::pin_mut!(recv_fut, stop_fut);
        let (len, _src) = select! {
            r = recv_fut => match r {
                Ok(ok) => ok,
                Err(e) => {
                    debug!("scouting socket read failed: {e}");
                    break;
                }
            },
            _ = stop_fut => break,
            _ = deadline => break,
        };
        let mut reader: &[u8] = &buf[..len];
        match zenoh_codec::read_hello(&mut reader) {
            Ok(hello) => callback(hello),
            Err(e) => warn!("dropping malformed HELLO: {:?}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scout_without_callback_fails_fast() {
        async_std::task::block_on(async {
            let config = Config::default();
            let result = scout(WhatAmI::Peer, config).wait();
            assert!(result.is_err());
        });
    }

    #[test]
    fn scout_with_multicast_disabled_fails_fast() {
        async_std::task::block_on(async {
            let mut config = Config::default();
            config.scouting.multicast_enabled = false;
            let result = scout(WhatAmI::Peer, config).callback(|_| {}).wait();
            assert!(result.is_err());
        });
    }
}
