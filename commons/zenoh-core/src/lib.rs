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
//! Internal crate for zenoh: error type, lock helpers and the
//! `Resolvable`/`Wait` builder pattern shared by every `zenoh` API builder.

pub use anyhow::Error;
pub use zenoh_macros::unstable;

/// The `Result` type used throughout zenoh.
pub type Result<T> = core::result::Result<T, Error>;

/// Build a [`Result::Err`] from a `format!`-like argument list.
#[macro_export]
macro_rules! zerror {
    ($($arg:tt)*) => {
        Err($crate::Error::msg(format!($($arg)*)))
    };
}

/// Return early with a [`zerror!`].
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return $crate::zerror!($($arg)*);
    };
}

/// Lock a `std::sync::Mutex`/`async_std::sync::Mutex`-like guard, panicking
/// only on poison (never expected on the session's lock set, which no
/// operation panics while holding).
#[macro_export]
macro_rules! zlock {
    ($mutex:expr) => {
        $mutex.lock().await
    };
}

/// Take a read guard on an `async_std::sync::RwLock`.
#[macro_export]
macro_rules! zread {
    ($rwlock:expr) => {
        $rwlock.read().await
    };
}

/// Take a write guard on an `async_std::sync::RwLock`.
#[macro_export]
macro_rules! zwrite {
    ($rwlock:expr) => {
        $rwlock.write().await
    };
}

/// Declare a set of `lazy_static`-backed, environment-overridable tuning
/// constants, in the style zenoh uses for every knob that may need
/// overriding without recompiling (lease durations, buffer sizes...).
#[macro_export]
macro_rules! zconfigurable {
    ($(#[$attr:meta])* static ref $N:ident : $T:ty = $e:expr; $($t:tt)*) => {
        $crate::lazy_static::lazy_static! {
            $(#[$attr])*
            #[doc = concat!("Overridable via the `", stringify!($N), "` environment variable.")]
            static ref $N : $T = {
                match std::env::var(stringify!($N)) {
                    Ok(value) => value.parse().unwrap_or($e),
                    Err(_) => $e,
                }
            };
        }
        $crate::zconfigurable!($($t)*);
    };
    ($(#[$attr:meta])* pub static ref $N:ident : $T:ty = $e:expr; $($t:tt)*) => {
        $crate::lazy_static::lazy_static! {
            $(#[$attr])*
            #[doc = concat!("Overridable via the `", stringify!($N), "` environment variable.")]
            pub static ref $N : $T = {
                match std::env::var(stringify!($N)) {
                    Ok(value) => value.parse().unwrap_or($e),
                    Err(_) => $e,
                }
            };
        }
        $crate::zconfigurable!($($t)*);
    };
    () => {};
}

pub use lazy_static;

/// A type which may be `.wait()`-ed synchronously or `.await`-ed
/// asynchronously, by way of [`Wait`] and [`std::future::IntoFuture`].
///
/// Every zenoh builder (`session.declare_subscriber(...)`, `publisher.put(...)`, ...)
/// implements this so the caller picks blocking or async at the call site
/// rather than the API surface forking in two.
pub trait Resolvable {
    type To: Send;
}

/// Blocking resolution of a [`Resolvable`].
pub trait Wait: Resolvable {
    fn wait(self) -> Self::To;
}

/// Async resolution of a [`Resolvable`], used by the blanket
/// `IntoFuture` impl below so every builder gets `.await` for free once it
/// implements this.
pub trait AsyncResolve: Resolvable {
    type Future: std::future::Future<Output = Self::To> + Send;
    fn res_async(self) -> Self::Future;
}

impl<T: AsyncResolve> std::future::IntoFuture for T {
    type Output = T::To;
    type IntoFuture = T::Future;

    fn into_future(self) -> Self::IntoFuture {
        self.res_async()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zerror_formats() {
        let e: Result<()> = zerror!("boom {}", 42);
        assert_eq!(e.unwrap_err().to_string(), "boom 42");
    }
}
