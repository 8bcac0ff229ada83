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
//! Concurrency primitives layered over `async-std`, used by the transport
//! and session layers but independent of both: a cancellation [`Signal`], a
//! generic [`Condition`] variable, a [`WaitGroup`] for bounded task
//! shutdown, and [`get_mut_unchecked`] for the single-owner teardown path
//! spec.md §9 describes ("stop tasks → drop entities → drop transport").

mod condition;
mod signal;
mod wait_group;

pub use condition::Condition;
pub use signal::Signal;
pub use wait_group::{WaitGroup, Worker};

use std::sync::Arc;

/// Obtains a mutable reference into an `Arc` known to have exactly one
/// strong reference at the call site (the transport/session teardown path,
/// after every task has joined and every user handle has been dropped).
///
/// # Panics
/// Panics (via `Arc::get_mut`'s `unwrap`) if another strong reference is
/// still alive — a bug in the caller's drop ordering, not a condition to
/// recover from.
pub fn get_mut_unchecked<T>(arc: &mut Arc<T>) -> &mut T {
    Arc::get_mut(arc).expect("Arc had more than one strong reference at teardown")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_mut_unchecked_succeeds_on_sole_owner() {
        let mut arc = Arc::new(5i32);
        *get_mut_unchecked(&mut arc) += 1;
        assert_eq!(*arc, 6);
    }

    #[test]
    #[should_panic]
    fn get_mut_unchecked_panics_on_shared_owner() {
        let mut arc = Arc::new(5i32);
        let _other = arc.clone();
        get_mut_unchecked(&mut arc);
    }
}
