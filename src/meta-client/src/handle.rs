// Copyright 2023 Greptime Team
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

//! Single-resolution completion handles returned by the admin client.
//!
//! A [Completer] and its [CompletionHandle] share one slot. The completer is
//! consumed when it resolves the slot, so a handle resolves at most once. A
//! completer that is dropped without resolving resolves the handle with
//! [crate::error::Error::ChannelClosed].
//!
//! The handle can be awaited from async code, or waited on from a plain
//! thread with [CompletionHandle::wait].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use futures::task::AtomicWaker;
use parking_lot::{Condvar, Mutex};
use snafu::OptionExt;

use crate::error::{self, Result};

enum Slot<T> {
    Pending,
    Ready(Result<T>),
    Taken,
}

impl<T> Slot<T> {
    fn is_pending(&self) -> bool {
        matches!(self, Slot::Pending)
    }

    fn take(&mut self) -> Option<Result<T>> {
        match std::mem::replace(self, Slot::Taken) {
            Slot::Ready(result) => Some(result),
            other => {
                *self = other;
                None
            }
        }
    }
}

struct Shared<T> {
    slot: Mutex<Slot<T>>,
    ready: Condvar,
    waker: AtomicWaker,
}

impl<T> Shared<T> {
    fn resolve(&self, result: Result<T>) {
        {
            let mut slot = self.slot.lock();
            if !slot.is_pending() {
                return;
            }
            *slot = Slot::Ready(result);
        }
        self.ready.notify_all();
        self.waker.wake();
    }
}

/// Creates a connected completer and handle.
pub fn completion<T>() -> (Completer<T>, CompletionHandle<T>) {
    let shared = Arc::new(Shared {
        slot: Mutex::new(Slot::Pending),
        ready: Condvar::new(),
        waker: AtomicWaker::new(),
    });

    (
        Completer {
            shared: Some(shared.clone()),
        },
        CompletionHandle { shared },
    )
}

/// The write side of a [CompletionHandle].
pub struct Completer<T> {
    shared: Option<Arc<Shared<T>>>,
}

impl<T> Completer<T> {
    pub fn complete(mut self, result: Result<T>) {
        if let Some(shared) = self.shared.take() {
            shared.resolve(result);
        }
    }
}

impl<T> Drop for Completer<T> {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.take() {
            shared.resolve(error::ChannelClosedSnafu.fail());
        }
    }
}

/// The read side of an in-flight admin operation.
#[must_use = "the operation runs regardless, but its result is lost if the handle is dropped"]
pub struct CompletionHandle<T> {
    shared: Arc<Shared<T>>,
}

impl<T> CompletionHandle<T> {
    /// Creates a handle that is already resolved.
    pub fn ready(result: Result<T>) -> Self {
        let (completer, handle) = completion();
        completer.complete(result);
        handle
    }

    /// Returns true once the operation has a result.
    pub fn is_done(&self) -> bool {
        !self.shared.slot.lock().is_pending()
    }

    /// Blocks the current thread until the result arrives or `timeout`
    /// elapses.
    ///
    /// Must not be called from an async context, it parks the thread. A
    /// timeout only gives up waiting, the operation on the metasrv may still
    /// complete.
    pub fn wait(self, timeout: Duration) -> Result<T> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.shared.slot.lock();
        while slot.is_pending() {
            if self.shared.ready.wait_until(&mut slot, deadline).timed_out() && slot.is_pending()
            {
                return error::WaitTimeoutSnafu { timeout }.fail();
            }
        }
        slot.take().context(error::ChannelClosedSnafu)?
    }

    /// Awaits the result for at most `timeout`.
    ///
    /// Like [CompletionHandle::wait], a timeout does not cancel the
    /// operation.
    pub async fn join_timeout(self, timeout: Duration) -> Result<T> {
        match tokio::time::timeout(timeout, self).await {
            Ok(result) => result,
            Err(_) => error::WaitTimeoutSnafu { timeout }.fail(),
        }
    }
}

impl<T> Future for CompletionHandle<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.shared.waker.register(cx.waker());
        let mut slot = self.shared.slot.lock();
        match slot.take() {
            Some(result) => Poll::Ready(result),
            None if slot.is_pending() => Poll::Pending,
            None => Poll::Ready(error::ChannelClosedSnafu.fail()),
        }
    }
}
