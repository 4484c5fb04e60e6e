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

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

/// The interval between two checks of [wait_for].
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_millis(20);

/// Polls `condition` until it returns `true` or `timeout` elapses.
///
/// Returns whether the condition was met. The condition is always checked at
/// least once, even with a zero timeout.
pub async fn wait_for<F, Fut>(timeout: Duration, condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    wait_for_with_interval(timeout, DEFAULT_CHECK_INTERVAL, condition).await
}

/// Same as [wait_for] but with a custom check interval.
pub async fn wait_for_with_interval<F, Fut>(
    timeout: Duration,
    interval: Duration,
    mut condition: F,
) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if condition().await {
            return true;
        }
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        tokio::time::sleep(interval.min(deadline - now)).await;
    }
}
