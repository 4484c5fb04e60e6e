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

/// Logs an error. A leading `err;` attaches the error as a `err` field.
///
/// ```ignore
/// error!(e; "Failed to apply mirror update, namespace: {}", name);
/// error!("Mirror updater stopped");
/// ```
#[macro_export]
macro_rules! error {
    ($e:expr; target: $target:expr, $($arg:tt)+) => {{
        $crate::tracing::error!(target: $target, err = ?$e, $($arg)+)
    }};
    ($e:expr; $($arg:tt)+) => {{
        $crate::tracing::error!(err = ?$e, $($arg)+)
    }};
    ($($arg:tt)+) => {{
        $crate::tracing::error!($($arg)+)
    }};
}

/// Logs a warning. Accepts the same leading `err;` form as [error!].
#[macro_export]
macro_rules! warn {
    ($e:expr; target: $target:expr, $($arg:tt)+) => {{
        $crate::tracing::warn!(target: $target, err = ?$e, $($arg)+)
    }};
    ($e:expr; $($arg:tt)+) => {{
        $crate::tracing::warn!(err = ?$e, $($arg)+)
    }};
    ($($arg:tt)+) => {{
        $crate::tracing::warn!($($arg)+)
    }};
}

#[cfg(test)]
mod tests {
    #[derive(Debug)]
    struct FakeError;

    #[test]
    fn test_log_macros_compile() {
        let err = FakeError;
        crate::error!(err; "Failed to do something, value: {}", 42);
        crate::error!("plain error, value: {}", 42);
        crate::warn!(FakeError; target: "meta", "Failed to do something");
        crate::warn!("plain warning");
        crate::info!("info, value: {}", 1);
        crate::debug!("debug");
    }
}
