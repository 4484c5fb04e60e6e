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

use std::time::Duration;

use common_error::ext::ErrorExt;
use common_error::status_code::StatusCode;
use snafu::{Location, Snafu};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Illegal argument"))]
    IllegalArgument {
        #[snafu(implicit)]
        location: Location,
        source: common_meta::error::Error,
    },

    #[snafu(display("Namespace already exists: {}", namespace))]
    NamespaceExists {
        namespace: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Namespace not found: {}", namespace))]
    NamespaceNotFound {
        namespace: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Namespace {} is reserved: {}", namespace, msg))]
    ReservedNamespace {
        namespace: String,
        msg: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Namespace {} is not empty: {}", namespace, msg))]
    NamespaceNotEmpty {
        namespace: String,
        msg: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Table already exists: {}", table_name))]
    TableExists {
        table_name: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Table not found: {}", table_name))]
    TableNotFound {
        table_name: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Metasrv responded with error, code: {:?}, msg: {}", code, msg))]
    Server {
        code: StatusCode,
        msg: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Timeout after {:?} while waiting for the ddl result", timeout))]
    WaitTimeout {
        timeout: Duration,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Completion was dropped before the ddl result arrived"))]
    ChannelClosed {
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Failed to encode ddl request"))]
    EncodeRequest {
        #[snafu(implicit)]
        location: Location,
        source: common_meta::error::Error,
    },

    #[snafu(display("Failed to decode ddl response"))]
    DecodeResponse {
        #[snafu(implicit)]
        location: Location,
        source: common_meta::error::Error,
    },

    #[snafu(display("Failed to send ddl request to metasrv"))]
    Transport {
        #[snafu(implicit)]
        location: Location,
        source: common_meta::error::Error,
    },

    #[snafu(display("Unexpected ddl output"))]
    UnexpectedOutput {
        #[snafu(implicit)]
        location: Location,
        source: common_meta::error::Error,
    },

    #[snafu(display("No tokio runtime to drive the meta client"))]
    NoRuntime {
        #[snafu(source)]
        error: tokio::runtime::TryCurrentError,
        #[snafu(implicit)]
        location: Location,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns true if the error was raised by the client itself and the
    /// request never reached the metasrv.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Error::IllegalArgument { .. } | Error::EncodeRequest { .. } | Error::NoRuntime { .. }
        )
    }
}

impl ErrorExt for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::IllegalArgument { .. } => StatusCode::InvalidArguments,
            Error::NamespaceExists { .. } => StatusCode::NamespaceAlreadyExists,
            Error::NamespaceNotFound { .. } => StatusCode::NamespaceNotFound,
            Error::ReservedNamespace { .. } => StatusCode::ReservedNamespace,
            Error::NamespaceNotEmpty { .. } => StatusCode::NamespaceNotEmpty,
            Error::TableExists { .. } => StatusCode::TableAlreadyExists,
            Error::TableNotFound { .. } => StatusCode::TableNotFound,
            Error::Server { code, .. } => *code,
            Error::WaitTimeout { .. } => StatusCode::DeadlineExceeded,
            Error::ChannelClosed { .. } => StatusCode::Cancelled,
            Error::EncodeRequest { .. }
            | Error::DecodeResponse { .. }
            | Error::UnexpectedOutput { .. } => StatusCode::Unexpected,
            Error::Transport { source, .. } => source.status_code(),
            Error::NoRuntime { .. } => StatusCode::IllegalState,
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
