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

use std::str::Utf8Error;

use common_error::ext::{BoxedError, ErrorExt};
use common_error::status_code::StatusCode;
use serde_json::error::Error as JsonError;
use snafu::{Location, Snafu};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {

    #[snafu(display("Namespace already exists: {}", namespace))]
    NamespaceAlreadyExists {
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

    #[snafu(display("Reserved namespace {} can not be removed", namespace))]
    ReservedNamespace {
        namespace: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display(
        "Only empty namespaces can be removed, namespace: {}, tables: {}",
        namespace,
        tables
    ))]
    NamespaceNotEmpty {
        namespace: String,
        tables: usize,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Illegal namespace name '{}': {}", name, reason))]
    InvalidNamespaceName {
        name: String,
        reason: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Illegal table name '{}': {}", name, reason))]
    InvalidTableName {
        name: String,
        reason: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Table already exists, table: {}", table_name))]
    TableAlreadyExists {
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

    #[snafu(display("Invalid metadata, err: {}", err_msg))]
    InvalidMetadata {
        err_msg: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Failed to convert raw key to str"))]
    ConvertRawKey {
        #[snafu(implicit)]
        location: Location,
        #[snafu(source)]
        error: Utf8Error,
    },


    #[snafu(display("Failed to serde json"))]
    SerdeJson {
        #[snafu(source)]
        error: JsonError,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Failed to encode rpc message"))]
    EncodeRpcMessage {
        #[snafu(source)]
        error: JsonError,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Failed to decode rpc message"))]
    DecodeRpcMessage {
        #[snafu(source)]
        error: JsonError,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Unexpected ddl output, expected: {}, actual: {}", expected, actual))]
    UnexpectedDdlOutput {
        expected: String,
        actual: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Coordination service error: {}", err_msg))]
    Coordination {
        err_msg: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Mirror updater has been stopped"))]
    MirrorUpdaterStopped {
        #[snafu(implicit)]
        location: Location,
    },


    #[snafu(display("Unexpected: {err_msg}"))]
    Unexpected {
        err_msg: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Failed to execute via external source"))]
    External {
        #[snafu(implicit)]
        location: Location,
        source: BoxedError,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

impl ErrorExt for Error {
    fn status_code(&self) -> StatusCode {
        use Error::*;
        match self {
            NamespaceAlreadyExists { .. } => StatusCode::NamespaceAlreadyExists,
            NamespaceNotFound { .. } => StatusCode::NamespaceNotFound,
            ReservedNamespace { .. } => StatusCode::ReservedNamespace,
            NamespaceNotEmpty { .. } => StatusCode::NamespaceNotEmpty,
            TableAlreadyExists { .. } => StatusCode::TableAlreadyExists,
            TableNotFound { .. } => StatusCode::TableNotFound,

            InvalidNamespaceName { .. }
            | InvalidTableName { .. }
            | DecodeRpcMessage { .. } => StatusCode::InvalidArguments,

            InvalidMetadata { .. }
            | ConvertRawKey { .. }
            | SerdeJson { .. }
            | EncodeRpcMessage { .. }
            | UnexpectedDdlOutput { .. }
            | Unexpected { .. } => StatusCode::Unexpected,

            Coordination { .. } => StatusCode::StorageUnavailable,
            MirrorUpdaterStopped { .. } => StatusCode::IllegalState,

            External { source, .. } => source.status_code(),
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

impl Error {
    /// Returns true if the error means the namespace does not exist.
    pub fn is_namespace_not_found(&self) -> bool {
        matches!(self, Error::NamespaceNotFound { .. })
    }

    /// Returns true if the error means the namespace already exists.
    pub fn is_namespace_exists(&self) -> bool {
        matches!(self, Error::NamespaceAlreadyExists { .. })
    }
}
