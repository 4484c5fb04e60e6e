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

use common_error::ext::ErrorExt;
use common_error::status_code::StatusCode;
use snafu::{Location, Snafu};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Failed to initialize namespace metadata"))]
    InitMetadata {
        #[snafu(implicit)]
        location: Location,
        source: common_meta::error::Error,
    },

    #[snafu(display("Failed to start namespace mirror updater"))]
    StartMirrorUpdater {
        #[snafu(implicit)]
        location: Location,
        source: common_meta::error::Error,
    },

    #[snafu(display("Failed to submit ddl task"))]
    SubmitDdlTask {
        #[snafu(implicit)]
        location: Location,
        source: common_meta::error::Error,
    },

    #[snafu(display("Failed to decode ddl request"))]
    DecodeDdlRequest {
        #[snafu(implicit)]
        location: Location,
        source: common_meta::error::Error,
    },

    #[snafu(display("Failed to encode ddl response"))]
    EncodeDdlResponse {
        #[snafu(implicit)]
        location: Location,
        source: common_meta::error::Error,
    },

    #[snafu(display("Failed to load layered options"))]
    LoadLayeredOptions {
        #[snafu(implicit)]
        location: Location,
        source: common_config::error::Error,
    },

    #[snafu(display("Metasrv is not started"))]
    NotStarted {
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Failed to join mock server task"))]
    JoinServerTask {
        #[snafu(source)]
        error: tokio::task::JoinError,
        #[snafu(implicit)]
        location: Location,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

impl ErrorExt for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::InitMetadata { source, .. }
            | Error::StartMirrorUpdater { source, .. }
            | Error::SubmitDdlTask { source, .. }
            | Error::DecodeDdlRequest { source, .. }
            | Error::EncodeDdlResponse { source, .. } => source.status_code(),
            Error::LoadLayeredOptions { source, .. } => source.status_code(),
            Error::NotStarted { .. } => StatusCode::IllegalState,
            Error::JoinServerTask { .. } => StatusCode::Internal,
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
