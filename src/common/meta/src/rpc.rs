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

pub mod ddl;
pub mod store;

use std::fmt::{Display, Formatter};

use common_error::ext::ErrorExt;
use common_error::status_code::StatusCode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl KeyValue {
    #[inline]
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    #[inline]
    pub fn take_key(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.key)
    }

    #[inline]
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    #[inline]
    pub fn take_value(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.value)
    }
}

impl From<(Vec<u8>, Vec<u8>)> for KeyValue {
    fn from((key, value): (Vec<u8>, Vec<u8>)) -> Self {
        Self { key, value }
    }
}

impl Display for KeyValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} -> {}",
            String::from_utf8_lossy(&self.key),
            String::from_utf8_lossy(&self.value)
        )
    }
}

/// The error carried by a response header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorStatus {
    pub code: u32,
    pub err_msg: String,
}

impl ErrorStatus {
    pub fn from_error<E: ErrorExt>(err: &E) -> Self {
        Self {
            code: err.status_code() as u32,
            err_msg: err.output_msg(),
        }
    }

    /// Returns the status code, [StatusCode::Unknown] if it is not recognized.
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u32(self.code).unwrap_or(StatusCode::Unknown)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestHeader {
    pub request_id: u64,
}

impl RequestHeader {
    pub fn new(request_id: u64) -> Self {
        Self { request_id }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseHeader {
    pub request_id: u64,
    pub error: Option<ErrorStatus>,
}

impl ResponseHeader {
    pub fn success(request_id: u64) -> Self {
        Self {
            request_id,
            error: None,
        }
    }

    pub fn failed(request_id: u64, error: ErrorStatus) -> Self {
        Self {
            request_id,
            error: Some(error),
        }
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    #[inline]
    pub fn error_code(&self) -> u32 {
        match self.error.as_ref() {
            Some(err) => err.code,
            None => StatusCode::Success as u32,
        }
    }

    #[inline]
    pub fn error_msg(&self) -> String {
        match self.error.as_ref() {
            Some(err) => err.err_msg.clone(),
            None => "None".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error;

    #[test]
    fn test_response_header() {
        let header = ResponseHeader::failed(
            101,
            ErrorStatus {
                code: StatusCode::NamespaceNotFound as u32,
                err_msg: "test".to_string(),
            },
        );
        assert!(!header.is_success());
        assert_eq!(101, header.request_id);
        assert_eq!(StatusCode::NamespaceNotFound as u32, header.error_code());
        assert_eq!("test".to_string(), header.error_msg());

        let header = ResponseHeader::success(102);
        assert!(header.is_success());
        assert_eq!(0, header.error_code());
    }

    #[test]
    fn test_error_status_from_error() {
        let err = error::NamespaceNotFoundSnafu { namespace: "ns1" }.build();
        let status = ErrorStatus::from_error(&err);
        assert_eq!(StatusCode::NamespaceNotFound, status.status_code());
        assert!(status.err_msg.contains("ns1"));

        let status = ErrorStatus {
            code: 99999,
            err_msg: String::new(),
        };
        assert_eq!(StatusCode::Unknown, status.status_code());
    }
}
