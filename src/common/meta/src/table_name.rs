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

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use snafu::ensure;

use crate::error::{self, Result};
use crate::key::namespace::{validate_namespace_name, DEFAULT_NAMESPACE_NAME};
use crate::key::NAME_PATTERN_REGEX;

/// The separator between the namespace and the table in a qualified name.
pub const NAMESPACE_DELIMITER: char = ':';

/// A table name qualified by its namespace, rendered as `namespace:table`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableName {
    pub namespace: String,
    pub table: String,
}

impl TableName {
    pub fn new(namespace: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            table: table.into(),
        }
    }

    /// Parses `namespace:table` or `table`, the latter belongs to the default namespace.
    pub fn parse(name: &str) -> Result<Self> {
        let table_name = match name.split_once(NAMESPACE_DELIMITER) {
            Some((namespace, table)) => TableName::new(namespace, table),
            None => TableName::new(DEFAULT_NAMESPACE_NAME, name),
        };
        table_name.validate()?;

        Ok(table_name)
    }

    pub fn validate(&self) -> Result<()> {
        validate_namespace_name(&self.namespace)?;
        ensure!(
            NAME_PATTERN_REGEX.is_match(&self.table),
            error::InvalidTableNameSnafu {
                name: self.to_string(),
                reason: "table name must be non-empty and only contain [a-zA-Z0-9_]",
            }
        );
        Ok(())
    }
}

impl Display for TableName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}{}", self.namespace, NAMESPACE_DELIMITER, self.table)
    }
}
