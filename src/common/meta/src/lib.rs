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
pub mod ddl_manager;
pub mod error;
pub mod key;
pub mod kv_backend;
pub mod lock;
pub mod lock_key;
pub mod metrics;
pub mod mirror;
pub mod rpc;
pub mod table_name;
pub mod util;

pub use crate::ddl_manager::{DdlManager, DdlManagerRef};
pub use crate::key::namespace::{NamespaceDescriptor, NamespaceStore};
pub use crate::mirror::NamespaceMirror;
