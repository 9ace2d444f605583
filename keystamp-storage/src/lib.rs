// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Keystamp Storage Layer
//!
//! Transactional ordered key-value storage consumed by the query layer.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                 RecordStore                  │
//! │   recovery check · get · set_all · keys      │
//! │                      │                       │
//! │              ┌───────▼───────┐               │
//! │              │    KvStore    │  view/update  │
//! │              └───────┬───────┘               │
//! │          ┌───────────┴───────────┐           │
//! │   ┌──────▼──────┐         ┌──────▼──────┐    │
//! │   │ RocksStore  │         │ MemoryStore │    │
//! │   │ column fams │         │ snapshots   │    │
//! │   └─────────────┘         └─────────────┘    │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! - **Single writer**: one `update` transaction runs at a time
//! - **Snapshot readers**: every `view` sees the state committed when it began
//! - **Namespaces**: each handle is bound to one namespace chosen at construction;
//!   RocksDB keeps each namespace in its own column family
//!
//! ## Usage
//!
//! ```rust,ignore
//! use keystamp_core::{Element, KeystampConfig};
//! use keystamp_storage::RecordStore;
//!
//! let store = RecordStore::open(&KeystampConfig::default())?;
//! store.set_all(&[Element::new("1700000000000;'host'web-1;", b"up".to_vec())])?;
//! ```

pub mod backend;
pub mod error;
pub mod memory;
pub mod records;
pub mod recovery;
pub mod rocks;
pub mod store;

pub use backend::StoreBackend;
pub use error::StoreError;
pub use memory::MemoryStore;
pub use records::{RecordStore, RecordStoreStats};
pub use recovery::RecoveryPolicy;
pub use rocks::RocksStore;
pub use store::{Cursor, KeyValue, KvStore, ReadTxn, WriteTxn};
