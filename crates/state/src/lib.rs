//! Typed state tables shared between the host and dynamically loaded extensions.
//!
//! Native code works with [`Table`] implementations keyed by one of the
//! [`StateType`] primitives. Extensions see the same tables through the flat ABI of
//! `lookout-table-api`, and can register tables of their own that native code then
//! uses like any other.

/// Bridge configuration.
pub mod config;
/// Conversion between values and the ABI union.
pub mod convert;
/// Table rows.
pub mod entry;
/// Error types.
pub mod error;
/// Extension-facing adapters and owner entry points.
pub mod plugin;
/// Name-keyed table directory.
pub mod registry;
/// Field schemas and accessors.
pub mod schema;
/// The table contract and its implementations.
pub mod table;
/// Key and field types.
pub mod types;

pub use config::{BridgeConfig, ConfigError};
pub use entry::{Entry, TableEntry};
pub use error::{ErrorKind, Result, StateError};
pub use plugin::{
	ForeignTable, LastError, NewPluginEntry, OutboundTable, PluginEntry, PluginModule, PluginOwner, PluginTable,
};
pub use registry::{AnyTable, SharedTable, TableRegistry, WeakTable, borrow_table};
pub use schema::{
	Accessor, DynamicFields, FieldInfo, FieldKind, FieldSet, SchemaId, StaticFields, StaticFieldsDef, TypedAccessor,
};
pub use table::{EntryMut, NativeTable, OwnedEntry, StateTable, Table};
pub use types::{StateKey, StateType, StateValue, Value};
