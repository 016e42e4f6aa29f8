//! The typed table contract and its implementations.
//!
//! [`Table`] is generic over the key type through an associated type, so the key
//! type is fixed at compile time for native code. Entry handles are associated types
//! as well: native tables hand out borrows of their boxed rows, foreign tables hand
//! out wrappers around foreign handles.
//!
//! [`StateTable`] is the closed set of implementations the registry stores. The
//! variant is chosen when the table is registered and never re-detected.

use std::collections::hash_map::Entry as Slot;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::entry::{Entry, TableEntry};
use crate::error::{Result, StateError};
use crate::plugin::{NewPluginEntry, PluginEntry, PluginTable};
use crate::schema::{
	Accessor, DynamicFields, FieldInfo, FieldKind, FieldSet, SchemaId, StaticFields, StaticFieldsDef,
	TypedAccessor,
};
use crate::types::{StateKey, StateType, StateValue, Value};

/// A table mapping keys of one type to entries.
pub trait Table {
	type Key: StateKey;
	/// Handle to an attached entry.
	type Entry<'a>: TableEntry
	where
		Self: 'a;
	/// An unattached entry, owned by its creator until inserted.
	type NewEntry: TableEntry;

	fn name(&self) -> &str;

	fn key_type(&self) -> StateType {
		<Self::Key as StateValue>::STATE_TYPE
	}

	fn static_fields(&self) -> &StaticFields;

	/// Current dynamic fields. Implementations backed by another module refresh
	/// their view of the schema on every call.
	fn dynamic_fields(&mut self) -> Result<&DynamicFields>;

	/// Adds a dynamic field. Fails if the name is taken by any static or dynamic
	/// field; the schema is unchanged on failure.
	fn add_dynamic_field(&mut self, name: &str, ty: StateType) -> Result<FieldInfo>;

	fn entries_count(&self) -> Result<usize>;

	/// Destroys all attached entries. The schema is preserved.
	fn clear_entries(&mut self) -> Result<()>;

	/// Visits entries in unspecified order. Returns `Ok(false)` iff `pred` stopped
	/// the iteration.
	fn foreach_entry(&mut self, pred: &mut dyn FnMut(&mut dyn TableEntry) -> bool) -> Result<bool>;

	fn new_entry(&self) -> Result<Self::NewEntry>;

	fn get_entry(&mut self, key: &Self::Key) -> Result<Option<Self::Entry<'_>>>;

	/// Inserts `entry` under `key`, taking ownership of it. An entry already stored
	/// under `key` is destroyed and replaced.
	fn add_entry(&mut self, key: Self::Key, entry: Self::NewEntry) -> Result<Self::Entry<'_>>;

	/// Destroys and removes the entry under `key`. Returns `false` if absent.
	fn erase_entry(&mut self, key: &Self::Key) -> Result<bool>;

	/// Resolves a field by name across both schema parts.
	fn accessor(&mut self, name: &str) -> Result<Accessor> {
		let fixed = self.static_fields().accessor(name).ok();
		let dynamic = self.dynamic_fields()?;
		match (fixed, dynamic.get(name)) {
			(Some(_), Some(_)) => Err(StateError::AmbiguousField(name.to_string())),
			(Some(accessor), None) => Ok(accessor),
			(None, Some(info)) => Ok(dynamic.accessor_for(info)),
			(None, None) => dynamic.accessor(name),
		}
	}

	/// Resolves a field by name, checking that it is declared as `T`.
	fn typed_accessor<T: StateValue>(&mut self, name: &str) -> Result<TypedAccessor<T>> {
		TypedAccessor::checked(self.accessor(name)?)
	}
}

/// A table implemented natively, with rows stored in this process.
#[derive(Debug)]
pub struct NativeTable<K: StateKey> {
	name: Rc<str>,
	static_fields: FieldSet,
	dynamic_fields: FieldSet,
	entries: FxHashMap<K, Box<Entry>>,
}

impl<K: StateKey> NativeTable<K> {
	/// Creates a table with no static fields.
	pub fn new(name: &str) -> Self {
		let schema = SchemaId::next();
		Self {
			name: Rc::from(name),
			static_fields: FieldSet::new(name, schema, FieldKind::Static),
			dynamic_fields: FieldSet::new(name, schema, FieldKind::Dynamic),
			entries: FxHashMap::default(),
		}
	}

	/// Creates a table with the given static fields.
	pub fn with_static_fields(name: &str, def: StaticFieldsDef) -> Result<Self> {
		let schema = SchemaId::next();
		Ok(Self {
			name: Rc::from(name),
			static_fields: def.build(name, schema)?,
			dynamic_fields: FieldSet::new(name, schema, FieldKind::Dynamic),
			entries: FxHashMap::default(),
		})
	}

	pub fn schema(&self) -> SchemaId {
		self.static_fields.schema()
	}

	/// Inserts `entry` under `key`. On failure the entry is handed back untouched.
	pub(crate) fn insert_or_return(
		&mut self,
		key: K,
		entry: Box<Entry>,
	) -> std::result::Result<&mut Entry, (StateError, Box<Entry>)> {
		if entry.schema() != self.schema() {
			let err = StateError::ForeignSchema {
				table: self.name.to_string(),
				what: "entry",
			};
			return Err((err, entry));
		}
		if let Err(e) = self.entries.try_reserve(1) {
			return Err((StateError::ResourceExhausted(e.to_string()), entry));
		}
		let slot = match self.entries.entry(key) {
			Slot::Occupied(mut occupied) => {
				tracing::trace!(table = %self.name, "replacing entry");
				occupied.insert(entry);
				occupied.into_mut()
			}
			Slot::Vacant(vacant) => vacant.insert(entry),
		};
		Ok(&mut **slot)
	}
}

impl<K: StateKey> Table for NativeTable<K> {
	type Key = K;
	type Entry<'a> = &'a mut Entry;
	type NewEntry = Box<Entry>;

	fn name(&self) -> &str {
		&self.name
	}

	fn static_fields(&self) -> &StaticFields {
		&self.static_fields
	}

	fn dynamic_fields(&mut self) -> Result<&DynamicFields> {
		Ok(&self.dynamic_fields)
	}

	fn add_dynamic_field(&mut self, name: &str, ty: StateType) -> Result<FieldInfo> {
		if self.static_fields.contains(name) {
			return Err(StateError::StaticFieldConflict(name.to_string()));
		}
		let info = self.dynamic_fields.push(name, ty, false)?.clone();
		tracing::debug!(table = %self.name, field = name, %ty, index = info.index(), "dynamic field added");
		Ok(info)
	}

	fn entries_count(&self) -> Result<usize> {
		Ok(self.entries.len())
	}

	fn clear_entries(&mut self) -> Result<()> {
		self.entries.clear();
		Ok(())
	}

	fn foreach_entry(&mut self, pred: &mut dyn FnMut(&mut dyn TableEntry) -> bool) -> Result<bool> {
		for entry in self.entries.values_mut() {
			if !pred(&mut **entry) {
				return Ok(false);
			}
		}
		Ok(true)
	}

	fn new_entry(&self) -> Result<Box<Entry>> {
		let statics = self.static_fields.iter().map(|f| Value::zero(f.ty())).collect();
		Ok(Box::new(Entry::new(self.name.clone(), self.schema(), statics)))
	}

	fn get_entry(&mut self, key: &K) -> Result<Option<&mut Entry>> {
		Ok(self.entries.get_mut(key).map(|e| &mut **e))
	}

	fn add_entry(&mut self, key: K, entry: Box<Entry>) -> Result<&mut Entry> {
		self.insert_or_return(key, entry).map_err(|(err, _)| err)
	}

	fn erase_entry(&mut self, key: &K) -> Result<bool> {
		Ok(self.entries.remove(key).is_some())
	}
}

/// The implementations a registered table can have.
#[derive(Debug)]
pub enum StateTable<K: StateKey> {
	Native(NativeTable<K>),
	Plugin(PluginTable<K>),
}

/// Attached entry of a [`StateTable`].
#[derive(Debug)]
pub enum EntryMut<'a> {
	Native(&'a mut Entry),
	Plugin(PluginEntry),
}

/// Unattached entry of a [`StateTable`].
#[derive(Debug)]
pub enum OwnedEntry {
	Native(Box<Entry>),
	Plugin(NewPluginEntry),
}

impl TableEntry for EntryMut<'_> {
	fn get_field(&self, accessor: &Accessor) -> Result<Value> {
		match self {
			EntryMut::Native(e) => e.get_field(accessor),
			EntryMut::Plugin(e) => e.get_field(accessor),
		}
	}

	fn set_field(&mut self, accessor: &Accessor, value: Value) -> Result<()> {
		match self {
			EntryMut::Native(e) => e.set_field(accessor, value),
			EntryMut::Plugin(e) => e.set_field(accessor, value),
		}
	}
}

impl TableEntry for OwnedEntry {
	fn get_field(&self, accessor: &Accessor) -> Result<Value> {
		match self {
			OwnedEntry::Native(e) => e.get_field(accessor),
			OwnedEntry::Plugin(e) => e.get_field(accessor),
		}
	}

	fn set_field(&mut self, accessor: &Accessor, value: Value) -> Result<()> {
		match self {
			OwnedEntry::Native(e) => e.set_field(accessor, value),
			OwnedEntry::Plugin(e) => e.set_field(accessor, value),
		}
	}
}

impl<K: StateKey> From<NativeTable<K>> for StateTable<K> {
	fn from(table: NativeTable<K>) -> Self {
		StateTable::Native(table)
	}
}

impl<K: StateKey> From<PluginTable<K>> for StateTable<K> {
	fn from(table: PluginTable<K>) -> Self {
		StateTable::Plugin(table)
	}
}

impl<K: StateKey> StateTable<K> {
	pub fn is_plugin(&self) -> bool {
		matches!(self, StateTable::Plugin(_))
	}

	pub fn as_native_mut(&mut self) -> Option<&mut NativeTable<K>> {
		match self {
			StateTable::Native(t) => Some(t),
			StateTable::Plugin(_) => None,
		}
	}

	pub fn as_plugin(&self) -> Option<&PluginTable<K>> {
		match self {
			StateTable::Plugin(t) => Some(t),
			StateTable::Native(_) => None,
		}
	}

	fn mismatched_entry(&self) -> StateError {
		StateError::ForeignSchema {
			table: self.name().to_string(),
			what: "entry",
		}
	}
}

impl<K: StateKey> Table for StateTable<K> {
	type Key = K;
	type Entry<'a> = EntryMut<'a>;
	type NewEntry = OwnedEntry;

	fn name(&self) -> &str {
		match self {
			StateTable::Native(t) => t.name(),
			StateTable::Plugin(t) => t.name(),
		}
	}

	fn static_fields(&self) -> &StaticFields {
		match self {
			StateTable::Native(t) => t.static_fields(),
			StateTable::Plugin(t) => t.static_fields(),
		}
	}

	fn dynamic_fields(&mut self) -> Result<&DynamicFields> {
		match self {
			StateTable::Native(t) => t.dynamic_fields(),
			StateTable::Plugin(t) => t.dynamic_fields(),
		}
	}

	fn add_dynamic_field(&mut self, name: &str, ty: StateType) -> Result<FieldInfo> {
		match self {
			StateTable::Native(t) => t.add_dynamic_field(name, ty),
			StateTable::Plugin(t) => t.add_dynamic_field(name, ty),
		}
	}

	fn entries_count(&self) -> Result<usize> {
		match self {
			StateTable::Native(t) => t.entries_count(),
			StateTable::Plugin(t) => t.entries_count(),
		}
	}

	fn clear_entries(&mut self) -> Result<()> {
		match self {
			StateTable::Native(t) => t.clear_entries(),
			StateTable::Plugin(t) => t.clear_entries(),
		}
	}

	fn foreach_entry(&mut self, pred: &mut dyn FnMut(&mut dyn TableEntry) -> bool) -> Result<bool> {
		match self {
			StateTable::Native(t) => t.foreach_entry(pred),
			StateTable::Plugin(t) => t.foreach_entry(pred),
		}
	}

	fn new_entry(&self) -> Result<OwnedEntry> {
		match self {
			StateTable::Native(t) => t.new_entry().map(OwnedEntry::Native),
			StateTable::Plugin(t) => t.new_entry().map(OwnedEntry::Plugin),
		}
	}

	fn get_entry(&mut self, key: &K) -> Result<Option<EntryMut<'_>>> {
		match self {
			StateTable::Native(t) => Ok(t.get_entry(key)?.map(EntryMut::Native)),
			StateTable::Plugin(t) => Ok(t.get_entry(key)?.map(EntryMut::Plugin)),
		}
	}

	fn add_entry(&mut self, key: K, entry: OwnedEntry) -> Result<EntryMut<'_>> {
		match (self, entry) {
			(StateTable::Native(t), OwnedEntry::Native(e)) => t.add_entry(key, e).map(EntryMut::Native),
			(StateTable::Plugin(t), OwnedEntry::Plugin(e)) => t.add_entry(key, e).map(EntryMut::Plugin),
			(this, _) => Err(this.mismatched_entry()),
		}
	}

	fn erase_entry(&mut self, key: &K) -> Result<bool> {
		match self {
			StateTable::Native(t) => t.erase_entry(key),
			StateTable::Plugin(t) => t.erase_entry(key),
		}
	}
}

#[cfg(test)]
mod tests;
