//! Tables implemented by an extension, driven through the native [`Table`] contract.
//!
//! The schema is entirely dynamic and owned by the extension, which may add fields on
//! its own. Every schema query re-lists the foreign fields and reconciles the cached
//! accessors against them by identity: known indices must keep their name and type,
//! new trailing fields are resolved and appended.

use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;
use std::rc::Rc;

use lookout_table_api::{RawEntry, RawField};

use super::module::{ForeignTable, ListedField};
use crate::entry::{TableEntry, check_write};
use crate::error::{Result, StateError};
use crate::schema::{Accessor, DynamicFields, FieldInfo, FieldKind, FieldSet, SchemaId, StaticFields};
use crate::table::Table;
use crate::types::{StateKey, StateType, StateValue, Value};

/// Foreign field handles by dynamic index. Shared with entries so that fields
/// discovered after an entry was created are usable on it.
type FieldHandles = Rc<RefCell<Vec<NonNull<RawField>>>>;

/// State shared by a table and the entries it hands out.
#[derive(Debug)]
struct Binding {
	foreign: Rc<ForeignTable>,
	schema: SchemaId,
	handles: FieldHandles,
}

impl Binding {
	fn handle(&self, accessor: &Accessor) -> Result<NonNull<RawField>> {
		if accessor.schema() != self.schema || accessor.kind() != FieldKind::Dynamic {
			return Err(StateError::ForeignSchema {
				table: self.foreign.name().to_string(),
				what: "field accessor",
			});
		}
		self.handles
			.borrow()
			.get(accessor.index())
			.copied()
			.ok_or_else(|| StateError::AccessorNotFound {
				table: self.foreign.name().to_string(),
				index: accessor.index(),
			})
	}

	fn read(&self, entry: NonNull<RawEntry>, accessor: &Accessor) -> Result<Value> {
		let field = self.handle(accessor)?;
		self.foreign.read_field(entry, field, accessor.ty())
	}

	fn write(&self, entry: NonNull<RawEntry>, accessor: &Accessor, value: Value) -> Result<()> {
		let field = self.handle(accessor)?;
		check_write(accessor, &value)?;
		self.foreign.write_field(entry, field, &value)
	}
}

/// A table owned by an extension.
pub struct PluginTable<K: StateKey> {
	binding: Rc<Binding>,
	static_fields: StaticFields,
	dynamic_fields: DynamicFields,
	_key: PhantomData<fn() -> K>,
}

impl<K: StateKey> fmt::Debug for PluginTable<K> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PluginTable")
			.field("foreign", &self.binding.foreign)
			.field("dynamic_fields", &self.dynamic_fields.len())
			.finish()
	}
}

impl<K: StateKey> PluginTable<K> {
	/// Wraps `foreign`, checking that it is keyed by `K`.
	pub fn new(foreign: Rc<ForeignTable>) -> Result<Self> {
		if foreign.key_type() != K::STATE_TYPE {
			return Err(StateError::KeyTypeMismatch {
				table: foreign.name().to_string(),
				expected: K::STATE_TYPE,
				actual: foreign.key_type(),
			});
		}
		let schema = SchemaId::next();
		let name = foreign.name().to_string();
		Ok(Self {
			static_fields: FieldSet::new(&name, schema, FieldKind::Static),
			dynamic_fields: FieldSet::new(&name, schema, FieldKind::Dynamic),
			binding: Rc::new(Binding {
				foreign,
				schema,
				handles: Rc::default(),
			}),
			_key: PhantomData,
		})
	}

	pub fn foreign(&self) -> &Rc<ForeignTable> {
		&self.binding.foreign
	}

	fn diverged(&self, index: usize, reason: String) -> StateError {
		tracing::warn!(table = %self.name(), index, %reason, "foreign schema diverged");
		StateError::SchemaDiverged {
			table: self.name().to_string(),
			index,
			reason,
		}
	}

	/// Re-lists the foreign fields and brings the cached schema up to date. On failure
	/// the cache is left as it was.
	fn refresh(&mut self) -> Result<()> {
		let listed = self.binding.foreign.list_fields()?;
		let known = self.dynamic_fields.len();
		if listed.len() < known {
			return Err(self.diverged(listed.len(), format!("field list shrank from {known} to {}", listed.len())));
		}
		for (info, found) in self.dynamic_fields.iter().zip(&listed) {
			if info.name() != found.name || info.ty() != found.ty {
				let reason = format!(
					"expected {} '{}', found {} '{}'",
					info.ty(),
					info.name(),
					found.ty,
					found.name
				);
				return Err(self.diverged(info.index(), reason));
			}
			if info.read_only() != found.read_only {
				let reason = format!(
					"field '{}' changed read-only from {} to {}",
					info.name(),
					info.read_only(),
					found.read_only
				);
				return Err(self.diverged(info.index(), reason));
			}
		}
		if listed.len() == known {
			return Ok(());
		}

		let mut grown = self.dynamic_fields.clone();
		let mut handles = Vec::with_capacity(listed.len() - known);
		for ListedField { name, ty, read_only } in &listed[known..] {
			grown.push(name, *ty, *read_only)?;
			handles.push(self.binding.foreign.get_field(name, *ty)?);
		}
		self.dynamic_fields = grown;
		self.binding.handles.borrow_mut().extend(handles);
		tracing::debug!(table = %self.name(), from = known, to = listed.len(), "foreign schema grew");
		Ok(())
	}
}

impl<K: StateKey> Table for PluginTable<K> {
	type Key = K;
	type Entry<'a> = PluginEntry;
	type NewEntry = NewPluginEntry;

	fn name(&self) -> &str {
		self.binding.foreign.name()
	}

	fn static_fields(&self) -> &StaticFields {
		&self.static_fields
	}

	fn dynamic_fields(&mut self) -> Result<&DynamicFields> {
		self.refresh()?;
		Ok(&self.dynamic_fields)
	}

	fn add_dynamic_field(&mut self, name: &str, ty: StateType) -> Result<FieldInfo> {
		self.refresh()?;
		if self.dynamic_fields.contains(name) {
			return Err(StateError::FieldExists {
				table: self.name().to_string(),
				field: name.to_string(),
			});
		}
		self.binding.foreign.add_field(name, ty)?;
		self.refresh()?;
		let info = self
			.dynamic_fields
			.get(name)
			.cloned()
			.ok_or_else(|| self.diverged(self.dynamic_fields.len(), format!("added field '{name}' is not listed")))?;
		if info.ty() != ty {
			return Err(self.diverged(info.index(), format!("added field '{name}' is listed as {}", info.ty())));
		}
		Ok(info)
	}

	fn entries_count(&self) -> Result<usize> {
		let n = self.binding.foreign.size()?;
		usize::try_from(n).map_err(|_| StateError::ResourceExhausted(format!("table size {n} exceeds usize")))
	}

	fn clear_entries(&mut self) -> Result<()> {
		self.binding.foreign.clear()
	}

	fn foreach_entry(&mut self, _pred: &mut dyn FnMut(&mut dyn TableEntry) -> bool) -> Result<bool> {
		Err(StateError::unsupported(self.name(), "foreach"))
	}

	fn new_entry(&self) -> Result<NewPluginEntry> {
		let raw = self.binding.foreign.create_entry()?;
		Ok(NewPluginEntry {
			binding: self.binding.clone(),
			raw: Some(raw),
		})
	}

	fn get_entry(&mut self, key: &K) -> Result<Option<PluginEntry>> {
		let raw = self.binding.foreign.get_entry(&key.clone().into_value())?;
		Ok(raw.map(|raw| PluginEntry {
			binding: self.binding.clone(),
			raw,
		}))
	}

	fn add_entry(&mut self, key: K, mut entry: NewPluginEntry) -> Result<PluginEntry> {
		if !Rc::ptr_eq(&entry.binding, &self.binding) {
			return Err(StateError::ForeignSchema {
				table: self.name().to_string(),
				what: "entry",
			});
		}
		let raw = entry.raw.ok_or(StateError::NullPointer("entry"))?;
		// `entry` still owns `raw` here, so a failed insertion destroys it on return.
		let attached = self.binding.foreign.add_entry(&key.into_value(), raw)?;
		entry.raw = None;
		tracing::trace!(table = %self.name(), "entry inserted");
		Ok(PluginEntry {
			binding: self.binding.clone(),
			raw: attached,
		})
	}

	fn erase_entry(&mut self, key: &K) -> Result<bool> {
		self.binding.foreign.erase(&key.clone().into_value())
	}
}

/// An entry attached to a foreign table. Never destroys the foreign row.
pub struct PluginEntry {
	binding: Rc<Binding>,
	raw: NonNull<RawEntry>,
}

impl fmt::Debug for PluginEntry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PluginEntry")
			.field("table", &self.binding.foreign.name())
			.field("raw", &self.raw)
			.finish()
	}
}

impl PluginEntry {
	pub fn as_raw(&self) -> NonNull<RawEntry> {
		self.raw
	}
}

impl TableEntry for PluginEntry {
	fn get_field(&self, accessor: &Accessor) -> Result<Value> {
		self.binding.read(self.raw, accessor)
	}

	fn set_field(&mut self, accessor: &Accessor, value: Value) -> Result<()> {
		self.binding.write(self.raw, accessor, value)
	}
}

/// An unattached foreign entry. Destroyed through the foreign writer when dropped,
/// unless it was consumed by a successful [`Table::add_entry`].
pub struct NewPluginEntry {
	binding: Rc<Binding>,
	raw: Option<NonNull<RawEntry>>,
}

impl fmt::Debug for NewPluginEntry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("NewPluginEntry")
			.field("table", &self.binding.foreign.name())
			.field("raw", &self.raw)
			.finish()
	}
}

impl NewPluginEntry {
	fn raw(&self) -> Result<NonNull<RawEntry>> {
		self.raw.ok_or(StateError::NullPointer("entry"))
	}
}

impl TableEntry for NewPluginEntry {
	fn get_field(&self, accessor: &Accessor) -> Result<Value> {
		self.binding.read(self.raw()?, accessor)
	}

	fn set_field(&mut self, accessor: &Accessor, value: Value) -> Result<()> {
		self.binding.write(self.raw()?, accessor, value)
	}
}

impl Drop for NewPluginEntry {
	fn drop(&mut self) {
		if let Some(raw) = self.raw.take() {
			self.binding.foreign.destroy_entry(raw);
		}
	}
}
