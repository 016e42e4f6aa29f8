//! Safe wrappers over the foreign side of the table ABI.

use std::ffi::CString;
use std::fmt;
use std::ptr::NonNull;
use std::rc::Rc;

use lookout_table_api::{PluginLastErrorFn, RawEntry, RawField, RawPluginState, StateData, TableInput};

use crate::convert::{OutgoingData, string_from_ptr, value_from_data};
use crate::error::{Result, StateError};
use crate::types::{StateType, Value};

/// Host-side descriptor of one loaded extension.
pub struct PluginModule {
	name: String,
	state: *mut RawPluginState,
	get_last_error: Option<PluginLastErrorFn>,
}

impl fmt::Debug for PluginModule {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PluginModule").field("name", &self.name).finish_non_exhaustive()
	}
}

impl PluginModule {
	/// # Safety
	///
	/// `state` and `get_last_error` must stay valid for as long as any table or entry
	/// of this module is reachable from the host.
	pub unsafe fn new(name: impl Into<String>, state: *mut RawPluginState, get_last_error: Option<PluginLastErrorFn>) -> Self {
		Self {
			name: name.into(),
			state,
			get_last_error,
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// The module's own description of its last failure, or an empty string.
	pub fn last_error(&self) -> String {
		match self.get_last_error {
			// SAFETY: validity promised at construction.
			Some(f) => unsafe { string_from_ptr(f(self.state)) },
			None => String::new(),
		}
	}

	/// Converts a failure reported by this module into an error carrying its text.
	pub(crate) fn failure(&self, op: &str) -> StateError {
		let mut message = self.last_error();
		if message.is_empty() {
			message = format!("{op} failed");
		}
		tracing::warn!(module = %self.name, op, error = %message, "foreign table call failed");
		StateError::Foreign {
			module: self.name.clone(),
			message,
		}
	}
}

/// A table implemented by an extension, as registered through `add_table`.
pub struct ForeignTable {
	input: TableInput,
	name: String,
	key_type: StateType,
	module: Rc<PluginModule>,
}

impl fmt::Debug for ForeignTable {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ForeignTable")
			.field("name", &self.name)
			.field("key_type", &self.key_type)
			.field("module", &self.module.name)
			.finish_non_exhaustive()
	}
}

/// One field as listed by the foreign side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ListedField {
	pub name: String,
	pub ty: StateType,
	pub read_only: bool,
}

impl ForeignTable {
	/// # Safety
	///
	/// The handle and every function in `input` must stay valid for the lifetime of the
	/// returned value. `input.name` must be null or a valid C string for this call.
	pub unsafe fn new(input: &TableInput, module: Rc<PluginModule>) -> Result<Self> {
		// SAFETY: per the caller's contract.
		let name = unsafe { string_from_ptr(input.name) };
		if input.table.is_null() {
			return Err(StateError::NullPointer("table"));
		}
		Ok(Self {
			input: *input,
			key_type: StateType::from_raw(input.key_type)?,
			name,
			module,
		})
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn key_type(&self) -> StateType {
		self.key_type
	}

	pub fn module(&self) -> &Rc<PluginModule> {
		&self.module
	}

	/// The raw input, for forwarding calls unchanged.
	pub fn input(&self) -> &TableInput {
		&self.input
	}

	fn slot<F>(&self, f: Option<F>, op: &'static str) -> Result<F> {
		f.ok_or_else(|| StateError::unsupported(&self.name, op))
	}

	pub(crate) fn list_fields(&self) -> Result<Vec<ListedField>> {
		let f = self.slot(self.input.fields.list_table_fields, "list_fields")?;
		let mut n = 0u32;
		// SAFETY: validity promised at construction.
		let ptr = unsafe { f(self.input.table, &mut n) };
		if ptr.is_null() {
			if n == 0 {
				return Ok(Vec::new());
			}
			return Err(self.module.failure("list_fields"));
		}
		// SAFETY: the callee returned `n` contiguous descriptors.
		let raw = unsafe { std::slice::from_raw_parts(ptr, n as usize) };
		raw.iter()
			.map(|info| {
				Ok(ListedField {
					// SAFETY: names are valid until the next call on this table.
					name: unsafe { string_from_ptr(info.name) },
					ty: StateType::from_raw(info.field_type)?,
					read_only: info.read_only != 0,
				})
			})
			.collect()
	}

	pub(crate) fn get_field(&self, name: &str, ty: StateType) -> Result<NonNull<RawField>> {
		let f = self.slot(self.input.fields.get_table_field, "get_field")?;
		let name = CString::new(name).map_err(|_| StateError::InteriorNul)?;
		// SAFETY: validity promised at construction; `name` outlives the call.
		let raw = unsafe { f(self.input.table, name.as_ptr(), ty.to_raw()) };
		NonNull::new(raw).ok_or_else(|| self.module.failure("get_field"))
	}

	pub(crate) fn add_field(&self, name: &str, ty: StateType) -> Result<NonNull<RawField>> {
		let f = self.slot(self.input.fields.add_table_field, "add_field")?;
		let name = CString::new(name).map_err(|_| StateError::InteriorNul)?;
		// SAFETY: as above.
		let raw = unsafe { f(self.input.table, name.as_ptr(), ty.to_raw()) };
		NonNull::new(raw).ok_or_else(|| self.module.failure("add_field"))
	}

	pub(crate) fn size(&self) -> Result<u64> {
		let f = self.slot(self.input.reader.get_table_size, "get_size")?;
		// SAFETY: validity promised at construction.
		match unsafe { f(self.input.table) } {
			u64::MAX => Err(self.module.failure("get_size")),
			n => Ok(n),
		}
	}

	/// Null from the foreign side reads as an absent key.
	pub(crate) fn get_entry(&self, key: &Value) -> Result<Option<NonNull<RawEntry>>> {
		let f = self.slot(self.input.reader.get_table_entry, "get_entry")?;
		let key = OutgoingData::new(key)?;
		// SAFETY: `key` outlives the call.
		Ok(NonNull::new(unsafe { f(self.input.table, key.as_ptr()) }))
	}

	pub(crate) fn read_field(&self, entry: NonNull<RawEntry>, field: NonNull<RawField>, ty: StateType) -> Result<Value> {
		let f = self.slot(self.input.reader.read_entry_field, "read_field")?;
		let mut out = StateData::zeroed();
		// SAFETY: handles come from this table.
		let rc = unsafe { f(self.input.table, entry.as_ptr(), field.as_ptr(), &mut out) };
		if !rc.is_success() {
			return Err(self.module.failure("read_field"));
		}
		// SAFETY: the callee wrote the member selected by the field type.
		Ok(unsafe { value_from_data(&out, ty) })
	}

	pub(crate) fn write_field(&self, entry: NonNull<RawEntry>, field: NonNull<RawField>, value: &Value) -> Result<()> {
		let f = self.slot(self.input.writer.write_entry_field, "write_field")?;
		let data = OutgoingData::new(value)?;
		// SAFETY: handles come from this table; `data` outlives the call.
		let rc = unsafe { f(self.input.table, entry.as_ptr(), field.as_ptr(), data.as_ptr()) };
		if !rc.is_success() {
			return Err(self.module.failure("write_field"));
		}
		Ok(())
	}

	pub(crate) fn clear(&self) -> Result<()> {
		let f = self.slot(self.input.writer.clear_table, "clear")?;
		// SAFETY: validity promised at construction.
		if !unsafe { f(self.input.table) }.is_success() {
			return Err(self.module.failure("clear"));
		}
		Ok(())
	}

	/// Returns `false` when the foreign side reports failure, which includes an
	/// absent key.
	pub(crate) fn erase(&self, key: &Value) -> Result<bool> {
		let f = self.slot(self.input.writer.erase_table_entry, "erase_entry")?;
		let key = OutgoingData::new(key)?;
		// SAFETY: `key` outlives the call.
		Ok(unsafe { f(self.input.table, key.as_ptr()) }.is_success())
	}

	pub(crate) fn create_entry(&self) -> Result<NonNull<RawEntry>> {
		let f = self.slot(self.input.writer.create_table_entry, "create_entry")?;
		// SAFETY: validity promised at construction.
		NonNull::new(unsafe { f(self.input.table) }).ok_or_else(|| self.module.failure("create_entry"))
	}

	pub(crate) fn destroy_entry(&self, entry: NonNull<RawEntry>) {
		match self.input.writer.destroy_table_entry {
			// SAFETY: `entry` is unattached and owned by the caller.
			Some(f) => unsafe { f(self.input.table, entry.as_ptr()) },
			None => tracing::warn!(table = %self.name, "no destroy_entry; unattached entry leaked"),
		}
	}

	/// Inserts an unattached entry. On failure the entry is still the caller's.
	pub(crate) fn add_entry(&self, key: &Value, entry: NonNull<RawEntry>) -> Result<NonNull<RawEntry>> {
		let f = self.slot(self.input.writer.add_table_entry, "add_entry")?;
		let key = OutgoingData::new(key)?;
		// SAFETY: `key` outlives the call; `entry` is unattached.
		let raw = unsafe { f(self.input.table, key.as_ptr(), entry.as_ptr()) };
		NonNull::new(raw).ok_or_else(|| self.module.failure("add_entry"))
	}
}
