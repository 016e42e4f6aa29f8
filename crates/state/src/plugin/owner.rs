//! Host-side record of one extension and the owner entry points it calls.

use std::cell::RefCell;
use std::ffi::{CString, c_char};
use std::fmt;
use std::ptr;
use std::rc::Rc;

use lookout_table_api::{
	PluginRc, RawEntry, RawField, RawOwner, RawTable, StateData, StateTypeTag, TableFieldInfo, TableFieldsVtable,
	TableInfo, TableInput, TableReaderVtable, TableWriterVtable, TablesOwnerVtable,
};
use rustc_hash::FxHashMap;

use super::inbound::PluginTable;
use super::module::{ForeignTable, PluginModule};
use super::outbound::OutboundTable;
use super::{LastError, guard};
use crate::config::BridgeConfig;
use crate::convert::string_from_ptr;
use crate::error::{Result, StateError};
use crate::registry::TableRegistry;
use crate::types::{StateKey, StateType};

/// A table handed to the extension: the flat input it points into, and the adapter
/// behind it.
struct AccessedTable {
	input: TableInput,
	adapter: Box<OutboundTable>,
}

/// Host-side record of one loaded extension.
///
/// Boxed, and handed to the extension as `*mut RawOwner`. Tables the extension
/// registers are unregistered when the owner is dropped.
pub struct PluginOwner {
	registry: Rc<RefCell<TableRegistry>>,
	module: Rc<PluginModule>,
	config: BridgeConfig,
	last_error: Rc<LastError>,
	accessed: RefCell<FxHashMap<String, Box<AccessedTable>>>,
	retired: RefCell<Vec<Box<AccessedTable>>>,
	infos: RefCell<Vec<TableInfo>>,
	info_names: RefCell<Vec<CString>>,
	owned: RefCell<Vec<String>>,
}

impl fmt::Debug for PluginOwner {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PluginOwner")
			.field("module", &self.module.name())
			.field("owned", &self.owned)
			.finish_non_exhaustive()
	}
}

fn register<K: StateKey>(registry: &mut TableRegistry, foreign: Rc<ForeignTable>) -> Result<()> {
	registry.add_table(PluginTable::<K>::new(foreign)?)?;
	Ok(())
}

/// Registers an extension table under the key type it declares.
pub fn register_foreign(registry: &mut TableRegistry, foreign: Rc<ForeignTable>) -> Result<()> {
	match foreign.key_type() {
		StateType::I8 => register::<i8>(registry, foreign),
		StateType::I16 => register::<i16>(registry, foreign),
		StateType::I32 => register::<i32>(registry, foreign),
		StateType::I64 => register::<i64>(registry, foreign),
		StateType::U8 => register::<u8>(registry, foreign),
		StateType::U16 => register::<u16>(registry, foreign),
		StateType::U32 => register::<u32>(registry, foreign),
		StateType::U64 => register::<u64>(registry, foreign),
		StateType::String => register::<String>(registry, foreign),
		StateType::Bool => register::<bool>(registry, foreign),
	}
}

impl PluginOwner {
	pub fn new(registry: Rc<RefCell<TableRegistry>>, module: Rc<PluginModule>, config: BridgeConfig) -> Box<Self> {
		Box::new(Self {
			registry,
			module,
			config,
			last_error: Rc::default(),
			accessed: RefCell::default(),
			retired: RefCell::default(),
			infos: RefCell::default(),
			info_names: RefCell::default(),
			owned: RefCell::default(),
		})
	}

	pub fn module(&self) -> &Rc<PluginModule> {
		&self.module
	}

	/// The handle passed to the extension's owner callbacks.
	pub fn as_raw(&self) -> *mut RawOwner {
		(self as *const Self).cast_mut().cast()
	}

	/// Last error recorded for this extension.
	pub fn last_error(&self) -> String {
		self.last_error.get()
	}

	/// Names of the tables this extension registered.
	pub fn owned_tables(&self) -> Vec<String> {
		self.owned.borrow().clone()
	}

	/// Owner entry points, to be called with [`as_raw`](Self::as_raw).
	pub fn vtable() -> TablesOwnerVtable {
		TablesOwnerVtable {
			list_tables: Some(list_tables),
			get_table: Some(get_table),
			add_table: Some(add_table),
			get_owner_last_error: Some(get_owner_last_error),
		}
	}

	/// Field calls on tables returned by `get_table`.
	pub fn table_fields_api() -> TableFieldsVtable {
		TableFieldsVtable {
			list_table_fields: Some(dispatch_list_fields),
			get_table_field: Some(dispatch_get_field),
			add_table_field: Some(dispatch_add_field),
		}
	}

	/// Read calls on tables returned by `get_table`.
	pub fn table_read_api() -> TableReaderVtable {
		TableReaderVtable {
			get_table_name: Some(dispatch_get_name),
			get_table_size: Some(dispatch_get_size),
			get_table_entry: Some(dispatch_get_entry),
			read_entry_field: Some(dispatch_read_entry_field),
		}
	}

	/// Write calls on tables returned by `get_table`.
	pub fn table_write_api() -> TableWriterVtable {
		TableWriterVtable {
			clear_table: Some(dispatch_clear),
			erase_table_entry: Some(dispatch_erase_entry),
			create_table_entry: Some(dispatch_create_entry),
			destroy_table_entry: Some(dispatch_destroy_entry),
			add_table_entry: Some(dispatch_add_entry),
			write_entry_field: Some(dispatch_write_entry_field),
		}
	}

	fn list(&self, ntables: *mut u32) -> Result<*const TableInfo> {
		// SAFETY: the extension passes a writable count.
		let ntables = unsafe { ntables.as_mut() }.ok_or(StateError::NullPointer("ntables"))?;
		*ntables = 0;
		let tables = self.registry.try_borrow().map_err(|_| StateError::TableBusy)?.tables();
		let names = tables
			.iter()
			.map(|(name, _)| CString::new(name.as_str()).map_err(|_| StateError::InteriorNul))
			.collect::<Result<Vec<_>>>()?;
		let infos: Vec<_> = names
			.iter()
			.zip(&tables)
			.map(|(name, (_, key_type))| TableInfo {
				name: name.as_ptr(),
				key_type: key_type.to_raw(),
			})
			.collect();
		*self.info_names.borrow_mut() = names;
		let mut slot = self.infos.borrow_mut();
		*slot = infos;
		*ntables = slot.len() as u32;
		Ok(slot.as_ptr())
	}

	/// Opens a table for the extension. Repeated calls return the same handle while
	/// the same table stays registered under `name`.
	pub fn open_table(&self, name: &str, key_type: StateType) -> Result<*mut RawTable> {
		let any = {
			let registry = self.registry.try_borrow().map_err(|_| StateError::TableBusy)?;
			let (any, actual) = registry
				.lookup(name)
				.ok_or_else(|| StateError::TableNotFound(name.to_string()))?;
			if actual != key_type {
				return Err(StateError::KeyTypeMismatch {
					table: name.to_string(),
					expected: key_type,
					actual,
				});
			}
			any.clone()
		};

		let mut accessed = self.accessed.borrow_mut();
		if let Some(table) = accessed.get_mut(name)
			&& table.adapter.is_bound_to(&any)
		{
			return Ok((&mut table.input as *mut TableInput).cast());
		}
		// Handles to a table that was since replaced stay valid and fail on use.
		if let Some(stale) = accessed.remove(name) {
			tracing::debug!(module = %self.module.name(), table = name, "table replaced since last opened");
			self.retired.borrow_mut().push(stale);
		}

		let adapter = OutboundTable::new(&any, self.last_error.clone(), &self.config)?;
		tracing::debug!(
			module = %self.module.name(),
			table = name,
			passthrough = adapter.is_passthrough(),
			"table opened"
		);
		let mut table = Box::new(AccessedTable {
			input: adapter.input(),
			adapter,
		});
		let out = (&mut table.input as *mut TableInput).cast();
		accessed.insert(name.to_string(), table);
		Ok(out)
	}

	/// Registers a table implemented by the extension.
	///
	/// # Safety
	///
	/// `input` must describe a table that stays valid while it is registered.
	pub unsafe fn register_table(&self, input: &TableInput) -> Result<()> {
		// SAFETY: per the caller's contract.
		let foreign = Rc::new(unsafe { ForeignTable::new(input, self.module.clone()) }?);
		let name = foreign.name().to_string();
		let mut registry = self.registry.try_borrow_mut().map_err(|_| StateError::TableBusy)?;
		register_foreign(&mut registry, foreign)?;
		self.owned.borrow_mut().push(name);
		Ok(())
	}
}

impl Drop for PluginOwner {
	fn drop(&mut self) {
		self.accessed.get_mut().clear();
		self.retired.get_mut().clear();
		let owned = std::mem::take(self.owned.get_mut());
		let Ok(mut registry) = self.registry.try_borrow_mut() else {
			tracing::warn!(module = %self.module.name(), "registry busy; extension tables left registered");
			return;
		};
		for name in owned {
			registry.remove_table(&name);
		}
	}
}

/// # Safety
///
/// `o` must be null or come from [`PluginOwner::as_raw`] of a live owner.
unsafe fn owner<'a>(o: *mut RawOwner) -> Option<&'a PluginOwner> {
	// SAFETY: per the caller's contract.
	unsafe { o.cast::<PluginOwner>().cast_const().as_ref() }
}

unsafe extern "C" fn list_tables(o: *mut RawOwner, ntables: *mut u32) -> *const TableInfo {
	let Some(this) = (unsafe { owner(o) }) else {
		return ptr::null();
	};
	guard(&this.last_error, "list_tables", ptr::null(), || this.list(ntables))
}

unsafe extern "C" fn get_table(o: *mut RawOwner, name: *const c_char, key_type: StateTypeTag) -> *mut RawTable {
	let Some(this) = (unsafe { owner(o) }) else {
		return ptr::null_mut();
	};
	guard(&this.last_error, "get_table", ptr::null_mut(), || {
		// SAFETY: the extension passes a valid C string or null.
		let name = unsafe { string_from_ptr(name) };
		this.open_table(&name, StateType::from_raw(key_type)?)
	})
}

unsafe extern "C" fn add_table(o: *mut RawOwner, input: *const TableInput) -> PluginRc {
	let Some(this) = (unsafe { owner(o) }) else {
		return PluginRc::FAILURE;
	};
	guard(&this.last_error, "add_table", PluginRc::FAILURE, || {
		// SAFETY: the extension passes a valid input or null.
		let input = unsafe { input.as_ref() }.ok_or(StateError::NullPointer("table input"))?;
		// SAFETY: the extension keeps its table alive while registered.
		unsafe { this.register_table(input) }?;
		Ok(PluginRc::SUCCESS)
	})
}

unsafe extern "C" fn get_owner_last_error(o: *mut RawOwner) -> *const c_char {
	match unsafe { owner(o) } {
		Some(this) => this.last_error.as_ptr(),
		None => c"".as_ptr(),
	}
}

/// # Safety
///
/// `t` must be null or a handle returned by `get_table`.
unsafe fn input<'a>(t: *mut RawTable) -> Option<&'a TableInput> {
	// SAFETY: per the caller's contract.
	unsafe { t.cast::<TableInput>().cast_const().as_ref() }
}

unsafe extern "C" fn dispatch_list_fields(t: *mut RawTable, nfields: *mut u32) -> *const TableFieldInfo {
	match unsafe { input(t) } {
		Some(i) => i.fields.list_table_fields.map_or(ptr::null(), |f| unsafe { f(i.table, nfields) }),
		None => ptr::null(),
	}
}

unsafe extern "C" fn dispatch_get_field(t: *mut RawTable, name: *const c_char, ty: StateTypeTag) -> *mut RawField {
	match unsafe { input(t) } {
		Some(i) => i.fields.get_table_field.map_or(ptr::null_mut(), |f| unsafe { f(i.table, name, ty) }),
		None => ptr::null_mut(),
	}
}

unsafe extern "C" fn dispatch_add_field(t: *mut RawTable, name: *const c_char, ty: StateTypeTag) -> *mut RawField {
	match unsafe { input(t) } {
		Some(i) => i.fields.add_table_field.map_or(ptr::null_mut(), |f| unsafe { f(i.table, name, ty) }),
		None => ptr::null_mut(),
	}
}

unsafe extern "C" fn dispatch_get_name(t: *mut RawTable) -> *const c_char {
	match unsafe { input(t) } {
		Some(i) => i.reader.get_table_name.map_or(ptr::null(), |f| unsafe { f(i.table) }),
		None => ptr::null(),
	}
}

unsafe extern "C" fn dispatch_get_size(t: *mut RawTable) -> u64 {
	match unsafe { input(t) } {
		Some(i) => i.reader.get_table_size.map_or(u64::MAX, |f| unsafe { f(i.table) }),
		None => u64::MAX,
	}
}

unsafe extern "C" fn dispatch_get_entry(t: *mut RawTable, key: *const StateData) -> *mut RawEntry {
	match unsafe { input(t) } {
		Some(i) => i.reader.get_table_entry.map_or(ptr::null_mut(), |f| unsafe { f(i.table, key) }),
		None => ptr::null_mut(),
	}
}

unsafe extern "C" fn dispatch_read_entry_field(
	t: *mut RawTable,
	e: *mut RawEntry,
	field: *const RawField,
	out: *mut StateData,
) -> PluginRc {
	match unsafe { input(t) } {
		Some(i) => i
			.reader
			.read_entry_field
			.map_or(PluginRc::NOT_SUPPORTED, |f| unsafe { f(i.table, e, field, out) }),
		None => PluginRc::FAILURE,
	}
}

unsafe extern "C" fn dispatch_clear(t: *mut RawTable) -> PluginRc {
	match unsafe { input(t) } {
		Some(i) => i.writer.clear_table.map_or(PluginRc::NOT_SUPPORTED, |f| unsafe { f(i.table) }),
		None => PluginRc::FAILURE,
	}
}

unsafe extern "C" fn dispatch_erase_entry(t: *mut RawTable, key: *const StateData) -> PluginRc {
	match unsafe { input(t) } {
		Some(i) => i
			.writer
			.erase_table_entry
			.map_or(PluginRc::NOT_SUPPORTED, |f| unsafe { f(i.table, key) }),
		None => PluginRc::FAILURE,
	}
}

unsafe extern "C" fn dispatch_create_entry(t: *mut RawTable) -> *mut RawEntry {
	match unsafe { input(t) } {
		Some(i) => i.writer.create_table_entry.map_or(ptr::null_mut(), |f| unsafe { f(i.table) }),
		None => ptr::null_mut(),
	}
}

unsafe extern "C" fn dispatch_destroy_entry(t: *mut RawTable, e: *mut RawEntry) {
	if let Some(i) = unsafe { input(t) }
		&& let Some(f) = i.writer.destroy_table_entry
	{
		unsafe { f(i.table, e) }
	}
}

unsafe extern "C" fn dispatch_add_entry(t: *mut RawTable, key: *const StateData, e: *mut RawEntry) -> *mut RawEntry {
	match unsafe { input(t) } {
		Some(i) => i.writer.add_table_entry.map_or(ptr::null_mut(), |f| unsafe { f(i.table, key, e) }),
		None => ptr::null_mut(),
	}
}

unsafe extern "C" fn dispatch_write_entry_field(
	t: *mut RawTable,
	e: *mut RawEntry,
	field: *const RawField,
	value: *const StateData,
) -> PluginRc {
	match unsafe { input(t) } {
		Some(i) => i
			.writer
			.write_entry_field
			.map_or(PluginRc::NOT_SUPPORTED, |f| unsafe { f(i.table, e, field, value) }),
		None => PluginRc::FAILURE,
	}
}
