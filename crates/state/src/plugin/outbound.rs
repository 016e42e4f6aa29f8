//! Registered tables exposed to an extension through the flat ABI.
//!
//! An [`OutboundTable`] is created per extension and per table. For native tables it
//! recovers the key type from the [`AnyTable`] variant on every call and dispatches into
//! generic helpers. For tables owned by another extension it forwards every call to
//! that extension's vtables, relaying the owner's error text on failure.

use std::cell::{RefCell, RefMut};
use std::ffi::{CString, c_char};
use std::fmt;
use std::ptr::{self, NonNull};
use std::rc::{Rc, Weak};

use lookout_table_api::{
	PluginRc, RawEntry, RawField, RawTable, StateData, StateTypeTag, TableFieldInfo, TableFieldsVtable, TableInput,
	TableReaderVtable, TableWriterVtable,
};
use rustc_hash::{FxHashMap, FxHashSet};

use super::module::ForeignTable;
use super::{LastError, guard};
use crate::config::BridgeConfig;
use crate::convert::{string_from_ptr, value_from_data, write_data};
use crate::entry::{Entry, TableEntry};
use crate::error::{Result, StateError};
use crate::registry::{AnyTable, SharedTable, WeakTable, borrow_table};
use crate::schema::{Accessor, FieldKind};
use crate::table::{NativeTable, StateTable, Table};
use crate::types::{StateKey, StateType};
use crate::with_table;

/// A resolved field handed out as `*mut RawField`. Boxed so the address is stable.
#[derive(Debug)]
struct CachedField {
	accessor: Accessor,
}

struct NativeBinding {
	fields: FxHashMap<String, Box<CachedField>>,
	handles: FxHashSet<*const CachedField>,
	listed: Vec<TableFieldInfo>,
	listed_names: Vec<CString>,
	scratch: CString,
}

enum Target {
	Native(RefCell<NativeBinding>),
	Passthrough(Weak<ForeignTable>),
}

/// One registered table as seen by one extension.
///
/// Holds the table weakly: once it is unregistered and dropped, every call fails with
/// [`StateError::TableNotFound`].
pub struct OutboundTable {
	name: CString,
	key_type: StateType,
	table: WeakTable,
	target: Target,
	last_error: Rc<LastError>,
	max_cached_accessors: usize,
}

impl fmt::Debug for OutboundTable {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let target = match &self.target {
			Target::Native(_) => "native",
			Target::Passthrough(_) => "passthrough",
		};
		f.debug_struct("OutboundTable")
			.field("name", &self.name)
			.field("key_type", &self.key_type)
			.field("target", &target)
			.finish_non_exhaustive()
	}
}

fn native<K: StateKey>(table: &mut StateTable<K>) -> Result<&mut NativeTable<K>> {
	let name = table.name().to_string();
	table
		.as_native_mut()
		.ok_or_else(|| StateError::unsupported(&name, "native access"))
}

/// # Safety
///
/// `key` must be null or point to a value whose active member is `K`'s.
unsafe fn key_from<K: StateKey>(key: *const StateData) -> Result<K> {
	// SAFETY: per the caller's contract.
	let data = unsafe { key.as_ref() }.ok_or(StateError::NullPointer("key"))?;
	// SAFETY: as above.
	K::from_value(unsafe { value_from_data(data, K::STATE_TYPE) })
}

fn entry_ptr(entry: &mut Entry) -> *mut RawEntry {
	(entry as *mut Entry).cast()
}

fn schema_of<K: StateKey>(table: &SharedTable<K>) -> Result<Vec<(String, StateType, bool)>> {
	let mut table = borrow_table(table)?;
	let mut out: Vec<_> = table
		.static_fields()
		.iter()
		.map(|f| (f.name().to_string(), f.ty(), f.read_only()))
		.collect();
	out.extend(table.dynamic_fields()?.iter().map(|f| (f.name().to_string(), f.ty(), false)));
	Ok(out)
}

fn add_field_in<K: StateKey>(table: &SharedTable<K>, name: &str, ty: StateType) -> Result<Accessor> {
	let mut table = borrow_table(table)?;
	if table.static_fields().contains(name) {
		return Err(StateError::StaticFieldConflict(name.to_string()));
	}
	if !table.dynamic_fields()?.contains(name) {
		table.add_dynamic_field(name, ty)?;
	}
	table.accessor(name)
}

fn count_in<K: StateKey>(table: &SharedTable<K>) -> Result<u64> {
	Ok(borrow_table(table)?.entries_count()? as u64)
}

/// # Safety
///
/// See [`key_from`].
unsafe fn get_entry_in<K: StateKey>(table: &SharedTable<K>, key: *const StateData) -> Result<*mut RawEntry> {
	// SAFETY: forwarded.
	let key: K = unsafe { key_from(key) }?;
	let mut table = borrow_table(table)?;
	Ok(native(&mut table)?.get_entry(&key)?.map_or(ptr::null_mut(), entry_ptr))
}

fn clear_in<K: StateKey>(table: &SharedTable<K>) -> Result<()> {
	native(&mut *borrow_table(table)?)?.clear_entries()
}

/// # Safety
///
/// See [`key_from`].
unsafe fn erase_in<K: StateKey>(table: &SharedTable<K>, key: *const StateData) -> Result<()> {
	// SAFETY: forwarded.
	let key: K = unsafe { key_from(key) }?;
	if !native(&mut *borrow_table(table)?)?.erase_entry(&key)? {
		return Err(StateError::EntryNotFound);
	}
	Ok(())
}

fn create_in<K: StateKey>(table: &SharedTable<K>) -> Result<*mut RawEntry> {
	let entry = native(&mut *borrow_table(table)?)?.new_entry()?;
	Ok(Box::into_raw(entry).cast())
}

/// # Safety
///
/// `key` as for [`key_from`]; `entry` must be null or an unattached entry created by
/// [`create_in`] on this table.
unsafe fn add_in<K: StateKey>(table: &SharedTable<K>, key: *const StateData, entry: *mut RawEntry) -> Result<*mut RawEntry> {
	// SAFETY: forwarded.
	let key: K = unsafe { key_from(key) }?;
	let entry = NonNull::new(entry.cast::<Entry>()).ok_or(StateError::NullPointer("entry"))?;
	let mut table = borrow_table(table)?;
	let table = native(&mut table)?;
	// SAFETY: the caller owns the unattached entry and hands it over here.
	let boxed = unsafe { Box::from_raw(entry.as_ptr()) };
	match table.insert_or_return(key, boxed) {
		Ok(attached) => Ok(entry_ptr(attached)),
		Err((err, boxed)) => {
			// Ownership stays with the caller on failure.
			let _ = Box::into_raw(boxed);
			Err(err)
		}
	}
}

impl OutboundTable {
	/// Wraps a registered table for one extension.
	pub fn new(table: &AnyTable, last_error: Rc<LastError>, config: &BridgeConfig) -> Result<Box<Self>> {
		let key_type = table.key_type();
		let (name, foreign) = with_table!(table, t => {
			let t = borrow_table(t)?;
			(t.name().to_string(), t.as_plugin().map(|p| Rc::downgrade(p.foreign())))
		});
		let target = match foreign {
			Some(foreign) => Target::Passthrough(foreign),
			None => Target::Native(RefCell::new(NativeBinding {
				fields: FxHashMap::default(),
				handles: FxHashSet::default(),
				listed: Vec::new(),
				listed_names: Vec::new(),
				scratch: CString::default(),
			})),
		};
		Ok(Box::new(Self {
			name: CString::new(name).map_err(|_| StateError::InteriorNul)?,
			key_type,
			table: table.downgrade(),
			target,
			last_error,
			max_cached_accessors: config.max_cached_accessors,
		}))
	}

	pub fn name(&self) -> &str {
		self.name.to_str().unwrap_or_default()
	}

	pub fn key_type(&self) -> StateType {
		self.key_type
	}

	/// Whether this adapter was built for `table`.
	pub fn is_bound_to(&self, table: &AnyTable) -> bool {
		self.table.points_to(table)
	}

	pub fn is_passthrough(&self) -> bool {
		matches!(self.target, Target::Passthrough(_))
	}

	/// Number of field accessors resolved so far.
	pub fn cached_accessors(&self) -> usize {
		match &self.target {
			Target::Native(b) => b.try_borrow().map_or(0, |b| b.fields.len()),
			Target::Passthrough(_) => 0,
		}
	}

	/// The flat handle for this adapter. Valid while `self` is neither moved nor
	/// dropped; keep the adapter boxed.
	pub fn input(&self) -> TableInput {
		TableInput {
			table: (self as *const Self).cast_mut().cast(),
			name: self.name.as_ptr(),
			key_type: self.key_type.to_raw(),
			fields: TableFieldsVtable {
				list_table_fields: Some(list_fields),
				get_table_field: Some(get_field),
				add_table_field: Some(add_field),
			},
			reader: TableReaderVtable {
				get_table_name: Some(get_name),
				get_table_size: Some(get_size),
				get_table_entry: Some(get_entry),
				read_entry_field: Some(read_entry_field),
			},
			writer: TableWriterVtable {
				clear_table: Some(clear),
				erase_table_entry: Some(erase_entry),
				create_table_entry: Some(create_entry),
				destroy_table_entry: Some(destroy_entry),
				add_table_entry: Some(add_entry),
				write_entry_field: Some(write_entry_field),
			},
		}
	}

	fn guard<T>(&self, op: &'static str, fail: T, f: impl FnOnce(&Self) -> Result<T>) -> T {
		guard(&self.last_error, op, fail, || f(self))
	}

	fn gone(&self) -> StateError {
		StateError::TableNotFound(self.name().to_string())
	}

	fn table(&self) -> Result<AnyTable> {
		self.table.upgrade().ok_or_else(|| self.gone())
	}

	fn foreign(&self, foreign: &Weak<ForeignTable>) -> Result<Rc<ForeignTable>> {
		foreign.upgrade().ok_or_else(|| self.gone())
	}

	fn binding(cell: &RefCell<NativeBinding>) -> Result<RefMut<'_, NativeBinding>> {
		cell.try_borrow_mut().map_err(|_| StateError::TableBusy)
	}

	fn forward<F>(foreign: &ForeignTable, f: Option<F>, op: &'static str) -> Result<F> {
		f.ok_or_else(|| StateError::unsupported(foreign.name(), op))
	}

	fn list_fields(&self, nfields: *mut u32) -> Result<*const TableFieldInfo> {
		// SAFETY: the extension passes a writable count.
		let nfields = unsafe { nfields.as_mut() }.ok_or(StateError::NullPointer("nfields"))?;
		match &self.target {
			Target::Passthrough(foreign) => {
				let foreign = self.foreign(foreign)?;
				let input = foreign.input();
				let f = Self::forward(&foreign, input.fields.list_table_fields, "list_fields")?;
				// SAFETY: forwarded unchanged to the owning extension.
				let out = unsafe { f(input.table, nfields) };
				if out.is_null() {
					return Err(foreign.module().failure("list_fields"));
				}
				Ok(out)
			}
			Target::Native(cell) => {
				let mut b = Self::binding(cell)?;
				let fields = with_table!(&self.table()?, t => schema_of(t))?;
				let names = fields
					.iter()
					.map(|(name, _, _)| CString::new(name.as_str()).map_err(|_| StateError::InteriorNul))
					.collect::<Result<Vec<_>>>()?;
				let listed = names
					.iter()
					.zip(&fields)
					.map(|(name, (_, ty, read_only))| TableFieldInfo {
						name: name.as_ptr(),
						field_type: ty.to_raw(),
						read_only: u32::from(*read_only),
					})
					.collect();
				b.listed_names = names;
				b.listed = listed;
				*nfields = b.listed.len() as u32;
				Ok(b.listed.as_ptr())
			}
		}
	}

	fn resolve(&self, name: *const c_char, ty: StateTypeTag, create: bool) -> Result<*mut RawField> {
		let op = if create { "add_field" } else { "get_field" };
		match &self.target {
			Target::Passthrough(foreign) => {
				let foreign = self.foreign(foreign)?;
				let input = foreign.input();
				let slot = if create {
					input.fields.add_table_field
				} else {
					input.fields.get_table_field
				};
				let f = Self::forward(&foreign, slot, op)?;
				// SAFETY: forwarded unchanged to the owning extension.
				let out = unsafe { f(input.table, name, ty) };
				if out.is_null() {
					return Err(foreign.module().failure(op));
				}
				Ok(out)
			}
			Target::Native(cell) => {
				// SAFETY: the extension passes a valid C string or null.
				let name = unsafe { string_from_ptr(name) };
				let ty = StateType::from_raw(ty)?;
				let mut b = Self::binding(cell)?;
				if let Some(cached) = b.fields.get(&name) {
					if create && cached.accessor.kind() == FieldKind::Static {
						return Err(StateError::StaticFieldConflict(name));
					}
					if cached.accessor.ty() != ty {
						return Err(StateError::FieldTypeMismatch {
							field: name,
							declared: cached.accessor.ty(),
							requested: ty,
						});
					}
					return Ok(handle_ptr(cached));
				}
				if b.fields.len() >= self.max_cached_accessors {
					return Err(StateError::ResourceExhausted(format!(
						"accessor cache of table '{}' is full ({} fields)",
						self.name(),
						b.fields.len()
					)));
				}
				let accessor = if create {
					with_table!(&self.table()?, t => add_field_in(t, &name, ty))?
				} else {
					with_table!(&self.table()?, t => borrow_table(t)?.accessor(&name))?
				};
				if accessor.ty() != ty {
					return Err(StateError::FieldTypeMismatch {
						field: name,
						declared: accessor.ty(),
						requested: ty,
					});
				}
				tracing::trace!(table = %self.name(), field = %name, %ty, "field accessor resolved");
				let cached = Box::new(CachedField { accessor });
				let out = handle_ptr(&cached);
				b.handles.insert(out.cast_const().cast());
				b.fields.insert(name, cached);
				Ok(out)
			}
		}
	}

	fn size(&self) -> Result<u64> {
		match &self.target {
			Target::Passthrough(foreign) => {
				let foreign = self.foreign(foreign)?;
				let input = foreign.input();
				let f = Self::forward(&foreign, input.reader.get_table_size, "get_size")?;
				// SAFETY: forwarded unchanged to the owning extension.
				match unsafe { f(input.table) } {
					u64::MAX => Err(foreign.module().failure("get_size")),
					n => Ok(n),
				}
			}
			Target::Native(_) => with_table!(&self.table()?, t => count_in(t)),
		}
	}

	fn get_entry(&self, key: *const StateData) -> Result<*mut RawEntry> {
		match &self.target {
			Target::Passthrough(foreign) => {
				let foreign = self.foreign(foreign)?;
				let input = foreign.input();
				let f = Self::forward(&foreign, input.reader.get_table_entry, "get_entry")?;
				// SAFETY: forwarded unchanged; null means absent.
				Ok(unsafe { f(input.table, key) })
			}
			Target::Native(_) => {
				// SAFETY: the key member matches the table's key type by contract.
				with_table!(&self.table()?, t => unsafe { get_entry_in(t, key) })
			}
		}
	}

	fn field_accessor(b: &NativeBinding, field: *const RawField) -> Result<Accessor> {
		let cached = field.cast::<CachedField>();
		if !b.handles.contains(&cached) {
			return Err(StateError::NullPointer("field accessor"));
		}
		// SAFETY: `cached` is one of the boxes owned by `b.fields`.
		Ok(unsafe { &*cached }.accessor.clone())
	}

	fn read_field(&self, e: *mut RawEntry, f: *const RawField, out: *mut StateData) -> Result<()> {
		match &self.target {
			Target::Passthrough(foreign) => {
				let foreign = self.foreign(foreign)?;
				let input = foreign.input();
				let func = Self::forward(&foreign, input.reader.read_entry_field, "read_field")?;
				// SAFETY: forwarded unchanged to the owning extension.
				if !unsafe { func(input.table, e, f, out) }.is_success() {
					return Err(foreign.module().failure("read_field"));
				}
				Ok(())
			}
			Target::Native(cell) => {
				// Entries die with their table.
				let _table = self.table()?;
				let mut b = Self::binding(cell)?;
				let accessor = Self::field_accessor(&b, f)?;
				// SAFETY: entries handed out by this adapter are `Entry` boxes.
				let entry = unsafe { e.cast::<Entry>().as_ref() }.ok_or(StateError::NullPointer("entry"))?;
				let value = entry.get_field(&accessor)?;
				// SAFETY: the extension passes a writable value slot.
				let out = unsafe { out.as_mut() }.ok_or(StateError::NullPointer("out"))?;
				write_data(&value, out, &mut b.scratch)
			}
		}
	}

	fn write_field(&self, e: *mut RawEntry, f: *const RawField, value: *const StateData) -> Result<()> {
		match &self.target {
			Target::Passthrough(foreign) => {
				let foreign = self.foreign(foreign)?;
				let input = foreign.input();
				let func = Self::forward(&foreign, input.writer.write_entry_field, "write_field")?;
				// SAFETY: forwarded unchanged to the owning extension.
				if !unsafe { func(input.table, e, f, value) }.is_success() {
					return Err(foreign.module().failure("write_field"));
				}
				Ok(())
			}
			Target::Native(cell) => {
				// Entries die with their table.
				let _table = self.table()?;
				let b = Self::binding(cell)?;
				let accessor = Self::field_accessor(&b, f)?;
				// SAFETY: entries handed out by this adapter are `Entry` boxes.
				let entry = unsafe { e.cast::<Entry>().as_mut() }.ok_or(StateError::NullPointer("entry"))?;
				// SAFETY: the value member matches the field type by contract.
				let data = unsafe { value.as_ref() }.ok_or(StateError::NullPointer("value"))?;
				let value = unsafe { value_from_data(data, accessor.ty()) };
				entry.set_field(&accessor, value)
			}
		}
	}

	fn clear(&self) -> Result<()> {
		match &self.target {
			Target::Passthrough(foreign) => {
				let foreign = self.foreign(foreign)?;
				let input = foreign.input();
				let f = Self::forward(&foreign, input.writer.clear_table, "clear")?;
				// SAFETY: forwarded unchanged to the owning extension.
				if !unsafe { f(input.table) }.is_success() {
					return Err(foreign.module().failure("clear"));
				}
				Ok(())
			}
			Target::Native(_) => with_table!(&self.table()?, t => clear_in(t)),
		}
	}

	fn erase(&self, key: *const StateData) -> Result<()> {
		match &self.target {
			Target::Passthrough(foreign) => {
				let foreign = self.foreign(foreign)?;
				let input = foreign.input();
				let f = Self::forward(&foreign, input.writer.erase_table_entry, "erase_entry")?;
				// SAFETY: forwarded unchanged to the owning extension.
				if !unsafe { f(input.table, key) }.is_success() {
					return Err(foreign.module().failure("erase_entry"));
				}
				Ok(())
			}
			Target::Native(_) => {
				// SAFETY: the key member matches the table's key type by contract.
				with_table!(&self.table()?, t => unsafe { erase_in(t, key) })
			}
		}
	}

	fn create(&self) -> Result<*mut RawEntry> {
		match &self.target {
			Target::Passthrough(foreign) => {
				let foreign = self.foreign(foreign)?;
				let input = foreign.input();
				let f = Self::forward(&foreign, input.writer.create_table_entry, "create_entry")?;
				// SAFETY: forwarded unchanged to the owning extension.
				let out = unsafe { f(input.table) };
				if out.is_null() {
					return Err(foreign.module().failure("create_entry"));
				}
				Ok(out)
			}
			Target::Native(_) => with_table!(&self.table()?, t => create_in(t)),
		}
	}

	fn destroy(&self, e: *mut RawEntry) -> Result<()> {
		match &self.target {
			Target::Passthrough(foreign) => {
				let foreign = self.foreign(foreign)?;
				let input = foreign.input();
				let f = Self::forward(&foreign, input.writer.destroy_table_entry, "destroy_entry")?;
				// SAFETY: forwarded unchanged to the owning extension.
				unsafe { f(input.table, e) };
				Ok(())
			}
			Target::Native(_) => {
				if let Some(entry) = NonNull::new(e.cast::<Entry>()) {
					// SAFETY: unattached entries handed out by `create` are leaked boxes.
					drop(unsafe { Box::from_raw(entry.as_ptr()) });
				}
				Ok(())
			}
		}
	}

	fn add(&self, key: *const StateData, e: *mut RawEntry) -> Result<*mut RawEntry> {
		match &self.target {
			Target::Passthrough(foreign) => {
				let foreign = self.foreign(foreign)?;
				let input = foreign.input();
				let f = Self::forward(&foreign, input.writer.add_table_entry, "add_entry")?;
				// SAFETY: forwarded unchanged to the owning extension.
				let out = unsafe { f(input.table, key, e) };
				if out.is_null() {
					return Err(foreign.module().failure("add_entry"));
				}
				Ok(out)
			}
			Target::Native(_) => {
				// SAFETY: key and entry per the ABI contract of `add_table_entry`.
				with_table!(&self.table()?, t => unsafe { add_in(t, key, e) })
			}
		}
	}
}

fn handle_ptr(cached: &CachedField) -> *mut RawField {
	(cached as *const CachedField).cast_mut().cast()
}

/// # Safety
///
/// `t` must be null or come from [`OutboundTable::input`] of a live adapter.
unsafe fn adapter<'a>(t: *mut RawTable) -> Option<&'a OutboundTable> {
	// SAFETY: per the caller's contract.
	unsafe { t.cast::<OutboundTable>().cast_const().as_ref() }
}

unsafe extern "C" fn list_fields(t: *mut RawTable, nfields: *mut u32) -> *const TableFieldInfo {
	let Some(this) = (unsafe { adapter(t) }) else {
		return ptr::null();
	};
	this.guard("list_fields", ptr::null(), |this| this.list_fields(nfields))
}

unsafe extern "C" fn get_field(t: *mut RawTable, name: *const c_char, ty: StateTypeTag) -> *mut RawField {
	let Some(this) = (unsafe { adapter(t) }) else {
		return ptr::null_mut();
	};
	this.guard("get_field", ptr::null_mut(), |this| this.resolve(name, ty, false))
}

unsafe extern "C" fn add_field(t: *mut RawTable, name: *const c_char, ty: StateTypeTag) -> *mut RawField {
	let Some(this) = (unsafe { adapter(t) }) else {
		return ptr::null_mut();
	};
	this.guard("add_field", ptr::null_mut(), |this| this.resolve(name, ty, true))
}

unsafe extern "C" fn get_name(t: *mut RawTable) -> *const c_char {
	match unsafe { adapter(t) } {
		Some(this) => this.name.as_ptr(),
		None => ptr::null(),
	}
}

unsafe extern "C" fn get_size(t: *mut RawTable) -> u64 {
	let Some(this) = (unsafe { adapter(t) }) else {
		return u64::MAX;
	};
	this.guard("get_size", u64::MAX, |this| this.size())
}

unsafe extern "C" fn get_entry(t: *mut RawTable, key: *const StateData) -> *mut RawEntry {
	let Some(this) = (unsafe { adapter(t) }) else {
		return ptr::null_mut();
	};
	this.guard("get_entry", ptr::null_mut(), |this| this.get_entry(key))
}

unsafe extern "C" fn read_entry_field(
	t: *mut RawTable,
	e: *mut RawEntry,
	f: *const RawField,
	out: *mut StateData,
) -> PluginRc {
	let Some(this) = (unsafe { adapter(t) }) else {
		return PluginRc::FAILURE;
	};
	this.guard("read_field", PluginRc::FAILURE, |this| {
		this.read_field(e, f, out).map(|()| PluginRc::SUCCESS)
	})
}

unsafe extern "C" fn write_entry_field(
	t: *mut RawTable,
	e: *mut RawEntry,
	f: *const RawField,
	value: *const StateData,
) -> PluginRc {
	let Some(this) = (unsafe { adapter(t) }) else {
		return PluginRc::FAILURE;
	};
	this.guard("write_field", PluginRc::FAILURE, |this| {
		this.write_field(e, f, value).map(|()| PluginRc::SUCCESS)
	})
}

unsafe extern "C" fn clear(t: *mut RawTable) -> PluginRc {
	let Some(this) = (unsafe { adapter(t) }) else {
		return PluginRc::FAILURE;
	};
	this.guard("clear", PluginRc::FAILURE, |this| this.clear().map(|()| PluginRc::SUCCESS))
}

unsafe extern "C" fn erase_entry(t: *mut RawTable, key: *const StateData) -> PluginRc {
	let Some(this) = (unsafe { adapter(t) }) else {
		return PluginRc::FAILURE;
	};
	this.guard("erase_entry", PluginRc::FAILURE, |this| this.erase(key).map(|()| PluginRc::SUCCESS))
}

unsafe extern "C" fn create_entry(t: *mut RawTable) -> *mut RawEntry {
	let Some(this) = (unsafe { adapter(t) }) else {
		return ptr::null_mut();
	};
	this.guard("create_entry", ptr::null_mut(), |this| this.create())
}

unsafe extern "C" fn destroy_entry(t: *mut RawTable, e: *mut RawEntry) {
	if let Some(this) = unsafe { adapter(t) } {
		this.guard("destroy_entry", (), |this| this.destroy(e));
	}
}

unsafe extern "C" fn add_entry(t: *mut RawTable, key: *const StateData, e: *mut RawEntry) -> *mut RawEntry {
	let Some(this) = (unsafe { adapter(t) }) else {
		return ptr::null_mut();
	};
	this.guard("add_entry", ptr::null_mut(), |this| this.add(key, e))
}
