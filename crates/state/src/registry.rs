//! Name-keyed directory of registered tables.
//!
//! Tables are stored type-erased as [`AnyTable`], a closed enum with one variant per
//! key type. Native consumers recover the typed table with
//! [`TableRegistry::get_table`]; the ABI adapters dispatch on the variant with
//! [`with_table!`](crate::with_table).

use std::cell::{RefCell, RefMut};
use std::rc::{Rc, Weak};

use rustc_hash::FxHashMap;

use crate::error::{Result, StateError};
use crate::schema::StaticFieldsDef;
use crate::table::{NativeTable, StateTable};
use crate::types::{StateKey, StateType, StateValue};

/// A registered table of key type `K`, shared between the registry and its users.
pub type SharedTable<K> = Rc<RefCell<StateTable<K>>>;

/// A registered table with its key type erased.
#[derive(Debug, Clone)]
pub enum AnyTable {
	I8(SharedTable<i8>),
	I16(SharedTable<i16>),
	I32(SharedTable<i32>),
	I64(SharedTable<i64>),
	U8(SharedTable<u8>),
	U16(SharedTable<u16>),
	U32(SharedTable<u32>),
	U64(SharedTable<u64>),
	String(SharedTable<String>),
	Bool(SharedTable<bool>),
}

/// Runs `$body` with `$t` bound to the typed [`SharedTable`] inside an [`AnyTable`].
///
/// `$body` is expanded once per key type, so it must compile for every `K`.
#[macro_export]
macro_rules! with_table {
	($any:expr, $t:ident => $body:expr) => {
		match $any {
			$crate::AnyTable::I8($t) => $body,
			$crate::AnyTable::I16($t) => $body,
			$crate::AnyTable::I32($t) => $body,
			$crate::AnyTable::I64($t) => $body,
			$crate::AnyTable::U8($t) => $body,
			$crate::AnyTable::U16($t) => $body,
			$crate::AnyTable::U32($t) => $body,
			$crate::AnyTable::U64($t) => $body,
			$crate::AnyTable::String($t) => $body,
			$crate::AnyTable::Bool($t) => $body,
		}
	};
}

impl AnyTable {
	pub fn new<K: StateKey>(table: StateTable<K>) -> Self {
		K::into_any_table(Rc::new(RefCell::new(table)))
	}

	pub fn key_type(&self) -> StateType {
		match self {
			AnyTable::I8(_) => StateType::I8,
			AnyTable::I16(_) => StateType::I16,
			AnyTable::I32(_) => StateType::I32,
			AnyTable::I64(_) => StateType::I64,
			AnyTable::U8(_) => StateType::U8,
			AnyTable::U16(_) => StateType::U16,
			AnyTable::U32(_) => StateType::U32,
			AnyTable::U64(_) => StateType::U64,
			AnyTable::String(_) => StateType::String,
			AnyTable::Bool(_) => StateType::Bool,
		}
	}

	/// Typed view, or `None` if the key type is not `K`.
	pub fn downcast<K: StateKey>(&self) -> Option<&SharedTable<K>> {
		K::from_any_table(self)
	}

	pub fn downgrade(&self) -> WeakTable {
		match self {
			AnyTable::I8(t) => WeakTable::I8(Rc::downgrade(t)),
			AnyTable::I16(t) => WeakTable::I16(Rc::downgrade(t)),
			AnyTable::I32(t) => WeakTable::I32(Rc::downgrade(t)),
			AnyTable::I64(t) => WeakTable::I64(Rc::downgrade(t)),
			AnyTable::U8(t) => WeakTable::U8(Rc::downgrade(t)),
			AnyTable::U16(t) => WeakTable::U16(Rc::downgrade(t)),
			AnyTable::U32(t) => WeakTable::U32(Rc::downgrade(t)),
			AnyTable::U64(t) => WeakTable::U64(Rc::downgrade(t)),
			AnyTable::String(t) => WeakTable::String(Rc::downgrade(t)),
			AnyTable::Bool(t) => WeakTable::Bool(Rc::downgrade(t)),
		}
	}

	/// Whether both handles share one table.
	pub fn ptr_eq(&self, other: &AnyTable) -> bool {
		std::ptr::eq(self.addr(), other.addr())
	}

	fn addr(&self) -> *const () {
		with_table!(self, t => Rc::as_ptr(t).cast())
	}

	/// Whether the table is implemented by another module.
	pub fn is_plugin(&self) -> Result<bool> {
		with_table!(self, t => Ok(borrow_table(t)?.is_plugin()))
	}
}

/// A non-owning [`AnyTable`]. Upgrades fail once every strong handle is gone.
#[derive(Debug, Clone)]
pub enum WeakTable {
	I8(Weak<RefCell<StateTable<i8>>>),
	I16(Weak<RefCell<StateTable<i16>>>),
	I32(Weak<RefCell<StateTable<i32>>>),
	I64(Weak<RefCell<StateTable<i64>>>),
	U8(Weak<RefCell<StateTable<u8>>>),
	U16(Weak<RefCell<StateTable<u16>>>),
	U32(Weak<RefCell<StateTable<u32>>>),
	U64(Weak<RefCell<StateTable<u64>>>),
	String(Weak<RefCell<StateTable<String>>>),
	Bool(Weak<RefCell<StateTable<bool>>>),
}

impl WeakTable {
	pub fn upgrade(&self) -> Option<AnyTable> {
		Some(match self {
			WeakTable::I8(w) => AnyTable::I8(w.upgrade()?),
			WeakTable::I16(w) => AnyTable::I16(w.upgrade()?),
			WeakTable::I32(w) => AnyTable::I32(w.upgrade()?),
			WeakTable::I64(w) => AnyTable::I64(w.upgrade()?),
			WeakTable::U8(w) => AnyTable::U8(w.upgrade()?),
			WeakTable::U16(w) => AnyTable::U16(w.upgrade()?),
			WeakTable::U32(w) => AnyTable::U32(w.upgrade()?),
			WeakTable::U64(w) => AnyTable::U64(w.upgrade()?),
			WeakTable::String(w) => AnyTable::String(w.upgrade()?),
			WeakTable::Bool(w) => AnyTable::Bool(w.upgrade()?),
		})
	}

	fn addr(&self) -> *const () {
		match self {
			WeakTable::I8(w) => w.as_ptr().cast(),
			WeakTable::I16(w) => w.as_ptr().cast(),
			WeakTable::I32(w) => w.as_ptr().cast(),
			WeakTable::I64(w) => w.as_ptr().cast(),
			WeakTable::U8(w) => w.as_ptr().cast(),
			WeakTable::U16(w) => w.as_ptr().cast(),
			WeakTable::U32(w) => w.as_ptr().cast(),
			WeakTable::U64(w) => w.as_ptr().cast(),
			WeakTable::String(w) => w.as_ptr().cast(),
			WeakTable::Bool(w) => w.as_ptr().cast(),
		}
	}

	/// Whether this points at the same table as `table`.
	pub fn points_to(&self, table: &AnyTable) -> bool {
		std::ptr::eq(self.addr(), table.addr())
	}
}

/// Mutably borrows a shared table, failing instead of panicking on re-entrant use.
pub fn borrow_table<K: StateKey>(table: &SharedTable<K>) -> Result<RefMut<'_, StateTable<K>>> {
	table.try_borrow_mut().map_err(|_| StateError::TableBusy)
}

/// The process-wide table directory.
#[derive(Debug, Default)]
pub struct TableRegistry {
	tables: FxHashMap<String, AnyTable>,
}

impl TableRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `table` under its own name.
	pub fn add_table<K: StateKey>(&mut self, table: impl Into<StateTable<K>>) -> Result<SharedTable<K>> {
		use crate::table::Table;

		let table = table.into();
		let name = table.name().to_string();
		if self.tables.contains_key(&name) {
			return Err(StateError::TableExists(name));
		}
		let plugin = table.is_plugin();
		let shared = Rc::new(RefCell::new(table));
		self.tables.insert(name.clone(), K::into_any_table(shared.clone()));
		tracing::debug!(table = %name, key_type = %K::STATE_TYPE, plugin, "table registered");
		Ok(shared)
	}

	/// Registers a native table.
	pub fn add_native<K: StateKey>(&mut self, table: NativeTable<K>) -> Result<SharedTable<K>> {
		self.add_table(table)
	}

	/// Builds and registers a native table with the given static fields.
	pub fn create_native<K: StateKey>(&mut self, name: &str, fields: StaticFieldsDef) -> Result<SharedTable<K>> {
		if self.tables.contains_key(name) {
			return Err(StateError::TableExists(name.to_string()));
		}
		self.add_native(NativeTable::with_static_fields(name, fields)?)
	}

	/// Looks up a table by name and checks its key type.
	pub fn get_table<K: StateKey>(&self, name: &str) -> Result<SharedTable<K>> {
		let any = self
			.tables
			.get(name)
			.ok_or_else(|| StateError::TableNotFound(name.to_string()))?;
		any.downcast::<K>().cloned().ok_or_else(|| StateError::KeyTypeMismatch {
			table: name.to_string(),
			expected: K::STATE_TYPE,
			actual: any.key_type(),
		})
	}

	/// Type-erased lookup, paired with the recorded key type.
	pub fn lookup(&self, name: &str) -> Option<(&AnyTable, StateType)> {
		self.tables.get(name).map(|t| (t, t.key_type()))
	}

	/// Unregisters a table. Its entries are destroyed once the last handle drops.
	pub fn remove_table(&mut self, name: &str) -> Option<AnyTable> {
		let removed = self.tables.remove(name);
		if removed.is_some() {
			tracing::debug!(table = name, "table unregistered");
		}
		removed
	}

	/// Names and key types of all tables, sorted by name.
	pub fn tables(&self) -> Vec<(String, StateType)> {
		let mut out: Vec<_> = self.tables.iter().map(|(n, t)| (n.clone(), t.key_type())).collect();
		out.sort_by(|a, b| a.0.cmp(&b.0));
		out
	}

	pub fn len(&self) -> usize {
		self.tables.len()
	}

	pub fn is_empty(&self) -> bool {
		self.tables.is_empty()
	}
}
