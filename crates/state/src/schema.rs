//! Field schemas and the accessors resolved from them.
//!
//! A table's schema is two [`FieldSet`]s sharing one [`SchemaId`]: the static set,
//! fixed when the table is built, and the dynamic set, which only grows. Indices are
//! assigned per set in insertion order and never reused, so an [`Accessor`] stays
//! valid for the lifetime of its table.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

use rustc_hash::FxHashMap;

use crate::error::{Result, StateError};
use crate::types::{StateType, StateValue};

static NEXT_SCHEMA_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one table's schema. Entries and accessors carry it so that they can
/// only be combined with their own table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SchemaId(u64);

impl SchemaId {
	pub(crate) fn next() -> Self {
		SchemaId(NEXT_SCHEMA_ID.fetch_add(1, Ordering::Relaxed))
	}
}

/// Which part of the schema a field lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
	Static,
	Dynamic,
}

/// Descriptor of one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
	name: String,
	ty: StateType,
	index: usize,
	read_only: bool,
}

impl FieldInfo {
	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn ty(&self) -> StateType {
		self.ty
	}

	pub fn index(&self) -> usize {
		self.index
	}

	pub fn read_only(&self) -> bool {
		self.read_only
	}
}

/// Resolved, schema-scoped handle for repeated access to one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accessor {
	schema: SchemaId,
	kind: FieldKind,
	index: usize,
	ty: StateType,
	read_only: bool,
	name: String,
}

impl Accessor {
	pub fn schema(&self) -> SchemaId {
		self.schema
	}

	pub fn kind(&self) -> FieldKind {
		self.kind
	}

	pub fn index(&self) -> usize {
		self.index
	}

	pub fn ty(&self) -> StateType {
		self.ty
	}

	pub fn read_only(&self) -> bool {
		self.read_only
	}

	pub fn name(&self) -> &str {
		&self.name
	}
}

/// An [`Accessor`] whose declared type is `T`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedAccessor<T> {
	raw: Accessor,
	_ty: PhantomData<fn() -> T>,
}

impl<T: StateValue> TypedAccessor<T> {
	/// Wraps `raw`, checking that it is declared as `T`.
	pub fn checked(raw: Accessor) -> Result<Self> {
		if raw.ty != T::STATE_TYPE {
			return Err(StateError::FieldTypeMismatch {
				field: raw.name,
				declared: raw.ty,
				requested: T::STATE_TYPE,
			});
		}
		Ok(Self {
			raw,
			_ty: PhantomData,
		})
	}

	pub fn raw(&self) -> &Accessor {
		&self.raw
	}

	pub fn into_raw(self) -> Accessor {
		self.raw
	}
}

/// One part (static or dynamic) of a table's schema.
#[derive(Debug, Clone)]
pub struct FieldSet {
	table: String,
	schema: SchemaId,
	kind: FieldKind,
	fields: Vec<FieldInfo>,
	by_name: FxHashMap<String, usize>,
}

/// Static part of a schema.
pub type StaticFields = FieldSet;
/// Dynamic part of a schema.
pub type DynamicFields = FieldSet;

impl FieldSet {
	pub(crate) fn new(table: &str, schema: SchemaId, kind: FieldKind) -> Self {
		Self {
			table: table.to_string(),
			schema,
			kind,
			fields: Vec::new(),
			by_name: FxHashMap::default(),
		}
	}

	pub fn kind(&self) -> FieldKind {
		self.kind
	}

	pub fn schema(&self) -> SchemaId {
		self.schema
	}

	pub fn len(&self) -> usize {
		self.fields.len()
	}

	pub fn is_empty(&self) -> bool {
		self.fields.is_empty()
	}

	/// Fields in index order.
	pub fn iter(&self) -> impl Iterator<Item = &FieldInfo> {
		self.fields.iter()
	}

	pub fn get(&self, name: &str) -> Option<&FieldInfo> {
		self.by_name.get(name).map(|&i| &self.fields[i])
	}

	pub fn by_index(&self, index: usize) -> Option<&FieldInfo> {
		self.fields.get(index)
	}

	pub fn contains(&self, name: &str) -> bool {
		self.by_name.contains_key(name)
	}

	/// Builds the accessor for a field of this set.
	pub fn accessor_for(&self, info: &FieldInfo) -> Accessor {
		Accessor {
			schema: self.schema,
			kind: self.kind,
			index: info.index,
			ty: info.ty,
			read_only: info.read_only,
			name: info.name.clone(),
		}
	}

	/// Resolves a field by name.
	pub fn accessor(&self, name: &str) -> Result<Accessor> {
		let info = self.get(name).ok_or_else(|| StateError::FieldNotFound {
			table: self.table.clone(),
			field: name.to_string(),
		})?;
		Ok(self.accessor_for(info))
	}

	/// Resolves a field by name, checking that it is declared as `T`.
	pub fn typed<T: StateValue>(&self, name: &str) -> Result<TypedAccessor<T>> {
		TypedAccessor::checked(self.accessor(name)?)
	}

	/// Appends a field, assigning the next index.
	pub(crate) fn push(&mut self, name: &str, ty: StateType, read_only: bool) -> Result<&FieldInfo> {
		if self.by_name.contains_key(name) {
			return Err(StateError::FieldExists {
				table: self.table.clone(),
				field: name.to_string(),
			});
		}
		let index = self.fields.len();
		self.fields.push(FieldInfo {
			name: name.to_string(),
			ty,
			index,
			read_only,
		});
		self.by_name.insert(name.to_string(), index);
		Ok(&self.fields[index])
	}
}

/// Definition of a table's static fields, consumed when the table is built.
#[derive(Debug, Clone, Default)]
pub struct StaticFieldsDef {
	fields: Vec<(String, StateType, bool)>,
}

impl StaticFieldsDef {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a writable field.
	pub fn field(mut self, name: impl Into<String>, ty: StateType) -> Self {
		self.fields.push((name.into(), ty, false));
		self
	}

	/// Adds a read-only field.
	pub fn read_only_field(mut self, name: impl Into<String>, ty: StateType) -> Self {
		self.fields.push((name.into(), ty, true));
		self
	}

	pub(crate) fn build(self, table: &str, schema: SchemaId) -> Result<FieldSet> {
		let mut set = FieldSet::new(table, schema, FieldKind::Static);
		for (name, ty, read_only) in self.fields {
			set.push(&name, ty, read_only)?;
		}
		Ok(set)
	}
}
