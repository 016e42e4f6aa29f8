//! Table rows.

use std::rc::Rc;

use crate::error::{Result, StateError};
use crate::schema::{Accessor, FieldKind, SchemaId, TypedAccessor};
use crate::types::{StateValue, Value};

/// Field access on one row of a table.
pub trait TableEntry {
	/// Reads the field behind `accessor`.
	fn get_field(&self, accessor: &Accessor) -> Result<Value>;

	/// Writes the field behind `accessor`. The stored value is unchanged on failure.
	fn set_field(&mut self, accessor: &Accessor, value: Value) -> Result<()>;

	/// Typed read.
	fn read<T: StateValue>(&self, accessor: &TypedAccessor<T>) -> Result<T>
	where
		Self: Sized,
	{
		T::from_value(self.get_field(accessor.raw())?)
	}

	/// Typed write.
	fn write<T: StateValue>(&mut self, accessor: &TypedAccessor<T>, value: T) -> Result<()>
	where
		Self: Sized,
	{
		self.set_field(accessor.raw(), value.into_value())
	}
}

impl<E: TableEntry + ?Sized> TableEntry for &mut E {
	fn get_field(&self, accessor: &Accessor) -> Result<Value> {
		(**self).get_field(accessor)
	}

	fn set_field(&mut self, accessor: &Accessor, value: Value) -> Result<()> {
		(**self).set_field(accessor, value)
	}
}

impl<E: TableEntry + ?Sized> TableEntry for Box<E> {
	fn get_field(&self, accessor: &Accessor) -> Result<Value> {
		(**self).get_field(accessor)
	}

	fn set_field(&mut self, accessor: &Accessor, value: Value) -> Result<()> {
		(**self).set_field(accessor, value)
	}
}

/// Checks that a write is allowed before any state is touched.
pub(crate) fn check_write(accessor: &Accessor, value: &Value) -> Result<()> {
	if accessor.read_only() {
		return Err(StateError::ReadOnly(accessor.name().to_string()));
	}
	if value.state_type() != accessor.ty() {
		return Err(StateError::FieldTypeMismatch {
			field: accessor.name().to_string(),
			declared: accessor.ty(),
			requested: value.state_type(),
		});
	}
	Ok(())
}

/// A row of a native table.
///
/// Static fields are stored densely; dynamic fields are stored lazily and read as
/// their type's zero value until first written.
#[derive(Debug, Clone)]
pub struct Entry {
	table: Rc<str>,
	schema: SchemaId,
	statics: Box<[Value]>,
	dynamics: Vec<Option<Value>>,
}

impl Entry {
	pub(crate) fn new(table: Rc<str>, schema: SchemaId, statics: Box<[Value]>) -> Self {
		Self {
			table,
			schema,
			statics,
			dynamics: Vec::new(),
		}
	}

	pub fn schema(&self) -> SchemaId {
		self.schema
	}

	fn check_schema(&self, accessor: &Accessor) -> Result<()> {
		if accessor.schema() != self.schema {
			return Err(StateError::ForeignSchema {
				table: self.table.to_string(),
				what: "field accessor",
			});
		}
		Ok(())
	}

	fn slot_missing(&self, accessor: &Accessor) -> StateError {
		StateError::AccessorNotFound {
			table: self.table.to_string(),
			index: accessor.index(),
		}
	}
}

impl TableEntry for Entry {
	fn get_field(&self, accessor: &Accessor) -> Result<Value> {
		self.check_schema(accessor)?;
		match accessor.kind() {
			FieldKind::Static => self
				.statics
				.get(accessor.index())
				.cloned()
				.ok_or_else(|| self.slot_missing(accessor)),
			FieldKind::Dynamic => Ok(self
				.dynamics
				.get(accessor.index())
				.and_then(|v| v.clone())
				.unwrap_or_else(|| Value::zero(accessor.ty()))),
		}
	}

	fn set_field(&mut self, accessor: &Accessor, value: Value) -> Result<()> {
		self.check_schema(accessor)?;
		check_write(accessor, &value)?;
		match accessor.kind() {
			FieldKind::Static => {
				let missing = self.slot_missing(accessor);
				let slot = self.statics.get_mut(accessor.index()).ok_or(missing)?;
				*slot = value;
			}
			FieldKind::Dynamic => {
				let index = accessor.index();
				if self.dynamics.len() <= index {
					self.dynamics.resize(index + 1, None);
				}
				self.dynamics[index] = Some(value);
			}
		}
		Ok(())
	}
}
