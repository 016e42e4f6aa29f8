//! The closed set of primitive types that keys and fields can take.

use std::fmt;
use std::hash::Hash;

use lookout_table_api as api;
use strum_macros::{Display, EnumIter};

use crate::error::{Result, StateError};
use crate::registry::{AnyTable, SharedTable};

/// Key or field type of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum StateType {
	#[strum(serialize = "int8")]
	I8,
	#[strum(serialize = "int16")]
	I16,
	#[strum(serialize = "int32")]
	I32,
	#[strum(serialize = "int64")]
	I64,
	#[strum(serialize = "uint8")]
	U8,
	#[strum(serialize = "uint16")]
	U16,
	#[strum(serialize = "uint32")]
	U32,
	#[strum(serialize = "uint64")]
	U64,
	#[strum(serialize = "string")]
	String,
	#[strum(serialize = "bool")]
	Bool,
}

impl StateType {
	/// ABI tag for this type.
	pub const fn to_raw(self) -> api::StateTypeTag {
		match self {
			StateType::I8 => api::STATE_TYPE_INT8,
			StateType::I16 => api::STATE_TYPE_INT16,
			StateType::I32 => api::STATE_TYPE_INT32,
			StateType::I64 => api::STATE_TYPE_INT64,
			StateType::U8 => api::STATE_TYPE_UINT8,
			StateType::U16 => api::STATE_TYPE_UINT16,
			StateType::U32 => api::STATE_TYPE_UINT32,
			StateType::U64 => api::STATE_TYPE_UINT64,
			StateType::String => api::STATE_TYPE_STRING,
			StateType::Bool => api::STATE_TYPE_BOOL,
		}
	}

	/// Parses an ABI tag.
	pub fn from_raw(raw: api::StateTypeTag) -> Result<Self> {
		Ok(match raw {
			api::STATE_TYPE_INT8 => StateType::I8,
			api::STATE_TYPE_INT16 => StateType::I16,
			api::STATE_TYPE_INT32 => StateType::I32,
			api::STATE_TYPE_INT64 => StateType::I64,
			api::STATE_TYPE_UINT8 => StateType::U8,
			api::STATE_TYPE_UINT16 => StateType::U16,
			api::STATE_TYPE_UINT32 => StateType::U32,
			api::STATE_TYPE_UINT64 => StateType::U64,
			api::STATE_TYPE_STRING => StateType::String,
			api::STATE_TYPE_BOOL => StateType::Bool,
			other => return Err(StateError::InvalidStateType(other)),
		})
	}
}

/// A key or field value with exactly one active variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
	I8(i8),
	I16(i16),
	I32(i32),
	I64(i64),
	U8(u8),
	U16(u16),
	U32(u32),
	U64(u64),
	String(String),
	Bool(bool),
}

impl Value {
	pub fn state_type(&self) -> StateType {
		match self {
			Value::I8(_) => StateType::I8,
			Value::I16(_) => StateType::I16,
			Value::I32(_) => StateType::I32,
			Value::I64(_) => StateType::I64,
			Value::U8(_) => StateType::U8,
			Value::U16(_) => StateType::U16,
			Value::U32(_) => StateType::U32,
			Value::U64(_) => StateType::U64,
			Value::String(_) => StateType::String,
			Value::Bool(_) => StateType::Bool,
		}
	}

	/// The value a field of type `ty` holds before it is first written.
	pub fn zero(ty: StateType) -> Self {
		match ty {
			StateType::I8 => Value::I8(0),
			StateType::I16 => Value::I16(0),
			StateType::I32 => Value::I32(0),
			StateType::I64 => Value::I64(0),
			StateType::U8 => Value::U8(0),
			StateType::U16 => Value::U16(0),
			StateType::U32 => Value::U32(0),
			StateType::U64 => Value::U64(0),
			StateType::String => Value::String(String::new()),
			StateType::Bool => Value::Bool(false),
		}
	}
}

impl fmt::Display for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Value::I8(v) => write!(f, "{v}"),
			Value::I16(v) => write!(f, "{v}"),
			Value::I32(v) => write!(f, "{v}"),
			Value::I64(v) => write!(f, "{v}"),
			Value::U8(v) => write!(f, "{v}"),
			Value::U16(v) => write!(f, "{v}"),
			Value::U32(v) => write!(f, "{v}"),
			Value::U64(v) => write!(f, "{v}"),
			Value::String(v) => write!(f, "{v:?}"),
			Value::Bool(v) => write!(f, "{v}"),
		}
	}
}

/// A native type that maps onto one [`StateType`].
pub trait StateValue: Clone + fmt::Debug + 'static {
	const STATE_TYPE: StateType;

	fn into_value(self) -> Value;

	fn from_value(value: Value) -> Result<Self>;
}

/// A [`StateValue`] usable as a table key.
///
/// Each key type knows its own slot in [`AnyTable`], which is how the registry
/// recovers a typed table from the type-erased directory without downcasting.
pub trait StateKey: StateValue + Eq + Hash {
	fn into_any_table(table: SharedTable<Self>) -> AnyTable;

	fn from_any_table(table: &AnyTable) -> Option<&SharedTable<Self>>;
}

macro_rules! state_types {
	($($ty:ty => $variant:ident),* $(,)?) => {
		$(
			impl StateValue for $ty {
				const STATE_TYPE: StateType = StateType::$variant;

				#[inline]
				fn into_value(self) -> Value {
					Value::$variant(self)
				}

				#[inline]
				fn from_value(value: Value) -> Result<Self> {
					match value {
						Value::$variant(v) => Ok(v),
						other => Err(StateError::ValueTypeMismatch {
							expected: StateType::$variant,
							actual: other.state_type(),
						}),
					}
				}
			}

			impl StateKey for $ty {
				#[inline]
				fn into_any_table(table: SharedTable<Self>) -> AnyTable {
					AnyTable::$variant(table)
				}

				#[inline]
				fn from_any_table(table: &AnyTable) -> Option<&SharedTable<Self>> {
					match table {
						AnyTable::$variant(t) => Some(t),
						_ => None,
					}
				}
			}
		)*
	};
}

state_types! {
	i8 => I8,
	i16 => I16,
	i32 => I32,
	i64 => I64,
	u8 => U8,
	u16 => U16,
	u32 => U32,
	u64 => U64,
	String => String,
	bool => Bool,
}
