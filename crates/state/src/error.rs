//! Error types for table operations.

use crate::types::StateType;

/// Coarse classification of a [`StateError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	/// A table, field, or key is absent.
	NotFound,
	/// A declared type differs from the type requested or supplied.
	TypeMismatch,
	/// A name collides within a schema or registry, or an entry/accessor belongs to
	/// another table.
	SchemaConflict,
	/// The table implementation does not offer the operation.
	Unsupported,
	/// A write targeted a read-only field.
	ReadOnly,
	/// A value cannot cross the boundary as given.
	InvalidValue,
	/// An allocation or bounded cache could not grow.
	ResourceExhaustion,
	/// An extension reported failure through its own error channel.
	ForeignFailure,
}

/// Errors raised by tables, schemas, the registry, and the ABI adapters.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StateError {
	#[error("table not found: {0}")]
	TableNotFound(String),

	#[error("undefined field '{field}' in table '{table}'")]
	FieldNotFound { table: String, field: String },

	#[error("table entry not found")]
	EntryNotFound,

	#[error("accessor index {index} is not resolved in table '{table}'")]
	AccessorNotFound { table: String, index: usize },

	#[error("table '{table}' has key type {actual}, requested {expected}")]
	KeyTypeMismatch {
		table: String,
		expected: StateType,
		actual: StateType,
	},

	#[error("incompatible data types for field '{field}': declared {declared}, requested {requested}")]
	FieldTypeMismatch {
		field: String,
		declared: StateType,
		requested: StateType,
	},

	#[error("value of type {actual} where {expected} was expected")]
	ValueTypeMismatch { expected: StateType, actual: StateType },

	#[error("table already registered: {0}")]
	TableExists(String),

	#[error("field '{field}' is already defined in table '{table}'")]
	FieldExists { table: String, field: String },

	#[error("can't add dynamic field already defined as static: {0}")]
	StaticFieldConflict(String),

	#[error("field is defined as both static and dynamic: {0}")]
	AmbiguousField(String),

	#[error("{what} belongs to a different table than '{table}'")]
	ForeignSchema { table: String, what: &'static str },

	#[error("fields of table '{table}' diverged at index {index}: {reason}")]
	SchemaDiverged {
		table: String,
		index: usize,
		reason: String,
	},

	#[error("operation '{op}' not supported by table '{table}'")]
	Unsupported { table: String, op: &'static str },

	#[error("table is already in use by an outer call")]
	TableBusy,

	#[error("field '{0}' is read-only")]
	ReadOnly(String),

	#[error("can't convert state type tag: {0}")]
	InvalidStateType(u32),

	#[error("string value contains an interior NUL byte")]
	InteriorNul,

	#[error("null {0} pointer")]
	NullPointer(&'static str),

	#[error("resource exhausted: {0}")]
	ResourceExhausted(String),

	#[error("{module}: {message}")]
	Foreign { module: String, message: String },
}

impl StateError {
	pub fn kind(&self) -> ErrorKind {
		match self {
			StateError::TableNotFound(_)
			| StateError::FieldNotFound { .. }
			| StateError::EntryNotFound
			| StateError::AccessorNotFound { .. } => ErrorKind::NotFound,
			StateError::KeyTypeMismatch { .. }
			| StateError::FieldTypeMismatch { .. }
			| StateError::ValueTypeMismatch { .. } => ErrorKind::TypeMismatch,
			StateError::TableExists(_)
			| StateError::FieldExists { .. }
			| StateError::StaticFieldConflict(_)
			| StateError::AmbiguousField(_)
			| StateError::ForeignSchema { .. }
			| StateError::SchemaDiverged { .. } => ErrorKind::SchemaConflict,
			StateError::Unsupported { .. } | StateError::TableBusy => ErrorKind::Unsupported,
			StateError::ReadOnly(_) => ErrorKind::ReadOnly,
			StateError::InvalidStateType(_)
			| StateError::InteriorNul
			| StateError::NullPointer(_) => ErrorKind::InvalidValue,
			StateError::ResourceExhausted(_) => ErrorKind::ResourceExhaustion,
			StateError::Foreign { .. } => ErrorKind::ForeignFailure,
		}
	}

	pub(crate) fn unsupported(table: &str, op: &'static str) -> Self {
		StateError::Unsupported {
			table: table.to_string(),
			op,
		}
	}
}

/// Result type for table operations.
pub type Result<T> = std::result::Result<T, StateError>;
