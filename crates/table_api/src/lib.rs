//! Flat C ABI shared by the host and extensions for state tables.
//!
//! Everything here is plain data: opaque handles, a tagged value union, and three
//! capability vtables (fields, reader, writer). Neither side needs to know the
//! other's native types. A C header is generated from this file at build time.
//!
//! # Ownership
//!
//! - String pointers inside [`StateData`] are borrowed for the duration of one call.
//! - Entries returned by `create_table_entry` are owned by the caller until a
//!   successful `add_table_entry` or a `destroy_table_entry`. A failed insertion
//!   leaves the entry with the caller.
//! - Arrays returned by `list_table_fields` and `list_tables` stay valid until the
//!   next call on the same handle.
//!
//! # Errors
//!
//! Calls report failure through a sentinel (null, `u64::MAX`, or
//! [`PluginRc::FAILURE`]). The reason is read separately through the owning
//! module's last-error accessor.

use core::ffi::c_char;
use core::marker::{PhantomData, PhantomPinned};

/// Version of the table ABI described by this crate.
pub const TABLE_API_VERSION: u32 = 1;

/// Raw state type tag. See the `STATE_TYPE_*` constants.
pub type StateTypeTag = u32;

pub const STATE_TYPE_INT8: StateTypeTag = 1;
pub const STATE_TYPE_INT16: StateTypeTag = 2;
pub const STATE_TYPE_INT32: StateTypeTag = 3;
pub const STATE_TYPE_INT64: StateTypeTag = 4;
pub const STATE_TYPE_UINT8: StateTypeTag = 5;
pub const STATE_TYPE_UINT16: StateTypeTag = 6;
pub const STATE_TYPE_UINT32: StateTypeTag = 7;
pub const STATE_TYPE_UINT64: StateTypeTag = 8;
pub const STATE_TYPE_STRING: StateTypeTag = 9;
pub const STATE_TYPE_BOOL: StateTypeTag = 25;

/// Boolean as it crosses the boundary (0 or 1).
pub type PluginBool = u32;

/// Return code of table calls.
///
/// Kept as a transparent integer so that unknown values coming from an extension
/// are representable.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PluginRc(pub i32);

impl PluginRc {
	pub const SUCCESS: PluginRc = PluginRc(0);
	pub const FAILURE: PluginRc = PluginRc(1);
	pub const NOT_SUPPORTED: PluginRc = PluginRc(3);

	#[inline]
	pub fn is_success(self) -> bool {
		self == Self::SUCCESS
	}
}

/// One key or field value. The active member is selected by a [`StateTypeTag`]
/// carried next to it (table key type or field type).
#[repr(C)]
#[derive(Clone, Copy)]
pub union StateData {
	pub s8: i8,
	pub s16: i16,
	pub s32: i32,
	pub s64: i64,
	pub u8: u8,
	pub u16: u16,
	pub u32: u32,
	pub u64: u64,
	/// NUL-terminated, borrowed for the duration of the call.
	pub str: *const c_char,
	pub b: PluginBool,
}

impl StateData {
	/// All-zero value, used as an out-parameter before a read.
	pub const fn zeroed() -> Self {
		StateData { u64: 0 }
	}
}

impl Default for StateData {
	fn default() -> Self {
		Self::zeroed()
	}
}

macro_rules! opaque_handle {
	($($(#[$meta:meta])* $name:ident),* $(,)?) => {
		$(
			$(#[$meta])*
			#[repr(C)]
			pub struct $name {
				_data: [u8; 0],
				_marker: PhantomData<(*mut u8, PhantomPinned)>,
			}
		)*
	};
}

opaque_handle!(
	/// Opaque table handle.
	RawTable,
	/// Opaque entry handle.
	RawEntry,
	/// Opaque field accessor handle.
	RawField,
	/// Opaque handle to the host-side record of one extension.
	RawOwner,
	/// Opaque extension state, passed back to the extension's own callbacks.
	RawPluginState,
);

/// Descriptor of one table field.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct TableFieldInfo {
	pub name: *const c_char,
	pub field_type: StateTypeTag,
	pub read_only: PluginBool,
}

/// Descriptor of one registered table.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct TableInfo {
	pub name: *const c_char,
	pub key_type: StateTypeTag,
}

/// Schema capability group.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct TableFieldsVtable {
	pub list_table_fields:
		Option<unsafe extern "C" fn(t: *mut RawTable, nfields: *mut u32) -> *const TableFieldInfo>,
	pub get_table_field: Option<
		unsafe extern "C" fn(t: *mut RawTable, name: *const c_char, ty: StateTypeTag) -> *mut RawField,
	>,
	pub add_table_field: Option<
		unsafe extern "C" fn(t: *mut RawTable, name: *const c_char, ty: StateTypeTag) -> *mut RawField,
	>,
}

/// Read capability group.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct TableReaderVtable {
	pub get_table_name: Option<unsafe extern "C" fn(t: *mut RawTable) -> *const c_char>,
	/// Returns `u64::MAX` on failure.
	pub get_table_size: Option<unsafe extern "C" fn(t: *mut RawTable) -> u64>,
	/// Returns null when the key is absent or on failure.
	pub get_table_entry:
		Option<unsafe extern "C" fn(t: *mut RawTable, key: *const StateData) -> *mut RawEntry>,
	pub read_entry_field: Option<
		unsafe extern "C" fn(
			t: *mut RawTable,
			e: *mut RawEntry,
			f: *const RawField,
			out: *mut StateData,
		) -> PluginRc,
	>,
}

/// Write capability group.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct TableWriterVtable {
	pub clear_table: Option<unsafe extern "C" fn(t: *mut RawTable) -> PluginRc>,
	pub erase_table_entry:
		Option<unsafe extern "C" fn(t: *mut RawTable, key: *const StateData) -> PluginRc>,
	pub create_table_entry: Option<unsafe extern "C" fn(t: *mut RawTable) -> *mut RawEntry>,
	pub destroy_table_entry: Option<unsafe extern "C" fn(t: *mut RawTable, e: *mut RawEntry)>,
	/// Takes ownership of `e` and returns the attached handle. On failure returns null
	/// and `e` stays with the caller.
	pub add_table_entry: Option<
		unsafe extern "C" fn(t: *mut RawTable, key: *const StateData, e: *mut RawEntry) -> *mut RawEntry,
	>,
	pub write_entry_field: Option<
		unsafe extern "C" fn(
			t: *mut RawTable,
			e: *mut RawEntry,
			f: *const RawField,
			value: *const StateData,
		) -> PluginRc,
	>,
}

/// A table as seen through the flat ABI: a handle plus the vtables that operate on it.
///
/// Extensions fill one of these to register a table they implement. The host hands
/// one out (as `*mut RawTable`) for every table an extension opens.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct TableInput {
	pub table: *mut RawTable,
	pub name: *const c_char,
	pub key_type: StateTypeTag,
	pub fields: TableFieldsVtable,
	pub reader: TableReaderVtable,
	pub writer: TableWriterVtable,
}

/// Host entry points an extension uses to discover, open, and register tables.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct TablesOwnerVtable {
	pub list_tables: Option<unsafe extern "C" fn(o: *mut RawOwner, ntables: *mut u32) -> *const TableInfo>,
	pub get_table: Option<
		unsafe extern "C" fn(o: *mut RawOwner, name: *const c_char, key_type: StateTypeTag) -> *mut RawTable,
	>,
	pub add_table: Option<unsafe extern "C" fn(o: *mut RawOwner, input: *const TableInput) -> PluginRc>,
	/// Last error recorded for this extension by the host. Never null.
	pub get_owner_last_error: Option<unsafe extern "C" fn(o: *mut RawOwner) -> *const c_char>,
}

/// Extension-side accessor for its own last error.
pub type PluginLastErrorFn = unsafe extern "C" fn(s: *mut RawPluginState) -> *const c_char;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn state_data_is_eight_bytes() {
		assert_eq!(core::mem::size_of::<StateData>(), 8);
	}

	#[test]
	fn zeroed_state_data_reads_zero_in_every_member() {
		let d = StateData::zeroed();
		unsafe {
			assert_eq!(d.u64, 0);
			assert_eq!(d.s8, 0);
			assert_eq!(d.b, 0);
			assert!(d.str.is_null());
		}
	}

	#[test]
	fn rc_success() {
		assert!(PluginRc::SUCCESS.is_success());
		assert!(!PluginRc::FAILURE.is_success());
		assert!(!PluginRc(-1).is_success());
	}
}
