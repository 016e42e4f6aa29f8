//! Conversion between [`Value`] and the [`StateData`] union.
//!
//! Strings arriving from the other side are borrowed for one call and copied
//! immediately. Strings going out are backed by a [`CString`] that the caller keeps
//! alive for exactly the duration of the outgoing call.

use std::ffi::{CStr, CString, c_char};
use std::fmt;

use lookout_table_api::StateData;

use crate::error::{Result, StateError};
use crate::types::{StateType, Value};

/// Copies a borrowed C string. Null reads as the empty string.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string valid for this call.
pub unsafe fn string_from_ptr(ptr: *const c_char) -> String {
	if ptr.is_null() {
		return String::new();
	}
	// SAFETY: non-null and NUL-terminated per the caller's contract.
	unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}

/// Reads the member of `data` selected by `ty`.
///
/// # Safety
///
/// `data` must have been written with the member matching `ty`; for strings the
/// pointer must satisfy [`string_from_ptr`].
pub unsafe fn value_from_data(data: &StateData, ty: StateType) -> Value {
	// SAFETY: the active member is selected by `ty` per the caller's contract.
	unsafe {
		match ty {
			StateType::I8 => Value::I8(data.s8),
			StateType::I16 => Value::I16(data.s16),
			StateType::I32 => Value::I32(data.s32),
			StateType::I64 => Value::I64(data.s64),
			StateType::U8 => Value::U8(data.u8),
			StateType::U16 => Value::U16(data.u16),
			StateType::U32 => Value::U32(data.u32),
			StateType::U64 => Value::U64(data.u64),
			StateType::String => Value::String(string_from_ptr(data.str)),
			StateType::Bool => Value::Bool(data.b != 0),
		}
	}
}

/// Writes `value` into `out`, borrowing string storage from `scratch`.
///
/// The string pointer written to `out` stays valid until `scratch` is next modified.
pub fn write_data(value: &Value, out: &mut StateData, scratch: &mut CString) -> Result<()> {
	*out = match value {
		Value::I8(v) => StateData { s8: *v },
		Value::I16(v) => StateData { s16: *v },
		Value::I32(v) => StateData { s32: *v },
		Value::I64(v) => StateData { s64: *v },
		Value::U8(v) => StateData { u8: *v },
		Value::U16(v) => StateData { u16: *v },
		Value::U32(v) => StateData { u32: *v },
		Value::U64(v) => StateData { u64: *v },
		Value::Bool(v) => StateData { b: u32::from(*v) },
		Value::String(s) => {
			*scratch = CString::new(s.as_str()).map_err(|_| StateError::InteriorNul)?;
			StateData { str: scratch.as_ptr() }
		}
	};
	Ok(())
}

/// A value prepared for one outgoing call.
pub struct OutgoingData {
	data: StateData,
	_string: Option<CString>,
}

impl fmt::Debug for OutgoingData {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("OutgoingData").field("string", &self._string).finish_non_exhaustive()
	}
}

impl OutgoingData {
	pub fn new(value: &Value) -> Result<Self> {
		let mut string = CString::default();
		let mut data = StateData::zeroed();
		write_data(value, &mut data, &mut string)?;
		Ok(Self {
			data,
			_string: matches!(value, Value::String(_)).then_some(string),
		})
	}

	pub fn data(&self) -> &StateData {
		&self.data
	}

	/// Pointer for the outgoing call. Valid while `self` is alive.
	pub fn as_ptr(&self) -> *const StateData {
		&self.data
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use strum::IntoEnumIterator;

	use super::*;
	use crate::error::ErrorKind;

	fn sample(ty: StateType) -> Value {
		match ty {
			StateType::I8 => Value::I8(-8),
			StateType::I16 => Value::I16(-1600),
			StateType::I32 => Value::I32(i32::MIN),
			StateType::I64 => Value::I64(-(1 << 40)),
			StateType::U8 => Value::U8(200),
			StateType::U16 => Value::U16(60000),
			StateType::U32 => Value::U32(u32::MAX),
			StateType::U64 => Value::U64(u64::MAX - 1),
			StateType::String => Value::String("héllo".into()),
			StateType::Bool => Value::Bool(true),
		}
	}

	#[test]
	fn outgoing_values_read_back() {
		for ty in StateType::iter() {
			let value = sample(ty);
			let out = OutgoingData::new(&value).unwrap();
			assert_eq!(unsafe { value_from_data(out.data(), ty) }, value);
		}
	}

	#[test]
	fn null_string_reads_empty() {
		let data = StateData::zeroed();
		assert_eq!(
			unsafe { value_from_data(&data, StateType::String) },
			Value::String(String::new())
		);
	}

	#[test]
	fn nonzero_bool_is_true() {
		let data = StateData { b: 7 };
		assert_eq!(unsafe { value_from_data(&data, StateType::Bool) }, Value::Bool(true));
	}

	#[test]
	fn interior_nul_is_invalid() {
		let err = OutgoingData::new(&Value::String("a\0b".into())).unwrap_err();
		assert_eq!(err.kind(), ErrorKind::InvalidValue);
	}

	#[test]
	fn scratch_string_backs_the_pointer() {
		let mut scratch = CString::default();
		let mut out = StateData::zeroed();
		write_data(&Value::String("comm".into()), &mut out, &mut scratch).unwrap();
		assert_eq!(unsafe { string_from_ptr(out.str) }, "comm");
		assert_eq!(unsafe { out.str }, scratch.as_ptr());
	}
}
