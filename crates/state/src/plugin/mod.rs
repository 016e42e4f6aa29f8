//! The ABI side of the bridge.
//!
//! - [`module`]: safe calls into an extension's table vtables.
//! - [`inbound`]: extension tables seen through the native [`Table`](crate::Table) contract.
//! - [`outbound`]: registered tables handed to an extension through the flat ABI.
//! - [`owner`]: the per-extension entry points (`list_tables`, `get_table`, ...).
//!
//! Errors never cross the boundary as values. Every entry point records the reason in
//! the calling extension's [`LastError`] and returns a failure sentinel.

use std::any::Any;
use std::cell::RefCell;
use std::ffi::{CString, c_char};
use std::panic::{self, AssertUnwindSafe};

use crate::error::{Result, StateError};

pub mod inbound;
pub mod module;
pub mod outbound;
pub mod owner;

pub use inbound::{NewPluginEntry, PluginEntry, PluginTable};
pub use module::{ForeignTable, PluginModule};
pub use outbound::OutboundTable;
pub use owner::PluginOwner;

/// Per-extension last error, readable by the extension as a C string.
#[derive(Debug, Default)]
pub struct LastError(RefCell<CString>);

impl LastError {
	pub fn set(&self, message: &str) {
		let bytes: Vec<u8> = message.bytes().filter(|&b| b != 0).collect();
		*self.0.borrow_mut() = CString::new(bytes).unwrap_or_default();
	}

	/// Records `err`. A failure reported by another extension is relayed with its
	/// text unchanged.
	pub fn record(&self, err: &StateError) {
		match err {
			StateError::Foreign { message, .. } => self.set(message),
			other => self.set(&other.to_string()),
		}
	}

	pub fn get(&self) -> String {
		self.0.borrow().to_string_lossy().into_owned()
	}

	/// Valid until the next [`set`](Self::set).
	pub fn as_ptr(&self) -> *const c_char {
		self.0.borrow().as_ptr()
	}
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
	if let Some(s) = payload.downcast_ref::<&str>() {
		s
	} else if let Some(s) = payload.downcast_ref::<String>() {
		s
	} else {
		"unknown panic"
	}
}

/// Runs one ABI entry point: errors and panics are recorded in `last_error` and
/// replaced by `fail`.
pub(crate) fn guard<T>(last_error: &LastError, op: &'static str, fail: T, f: impl FnOnce() -> Result<T>) -> T {
	match panic::catch_unwind(AssertUnwindSafe(f)) {
		Ok(Ok(value)) => value,
		Ok(Err(err)) => {
			tracing::trace!(op, error = %err, "table call failed");
			last_error.record(&err);
			fail
		}
		Err(payload) => {
			let message = panic_message(&*payload);
			tracing::warn!(op, panic = message, "panic caught at table boundary");
			last_error.set(&format!("panic in {op}: {message}"));
			fail
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn foreign_errors_are_relayed_verbatim() {
		let last = LastError::default();
		last.record(&StateError::Foreign {
			module: "dummy".into(),
			message: "disk on fire".into(),
		});
		assert_eq!(last.get(), "disk on fire");
	}

	#[test]
	fn nul_bytes_are_dropped() {
		let last = LastError::default();
		last.set("a\0b");
		assert_eq!(last.get(), "ab");
	}

	#[test]
	fn guard_converts_errors_and_panics() {
		let last = LastError::default();
		let v = guard(&last, "size", u64::MAX, || Err(StateError::EntryNotFound));
		assert_eq!(v, u64::MAX);
		assert_eq!(last.get(), "table entry not found");

		let v = guard(&last, "size", u64::MAX, || -> Result<u64> { panic!("boom") });
		assert_eq!(v, u64::MAX);
		assert_eq!(last.get(), "panic in size: boom");

		assert_eq!(guard(&last, "size", u64::MAX, || Ok(3)), 3);
	}
}
