//! Protocol database records (`/etc/protocols`).

use std::ffi::{CStr, CString};
use std::fmt;
use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::addr::write_json;
use crate::error::{Error, Result};

/// `getprotobyname`/`getprotobynumber` return pointers into static storage.
static PROTOCOL_DB: Mutex<()> = Mutex::new(());

unsafe extern "C" {
	fn endprotoent();
}

#[derive(Debug, PartialEq, Eq, Serialize)]
struct Record {
	name: String,
	number: i32,
	aliases: Vec<String>,
}

/// Immutable protocol record, shared between clones.
///
/// Looked up once; cloning hands out the same record instead of querying
/// the database again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Protocol(Arc<Record>);

impl Protocol {
	/// Builds a record that did not come from the database.
	pub fn new<I, S>(name: impl Into<String>, number: i32, aliases: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self(Arc::new(Record {
			name: name.into(),
			number,
			aliases: aliases.into_iter().map(Into::into).collect(),
		}))
	}

	/// Looks up a protocol by name, e.g. `"tcp"`.
	pub fn by_name(name: &str) -> Result<Self> {
		let c_name = CString::new(name).map_err(|_| Error::Lookup { query: format!("{name:?}") })?;
		let _guard = PROTOCOL_DB.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
		let entry = unsafe { libc::getprotobyname(c_name.as_ptr()) };
		let record = unsafe { Self::copy_entry(entry) };
		unsafe { endprotoent() };
		record.ok_or_else(|| Error::Lookup { query: format!("{name:?}") })
	}

	/// Looks up a protocol by number, e.g. `6`.
	pub fn by_number(number: i32) -> Result<Self> {
		let _guard = PROTOCOL_DB.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
		let entry = unsafe { libc::getprotobynumber(number) };
		let record = unsafe { Self::copy_entry(entry) };
		unsafe { endprotoent() };
		record.ok_or_else(|| Error::Lookup { query: number.to_string() })
	}

	pub fn tcp() -> Result<Self> {
		Self::by_name("tcp")
	}

	pub fn udp() -> Result<Self> {
		Self::by_name("udp")
	}

	pub fn name(&self) -> &str {
		&self.0.name
	}

	pub fn number(&self) -> i32 {
		self.0.number
	}

	pub fn aliases(&self) -> &[String] {
		&self.0.aliases
	}

	/// True when both handles point at the same record.
	pub fn shares_record(&self, other: &Protocol) -> bool {
		Arc::ptr_eq(&self.0, &other.0)
	}

	/// Deep-copies a `protoent` out of libc's static storage.
	///
	/// # Safety
	/// `entry` is null or a valid `protoent` that stays untouched until this
	/// returns (callers hold `PROTOCOL_DB`).
	unsafe fn copy_entry(entry: *const libc::protoent) -> Option<Self> {
		if entry.is_null() {
			return None;
		}
		let entry = unsafe { &*entry };
		let name = unsafe { CStr::from_ptr(entry.p_name) }.to_string_lossy().into_owned();

		let mut aliases = Vec::new();
		if !entry.p_aliases.is_null() {
			let mut cursor = entry.p_aliases;
			loop {
				let alias = unsafe { *cursor };
				if alias.is_null() {
					break;
				}
				aliases.push(unsafe { CStr::from_ptr(alias) }.to_string_lossy().into_owned());
				cursor = unsafe { cursor.add(1) };
			}
		}

		Some(Self::new(name, entry.p_proto, aliases))
	}
}

impl Serialize for Protocol {
	fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
		self.0.serialize(serializer)
	}
}

impl fmt::Display for Protocol {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write_json(self, f)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn clones_share_the_record() {
		let tcp = Protocol::new("tcp", 6, ["TCP"]);
		let copy = tcp.clone();
		assert!(tcp.shares_record(&copy));
		assert!(!tcp.shares_record(&Protocol::new("tcp", 6, ["TCP"])));
		assert_eq!(copy.aliases(), ["TCP".to_string()]);
	}

	#[test]
	fn unknown_name_is_lookup_failure() {
		let err = Protocol::by_name("no-such-protocol-here").unwrap_err();
		assert!(matches!(err, Error::Lookup { .. }));
	}

	#[test]
	fn repeated_lookups_reopen_the_database() {
		let first = Protocol::by_number(libc::IPPROTO_UDP);
		let second = Protocol::by_number(libc::IPPROTO_UDP);
		match (first, second) {
			(Ok(first), Ok(second)) => {
				assert_eq!(first, second);
				assert!(!first.shares_record(&second));
				assert_eq!(Protocol::by_name(first.name()).unwrap(), first);
			}
			(Err(first), Err(second)) => assert_eq!(first.to_string(), second.to_string()),
			(first, second) => panic!("lookups disagree: {first:?} / {second:?}"),
		}
	}

	#[test]
	fn display_is_json() {
		let udp = Protocol::new("udp", 17, ["UDP"]);
		assert_eq!(udp.to_string(), r#"{"name":"udp","number":17,"aliases":["UDP"]}"#);
	}
}
