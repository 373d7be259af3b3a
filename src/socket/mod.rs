mod builder;
mod descriptor;
mod endpoint;
mod io;
mod sys;

pub use self::builder::EndpointBuilder;
pub use self::descriptor::Descriptor;
pub use self::endpoint::Endpoint;
pub use self::sys::{Libc, Sys, SysResult};

use serde::Serialize;

/// Socket kind passed as the `type` argument of `socket()`.
///
/// "Unspecified" is expressed as `Option<Kind>::None` where the resolver
/// accepts or reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
	/// Sequenced, reliable, two-way byte stream (TCP).
	Stream,
	/// Connectionless, unreliable messages (UDP).
	Datagram,
	/// Sequenced, reliable, connection-based records of fixed maximum length.
	SeqPacket,
	/// Raw network protocol access.
	Raw,
	/// Reliable datagrams without ordering guarantees.
	Rdm,
}

impl Kind {
	/// Returns the libc constant for this socket kind.
	#[inline]
	pub fn raw(self) -> libc::c_int {
		match self {
			Kind::Stream => libc::SOCK_STREAM,
			Kind::Datagram => libc::SOCK_DGRAM,
			Kind::SeqPacket => libc::SOCK_SEQPACKET,
			Kind::Raw => libc::SOCK_RAW,
			Kind::Rdm => libc::SOCK_RDM,
		}
	}

	/// Maps a libc socket type; `None` for 0 and unknown values.
	pub fn from_raw(raw: libc::c_int) -> Option<Self> {
		match raw {
			libc::SOCK_STREAM => Some(Kind::Stream),
			libc::SOCK_DGRAM => Some(Kind::Datagram),
			libc::SOCK_SEQPACKET => Some(Kind::SeqPacket),
			libc::SOCK_RAW => Some(Kind::Raw),
			libc::SOCK_RDM => Some(Kind::Rdm),
			_ => None,
		}
	}

	pub fn name(self) -> &'static str {
		match self {
			Kind::Stream => "STREAM",
			Kind::Datagram => "DGRAM",
			Kind::SeqPacket => "SEQPACKET",
			Kind::Raw => "RAW",
			Kind::Rdm => "RDM",
		}
	}

	/// Kinds whose peer association can be dissolved with `AF_UNSPEC`.
	pub fn is_connectionless(self) -> bool {
		matches!(self, Kind::Datagram | Kind::Raw | Kind::Rdm)
	}
}

impl std::fmt::Display for Kind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.name())
	}
}

impl Serialize for Kind {
	fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(self.name())
	}
}

/// Lifecycle state of an [`Endpoint`].
///
/// ```text
/// Created ──bind──> Bound ──listen──> Listening ──accept──> (new Connected endpoint)
///    │                │                 ^
///    ├────listen──────┼─────────────────┘  (kernel binds an ephemeral port)
///    └────connect─────┴──────> Connected
/// any ──close──> Closed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum State {
	Created,
	Bound,
	Listening,
	Connected,
	Closed,
}

impl State {
	pub fn name(self) -> &'static str {
		match self {
			State::Created => "created",
			State::Bound => "bound",
			State::Listening => "listening",
			State::Connected => "connected",
			State::Closed => "closed",
		}
	}
}

impl std::fmt::Display for State {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.name())
	}
}
