pub mod buffer;
pub mod resolve;
pub mod socket;
mod addr;
mod error;
mod proto;

pub use self::addr::{
	AddrStorage, AnyAddr, Domain, Family, FromSockAddr, Ipv4, Ipv4Mapped, Ipv6, SocketAddrV4,
	SocketAddrV6, ToSockAddr, Unspec,
};
pub use self::buffer::{CircularBuffer, Direction, Scalar, Synced};
pub use self::error::{Errno, Error, Result, errno};
pub use self::proto::Protocol;
pub use self::resolve::{ProtocolHint, Purpose, Resolvable, Resolved, Resolver};
pub use self::socket::{Descriptor, Endpoint, EndpointBuilder, Kind, Libc, State, Sys, SysResult};
