mod common;

use ringsock::{
	AddrStorage, AnyAddr, Error, Family, FromSockAddr, SocketAddrV4, SocketAddrV6, ToSockAddr,
};

#[test]
fn parse_rejects_bad_text() {
	assert!(matches!(
		SocketAddrV4::parse("256.0.0.1", 80),
		Err(Error::InvalidAddress { .. })
	));
	assert!(matches!(
		SocketAddrV4::parse("::1", 80),
		Err(Error::InvalidAddress { .. })
	));
	assert!(matches!(
		SocketAddrV4::parse("127.0.0.1\0", 80),
		Err(Error::InvalidAddress { .. })
	));
}

#[test]
fn parse_ipv6_keeps_flow_and_scope() {
	let addr = SocketAddrV6::parse("2001:db8::42", 8443, 7, 2).unwrap();
	assert_eq!(addr.port(), 8443);
	assert_eq!(addr.flowinfo(), 7);
	assert_eq!(addr.scope_id(), 2);
	assert_eq!(addr.ip()[..4], [0x20, 0x01, 0x0d, 0xb8]);
	assert_eq!(addr.ip()[15], 0x42);
}

#[test]
fn storage_downcasts_check_the_family_tag() {
	let v4 = AddrStorage::from(SocketAddrV4::new([192, 0, 2, 1], 53));
	assert_eq!(v4.family(), Some(Family::Inet));
	assert_eq!(v4.as_inet().unwrap().port(), 53);
	assert!(matches!(
		v4.as_inet6(),
		Err(Error::InvalidConversion { expected: "AF_INET6", found }) if found == libc::AF_INET
	));

	let v6 = SocketAddrV6::localhost(53).to_storage();
	assert!(matches!(v6.as_inet(), Err(Error::InvalidConversion { .. })));
	assert_eq!(SocketAddrV6::from_storage(&v6).unwrap(), SocketAddrV6::localhost(53));
}

#[test]
fn unknown_family_is_invalid_family() {
	let unix = common::unix_peer("/run/app.sock");
	assert_eq!(unix.family(), None);
	assert!(matches!(
		AnyAddr::from_storage(&unix),
		Err(Error::InvalidFamily { family }) if family == libc::AF_UNIX
	));
	assert!(matches!(unix.as_inet(), Err(Error::InvalidConversion { .. })));

	let json: serde_json::Value = serde_json::from_str(&unix.to_string()).unwrap();
	assert_eq!(json["family"], libc::AF_UNIX);
}

#[test]
fn default_storage_is_unspec() {
	let storage = AddrStorage::default();
	assert_eq!(storage.raw_family(), libc::AF_UNSPEC);
	assert_eq!(storage.len() as usize, std::mem::size_of::<libc::sockaddr_storage>());
	assert_eq!(AnyAddr::from_storage(&storage).unwrap(), AnyAddr::Unspec);
	assert_eq!(storage.to_string(), r#"{"family":"AF_UNSPEC"}"#);
}

#[test]
fn any_addr_reports_family_and_port() {
	let v4 = AnyAddr::from(SocketAddrV4::any(25));
	let v6 = AnyAddr::from(SocketAddrV6::any(587));
	assert_eq!((v4.family(), v4.port()), (Family::Inet, Some(25)));
	assert_eq!((v6.family(), v6.port()), (Family::Inet6, Some(587)));
	assert_eq!(AnyAddr::Unspec.port(), None);
}

#[test]
fn storage_display_matches_concrete_display() {
	let addr = SocketAddrV6::with_scope([0xfe, 0x80, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 9], 22, 4);
	let storage = AddrStorage::from(addr);
	assert_eq!(storage.to_string(), addr.to_string());

	let json: serde_json::Value = serde_json::from_str(&addr.to_string()).unwrap();
	assert_eq!(json["ip"], "fe80::9");
	assert_eq!(json["scope_id"], 4);
}
