use ringsock::{
	AnyAddr, Family, Ipv4, Ipv4Mapped, Kind, Protocol, ProtocolHint, Purpose, Resolver, State,
	Unspec,
};

#[test]
fn localhost_http_resolves_to_inet_port_80() {
	let entries = Resolver::<Ipv4>::new("80").node("localhost").resolve().unwrap();

	assert!(!entries.is_empty());
	for entry in &entries {
		assert_eq!(entry.family, Family::Inet);
		assert_eq!(entry.addr.port(), 80);
	}
	assert!(entries.iter().any(|entry| entry.addr.ip() == [127, 0, 0, 1]));
}

#[test]
fn kind_hint_narrows_entries() {
	let entries = Resolver::<Ipv4>::new("53")
		.node("127.0.0.1")
		.kind(Kind::Datagram)
		.resolve()
		.unwrap();

	assert_eq!(entries.len(), 1);
	assert_eq!(entries[0].kind, Some(Kind::Datagram));
	assert_eq!(entries[0].addr.ip(), [127, 0, 0, 1]);
}

#[test]
fn passive_lookup_yields_wildcard() {
	let entries = Resolver::<Ipv4>::new("8080")
		.kind(Kind::Stream)
		.purpose(Purpose::Bind)
		.resolve()
		.unwrap();

	assert_eq!(entries[0].addr.ip(), [0, 0, 0, 0]);
	assert_eq!(entries[0].addr.port(), 8080);
}

#[test]
fn protocol_number_hint_is_honoured() {
	let entries = Resolver::<Ipv4>::new("443")
		.node("127.0.0.1")
		.kind(Kind::Stream)
		.protocol(ProtocolHint::Number(libc::IPPROTO_TCP))
		.resolve()
		.unwrap();

	assert!(!entries.is_empty());
	assert!(entries.iter().all(|entry| entry.kind == Some(Kind::Stream)));
}

#[test]
fn protocols_are_shared_within_one_resolution() {
	let entries = Resolver::<Unspec>::new("80")
		.node("127.0.0.1")
		.kind(Kind::Stream)
		.resolve()
		.unwrap();
	let protocols: Vec<&Protocol> = entries.iter().filter_map(|entry| entry.protocol.as_ref()).collect();

	for pair in protocols.windows(2) {
		if pair[0].number() == pair[1].number() {
			assert!(pair[0].shares_record(pair[1]));
		}
	}
}

#[test]
fn mapped_lookup_returns_ipv6_form() {
	let entries = Resolver::<Ipv4Mapped>::new("80")
		.node("127.0.0.1")
		.kind(Kind::Stream)
		.resolve()
		.unwrap();

	assert!(!entries.is_empty());
	assert_eq!(entries[0].family, Family::Inet6);
	let mapped = entries[0].addr.to_ipv4_mapped().unwrap();
	assert_eq!(mapped.ip(), [127, 0, 0, 1]);
	assert_eq!(mapped.port(), 80);
}

#[test]
fn resolved_entry_opens_matching_endpoint() {
	let entries = Resolver::<Unspec>::new("0")
		.node("127.0.0.1")
		.kind(Kind::Datagram)
		.purpose(Purpose::Bind)
		.resolve()
		.unwrap();
	let entry = &entries[0];
	assert!(matches!(entry.addr, AnyAddr::Inet(_)));

	let mut endpoint = entry.open().unwrap();
	assert_eq!(endpoint.family(), Family::Inet);
	assert_eq!(endpoint.kind(), Kind::Datagram);
	endpoint.bind(entry.addr).unwrap();
	assert_eq!(endpoint.state(), State::Bound);
	assert!(matches!(endpoint.sock_name().unwrap(), AnyAddr::Inet(addr) if addr.port() != 0));
}

#[test]
fn numeric_host_has_no_canonical_name_without_connect() {
	let entries = Resolver::<Ipv4>::new("80")
		.node("127.0.0.1")
		.purpose(Purpose::Bind)
		.resolve()
		.unwrap();

	assert!(entries.iter().all(|entry| entry.canonical_name.is_none()));
	let json: serde_json::Value = serde_json::from_str(&entries[0].to_string()).unwrap();
	assert_eq!(json["canonname"], serde_json::Value::Null);
	assert_eq!(json["family"], "AF_INET");
}
