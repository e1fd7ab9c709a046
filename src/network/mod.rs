use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use socket2::{Domain, Protocol, Socket, Type};
use tracing::info;

/// Creates and configures a UDP socket for TS packet reception.
/// Multicast groups are joined on `interface`, or the default interface
/// when none is given.
pub fn create_udp_socket(addr: &str, interface: Option<Ipv4Addr>) -> anyhow::Result<Socket> {
    let sock_addr: SocketAddr = addr.parse()?;
    let ip = match sock_addr.ip() {
        IpAddr::V4(v4) => v4,
        _ => anyhow::bail!("only IPv4 is supported"),
    };

    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&sock_addr.into())?;

    // Join multicast group if the address is multicast
    if ip.is_multicast() {
        let iface = interface.unwrap_or(Ipv4Addr::UNSPECIFIED);
        socket.join_multicast_v4(&ip, &iface)?;
        info!("Joined multicast group {ip} on interface {iface}");
    }

    socket.set_nonblocking(true)?;
    Ok(socket)
}

/// Wraps the configured socket for use on the tokio runtime.
pub fn bind_udp(addr: &str, interface: Option<Ipv4Addr>) -> anyhow::Result<tokio::net::UdpSocket> {
    let socket = create_udp_socket(addr, interface)?;
    Ok(tokio::net::UdpSocket::from_std(socket.into())?)
}
