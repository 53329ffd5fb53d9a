// Listener module
// Creates TCP listeners through socket2 so backlog and SO_REUSEPORT are configurable

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::TcpListener;

use crate::config::ServerConfig;

/// Create a non-blocking `TcpListener` bound to `addr`.
///
/// `SO_REUSEADDR` is always set so restarts can bind through `TIME_WAIT`;
/// `SO_REUSEPORT` follows `server.reuse_port` on Unix.
///
/// # Errors
///
/// Returns the OS error when the socket cannot be created, bound or put
/// into listening mode.
pub fn create_listener(
    addr: std::net::SocketAddr,
    server: &ServerConfig,
) -> std::io::Result<TcpListener> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;

    #[cfg(unix)]
    socket.set_reuse_port(server.reuse_port)?;
    socket.set_reuse_address(true)?;

    // Required before handing the socket to tokio
    socket.set_nonblocking(true)?;

    socket.bind(&addr.into())?;
    socket.listen(server.backlog)?;

    let std_listener: std::net::TcpListener = socket.into();
    TcpListener::from_std(std_listener)
}
