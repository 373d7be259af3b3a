use crate::buffer::Direction;

/// Errors raised by buffers, addresses, lookups and endpoints.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{op}() failed: {}", errno_to_str(*.errno))]
    System { op: &'static str, errno: i32 },

    #[error("address resolution failed: {message}")]
    Resolution { message: String },

    #[error("address resolution ran out of memory")]
    OutOfMemory,

    #[error("protocol {query} not found in protocol database")]
    Lookup { query: String },

    #[error("invalid address: {reason}")]
    InvalidAddress { reason: String },

    #[error("invalid conversion: expected {expected}, storage holds family {found}")]
    InvalidConversion { expected: &'static str, found: i32 },

    #[error("unsupported address family {family}")]
    InvalidFamily { family: i32 },

    #[error("{op}() not allowed on {state} endpoint")]
    InvalidState { op: &'static str, state: &'static str },

    #[error("insufficient data: need {needed} bytes, {available} available")]
    InsufficientData { needed: usize, available: usize },

    #[error("insufficient space: need {needed} bytes, {available} free")]
    InsufficientSpace { needed: usize, available: usize },

    #[error("transfer failed with code {code}")]
    Transfer { code: isize },

    #[error("{op}() requires an {expected} buffer")]
    Direction { op: &'static str, expected: Direction },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn system(op: &'static str, errno: Errno) -> Self {
        Error::System { op, errno: errno.0 }
    }

    /// OS error code carried by this error, if any.
    pub fn errno(&self) -> Option<i32> {
        match self {
            Error::System { errno, .. } => Some(*errno),
            _ => None,
        }
    }
}

/// Raw OS error code returned by a failed primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Errno(pub i32);

impl Errno {
    /// Captures the calling thread's current errno.
    #[inline]
    pub fn last() -> Self {
        Errno(errno())
    }
}

/// Returns current errno value.
#[inline]
pub fn errno() -> i32 {
    unsafe { *libc::__errno_location() }
}

/// Converts errno to human-readable string.
fn errno_to_str(errno: i32) -> String {
    match errno {
        libc::EACCES => "permission denied".into(),
        libc::EADDRINUSE => "address already in use".into(),
        libc::EADDRNOTAVAIL => "address not available".into(),
        libc::EAFNOSUPPORT => "address family not supported".into(),
        libc::EAGAIN => "resource temporarily unavailable".into(),
        libc::EBADF => "bad file descriptor".into(),
        libc::ECONNREFUSED => "connection refused".into(),
        libc::ECONNRESET => "connection reset by peer".into(),
        libc::EINTR => "interrupted by signal".into(),
        libc::EINVAL => "invalid argument".into(),
        libc::EISCONN => "already connected".into(),
        libc::EMFILE => "too many open files".into(),
        libc::ENETUNREACH => "network unreachable".into(),
        libc::ENOBUFS => "no buffer space available".into(),
        libc::ENOTCONN => "not connected".into(),
        libc::ENOTSOCK => "not a socket".into(),
        libc::EOPNOTSUPP => "operation not supported".into(),
        libc::EPIPE => "broken pipe".into(),
        libc::EPROTONOSUPPORT => "protocol not supported".into(),
        libc::ETIMEDOUT => "connection timed out".into(),
        _ => format!("errno {}", errno),
    }
}

/// Maps errno to std::io::ErrorKind.
fn errno_to_kind(errno: i32) -> std::io::ErrorKind {
    match errno {
        libc::EACCES | libc::EPERM => std::io::ErrorKind::PermissionDenied,
        libc::EADDRINUSE => std::io::ErrorKind::AddrInUse,
        libc::EADDRNOTAVAIL => std::io::ErrorKind::AddrNotAvailable,
        libc::EAGAIN => std::io::ErrorKind::WouldBlock,
        libc::ECONNREFUSED => std::io::ErrorKind::ConnectionRefused,
        libc::ECONNRESET => std::io::ErrorKind::ConnectionReset,
        libc::EINTR => std::io::ErrorKind::Interrupted,
        libc::EINVAL => std::io::ErrorKind::InvalidInput,
        libc::ENOTCONN => std::io::ErrorKind::NotConnected,
        libc::EPIPE => std::io::ErrorKind::BrokenPipe,
        libc::ETIMEDOUT => std::io::ErrorKind::TimedOut,
        _ => std::io::ErrorKind::Other,
    }
}

impl From<Error> for std::io::Error {
    fn from(err: Error) -> Self {
        let kind = match &err {
            Error::System { errno, .. } => errno_to_kind(*errno),
            Error::OutOfMemory => std::io::ErrorKind::OutOfMemory,
            Error::Lookup { .. } => std::io::ErrorKind::NotFound,
            Error::InvalidAddress { .. }
            | Error::InvalidConversion { .. }
            | Error::InvalidFamily { .. }
            | Error::Direction { .. } => std::io::ErrorKind::InvalidInput,
            Error::InsufficientData { .. } => std::io::ErrorKind::UnexpectedEof,
            Error::InsufficientSpace { .. } => std::io::ErrorKind::WriteZero,
            Error::Resolution { .. }
            | Error::InvalidState { .. }
            | Error::Transfer { .. } => std::io::ErrorKind::Other,
        };
        std::io::Error::new(kind, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_error_renders_errno_text() {
        let err = Error::system("bind", Errno(libc::EADDRINUSE));
        assert_eq!(err.to_string(), "bind() failed: address already in use");
        assert_eq!(err.errno(), Some(libc::EADDRINUSE));
    }

    #[test]
    fn io_conversion_keeps_kind() {
        let err: std::io::Error = Error::system("connect", Errno(libc::ECONNREFUSED)).into();
        assert_eq!(err.kind(), std::io::ErrorKind::ConnectionRefused);

        let err: std::io::Error = Error::InsufficientData { needed: 4, available: 3 }.into();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
    }
}
