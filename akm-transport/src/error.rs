//! Transport error types

use std::io;

use thiserror::Error;

/// Errors that can occur during bus operations
#[derive(Error, Debug)]
pub enum BusError {
    #[error("Device not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Operation not supported: {0}")]
    Unsupported(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The bus driver rejected the transaction
    #[error("{op}: transfer failed: {source}")]
    Transfer {
        op: &'static str,
        #[source]
        source: io::Error,
    },

    /// The bus completed fewer messages than were issued
    #[error("{op}: transfer failed (size error): {actual} of {expected} messages")]
    ShortTransfer {
        op: &'static str,
        expected: usize,
        actual: usize,
    },
}

impl BusError {
    /// Wrap an OS error code as a failed transfer
    pub fn transfer(op: &'static str, errno: i32) -> Self {
        BusError::Transfer {
            op,
            source: io::Error::from_raw_os_error(errno),
        }
    }

    /// Negative Linux status code for this error
    pub fn errno(&self) -> i32 {
        match self {
            BusError::NotFound(_) => -libc::ENODEV,
            BusError::InvalidArgument(_) => -libc::EINVAL,
            BusError::Unsupported(_) => -libc::EOPNOTSUPP,
            BusError::Io(e) | BusError::Transfer { source: e, .. } => {
                -e.raw_os_error().unwrap_or(libc::EIO)
            }
            BusError::ShortTransfer { .. } => -libc::ENXIO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errno_mapping() {
        assert_eq!(BusError::NotFound("x".into()).errno(), -libc::ENODEV);
        assert_eq!(BusError::InvalidArgument("x".into()).errno(), -libc::EINVAL);
        assert_eq!(
            BusError::ShortTransfer {
                op: "rxdata",
                expected: 2,
                actual: 1
            }
            .errno(),
            -libc::ENXIO
        );
    }

    #[test]
    fn test_transfer_keeps_os_code() {
        let e = BusError::transfer("txdata", libc::EREMOTEIO);
        assert_eq!(e.errno(), -libc::EREMOTEIO);
        assert!(e.to_string().starts_with("txdata: transfer failed"));
    }

    #[test]
    fn test_io_without_os_code_is_eio() {
        let e = BusError::Io(io::Error::new(io::ErrorKind::Other, "boom"));
        assert_eq!(e.errno(), -libc::EIO);
    }
}
