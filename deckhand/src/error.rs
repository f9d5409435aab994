//! Error taxonomy shared across the crate.

use std::fmt;

use thiserror::Error;

/// The target of an image transfer, carried in transfer errors for
/// diagnostics.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum TransferTarget {
    /// A key display, addressed by logical key index.
    Key(u8),

    /// A touch display, addressed by display index.
    Display(u8),
}

impl fmt::Display for TransferTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(index) => write!(f, "key {index}"),
            Self::Display(index) => write!(f, "display {index}"),
        }
    }
}

/// Represents an error returned by the driver core.
///
/// Duplicate driver registration is deliberately not part of this taxonomy:
/// it is a bootstrap contract violation and panics at registration time.
#[derive(Debug, Error)]
pub enum Error {
    /// Indicates that discovery found no matching device, or that an
    /// addressed peripheral does not exist on the device.
    #[error("no supported deck found")]
    NotFound,

    /// Indicates that an operation was attempted on a closed session.
    #[error("the device session is closed")]
    Closed,

    /// Indicates that the underlying transport returned an error.
    #[error("the transport returned an error")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Indicates that an image could not be encoded into the model's wire
    /// pixel format.
    #[error("image encoding failed")]
    Encode(#[from] image::ImageError),

    /// Indicates that a paged image transfer failed mid-flight. The device
    /// may be left showing a torn frame; no rollback is attempted.
    #[error("image transfer to {target} failed")]
    Transfer {
        target: TransferTarget,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wraps an arbitrary transport-level error.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Box::new(err))
    }

    /// Checks whether the error (or, for transfers, its cause) is the
    /// session-closed error.
    pub fn is_closed(&self) -> bool {
        match self {
            Self::Closed => true,
            Self::Transfer { source, .. } => source.is_closed(),
            _ => false,
        }
    }
}
