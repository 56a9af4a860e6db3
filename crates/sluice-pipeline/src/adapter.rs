//! The transport contract a pipeline stage is parameterized over.

use std::future::Future;

/// A handle to a byte region in the local address space.
///
/// Handles are cheap to clone and slice; they describe a region, they do
/// not own the transfer.
pub trait LocalWindow: Clone + Send + Sync {
    /// Length of the region in bytes.
    fn size_bytes(&self) -> usize;

    /// Local descriptor of the region: a dereferenceable pointer to its
    /// first byte.
    fn data(&self) -> *mut u8;

    /// A sub-window of `len` bytes starting `offset` bytes in.
    ///
    /// # Panics
    ///
    /// Implementations panic when `offset + len` exceeds the window.
    fn slice(&self, offset: usize, len: usize) -> Self;
}

/// A handle to a byte region owned by a transfer peer.
///
/// The region may be in another address space; the handle is an opaque
/// descriptor only its adapter knows how to address.
pub trait RemoteWindow: Clone + Send + Sync {
    /// Length of the region in bytes.
    fn size_bytes(&self) -> usize;

    /// A sub-window of `len` bytes starting `offset` bytes in.
    ///
    /// # Panics
    ///
    /// Implementations panic when `offset + len` exceeds the window.
    fn slice(&self, offset: usize, len: usize) -> Self;
}

/// An asynchronous one-way transport.
///
/// `transfer` moves the first `min(src.size_bytes(), dst.size_bytes())`
/// bytes of `src` into the region `dst` designates. Completion of the
/// returned future means the bytes are observable at the destination.
/// Failures must surface as a [`TransferError`], never abort.
pub trait Adapter: Send + Sync {
    type Local: LocalWindow;
    type Remote: RemoteWindow;

    fn transfer(
        &self,
        src: Self::Local,
        dst: Self::Remote,
    ) -> impl Future<Output = Result<(), TransferError>> + Send;
}

/// A recoverable transfer failure, propagated from an adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    /// The underlying transport reported a failure.
    Adapter(String),
}

impl TransferError {
    /// Wrap a transport-specific failure message.
    pub fn adapter(message: impl Into<String>) -> Self {
        Self::Adapter(message.into())
    }
}

impl std::fmt::Display for TransferError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Adapter(message) => write!(f, "transfer failed: {}", message),
        }
    }
}

impl std::error::Error for TransferError {}
