//! Error types for shardpool.

use crate::common::BlockId;

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write
/// `Result<T>`. This is a common Rust pattern (see `std::io::Result`).
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in shardpool.
///
/// # Recoverable vs. terminal
///
/// - [`Error::Io`] and [`Error::BlockOutOfRange`] are ordinary device
///   failures; callers may retry or surface them.
/// - [`Error::CacheExhausted`] is terminal. It means every slot in every
///   bucket is pinned, which is a sizing or leak bug in the caller; the
///   expected response is to propagate it to a top-level handler that
///   terminates the process. The cache performs no internal retry.
///
/// Frame-pool exhaustion is *not* an error: `allocate` returns `None` and
/// the caller decides how to respond (it is the moral equivalent of an
/// out-of-memory condition).
///
/// Bookkeeping contract violations (reference-count underflow, a frame
/// found allocated twice) abort immediately via `panic!` with a
/// diagnostic; continuing would corrupt shared structures.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error from the underlying block device.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The requested block lies beyond the device's capacity.
    #[error("block {0} is beyond device capacity")]
    BlockOutOfRange(BlockId),

    /// Every slot in every bucket is referenced; no eviction victim
    /// exists anywhere. Terminal for the process (see type docs).
    #[error("buffer cache exhausted: no unreferenced slot in any bucket")]
    CacheExhausted,
}
