use thiserror::Error;

/// Rejected pool configuration.
///
/// Pool operations themselves never fail: an exhausted pool yields `None`
/// and foreign or duplicate returns are ignored. This type only covers
/// settings a caller may want to validate up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PoolError {
    /// A cap of zero was requested. Use `None` for an unbounded pool.
    #[error("max instances must be at least 1, use an unbounded pool instead of 0")]
    ZeroMaxInstances,
}
