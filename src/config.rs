use crate::PoolError;

/// Construction settings for a [`Pool`](crate::Pool).
///
/// With the `serde` feature enabled this can be read straight out of a host
/// configuration file; missing fields fall back to [`Default`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PoolConfig {
    /// Instances manufactured up front and left free.
    pub prespawn: usize,
    /// Cap on created instances, `None` for unbounded.
    pub max_instances: Option<usize>,
}

impl PoolConfig {
    /// An unbounded pool with nothing prespawned.
    pub const fn new() -> Self {
        PoolConfig {
            prespawn: 0,
            max_instances: None,
        }
    }

    /// Sets the number of instances created on construction.
    pub const fn prespawn(mut self, count: usize) -> Self {
        self.prespawn = count;
        self
    }

    /// Caps the number of instances the pool may create.
    pub const fn max_instances(mut self, max: usize) -> Self {
        self.max_instances = Some(max);
        self
    }

    /// Checks the settings without building a pool.
    pub fn validate(&self) -> Result<(), PoolError> {
        match self.max_instances {
            Some(0) => Err(PoolError::ZeroMaxInstances),
            _ => Ok(()),
        }
    }
}
