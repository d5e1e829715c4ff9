//! # Runtime configuration.
//!
//! Provides [`Config`], the centralized knobs for observers and diagnostics.
//!
//! Config is used in two ways:
//! 1. **Diagnostics**: `Bus::from_config(&cfg)` sizes the broadcast ring buffer
//! 2. **Observers**: `SubscribeBuilder::with_config(cfg)` controls value buffering
//!
//! ## Sentinel values
//! - `buffer_capacity = 0` → no preallocation (buffer grows on demand)
//! - `bus_capacity = 0` → clamped to 1 by [`Config::bus_capacity_clamped`]

/// Configuration shared by awaitable observers and the diagnostics bus.
///
/// ## Field semantics
/// - `bus_capacity`: Diagnostics ring buffer size (min 1; clamped by Bus)
/// - `retain_values`: Whether awaitable observers keep every observed value
/// - `buffer_capacity`: Initial capacity for the value buffer (`0` = none)
#[derive(Clone, Debug)]
pub struct Config {
    /// Capacity of the diagnostics broadcast channel ring buffer.
    ///
    /// Slow receivers that lag behind more than `bus_capacity` events
    /// observe `Lagged` and skip older items.
    pub bus_capacity: usize,

    /// Keep observed values so the typed awaiter can return them.
    ///
    /// With `false` the per-item callback still runs, but the typed result is empty.
    pub retain_values: bool,

    /// Number of values to preallocate in the observer buffer.
    pub buffer_capacity: usize,
}

impl Config {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns the buffer preallocation as an `Option`.
    ///
    /// - `None` → grow on demand
    /// - `Some(n)` → reserve `n` slots up front
    #[inline]
    pub fn buffer_capacity_hint(&self) -> Option<usize> {
        match self.buffer_capacity {
            0 => None,
            n => Some(n),
        }
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `bus_capacity = 1024`
    /// - `retain_values = true`
    /// - `buffer_capacity = 0` (grow on demand)
    fn default() -> Self {
        Self {
            bus_capacity: 1024,
            retain_values: true,
            buffer_capacity: 0,
        }
    }
}
