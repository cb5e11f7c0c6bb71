use super::LifecycleError;

pub const DEFAULT_BASE_PORT: u16 = 2000;

/// `max(ports) + 1`, or `base` when there are no ports yet.
///
/// Holes left by deleted containers are never reused.
pub fn next_port(base: u16, ports: impl IntoIterator<Item = u16>) -> Result<u16, LifecycleError> {
    match ports.into_iter().max() {
        None => Ok(base),
        Some(max) => max.checked_add(1).ok_or(LifecycleError::PortRangeExhausted),
    }
}
