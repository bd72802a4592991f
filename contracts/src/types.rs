//! Shared primitive types.

/// Identity of a principal, token, router or farm.
///
/// Addresses are opaque strings (e.g. `0x10ED…`). The vault never interprets
/// them beyond equality.
pub type Address = String;

/// Monetary quantity in the smallest unit of its asset.
///
/// 128 bits so that 18-decimal amounts of any realistic size fit without
/// floating point. Every arithmetic operation on amounts is checked.
pub type Amount = u128;

/// Stable, zero-based position of a destination in the registry.
pub type DestinationIndex = usize;
