/// The maximum time-to-live value allowed.
///
/// The IP `ttl` is an u8 (0..255) but since a `ttl` of zero isn't useful we only allow 254 distinct
/// hops (1..255).
pub const MAX_TTL: u8 = 254;

/// The maximum _starting_ sequence number allowed.
///
/// This ensures that there are sufficient sequence numbers available for a full trace of `MAX_TTL`
/// hops without wrapping.
pub const MAX_INITIAL_SEQUENCE: u16 = u16::MAX - MAX_TTL as u16;
