//! API constants

/// Versioned prefix every video route is nested under.
pub const API_PREFIX: &str = "/api/v0";

/// Multipart framing allowance on top of the largest accepted file.
pub const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;
