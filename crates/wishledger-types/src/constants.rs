//! System-wide constants for the WishLedger engine.

/// Units of tier_n that convert to exactly 1 unit of tier_{n+1}.
pub const CONVERSION_RATIO: u64 = 10;

/// Default maximum count for the green (base) tier.
pub const DEFAULT_MAX_GREEN: u64 = 1_000_000;

/// Default maximum count for the blue (middle) tier.
pub const DEFAULT_MAX_BLUE: u64 = 100_000;

/// Default maximum count for the red (top) tier.
pub const DEFAULT_MAX_RED: u64 = 10_000;

/// How long a pending entry may wait for a decision before it is surfaced
/// as stale (indeterminate) rather than assumed confirmed or rejected.
pub const DEFAULT_STALE_AFTER_MS: u64 = 30_000;

/// Applied-transaction-id window size (number of recently applied remote
/// transaction ids remembered for duplicate suppression).
pub const DEFAULT_APPLIED_ID_WINDOW: usize = 4_096;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "WishLedger";
