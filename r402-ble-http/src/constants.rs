//! Facilitator endpoint constants.

/// Public x402 facilitator used when none is configured.
pub const DEFAULT_FACILITATOR_URL: &str = "https://x402.org/facilitator/";

/// Path of the verify endpoint, relative to the facilitator base URL.
pub const VERIFY_PATH: &str = "./verify";

/// Path of the settle endpoint, relative to the facilitator base URL.
pub const SETTLE_PATH: &str = "./settle";

/// Path of the supported-kinds endpoint, relative to the facilitator base URL.
pub const SUPPORTED_PATH: &str = "./supported";
