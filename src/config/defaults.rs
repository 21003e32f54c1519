//! Default values for configuration options and CLI arguments

// File locations
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
pub const DEFAULT_MAPPING_PATH: &str = "channel_mappings.toml";
pub const DEFAULT_OUTPUT_PATH: &str = "epg.xml";

// Environment overrides for config file values, e.g. EPG_MERGE_FETCH__TIMEOUT=10s
pub const ENV_PREFIX: &str = "EPG_MERGE_";
pub const ENV_SEPARATOR: &str = "__";

// Fetch defaults
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_USER_AGENT: &str = concat!("epg-merge/", env!("CARGO_PKG_VERSION"));
