use std::sync::LazyLock;

/// The largest integer which can be represented exactly by an IEEE-754 double
/// (2^53 - 1). The `SafeInt` scalar rejects anything with a larger magnitude.
pub const MAX_SAFE_INTEGER: i64 = 9_007_199_254_740_991;

/// The smallest integer which can be represented exactly by an IEEE-754 double.
pub const MIN_SAFE_INTEGER: i64 = -MAX_SAFE_INTEGER;

/// The default pattern which marks a text column as holding embedded JSON.
///
/// Matches a `json` word, optionally joined to other words by underscores,
/// so `meta_json`, `json_payload` and `raw_json_blob` all match while
/// `jsonish` and `jason` do not.
pub const DEFAULT_JSON_COLUMN_PATTERN: &str = r"\b(?:(?:\w*_)*)json(?:(?:_\w*)*)\b";

/// The JSON column pattern, overridable through the environment.
pub static JSON_COLUMN_PATTERN: LazyLock<String> = lazy_env_parse!(
	"SQLGRAPH_JSON_COLUMN_PATTERN",
	String,
	DEFAULT_JSON_COLUMN_PATTERN.to_owned()
);

/// How often a change feed polls its table, in milliseconds (defaults to 1000).
pub static FEED_POLL_INTERVAL_MS: LazyLock<u64> =
	lazy_env_parse!("SQLGRAPH_FEED_POLL_INTERVAL_MS", u64, 1000);

/// The name suffix which identifies a primary key conflict target.
pub const PKEY_SUFFIX: &str = "_pkey";
