use std::path::Path;
use std::time::Duration;

use sqlgraph_core::gql::JsonColumns;

pub(crate) fn path_valid(v: &str) -> Result<String, String> {
	match v {
		"memory" | ":memory:" => Ok(v.to_owned()),
		"" => Err(String::from("Provide a valid database path parameter")),
		v if Path::new(v).is_dir() => Err(String::from("Ensure the path is a file, not a directory")),
		v => Ok(v.to_owned()),
	}
}

pub(crate) fn duration(v: &str) -> Result<Duration, String> {
	humantime::parse_duration(v).map_err(|e| format!("invalid duration: {e}"))
}

pub(crate) fn json_columns(v: &str) -> Result<JsonColumns, String> {
	JsonColumns::new(v).map_err(|e| format!("invalid JSON column pattern: {e}"))
}
