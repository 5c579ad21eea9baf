//! Extraction of values from JSON text stored in columns.

use serde_json::Value as JsonValue;

use crate::err::{Error, Result};

/// Evaluates a path expression against a parsed JSON document.
pub trait PathEvaluator: Send + Sync {
	fn evaluate(&self, data: JsonValue, path: &str) -> Result<JsonValue>;
}

/// A [`PathEvaluator`] for JMESPath expressions.
#[derive(Clone, Copy, Debug, Default)]
pub struct JmesPath;

impl PathEvaluator for JmesPath {
	fn evaluate(&self, data: JsonValue, path: &str) -> Result<JsonValue> {
		let expr = jmespath::compile(path).map_err(|e| Error::PathExtraction(e.to_string()))?;
		let found = expr.search(data).map_err(|e| Error::PathExtraction(e.to_string()))?;
		Ok(serde_json::to_value(&*found)?)
	}
}

/// The post-processed value of a textual field.
#[derive(Clone, Debug, PartialEq)]
pub enum Extracted {
	Json(JsonValue),
	Text(String),
}

/// Post-processes the raw text of a field.
///
/// The text is parsed as JSON and, when a path is given, narrowed to the
/// sub-value it selects. Structured fields return the value itself, while
/// plain text fields return it serialized back to text. Any failure is
/// logged and yields the raw text unchanged.
pub fn extract(
	evaluator: &dyn PathEvaluator,
	raw: String,
	path: Option<&str>,
	structured: bool,
) -> Extracted {
	let parsed = match serde_json::from_str::<JsonValue>(&raw) {
		Ok(v) => v,
		Err(e) => {
			warn!("{}", Error::PathExtraction(format!("the field value is not valid JSON: {e}")));
			return Extracted::Text(raw);
		}
	};
	let value = match path {
		None => parsed,
		Some(path) => match evaluator.evaluate(parsed, path) {
			Ok(v) => v,
			Err(e) => {
				warn!("Unable to evaluate the path `{path}`: {e}");
				return Extracted::Text(raw);
			}
		},
	};
	if structured {
		return Extracted::Json(value);
	}
	match serde_json::to_string(&value) {
		Ok(text) => Extracted::Text(text),
		Err(e) => {
			warn!("{}", Error::from(e));
			Extracted::Text(raw)
		}
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	const DOC: &str = r#"{"x": 1, "tags": ["a", "b"], "owner": {"name": "ann"}}"#;

	#[test]
	fn structured_fields_return_the_selected_value() {
		let out = extract(&JmesPath, DOC.to_owned(), Some("owner.name"), true);
		assert_eq!(out, Extracted::Json(json!("ann")));
		let out = extract(&JmesPath, DOC.to_owned(), None, true);
		assert_eq!(out, Extracted::Json(serde_json::from_str(DOC).unwrap()));
	}

	#[test]
	fn text_fields_are_reserialized() {
		let out = extract(&JmesPath, DOC.to_owned(), Some("tags"), false);
		assert_eq!(out, Extracted::Text(r#"["a","b"]"#.to_owned()));
		let out = extract(&JmesPath, DOC.to_owned(), Some("missing"), false);
		assert_eq!(out, Extracted::Text("null".to_owned()));
	}

	#[test]
	fn failures_return_the_raw_text() {
		let out = extract(&JmesPath, "not json".to_owned(), Some("x"), true);
		assert_eq!(out, Extracted::Text("not json".to_owned()));
		let out = extract(&JmesPath, DOC.to_owned(), Some("x[?"), true);
		assert_eq!(out, Extracted::Text(DOC.to_owned()));
	}
}
