/// A macro that allows lazily parsing a value from the environment variable,
/// with a fallback default value if the variable is not set or parsing fails.
///
/// # Parameters
///
/// - `$key`: An expression representing the name of the environment variable.
/// - `$t`: The type of the value to be parsed.
/// - `$default`: The default value to fall back to if the environment variable is not set or
///   parsing fails.
///
/// # Return Value
///
/// A lazy static variable of type `std::sync::LazyLock`, which holds the parsed
/// value from the environment variable or the default value.
#[macro_export]
macro_rules! lazy_env_parse {
	// With a static expression for the default value
	($key:expr_2021, $t:ty, $default:expr_2021) => {
		std::sync::LazyLock::new(|| {
			std::env::var($key).ok().and_then(|s| s.parse::<$t>().ok()).unwrap_or($default)
		})
	};
}

/// Returns early with the given error when the condition does not hold.
macro_rules! ensure {
	($cond:expr, $err:expr $(,)?) => {
		if !$cond {
			return Err($err);
		}
	};
}

#[cfg(test)]
mod tests {
	use std::sync::LazyLock;

	#[test]
	fn lazy_env_parse_falls_back_to_the_default() {
		static UNSET: LazyLock<u64> = lazy_env_parse!("SQLGRAPH_TEST_UNSET_VARIABLE", u64, 7);
		assert_eq!(*UNSET, 7);
		static INVALID: LazyLock<u64> = lazy_env_parse!("SQLGRAPH_TEST_INVALID_VARIABLE", u64, 3);
		// SAFETY: no other test reads or writes this variable
		unsafe { std::env::set_var("SQLGRAPH_TEST_INVALID_VARIABLE", "soon") };
		assert_eq!(*INVALID, 3);
		static PARSED: LazyLock<String> = lazy_env_parse!("SQLGRAPH_TEST_PARSED_VARIABLE", String, String::new());
		// SAFETY: no other test reads or writes this variable
		unsafe { std::env::set_var("SQLGRAPH_TEST_PARSED_VARIABLE", "^_json$") };
		assert_eq!(*PARSED, "^_json$");
	}
}
