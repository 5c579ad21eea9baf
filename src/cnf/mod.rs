use std::sync::LazyLock;

pub const LOGO: &str = "
                 _                       _
 ___  __ _  __ _| |_ __ ___  _ __  __ _| |__
/ __|/ _` |/ _` | | '__/ _ \\| '_ \\/ _` | '_ \\
\\__ \\ (_| | (_| | | | | (_| | |_) (_| | | | |
|___/\\__, |\\__, |_|_|  \\__,_| .__/\\__,_|_| |_|
        |_| |___/           |_|
";

/// The publicly visible name of the server
pub const PKG_NAME: &str = "sqlgraph";

/// The publicly visible version of the server
pub static PKG_VERSION: LazyLock<String> =
	LazyLock::new(|| {
		let version = option_env!("SQLGRAPH_BUILD_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"));
		match option_env!("SQLGRAPH_BUILD_METADATA") {
			Some(metadata) if !metadata.trim().is_empty() => format!("{version}+{metadata}"),
			_ => version.to_owned(),
		}
	});

/// The address the server listens on when none is given
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// The path of the GraphQL endpoint
pub const GRAPHQL_PATH: &str = "/graphql";

/// The path of the GraphQL subscription endpoint
pub const GRAPHQL_WS_PATH: &str = "/graphql/ws";
