use std::sync::LazyLock;

use crate::cnf::{PKG_NAME, PKG_VERSION};

/// Stores the current release identifier
pub static RELEASE: LazyLock<String> = LazyLock::new(|| {
	format!("{PKG_NAME} {} for {} on {}", *PKG_VERSION, std::env::consts::OS, std::env::consts::ARCH)
});

pub fn init() {
	// Log version
	info!("Running {}", *RELEASE);
}
