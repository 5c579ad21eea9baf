use std::env;
use std::process::Command;

use semver::{BuildMetadata, Version};

const BUILD_VERSION: &str = "SQLGRAPH_BUILD_VERSION";
const BUILD_METADATA: &str = "SQLGRAPH_BUILD_METADATA";

fn main() {
	println!("cargo:rerun-if-env-changed={BUILD_VERSION}");
	println!("cargo:rerun-if-env-changed={BUILD_METADATA}");
	println!("cargo:rerun-if-changed=build.rs");
	// The version override is read with `option_env!`, it only needs checking here
	if let Ok(version) = env::var(BUILD_VERSION) {
		match Version::parse(version.trim()) {
			Ok(v) if v.build.is_empty() => (),
			Ok(_) => panic!("{BUILD_VERSION} must not carry build metadata, set {BUILD_METADATA}"),
			Err(e) => panic!("invalid {BUILD_VERSION} `{version}`: {e}"),
		}
	}
	let metadata = match env::var(BUILD_METADATA) {
		Ok(metadata) => metadata.trim().to_owned(),
		Err(_) => revision().unwrap_or_default(),
	};
	if metadata.is_empty() {
		return;
	}
	if let Err(e) = BuildMetadata::new(&metadata) {
		panic!("invalid {BUILD_METADATA} `{metadata}`: {e}");
	}
	println!("cargo:rustc-env={BUILD_METADATA}={metadata}");
}

/// The short hash of the checked out commit, if built from a git checkout.
fn revision() -> Option<String> {
	let output = Command::new("git").args(["rev-parse", "--short", "HEAD"]).output().ok()?;
	if !output.status.success() {
		return None;
	}
	let rev = String::from_utf8(output.stdout).ok()?.trim().to_owned();
	(!rev.is_empty()).then_some(rev)
}
