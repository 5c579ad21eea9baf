use clap::Args;

use crate::env::RELEASE;
use crate::err::Error;

#[derive(Args, Debug)]
pub struct VersionCommandArguments {
	#[arg(help = "Only output the version number")]
	#[arg(long = "short")]
	#[arg(default_value_t = false)]
	short: bool,
}

pub fn init(VersionCommandArguments {
	short,
}: VersionCommandArguments) -> Result<(), Error> {
	if short {
		println!("{}", *crate::cnf::PKG_VERSION);
	} else {
		println!("{}", *RELEASE);
	}
	Ok(())
}
