//! `netshape profiles` — list the built-in connection profiles.

use clap::Args;
use netshape::Profile;

use crate::output;

/// Arguments for the `profiles` command.
#[derive(Args, Debug)]
pub struct ProfilesArgs {}

pub fn execute(_args: ProfilesArgs) -> anyhow::Result<()> {
    println!("{:<8} {:>8} {:>8} {:>6}", "PROFILE", "UP", "DOWN", "RTT");
    for profile in Profile::ALL {
        println!("{}", output::profile_row(profile));
    }
    Ok(())
}
