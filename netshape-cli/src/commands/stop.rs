//! `netshape stop` — remove all shaping.

use clap::Args;

use crate::{commands::PrivilegeArgs, output};

/// Arguments for the `stop` command.
#[derive(Args, Debug)]
pub struct StopArgs {
    /// Exit with an error if a cleanup step failed for a reason other than "nothing to remove".
    #[arg(long)]
    pub strict: bool,
}

/// Executes the `stop` command. Cleanup is best effort and only fails with `--strict`.
pub async fn execute(args: StopArgs, privileges: &PrivilegeArgs) -> anyhow::Result<()> {
    let teardown = privileges.shaper().stop().await;
    output::print_teardown(&teardown);

    if args.strict && !teardown.is_clean() {
        anyhow::bail!("some shaping could not be removed");
    }

    Ok(())
}
