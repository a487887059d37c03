//! CLI command definitions and dispatch.

pub mod profiles;
pub mod start;
pub mod stop;

use clap::{Args, Parser, Subcommand};
use netshape::{
    command::{Direct, Shell, Sudo},
    NetworkShaper,
};

use crate::executor::{DryRun, Executor};

/// netshape — emulate slow, lossy links with Linux traffic control.
#[derive(Parser, Debug)]
#[command(name = "netshape", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub privileges: PrivilegeArgs,
}

/// How `tc`, `ip` and `modprobe` are invoked.
#[derive(Args, Debug, Clone, Default)]
pub struct PrivilegeArgs {
    /// Print the privileged commands instead of running them.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Run commands directly instead of through sudo (e.g. when already root).
    #[arg(long, global = true)]
    pub no_sudo: bool,

    /// Make sudo fail instead of prompting for a password.
    #[arg(long, global = true, conflicts_with = "no_sudo")]
    pub non_interactive: bool,
}

impl PrivilegeArgs {
    pub fn executor(&self) -> Executor {
        let prefix = (!self.no_sudo).then_some("sudo");

        if self.dry_run {
            Executor::DryRun(DryRun::with_prefix(prefix))
        } else if self.no_sudo {
            Executor::Direct(Direct)
        } else {
            Executor::Sudo(Sudo::default().non_interactive(self.non_interactive))
        }
    }

    pub fn shaper(&self) -> NetworkShaper<Executor, Shell> {
        NetworkShaper::new(self.executor(), Shell::default())
    }
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start shaping the default interface, replacing any previous shaping.
    Start(start::StartArgs),
    /// Remove all shaping.
    Stop(stop::StopArgs),
    /// List the built-in connection profiles.
    Profiles(profiles::ProfilesArgs),
}

/// Dispatches the parsed CLI command to its handler.
pub async fn execute(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Start(args) => start::execute(args, &cli.privileges).await,
        Command::Stop(args) => stop::execute(args, &cli.privileges).await,
        Command::Profiles(args) => profiles::execute(args),
    }
}
