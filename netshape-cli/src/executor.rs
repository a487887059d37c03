//! Privilege elevation selected from the command line.

use netshape::command::{self, Direct, Output, Privileged, Sudo};

/// How privileged commands are run.
#[derive(Debug, Clone)]
pub enum Executor {
    Sudo(Sudo),
    Direct(Direct),
    DryRun(DryRun),
}

#[async_trait::async_trait]
impl Privileged for Executor {
    async fn run(&self, args: &[String]) -> command::Result<Output> {
        match self {
            Self::Sudo(sudo) => sudo.run(args).await,
            Self::Direct(direct) => direct.run(args).await,
            Self::DryRun(dry_run) => dry_run.run(args).await,
        }
    }
}

/// Prints privileged commands instead of running them. Every command "succeeds".
#[derive(Debug, Clone, Default)]
pub struct DryRun {
    prefix: Option<String>,
}

impl DryRun {
    /// Prefix printed commands with the elevation program they would run under.
    pub fn with_prefix(prefix: Option<&str>) -> Self {
        Self { prefix: prefix.map(str::to_string) }
    }

    pub fn render(&self, args: &[String]) -> String {
        let line = args.join(" ");
        match &self.prefix {
            Some(prefix) => format!("{prefix} {line}"),
            None => line,
        }
    }
}

#[async_trait::async_trait]
impl Privileged for DryRun {
    async fn run(&self, args: &[String]) -> command::Result<Output> {
        if args.is_empty() {
            return Err(command::Error::Empty);
        }

        println!("{}", self.render(args));
        Ok(Output::with_stdout(""))
    }
}
