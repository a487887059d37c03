//! `netshape start` — shape the default interface.

use std::path::PathBuf;

use clap::Args;
use netshape::{Overrides, Profile, ShapingConfig};

use crate::{commands::PrivilegeArgs, output};

/// Arguments for the `start` command.
///
/// Values are layered: profile, then config file, then explicit flags.
#[derive(Args, Debug)]
pub struct StartArgs {
    /// Built-in connection profile, e.g. `3g` or `cable` (see `netshape profiles`).
    pub profile: Option<Profile>,

    /// Upload rate cap in kbit/s.
    #[arg(long)]
    pub up: Option<u32>,

    /// Download rate cap in kbit/s.
    #[arg(long)]
    pub down: Option<u32>,

    /// Round-trip time in milliseconds, split evenly between both directions.
    #[arg(long)]
    pub rtt: Option<f64>,

    /// Packet loss in percent.
    #[arg(long)]
    pub packet_loss: Option<f64>,

    /// Extra packets allowed to queue on top of the computed buffer.
    #[arg(long)]
    pub packet_queue: Option<u32>,

    /// JSON file with any of `up`, `down`, `rtt`, `packetLoss`, `packetQueue`.
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl StartArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            up: self.up,
            down: self.down,
            rtt: self.rtt,
            packet_loss: self.packet_loss,
            packet_queue: self.packet_queue,
        }
    }

    /// Resolves the final shaping configuration.
    pub fn shaping_config(&self) -> anyhow::Result<ShapingConfig> {
        let mut config = self.profile.map(Profile::config).unwrap_or_default();

        if let Some(path) = &self.config {
            config = Overrides::from_file(path)?.apply(config);
        }

        let config = self.overrides().apply(config);
        config.validate()?;

        Ok(config)
    }
}

/// Executes the `start` command.
pub async fn execute(args: StartArgs, privileges: &PrivilegeArgs) -> anyhow::Result<()> {
    let config = args.shaping_config()?;
    tracing::debug!(?config, "resolved shaping config");

    let setup = privileges.shaper().start(&config).await?;
    output::print_setup(&setup, &config);

    Ok(())
}
