use tracing::Instrument as _;

use crate::{
    command::{self, Privileged, Shell, ShellRunner, Sudo},
    config::{ConfigError, ShapingConfig},
    ifb::{self, Provisioning, IFB_DEVICE},
    outcome::Outcome,
    route::{self, InterfaceError},
    tc::{self, Netem},
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid shaping config: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Interface(#[from] InterfaceError),
    #[error("privileged command failed: {0}")]
    Command(#[from] command::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// What [`NetworkShaper::stop`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Teardown {
    /// The interface that was cleaned, if it could be resolved.
    pub interface: Option<String>,
    /// Deletion of the interface's root qdisc. Holds the resolution error when `interface` is
    /// `None`.
    pub root: Outcome,
    /// Deletion of the interface's ingress qdisc.
    pub ingress: Outcome,
    /// Deletion of the root qdisc of [`IFB_DEVICE`].
    pub ifb_root: Outcome,
}

impl Teardown {
    /// `true` when every step either succeeded or had nothing to remove.
    pub fn is_clean(&self) -> bool {
        self.interface.is_some()
            && self.root.is_benign()
            && self.ingress.is_benign()
            && self.ifb_root.is_benign()
    }
}

/// What [`NetworkShaper::start`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Setup {
    /// The best-effort cleanup run before applying anything.
    pub cleanup: Teardown,
    /// The shaped interface.
    pub interface: String,
    pub provisioning: Provisioning,
}

/// Applies and removes link emulation on the default interface.
///
/// Upload traffic is shaped by a root `netem` qdisc on the interface itself. Download traffic is
/// redirected from the interface's ingress to [`IFB_DEVICE`] and shaped by a root `netem` qdisc
/// there.
///
/// There is no internal state: the interface is resolved on every call and the kernel is the only
/// source of truth. Concurrent `start`/`stop` calls race on that kernel state and are not
/// supported.
#[derive(Debug, Clone, Default)]
pub struct NetworkShaper<P = Sudo, S = Shell> {
    privileged: P,
    shell: S,
}

impl NetworkShaper {
    /// A shaper elevating through `sudo` and querying routes through `sh`.
    pub fn system() -> Self {
        Self::default()
    }
}

impl<P: Privileged, S: ShellRunner> NetworkShaper<P, S> {
    pub fn new(privileged: P, shell: S) -> Self {
        Self { privileged, shell }
    }

    /// Applies `config`, replacing any shaping left by a previous run.
    ///
    /// A failure part-way leaves the system partially configured; call [`Self::stop`] to clean
    /// up.
    pub async fn start(&self, config: &ShapingConfig) -> Result<Setup> {
        config.validate()?;

        let span = tracing::info_span!(
            "start",
            up = ?config.up,
            down = ?config.down,
            rtt = config.rtt,
            loss = config.packet_loss,
            queue = config.packet_queue,
        );

        async move {
            let cleanup = self.stop().await;

            let interface = route::default_interface(&self.shell).await?;
            let provisioning = ifb::provision(&self.privileged).await;
            ifb::redirect_ingress(&self.privileged, &interface).await?;
            apply_limits(&self.privileged, config, &interface).await?;

            tracing::info!(interface = %interface, "shaping applied");

            Ok::<_, Error>(Setup { cleanup, interface, provisioning })
        }
        .instrument(span)
        .await
    }

    /// Removes all shaping. Never fails: every step is best effort.
    pub async fn stop(&self) -> Teardown {
        async move {
            let (interface, root, ingress) = match route::default_interface(&self.shell).await {
                Ok(interface) => {
                    let (root, ingress) = self.clear_interface(&interface).await;
                    (Some(interface), root, ingress)
                }
                Err(e) => {
                    tracing::warn!(?e, "failed to resolve interface, only clearing {IFB_DEVICE}");
                    (None, Outcome::Failed(e.to_string()), Outcome::Skipped)
                }
            };

            let ifb_root = self.best_effort(tc::del_root(IFB_DEVICE)).await;

            let teardown = Teardown { interface, root, ingress, ifb_root };
            tracing::debug!(?teardown, "shaping removed");
            teardown
        }
        .instrument(tracing::info_span!("stop"))
        .await
    }

    /// Deletes the root and ingress qdiscs of `interface`. The ingress is removed even when there
    /// was no root qdisc.
    async fn clear_interface(&self, interface: &str) -> (Outcome, Outcome) {
        let root = self.best_effort(tc::del_root(interface)).await;
        let ingress = self.best_effort(tc::del_ingress(interface)).await;
        (root, ingress)
    }

    async fn best_effort(&self, args: Vec<String>) -> Outcome {
        let outcome = Outcome::from_result(&self.privileged.run(&args).await);
        if !outcome.is_benign() {
            tracing::warn!(cmd = %args.join(" "), %outcome, "ignoring failed cleanup step");
        }
        outcome
    }
}

/// Installs the netem qdiscs described by `config` on `interface` (upload) and [`IFB_DEVICE`]
/// (download).
///
/// At most one root qdisc may exist per device, so this fails unless both are clear.
pub async fn apply_limits<P: Privileged + ?Sized>(
    privileged: &P,
    config: &ShapingConfig,
    interface: &str,
) -> command::Result<()> {
    let half_rtt = config.half_rtt();

    if let Some(down) = config.down {
        let netem = Netem::shaped(down.get(), half_rtt, config.packet_queue, config.packet_loss);
        privileged.run(&tc::add_root_netem(IFB_DEVICE, &netem)).await?;
        tracing::info!(dev = IFB_DEVICE, %netem, "download shaped");
    }

    if let Some(up) = config.up {
        let netem = Netem::shaped(up.get(), half_rtt, config.packet_queue, config.packet_loss);
        privileged.run(&tc::add_root_netem(interface, &netem)).await?;
        tracing::info!(dev = interface, %netem, "upload shaped");
    }

    if config.up.is_none() && config.down.is_none() && half_rtt > 0.0 {
        let netem = Netem::delay(half_rtt);
        privileged.run(&tc::add_root_netem(IFB_DEVICE, &netem)).await?;
        privileged.run(&tc::add_root_netem(interface, &netem)).await?;
        tracing::info!(dev = interface, %netem, "latency applied in both directions");
    }

    Ok(())
}
