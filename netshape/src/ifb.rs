//! Intermediate functional block (IFB) device handling.
//!
//! `netem` only shapes egress. To shape downloads, everything arriving on the real interface is
//! redirected to the egress side of [`IFB_DEVICE`], where a second netem qdisc applies.

use crate::{
    command::{self, Privileged},
    outcome::Outcome,
    tc,
};

/// The single IFB device used for ingress shaping.
pub const IFB_DEVICE: &str = "ifb0";

/// What [`provision`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provisioning {
    /// Result of `modprobe ifb`.
    pub module: Outcome,
    /// Result of `ip link add ifb0 type ifb`, only attempted when the module could not be loaded.
    pub link: Option<Outcome>,
}

/// Makes sure `ifb0` exists. Never fails.
///
/// Loading the `ifb` module creates the device. Where module loading is not allowed (typically
/// inside a container whose host already has the module), the link is created directly. A
/// failure there most often means the device is left over from a previous run, so it is ignored.
pub async fn provision<P: Privileged + ?Sized>(privileged: &P) -> Provisioning {
    let result = privileged.run(&command::args(["modprobe", "ifb"])).await;
    let module = Outcome::from_result(&result);

    if module == Outcome::Done {
        return Provisioning { module, link: None };
    }

    tracing::debug!(%module, "could not load ifb module, creating {IFB_DEVICE} directly");

    let result =
        privileged.run(&command::args(["ip", "link", "add", IFB_DEVICE, "type", "ifb"])).await;
    let link = Outcome::from_result(&result);

    if !link.is_benign() {
        tracing::warn!(%link, "failed to create {IFB_DEVICE}, continuing");
    }

    Provisioning { module, link: Some(link) }
}

/// Brings `ifb0` up and redirects all ingress traffic of `interface` to it.
///
/// Any failure is returned as is and aborts the sequence.
pub async fn redirect_ingress<P: Privileged + ?Sized>(
    privileged: &P,
    interface: &str,
) -> command::Result<()> {
    privileged.run(&command::args(["ip", "link", "set", "dev", IFB_DEVICE, "up"])).await?;
    privileged.run(&tc::add_ingress(interface)).await?;
    privileged.run(&tc::add_ingress_redirect(interface, IFB_DEVICE)).await?;

    tracing::debug!(interface, "redirected ingress to {IFB_DEVICE}");

    Ok(())
}
