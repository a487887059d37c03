#![doc(issue_tracker_base_url = "https://github.com/netshape/netshape/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

//! Linux link emulation through `tc`.
//!
//! [`NetworkShaper`] caps upload and download rates, adds latency and injects packet loss on the
//! interface carrying the default route. Uploads are shaped by a `netem` qdisc on the interface
//! itself; downloads are redirected to the [`ifb0`](ifb::IFB_DEVICE) device and shaped there.
//!
//! ```no_run
//! use netshape::{NetworkShaper, Profile};
//!
//! # async fn run() -> netshape::Result<()> {
//! let shaper = NetworkShaper::system();
//! shaper.start(&Profile::ThreeG.config()).await?;
//! // ...
//! shaper.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod config;
pub mod ifb;
pub mod outcome;
pub mod profile;
pub mod route;
pub mod tc;

mod shaper;

pub use config::{Overrides, ShapingConfig};
pub use outcome::Outcome;
pub use profile::Profile;
pub use shaper::*;
