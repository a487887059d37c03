//! `tc` command builders and queue sizing.
//!
//! Commands are produced as argument vectors for [`Privileged::run`](crate::command::Privileged),
//! never as shell strings, so device names need no quoting.

use std::fmt;

/// Handle of the root qdisc installed on both shaping points.
pub const ROOT_HANDLE: &str = "1:0";

/// Special parent handle of the ingress qdisc.
pub const INGRESS_PARENT: &str = "ffff:";

/// Size of the packets the queue is dimensioned for, in bytes.
const PACKET_SIZE: f64 = 1500.0;

/// Lower bound of the buffered-packet estimate.
const MIN_BUFFERED_PACKETS: u64 = 10;

/// Number of packets that must be in flight to sustain `rate_kbit` over a one-way delay of
/// `half_rtt_ms`, inflated by 1.5x and floored at 10.
///
/// See <https://lists.linuxfoundation.org/pipermail/netem/2007-March/001094.html>.
pub fn buffered_packets(rate_kbit: u32, half_rtt_ms: f64) -> u64 {
    let bytes_per_sec = (1.5 * f64::from(rate_kbit) * 1000.0) / 8.0;
    let packets = (bytes_per_sec * (half_rtt_ms / 1000.0) / PACKET_SIZE).ceil();

    // A NaN or negative delay yields 0 here and is floored below.
    (packets as u64).max(MIN_BUFFERED_PACKETS)
}

/// Formats a millisecond or percentage value in its shortest form (`75`, `12.5`).
fn number(value: f64) -> String {
    format!("{value}")
}

/// A `netem` qdisc specification.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Netem {
    /// Delay in milliseconds.
    pub delay_ms: f64,
    /// Rate cap in kbit/s.
    pub rate_kbit: Option<u32>,
    /// Queue limit in packets. The kernel stores it as a `u32`.
    pub limit: Option<u32>,
    /// Loss percentage, emitted only when greater than zero.
    pub loss: Option<f64>,
}

impl Netem {
    /// A pure-delay netem.
    pub fn delay(delay_ms: f64) -> Self {
        Self { delay_ms, ..Default::default() }
    }

    /// Set the rate cap in kbit/s.
    pub fn rate(mut self, rate_kbit: u32) -> Self {
        self.rate_kbit = Some(rate_kbit);
        self
    }

    /// Set the queue limit in packets.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the loss percentage. Zero (or less) clears it.
    pub fn loss(mut self, percent: f64) -> Self {
        self.loss = (percent > 0.0).then_some(percent);
        self
    }

    /// The rate-limited netem used for one shaping direction: the limit is the buffered-packet
    /// estimate plus `extra_queue` packets, capped at `u32::MAX`.
    pub fn shaped(rate_kbit: u32, delay_ms: f64, extra_queue: u32, loss: f64) -> Self {
        let packets = buffered_packets(rate_kbit, delay_ms).saturating_add(u64::from(extra_queue));
        let limit = u32::try_from(packets).unwrap_or(u32::MAX);
        Self::delay(delay_ms).rate(rate_kbit).limit(limit).loss(loss)
    }

    /// The `netem ...` tail of a `tc qdisc add` command.
    pub fn args(&self) -> Vec<String> {
        let mut args =
            vec!["netem".to_string(), "delay".to_string(), format!("{}ms", number(self.delay_ms))];

        if let Some(rate) = self.rate_kbit {
            args.extend(["rate".to_string(), format!("{rate}kbit")]);
        }

        if let Some(limit) = self.limit {
            args.extend(["limit".to_string(), limit.to_string()]);
        }

        if let Some(loss) = self.loss {
            args.extend(["loss".to_string(), format!("{}%", number(loss))]);
        }

        args
    }
}

impl fmt::Display for Netem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.args().join(" "))
    }
}

/// `tc qdisc add dev <dev> root handle 1:0 <netem...>`
pub fn add_root_netem(dev: &str, netem: &Netem) -> Vec<String> {
    let mut args =
        crate::command::args(["tc", "qdisc", "add", "dev", dev, "root", "handle", ROOT_HANDLE]);
    args.extend(netem.args());
    args
}

/// `tc qdisc add dev <dev> ingress`
pub fn add_ingress(dev: &str) -> Vec<String> {
    crate::command::args(["tc", "qdisc", "add", "dev", dev, "ingress"])
}

/// Redirects everything arriving on `dev` to the egress of `target`.
pub fn add_ingress_redirect(dev: &str, target: &str) -> Vec<String> {
    crate::command::args([
        "tc",
        "filter",
        "add",
        "dev",
        dev,
        "parent",
        INGRESS_PARENT,
        "protocol",
        "ip",
        "u32",
        "match",
        "u32",
        "0",
        "0",
        "flowid",
        "1:1",
        "action",
        "mirred",
        "egress",
        "redirect",
        "dev",
        target,
    ])
}

/// `tc qdisc del dev <dev> root`
pub fn del_root(dev: &str) -> Vec<String> {
    crate::command::args(["tc", "qdisc", "del", "dev", dev, "root"])
}

/// `tc qdisc del dev <dev> ingress`
pub fn del_ingress(dev: &str) -> Vec<String> {
    crate::command::args(["tc", "qdisc", "del", "dev", dev, "ingress"])
}
