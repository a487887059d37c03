//! Shaping parameters.

use std::{num::NonZeroU32, path::Path};

use serde::Deserialize;

/// Default number of packets queued on top of the buffered-packet estimate.
pub const DEFAULT_PACKET_QUEUE: u32 = 50;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("round-trip time must be a finite, non-negative number of milliseconds, got {0}")]
    Rtt(f64),
    #[error("packet loss must be a percentage between 0 and 100, got {0}")]
    PacketLoss(f64),
    #[error("failed to read config file {path}: {source}")]
    Read { path: String, source: std::io::Error },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Link emulation parameters for [`NetworkShaper::start`](crate::NetworkShaper::start).
#[derive(Debug, Clone, PartialEq)]
pub struct ShapingConfig {
    /// Upload rate cap in kbit/s, applied on the real interface.
    pub up: Option<NonZeroU32>,
    /// Download rate cap in kbit/s, applied on the IFB device.
    pub down: Option<NonZeroU32>,
    /// Round-trip time in milliseconds. Half of it is added in each direction.
    pub rtt: f64,
    /// Packet loss percentage, applied in each rate-capped direction.
    pub packet_loss: f64,
    /// Extra packets allowed to queue on top of the buffered-packet estimate.
    pub packet_queue: u32,
}

impl Default for ShapingConfig {
    fn default() -> Self {
        Self {
            up: None,
            down: None,
            rtt: 0.0,
            packet_loss: 0.0,
            packet_queue: DEFAULT_PACKET_QUEUE,
        }
    }
}

impl ShapingConfig {
    /// Sets the upload cap in kbit/s. Zero means uncapped.
    pub fn with_up(mut self, kbit: u32) -> Self {
        self.up = NonZeroU32::new(kbit);
        self
    }

    /// Sets the download cap in kbit/s. Zero means uncapped.
    pub fn with_down(mut self, kbit: u32) -> Self {
        self.down = NonZeroU32::new(kbit);
        self
    }

    pub fn with_rtt(mut self, rtt_ms: f64) -> Self {
        self.rtt = rtt_ms;
        self
    }

    pub fn with_packet_loss(mut self, percent: f64) -> Self {
        self.packet_loss = percent;
        self
    }

    pub fn with_packet_queue(mut self, packets: u32) -> Self {
        self.packet_queue = packets;
        self
    }

    /// The one-way delay applied at each shaping point.
    pub fn half_rtt(&self) -> f64 {
        self.rtt / 2.0
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.rtt.is_finite() || self.rtt < 0.0 {
            return Err(ConfigError::Rtt(self.rtt));
        }

        if !self.packet_loss.is_finite() || !(0.0..=100.0).contains(&self.packet_loss) {
            return Err(ConfigError::PacketLoss(self.packet_loss));
        }

        Ok(())
    }
}

/// A partial [`ShapingConfig`], as read from a JSON file or assembled from flags.
///
/// ```json
/// { "up": 768, "down": 1600, "rtt": 150, "packetLoss": 0, "packetQueue": 50 }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Overrides {
    pub up: Option<u32>,
    pub down: Option<u32>,
    pub rtt: Option<f64>,
    pub packet_loss: Option<f64>,
    pub packet_queue: Option<u32>,
}

impl Overrides {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.display().to_string(), source })?;

        tracing::debug!(path = %path.display(), "loaded shaping config");

        Self::from_json(&json)
    }

    /// Overwrites the fields of `config` that are set here.
    pub fn apply(&self, mut config: ShapingConfig) -> ShapingConfig {
        if let Some(up) = self.up {
            config = config.with_up(up);
        }
        if let Some(down) = self.down {
            config = config.with_down(down);
        }
        if let Some(rtt) = self.rtt {
            config.rtt = rtt;
        }
        if let Some(loss) = self.packet_loss {
            config.packet_loss = loss;
        }
        if let Some(queue) = self.packet_queue {
            config.packet_queue = queue;
        }
        config
    }
}
