//! Named connection presets.

use std::{fmt, str::FromStr};

use crate::config::ShapingConfig;

/// A preset connection type. Rates are in kbit/s, round-trip times in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Profile {
    ThreeG,
    ThreeGFast,
    ThreeGSlow,
    TwoG,
    Cable,
    Dsl,
    ThreeGEmerging,
    FourG,
    Lte,
    Edge,
    Dial,
    Fois,
}

impl Profile {
    pub const ALL: [Profile; 12] = [
        Self::ThreeG,
        Self::ThreeGFast,
        Self::ThreeGSlow,
        Self::TwoG,
        Self::Cable,
        Self::Dsl,
        Self::ThreeGEmerging,
        Self::FourG,
        Self::Lte,
        Self::Edge,
        Self::Dial,
        Self::Fois,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::ThreeG => "3g",
            Self::ThreeGFast => "3gfast",
            Self::ThreeGSlow => "3gslow",
            Self::TwoG => "2g",
            Self::Cable => "cable",
            Self::Dsl => "dsl",
            Self::ThreeGEmerging => "3gem",
            Self::FourG => "4g",
            Self::Lte => "lte",
            Self::Edge => "edge",
            Self::Dial => "dial",
            Self::Fois => "fois",
        }
    }

    /// `(up, down, rtt)`
    fn parameters(self) -> (u32, u32, f64) {
        match self {
            Self::ThreeG => (768, 1600, 150.0),
            Self::ThreeGFast => (768, 1600, 75.0),
            Self::ThreeGSlow => (400, 400, 200.0),
            Self::TwoG => (32, 35, 650.0),
            Self::Cable => (1000, 5000, 14.0),
            Self::Dsl => (384, 1500, 14.0),
            Self::ThreeGEmerging => (400, 400, 200.0),
            Self::FourG => (9000, 9000, 85.0),
            Self::Lte => (12000, 12000, 35.0),
            Self::Edge => (200, 240, 840.0),
            Self::Dial => (30, 49, 120.0),
            Self::Fois => (5000, 20000, 2.0),
        }
    }

    /// The shaping configuration of this preset, with default loss and queue.
    pub fn config(self) -> ShapingConfig {
        let (up, down, rtt) = self.parameters();
        ShapingConfig::default().with_up(up).with_down(down).with_rtt(rtt)
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown profile {0:?}")]
pub struct UnknownProfile(pub String);

impl FromStr for Profile {
    type Err = UnknownProfile;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|profile| profile.name() == wanted)
            .ok_or_else(|| UnknownProfile(s.to_string()))
    }
}
