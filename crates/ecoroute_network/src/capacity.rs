use serde::Serialize;

use crate::link::Link;

/// Reference speed assigned to synthetic via links. They model routing
/// topology, not a physical bottleneck.
pub const VIA_SPEED: f64 = 100.0;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedReference {
    /// The posted speed limit of the link.
    Posted,
    /// The measured average speed; falls back to the posted speed for links
    /// without a sample.
    Measured,
}

/// How a link's vehicles-per-interval throughput bound is derived.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub enum CapacityPolicy {
    /// `lanes * speed / (vehicle_length + min_gap)`, rounded, floored at 1.
    LaneThroughput {
        speed: SpeedReference,
        vehicle_length: f64,
        min_gap: f64,
    },
    /// One discrete slot per link and interval.
    UnitRate,
}

impl CapacityPolicy {
    pub fn lane_throughput(speed: SpeedReference) -> CapacityPolicy {
        CapacityPolicy::LaneThroughput {
            speed,
            vehicle_length: 5.0,
            min_gap: 10.0,
        }
    }

    pub fn capacity(&self, link: &Link) -> u64 {
        match self {
            CapacityPolicy::UnitRate => 1,
            CapacityPolicy::LaneThroughput {
                speed,
                vehicle_length,
                min_gap,
            } => {
                let mut reference = match speed {
                    SpeedReference::Posted => link.posted_speed(),
                    SpeedReference::Measured => link.measured_speed(),
                };
                if reference <= 0.0 {
                    reference = link.posted_speed();
                }
                let throughput = link.lanes() as f64 * reference / (vehicle_length + min_gap);
                throughput.round().max(1.0) as u64
            }
        }
    }
}

impl Default for CapacityPolicy {
    fn default() -> CapacityPolicy {
        CapacityPolicy::lane_throughput(SpeedReference::Posted)
    }
}
