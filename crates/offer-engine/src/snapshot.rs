//! Input snapshot and engine configuration.
//!
//! The booking store is the system of record. A [`Snapshot`] is what a caller
//! fetched from it for one run; [`EngineConfig`] holds the knobs.

use serde::{Deserialize, Serialize};

use crate::booking::Booking;
use crate::error::Result;
use crate::gaps::IntegrityPolicy;
use crate::offer::Offer;
use crate::pricing::PricingPolicy;
use crate::recheck::BlockedPeriod;
use crate::season::{Season, SeasonCalendar};

/// Bookings, seasons, offers and blocked periods as of one fetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub bookings: Vec<Booking>,
    pub seasons: Vec<Season>,
    pub offers: Vec<Offer>,
    pub blocked_periods: Vec<BlockedPeriod>,
}

impl Snapshot {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn calendar(&self) -> SeasonCalendar {
        SeasonCalendar::new(self.seasons.iter().cloned())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub pricing: PricingPolicy,
    pub integrity: IntegrityPolicy,
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
