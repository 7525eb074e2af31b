//! Gap detection between consecutive bookings of a vehicle.
//!
//! A gap is a run of free days between two bookings that is too short to be
//! booked under the season's minimum stay. Those days would otherwise stay
//! empty, which makes them candidates for a discounted last-minute offer.
//!
//! Only gaps bounded on both sides are considered: the open stretch before a
//! vehicle's first booking or after its last one is never reported.

use std::collections::HashSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::booking::{group_by_vehicle, validate_bookings, Booking};
use crate::dates::{next_day, previous_day, DateRange};
use crate::error::Result;
use crate::offer::{Offer, OfferKey};
use crate::pricing::{PriceCalculator, PriceQuote};
use crate::season::{Season, SeasonCalendar};

/// What to do with bookings that fail the integrity pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrityPolicy {
    /// Fail detection with the data-integrity error.
    #[default]
    Reject,
    /// Skip inverted or overlapping pairs and keep going.
    Skip,
}

/// An unbookable run of free days between two bookings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gap {
    pub vehicle_id: String,
    pub gap_start_date: NaiveDate,
    pub gap_end_date: NaiveDate,
    pub gap_days: u32,
    /// Season covering most of the gap.
    pub season_name: String,
    pub season_min_days: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub season_price_per_day: Decimal,
    pub previous_booking_id: Option<String>,
    pub next_booking_id: Option<String>,
}

impl Gap {
    pub fn range(&self) -> DateRange {
        DateRange {
            start: self.gap_start_date,
            end: self.gap_end_date,
        }
    }

    pub fn key(&self) -> OfferKey {
        OfferKey {
            vehicle_id: self.vehicle_id.clone(),
            gap_start_date: self.gap_start_date,
        }
    }
}

/// Finds gaps against a fixed season calendar.
#[derive(Debug, Clone)]
pub struct GapDetector<'a> {
    calendar: &'a SeasonCalendar,
    integrity: IntegrityPolicy,
}

impl<'a> GapDetector<'a> {
    pub fn new(calendar: &'a SeasonCalendar) -> Self {
        Self {
            calendar,
            integrity: IntegrityPolicy::default(),
        }
    }

    pub fn with_integrity(mut self, integrity: IntegrityPolicy) -> Self {
        self.integrity = integrity;
        self
    }

    /// Detect every reportable gap in `bookings`.
    ///
    /// Bookings may belong to any number of vehicles and arrive in any order;
    /// only confirmed, in-progress and completed bookings are considered.
    /// Results are sorted by vehicle, then gap start.
    ///
    /// # Errors
    /// - A data-integrity error when the policy is [`IntegrityPolicy::Reject`]
    ///   and a booking is inverted or two bookings of a vehicle overlap.
    /// - `OfferError::SeasonGap` if a gap short enough to qualify has a day
    ///   no active season covers.
    pub fn detect(&self, bookings: &[Booking]) -> Result<Vec<Gap>> {
        if self.integrity == IntegrityPolicy::Reject {
            validate_bookings(bookings)?;
        }

        let mut gaps = Vec::new();
        for (vehicle_id, group) in group_by_vehicle(bookings) {
            let before = gaps.len();
            // The booking reaching furthest so far bounds the next gap. With
            // valid data this is simply the previous booking.
            let mut furthest: Option<&Booking> = None;
            for booking in group.iter().copied() {
                if booking.pickup_date > booking.dropoff_date {
                    warn!(vehicle_id, booking = %booking.id, "skipping inverted booking");
                    continue;
                }
                if let Some(prev) = furthest {
                    if let Some(gap) = self.gap_between(vehicle_id, prev, booking)? {
                        gaps.push(gap);
                    }
                }
                if furthest.is_none_or(|prev| booking.dropoff_date > prev.dropoff_date) {
                    furthest = Some(booking);
                }
            }
            debug!(vehicle_id, bookings = group.len(), gaps = gaps.len() - before, "scanned vehicle");
        }
        Ok(gaps)
    }

    fn gap_between(&self, vehicle_id: &str, prev: &Booking, next: &Booking) -> Result<Option<Gap>> {
        let start = next_day(prev.dropoff_date);
        let end = previous_day(next.pickup_date);
        if start > end {
            if next.pickup_date < prev.dropoff_date {
                warn!(vehicle_id, previous = %prev.id, next = %next.id, "bookings overlap; no gap");
            }
            return Ok(None);
        }

        let range = DateRange { start, end };
        let gap_days = range.days();
        // Too long for any season to flag, so its days need no season.
        if self.calendar.longest_min_stay().is_some_and(|longest| gap_days >= longest) {
            return Ok(None);
        }
        let season = self.calendar.dominant_for(&range)?;
        if gap_days >= season.min_days {
            return Ok(None);
        }

        Ok(Some(Gap {
            vehicle_id: vehicle_id.to_string(),
            gap_start_date: start,
            gap_end_date: end,
            gap_days,
            season_name: season.name.clone(),
            season_min_days: season.min_days,
            season_price_per_day: season.price_per_day(),
            previous_booking_id: Some(prev.id.clone()),
            next_booking_id: Some(next.id.clone()),
        }))
    }
}

/// Detect gaps with the default integrity policy.
pub fn detect_gaps(bookings: &[Booking], seasons: &[Season]) -> Result<Vec<Gap>> {
    let calendar = SeasonCalendar::new(seasons.iter().cloned());
    GapDetector::new(&calendar).detect(bookings)
}

/// A gap as presented for publishing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedGap {
    #[serde(flatten)]
    pub gap: Gap,
    /// An offer already exists for this vehicle and gap start.
    pub already_exists: bool,
    /// Undiscounted price of the whole gap, as the public search would quote it.
    pub real_price: Option<PriceQuote>,
    /// Why the real price could not be computed. Such a gap must not be published.
    pub price_error: Option<String>,
}

impl DetectedGap {
    pub fn can_publish(&self) -> bool {
        !self.already_exists && self.real_price.is_some()
    }
}

/// Mark gaps that already have an offer and attach each gap's real price.
///
/// A pricing failure is recorded on its own gap instead of failing the batch.
pub fn annotate(gaps: Vec<Gap>, offers: &[Offer], calculator: &mut PriceCalculator<'_>) -> Vec<DetectedGap> {
    let existing: HashSet<OfferKey> = offers.iter().map(Offer::key).collect();
    gaps.into_iter()
        .map(|gap| {
            let already_exists = existing.contains(&gap.key());
            let (real_price, price_error) = match calculator.quote(gap.gap_start_date, gap.gap_end_date) {
                Ok(quote) => (Some(quote), None),
                Err(e) => {
                    warn!(vehicle_id = %gap.vehicle_id, start = %gap.gap_start_date, error = %e, "could not price gap");
                    (None, Some(e.to_string()))
                }
            };
            DetectedGap {
                gap,
                already_exists,
                real_price,
                price_error,
            }
        })
        .collect()
}
