//! Availability recheck for published offers.
//!
//! Bookings and blocked periods can land on an offer's dates after it was
//! published. The recheck finds those offers so they can be auto-cancelled.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::booking::Booking;
use crate::dates::DateRange;
use crate::offer::{Offer, OfferStatus};

/// Days a vehicle is out of service for reasons other than a booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedPeriod {
    pub vehicle_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub reason: Option<String>,
}

impl BlockedPeriod {
    fn overlaps(&self, range: &DateRange) -> bool {
        self.start_date <= range.end && self.end_date >= range.start
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictingBooking {
    pub booking_id: String,
    pub pickup_date: NaiveDate,
    pub dropoff_date: NaiveDate,
}

/// Recheck result for one published offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferAvailability {
    pub offer_id: String,
    pub vehicle_id: String,
    pub offer_start_date: NaiveDate,
    pub offer_end_date: NaiveDate,
    pub is_available: bool,
    pub conflicting_bookings: Vec<ConflictingBooking>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AvailabilitySummary {
    pub total: usize,
    pub available: usize,
    pub unavailable: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AvailabilityReport {
    pub results: Vec<OfferAvailability>,
    pub summary: AvailabilitySummary,
}

/// Check every published offer against current bookings and blocked periods.
///
/// A booking conflicts when it occupies the vehicle and shares at least one
/// day with the offer. Results follow offer start date, then offer id.
pub fn check_offers(offers: &[Offer], bookings: &[Booking], blocked: &[BlockedPeriod]) -> AvailabilityReport {
    let mut published: Vec<&Offer> = offers
        .iter()
        .filter(|o| o.status == OfferStatus::Published)
        .collect();
    published.sort_by(|a, b| (a.offer_start_date, &a.id).cmp(&(b.offer_start_date, &b.id)));

    let results: Vec<OfferAvailability> = published
        .into_iter()
        .map(|offer| check_offer(offer, bookings, blocked))
        .collect();

    let available = results.iter().filter(|r| r.is_available).count();
    let summary = AvailabilitySummary {
        total: results.len(),
        available,
        unavailable: results.len() - available,
    };
    AvailabilityReport { results, summary }
}

fn check_offer(offer: &Offer, bookings: &[Booking], blocked: &[BlockedPeriod]) -> OfferAvailability {
    let range = offer.offer_range();

    let conflicting_bookings: Vec<ConflictingBooking> = bookings
        .iter()
        .filter(|b| b.vehicle_id == offer.vehicle_id && b.occupies_vehicle())
        .filter(|b| b.pickup_date <= range.end && b.dropoff_date >= range.start)
        .map(|b| ConflictingBooking {
            booking_id: b.id.clone(),
            pickup_date: b.pickup_date,
            dropoff_date: b.dropoff_date,
        })
        .collect();

    let first_block = blocked
        .iter()
        .find(|p| p.vehicle_id == offer.vehicle_id && p.overlaps(&range));

    let reason = if !conflicting_bookings.is_empty() {
        Some(format!("Dates taken by {} booking(s)", conflicting_bookings.len()))
    } else {
        first_block.map(|p| format!("Dates blocked: {}", p.reason.as_deref().unwrap_or("no reason given")))
    };

    OfferAvailability {
        offer_id: offer.id.clone(),
        vehicle_id: offer.vehicle_id.clone(),
        offer_start_date: offer.offer_start_date,
        offer_end_date: offer.offer_end_date,
        is_available: reason.is_none(),
        conflicting_bookings,
        reason,
    }
}
