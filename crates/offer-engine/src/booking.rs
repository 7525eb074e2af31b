//! Bookings as read from the booking store, plus the integrity pass that
//! runs once when they are loaded.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::DateRange;
use crate::error::{OfferError, Result};

/// Lifecycle status of a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    /// The vehicle is currently out with the customer.
    #[serde(alias = "active")]
    InProgress,
    Completed,
    Cancelled,
}

impl BookingStatus {
    /// Whether a booking in this status takes the vehicle off the road.
    ///
    /// Only these bookings take part in gap detection, occupancy and
    /// availability checks.
    pub fn occupies_vehicle(self) -> bool {
        matches!(
            self,
            BookingStatus::Confirmed | BookingStatus::InProgress | BookingStatus::Completed
        )
    }
}

/// A rental booking. Both dates are inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub vehicle_id: String,
    pub pickup_date: NaiveDate,
    pub dropoff_date: NaiveDate,
    pub status: BookingStatus,
}

impl Booking {
    /// The booked days, or `None` if the dates are inverted.
    pub fn range(&self) -> Option<DateRange> {
        DateRange::new(self.pickup_date, self.dropoff_date).ok()
    }

    pub fn occupies_vehicle(&self) -> bool {
        self.status.occupies_vehicle()
    }
}

/// Reject inverted bookings and overlapping occupying bookings.
///
/// A same-day handover (one booking drops off on the day the next picks up)
/// is allowed. Pending and cancelled bookings never count as overlapping.
pub fn validate_bookings(bookings: &[Booking]) -> Result<()> {
    for booking in bookings {
        if booking.pickup_date > booking.dropoff_date {
            return Err(OfferError::InvertedBooking {
                booking_id: booking.id.clone(),
                pickup_date: booking.pickup_date,
                dropoff_date: booking.dropoff_date,
            });
        }
    }

    for (vehicle_id, group) in group_by_vehicle(bookings) {
        // Compare against the booking reaching furthest so far, so a long
        // booking cannot hide an overlap behind a short one nested inside it.
        let mut furthest: Option<&Booking> = None;
        for booking in group {
            if let Some(prev) = furthest {
                if booking.pickup_date < prev.dropoff_date {
                    return Err(OfferError::OverlappingBookings {
                        vehicle_id: vehicle_id.to_string(),
                        first: prev.id.clone(),
                        second: booking.id.clone(),
                    });
                }
            }
            if furthest.is_none_or(|prev| booking.dropoff_date > prev.dropoff_date) {
                furthest = Some(booking);
            }
        }
    }

    Ok(())
}

/// Bucket occupying bookings by vehicle, each bucket in chronological order.
///
/// Buckets are keyed (and therefore iterated) by vehicle id. Within a bucket
/// bookings are sorted by pickup date, then drop-off date, then id.
pub fn group_by_vehicle(bookings: &[Booking]) -> BTreeMap<&str, Vec<&Booking>> {
    let mut groups: BTreeMap<&str, Vec<&Booking>> = BTreeMap::new();
    for booking in bookings.iter().filter(|b| b.occupies_vehicle()) {
        groups
            .entry(booking.vehicle_id.as_str())
            .or_default()
            .push(booking);
    }
    for group in groups.values_mut() {
        group.sort_by(|a, b| {
            (a.pickup_date, a.dropoff_date, &a.id).cmp(&(b.pickup_date, b.dropoff_date, &b.id))
        });
    }
    groups
}
