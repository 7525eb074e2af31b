//! Error types for offer-engine operations.

use chrono::NaiveDate;
use thiserror::Error;

use crate::offer::OfferStatus;

/// Errors that can occur while detecting gaps, pricing stays, or managing offers.
#[derive(Error, Debug)]
pub enum OfferError {
    /// A date range whose start falls after its end.
    #[error("Invalid date range: {start} is after {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    /// A booking whose pickup date falls after its drop-off date.
    #[error("Booking {booking_id} has pickup {pickup_date} after dropoff {dropoff_date}")]
    InvertedBooking {
        booking_id: String,
        pickup_date: NaiveDate,
        dropoff_date: NaiveDate,
    },

    /// Two occupying bookings of the same vehicle share at least one full day.
    #[error("Bookings {first} and {second} overlap on vehicle {vehicle_id}")]
    OverlappingBookings {
        vehicle_id: String,
        first: String,
        second: String,
    },

    /// No active season covers the given day.
    #[error("No active season covers {date}")]
    SeasonGap { date: NaiveDate },

    /// The billed stay is longer than the configured maximum.
    #[error("Rental of {days} days exceeds the maximum of {max} days")]
    RentalTooLong { days: u32, max: u32 },

    #[error("Discount must be between 0 and 100, got {0}")]
    InvalidDiscount(String),

    /// The offer range does not lie inside the gap it was derived from.
    #[error("Offer range {start}..={end} is outside the detected gap")]
    OfferOutsideGap { start: NaiveDate, end: NaiveDate },

    /// The price quote does not cover the offer range.
    #[error("Price quote does not match the offer range")]
    QuoteMismatch,

    #[error("Illegal offer transition: {from} -> {to}")]
    IllegalTransition { from: OfferStatus, to: OfferStatus },

    /// An offer already exists for this vehicle and gap start.
    #[error("An offer for vehicle {vehicle_id} starting {gap_start_date} already exists")]
    DuplicateOffer {
        vehicle_id: String,
        gap_start_date: NaiveDate,
    },

    /// Another offer already uses this id.
    #[error("Offer id {0} is already taken")]
    DuplicateOfferId(String),

    #[error("Unknown offer: {0}")]
    UnknownOffer(String),

    /// The input snapshot was not valid JSON.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl OfferError {
    /// True for errors caused by inconsistent booking data rather than by
    /// the request itself.
    pub fn is_data_integrity(&self) -> bool {
        matches!(
            self,
            OfferError::InvertedBooking { .. } | OfferError::OverlappingBookings { .. }
        )
    }
}

/// Convenience alias used throughout offer-engine.
pub type Result<T> = std::result::Result<T, OfferError>;
