//! Last-minute offers: publishing a gap and the offer status lifecycle.
//!
//! ```text
//! detected ──► published ──► reserved
//!                  │───────► expired
//!                  │───────► ignored
//!                  └───────► auto_cancelled
//! ```
//!
//! Any other transition is rejected. [`OfferBook`] keeps at most one offer
//! per vehicle and gap start, and publishing is a single insert-if-absent.

use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dates::DateRange;
use crate::error::{OfferError, Result};
use crate::gaps::Gap;
use crate::pricing::{round_money, PriceQuote};
use crate::recheck::AvailabilityReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferStatus {
    Detected,
    Published,
    Reserved,
    Expired,
    Ignored,
    /// Withdrawn by the availability recheck, not by an admin.
    AutoCancelled,
}

impl OfferStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OfferStatus::Detected => "detected",
            OfferStatus::Published => "published",
            OfferStatus::Reserved => "reserved",
            OfferStatus::Expired => "expired",
            OfferStatus::Ignored => "ignored",
            OfferStatus::AutoCancelled => "auto_cancelled",
        }
    }

    pub fn can_transition_to(self, to: OfferStatus) -> bool {
        use OfferStatus::*;
        matches!(
            (self, to),
            (Detected, Published)
                | (Published, Reserved)
                | (Published, Expired)
                | (Published, Ignored)
                | (Published, AutoCancelled)
        )
    }

    /// The status after moving to `to`.
    ///
    /// # Errors
    /// Returns `OfferError::IllegalTransition` for any move not in the lifecycle.
    pub fn transition(self, to: OfferStatus) -> Result<OfferStatus> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(OfferError::IllegalTransition { from: self, to })
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, OfferStatus::Detected | OfferStatus::Published)
    }
}

impl fmt::Display for OfferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of the gap an offer was made from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OfferKey {
    pub vehicle_id: String,
    pub gap_start_date: NaiveDate,
}

/// What an admin chooses when publishing a gap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishRequest {
    /// Narrower date range to offer; the whole gap when `None`.
    #[serde(default)]
    pub offer_range: Option<DateRange>,
    #[serde(with = "rust_decimal::serde::float")]
    pub discount_percentage: Decimal,
    pub pickup_location: String,
    pub dropoff_location: String,
    #[serde(default)]
    pub admin_notes: Option<String>,
}

/// A last-minute offer record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub id: String,
    pub vehicle_id: String,
    pub detected_start_date: NaiveDate,
    pub detected_end_date: NaiveDate,
    pub detected_days: u32,
    pub offer_start_date: NaiveDate,
    pub offer_end_date: NaiveDate,
    pub offer_days: u32,
    /// Undiscounted blended price per day for the offer range.
    #[serde(with = "rust_decimal::serde::float")]
    pub original_price_per_day: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub discount_percentage: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub final_price_per_day: Decimal,
    pub pickup_location: String,
    pub dropoff_location: String,
    #[serde(default)]
    pub previous_booking_id: Option<String>,
    #[serde(default)]
    pub next_booking_id: Option<String>,
    #[serde(default)]
    pub admin_notes: Option<String>,
    pub status: OfferStatus,
}

impl Offer {
    /// Build an offer in `detected` status from a gap and the quote for the
    /// range being offered.
    ///
    /// # Errors
    /// - `OfferError::OfferOutsideGap` if the offer range leaves the gap.
    /// - `OfferError::InvalidDiscount` if the discount is not in `0..=100`.
    /// - `OfferError::QuoteMismatch` if `quote` prices a different range.
    pub fn from_gap(id: impl Into<String>, gap: &Gap, quote: &PriceQuote, request: &PublishRequest) -> Result<Offer> {
        let range = request.offer_range.unwrap_or_else(|| gap.range());
        if !gap.range().contains_range(&range) {
            return Err(OfferError::OfferOutsideGap {
                start: range.start,
                end: range.end,
            });
        }
        let discount = request.discount_percentage;
        if discount < Decimal::ZERO || discount > Decimal::ONE_HUNDRED {
            return Err(OfferError::InvalidDiscount(discount.to_string()));
        }
        if quote.range() != range {
            return Err(OfferError::QuoteMismatch);
        }

        let original = quote.per_day_blended;
        let final_price = round_money(original * (Decimal::ONE_HUNDRED - discount) / Decimal::ONE_HUNDRED);

        Ok(Offer {
            id: id.into(),
            vehicle_id: gap.vehicle_id.clone(),
            detected_start_date: gap.gap_start_date,
            detected_end_date: gap.gap_end_date,
            detected_days: gap.gap_days,
            offer_start_date: range.start,
            offer_end_date: range.end,
            offer_days: range.days(),
            original_price_per_day: original,
            discount_percentage: discount,
            final_price_per_day: final_price,
            pickup_location: request.pickup_location.clone(),
            dropoff_location: request.dropoff_location.clone(),
            previous_booking_id: gap.previous_booking_id.clone(),
            next_booking_id: gap.next_booking_id.clone(),
            admin_notes: request.admin_notes.clone(),
            status: OfferStatus::Detected,
        })
    }

    pub fn key(&self) -> OfferKey {
        OfferKey {
            vehicle_id: self.vehicle_id.clone(),
            gap_start_date: self.detected_start_date,
        }
    }

    pub fn offer_range(&self) -> DateRange {
        DateRange {
            start: self.offer_start_date,
            end: self.offer_end_date,
        }
    }

    /// Total price of the offered days after the discount.
    pub fn final_total(&self) -> Decimal {
        round_money(self.final_price_per_day * Decimal::from(self.offer_days))
    }
}

/// In-memory offer store with at most one offer per [`OfferKey`].
#[derive(Debug, Clone, Default)]
pub struct OfferBook {
    offers: HashMap<String, Offer>,
    by_key: HashMap<OfferKey, String>,
}

impl OfferBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load existing offers, e.g. from a snapshot.
    ///
    /// # Errors
    /// - `OfferError::DuplicateOffer` if two offers share a key.
    /// - `OfferError::DuplicateOfferId` if two offers share an id.
    pub fn from_offers(offers: impl IntoIterator<Item = Offer>) -> Result<Self> {
        let mut book = Self::new();
        for offer in offers {
            book.insert(offer)?;
        }
        Ok(book)
    }

    /// Publish a freshly built offer.
    ///
    /// The key check, the `detected -> published` transition and the insert
    /// happen together; nothing is stored on failure.
    ///
    /// # Errors
    /// - `OfferError::DuplicateOffer` if an offer exists for the same key.
    /// - `OfferError::DuplicateOfferId` if the id is already taken.
    /// - `OfferError::IllegalTransition` if the offer is not `detected`.
    pub fn promote(&mut self, mut offer: Offer) -> Result<&Offer> {
        offer.status = offer.status.transition(OfferStatus::Published)?;
        let id = offer.id.clone();
        self.insert(offer)?;
        let offer = &self.offers[&id];
        info!(offer = %offer.id, vehicle_id = %offer.vehicle_id, start = %offer.offer_start_date, "published offer");
        Ok(offer)
    }

    /// Move an offer to a new status.
    pub fn transition(&mut self, id: &str, to: OfferStatus) -> Result<&Offer> {
        let offer = self
            .offers
            .get_mut(id)
            .ok_or_else(|| OfferError::UnknownOffer(id.to_string()))?;
        offer.status = offer.status.transition(to)?;
        debug!(offer = %id, status = %to, "offer status changed");
        Ok(offer)
    }

    /// Auto-cancel every offer the recheck found unavailable. Returns the ids
    /// that changed.
    pub fn apply_recheck(&mut self, report: &AvailabilityReport) -> Vec<String> {
        let mut cancelled = Vec::new();
        for result in report.results.iter().filter(|r| !r.is_available) {
            match self.transition(&result.offer_id, OfferStatus::AutoCancelled) {
                Ok(_) => cancelled.push(result.offer_id.clone()),
                Err(e) => debug!(offer = %result.offer_id, error = %e, "recheck left offer unchanged"),
            }
        }
        cancelled
    }

    /// Expire published offers starting before `today`. Returns the ids that
    /// changed.
    pub fn expire_before(&mut self, today: NaiveDate) -> Vec<String> {
        let mut stale: Vec<String> = self
            .offers
            .values()
            .filter(|o| o.status == OfferStatus::Published && o.offer_start_date < today)
            .map(|o| o.id.clone())
            .collect();
        stale.sort();
        for id in &stale {
            if let Some(offer) = self.offers.get_mut(id) {
                offer.status = OfferStatus::Expired;
            }
        }
        stale
    }

    pub fn get(&self, id: &str) -> Option<&Offer> {
        self.offers.get(id)
    }

    pub fn contains_key(&self, key: &OfferKey) -> bool {
        self.by_key.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.offers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offers.is_empty()
    }

    /// Offers ordered by vehicle, then offer start.
    pub fn offers(&self) -> Vec<&Offer> {
        let mut all: Vec<&Offer> = self.offers.values().collect();
        all.sort_by(|a, b| {
            (&a.vehicle_id, a.offer_start_date, &a.id).cmp(&(&b.vehicle_id, b.offer_start_date, &b.id))
        });
        all
    }

    fn insert(&mut self, offer: Offer) -> Result<()> {
        if self.offers.contains_key(&offer.id) {
            return Err(OfferError::DuplicateOfferId(offer.id));
        }
        let key = offer.key();
        if self.by_key.contains_key(&key) {
            return Err(OfferError::DuplicateOffer {
                vehicle_id: key.vehicle_id,
                gap_start_date: key.gap_start_date,
            });
        }
        self.by_key.insert(key, offer.id.clone());
        self.offers.insert(offer.id.clone(), offer);
        Ok(())
    }
}
