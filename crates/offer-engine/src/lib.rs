//! # offer-engine
//!
//! Last-minute offer detection and seasonal tiered pricing for a vehicle
//! rental fleet.
//!
//! The engine works on an in-memory [`Snapshot`] of bookings and seasons. It
//! finds the short runs of free days between bookings that no regular
//! customer can book (the season's minimum stay is longer), prices them the
//! way the public search would, and manages the offers published from them.
//!
//! ## Modules
//!
//! - [`dates`]: Inclusive calendar date ranges
//! - [`booking`]: Bookings and the load-time integrity pass
//! - [`season`]: Seasons, price brackets and day-to-season resolution
//! - [`pricing`]: Per-day tiered price calculation with memoization
//! - [`gaps`]: Gap detection between consecutive bookings
//! - [`offer`]: Offer records, status lifecycle and the offer book
//! - [`recheck`]: Availability recheck for published offers
//! - [`snapshot`]: Input snapshot and engine configuration
//! - [`error`]: Error types

pub mod booking;
pub mod dates;
pub mod error;
pub mod gaps;
pub mod offer;
pub mod pricing;
pub mod recheck;
pub mod season;
pub mod snapshot;

pub use booking::{validate_bookings, Booking, BookingStatus};
pub use dates::DateRange;
pub use error::OfferError;
pub use gaps::{annotate, detect_gaps, DetectedGap, Gap, GapDetector, IntegrityPolicy};
pub use offer::{Offer, OfferBook, OfferKey, OfferStatus, PublishRequest};
pub use pricing::{calculate_price, PriceCalculator, PriceQuote, PricingPolicy};
pub use recheck::{check_offers, AvailabilityReport, BlockedPeriod};
pub use season::{DurationTier, Season, SeasonCalendar, SeasonTier, TierPrices};
pub use snapshot::{EngineConfig, Snapshot};
