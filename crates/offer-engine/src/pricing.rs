//! Tiered seasonal price calculation.
//!
//! A stay is priced day by day: each billed day takes the price its own
//! season charges for the stay's length bracket, and those per-day prices are
//! summed. Stay-length discounts therefore come from the season price tables
//! rather than from a percentage applied to a total.
//!
//! All money is [`Decimal`]. Totals are rounded once, at the end, to cents
//! with halves rounded away from zero.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dates::{next_day, DateRange};
use crate::error::{OfferError, Result};
use crate::season::{DurationTier, Season, SeasonCalendar};

/// Longest stay the booking flow accepts.
pub const MAX_RENTAL_DAYS: u32 = 89;

/// Business rules applied on top of the season tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingPolicy {
    /// Longest billable stay, in days.
    pub max_rental_days: u32,
    /// Charge a two-day stay as three days. The extra day is the day after
    /// drop-off.
    pub bill_two_days_as_three: bool,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            max_rental_days: MAX_RENTAL_DAYS,
            bill_two_days_as_three: false,
        }
    }
}

impl PricingPolicy {
    /// Days actually charged for a stay of `days` days.
    pub fn billing_days(&self, days: u32) -> u32 {
        if self.bill_two_days_as_three && days == 2 {
            3
        } else {
            days
        }
    }
}

/// How many billed days fell in one season.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonShare {
    pub season: String,
    pub days: u32,
    /// Per-day price this season charged for the stay's bracket.
    #[serde(with = "rust_decimal::serde::float")]
    pub price_per_day: Decimal,
}

/// The price of a stay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub pickup_date: NaiveDate,
    pub dropoff_date: NaiveDate,
    /// Days in the stay, counting both ends.
    pub days: u32,
    /// Days charged; differs from `days` only under the two-day rule.
    pub billing_days: u32,
    pub duration_tier: DurationTier,
    /// `total / billing_days`, rounded to cents.
    #[serde(with = "rust_decimal::serde::float")]
    pub per_day_blended: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    /// Per-day price before the stay-length discount.
    #[serde(with = "rust_decimal::serde::float")]
    pub base_per_day: Decimal,
    /// Total before the stay-length discount.
    #[serde(with = "rust_decimal::serde::float")]
    pub base_total: Decimal,
    /// Saving of `total` against `base_total`, as a whole percentage.
    #[serde(with = "rust_decimal::serde::float")]
    pub duration_discount_pct: Decimal,
    /// Season covering the most billed days.
    pub dominant_season: String,
    pub breakdown: Vec<SeasonShare>,
}

impl PriceQuote {
    pub fn range(&self) -> DateRange {
        DateRange {
            start: self.pickup_date,
            end: self.dropoff_date,
        }
    }
}

/// Round a money amount to cents, halves away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Price a stay against `seasons` with the default [`PricingPolicy`].
///
/// # Errors
/// - `OfferError::InvalidRange` if `pickup` is after `dropoff`.
/// - `OfferError::RentalTooLong` if the stay exceeds the maximum length.
/// - `OfferError::SeasonGap` if any billed day has no active season.
pub fn calculate_price(pickup: NaiveDate, dropoff: NaiveDate, seasons: &[Season]) -> Result<PriceQuote> {
    let calendar = SeasonCalendar::new(seasons.iter().cloned());
    quote(&calendar, &PricingPolicy::default(), pickup, dropoff)
}

/// Price calculator bound to one season calendar and policy.
///
/// Quotes are memoized per `(pickup, dropoff)` for the calculator's lifetime,
/// which is meant to be a single detection pass.
#[derive(Debug)]
pub struct PriceCalculator<'a> {
    calendar: &'a SeasonCalendar,
    policy: PricingPolicy,
    memo: HashMap<(NaiveDate, NaiveDate), PriceQuote>,
}

impl<'a> PriceCalculator<'a> {
    pub fn new(calendar: &'a SeasonCalendar, policy: PricingPolicy) -> Self {
        Self {
            calendar,
            policy,
            memo: HashMap::new(),
        }
    }

    pub fn policy(&self) -> &PricingPolicy {
        &self.policy
    }

    /// Price a stay, reusing an earlier quote for the same dates.
    pub fn quote(&mut self, pickup: NaiveDate, dropoff: NaiveDate) -> Result<PriceQuote> {
        if let Some(hit) = self.memo.get(&(pickup, dropoff)) {
            return Ok(hit.clone());
        }
        let fresh = quote(self.calendar, &self.policy, pickup, dropoff)?;
        self.memo.insert((pickup, dropoff), fresh.clone());
        Ok(fresh)
    }

    /// Number of distinct stays priced so far.
    pub fn cached(&self) -> usize {
        self.memo.len()
    }
}

fn quote(
    calendar: &SeasonCalendar,
    policy: &PricingPolicy,
    pickup: NaiveDate,
    dropoff: NaiveDate,
) -> Result<PriceQuote> {
    let stay = DateRange::new(pickup, dropoff)?;
    let days = stay.days();
    let billing_days = policy.billing_days(days);
    if billing_days > policy.max_rental_days {
        return Err(OfferError::RentalTooLong {
            days: billing_days,
            max: policy.max_rental_days,
        });
    }
    let tier = DurationTier::for_days(billing_days);

    let mut total = Decimal::ZERO;
    let mut base_total = Decimal::ZERO;
    // Keyed by id: a season repeated in another year keeps its slug but may
    // carry different prices.
    let mut shares: BTreeMap<&str, (&Season, u32)> = BTreeMap::new();

    let mut day = pickup;
    for _ in 0..billing_days {
        let season = calendar.season_for(day)?;
        total += season.prices.price_for(tier);
        base_total += season.prices.less_than_week;
        shares.entry(season.id.as_str()).or_insert((season, 0)).1 += 1;
        day = next_day(day);
    }

    let billed = Decimal::from(billing_days);
    let total = round_money(total);
    let base_total = round_money(base_total);
    let per_day_blended = round_money(total / billed);
    let base_per_day = round_money(base_total / billed);

    let duration_discount_pct = if base_total > total && !base_total.is_zero() {
        ((base_total - total) / base_total * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
    } else {
        Decimal::ZERO
    };

    let mut ranked: Vec<(&Season, u32)> = shares.into_values().collect();
    ranked.sort_by(|a, b| {
        (a.0.start_date, &a.0.slug, &a.0.id).cmp(&(b.0.start_date, &b.0.slug, &b.0.id))
    });

    // First strict maximum, so ties go to the earliest season.
    let mut dominant: Option<(&Season, u32)> = None;
    for &(season, count) in &ranked {
        if dominant.is_none_or(|(_, best)| count > best) {
            dominant = Some((season, count));
        }
    }
    let dominant_season = dominant.map(|(s, _)| s.name.clone()).unwrap_or_default();

    let breakdown = ranked
        .into_iter()
        .map(|(season, count)| SeasonShare {
            season: season.name.clone(),
            days: count,
            price_per_day: season.prices.price_for(tier),
        })
        .collect();

    debug!(%pickup, %dropoff, billing_days, %total, "priced stay");

    Ok(PriceQuote {
        pickup_date: pickup,
        dropoff_date: dropoff,
        days,
        billing_days,
        duration_tier: tier,
        per_day_blended,
        total,
        base_per_day,
        base_total,
        duration_discount_pct,
        dominant_season,
        breakdown,
    })
}
