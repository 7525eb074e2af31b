//! Pricing seasons and the calendar that resolves which season applies to a day.
//!
//! Every season carries an explicit [`SeasonTier`] and a table of per-day
//! prices by stay length ([`TierPrices`]). A [`SeasonCalendar`] holds the
//! active seasons in a fixed resolution order so that a day covered by more
//! than one season always resolves to the same one.

use std::cmp::Ordering;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::dates::DateRange;
use crate::error::{OfferError, Result};

/// Demand tier of a season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeasonTier {
    #[default]
    Low,
    Medium,
    High,
}

/// Stay-length bracket selecting which price column applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationTier {
    LessThanWeek,
    OneWeek,
    TwoWeeks,
    ThreeWeeks,
}

impl DurationTier {
    /// Bracket for a stay billed as `days` days.
    pub fn for_days(days: u32) -> Self {
        match days {
            21.. => DurationTier::ThreeWeeks,
            14.. => DurationTier::TwoWeeks,
            7.. => DurationTier::OneWeek,
            _ => DurationTier::LessThanWeek,
        }
    }

    /// Shortest stay that falls in this bracket.
    pub fn min_days(self) -> u32 {
        match self {
            DurationTier::LessThanWeek => 1,
            DurationTier::OneWeek => 7,
            DurationTier::TwoWeeks => 14,
            DurationTier::ThreeWeeks => 21,
        }
    }
}

/// Per-day price for each stay-length bracket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierPrices {
    #[serde(with = "rust_decimal::serde::float")]
    pub less_than_week: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub one_week: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub two_weeks: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub three_weeks: Decimal,
}

impl TierPrices {
    /// The same price for every bracket.
    pub fn flat(price: Decimal) -> Self {
        Self {
            less_than_week: price,
            one_week: price,
            two_weeks: price,
            three_weeks: price,
        }
    }

    pub fn price_for(&self, tier: DurationTier) -> Decimal {
        match tier {
            DurationTier::LessThanWeek => self.less_than_week,
            DurationTier::OneWeek => self.one_week,
            DurationTier::TwoWeeks => self.two_weeks,
            DurationTier::ThreeWeeks => self.three_weeks,
        }
    }
}

fn default_min_days() -> u32 {
    2
}

fn default_active() -> bool {
    true
}

/// A pricing season. `start_date` and `end_date` are inclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Season {
    pub id: String,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub tier: SeasonTier,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub prices: TierPrices,
    /// Minimum bookable stay in this season.
    #[serde(default = "default_min_days")]
    pub min_days: u32,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

impl Season {
    pub fn range(&self) -> DateRange {
        DateRange {
            start: self.start_date,
            end: self.end_date,
        }
    }

    pub fn covers(&self, day: NaiveDate) -> bool {
        self.start_date <= day && day <= self.end_date
    }

    /// Headline price per day, before any stay-length discount.
    pub fn price_per_day(&self) -> Decimal {
        self.prices.less_than_week
    }

    /// Whether a stay entirely in this season can get cheaper by adding a day.
    ///
    /// That happens when a bracket's price times its first day count is below
    /// the previous bracket's price times one day fewer.
    pub fn longer_stay_can_cost_less(&self) -> bool {
        const BRACKETS: [DurationTier; 4] = [
            DurationTier::LessThanWeek,
            DurationTier::OneWeek,
            DurationTier::TwoWeeks,
            DurationTier::ThreeWeeks,
        ];
        BRACKETS.windows(2).any(|pair| {
            let boundary = pair[1].min_days();
            let before = self.prices.price_for(pair[0]) * Decimal::from(boundary - 1);
            let after = self.prices.price_for(pair[1]) * Decimal::from(boundary);
            after < before
        })
    }

    fn span_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days()
    }
}

/// Order in which overlapping seasons win a day: earliest start, then the
/// shorter span, then the higher tier, then slug.
fn resolution_order(a: &Season, b: &Season) -> Ordering {
    a.start_date
        .cmp(&b.start_date)
        .then_with(|| a.span_days().cmp(&b.span_days()))
        .then_with(|| b.tier.cmp(&a.tier))
        .then_with(|| a.slug.cmp(&b.slug))
}

/// Active seasons in resolution order.
#[derive(Debug, Clone, Default)]
pub struct SeasonCalendar {
    seasons: Vec<Season>,
}

impl SeasonCalendar {
    /// Build a calendar from raw season records, dropping inactive ones.
    pub fn new(seasons: impl IntoIterator<Item = Season>) -> Self {
        let mut seasons: Vec<Season> = seasons.into_iter().filter(|s| s.is_active).collect();
        seasons.sort_by(resolution_order);

        let calendar = Self { seasons };
        for (a, b) in calendar.overlaps() {
            warn!(
                first = %a.slug,
                second = %b.slug,
                "active seasons overlap; {} wins shared days",
                a.slug
            );
        }
        for season in calendar.seasons.iter().filter(|s| s.longer_stay_can_cost_less()) {
            warn!(season = %season.slug, "a longer stay can cost less than a shorter one");
        }
        calendar
    }

    pub fn seasons(&self) -> &[Season] {
        &self.seasons
    }

    pub fn is_empty(&self) -> bool {
        self.seasons.is_empty()
    }

    /// The largest `min_days` of any active season. A run of free days at
    /// least this long is bookable whatever season it falls in.
    pub fn longest_min_stay(&self) -> Option<u32> {
        self.seasons.iter().map(|s| s.min_days).max()
    }

    /// The season that prices `day`.
    ///
    /// # Errors
    /// Returns `OfferError::SeasonGap` if no active season covers the day.
    pub fn season_for(&self, day: NaiveDate) -> Result<&Season> {
        self.seasons
            .iter()
            .find(|s| s.covers(day))
            .ok_or(OfferError::SeasonGap { date: day })
    }

    /// The season covering the most days of `range`.
    ///
    /// Ties go to the season that comes first in resolution order.
    ///
    /// # Errors
    /// Returns `OfferError::SeasonGap` for the first day of the range that no
    /// active season covers.
    pub fn dominant_for(&self, range: &DateRange) -> Result<&Season> {
        let mut counts = vec![0u32; self.seasons.len()];
        for day in range.iter_days() {
            let idx = self
                .seasons
                .iter()
                .position(|s| s.covers(day))
                .ok_or(OfferError::SeasonGap { date: day })?;
            counts[idx] += 1;
        }

        // Seasons are already in resolution order, so the first maximum wins.
        let mut best = 0;
        for (idx, &count) in counts.iter().enumerate() {
            if count > counts[best] {
                best = idx;
            }
        }
        Ok(&self.seasons[best])
    }

    /// Every pair of active seasons sharing at least one day, in resolution order.
    pub fn overlaps(&self) -> Vec<(&Season, &Season)> {
        let mut pairs = Vec::new();
        for (i, a) in self.seasons.iter().enumerate() {
            for b in &self.seasons[i + 1..] {
                if a.range().overlaps(&b.range()) {
                    pairs.push((a, b));
                }
            }
        }
        pairs
    }
}
