//! Tests for gap detection between bookings.

use chrono::NaiveDate;
use offer_engine::gaps::{annotate, detect_gaps, GapDetector, IntegrityPolicy};
use offer_engine::pricing::{PriceCalculator, PricingPolicy};
use offer_engine::{
    Booking, BookingStatus, Offer, OfferError, OfferStatus, Season, SeasonCalendar, SeasonTier, TierPrices,
};
use rust_decimal_macros::dec;

// ── Helpers ─────────────────────────────────────────────────────────────────

fn d(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

fn booking(id: &str, vehicle: &str, pickup: &str, dropoff: &str) -> Booking {
    booking_with_status(id, vehicle, pickup, dropoff, BookingStatus::Confirmed)
}

fn booking_with_status(id: &str, vehicle: &str, pickup: &str, dropoff: &str, status: BookingStatus) -> Booking {
    Booking {
        id: id.to_string(),
        vehicle_id: vehicle.to_string(),
        pickup_date: d(pickup),
        dropoff_date: d(dropoff),
        status,
    }
}

fn season(slug: &str, start: &str, end: &str, min_days: u32) -> Season {
    Season {
        id: slug.to_string(),
        name: slug.to_string(),
        slug: slug.to_string(),
        tier: SeasonTier::Medium,
        start_date: d(start),
        end_date: d(end),
        prices: TierPrices {
            less_than_week: dec!(125.00),
            one_week: dec!(115.00),
            two_weeks: dec!(105.00),
            three_weeks: dec!(95.00),
        },
        min_days,
        is_active: true,
    }
}

fn june_media() -> Vec<Season> {
    vec![season("Media", "2025-06-01", "2025-06-30", 2)]
}

// ── Worked examples ─────────────────────────────────────────────────────────

#[test]
fn gap_meeting_min_stay_is_not_reported() {
    let bookings = vec![
        booking("b1", "V", "2025-06-01", "2025-06-05"),
        booking("b2", "V", "2025-06-10", "2025-06-15"),
    ];
    // Free days 06..09 (4 days) >= min_days 2: bookable normally.
    let gaps = detect_gaps(&bookings, &june_media()).unwrap();
    assert!(gaps.is_empty());
}

#[test]
fn one_day_hole_is_reported() {
    let bookings = vec![
        booking("b1", "V", "2025-06-01", "2025-06-05"),
        booking("b2", "V", "2025-06-07", "2025-06-15"),
    ];
    let gaps = detect_gaps(&bookings, &june_media()).unwrap();

    assert_eq!(gaps.len(), 1);
    let gap = &gaps[0];
    assert_eq!(gap.vehicle_id, "V");
    assert_eq!(gap.gap_start_date, d("2025-06-06"));
    assert_eq!(gap.gap_end_date, d("2025-06-06"));
    assert_eq!(gap.gap_days, 1);
    assert_eq!(gap.season_name, "Media");
    assert_eq!(gap.season_min_days, 2);
    assert_eq!(gap.season_price_per_day, dec!(125.00));
    assert_eq!(gap.previous_booking_id.as_deref(), Some("b1"));
    assert_eq!(gap.next_booking_id.as_deref(), Some("b2"));
}

// ── Boundaries ──────────────────────────────────────────────────────────────

#[test]
fn back_to_back_bookings_leave_no_gap() {
    let bookings = vec![
        booking("b1", "V", "2025-06-01", "2025-06-05"),
        booking("b2", "V", "2025-06-06", "2025-06-15"),
    ];
    assert!(detect_gaps(&bookings, &june_media()).unwrap().is_empty());
}

#[test]
fn same_day_handover_leaves_no_gap_and_is_valid() {
    let bookings = vec![
        booking("b1", "V", "2025-06-01", "2025-06-05"),
        booking("b2", "V", "2025-06-05", "2025-06-15"),
    ];
    assert!(detect_gaps(&bookings, &june_media()).unwrap().is_empty());
}

#[test]
fn gap_equal_to_min_days_is_excluded() {
    let seasons = vec![season("Alta", "2025-08-01", "2025-08-31", 7)];
    let bookings = vec![
        booking("b1", "V", "2025-08-01", "2025-08-05"),
        booking("b2", "V", "2025-08-13", "2025-08-20"),
        booking("b3", "V", "2025-08-27", "2025-08-31"),
    ];
    // 06..12 is 7 days (== min, excluded); 21..26 is 6 days (< min, reported).
    let gaps = detect_gaps(&bookings, &seasons).unwrap();
    assert_eq!(gaps.len(), 1);
    assert_eq!(gaps[0].gap_start_date, d("2025-08-21"));
    assert_eq!(gaps[0].gap_days, 6);
}

#[test]
fn open_ended_stretches_are_never_reported() {
    let bookings = vec![booking("b1", "V", "2025-06-10", "2025-06-12")];
    assert!(detect_gaps(&bookings, &june_media()).unwrap().is_empty());
}

#[test]
fn empty_input_yields_no_gaps() {
    assert!(detect_gaps(&[], &june_media()).unwrap().is_empty());
}

// ── Grouping and ordering ───────────────────────────────────────────────────

#[test]
fn bookings_are_grouped_per_vehicle_and_sorted() {
    let bookings = vec![
        booking("b4", "B", "2025-06-12", "2025-06-20"),
        booking("b2", "A", "2025-06-07", "2025-06-15"),
        booking("b3", "B", "2025-06-01", "2025-06-10"),
        booking("b1", "A", "2025-06-01", "2025-06-05"),
    ];
    let gaps = detect_gaps(&bookings, &june_media()).unwrap();

    assert_eq!(gaps.len(), 2);
    assert_eq!((gaps[0].vehicle_id.as_str(), gaps[0].gap_start_date), ("A", d("2025-06-06")));
    assert_eq!((gaps[1].vehicle_id.as_str(), gaps[1].gap_start_date), ("B", d("2025-06-11")));
}

#[test]
fn pending_and_cancelled_bookings_do_not_bound_gaps() {
    let bookings = vec![
        booking("b1", "V", "2025-06-01", "2025-06-05"),
        booking_with_status("p", "V", "2025-06-07", "2025-06-08", BookingStatus::Pending),
        booking_with_status("c", "V", "2025-06-02", "2025-06-20", BookingStatus::Cancelled),
        booking_with_status("b2", "V", "2025-06-10", "2025-06-12", BookingStatus::InProgress),
        booking_with_status("b3", "V", "2025-06-14", "2025-06-16", BookingStatus::Completed),
    ];
    let gaps = detect_gaps(&bookings, &june_media()).unwrap();

    // Only the 13th is a reportable hole; 06..09 is four days.
    assert_eq!(gaps.len(), 1);
    assert_eq!(gaps[0].gap_start_date, d("2025-06-13"));
    assert_eq!(gaps[0].previous_booking_id.as_deref(), Some("b2"));
}

// ── Seasons ─────────────────────────────────────────────────────────────────

#[test]
fn gap_across_season_boundary_uses_dominant_season() {
    let seasons = vec![
        season("Baja", "2025-05-01", "2025-06-02", 2),
        season("Alta", "2025-06-03", "2025-06-30", 7),
    ];
    let bookings = vec![
        booking("b1", "V", "2025-05-20", "2025-05-31"),
        booking("b2", "V", "2025-06-06", "2025-06-20"),
    ];
    // Gap 06-01..06-05: two Baja days, three Alta days.
    let gaps = detect_gaps(&bookings, &seasons).unwrap();
    assert_eq!(gaps.len(), 1);
    assert_eq!(gaps[0].season_name, "Alta");
    assert_eq!(gaps[0].season_min_days, 7);
}

#[test]
fn even_split_goes_to_earlier_season() {
    let seasons = vec![
        season("Alta", "2025-06-03", "2025-06-30", 7),
        season("Baja", "2025-05-01", "2025-06-02", 7),
    ];
    let bookings = vec![
        booking("b1", "V", "2025-05-20", "2025-05-31"),
        booking("b2", "V", "2025-06-05", "2025-06-20"),
    ];
    let gaps = detect_gaps(&bookings, &seasons).unwrap();
    assert_eq!(gaps[0].season_name, "Baja");
}

#[test]
fn inactive_seasons_are_ignored() {
    let mut inactive = season("Alta", "2025-06-01", "2025-06-30", 10);
    inactive.is_active = false;
    let seasons = vec![inactive, season("Media", "2025-06-01", "2025-06-30", 2)];
    let bookings = vec![
        booking("b1", "V", "2025-06-01", "2025-06-05"),
        booking("b2", "V", "2025-06-10", "2025-06-15"),
    ];
    assert!(detect_gaps(&bookings, &seasons).unwrap().is_empty());
}

#[test]
fn uncovered_gap_day_fails_loudly() {
    let seasons = vec![season("Media", "2025-06-01", "2025-06-05", 2)];
    let bookings = vec![
        booking("b1", "V", "2025-06-01", "2025-06-05"),
        booking("b2", "V", "2025-06-07", "2025-06-15"),
    ];
    let err = detect_gaps(&bookings, &seasons).unwrap_err();
    assert!(matches!(err, OfferError::SeasonGap { date } if date == d("2025-06-06")));
}

#[test]
fn long_gap_over_uncovered_days_does_not_block_other_vehicles() {
    let seasons = june_media();
    let bookings = vec![
        booking("a1", "A", "2025-06-01", "2025-06-05"),
        booking("a2", "A", "2025-06-07", "2025-06-10"),
        // B sits idle through July, which no season covers.
        booking("b1", "B", "2025-06-01", "2025-06-20"),
        booking("b2", "B", "2025-08-01", "2025-08-05"),
    ];
    let gaps = detect_gaps(&bookings, &seasons).unwrap();
    assert_eq!(gaps.len(), 1);
    assert_eq!(gaps[0].vehicle_id, "A");
    assert_eq!(gaps[0].gap_start_date, d("2025-06-06"));
    assert_eq!(gaps[0].gap_days, 1);
}

#[test]
fn short_gap_is_checked_against_longest_min_stay() {
    // Three free days, two of them uncovered: shorter than Alta's minimum, so
    // the season has to be resolved and the missing coverage surfaces.
    let seasons = vec![
        season("Media", "2025-06-01", "2025-06-06", 2),
        season("Alta", "2025-07-01", "2025-07-31", 5),
    ];
    let bookings = vec![
        booking("b1", "V", "2025-06-01", "2025-06-05"),
        booking("b2", "V", "2025-06-09", "2025-06-15"),
    ];
    let err = detect_gaps(&bookings, &seasons).unwrap_err();
    assert!(matches!(err, OfferError::SeasonGap { date } if date == d("2025-06-07")));
}

// ── Integrity ───────────────────────────────────────────────────────────────

#[test]
fn overlapping_bookings_are_rejected_by_default() {
    let bookings = vec![
        booking("b1", "V", "2025-06-01", "2025-06-10"),
        booking("b2", "V", "2025-06-08", "2025-06-15"),
    ];
    let err = detect_gaps(&bookings, &june_media()).unwrap_err();
    assert!(err.is_data_integrity());
    assert!(matches!(err, OfferError::OverlappingBookings { ref first, ref second, .. } if first == "b1" && second == "b2"));
}

#[test]
fn inverted_booking_is_rejected_by_default() {
    let bookings = vec![booking("bad", "V", "2025-06-10", "2025-06-01")];
    let err = detect_gaps(&bookings, &june_media()).unwrap_err();
    assert!(matches!(err, OfferError::InvertedBooking { ref booking_id, .. } if booking_id == "bad"));
}

#[test]
fn skip_policy_tolerates_overlaps_without_gaps() {
    let calendar = SeasonCalendar::new(june_media());
    let bookings = vec![
        booking("b1", "V", "2025-06-01", "2025-06-20"),
        booking("b2", "V", "2025-06-05", "2025-06-06"),
        booking("b3", "V", "2025-06-22", "2025-06-25"),
        booking("bad", "V", "2025-06-28", "2025-06-27"),
    ];
    let gaps = GapDetector::new(&calendar)
        .with_integrity(IntegrityPolicy::Skip)
        .detect(&bookings)
        .unwrap();

    // b2 sits inside b1, so the only hole is the 21st, bounded by b1.
    assert_eq!(gaps.len(), 1);
    assert_eq!(gaps[0].gap_start_date, d("2025-06-21"));
    assert_eq!(gaps[0].previous_booking_id.as_deref(), Some("b1"));
}

// ── Annotation ──────────────────────────────────────────────────────────────

fn existing_offer(vehicle: &str, start: &str) -> Offer {
    Offer {
        id: "o1".to_string(),
        vehicle_id: vehicle.to_string(),
        detected_start_date: d(start),
        detected_end_date: d(start),
        detected_days: 1,
        offer_start_date: d(start),
        offer_end_date: d(start),
        offer_days: 1,
        original_price_per_day: dec!(125.00),
        discount_percentage: dec!(15),
        final_price_per_day: dec!(106.25),
        pickup_location: "Murcia".to_string(),
        dropoff_location: "Murcia".to_string(),
        previous_booking_id: None,
        next_booking_id: None,
        admin_notes: None,
        status: OfferStatus::Published,
    }
}

#[test]
fn annotate_marks_existing_offers_and_prices_gaps() {
    let bookings = vec![
        booking("b1", "V", "2025-06-01", "2025-06-05"),
        booking("b2", "V", "2025-06-07", "2025-06-10"),
        booking("b3", "W", "2025-06-01", "2025-06-05"),
        booking("b4", "W", "2025-06-07", "2025-06-10"),
    ];
    let calendar = SeasonCalendar::new(june_media());
    let gaps = GapDetector::new(&calendar).detect(&bookings).unwrap();
    let mut calculator = PriceCalculator::new(&calendar, PricingPolicy::default());

    let detected = annotate(gaps, &[existing_offer("V", "2025-06-06")], &mut calculator);

    assert_eq!(detected.len(), 2);
    assert!(detected[0].already_exists);
    assert!(!detected[0].can_publish());
    assert!(!detected[1].already_exists);
    assert!(detected[1].can_publish());
    let quote = detected[1].real_price.as_ref().unwrap();
    assert_eq!(quote.total, dec!(125.00));
    // Both gaps cover the same day, so the second is a memo hit.
    assert_eq!(calculator.cached(), 1);
}

#[test]
fn annotate_records_price_failure_per_gap() {
    let calendar = SeasonCalendar::new(june_media());
    let bookings = vec![
        booking("b1", "V", "2025-06-01", "2025-06-05"),
        booking("b2", "V", "2025-06-07", "2025-06-10"),
    ];
    let gaps = GapDetector::new(&calendar).detect(&bookings).unwrap();
    let policy = PricingPolicy {
        max_rental_days: 0,
        ..PricingPolicy::default()
    };
    let mut calculator = PriceCalculator::new(&calendar, policy);

    let detected = annotate(gaps, &[], &mut calculator);

    assert_eq!(detected.len(), 1);
    assert!(detected[0].real_price.is_none());
    assert!(detected[0].price_error.as_deref().unwrap().contains("exceeds"));
    assert!(!detected[0].can_publish());
}
