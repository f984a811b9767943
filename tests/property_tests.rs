/// Property-based tests using proptest
/// Tests invariants of the lead codec and the validation rules
use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use rust_nocrm_api::models::timestamp;
use rust_nocrm_api::services::validate_lead_at;
use rust_nocrm_api::{Lead, NoCrmError};

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap()
}

fn arb_lead() -> impl Strategy<Value = Lead> {
    (
        "[A-Za-z ]{0,20}",
        "[a-z]{1,10}",
        proptest::option::of("[A-Za-z ]{1,20}"),
        proptest::option::of("[A-Za-z ]{1,40}"),
        proptest::option::of(-1_000_000i64..1_000_000i64),
        proptest::option::of(-50i64..150i64),
        proptest::option::of(0i64..4_000_000_000i64),
        proptest::option::of(any::<i64>()),
        proptest::option::of(0i64..4_000_000_000i64),
    )
        .prop_map(
            |(title, status, contact, description, cents, probability, closing, id, created)| {
                let mut lead = Lead::new(title, status);
                lead.contact_name = contact;
                lead.description = description;
                lead.amount = cents.map(|c| c as f64 / 100.0);
                lead.probability = probability;
                lead.expected_closing_date = closing
                    .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
                    .map(|dt| dt.fixed_offset());
                lead.id = id;
                lead.created_at = created
                    .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
                    .map(|dt| dt.fixed_offset());
                lead
            },
        )
}

// Property: encoding never leaks server-owned or absent fields
proptest! {
    #[test]
    fn encoded_lead_never_has_server_or_null_fields(lead in arb_lead()) {
        let record = lead.to_record().unwrap();
        for key in Lead::SERVER_FIELDS {
            prop_assert!(!record.contains_key(key), "server field {} leaked", key);
        }
        prop_assert!(record.values().all(|v| !v.is_null()));
        prop_assert!(record.keys().all(|k| Lead::FIELDS.contains(&k.as_str())));
        prop_assert_eq!(record.contains_key("contact_name"), lead.contact_name.is_some());
        prop_assert_eq!(record.contains_key("amount"), lead.amount.is_some());
    }

    #[test]
    fn round_trip_preserves_everything_but_server_fields(lead in arb_lead()) {
        let decoded = Lead::from_record(lead.to_record().unwrap()).unwrap();

        let mut expected = lead.clone();
        expected.id = None;
        expected.created_at = None;
        expected.updated_at = None;
        prop_assert_eq!(decoded, expected);
    }
}

// Property: a trailing Z means UTC
proptest! {
    #[test]
    fn z_suffix_equals_explicit_utc_offset(secs in 0i64..4_000_000_000i64, millis in 0u32..1000) {
        let dt = Utc.timestamp_opt(secs, millis * 1_000_000).single().unwrap();
        let base = dt.format("%Y-%m-%dT%H:%M:%S%.3f").to_string();

        let with_z = timestamp::parse(&format!("{}Z", base)).unwrap();
        let with_offset = timestamp::parse(&format!("{}+00:00", base)).unwrap();

        prop_assert_eq!(with_z, with_offset);
        prop_assert_eq!(with_z.offset().local_minus_utc(), 0);
        prop_assert_eq!(with_z, dt);
    }

    #[test]
    fn timestamp_parse_never_panics(raw in "\\PC*") {
        let _ = timestamp::parse(&raw);
    }
}

// Property: validation bounds
proptest! {
    #[test]
    fn short_titles_always_rejected(title in "\\s{0,3}[a-z]{0,2}\\s{0,3}") {
        let result = validate_lead_at(&Lead::new(title, "new"), fixed_now());
        prop_assert!(matches!(result, Err(NoCrmError::Validation(_))));
    }

    #[test]
    fn titles_of_three_or_more_chars_accepted(title in "\\s{0,3}[a-zA-Z0-9]{3,30}\\s{0,3}") {
        prop_assert!(validate_lead_at(&Lead::new(title, "new"), fixed_now()).is_ok());
    }

    #[test]
    fn probability_accepted_iff_in_range(probability in -1000i64..1000i64) {
        let lead = Lead::new("Valid", "new").with_probability(probability);
        let result = validate_lead_at(&lead, fixed_now());
        prop_assert_eq!(result.is_ok(), (0..=100).contains(&probability));
    }

    #[test]
    fn amount_accepted_iff_non_negative(amount in -1.0e9f64..1.0e9f64) {
        let lead = Lead::new("Valid", "new").with_amount(amount);
        let result = validate_lead_at(&lead, fixed_now());
        prop_assert_eq!(result.is_ok(), amount >= 0.0);
    }

    #[test]
    fn closing_date_accepted_iff_not_before_now(offset_secs in -1_000_000i64..1_000_000i64) {
        let closing = (fixed_now() + Duration::seconds(offset_secs)).fixed_offset();
        let lead = Lead::new("Valid", "new").with_expected_closing_date(closing);
        let result = validate_lead_at(&lead, fixed_now());
        prop_assert_eq!(result.is_ok(), offset_secs >= 0);
    }
}
