// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-field merge policy for folding a snapshot into a stored profile.
//!
//! | field | policy |
//! |---|---|
//! | `traits`, `common_phrases` | union, first-seen order |
//! | `filler_word_frequency` | weighted mean over `total_sessions` |
//! | `speech_rate` | latest |
//! | `dialect` | sticky once established |
//! | `confidence_score` | fixed increment, capped at 1.0 |

use chrono::{DateTime, Utc};
use persona_core::{PersonalityProfile, ProfileSnapshot};

/// Dialect value the synthesizer reports when it could not determine one.
pub const UNKNOWN_DIALECT: &str = "Unknown";

/// Folds `snapshot` into `profile` as session number `total_sessions + 1`.
pub fn fold(
    profile: &mut PersonalityProfile,
    snapshot: &ProfileSnapshot,
    confidence_increment: f64,
    now: DateTime<Utc>,
) {
    let n = profile.consistency.total_sessions.saturating_add(1);

    union_into(&mut profile.traits, &snapshot.traits);
    union_into(&mut profile.common_phrases, &snapshot.common_phrases);

    profile.filler_word_frequency = unit(weighted_mean(
        unit(profile.filler_word_frequency),
        unit(snapshot.filler_word_frequency),
        n,
    ));

    profile.speech_rate = snapshot.speech_rate.clone();

    if profile.dialect.is_none() && establishes_dialect(&snapshot.dialect) {
        profile.dialect = Some(snapshot.dialect.clone());
    }

    profile.confidence_score = (profile.confidence_score + confidence_increment).min(1.0);
    profile.consistency.total_sessions = n;
    profile.consistency.last_updated = Some(now);
}

/// `(previous * (n - 1) + observed) / n`.
pub fn weighted_mean(previous: f64, observed: f64, n: u32) -> f64 {
    if n == 0 {
        return observed;
    }
    let n = f64::from(n);
    (previous * (n - 1.0) + observed) / n
}

fn establishes_dialect(dialect: &str) -> bool {
    let dialect = dialect.trim();
    !dialect.is_empty() && !dialect.eq_ignore_ascii_case(UNKNOWN_DIALECT)
}

fn union_into(existing: &mut Vec<String>, incoming: &[String]) {
    for item in incoming {
        if !existing.contains(item) {
            existing.push(item.clone());
        }
    }
}

/// Clamps into [0, 1], mapping NaN to 0.
fn unit(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use proptest::prelude::*;

    use super::*;

    fn snapshot(filler: f64, rate: &str, dialect: &str) -> ProfileSnapshot {
        ProfileSnapshot {
            traits: vec!["Casual".into()],
            common_phrases: vec!["you know".into()],
            filler_word_frequency: filler,
            speech_rate: rate.into(),
            dialect: dialect.into(),
            confidence_score: 0.9,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn weighted_merge_scenario() {
        let mut profile = PersonalityProfile::default();
        profile.consistency.total_sessions = 2;
        profile.filler_word_frequency = 0.30;

        fold(&mut profile, &snapshot(0.60, "Fast", "Irish"), 0.1, now());

        assert!((profile.filler_word_frequency - 0.40).abs() < 1e-12);
        assert_eq!(profile.consistency.total_sessions, 3);
        assert_eq!(profile.consistency.last_updated, Some(now()));
    }

    #[test]
    fn first_session_takes_snapshot_values() {
        let mut profile = PersonalityProfile::default();
        fold(&mut profile, &snapshot(0.25, "Slow", "Texan"), 0.1, now());

        assert_eq!(profile.filler_word_frequency, 0.25);
        assert_eq!(profile.speech_rate, "Slow");
        assert_eq!(profile.dialect.as_deref(), Some("Texan"));
        assert_eq!(profile.traits, vec!["Casual".to_string()]);
        assert!((profile.confidence_score - 0.1).abs() < 1e-12);
    }

    #[test]
    fn dialect_is_sticky_and_speech_rate_is_latest() {
        let mut profile = PersonalityProfile::default();
        fold(&mut profile, &snapshot(0.1, "Slow", "Texan"), 0.1, now());
        fold(&mut profile, &snapshot(0.1, "Fast", "Cockney"), 0.1, now());

        assert_eq!(profile.dialect.as_deref(), Some("Texan"));
        assert_eq!(profile.speech_rate, "Fast");
    }

    #[test]
    fn unknown_dialect_does_not_establish() {
        let mut profile = PersonalityProfile::default();
        fold(&mut profile, &snapshot(0.0, "Unknown", "Unknown"), 0.1, now());
        assert_eq!(profile.dialect, None);
        assert_eq!(profile.effective_dialect(), "General American");

        fold(&mut profile, &snapshot(0.0, "Moderate", "Welsh"), 0.1, now());
        assert_eq!(profile.dialect.as_deref(), Some("Welsh"));
    }

    #[test]
    fn sets_are_unioned_in_first_seen_order() {
        let mut profile = PersonalityProfile {
            traits: vec!["Calm".into(), "Casual".into()],
            ..PersonalityProfile::default()
        };
        let mut snap = snapshot(0.0, "Moderate", "Unknown");
        snap.traits = vec!["Witty".into(), "Calm".into(), "Witty".into()];
        snap.common_phrases = vec!["basically".into()];

        fold(&mut profile, &snap, 0.1, now());
        assert_eq!(profile.traits, vec!["Calm", "Casual", "Witty"]);
        assert_eq!(profile.common_phrases, vec!["basically"]);
    }

    #[test]
    fn confidence_caps_at_one() {
        let mut profile = PersonalityProfile {
            confidence_score: 0.95,
            ..PersonalityProfile::default()
        };
        fold(&mut profile, &snapshot(0.0, "Moderate", "Unknown"), 0.1, now());
        assert_eq!(profile.confidence_score, 1.0);
        fold(&mut profile, &snapshot(0.0, "Moderate", "Unknown"), 0.1, now());
        assert_eq!(profile.confidence_score, 1.0);
    }

    #[test]
    fn out_of_range_snapshot_frequency_is_clamped() {
        let mut profile = PersonalityProfile::default();
        fold(&mut profile, &snapshot(3.5, "Fast", "Unknown"), 0.1, now());
        assert_eq!(profile.filler_word_frequency, 1.0);
        fold(&mut profile, &snapshot(f64::NAN, "Fast", "Unknown"), 0.1, now());
        assert_eq!(profile.filler_word_frequency, 0.5);
    }

    proptest! {
        #[test]
        fn merge_matches_weighted_mean(
            prior in 0.0f64..=1.0,
            observed in 0.0f64..=1.0,
            sessions in 0u32..500,
        ) {
            let mut profile = PersonalityProfile {
                filler_word_frequency: prior,
                ..PersonalityProfile::default()
            };
            profile.consistency.total_sessions = sessions;

            fold(&mut profile, &snapshot(observed, "Fast", "Unknown"), 0.1, now());

            let n = f64::from(sessions + 1);
            let expected = (prior * (n - 1.0) + observed) / n;
            prop_assert!((profile.filler_word_frequency - expected).abs() < 1e-9);
            prop_assert_eq!(profile.consistency.total_sessions, sessions + 1);
        }

        #[test]
        fn merges_keep_bounds_and_monotonic_confidence(
            fillers in proptest::collection::vec(-1.0f64..2.0, 1..30),
            increment in 0.001f64..=1.0,
        ) {
            let mut profile = PersonalityProfile::default();
            let mut last_confidence = profile.confidence_score;
            for filler in fillers {
                fold(&mut profile, &snapshot(filler, "Moderate", "Unknown"), increment, now());
                prop_assert!((0.0..=1.0).contains(&profile.filler_word_frequency));
                prop_assert!((0.0..=1.0).contains(&profile.confidence_score));
                prop_assert!(profile.confidence_score >= last_confidence);
                last_confidence = profile.confidence_score;
            }
        }
    }
}
