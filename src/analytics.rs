use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::models::{
    ContainerStyle, CustomStyles, Cycle, CycleStats, CycleSummary, DateMarking, FertileWindow,
    Forecast, MarkingKind, Settings, TextStyle,
};

/// Days between ovulation and the next period. Fixed, not learned from data.
pub const LUTEAL_PHASE_DAYS: i64 = 14;
/// A completed cycle counts as regular when within this many days of the average.
pub const REGULARITY_TOLERANCE_DAYS: i64 = 2;

const FERTILE_DAYS_BEFORE_OVULATION: i64 = 5;
const FERTILE_DAYS_AFTER_OVULATION: i64 = 1;

const PERIOD_COLOR: &str = "#e91e63";
const PERIOD_BACKGROUND: &str = "#ffebee";
const OVULATION_COLOR: &str = "#4caf50";
const OVULATION_BACKGROUND: &str = "#e8f5e8";

/// Calendar markings keyed by `YYYY-MM-DD`.
pub type MarkedDates = BTreeMap<String, DateMarking>;

/// Compute averages and regularity over a user's cycle history.
/// Falls back to the settings' averages until at least one cycle is completed.
pub fn compute_stats(cycles: &[Cycle], settings: &Settings) -> CycleStats {
    let fallback = CycleStats {
        average_cycle_length: settings.average_cycle_length,
        average_period_length: settings.average_period_length,
        total_cycles: cycles.len(),
        regularity: 0,
    };

    let completed: Vec<&Cycle> = cycles.iter().filter(|c| c.is_completed()).collect();
    if completed.is_empty() {
        return fallback;
    }

    let cycle_lengths: Vec<i64> = completed.iter().map(|c| i64::from(c.cycle_length)).collect();
    let period_lengths: Vec<i64> = completed.iter().map(|c| i64::from(c.period_length)).collect();

    let average_cycle_length = round_half_up(mean(&cycle_lengths));
    let average_period_length = round_half_up(mean(&period_lengths));

    let regular = cycle_lengths
        .iter()
        .filter(|&&len| (len - average_cycle_length).abs() <= REGULARITY_TOLERANCE_DAYS)
        .count();
    let regularity = round_half_up(regular as f64 * 100.0 / cycle_lengths.len() as f64);

    CycleStats {
        average_cycle_length: saturate_i32(average_cycle_length),
        average_period_length: saturate_i32(average_period_length),
        total_cycles: cycles.len(),
        regularity: regularity.clamp(0, 100) as u8,
    }
}

/// Find the cycle `today` falls into, scanning from the most recent start date.
///
/// A closed cycle covers `start_date..=end_date`; an open one covers
/// `start_date..=start_date + cycle_length`. When nothing covers `today` the most
/// recent cycle is returned, so the result is only `None` for an empty history.
pub fn resolve_current_cycle(cycles: &[Cycle], today: NaiveDate) -> Option<&Cycle> {
    let mut by_recency: Vec<&Cycle> = cycles.iter().collect();
    by_recency.sort_by(|a, b| b.start_date.cmp(&a.start_date));

    by_recency
        .iter()
        .copied()
        .find(|cycle| {
            let end = cycle
                .end_date
                .unwrap_or_else(|| shift(cycle.start_date, i64::from(cycle.cycle_length)));
            cycle.start_date <= today && today <= end
        })
        .or_else(|| by_recency.first().copied())
}

/// Project the next period, ovulation and fertile window from the current cycle.
/// Returns `None` when there is no current cycle; stored predictions are stale then.
pub fn compute_predictions(
    current: Option<&Cycle>,
    stats: &CycleStats,
    now: DateTime<Utc>,
) -> Option<Forecast> {
    let current = current?;

    let next_period_start = shift(current.start_date, i64::from(stats.average_cycle_length));
    let next_ovulation_date = shift(next_period_start, -LUTEAL_PHASE_DAYS);
    let fertile_window = FertileWindow {
        start: shift(next_ovulation_date, -FERTILE_DAYS_BEFORE_OVULATION),
        end: shift(next_ovulation_date, FERTILE_DAYS_AFTER_OVULATION),
    };

    Some(Forecast {
        next_period_start,
        next_ovulation_date,
        fertile_window,
        last_updated: now,
    })
}

/// Build the calendar markings: every period day of every cycle, then the
/// predicted ovulation day, which overrides a period mark on the same date.
pub fn compute_marked_dates(cycles: &[Cycle], forecast: Option<&Forecast>) -> MarkedDates {
    let mut marked = MarkedDates::new();

    for cycle in cycles {
        let mut day = cycle.start_date;
        for _ in 0..cycle.period_length.max(0) {
            marked.insert(iso_date(day), marking(MarkingKind::Period));
            match day.succ_opt() {
                Some(next) => day = next,
                None => break,
            }
        }
    }

    if let Some(forecast) = forecast {
        marked.insert(
            iso_date(forecast.next_ovulation_date),
            marking(MarkingKind::Ovulation),
        );
    }

    marked
}

/// Where `today` sits relative to the current cycle and its forecast.
pub fn summarize(current: &Cycle, forecast: &Forecast, today: NaiveDate) -> CycleSummary {
    CycleSummary {
        cycle_day: (today - current.start_date).num_days(),
        in_fertile_window: forecast.fertile_window.contains(today),
        period_expected_in_days: (forecast.next_period_start - today).num_days(),
        start_date: current.start_date,
        next_period_start: forecast.next_period_start,
        next_ovulation_date: forecast.next_ovulation_date,
    }
}

pub fn iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn marking(kind: MarkingKind) -> DateMarking {
    let (color, background) = match kind {
        MarkingKind::Period => (PERIOD_COLOR, PERIOD_BACKGROUND),
        MarkingKind::Ovulation => (OVULATION_COLOR, OVULATION_BACKGROUND),
    };
    DateMarking {
        kind,
        marked: true,
        dot_color: color,
        custom_styles: CustomStyles {
            container: ContainerStyle {
                background_color: background,
            },
            text: TextStyle {
                color,
                font_weight: "bold",
            },
        },
    }
}

// Lengths are not validated upstream, so clamp at the calendar bounds instead of panicking.
fn shift(date: NaiveDate, days: i64) -> NaiveDate {
    date.checked_add_signed(Duration::days(days))
        .unwrap_or(if days < 0 { NaiveDate::MIN } else { NaiveDate::MAX })
}

fn mean(values: &[i64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<i64>() as f64 / values.len() as f64
}

fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

fn saturate_i32(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn make_cycle(start: &str, end: Option<&str>, period_length: i32, cycle_length: i32) -> Cycle {
        let now = Utc::now();
        Cycle {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            start_date: date(start),
            end_date: end.map(date),
            period_length,
            cycle_length,
            symptoms: vec![],
            notes: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn stats_with_average(average_cycle_length: i32) -> CycleStats {
        CycleStats {
            average_cycle_length,
            average_period_length: 5,
            total_cycles: 1,
            regularity: 100,
        }
    }

    #[test]
    fn stats_without_cycles_use_settings() {
        let settings = Settings {
            average_cycle_length: 30,
            average_period_length: 6,
            ..Settings::default()
        };
        let stats = compute_stats(&[], &settings);
        assert_eq!(
            stats,
            CycleStats {
                average_cycle_length: 30,
                average_period_length: 6,
                total_cycles: 0,
                regularity: 0,
            }
        );
    }

    #[test]
    fn stats_without_completed_cycles_count_all() {
        let cycles = vec![
            make_cycle("2024-03-01", None, 4, 31),
            make_cycle("2024-02-01", None, 7, 29),
        ];
        let stats = compute_stats(&cycles, &Settings::default());
        assert_eq!(stats.average_cycle_length, 28);
        assert_eq!(stats.average_period_length, 5);
        assert_eq!(stats.total_cycles, 2);
        assert_eq!(stats.regularity, 0);
    }

    #[test]
    fn single_completed_cycle() {
        let cycles = vec![make_cycle("2024-01-15", Some("2024-02-11"), 5, 28)];
        let stats = compute_stats(&cycles, &Settings::default());
        assert_eq!(
            stats,
            CycleStats {
                average_cycle_length: 28,
                average_period_length: 5,
                total_cycles: 1,
                regularity: 100,
            }
        );
    }

    #[test]
    fn total_counts_incomplete_cycles_too() {
        let cycles = vec![
            make_cycle("2024-03-10", None, 5, 28),
            make_cycle("2024-02-11", Some("2024-03-09"), 5, 28),
            make_cycle("2024-01-15", Some("2024-02-10"), 5, 27),
        ];
        let stats = compute_stats(&cycles, &Settings::default());
        assert_eq!(stats.total_cycles, 3);
    }

    #[test]
    fn identical_lengths_are_fully_regular() {
        let cycles: Vec<Cycle> = ["2024-01-01", "2024-02-01", "2024-03-01", "2024-04-01"]
            .iter()
            .map(|start| make_cycle(start, Some("2024-12-31"), 4, 33))
            .collect();
        let stats = compute_stats(&cycles, &Settings::default());
        assert_eq!(stats.average_cycle_length, 33);
        assert_eq!(stats.regularity, 100);
    }

    #[test]
    fn lengths_within_two_days_are_regular() {
        let cycles = vec![
            make_cycle("2024-01-01", Some("2024-01-26"), 5, 26),
            make_cycle("2024-02-01", Some("2024-03-01"), 5, 30),
        ];
        let stats = compute_stats(&cycles, &Settings::default());
        assert_eq!(stats.average_cycle_length, 28);
        assert_eq!(stats.regularity, 100);
    }

    #[test]
    fn outlier_drops_regularity() {
        // Average 30: two cycles are 2 days off, one is 4 days off.
        let cycles = vec![
            make_cycle("2024-01-01", Some("2024-01-28"), 5, 28),
            make_cycle("2024-02-01", Some("2024-02-28"), 5, 28),
            make_cycle("2024-03-01", Some("2024-04-03"), 5, 34),
        ];
        let stats = compute_stats(&cycles, &Settings::default());
        assert_eq!(stats.average_cycle_length, 30);
        assert_eq!(stats.regularity, 67);
    }

    #[test]
    fn outlier_shifts_average_away_from_others() {
        let cycles = vec![
            make_cycle("2024-01-01", Some("2024-01-26"), 5, 26),
            make_cycle("2024-02-01", Some("2024-03-01"), 5, 30),
            make_cycle("2024-03-05", Some("2024-04-08"), 5, 35),
        ];
        let stats = compute_stats(&cycles, &Settings::default());
        assert_eq!(stats.average_cycle_length, 30);
        assert_eq!(stats.regularity, 33);
    }

    #[test]
    fn averages_round_half_up() {
        let cycles = vec![
            make_cycle("2024-01-01", Some("2024-01-27"), 4, 27),
            make_cycle("2024-02-01", Some("2024-02-28"), 5, 28),
        ];
        let stats = compute_stats(&cycles, &Settings::default());
        assert_eq!(stats.average_cycle_length, 28);
        assert_eq!(stats.average_period_length, 5);
    }

    #[test]
    fn resolve_on_empty_history() {
        assert!(resolve_current_cycle(&[], date("2024-01-20")).is_none());
    }

    #[test]
    fn resolve_within_closed_cycle() {
        let cycles = vec![make_cycle("2024-01-15", Some("2024-02-11"), 5, 28)];
        let current = resolve_current_cycle(&cycles, date("2024-01-20")).unwrap();
        assert_eq!(current.start_date, date("2024-01-15"));
    }

    #[test]
    fn resolve_open_cycle_uses_projected_end() {
        let cycles = vec![
            make_cycle("2024-01-15", Some("2024-02-11"), 5, 28),
            make_cycle("2024-02-12", None, 5, 30),
        ];
        let today = date("2024-03-13");
        assert_eq!(
            resolve_current_cycle(&cycles, today).unwrap().start_date,
            date("2024-02-12")
        );
    }

    #[test]
    fn resolve_prefers_most_recent_overlap() {
        let cycles = vec![
            make_cycle("2024-01-01", Some("2024-01-31"), 5, 30),
            make_cycle("2024-01-10", Some("2024-02-05"), 5, 26),
        ];
        let current = resolve_current_cycle(&cycles, date("2024-01-20")).unwrap();
        assert_eq!(current.start_date, date("2024-01-10"));
    }

    #[test]
    fn resolve_falls_back_to_latest_start() {
        let cycles = vec![
            make_cycle("2023-05-01", Some("2023-05-28"), 5, 28),
            make_cycle("2023-06-01", Some("2023-06-28"), 5, 28),
            make_cycle("2023-04-01", Some("2023-04-28"), 5, 28),
        ];
        let current = resolve_current_cycle(&cycles, date("2024-06-01")).unwrap();
        assert_eq!(current.start_date, date("2023-06-01"));
    }

    #[test]
    fn no_prediction_without_current_cycle() {
        assert!(compute_predictions(None, &stats_with_average(28), Utc::now()).is_none());
    }

    #[test]
    fn prediction_dates() {
        let cycle = make_cycle("2024-01-15", None, 5, 28);
        let now = Utc::now();
        let forecast = compute_predictions(Some(&cycle), &stats_with_average(28), now).unwrap();

        assert_eq!(forecast.next_period_start, date("2024-02-12"));
        assert_eq!(forecast.next_ovulation_date, date("2024-01-29"));
        assert_eq!(
            forecast.fertile_window,
            FertileWindow {
                start: date("2024-01-24"),
                end: date("2024-01-30"),
            }
        );
        assert_eq!(forecast.last_updated, now);
    }

    #[test]
    fn prediction_offsets_hold_for_any_average() {
        let cycle = make_cycle("2024-12-20", None, 5, 28);
        for average in [21, 26, 35, 45] {
            let forecast =
                compute_predictions(Some(&cycle), &stats_with_average(average), Utc::now())
                    .unwrap();
            assert_eq!(
                (forecast.next_period_start - forecast.next_ovulation_date).num_days(),
                14
            );
            assert_eq!(
                (forecast.next_ovulation_date - forecast.fertile_window.start).num_days(),
                5
            );
            assert_eq!(
                (forecast.fertile_window.end - forecast.next_ovulation_date).num_days(),
                1
            );
        }
    }

    #[test]
    fn absurd_lengths_do_not_panic() {
        let cycle = make_cycle("2024-01-15", None, 5, i32::MAX);
        let stats = stats_with_average(i32::MAX);
        assert!(resolve_current_cycle(std::slice::from_ref(&cycle), date("2024-01-20")).is_some());
        assert!(compute_predictions(Some(&cycle), &stats, Utc::now()).is_some());
    }

    #[test]
    fn marks_period_days() {
        let cycles = vec![make_cycle("2024-01-30", None, 3, 28)];
        let marked = compute_marked_dates(&cycles, None);

        let keys: Vec<&str> = marked.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["2024-01-30", "2024-01-31", "2024-02-01"]);
        let mark = &marked["2024-01-31"];
        assert_eq!(mark.kind, MarkingKind::Period);
        assert_eq!(mark.dot_color, "#e91e63");
        assert_eq!(mark.custom_styles.container.background_color, "#ffebee");
    }

    #[test]
    fn ovulation_overrides_period_mark() {
        let cycles = vec![make_cycle("2024-01-27", None, 5, 28)];
        let current = &cycles[0];
        let mut forecast =
            compute_predictions(Some(current), &stats_with_average(28), Utc::now()).unwrap();
        forecast.next_ovulation_date = date("2024-01-29");

        let marked = compute_marked_dates(&cycles, Some(&forecast));
        assert_eq!(marked.len(), 5);
        assert_eq!(marked["2024-01-29"].kind, MarkingKind::Ovulation);
        assert_eq!(marked["2024-01-29"].dot_color, "#4caf50");
        assert_eq!(marked["2024-01-28"].kind, MarkingKind::Period);
    }

    #[test]
    fn non_positive_period_length_marks_nothing() {
        let cycles = vec![
            make_cycle("2024-01-01", None, 0, 28),
            make_cycle("2024-02-01", None, -3, 28),
        ];
        assert!(compute_marked_dates(&cycles, None).is_empty());
    }

    #[test]
    fn period_marks_stop_at_calendar_end() {
        let mut cycle = make_cycle("2024-01-01", None, i32::MAX, 28);
        cycle.start_date = NaiveDate::MAX - Duration::days(3);

        let started = std::time::Instant::now();
        let marked = compute_marked_dates(&[cycle], None);
        assert!(started.elapsed() < std::time::Duration::from_secs(1));
        assert_eq!(marked.len(), 4);
        assert!(marked.contains_key(&iso_date(NaiveDate::MAX)));
    }

    #[test]
    fn marked_dates_are_deterministic() {
        let cycles = vec![
            make_cycle("2024-02-12", None, 5, 28),
            make_cycle("2024-01-15", Some("2024-02-11"), 5, 28),
        ];
        let stats = compute_stats(&cycles, &Settings::default());
        let current = resolve_current_cycle(&cycles, date("2024-02-14"));
        let forecast = compute_predictions(current, &stats, Utc::now());

        let first = compute_marked_dates(&cycles, forecast.as_ref());
        let second = compute_marked_dates(&cycles, forecast.as_ref());
        assert_eq!(first, second);
    }

    #[test]
    fn summary_relative_to_today() {
        let cycle = make_cycle("2024-01-15", None, 5, 28);
        let forecast =
            compute_predictions(Some(&cycle), &stats_with_average(28), Utc::now()).unwrap();

        let summary = summarize(&cycle, &forecast, date("2024-01-25"));
        assert_eq!(summary.cycle_day, 10);
        assert!(summary.in_fertile_window);
        assert_eq!(summary.period_expected_in_days, 18);

        let later = summarize(&cycle, &forecast, date("2024-02-01"));
        assert!(!later.in_fertile_window);
    }
}
