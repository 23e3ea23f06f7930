//! crates/mood_insight_core/src/stats.rs
//!
//! Data preparation: aggregate statistics, per-day breakdowns and detection of
//! students whose negative moods cross the attention thresholds.

use std::collections::{BTreeMap, HashMap};

use crate::domain::{
    ConcerningStudent, DailyBreakdown, Emotion, EmotionCounts, EmotionStats, MoodRecord,
    RiskLevel, SubjectRef,
};

/// Formats `part / total * 100` with one decimal digit, e.g. `"23.5"`.
/// Halves round up, so 1 of 80 is `"1.3"`.
pub fn percent_string(part: u32, total: u32) -> String {
    if total == 0 {
        return "0.0".to_string();
    }
    let (part, total) = (u64::from(part), u64::from(total));
    let tenths = (part * 2000 + total) / (2 * total);
    format!("{}.{}", tenths / 10, tenths % 10)
}

/// The numeric value of [`percent_string`], so comparisons see the rounded figure.
pub fn rounded_percent(part: u32, total: u32) -> f64 {
    percent_string(part, total).parse().unwrap_or(0.0)
}

pub fn prepare_emotion_stats(records: &[MoodRecord]) -> EmotionStats {
    let counts: EmotionCounts = records.iter().map(|r| r.emotion).collect();
    let total = records.len() as u32;

    let percentages: BTreeMap<Emotion, String> = Emotion::ALL
        .into_iter()
        .filter(|e| counts.get(*e) > 0)
        .map(|e| (e, percent_string(counts.get(e), total)))
        .collect();

    // First emotion in priority order reaching the maximum wins.
    let most_common = Emotion::ALL
        .into_iter()
        .filter(|e| counts.get(*e) > 0)
        .fold(None, |best: Option<Emotion>, e| match best {
            Some(b) if counts.get(b) >= counts.get(e) => Some(b),
            _ => Some(e),
        });

    EmotionStats {
        total,
        counts,
        percentages,
        most_common,
        negative_count: counts.negative(),
        positive_count: counts.happy,
        neutral_count: counts.neutral,
    }
}

/// One entry per calendar date (UTC) present in `records`, ascending by date.
pub fn prepare_daily_breakdown(records: &[MoodRecord]) -> Vec<DailyBreakdown> {
    let mut days: BTreeMap<_, EmotionCounts> = BTreeMap::new();
    for record in records {
        days.entry(record.occurred_on.date_naive())
            .or_default()
            .increment(record.emotion);
    }

    days.into_iter()
        .map(|(date, counts)| DailyBreakdown {
            date,
            counts,
            total: counts.total(),
        })
        .collect()
}

/// Length of the longest run of consecutive negative emotions.
pub fn longest_negative_run<I>(emotions: I) -> u32
where
    I: IntoIterator<Item = Emotion>,
{
    let mut current = 0;
    let mut longest = 0;
    for emotion in emotions {
        if emotion.is_negative() {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

/// Risk of a class member, or `None` when the student is not concerning.
pub fn class_member_risk(negative_count: u32, consecutive_negative: u32) -> Option<RiskLevel> {
    if negative_count < 3 && consecutive_negative < 2 {
        return None;
    }
    if consecutive_negative >= 3 || negative_count >= 5 {
        Some(RiskLevel::High)
    } else {
        Some(RiskLevel::Medium)
    }
}

/// Risk of a single student looked at on their own.
pub fn student_risk(negative_count: u32, consecutive_negative: u32) -> RiskLevel {
    if consecutive_negative >= 3 || negative_count >= 7 {
        RiskLevel::High
    } else if consecutive_negative >= 2 || negative_count >= 4 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Students crossing the attention thresholds, most negative first.
///
/// `records` must be in chronological order. Students keep the order in which
/// they first appear, and the sort is stable, so ties stay in that order.
pub fn identify_concerning_students(records: &[MoodRecord]) -> Vec<ConcerningStudent> {
    let mut order: Vec<(SubjectRef, Vec<Emotion>)> = Vec::new();
    let mut index: HashMap<uuid::Uuid, usize> = HashMap::new();

    for record in records {
        let slot = *index.entry(record.subject.id).or_insert_with(|| {
            order.push((record.subject.clone(), Vec::new()));
            order.len() - 1
        });
        order[slot].1.push(record.emotion);
    }

    let mut concerning: Vec<ConcerningStudent> = order
        .into_iter()
        .filter_map(|(student, emotions)| {
            let negative_count = emotions.iter().filter(|e| e.is_negative()).count() as u32;
            let consecutive_negative = longest_negative_run(emotions.iter().copied());
            let risk_level = class_member_risk(negative_count, consecutive_negative)?;
            Some(ConcerningStudent {
                student,
                negative_count,
                consecutive_negative,
                total_records: emotions.len() as u32,
                risk_level,
            })
        })
        .collect();

    concerning.sort_by(|a, b| b.negative_count.cmp(&a.negative_count));
    concerning
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use uuid::Uuid;

    pub(crate) fn student(name: &str) -> SubjectRef {
        SubjectRef {
            id: Uuid::new_v4(),
            name: name.to_string(),
            student_code: Some(format!("S-{}", name)),
        }
    }

    pub(crate) fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 8, 0, 0).unwrap()
    }

    /// One record per day for `who`, starting at `base_time()`.
    pub(crate) fn daily_records(who: &SubjectRef, emotions: &[Emotion]) -> Vec<MoodRecord> {
        emotions
            .iter()
            .enumerate()
            .map(|(day, emotion)| MoodRecord {
                id: Uuid::new_v4(),
                subject: who.clone(),
                group_id: Uuid::nil(),
                emotion: *emotion,
                occurred_on: base_time() + Duration::days(day as i64),
                note: None,
            })
            .collect()
    }

    use Emotion::*;

    #[test]
    fn percent_halves_round_up() {
        assert_eq!(percent_string(1, 80), "1.3");
        assert_eq!(percent_string(1, 8), "12.5");
        assert_eq!(percent_string(3, 7), "42.9");
        assert_eq!(percent_string(1, 3), "33.3");
        assert_eq!(percent_string(5, 5), "100.0");
        assert_eq!(percent_string(0, 0), "0.0");
        assert_eq!(rounded_percent(1, 80), 1.3);
    }

    #[test]
    fn longest_run_spans_mixed_negative_emotions() {
        let run = longest_negative_run([Happy, Sad, Sad, Tired, Happy, Sad, Angry, Sad]);
        assert_eq!(run, 3);
        let negatives = [Happy, Sad, Sad, Tired, Happy, Sad, Angry, Sad]
            .iter()
            .filter(|e| e.is_negative())
            .count();
        assert_eq!(negatives, 6);
    }

    #[test]
    fn five_day_window_risk_follows_run_length() {
        let alice = student("alice");
        let records = daily_records(&alice, &[Happy, Sad, Sad, Tired, Happy]);

        let concerning = identify_concerning_students(&records);
        assert_eq!(concerning.len(), 1);
        let entry = &concerning[0];
        assert_eq!(entry.negative_count, 3);
        assert_eq!(entry.consecutive_negative, 3);
        assert_eq!(entry.total_records, 5);
        assert_eq!(entry.risk_level, RiskLevel::High);

        let records = daily_records(&alice, &[Happy, Sad, Sad, Happy, Tired]);
        let entry = &identify_concerning_students(&records)[0];
        assert_eq!(entry.negative_count, 3);
        assert_eq!(entry.consecutive_negative, 2);
        assert_eq!(entry.risk_level, RiskLevel::Medium);
    }

    #[test]
    fn ties_keep_first_appearance_order() {
        let a = student("a");
        let b = student("b");
        let c = student("c");
        let mut records = Vec::new();
        records.extend(daily_records(&a, &[Sad, Happy, Sad, Happy, Sad, Happy, Sad, Happy, Sad]));
        records.extend(daily_records(&b, &[Tired, Happy, Angry, Happy, Tired, Happy, Sad, Happy, Sad]));
        records.extend(daily_records(&c, &[Sad, Happy, Sad, Happy, Sad]));
        records.sort_by_key(|r| r.occurred_on);

        let concerning = identify_concerning_students(&records);
        let names: Vec<&str> = concerning.iter().map(|s| s.student.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(concerning[0].negative_count, 5);
        assert_eq!(concerning[1].negative_count, 5);
        assert_eq!(concerning[2].negative_count, 3);
    }

    #[test]
    fn students_below_thresholds_are_not_flagged() {
        let calm = student("calm");
        let records = daily_records(&calm, &[Happy, Sad, Happy, Tired, Neutral]);
        assert!(identify_concerning_students(&records).is_empty());
    }

    #[test]
    fn percentages_cover_only_present_emotions_and_sum_near_100() {
        let s = student("s");
        let records = daily_records(&s, &[Happy, Happy, Sad, Tired, Neutral, Happy, Angry]);
        let stats = prepare_emotion_stats(&records);

        assert_eq!(stats.total, 7);
        assert_eq!(stats.percentages.len(), 5);
        assert_eq!(stats.percentages[&Happy], "42.9");
        let sum: f64 = stats.percentages.values().map(|p| p.parse::<f64>().unwrap()).sum();
        assert!((sum - 100.0).abs() <= 0.5);

        let records = daily_records(&s, &[Happy, Happy, Sad]);
        let stats = prepare_emotion_stats(&records);
        assert!(!stats.percentages.contains_key(&Tired));
        assert_eq!(stats.percentage(Tired), 0.0);
        assert_eq!(stats.counts.tired, 0);
    }

    #[test]
    fn most_common_tie_goes_to_priority_order() {
        let s = student("s");
        let stats = prepare_emotion_stats(&daily_records(&s, &[Tired, Sad, Sad, Tired]));
        assert_eq!(stats.most_common, Some(Sad));

        let stats = prepare_emotion_stats(&daily_records(&s, &[Angry, Happy]));
        assert_eq!(stats.most_common, Some(Happy));
        assert_eq!(stats.negative_count, 1);
        assert_eq!(stats.positive_count, 1);
        assert_eq!(stats.neutral_count, 0);
    }

    #[test]
    fn daily_breakdown_buckets_duplicates_by_date() {
        let s = student("s");
        let mut records = daily_records(&s, &[Happy, Sad]);
        let mut duplicate = records[0].clone();
        duplicate.occurred_on += Duration::hours(3);
        duplicate.emotion = Tired;
        records.insert(1, duplicate);

        let days = prepare_daily_breakdown(&records);
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date, base_time().date_naive());
        assert_eq!(days[0].total, 2);
        assert_eq!(days[0].counts.happy, 1);
        assert_eq!(days[0].counts.tired, 1);
        assert_eq!(days[1].counts.sad, 1);
        assert!(days[0].date < days[1].date);
    }

    #[test]
    fn risk_levels_never_decrease_with_more_negatives() {
        for consecutive in 0..6 {
            for negative in consecutive..10 {
                assert!(student_risk(negative + 1, consecutive) >= student_risk(negative, consecutive));
                assert!(student_risk(negative, consecutive + 1) >= student_risk(negative, consecutive));

                let rank = |r: Option<RiskLevel>| r.map(|l| l as u8 + 1).unwrap_or(0);
                assert!(
                    rank(class_member_risk(negative + 1, consecutive))
                        >= rank(class_member_risk(negative, consecutive))
                );
                assert!(
                    rank(class_member_risk(negative, consecutive + 1))
                        >= rank(class_member_risk(negative, consecutive))
                );
            }
        }
    }

    #[test]
    fn student_risk_thresholds() {
        assert_eq!(student_risk(3, 3), RiskLevel::High);
        assert_eq!(student_risk(7, 1), RiskLevel::High);
        assert_eq!(student_risk(2, 2), RiskLevel::Medium);
        assert_eq!(student_risk(4, 1), RiskLevel::Medium);
        assert_eq!(student_risk(3, 1), RiskLevel::Low);
    }
}
