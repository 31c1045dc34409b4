use std::collections::{HashMap, HashSet};

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use uuid::Uuid;

/// One learning-log record reduced to the fields the aggregator needs.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub id: Uuid,
    pub content: String,
    pub log_date: NaiveDate,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentLog {
    pub id: Uuid,
    pub content: String,
    pub log_date: NaiveDate,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateReport {
    pub total_logs: usize,
    pub total_days: usize,
    pub average_per_day: f64,
    pub recent_logs: Vec<RecentLog>,
    pub top_tags: Vec<TagCount>,
}

/// Computes descriptive statistics over a set of learning logs.
///
/// Entries are expected pre-sorted by `log_date` descending, which is how
/// every caller fetches them; same-date entries keep their input order.
pub fn compute_stats(entries: &[LogEntry], now: NaiveDate) -> AggregateReport {
    let total_logs = entries.len();

    let distinct_days: HashSet<NaiveDate> = entries.iter().map(|e| e.log_date).collect();
    let total_days = distinct_days.len();

    let average_per_day = if total_days > 0 {
        (total_logs as f64 / total_days as f64 * 100.0).round() / 100.0
    } else {
        0.0
    };

    let cutoff = now - Duration::days(30);
    let recent_logs = entries
        .iter()
        .filter(|e| e.log_date >= cutoff)
        .take(10)
        .map(|e| RecentLog {
            id: e.id,
            content: e.content.clone(),
            log_date: e.log_date,
            tags: e.tags.clone(),
        })
        .collect();

    let top_tags = count_tags(entries.iter().map(|e| e.tags.as_slice()), 10);

    AggregateReport {
        total_logs,
        total_days,
        average_per_day,
        recent_logs,
        top_tags,
    }
}

/// Tag frequency over any collection of tag lists. Exact-match and
/// case-sensitive; every occurrence counts, duplicates within one record
/// included. Ties are broken by first-seen order.
pub fn count_tags<'a, I>(tag_lists: I, limit: usize) -> Vec<TagCount>
where
    I: IntoIterator<Item = &'a [String]>,
{
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();

    for tags in tag_lists {
        for tag in tags {
            let first_seen = counts.len();
            let entry = counts.entry(tag.as_str()).or_insert((0, first_seen));
            entry.0 += 1;
        }
    }

    let mut ranked: Vec<(&str, usize, usize)> = counts
        .into_iter()
        .map(|(tag, (count, first_seen))| (tag, count, first_seen))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

    ranked
        .into_iter()
        .take(limit)
        .map(|(tag, count, _)| TagCount {
            tag: tag.to_string(),
            count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(date: &str, tags: &[&str]) -> LogEntry {
        LogEntry {
            id: Uuid::new_v4(),
            content: "notes".to_string(),
            log_date: date.parse().unwrap(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn day(date: &str) -> NaiveDate {
        date.parse().unwrap()
    }

    #[test]
    fn documented_example() {
        let entries = vec![
            entry("2024-01-01", &["x", "y"]),
            entry("2024-01-01", &["x"]),
            entry("2024-01-02", &[]),
        ];

        let report = compute_stats(&entries, day("2024-01-15"));
        assert_eq!(report.total_logs, 3);
        assert_eq!(report.total_days, 2);
        assert!((report.average_per_day - 1.5).abs() < f64::EPSILON);
        assert_eq!(
            report.top_tags,
            vec![
                TagCount { tag: "x".to_string(), count: 2 },
                TagCount { tag: "y".to_string(), count: 1 },
            ]
        );
    }

    #[test]
    fn empty_input_yields_zeroes() {
        let report = compute_stats(&[], day("2024-06-01"));
        assert_eq!(report.total_logs, 0);
        assert_eq!(report.total_days, 0);
        assert_eq!(report.average_per_day, 0.0);
        assert!(report.recent_logs.is_empty());
        assert!(report.top_tags.is_empty());
    }

    #[test]
    fn distinct_days_never_exceed_totals() {
        let entries = vec![
            entry("2024-03-01", &["a"]),
            entry("2024-03-01", &["b"]),
            entry("2024-03-02", &[]),
            entry("2024-03-03", &[]),
        ];
        let report = compute_stats(&entries, day("2024-03-10"));
        assert!(report.total_days <= report.total_logs);
        assert!(report.average_per_day > 0.0);
    }

    #[test]
    fn recent_window_filters_and_caps() {
        let mut entries = Vec::new();
        for d in 1..=15 {
            entries.push(entry(&format!("2024-05-{d:02}"), &[]));
        }
        entries.push(entry("2023-01-01", &["stale"]));
        entries.sort_by(|a, b| b.log_date.cmp(&a.log_date));

        let now = day("2024-05-20");
        let report = compute_stats(&entries, now);
        assert_eq!(report.recent_logs.len(), 10);
        let cutoff = now - Duration::days(30);
        assert!(report.recent_logs.iter().all(|l| l.log_date >= cutoff));
    }

    #[test]
    fn tag_counts_sum_to_occurrences() {
        let entries = vec![
            entry("2024-01-01", &["rust", "rust", "sql"]),
            entry("2024-01-02", &["rust", "docker"]),
        ];
        let all = count_tags(entries.iter().map(|e| e.tags.as_slice()), usize::MAX);
        let total: usize = all.iter().map(|t| t.count).sum();
        assert_eq!(total, 5);

        let report = compute_stats(&entries, day("2024-01-10"));
        assert!(report
            .top_tags
            .windows(2)
            .all(|pair| pair[0].count >= pair[1].count));
        assert_eq!(report.top_tags[0].tag, "rust");
        assert_eq!(report.top_tags[0].count, 3);
    }

    #[test]
    fn ties_break_by_first_seen_order() {
        let entries = vec![entry("2024-01-01", &["beta", "alpha"])];
        let tags = count_tags(entries.iter().map(|e| e.tags.as_slice()), 10);
        assert_eq!(tags[0].tag, "beta");
        assert_eq!(tags[1].tag, "alpha");
    }

    #[test]
    fn same_input_same_output() {
        let entries = vec![
            entry("2024-02-01", &["x", "y"]),
            entry("2024-02-03", &["y"]),
        ];
        let now = day("2024-02-10");
        assert_eq!(compute_stats(&entries, now), compute_stats(&entries, now));
    }
}
