use std::collections::HashSet;
use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::models::{Team, TeamLogWithAuthor};
use crate::stats;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPortfolio {
    pub summary: String,
    pub markdown: String,
}

/// Up to five unique "what we learned" items folded into one closing
/// sentence. Deduplication is by trimmed string equality, insertion order
/// preserved.
pub fn build_summary(team: &Team, logs: &[TeamLogWithAuthor]) -> String {
    let mut seen = HashSet::new();
    let mut learned = Vec::new();

    for log in logs {
        for item in &log.log.what_learned {
            let trimmed = item.trim();
            if trimmed.is_empty() {
                continue;
            }
            if seen.insert(trimmed.to_string()) {
                learned.push(trimmed.to_string());
            }
            if learned.len() == 5 {
                break;
            }
        }
        if learned.len() == 5 {
            break;
        }
    }

    if learned.is_empty() {
        return format!("{} recorded its learning journey.", team.name);
    }

    format!(
        "Our team studied {}. Along the way we gained hands-on project \
         experience and laid the groundwork for more solid work ahead.",
        learned.join(", ")
    )
}

fn top_tag_names(logs: &[TeamLogWithAuthor], limit: usize) -> Vec<String> {
    stats::count_tags(logs.iter().map(|l| l.log.tags.as_slice()), limit)
        .into_iter()
        .map(|t| t.tag)
        .collect()
}

/// Renders a team's logs into a markdown portfolio plus its summary
/// paragraph. Pure transform; the caller persists the result.
pub fn render_portfolio(
    team: &Team,
    logs: &[TeamLogWithAuthor],
    member_count: usize,
    now: DateTime<Utc>,
) -> RenderedPortfolio {
    let tags = top_tag_names(logs, 5);
    let start = logs.iter().map(|l| l.log.created_at).min().unwrap_or(now);
    let end = logs.iter().map(|l| l.log.created_at).max().unwrap_or(now);

    let mut output = String::new();
    let _ = writeln!(output, "# {} Portfolio", team.name);
    let _ = writeln!(output);
    let _ = writeln!(output, "## About the Team");
    let _ = writeln!(output);

    if let Some(description) = team.description.as_deref() {
        if !description.is_empty() {
            let _ = writeln!(output, "{description}");
            let _ = writeln!(output);
        }
    }

    let _ = writeln!(output, "- Members: {member_count}");
    let _ = writeln!(
        output,
        "- Active period: {} ~ {}",
        start.format("%Y-%m-%d"),
        end.format("%Y-%m-%d")
    );
    let _ = writeln!(output, "- Learning logs: {}", logs.len());
    let _ = writeln!(output);

    if !tags.is_empty() {
        let _ = writeln!(output, "## Highlights");
        let _ = writeln!(output);
        let hashtags: Vec<String> = tags.iter().map(|t| format!("#{t}")).collect();
        let _ = writeln!(output, "{}", hashtags.join(" "));
        let _ = writeln!(output);
    }

    if !logs.is_empty() {
        let _ = writeln!(output, "## Learning Logs");
        let _ = writeln!(output);

        for (index, log) in logs.iter().enumerate() {
            let author = log
                .author
                .as_ref()
                .map(|u| u.name.as_str())
                .unwrap_or("unknown");

            let _ = writeln!(output, "### {}. {}", index + 1, log.log.title);
            let _ = writeln!(output);
            let _ = writeln!(
                output,
                "**Author**: {author} | **Date**: {}",
                log.log.created_at.format("%Y-%m-%d")
            );
            let _ = writeln!(output);

            if let Some(description) = log.log.description.as_deref() {
                if !description.is_empty() {
                    let _ = writeln!(output, "{description}");
                    let _ = writeln!(output);
                }
            }

            write_bullets(&mut output, "What we learned:", &log.log.what_learned);
            write_bullets(&mut output, "Improvements:", &log.log.improvements);
            write_bullets(&mut output, "Next steps:", &log.log.next_steps);

            let _ = writeln!(output, "***");
            let _ = writeln!(output);
        }
    }

    if !tags.is_empty() {
        let _ = writeln!(output, "## Technology Stack");
        let _ = writeln!(output);
        for tag in &tags {
            let _ = writeln!(output, "- {tag}");
        }
        let _ = writeln!(output);
    }

    let summary = build_summary(team, logs);
    let _ = writeln!(output, "## Final Remarks");
    let _ = writeln!(output);
    let _ = writeln!(output, "{summary}");

    RenderedPortfolio {
        summary,
        markdown: output,
    }
}

fn write_bullets(output: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(output, "**{heading}**");
    for item in items {
        let _ = writeln!(output, "- {item}");
    }
    let _ = writeln!(output);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TeamLog, UserPublic};
    use chrono::TimeZone;
    use uuid::Uuid;

    fn sample_team() -> Team {
        Team {
            id: Uuid::new_v4(),
            name: "Rustaceans".to_string(),
            description: Some("We build things in Rust.".to_string()),
            created_by: Uuid::new_v4(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
        }
    }

    fn sample_log(title: &str, learned: &[&str], tags: &[&str], day: u32) -> TeamLogWithAuthor {
        let created = Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap();
        TeamLogWithAuthor {
            log: TeamLog {
                id: Uuid::new_v4(),
                team_id: Uuid::new_v4(),
                created_by: Uuid::new_v4(),
                title: title.to_string(),
                description: None,
                what_learned: learned.iter().map(|s| s.to_string()).collect(),
                improvements: vec![],
                next_steps: vec!["write tests".to_string()],
                tags: tags.iter().map(|s| s.to_string()).collect(),
                created_at: created,
                updated_at: created,
            },
            author: Some(UserPublic {
                id: Uuid::new_v4(),
                name: "Avery".to_string(),
                email: "avery@example.com".to_string(),
            }),
        }
    }

    #[test]
    fn renders_sections_in_order() {
        let team = sample_team();
        let logs = vec![
            sample_log("Ownership", &["borrow checker"], &["rust"], 1),
            sample_log("Async", &["tokio tasks"], &["rust", "tokio"], 5),
        ];
        let now = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap();

        let rendered = render_portfolio(&team, &logs, 3, now);
        let md = &rendered.markdown;

        let title = md.find("# Rustaceans Portfolio").unwrap();
        let about = md.find("## About the Team").unwrap();
        let highlights = md.find("## Highlights").unwrap();
        let logs_section = md.find("## Learning Logs").unwrap();
        let stack = md.find("## Technology Stack").unwrap();
        let remarks = md.find("## Final Remarks").unwrap();
        assert!(title < about && about < highlights);
        assert!(highlights < logs_section && logs_section < stack);
        assert!(stack < remarks);

        assert!(md.contains("- Members: 3"));
        assert!(md.contains("- Learning logs: 2"));
        assert!(md.contains("- Active period: 2024-03-01 ~ 2024-03-05"));
        assert!(md.contains("### 1. Ownership"));
        assert!(md.contains("### 2. Async"));
        assert!(md.contains("**Author**: Avery"));
        assert!(md.contains("#rust #tokio"));
        assert!(!md.contains("**Improvements:**"));
    }

    #[test]
    fn zero_logs_collapse_range_and_omit_sections() {
        let team = sample_team();
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 10, 0, 0).unwrap();

        let rendered = render_portfolio(&team, &[], 1, now);
        let md = &rendered.markdown;

        assert!(md.contains("- Active period: 2024-06-15 ~ 2024-06-15"));
        assert!(!md.contains("## Highlights"));
        assert!(!md.contains("## Learning Logs"));
        assert!(!md.contains("## Technology Stack"));
        assert_eq!(rendered.summary, "Rustaceans recorded its learning journey.");
    }

    #[test]
    fn summary_dedupes_and_caps_at_five() {
        let team = sample_team();
        let logs = vec![
            sample_log("a", &["rust", " rust ", "sql"], &[], 1),
            sample_log("b", &["docker", "ci", "testing", "tracing"], &[], 2),
        ];

        let summary = build_summary(&team, &logs);
        assert!(summary.contains("rust, sql, docker, ci, testing"));
        assert!(!summary.contains("tracing"));
    }

    #[test]
    fn regeneration_is_deterministic() {
        let team = sample_team();
        let logs = vec![sample_log("Ownership", &["lifetimes"], &["rust"], 2)];
        let now = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap();

        let first = render_portfolio(&team, &logs, 2, now);
        let second = render_portfolio(&team, &logs, 2, now);
        assert_eq!(first.summary, second.summary);
        assert_eq!(first.markdown, second.markdown);
    }
}
