use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::models::Activity;

const NO_DETAILS: &str = "No specific details logged.";
const RULE_WIDTH: usize = 72;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("No activities to report for {0}")]
    NoActivities(String),
    #[error("Failed to write report to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Staff activity report for one payroll period
#[derive(Debug, Clone)]
pub struct PeriodReport {
    pub company: String,
    pub period_label: String,
    pub generated_at: NaiveDateTime,
    pub summary: String,
    pub activities: Vec<Activity>,
    /// Final on submission days, draft otherwise
    pub is_final: bool,
}

impl PeriodReport {
    pub fn compile(
        company: &str,
        period_label: &str,
        activities: Vec<Activity>,
        summary: String,
        generated_at: NaiveDateTime,
        is_final: bool,
    ) -> Result<Self, ReportError> {
        if activities.is_empty() {
            return Err(ReportError::NoActivities(period_label.to_string()));
        }
        Ok(Self {
            company: company.to_string(),
            period_label: period_label.to_string(),
            generated_at,
            summary,
            activities,
            is_final,
        })
    }

    pub fn total_hours(&self) -> f64 {
        self.activities.iter().map(|a| a.duration_hours).sum()
    }

    pub fn file_name(&self) -> String {
        report_file_name(&self.period_label)
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let rule = "=".repeat(RULE_WIDTH);
        let thin_rule = "-".repeat(RULE_WIDTH);

        out.push_str(&format!("# {}\n", self.company.to_uppercase()));
        out.push_str("STAFF PERFORMANCE & ACTIVITY REPORT");
        out.push_str(if self.is_final { " (FINAL)\n" } else { " (DRAFT)\n" });
        out.push_str(&rule);
        out.push_str("\n\n");

        out.push_str(&format!("{:<22}{}\n", "REPORTING PERIOD:", self.period_label));
        out.push_str(&format!("{:<22}{:.1} Hours\n", "TOTAL HOURS LOGGED:", self.total_hours()));
        out.push_str(&format!(
            "{:<22}{}\n\n",
            "GENERATED ON:",
            self.generated_at.format("%Y-%m-%d %H:%M:%S")
        ));

        out.push_str("## AI EXECUTIVE SUMMARY\n\n");
        for line in wrap(&self.summary, RULE_WIDTH - 2) {
            out.push_str(&format!("> {}\n", line));
        }
        out.push('\n');

        out.push_str("## DETAILED ACTIVITY LOG\n");
        out.push_str(&thin_rule);
        out.push('\n');

        for (i, activity) in self.activities.iter().enumerate() {
            let heading = format!("{}. {}", i + 1, activity.task.to_uppercase());
            let meta = format!("{} | {}h", activity.date.format("%Y-%m-%d"), activity.duration_hours);
            let pad = RULE_WIDTH.saturating_sub(heading.chars().count() + meta.chars().count()).max(1);
            out.push_str(&format!("{}{}{}\n", heading, " ".repeat(pad), meta));
            out.push_str(&format!("   Category: {}\n", activity.category));

            let filled = activity.narrative.filled();
            if filled.is_empty() {
                out.push_str(&format!("   {}\n", NO_DETAILS));
            }
            for (field, text) in filled {
                out.push_str(&format!("   {}:\n", field.label()));
                for line in wrap(text, RULE_WIDTH - 5) {
                    out.push_str(&format!("     {}\n", line));
                }
            }
            out.push_str(&thin_rule);
            out.push('\n');
        }

        out.push_str(&format!("\n{} Internal Personnel Document\n", self.company));
        out
    }
}

/// `WK_Report_<label>.md` with whitespace runs collapsed to `_`
pub fn report_file_name(label: &str) -> String {
    let slug: Vec<&str> = label.split_whitespace().collect();
    format!("WK_Report_{}.md", slug.join("_"))
}

pub fn write_report(dir: &Path, report: &PeriodReport) -> Result<PathBuf, ReportError> {
    let path = dir.join(report.file_name());
    let write_err = |source| ReportError::Write {
        path: path.clone(),
        source,
    };
    fs::create_dir_all(dir).map_err(write_err)?;
    fs::write(&path, report.render()).map_err(write_err)?;
    tracing::info!(path = %path.display(), "report written");
    Ok(path)
}

/// First-fit word wrap, one paragraph per input line
fn wrap(text: &str, width: usize) -> Vec<String> {
    let options = textwrap::Options::new(width).wrap_algorithm(textwrap::WrapAlgorithm::FirstFit);
    textwrap::wrap(text, options).into_iter().map(|line| line.into_owned()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActivityCategory, NewActivity};
    use chrono::NaiveDate;

    fn activities() -> Vec<Activity> {
        let date = NaiveDate::from_ymd_opt(2024, 2, 5).unwrap();
        let mut with_notes = NewActivity::new("Master key setup", date, 2.5)
            .with_category(ActivityCategory::Locksmith);
        with_notes.narrative.accomplishments = Some("Cut and tested 40 keys".to_string());
        vec![
            Activity::from_new(with_notes),
            Activity::from_new(NewActivity::new("Van wash", date, 1.0)),
        ]
    }

    fn generated() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 2, 14).unwrap().and_hms_opt(16, 30, 0).unwrap()
    }

    #[test]
    fn file_name_replaces_whitespace() {
        assert_eq!(report_file_name("First Half of February"), "WK_Report_First_Half_of_February.md");
        assert_eq!(report_file_name("Second  Half\tof May"), "WK_Report_Second_Half_of_May.md");
    }

    #[test]
    fn empty_reports_are_refused() {
        let err = PeriodReport::compile("Co", "First Half of May", vec![], String::new(), generated(), false);
        assert!(matches!(err, Err(ReportError::NoActivities(_))));
    }

    #[test]
    fn render_contains_all_sections() {
        let report = PeriodReport::compile(
            "Wheels & Keys Inc.",
            "First Half of February",
            activities(),
            "Strong fortnight.".to_string(),
            generated(),
            true,
        )
        .unwrap();
        let text = report.render();

        assert!(text.contains("WHEELS & KEYS INC."));
        assert!(text.contains("(FINAL)"));
        assert!(text.contains("First Half of February"));
        assert!(text.contains("3.5 Hours"));
        assert!(text.contains("2024-02-14 16:30:00"));
        assert!(text.contains("> Strong fortnight."));
        assert!(text.contains("1. MASTER KEY SETUP"));
        assert!(text.contains("2024-02-05 | 2.5h"));
        assert!(text.contains("Cut and tested 40 keys"));
        assert!(text.contains(NO_DETAILS));
        assert!(text.contains("Internal Personnel Document"));
    }

    #[test]
    fn write_report_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("reports");
        let report = PeriodReport::compile("Co", "Second Half of March", activities(), "ok".into(), generated(), false)
            .unwrap();
        let path = write_report(&out, &report).unwrap();
        assert_eq!(path, out.join("WK_Report_Second_Half_of_March.md"));
        assert!(fs::read_to_string(path).unwrap().contains("(DRAFT)"));
    }

    #[test]
    fn wrap_respects_width() {
        let lines = wrap("one two three four five six", 9);
        assert_eq!(lines, vec!["one two", "three", "four five", "six"]);
    }

    #[test]
    fn wrap_keeps_paragraph_breaks() {
        let lines = wrap("Rekeyed the office\nSwapped van tyres", 40);
        assert_eq!(lines, vec!["Rekeyed the office", "Swapped van tyres"]);
    }
}
