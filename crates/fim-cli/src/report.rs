//! Plain-text rendering for listings, check results and the report file.

use chrono::{DateTime, Local, Utc};
use fim_core::{CheckSummary, Record, Status, VerificationResult};
use std::fmt::Write;

fn marker(status: Status) -> &'static str {
    match status {
        Status::Intact => "[ OK ]",
        Status::Modified => "[MOD ]",
        Status::Missing => "[MISS]",
        Status::Error => "[ERR ]",
        Status::Unknown => "[ ?? ]",
    }
}

fn local(ts: &DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

/// One line per check result.
pub fn render_result(result: &VerificationResult) -> String {
    format!("{} {}: {}", marker(result.status), result.path, result.message)
}

pub fn render_listing(records: &[(String, Record)]) -> String {
    if records.is_empty() {
        return "No monitored files.\n".to_string();
    }
    let mut out = String::new();
    let _ = writeln!(out, "Monitored files ({}):", records.len());
    let _ = writeln!(out, "{}", "-".repeat(80));
    for (path, record) in records {
        let _ = writeln!(out, "{} {path}", marker(record.status));
        let _ = writeln!(out, "   Algorithm:  {}", record.algorithm.as_str().to_uppercase());
        let _ = writeln!(out, "   Size:       {} bytes", record.size);
        let _ = writeln!(out, "   Added:      {}", local(&record.created_at));
        let _ = writeln!(out, "   Last check: {}", local(&record.last_checked_at));
        out.push('\n');
    }
    out
}

/// Full report written by `fim report`.
pub fn render_report(summary: &CheckSummary, generated_at: DateTime<Local>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "FILE INTEGRITY REPORT");
    let _ = writeln!(out, "{}", "=".repeat(50));
    let _ = writeln!(out, "Date: {}", generated_at.format("%Y-%m-%d %H:%M:%S"));
    out.push('\n');
    let _ = writeln!(out, "SUMMARY:");
    let _ = writeln!(out, "--------");
    let _ = writeln!(out, "* Intact files:   {}", summary.intact.len());
    let _ = writeln!(out, "* Modified files: {}", summary.modified.len());
    let _ = writeln!(out, "* Missing files:  {}", summary.missing.len());
    let _ = writeln!(out, "* Errors:         {}", summary.errors.len());
    if summary.cancelled {
        let _ = writeln!(out, "* Run interrupted before every file was checked");
    }
    out.push('\n');

    if !summary.modified.is_empty() {
        let _ = writeln!(out, "MODIFIED FILES:");
        let _ = writeln!(out, "{}", "-".repeat(30));
        for result in &summary.modified {
            let record = result.record.as_ref();
            let previous = record.and_then(|r| r.previous_fingerprint.as_deref()).unwrap_or("N/A");
            let current = record.and_then(|r| r.current_fingerprint.as_deref()).unwrap_or("N/A");
            let last_check = record.map(|r| local(&r.last_checked_at)).unwrap_or_else(|| "N/A".into());
            let _ = writeln!(out, "File: {}", result.path);
            let _ = writeln!(out, "  Previous fingerprint: {previous}");
            let _ = writeln!(out, "  Current fingerprint:  {current}");
            let _ = writeln!(out, "  Last check:           {last_check}");
            out.push('\n');
        }
    }

    if !summary.missing.is_empty() {
        let _ = writeln!(out, "MISSING FILES:");
        let _ = writeln!(out, "{}", "-".repeat(30));
        for result in &summary.missing {
            let _ = writeln!(out, "* {}", result.path);
        }
        out.push('\n');
    }

    if !summary.errors.is_empty() {
        let _ = writeln!(out, "ERRORS:");
        let _ = writeln!(out, "{}", "-".repeat(30));
        for result in &summary.errors {
            let cause = result.error.as_deref().unwrap_or(&result.message);
            let _ = writeln!(out, "* {}: {cause}", result.path);
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use fim_core::Algorithm;

    fn result(path: &str, status: Status) -> VerificationResult {
        let now = Utc::now();
        let modified = status == Status::Modified;
        VerificationResult {
            path: path.to_string(),
            status,
            message: status.to_string(),
            record: Some(Record {
                path: path.to_string(),
                fingerprint: "aa".into(),
                algorithm: Algorithm::Sha256,
                size: 1,
                modified_time: 0.0,
                created_at: now,
                last_checked_at: now,
                status,
                previous_fingerprint: modified.then(|| "aa".to_string()),
                current_fingerprint: modified.then(|| "bb".to_string()),
            }),
            observed_size: None,
            error: (status == Status::Error).then(|| "permission denied".to_string()),
        }
    }

    #[test]
    fn report_lists_every_group() {
        let summary = CheckSummary {
            intact: vec![result("/ok", Status::Intact)],
            modified: vec![result("/changed", Status::Modified)],
            missing: vec![result("/gone", Status::Missing)],
            errors: vec![result("/locked", Status::Error)],
            cancelled: false,
        };
        let at = Local.with_ymd_and_hms(2025, 5, 1, 10, 20, 30).unwrap();
        let report = render_report(&summary, at);

        assert!(report.contains("Date: 2025-05-01 10:20:30"));
        assert!(report.contains("* Intact files:   1"));
        assert!(report.contains("File: /changed"));
        assert!(report.contains("Previous fingerprint: aa"));
        assert!(report.contains("Current fingerprint:  bb"));
        assert!(report.contains("* /gone"));
        assert!(report.contains("* /locked: permission denied"));
        assert!(!report.contains("interrupted"));
    }

    #[test]
    fn clean_report_has_no_detail_sections() {
        let summary = CheckSummary {
            intact: vec![result("/ok", Status::Intact)],
            ..CheckSummary::default()
        };
        let report = render_report(&summary, Local::now());
        assert!(!report.contains("MODIFIED FILES"));
        assert!(!report.contains("MISSING FILES"));
        assert!(!report.contains("ERRORS:"));
    }

    #[test]
    fn empty_listing() {
        assert_eq!(render_listing(&[]), "No monitored files.\n");
    }

    #[test]
    fn listing_shows_algorithm_and_size() {
        let r = result("/etc/hosts", Status::Intact).record.unwrap();
        let listing = render_listing(&[(r.path.clone(), r)]);
        assert!(listing.starts_with("Monitored files (1):"));
        assert!(listing.contains("[ OK ] /etc/hosts"));
        assert!(listing.contains("SHA256"));
        assert!(listing.contains("1 bytes"));
    }
}
