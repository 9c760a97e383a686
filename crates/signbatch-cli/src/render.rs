//! Plain-text rendering of dispatcher events.

use std::path::Path;

use signbatch_core::batch::{BatchSummary, SigningOutcome};

/// File name for display; falls back to the full path for odd inputs.
fn display_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

/// One line (or block, on failure) per completed target.
pub fn outcome_line(outcome: &SigningOutcome) -> String {
    let name = display_name(&outcome.target);
    if outcome.success {
        format!("\u{2713} Successfully signed: {name}")
    } else {
        let mut text = format!("\u{2717} Failed to sign: {name}");
        if !outcome.output.is_empty() {
            for line in outcome.output.lines() {
                text.push_str("\n  ");
                text.push_str(line);
            }
        }
        text
    }
}

/// Final status line for the batch.
pub fn summary_line(summary: &BatchSummary) -> String {
    let mut text = format!(
        "Complete: {} succeeded, {} failed",
        summary.succeeded, summary.failed
    );
    if summary.skipped > 0 {
        text.push_str(&format!(", {} skipped", summary.skipped));
    }
    text
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use uuid::Uuid;

    #[test]
    fn success_line_uses_the_file_name() {
        let outcome =
            SigningOutcome::succeeded(PathBuf::from("C:/out/app.exe"), "Done".to_string());
        assert_eq!(outcome_line(&outcome), "\u{2713} Successfully signed: app.exe");
    }

    #[test]
    fn failure_block_indents_tool_output() {
        let outcome = SigningOutcome::failed(
            PathBuf::from("out/app.exe"),
            Some(1),
            "SignTool Error: bad password".to_string(),
        );
        let text = outcome_line(&outcome);
        assert!(text.starts_with("\u{2717} Failed to sign: app.exe"));
        assert!(text.contains("\n  SignTool Error: bad password"));
    }

    #[test]
    fn summary_line_mentions_skips_only_when_present() {
        let mut summary = BatchSummary::new(Uuid::new_v4(), 3);
        summary.succeeded = 2;
        summary.failed = 1;
        assert_eq!(summary_line(&summary), "Complete: 2 succeeded, 1 failed");
        summary.skipped = 1;
        assert_eq!(summary_line(&summary), "Complete: 2 succeeded, 1 failed, 1 skipped");
    }
}
