//! # Purge Reports
//!
//! The aggregate produced by one purge run and the combined status view.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backend::{BackendKind, BackendStatus, PurgeOutcome};

/// What asked for a purge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
    /// An operator pressed the button
    Manual,
    /// A periodic job
    Scheduled,
    /// Content was published, edited or deleted
    ContentChange,
    CommandLine,
}

impl TriggerSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerSource::Manual => "manual",
            TriggerSource::Scheduled => "scheduled",
            TriggerSource::ContentChange => "content_change",
            TriggerSource::CommandLine => "command_line",
        }
    }
}

impl fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one purge run across the selected backends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurgeReport {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub trigger: TriggerSource,
    /// Canonical order
    pub requested_kinds: Vec<BackendKind>,
    /// One per requested kind, canonical order
    pub outcomes: Vec<PurgeOutcome>,
    /// At least one backend was purged. Partial failure still counts; read
    /// `outcomes` for the full picture.
    pub overall_success: bool,
    pub summary_message: String,
}

impl PurgeReport {
    /// Assemble a report from finished outcomes. Outcomes are sorted into
    /// canonical order.
    pub fn new(
        id: Uuid,
        trigger: TriggerSource,
        requested_kinds: Vec<BackendKind>,
        mut outcomes: Vec<PurgeOutcome>,
    ) -> Self {
        outcomes.sort_by_key(|outcome| outcome.kind);
        let overall_success = outcomes.iter().any(|outcome| outcome.succeeded);
        let summary_message = summarize(&outcomes);

        Self {
            id,
            timestamp: Utc::now(),
            trigger,
            requested_kinds,
            outcomes,
            overall_success,
            summary_message,
        }
    }

    pub fn succeeded_kinds(&self) -> Vec<BackendKind> {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.succeeded)
            .map(|outcome| outcome.kind)
            .collect()
    }

    pub fn failed_outcomes(&self) -> impl Iterator<Item = &PurgeOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.succeeded)
    }

    pub fn outcome(&self, kind: BackendKind) -> Option<&PurgeOutcome> {
        self.outcomes.iter().find(|outcome| outcome.kind == kind)
    }

    /// Every requested backend was purged
    pub fn is_complete_success(&self) -> bool {
        self.outcomes.iter().all(|outcome| outcome.succeeded)
    }

    /// Time since the run finished; zero if the clock went backwards
    pub fn age(&self) -> chrono::Duration {
        (Utc::now() - self.timestamp).max(chrono::Duration::zero())
    }
}

/// Human readable digest of a run: a headline listing the purged backends,
/// then one line per outcome that says something beyond plain success.
pub fn summarize(outcomes: &[PurgeOutcome]) -> String {
    let purged: Vec<&str> = outcomes
        .iter()
        .filter(|outcome| outcome.succeeded)
        .map(|outcome| outcome.kind.label())
        .collect();

    let mut lines = Vec::with_capacity(outcomes.len() + 1);
    if purged.is_empty() {
        lines.push("No caches were purged".to_string());
    } else {
        lines.push(format!("Successfully purged: {}", purged.join(", ")));
    }

    for outcome in outcomes.iter().filter(|outcome| !outcome.is_bare_success()) {
        let mark = if outcome.succeeded { '✓' } else { '✗' };
        lines.push(format!("{mark} {}: {}", outcome.kind.label(), outcome.message));
    }

    lines.join("\n")
}

/// Everything a status page shows: the state of every registered backend and
/// the last purge, if any
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub statuses: BTreeMap<BackendKind, BackendStatus>,
    pub last_purge: Option<PurgeReport>,
}

impl StatusSnapshot {
    pub fn status(&self, kind: BackendKind) -> Option<&BackendStatus> {
        self.statuses.get(&kind)
    }

    pub fn active_kinds(&self) -> Vec<BackendKind> {
        self.statuses
            .values()
            .filter(|status| status.is_active())
            .map(|status| status.kind)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DEFAULT_SUCCESS_MESSAGE, FailureKind};

    fn report(outcomes: Vec<PurgeOutcome>) -> PurgeReport {
        let kinds = outcomes.iter().map(|o| o.kind).collect();
        PurgeReport::new(Uuid::new_v4(), TriggerSource::Manual, kinds, outcomes)
    }

    #[test]
    fn test_bare_successes_are_suppressed() {
        let report = report(vec![
            PurgeOutcome::success(BackendKind::EdgeCache, DEFAULT_SUCCESS_MESSAGE),
            PurgeOutcome::success(BackendKind::CdnCache, ""),
        ]);

        assert_eq!(report.summary_message, "Successfully purged: Edge cache, CDN cache");
        assert!(report.overall_success);
        assert!(report.is_complete_success());
    }

    #[test]
    fn test_mixed_results_keep_failures_and_details() {
        let report = report(vec![
            PurgeOutcome::failure(BackendKind::CdnCache, FailureKind::Logical, "CDN rejected purge: invalid zone"),
            PurgeOutcome::success(BackendKind::EdgeCache, "Removed 3 entries"),
        ]);

        assert_eq!(
            report.requested_kinds,
            vec![BackendKind::CdnCache, BackendKind::EdgeCache]
        );
        assert_eq!(report.outcomes[0].kind, BackendKind::EdgeCache);
        assert!(report.overall_success);
        assert!(!report.is_complete_success());
        assert_eq!(
            report.summary_message,
            "Successfully purged: Edge cache\n\
             ✓ Edge cache: Removed 3 entries\n\
             ✗ CDN cache: CDN rejected purge: invalid zone"
        );
        assert_eq!(report.succeeded_kinds(), vec![BackendKind::EdgeCache]);
        assert_eq!(report.failed_outcomes().count(), 1);
    }

    #[test]
    fn test_nothing_purged() {
        let report = report(vec![PurgeOutcome::failure(
            BackendKind::ObjectCache,
            FailureKind::NotConfigured,
            "Object cache is not configured",
        )]);

        assert!(!report.overall_success);
        assert!(report.summary_message.starts_with("No caches were purged\n"));
        assert!(report.outcome(BackendKind::ObjectCache).is_some());
        assert!(report.outcome(BackendKind::CdnCache).is_none());
    }

    #[test]
    fn test_report_json_shape() {
        let report = report(vec![PurgeOutcome::success(BackendKind::CdnCache, DEFAULT_SUCCESS_MESSAGE)]);
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["trigger"], "manual");
        assert_eq!(json["requested_kinds"][0], "cdn_cache");
        assert_eq!(json["outcomes"][0]["succeeded"], true);

        let back: PurgeReport = serde_json::from_value(json).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn test_age_is_not_negative() {
        let mut report = report(vec![PurgeOutcome::success(BackendKind::EdgeCache, "")]);
        report.timestamp = Utc::now() + chrono::Duration::hours(1);
        assert_eq!(report.age(), chrono::Duration::zero());
    }
}
