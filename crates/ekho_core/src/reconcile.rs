//! Pure reconciliation of fetched job status into tracked snapshots.

use std::time::Duration;

use crate::job::{JobStatus, JobStatusSnapshot};

/// Result of one reconciliation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    pub snapshot: JobStatusSnapshot,
    pub continue_polling: bool,
}

impl Reconciled {
    fn stop(snapshot: JobStatusSnapshot) -> Self {
        Self {
            snapshot,
            continue_polling: false,
        }
    }
}

/// Fold a freshly fetched status into the previous snapshot.
///
/// A terminal `previous` is returned unchanged.
pub fn reconcile(previous: &JobStatusSnapshot, fetched: JobStatusSnapshot) -> Reconciled {
    if previous.is_terminal() {
        return Reconciled::stop(previous.clone());
    }

    let fetched = fetched.with_job_id(previous.job_id());
    if fetched.is_terminal() {
        return Reconciled::stop(fetched);
    }

    // `new` drops any terminal fields for non-terminal statuses.
    let snapshot = JobStatusSnapshot::new(
        fetched.job_id(),
        fetched.status(),
        u32::from(fetched.progress()),
        None,
        None,
    )
    .with_timestamps(
        fetched.created_at().or(previous.created_at()),
        fetched.updated_at().or(previous.updated_at()),
    );

    Reconciled {
        snapshot,
        continue_polling: true,
    }
}

/// A placeholder reference has nothing to poll: it stays pending and stops.
pub fn reconcile_placeholder(previous: &JobStatusSnapshot) -> Reconciled {
    if previous.is_terminal() {
        return Reconciled::stop(previous.clone());
    }
    Reconciled::stop(
        JobStatusSnapshot::seeded(previous.job_id(), JobStatus::Pending)
            .with_timestamps(previous.created_at(), previous.updated_at()),
    )
}

/// The status query itself failed.
pub fn reconcile_transport_failure(previous: &JobStatusSnapshot, detail: &str) -> Reconciled {
    if previous.is_terminal() {
        return Reconciled::stop(previous.clone());
    }
    Reconciled::stop(
        JobStatusSnapshot::failed(previous.job_id(), format!("status check failed: {detail}"))
            .with_timestamps(previous.created_at(), previous.updated_at()),
    )
}

/// How pollers tick and how many fetch errors in a row end a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// `1` means the first failed status query is terminal.
    pub max_consecutive_failures: u32,
}

impl PollPolicy {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

    pub fn gives_up_after(&self, consecutive_failures: u32) -> bool {
        consecutive_failures >= self.max_consecutive_failures.max(1)
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Self::DEFAULT_INTERVAL,
            max_consecutive_failures: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending() -> JobStatusSnapshot {
        JobStatusSnapshot::seeded("veo_u_1", JobStatus::Pending)
    }

    #[test]
    fn processing_progress_keeps_polling() {
        let fetched = JobStatusSnapshot::new("veo_u_1", JobStatus::Processing, 40, None, None);
        let out = reconcile(&pending(), fetched);
        assert_eq!(out.snapshot.status(), JobStatus::Processing);
        assert_eq!(out.snapshot.progress(), 40);
        assert!(out.continue_polling);
    }

    #[test]
    fn completed_sets_url_and_stops() {
        let fetched = JobStatusSnapshot::new(
            "veo_u_1",
            JobStatus::Completed,
            100,
            Some("https://x/video.mp4".into()),
            None,
        );
        let out = reconcile(&pending(), fetched);
        assert_eq!(out.snapshot.result_url(), Some("https://x/video.mp4"));
        assert_eq!(out.snapshot.error_message(), None);
        assert!(!out.continue_polling);
    }

    #[test]
    fn failed_keeps_message_and_stops() {
        let fetched =
            JobStatusSnapshot::new("veo_u_1", JobStatus::Failed, 0, None, Some("blocked".into()));
        let out = reconcile(&pending(), fetched);
        assert_eq!(out.snapshot.status(), JobStatus::Failed);
        assert_eq!(out.snapshot.error_message(), Some("blocked"));
        assert!(!out.continue_polling);
    }

    #[test]
    fn terminal_previous_is_never_mutated() {
        let done = JobStatusSnapshot::new(
            "veo_u_1",
            JobStatus::Completed,
            100,
            Some("https://x/video.mp4".into()),
            None,
        );
        let candidates = [
            JobStatusSnapshot::new("veo_u_1", JobStatus::Processing, 10, None, None),
            JobStatusSnapshot::new("veo_u_1", JobStatus::Failed, 0, None, Some("late".into())),
            JobStatusSnapshot::new(
                "other",
                JobStatus::Completed,
                100,
                Some("https://y".into()),
                None,
            ),
            JobStatusSnapshot::new("veo_u_1", JobStatus::Unknown, 0, None, None),
        ];
        for fetched in candidates {
            let out = reconcile(&done, fetched);
            assert_eq!(out.snapshot, done);
            assert!(!out.continue_polling);
        }
        assert_eq!(reconcile_transport_failure(&done, "offline").snapshot, done);
        assert_eq!(reconcile_placeholder(&done).snapshot, done);
    }

    #[test]
    fn unknown_status_keeps_polling_and_missing_id_is_filled() {
        let fetched = JobStatusSnapshot::new("", JobStatus::Unknown, 5, None, None);
        let out = reconcile(&pending(), fetched);
        assert_eq!(out.snapshot.job_id(), "veo_u_1");
        assert_eq!(out.snapshot.status(), JobStatus::Unknown);
        assert!(out.continue_polling);
    }

    #[test]
    fn transport_failure_is_terminal() {
        let out = reconcile_transport_failure(&pending(), "connection refused");
        assert_eq!(out.snapshot.status(), JobStatus::Failed);
        assert_eq!(
            out.snapshot.error_message(),
            Some("status check failed: connection refused")
        );
        assert!(!out.continue_polling);
    }

    #[test]
    fn placeholder_stops_immediately() {
        let out = reconcile_placeholder(&pending());
        assert_eq!(out.snapshot.status(), JobStatus::Pending);
        assert_eq!(out.snapshot.progress(), 0);
        assert!(!out.continue_polling);
    }

    #[test]
    fn default_policy_gives_up_on_first_failure() {
        let policy = PollPolicy::default();
        assert!(policy.gives_up_after(1));

        let patient = PollPolicy {
            max_consecutive_failures: 3,
            ..PollPolicy::default()
        };
        assert!(!patient.gives_up_after(2));
        assert!(patient.gives_up_after(3));
    }
}
