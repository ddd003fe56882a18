//! Turns view-model changes into terminal lines.
//!
//! The renderer remembers the last view it printed and only emits lines for
//! what changed, so a job that is polled every few seconds prints a line per
//! status or progress change, not per tick.

use ekho_core::{
    AppViewModel, ChatRowView, HealthReport, JobListing, JobPhase, JobRowView, JobStatus,
    JobStatusSnapshot, SlotView, UiError,
};

#[derive(Debug, Default)]
pub struct Renderer {
    last: AppViewModel,
}

impl Renderer {
    /// Take `view` as already shown.
    pub fn sync(&mut self, view: &AppViewModel) {
        self.last = view.clone();
    }

    pub fn render(&mut self, view: &AppViewModel) -> Vec<String> {
        let mut lines = Vec::new();
        render_slot(&mut lines, "avatar", &self.last.avatar, &view.avatar);
        render_slot(&mut lines, "video", &self.last.video, &view.video);
        render_chat(&mut lines, &self.last, view);
        render_error(&mut lines, "voice", &self.last.voice_error, &view.voice_error);
        if view.voice != self.last.voice {
            if let Some(voice) = &view.voice {
                lines.push(format!(
                    "voice: cloned as {} ({})",
                    voice.voice_id, voice.status
                ));
            }
        }
        render_error(&mut lines, "health", &self.last.health_error, &view.health_error);
        if view.health != self.last.health {
            if let Some(report) = &view.health {
                lines.push(health_line(report));
            }
        }
        render_error(&mut lines, "jobs", &self.last.listing_error, &view.listing_error);
        if view.listing != self.last.listing {
            if let Some(listing) = &view.listing {
                lines.extend(listing_table(listing));
            }
        }
        self.last = view.clone();
        lines
    }
}

fn render_error(
    lines: &mut Vec<String>,
    label: &str,
    before: &Option<UiError>,
    now: &Option<UiError>,
) {
    if now != before {
        if let Some(err) = now {
            lines.push(format!("{label}: {err}"));
        }
    }
}

fn render_slot(lines: &mut Vec<String>, label: &str, before: &SlotView, now: &SlotView) {
    if now.submitting && !before.submitting {
        lines.push(format!("{label}: submitting..."));
    }
    render_error(lines, label, &before.error, &now.error);
    if now.job != before.job {
        if let Some(job) = &now.job {
            lines.push(job_line(label, job));
        }
    }
}

fn render_chat(lines: &mut Vec<String>, before: &AppViewModel, now: &AppViewModel) {
    render_error(lines, "chat", &before.chat_error, &now.chat_error);
    // Oldest first so the transcript reads top to bottom.
    for row in now.chat.iter().rev() {
        let previous = before.chat.iter().find(|prev| prev.entry_id == row.entry_id);
        render_chat_row(lines, previous, row);
    }
}

fn render_chat_row(lines: &mut Vec<String>, previous: Option<&ChatRowView>, row: &ChatRowView) {
    if previous.is_none() {
        lines.push(format!("you: {}", row.user_prompt));
    }
    let was_pending = previous.map_or(true, |prev| prev.reply_pending);
    if was_pending && !row.reply_pending && row.error.is_none() {
        let speaker = match &row.tone {
            Some(tone) => format!("ekho ({tone})"),
            None => "ekho".to_string(),
        };
        lines.push(format!("{speaker}: {}", row.reply_text));
        if let Some(url) = &row.audio_url {
            lines.push(format!("  audio: {url}"));
        }
        if let Some(url) = &row.video_url {
            lines.push(format!("  video: {url}"));
        }
    }
    let previous_error = previous.and_then(|prev| prev.error.clone());
    render_error(lines, "ekho", &previous_error, &row.error);
    let previous_job = previous.and_then(|prev| prev.job.as_ref());
    if row.job.as_ref() != previous_job {
        if let Some(job) = &row.job {
            lines.push(format!("  {}", job_line("video", job)));
        }
    }
}

pub fn job_line(label: &str, job: &JobRowView) -> String {
    if job.job_id.is_empty() {
        return match (&job.error, &job.message) {
            (Some(err), _) => format!("{label}: {err}"),
            (None, Some(message)) => format!("{label}: {message}"),
            (None, None) => format!("{label}: {}", job.status),
        };
    }
    let head = format!("{label} {}", job.job_id);
    if let Some(err) = &job.error {
        return format!("{head}: {err}");
    }
    match job.status {
        JobStatus::Completed => match &job.result_url {
            Some(url) => format!("{head}: completed {url}"),
            None => format!("{head}: completed"),
        },
        status => {
            let mut line = format!("{head}: {status} {}%", job.progress);
            if job.phase == JobPhase::Active {
                if let Some(seconds) = job.estimated_seconds {
                    line.push_str(&format!(" (about {seconds}s)"));
                }
            }
            if let Some(message) = &job.message {
                line.push_str(&format!(" - {message}"));
            }
            line
        }
    }
}

pub fn snapshot_line(snapshot: &JobStatusSnapshot) -> String {
    let mut line = format!(
        "job {}: {} {}%",
        snapshot.job_id(),
        snapshot.status(),
        snapshot.progress()
    );
    if let Some(url) = snapshot.result_url() {
        line.push_str(&format!(" {url}"));
    }
    if let Some(message) = snapshot.error_message() {
        line.push_str(&format!(" ({message})"));
    }
    if let Some(updated) = snapshot.updated_at() {
        line.push_str(&format!(" updated {}", updated.format("%Y-%m-%d %H:%M:%S UTC")));
    }
    line
}

fn health_line(report: &HealthReport) -> String {
    let state = if report.is_healthy() { "healthy" } else { report.status.as_str() };
    let cloud = if report.cloud_connected { "yes" } else { "no" };
    let service = if report.service.is_empty() { "service" } else { report.service.as_str() };
    match report.timestamp {
        Some(at) => format!(
            "{service}: {state}, cloud connected: {cloud} (at {})",
            at.format("%H:%M:%S UTC")
        ),
        None => format!("{service}: {state}, cloud connected: {cloud}"),
    }
}

fn listing_table(listing: &JobListing) -> Vec<String> {
    if listing.jobs.is_empty() {
        return vec![format!("no jobs for {}", listing.user_id)];
    }
    let width = listing
        .jobs
        .iter()
        .map(|job| job.job_id().len())
        .max()
        .unwrap_or(0)
        .max("JOB".len());
    let mut lines = vec![format!("{:<width$}  {:<10}  {:>4}  RESULT", "JOB", "STATUS", "%")];
    for job in &listing.jobs {
        let result = job
            .result_url()
            .or(job.error_message())
            .unwrap_or("-");
        lines.push(format!(
            "{:<width$}  {:<10}  {:>4}  {}",
            job.job_id(),
            job.status().label(),
            job.progress(),
            result
        ));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use ekho_core::VoiceClone;
    use pretty_assertions::assert_eq;

    fn job(status: JobStatus, progress: u8) -> JobRowView {
        JobRowView {
            job_id: "veo_1".into(),
            status,
            phase: JobPhase::Active,
            progress,
            result_url: None,
            message: None,
            estimated_seconds: None,
            error: None,
        }
    }

    fn chat_row(entry_id: u64, pending: bool) -> ChatRowView {
        ChatRowView {
            entry_id,
            user_prompt: format!("message {entry_id}"),
            reply_text: if pending { String::new() } else { "hello".into() },
            reply_pending: pending,
            tone: None,
            mode: None,
            audio_url: None,
            video_url: None,
            is_polling: false,
            job: None,
            error: None,
        }
    }

    #[test]
    fn progress_is_printed_once_per_change() {
        let mut renderer = Renderer::default();
        let mut view = AppViewModel::default();
        view.avatar.job = Some(job(JobStatus::Processing, 40));
        assert_eq!(renderer.render(&view), vec!["avatar veo_1: processing 40%"]);
        assert!(renderer.render(&view).is_empty());

        let mut done = job(JobStatus::Completed, 100);
        done.phase = JobPhase::Terminal;
        done.result_url = Some("https://x/video.mp4".into());
        view.avatar.job = Some(done);
        assert_eq!(
            renderer.render(&view),
            vec!["avatar veo_1: completed https://x/video.mp4"]
        );
    }

    #[test]
    fn errors_carry_their_marker() {
        let mut renderer = Renderer::default();
        let mut view = AppViewModel::default();
        view.avatar.error = Some(UiError::Validation(
            "at least 3 face captures are required".into(),
        ));
        view.health_error = Some(UiError::Transport("Could not connect to server".into()));
        let mut failed = job(JobStatus::Failed, 0);
        failed.error = Some(UiError::JobFailure("safety filter".into()));
        view.video.job = Some(failed);
        assert_eq!(
            renderer.render(&view),
            vec![
                "avatar: [input] at least 3 face captures are required",
                "video veo_1: [job failed] safety filter",
                "health: [connection] Could not connect to server",
            ]
        );
    }

    #[test]
    fn placeholder_shows_note() {
        let mut renderer = Renderer::default();
        let mut view = AppViewModel::default();
        view.avatar.job = Some(JobRowView {
            job_id: String::new(),
            phase: JobPhase::Terminal,
            message: Some("submitted, pending status".into()),
            ..job(JobStatus::Pending, 0)
        });
        assert_eq!(
            renderer.render(&view),
            vec!["avatar: submitted, pending status"]
        );
    }

    #[test]
    fn chat_transcript_reads_oldest_first() {
        let mut renderer = Renderer::default();
        let mut view = AppViewModel::default();
        view.chat = vec![chat_row(2, true), chat_row(1, false)];
        assert_eq!(
            renderer.render(&view),
            vec!["you: message 1", "ekho: hello", "you: message 2"]
        );

        let mut answered = chat_row(2, false);
        answered.tone = Some("warm".into());
        answered.job = Some(job(JobStatus::Pending, 0));
        view.chat[0] = answered;
        assert_eq!(
            renderer.render(&view),
            vec!["ekho (warm): hello", "  video veo_1: pending 0%"]
        );
    }

    #[test]
    fn synced_view_prints_nothing() {
        let mut renderer = Renderer::default();
        let mut view = AppViewModel::default();
        view.chat = vec![chat_row(1, false)];
        view.voice = Some(VoiceClone {
            user_id: "u".into(),
            voice_id: "v".into(),
            status: "cloned".into(),
        });
        renderer.sync(&view);
        assert!(renderer.render(&view).is_empty());
    }

    #[test]
    fn listing_is_a_table() {
        let listing = JobListing {
            user_id: "user_42".into(),
            jobs: vec![
                JobStatusSnapshot::new(
                    "veo_1",
                    JobStatus::Completed,
                    100,
                    Some("https://v".into()),
                    None,
                ),
                JobStatusSnapshot::new("veo_22", JobStatus::Processing, 30, None, None),
            ],
        };
        assert_eq!(
            listing_table(&listing),
            vec![
                "JOB     STATUS         %  RESULT",
                "veo_1   completed    100  https://v",
                "veo_22  processing    30  -",
            ]
        );
    }
}
