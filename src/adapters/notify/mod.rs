//! Notify adapter: mail outbox and speech sinks.
//!
//! No mail transport lives in this crate. `OutboxMailSink` writes each send
//! request as a JSON file for an external sender to pick up; the credential
//! never leaves the process.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::AlertEmail;
use crate::ports::{MailSink, SinkError, SpeechSink};

/// Outbox record (credential omitted).
#[derive(Debug, Serialize)]
struct OutboxRequest<'a> {
    created_at: DateTime<Utc>,
    sender: &'a str,
    recipient: &'a str,
    subject: &'a str,
    body: &'a str,
}

/// Mail sink writing send requests into a directory.
#[derive(Debug)]
pub struct OutboxMailSink {
    dir: PathBuf,
    sequence: AtomicU64,
}

impl OutboxMailSink {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            sequence: AtomicU64::new(0),
        }
    }
}

impl MailSink for OutboxMailSink {
    fn send(&self, email: &AlertEmail) -> Result<(), SinkError> {
        fs::create_dir_all(&self.dir)?;

        let created_at = Utc::now();
        let request = OutboxRequest {
            created_at,
            sender: &email.sender,
            recipient: &email.recipient,
            subject: &email.subject,
            body: &email.body,
        };
        let json = serde_json::to_vec_pretty(&request)
            .map_err(|e| SinkError::Delivery(format!("encode request: {e}")))?;

        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        let name = format!("alert-{}-{seq:04}.json", created_at.format("%Y%m%dT%H%M%S%3f"));
        let path = self.dir.join(&name);
        let tmp = self.dir.join(format!(".{name}.tmp"));

        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&json)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;

        tracing::info!("Queued alert email for {} in {:?}", email.recipient, path);
        Ok(())
    }
}

/// Speech sink that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSpeechSink;

impl SpeechSink for LogSpeechSink {
    fn speak(&self, text: &str) -> Result<(), SinkError> {
        tracing::info!("[SPEAK] {}", text);
        Ok(())
    }
}

/// Speech sink that hands text to an external TTS program.
///
/// The text is passed as the last argument. Each call waits for the program
/// to exit, so consecutive lines are spoken in order.
#[derive(Debug, Clone)]
pub struct CommandSpeechSink {
    program: String,
    args: Vec<String>,
}

impl CommandSpeechSink {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Parse a whitespace-separated command line such as `espeak -s 150`.
    #[must_use]
    pub fn from_command_line(line: &str) -> Self {
        let mut parts = line.split_whitespace().map(str::to_string);
        Self {
            program: parts.next().unwrap_or_default(),
            args: parts.collect(),
        }
    }
}

impl SpeechSink for CommandSpeechSink {
    fn speak(&self, text: &str) -> Result<(), SinkError> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| SinkError::Unavailable(format!("{}: {e}", self.program)))?;

        if !status.success() {
            return Err(SinkError::Delivery(format!("{} exited with {status}", self.program)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MailCredential, ALERT_SUBJECT};

    fn email() -> AlertEmail {
        AlertEmail {
            sender: "ward@example.org".into(),
            credential: MailCredential::new("app-password-123"),
            recipient: "oncall@example.org".into(),
            subject: ALERT_SUBJECT.into(),
            body: "Critical vitals for patient 3:\n\nHeart Rate: 120.00".into(),
        }
    }

    #[test]
    fn test_outbox_writes_request_without_credential() {
        let dir = tempfile::tempdir().expect("tempdir");
        let outbox = dir.path().join("outbox");
        let sink = OutboxMailSink::new(&outbox);

        sink.send(&email()).expect("send");
        sink.send(&email()).expect("send");

        let mut files: Vec<PathBuf> = fs::read_dir(&outbox)
            .expect("read dir")
            .map(|e| e.expect("entry").path())
            .collect();
        files.sort();
        assert_eq!(files.len(), 2);

        let content = fs::read_to_string(&files[0]).expect("read");
        let json: serde_json::Value = serde_json::from_str(&content).expect("json");
        assert_eq!(json["recipient"], "oncall@example.org");
        assert_eq!(json["subject"], ALERT_SUBJECT);
        assert!(json["body"].as_str().expect("body").contains("Heart Rate: 120.00"));
        assert!(!content.contains("app-password-123"));
    }

    #[test]
    fn test_outbox_reports_unwritable_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blocker = dir.path().join("outbox");
        fs::write(&blocker, b"not a directory").expect("write");

        let sink = OutboxMailSink::new(&blocker);
        assert!(matches!(sink.send(&email()), Err(SinkError::Io(_))));
    }

    #[test]
    fn test_log_speech_never_fails() {
        assert!(LogSpeechSink.speak("Heart Rate: 72.00").is_ok());
    }

    #[test]
    fn test_missing_tts_program_is_unavailable() {
        let sink = CommandSpeechSink::new("vitalcast-no-such-tts-program");
        assert!(matches!(
            sink.speak("hello"),
            Err(SinkError::Unavailable(ref m)) if m.contains("vitalcast-no-such-tts-program")
        ));
    }

    #[test]
    fn test_command_line_splits_program_and_args() {
        let sink = CommandSpeechSink::from_command_line("  espeak -s 150 ");
        assert_eq!(sink.program, "espeak");
        assert_eq!(sink.args, vec!["-s".to_string(), "150".to_string()]);
    }

    #[cfg(unix)]
    #[test]
    fn test_lines_are_spoken_one_after_another() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = dir.path().join("tts.log");
        let script = format!(
            "echo \"start $0\" >> '{0}'; sleep 0.05; echo \"end $0\" >> '{0}'",
            log.display()
        );
        let sink = CommandSpeechSink {
            program: "sh".into(),
            args: vec!["-c".into(), script],
        };

        let lines: Vec<String> = ["a", "b", "c"].iter().map(|s| (*s).to_string()).collect();
        crate::ports::announce(&sink, &lines);

        let logged = fs::read_to_string(&log).expect("read log");
        assert_eq!(
            logged.lines().collect::<Vec<_>>(),
            vec!["start a", "end a", "start b", "end b", "start c", "end c"]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_tts_program_is_delivery_error() {
        let sink = CommandSpeechSink::new("false");
        assert!(matches!(sink.speak("hello"), Err(SinkError::Delivery(_))));
    }
}
