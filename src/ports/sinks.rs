//! Sink ports: Side-effect collaborators for alerts and speech.
//!
//! Both are optional capabilities injected at construction time. The core
//! never depends on a sink succeeding; callers log and move on.

use crate::domain::AlertEmail;

/// Errors reported by a sink.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Sink unavailable: {0}")]
    Unavailable(String),

    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for handing an alert email to a transport.
pub trait MailSink: Send + Sync {
    /// Deliver (or enqueue) one alert email.
    ///
    /// # Errors
    /// Returns `SinkError` if the request could not be handed off.
    fn send(&self, email: &AlertEmail) -> Result<(), SinkError>;
}

/// Trait for rendering text as speech.
pub trait SpeechSink: Send + Sync {
    /// Speak one piece of text.
    ///
    /// # Errors
    /// Returns `SinkError` if the speech engine is unavailable.
    fn speak(&self, text: &str) -> Result<(), SinkError>;
}

/// Mail sink that drops every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMailSink;

impl MailSink for NoopMailSink {
    fn send(&self, _email: &AlertEmail) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Speech sink that stays silent.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSpeechSink;

impl SpeechSink for NoopSpeechSink {
    fn speak(&self, _text: &str) -> Result<(), SinkError> {
        Ok(())
    }
}

impl<T: MailSink + ?Sized> MailSink for Box<T> {
    fn send(&self, email: &AlertEmail) -> Result<(), SinkError> {
        (**self).send(email)
    }
}

impl<T: SpeechSink + ?Sized> SpeechSink for Box<T> {
    fn speak(&self, text: &str) -> Result<(), SinkError> {
        (**self).speak(text)
    }
}

/// Speak every line, logging failures instead of returning them.
pub fn announce<S: SpeechSink + ?Sized>(sink: &S, lines: &[String]) {
    for line in lines {
        if let Err(e) = sink.speak(line) {
            tracing::warn!("Speech sink failed: {}", e);
            break;
        }
    }
}
