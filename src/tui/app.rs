//! Main TUI application state machine.
//!
//! Handles:
//! - Screen navigation and patient selection
//! - Periodic refresh from the vitals table
//! - Forecast, alert dispatch (once per reading) and read-aloud
//! - Retraining and appointment booking

use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::{Local, NaiveDateTime};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    Terminal,
};

use crate::adapters::flatfile::CsvVitalsStore;
use crate::adapters::forest::ForecastModel;
use crate::adapters::registry::FileModelRegistry;
use crate::application::{AlertOutcome, AlertService, InferenceService, TrainingService};
use crate::config::AppConfig;
use crate::domain::{book_slot, suggest_slots, VitalField, VitalRecord};
use crate::ports::{ArtifactVariant, Forecaster, MailSink, ModelRegistry, SpeechSink, VitalsStore};
use crate::VitalcastError;

use super::ui::{
    appointments::{render_appointments, AppointmentState, SUGGEST_DAYS, SUGGEST_LIMIT},
    dashboard::{render_dashboard, DashboardState},
    history::{render_history, HistoryState},
    render_disclaimer, render_status, render_tabs, StatusLevel, StatusMessage,
};

/// Alert service wired to whatever sinks the configuration selects.
pub type DashboardAlerts = AlertService<Box<dyn MailSink>, Box<dyn SpeechSink>>;

/// Current screen/view in the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Dashboard,
    History,
    Appointments,
}

impl Screen {
    const ALL: [Screen; 3] = [Screen::Dashboard, Screen::History, Screen::Appointments];

    const fn title(self) -> &'static str {
        match self {
            Self::Dashboard => "1 Dashboard",
            Self::History => "2 History",
            Self::Appointments => "3 Appointments",
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::Dashboard => 0,
            Self::History => 1,
            Self::Appointments => 2,
        }
    }

    const fn next(self) -> Self {
        match self {
            Self::Dashboard => Self::History,
            Self::History => Self::Appointments,
            Self::Appointments => Self::Dashboard,
        }
    }
}

/// Main application state
pub struct App {
    screen: Screen,
    should_quit: bool,

    store: Arc<CsvVitalsStore>,
    registry: Arc<FileModelRegistry>,
    trainer: TrainingService<CsvVitalsStore, FileModelRegistry>,
    inference: Option<InferenceService<ForecastModel>>,
    alerts: DashboardAlerts,
    model_variant: ArtifactVariant,

    refresh_every: Duration,
    last_refresh: Option<Instant>,

    /// Outcome per (patient, reading timestamp); a reading is mailed at most once
    dispatched: HashMap<(i64, NaiveDateTime), AlertOutcome>,

    status: Option<StatusMessage>,
    dashboard_state: DashboardState,
    history_state: HistoryState,
    appointment_state: AppointmentState,
}

impl App {
    /// Create the application from configuration, constructing every adapter.
    ///
    /// For more control, use `with_dependencies()`.
    #[must_use]
    pub fn new(config: &AppConfig) -> Self {
        let store = Arc::new(CsvVitalsStore::new(&config.data_path));
        let registry = Arc::new(FileModelRegistry::new(&config.model_dir));
        let trainer = TrainingService::new(store.clone(), registry.clone(), config.forest.clone());
        let alerts = AlertService::new(
            config.thresholds(),
            Arc::new(config.mail_sink()),
            Arc::new(config.speech_sink()),
        )
        .with_mail(config.mail.clone());

        Self::with_dependencies(
            store,
            registry,
            trainer,
            alerts,
            config.model_variant,
            config.refresh,
        )
    }

    /// Create application with injected dependencies.
    ///
    /// Loads the configured model artifact and the vitals table once; a
    /// missing model or table is reported in the status line, not as an error.
    pub fn with_dependencies(
        store: Arc<CsvVitalsStore>,
        registry: Arc<FileModelRegistry>,
        trainer: TrainingService<CsvVitalsStore, FileModelRegistry>,
        alerts: DashboardAlerts,
        model_variant: ArtifactVariant,
        refresh_every: Duration,
    ) -> Self {
        let mut app = Self {
            screen: Screen::Dashboard,
            should_quit: false,
            store,
            registry,
            trainer,
            inference: None,
            alerts,
            model_variant,
            refresh_every,
            last_refresh: None,
            dispatched: HashMap::new(),
            status: None,
            dashboard_state: DashboardState {
                refresh_secs: refresh_every.as_secs(),
                ..DashboardState::default()
            },
            history_state: HistoryState::default(),
            appointment_state: AppointmentState::default(),
        };
        app.load_model();
        app.refresh();
        app
    }

    /// Run the main application loop.
    ///
    /// # Errors
    /// Returns error if terminal operations fail.
    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.main_loop(&mut terminal);

        // Restore terminal
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn main_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
        let titles: Vec<&str> = Screen::ALL.iter().map(|s| s.title()).collect();

        loop {
            self.tick();

            terminal.draw(|f| {
                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([
                        Constraint::Length(2),
                        Constraint::Length(1),
                        Constraint::Min(0),
                        Constraint::Length(3),
                    ])
                    .split(f.area());

                render_tabs(f, chunks[0], &titles, self.screen.index());
                render_status(f, chunks[1], self.status.as_ref());

                match self.screen {
                    Screen::Dashboard => render_dashboard(
                        f,
                        chunks[2],
                        &self.dashboard_state,
                        self.alerts.thresholds(),
                    ),
                    Screen::History => render_history(f, chunks[2], &self.history_state),
                    Screen::Appointments => render_appointments(
                        f,
                        chunks[2],
                        &self.appointment_state,
                        self.dashboard_state.selected_patient(),
                    ),
                }

                render_disclaimer(f, chunks[3]);
            })?;

            // Short poll keeps the refresh tick responsive
            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code, key.modifiers);
                    }
                }
            }

            if self.should_quit {
                break;
            }
        }

        Ok(())
    }

    /// Refresh when the interval has elapsed.
    fn tick(&mut self) {
        let due = self
            .last_refresh
            .map_or(true, |at| at.elapsed() >= self.refresh_every);
        if due {
            self.refresh();
        }
    }

    fn set_status(&mut self, level: StatusLevel, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            level,
            text: text.into(),
        });
    }

    fn load_model(&mut self) {
        match self.registry.load_variant(self.model_variant) {
            Ok(model) => {
                let source = format!("{} artifact", self.model_variant);
                self.install_model(model, &source);
            }
            Err(e) => {
                tracing::warn!("No usable model: {}", e);
                self.inference = None;
                self.dashboard_state.model_info = None;
                let level = if matches!(e, VitalcastError::ModelNotFound { .. }) {
                    StatusLevel::Warning
                } else {
                    StatusLevel::Error
                };
                self.set_status(level, format!("{e}. Press [T] to train."));
            }
        }
    }

    fn install_model(&mut self, model: ForecastModel, source: &str) {
        self.dashboard_state.model_info = Some(format!(
            "{} pairs, {} nodes, {} ({})",
            model.training_pairs(),
            model.node_count(),
            model.trained_at().format("%Y-%m-%d %H:%M UTC"),
            source
        ));
        self.inference = Some(InferenceService::new(Arc::new(model)));
    }

    /// Reload patient ids and recompute the selected patient's view.
    fn refresh(&mut self) {
        self.last_refresh = Some(Instant::now());

        match self.store.patient_ids() {
            Ok(ids) => {
                let current = self.dashboard_state.selected_patient();
                self.dashboard_state.selected = current
                    .and_then(|id| ids.iter().position(|&i| i == id))
                    .unwrap_or(0);
                self.dashboard_state.patient_ids = ids;
            }
            Err(e) => {
                tracing::error!("Failed to load vitals: {}", e);
                self.dashboard_state.patient_ids.clear();
                self.dashboard_state.selected = 0;
                self.set_status(StatusLevel::Error, e.to_string());
            }
        }

        self.update_selection();
    }

    fn update_selection(&mut self) {
        let Some(patient_id) = self.dashboard_state.selected_patient() else {
            self.dashboard_state.latest = None;
            self.dashboard_state.prediction = None;
            self.dashboard_state.alert = None;
            self.dashboard_state.alert_outcome = None;
            self.history_state = HistoryState::default();
            self.refresh_slots();
            return;
        };

        let history = match self.store.history_for(patient_id) {
            Ok(records) => records,
            Err(e) => {
                tracing::error!("Failed to load history for patient {}: {}", patient_id, e);
                self.set_status(StatusLevel::Error, e.to_string());
                Vec::new()
            }
        };
        self.history_state = HistoryState::from_records(patient_id, &history);
        let latest: Option<VitalRecord> = history.last().cloned();

        let forecast = match (&self.inference, &latest) {
            (Some(service), Some(record)) => Some(service.predict_record(record)),
            _ => None,
        };
        let prediction = match forecast {
            Some(Ok(prediction)) => Some(prediction),
            Some(Err(e)) => {
                tracing::error!("Forecast failed for patient {}: {}", patient_id, e);
                self.set_status(StatusLevel::Error, e.to_string());
                None
            }
            None => None,
        };

        let alert = prediction.as_ref().and_then(|p| self.alerts.evaluate(p));
        let outcome = match (&alert, &latest) {
            (Some(alert), Some(record)) => Some(
                self.dispatched
                    .entry((patient_id, record.timestamp))
                    .or_insert_with(|| self.alerts.dispatch(alert))
                    .clone(),
            ),
            _ => None,
        };

        self.dashboard_state.latest = latest;
        self.dashboard_state.prediction = prediction;
        self.dashboard_state.alert = alert;
        self.dashboard_state.alert_outcome = outcome;
        self.refresh_slots();
    }

    fn refresh_slots(&mut self) {
        let booked = self.appointment_state.booked_slots();
        let slots = suggest_slots(
            &booked,
            Local::now().naive_local(),
            SUGGEST_DAYS,
            SUGGEST_LIMIT,
        );
        self.appointment_state.set_slots(slots);
    }

    fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) {
        // Global quit handling
        if key == KeyCode::Char('q') && modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        match key {
            KeyCode::Char('q') | KeyCode::Char('Q') => self.should_quit = true,
            KeyCode::Tab => self.screen = self.screen.next(),
            KeyCode::Char('1') => self.screen = Screen::Dashboard,
            KeyCode::Char('2') => self.screen = Screen::History,
            KeyCode::Char('3') => self.screen = Screen::Appointments,
            KeyCode::Left => {
                self.dashboard_state.select_prev();
                self.update_selection();
            }
            KeyCode::Right => {
                self.dashboard_state.select_next();
                self.update_selection();
            }
            KeyCode::Char('r') | KeyCode::Char('R') => self.read_aloud(),
            KeyCode::Char('t') | KeyCode::Char('T') => self.retrain(),
            _ if self.screen == Screen::Appointments => self.handle_appointments_key(key),
            _ => {}
        }
    }

    fn handle_appointments_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Up => self.appointment_state.select_prev(),
            KeyCode::Down => self.appointment_state.select_next(),
            KeyCode::Enter => self.book_selected(),
            _ => {}
        }
    }

    fn read_aloud(&mut self) {
        let Some(record) = &self.dashboard_state.latest else {
            self.set_status(StatusLevel::Warning, "No vitals to read for this patient.");
            return;
        };

        let vitals = record.vitals();
        let mut lines = vec![format!("Latest vitals for patient {}", record.patient_id)];
        lines.extend(
            VitalField::ALL
                .into_iter()
                .map(|field| format!("{}: {}", field.label(), vitals.get(field))),
        );
        if let Some(prediction) = &self.dashboard_state.prediction {
            lines.push("Predicted next vitals".to_string());
            lines.extend(prediction.summary().lines().map(str::to_string));
        }

        let patient_id = record.patient_id;
        self.alerts.speak(&lines);
        self.set_status(
            StatusLevel::Info,
            format!("Reading vitals for patient {patient_id}"),
        );
    }

    fn retrain(&mut self) {
        match self.trainer.train_and_save() {
            Ok(report) => {
                let text = format!(
                    "Retrained on {} pairs from {} records",
                    report.pairs, report.records
                );
                tracing::info!("{}", text);
                self.install_model(report.model, "retrained");
                self.set_status(StatusLevel::Info, text);
                self.update_selection();
            }
            Err(e) => {
                tracing::error!("Retraining failed: {}", e);
                self.set_status(StatusLevel::Error, format!("Retraining failed: {e}"));
            }
        }
    }

    fn book_selected(&mut self) {
        let Some(patient_id) = self.dashboard_state.selected_patient() else {
            self.set_status(StatusLevel::Warning, "Select a patient before booking.");
            return;
        };
        let Some(slot) = self.appointment_state.selected_slot() else {
            self.set_status(StatusLevel::Warning, "No free slots to book.");
            return;
        };

        let appointment = book_slot(patient_id, slot);
        let confirmation = appointment.confirmation();
        tracing::info!(
            "Booked appointment {} for patient {}",
            appointment.appointment_id,
            patient_id
        );

        self.alerts.speak(std::slice::from_ref(&confirmation));
        self.appointment_state.bookings.push(appointment);
        self.appointment_state.confirmation = Some(confirmation.clone());
        self.set_status(StatusLevel::Info, confirmation);
        self.refresh_slots();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::forest::ForestConfig;
    use crate::adapters::notify::OutboxMailSink;
    use crate::application::MailSettings;
    use crate::domain::{MailCredential, ThresholdTable};
    use crate::ports::NoopSpeechSink;
    use chrono::NaiveDate;
    use std::path::Path;

    fn record(patient_id: i64, minute: u32, hr: i32) -> VitalRecord {
        VitalRecord {
            patient_id,
            timestamp: NaiveDate::from_ymd_opt(2024, 3, 1)
                .and_then(|d| d.and_hms_opt(8, minute, 0))
                .expect("valid time"),
            heart_rate: hr,
            bp_systolic: 120,
            bp_diastolic: 80,
            oxygen_saturation: 97.0,
            temperature: 36.6,
        }
    }

    fn outbox_len(dir: &Path) -> usize {
        std::fs::read_dir(dir).map_or(0, |entries| entries.count())
    }

    fn build_app(dir: &Path) -> App {
        let store = Arc::new(CsvVitalsStore::new(dir.join("vitals.csv")));
        let registry = Arc::new(FileModelRegistry::new(dir.join("models")));
        let trainer = TrainingService::new(
            store.clone(),
            registry.clone(),
            ForestConfig {
                n_trees: 5,
                ..ForestConfig::default()
            },
        );
        let mail: Box<dyn MailSink> = Box::new(OutboxMailSink::new(dir.join("outbox")));
        let speech: Box<dyn SpeechSink> = Box::new(NoopSpeechSink);
        let alerts = AlertService::new(ThresholdTable::default(), Arc::new(mail), Arc::new(speech))
            .with_mail(Some(MailSettings {
                sender: "ward@example.org".to_string(),
                recipient: "oncall@example.org".to_string(),
                credential: MailCredential::new("secret"),
            }));

        App::with_dependencies(
            store,
            registry,
            trainer,
            alerts,
            ArtifactVariant::Plain,
            Duration::from_secs(60),
        )
    }

    fn seed(dir: &Path) {
        let store = CsvVitalsStore::new(dir.join("vitals.csv"));
        for r in [record(1, 0, 120), record(1, 5, 125), record(2, 0, 70)] {
            store.append(&r).expect("append");
        }
    }

    #[test]
    fn test_missing_data_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let app = build_app(dir.path());

        assert!(app.dashboard_state.patient_ids.is_empty());
        let status = app.status.as_ref().expect("status");
        assert_eq!(status.level, StatusLevel::Error);
        assert!(status.text.contains("Vitals data not found"));
    }

    #[test]
    fn test_missing_model_leaves_dashboard_without_forecast() {
        let dir = tempfile::tempdir().expect("tempdir");
        seed(dir.path());
        let app = build_app(dir.path());

        assert_eq!(app.dashboard_state.patient_ids, vec![1, 2]);
        assert!(app.inference.is_none());
        assert!(app.dashboard_state.prediction.is_none());
        let status = app.status.as_ref().expect("status");
        assert_eq!(status.level, StatusLevel::Warning);
        assert!(status.text.contains("Press [T] to train"));
    }

    #[test]
    fn test_retrain_then_alert_is_mailed_once_per_reading() {
        let dir = tempfile::tempdir().expect("tempdir");
        seed(dir.path());
        let mut app = build_app(dir.path());
        let outbox = dir.path().join("outbox");

        app.handle_key(KeyCode::Char('t'), KeyModifiers::NONE);
        assert!(app.inference.is_some());
        assert!(dir.path().join("models").join("model.bin").exists());

        // One training pair: every forecast reproduces the second reading.
        let prediction = app.dashboard_state.prediction.expect("prediction");
        assert_eq!(prediction.value(VitalField::HeartRate), 125.0);
        assert!(app.dashboard_state.alert.is_some());
        assert_eq!(app.dashboard_state.alert_outcome, Some(AlertOutcome::Sent));
        assert_eq!(outbox_len(&outbox), 1);

        app.refresh();
        assert_eq!(outbox_len(&outbox), 1);

        // Patient 2's reading gets its own alert, and only one.
        app.handle_key(KeyCode::Right, KeyModifiers::NONE);
        assert_eq!(outbox_len(&outbox), 2);
        app.handle_key(KeyCode::Left, KeyModifiers::NONE);
        app.handle_key(KeyCode::Right, KeyModifiers::NONE);
        assert_eq!(outbox_len(&outbox), 2);

        app.handle_key(KeyCode::Left, KeyModifiers::NONE);
        app.store.append(&record(1, 10, 130)).expect("append");
        app.refresh();
        assert_eq!(outbox_len(&outbox), 3);
    }

    #[test]
    fn test_saved_model_is_loaded_at_startup() {
        let dir = tempfile::tempdir().expect("tempdir");
        seed(dir.path());
        build_app(dir.path()).retrain();

        let app = build_app(dir.path());
        assert!(app.inference.is_some());
        let info = app.dashboard_state.model_info.as_deref().expect("model info");
        assert!(info.contains(" nodes, "));
        assert!(app.dashboard_state.prediction.is_some());
    }

    #[test]
    fn test_navigation_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        seed(dir.path());
        let mut app = build_app(dir.path());

        assert_eq!(app.dashboard_state.selected_patient(), Some(1));
        app.handle_key(KeyCode::Right, KeyModifiers::NONE);
        assert_eq!(app.dashboard_state.selected_patient(), Some(2));
        assert_eq!(app.history_state.patient_id, Some(2));
        assert_eq!(app.history_state.len(), 1);

        app.handle_key(KeyCode::Tab, KeyModifiers::NONE);
        assert_eq!(app.screen, Screen::History);
        app.handle_key(KeyCode::Char('3'), KeyModifiers::NONE);
        assert_eq!(app.screen, Screen::Appointments);
        app.handle_key(KeyCode::Tab, KeyModifiers::NONE);
        assert_eq!(app.screen, Screen::Dashboard);

        app.handle_key(KeyCode::Char('q'), KeyModifiers::CONTROL);
        assert!(app.should_quit);
    }

    #[test]
    fn test_booking_removes_slot_from_suggestions() {
        let dir = tempfile::tempdir().expect("tempdir");
        seed(dir.path());
        let mut app = build_app(dir.path());

        app.handle_key(KeyCode::Char('3'), KeyModifiers::NONE);
        app.handle_key(KeyCode::Down, KeyModifiers::NONE);
        let slot = app.appointment_state.selected_slot().expect("free slot");
        app.handle_key(KeyCode::Enter, KeyModifiers::NONE);

        assert_eq!(app.appointment_state.bookings.len(), 1);
        assert_eq!(app.appointment_state.bookings[0].patient_id, 1);
        assert_eq!(app.appointment_state.bookings[0].slot, slot);
        assert!(!app.appointment_state.slots.contains(&slot));
        let confirmation = app.appointment_state.confirmation.as_deref().expect("confirmation");
        assert!(confirmation.starts_with("Appointment booked! ID: "));
    }
}
