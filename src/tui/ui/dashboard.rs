//! Dashboard view: latest vitals, forecast and alert status.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::application::AlertOutcome;
use crate::domain::{Alert, PredictionResult, ThresholdTable, VitalField, VitalRecord};
use crate::tui::styles::MedicalTheme;

/// Dashboard state for rendering.
#[derive(Debug, Default)]
pub struct DashboardState {
    pub patient_ids: Vec<i64>,
    pub selected: usize,
    pub latest: Option<VitalRecord>,
    pub prediction: Option<PredictionResult>,
    pub alert: Option<Alert>,
    pub alert_outcome: Option<AlertOutcome>,
    pub model_info: Option<String>,
    pub refresh_secs: u64,
}

impl DashboardState {
    #[must_use]
    pub fn selected_patient(&self) -> Option<i64> {
        self.patient_ids.get(self.selected).copied()
    }

    pub fn select_next(&mut self) {
        if !self.patient_ids.is_empty() {
            self.selected = (self.selected + 1) % self.patient_ids.len();
        }
    }

    pub fn select_prev(&mut self) {
        if !self.patient_ids.is_empty() {
            self.selected = self
                .selected
                .checked_sub(1)
                .unwrap_or(self.patient_ids.len() - 1);
        }
    }
}

/// Render the main dashboard view.
pub fn render_dashboard(
    f: &mut Frame,
    area: Rect,
    state: &DashboardState,
    thresholds: &ThresholdTable,
) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Patient selector
            Constraint::Min(0),    // Vitals
            Constraint::Length(9), // Alert + model
        ])
        .split(area);

    render_selector(f, rows[0], state);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[1]);
    render_latest(f, columns[0], state);
    render_prediction(f, columns[1], state, thresholds);

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(rows[2]);
    render_alert(f, bottom[0], state);
    render_actions(f, bottom[1], state);
}

fn panel(title: &str) -> Block<'_> {
    Block::default()
        .title(Span::styled(format!(" {title} "), MedicalTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(MedicalTheme::border())
}

fn render_selector(f: &mut Frame, area: Rect, state: &DashboardState) {
    let mut spans = vec![Span::styled(" Patient: ", MedicalTheme::text_secondary())];
    if state.patient_ids.is_empty() {
        spans.push(Span::styled("no records", MedicalTheme::text_muted()));
    }
    for (i, id) in state.patient_ids.iter().enumerate() {
        let style = if i == state.selected {
            MedicalTheme::selected()
        } else {
            MedicalTheme::text()
        };
        spans.push(Span::styled(format!(" {id} "), style));
        spans.push(Span::raw(" "));
    }
    spans.push(Span::styled("  ◀ ▶ to switch", MedicalTheme::text_muted()));

    f.render_widget(Paragraph::new(Line::from(spans)).block(panel("Patient")), area);
}

fn render_latest(f: &mut Frame, area: Rect, state: &DashboardState) {
    let Some(record) = &state.latest else {
        let empty = Paragraph::new(Line::from(Span::styled(
            "No vitals recorded for this patient.",
            MedicalTheme::text_muted(),
        )))
        .block(panel("Latest Vitals"));
        f.render_widget(empty, area);
        return;
    };

    let vitals = record.vitals();
    let mut lines = vec![
        Line::from(vec![
            Span::styled("  Recorded: ", MedicalTheme::text_secondary()),
            Span::styled(record.timestamp_string(), MedicalTheme::text()),
        ]),
        Line::from(""),
    ];
    for field in VitalField::ALL {
        let value = vitals.get(field);
        let shown = match field {
            VitalField::OxygenSaturation | VitalField::Temperature => format!("{value:.1}"),
            _ => format!("{value:.0}"),
        };
        lines.push(Line::from(vec![
            Span::styled(format!("  {:<18}", field.label()), MedicalTheme::text_secondary()),
            Span::styled(shown, MedicalTheme::text()),
        ]));
    }

    f.render_widget(Paragraph::new(lines).block(panel("Latest Vitals")), area);
}

fn render_prediction(
    f: &mut Frame,
    area: Rect,
    state: &DashboardState,
    thresholds: &ThresholdTable,
) {
    let Some(prediction) = &state.prediction else {
        let hint = if state.model_info.is_some() {
            "No forecast for this patient."
        } else {
            "No model loaded. Press [T] to train."
        };
        let empty = Paragraph::new(Line::from(Span::styled(hint, MedicalTheme::text_muted())))
            .block(panel("Predicted Next Vitals"));
        f.render_widget(empty, area);
        return;
    };

    let mut lines = vec![Line::from(""), Line::from("")];
    for entry in thresholds.entries() {
        let value = prediction.value(entry.field);
        let violates = entry.comparison.violated(value, entry.limit);
        lines.push(Line::from(vec![
            Span::styled(
                format!("  {:<18}", entry.field.label()),
                MedicalTheme::text_secondary(),
            ),
            Span::styled(format!("{value:.2}"), MedicalTheme::predicted(violates)),
            Span::styled(
                format!("   (alert {} {})", entry.comparison.symbol(), entry.limit),
                MedicalTheme::text_muted(),
            ),
        ]));
    }

    f.render_widget(
        Paragraph::new(lines).block(panel("Predicted Next Vitals")),
        area,
    );
}

fn render_alert(f: &mut Frame, area: Rect, state: &DashboardState) {
    let (block, mut lines) = match &state.alert {
        Some(alert) => {
            let block = Block::default()
                .title(Span::styled(" Alert ", MedicalTheme::danger()))
                .borders(Borders::ALL)
                .border_style(MedicalTheme::border_alert());
            let lines: Vec<Line> = alert
                .violations
                .iter()
                .map(|v| {
                    Line::from(Span::styled(format!("  {}", v.line()), MedicalTheme::danger()))
                })
                .collect();
            (block, lines)
        }
        None => (
            panel("Alert"),
            vec![Line::from(Span::styled(
                "  All predicted vitals within thresholds.",
                MedicalTheme::success(),
            ))],
        ),
    };

    if let Some(outcome) = &state.alert_outcome {
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled("  Dispatch: ", MedicalTheme::text_secondary()),
            Span::styled(outcome.to_string(), MedicalTheme::outcome(outcome)),
        ]));
    }

    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_actions(f: &mut Frame, area: Rect, state: &DashboardState) {
    let model = state
        .model_info
        .clone()
        .unwrap_or_else(|| "not loaded".to_string());
    let model_style = if state.model_info.is_some() {
        MedicalTheme::success()
    } else {
        MedicalTheme::danger()
    };

    let lines = vec![
        Line::from(vec![
            Span::styled("Model: ", MedicalTheme::text_secondary()),
            Span::styled(model, model_style),
        ]),
        Line::from(vec![
            Span::styled("Refresh: ", MedicalTheme::text_secondary()),
            Span::styled(format!("every {}s", state.refresh_secs), MedicalTheme::text()),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("[R] ", MedicalTheme::key_hint()),
            Span::styled("Read aloud  ", MedicalTheme::key_desc()),
            Span::styled("[T] ", MedicalTheme::key_hint()),
            Span::styled("Retrain", MedicalTheme::key_desc()),
        ]),
        Line::from(vec![
            Span::styled("[Q] ", MedicalTheme::key_hint()),
            Span::styled("Quit", MedicalTheme::key_desc()),
        ]),
    ];

    f.render_widget(Paragraph::new(lines).block(panel("Status")), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_wraps() {
        let mut state = DashboardState {
            patient_ids: vec![3, 5, 9],
            ..DashboardState::default()
        };
        state.select_prev();
        assert_eq!(state.selected_patient(), Some(9));
        state.select_next();
        assert_eq!(state.selected_patient(), Some(3));

        let mut empty = DashboardState::default();
        empty.select_next();
        assert_eq!(empty.selected_patient(), None);
    }
}
