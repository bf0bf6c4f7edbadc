//! History view: vitals over time for the selected patient.

use chrono::NaiveDateTime;
use ratatui::{
    layout::Rect,
    style::Style,
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph},
    Frame,
};

use crate::domain::{VitalField, VitalRecord, FEATURE_COUNT};
use crate::tui::styles::MedicalTheme;

/// Chart-ready series for one patient. X is minutes since the first record.
#[derive(Debug, Default)]
pub struct HistoryState {
    pub patient_id: Option<i64>,
    pub first: Option<NaiveDateTime>,
    pub last: Option<NaiveDateTime>,
    pub series: [Vec<(f64, f64)>; FEATURE_COUNT],
}

impl HistoryState {
    /// Build from records in ascending time order.
    #[must_use]
    pub fn from_records(patient_id: i64, records: &[VitalRecord]) -> Self {
        let first = records.first().map(|r| r.timestamp);
        let mut series: [Vec<(f64, f64)>; FEATURE_COUNT] = Default::default();

        if let Some(origin) = first {
            for record in records {
                let x = (record.timestamp - origin).num_seconds() as f64 / 60.0;
                let vitals = record.vitals();
                for field in VitalField::ALL {
                    series[field.index()].push((x, vitals.get(field)));
                }
            }
        }

        Self {
            patient_id: Some(patient_id),
            first,
            last: records.last().map(|r| r.timestamp),
            series,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.series[0].len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.series[0].is_empty()
    }

    fn x_bounds(&self) -> [f64; 2] {
        let max = self.series[0].last().map_or(0.0, |p| p.0);
        [0.0, max.max(1.0)]
    }

    fn y_bounds(&self) -> [f64; 2] {
        let values = self.series.iter().flatten().map(|p| p.1);
        let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
        if lo.is_finite() && hi.is_finite() {
            [(lo - 5.0).floor(), (hi + 5.0).ceil()]
        } else {
            [0.0, 200.0]
        }
    }
}

pub fn render_history(f: &mut Frame, area: Rect, state: &HistoryState) {
    let title = match state.patient_id {
        Some(id) => format!(" Vitals History: Patient {id} "),
        None => " Vitals History ".to_string(),
    };
    let block = Block::default()
        .title(Span::styled(title, MedicalTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(MedicalTheme::border());

    if state.is_empty() {
        let empty = Paragraph::new(Line::from(Span::styled(
            "No history for this patient.",
            MedicalTheme::text_muted(),
        )))
        .block(block);
        f.render_widget(empty, area);
        return;
    }

    let datasets: Vec<Dataset> = VitalField::ALL
        .into_iter()
        .map(|field| {
            Dataset::default()
                .name(field.label())
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(MedicalTheme::series(field)))
                .data(&state.series[field.index()])
        })
        .collect();

    let [x0, x1] = state.x_bounds();
    let [y0, y1] = state.y_bounds();
    let stamp = |t: Option<NaiveDateTime>| {
        t.map_or_else(String::new, |t| t.format("%m-%d %H:%M").to_string())
    };
    let y_labels = vec![
        format!("{y0:.0}"),
        format!("{:.0}", (y0 + y1) / 2.0),
        format!("{y1:.0}"),
    ];

    let chart = Chart::new(datasets)
        .block(block)
        .x_axis(
            Axis::default()
                .title(Span::styled(
                    format!("minutes ({} records)", state.len()),
                    MedicalTheme::text_muted(),
                ))
                .style(MedicalTheme::text_secondary())
                .bounds([x0, x1])
                .labels(vec![stamp(state.first), stamp(state.last)]),
        )
        .y_axis(
            Axis::default()
                .style(MedicalTheme::text_secondary())
                .bounds([y0, y1])
                .labels(y_labels),
        );

    f.render_widget(chart, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(minute: u32, hr: i32, temp: f64) -> VitalRecord {
        VitalRecord {
            patient_id: 4,
            timestamp: NaiveDate::from_ymd_opt(2024, 5, 2)
                .and_then(|d| d.and_hms_opt(9, minute, 0))
                .expect("valid time"),
            heart_rate: hr,
            bp_systolic: 120,
            bp_diastolic: 80,
            oxygen_saturation: 97.0,
            temperature: temp,
        }
    }

    #[test]
    fn test_series_use_minutes_from_first_record() {
        let state = HistoryState::from_records(4, &[record(0, 70, 36.5), record(30, 75, 36.9)]);

        assert_eq!(state.len(), 2);
        assert_eq!(
            state.series[VitalField::HeartRate.index()],
            vec![(0.0, 70.0), (30.0, 75.0)]
        );
        assert_eq!(state.x_bounds(), [0.0, 30.0]);
        assert_eq!(state.y_bounds(), [31.0, 125.0]);
    }

    #[test]
    fn test_empty_history() {
        let state = HistoryState::from_records(4, &[]);
        assert!(state.is_empty());
        assert_eq!(state.y_bounds(), [0.0, 200.0]);
    }
}
