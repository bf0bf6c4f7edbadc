//! UI module: View components for the TUI.

pub mod appointments;
pub mod dashboard;
pub mod history;

use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs, Wrap},
    Frame,
};

use crate::tui::styles::MedicalTheme;

/// Severity of the status-bar message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Warning,
    Error,
}

/// One-line message shown under the tabs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub level: StatusLevel,
    pub text: String,
}

pub fn render_tabs(f: &mut Frame, area: Rect, titles: &[&str], selected: usize) {
    let tabs = Tabs::new(titles.iter().map(|t| Line::from(*t)).collect::<Vec<_>>())
        .block(
            Block::default()
                .title(Span::styled(" Vitalcast ", MedicalTheme::title()))
                .borders(Borders::BOTTOM)
                .border_style(MedicalTheme::border()),
        )
        .style(MedicalTheme::text_secondary())
        .highlight_style(MedicalTheme::selected())
        .select(selected)
        .divider(Span::styled("│", MedicalTheme::text_muted()));

    f.render_widget(tabs, area);
}

pub fn render_status(f: &mut Frame, area: Rect, status: Option<&StatusMessage>) {
    let line = match status {
        Some(msg) => {
            let style = match msg.level {
                StatusLevel::Info => MedicalTheme::info(),
                StatusLevel::Warning => MedicalTheme::warning(),
                StatusLevel::Error => MedicalTheme::danger(),
            };
            Line::from(Span::styled(format!(" {}", msg.text), style))
        }
        None => Line::from(vec![
            Span::styled(" [Tab/1-3] ", MedicalTheme::key_hint()),
            Span::styled("Switch view  ", MedicalTheme::key_desc()),
            Span::styled("[◀ ▶] ", MedicalTheme::key_hint()),
            Span::styled("Patient  ", MedicalTheme::key_desc()),
            Span::styled("[Q] ", MedicalTheme::key_hint()),
            Span::styled("Quit", MedicalTheme::key_desc()),
        ]),
    };
    f.render_widget(Paragraph::new(line).style(MedicalTheme::header()), area);
}

pub fn render_disclaimer(f: &mut Frame, area: Rect) {
    let text = vec![Line::from(vec![Span::styled(
        "DISCLAIMER: Forecasts are indicative estimates from a small model and do not replace clinical judgement.",
        MedicalTheme::text_muted(),
    )])];

    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(MedicalTheme::border());

    let p = Paragraph::new(text).block(block).wrap(Wrap { trim: true });

    f.render_widget(p, area);
}
