//! Appointments view: free slots and bookings.

use chrono::NaiveDateTime;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::domain::appointment::SLOT_FORMAT;
use crate::domain::Appointment;
use crate::tui::styles::MedicalTheme;

/// Days ahead offered for booking.
pub const SUGGEST_DAYS: u32 = 3;

/// Slots listed at once.
pub const SUGGEST_LIMIT: usize = 5;

#[derive(Debug, Default)]
pub struct AppointmentState {
    pub slots: Vec<NaiveDateTime>,
    pub selected: usize,
    pub bookings: Vec<Appointment>,
    pub confirmation: Option<String>,
}

impl AppointmentState {
    #[must_use]
    pub fn booked_slots(&self) -> Vec<NaiveDateTime> {
        self.bookings.iter().map(|a| a.slot).collect()
    }

    #[must_use]
    pub fn selected_slot(&self) -> Option<NaiveDateTime> {
        self.slots.get(self.selected).copied()
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.slots.len() {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// Replace the offered slots, keeping the cursor in range.
    pub fn set_slots(&mut self, slots: Vec<NaiveDateTime>) {
        self.slots = slots;
        self.selected = self.selected.min(self.slots.len().saturating_sub(1));
    }
}

pub fn render_appointments(
    f: &mut Frame,
    area: Rect,
    state: &AppointmentState,
    patient: Option<i64>,
) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    let title = match patient {
        Some(id) => format!(" Free Slots for Patient {id} "),
        None => " Free Slots ".to_string(),
    };
    let items: Vec<ListItem> = state
        .slots
        .iter()
        .map(|slot| ListItem::new(format!("  {}", slot.format(SLOT_FORMAT))))
        .collect();
    let list = List::new(items)
        .block(
            Block::default()
                .title(Span::styled(title, MedicalTheme::subtitle()))
                .borders(Borders::ALL)
                .border_style(MedicalTheme::border()),
        )
        .style(MedicalTheme::text())
        .highlight_style(MedicalTheme::selected())
        .highlight_symbol("▶");

    let mut list_state = ListState::default();
    if !state.slots.is_empty() {
        list_state.select(Some(state.selected));
    }
    f.render_stateful_widget(list, columns[0], &mut list_state);

    let mut lines = vec![Line::from(vec![
        Span::styled("[↑/↓] ", MedicalTheme::key_hint()),
        Span::styled("Choose  ", MedicalTheme::key_desc()),
        Span::styled("[Enter] ", MedicalTheme::key_hint()),
        Span::styled("Book", MedicalTheme::key_desc()),
    ])];
    if let Some(confirmation) = &state.confirmation {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(confirmation.clone(), MedicalTheme::success())));
    }
    lines.push(Line::from(""));
    for appointment in &state.bookings {
        lines.push(Line::from(vec![
            Span::styled(format!("{} ", appointment.appointment_id), MedicalTheme::info()),
            Span::styled(
                format!(
                    "patient {} at {}",
                    appointment.patient_id,
                    appointment.slot.format(SLOT_FORMAT)
                ),
                MedicalTheme::text(),
            ),
        ]));
    }

    let bookings = Paragraph::new(lines)
        .block(
            Block::default()
                .title(Span::styled(" Bookings ", MedicalTheme::subtitle()))
                .borders(Borders::ALL)
                .border_style(MedicalTheme::border()),
        )
        .wrap(Wrap { trim: true });
    f.render_widget(bookings, columns[1]);
}
