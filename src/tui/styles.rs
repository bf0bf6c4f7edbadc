//! Medical-themed color palette and styles.

use ratatui::style::{Color, Modifier, Style};

use crate::application::AlertOutcome;
use crate::domain::VitalField;

/// Medical theme color palette.
pub struct MedicalTheme;

impl MedicalTheme {
    /// Deep teal (#0D9488)
    pub const PRIMARY: Color = Color::Rgb(13, 148, 136);
    /// #2DD4BF
    pub const PRIMARY_LIGHT: Color = Color::Rgb(45, 212, 191);
    /// #0F766E
    pub const PRIMARY_DARK: Color = Color::Rgb(15, 118, 110);
    /// Light slate for borders (#94A3B8)
    pub const SECONDARY_LIGHT: Color = Color::Rgb(148, 163, 184);

    pub const SUCCESS: Color = Color::Rgb(16, 185, 129);
    pub const WARNING: Color = Color::Rgb(251, 191, 36);
    pub const DANGER: Color = Color::Rgb(244, 63, 94);
    pub const INFO: Color = Color::Rgb(59, 130, 246);

    /// #0F172A
    pub const BG_DARK: Color = Color::Rgb(15, 23, 42);

    pub const TEXT_PRIMARY: Color = Color::Rgb(248, 250, 252);
    pub const TEXT_SECONDARY: Color = Color::Rgb(148, 163, 184);
    pub const TEXT_MUTED: Color = Color::Rgb(100, 116, 139);

    #[must_use]
    pub fn title() -> Style {
        Style::default()
            .fg(Self::TEXT_PRIMARY)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn subtitle() -> Style {
        Style::default()
            .fg(Self::PRIMARY_LIGHT)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn text() -> Style {
        Style::default().fg(Self::TEXT_PRIMARY)
    }

    #[must_use]
    pub fn text_secondary() -> Style {
        Style::default().fg(Self::TEXT_SECONDARY)
    }

    #[must_use]
    pub fn text_muted() -> Style {
        Style::default().fg(Self::TEXT_MUTED)
    }

    #[must_use]
    pub fn success() -> Style {
        Style::default().fg(Self::SUCCESS)
    }

    #[must_use]
    pub fn warning() -> Style {
        Style::default().fg(Self::WARNING)
    }

    #[must_use]
    pub fn danger() -> Style {
        Style::default().fg(Self::DANGER)
    }

    #[must_use]
    pub fn info() -> Style {
        Style::default().fg(Self::INFO)
    }

    /// Highlighted list row / active tab
    #[must_use]
    pub fn selected() -> Style {
        Style::default()
            .fg(Self::BG_DARK)
            .bg(Self::PRIMARY)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn border() -> Style {
        Style::default().fg(Self::SECONDARY_LIGHT)
    }

    #[must_use]
    pub fn border_alert() -> Style {
        Style::default().fg(Self::DANGER)
    }

    #[must_use]
    pub fn header() -> Style {
        Style::default()
            .fg(Self::TEXT_PRIMARY)
            .bg(Self::PRIMARY_DARK)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn key_hint() -> Style {
        Style::default()
            .fg(Self::PRIMARY_LIGHT)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn key_desc() -> Style {
        Style::default().fg(Self::TEXT_SECONDARY)
    }

    /// Predicted value, red when it crosses its threshold.
    #[must_use]
    pub fn predicted(violates: bool) -> Style {
        if violates {
            Self::danger().add_modifier(Modifier::BOLD)
        } else {
            Self::success()
        }
    }

    #[must_use]
    pub fn outcome(outcome: &AlertOutcome) -> Style {
        match outcome {
            AlertOutcome::NoAlert => Self::success(),
            AlertOutcome::Sent => Self::info(),
            AlertOutcome::NotConfigured => Self::warning(),
            AlertOutcome::SendFailed(_) => Self::danger(),
        }
    }

    /// Line color for a vital in the history chart.
    #[must_use]
    pub fn series(field: VitalField) -> Color {
        match field {
            VitalField::HeartRate => Self::DANGER,
            VitalField::BpSystolic => Self::INFO,
            VitalField::BpDiastolic => Self::PRIMARY_LIGHT,
            VitalField::OxygenSaturation => Self::SUCCESS,
            VitalField::Temperature => Self::WARNING,
        }
    }
}
