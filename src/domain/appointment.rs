//! Appointment slot suggestion and booking.

use chrono::{Duration, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// First bookable hour of the day.
pub const FIRST_SLOT_HOUR: u32 = 9;

/// Last bookable hour of the day (inclusive).
pub const LAST_SLOT_HOUR: u32 = 16;

/// Display format for slots.
pub const SLOT_FORMAT: &str = "%Y-%m-%d %H:%M";

/// A booked appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub appointment_id: String,
    pub patient_id: i64,
    pub slot: NaiveDateTime,
}

impl Appointment {
    #[must_use]
    pub fn confirmation(&self) -> String {
        format!(
            "Appointment booked! ID: {} Patient ID: {} Slot: {}",
            self.appointment_id,
            self.patient_id,
            self.slot.format(SLOT_FORMAT)
        )
    }
}

/// Hourly slots from today over `days` days, skipping booked and past slots.
#[must_use]
pub fn suggest_slots(
    existing: &[NaiveDateTime],
    now: NaiveDateTime,
    days: u32,
    limit: usize,
) -> Vec<NaiveDateTime> {
    let today = now.date();
    (0..i64::from(days))
        .map(|d| today + Duration::days(d))
        .flat_map(|date| {
            (FIRST_SLOT_HOUR..=LAST_SLOT_HOUR)
                .filter_map(move |h| NaiveTime::from_hms_opt(h, 0, 0).map(|t| date.and_time(t)))
        })
        .filter(|slot| *slot >= now && !existing.contains(slot))
        .take(limit)
        .collect()
}

/// Book a slot for a patient.
#[must_use]
pub fn book_slot(patient_id: i64, slot: NaiveDateTime) -> Appointment {
    Appointment {
        appointment_id: short_id(),
        patient_id,
        slot,
    }
}

/// 8 lowercase hex characters from a CSPRNG.
fn short_id() -> String {
    use rand::Rng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    let mut rng = ChaCha20Rng::from_entropy();
    let bytes: [u8; 4] = rng.gen();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
