use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::debug;

use doctor_cell::DoctorService;
use shared_config::AppConfig;
use shared_database::{PostgrestQuery, SupabaseClient};

use crate::models::{AppointmentError, AvailableSlotsResponse, BookedTime, TimeSlot};
use crate::services::conflict::format_timestamp;

/// Bookable times of a working day: `[start, end)` in fixed steps,
/// minus a `[break_start, break_end)` pause.
#[derive(Debug, Clone)]
pub struct SlotSchedule {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub break_start: NaiveTime,
    pub break_end: NaiveTime,
    pub step_minutes: i64,
}

impl Default for SlotSchedule {
    fn default() -> Self {
        Self {
            start: hm(9, 0),
            end: hm(14, 0),
            break_start: hm(11, 0),
            break_end: hm(12, 0),
            step_minutes: 15,
        }
    }
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default()
}

impl SlotSchedule {
    /// Every slot of `day`, numbered from 1.
    pub fn day_slots(&self, day: NaiveDate) -> Vec<TimeSlot> {
        let step = Duration::minutes(self.step_minutes.max(1));
        let mut slots = Vec::new();
        let mut time = self.start;

        while time < self.end {
            let on_break = time >= self.break_start && time < self.break_end;
            if !on_break {
                slots.push(TimeSlot {
                    id: slots.len() + 1,
                    date: day.and_time(time),
                });
            }

            let (next, wrapped) = time.overflowing_add_signed(step);
            if wrapped != 0 {
                break;
            }
            time = next;
        }

        slots
    }

    /// Slots of `day` that are not in `booked`.
    pub fn free_slots(&self, day: NaiveDate, booked: &[NaiveDateTime]) -> Vec<TimeSlot> {
        self.day_slots(day)
            .into_iter()
            .filter(|slot| !booked.contains(&slot.date))
            .collect()
    }
}

pub struct SlotService {
    supabase: Arc<SupabaseClient>,
    doctors: DoctorService,
    schedule: SlotSchedule,
}

impl SlotService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
            doctors: DoctorService::new(config),
            schedule: SlotSchedule::default(),
        }
    }

    pub async fn available_slots(
        &self,
        doctor_id: i64,
        day: NaiveDate,
    ) -> Result<AvailableSlotsResponse, AppointmentError> {
        debug!("Computing free slots for doctor {} on {}", doctor_id, day);

        if self.doctors.find_doctor(doctor_id).await?.is_none() {
            return Err(AppointmentError::DoctorNotFound(doctor_id));
        }

        let booked = self.booked_times(doctor_id, day).await?;
        let available_slots = self.schedule.free_slots(day, &booked);

        Ok(AvailableSlotsResponse {
            doctor_id,
            date: day,
            total: available_slots.len(),
            available_slots,
        })
    }

    async fn booked_times(&self, doctor_id: i64, day: NaiveDate) -> Result<Vec<NaiveDateTime>, AppointmentError> {
        let day_start = day.and_time(NaiveTime::default());
        let next_day = day.succ_opt()
            .ok_or_else(|| AppointmentError::ValidationError(format!("Date {} is out of range", day)))?
            .and_time(NaiveTime::default());

        let query = PostgrestQuery::new()
            .select("date")
            .eq("doctor_id", doctor_id)
            .gte("date", format_timestamp(day_start))
            .lt("date", format_timestamp(next_day))
            .build();

        let rows: Vec<BookedTime> = self.supabase.select("appointments", &query).await?;
        Ok(rows.into_iter().map(|row| row.date).collect())
    }
}
