use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::{debug, warn};

use shared_database::{PostgrestQuery, SupabaseClient};

use crate::models::AppointmentError;

/// Finds appointments that already occupy an exact start time.
pub struct ConflictDetectionService {
    supabase: Arc<SupabaseClient>,
}

impl ConflictDetectionService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    pub async fn doctor_is_booked(
        &self,
        doctor_id: i64,
        date: NaiveDateTime,
        exclude_appointment_id: Option<i64>,
    ) -> Result<bool, AppointmentError> {
        self.is_booked("doctor_id", doctor_id, date, exclude_appointment_id).await
    }

    pub async fn patient_is_booked(
        &self,
        patient_id: i64,
        date: NaiveDateTime,
        exclude_appointment_id: Option<i64>,
    ) -> Result<bool, AppointmentError> {
        self.is_booked("patient_id", patient_id, date, exclude_appointment_id).await
    }

    async fn is_booked(
        &self,
        column: &str,
        id: i64,
        date: NaiveDateTime,
        exclude_appointment_id: Option<i64>,
    ) -> Result<bool, AppointmentError> {
        debug!("Checking {} {} for bookings at {}", column, id, date);

        let mut filter = PostgrestQuery::new()
            .eq(column, id)
            .eq("date", format_timestamp(date));
        if let Some(exclude) = exclude_appointment_id {
            filter = filter.neq("id", exclude);
        }

        let booked = self.supabase.exists("appointments", filter).await?;
        if booked {
            warn!("Conflict detected: {} {} is already booked at {}", column, id, date);
        }

        Ok(booked)
    }
}

/// Timestamp literal PostgREST compares against a `timestamp` column.
pub fn format_timestamp(date: NaiveDateTime) -> String {
    date.format("%Y-%m-%dT%H:%M:%S").to_string()
}
