use std::sync::Arc;

use chrono::{Local, Months, NaiveDateTime, NaiveTime};
use serde_json::json;
use tracing::{debug, info};

use doctor_cell::{DoctorRow, DoctorService};
use shared_config::AppConfig;
use shared_database::{PostgrestQuery, SupabaseClient};
use shared_models::{NamedRef, PersonRef};

use crate::models::{
    AppointmentDto, AppointmentError, AppointmentFields, AppointmentRow,
    CreateAppointmentRequest, UpdateAppointmentRequest, APPOINTMENT_SELECT,
    MESSAGE_DATE_FORMAT,
};
use crate::services::conflict::ConflictDetectionService;

/// How far ahead an appointment may be booked, in years.
pub const MAX_BOOKING_YEARS: u32 = 50;

/// Rows an appointment points at, loaded while checking references.
struct BookingParties {
    doctor: DoctorRow,
    clinic: NamedRef,
    patient: PersonRef,
}

/// Which double-booking checks a write has to run.
#[derive(Debug, Clone, Copy)]
struct ClashChecks {
    doctor: bool,
    patient: bool,
}

pub struct BookingService {
    supabase: Arc<SupabaseClient>,
    doctors: DoctorService,
    conflicts: ConflictDetectionService,
}

impl BookingService {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));

        Self {
            conflicts: ConflictDetectionService::new(Arc::clone(&supabase)),
            doctors: DoctorService::new(config),
            supabase,
        }
    }

    pub async fn list_appointments(&self) -> Result<Vec<AppointmentDto>, AppointmentError> {
        debug!("Listing appointments");

        let query = PostgrestQuery::new().select(APPOINTMENT_SELECT).order("date").build();
        let rows: Vec<AppointmentRow> = self.supabase.select("appointments", &query).await?;

        Ok(rows.into_iter().map(AppointmentDto::from).collect())
    }

    pub async fn get_appointment(&self, appointment_id: i64) -> Result<AppointmentDto, AppointmentError> {
        debug!("Fetching appointment {}", appointment_id);

        self.find_appointment(appointment_id).await?
            .map(AppointmentDto::from)
            .ok_or(AppointmentError::NotFound(appointment_id))
    }

    pub async fn book_appointment(
        &self,
        request: CreateAppointmentRequest,
    ) -> Result<AppointmentDto, AppointmentError> {
        let fields = request.fields();
        debug!("Booking doctor {} for patient {} at {}", fields.doctor_id, fields.patient_id, fields.date);

        let explicit_id = request.id.filter(|id| *id != 0);
        if let Some(id) = explicit_id {
            if self.supabase.exists("appointments", PostgrestQuery::new().eq("id", id)).await? {
                return Err(AppointmentError::IdTaken(id));
            }
        }

        self.validate_booking(&fields, None, ClashChecks { doctor: true, patient: true }).await?;

        let mut row = json!(fields);
        if let Some(id) = explicit_id {
            row["id"] = json!(id);
        }

        let created: AppointmentRow = self.supabase.insert("appointments", row).await?;
        info!(
            "Appointment {} booked: doctor {} with patient {} at {}",
            created.id, created.doctor_id, created.patient_id, created.date
        );

        self.get_appointment(created.id).await
    }

    /// Applies a partial update and returns `(old, new)`.
    pub async fn update_appointment(
        &self,
        appointment_id: i64,
        request: UpdateAppointmentRequest,
    ) -> Result<(AppointmentDto, AppointmentDto), AppointmentError> {
        debug!("Updating appointment {}", appointment_id);

        if request.id.is_some_and(|body_id| body_id != 0 && body_id != appointment_id) {
            return Err(AppointmentError::IdMismatch);
        }

        let current = self.find_appointment(appointment_id).await?
            .ok_or(AppointmentError::NotFound(appointment_id))?;

        let stored = current.fields();
        let fields = request.merge_onto(&stored);

        let date_changed = fields.date != stored.date;
        let checks = ClashChecks {
            doctor: date_changed || fields.doctor_id != stored.doctor_id,
            patient: date_changed || fields.patient_id != stored.patient_id,
        };
        self.validate_booking(&fields, Some(appointment_id), checks).await?;

        let filter = PostgrestQuery::new().eq("id", appointment_id).build();
        self.supabase
            .update::<AppointmentRow>("appointments", &filter, json!(fields))
            .await?
            .ok_or(AppointmentError::NotFound(appointment_id))?;

        let updated = self.get_appointment(appointment_id).await?;
        info!("Appointment {} updated", appointment_id);

        Ok((AppointmentDto::from(current), updated))
    }

    pub async fn delete_appointment(&self, appointment_id: i64) -> Result<AppointmentDto, AppointmentError> {
        debug!("Deleting appointment {}", appointment_id);

        let appointment = self.get_appointment(appointment_id).await?;

        self.supabase
            .delete("appointments", &PostgrestQuery::new().eq("id", appointment_id).build())
            .await?;

        info!(
            "Appointment {} with patient '{}' at {} deleted",
            appointment.id, appointment.patient, appointment.date
        );
        Ok(appointment)
    }

    async fn find_appointment(&self, appointment_id: i64) -> Result<Option<AppointmentRow>, AppointmentError> {
        let query = PostgrestQuery::new()
            .select(APPOINTMENT_SELECT)
            .eq("id", appointment_id)
            .build();

        Ok(self.supabase.select_one("appointments", &query).await?)
    }

    /// Runs the booking rules in order: references, date window, doctor's
    /// clinic, then the double-booking checks selected by `checks`.
    async fn validate_booking(
        &self,
        fields: &AppointmentFields,
        exclude_appointment_id: Option<i64>,
        checks: ClashChecks,
    ) -> Result<(), AppointmentError> {
        let parties = self.load_parties(fields).await?;

        check_booking_window(fields.date, Local::now().date_naive().and_time(NaiveTime::default()))?;

        if !parties.doctor.works_at(fields.clinic_id) {
            return Err(AppointmentError::DoctorNotInClinic {
                doctor: parties.doctor.full_name(),
                clinic: parties.clinic.name,
            });
        }

        let when = fields.date.format(MESSAGE_DATE_FORMAT).to_string();

        if checks.doctor
            && self.conflicts.doctor_is_booked(fields.doctor_id, fields.date, exclude_appointment_id).await?
        {
            return Err(AppointmentError::DoctorDoubleBooked {
                doctor: parties.doctor.full_name(),
                date: when,
            });
        }

        if checks.patient
            && self.conflicts.patient_is_booked(fields.patient_id, fields.date, exclude_appointment_id).await?
        {
            return Err(AppointmentError::PatientDoubleBooked {
                patient: parties.patient.full_name(),
                date: when,
            });
        }

        Ok(())
    }

    async fn load_parties(&self, fields: &AppointmentFields) -> Result<BookingParties, AppointmentError> {
        let doctor = self.doctors.find_doctor(fields.doctor_id).await?
            .ok_or(AppointmentError::MissingReference { entity: "Doctor", id: fields.doctor_id })?;

        let category = PostgrestQuery::new().eq("id", fields.category_id);
        if !self.supabase.exists("categories", category).await? {
            return Err(AppointmentError::MissingReference { entity: "Category", id: fields.category_id });
        }

        let clinic_query = PostgrestQuery::new().select("name").eq("id", fields.clinic_id).build();
        let clinic: NamedRef = self.supabase.select_one("clinics", &clinic_query).await?
            .ok_or(AppointmentError::MissingReference { entity: "Clinic", id: fields.clinic_id })?;

        let patient_query = PostgrestQuery::new()
            .select("firstname,lastname")
            .eq("id", fields.patient_id)
            .build();
        let patient: PersonRef = self.supabase.select_one("patients", &patient_query).await?
            .ok_or(AppointmentError::MissingReference { entity: "Patient", id: fields.patient_id })?;

        Ok(BookingParties { doctor, clinic, patient })
    }
}

/// Checks `day_start <= date <= day_start + 50 years`.
pub fn check_booking_window(date: NaiveDateTime, day_start: NaiveDateTime) -> Result<(), AppointmentError> {
    if date < day_start {
        return Err(AppointmentError::DateOutOfRange(
            "Appointment date can not be in the past".to_string(),
        ));
    }

    let latest = day_start
        .checked_add_months(Months::new(MAX_BOOKING_YEARS * 12))
        .unwrap_or(NaiveDateTime::MAX);
    if date > latest {
        return Err(AppointmentError::DateOutOfRange(format!(
            "Appointment date can not be more than {} years ahead",
            MAX_BOOKING_YEARS
        )));
    }

    Ok(())
}
