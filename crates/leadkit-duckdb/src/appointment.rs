use duckdb::Connection;

use leadkit_core::domain::{
    Appointment, AppointmentStatus, CreateAppointmentRequest, UpdateAppointmentRequest,
};
use leadkit_core::error::StoreError;

use crate::backend::generate_id;
use crate::contact::get_contact_sync;
use crate::store::{
    db_err, delete_row, fetch_row, insert_row, paginate, update_row, FieldValue, Page, PageRequest,
};
use crate::LeadStore;

const APPOINTMENT_COLUMNS: &str = "id, organization_id, contact_id, title, \
     CAST(starts_at AS VARCHAR), CAST(ends_at AS VARCHAR), status, notes, \
     CAST(created_at AS VARCHAR), CAST(updated_at AS VARCHAR)";

fn map_appointment(row: &duckdb::Row<'_>) -> duckdb::Result<Appointment> {
    let status: String = row.get(6)?;
    Ok(Appointment {
        id: row.get(0)?,
        organization_id: row.get(1)?,
        contact_id: row.get(2)?,
        title: row.get(3)?,
        starts_at: row.get(4)?,
        ends_at: row.get(5)?,
        status: AppointmentStatus::parse(&status).unwrap_or_default(),
        notes: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn get_appointment_sync(
    conn: &Connection,
    org_id: &str,
    id: &str,
) -> Result<Appointment, StoreError> {
    let sql = format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1 AND organization_id = ?2"
    );
    fetch_row(conn, &sql, &[&id, &org_id], map_appointment)?
        .ok_or_else(|| StoreError::not_found("appointment"))
}

fn set_status(
    conn: &Connection,
    org_id: &str,
    id: &str,
    status: AppointmentStatus,
) -> Result<(), StoreError> {
    conn.execute(
        "UPDATE appointments SET status = ?1, updated_at = CURRENT_TIMESTAMP \
         WHERE id = ?2 AND organization_id = ?3",
        duckdb::params![status.as_str(), id, org_id],
    )
    .map_err(db_err)?;
    Ok(())
}

impl LeadStore {
    pub async fn create_appointment(
        &self,
        org_id: &str,
        req: CreateAppointmentRequest,
    ) -> Result<Appointment, StoreError> {
        if req.title.trim().is_empty() {
            return Err(StoreError::Validation(
                "title must not be empty".to_string(),
            ));
        }
        if req.ends_at <= req.starts_at {
            return Err(StoreError::Validation(
                "ends_at must be after starts_at".to_string(),
            ));
        }

        let conn = self.conn.lock().await;
        if let Some(ref contact_id) = req.contact_id {
            get_contact_sync(&conn, org_id, contact_id)
                .map_err(|_| StoreError::MissingReference { entity: "contact" })?;
        }

        let id = generate_id("appt");
        insert_row(
            &conn,
            "appointments",
            &[
                ("id", FieldValue::from(id.as_str())),
                ("organization_id", FieldValue::from(org_id)),
                ("contact_id", FieldValue::from(req.contact_id)),
                ("title", FieldValue::from(req.title.trim())),
                ("starts_at", FieldValue::Text(req.starts_at)),
                ("ends_at", FieldValue::Text(req.ends_at)),
                (
                    "status",
                    FieldValue::from(AppointmentStatus::Scheduled.as_str()),
                ),
                ("notes", FieldValue::from(req.notes)),
            ],
        )?;
        get_appointment_sync(&conn, org_id, &id)
    }

    pub async fn get_appointment(&self, org_id: &str, id: &str) -> Result<Appointment, StoreError> {
        let conn = self.conn.lock().await;
        get_appointment_sync(&conn, org_id, id)
    }

    pub async fn list_appointments(
        &self,
        org_id: &str,
        status: Option<AppointmentStatus>,
        contact_id: Option<String>,
        req: &PageRequest,
    ) -> Result<Page<Appointment>, StoreError> {
        let conn = self.conn.lock().await;
        let mut filters: Vec<(&str, FieldValue)> =
            vec![("organization_id", FieldValue::from(org_id))];
        if let Some(ref status) = status {
            filters.push(("status", FieldValue::from(status.as_str())));
        }
        if let Some(ref contact_id) = contact_id {
            filters.push(("contact_id", FieldValue::from(contact_id.as_str())));
        }
        paginate(
            &conn,
            "appointments",
            APPOINTMENT_COLUMNS,
            &filters,
            req,
            &["starts_at", "created_at", "updated_at", "status"],
            map_appointment,
        )
    }

    /// Reschedule or edit. Terminal appointments (cancelled, completed)
    /// reject any update.
    pub async fn update_appointment(
        &self,
        org_id: &str,
        id: &str,
        req: UpdateAppointmentRequest,
    ) -> Result<Appointment, StoreError> {
        let conn = self.conn.lock().await;
        let appt = get_appointment_sync(&conn, org_id, id)?;
        if appt.status.is_terminal() {
            return Err(StoreError::invalid_transition(
                "appointment",
                appt.status.as_str(),
                "update",
            ));
        }

        let starts = req.starts_at.clone().unwrap_or_else(|| appt.starts_at.clone());
        let ends = req.ends_at.clone().unwrap_or_else(|| appt.ends_at.clone());
        if ends <= starts {
            return Err(StoreError::Validation(
                "ends_at must be after starts_at".to_string(),
            ));
        }

        let mut fields: Vec<(&str, FieldValue)> = Vec::new();
        if let Some(title) = req.title {
            fields.push(("title", FieldValue::Text(title)));
        }
        if let Some(starts_at) = req.starts_at {
            fields.push(("starts_at", FieldValue::Text(starts_at)));
        }
        if let Some(ends_at) = req.ends_at {
            fields.push(("ends_at", FieldValue::Text(ends_at)));
        }
        if let Some(notes) = req.notes {
            fields.push(("notes", FieldValue::Text(notes)));
        }
        if fields.is_empty() {
            return Err(StoreError::Validation("no fields to update".to_string()));
        }

        update_row(
            &conn,
            "appointments",
            &fields,
            "id = ?1 AND organization_id = ?2",
            &[FieldValue::from(id), FieldValue::from(org_id)],
        )?;
        get_appointment_sync(&conn, org_id, id)
    }

    /// scheduled → confirmed.
    pub async fn confirm_appointment(
        &self,
        org_id: &str,
        id: &str,
    ) -> Result<Appointment, StoreError> {
        let conn = self.conn.lock().await;
        let appt = get_appointment_sync(&conn, org_id, id)?;
        if appt.status != AppointmentStatus::Scheduled {
            return Err(StoreError::invalid_transition(
                "appointment",
                appt.status.as_str(),
                "confirm",
            ));
        }
        set_status(&conn, org_id, id, AppointmentStatus::Confirmed)?;
        get_appointment_sync(&conn, org_id, id)
    }

    /// scheduled|confirmed → cancelled.
    pub async fn cancel_appointment(
        &self,
        org_id: &str,
        id: &str,
    ) -> Result<Appointment, StoreError> {
        let conn = self.conn.lock().await;
        let appt = get_appointment_sync(&conn, org_id, id)?;
        if appt.status.is_terminal() {
            return Err(StoreError::invalid_transition(
                "appointment",
                appt.status.as_str(),
                "cancel",
            ));
        }
        set_status(&conn, org_id, id, AppointmentStatus::Cancelled)?;
        get_appointment_sync(&conn, org_id, id)
    }

    /// scheduled|confirmed → completed.
    pub async fn complete_appointment(
        &self,
        org_id: &str,
        id: &str,
    ) -> Result<Appointment, StoreError> {
        let conn = self.conn.lock().await;
        let appt = get_appointment_sync(&conn, org_id, id)?;
        if appt.status.is_terminal() {
            return Err(StoreError::invalid_transition(
                "appointment",
                appt.status.as_str(),
                "complete",
            ));
        }
        set_status(&conn, org_id, id, AppointmentStatus::Completed)?;
        get_appointment_sync(&conn, org_id, id)
    }

    pub async fn delete_appointment(&self, org_id: &str, id: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock().await;
        let deleted = delete_row(
            &conn,
            "appointments",
            "id = ?1 AND organization_id = ?2",
            &[FieldValue::from(id), FieldValue::from(org_id)],
        )?;
        if deleted == 0 {
            return Err(StoreError::not_found("appointment"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LeadStore;

    async fn scheduled_appointment() -> (LeadStore, String, String) {
        let store = LeadStore::open_in_memory().unwrap();
        let org = store.create_organization("Acme").await.unwrap();
        let appt = store
            .create_appointment(
                &org.id,
                CreateAppointmentRequest {
                    contact_id: None,
                    title: "demo call".into(),
                    starts_at: "2026-09-01 10:00:00".into(),
                    ends_at: "2026-09-01 10:30:00".into(),
                    notes: None,
                },
            )
            .await
            .unwrap();
        (store, org.id, appt.id)
    }

    #[tokio::test]
    async fn lifecycle_happy_path() {
        let (store, org, id) = scheduled_appointment().await;
        let confirmed = store.confirm_appointment(&org, &id).await.unwrap();
        assert_eq!(confirmed.status, AppointmentStatus::Confirmed);
        let done = store.complete_appointment(&org, &id).await.unwrap();
        assert_eq!(done.status, AppointmentStatus::Completed);
    }

    #[tokio::test]
    async fn complete_works_straight_from_scheduled() {
        let (store, org, id) = scheduled_appointment().await;
        let done = store.complete_appointment(&org, &id).await.unwrap();
        assert_eq!(done.status, AppointmentStatus::Completed);
    }

    #[tokio::test]
    async fn complete_blocked_once_cancelled() {
        let (store, org, id) = scheduled_appointment().await;
        store.cancel_appointment(&org, &id).await.unwrap();
        let err = store.complete_appointment(&org, &id).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn cancelled_blocks_update() {
        let (store, org, id) = scheduled_appointment().await;
        store.cancel_appointment(&org, &id).await.unwrap();
        let err = store
            .update_appointment(
                &org,
                &id,
                UpdateAppointmentRequest {
                    title: Some("late rename".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn end_before_start_rejected() {
        let store = LeadStore::open_in_memory().unwrap();
        let org = store.create_organization("Acme").await.unwrap();
        let err = store
            .create_appointment(
                &org.id,
                CreateAppointmentRequest {
                    contact_id: None,
                    title: "backwards".into(),
                    starts_at: "2026-09-01 11:00:00".into(),
                    ends_at: "2026-09-01 10:00:00".into(),
                    notes: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }
}
