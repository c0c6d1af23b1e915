use leadkit_core::domain::{AnalyticsEvent, RecordEventRequest};
use leadkit_core::error::StoreError;

use crate::contact::get_contact_sync;
use crate::store::{fetch_row, insert_row, FieldValue};
use crate::LeadStore;

const EVENT_COLUMNS: &str = "id, organization_id, user_id, contact_id, event_type, event_data, \
     source, campaign, CAST(created_at AS VARCHAR)";

fn map_event(row: &duckdb::Row<'_>) -> duckdb::Result<AnalyticsEvent> {
    let data_raw: Option<String> = row.get(5)?;
    Ok(AnalyticsEvent {
        id: row.get(0)?,
        organization_id: row.get(1)?,
        user_id: row.get(2)?,
        contact_id: row.get(3)?,
        event_type: row.get(4)?,
        event_data: data_raw.and_then(|raw| serde_json::from_str(&raw).ok()),
        source: row.get(6)?,
        campaign: row.get(7)?,
        created_at: row.get(8)?,
    })
}

impl LeadStore {
    /// Append one row to the analytics fact table. Events are immutable;
    /// there is no update or delete path.
    pub async fn record_event(
        &self,
        org_id: &str,
        user_id: Option<&str>,
        req: RecordEventRequest,
    ) -> Result<AnalyticsEvent, StoreError> {
        if req.event_type.trim().is_empty() {
            return Err(StoreError::Validation(
                "event_type must not be empty".to_string(),
            ));
        }
        let event_data = match req.event_data {
            Some(ref value) => Some(
                serde_json::to_string(value)
                    .map_err(|e| StoreError::Validation(format!("invalid event_data: {e}")))?,
            ),
            None => None,
        };

        let conn = self.conn.lock().await;
        if let Some(ref contact_id) = req.contact_id {
            get_contact_sync(&conn, org_id, contact_id)
                .map_err(|_| StoreError::MissingReference { entity: "contact" })?;
        }

        let id = uuid::Uuid::new_v4().to_string();
        insert_row(
            &conn,
            "analytics_events",
            &[
                ("id", FieldValue::from(id.as_str())),
                ("organization_id", FieldValue::from(org_id)),
                ("user_id", FieldValue::from(user_id.map(str::to_owned))),
                ("contact_id", FieldValue::from(req.contact_id)),
                ("event_type", FieldValue::from(req.event_type.trim())),
                (
                    "event_data",
                    match event_data {
                        Some(json) => FieldValue::Text(json),
                        None => FieldValue::Null,
                    },
                ),
                ("source", FieldValue::from(req.source)),
                ("campaign", FieldValue::from(req.campaign)),
            ],
        )?;

        let sql = format!("SELECT {EVENT_COLUMNS} FROM analytics_events WHERE id = ?1");
        fetch_row(&conn, &sql, &[&id.as_str()], map_event)?
            .ok_or_else(|| StoreError::not_found("event"))
    }

    pub async fn event_count(&self, org_id: &str) -> Result<i64, StoreError> {
        let conn = self.conn.lock().await;
        fetch_row(
            &conn,
            "SELECT COUNT(*) FROM analytics_events WHERE organization_id = ?1",
            &[&org_id],
            |row| row.get(0),
        )?
        .ok_or_else(|| StoreError::Database("count query returned no rows".to_string()))
    }
}
