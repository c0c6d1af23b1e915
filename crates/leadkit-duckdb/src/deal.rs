use duckdb::Connection;

use leadkit_core::domain::{CreateDealRequest, Deal, DealStatus, UpdateDealRequest};
use leadkit_core::error::StoreError;

use crate::backend::generate_id;
use crate::pipeline::{first_stage_sync, get_pipeline_sync, stage_in_pipeline_sync};
use crate::store::{db_err, fetch_row, paginate, update_row, FieldValue, Page, PageRequest};
use crate::LeadStore;

const DEAL_COLUMNS: &str = "id, organization_id, pipeline_id, stage_id, contact_id, title, \
     value, status, CAST(created_at AS VARCHAR), CAST(updated_at AS VARCHAR)";

fn map_deal(row: &duckdb::Row<'_>) -> duckdb::Result<Deal> {
    let status: String = row.get(7)?;
    Ok(Deal {
        id: row.get(0)?,
        organization_id: row.get(1)?,
        pipeline_id: row.get(2)?,
        stage_id: row.get(3)?,
        contact_id: row.get(4)?,
        title: row.get(5)?,
        value: row.get(6)?,
        status: DealStatus::parse(&status).unwrap_or_default(),
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn get_deal_sync(conn: &Connection, org_id: &str, id: &str) -> Result<Deal, StoreError> {
    let sql = format!("SELECT {DEAL_COLUMNS} FROM deals WHERE id = ?1 AND organization_id = ?2");
    fetch_row(conn, &sql, &[&id, &org_id], map_deal)?
        .ok_or_else(|| StoreError::not_found("deal"))
}

/// Optional list filters for deals.
#[derive(Debug, Clone, Default)]
pub struct DealFilter {
    pub status: Option<DealStatus>,
    pub pipeline_id: Option<String>,
}

impl LeadStore {
    /// Create a deal in its pipeline's first stage (or an explicit stage,
    /// which must belong to the pipeline). Appends the initial
    /// deal_stage_history row in the same transaction.
    pub async fn create_deal(
        &self,
        org_id: &str,
        req: CreateDealRequest,
    ) -> Result<Deal, StoreError> {
        if req.title.trim().is_empty() {
            return Err(StoreError::Validation("title must not be empty".to_string()));
        }
        let value = req.value.unwrap_or(0.0);
        if value < 0.0 {
            return Err(StoreError::Validation(
                "value must be non-negative".to_string(),
            ));
        }

        let mut conn = self.conn.lock().await;
        get_pipeline_sync(&conn, org_id, &req.pipeline_id)?;

        let stage_id = match req.stage_id {
            Some(stage_id) => {
                if !stage_in_pipeline_sync(&conn, &req.pipeline_id, &stage_id)? {
                    return Err(StoreError::Validation(
                        "stage does not belong to the pipeline".to_string(),
                    ));
                }
                stage_id
            }
            None => first_stage_sync(&conn, &req.pipeline_id)?
                .ok_or_else(|| StoreError::Validation("pipeline has no stages".to_string()))?,
        };

        if let Some(ref contact_id) = req.contact_id {
            let found: Option<i64> = fetch_row(
                &conn,
                "SELECT COUNT(*) FROM contacts WHERE id = ?1 AND organization_id = ?2",
                &[contact_id, &org_id],
                |row| row.get(0),
            )?;
            if found.unwrap_or(0) == 0 {
                return Err(StoreError::MissingReference { entity: "contact" });
            }
        }

        let id = generate_id("deal");
        let tx = conn.transaction().map_err(db_err)?;
        tx.execute(
            "INSERT INTO deals (id, organization_id, pipeline_id, stage_id, contact_id, title, value) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            duckdb::params![
                id,
                org_id,
                req.pipeline_id,
                stage_id,
                req.contact_id,
                req.title.trim(),
                value
            ],
        )
        .map_err(db_err)?;
        tx.execute(
            "INSERT INTO deal_stage_history (id, deal_id, stage_id) VALUES (?1, ?2, ?3)",
            duckdb::params![generate_id("dsh"), id, stage_id],
        )
        .map_err(db_err)?;
        tx.commit().map_err(db_err)?;

        get_deal_sync(&conn, org_id, &id)
    }

    pub async fn get_deal(&self, org_id: &str, id: &str) -> Result<Deal, StoreError> {
        let conn = self.conn.lock().await;
        get_deal_sync(&conn, org_id, id)
    }

    pub async fn list_deals(
        &self,
        org_id: &str,
        filter: &DealFilter,
        req: &PageRequest,
    ) -> Result<Page<Deal>, StoreError> {
        let conn = self.conn.lock().await;
        let mut filters: Vec<(&str, FieldValue)> =
            vec![("organization_id", FieldValue::from(org_id))];
        if let Some(ref status) = filter.status {
            filters.push(("status", FieldValue::from(status.as_str())));
        }
        if let Some(ref pipeline_id) = filter.pipeline_id {
            filters.push(("pipeline_id", FieldValue::from(pipeline_id.as_str())));
        }
        paginate(
            &conn,
            "deals",
            DEAL_COLUMNS,
            &filters,
            req,
            &["created_at", "updated_at", "value", "title"],
            map_deal,
        )
    }

    /// Partial update of title/value/contact. Blocked once the deal is
    /// closed (won or lost).
    pub async fn update_deal(
        &self,
        org_id: &str,
        id: &str,
        req: UpdateDealRequest,
    ) -> Result<Deal, StoreError> {
        let conn = self.conn.lock().await;
        let deal = get_deal_sync(&conn, org_id, id)?;
        if deal.status != DealStatus::Open {
            return Err(StoreError::invalid_transition(
                "deal",
                deal.status.as_str(),
                "update",
            ));
        }

        let mut fields: Vec<(&str, FieldValue)> = Vec::new();
        if let Some(title) = req.title {
            if title.trim().is_empty() {
                return Err(StoreError::Validation("title must not be empty".to_string()));
            }
            fields.push(("title", FieldValue::Text(title.trim().to_string())));
        }
        if let Some(value) = req.value {
            if value < 0.0 {
                return Err(StoreError::Validation(
                    "value must be non-negative".to_string(),
                ));
            }
            fields.push(("value", FieldValue::Float(value)));
        }
        if let Some(contact_id) = req.contact_id {
            let found: Option<i64> = fetch_row(
                &conn,
                "SELECT COUNT(*) FROM contacts WHERE id = ?1 AND organization_id = ?2",
                &[&contact_id, &org_id],
                |row| row.get(0),
            )?;
            if found.unwrap_or(0) == 0 {
                return Err(StoreError::MissingReference { entity: "contact" });
            }
            fields.push(("contact_id", FieldValue::Text(contact_id)));
        }
        if fields.is_empty() {
            return Err(StoreError::Validation("no fields to update".to_string()));
        }

        update_row(
            &conn,
            "deals",
            &fields,
            "id = ?1 AND organization_id = ?2",
            &[FieldValue::from(id), FieldValue::from(org_id)],
        )?;
        get_deal_sync(&conn, org_id, id)
    }

    /// Move an open deal to another stage of its pipeline; appends a
    /// deal_stage_history row in the same transaction.
    pub async fn move_deal_stage(
        &self,
        org_id: &str,
        id: &str,
        stage_id: &str,
    ) -> Result<Deal, StoreError> {
        let mut conn = self.conn.lock().await;
        let deal = get_deal_sync(&conn, org_id, id)?;
        if deal.status != DealStatus::Open {
            return Err(StoreError::invalid_transition(
                "deal",
                deal.status.as_str(),
                "move",
            ));
        }
        if !stage_in_pipeline_sync(&conn, &deal.pipeline_id, stage_id)? {
            return Err(StoreError::Validation(
                "stage does not belong to the deal's pipeline".to_string(),
            ));
        }
        if deal.stage_id == stage_id {
            return Ok(deal);
        }

        let tx = conn.transaction().map_err(db_err)?;
        tx.execute(
            "UPDATE deals SET stage_id = ?1, updated_at = CURRENT_TIMESTAMP \
             WHERE id = ?2 AND organization_id = ?3",
            duckdb::params![stage_id, id, org_id],
        )
        .map_err(db_err)?;
        tx.execute(
            "INSERT INTO deal_stage_history (id, deal_id, stage_id) VALUES (?1, ?2, ?3)",
            duckdb::params![generate_id("dsh"), id, stage_id],
        )
        .map_err(db_err)?;
        tx.commit().map_err(db_err)?;

        get_deal_sync(&conn, org_id, id)
    }

    /// Terminate an open deal as won or lost.
    pub async fn close_deal(
        &self,
        org_id: &str,
        id: &str,
        outcome: DealStatus,
    ) -> Result<Deal, StoreError> {
        if outcome == DealStatus::Open {
            return Err(StoreError::Validation(
                "close outcome must be 'won' or 'lost'".to_string(),
            ));
        }
        let conn = self.conn.lock().await;
        let deal = get_deal_sync(&conn, org_id, id)?;
        if deal.status != DealStatus::Open {
            return Err(StoreError::invalid_transition(
                "deal",
                deal.status.as_str(),
                "close",
            ));
        }
        update_row(
            &conn,
            "deals",
            &[("status", FieldValue::from(outcome.as_str()))],
            "id = ?1 AND organization_id = ?2",
            &[FieldValue::from(id), FieldValue::from(org_id)],
        )?;
        get_deal_sync(&conn, org_id, id)
    }

    pub async fn delete_deal(&self, org_id: &str, id: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().await;
        get_deal_sync(&conn, org_id, id)?;
        let tx = conn.transaction().map_err(db_err)?;
        tx.execute(
            "DELETE FROM deal_stage_history WHERE deal_id = ?1",
            duckdb::params![id],
        )
        .map_err(db_err)?;
        tx.execute(
            "DELETE FROM deals WHERE id = ?1 AND organization_id = ?2",
            duckdb::params![id, org_id],
        )
        .map_err(db_err)?;
        tx.commit().map_err(db_err)?;
        Ok(())
    }
}
