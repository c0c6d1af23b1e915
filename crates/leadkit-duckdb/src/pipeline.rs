use duckdb::Connection;

use leadkit_core::domain::{CreatePipelineRequest, Pipeline, Stage};
use leadkit_core::error::StoreError;

use crate::backend::generate_id;
use crate::store::{db_err, fetch_row, fetch_rows, update_row, FieldValue};
use crate::LeadStore;

fn map_stage(row: &duckdb::Row<'_>) -> duckdb::Result<Stage> {
    Ok(Stage {
        id: row.get(0)?,
        pipeline_id: row.get(1)?,
        name: row.get(2)?,
        position: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn stages_for_pipeline(conn: &Connection, pipeline_id: &str) -> Result<Vec<Stage>, StoreError> {
    fetch_rows(
        conn,
        "SELECT id, pipeline_id, name, position, CAST(created_at AS VARCHAR) \
         FROM stages WHERE pipeline_id = ?1 ORDER BY position",
        &[&pipeline_id],
        map_stage,
    )
}

pub(crate) fn get_pipeline_sync(
    conn: &Connection,
    org_id: &str,
    pipeline_id: &str,
) -> Result<Pipeline, StoreError> {
    let header = fetch_row(
        conn,
        "SELECT id, organization_id, name, CAST(created_at AS VARCHAR), CAST(updated_at AS VARCHAR) \
         FROM pipelines WHERE id = ?1 AND organization_id = ?2",
        &[&pipeline_id, &org_id],
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        },
    )?
    .ok_or_else(|| StoreError::not_found("pipeline"))?;

    let stages = stages_for_pipeline(conn, pipeline_id)?;
    Ok(Pipeline {
        id: header.0,
        organization_id: header.1,
        name: header.2,
        stages,
        created_at: header.3,
        updated_at: header.4,
    })
}

/// Verify that `stage_id` belongs to `pipeline_id`.
pub(crate) fn stage_in_pipeline_sync(
    conn: &Connection,
    pipeline_id: &str,
    stage_id: &str,
) -> Result<bool, StoreError> {
    let count: Option<i64> = fetch_row(
        conn,
        "SELECT COUNT(*) FROM stages WHERE id = ?1 AND pipeline_id = ?2",
        &[&stage_id, &pipeline_id],
        |row| row.get(0),
    )?;
    Ok(count.unwrap_or(0) > 0)
}

/// First stage (lowest position) of a pipeline.
pub(crate) fn first_stage_sync(
    conn: &Connection,
    pipeline_id: &str,
) -> Result<Option<String>, StoreError> {
    fetch_row(
        conn,
        "SELECT id FROM stages WHERE pipeline_id = ?1 ORDER BY position LIMIT 1",
        &[&pipeline_id],
        |row| row.get(0),
    )
}

impl LeadStore {
    /// Create a pipeline and its ordered stages in one transaction.
    pub async fn create_pipeline(
        &self,
        org_id: &str,
        req: CreatePipelineRequest,
    ) -> Result<Pipeline, StoreError> {
        if req.name.trim().is_empty() {
            return Err(StoreError::Validation("name must not be empty".to_string()));
        }
        if req.stages.is_empty() {
            return Err(StoreError::Validation(
                "a pipeline needs at least one stage".to_string(),
            ));
        }

        let mut conn = self.conn.lock().await;
        let tx = conn.transaction().map_err(db_err)?;
        let pipeline_id = generate_id("pipe");
        tx.execute(
            "INSERT INTO pipelines (id, organization_id, name) VALUES (?1, ?2, ?3)",
            duckdb::params![pipeline_id, org_id, req.name.trim()],
        )
        .map_err(db_err)?;
        for (position, stage_name) in req.stages.iter().enumerate() {
            if stage_name.trim().is_empty() {
                return Err(StoreError::Validation(
                    "stage names must not be empty".to_string(),
                ));
            }
            tx.execute(
                "INSERT INTO stages (id, pipeline_id, name, position) VALUES (?1, ?2, ?3, ?4)",
                duckdb::params![
                    generate_id("stg"),
                    pipeline_id,
                    stage_name.trim(),
                    position as i64
                ],
            )
            .map_err(db_err)?;
        }
        tx.commit().map_err(db_err)?;

        get_pipeline_sync(&conn, org_id, &pipeline_id)
    }

    pub async fn get_pipeline(&self, org_id: &str, id: &str) -> Result<Pipeline, StoreError> {
        let conn = self.conn.lock().await;
        get_pipeline_sync(&conn, org_id, id)
    }

    pub async fn list_pipelines(&self, org_id: &str) -> Result<Vec<Pipeline>, StoreError> {
        let conn = self.conn.lock().await;
        let ids: Vec<String> = fetch_rows(
            &conn,
            "SELECT id FROM pipelines WHERE organization_id = ?1 ORDER BY created_at, id",
            &[&org_id],
            |row| row.get(0),
        )?;
        let mut pipelines = Vec::with_capacity(ids.len());
        for id in ids {
            pipelines.push(get_pipeline_sync(&conn, org_id, &id)?);
        }
        Ok(pipelines)
    }

    pub async fn rename_pipeline(
        &self,
        org_id: &str,
        id: &str,
        name: &str,
    ) -> Result<Pipeline, StoreError> {
        if name.trim().is_empty() {
            return Err(StoreError::Validation("name must not be empty".to_string()));
        }
        let conn = self.conn.lock().await;
        let affected = update_row(
            &conn,
            "pipelines",
            &[("name", FieldValue::from(name.trim()))],
            "id = ?1 AND organization_id = ?2",
            &[FieldValue::from(id), FieldValue::from(org_id)],
        )?;
        if affected == 0 {
            return Err(StoreError::not_found("pipeline"));
        }
        get_pipeline_sync(&conn, org_id, id)
    }

    /// Delete a pipeline and its stages. Refused while deals still
    /// reference it — deals must be moved or deleted first.
    pub async fn delete_pipeline(&self, org_id: &str, id: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().await;
        get_pipeline_sync(&conn, org_id, id)?;
        let open_deals: Option<i64> = fetch_row(
            &conn,
            "SELECT COUNT(*) FROM deals WHERE pipeline_id = ?1 AND organization_id = ?2",
            &[&id, &org_id],
            |row| row.get(0),
        )?;
        if open_deals.unwrap_or(0) > 0 {
            return Err(StoreError::Validation(
                "pipeline still has deals; move or delete them first".to_string(),
            ));
        }
        let tx = conn.transaction().map_err(db_err)?;
        tx.execute(
            "DELETE FROM stages WHERE pipeline_id = ?1",
            duckdb::params![id],
        )
        .map_err(db_err)?;
        tx.execute(
            "DELETE FROM pipelines WHERE id = ?1 AND organization_id = ?2",
            duckdb::params![id, org_id],
        )
        .map_err(db_err)?;
        tx.commit().map_err(db_err)?;
        Ok(())
    }
}
