use duckdb::Connection;

use leadkit_core::domain::{
    CreateWorkflowRequest, ToggleResult, UpdateWorkflowRequest, Workflow, WorkflowStep,
};
use leadkit_core::error::StoreError;

use crate::backend::generate_id;
use crate::store::{
    db_err, delete_row, fetch_row, insert_row, paginate, update_row, FieldValue, Page, PageRequest,
};
use crate::LeadStore;

const WORKFLOW_COLUMNS: &str = "id, organization_id, name, trigger_type, steps, is_active, \
     CAST(created_at AS VARCHAR), CAST(updated_at AS VARCHAR)";

fn map_workflow(row: &duckdb::Row<'_>) -> duckdb::Result<Workflow> {
    let steps_raw: String = row.get(4)?;
    let steps: Vec<WorkflowStep> = serde_json::from_str(&steps_raw).unwrap_or_default();
    Ok(Workflow {
        id: row.get(0)?,
        organization_id: row.get(1)?,
        name: row.get(2)?,
        trigger_type: row.get(3)?,
        steps,
        is_active: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn get_workflow_sync(conn: &Connection, org_id: &str, id: &str) -> Result<Workflow, StoreError> {
    let sql =
        format!("SELECT {WORKFLOW_COLUMNS} FROM workflows WHERE id = ?1 AND organization_id = ?2");
    fetch_row(conn, &sql, &[&id, &org_id], map_workflow)?
        .ok_or_else(|| StoreError::not_found("workflow"))
}

fn steps_json(steps: &[WorkflowStep]) -> Result<String, StoreError> {
    serde_json::to_string(steps)
        .map_err(|e| StoreError::Validation(format!("invalid workflow steps: {e}")))
}

impl LeadStore {
    pub async fn create_workflow(
        &self,
        org_id: &str,
        req: CreateWorkflowRequest,
    ) -> Result<Workflow, StoreError> {
        if req.name.trim().is_empty() {
            return Err(StoreError::Validation("name must not be empty".to_string()));
        }
        if req.trigger_type.trim().is_empty() {
            return Err(StoreError::Validation(
                "trigger_type must not be empty".to_string(),
            ));
        }
        let steps = steps_json(&req.steps)?;

        let conn = self.conn.lock().await;
        let id = generate_id("wf");
        insert_row(
            &conn,
            "workflows",
            &[
                ("id", FieldValue::from(id.as_str())),
                ("organization_id", FieldValue::from(org_id)),
                ("name", FieldValue::from(req.name.trim())),
                ("trigger_type", FieldValue::from(req.trigger_type.trim())),
                ("steps", FieldValue::Text(steps)),
                ("is_active", FieldValue::Bool(false)),
            ],
        )?;
        get_workflow_sync(&conn, org_id, &id)
    }

    pub async fn get_workflow(&self, org_id: &str, id: &str) -> Result<Workflow, StoreError> {
        let conn = self.conn.lock().await;
        get_workflow_sync(&conn, org_id, id)
    }

    pub async fn list_workflows(
        &self,
        org_id: &str,
        active: Option<bool>,
        req: &PageRequest,
    ) -> Result<Page<Workflow>, StoreError> {
        let conn = self.conn.lock().await;
        let mut filters: Vec<(&str, FieldValue)> =
            vec![("organization_id", FieldValue::from(org_id))];
        if let Some(active) = active {
            filters.push(("is_active", FieldValue::Bool(active)));
        }
        paginate(
            &conn,
            "workflows",
            WORKFLOW_COLUMNS,
            &filters,
            req,
            &["created_at", "updated_at", "name"],
            map_workflow,
        )
    }

    pub async fn update_workflow(
        &self,
        org_id: &str,
        id: &str,
        req: UpdateWorkflowRequest,
    ) -> Result<Workflow, StoreError> {
        let conn = self.conn.lock().await;
        get_workflow_sync(&conn, org_id, id)?;

        let mut fields: Vec<(&str, FieldValue)> = Vec::new();
        if let Some(name) = req.name {
            fields.push(("name", FieldValue::Text(name)));
        }
        if let Some(trigger_type) = req.trigger_type {
            fields.push(("trigger_type", FieldValue::Text(trigger_type)));
        }
        if let Some(ref steps) = req.steps {
            fields.push(("steps", FieldValue::Text(steps_json(steps)?)));
        }
        if fields.is_empty() {
            return Err(StoreError::Validation("no fields to update".to_string()));
        }

        update_row(
            &conn,
            "workflows",
            &fields,
            "id = ?1 AND organization_id = ?2",
            &[FieldValue::from(id), FieldValue::from(org_id)],
        )?;
        get_workflow_sync(&conn, org_id, id)
    }

    /// Idempotent flip. Asking for the state the workflow is already in is
    /// not an error, it just reports `changed: false` and skips the write.
    pub async fn set_workflow_active(
        &self,
        org_id: &str,
        id: &str,
        active: bool,
    ) -> Result<ToggleResult, StoreError> {
        let conn = self.conn.lock().await;
        let workflow = get_workflow_sync(&conn, org_id, id)?;
        if workflow.is_active == active {
            return Ok(ToggleResult {
                is_active: active,
                changed: false,
            });
        }
        conn.execute(
            "UPDATE workflows SET is_active = ?1, updated_at = CURRENT_TIMESTAMP \
             WHERE id = ?2 AND organization_id = ?3",
            duckdb::params![active, id, org_id],
        )
        .map_err(db_err)?;
        Ok(ToggleResult {
            is_active: active,
            changed: true,
        })
    }

    pub async fn delete_workflow(&self, org_id: &str, id: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock().await;
        let deleted = delete_row(
            &conn,
            "workflows",
            "id = ?1 AND organization_id = ?2",
            &[FieldValue::from(id), FieldValue::from(org_id)],
        )?;
        if deleted == 0 {
            return Err(StoreError::not_found("workflow"));
        }
        Ok(())
    }
}
