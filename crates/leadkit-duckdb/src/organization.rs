use leadkit_core::domain::Organization;
use leadkit_core::error::StoreError;

use crate::backend::generate_id;
use crate::store::{fetch_row, insert_row, update_row, FieldValue};
use crate::LeadStore;

const ORG_COLUMNS: &str =
    "id, name, CAST(created_at AS VARCHAR), CAST(updated_at AS VARCHAR)";

fn map_org(row: &duckdb::Row<'_>) -> duckdb::Result<Organization> {
    Ok(Organization {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: row.get(2)?,
        updated_at: row.get(3)?,
    })
}

impl LeadStore {
    pub async fn create_organization(&self, name: &str) -> Result<Organization, StoreError> {
        if name.trim().is_empty() {
            return Err(StoreError::Validation("name must not be empty".to_string()));
        }
        let conn = self.conn.lock().await;
        let id = generate_id("org");
        insert_row(
            &conn,
            "organizations",
            &[
                ("id", FieldValue::from(id.as_str())),
                ("name", FieldValue::from(name.trim())),
            ],
        )?;
        let sql = format!("SELECT {ORG_COLUMNS} FROM organizations WHERE id = ?1");
        fetch_row(&conn, &sql, &[&id], map_org)?
            .ok_or_else(|| StoreError::not_found("organization"))
    }

    pub async fn get_organization(&self, org_id: &str) -> Result<Organization, StoreError> {
        let conn = self.conn.lock().await;
        let sql = format!("SELECT {ORG_COLUMNS} FROM organizations WHERE id = ?1");
        fetch_row(&conn, &sql, &[&org_id], map_org)?
            .ok_or_else(|| StoreError::not_found("organization"))
    }

    pub async fn rename_organization(
        &self,
        org_id: &str,
        name: &str,
    ) -> Result<Organization, StoreError> {
        if name.trim().is_empty() {
            return Err(StoreError::Validation("name must not be empty".to_string()));
        }
        let conn = self.conn.lock().await;
        let affected = update_row(
            &conn,
            "organizations",
            &[("name", FieldValue::from(name.trim()))],
            "id = ?1",
            &[FieldValue::from(org_id)],
        )?;
        if affected == 0 {
            return Err(StoreError::not_found("organization"));
        }
        let sql = format!("SELECT {ORG_COLUMNS} FROM organizations WHERE id = ?1");
        fetch_row(&conn, &sql, &[&org_id], map_org)?
            .ok_or_else(|| StoreError::not_found("organization"))
    }
}
