use duckdb::Connection;

use leadkit_core::domain::{
    CreateFormRequest, Form, FormField, FormSubmission, UpdateFormRequest,
};
use leadkit_core::error::StoreError;

use crate::backend::generate_id;
use crate::contact::upsert_contact_sync;
use crate::store::{
    db_err, fetch_row, fetch_rows, insert_row, paginate, update_row, FieldValue, Page, PageRequest,
};
use crate::LeadStore;

const FORM_COLUMNS: &str =
    "id, organization_id, name, fields, CAST(created_at AS VARCHAR), CAST(updated_at AS VARCHAR)";

const SUBMISSION_COLUMNS: &str =
    "id, form_id, organization_id, payload, contact_id, CAST(created_at AS VARCHAR)";

fn map_form(row: &duckdb::Row<'_>) -> duckdb::Result<Form> {
    let fields_raw: String = row.get(3)?;
    let fields: Vec<FormField> = serde_json::from_str(&fields_raw).unwrap_or_default();
    Ok(Form {
        id: row.get(0)?,
        organization_id: row.get(1)?,
        name: row.get(2)?,
        fields,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn map_submission(row: &duckdb::Row<'_>) -> duckdb::Result<FormSubmission> {
    let payload_raw: String = row.get(3)?;
    Ok(FormSubmission {
        id: row.get(0)?,
        form_id: row.get(1)?,
        organization_id: row.get(2)?,
        payload: serde_json::from_str(&payload_raw).unwrap_or(serde_json::Value::Null),
        contact_id: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn get_form_sync(conn: &Connection, org_id: &str, id: &str) -> Result<Form, StoreError> {
    let sql = format!("SELECT {FORM_COLUMNS} FROM forms WHERE id = ?1 AND organization_id = ?2");
    fetch_row(conn, &sql, &[&id, &org_id], map_form)?.ok_or_else(|| StoreError::not_found("form"))
}

fn validate_field_defs(fields: &[FormField]) -> Result<String, StoreError> {
    if fields.is_empty() {
        return Err(StoreError::Validation(
            "form must define at least one field".to_string(),
        ));
    }
    let mut seen = std::collections::HashSet::new();
    for field in fields {
        if field.name.trim().is_empty() {
            return Err(StoreError::Validation(
                "field name must not be empty".to_string(),
            ));
        }
        if !seen.insert(field.name.as_str()) {
            return Err(StoreError::Validation(format!(
                "duplicate field name '{}'",
                field.name
            )));
        }
    }
    serde_json::to_string(fields)
        .map_err(|e| StoreError::Validation(format!("invalid form fields: {e}")))
}

/// Check a submitted payload against the form's field definitions: every
/// required field must be present and non-empty, and no unknown keys are
/// accepted.
fn validate_payload(
    fields: &[FormField],
    payload: &serde_json::Value,
) -> Result<(), StoreError> {
    let obj = payload.as_object().ok_or_else(|| {
        StoreError::Validation("submission payload must be a JSON object".to_string())
    })?;

    for field in fields {
        if !field.required {
            continue;
        }
        let missing = match obj.get(&field.name) {
            None | Some(serde_json::Value::Null) => true,
            Some(serde_json::Value::String(s)) => s.trim().is_empty(),
            Some(_) => false,
        };
        if missing {
            return Err(StoreError::Validation(format!(
                "missing required field '{}'",
                field.name
            )));
        }
    }
    for key in obj.keys() {
        if !fields.iter().any(|f| &f.name == key) {
            return Err(StoreError::Validation(format!("unknown field '{key}'")));
        }
    }
    Ok(())
}

impl LeadStore {
    pub async fn create_form(
        &self,
        org_id: &str,
        req: CreateFormRequest,
    ) -> Result<Form, StoreError> {
        if req.name.trim().is_empty() {
            return Err(StoreError::Validation("name must not be empty".to_string()));
        }
        let fields_json = validate_field_defs(&req.fields)?;

        let conn = self.conn.lock().await;
        let id = generate_id("form");
        insert_row(
            &conn,
            "forms",
            &[
                ("id", FieldValue::from(id.as_str())),
                ("organization_id", FieldValue::from(org_id)),
                ("name", FieldValue::from(req.name.trim())),
                ("fields", FieldValue::Text(fields_json)),
            ],
        )?;
        get_form_sync(&conn, org_id, &id)
    }

    pub async fn get_form(&self, org_id: &str, id: &str) -> Result<Form, StoreError> {
        let conn = self.conn.lock().await;
        get_form_sync(&conn, org_id, id)
    }

    pub async fn list_forms(
        &self,
        org_id: &str,
        req: &PageRequest,
    ) -> Result<Page<Form>, StoreError> {
        let conn = self.conn.lock().await;
        paginate(
            &conn,
            "forms",
            FORM_COLUMNS,
            &[("organization_id", FieldValue::from(org_id))],
            req,
            &["created_at", "updated_at", "name"],
            map_form,
        )
    }

    pub async fn update_form(
        &self,
        org_id: &str,
        id: &str,
        req: UpdateFormRequest,
    ) -> Result<Form, StoreError> {
        let conn = self.conn.lock().await;
        get_form_sync(&conn, org_id, id)?;

        let mut fields: Vec<(&str, FieldValue)> = Vec::new();
        if let Some(name) = req.name {
            fields.push(("name", FieldValue::Text(name)));
        }
        if let Some(ref defs) = req.fields {
            fields.push(("fields", FieldValue::Text(validate_field_defs(defs)?)));
        }
        if fields.is_empty() {
            return Err(StoreError::Validation("no fields to update".to_string()));
        }

        update_row(
            &conn,
            "forms",
            &fields,
            "id = ?1 AND organization_id = ?2",
            &[FieldValue::from(id), FieldValue::from(org_id)],
        )?;
        get_form_sync(&conn, org_id, id)
    }

    /// Record a submission. The payload is validated against the form's
    /// field definitions; if it carries an `email` value the matching
    /// contact is reused or a new lead is created with source `form`, in
    /// the same transaction as the submission row.
    pub async fn submit_form(
        &self,
        org_id: &str,
        form_id: &str,
        payload: serde_json::Value,
    ) -> Result<FormSubmission, StoreError> {
        let mut conn = self.conn.lock().await;
        let form = get_form_sync(&conn, org_id, form_id)?;
        validate_payload(&form.fields, &payload)?;

        let payload_json = serde_json::to_string(&payload)
            .map_err(|e| StoreError::Validation(format!("invalid payload: {e}")))?;
        let email = payload
            .get("email")
            .and_then(|v| v.as_str())
            .map(str::to_owned);

        let id = generate_id("sub");
        let tx = conn.transaction().map_err(db_err)?;
        let contact_id = match email {
            Some(ref email) if !email.trim().is_empty() => {
                Some(upsert_contact_sync(&tx, org_id, email, "form")?)
            }
            _ => None,
        };
        insert_row(
            &tx,
            "form_submissions",
            &[
                ("id", FieldValue::from(id.as_str())),
                ("form_id", FieldValue::from(form_id)),
                ("organization_id", FieldValue::from(org_id)),
                ("payload", FieldValue::Text(payload_json)),
                ("contact_id", FieldValue::from(contact_id)),
            ],
        )?;
        tx.commit().map_err(db_err)?;

        let sql = format!("SELECT {SUBMISSION_COLUMNS} FROM form_submissions WHERE id = ?1");
        fetch_row(&conn, &sql, &[&id.as_str()], map_submission)?
            .ok_or_else(|| StoreError::not_found("submission"))
    }

    pub async fn list_form_submissions(
        &self,
        org_id: &str,
        form_id: &str,
    ) -> Result<Vec<FormSubmission>, StoreError> {
        let conn = self.conn.lock().await;
        get_form_sync(&conn, org_id, form_id)?;
        let sql = format!(
            "SELECT {SUBMISSION_COLUMNS} FROM form_submissions \
             WHERE form_id = ?1 AND organization_id = ?2 ORDER BY created_at DESC, id ASC"
        );
        fetch_rows(&conn, &sql, &[&form_id, &org_id], map_submission)
    }

    pub async fn delete_form(&self, org_id: &str, id: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().await;
        get_form_sync(&conn, org_id, id)?;
        let tx = conn.transaction().map_err(db_err)?;
        tx.execute(
            "DELETE FROM form_submissions WHERE form_id = ?1 AND organization_id = ?2",
            duckdb::params![id, org_id],
        )
        .map_err(db_err)?;
        tx.execute(
            "DELETE FROM forms WHERE id = ?1 AND organization_id = ?2",
            duckdb::params![id, org_id],
        )
        .map_err(db_err)?;
        tx.commit().map_err(db_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LeadStore;
    use serde_json::json;

    fn lead_form_fields() -> Vec<FormField> {
        vec![
            FormField {
                name: "email".into(),
                label: "Email".into(),
                field_type: "email".into(),
                required: true,
            },
            FormField {
                name: "company".into(),
                label: "Company".into(),
                field_type: "text".into(),
                required: false,
            },
        ]
    }

    async fn store_with_form() -> (LeadStore, String, String) {
        let store = LeadStore::open_in_memory().unwrap();
        let org = store.create_organization("Acme").await.unwrap();
        let form = store
            .create_form(
                &org.id,
                CreateFormRequest {
                    name: "contact us".into(),
                    fields: lead_form_fields(),
                },
            )
            .await
            .unwrap();
        (store, org.id, form.id)
    }

    #[tokio::test]
    async fn submission_upserts_contact() {
        let (store, org, form) = store_with_form().await;
        let sub = store
            .submit_form(&org, &form, json!({"email": "lead@example.com"}))
            .await
            .unwrap();
        let contact_id = sub.contact_id.clone().unwrap();
        let contact = store.get_contact(&org, &contact_id).await.unwrap();
        assert_eq!(contact.email, "lead@example.com");
        assert_eq!(contact.source.as_deref(), Some("form"));

        // Same email again reuses the contact instead of duplicating it.
        let again = store
            .submit_form(
                &org,
                &form,
                json!({"email": "lead@example.com", "company": "Acme"}),
            )
            .await
            .unwrap();
        assert_eq!(again.contact_id.as_deref(), Some(contact_id.as_str()));
    }

    #[tokio::test]
    async fn missing_required_field_rejected() {
        let (store, org, form) = store_with_form().await;
        let err = store
            .submit_form(&org, &form, json!({"company": "Acme"}))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[tokio::test]
    async fn unknown_field_rejected() {
        let (store, org, form) = store_with_form().await;
        let err = store
            .submit_form(
                &org,
                &form,
                json!({"email": "a@b.com", "favorite_color": "blue"}),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[tokio::test]
    async fn duplicate_field_names_rejected() {
        let store = LeadStore::open_in_memory().unwrap();
        let org = store.create_organization("Acme").await.unwrap();
        let mut fields = lead_form_fields();
        fields.push(fields[0].clone());
        let err = store
            .create_form(
                &org.id,
                CreateFormRequest {
                    name: "bad".into(),
                    fields,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }
}
