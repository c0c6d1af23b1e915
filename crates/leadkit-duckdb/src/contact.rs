use duckdb::Connection;

use leadkit_core::domain::{
    Contact, ContactStatus, CreateContactRequest, UpdateContactRequest,
};
use leadkit_core::error::StoreError;

use crate::backend::generate_id;
use crate::store::{
    delete_row, fetch_row, fetch_rows, insert_row, paginate, update_row, FieldValue, Page,
    PageRequest,
};
use crate::LeadStore;

const CONTACT_COLUMNS: &str = "id, organization_id, email, first_name, last_name, phone, \
     status, source, CAST(created_at AS VARCHAR), CAST(updated_at AS VARCHAR)";

fn map_contact(row: &duckdb::Row<'_>) -> duckdb::Result<Contact> {
    let status: String = row.get(6)?;
    Ok(Contact {
        id: row.get(0)?,
        organization_id: row.get(1)?,
        email: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        phone: row.get(5)?,
        status: ContactStatus::parse(&status).unwrap_or_default(),
        source: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

pub(crate) fn get_contact_sync(
    conn: &Connection,
    org_id: &str,
    id: &str,
) -> Result<Contact, StoreError> {
    let sql = format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = ?1 AND organization_id = ?2");
    fetch_row(conn, &sql, &[&id, &org_id], map_contact)?
        .ok_or_else(|| StoreError::not_found("contact"))
}

/// Upsert a contact by email within the caller's lock/transaction.
///
/// Used by the form-submission flow: an existing contact is reused, a new
/// one is created with the given source and `lead` status. Returns the
/// contact id.
pub(crate) fn upsert_contact_sync(
    conn: &Connection,
    org_id: &str,
    email: &str,
    source: &str,
) -> Result<String, StoreError> {
    let email = email.trim().to_ascii_lowercase();
    let existing: Option<String> = fetch_row(
        conn,
        "SELECT id FROM contacts WHERE organization_id = ?1 AND email = ?2",
        &[&org_id, &email],
        |row| row.get(0),
    )?;
    if let Some(id) = existing {
        return Ok(id);
    }
    let id = generate_id("c");
    insert_row(
        conn,
        "contacts",
        &[
            ("id", FieldValue::from(id.as_str())),
            ("organization_id", FieldValue::from(org_id)),
            ("email", FieldValue::from(email.as_str())),
            ("status", FieldValue::from("lead")),
            ("source", FieldValue::from(source)),
        ],
    )?;
    Ok(id)
}

/// Optional list filters for contacts.
#[derive(Debug, Clone, Default)]
pub struct ContactFilter {
    pub status: Option<ContactStatus>,
    pub source: Option<String>,
}

impl LeadStore {
    pub async fn create_contact(
        &self,
        org_id: &str,
        req: CreateContactRequest,
    ) -> Result<Contact, StoreError> {
        let email = req.email.trim().to_ascii_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(StoreError::Validation(
                "email must be a valid address".to_string(),
            ));
        }
        let status = req.status.unwrap_or_default();

        let conn = self.conn.lock().await;
        let id = generate_id("c");
        insert_row(
            &conn,
            "contacts",
            &[
                ("id", FieldValue::from(id.as_str())),
                ("organization_id", FieldValue::from(org_id)),
                ("email", FieldValue::from(email.as_str())),
                ("first_name", FieldValue::from(req.first_name)),
                ("last_name", FieldValue::from(req.last_name)),
                ("phone", FieldValue::from(req.phone)),
                ("status", FieldValue::from(status.as_str())),
                ("source", FieldValue::from(req.source)),
            ],
        )
        .map_err(|e| match e {
            StoreError::AlreadyExists { .. } => StoreError::AlreadyExists { entity: "contact" },
            other => other,
        })?;
        get_contact_sync(&conn, org_id, &id)
    }

    pub async fn get_contact(&self, org_id: &str, id: &str) -> Result<Contact, StoreError> {
        let conn = self.conn.lock().await;
        get_contact_sync(&conn, org_id, id)
    }

    pub async fn list_contacts(
        &self,
        org_id: &str,
        filter: &ContactFilter,
        req: &PageRequest,
    ) -> Result<Page<Contact>, StoreError> {
        let conn = self.conn.lock().await;
        let mut filters: Vec<(&str, FieldValue)> =
            vec![("organization_id", FieldValue::from(org_id))];
        if let Some(ref status) = filter.status {
            filters.push(("status", FieldValue::from(status.as_str())));
        }
        if let Some(ref source) = filter.source {
            filters.push(("source", FieldValue::from(source.as_str())));
        }
        paginate(
            &conn,
            "contacts",
            CONTACT_COLUMNS,
            &filters,
            req,
            &["created_at", "updated_at", "email", "status"],
            map_contact,
        )
    }

    pub async fn update_contact(
        &self,
        org_id: &str,
        id: &str,
        req: UpdateContactRequest,
    ) -> Result<Contact, StoreError> {
        let mut fields: Vec<(&str, FieldValue)> = Vec::new();
        if let Some(email) = req.email {
            let email = email.trim().to_ascii_lowercase();
            if email.is_empty() || !email.contains('@') {
                return Err(StoreError::Validation(
                    "email must be a valid address".to_string(),
                ));
            }
            fields.push(("email", FieldValue::Text(email)));
        }
        if let Some(first_name) = req.first_name {
            fields.push(("first_name", FieldValue::Text(first_name)));
        }
        if let Some(last_name) = req.last_name {
            fields.push(("last_name", FieldValue::Text(last_name)));
        }
        if let Some(phone) = req.phone {
            fields.push(("phone", FieldValue::Text(phone)));
        }
        if let Some(status) = req.status {
            fields.push(("status", FieldValue::from(status.as_str())));
        }
        if let Some(source) = req.source {
            fields.push(("source", FieldValue::Text(source)));
        }
        if fields.is_empty() {
            return Err(StoreError::Validation("no fields to update".to_string()));
        }

        let conn = self.conn.lock().await;
        let affected = update_row(
            &conn,
            "contacts",
            &fields,
            "id = ?1 AND organization_id = ?2",
            &[FieldValue::from(id), FieldValue::from(org_id)],
        )?;
        if affected == 0 {
            return Err(StoreError::not_found("contact"));
        }
        get_contact_sync(&conn, org_id, id)
    }

    pub async fn delete_contact(&self, org_id: &str, id: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock().await;
        let affected = delete_row(
            &conn,
            "contacts",
            "id = ?1 AND organization_id = ?2",
            &[FieldValue::from(id), FieldValue::from(org_id)],
        )?;
        if affected == 0 {
            return Err(StoreError::not_found("contact"));
        }
        Ok(())
    }

    /// Tag management: association rows keyed `(contact_id, tag)`.
    pub async fn tag_contact(
        &self,
        org_id: &str,
        contact_id: &str,
        tag: &str,
    ) -> Result<(), StoreError> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Err(StoreError::Validation("tag must not be empty".to_string()));
        }
        let conn = self.conn.lock().await;
        get_contact_sync(&conn, org_id, contact_id)?;
        conn.execute(
            "INSERT OR IGNORE INTO contact_tags (contact_id, organization_id, tag) VALUES (?1, ?2, ?3)",
            duckdb::params![contact_id, org_id, tag],
        )
        .map_err(crate::store::db_err)?;
        Ok(())
    }

    pub async fn contact_tags(
        &self,
        org_id: &str,
        contact_id: &str,
    ) -> Result<Vec<String>, StoreError> {
        let conn = self.conn.lock().await;
        get_contact_sync(&conn, org_id, contact_id)?;
        fetch_rows(
            &conn,
            "SELECT tag FROM contact_tags WHERE contact_id = ?1 AND organization_id = ?2 ORDER BY tag",
            &[&contact_id, &org_id],
            |row| row.get(0),
        )
    }
}
