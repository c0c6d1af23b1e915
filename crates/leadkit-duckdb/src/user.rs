use leadkit_core::domain::{User, UserRole};
use leadkit_core::error::StoreError;

use crate::backend::generate_id;
use crate::store::{fetch_row, insert_row, FieldValue};
use crate::LeadStore;

const USER_COLUMNS: &str = "id, organization_id, email, name, role, password_hash, \
     CAST(created_at AS VARCHAR), CAST(updated_at AS VARCHAR)";

fn map_user(row: &duckdb::Row<'_>) -> duckdb::Result<User> {
    let role: String = row.get(4)?;
    Ok(User {
        id: row.get(0)?,
        organization_id: row.get(1)?,
        email: row.get(2)?,
        name: row.get(3)?,
        role: UserRole::parse(&role),
        password_hash: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

impl LeadStore {
    /// Create a user. Emails are globally unique (they are the login key).
    pub async fn create_user(
        &self,
        org_id: &str,
        email: &str,
        name: &str,
        role: UserRole,
        password_hash: &str,
    ) -> Result<User, StoreError> {
        let email = email.trim().to_ascii_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(StoreError::Validation(
                "email must be a valid address".to_string(),
            ));
        }
        let conn = self.conn.lock().await;
        let id = generate_id("usr");
        insert_row(
            &conn,
            "users",
            &[
                ("id", FieldValue::from(id.as_str())),
                ("organization_id", FieldValue::from(org_id)),
                ("email", FieldValue::from(email.as_str())),
                ("name", FieldValue::from(name)),
                ("role", FieldValue::from(role.as_str())),
                ("password_hash", FieldValue::from(password_hash)),
            ],
        )
        .map_err(|e| match e {
            StoreError::AlreadyExists { .. } => StoreError::AlreadyExists { entity: "user" },
            other => other,
        })?;
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
        fetch_row(&conn, &sql, &[&id], map_user)?.ok_or_else(|| StoreError::not_found("user"))
    }

    /// Look a user up by email for login. Not tenant-scoped: the email is
    /// the global login key and resolves to the user's organization.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let email = email.trim().to_ascii_lowercase();
        let conn = self.conn.lock().await;
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1");
        fetch_row(&conn, &sql, &[&email], map_user)
    }

    pub async fn get_user(&self, org_id: &str, user_id: &str) -> Result<User, StoreError> {
        let conn = self.conn.lock().await;
        let sql =
            format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1 AND organization_id = ?2");
        fetch_row(&conn, &sql, &[&user_id, &org_id], map_user)?
            .ok_or_else(|| StoreError::not_found("user"))
    }
}
