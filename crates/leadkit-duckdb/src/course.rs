use duckdb::Connection;

use leadkit_core::domain::{Course, CourseStatus, CreateCourseRequest, UpdateCourseRequest};
use leadkit_core::error::StoreError;

use crate::backend::generate_id;
use crate::contact::get_contact_sync;
use crate::store::{
    db_err, fetch_row, insert_row, paginate, update_row, FieldValue, Page, PageRequest,
};
use crate::LeadStore;

const COURSE_COLUMNS: &str = "id, organization_id, title, description, price, status, \
     CAST(created_at AS VARCHAR), CAST(updated_at AS VARCHAR)";

fn map_course(row: &duckdb::Row<'_>) -> duckdb::Result<Course> {
    let status: String = row.get(5)?;
    Ok(Course {
        id: row.get(0)?,
        organization_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        price: row.get(4)?,
        status: CourseStatus::parse(&status).unwrap_or_default(),
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn get_course_sync(conn: &Connection, org_id: &str, id: &str) -> Result<Course, StoreError> {
    let sql =
        format!("SELECT {COURSE_COLUMNS} FROM courses WHERE id = ?1 AND organization_id = ?2");
    fetch_row(conn, &sql, &[&id, &org_id], map_course)?
        .ok_or_else(|| StoreError::not_found("course"))
}

impl LeadStore {
    pub async fn create_course(
        &self,
        org_id: &str,
        req: CreateCourseRequest,
    ) -> Result<Course, StoreError> {
        if req.title.trim().is_empty() {
            return Err(StoreError::Validation(
                "title must not be empty".to_string(),
            ));
        }
        let price = req.price.unwrap_or(0.0);
        if price < 0.0 {
            return Err(StoreError::Validation(
                "price must be non-negative".to_string(),
            ));
        }

        let conn = self.conn.lock().await;
        let id = generate_id("crs");
        insert_row(
            &conn,
            "courses",
            &[
                ("id", FieldValue::from(id.as_str())),
                ("organization_id", FieldValue::from(org_id)),
                ("title", FieldValue::from(req.title.trim())),
                ("description", FieldValue::from(req.description)),
                ("price", FieldValue::Float(price)),
                ("status", FieldValue::from(CourseStatus::Draft.as_str())),
            ],
        )?;
        get_course_sync(&conn, org_id, &id)
    }

    pub async fn get_course(&self, org_id: &str, id: &str) -> Result<Course, StoreError> {
        let conn = self.conn.lock().await;
        get_course_sync(&conn, org_id, id)
    }

    pub async fn list_courses(
        &self,
        org_id: &str,
        status: Option<CourseStatus>,
        req: &PageRequest,
    ) -> Result<Page<Course>, StoreError> {
        let conn = self.conn.lock().await;
        let mut filters: Vec<(&str, FieldValue)> =
            vec![("organization_id", FieldValue::from(org_id))];
        if let Some(ref status) = status {
            filters.push(("status", FieldValue::from(status.as_str())));
        }
        paginate(
            &conn,
            "courses",
            COURSE_COLUMNS,
            &filters,
            req,
            &["created_at", "updated_at", "title", "price"],
            map_course,
        )
    }

    pub async fn update_course(
        &self,
        org_id: &str,
        id: &str,
        req: UpdateCourseRequest,
    ) -> Result<Course, StoreError> {
        let conn = self.conn.lock().await;
        let course = get_course_sync(&conn, org_id, id)?;
        if course.status == CourseStatus::Archived {
            return Err(StoreError::invalid_transition(
                "course",
                course.status.as_str(),
                "update",
            ));
        }

        let mut fields: Vec<(&str, FieldValue)> = Vec::new();
        if let Some(title) = req.title {
            fields.push(("title", FieldValue::Text(title)));
        }
        if let Some(description) = req.description {
            fields.push(("description", FieldValue::Text(description)));
        }
        if let Some(price) = req.price {
            if price < 0.0 {
                return Err(StoreError::Validation(
                    "price must be non-negative".to_string(),
                ));
            }
            fields.push(("price", FieldValue::Float(price)));
        }
        if fields.is_empty() {
            return Err(StoreError::Validation("no fields to update".to_string()));
        }

        update_row(
            &conn,
            "courses",
            &fields,
            "id = ?1 AND organization_id = ?2",
            &[FieldValue::from(id), FieldValue::from(org_id)],
        )?;
        get_course_sync(&conn, org_id, id)
    }

    /// draft → published.
    pub async fn publish_course(&self, org_id: &str, id: &str) -> Result<Course, StoreError> {
        let conn = self.conn.lock().await;
        let course = get_course_sync(&conn, org_id, id)?;
        if course.status != CourseStatus::Draft {
            return Err(StoreError::invalid_transition(
                "course",
                course.status.as_str(),
                "publish",
            ));
        }
        conn.execute(
            "UPDATE courses SET status = 'published', updated_at = CURRENT_TIMESTAMP \
             WHERE id = ?1 AND organization_id = ?2",
            duckdb::params![id, org_id],
        )
        .map_err(db_err)?;
        get_course_sync(&conn, org_id, id)
    }

    /// published → archived.
    pub async fn archive_course(&self, org_id: &str, id: &str) -> Result<Course, StoreError> {
        let conn = self.conn.lock().await;
        let course = get_course_sync(&conn, org_id, id)?;
        if course.status != CourseStatus::Published {
            return Err(StoreError::invalid_transition(
                "course",
                course.status.as_str(),
                "archive",
            ));
        }
        conn.execute(
            "UPDATE courses SET status = 'archived', updated_at = CURRENT_TIMESTAMP \
             WHERE id = ?1 AND organization_id = ?2",
            duckdb::params![id, org_id],
        )
        .map_err(db_err)?;
        get_course_sync(&conn, org_id, id)
    }

    /// Only published courses accept enrollments. Double enrollment is a
    /// conflict.
    pub async fn enroll_contact(
        &self,
        org_id: &str,
        course_id: &str,
        contact_id: &str,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock().await;
        let course = get_course_sync(&conn, org_id, course_id)?;
        if course.status != CourseStatus::Published {
            return Err(StoreError::invalid_transition(
                "course",
                course.status.as_str(),
                "enroll in",
            ));
        }
        get_contact_sync(&conn, org_id, contact_id)
            .map_err(|_| StoreError::MissingReference { entity: "contact" })?;

        insert_row(
            &conn,
            "course_enrollments",
            &[
                ("id", FieldValue::Text(generate_id("enr"))),
                ("course_id", FieldValue::from(course_id)),
                ("contact_id", FieldValue::from(contact_id)),
                ("organization_id", FieldValue::from(org_id)),
            ],
        )
        .map_err(|e| match e {
            StoreError::AlreadyExists { .. } => StoreError::AlreadyExists {
                entity: "enrollment",
            },
            other => other,
        })?;
        Ok(())
    }

    pub async fn course_enrollment_count(
        &self,
        org_id: &str,
        course_id: &str,
    ) -> Result<i64, StoreError> {
        let conn = self.conn.lock().await;
        get_course_sync(&conn, org_id, course_id)?;
        fetch_row(
            &conn,
            "SELECT COUNT(*) FROM course_enrollments WHERE course_id = ?1 AND organization_id = ?2",
            &[&course_id, &org_id],
            |row| row.get(0),
        )?
        .ok_or_else(|| StoreError::Database("count query returned no rows".to_string()))
    }

    pub async fn delete_course(&self, org_id: &str, id: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().await;
        get_course_sync(&conn, org_id, id)?;
        let tx = conn.transaction().map_err(db_err)?;
        tx.execute(
            "DELETE FROM course_enrollments WHERE course_id = ?1 AND organization_id = ?2",
            duckdb::params![id, org_id],
        )
        .map_err(db_err)?;
        tx.execute(
            "DELETE FROM courses WHERE id = ?1 AND organization_id = ?2",
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
    use leadkit_core::domain::CreateContactRequest;

    #[tokio::test]
    async fn enroll_requires_published() {
        let store = LeadStore::open_in_memory().unwrap();
        let org = store.create_organization("Acme").await.unwrap();
        let course = store
            .create_course(
                &org.id,
                CreateCourseRequest {
                    title: "Sales 101".into(),
                    description: None,
                    price: Some(49.0),
                },
            )
            .await
            .unwrap();
        let contact = store
            .create_contact(
                &org.id,
                CreateContactRequest {
                    email: "student@example.com".into(),
                    first_name: None,
                    last_name: None,
                    phone: None,
                    source: None,
                    status: None,
                },
            )
            .await
            .unwrap();

        let err = store
            .enroll_contact(&org.id, &course.id, &contact.id)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition { .. }));

        store.publish_course(&org.id, &course.id).await.unwrap();
        store
            .enroll_contact(&org.id, &course.id, &contact.id)
            .await
            .unwrap();
        let count = store
            .course_enrollment_count(&org.id, &course.id)
            .await
            .unwrap();
        assert_eq!(count, 1);

        let dup = store
            .enroll_contact(&org.id, &course.id, &contact.id)
            .await
            .unwrap_err();
        assert!(matches!(dup, StoreError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn archive_only_from_published() {
        let store = LeadStore::open_in_memory().unwrap();
        let org = store.create_organization("Acme").await.unwrap();
        let course = store
            .create_course(
                &org.id,
                CreateCourseRequest {
                    title: "Onboarding".into(),
                    description: None,
                    price: None,
                },
            )
            .await
            .unwrap();
        let err = store.archive_course(&org.id, &course.id).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition { .. }));
    }
}
