use duckdb::Connection;

use leadkit_core::analytics::OrganizationStats;
use leadkit_core::error::StoreError;

use crate::store::fetch_row;
use crate::LeadStore;

/// Tenant-wide inventory snapshot: one scalar subquery per entity family,
/// all filtered by `organization_id`. Not date-bounded.
fn snapshot(conn: &Connection, org_id: &str) -> Result<OrganizationStats, StoreError> {
    let sql = "SELECT \
                 (SELECT COUNT(*) FROM users WHERE organization_id = ?1), \
                 (SELECT COUNT(*) FROM contacts WHERE organization_id = ?1), \
                 (SELECT COUNT(*) FROM deals \
                    WHERE organization_id = ?1 AND status = 'open'), \
                 (SELECT COALESCE(SUM(value), 0) FROM deals \
                    WHERE organization_id = ?1 AND status = 'open'), \
                 (SELECT COALESCE(SUM(value), 0) FROM deals \
                    WHERE organization_id = ?1 AND status = 'won'), \
                 (SELECT COUNT(*) FROM email_campaigns \
                    WHERE organization_id = ?1 AND status = 'sent'), \
                 (SELECT COUNT(*) FROM forms WHERE organization_id = ?1), \
                 (SELECT COUNT(*) FROM workflows \
                    WHERE organization_id = ?1 AND is_active), \
                 (SELECT COUNT(*) FROM appointments \
                    WHERE organization_id = ?1 \
                      AND status IN ('scheduled', 'confirmed') \
                      AND starts_at >= CAST(CURRENT_TIMESTAMP AS TIMESTAMP)), \
                 (SELECT COUNT(*) FROM courses \
                    WHERE organization_id = ?1 AND status = 'published')";
    let row = fetch_row(conn, sql, &[&org_id], |row| {
        Ok(OrganizationStats {
            users: row.get(0)?,
            contacts: row.get(1)?,
            open_deals: row.get(2)?,
            open_deal_value: row.get(3)?,
            won_deal_value: row.get(4)?,
            campaigns_sent: row.get(5)?,
            forms: row.get(6)?,
            active_workflows: row.get(7)?,
            upcoming_appointments: row.get(8)?,
            published_courses: row.get(9)?,
        })
    })?;
    row.ok_or_else(|| StoreError::Database("organization snapshot returned no row".to_string()))
}

impl LeadStore {
    pub async fn organization_stats(
        &self,
        org_id: &str,
    ) -> Result<OrganizationStats, StoreError> {
        let conn = self.conn.lock().await;
        snapshot(&conn, org_id)
    }
}
