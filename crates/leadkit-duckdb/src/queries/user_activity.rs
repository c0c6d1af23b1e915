use duckdb::Connection;

use leadkit_core::analytics::{DateRange, UserActivityRow, UserActivityStats};
use leadkit_core::error::StoreError;

use crate::store::fetch_rows;
use crate::LeadStore;

/// Per-user event activity in range: total events, distinct event types,
/// and the most recent event timestamp. Events recorded without a user
/// (public form traffic) are grouped under `anonymous`.
fn activity(
    conn: &Connection,
    org_id: &str,
    range: &DateRange,
) -> Result<Vec<UserActivityRow>, StoreError> {
    let (start, end) = range.bounds();
    let sql = "SELECT COALESCE(user_id, 'anonymous') AS uid, \
                 COUNT(*) AS events, \
                 COUNT(DISTINCT event_type) AS event_types, \
                 CAST(MAX(created_at) AS VARCHAR) AS last_seen_at \
               FROM analytics_events \
               WHERE organization_id = ?1 AND created_at >= ?2 AND created_at < ?3 \
               GROUP BY 1 \
               ORDER BY events DESC, uid ASC \
               LIMIT 50";
    fetch_rows(conn, sql, &[&org_id, &start, &end], |row| {
        Ok(UserActivityRow {
            user_id: row.get(0)?,
            events: row.get(1)?,
            event_types: row.get(2)?,
            last_seen_at: row.get(3)?,
        })
    })
}

impl LeadStore {
    pub async fn user_activity_stats(
        &self,
        org_id: &str,
        range: &DateRange,
    ) -> Result<UserActivityStats, StoreError> {
        let conn = self.conn.lock().await;
        Ok(UserActivityStats {
            users: activity(&conn, org_id, range)?,
        })
    }
}
