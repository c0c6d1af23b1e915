use duckdb::Connection;

use leadkit_core::analytics::{ChannelRoi, DateRange, RoiStats};
use leadkit_core::error::StoreError;

use crate::store::fetch_rows;
use crate::LeadStore;

/// Per-channel marketing ROI: campaign spend joined against contacts
/// acquired (by `source`) and the deals those contacts produced. Channels
/// appear if they have spend, leads, or opportunities; all three legs are
/// FULL OUTER JOINed and zero-filled.
fn channels(
    conn: &Connection,
    org_id: &str,
    range: &DateRange,
) -> Result<Vec<ChannelRoi>, StoreError> {
    let (start, end) = range.bounds();
    let sql = "WITH costs AS ( \
                 SELECT COALESCE(channel, 'unknown') AS ch, SUM(cost) AS cost \
                 FROM email_campaigns \
                 WHERE organization_id = ?1 AND created_at >= ?2 AND created_at < ?3 \
                 GROUP BY 1 \
               ), leads AS ( \
                 SELECT COALESCE(source, 'unknown') AS ch, COUNT(*) AS n \
                 FROM contacts \
                 WHERE organization_id = ?1 AND created_at >= ?2 AND created_at < ?3 \
                 GROUP BY 1 \
               ), opps AS ( \
                 SELECT COALESCE(c.source, 'unknown') AS ch, COUNT(*) AS n, \
                        COALESCE(SUM(d.value) FILTER (WHERE d.status = 'won'), 0) AS revenue \
                 FROM deals d \
                 JOIN contacts c ON c.id = d.contact_id AND c.organization_id = d.organization_id \
                 WHERE d.organization_id = ?1 AND d.created_at >= ?2 AND d.created_at < ?3 \
                 GROUP BY 1 \
               ) \
               SELECT COALESCE(costs.ch, leads.ch, opps.ch) AS channel, \
                 COALESCE(costs.cost, 0) AS cost, \
                 COALESCE(leads.n, 0) AS leads, \
                 COALESCE(opps.n, 0) AS opportunities, \
                 COALESCE(opps.revenue, 0) AS revenue, \
                 COALESCE(ROUND(opps.revenue / NULLIF(costs.cost, 0), 2), 0) AS roi, \
                 COALESCE(ROUND(costs.cost / NULLIF(leads.n, 0), 2), 0), \
                 COALESCE(ROUND(costs.cost / NULLIF(opps.n, 0), 2), 0) \
               FROM costs \
               FULL OUTER JOIN leads ON leads.ch = costs.ch \
               FULL OUTER JOIN opps ON opps.ch = COALESCE(costs.ch, leads.ch) \
               ORDER BY roi DESC, channel ASC";
    fetch_rows(conn, sql, &[&org_id, &start, &end], |row| {
        Ok(ChannelRoi {
            channel: row.get(0)?,
            cost: row.get(1)?,
            leads: row.get(2)?,
            opportunities: row.get(3)?,
            revenue: row.get(4)?,
            roi: row.get(5)?,
            cost_per_lead: row.get(6)?,
            cost_per_opportunity: row.get(7)?,
        })
    })
}

impl LeadStore {
    pub async fn roi_stats(
        &self,
        org_id: &str,
        range: &DateRange,
    ) -> Result<RoiStats, StoreError> {
        let conn = self.conn.lock().await;
        Ok(RoiStats {
            channels: channels(&conn, org_id, range)?,
        })
    }
}
