use duckdb::Connection;

use leadkit_core::analytics::{
    CampaignPerformance, CampaignStats, CampaignTimelinePoint, DateRange, DeviceBucket,
    HourBucket, Period,
};
use leadkit_core::error::StoreError;

use crate::store::fetch_rows;
use crate::LeadStore;

fn timeline(
    conn: &Connection,
    org_id: &str,
    range: &DateRange,
    period: Period,
) -> Result<Vec<CampaignTimelinePoint>, StoreError> {
    let unit = period.trunc_unit();
    let (start, end) = range.bounds();
    let sql = format!(
        "SELECT CAST(DATE_TRUNC('{unit}', sent_at) AS VARCHAR) AS time_period, \
         COUNT(*), \
         COALESCE(SUM(recipients_count), 0), \
         COALESCE(ROUND(SUM(opened_count) * 100.0 / NULLIF(SUM(recipients_count), 0), 1), 0), \
         COALESCE(ROUND(SUM(clicked_count) * 100.0 / NULLIF(SUM(recipients_count), 0), 1), 0), \
         COALESCE(ROUND(SUM(unsubscribed_count) * 100.0 / NULLIF(SUM(recipients_count), 0), 1), 0) \
         FROM email_campaigns \
         WHERE organization_id = ?1 AND status = 'sent' AND sent_at >= ?2 AND sent_at < ?3 \
         GROUP BY 1 ORDER BY 1"
    );
    fetch_rows(conn, &sql, &[&org_id, &start, &end], |row| {
        Ok(CampaignTimelinePoint {
            time_period: row.get(0)?,
            campaigns_sent: row.get(1)?,
            recipients: row.get(2)?,
            open_rate: row.get(3)?,
            click_rate: row.get(4)?,
            unsubscribe_rate: row.get(5)?,
        })
    })
}

fn top_campaigns(
    conn: &Connection,
    org_id: &str,
    range: &DateRange,
) -> Result<Vec<CampaignPerformance>, StoreError> {
    let (start, end) = range.bounds();
    let sql = "SELECT id, name, CAST(sent_at AS VARCHAR), recipients_count, \
               COALESCE(ROUND(opened_count * 100.0 / NULLIF(recipients_count, 0), 1), 0), \
               COALESCE(ROUND(clicked_count * 100.0 / NULLIF(recipients_count, 0), 1), 0), \
               COALESCE(ROUND(bounced_count * 100.0 / NULLIF(recipients_count, 0), 1), 0) \
               FROM email_campaigns \
               WHERE organization_id = ?1 AND status = 'sent' AND sent_at >= ?2 AND sent_at < ?3 \
               ORDER BY sent_at DESC, id ASC \
               LIMIT 10";
    fetch_rows(conn, sql, &[&org_id, &start, &end], |row| {
        Ok(CampaignPerformance {
            campaign_id: row.get(0)?,
            name: row.get(1)?,
            sent_at: row.get(2)?,
            recipients_count: row.get(3)?,
            open_rate: row.get(4)?,
            click_rate: row.get(5)?,
            bounce_rate: row.get(6)?,
        })
    })
}

fn open_hours(
    conn: &Connection,
    org_id: &str,
    range: &DateRange,
) -> Result<Vec<HourBucket>, StoreError> {
    let (start, end) = range.bounds();
    let sql = "SELECT EXTRACT(hour FROM created_at) AS hour, COUNT(*) \
               FROM analytics_events \
               WHERE organization_id = ?1 AND event_type = 'email_open' \
                 AND created_at >= ?2 AND created_at < ?3 \
               GROUP BY 1 ORDER BY 1";
    fetch_rows(conn, sql, &[&org_id, &start, &end], |row| {
        Ok(HourBucket {
            hour: row.get(0)?,
            opens: row.get(1)?,
        })
    })
}

fn devices(
    conn: &Connection,
    org_id: &str,
    range: &DateRange,
) -> Result<Vec<DeviceBucket>, StoreError> {
    let (start, end) = range.bounds();
    let sql = "SELECT COALESCE(json_extract_string(event_data, '$.device_type'), 'unknown') \
                 AS device_type, COUNT(*) AS opens \
               FROM analytics_events \
               WHERE organization_id = ?1 AND event_type = 'email_open' \
                 AND created_at >= ?2 AND created_at < ?3 \
               GROUP BY 1 ORDER BY opens DESC, device_type ASC";
    fetch_rows(conn, sql, &[&org_id, &start, &end], |row| {
        Ok(DeviceBucket {
            device_type: row.get(0)?,
            opens: row.get(1)?,
        })
    })
}

impl LeadStore {
    /// Send-volume timeline, recent campaign performance, and open-time /
    /// device distributions for one tenant.
    pub async fn campaign_stats(
        &self,
        org_id: &str,
        range: &DateRange,
        period: Period,
    ) -> Result<CampaignStats, StoreError> {
        let conn = self.conn.lock().await;
        Ok(CampaignStats {
            timeline: timeline(&conn, org_id, range, period)?,
            top_campaigns: top_campaigns(&conn, org_id, range)?,
            open_hours: open_hours(&conn, org_id, range)?,
            devices: devices(&conn, org_id, range)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LeadStore;
    use leadkit_core::domain::{CreateCampaignRequest, RecordEventRequest};

    fn today_range() -> DateRange {
        let today = chrono::Utc::now().date_naive();
        DateRange {
            start: today - chrono::Duration::days(1),
            end: today + chrono::Duration::days(1),
        }
    }

    async fn sent_campaign(
        store: &LeadStore,
        org: &str,
        name: &str,
        recipients: i64,
        opened: i64,
    ) -> String {
        let campaign = store
            .create_campaign(
                org,
                CreateCampaignRequest {
                    name: name.into(),
                    subject: "hello".into(),
                    body: "…".into(),
                    channel: None,
                    cost: None,
                },
            )
            .await
            .unwrap();
        let conn = store.conn_for_test().await;
        conn.execute(
            "UPDATE email_campaigns SET status = 'sent', sent_at = CURRENT_TIMESTAMP, \
             recipients_count = ?1, opened_count = ?2 WHERE id = ?3",
            duckdb::params![recipients, opened, campaign.id],
        )
        .unwrap();
        campaign.id
    }

    #[tokio::test]
    async fn open_rate_is_one_decimal_place() {
        let store = LeadStore::open_in_memory().unwrap();
        let org = store.create_organization("Acme").await.unwrap().id;
        sent_campaign(&store, &org, "spring", 100, 25).await;

        let stats = store
            .campaign_stats(&org, &today_range(), Period::Day)
            .await
            .unwrap();
        assert_eq!(stats.top_campaigns.len(), 1);
        assert_eq!(stats.top_campaigns[0].open_rate, 25.0);
        assert_eq!(stats.timeline[0].open_rate, 25.0);
    }

    #[tokio::test]
    async fn zero_recipients_open_rate_is_zero() {
        let store = LeadStore::open_in_memory().unwrap();
        let org = store.create_organization("Acme").await.unwrap().id;
        sent_campaign(&store, &org, "empty blast", 0, 0).await;

        let stats = store
            .campaign_stats(&org, &today_range(), Period::Day)
            .await
            .unwrap();
        assert_eq!(stats.top_campaigns[0].open_rate, 0.0);
        assert_eq!(stats.timeline[0].open_rate, 0.0);
    }

    #[tokio::test]
    async fn device_distribution_reads_event_json() {
        let store = LeadStore::open_in_memory().unwrap();
        let org = store.create_organization("Acme").await.unwrap().id;
        for device in ["mobile", "mobile", "desktop"] {
            store
                .record_event(
                    &org,
                    None,
                    RecordEventRequest {
                        event_type: "email_open".into(),
                        contact_id: None,
                        event_data: Some(serde_json::json!({"device_type": device})),
                        source: None,
                        campaign: None,
                    },
                )
                .await
                .unwrap();
        }
        store
            .record_event(
                &org,
                None,
                RecordEventRequest {
                    event_type: "email_open".into(),
                    contact_id: None,
                    event_data: None,
                    source: None,
                    campaign: None,
                },
            )
            .await
            .unwrap();

        let stats = store
            .campaign_stats(&org, &today_range(), Period::Day)
            .await
            .unwrap();
        assert_eq!(stats.devices[0].device_type, "mobile");
        assert_eq!(stats.devices[0].opens, 2);
        assert!(stats
            .devices
            .iter()
            .any(|d| d.device_type == "unknown" && d.opens == 1));
        assert_eq!(stats.open_hours.iter().map(|h| h.opens).sum::<i64>(), 4);
    }
}
