use duckdb::Connection;

use leadkit_core::analytics::{
    DateRange, DealStats, DealTimelinePoint, Period, PipelineRollup, SalesVelocity, StageDuration,
};
use leadkit_core::error::StoreError;

use crate::store::{fetch_row, fetch_rows};
use crate::LeadStore;

fn timeline(
    conn: &Connection,
    org_id: &str,
    range: &DateRange,
    period: Period,
    pipeline_id: Option<&str>,
) -> Result<Vec<DealTimelinePoint>, StoreError> {
    let unit = period.trunc_unit();
    let (start, end) = range.bounds();
    let pipeline_clause = if pipeline_id.is_some() {
        "AND pipeline_id = ?4"
    } else {
        ""
    };
    let sql = format!(
        "SELECT CAST(DATE_TRUNC('{unit}', created_at) AS VARCHAR) AS time_period, \
         COUNT(*), \
         COUNT(*) FILTER (WHERE status = 'won'), \
         COUNT(*) FILTER (WHERE status = 'lost'), \
         COALESCE(SUM(value) FILTER (WHERE status = 'won'), 0), \
         COALESCE(ROUND(COUNT(*) FILTER (WHERE status = 'won') * 100.0 \
           / NULLIF(COUNT(*) FILTER (WHERE status IN ('won', 'lost')), 0), 1), 0) \
         FROM deals \
         WHERE organization_id = ?1 AND created_at >= ?2 AND created_at < ?3 {pipeline_clause} \
         GROUP BY 1 ORDER BY 1"
    );
    let mapper = |row: &duckdb::Row<'_>| {
        Ok(DealTimelinePoint {
            time_period: row.get(0)?,
            new_deals: row.get(1)?,
            won_deals: row.get(2)?,
            lost_deals: row.get(3)?,
            won_value: row.get(4)?,
            win_rate: row.get(5)?,
        })
    };
    match pipeline_id {
        Some(pipeline_id) => {
            fetch_rows(conn, &sql, &[&org_id, &start, &end, &pipeline_id], mapper)
        }
        None => fetch_rows(conn, &sql, &[&org_id, &start, &end], mapper),
    }
}

fn pipeline_rollups(conn: &Connection, org_id: &str) -> Result<Vec<PipelineRollup>, StoreError> {
    let sql = "SELECT p.id, p.name, \
               COUNT(d.id) FILTER (WHERE d.status = 'open'), \
               COUNT(d.id) FILTER (WHERE d.status = 'won'), \
               COUNT(d.id) FILTER (WHERE d.status = 'lost'), \
               COALESCE(SUM(d.value) FILTER (WHERE d.status = 'open'), 0), \
               COALESCE(SUM(d.value) FILTER (WHERE d.status = 'won'), 0) \
               FROM pipelines p \
               LEFT JOIN deals d ON d.pipeline_id = p.id AND d.organization_id = p.organization_id \
               WHERE p.organization_id = ?1 \
               GROUP BY p.id, p.name \
               ORDER BY p.name ASC, p.id ASC";
    fetch_rows(conn, sql, &[&org_id], |row| {
        Ok(PipelineRollup {
            pipeline_id: row.get(0)?,
            pipeline_name: row.get(1)?,
            open_deals: row.get(2)?,
            won_deals: row.get(3)?,
            lost_deals: row.get(4)?,
            open_value: row.get(5)?,
            won_value: row.get(6)?,
        })
    })
}

/// Mean dwell time per stage from the append-only stage history. The time a
/// deal spends in a stage is the gap to its next stage entry (LEAD), or to
/// now for the stage it is still sitting in.
fn stage_durations(conn: &Connection, org_id: &str) -> Result<Vec<StageDuration>, StoreError> {
    let sql = "WITH spans AS ( \
                 SELECT h.stage_id, \
                        EPOCH(COALESCE(LEAD(h.entered_at) OVER ( \
                          PARTITION BY h.deal_id ORDER BY h.entered_at), \
                          CAST(CURRENT_TIMESTAMP AS TIMESTAMP)) - h.entered_at) AS seconds \
                 FROM deal_stage_history h \
                 JOIN deals d ON d.id = h.deal_id \
                 WHERE d.organization_id = ?1 \
               ) \
               SELECT s.id, s.name, COALESCE(ROUND(AVG(spans.seconds) / 86400.0, 1), 0) \
               FROM stages s \
               JOIN pipelines p ON p.id = s.pipeline_id AND p.organization_id = ?1 \
               LEFT JOIN spans ON spans.stage_id = s.id \
               GROUP BY s.id, s.name, s.pipeline_id, s.position \
               ORDER BY s.pipeline_id ASC, s.position ASC";
    fetch_rows(conn, sql, &[&org_id], |row| {
        Ok(StageDuration {
            stage_id: row.get(0)?,
            stage_name: row.get(1)?,
            avg_days: row.get(2)?,
        })
    })
}

/// 90-day sales velocity over wins, keyed on close time (`updated_at` of a
/// won deal).
fn velocity(conn: &Connection, org_id: &str) -> Result<SalesVelocity, StoreError> {
    let sql = "SELECT COUNT(*), \
               COALESCE(SUM(value), 0), \
               COALESCE(ROUND(AVG(EPOCH(updated_at - created_at)) / 86400.0, 1), 0), \
               COALESCE(ROUND(SUM(value) \
                 / NULLIF(SUM(EPOCH(updated_at - created_at)) / 86400.0, 0), 2), 0) \
               FROM deals \
               WHERE organization_id = ?1 AND status = 'won' \
                 AND updated_at >= CAST(CURRENT_TIMESTAMP AS TIMESTAMP) - INTERVAL 90 DAY";
    fetch_row(conn, sql, &[&org_id], |row| {
        Ok(SalesVelocity {
            won_deals: row.get(0)?,
            won_value: row.get(1)?,
            avg_days_to_close: row.get(2)?,
            sales_velocity_per_day: row.get(3)?,
        })
    })?
    .ok_or_else(|| StoreError::Database("velocity query returned no rows".to_string()))
}

impl LeadStore {
    /// Deal timeline, pipeline rollups, stage dwell times, and the 90-day
    /// sales velocity for one tenant.
    pub async fn deal_stats(
        &self,
        org_id: &str,
        range: &DateRange,
        period: Period,
        pipeline_id: Option<&str>,
    ) -> Result<DealStats, StoreError> {
        let conn = self.conn.lock().await;
        Ok(DealStats {
            timeline: timeline(&conn, org_id, range, period, pipeline_id)?,
            pipelines: pipeline_rollups(&conn, org_id)?,
            stage_durations: stage_durations(&conn, org_id)?,
            velocity: velocity(&conn, org_id)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LeadStore;
    use chrono::NaiveDate;
    use leadkit_core::domain::{CreateDealRequest, CreatePipelineRequest, DealStatus};

    async fn org_with_pipeline(store: &LeadStore) -> (String, String) {
        let org = store.create_organization("Acme").await.unwrap().id;
        let pipeline = store
            .create_pipeline(
                &org,
                CreatePipelineRequest {
                    name: "Sales".into(),
                    stages: vec!["New".into(), "Qualified".into(), "Closed".into()],
                },
            )
            .await
            .unwrap();
        (org, pipeline.id)
    }

    fn today_range() -> DateRange {
        let today = chrono::Utc::now().date_naive();
        DateRange {
            start: today - chrono::Duration::days(1),
            end: today + chrono::Duration::days(1),
        }
    }

    #[tokio::test]
    async fn win_rate_counts_only_closed_deals() {
        let store = LeadStore::open_in_memory().unwrap();
        let (org, pipeline) = org_with_pipeline(&store).await;
        for (title, outcome) in [
            ("won one", Some(DealStatus::Won)),
            ("lost one", Some(DealStatus::Lost)),
            ("still open", None),
        ] {
            let deal = store
                .create_deal(
                    &org,
                    CreateDealRequest {
                        pipeline_id: pipeline.clone(),
                        stage_id: None,
                        contact_id: None,
                        title: title.into(),
                        value: Some(100.0),
                    },
                )
                .await
                .unwrap();
            if let Some(outcome) = outcome {
                store.close_deal(&org, &deal.id, outcome).await.unwrap();
            }
        }

        let stats = store
            .deal_stats(&org, &today_range(), Period::Day, None)
            .await
            .unwrap();
        assert_eq!(stats.timeline.len(), 1);
        let point = &stats.timeline[0];
        assert_eq!(point.new_deals, 3);
        assert_eq!(point.won_deals, 1);
        assert_eq!(point.lost_deals, 1);
        // 1 won of 2 closed; the open deal does not dilute the rate.
        assert_eq!(point.win_rate, 50.0);

        assert_eq!(stats.pipelines.len(), 1);
        assert_eq!(stats.pipelines[0].open_deals, 1);
        assert_eq!(stats.pipelines[0].won_value, 100.0);
    }

    #[tokio::test]
    async fn five_day_close_yields_velocity_of_value_over_five() {
        let store = LeadStore::open_in_memory().unwrap();
        let (org, pipeline) = org_with_pipeline(&store).await;
        let deal = store
            .create_deal(
                &org,
                CreateDealRequest {
                    pipeline_id: pipeline,
                    stage_id: None,
                    contact_id: None,
                    title: "big one".into(),
                    value: Some(1000.0),
                },
            )
            .await
            .unwrap();

        // Backdate creation five days before a just-now close.
        {
            let conn = store.conn_for_test().await;
            conn.execute(
                "UPDATE deals SET status = 'won', \
                 created_at = CAST(CURRENT_TIMESTAMP AS TIMESTAMP) - INTERVAL 5 DAY, \
                 updated_at = CURRENT_TIMESTAMP WHERE id = ?1",
                duckdb::params![deal.id],
            )
            .unwrap();
        }

        let stats = store
            .deal_stats(&org, &today_range(), Period::Day, None)
            .await
            .unwrap();
        assert_eq!(stats.velocity.won_deals, 1);
        assert_eq!(stats.velocity.won_value, 1000.0);
        assert_eq!(stats.velocity.avg_days_to_close, 5.0);
        assert_eq!(stats.velocity.sales_velocity_per_day, 200.0);
    }

    #[tokio::test]
    async fn no_wins_velocity_is_zero_not_error() {
        let store = LeadStore::open_in_memory().unwrap();
        let org = store.create_organization("Quiet").await.unwrap().id;
        let range = DateRange {
            start: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
        };
        let stats = store
            .deal_stats(&org, &range, Period::Week, None)
            .await
            .unwrap();
        assert_eq!(stats.velocity.won_deals, 0);
        assert_eq!(stats.velocity.avg_days_to_close, 0.0);
        assert_eq!(stats.velocity.sales_velocity_per_day, 0.0);
    }
}
