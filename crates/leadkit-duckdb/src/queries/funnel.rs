use duckdb::Connection;

use leadkit_core::analytics::{
    round1, summarize_funnel, DateRange, FunnelSelector, FunnelStage, FunnelStats,
};
use leadkit_core::error::StoreError;

use crate::pipeline::get_pipeline_sync;
use crate::store::{fetch_row, fetch_rows};
use crate::LeadStore;

/// Turn ordered stage counts into funnel stages with both conversion
/// metrics.
///
/// `conversion_rate` is count vs the previous stage; the first stage is
/// pinned to 100 (or 0 when empty), and a zero-count previous stage pins the
/// next one to 0 instead of dividing. `absolute_rate` is count vs the first
/// stage with the same zero guard.
fn attach_rates(counts: Vec<(String, i64)>) -> Vec<FunnelStage> {
    let first = counts.first().map(|(_, n)| *n).unwrap_or(0);
    let mut prev: Option<i64> = None;
    counts
        .into_iter()
        .map(|(stage, count)| {
            let conversion_rate = match prev {
                None => {
                    if count > 0 {
                        100.0
                    } else {
                        0.0
                    }
                }
                Some(0) => 0.0,
                Some(p) => round1(count as f64 * 100.0 / p as f64),
            };
            let absolute_rate = if first == 0 {
                0.0
            } else {
                round1(count as f64 * 100.0 / first as f64)
            };
            prev = Some(count);
            FunnelStage {
                stage,
                count,
                conversion_rate,
                absolute_rate,
            }
        })
        .collect()
}

fn count_one(
    conn: &Connection,
    sql: &str,
    params: &[&dyn duckdb::ToSql],
) -> Result<i64, StoreError> {
    fetch_row(conn, sql, params, |row| row.get(0))?
        .ok_or_else(|| StoreError::Database("count query returned no rows".to_string()))
}

/// visit → lead → qualified → customer, from the event fact table plus the
/// contact and deal tables.
fn marketing_counts(
    conn: &Connection,
    org_id: &str,
    range: &DateRange,
) -> Result<Vec<(String, i64)>, StoreError> {
    let (start, end) = range.bounds();
    let visits = count_one(
        conn,
        "SELECT COUNT(*) FROM analytics_events \
         WHERE organization_id = ?1 AND event_type IN ('visit', 'page_view') \
           AND created_at >= ?2 AND created_at < ?3",
        &[&org_id, &start, &end],
    )?;
    let leads = count_one(
        conn,
        "SELECT COUNT(*) FROM contacts \
         WHERE organization_id = ?1 AND created_at >= ?2 AND created_at < ?3",
        &[&org_id, &start, &end],
    )?;
    let qualified = count_one(
        conn,
        "SELECT COUNT(*) FROM contacts \
         WHERE organization_id = ?1 AND status = 'active' \
           AND created_at >= ?2 AND created_at < ?3",
        &[&org_id, &start, &end],
    )?;
    let customers = count_one(
        conn,
        "SELECT COUNT(*) FROM deals \
         WHERE organization_id = ?1 AND status = 'won' \
           AND updated_at >= ?2 AND updated_at < ?3",
        &[&org_id, &start, &end],
    )?;
    Ok(vec![
        ("visit".to_string(), visits),
        ("lead".to_string(), leads),
        ("qualified".to_string(), qualified),
        ("customer".to_string(), customers),
    ])
}

/// Per-stage distinct deals that have *entered* the stage, from the
/// append-only stage history, in pipeline position order.
fn pipeline_counts(
    conn: &Connection,
    org_id: &str,
    pipeline_id: &str,
    range: &DateRange,
) -> Result<Vec<(String, i64)>, StoreError> {
    let (start, end) = range.bounds();
    let sql = "SELECT s.name, COUNT(DISTINCT entries.deal_id) \
               FROM stages s \
               LEFT JOIN ( \
                 SELECT h.stage_id, h.deal_id \
                 FROM deal_stage_history h \
                 JOIN deals d ON d.id = h.deal_id \
                 WHERE d.organization_id = ?1 AND h.entered_at >= ?3 AND h.entered_at < ?4 \
               ) entries ON entries.stage_id = s.id \
               WHERE s.pipeline_id = ?2 \
               GROUP BY s.id, s.name, s.position \
               ORDER BY s.position ASC";
    fetch_rows(
        conn,
        sql,
        &[&org_id, &pipeline_id, &start, &end],
        |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
    )
}

impl LeadStore {
    /// Stage-by-stage conversion for the marketing funnel or one pipeline's
    /// deal funnel.
    pub async fn funnel_stats(
        &self,
        org_id: &str,
        range: &DateRange,
        selector: &FunnelSelector,
    ) -> Result<FunnelStats, StoreError> {
        let conn = self.conn.lock().await;
        let (funnel_name, counts) = match selector {
            FunnelSelector::Marketing => (
                "marketing".to_string(),
                marketing_counts(&conn, org_id, range)?,
            ),
            FunnelSelector::Pipeline(pipeline_id) => {
                let pipeline = get_pipeline_sync(&conn, org_id, pipeline_id)?;
                (
                    pipeline.name,
                    pipeline_counts(&conn, org_id, pipeline_id, range)?,
                )
            }
        };

        let stages = attach_rates(counts);
        let (overall_conversion, biggest_drop_stage) = summarize_funnel(&stages);
        Ok(FunnelStats {
            funnel_name,
            stages,
            overall_conversion,
            biggest_drop_stage,
        })
    }
}
