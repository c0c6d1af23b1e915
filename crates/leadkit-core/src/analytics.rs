//! Analytics request/response types shared by the query layer and the
//! HTTP handlers.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Longest accepted reporting range. Anything wider is rejected up front
/// rather than fanning a two-year-plus scan out to the engine.
pub const MAX_RANGE_DAYS: i64 = 730;

/// Time-bucketing strategy for grouped aggregates.
///
/// Resolved once per request from the `period` query parameter; only the
/// enum's own `trunc_unit` string is ever interpolated into SQL text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    #[default]
    Day,
    Week,
    Month,
}

impl Period {
    pub fn parse(raw: Option<&str>) -> Result<Self, StoreError> {
        match raw.map(str::trim) {
            None | Some("") | Some("day") => Ok(Self::Day),
            Some("week") => Ok(Self::Week),
            Some("month") => Ok(Self::Month),
            Some(_) => Err(StoreError::Validation(
                "period must be one of: day, week, month".to_string(),
            )),
        }
    }

    /// DATE_TRUNC unit keyword. Constrained to the three literals above, so
    /// it is safe to splice into a query string.
    pub fn trunc_unit(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
        }
    }
}

/// Validated inclusive reporting range.
#[derive(Debug, Clone, Copy)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Resolve optional `YYYY-MM-DD` query parameters against `today`.
    ///
    /// Missing bounds default to the trailing 30 days. Malformed dates,
    /// inverted ranges, and ranges wider than [`MAX_RANGE_DAYS`] are
    /// rejected with a validation error.
    pub fn resolve(
        start_date: Option<&str>,
        end_date: Option<&str>,
        today: NaiveDate,
    ) -> Result<Self, StoreError> {
        let end = match end_date {
            Some(raw) => parse_date(raw, "end_date")?,
            None => today,
        };
        let start = match start_date {
            Some(raw) => parse_date(raw, "start_date")?,
            None => end - chrono::Duration::days(29),
        };
        if end < start {
            return Err(StoreError::Validation(
                "end_date must be on or after start_date".to_string(),
            ));
        }
        if (end - start).num_days() + 1 > MAX_RANGE_DAYS {
            return Err(StoreError::Validation(format!(
                "date range cannot exceed {MAX_RANGE_DAYS} days"
            )));
        }
        Ok(Self { start, end })
    }

    /// Half-open UTC timestamp bounds `[start 00:00, end+1d 00:00)` as
    /// `YYYY-MM-DD HH:MM:SS` strings for parameter binding.
    pub fn bounds(&self) -> (String, String) {
        let end_next = self.end + chrono::Duration::days(1);
        (
            format!("{} 00:00:00", self.start.format("%Y-%m-%d")),
            format!("{} 00:00:00", end_next.format("%Y-%m-%d")),
        )
    }
}

fn parse_date(raw: &str, field: &str) -> Result<NaiveDate, StoreError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| StoreError::Validation(format!("{field} must be YYYY-MM-DD")))
}

/// Which funnel to report on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FunnelSelector {
    /// Event-type based marketing funnel: visit → lead → qualified → customer.
    Marketing,
    /// Stage-based funnel over a single pipeline's deals.
    Pipeline(String),
}

impl FunnelSelector {
    /// Accepts `marketing` (the default) or `pipeline:{id}`.
    pub fn parse(raw: Option<&str>) -> Result<Self, StoreError> {
        match raw.map(str::trim) {
            None | Some("") | Some("marketing") => Ok(Self::Marketing),
            Some(other) => match other.strip_prefix("pipeline:") {
                Some(id) if !id.is_empty() => Ok(Self::Pipeline(id.to_string())),
                _ => Err(StoreError::Validation(
                    "funnel must be 'marketing' or 'pipeline:{id}'".to_string(),
                )),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Result shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct GrowthPoint {
    pub time_period: String,
    pub new_contacts: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceBreakdown {
    pub source: String,
    pub count: i64,
    /// Share of all contacts in range, 1 decimal place.
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContactEngagement {
    pub contact_id: String,
    pub email: String,
    pub interactions: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContactSummary {
    pub total_contacts: i64,
    pub active_contacts: i64,
    pub new_contacts_30d: i64,
    /// Lead → customer conversion, 1 decimal place.
    pub conversion_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContactStats {
    pub growth: Vec<GrowthPoint>,
    pub sources: Vec<SourceBreakdown>,
    pub engagement: Vec<ContactEngagement>,
    pub summary: ContactSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct DealTimelinePoint {
    pub time_period: String,
    pub new_deals: i64,
    pub won_deals: i64,
    pub lost_deals: i64,
    pub won_value: f64,
    /// won / (won + lost) for the bucket, 1 decimal place. 0 when no closes.
    pub win_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineRollup {
    pub pipeline_id: String,
    pub pipeline_name: String,
    pub open_deals: i64,
    pub won_deals: i64,
    pub lost_deals: i64,
    pub open_value: f64,
    pub won_value: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageDuration {
    pub stage_id: String,
    pub stage_name: String,
    /// Mean days a deal spends in the stage, 1 decimal place.
    pub avg_days: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SalesVelocity {
    pub won_deals: i64,
    pub won_value: f64,
    /// Mean days from creation to close for 90-day wins, 1 decimal place.
    pub avg_days_to_close: f64,
    /// won_value / total days-to-close, 2 decimal places. 0 when no wins.
    pub sales_velocity_per_day: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DealStats {
    pub timeline: Vec<DealTimelinePoint>,
    pub pipelines: Vec<PipelineRollup>,
    pub stage_durations: Vec<StageDuration>,
    pub velocity: SalesVelocity,
}

#[derive(Debug, Clone, Serialize)]
pub struct CampaignTimelinePoint {
    pub time_period: String,
    pub campaigns_sent: i64,
    pub recipients: i64,
    pub open_rate: f64,
    pub click_rate: f64,
    pub unsubscribe_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CampaignPerformance {
    pub campaign_id: String,
    pub name: String,
    pub sent_at: Option<String>,
    pub recipients_count: i64,
    pub open_rate: f64,
    pub click_rate: f64,
    pub bounce_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HourBucket {
    pub hour: i64,
    pub opens: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeviceBucket {
    pub device_type: String,
    pub opens: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CampaignStats {
    pub timeline: Vec<CampaignTimelinePoint>,
    pub top_campaigns: Vec<CampaignPerformance>,
    pub open_hours: Vec<HourBucket>,
    pub devices: Vec<DeviceBucket>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunnelStage {
    pub stage: String,
    pub count: i64,
    /// Conversion vs the previous stage, 1 decimal place. The first stage
    /// reports 100 unless its own count is 0.
    pub conversion_rate: f64,
    /// Conversion vs the first stage, 1 decimal place.
    pub absolute_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunnelStats {
    pub funnel_name: String,
    pub stages: Vec<FunnelStage>,
    /// last stage / first stage, 1 decimal place.
    pub overall_conversion: f64,
    /// Stage with the largest previous→current drop; None with < 2 stages
    /// or an empty first stage.
    pub biggest_drop_stage: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChannelRoi {
    pub channel: String,
    pub cost: f64,
    pub leads: i64,
    pub opportunities: i64,
    pub revenue: f64,
    /// revenue / cost, 2 decimal places. 0 when the channel has no spend.
    pub roi: f64,
    pub cost_per_lead: f64,
    pub cost_per_opportunity: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoiStats {
    pub channels: Vec<ChannelRoi>,
}

/// Whole-tenant inventory counts. Not date-filtered; this is the state of
/// the organization now, not activity over a range.
#[derive(Debug, Clone, Serialize)]
pub struct OrganizationStats {
    pub users: i64,
    pub contacts: i64,
    pub open_deals: i64,
    pub open_deal_value: f64,
    pub won_deal_value: f64,
    pub campaigns_sent: i64,
    pub forms: i64,
    pub active_workflows: i64,
    pub upcoming_appointments: i64,
    pub published_courses: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserActivityRow {
    pub user_id: String,
    pub events: i64,
    pub event_types: i64,
    pub last_seen_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserActivityStats {
    pub users: Vec<UserActivityRow>,
}

/// Derive the funnel summary metrics from real stage counts.
///
/// `overall_conversion` is last/first; `biggest_drop_stage` names the stage
/// whose previous→current loss is largest. Zero-count previous stages are
/// skipped (their conversion is already pinned to 0 by the query layer).
pub fn summarize_funnel(stages: &[FunnelStage]) -> (f64, Option<String>) {
    let first = stages.first().map(|s| s.count).unwrap_or(0);
    let last = stages.last().map(|s| s.count).unwrap_or(0);
    let overall = if first > 0 {
        round1(last as f64 * 100.0 / first as f64)
    } else {
        0.0
    };

    let mut biggest: Option<(String, i64)> = None;
    for pair in stages.windows(2) {
        let drop = pair[0].count - pair[1].count;
        if drop > 0 && biggest.as_ref().map(|(_, d)| drop > *d).unwrap_or(true) {
            biggest = Some((pair[1].stage.clone(), drop));
        }
    }
    (overall, biggest.map(|(name, _)| name))
}

/// Round to 1 decimal place (rates and percentages).
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Round to 2 decimal places (ROI and velocity figures).
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(name: &str, count: i64) -> FunnelStage {
        FunnelStage {
            stage: name.to_string(),
            count,
            conversion_rate: 0.0,
            absolute_rate: 0.0,
        }
    }

    #[test]
    fn resolve_defaults_to_trailing_30_days() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 29).unwrap();
        let range = DateRange::resolve(None, None, today).unwrap();
        assert_eq!(range.end, today);
        assert_eq!((range.end - range.start).num_days(), 29);
    }

    #[test]
    fn resolve_rejects_inverted_range() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 29).unwrap();
        let err = DateRange::resolve(Some("2026-05-02"), Some("2026-05-01"), today);
        assert!(matches!(err, Err(StoreError::Validation(_))));
    }

    #[test]
    fn resolve_rejects_malformed_date() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 29).unwrap();
        let err = DateRange::resolve(Some("05/01/2026"), None, today);
        assert!(matches!(err, Err(StoreError::Validation(_))));
    }

    #[test]
    fn resolve_rejects_oversized_range() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 29).unwrap();
        let err = DateRange::resolve(Some("2020-01-01"), Some("2026-01-01"), today);
        assert!(matches!(err, Err(StoreError::Validation(_))));
    }

    #[test]
    fn funnel_selector_parses_pipeline_form() {
        assert_eq!(
            FunnelSelector::parse(Some("pipeline:pipe_9")).unwrap(),
            FunnelSelector::Pipeline("pipe_9".to_string())
        );
        assert_eq!(
            FunnelSelector::parse(None).unwrap(),
            FunnelSelector::Marketing
        );
        assert!(FunnelSelector::parse(Some("pipeline:")).is_err());
    }

    #[test]
    fn summarize_funnel_computes_overall_and_drop() {
        let stages = vec![stage("visit", 200), stage("lead", 80), stage("customer", 60)];
        let (overall, drop) = summarize_funnel(&stages);
        assert_eq!(overall, 30.0);
        assert_eq!(drop.as_deref(), Some("lead"));
    }

    #[test]
    fn summarize_funnel_empty_first_stage_is_zero() {
        let stages = vec![stage("visit", 0), stage("lead", 0)];
        let (overall, drop) = summarize_funnel(&stages);
        assert_eq!(overall, 0.0);
        assert!(drop.is_none());
    }

    #[test]
    fn rounding_helpers() {
        assert_eq!(round1(33.3333), 33.3);
        assert_eq!(round2(1.6666), 1.67);
    }
}
