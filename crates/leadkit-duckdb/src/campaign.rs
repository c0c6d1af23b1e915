use duckdb::Connection;

use leadkit_core::domain::{
    CampaignStatus, CreateCampaignRequest, EmailCampaign, UpdateCampaignRequest,
};
use leadkit_core::error::StoreError;

use crate::backend::generate_id;
use crate::store::{db_err, fetch_row, paginate, update_row, FieldValue, Page, PageRequest};
use crate::LeadStore;

const CAMPAIGN_COLUMNS: &str = "id, organization_id, name, subject, body, channel, cost, status, \
     CAST(scheduled_at AS VARCHAR), CAST(sent_at AS VARCHAR), recipients_count, opened_count, \
     clicked_count, bounced_count, unsubscribed_count, \
     CAST(created_at AS VARCHAR), CAST(updated_at AS VARCHAR)";

fn map_campaign(row: &duckdb::Row<'_>) -> duckdb::Result<EmailCampaign> {
    let status: String = row.get(7)?;
    Ok(EmailCampaign {
        id: row.get(0)?,
        organization_id: row.get(1)?,
        name: row.get(2)?,
        subject: row.get(3)?,
        body: row.get(4)?,
        channel: row.get(5)?,
        cost: row.get(6)?,
        status: CampaignStatus::parse(&status).unwrap_or_default(),
        scheduled_at: row.get(8)?,
        sent_at: row.get(9)?,
        recipients_count: row.get(10)?,
        opened_count: row.get(11)?,
        clicked_count: row.get(12)?,
        bounced_count: row.get(13)?,
        unsubscribed_count: row.get(14)?,
        created_at: row.get(15)?,
        updated_at: row.get(16)?,
    })
}

fn get_campaign_sync(
    conn: &Connection,
    org_id: &str,
    id: &str,
) -> Result<EmailCampaign, StoreError> {
    let sql = format!(
        "SELECT {CAMPAIGN_COLUMNS} FROM email_campaigns WHERE id = ?1 AND organization_id = ?2"
    );
    fetch_row(conn, &sql, &[&id, &org_id], map_campaign)?
        .ok_or_else(|| StoreError::not_found("campaign"))
}

/// Engagement counters that accumulate on a sent campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngagementKind {
    Opened,
    Clicked,
    Bounced,
    Unsubscribed,
}

impl EngagementKind {
    fn column(&self) -> &'static str {
        match self {
            Self::Opened => "opened_count",
            Self::Clicked => "clicked_count",
            Self::Bounced => "bounced_count",
            Self::Unsubscribed => "unsubscribed_count",
        }
    }
}

impl LeadStore {
    pub async fn create_campaign(
        &self,
        org_id: &str,
        req: CreateCampaignRequest,
    ) -> Result<EmailCampaign, StoreError> {
        if req.name.trim().is_empty() {
            return Err(StoreError::Validation("name must not be empty".to_string()));
        }
        if req.subject.trim().is_empty() {
            return Err(StoreError::Validation(
                "subject must not be empty".to_string(),
            ));
        }
        let cost = req.cost.unwrap_or(0.0);
        if cost < 0.0 {
            return Err(StoreError::Validation(
                "cost must be non-negative".to_string(),
            ));
        }

        let conn = self.conn.lock().await;
        let id = generate_id("camp");
        crate::store::insert_row(
            &conn,
            "email_campaigns",
            &[
                ("id", FieldValue::from(id.as_str())),
                ("organization_id", FieldValue::from(org_id)),
                ("name", FieldValue::from(req.name.trim())),
                ("subject", FieldValue::from(req.subject.trim())),
                ("body", FieldValue::Text(req.body)),
                ("channel", FieldValue::from(req.channel)),
                ("cost", FieldValue::Float(cost)),
            ],
        )?;
        get_campaign_sync(&conn, org_id, &id)
    }

    pub async fn get_campaign(&self, org_id: &str, id: &str) -> Result<EmailCampaign, StoreError> {
        let conn = self.conn.lock().await;
        get_campaign_sync(&conn, org_id, id)
    }

    pub async fn list_campaigns(
        &self,
        org_id: &str,
        status: Option<CampaignStatus>,
        req: &PageRequest,
    ) -> Result<Page<EmailCampaign>, StoreError> {
        let conn = self.conn.lock().await;
        let mut filters: Vec<(&str, FieldValue)> =
            vec![("organization_id", FieldValue::from(org_id))];
        if let Some(ref status) = status {
            filters.push(("status", FieldValue::from(status.as_str())));
        }
        paginate(
            &conn,
            "email_campaigns",
            CAMPAIGN_COLUMNS,
            &filters,
            req,
            &["created_at", "updated_at", "sent_at", "name"],
            map_campaign,
        )
    }

    /// Edit campaign content. Only draft campaigns are editable.
    pub async fn update_campaign(
        &self,
        org_id: &str,
        id: &str,
        req: UpdateCampaignRequest,
    ) -> Result<EmailCampaign, StoreError> {
        let conn = self.conn.lock().await;
        let campaign = get_campaign_sync(&conn, org_id, id)?;
        if campaign.status != CampaignStatus::Draft {
            return Err(StoreError::invalid_transition(
                "campaign",
                campaign.status.as_str(),
                "update",
            ));
        }

        let mut fields: Vec<(&str, FieldValue)> = Vec::new();
        if let Some(name) = req.name {
            fields.push(("name", FieldValue::Text(name)));
        }
        if let Some(subject) = req.subject {
            fields.push(("subject", FieldValue::Text(subject)));
        }
        if let Some(body) = req.body {
            fields.push(("body", FieldValue::Text(body)));
        }
        if let Some(channel) = req.channel {
            fields.push(("channel", FieldValue::Text(channel)));
        }
        if let Some(cost) = req.cost {
            if cost < 0.0 {
                return Err(StoreError::Validation(
                    "cost must be non-negative".to_string(),
                ));
            }
            fields.push(("cost", FieldValue::Float(cost)));
        }
        if fields.is_empty() {
            return Err(StoreError::Validation("no fields to update".to_string()));
        }

        update_row(
            &conn,
            "email_campaigns",
            &fields,
            "id = ?1 AND organization_id = ?2",
            &[FieldValue::from(id), FieldValue::from(org_id)],
        )?;
        get_campaign_sync(&conn, org_id, id)
    }

    /// draft → scheduled.
    pub async fn schedule_campaign(
        &self,
        org_id: &str,
        id: &str,
        send_at: &str,
    ) -> Result<EmailCampaign, StoreError> {
        let conn = self.conn.lock().await;
        let campaign = get_campaign_sync(&conn, org_id, id)?;
        if campaign.status != CampaignStatus::Draft {
            return Err(StoreError::invalid_transition(
                "campaign",
                campaign.status.as_str(),
                "schedule",
            ));
        }
        conn.execute(
            "UPDATE email_campaigns SET status = 'scheduled', scheduled_at = ?1, \
             updated_at = CURRENT_TIMESTAMP WHERE id = ?2 AND organization_id = ?3",
            duckdb::params![send_at, id, org_id],
        )
        .map_err(db_err)?;
        get_campaign_sync(&conn, org_id, id)
    }

    /// scheduled → cancelled.
    pub async fn cancel_campaign_schedule(
        &self,
        org_id: &str,
        id: &str,
    ) -> Result<EmailCampaign, StoreError> {
        let conn = self.conn.lock().await;
        let campaign = get_campaign_sync(&conn, org_id, id)?;
        if campaign.status != CampaignStatus::Scheduled {
            return Err(StoreError::invalid_transition(
                "campaign",
                campaign.status.as_str(),
                "cancel",
            ));
        }
        update_row(
            &conn,
            "email_campaigns",
            &[
                ("status", FieldValue::from("cancelled")),
                ("scheduled_at", FieldValue::Null),
            ],
            "id = ?1 AND organization_id = ?2",
            &[FieldValue::from(id), FieldValue::from(org_id)],
        )?;
        get_campaign_sync(&conn, org_id, id)
    }

    /// draft|scheduled → sent. Fans one campaign_recipients row out per
    /// active contact and stamps `recipients_count`, all in one
    /// transaction. No mail is delivered here — delivery is out of scope.
    pub async fn send_campaign(&self, org_id: &str, id: &str) -> Result<EmailCampaign, StoreError> {
        let mut conn = self.conn.lock().await;
        let campaign = get_campaign_sync(&conn, org_id, id)?;
        match campaign.status {
            CampaignStatus::Draft | CampaignStatus::Scheduled => {}
            _ => {
                return Err(StoreError::invalid_transition(
                    "campaign",
                    campaign.status.as_str(),
                    "send",
                ))
            }
        }

        let tx = conn.transaction().map_err(db_err)?;
        tx.execute(
            "INSERT INTO campaign_recipients (id, campaign_id, contact_id, status) \
             SELECT 'cr_' || c.id || '_' || ?1, ?1, c.id, 'pending' \
             FROM contacts c WHERE c.organization_id = ?2 AND c.status <> 'inactive'",
            duckdb::params![id, org_id],
        )
        .map_err(db_err)?;
        tx.execute(
            "UPDATE email_campaigns SET status = 'sent', sent_at = CURRENT_TIMESTAMP, \
             recipients_count = (SELECT COUNT(*) FROM campaign_recipients WHERE campaign_id = ?1), \
             updated_at = CURRENT_TIMESTAMP \
             WHERE id = ?1 AND organization_id = ?2",
            duckdb::params![id, org_id],
        )
        .map_err(db_err)?;
        tx.commit().map_err(db_err)?;

        get_campaign_sync(&conn, org_id, id)
    }

    /// Bump one engagement counter on a sent campaign.
    pub async fn record_campaign_engagement(
        &self,
        org_id: &str,
        id: &str,
        kind: EngagementKind,
    ) -> Result<EmailCampaign, StoreError> {
        let conn = self.conn.lock().await;
        let campaign = get_campaign_sync(&conn, org_id, id)?;
        if campaign.status != CampaignStatus::Sent {
            return Err(StoreError::invalid_transition(
                "campaign",
                campaign.status.as_str(),
                "record engagement on",
            ));
        }
        let column = kind.column();
        let sql = format!(
            "UPDATE email_campaigns SET {column} = {column} + 1, updated_at = CURRENT_TIMESTAMP \
             WHERE id = ?1 AND organization_id = ?2"
        );
        conn.execute(&sql, duckdb::params![id, org_id])
            .map_err(db_err)?;
        get_campaign_sync(&conn, org_id, id)
    }

    pub async fn delete_campaign(&self, org_id: &str, id: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().await;
        get_campaign_sync(&conn, org_id, id)?;
        let tx = conn.transaction().map_err(db_err)?;
        tx.execute(
            "DELETE FROM campaign_recipients WHERE campaign_id = ?1",
            duckdb::params![id],
        )
        .map_err(db_err)?;
        tx.execute(
            "DELETE FROM email_campaigns WHERE id = ?1 AND organization_id = ?2",
            duckdb::params![id, org_id],
        )
        .map_err(db_err)?;
        tx.commit().map_err(db_err)?;
        Ok(())
    }
}
