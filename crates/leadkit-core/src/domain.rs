//! Domain entities and request payloads.
//!
//! Every entity except [`Organization`] carries an `organization_id` tenant
//! key; repositories must scope all reads and writes by it. Timestamps are
//! kept as strings at this layer — DuckDB timestamps are cast to VARCHAR in
//! the row mappers and serialized verbatim.

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

// ---------------------------------------------------------------------------
// Organization / User
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct Organization {
    pub id: String,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    #[default]
    Member,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Member => "member",
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw {
            "admin" => Self::Admin,
            _ => Self::Member,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: String,
    pub organization_id: String,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: String,
    pub updated_at: String,
}

// ---------------------------------------------------------------------------
// Contacts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContactStatus {
    #[default]
    Lead,
    Active,
    Inactive,
}

impl ContactStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lead => "lead",
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        match raw {
            "lead" => Ok(Self::Lead),
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            other => Err(StoreError::Validation(format!(
                "unknown contact status '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Contact {
    pub id: String,
    pub organization_id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub status: ContactStatus,
    pub source: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateContactRequest {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub status: Option<ContactStatus>,
    pub source: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateContactRequest {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub status: Option<ContactStatus>,
    pub source: Option<String>,
}

// ---------------------------------------------------------------------------
// Pipelines / Stages / Deals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct Stage {
    pub id: String,
    pub pipeline_id: String,
    pub name: String,
    pub position: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Pipeline {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub stages: Vec<Stage>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePipelineRequest {
    pub name: String,
    /// Ordered stage names; positions are assigned from list order.
    pub stages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DealStatus {
    #[default]
    Open,
    Won,
    Lost,
}

impl DealStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Won => "won",
            Self::Lost => "lost",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        match raw {
            "open" => Ok(Self::Open),
            "won" => Ok(Self::Won),
            "lost" => Ok(Self::Lost),
            other => Err(StoreError::Validation(format!(
                "unknown deal status '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Deal {
    pub id: String,
    pub organization_id: String,
    pub pipeline_id: String,
    pub stage_id: String,
    pub contact_id: Option<String>,
    pub title: String,
    pub value: f64,
    pub status: DealStatus,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDealRequest {
    pub pipeline_id: String,
    /// Defaults to the pipeline's first stage when omitted.
    pub stage_id: Option<String>,
    pub contact_id: Option<String>,
    pub title: String,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateDealRequest {
    pub title: Option<String>,
    pub value: Option<f64>,
    pub contact_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Email campaigns
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    #[default]
    Draft,
    Scheduled,
    Sent,
    Cancelled,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Scheduled => "scheduled",
            Self::Sent => "sent",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        match raw {
            "draft" => Ok(Self::Draft),
            "scheduled" => Ok(Self::Scheduled),
            "sent" => Ok(Self::Sent),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(StoreError::Validation(format!(
                "unknown campaign status '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EmailCampaign {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub subject: String,
    pub body: String,
    pub channel: Option<String>,
    pub cost: f64,
    pub status: CampaignStatus,
    pub scheduled_at: Option<String>,
    pub sent_at: Option<String>,
    pub recipients_count: i64,
    pub opened_count: i64,
    pub clicked_count: i64,
    pub bounced_count: i64,
    pub unsubscribed_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCampaignRequest {
    pub name: String,
    pub subject: String,
    pub body: String,
    pub channel: Option<String>,
    pub cost: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCampaignRequest {
    pub name: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
    pub channel: Option<String>,
    pub cost: Option<f64>,
}

// ---------------------------------------------------------------------------
// Forms
// ---------------------------------------------------------------------------

/// A single field definition on a form. Stored as JSON text in the `forms`
/// table but always round-tripped through this struct at the repository
/// boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Form {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub fields: Vec<FormField>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateFormRequest {
    pub name: String,
    pub fields: Vec<FormField>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateFormRequest {
    pub name: Option<String>,
    pub fields: Option<Vec<FormField>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FormSubmission {
    pub id: String,
    pub form_id: String,
    pub organization_id: String,
    pub payload: serde_json::Value,
    pub contact_id: Option<String>,
    pub created_at: String,
}

// ---------------------------------------------------------------------------
// Workflows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub step_type: String,
    #[serde(default)]
    pub step_config: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct Workflow {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub trigger_type: String,
    pub steps: Vec<WorkflowStep>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateWorkflowRequest {
    pub name: String,
    pub trigger_type: String,
    #[serde(default)]
    pub steps: Vec<WorkflowStep>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateWorkflowRequest {
    pub name: Option<String>,
    pub trigger_type: Option<String>,
    pub steps: Option<Vec<WorkflowStep>>,
}

/// Outcome of an idempotent activate/deactivate flip.
#[derive(Debug, Clone, Serialize)]
pub struct ToggleResult {
    pub is_active: bool,
    /// False when the workflow was already in the requested state and no
    /// write happened.
    pub changed: bool,
}

// ---------------------------------------------------------------------------
// Appointments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    #[default]
    Scheduled,
    Confirmed,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        match raw {
            "scheduled" => Ok(Self::Scheduled),
            "confirmed" => Ok(Self::Confirmed),
            "cancelled" => Ok(Self::Cancelled),
            "completed" => Ok(Self::Completed),
            other => Err(StoreError::Validation(format!(
                "unknown appointment status '{other}'"
            ))),
        }
    }

    /// Terminal states reject any further mutation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Completed)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Appointment {
    pub id: String,
    pub organization_id: String,
    pub contact_id: Option<String>,
    pub title: String,
    pub starts_at: String,
    pub ends_at: String,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAppointmentRequest {
    pub contact_id: Option<String>,
    pub title: String,
    pub starts_at: String,
    pub ends_at: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub title: Option<String>,
    pub starts_at: Option<String>,
    pub ends_at: Option<String>,
    pub notes: Option<String>,
}

// ---------------------------------------------------------------------------
// Courses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CourseStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl CourseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Archived => "archived",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        match raw {
            "draft" => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            "archived" => Ok(Self::Archived),
            other => Err(StoreError::Validation(format!(
                "unknown course status '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Course {
    pub id: String,
    pub organization_id: String,
    pub title: String,
    pub description: Option<String>,
    pub price: f64,
    pub status: CourseStatus,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCourseRequest {
    pub title: String,
    pub description: Option<String>,
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCourseRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
}

// ---------------------------------------------------------------------------
// Analytics events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsEvent {
    pub id: String,
    pub organization_id: String,
    pub user_id: Option<String>,
    pub contact_id: Option<String>,
    pub event_type: String,
    pub event_data: Option<serde_json::Value>,
    pub source: Option<String>,
    pub campaign: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordEventRequest {
    pub event_type: String,
    pub contact_id: Option<String>,
    pub event_data: Option<serde_json::Value>,
    pub source: Option<String>,
    pub campaign: Option<String>,
}
