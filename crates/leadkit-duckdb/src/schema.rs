/// DuckDB initialization SQL.
///
/// Executed once at database open time via `Connection::execute_batch`.
/// All statements use `IF NOT EXISTS` so they are safe to re-run on every
/// startup (idempotent).
///
/// `memory_limit` is passed at runtime from `Config.duckdb_memory_limit`
/// (env `LEADKIT_DUCKDB_MEMORY`, default `"1GB"`). Always set an explicit
/// limit — the DuckDB default (80% of system RAM) is not acceptable for a
/// server process. `SET threads = 2` keeps the background thread pool small
/// for single-writer embedded use.
///
/// Every tenant-owned table carries `organization_id`; queries must filter
/// by it (or join back to it). Cross-tenant leakage is the primary
/// correctness risk in this schema.
pub fn init_sql(memory_limit: &str) -> String {
    format!(
        r#"SET memory_limit = '{memory_limit}';
SET threads = 2;

-- ===========================================
-- SETTINGS (instance-level key/value)
-- ===========================================
-- Keys stored in this table:
--   'jwt_secret'  – random hex secret for session JWTs, generated on first run
--   'version'     – schema version
--   'install_id'  – unique installation identifier
CREATE TABLE IF NOT EXISTS settings (
    key             VARCHAR PRIMARY KEY,
    value           VARCHAR NOT NULL
);

-- ===========================================
-- ORGANIZATIONS (tenant root)
-- ===========================================
CREATE TABLE IF NOT EXISTS organizations (
    id              VARCHAR PRIMARY KEY,           -- 'org_' + 10 alphanum
    name            VARCHAR NOT NULL,
    created_at      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS users (
    id              VARCHAR PRIMARY KEY,           -- 'usr_' + 10 alphanum
    organization_id VARCHAR NOT NULL,
    email           VARCHAR NOT NULL UNIQUE,
    name            VARCHAR NOT NULL,
    role            VARCHAR NOT NULL DEFAULT 'member',   -- 'admin' | 'member'
    password_hash   VARCHAR NOT NULL,
    created_at      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE INDEX IF NOT EXISTS idx_users_org ON users(organization_id);

-- ===========================================
-- CONTACTS
-- ===========================================
CREATE TABLE IF NOT EXISTS contacts (
    id              VARCHAR PRIMARY KEY,           -- 'c_' + 10 alphanum
    organization_id VARCHAR NOT NULL,
    email           VARCHAR NOT NULL,
    first_name      VARCHAR,
    last_name       VARCHAR,
    phone           VARCHAR,
    status          VARCHAR NOT NULL DEFAULT 'lead',     -- 'lead' | 'active' | 'inactive'
    source          VARCHAR,                             -- acquisition channel
    created_at      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    UNIQUE (organization_id, email)
);
CREATE INDEX IF NOT EXISTS idx_contacts_org_created ON contacts(organization_id, created_at);
CREATE INDEX IF NOT EXISTS idx_contacts_org_source  ON contacts(organization_id, source);

CREATE TABLE IF NOT EXISTS contact_tags (
    contact_id      VARCHAR NOT NULL,
    organization_id VARCHAR NOT NULL,
    tag             VARCHAR NOT NULL,
    created_at      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    UNIQUE (contact_id, tag)
);

-- ===========================================
-- PIPELINES / STAGES / DEALS
-- ===========================================
CREATE TABLE IF NOT EXISTS pipelines (
    id              VARCHAR PRIMARY KEY,           -- 'pipe_' + 10 alphanum
    organization_id VARCHAR NOT NULL,
    name            VARCHAR NOT NULL,
    created_at      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE INDEX IF NOT EXISTS idx_pipelines_org ON pipelines(organization_id);

CREATE TABLE IF NOT EXISTS stages (
    id              VARCHAR PRIMARY KEY,           -- 'stg_' + 10 alphanum
    pipeline_id     VARCHAR NOT NULL,
    name            VARCHAR NOT NULL,
    position        BIGINT NOT NULL,               -- 0-based order within the pipeline
    created_at      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE INDEX IF NOT EXISTS idx_stages_pipeline ON stages(pipeline_id, position);

CREATE TABLE IF NOT EXISTS deals (
    id              VARCHAR PRIMARY KEY,           -- 'deal_' + 10 alphanum
    organization_id VARCHAR NOT NULL,
    pipeline_id     VARCHAR NOT NULL,
    stage_id        VARCHAR NOT NULL,              -- must belong to pipeline_id
    contact_id      VARCHAR,
    title           VARCHAR NOT NULL,
    value           DOUBLE NOT NULL DEFAULT 0,
    status          VARCHAR NOT NULL DEFAULT 'open',     -- 'open' | 'won' | 'lost'
    created_at      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE INDEX IF NOT EXISTS idx_deals_org_created  ON deals(organization_id, created_at);
CREATE INDEX IF NOT EXISTS idx_deals_org_pipeline ON deals(organization_id, pipeline_id);

-- Append-only record of stage entries; substrate for dwell-time and
-- pipeline-funnel aggregation. One row on deal creation, one per move.
CREATE TABLE IF NOT EXISTS deal_stage_history (
    id              VARCHAR PRIMARY KEY,
    deal_id         VARCHAR NOT NULL,
    stage_id        VARCHAR NOT NULL,
    entered_at      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE INDEX IF NOT EXISTS idx_stage_history_deal ON deal_stage_history(deal_id, entered_at);

-- ===========================================
-- EMAIL CAMPAIGNS
-- ===========================================
CREATE TABLE IF NOT EXISTS email_campaigns (
    id                 VARCHAR PRIMARY KEY,        -- 'camp_' + 10 alphanum
    organization_id    VARCHAR NOT NULL,
    name               VARCHAR NOT NULL,
    subject            VARCHAR NOT NULL,
    body               VARCHAR NOT NULL,
    channel            VARCHAR,                    -- attribution channel for ROI
    cost               DOUBLE NOT NULL DEFAULT 0,  -- spend, for ROI reporting
    status             VARCHAR NOT NULL DEFAULT 'draft',  -- 'draft' | 'scheduled' | 'sent' | 'cancelled'
    scheduled_at       TIMESTAMP,
    sent_at            TIMESTAMP,
    recipients_count   BIGINT NOT NULL DEFAULT 0,
    opened_count       BIGINT NOT NULL DEFAULT 0,
    clicked_count      BIGINT NOT NULL DEFAULT 0,
    bounced_count      BIGINT NOT NULL DEFAULT 0,
    unsubscribed_count BIGINT NOT NULL DEFAULT 0,
    created_at         TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at         TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE INDEX IF NOT EXISTS idx_campaigns_org_sent ON email_campaigns(organization_id, sent_at);

CREATE TABLE IF NOT EXISTS campaign_recipients (
    id              VARCHAR PRIMARY KEY,
    campaign_id     VARCHAR NOT NULL,
    contact_id      VARCHAR NOT NULL,
    status          VARCHAR NOT NULL DEFAULT 'pending',  -- 'pending' | 'delivered' | 'bounced'
    created_at      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    UNIQUE (campaign_id, contact_id)
);

-- ===========================================
-- FORMS
-- ===========================================
CREATE TABLE IF NOT EXISTS forms (
    id              VARCHAR PRIMARY KEY,           -- 'form_' + 10 alphanum
    organization_id VARCHAR NOT NULL,
    name            VARCHAR NOT NULL,
    fields          VARCHAR NOT NULL,              -- JSON array of field definitions
    created_at      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS form_submissions (
    id              VARCHAR PRIMARY KEY,
    form_id         VARCHAR NOT NULL,
    organization_id VARCHAR NOT NULL,
    payload         VARCHAR NOT NULL,              -- JSON object of submitted values
    contact_id      VARCHAR,                       -- contact upserted from the payload email
    created_at      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE INDEX IF NOT EXISTS idx_submissions_form ON form_submissions(form_id, created_at);

-- ===========================================
-- WORKFLOWS (definitions only; no execution engine)
-- ===========================================
CREATE TABLE IF NOT EXISTS workflows (
    id              VARCHAR PRIMARY KEY,           -- 'wf_' + 10 alphanum
    organization_id VARCHAR NOT NULL,
    name            VARCHAR NOT NULL,
    trigger_type    VARCHAR NOT NULL,
    steps           VARCHAR NOT NULL DEFAULT '[]', -- JSON array of typed steps
    is_active       BOOLEAN NOT NULL DEFAULT FALSE,
    created_at      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);

-- ===========================================
-- APPOINTMENTS
-- ===========================================
CREATE TABLE IF NOT EXISTS appointments (
    id              VARCHAR PRIMARY KEY,           -- 'appt_' + 10 alphanum
    organization_id VARCHAR NOT NULL,
    contact_id      VARCHAR,
    title           VARCHAR NOT NULL,
    starts_at       TIMESTAMP NOT NULL,
    ends_at         TIMESTAMP NOT NULL,
    status          VARCHAR NOT NULL DEFAULT 'scheduled', -- 'scheduled' | 'confirmed' | 'cancelled' | 'completed'
    notes           VARCHAR,
    created_at      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE INDEX IF NOT EXISTS idx_appointments_org ON appointments(organization_id, starts_at);

-- ===========================================
-- COURSES
-- ===========================================
CREATE TABLE IF NOT EXISTS courses (
    id              VARCHAR PRIMARY KEY,           -- 'crs_' + 10 alphanum
    organization_id VARCHAR NOT NULL,
    title           VARCHAR NOT NULL,
    description     VARCHAR,
    price           DOUBLE NOT NULL DEFAULT 0,
    status          VARCHAR NOT NULL DEFAULT 'draft',    -- 'draft' | 'published' | 'archived'
    created_at      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS course_enrollments (
    id              VARCHAR PRIMARY KEY,
    course_id       VARCHAR NOT NULL,
    contact_id      VARCHAR NOT NULL,
    organization_id VARCHAR NOT NULL,
    created_at      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    UNIQUE (course_id, contact_id)
);

-- ===========================================
-- ANALYTICS EVENTS (append-only fact table)
-- ===========================================
CREATE TABLE IF NOT EXISTS analytics_events (
    id              VARCHAR PRIMARY KEY,           -- UUID v4
    organization_id VARCHAR NOT NULL,
    user_id         VARCHAR,
    contact_id      VARCHAR,                       -- engagement attribution (nullable)
    event_type      VARCHAR NOT NULL,
    event_data      VARCHAR,                       -- JSON string for custom properties
    source          VARCHAR,
    campaign        VARCHAR,
    created_at      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE INDEX IF NOT EXISTS idx_events_org_type    ON analytics_events(organization_id, event_type, created_at);
CREATE INDEX IF NOT EXISTS idx_events_org_contact ON analytics_events(organization_id, contact_id);
"#
    )
}
