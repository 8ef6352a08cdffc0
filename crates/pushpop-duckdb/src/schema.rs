/// DuckDB initialization SQL.
///
/// Executed once at database open time via `Connection::execute_batch`.
/// All statements use `IF NOT EXISTS` so they are safe to re-run on every
/// startup.
///
/// `memory_limit` comes from `Config.duckdb_memory_limit`
/// (env `PUSHPOP_DUCKDB_MEMORY`, default `"1GB"`).
///
/// DuckDB enforces foreign keys immediately, which fights the manual
/// cascade order in `delete_site()`. Ownership links (`user_id`, `site_id`)
/// are therefore plain indexed columns, and cascades run child-first inside a
/// single transaction.
///
/// Every table that is listed newest-first carries a `seq` column fed from a
/// sequence. `created_at` alone ties for rows written within the same
/// microsecond, and the A/B rotation needs a total order.
pub fn init_sql(memory_limit: &str) -> String {
    format!(
        r#"SET memory_limit = '{memory_limit}';
SET threads = 2;

-- ===========================================
-- SETTINGS
-- ===========================================
-- Keys stored in this table:
--   'jwt_secret'  – session/wizard signing secret when PUSHPOP_SESSION_SECRET is unset
CREATE TABLE IF NOT EXISTS settings (
    key             VARCHAR PRIMARY KEY,
    value           VARCHAR NOT NULL
);

-- ===========================================
-- USERS
-- ===========================================
CREATE TABLE IF NOT EXISTS users (
    id              VARCHAR PRIMARY KEY,           -- UUID v4
    name            VARCHAR NOT NULL,
    email           VARCHAR NOT NULL UNIQUE,       -- lower-cased
    password_hash   VARCHAR NOT NULL,              -- argon2id PHC string
    is_blocked      BOOLEAN NOT NULL DEFAULT false, -- only the wizard console sets this
    created_at      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);

-- ===========================================
-- SITES
-- ===========================================
CREATE SEQUENCE IF NOT EXISTS sites_seq;
CREATE TABLE IF NOT EXISTS sites (
    id                VARCHAR PRIMARY KEY,         -- 'site_' + nanoid(10); also the public embed id
    user_id           VARCHAR NOT NULL,
    name              VARCHAR NOT NULL,
    domain            VARCHAR NOT NULL,
    is_popup_verified BOOLEAN NOT NULL DEFAULT false,
    is_push_verified  BOOLEAN NOT NULL DEFAULT false,
    seq               BIGINT NOT NULL DEFAULT nextval('sites_seq'),
    created_at        TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at        TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE INDEX IF NOT EXISTS idx_sites_user ON sites(user_id);

-- ===========================================
-- POPUPS
-- ===========================================
-- styles/components/settings/triggers are opaque JSON documents authored by
-- the dashboard; stored as VARCHAR and parsed on read.
CREATE SEQUENCE IF NOT EXISTS popups_seq;
CREATE TABLE IF NOT EXISTS popups (
    id                VARCHAR PRIMARY KEY,         -- UUID v4
    site_id           VARCHAR NOT NULL,
    user_id           VARCHAR NOT NULL,
    title             VARCHAR NOT NULL,
    description       VARCHAR NOT NULL DEFAULT '',
    cta_text          VARCHAR NOT NULL,
    styles            VARCHAR NOT NULL,
    components        VARCHAR NOT NULL,
    settings          VARCHAR NOT NULL,
    triggers          VARCHAR NOT NULL,
    is_active         BOOLEAN NOT NULL DEFAULT true,
    test_group_id     VARCHAR,                     -- A/B cohort; NULL when not under test
    variant_label     VARCHAR,                     -- rotation order within the cohort
    -- Denormalized counters, bumped outside the event/lead write.
    stats_visitors    BIGINT NOT NULL DEFAULT 0,
    stats_views       BIGINT NOT NULL DEFAULT 0,
    stats_submissions BIGINT NOT NULL DEFAULT 0,
    seq               BIGINT NOT NULL DEFAULT nextval('popups_seq'),
    created_at        TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at        TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
-- Embed resolution: active popups for a site, newest first.
CREATE INDEX IF NOT EXISTS idx_popups_site_active ON popups(site_id, is_active);
CREATE INDEX IF NOT EXISTS idx_popups_user_site ON popups(user_id, site_id);

-- ===========================================
-- LEADS
-- ===========================================
-- (site_id, popup_id, email) is unique when email is present. Enforced by
-- the insert path rather than a UNIQUE index so that email can be updated by
-- the merge path without tripping DuckDB's delete+insert index maintenance.
CREATE SEQUENCE IF NOT EXISTS leads_seq;
CREATE TABLE IF NOT EXISTS leads (
    id              VARCHAR PRIMARY KEY,           -- UUID v4
    site_id         VARCHAR NOT NULL,
    popup_id        VARCHAR NOT NULL,
    user_id         VARCHAR,                       -- owner of the popup
    email           VARCHAR,
    data            VARCHAR NOT NULL DEFAULT '{{}}', -- JSON object of form fields
    seq             BIGINT NOT NULL DEFAULT nextval('leads_seq'),
    created_at      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE INDEX IF NOT EXISTS idx_leads_site_popup_email ON leads(site_id, popup_id, email);
CREATE INDEX IF NOT EXISTS idx_leads_user ON leads(user_id);

-- ===========================================
-- EVENTS (append-only)
-- ===========================================
CREATE SEQUENCE IF NOT EXISTS events_seq;
CREATE TABLE IF NOT EXISTS events (
    id              VARCHAR NOT NULL,              -- UUID v4
    site_id         VARCHAR NOT NULL,
    popup_id        VARCHAR NOT NULL,
    user_id         VARCHAR,
    event_type      VARCHAR NOT NULL,              -- 'view' | 'conversion' | 'visit'
    seq             BIGINT NOT NULL DEFAULT nextval('events_seq'),
    created_at      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE INDEX IF NOT EXISTS idx_events_user_time ON events(user_id, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_events_popup ON events(popup_id, event_type);

-- ===========================================
-- SUBSCRIBERS (push tokens)
-- ===========================================
CREATE TABLE IF NOT EXISTS subscribers (
    id              VARCHAR PRIMARY KEY,
    site_id         VARCHAR NOT NULL,
    token           VARCHAR NOT NULL,
    created_at      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_subscribers_site_token ON subscribers(site_id, token);

-- ===========================================
-- NOTIFICATION CAMPAIGNS
-- ===========================================
CREATE SEQUENCE IF NOT EXISTS campaigns_seq;
CREATE TABLE IF NOT EXISTS notification_campaigns (
    id              VARCHAR PRIMARY KEY,           -- UUID v4
    user_id         VARCHAR NOT NULL,
    site_id         VARCHAR NOT NULL,
    title           VARCHAR NOT NULL,
    body            VARCHAR NOT NULL,
    icon            VARCHAR NOT NULL DEFAULT '/icon.png',
    link            VARCHAR,
    image           VARCHAR,
    scheduled_at    TIMESTAMP,
    status          VARCHAR NOT NULL DEFAULT 'draft', -- 'draft' | 'scheduled' | 'sending' | 'sent' | 'failed'
    sent_count      BIGINT NOT NULL DEFAULT 0,
    failure_count   BIGINT NOT NULL DEFAULT 0,
    seq             BIGINT NOT NULL DEFAULT nextval('campaigns_seq'),
    created_at      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at      TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE INDEX IF NOT EXISTS idx_campaigns_user_site ON notification_campaigns(user_id, site_id);
"#
    )
}
