use anyhow::Result;
use duckdb::types::ToSql;

use pushpop_core::campaign::{CampaignStatus, NewCampaign, NotificationCampaign};

use crate::backend::new_id;
use crate::DuckDbBackend;

const CAMPAIGN_COLUMNS: &str = "id, user_id, site_id, title, body, icon, link, image, \
     CAST(scheduled_at AS VARCHAR), status, sent_count, failure_count, \
     CAST(created_at AS VARCHAR), CAST(updated_at AS VARCHAR)";

fn map_campaign(row: &duckdb::Row<'_>) -> duckdb::Result<NotificationCampaign> {
    let raw_status: String = row.get(9)?;
    let status = raw_status.parse::<CampaignStatus>().map_err(|e| {
        duckdb::Error::FromSqlConversionFailure(9, duckdb::types::Type::Text, Box::new(e))
    })?;
    Ok(NotificationCampaign {
        id: row.get(0)?,
        user_id: row.get(1)?,
        site_id: row.get(2)?,
        title: row.get(3)?,
        body: row.get(4)?,
        icon: row.get(5)?,
        link: row.get(6)?,
        image: row.get(7)?,
        scheduled_at: row.get(8)?,
        status,
        sent_count: row.get(10)?,
        failure_count: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

fn select_campaign(
    conn: &duckdb::Connection,
    user_id: &str,
    id: &str,
) -> Result<Option<NotificationCampaign>> {
    let result = conn
        .prepare(&format!(
            "SELECT {CAMPAIGN_COLUMNS} FROM notification_campaigns WHERE id = ?1 AND user_id = ?2"
        ))?
        .query_row(duckdb::params![id, user_id], map_campaign);
    match result {
        Ok(c) => Ok(Some(c)),
        Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl DuckDbBackend {
    pub async fn create_campaign(
        &self,
        user_id: &str,
        campaign: &NewCampaign,
    ) -> Result<NotificationCampaign> {
        let conn = self.conn.lock().await;
        let id = new_id();
        let scheduled_at = campaign
            .scheduled_at
            .map(|t| t.naive_utc().format("%Y-%m-%d %H:%M:%S%.6f").to_string());

        conn.execute(
            r#"INSERT INTO notification_campaigns (
                id, user_id, site_id, title, body, icon, link, image,
                scheduled_at, status, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8,
                CAST(?9 AS TIMESTAMP), ?10, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP
            )"#,
            duckdb::params![
                id,
                user_id,
                campaign.site_id,
                campaign.title,
                campaign.body,
                campaign.icon,
                campaign.link,
                campaign.image,
                scheduled_at,
                campaign.initial_status().as_str(),
            ],
        )?;

        select_campaign(&conn, user_id, &id)?
            .ok_or_else(|| anyhow::anyhow!("campaign {id} missing after insert"))
    }

    /// The caller's campaigns, newest first, optionally for one site.
    pub async fn list_campaigns(
        &self,
        user_id: &str,
        site_id: Option<&str>,
    ) -> Result<Vec<NotificationCampaign>> {
        let conn = self.conn.lock().await;
        let mut sql =
            format!("SELECT {CAMPAIGN_COLUMNS} FROM notification_campaigns WHERE user_id = ?1");
        let mut params: Vec<Box<dyn ToSql>> = vec![Box::new(user_id.to_string())];
        if let Some(site_id) = site_id {
            params.push(Box::new(site_id.to_string()));
            sql.push_str(" AND site_id = ?2");
        }
        sql.push_str(" ORDER BY created_at DESC, seq DESC");

        let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(param_refs.as_slice(), map_campaign)?;
        let mut campaigns = Vec::new();
        for row in rows {
            campaigns.push(row?);
        }
        Ok(campaigns)
    }

    pub async fn get_campaign(&self, user_id: &str, id: &str) -> Result<Option<NotificationCampaign>> {
        let conn = self.conn.lock().await;
        select_campaign(&conn, user_id, id)
    }

    pub async fn delete_campaign(&self, user_id: &str, id: &str) -> Result<bool> {
        let conn = self.conn.lock().await;
        let deleted = conn.execute(
            "DELETE FROM notification_campaigns WHERE id = ?1 AND user_id = ?2",
            duckdb::params![id, user_id],
        )?;
        Ok(deleted > 0)
    }

    /// Move the campaign to `sending` unless it is already `sent` or another
    /// send holds it. Returns `false` when the claim was not taken.
    pub async fn claim_campaign_for_send(&self, user_id: &str, id: &str) -> Result<bool> {
        let conn = self.conn.lock().await;
        let claimed = conn.execute(
            "UPDATE notification_campaigns \
             SET status = ?1, updated_at = CURRENT_TIMESTAMP \
             WHERE id = ?2 AND user_id = ?3 AND status NOT IN (?4, ?1)",
            duckdb::params![
                CampaignStatus::Sending.as_str(),
                id,
                user_id,
                CampaignStatus::Sent.as_str(),
            ],
        )?;
        Ok(claimed == 1)
    }

    /// Persist the outcome of a dispatch attempt.
    pub async fn record_campaign_result(
        &self,
        user_id: &str,
        id: &str,
        status: CampaignStatus,
        sent_count: i64,
        failure_count: i64,
    ) -> Result<Option<NotificationCampaign>> {
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE notification_campaigns \
             SET status = ?1, sent_count = ?2, failure_count = ?3, updated_at = CURRENT_TIMESTAMP \
             WHERE id = ?4 AND user_id = ?5",
            duckdb::params![status.as_str(), sent_count, failure_count, id, user_id],
        )?;
        select_campaign(&conn, user_id, id)
    }
}
