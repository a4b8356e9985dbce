// src/sync.rs - Drive-style cloud backup collaborator
//
// The remote store holds a single named JSON document in the user's account,
// addressed by bearer token: find-by-name, create, overwrite, fetch-by-id.
// Background pushes are fire-and-forget with at most one attempt.
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::Serialize;

use crate::error::ApiError;
use crate::models::BackupDocument;

pub const BACKUP_FILENAME: &str = "validade_cloud_backup.json";

fn sync_err(e: impl std::fmt::Display) -> ApiError {
    ApiError::SyncError(e.to_string())
}

#[derive(Debug, Clone)]
pub struct DriveClient {
    http: reqwest::Client,
    api_base: String,
    access_token: String,
    backup_filename: String,
}

impl DriveClient {
    pub fn new(
        api_base: &str,
        access_token: &str,
        backup_filename: &str,
        timeout_seconds: u64,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(sync_err)?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
            backup_filename: backup_filename.to_string(),
        })
    }

    fn check_status(status: StatusCode) -> Result<(), ApiError> {
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ApiError::cloud_session_expired());
        }
        if !status.is_success() {
            return Err(ApiError::SyncError(format!(
                "Remote store answered {}",
                status
            )));
        }
        Ok(())
    }

    async fn find_backup_id(&self) -> Result<Option<String>, ApiError> {
        let response = self
            .http
            .get(format!("{}/drive/v3/files", self.api_base))
            .query(&[
                ("q", format!("name='{}'", self.backup_filename)),
                ("spaces", "drive".to_string()),
            ])
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(sync_err)?;
        Self::check_status(response.status())?;

        let body: serde_json::Value = response.json().await.map_err(sync_err)?;
        Ok(first_file_id(&body))
    }

    /// Uploads the snapshot, overwriting the existing document when one
    /// exists.
    pub async fn push(&self, document: &BackupDocument) -> Result<(), ApiError> {
        let file_id = self.find_backup_id().await?;

        let metadata = serde_json::json!({
            "name": self.backup_filename,
            "mimeType": "application/json",
        });
        let payload = serde_json::to_string(document).map_err(sync_err)?;
        let form = Form::new()
            .part(
                "metadata",
                Part::text(metadata.to_string())
                    .mime_str("application/json")
                    .map_err(sync_err)?,
            )
            .part(
                "file",
                Part::text(payload)
                    .mime_str("application/json")
                    .map_err(sync_err)?,
            );

        let request = match file_id {
            Some(id) => self.http.patch(format!(
                "{}/upload/drive/v3/files/{}?uploadType=multipart",
                self.api_base, id
            )),
            None => self.http.post(format!(
                "{}/upload/drive/v3/files?uploadType=multipart",
                self.api_base
            )),
        };

        let response = request
            .bearer_auth(&self.access_token)
            .multipart(form)
            .send()
            .await
            .map_err(sync_err)?;
        Self::check_status(response.status())
    }

    /// Fetches the remote snapshot, `None` when no document exists yet.
    pub async fn fetch(&self) -> Result<Option<serde_json::Value>, ApiError> {
        let Some(file_id) = self.find_backup_id().await? else {
            return Ok(None);
        };

        let response = self
            .http
            .get(format!("{}/drive/v3/files/{}", self.api_base, file_id))
            .query(&[("alt", "media")])
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(sync_err)?;
        Self::check_status(response.status())?;

        let body = response.json().await.map_err(sync_err)?;
        Ok(Some(body))
    }
}

fn first_file_id(body: &serde_json::Value) -> Option<String> {
    body.get("files")?
        .as_array()?
        .first()?
        .get("id")?
        .as_str()
        .map(str::to_string)
}

/// Number of products inside a remote snapshot of either accepted shape.
fn count_products(snapshot: &serde_json::Value) -> Option<usize> {
    snapshot
        .get("products")
        .and_then(|p| p.as_array())
        .or_else(|| snapshot.as_array())
        .map(|a| a.len())
}

// ==================== SESSION STATE ====================

#[derive(Debug)]
struct Session {
    client: DriveClient,
    last_sync: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
pub struct SyncService {
    session: RwLock<Option<Session>>,
}

#[derive(Debug, Serialize)]
pub struct SyncStatus {
    pub connected: bool,
    pub last_sync: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct RemoteProbe {
    pub snapshot_found: bool,
    pub product_count: Option<usize>,
}

impl SyncService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a session with the given client and probes the remote store for
    /// an existing snapshot, so the caller can offer a restore. The probe
    /// doubles as token validation.
    pub async fn connect(&self, client: DriveClient) -> Result<RemoteProbe, ApiError> {
        let snapshot = client.fetch().await?;
        let probe = RemoteProbe {
            snapshot_found: snapshot.is_some(),
            product_count: snapshot.as_ref().and_then(count_products),
        };

        *self.session.write().unwrap() = Some(Session {
            client,
            last_sync: None,
        });
        Ok(probe)
    }

    pub fn disconnect(&self) {
        *self.session.write().unwrap() = None;
    }

    pub fn status(&self) -> SyncStatus {
        let guard = self.session.read().unwrap();
        SyncStatus {
            connected: guard.is_some(),
            last_sync: guard.as_ref().and_then(|s| s.last_sync),
        }
    }

    fn client(&self) -> Option<DriveClient> {
        self.session.read().unwrap().as_ref().map(|s| s.client.clone())
    }

    /// Pulls the remote snapshot for an explicit, user-confirmed restore.
    pub async fn restore(&self) -> Result<serde_json::Value, ApiError> {
        let client = self.client().ok_or_else(ApiError::sync_not_connected)?;
        client
            .fetch()
            .await?
            .ok_or_else(|| ApiError::NotFound("No cloud snapshot found".to_string()))
    }

    /// Opportunistic push after a local mutation: skipped without a session,
    /// one attempt, failures only logged. Rapid successive mutations may
    /// overlap; last write wins at the remote store.
    pub fn push_background(self: Arc<Self>, document: BackupDocument) {
        let Some(client) = self.client() else {
            return;
        };
        tokio::spawn(async move {
            match client.push(&document).await {
                Ok(()) => {
                    if let Some(session) = self.session.write().unwrap().as_mut() {
                        session.last_sync = Some(Utc::now());
                    }
                    log::debug!("Cloud snapshot pushed");
                }
                Err(e) => log::warn!("Cloud push failed: {}", e),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_first_file_id_parsing() {
        let body = json!({"files": [{"id": "abc", "name": "x"}, {"id": "def"}]});
        assert_eq!(first_file_id(&body), Some("abc".to_string()));

        assert_eq!(first_file_id(&json!({"files": []})), None);
        assert_eq!(first_file_id(&json!({})), None);
    }

    #[test]
    fn test_count_products_both_shapes() {
        let document = json!({"products": [{}, {}], "barcodeDb": {}, "version": "1.4.0"});
        assert_eq!(count_products(&document), Some(2));

        let legacy = json!([{}, {}, {}]);
        assert_eq!(count_products(&legacy), Some(3));

        assert_eq!(count_products(&json!({"version": "1.4.0"})), None);
    }

    #[test]
    fn test_service_starts_disconnected() {
        let service = SyncService::new();
        let status = service.status();
        assert!(!status.connected);
        assert!(status.last_sync.is_none());
    }
}
