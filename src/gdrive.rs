//! Google Drive destination client.

use std::cell::RefCell;

use chrono::{DateTime, Duration, Utc};
use reqwest::Body;
use serde_json::{Value, json};
use tracing::debug;

use crate::error::{MirrorError, Result};
use crate::http::HttpClient;
use crate::tree::{ContentStream, CreatedFile, DestinationTree};

const FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3/files";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// MIME type Drive uses to mark folders.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// OAuth2 material for a Drive connection.
///
/// Tokens are pre-provisioned; there is no interactive consent flow here.
#[derive(Debug, Clone)]
pub struct DriveAuth {
    pub client_id: String,
    pub client_secret: String,
    pub access_token: String,
    pub refresh_token: String,
    /// Access token expiry. At or past this instant the token is refreshed
    /// before the next call.
    pub expiry: DateTime<Utc>,
}

/// Write-only handle to a Drive folder.
///
/// The handle is never resolved against the API, so it also works for
/// folders granted under create-only permission scopes.
#[derive(Debug, Clone)]
pub struct DriveFolder {
    id: String,
}

impl DriveFolder {
    /// Folder id as assigned by Drive.
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// An authenticated Drive connection.
pub struct GDrive {
    http: HttpClient,
    auth: RefCell<DriveAuth>,
}

impl GDrive {
    /// Create a new connection with the given OAuth material.
    pub fn new(auth: DriveAuth) -> Self {
        Self {
            http: HttpClient::new(),
            auth: RefCell::new(auth),
        }
    }

    /// Wrap a known folder id as a write-only parent handle.
    pub fn folder(&self, id: &str) -> DriveFolder {
        DriveFolder { id: id.to_string() }
    }

    /// Current access token, refreshed when at or past expiry.
    async fn access_token(&self) -> Result<String> {
        let (token, expired, form) = {
            let auth = self.auth.borrow();
            let form = [
                ("client_id", auth.client_id.clone()),
                ("client_secret", auth.client_secret.clone()),
                ("refresh_token", auth.refresh_token.clone()),
                ("grant_type", "refresh_token".to_string()),
            ];
            (auth.access_token.clone(), auth.expiry <= Utc::now(), form)
        };
        if !expired {
            return Ok(token);
        }

        debug!("refreshing Drive access token");
        let response = self.http.post_form(TOKEN_URL, &form).await?;
        let body: Value = response.json().await?;
        let access_token = body
            .get("access_token")
            .and_then(|v| v.as_str())
            .ok_or(MirrorError::InvalidResponse)?
            .to_string();
        let expires_in = body.get("expires_in").and_then(|v| v.as_i64()).unwrap_or(3600);

        let mut auth = self.auth.borrow_mut();
        auth.access_token = access_token.clone();
        // Renew a minute before the server-side deadline.
        auth.expiry = Utc::now() + Duration::seconds(expires_in.saturating_sub(60));
        Ok(access_token)
    }

    /// Create a folder under `parent` and return its handle.
    pub async fn insert_folder(&self, parent: &DriveFolder, name: &str) -> Result<DriveFolder> {
        let token = self.access_token().await?;
        let metadata = json!({
            "name": name,
            "mimeType": FOLDER_MIME_TYPE,
            "parents": [parent.id()],
        });
        let url = format!("{FILES_URL}?fields=id");
        let response = self.http.post_json(&url, Some(&token), &metadata).await?;
        let created: Value = response.json().await?;
        let id = created
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or(MirrorError::InvalidResponse)?;
        Ok(DriveFolder { id: id.to_string() })
    }

    /// Create a file under `parent`, streaming `content` as its bytes.
    ///
    /// Uses a resumable upload session: the metadata request yields a
    /// session URI, then a single PUT carries the content.
    pub async fn insert_file(
        &self,
        parent: &DriveFolder,
        name: &str,
        content: ContentStream,
    ) -> Result<CreatedFile> {
        let token = self.access_token().await?;
        let metadata = json!({
            "name": name,
            "parents": [parent.id()],
        });
        let url = format!("{UPLOAD_URL}?uploadType=resumable&fields=id,size");
        let response = self.http.post_json(&url, Some(&token), &metadata).await?;
        let session_url = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(MirrorError::InvalidResponse)?
            .to_string();

        let response = self
            .http
            .put_stream(&session_url, Some(&token), Body::wrap_stream(content))
            .await?;
        let created: Value = response.json().await?;
        parse_created(&created)
    }
}

/// Extract the created-file report from a Drive response.
///
/// Drive serializes int64 fields as decimal strings.
fn parse_created(value: &Value) -> Result<CreatedFile> {
    let id = value
        .get("id")
        .and_then(|v| v.as_str())
        .ok_or(MirrorError::InvalidResponse)?
        .to_string();
    let size = value
        .get("size")
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse().ok())
        .or_else(|| value.get("size").and_then(|v| v.as_u64()))
        .ok_or(MirrorError::InvalidResponse)?;
    Ok(CreatedFile { id, size })
}

impl DestinationTree for GDrive {
    type Folder = DriveFolder;

    async fn create_folder(&self, parent: &DriveFolder, name: &str) -> Result<DriveFolder> {
        self.insert_folder(parent, name).await
    }

    async fn create_file(
        &self,
        parent: &DriveFolder,
        name: &str,
        content: ContentStream,
    ) -> Result<CreatedFile> {
        self.insert_file(parent, name, content).await
    }
}
