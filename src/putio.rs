//! put.io source client.

use std::cell::RefCell;
use std::collections::HashMap;

use futures::StreamExt;
use serde::Deserialize;
use tracing::debug;

use crate::error::{MirrorError, Result};
use crate::http::HttpClient;
use crate::tree::{ContentStream, EntryKind, SourceEntry, SourceTree};

const BASE_URL: &str = "https://api.put.io/v2";

/// Content type put.io uses to mark folders.
const FOLDER_CONTENT_TYPE: &str = "application/x-directory";

/// Identifier of the tree root.
pub const ROOT_ID: i64 = 0;

/// An authenticated put.io connection.
pub struct PutIo {
    http: HttpClient,
    token: String,
    // full paths by entry id, filled lazily
    paths: RefCell<HashMap<i64, String>>,
}

/// Wire representation of a put.io file object.
#[derive(Debug, Deserialize)]
struct RawEntry {
    id: i64,
    name: String,
    #[serde(default)]
    size: u64,
    content_type: String,
    #[serde(default)]
    parent_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct EntryResponse {
    file: RawEntry,
    status: String,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    files: Vec<RawEntry>,
    status: String,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: String,
}

impl From<RawEntry> for SourceEntry {
    fn from(raw: RawEntry) -> Self {
        let kind = if raw.content_type == FOLDER_CONTENT_TYPE {
            EntryKind::Folder
        } else {
            EntryKind::File
        };
        SourceEntry {
            id: raw.id,
            name: raw.name,
            size: raw.size,
            kind,
            parent_id: raw.parent_id,
        }
    }
}

impl PutIo {
    /// Create a new connection with the given OAuth token.
    pub fn new(token: &str) -> Self {
        Self {
            http: HttpClient::new(),
            token: token.to_string(),
            paths: RefCell::new(HashMap::new()),
        }
    }

    fn url(&self, path: &str, query: &[(&str, String)]) -> String {
        let mut url = format!("{BASE_URL}{path}?oauth_token={}", self.token);
        for (key, value) in query {
            url.push('&');
            url.push_str(key);
            url.push('=');
            url.push_str(value);
        }
        url
    }

    /// Root of the account's file tree.
    pub async fn root(&self) -> Result<SourceEntry> {
        self.entry_by_id(ROOT_ID).await
    }

    /// Fetch a single entry by id.
    pub async fn entry_by_id(&self, id: i64) -> Result<SourceEntry> {
        debug!(id, "fetching put.io entry");
        let response = self
            .http
            .get(&self.url(&format!("/files/{id}"), &[]), None, None)
            .await?;
        let envelope: EntryResponse = response.json().await?;
        if envelope.status != "OK" {
            return Err(MirrorError::Provider(format!(
                "bad status for put.io id {id}: {}",
                envelope.status
            )));
        }
        Ok(envelope.file.into())
    }

    /// List the direct children of a folder, in server order.
    pub async fn children(&self, folder: &SourceEntry) -> Result<Vec<SourceEntry>> {
        if !folder.is_folder() {
            return Err(MirrorError::Provider(format!(
                "cannot list non-folder '{}'",
                folder.name
            )));
        }
        let url = self.url("/files/list", &[("parent_id", folder.id.to_string())]);
        let envelope: ListResponse = self.http.get(&url, None, None).await?.json().await?;
        if envelope.status != "OK" {
            return Err(MirrorError::Provider(format!(
                "bad status listing put.io folder {}: {}",
                folder.id, envelope.status
            )));
        }
        Ok(envelope.files.into_iter().map(Into::into).collect())
    }

    /// Open a streaming download of a file, optionally limited to an
    /// inclusive byte range.
    pub async fn open_download(
        &self,
        file: &SourceEntry,
        range: Option<(u64, u64)>,
    ) -> Result<ContentStream> {
        if file.is_folder() {
            return Err(MirrorError::Provider(format!(
                "cannot download folder '{}'",
                file.name
            )));
        }
        let url = self.url(&format!("/files/{}/download", file.id), &[]);
        let response = self.http.get(&url, None, range).await?;
        Ok(Box::pin(
            response
                .bytes_stream()
                .map(|chunk| chunk.map_err(MirrorError::Request)),
        ))
    }

    /// Delete an entry. Using the entry afterwards is undefined.
    pub async fn remove(&self, entry: &SourceEntry) -> Result<()> {
        let url = self.url("/files/delete", &[]);
        let response = self
            .http
            .post_form(&url, &[("file_ids", entry.id.to_string())])
            .await?;
        let envelope: StatusResponse = response.json().await?;
        if envelope.status != "OK" {
            return Err(MirrorError::Provider(format!(
                "bad status for put.io delete({}): {}",
                entry.id, envelope.status
            )));
        }
        Ok(())
    }

    /// Full path of an entry, reconstructed from the parent chain.
    ///
    /// Resolved segments are cached, so during a traversal each child costs
    /// at most one lookup. The root's path is the empty string.
    pub async fn full_path(&self, entry: &SourceEntry) -> Result<String> {
        if entry.id == ROOT_ID {
            return Ok(String::new());
        }
        if let Some(cached) = self.paths.borrow().get(&entry.id).cloned() {
            return Ok(cached);
        }

        // Walk up until the root or a cached ancestor, then unwind.
        let mut chain = vec![(entry.id, entry.name.clone())];
        let mut cursor = entry.parent_id;
        let mut prefix = String::new();
        while let Some(parent_id) = cursor {
            if parent_id == ROOT_ID {
                break;
            }
            let cached = self.paths.borrow().get(&parent_id).cloned();
            if let Some(hit) = cached {
                prefix = hit;
                break;
            }
            let parent = self.entry_by_id(parent_id).await.map_err(|err| {
                MirrorError::NotFound(format!("parent {parent_id} of '{}': {err}", entry.name))
            })?;
            chain.push((parent.id, parent.name.clone()));
            cursor = parent.parent_id;
        }

        let mut path = prefix;
        let mut paths = self.paths.borrow_mut();
        for (id, name) in chain.into_iter().rev() {
            path = format!("{path}/{name}");
            paths.insert(id, path.clone());
        }
        Ok(path)
    }
}

impl SourceTree for PutIo {
    async fn entry(&self, id: i64) -> Result<SourceEntry> {
        self.entry_by_id(id).await
    }

    async fn list(&self, folder: &SourceEntry) -> Result<Vec<SourceEntry>> {
        self.children(folder).await
    }

    async fn download(
        &self,
        file: &SourceEntry,
        range: Option<(u64, u64)>,
    ) -> Result<ContentStream> {
        self.open_download(file, range).await
    }

    async fn delete(&self, entry: &SourceEntry) -> Result<()> {
        self.remove(entry).await
    }

    async fn path(&self, entry: &SourceEntry) -> Result<String> {
        self.full_path(entry).await
    }
}
