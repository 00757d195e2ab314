//! Run options and environment-sourced credentials.

use std::env;

use chrono::{DateTime, Utc};

use crate::error::{MirrorError, Result};
use crate::gdrive::DriveAuth;

/// Traversal options, threaded through every recursive call.
#[derive(Debug, Clone, Copy)]
pub struct MirrorOptions {
    /// Materialize content on the destination.
    pub copy: bool,
    /// Remove each source entry once its subtree has been processed.
    pub delete: bool,
}

impl Default for MirrorOptions {
    fn default() -> Self {
        Self {
            copy: true,
            delete: false,
        }
    }
}

/// Credentials for both providers.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// put.io OAuth token
    pub putio_token: String,
    /// Google Drive OAuth material
    pub drive_auth: DriveAuth,
    /// Drive folder id receiving the mirrored tree
    pub drive_parent_folder: String,
}

impl Credentials {
    /// Load credentials from the environment.
    ///
    /// Required variables: `PUTIO_TOKEN`, `DRIVE_CLIENT_ID`,
    /// `DRIVE_CLIENT_SECRET`, `DRIVE_ACCESS_TOKEN`, `DRIVE_REFRESH_TOKEN`,
    /// `DRIVE_PARENT_FOLDER_ID`. `DRIVE_TOKEN_EXPIRY` (RFC 3339) is
    /// optional; without it the access token is treated as already stale and
    /// refreshed on first use.
    pub fn from_env() -> Result<Self> {
        let putio_token = require("PUTIO_TOKEN")?;
        let drive_auth = DriveAuth {
            client_id: require("DRIVE_CLIENT_ID")?,
            client_secret: require("DRIVE_CLIENT_SECRET")?,
            access_token: require("DRIVE_ACCESS_TOKEN")?,
            refresh_token: require("DRIVE_REFRESH_TOKEN")?,
            expiry: token_expiry()?,
        };
        let drive_parent_folder = require("DRIVE_PARENT_FOLDER_ID")?;

        Ok(Self {
            putio_token,
            drive_auth,
            drive_parent_folder,
        })
    }
}

fn require(name: &str) -> Result<String> {
    env::var(name).map_err(|_| MirrorError::Config(format!("missing {name}")))
}

fn token_expiry() -> Result<DateTime<Utc>> {
    match env::var("DRIVE_TOKEN_EXPIRY") {
        Ok(raw) => DateTime::parse_from_rfc3339(&raw)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|err| MirrorError::Config(format!("invalid DRIVE_TOKEN_EXPIRY: {err}"))),
        Err(_) => Ok(Utc::now()),
    }
}
