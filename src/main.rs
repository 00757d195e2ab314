//! Mirror a put.io file tree into Google Drive.

use chrono::{SecondsFormat, Utc};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use cloudmirror::cli::MirrorArgs;
use cloudmirror::config::{Credentials, MirrorOptions};
use cloudmirror::gdrive::GDrive;
use cloudmirror::mirror::TreeMirror;
use cloudmirror::putio::PutIo;
use cloudmirror::tree::{DestinationTree, SourceEntry, SourceTree};
use cloudmirror::Result;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = MirrorArgs::parse();
    let credentials = Credentials::from_env()?;

    let source = PutIo::new(&credentials.putio_token);
    let destination = GDrive::new(credentials.drive_auth.clone());
    let options = MirrorOptions {
        copy: args.copy,
        delete: args.delete,
    };

    // Each run with copy enabled lands in its own timestamped folder under
    // the configured parent.
    let mut target = destination.folder(&credentials.drive_parent_folder);
    if options.copy {
        let session = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        info!(folder = %session, "storing in Drive");
        target = destination.insert_folder(&target, &session).await?;
    }

    let mirror = TreeMirror::new(&source, &destination, options);

    if args.items.is_empty() {
        info!("syncing from root");
        let root = source.root().await?;
        run_target(&mirror, &source, &root, &target).await?;
    } else {
        info!(items = ?args.items, "syncing selected items");
        for raw in &args.items {
            // A bad id only costs that one target, the run goes on.
            let id: i64 = match raw.parse() {
                Ok(id) => id,
                Err(err) => {
                    warn!(item = %raw, %err, "skipping bad put.io id");
                    continue;
                }
            };
            let entry = match source.entry_by_id(id).await {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(id, %err, "skipping unresolved put.io id");
                    continue;
                }
            };
            let path = source.full_path(&entry).await?;
            info!(path = %path, id = entry.id, "syncing");
            run_target(&mirror, &source, &entry, &target).await?;
        }
    }

    Ok(())
}

/// Run one traversal, logging the failing entry's path before bailing out.
async fn run_target<S: SourceTree, D: DestinationTree>(
    mirror: &TreeMirror<'_, S, D>,
    source: &S,
    entry: &SourceEntry,
    target: &D::Folder,
) -> Result<()> {
    if let Err(err) = mirror.mirror(entry, target).await {
        let path = source.path(entry).await.unwrap_or_default();
        error!(path = %path, id = entry.id, %err, "mirror failed");
        return Err(err);
    }
    Ok(())
}
