//! # cloudmirror
//!
//! Mirror a tree of files and folders from put.io into Google Drive.
//!
//! ## Features
//!
//! - **Traversal**: depth-first walk that recreates the source folder
//!   structure on the destination, one folder per source folder.
//! - **Streaming transfer**: each file is streamed from the source straight
//!   into a destination create call, and the destination's reported byte
//!   size is checked against the source's record.
//! - **Optional move semantics**: with deletion enabled, every source entry
//!   is removed once its whole subtree has been processed.
//! - **Provider-agnostic core**: the engine works over two narrow
//!   capability traits ([`SourceTree`], [`DestinationTree`]) and is tested
//!   against in-memory fakes.
//!
//! ## Example
//!
//! ```no_run
//! use cloudmirror::config::{Credentials, MirrorOptions};
//! use cloudmirror::gdrive::GDrive;
//! use cloudmirror::mirror::TreeMirror;
//! use cloudmirror::putio::PutIo;
//!
//! # async fn example() -> cloudmirror::Result<()> {
//! let credentials = Credentials::from_env()?;
//! let source = PutIo::new(&credentials.putio_token);
//! let destination = GDrive::new(credentials.drive_auth.clone());
//!
//! let root = source.root().await?;
//! let parent = destination.folder(&credentials.drive_parent_folder);
//!
//! let mirror = TreeMirror::new(&source, &destination, MirrorOptions::default());
//! mirror.mirror(&root, &parent).await?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod gdrive;
pub mod http;
pub mod mirror;
pub mod putio;
pub mod tree;

// Re-export commonly used types
pub use config::{Credentials, MirrorOptions};
pub use error::{MirrorError, Result};
pub use mirror::TreeMirror;
pub use tree::{
    ContentStream, CreatedFile, DestinationTree, EntryKind, SourceEntry, SourceTree,
};
