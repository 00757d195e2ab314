//! Provider-agnostic tree model and storage capability traits.

use std::pin::Pin;

use bytes::Bytes;
use futures::stream::Stream;

use crate::error::Result;

/// Kind of a source tree entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Regular file
    File,
    /// Folder/directory
    Folder,
}

/// A node in the source tree.
///
/// Entries are only ever read (and optionally deleted) by the mirror; the
/// provider that handed them out owns them. A folder's `size` carries no
/// meaning and is reported as zero.
#[derive(Debug, Clone)]
pub struct SourceEntry {
    /// Stable identifier assigned by the source provider
    pub id: i64,
    /// Display name
    pub name: String,
    /// File size in bytes (0 for folders)
    pub size: u64,
    /// Entry kind
    pub kind: EntryKind,
    /// Identifier of the parent folder, if any
    pub parent_id: Option<i64>,
}

impl SourceEntry {
    /// Check if this entry is a file.
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    /// Check if this entry is a folder.
    pub fn is_folder(&self) -> bool {
        self.kind == EntryKind::Folder
    }
}

/// Byte stream of a file's content.
///
/// Ownership of the stream moves into the destination write call; dropping
/// it releases the underlying connection on every exit path.
pub type ContentStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// The destination's report for a just-created file.
#[derive(Debug, Clone)]
pub struct CreatedFile {
    /// Identifier assigned by the destination provider
    pub id: String,
    /// Byte size the destination recorded for the uploaded content
    pub size: u64,
}

/// Read side of a mirror run.
///
/// All methods are remote calls that may fail; the traversal engine does not
/// retry them.
#[allow(async_fn_in_trait)]
pub trait SourceTree {
    /// Resolve an entry by identifier.
    async fn entry(&self, id: i64) -> Result<SourceEntry>;

    /// List the direct children of a folder, in provider order.
    async fn list(&self, folder: &SourceEntry) -> Result<Vec<SourceEntry>>;

    /// Open a streaming read of a file's content, optionally limited to an
    /// inclusive byte range.
    async fn download(&self, file: &SourceEntry, range: Option<(u64, u64)>)
        -> Result<ContentStream>;

    /// Delete an entry. Using the entry afterwards is undefined.
    async fn delete(&self, entry: &SourceEntry) -> Result<()>;

    /// Full path of an entry, for diagnostics.
    async fn path(&self, entry: &SourceEntry) -> Result<String>;
}

/// Write side of a mirror run.
#[allow(async_fn_in_trait)]
pub trait DestinationTree {
    /// Write-only handle to a destination folder.
    ///
    /// The traversal root handle may come from a create-only permission
    /// scope, so operations other than `create_*` against it are undefined.
    type Folder: Clone;

    /// Create a folder under `parent` and return its handle.
    async fn create_folder(&self, parent: &Self::Folder, name: &str) -> Result<Self::Folder>;

    /// Create a file under `parent` with `content` as its bytes.
    async fn create_file(
        &self,
        parent: &Self::Folder,
        name: &str,
        content: ContentStream,
    ) -> Result<CreatedFile>;
}
