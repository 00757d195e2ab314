//! Recursive tree-mirroring traversal.

use futures::future::LocalBoxFuture;
use tracing::info;

use crate::config::MirrorOptions;
use crate::error::{MirrorError, Result};
use crate::tree::{DestinationTree, SourceEntry, SourceTree};

/// Depth-first copy/delete engine over a source and a destination tree.
///
/// One destination folder is created per source folder and each source file
/// is streamed into a newly created destination file whose reported size is
/// checked against the source's record. With `delete` enabled, a source
/// entry is removed only after its whole subtree has been processed.
///
/// The walk is sequential: one remote call at a time, siblings in listing
/// order. No existence checks are made before creating destination entries,
/// so re-running against the same parent duplicates them; uniqueness is the
/// destination provider's concern.
pub struct TreeMirror<'a, S, D> {
    source: &'a S,
    destination: &'a D,
    options: MirrorOptions,
}

impl<'a, S: SourceTree, D: DestinationTree> TreeMirror<'a, S, D> {
    /// Create an engine over the given clients and options.
    pub fn new(source: &'a S, destination: &'a D, options: MirrorOptions) -> Self {
        Self {
            source,
            destination,
            options,
        }
    }

    /// Mirror `entry` (file or folder) into `parent`.
    ///
    /// The first failing remote call aborts the walk and propagates; entries
    /// already created on the destination (or already deleted on the source)
    /// are left as they are, so a failed run can leave a partial mirror.
    pub async fn mirror(&self, entry: &SourceEntry, parent: &D::Folder) -> Result<()> {
        self.walk(entry, parent).await
    }

    fn walk<'f>(
        &'f self,
        entry: &'f SourceEntry,
        parent: &'f D::Folder,
    ) -> LocalBoxFuture<'f, Result<()>> {
        Box::pin(async move {
            if entry.is_folder() {
                self.walk_folder(entry, parent).await
            } else {
                self.copy_file(entry, parent).await
            }
        })
    }

    async fn walk_folder(&self, entry: &SourceEntry, parent: &D::Folder) -> Result<()> {
        let path = self.source.path(entry).await?;
        info!(path = %path, "entering folder");

        // Without copy the subtree stays flat under the handle we were given.
        let created;
        let target = if self.options.copy {
            created = self.destination.create_folder(parent, &entry.name).await?;
            &created
        } else {
            parent
        };

        for child in self.source.list(entry).await? {
            self.walk(&child, target).await?;
        }

        if self.options.delete {
            self.delete_entry(entry).await?;
        }
        Ok(())
    }

    async fn copy_file(&self, entry: &SourceEntry, parent: &D::Folder) -> Result<()> {
        if self.options.copy {
            let content = self.source.download(entry, None).await?;
            let created = self
                .destination
                .create_file(parent, &entry.name, content)
                .await?;
            let path = self.source.path(entry).await?;
            if created.size != entry.size {
                return Err(MirrorError::SizeMismatch {
                    path,
                    expected: entry.size,
                    actual: created.size,
                });
            }
            info!(path = %path, bytes = entry.size, "copied file");
        }

        if self.options.delete {
            self.delete_entry(entry).await?;
        }
        Ok(())
    }

    async fn delete_entry(&self, entry: &SourceEntry) -> Result<()> {
        let path = self.source.path(entry).await?;
        info!(path = %path, id = entry.id, "deleting");
        self.source.delete(entry).await
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    use bytes::Bytes;
    use futures::{StreamExt, stream};

    use super::*;
    use crate::error::MirrorError;
    use crate::tree::{ContentStream, CreatedFile, EntryKind};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Op {
        List(&'static str),
        Download(&'static str),
        CreateFolder { parent: String, name: String },
        CreateFile { parent: String, name: String, size: u64 },
        Delete(&'static str),
    }

    type OpLog = Rc<RefCell<Vec<Op>>>;

    struct FakeSource {
        entries: HashMap<i64, SourceEntry>,
        children: HashMap<i64, Vec<i64>>,
        names: HashMap<i64, &'static str>,
        // ids whose download yields fewer bytes than the entry records
        truncated: Vec<i64>,
        log: OpLog,
    }

    impl FakeSource {
        fn name(&self, id: i64) -> &'static str {
            self.names.get(&id).copied().unwrap_or("?")
        }
    }

    impl SourceTree for FakeSource {
        async fn entry(&self, id: i64) -> Result<SourceEntry> {
            self.entries
                .get(&id)
                .cloned()
                .ok_or_else(|| MirrorError::NotFound(format!("entry {id}")))
        }

        async fn list(&self, folder: &SourceEntry) -> Result<Vec<SourceEntry>> {
            self.log.borrow_mut().push(Op::List(self.name(folder.id)));
            let ids = self.children.get(&folder.id).cloned().unwrap_or_default();
            ids.iter().map(|id| self.entries[id].clone()).map(Ok).collect()
        }

        async fn download(
            &self,
            file: &SourceEntry,
            _range: Option<(u64, u64)>,
        ) -> Result<ContentStream> {
            self.log.borrow_mut().push(Op::Download(self.name(file.id)));
            let mut bytes = file.size as usize;
            if self.truncated.contains(&file.id) {
                bytes = bytes.saturating_sub(40);
            }
            let chunks: Vec<Result<Bytes>> = vec![Ok(Bytes::from(vec![0u8; bytes]))];
            Ok(Box::pin(stream::iter(chunks)))
        }

        async fn delete(&self, entry: &SourceEntry) -> Result<()> {
            self.log.borrow_mut().push(Op::Delete(self.name(entry.id)));
            Ok(())
        }

        async fn path(&self, entry: &SourceEntry) -> Result<String> {
            let mut path = format!("/{}", entry.name);
            let mut cursor = entry.parent_id;
            while let Some(id) = cursor {
                let parent = self
                    .entries
                    .get(&id)
                    .ok_or_else(|| MirrorError::NotFound(format!("parent {id}")))?;
                path = format!("/{}{path}", parent.name);
                cursor = parent.parent_id;
            }
            Ok(path)
        }
    }

    struct FakeDestination {
        // file name whose creation fails after the stream is consumed
        fail_file: Option<&'static str>,
        log: OpLog,
    }

    impl DestinationTree for FakeDestination {
        type Folder = String;

        async fn create_folder(&self, parent: &String, name: &str) -> Result<String> {
            self.log.borrow_mut().push(Op::CreateFolder {
                parent: parent.clone(),
                name: name.to_string(),
            });
            Ok(format!("{parent}/{name}"))
        }

        async fn create_file(
            &self,
            parent: &String,
            name: &str,
            mut content: ContentStream,
        ) -> Result<CreatedFile> {
            let mut size = 0u64;
            while let Some(chunk) = content.next().await {
                size += chunk?.len() as u64;
            }
            self.log.borrow_mut().push(Op::CreateFile {
                parent: parent.clone(),
                name: name.to_string(),
                size,
            });
            if self.fail_file == Some(name) {
                return Err(MirrorError::Provider(format!("rejected '{name}'")));
            }
            Ok(CreatedFile {
                id: format!("{parent}/{name}"),
                size,
            })
        }
    }

    fn folder(id: i64, name: &str, parent_id: Option<i64>) -> SourceEntry {
        SourceEntry {
            id,
            name: name.to_string(),
            size: 0,
            kind: EntryKind::Folder,
            parent_id,
        }
    }

    fn file(id: i64, name: &str, size: u64, parent_id: i64) -> SourceEntry {
        SourceEntry {
            id,
            name: name.to_string(),
            size,
            kind: EntryKind::File,
            parent_id: Some(parent_id),
        }
    }

    /// `/A/(x: 100 bytes)` and `/A/B/(y: 50 bytes)`.
    fn fixture() -> (FakeSource, FakeDestination, OpLog) {
        let log: OpLog = Rc::new(RefCell::new(Vec::new()));
        let entries = HashMap::from([
            (1, folder(1, "A", None)),
            (2, file(2, "x", 100, 1)),
            (3, folder(3, "B", Some(1))),
            (4, file(4, "y", 50, 3)),
        ]);
        let children = HashMap::from([(1, vec![2, 3]), (3, vec![4])]);
        let names = HashMap::from([(1, "A"), (2, "x"), (3, "B"), (4, "y")]);
        let source = FakeSource {
            entries,
            children,
            names,
            truncated: Vec::new(),
            log: log.clone(),
        };
        let destination = FakeDestination {
            fail_file: None,
            log: log.clone(),
        };
        (source, destination, log)
    }

    fn deletes(log: &OpLog) -> Vec<&'static str> {
        log.borrow()
            .iter()
            .filter_map(|op| match op {
                Op::Delete(name) => Some(*name),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_mirror_creates_structure_in_order() {
        let (source, destination, log) = fixture();
        let mirror = TreeMirror::new(&source, &destination, MirrorOptions::default());

        let root = source.entry(1).await.unwrap();
        mirror.mirror(&root, &"R".to_string()).await.unwrap();

        let create = |parent: &str, name: &str| Op::CreateFolder {
            parent: parent.to_string(),
            name: name.to_string(),
        };
        let create_file = |parent: &str, name: &str, size: u64| Op::CreateFile {
            parent: parent.to_string(),
            name: name.to_string(),
            size,
        };
        assert_eq!(
            *log.borrow(),
            vec![
                create("R", "A"),
                Op::List("A"),
                Op::Download("x"),
                create_file("R/A", "x", 100),
                create("R/A", "B"),
                Op::List("B"),
                Op::Download("y"),
                create_file("R/A/B", "y", 50),
            ]
        );
    }

    #[tokio::test]
    async fn test_deletes_follow_descendants() {
        let (source, destination, log) = fixture();
        let options = MirrorOptions {
            copy: true,
            delete: true,
        };
        let mirror = TreeMirror::new(&source, &destination, options);

        let root = source.entry(1).await.unwrap();
        mirror.mirror(&root, &"R".to_string()).await.unwrap();

        assert_eq!(deletes(&log), vec!["x", "y", "B", "A"]);
        // The folder deletes close out their subtrees.
        let ops = log.borrow();
        assert_eq!(ops.last(), Some(&Op::Delete("A")));
        let pos = |op: &Op| ops.iter().position(|o| o == op).unwrap();
        assert!(pos(&Op::Delete("B")) > pos(&Op::Delete("y")));
        assert!(pos(&Op::Delete("B")) > pos(&Op::Delete("x")));
    }

    #[tokio::test]
    async fn test_move_without_copy_deletes_bottom_up() {
        let (source, destination, log) = fixture();
        let options = MirrorOptions {
            copy: false,
            delete: true,
        };
        let mirror = TreeMirror::new(&source, &destination, options);

        let root = source.entry(1).await.unwrap();
        mirror.mirror(&root, &"R".to_string()).await.unwrap();

        assert_eq!(deletes(&log), vec!["x", "y", "B", "A"]);
        assert!(log.borrow().iter().all(|op| !matches!(
            op,
            Op::CreateFolder { .. } | Op::CreateFile { .. } | Op::Download(_)
        )));
    }

    #[tokio::test]
    async fn test_dry_run_only_lists() {
        let (source, destination, log) = fixture();
        let options = MirrorOptions {
            copy: false,
            delete: false,
        };
        let mirror = TreeMirror::new(&source, &destination, options);

        let root = source.entry(1).await.unwrap();
        mirror.mirror(&root, &"R".to_string()).await.unwrap();

        assert_eq!(*log.borrow(), vec![Op::List("A"), Op::List("B")]);
    }

    #[tokio::test]
    async fn test_empty_folder_still_created_and_deleted() {
        let log: OpLog = Rc::new(RefCell::new(Vec::new()));
        let source = FakeSource {
            entries: HashMap::from([(1, folder(1, "Empty", None))]),
            children: HashMap::new(),
            names: HashMap::from([(1, "Empty")]),
            truncated: Vec::new(),
            log: log.clone(),
        };
        let destination = FakeDestination {
            fail_file: None,
            log: log.clone(),
        };
        let options = MirrorOptions {
            copy: true,
            delete: true,
        };
        let mirror = TreeMirror::new(&source, &destination, options);

        let root = source.entry(1).await.unwrap();
        mirror.mirror(&root, &"R".to_string()).await.unwrap();

        assert_eq!(
            *log.borrow(),
            vec![
                Op::CreateFolder {
                    parent: "R".to_string(),
                    name: "Empty".to_string(),
                },
                Op::List("Empty"),
                Op::Delete("Empty"),
            ]
        );
    }

    #[tokio::test]
    async fn test_single_file_mirror() {
        let (source, destination, log) = fixture();
        let options = MirrorOptions {
            copy: true,
            delete: true,
        };
        let mirror = TreeMirror::new(&source, &destination, options);

        let entry = source.entry(2).await.unwrap();
        mirror.mirror(&entry, &"R".to_string()).await.unwrap();

        assert_eq!(
            *log.borrow(),
            vec![
                Op::Download("x"),
                Op::CreateFile {
                    parent: "R".to_string(),
                    name: "x".to_string(),
                    size: 100,
                },
                Op::Delete("x"),
            ]
        );
    }

    #[tokio::test]
    async fn test_size_mismatch_aborts_before_siblings() {
        let (mut source, destination, log) = fixture();
        source.truncated = vec![2];
        let mirror = TreeMirror::new(&source, &destination, MirrorOptions::default());

        let root = source.entry(1).await.unwrap();
        let err = mirror.mirror(&root, &"R".to_string()).await.unwrap_err();

        match err {
            MirrorError::SizeMismatch {
                path,
                expected,
                actual,
            } => {
                assert_eq!(path, "/A/x");
                assert_eq!(expected, 100);
                assert_eq!(actual, 60);
            }
            other => panic!("expected size mismatch, got {other:?}"),
        }
        // Nothing after the corrupt transfer: sibling B was never touched.
        let ops = log.borrow();
        assert!(matches!(ops.last(), Some(Op::CreateFile { name, .. }) if name.as_str() == "x"));
        assert_eq!(deletes(&log), Vec::<&str>::new());
    }

    #[tokio::test]
    async fn test_failed_child_skips_parent_delete() {
        let (source, mut destination, log) = fixture();
        destination.fail_file = Some("y");
        let options = MirrorOptions {
            copy: true,
            delete: true,
        };
        let mirror = TreeMirror::new(&source, &destination, options);

        let root = source.entry(1).await.unwrap();
        let err = mirror.mirror(&root, &"R".to_string()).await.unwrap_err();
        assert!(matches!(err, MirrorError::Provider(_)));

        // x finished before the failure and was deleted; neither B nor A was.
        assert_eq!(deletes(&log), vec!["x"]);
    }
}
