//! Integration tests verifying the resource layer works across backends.
//!
//! These tests verify that:
//! 1. A backend written outside the crate gets every generic algorithm
//! 2. Jailing, find order, rename and create semantics hold on every backend
//! 3. Copy and move work across backends
//! 4. The zip codec round-trips through any folder

use resourcefs::*;
use std::any::Any;
use std::collections::BTreeMap;
use std::io::{self, Cursor, Read, Write};
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::SystemTime;

// =============================================================================
// Complete Mock Backend Implementation
// =============================================================================

/// A flat map from path to node, implementing the store contract from the
/// outside. This proves a third-party backend only needs the store traits.
#[derive(Debug, Default)]
struct MapState {
    nodes: RwLock<BTreeMap<JailedPath, MapNode>>,
    /// Every file opened for reading, in order.
    opened: RwLock<Vec<JailedPath>>,
}

#[derive(Debug, Clone)]
enum MapNode {
    Folder,
    File(Vec<u8>, SystemTime),
}

impl MapNode {
    fn kind(&self) -> ResourceKind {
        match self {
            MapNode::Folder => ResourceKind::Folder,
            MapNode::File(..) => ResourceKind::File,
        }
    }
}

#[derive(Debug, Clone)]
struct MapStore {
    state: Arc<MapState>,
    path: JailedPath,
    kind: ResourceKind,
}

fn map_root() -> Folder {
    map_root_with_state().0
}

fn map_root_with_state() -> (Folder, Arc<MapState>) {
    let state = Arc::new(MapState::default());
    let root = Folder::new(MapStore {
        state: Arc::clone(&state),
        path: JailedPath::root(),
        kind: ResourceKind::Folder,
    });
    (root, state)
}

impl MapStore {
    fn at(&self, path: &JailedPath, kind: ResourceKind) -> Self {
        Self {
            state: Arc::clone(&self.state),
            path: path.clone(),
            kind,
        }
    }

    fn kind_at(&self, path: &JailedPath) -> Option<ResourceKind> {
        if path.is_root() {
            return Some(ResourceKind::Folder);
        }
        self.state.nodes.read().unwrap().get(path).map(MapNode::kind)
    }

    fn file_node(&self) -> Result<(Vec<u8>, SystemTime), ResourceError> {
        match self.state.nodes.read().unwrap().get(&self.path) {
            Some(MapNode::File(data, modified)) => Ok((data.clone(), *modified)),
            _ => Err(ResourceError::DoesNotExist {
                path: self.path.clone(),
            }),
        }
    }
}

impl ResourceStore for MapStore {
    fn path(&self) -> &JailedPath {
        &self.path
    }

    fn identity(&self) -> Identity {
        let origin = Origin::Named(format!("map-{:p}", Arc::as_ptr(&self.state)));
        Identity::new(origin, self.path.clone())
    }

    fn existing_resource_at(&self, path: &JailedPath) -> Result<Option<Resource>, ResourceError> {
        Ok(self.kind_at(path).map(|kind| match kind {
            ResourceKind::File => Resource::File(self.file_at(path)),
            ResourceKind::Folder => Resource::Folder(self.folder_at(path)),
        }))
    }

    fn folder_at(&self, path: &JailedPath) -> Folder {
        Folder::new(self.at(path, ResourceKind::Folder))
    }

    fn file_at(&self, path: &JailedPath) -> File {
        File::new(self.at(path, ResourceKind::File))
    }

    fn exists(&self) -> Result<bool, ResourceError> {
        Ok(self.kind_at(&self.path) == Some(self.kind))
    }

    fn rename(&self, name: &str) -> Result<(), ResourceError> {
        let target = self.path.parent().child(name);
        let mut nodes = self.state.nodes.write().unwrap();
        let moved: Vec<JailedPath> = nodes
            .keys()
            .filter(|path| path.starts_with(&self.path))
            .cloned()
            .collect();
        for path in moved {
            if let (Some(node), Some(rest)) = (nodes.remove(&path), path.strip_prefix(&self.path)) {
                nodes.insert(target.join(&rest), node);
            }
        }
        Ok(())
    }

    fn delete(&self) -> Result<(), ResourceError> {
        self.state
            .nodes
            .write()
            .unwrap()
            .retain(|path, _| !path.starts_with(&self.path));
        Ok(())
    }

    fn create(&self) -> Result<(), ResourceError> {
        if self.path.is_root() {
            return Ok(());
        }
        let node = match self.kind {
            ResourceKind::Folder => MapNode::Folder,
            ResourceKind::File => MapNode::File(Vec::new(), SystemTime::now()),
        };
        self.state
            .nodes
            .write()
            .unwrap()
            .entry(self.path.clone())
            .or_insert(node);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl FolderStore for MapStore {
    fn list(&self) -> Result<Vec<ChildEntry>, ResourceError> {
        let nodes = self.state.nodes.read().unwrap();
        Ok(nodes
            .iter()
            .filter(|(path, _)| path.depth() == self.path.depth() + 1 && path.starts_with(&self.path))
            .filter_map(|(path, node)| {
                let name = path.name()?.to_owned();
                Some(ChildEntry {
                    name,
                    kind: node.kind(),
                })
            })
            .collect())
    }
}

impl FileStore for MapStore {
    fn size(&self) -> Result<u64, ResourceError> {
        Ok(self.file_node()?.0.len() as u64)
    }

    fn last_modified(&self) -> Result<SystemTime, ResourceError> {
        Ok(self.file_node()?.1)
    }

    fn touch(&self) -> Result<(), ResourceError> {
        let (data, _) = self.file_node()?;
        self.state
            .nodes
            .write()
            .unwrap()
            .insert(self.path.clone(), MapNode::File(data, SystemTime::now()));
        Ok(())
    }

    fn open_read(&self) -> Result<Box<dyn Read + Send>, ResourceError> {
        let data = self.file_node()?.0;
        self.state.opened.write().unwrap().push(self.path.clone());
        Ok(Box::new(Cursor::new(data)))
    }

    fn open_write(&self) -> Result<Box<dyn Write + Send>, ResourceError> {
        Ok(Box::new(MapWriter {
            store: self.clone(),
            buffer: Vec::new(),
        }))
    }
}

struct MapWriter {
    store: MapStore,
    buffer: Vec<u8>,
}

impl Write for MapWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for MapWriter {
    fn drop(&mut self) {
        let data = std::mem::take(&mut self.buffer);
        self.store.state.nodes.write().unwrap().insert(
            self.store.path.clone(),
            MapNode::File(data, SystemTime::now()),
        );
    }
}

// =============================================================================
// Backend Fixtures
// =============================================================================

/// A root folder per backend; the temp dir must outlive the local root.
fn each_backend(test: impl Fn(&str, Folder)) {
    test("virtual", VirtualFolder::new().root());
    let dir = tempfile::tempdir().unwrap();
    test("local", LocalFolder::new(dir.path()).root());
    test("map", map_root());
}

fn read(file: &File) -> String {
    file.content().read_to_string().unwrap()
}

fn paths(folder: &Folder) -> Vec<String> {
    folder
        .find()
        .iter()
        .map(|resource| resource.unwrap().path().to_string())
        .collect()
}

// =============================================================================
// Jailing
// =============================================================================

#[test]
fn jailed_path_never_escapes() {
    let root = JailedPath::root();
    assert_eq!(root.resolve("../../etc/passwd").to_string(), "/etc/passwd");
    assert_eq!(root.resolve(".."), root);
    let a = JailedPath::parse("/a");
    assert_eq!(a.child("x").parent(), a);
}

#[test]
fn lookups_stay_inside_every_backend() {
    each_backend(|backend, root| {
        let jail = root.get_folder("jail");
        let file = jail.get_file("../../../escaped.txt");
        assert_eq!(file.path().to_string(), "/escaped.txt", "{backend}");
        file.content().write_str("inside").unwrap();
        assert_eq!(read(&root.get_file("escaped.txt")), "inside", "{backend}");
    });
}

#[test]
fn local_writes_land_below_the_base_directory() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("base");
    let root = LocalFolder::new(&base).root();
    root.get_file("../../outside.txt")
        .content()
        .write_str("x")
        .unwrap();
    assert!(base.join("outside.txt").is_file());
    assert!(!dir.path().join("outside.txt").exists());
}

// =============================================================================
// Generic Algorithms On Every Backend
// =============================================================================

#[test]
fn create_if_missing_twice_keeps_content() {
    each_backend(|backend, root| {
        let file = root.get_file("a/b/c.txt");
        file.create_if_missing().unwrap();
        assert!(file.exists().unwrap(), "{backend}");
        assert_eq!(file.size().unwrap(), 0, "{backend}");
        file.content().write_str("data").unwrap();
        file.create_if_missing().unwrap();
        file.create_if_missing().unwrap();
        assert_eq!(read(&file), "data", "{backend}");
        assert!(root.get_folder("a/b").exists().unwrap(), "{backend}");
    });
}

#[test]
fn rename_onto_existing_fails_and_changes_nothing() {
    each_backend(|backend, root| {
        let x = root.get_file("x.txt");
        let y = root.get_file("y.txt");
        x.content().write_str("x").unwrap();
        y.content().write_str("y").unwrap();
        let err = x.rename("y.txt").unwrap_err();
        assert!(err.is_already_exists(), "{backend}: {err}");
        assert_eq!(read(&x), "x", "{backend}");
        assert_eq!(read(&y), "y", "{backend}");
    });
}

#[test]
fn rename_moves_content_and_subtree() {
    each_backend(|backend, root| {
        root.get_file("old/inner/file.txt")
            .content()
            .write_str("deep")
            .unwrap();
        let renamed = root.get_folder("old").rename("new").unwrap();
        assert_eq!(renamed.path().to_string(), "/new", "{backend}");
        assert!(!root.get_folder("old").exists().unwrap(), "{backend}");
        assert_eq!(read(&root.get_file("new/inner/file.txt")), "deep", "{backend}");
    });
}

#[test]
fn rename_rejects_bad_names_and_missing_sources() {
    each_backend(|backend, root| {
        let file = root.get_file("f.txt");
        assert!(file.rename("g.txt").unwrap_err().is_does_not_exist(), "{backend}");
        file.create_if_missing().unwrap();
        for name in ["", ".", "..", "a/b"] {
            assert!(
                matches!(file.rename(name), Err(ResourceError::InvalidName { .. })),
                "{backend}: {name:?}"
            );
        }
    });
}

#[test]
fn find_is_pre_order_on_every_backend() {
    each_backend(|backend, root| {
        root.get_file("a/b.txt").content().write_str("b").unwrap();
        root.get_file("c.txt").content().write_str("c").unwrap();
        assert_eq!(paths(&root), ["/a", "/a/b.txt", "/c.txt"], "{backend}");
    });
}

#[test]
fn find_is_restartable_and_live() {
    let root = VirtualFolder::new().root();
    root.get_file("one.txt").create_if_missing().unwrap();
    let find = root.find();
    assert_eq!(find.iter().count(), 1);
    root.get_file("two.txt").create_if_missing().unwrap();
    assert_eq!(find.iter().count(), 2);
    assert_eq!(find.files().count(), 2);
    assert_eq!(find.folders().count(), 0);
}

#[test]
fn delete_is_a_no_op_when_absent() {
    each_backend(|backend, root| {
        root.get_file("ghost.txt").delete().unwrap();
        root.get_folder("ghost").delete().unwrap();
        root.get_file("d/e.txt").create_if_missing().unwrap();
        root.get_folder("d").delete().unwrap();
        assert!(!root.get_file("d/e.txt").exists().unwrap(), "{backend}");
    });
}

#[test]
fn touch_requires_existence() {
    each_backend(|backend, root| {
        let file = root.get_file("t.txt");
        assert!(file.touch().unwrap_err().is_does_not_exist(), "{backend}");
        file.content().write_str("t").unwrap();
        file.touch().unwrap();
        assert_eq!(read(&file), "t", "{backend}");
    });
}

#[test]
fn handles_compare_by_physical_object() {
    each_backend(|backend, root| {
        let direct = root.get_file("a/b.txt");
        let indirect = root.get_folder("a").get_file("./x/../b.txt");
        assert_eq!(direct, indirect, "{backend}");
        assert_ne!(direct, root.get_file("a/c.txt"), "{backend}");
    });
}

// =============================================================================
// Virtual Backend
// =============================================================================

#[test]
fn virtual_folders_are_isolated() {
    let first = VirtualFolder::new().root();
    let second = VirtualFolder::new().root();
    first.get_file("shared.txt").content().write_str("1").unwrap();
    assert!(!second.get_file("shared.txt").exists().unwrap());
    second.get_file("shared.txt").content().write_str("2").unwrap();
    assert_eq!(read(&first.get_file("shared.txt")), "1");
    assert_ne!(first.get_file("shared.txt"), second.get_file("shared.txt"));
}

#[test]
fn virtual_copy_diverges_on_write() {
    let root = VirtualFolder::new().root();
    let source = root.get_file("src.txt");
    source.content().write_str("original").unwrap();
    let copy = source.copy_to(&root.get_folder("copies")).unwrap();
    source.content().write_str("changed").unwrap();
    assert_eq!(read(&copy), "original");
    assert_eq!(read(&source), "changed");
}

#[test]
fn handles_cross_threads() {
    let root = VirtualFolder::new().root();
    let workers: Vec<_> = (0..4)
        .map(|i| {
            let root = root.clone();
            thread::spawn(move || {
                root.get_file(&format!("worker-{i}.txt"))
                    .content()
                    .write_str("done")
                    .unwrap();
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
    assert_eq!(root.files().unwrap().len(), 4);
}

// =============================================================================
// Cross-Backend Copy And Move
// =============================================================================

#[test]
fn file_copy_and_move_across_backends() {
    let dir = tempfile::tempdir().unwrap();
    let roots = [
        VirtualFolder::new().root(),
        LocalFolder::new(dir.path()).root(),
        map_root(),
    ];
    for (i, from) in roots.iter().enumerate() {
        let to = &roots[(i + 1) % roots.len()];
        let source = from.get_file(&format!("from-{i}.bin"));
        let bytes: Vec<u8> = (0..=255u8).cycle().take(20_000).collect();
        source.content().write_bytes(&bytes).unwrap();

        let copy = source.copy_to(&to.get_folder("copied")).unwrap();
        assert_eq!(copy.content().read_to_vec().unwrap(), bytes);
        assert!(source.exists().unwrap());

        let moved = source.move_to(&to.get_folder("moved")).unwrap();
        assert_eq!(moved.content().read_to_vec().unwrap(), bytes);
        assert!(!source.exists().unwrap());
    }
}

#[test]
fn folder_move_across_backends() {
    let dir = tempfile::tempdir().unwrap();
    let local = LocalFolder::new(dir.path()).root();
    let memory = VirtualFolder::new().root();
    let project = memory.get_folder("project");
    project.get_file("src/lib.rs").content().write_str("lib").unwrap();
    project.get_folder("empty").create_if_missing().unwrap();

    let moved = project.move_to(&local).unwrap();
    assert_eq!(moved.path().to_string(), "/project");
    assert_eq!(read(&moved.get_file("src/lib.rs")), "lib");
    assert!(moved.get_folder("empty").exists().unwrap());
    assert!(!project.exists().unwrap());
    assert!(dir.path().join("project/src/lib.rs").is_file());
}

#[test]
fn folder_copy_into_itself_is_rejected() {
    each_backend(|backend, root| {
        let folder = root.get_folder("tree");
        folder.get_file("leaf.txt").create_if_missing().unwrap();
        let err = folder.copy_to(&folder.get_folder("sub")).unwrap_err();
        assert!(matches!(err, ResourceError::InvalidTarget { .. }), "{backend}: {err}");
    });
}

#[test]
fn copy_of_missing_file_fails() {
    let root = VirtualFolder::new().root();
    let err = root
        .get_file("missing.txt")
        .copy_to(&root.get_folder("out"))
        .unwrap_err();
    assert!(err.is_does_not_exist());
    assert!(!root.get_file("out/missing.txt").exists().unwrap());
}

// =============================================================================
// Zip Codec
// =============================================================================

#[test]
fn zip_round_trip_between_backends() {
    let dir = tempfile::tempdir().unwrap();
    let sources = [VirtualFolder::new().root(), map_root()];
    for (i, source) in sources.iter().enumerate() {
        source.get_file("a.txt").content().write_str("1").unwrap();
        source.get_file("dir/b.txt").content().write_str("2").unwrap();

        let target = LocalFolder::new(dir.path().join(format!("out-{i}"))).root();
        unpack(compress(source, None), &target).unwrap();
        assert_eq!(read(&target.get_file("a.txt")), "1");
        assert_eq!(read(&target.get_file("dir/b.txt")), "2");
        assert_eq!(paths(&target), ["/a.txt", "/dir", "/dir/b.txt"]);
    }
}

#[test]
fn zip_keeps_empty_folders_on_every_backend() {
    each_backend(|name, root| {
        let source = root.get_folder("source");
        source.get_folder("empty").create_if_missing().unwrap();
        source.get_file("full/f.txt").content().write_str("f").unwrap();

        let mut zipped = Vec::new();
        compress(&source, None).read_to_end(&mut zipped).unwrap();
        let mut names = Vec::new();
        let mut reader = &zipped[..];
        while let Some(entry) = zip::read::read_zipfile_from_stream(&mut reader).unwrap() {
            names.push(entry.name().to_owned());
        }
        assert_eq!(names, ["empty/", "full/", "full/f.txt"], "{name}");

        let target = root.get_folder("target");
        unpack(&zipped[..], &target).unwrap();
        assert!(target.get_folder("empty").exists().unwrap(), "{name}");
        assert!(target.get_folder("empty").list().unwrap().is_empty(), "{name}");
        assert_eq!(read(&target.get_file("full/f.txt")), "f", "{name}");
    });
}

#[test]
fn zip_releases_an_entry_before_opening_the_next() {
    let (root, state) = map_root_with_state();
    root.get_file("a.txt").content().write_str("first entry").unwrap();
    root.get_file("b.txt").content().write_str("second entry").unwrap();

    let mut stream = compress(&root, None)
        .with_options(ZipOptions::default().compression(Compression::Stored));
    let mut out = Vec::new();
    let mut byte = [0u8; 1];
    while !out.windows(11).any(|w| w == b"first entry") {
        assert_eq!(stream.read(&mut byte).unwrap(), 1);
        out.push(byte[0]);
    }
    assert_eq!(*state.opened.read().unwrap(), [JailedPath::parse("a.txt")]);

    stream.read_to_end(&mut out).unwrap();
    assert_eq!(
        *state.opened.read().unwrap(),
        [JailedPath::parse("a.txt"), JailedPath::parse("b.txt")]
    );
}

#[test]
fn zip_prefix_nests_entries() {
    let source = VirtualFolder::new().root();
    let folder = source.get_folder("site");
    folder.get_file("index.html").content().write_str("i").unwrap();

    let target = VirtualFolder::new().root();
    unpack(compress(&folder, Some("/web/root/")), &target).unwrap();
    assert_eq!(paths(&target), ["/web", "/web/root", "/web/root/index.html"]);
}

#[test]
fn zip_of_resources_uses_jail_relative_names() {
    let source = VirtualFolder::new().root();
    let a = source.get_file("x/y/a.txt");
    let b = source.get_file("z.txt");
    a.content().write_str("a").unwrap();
    b.content().write_str("b").unwrap();

    let target = VirtualFolder::new().root();
    let stream = compress_resources(vec![Resource::from(a), Resource::from(b)], None);
    unpack(stream, &target).unwrap();
    assert_eq!(read(&target.get_file("x/y/a.txt")), "a");
    assert_eq!(read(&target.get_file("z.txt")), "b");
}

#[test]
fn zip_options_apply() {
    let source = VirtualFolder::new().root();
    source
        .get_file("text.txt")
        .content()
        .write_bytes(&[b'z'; 4096])
        .unwrap();
    let size_with = |options: ZipOptions| {
        let mut zipped = Vec::new();
        compress(&source, None)
            .with_options(options)
            .read_to_end(&mut zipped)
            .unwrap();
        zipped.len()
    };
    let stored = size_with(ZipOptions::default().compression(Compression::Stored));
    let deflated = size_with(ZipOptions::default().chunk_size(100));
    assert!(stored > 4096);
    assert!(deflated < stored);
}

#[test]
fn unpack_leaves_the_callers_reader_usable() {
    let source = VirtualFolder::new().root();
    source.get_file("f.txt").content().write_str("f").unwrap();
    let mut zipped = Vec::new();
    compress(&source, None).read_to_end(&mut zipped).unwrap();

    let mut reader = Cursor::new(zipped);
    let first = VirtualFolder::new().root();
    unpack(&mut reader, &first).unwrap();
    reader.set_position(0);
    let second = VirtualFolder::new().root();
    unpack(&mut reader, &second).unwrap();
    assert_eq!(read(&second.get_file("f.txt")), "f");
}

#[test]
fn zip_archive_view_on_local_disk() {
    let dir = tempfile::tempdir().unwrap();
    let local = LocalFolder::new(dir.path()).root();
    let source = VirtualFolder::new().root();
    source.get_file("docs/guide.md").content().write_str("# guide").unwrap();

    let bundle = local.get_file("bundle.zip");
    bundle.content().write_from(&mut compress(&source, None)).unwrap();

    let view = ZipArchive::new(bundle.clone()).root();
    assert_eq!(paths(&view), ["/docs", "/docs/guide.md"]);
    assert_eq!(read(&view.get_file("docs/guide.md")), "# guide");

    let extracted = VirtualFolder::new().root();
    view.get_folder("docs").copy_to(&extracted).unwrap();
    assert_eq!(read(&extracted.get_file("docs/guide.md")), "# guide");

    unpack_file(&bundle, &local.get_folder("unpacked")).unwrap();
    assert!(dir.path().join("unpacked/docs/guide.md").is_file());
}

// =============================================================================
// Error Handling
// =============================================================================

#[test]
fn errors_carry_paths() {
    let root = VirtualFolder::new().root();
    let err = root.get_file("nope/missing.txt").size().unwrap_err();
    assert_eq!(err.to_string(), "does not exist: /nope/missing.txt");
}

#[test]
fn errors_cross_io_boundaries() {
    let original = ResourceError::AlreadyExists {
        path: JailedPath::parse("/taken"),
        operation: "rename",
    };
    let io_error: io::Error = original.into();
    assert_eq!(io_error.kind(), io::ErrorKind::AlreadyExists);
    let back = ResourceError::from(io_error);
    assert!(back.is_already_exists());
}
