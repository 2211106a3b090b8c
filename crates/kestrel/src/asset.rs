//! # Assets — Model Cache and Hot-Reload
//!
//! Models are loaded through an [`AssetCache`] owned by whoever builds the
//! scene. The cache is keyed by the path string as given: the second `load`
//! of the same path returns the stored [`Model`] without touching the disk
//! or the [`MeshUploader`] again.
//!
//! ```text
//! load("duck.obj", uploader)
//!   ├─ cached?  ──► Model { mesh, vertex_count }            (hit)
//!   └─ miss:    read file ──► tobj (triangulate) ──► Vec<Vertex>
//!               uploader.upload(vertices) ──► MeshHandle
//!               remember Model under "duck.obj"
//! ```
//!
//! Only Wavefront `.obj` is understood. Anything else is
//! [`AssetError::UnsupportedFormat`], and a file without triangles is
//! [`AssetError::Malformed`]. Both are meant to be fatal at scene setup.
//!
//! ## Hot-reload
//!
//! [`AssetCache::watch`] starts a `notify` watcher over every cached file.
//! Events are drained by [`AssetCache::process_reloads`], called once per
//! frame, and debounced: editors save atomically (write temp, rename), which
//! produces a burst of events, so a path is only invalidated after 100ms of
//! quiet. Invalidation drops the cache entry; the next `load` re-reads the
//! file. Models already placed in the world keep their old handle.
//!
//! If the watcher cannot be created the cache keeps working without
//! reloads.

use std::collections::HashMap;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::error::AssetError;
use crate::render::{MeshHandle, Vertex};

/// Events within this duration of each other are collapsed into a single
/// reload.
const DEBOUNCE_DURATION: Duration = Duration::from_millis(100);

/// A loaded, uploaded mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Model {
    pub mesh: MeshHandle,
    /// Number of vertices in the flattened triangle list.
    pub vertex_count: u32,
}

impl Model {
    pub fn triangle_count(&self) -> u32 {
        self.vertex_count / 3
    }
}

/// GPU upload, as seen from the loader.
pub trait MeshUploader {
    /// Upload a flattened triangle list and return a handle to it.
    fn upload(&mut self, name: &str, vertices: &[Vertex]) -> MeshHandle;
}

struct AssetWatcher {
    watcher: RecommendedWatcher,
    rx: mpsc::Receiver<Result<notify::Event, notify::Error>>,
    /// Canonical path on disk → cache key.
    watched: HashMap<PathBuf, PathBuf>,
    disconnected: bool,
}

impl AssetWatcher {
    fn new() -> Result<Self, AssetError> {
        let (tx, rx) = mpsc::channel();
        let watcher = notify::recommended_watcher(move |res| {
            // Receiver gone means the cache was dropped.
            let _ = tx.send(res);
        })?;
        Ok(Self {
            watcher,
            rx,
            watched: HashMap::new(),
            disconnected: false,
        })
    }

    fn watch(&mut self, key: &Path) {
        let canonical = match key.canonicalize() {
            Ok(p) => p,
            Err(e) => {
                log::warn!("cannot watch '{}': {e}", key.display());
                return;
            }
        };
        if self.watched.contains_key(&canonical) {
            return;
        }
        if let Err(e) = self.watcher.watch(&canonical, RecursiveMode::NonRecursive) {
            log::warn!("failed to watch '{}': {e}", canonical.display());
            return;
        }
        self.watched.insert(canonical, key.to_path_buf());
    }

    /// Drain pending events, returning the cache keys that changed.
    fn poll(&mut self) -> Vec<PathBuf> {
        let mut changed = Vec::new();
        if self.disconnected {
            return changed;
        }
        loop {
            match self.rx.try_recv() {
                Ok(Ok(event)) => {
                    // Atomic saves show up as create.
                    if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                        continue;
                    }
                    for path in &event.paths {
                        let canonical = path.canonicalize().unwrap_or_else(|_| path.clone());
                        if let Some(key) = self.watched.get(&canonical) {
                            changed.push(key.clone());
                        }
                    }
                }
                Ok(Err(e)) => log::warn!("asset watcher error: {e}"),
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => {
                    log::warn!("asset watcher disconnected, hot-reload disabled");
                    self.disconnected = true;
                    break;
                }
            }
        }
        changed
    }
}

/// Path-keyed memo of loaded models.
#[derive(Default)]
pub struct AssetCache {
    models: HashMap<PathBuf, Model>,
    pending_reloads: HashMap<PathBuf, Instant>,
    watcher: Option<AssetWatcher>,
    loads: u64,
}

impl AssetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a model, or return the cached one.
    pub fn load(
        &mut self,
        path: impl AsRef<Path>,
        uploader: &mut dyn MeshUploader,
    ) -> Result<Model, AssetError> {
        let path = path.as_ref();
        if let Some(model) = self.models.get(path) {
            log::debug!("asset cache hit: {}", path.display());
            return Ok(*model);
        }

        log::debug!("asset cache miss: {}", path.display());
        let vertices = load_obj_vertices(path)?;
        let name = path.to_string_lossy();
        let mesh = uploader.upload(&name, &vertices);
        let model = Model {
            mesh,
            vertex_count: vertices.len() as u32,
        };
        self.loads += 1;
        self.models.insert(path.to_path_buf(), model);
        if let Some(watcher) = &mut self.watcher {
            watcher.watch(path);
        }
        Ok(model)
    }

    pub fn get(&self, path: impl AsRef<Path>) -> Option<Model> {
        self.models.get(path.as_ref()).copied()
    }

    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.models.contains_key(path.as_ref())
    }

    /// Forget a cached model so the next `load` re-reads it.
    pub fn invalidate(&mut self, path: impl AsRef<Path>) -> Option<Model> {
        self.models.remove(path.as_ref())
    }

    pub fn clear(&mut self) {
        self.models.clear();
        self.pending_reloads.clear();
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Number of files actually read and uploaded so far.
    pub fn loads(&self) -> u64 {
        self.loads
    }

    /// Start watching every cached file, and every file loaded later.
    pub fn watch(&mut self) -> Result<(), AssetError> {
        if self.watcher.is_some() {
            return Ok(());
        }
        let mut watcher = AssetWatcher::new()?;
        for path in self.models.keys() {
            watcher.watch(path);
        }
        log::info!("asset hot-reload enabled for {} file(s)", watcher.watched.len());
        self.watcher = Some(watcher);
        Ok(())
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.as_ref().is_some_and(|w| !w.disconnected)
    }

    /// Poll the watcher and invalidate every path that has been quiet for the
    /// debounce window. Returns the invalidated paths.
    pub fn process_reloads(&mut self) -> Vec<PathBuf> {
        self.process_reloads_at(Instant::now())
    }

    fn process_reloads_at(&mut self, now: Instant) -> Vec<PathBuf> {
        if let Some(watcher) = &mut self.watcher {
            for path in watcher.poll() {
                self.pending_reloads.insert(path, now);
            }
        }

        let mut ready = Vec::new();
        self.pending_reloads.retain(|path, timestamp| {
            if now.duration_since(*timestamp) >= DEBOUNCE_DURATION {
                ready.push(path.clone());
                false
            } else {
                true
            }
        });

        for path in &ready {
            if self.models.remove(path).is_some() {
                log::info!("asset changed on disk, invalidated: {}", path.display());
            }
        }
        ready
    }
}

/// Read an `.obj` file into a flattened triangle list.
pub fn load_obj_vertices(path: &Path) -> Result<Vec<Vertex>, AssetError> {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    if extension != "obj" {
        return Err(AssetError::UnsupportedFormat {
            path: path.to_path_buf(),
            extension,
        });
    }

    let bytes = std::fs::read(path).map_err(|source| AssetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let malformed = |reason: String| AssetError::Malformed {
        path: path.to_path_buf(),
        reason,
    };

    let options = tobj::LoadOptions {
        triangulate: true,
        single_index: true,
        ..Default::default()
    };
    let (models, _materials) = tobj::load_obj_buf(&mut BufReader::new(&bytes[..]), &options, |_| {
        Ok((Vec::new(), Default::default()))
    })
    .map_err(|e| malformed(e.to_string()))?;

    let mut vertices = Vec::new();
    for model in &models {
        let mesh = &model.mesh;
        for &index in &mesh.indices {
            let i = index as usize;
            let position = triple(&mesh.positions, i)
                .ok_or_else(|| malformed(format!("index {i} out of range in '{}'", model.name)))?;
            let normal = triple(&mesh.normals, i).unwrap_or([0.0, 0.0, 1.0]);
            let uv = mesh
                .texcoords
                .get(2 * i..2 * i + 2)
                .map_or([0.0; 2], |t| [t[0], t[1]]);
            vertices.push(Vertex::new(position, normal, uv));
        }
    }

    if vertices.is_empty() {
        return Err(malformed("no triangles".to_string()));
    }
    Ok(vertices)
}

fn triple(data: &[f32], i: usize) -> Option<[f32; 3]> {
    data.get(3 * i..3 * i + 3).map(|v| [v[0], v[1], v[2]])
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE: &str = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 1\nf 1//1 2//1 3//1\n";
    const QUAD: &str = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n";

    #[derive(Default)]
    struct CountingUploader {
        uploads: u64,
    }

    impl MeshUploader for CountingUploader {
        fn upload(&mut self, _name: &str, _vertices: &[Vertex]) -> MeshHandle {
            self.uploads += 1;
            MeshHandle(self.uploads)
        }
    }

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("kestrel-asset-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn repeated_load_is_served_from_cache() {
        let path = temp_file("tri.obj", TRIANGLE);
        let mut cache = AssetCache::new();
        let mut uploader = CountingUploader::default();

        let a = cache.load(&path, &mut uploader).unwrap();
        let b = cache.load(&path, &mut uploader).unwrap();

        assert_eq!(a, b);
        assert_eq!(a.vertex_count, 3);
        assert_eq!(uploader.uploads, 1);
        assert_eq!(cache.loads(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn quads_are_triangulated() {
        let path = temp_file("quad.obj", QUAD);
        let vertices = load_obj_vertices(&path).unwrap();
        assert_eq!(vertices.len(), 6);
        assert_eq!(vertices[0].normal, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn invalidate_forces_a_reload() {
        let path = temp_file("inv.obj", TRIANGLE);
        let mut cache = AssetCache::new();
        let mut uploader = CountingUploader::default();

        let first = cache.load(&path, &mut uploader).unwrap();
        assert!(cache.invalidate(&path).is_some());
        assert!(!cache.contains(&path));
        let second = cache.load(&path, &mut uploader).unwrap();

        assert_ne!(first.mesh, second.mesh);
        assert_eq!(uploader.uploads, 2);
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        let path = temp_file("duck.fbx", TRIANGLE);
        let err = AssetCache::new()
            .load(&path, &mut CountingUploader::default())
            .unwrap_err();
        assert!(matches!(err, AssetError::UnsupportedFormat { ref extension, .. } if extension == "fbx"));
    }

    #[test]
    fn empty_obj_is_malformed() {
        let path = temp_file("empty.obj", "# nothing here\n");
        assert!(matches!(
            load_obj_vertices(&path),
            Err(AssetError::Malformed { .. })
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let path = std::env::temp_dir().join("kestrel-definitely-missing.obj");
        assert!(matches!(load_obj_vertices(&path), Err(AssetError::Io { .. })));
    }

    #[test]
    fn reloads_wait_for_quiet_period() {
        let path = temp_file("debounce.obj", TRIANGLE);
        let mut cache = AssetCache::new();
        cache.load(&path, &mut CountingUploader::default()).unwrap();

        let t0 = Instant::now();
        cache.pending_reloads.insert(path.clone(), t0);

        assert!(cache.process_reloads_at(t0 + Duration::from_millis(10)).is_empty());
        assert!(cache.contains(&path));

        let ready = cache.process_reloads_at(t0 + DEBOUNCE_DURATION);
        assert_eq!(ready, vec![path.clone()]);
        assert!(!cache.contains(&path));
    }
}
