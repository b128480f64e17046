//! Compiled-module cache.
//!
//! Compiling the module image is by far the most expensive step of a
//! request, so compiled [`wasmtime::Module`]s are memoized in an LRU
//! cache keyed by the BLAKE3 hash of the image bytes. The cache is the
//! only state shared across requests: it is created once at process
//! start and guarded by a single mutex.

use blake3::Hasher;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use wasmtime::Module;

/// Content-addressed cache key for a compiled module.
///
/// # Examples
///
/// ```
/// use wasigate_runtime::cache::ImageKey;
///
/// let a = ImageKey::for_image(b"\0asm...");
/// let b = ImageKey::for_image(b"\0asm...");
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageKey(String);

impl ImageKey {
    /// Derives the key for a module image from its bytes.
    #[must_use]
    pub fn for_image(image: &[u8]) -> Self {
        let mut hasher = Hasher::new();
        hasher.update(image);
        Self(format!("img_{}", hasher.finalize().to_hex()))
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ImageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// LRU cache of compiled modules, shared by all requests.
///
/// Thread-safe; `get` updates recency and hit/miss counters.
pub struct ModuleCache {
    entries: Mutex<lru::LruCache<ImageKey, Module>>,
    hits: AtomicU32,
    misses: AtomicU32,
}

impl std::fmt::Debug for ModuleCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleCache")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .field("hits", &self.hits())
            .finish_non_exhaustive()
    }
}

impl ModuleCache {
    /// Creates a cache holding up to `capacity` compiled modules.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(lru::LruCache::new(
                NonZeroUsize::new(capacity).expect("capacity must be non-zero"),
            )),
            hits: AtomicU32::new(0),
            misses: AtomicU32::new(0),
        }
    }

    /// Looks up a compiled module, updating recency and counters.
    #[must_use]
    pub fn get(&self, key: &ImageKey) -> Option<Module> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(module) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(module.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Stores a compiled module, evicting the least recently used entry
    /// when full.
    pub fn insert(&self, key: ImageKey, module: Module) {
        let mut entries = self.entries.lock().unwrap();
        tracing::debug!(key = %key, "module cached");
        entries.put(key, module);
    }

    /// Removes all entries.
    pub fn clear(&self) {
        let mut entries = self.entries.lock().unwrap();
        entries.clear();
        tracing::info!("module cache cleared");
    }

    /// Returns the number of cached modules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// Returns whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the cache capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entries.lock().unwrap().cap().get()
    }

    /// Returns the number of lookups answered from the cache.
    #[must_use]
    pub fn hits(&self) -> u32 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Returns the number of lookups that missed.
    #[must_use]
    pub fn misses(&self) -> u32 {
        self.misses.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasmtime::{Config, Engine};

    fn empty_module(engine: &Engine) -> Module {
        let wasm = wat::parse_str("(module)").unwrap();
        Module::new(engine, wasm).unwrap()
    }

    #[test]
    fn test_key_is_content_addressed() {
        let a = ImageKey::for_image(b"image one");
        let b = ImageKey::for_image(b"image one");
        let c = ImageKey::for_image(b"image two");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.as_str().starts_with("img_"));
    }

    #[test]
    fn test_insert_and_get() {
        let engine = Engine::new(&Config::default()).unwrap();
        let cache = ModuleCache::new(4);
        let key = ImageKey::for_image(b"x");

        assert!(cache.get(&key).is_none());
        cache.insert(key.clone(), empty_module(&engine));
        assert!(cache.get(&key).is_some());
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);
    }

    #[test]
    fn test_lru_eviction() {
        let engine = Engine::new(&Config::default()).unwrap();
        let cache = ModuleCache::new(2);

        let k1 = ImageKey::for_image(b"1");
        let k2 = ImageKey::for_image(b"2");
        let k3 = ImageKey::for_image(b"3");

        cache.insert(k1.clone(), empty_module(&engine));
        cache.insert(k2.clone(), empty_module(&engine));

        // Touch k1 so k2 becomes the eviction candidate.
        assert!(cache.get(&k1).is_some());

        cache.insert(k3.clone(), empty_module(&engine));
        assert!(cache.get(&k1).is_some());
        assert!(cache.get(&k2).is_none());
        assert!(cache.get(&k3).is_some());
    }

    #[test]
    fn test_clear() {
        let engine = Engine::new(&Config::default()).unwrap();
        let cache = ModuleCache::new(2);
        cache.insert(ImageKey::for_image(b"1"), empty_module(&engine));
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), 2);
    }
}
