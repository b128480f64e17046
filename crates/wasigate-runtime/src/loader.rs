//! Module image loading.
//!
//! The module image is an opaque artifact prepared outside this process
//! (for example a PHP interpreter compiled to `wasm32-wasip1`). The
//! loader reads it from disk and rejects anything that is not a
//! WebAssembly binary before the bytes reach the engine.

use std::path::{Path, PathBuf};
use wasigate_core::{Error, Result};

/// Magic bytes opening every WebAssembly binary.
const WASM_MAGIC: [u8; 4] = [0x00, 0x61, 0x73, 0x6d];

/// Reads the configured module image from disk.
///
/// # Examples
///
/// ```no_run
/// use wasigate_runtime::ModuleLoader;
///
/// # async fn example() -> wasigate_core::Result<()> {
/// let loader = ModuleLoader::new("/srv/php.wasm");
/// let image = loader.read().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ModuleLoader {
    path: PathBuf,
}

impl ModuleLoader {
    /// Creates a loader for the image at `path`.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Returns the image path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the image bytes.
    ///
    /// # Errors
    ///
    /// Returns `Error::ModuleLoad` if the file cannot be read and
    /// `Error::Compile` if it is not a WebAssembly binary.
    pub async fn read(&self) -> Result<Vec<u8>> {
        let image = tokio::fs::read(&self.path)
            .await
            .map_err(|source| Error::ModuleLoad {
                path: self.path.clone(),
                source,
            })?;

        if image.len() < WASM_MAGIC.len() || image[..WASM_MAGIC.len()] != WASM_MAGIC {
            return Err(Error::Compile {
                message: format!("{} is not a WebAssembly binary", self.path.display()),
            });
        }

        tracing::debug!(path = %self.path.display(), bytes = image.len(), "module image read");
        Ok(image)
    }
}
