//! VM configuration types.

use std::ffi::c_void;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Host allocator hook.
///
/// Called as `(null, 0, n)` to allocate, `(ptr, old, new)` to resize and
/// `(ptr, old, 0)` to free. Returning null for a non-zero request means the
/// host refused the memory.
pub type ReallocateFn =
    unsafe extern "C" fn(memory: *mut c_void, old_size: usize, new_size: usize) -> *mut c_void;

/// Receives text written by `System.print` and `System.write`.
pub type WriteFn = fn(text: &str);

/// Receives compile errors, runtime errors and stack trace lines.
pub type ErrorFn = fn(kind: ErrorKind, module: &str, line: usize, message: &str);

/// Kind of diagnostic passed to an [`ErrorFn`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Compile,
    Runtime,
    StackTrace,
}

pub const DEFAULT_INITIAL_HEAP_SIZE: usize = 10 * 1024 * 1024;
pub const DEFAULT_MIN_HEAP_SIZE: usize = 1024 * 1024;
pub const DEFAULT_HEAP_GROWTH_PERCENT: usize = 50;

/// Configuration for a [`crate::Vm`].
///
/// Zero-valued sizes and a `None` allocator mean "use the default"; see
/// [`Configuration::resolved`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Configuration {
    pub reallocate_fn: Option<ReallocateFn>,
    /// Heap size in bytes that triggers the first collection.
    pub initial_heap_size: usize,
    /// The threshold never drops below this after a collection.
    pub min_heap_size: usize,
    /// How far past the live size the next threshold is placed.
    pub heap_growth_percent: usize,
    pub write_fn: Option<WriteFn>,
    pub error_fn: Option<ErrorFn>,
}

impl Configuration {
    /// Replace zero values with their defaults.
    pub fn resolved(mut self) -> Self {
        if self.reallocate_fn.is_none() {
            self.reallocate_fn = Some(default_reallocate);
        }
        if self.initial_heap_size == 0 {
            self.initial_heap_size = DEFAULT_INITIAL_HEAP_SIZE;
        }
        if self.min_heap_size == 0 {
            self.min_heap_size = DEFAULT_MIN_HEAP_SIZE;
        }
        if self.heap_growth_percent == 0 {
            self.heap_growth_percent = DEFAULT_HEAP_GROWTH_PERCENT;
        }
        self
    }

    pub fn reallocate(&self) -> ReallocateFn {
        self.reallocate_fn.unwrap_or(default_reallocate)
    }
}

/// The allocator used when the host supplies none: `realloc` and `free`.
///
/// # Safety
/// `memory` must be null or a pointer previously returned by this function.
pub unsafe extern "C" fn default_reallocate(
    memory: *mut c_void,
    _old_size: usize,
    new_size: usize,
) -> *mut c_void {
    unsafe {
        if new_size == 0 {
            libc::free(memory);
            return std::ptr::null_mut();
        }
        libc::realloc(memory, new_size)
    }
}

// ============================================================================
// Config file (CLI)
// ============================================================================

/// Errors produced while loading a TOML config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// On-disk configuration, e.g. `wren.toml`:
///
/// ```toml
/// [heap]
/// initial_size = 1048576
/// min_size = 65536
/// growth_percent = 100
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub heap: HeapSection,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct HeapSection {
    pub initial_size: usize,
    pub min_size: usize,
    pub growth_percent: usize,
}

impl ConfigFile {
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overlay the file's non-zero values onto `config`.
    pub fn apply(&self, mut config: Configuration) -> Configuration {
        if self.heap.initial_size != 0 {
            config.initial_heap_size = self.heap.initial_size;
        }
        if self.heap.min_size != 0 {
            config.min_heap_size = self.heap.min_size;
        }
        if self.heap.growth_percent != 0 {
            config.heap_growth_percent = self.heap.growth_percent;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolved_fills_defaults() {
        let config = Configuration::default().resolved();
        assert_eq!(config.initial_heap_size, DEFAULT_INITIAL_HEAP_SIZE);
        assert_eq!(config.min_heap_size, DEFAULT_MIN_HEAP_SIZE);
        assert_eq!(config.heap_growth_percent, DEFAULT_HEAP_GROWTH_PERCENT);
        assert!(config.reallocate_fn.is_some());
    }

    #[test]
    fn test_resolved_keeps_explicit_values() {
        let config = Configuration {
            initial_heap_size: 4096,
            min_heap_size: 512,
            heap_growth_percent: 10,
            ..Default::default()
        }
        .resolved();
        assert_eq!(config.initial_heap_size, 4096);
        assert_eq!(config.min_heap_size, 512);
        assert_eq!(config.heap_growth_percent, 10);
    }

    #[test]
    fn test_config_file_parse() {
        let file = ConfigFile::parse("[heap]\ninitial_size = 2048\ngrowth_percent = 25\n").unwrap();
        assert_eq!(file.heap.initial_size, 2048);
        assert_eq!(file.heap.min_size, 0);

        let config = file.apply(Configuration::default()).resolved();
        assert_eq!(config.initial_heap_size, 2048);
        assert_eq!(config.min_heap_size, DEFAULT_MIN_HEAP_SIZE);
        assert_eq!(config.heap_growth_percent, 25);
    }

    #[test]
    fn test_config_file_rejects_unknown_keys() {
        assert!(ConfigFile::parse("[heap]\nbogus = 1\n").is_err());
    }

    #[test]
    fn test_default_reallocate_roundtrip() {
        unsafe {
            let p = default_reallocate(std::ptr::null_mut(), 0, 64);
            assert!(!p.is_null());
            let p = default_reallocate(p, 64, 128);
            assert!(!p.is_null());
            assert!(default_reallocate(p, 128, 0).is_null());
        }
    }
}
