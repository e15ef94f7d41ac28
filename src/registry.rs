//! Registered-plate lookup.
//!
//! The registry is a plain text file, one plate per line, edited by hand or
//! by whatever provisioning tooling the site uses. This module is
//! responsible for:
//! 1. Loading the file into memory and answering exact-match lookups.
//! 2. Reloading when the file changes, so edits take effect without
//!    restarting the daemon. Change detection compares mtime and size
//!    together; mtime alone misses rapid edits on filesystems with
//!    coarse timestamps.
//! 3. Degrading to an empty registry (every plate "Not Registered") when
//!    the file is missing, warning once rather than on every lookup.
//!
//! Lookups compare the normalized plate text against each line with
//! surrounding whitespace trimmed. No globbing, no case folding: the file
//! is expected to hold plates in the same form the normalizer emits.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Exact-match plate registry backed by a line-oriented text file.
#[derive(Debug)]
pub struct PlateRegistry {
    path: PathBuf,
    plates: HashSet<String>,
    loaded_stamp: Option<(SystemTime, u64)>,
    missing_warned: bool,
}

impl PlateRegistry {
    /// Attach to a registry file. The file does not have to exist yet; a
    /// missing file simply means no plate is registered.
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let mut registry = Self {
            path: path.as_ref().to_path_buf(),
            plates: HashSet::new(),
            loaded_stamp: None,
            missing_warned: false,
        };
        registry.refresh();
        registry
    }

    /// Whether `plate` appears in the registry file. Checks the file's
    /// (mtime, size) stamp first and reloads if it changed since the last
    /// load.
    pub fn is_registered(&mut self, plate: &str) -> bool {
        self.refresh();
        self.plates.contains(plate)
    }

    pub fn len(&self) -> usize {
        self.plates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plates.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn refresh(&mut self) {
        let stamp = match fs::metadata(&self.path)
            .and_then(|meta| meta.modified().map(|mtime| (mtime, meta.len())))
        {
            Ok(stamp) => stamp,
            Err(_) => {
                if !self.missing_warned {
                    log::warn!(
                        "plate registry {} not readable; treating all plates as unregistered",
                        self.path.display()
                    );
                    self.missing_warned = true;
                }
                self.plates.clear();
                self.loaded_stamp = None;
                return;
            }
        };

        if self.loaded_stamp == Some(stamp) {
            return;
        }

        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                self.plates = contents
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(str::to_string)
                    .collect();
                self.loaded_stamp = Some(stamp);
                // A file that disappeared and came back should warn again
                // if it disappears once more.
                self.missing_warned = false;
                log::info!(
                    "loaded {} registered plates from {}",
                    self.plates.len(),
                    self.path.display()
                );
            }
            Err(err) => {
                if !self.missing_warned {
                    log::warn!(
                        "plate registry {} not readable ({}); treating all plates as unregistered",
                        self.path.display(),
                        err
                    );
                    self.missing_warned = true;
                }
                self.plates.clear();
                self.loaded_stamp = None;
            }
        }
    }
}
