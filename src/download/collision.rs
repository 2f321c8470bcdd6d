use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::paths;

/// Which item currently owns each local path written (or found) this run.
///
/// Filenames are not unique in a library: two different items called
/// `IMG_0001.JPG` taken in the same month would otherwise land on the same
/// file. The second one gets its id appended instead.
#[derive(Debug, Default)]
pub struct PathCollisionMap {
    owners: HashMap<PathBuf, String>,
}

impl PathCollisionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Local path for `filename` in `dir` for item `id`.
    pub fn resolve(&self, dir: &Path, filename: &str, id: &str) -> PathBuf {
        let path = dir.join(filename);
        match self.owners.get(&path) {
            Some(owner) if owner != id => {
                let renamed = dir.join(paths::insert_suffix(filename, id));
                tracing::debug!(
                    "{} belongs to item {}, using {} for item {}",
                    path.display(),
                    owner,
                    renamed.display(),
                    id
                );
                renamed
            }
            _ => path,
        }
    }

    /// Claim `path` for `id`, replacing any previous owner.
    pub fn record(&mut self, path: PathBuf, id: String) {
        self.owners.insert(path, id);
    }

    #[cfg(test)]
    pub fn owner(&self, path: &Path) -> Option<&str> {
        self.owners.get(path).map(String::as_str)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.owners.len()
    }
}
