use crate::storage::mapper::{disambiguate, map_url_to_path};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use url::Url;

/// Tracks which URL owns each local path during one crawl run
///
/// Two distinct URLs can sanitize to the same file (different query strings,
/// different hosts with the same path). The first URL keeps the plain path;
/// later ones get a hash-suffixed name so no content is overwritten.
#[derive(Debug)]
pub struct PathRegistry {
    root: PathBuf,
    owners: HashMap<PathBuf, String>,
    assigned: HashMap<String, PathBuf>,
}

impl PathRegistry {
    /// Creates an empty registry for the given save root
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            owners: HashMap::new(),
            assigned: HashMap::new(),
        }
    }

    /// Returns the local path for a URL, claiming it on first use
    ///
    /// Repeated calls with the same URL return the same path.
    pub fn claim(&mut self, url: &Url) -> PathBuf {
        if let Some(existing) = self.assigned.get(url.as_str()) {
            return existing.clone();
        }

        let mapped = map_url_to_path(url, &self.root);
        let path = match self.owners.get(&mapped) {
            Some(owner) if owner != url.as_str() => {
                let alternative = disambiguate(&mapped, url);
                tracing::debug!(
                    "Local path {} already used by {}, saving {} as {}",
                    mapped.display(),
                    owner,
                    url,
                    alternative.display()
                );
                alternative
            }
            _ => mapped,
        };

        self.owners.insert(path.clone(), url.to_string());
        self.assigned.insert(url.to_string(), path.clone());
        path
    }

    /// Returns the path previously assigned to a URL
    pub fn get(&self, url: &str) -> Option<&Path> {
        self.assigned.get(url).map(PathBuf::as_path)
    }

    /// The save root all paths are placed under
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of claimed paths
    pub fn len(&self) -> usize {
        self.assigned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assigned.is_empty()
    }
}
