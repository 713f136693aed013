//! Static file routes.
//!
//! At start the directory is walked recursively and every file is bound at
//! its path relative to the root: `public/css/site.css` becomes
//! `/css/site.css`. An `index.html` is also bound at its directory's path.
//! Each route is a [`File`] servable, read when requested, so edits show
//! up without a restart; new files do not. Symlinks are skipped.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use super::RoutingExtension;
use crate::error::Result;
use crate::routing::{Handler, RouteTable};
use crate::servable::File;

#[derive(Debug, Clone)]
pub struct Files {
    root: PathBuf,
}

impl Files {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl RoutingExtension for Files {
    fn route(&self, routes: &RouteTable) -> Result<()> {
        for file in walk(&self.root)? {
            let Some(url) = url_path(&self.root, &file) else {
                continue;
            };

            if url.ends_with("/index.html") {
                let dir = url.trim_end_matches("index.html");
                routes.add_route(dir, Handler::servable(File::new(&file)));
            }
            debug!(path = %url, file = %file.display(), "file route");
            routes.add_route(&url, Handler::servable(File::new(&file)));
        }
        Ok(())
    }
}

/// Every regular file under `dir`, sorted by name within each directory.
/// Symlinks are not followed.
pub fn walk(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn url_path(root: &Path, file: &Path) -> Option<String> {
    let relative = file.strip_prefix(root).ok()?;
    let mut url = String::new();
    for part in relative.components() {
        url.push('/');
        url.push_str(part.as_os_str().to_str()?);
    }
    Some(url)
}
