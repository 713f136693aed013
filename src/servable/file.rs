use std::path::Path;

use tracing::warn;

use super::{Properties, Servable, set_property};
use crate::connection::Connection;
use crate::error::Result;
use crate::http::mime::content_type_for;

/// A file on disk as a servable.
///
/// The path lives in the `path` property and the file is read on every
/// render, synchronously. Embedded in a page it renders as its text; as a
/// route target it answers with the raw bytes and a Content-Type guessed
/// from the extension.
#[derive(Debug, Clone)]
pub struct File {
    name: String,
    properties: Properties,
}

impl File {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut file = Self {
            name,
            properties: Properties::new(),
        };
        set_property(&mut file, "path", path.display());
        file
    }

    pub fn path(&self) -> Result<&Path> {
        self.get("path").map(Path::new)
    }

    pub fn read(&self) -> Result<Vec<u8>> {
        Ok(std::fs::read(self.path()?)?)
    }

    /// The file as text. Invalid UTF-8 is replaced, not rejected.
    pub fn contents(&self) -> Result<String> {
        Ok(String::from_utf8_lossy(&self.read()?).into_owned())
    }
}

impl Servable for File {
    fn name(&self) -> &str {
        &self.name
    }

    fn properties(&self) -> &Properties {
        &self.properties
    }

    fn properties_mut(&mut self) -> &mut Properties {
        &mut self.properties
    }

    fn render_into(&self, out: &mut String) {
        match self.contents() {
            Ok(text) => out.push_str(&text),
            Err(e) => warn!(file = %self.name, error = %e, "file render failed"),
        }
    }

    fn clone_box(&self) -> Box<dyn Servable> {
        Box::new(self.clone())
    }

    fn serve(&self, conn: &mut Connection) -> Result<()> {
        let path = self.path()?;
        let bytes = std::fs::read(path)?;
        conn.content_type(content_type_for(path));
        conn.write_bytes(&bytes);
        Ok(())
    }
}
