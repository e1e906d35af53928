use crate::error::Result;
use std::collections::HashMap;
use std::sync::Arc;

/// In-memory image sources bound to locators. Locators without a binding
/// are read as file paths.
#[derive(Debug, Default)]
pub(crate) struct SourceRegistry {
    blobs: HashMap<String, Arc<Vec<u8>>>,
}

impl SourceRegistry {
    pub(crate) fn register(&mut self, locator: &str, bytes: Vec<u8>) {
        self.blobs.insert(locator.to_string(), Arc::new(bytes));
    }

    /// Bytes currently bound to `locator`
    pub(crate) fn bound(&self, locator: &str) -> Option<&[u8]> {
        self.blobs.get(locator).map(|bytes| bytes.as_slice())
    }

    pub(crate) fn load(&self, locator: &str) -> Result<Arc<Vec<u8>>> {
        match self.blobs.get(locator) {
            Some(bytes) => Ok(Arc::clone(bytes)),
            None => Ok(Arc::new(std::fs::read(locator)?)),
        }
    }
}
