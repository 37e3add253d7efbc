use async_trait::async_trait;

use crate::error::Result;
use crate::resource::Resource;

/// Something that can talk to a CalDAV server.
///
/// Implementors are shared with background tasks, hence the `Send + Sync + 'static` bounds.
#[async_trait]
pub trait DavTransport: Send + Sync + 'static {
    /// Get the depth-1 listing of a collection, as a raw multi-status body
    async fn fetch(&self, collection: &Resource) -> Result<Vec<u8>>;

    /// Create or replace a single item
    async fn put(&self, item: &Resource, ical: String) -> Result<()>;

    /// Remove a single item
    async fn delete(&self, item: &Resource) -> Result<()>;
}
