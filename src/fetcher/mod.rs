pub mod graphql;

use async_trait::async_trait;

use crate::error::FetchError;
use crate::media::types::RawMedia;

/// Turns a canonical Instagram URL into raw media descriptors.
///
/// Workers futures are not `Send`, so neither is this trait's.
#[async_trait(?Send)]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, canonical_url: &str) -> Result<Vec<RawMedia>, FetchError>;
}
