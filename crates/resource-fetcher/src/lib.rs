//! Host-side retrieval of the resources a capture references. Binary payloads never cross the
//! page boundary; they are fetched again here and stored base64-encoded.

pub mod errors;
pub mod fetcher;
pub mod resources;

pub use errors::FetchError;
pub use fetcher::{FetchRequest, FetchedResource, HttpFetcher, ResourceFetcher};
pub use resources::{
    fill_page_resources, fill_page_resources_with_limit, should_fetch, FillReport, PageResources,
    ResourceEntry, FRAMES_KIND,
};
