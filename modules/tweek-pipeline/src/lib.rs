pub mod annotations;
pub mod classifier;
pub mod filter;
pub mod intercept;
pub mod media;
mod shape;
pub mod store;
pub mod walker;

pub use annotations::Annotations;
pub use classifier::{classify, should_drop, DropReason};
pub use filter::{TimelineFilter, FILTER_DEPTH_LIMIT};
pub use intercept::{
    EndpointClass, FetchRequest, FetchResponse, FetchTransport, InterceptedExchange,
    InterceptingFetch, Interceptor, PageContext, PendingRequest, RawExchange,
};
pub use media::normalize_asset_url;
pub use shape::source_text;
pub use store::{EntryCacheStore, StoreStats};
pub use walker::{PayloadWalker, WalkReport, EXTRACTION_DEPTH_LIMIT};
