pub mod dispatch;
pub mod error;
pub mod locate;
pub mod naming;
pub mod plan;

pub use dispatch::{
    deliver, AssetOpener, Delivery, DispatchAck, DownloadDispatcher, DownloadEnvelope,
    HttpDispatcher, RecordingDispatcher, RecordingOpener,
};
pub use error::{DispatchError, Result};
pub use locate::{
    status_id, ContentLocator, InteractionTracker, Located, LocatedBy, RenderedArticle,
    RenderedPage,
};
pub use naming::{suggested_base_name, suggested_filenames, DOWNLOAD_FOLDER};
pub use plan::{DownloadPlan, DownloadPlanner, NOT_CAPTURED_MESSAGE};
