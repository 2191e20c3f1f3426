pub mod catalog;
pub mod error;
pub mod fetch;
pub mod live;
pub mod manifest;
pub mod scheduler;
pub mod worker_pool;

pub use catalog::{DatasetConfig, DatasetIndex, DatasetSummary, RenderConfig};
pub use error::{StreamError, StreamResult};
pub use fetch::{Fetch, FetchResponse, HttpFetch};
pub use live::{BackendStatus, StatusPoller};
pub use manifest::TileManifest;
pub use scheduler::{
    Completion, Dispatch, Lane, RequestOutcome, SchedulerConfig, TilePlacement, TileScheduler,
    UrlScheme, ViewState,
};
pub use worker_pool::{TileImage, WorkResult, WorkerPool};
