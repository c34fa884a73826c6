pub mod controller;
pub mod environment;

pub use controller::{MAX_PAGE_SIZE, V2FeedController, V2FeedPackage};
pub use environment::{
    FeedEnvironment, FixedEnvironment, RequestContext, RequestEnvironment, site_root_for,
};
