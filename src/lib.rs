pub mod analytics_api;
pub mod config;
pub mod demo_feed;
pub mod driver;
pub mod error;
pub mod http_client;
pub mod model;
pub mod persist;
pub mod report_export;
pub mod session;
pub mod state;
pub mod video;
pub mod view;
