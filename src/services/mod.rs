pub mod config_loader;
pub mod device;
pub mod eligibility;
pub mod event_window;
pub mod geocode;
pub mod geolocation;
pub mod local_store;
pub mod pipeline;
pub mod remote;
pub mod submission_flow;
pub mod token;
