pub mod estimator;
pub mod manifest;
pub mod presence_monitor;
pub mod resolver;
pub mod versioning;
