pub mod config;
pub mod control;
pub mod input;
pub mod logging;
pub mod probe;
pub mod report;
pub mod scheduler;
pub mod url_model;
