pub mod aggregate;
pub mod composer;
pub mod config;
pub mod corpus;
pub mod detectors;
pub mod insight;
pub mod model;
pub mod names;
pub mod ranking;
pub mod synthetic;
pub mod templates;
