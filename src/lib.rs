// Library for tests to access modules

pub mod config;
pub mod driver;
pub mod error;
pub mod evaluator;
pub mod models;
pub mod registry;
pub mod routes;
pub mod sampler;
