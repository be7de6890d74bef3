//! Core library for the `zipweather` CLI.
//!
//! This crate defines:
//! - ZIP code validation and the shared error taxonomy
//! - `WeatherClient`: current conditions with a TTL cache and request throttle
//! - `LocationStore`: saved locations in a JSON file
//! - On-disk configuration
//!
//! It is used by `zipweather-cli`, but can also be reused by other front ends.

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod storage;
pub mod throttle;
pub mod transport;
pub mod zip;

pub use client::{ClientConfig, WeatherClient};
pub use config::Config;
pub use error::{ErrorKind, Result, WeatherError};
pub use model::{StoredLocation, WeatherReading};
pub use storage::LocationStore;
pub use transport::{HttpTransport, RawResponse, Transport};
pub use zip::{ZipCode, is_valid_zip_code};
