//! # Provider
//!
//! Provider defines external data interfaces for the crate.

use std::any::Any;
use std::error::Error;

use anyhow::Result;
use bytes::Bytes;
use http::{Request, Response};
use http_body::Body;

use crate::location::LocationSample;

/// The `HttpRequest` trait defines the behavior for fetching data from a source.
pub trait HttpRequest: Send + Sync {
    /// Make outbound HTTP request.
    fn fetch<T>(&self, request: Request<T>) -> impl Future<Output = Result<Response<Bytes>>> + Send
    where
        T: Body + Any + Send,
        T::Data: Into<Vec<u8>> + Send,
        T::Error: Into<Box<dyn Error + Send + Sync + 'static>>;
}

/// The `Geocoder` trait resolves a coordinate to a human readable address.
pub trait Geocoder: Send + Sync {
    /// Look up the address nearest to the coordinate. Lookups are allowed to
    /// fail; callers fall back to a formatted coordinate.
    fn reverse(&self, lat: f64, lng: f64) -> impl Future<Output = Result<String>> + Send;
}

/// The `PositionSource` trait yields fixes from the local device.
pub trait PositionSource: Send + Sync {
    /// Wait for the next fix. An error means the source is unavailable or
    /// access was denied, and no further fixes will be produced.
    fn next_fix(&self) -> impl Future<Output = crate::Result<LocationSample>> + Send;
}
