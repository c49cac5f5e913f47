use std::any::Any;
use std::error::Error;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use bytes::Bytes;
use http::header::{ACCEPT, USER_AGENT};
use http::{Method, Request, Response};
use http_body::Body;
use http_body_util::{BodyExt, Empty};
use realtime::{Geocoder, HttpRequest};
use serde::Deserialize;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Outbound HTTP for the pull feed and reverse geocoding.
#[derive(Debug, Clone)]
pub struct Provider {
    client: reqwest::Client,
    geocoder_url: Option<String>,
}

impl Provider {
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be initialised.
    pub fn new(geocoder_url: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building http client")?;
        Ok(Self { client, geocoder_url })
    }
}

impl HttpRequest for Provider {
    async fn fetch<T>(&self, request: Request<T>) -> Result<Response<Bytes>>
    where
        T: Body + Any + Send,
        T::Data: Into<Vec<u8>> + Send,
        T::Error: Into<Box<dyn Error + Send + Sync + 'static>>,
    {
        let (parts, body) = request.into_parts();
        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(err) => {
                let err: Box<dyn Error + Send + Sync> = err.into();
                return Err(anyhow!(err).context("reading request body"));
            }
        };

        let response = self
            .client
            .request(parts.method, parts.uri.to_string())
            .headers(parts.headers)
            .body(body)
            .send()
            .await
            .with_context(|| format!("sending request to {}", parts.uri))?;

        let mut builder = Response::builder().status(response.status());
        if let Some(headers) = builder.headers_mut() {
            headers.extend(response.headers().clone());
        }
        let bytes = response.bytes().await.context("reading response body")?;

        tracing::debug!(uri = %parts.uri, bytes = bytes.len(), "fetched");
        builder.body(bytes).context("building response")
    }
}

#[derive(Deserialize)]
struct Place {
    display_name: Option<String>,
}

impl Geocoder for Provider {
    async fn reverse(&self, lat: f64, lng: f64) -> Result<String> {
        let Some(base) = &self.geocoder_url else {
            bail!("no geocoder configured");
        };

        let request = Request::builder()
            .method(Method::GET)
            .uri(format!("{base}/reverse?format=jsonv2&lat={lat}&lon={lng}"))
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, env!("CARGO_PKG_NAME"))
            .body(Empty::<Bytes>::new())
            .context("building geocoder request")?;

        let response = self.fetch(request).await?;
        if !response.status().is_success() {
            bail!("geocoder returned {}", response.status());
        }

        let place: Place =
            serde_json::from_slice(response.body()).context("deserializing geocoder response")?;
        place.display_name.filter(|name| !name.is_empty()).ok_or_else(|| anyhow!("no address at {lat}, {lng}"))
    }
}
