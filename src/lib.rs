//! # Restline - a REST client with token handling and pluggable policies
//!
//! Restline wraps a pooled HTTP transport with the plumbing every service
//! client ends up rewriting: bearer tokens fetched and cached once for all
//! concurrent calls, retry policies that understand transient failures,
//! swappable body serializers, and errors that keep the raw response around.
//!
//! ## Quick Start
//!
//! ```no_run
//! use restline::{Client, DefaultRetry};
//! use restline::token::ClientCredentialsProvider;
//! use serde::{Deserialize, Serialize};
//! use std::sync::Arc;
//!
//! #[derive(Serialize)]
//! struct CreateEntity {
//!     value: String,
//! }
//!
//! #[derive(Deserialize)]
//! struct Entity {
//!     id: u64,
//!     value: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), restline::Error> {
//!     let tokens = ClientCredentialsProvider::builder()
//!         .token_endpoint("https://login.example.com/oauth2/token")
//!         .client_id("entity-service")
//!         .client_secret("s3cret")
//!         .scopes("entities")
//!         .build()?;
//!
//!     let client = Client::builder()
//!         .base_url("https://api.example.com")?
//!         .retry_policy(Arc::new(DefaultRetry::new(3)))
//!         .token_provider(Arc::new(tokens))
//!         .build()?;
//!
//!     // A 404 yields `result: None` rather than an error
//!     let entity = client.get::<Entity>("entities/1").await?;
//!     if let Some(entity) = &entity.result {
//!         println!("{}: {}", entity.id, entity.value);
//!     }
//!     println!("Request took {:?}", entity.latency);
//!
//!     let created = client
//!         .post::<_, Entity>("entities", &CreateEntity { value: "1".to_string() })
//!         .await?;
//!     println!("Created after {} attempt(s)", created.attempts);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Single-flight token cache** - one token request per provider, no matter how many calls are waiting
//! - **Token providers** - client credentials, resource owner password, static and pass-through tokens
//! - **Retry policies** - no retries by default, or bounded retries with exponential or linear backoff and `Retry-After` support
//! - **Serializers** - JSON, gzip-compressed JSON and form bodies, case-insensitive response decoding
//! - **Rich errors** - non-success and undecodable responses carry the raw status, headers and body
//! - **Logging** - structured `tracing` events, plus optional full request/response logging
//! - **Configuration** - a fluent builder, or a JSON [`config::ClientConfig`]
//!
//! ## Error Handling
//!
//! ```no_run
//! use restline::{Client, Error};
//!
//! # async fn example() -> Result<(), Error> {
//! # let client = Client::builder().base_url("https://api.example.com")?.build()?;
//! match client.get::<serde_json::Value>("endpoint").await {
//!     Ok(response) => println!("Success: {:?}", response.result),
//!     Err(Error::Request { response, source: Some(cause) }) => {
//!         eprintln!("Undecodable body (status {}): {}", response.status, cause);
//!         eprintln!("  Raw response: {}", response.text());
//!     }
//!     Err(Error::Request { response, source: None }) => {
//!         eprintln!("HTTP error {}: {}", response.status, response.text());
//!     }
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! # Ok(())
//! # }
//! ```

mod client;
pub mod config;
mod error;
mod logging;
pub mod metadata;
pub mod rate_limit;
mod response;
pub mod retry;
pub mod serializer;
pub mod token;
mod transport;

pub use client::{Client, ClientBuilder, ClientOptions, NotFoundPolicy};
pub use error::{BoxError, Error, Result};
pub use response::{ClientResponse, RawResponse};
pub use retry::{DefaultRetry, NoRetry, RetryPolicy};
pub use transport::{ReqwestTransport, Transport};
