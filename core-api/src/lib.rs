//! # API Client Module
//!
//! Authenticated access to the Opsdesk backend.
//!
//! ## Overview
//!
//! Every backend call made by the admin client goes through [`ApiClient`].
//! A call is described by an [`ApiRequest`], sent by the [`RequestExecutor`]
//! and wrapped by the [`RetryPolicy`], which answers an expired access
//! credential with one shared renewal and one retry.
//!
//! ## Error model
//!
//! Failures are [`ApiError`] values whose `Display` is the message to show
//! the user. [`ApiError::kind`] groups them into [`ErrorKind`]s.
//!
//! ## Usage
//!
//! ```ignore
//! use core_api::{ApiClient, ApiRequest};
//!
//! let orders: Vec<Order> = client.get("/orders").await?;
//! let saved: Order = client.post("/orders", &new_order).await?;
//!
//! let request = ApiRequest::get("/reports/monthly").timeout(Duration::from_secs(120));
//! let report: Report = client.call(request).await?;
//! ```

pub mod client;
pub mod error;
pub mod executor;
pub mod request;
pub mod retry;

pub use client::ApiClient;
pub use error::{ApiError, ErrorKind, Result};
pub use executor::RequestExecutor;
pub use request::{ApiRequest, RequestBody};
pub use retry::{Attempt, RetryPolicy};
