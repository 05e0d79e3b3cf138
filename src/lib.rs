//! Configure an API once, fire GET/POST/PUT/DELETE requests at it, and get
//! back a normalized record of what was sent and what came back.
//!
//! ```no_run
//! use apiharness::config::ApiConfig;
//! use apiharness::executor::{Query, RequestExecutor};
//!
//! # async fn run() -> apiharness::error::Result<()> {
//! let api = RequestExecutor::new(ApiConfig::new("https://api.tvmaze.com").with_auth("bearer", "token"));
//! let query = Query::from([("q", "The Expanse")]);
//! let test = api.get("search/shows", Some(&query)).await?;
//! assert_eq!(test.response.status, 200);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod env;
pub mod error;
pub mod executor;
pub mod report;
