//! # Snippetbox Test
//!
//! In-memory HTTP testing for Snippetbox: requests go through the real
//! route table and every middleware stage, without binding a port.
//!
//! ```ignore
//! use http::StatusCode;
//! use snippetbox_test::TestClient;
//!
//! #[tokio::test]
//! async fn create_requires_login() {
//!     let client = TestClient::with_ui().unwrap();
//!     let response = client.get("/snippet/create").send().await.unwrap();
//!     response.assert_redirect("/user/login");
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/snippetbox-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod error;
mod response;

pub use client::{extract_csrf_token, ui_config, TestClient, TestClientRequest};
pub use error::TestError;
pub use response::TestResponse;
