//! Pipeline stages.
//!
//! Standard chain (wraps the whole router, outermost first):
//!
//! | Stage | Middleware | Purpose |
//! |-------|-----------|---------|
//! | 1 | [`Recover`] | Turn panics into a 500 and close the connection |
//! | 2 | [`LogRequest`] | One access log event per request |
//! | 3 | [`SecureHeaders`] | Frame denial, CSP and XSS protection headers |
//!
//! Dynamic chain (per matched route):
//!
//! | Stage | Middleware | Purpose |
//! |-------|-----------|---------|
//! | 1 | [`LoadSession`] | Decode the session cookie, re-issue it if changed |
//! | 2 | [`CsrfGuard`] | Issue CSRF tokens, reject unsafe requests without one |
//! | 3 | [`Authenticate`] | Attach the authentication fact |
//! | 4 | [`RequireAuthentication`] | Protected routes only: redirect to login |

mod authenticate;
mod csrf;
mod log_request;
mod recover;
mod require_authentication;
mod secure_headers;
mod session;

pub use authenticate::{Authenticate, AUTHENTICATED_USER_ID};
pub use csrf::{CsrfGuard, CSRF_COOKIE_NAME, CSRF_FIELD_NAME, CSRF_HEADER_NAME};
pub use log_request::LogRequest;
pub use recover::Recover;
pub use require_authentication::RequireAuthentication;
pub use secure_headers::SecureHeaders;
pub use session::LoadSession;
