//! Signed cookie sessions for Snippetbox.
//!
//! Session state lives entirely in the client's cookie. The server only
//! holds the signing secret, which is read-only after startup, so the
//! manager can be shared across all requests without locking.
//!
//! A request's lifecycle looks like this:
//!
//! 1. [`SessionManager::load`] decodes the incoming cookie into a
//!    [`Session`]. Tampered, malformed or expired cookies decode to an empty
//!    session; they are never an error for the client.
//! 2. Handlers read and write the session.
//! 3. [`SessionManager::save`] produces a [`SetCookie`] only if the session
//!    was modified or destroyed.
//!
//! ```
//! use http::HeaderMap;
//! use snippetbox_session::{SessionConfig, SessionManager};
//!
//! let manager = SessionManager::new(SessionConfig::new("s6Ndh+pPbnzHbS*+9Pk8qGWhTzbpa@ge")).unwrap();
//!
//! let mut session = manager.load(&HeaderMap::new());
//! session.put("flash", "Snippet successfully created!");
//! let cookie = manager.save(&mut session).unwrap().unwrap();
//!
//! let mut headers = HeaderMap::new();
//! headers.insert(http::header::COOKIE, format!("session={}", cookie.value()).parse().unwrap());
//! let mut next = manager.load(&headers);
//! assert_eq!(next.pop_string("flash").as_deref(), Some("Snippet successfully created!"));
//! ```

mod codec;
mod cookie;
mod error;
mod manager;
mod session;

pub use codec::{Payload, SessionCodec};
pub use cookie::{Cookies, SameSite, SetCookie};
pub use error::SessionError;
pub use manager::{SessionConfig, SessionManager};
pub use session::{Session, Status};
