//! Authentication fact.

use std::sync::Arc;

use snippetbox_core::{ModelError, UserStore};

use crate::context::RequestContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Request, Response, ResponseExt};

/// Session key holding the id of the logged-in user.
pub const AUTHENTICATED_USER_ID: &str = "authenticatedUserID";

/// Marks the request authenticated when the session names an active user.
///
/// A session pointing at a missing or deactivated user is cleaned up and the
/// request continues anonymously. Only a storage failure ends the request,
/// with a logged 500. This is the only stage that sets the fact, so a
/// handler can trust [`RequestContext::is_authenticated`].
#[derive(Clone)]
pub struct Authenticate {
    users: Arc<dyn UserStore>,
}

impl Authenticate {
    /// Creates the stage around the user store.
    #[must_use]
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }
}

impl std::fmt::Debug for Authenticate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticate").finish_non_exhaustive()
    }
}

impl Middleware for Authenticate {
    fn name(&self) -> &'static str {
        "authenticate"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let Some(id) = ctx
                .session()
                .and_then(|session| session.get_int(AUTHENTICATED_USER_ID))
            else {
                return next.run(ctx, request).await;
            };

            match self.users.get(id).await {
                Ok(user) if user.active => ctx.mark_authenticated(),
                Ok(_) | Err(ModelError::NoRecord) => {
                    tracing::debug!(request_id = %ctx.request_id(), user_id = id, "dropping stale login");
                    if let Some(session) = ctx.session_mut() {
                        session.remove(AUTHENTICATED_USER_ID);
                    }
                }
                Err(err) => {
                    tracing::error!(request_id = %ctx.request_id(), user_id = id, error = %err, "failed to load user");
                    return Response::server_error();
                }
            }

            next.run(ctx, request).await
        })
    }
}
