use recordkeep_auth::AuthContext;

/// Caller identity for a request, if a valid bearer token was presented.
///
/// Always present as a request extension on function routes; callables decide
/// whether an anonymous caller is acceptable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallerContext {
    auth: Option<AuthContext>,
}

impl CallerContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(auth: AuthContext) -> Self {
        Self { auth: Some(auth) }
    }

    pub fn into_auth(self) -> Option<AuthContext> {
        self.auth
    }
}
