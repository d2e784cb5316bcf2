use crate::auth::Role;
use crate::db::SessionUser;

/// Client-held login state. Nothing is revoked server-side on logout.
#[derive(Debug, Clone, Default)]
pub struct Session {
    token: Option<String>,
    user: Option<SessionUser>,
}

impl Session {
    pub fn new(token: String, user: SessionUser) -> Self {
        Self {
            token: Some(token),
            user: Some(user),
        }
    }

    /// A session restored from a stored token whose user is not yet known
    pub fn from_token(token: String) -> Self {
        Self {
            token: Some(token),
            user: None,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn user(&self) -> Option<&SessionUser> {
        self.user.as_ref()
    }

    pub fn set_user(&mut self, user: SessionUser) {
        self.user = Some(user);
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn is_admin(&self) -> bool {
        matches!(self.user, Some(SessionUser { role: Role::Admin, .. }))
    }

    pub fn logout(&mut self) {
        self.token = None;
        self.user = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> SessionUser {
        SessionUser {
            id: 1,
            email: "admin@example.com".to_string(),
            role,
        }
    }

    #[test]
    fn test_admin_session() {
        let mut session = Session::new("tok".to_string(), user(Role::Admin));
        assert!(session.is_authenticated());
        assert!(session.is_admin());

        session.logout();
        assert!(!session.is_authenticated());
        assert!(!session.is_admin());
        assert!(session.user().is_none());
    }

    #[test]
    fn test_restored_token_is_not_admin_until_user_known() {
        let mut session = Session::from_token("tok".to_string());
        assert!(session.is_authenticated());
        assert!(!session.is_admin());

        session.set_user(user(Role::User));
        assert!(!session.is_admin());
    }
}
