//! The authorization gate.
//!
//! Every route declares an [`AccessPolicy`] and hands it, together with the
//! request's [`Session`] (if any), to the gate before doing anything else.
//! The gate is the single place deciding between allowing the request,
//! redirecting an anonymous user to login, and refusing a role mismatch.

use crate::error::Error;
use crate::model::api::auth::Session;

/// The declared access requirement of a route.
///
/// `roles` is a comma-separated list of role names; entries are trimmed and
/// empty entries ignored, so `"Admin, Manager"` and `"Admin,,Manager "` are
/// equivalent. An empty list means any logged-in user may pass.
#[derive(Debug, Clone, Copy)]
pub struct AccessPolicy {
    pub allow_anonymous: bool,
    pub roles: &'static str,
}

impl AccessPolicy {
    /// No restrictions at all.
    pub const fn anonymous() -> Self {
        Self {
            allow_anonymous: true,
            roles: "",
        }
    }

    /// Any logged-in user.
    pub const fn logged_in() -> Self {
        Self {
            allow_anonymous: false,
            roles: "",
        }
    }

    /// Logged-in users holding one of the listed roles.
    pub const fn roles(roles: &'static str) -> Self {
        Self {
            allow_anonymous: false,
            roles,
        }
    }

    fn role_entries(&self) -> impl Iterator<Item = &'static str> {
        self.roles
            .split(',')
            .map(str::trim)
            .filter(|role| !role.is_empty())
    }

    fn allows_role(&self, role: &str) -> bool {
        self.role_entries().any(|allowed| allowed == role)
    }

    fn is_role_restricted(&self) -> bool {
        self.role_entries().next().is_some()
    }

    /// Decide what to do with a request under this policy.
    ///
    /// `at_login` marks requests already targeting the login entry point,
    /// which must never be answered with another redirect to login.
    pub fn decide(&self, session: Option<&Session>, at_login: bool) -> Decision {
        if self.allow_anonymous {
            return Decision::Allow;
        }

        let session = match session {
            Some(session) => session,
            None if at_login => return Decision::Allow,
            None => return Decision::RedirectToLogin,
        };

        if self.is_role_restricted() && !self.allows_role(session.role.as_str()) {
            return Decision::Forbidden;
        }

        Decision::Allow
    }
}

/// The gate's verdict on a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    RedirectToLogin,
    Forbidden,
}

/// Gate a route that does not need the caller's identity.
pub fn check(policy: &AccessPolicy, session: Option<&Session>) -> Result<(), Error> {
    to_result(policy.decide(session, false))
}

/// Gate the login entry point itself. Distinct from [`check`] so an
/// unauthenticated request here is never answered with another redirect
/// to login.
pub fn check_at_login(policy: &AccessPolicy, session: Option<&Session>) -> Result<(), Error> {
    to_result(policy.decide(session, true))
}

fn to_result(decision: Decision) -> Result<(), Error> {
    match decision {
        Decision::Allow => Ok(()),
        Decision::RedirectToLogin => Err(Error::LoginRedirect),
        Decision::Forbidden => Err(Error::forbidden("Insufficient role for this action")),
    }
}

/// Gate a route that needs the caller's identity; returns the session on
/// success. Only meaningful for policies that require login.
pub fn require(policy: &AccessPolicy, session: Option<Session>) -> Result<Session, Error> {
    match policy.decide(session.as_ref(), false) {
        Decision::Allow => session.ok_or(Error::LoginRedirect),
        Decision::RedirectToLogin => Err(Error::LoginRedirect),
        Decision::Forbidden => Err(Error::forbidden("Insufficient role for this action")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::db::Role;

    #[test]
    fn anonymous_action_reachable_without_session() {
        let policy = AccessPolicy::anonymous();
        assert_eq!(policy.decide(None, false), Decision::Allow);
    }

    #[test]
    fn login_required_redirects_without_session() {
        let policy = AccessPolicy::logged_in();
        assert_eq!(policy.decide(None, false), Decision::RedirectToLogin);
    }

    #[test]
    fn no_redirect_loop_at_login_entry_point() {
        // Even a (misconfigured) login-required login route must not bounce
        // an anonymous request back to itself.
        let policy = AccessPolicy::logged_in();
        assert_eq!(policy.decide(None, true), Decision::Allow);
    }

    #[test]
    fn login_required_passes_any_role_once_logged_in() {
        let policy = AccessPolicy::logged_in();
        for role in [Role::Admin, Role::Manager, Role::Common] {
            let session = Session::example_with_role(role);
            assert_eq!(policy.decide(Some(&session), false), Decision::Allow);
        }
    }

    #[test]
    fn role_restriction_denies_absent_role() {
        let policy = AccessPolicy::roles("Admin, Manager");
        let session = Session::example_with_role(Role::Common);
        assert_eq!(policy.decide(Some(&session), false), Decision::Forbidden);
    }

    #[test]
    fn role_restriction_admits_listed_roles() {
        let policy = AccessPolicy::roles("Admin, Manager");
        for role in [Role::Admin, Role::Manager] {
            let session = Session::example_with_role(role);
            assert_eq!(policy.decide(Some(&session), false), Decision::Allow);
        }
    }

    #[test]
    fn role_list_ignores_whitespace_and_empty_entries() {
        let policy = AccessPolicy::roles(" ,Admin , ,, Manager ,");
        assert!(policy.allows_role("Admin"));
        assert!(policy.allows_role("Manager"));
        assert!(!policy.allows_role("Common"));
        assert!(!policy.allows_role(""));
    }

    #[test]
    fn role_match_is_exact() {
        let policy = AccessPolicy::roles("Admin");
        assert!(!policy.allows_role("admin"));
        assert!(!policy.allows_role("Administrator"));
    }

    #[test]
    fn role_restricted_still_redirects_without_session() {
        let policy = AccessPolicy::roles("Admin");
        assert_eq!(policy.decide(None, false), Decision::RedirectToLogin);
    }

    #[test]
    fn check_at_login_never_redirects() {
        assert!(check_at_login(&AccessPolicy::anonymous(), None).is_ok());
        assert!(check_at_login(&AccessPolicy::logged_in(), None).is_ok());
    }

    #[test]
    fn require_returns_the_session() {
        let session = Session::example();
        let granted = require(&AccessPolicy::logged_in(), Some(session.clone())).unwrap();
        assert_eq!(granted, session);
    }

    #[test]
    fn require_refuses_missing_session() {
        assert!(matches!(
            require(&AccessPolicy::logged_in(), None),
            Err(Error::LoginRedirect)
        ));
    }
}
