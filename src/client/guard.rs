//! Admin console route table and navigation guard
//!
//! The guard only checks whether a token is stored; it never validates it.

use super::session::TokenStore;

pub const LOGIN_PATH: &str = "/login";

/// Where an authenticated user lands when visiting the login page
pub const DEFAULT_AUTHENTICATED_PATH: &str = "/admin/articles";

/// Admin console views
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Login,
    Layout,
    UserList,
    UserDetail,
    ColumnList,
    ArticleList,
    ArticleEdit,
    BackendUserList,
    RoleList,
    MenuList,
    ChangePassword,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteTarget {
    View(View),
    Redirect(&'static str),
}

/// A top-level route; children inherit `requires_auth`
#[derive(Debug)]
pub struct Route {
    pub path: &'static str,
    pub target: RouteTarget,
    pub requires_auth: bool,
    pub children: &'static [(&'static str, View)],
}

pub static ROUTES: &[Route] = &[
    Route {
        path: "/",
        target: RouteTarget::Redirect(LOGIN_PATH),
        requires_auth: false,
        children: &[],
    },
    Route {
        path: LOGIN_PATH,
        target: RouteTarget::View(View::Login),
        requires_auth: false,
        children: &[],
    },
    Route {
        path: "/admin",
        target: RouteTarget::View(View::Layout),
        requires_auth: true,
        children: &[
            ("users", View::UserList),
            ("users/:id", View::UserDetail),
            ("columns", View::ColumnList),
            ("articles", View::ArticleList),
            ("articles/create", View::ArticleEdit),
            ("articles/edit/:id", View::ArticleEdit),
            ("backend-users", View::BackendUserList),
            ("roles", View::RoleList),
            ("menus", View::MenuList),
            ("change-password", View::ChangePassword),
        ],
    },
];

/// A path matched against [`ROUTES`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRoute {
    pub target: RouteTarget,
    pub requires_auth: bool,
}

/// Outcome of the pre-navigation check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Proceed,
    RedirectToLogin,
    RedirectToDefault,
}

impl GuardDecision {
    /// Redirect location, if any
    pub fn location(&self) -> Option<&'static str> {
        match self {
            GuardDecision::Proceed => None,
            GuardDecision::RedirectToLogin => Some(LOGIN_PATH),
            GuardDecision::RedirectToDefault => Some(DEFAULT_AUTHENTICATED_PATH),
        }
    }
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn pattern_matches(pattern: &str, path: &[&str]) -> bool {
    let pattern = segments(pattern);
    pattern.len() == path.len()
        && pattern
            .iter()
            .zip(path)
            .all(|(p, s)| p.starts_with(':') || p == s)
}

/// Strip query string and fragment
fn clean_path(path: &str) -> &str {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    &path[..end]
}

/// Look up a path; unknown paths resolve to `None`
pub fn resolve(path: &str) -> Option<ResolvedRoute> {
    let path = segments(clean_path(path));

    for route in ROUTES {
        if pattern_matches(route.path, &path) {
            return Some(ResolvedRoute {
                target: route.target,
                requires_auth: route.requires_auth,
            });
        }

        let parent = segments(route.path);
        if path.len() > parent.len() && path[..parent.len()] == parent[..] {
            let rest = &path[parent.len()..];
            if let Some((_, view)) = route
                .children
                .iter()
                .find(|(child, _)| pattern_matches(child, rest))
            {
                return Some(ResolvedRoute {
                    target: RouteTarget::View(*view),
                    requires_auth: route.requires_auth,
                });
            }
        }
    }
    None
}

/// The decision table over (requires auth, token present, target is login)
pub fn decide(requires_auth: bool, has_token: bool, is_login: bool) -> GuardDecision {
    if is_login && has_token {
        GuardDecision::RedirectToDefault
    } else if requires_auth && !has_token {
        GuardDecision::RedirectToLogin
    } else {
        GuardDecision::Proceed
    }
}

/// Guard reading the token from storage at decision time
pub struct RouteGuard<'a> {
    store: &'a dyn TokenStore,
}

impl<'a> RouteGuard<'a> {
    pub fn new(store: &'a dyn TokenStore) -> Self {
        Self { store }
    }

    pub fn check(&self, target: &str) -> GuardDecision {
        let has_token = match self.store.load() {
            Ok(token) => token.is_some(),
            Err(e) => {
                tracing::warn!(error = %e, "Token unreadable, treating as logged out");
                false
            }
        };
        let route = resolve(target);
        let requires_auth = route.is_some_and(|r| r.requires_auth);
        let is_login = route.is_some_and(|r| r.target == RouteTarget::View(View::Login));

        let decision = decide(requires_auth, has_token, is_login);
        tracing::debug!(path = target, ?decision, "Route guard");
        decision
    }

    /// Follow guard redirects and route redirects to the path that renders
    pub fn destination(&self, target: &str) -> String {
        let mut current = target.to_string();
        // Redirects in the table chain at most twice
        for _ in 0..4 {
            if let Some(location) = self.check(&current).location() {
                current = location.to_string();
                continue;
            }
            match resolve(&current) {
                Some(ResolvedRoute {
                    target: RouteTarget::Redirect(location),
                    ..
                }) => current = location.to_string(),
                _ => break,
            }
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::session::MemoryTokenStore;

    #[test]
    fn test_decision_table() {
        use GuardDecision::*;
        let cases = [
            // (requires_auth, has_token, is_login) -> decision
            ((false, false, false), Proceed),
            ((false, false, true), Proceed),
            ((false, true, false), Proceed),
            ((false, true, true), RedirectToDefault),
            ((true, false, false), RedirectToLogin),
            ((true, false, true), RedirectToLogin),
            ((true, true, false), Proceed),
            ((true, true, true), RedirectToDefault),
        ];
        for ((auth, token, login), expected) in cases {
            assert_eq!(decide(auth, token, login), expected, "case {:?}", (auth, token, login));
        }
    }

    #[test]
    fn test_resolve_routes() {
        assert_eq!(
            resolve("/").map(|r| r.target),
            Some(RouteTarget::Redirect(LOGIN_PATH))
        );
        assert_eq!(
            resolve("/login"),
            Some(ResolvedRoute {
                target: RouteTarget::View(View::Login),
                requires_auth: false
            })
        );

        let detail = resolve("/admin/users/17").unwrap();
        assert_eq!(detail.target, RouteTarget::View(View::UserDetail));
        assert!(detail.requires_auth);

        assert_eq!(
            resolve("/admin/articles/edit/3?tab=1").map(|r| r.target),
            Some(RouteTarget::View(View::ArticleEdit))
        );
        assert_eq!(
            resolve("/admin/articles/create").map(|r| r.target),
            Some(RouteTarget::View(View::ArticleEdit))
        );
        assert!(resolve("/admin").unwrap().requires_auth);
        assert_eq!(resolve("/nowhere"), None);
        assert_eq!(resolve("/admin/nowhere"), None);
    }

    #[test]
    fn test_guard_reads_store() {
        let store = MemoryTokenStore::new();
        let guard = RouteGuard::new(&store);

        assert_eq!(guard.check("/admin/columns"), GuardDecision::RedirectToLogin);
        assert_eq!(guard.check("/login"), GuardDecision::Proceed);
        assert_eq!(guard.check("/nowhere"), GuardDecision::Proceed);

        store.save("t").unwrap();
        assert_eq!(guard.check("/admin/columns"), GuardDecision::Proceed);
        assert_eq!(guard.check("/login"), GuardDecision::RedirectToDefault);
    }

    #[test]
    fn test_login_spellings_share_one_decision() {
        let store = MemoryTokenStore::with_token("t");
        let guard = RouteGuard::new(&store);

        for path in ["//login", "/login/", "/login?redirect=%2Fadmin", "login#top"] {
            assert_eq!(guard.check(path), GuardDecision::RedirectToDefault, "{path}");
        }
        assert_eq!(guard.destination("//login"), DEFAULT_AUTHENTICATED_PATH);
    }

    #[test]
    fn test_destination_follows_redirects() {
        let store = MemoryTokenStore::new();
        let guard = RouteGuard::new(&store);
        assert_eq!(guard.destination("/"), LOGIN_PATH);
        assert_eq!(guard.destination("/admin/menus"), LOGIN_PATH);

        store.save("t").unwrap();
        assert_eq!(guard.destination("/"), DEFAULT_AUTHENTICATED_PATH);
        assert_eq!(guard.destination("/admin/menus"), "/admin/menus");
    }
}
