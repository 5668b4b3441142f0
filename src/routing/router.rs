//! Route lookup.
//!
//! # Responsibilities
//! - Store compiled routes
//! - Look up the route whose mount covers a request path
//! - Return the matched route or an explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Longest mount wins, so nested mounts behave predictably
//! - O(n) mount scan (acceptable for typical route counts)

use crate::routing::matcher::MountMatcher;

/// A successful lookup.
#[derive(Debug)]
pub struct RouteMatch<'r, 'p, T> {
    pub route: &'r T,
    /// Part of the path the gateway is mounted under.
    pub path_base: &'p str,
    /// Part of the path below the mount.
    pub remainder: &'p str,
}

/// Mount table mapping request paths to routes.
#[derive(Debug)]
pub struct Router<T> {
    routes: Vec<(MountMatcher, T)>,
}

impl<T> Router<T> {
    pub fn new(routes: impl IntoIterator<Item = (MountMatcher, T)>) -> Self {
        let mut routes: Vec<_> = routes.into_iter().collect();
        routes.sort_by(|(a, _), (b, _)| b.mount().len().cmp(&a.mount().len()));
        Self { routes }
    }

    /// Find the route for `path`.
    pub fn match_path<'r, 'p>(&'r self, path: &'p str) -> Option<RouteMatch<'r, 'p, T>> {
        self.routes.iter().find_map(|(matcher, route)| {
            matcher.split(path).map(|(path_base, remainder)| RouteMatch {
                route,
                path_base,
                remainder,
            })
        })
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longest_mount_wins() {
        let router = Router::new([
            (MountMatcher::new("/"), "root"),
            (MountMatcher::new("/api"), "api"),
            (MountMatcher::new("/api/orders"), "orders"),
        ]);

        let matched = router.match_path("/api/orders/5").unwrap();
        assert_eq!(*matched.route, "orders");
        assert_eq!(matched.path_base, "/api/orders");
        assert_eq!(matched.remainder, "/5");

        assert_eq!(*router.match_path("/api/users").unwrap().route, "api");
        assert_eq!(*router.match_path("/health").unwrap().route, "root");
    }

    #[test]
    fn test_no_match() {
        let router = Router::new([(MountMatcher::new("/api"), 1)]);
        assert!(router.match_path("/other").is_none());
        assert!(router.match_path("/apix").is_none());
    }
}
