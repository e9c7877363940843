/// HTTP methods the edge runtime can deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Delete,
    Get,
    Head,
    Options,
    Post,
    Put,
}

impl Method {
    pub const ALL: [Method; 6] = [
        Method::Delete,
        Method::Get,
        Method::Head,
        Method::Options,
        Method::Post,
        Method::Put,
    ];

    /// Parses the method name as the edge runtime spells it. Anything
    /// outside the closed set never matches a route.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "DELETE" => Some(Self::Delete),
            "GET" => Some(Self::Get),
            "HEAD" => Some(Self::Head),
            "OPTIONS" => Some(Self::Options),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            _ => None,
        }
    }
}

/// The closed set of webhook entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    Health,
    Install,
    OAuth,
    Callback,
    Event,
    Menu,
    Slash,
}

/// Path patterns the router understands, matched case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutePattern {
    /// Matches any path that begins with the given prefix.
    Prefix(&'static str),
    /// Matches the full path exactly.
    Full(&'static str),
    /// Matches `/slash.<name>` where `<name>` is one or more letters,
    /// underscores, or hyphens.
    SlashCommand,
}

const SLASH_PREFIX: &str = "/slash.";

impl RoutePattern {
    fn matches(&self, path: &str) -> bool {
        match self {
            Self::Prefix(prefix) => starts_with_ignore_case(path, prefix),
            Self::Full(full) => path.eq_ignore_ascii_case(full),
            Self::SlashCommand => {
                if !starts_with_ignore_case(path, SLASH_PREFIX) {
                    return false;
                }
                let name = &path[SLASH_PREFIX.len()..];
                !name.is_empty()
                    && name
                        .bytes()
                        .all(|b| b.is_ascii_alphabetic() || b == b'_' || b == b'-')
            }
        }
    }
}

fn starts_with_ignore_case(path: &str, prefix: &str) -> bool {
    path.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

#[derive(Debug, Clone)]
struct Route {
    pattern: RoutePattern,
    methods: Vec<Method>,
    kind: RouteKind,
}

/// Ordered route table. Evaluation order is registration order: the first
/// pattern matching the path decides the request, and its method set alone
/// determines whether the request is allowed. Unmatched and
/// method-mismatched requests are indistinguishable to callers.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the gateway's fixed table.
    pub fn standard() -> Self {
        let mut table = Self::new();
        table.register_any(RoutePattern::Prefix("/health"), RouteKind::Health);
        table.register_any(RoutePattern::Prefix("/install"), RouteKind::Install);
        table.register_any(RoutePattern::Prefix("/oauth"), RouteKind::OAuth);
        table.register_post(RoutePattern::Full("/callbacks"), RouteKind::Callback);
        table.register_post(RoutePattern::Full("/events"), RouteKind::Event);
        table.register_post(RoutePattern::Full("/menus"), RouteKind::Menu);
        table.register_post(RoutePattern::SlashCommand, RouteKind::Slash);
        table
    }

    /// Registers a pattern with an explicit method set. Re-registering an
    /// existing pattern replaces its method map wholesale instead of
    /// merging, preserving its original position in evaluation order.
    pub fn register(&mut self, pattern: RoutePattern, methods: &[Method], kind: RouteKind) {
        if let Some(route) = self.routes.iter_mut().find(|route| route.pattern == pattern) {
            route.methods = methods.to_vec();
            route.kind = kind;
            return;
        }
        self.routes.push(Route {
            pattern,
            methods: methods.to_vec(),
            kind,
        });
    }

    pub fn register_any(&mut self, pattern: RoutePattern, kind: RouteKind) {
        self.register(pattern, &Method::ALL, kind);
    }

    pub fn register_post(&mut self, pattern: RoutePattern, kind: RouteKind) {
        self.register(pattern, &[Method::Post], kind);
    }

    /// Resolves a method/path pair to a route kind, or `None` when nothing
    /// matches. The caller maps `None` to an authorization failure.
    pub fn resolve(&self, method: &str, path: &str) -> Option<RouteKind> {
        let method = Method::parse(method)?;
        let route = self.routes.iter().find(|route| route.pattern.matches(path))?;
        route.methods.contains(&method).then_some(route.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_table_resolves_each_route() {
        let table = RouteTable::standard();
        assert_eq!(table.resolve("GET", "/health"), Some(RouteKind::Health));
        assert_eq!(table.resolve("PUT", "/health/deep"), Some(RouteKind::Health));
        assert_eq!(table.resolve("GET", "/install"), Some(RouteKind::Install));
        assert_eq!(table.resolve("GET", "/oauth"), Some(RouteKind::OAuth));
        assert_eq!(table.resolve("POST", "/callbacks"), Some(RouteKind::Callback));
        assert_eq!(table.resolve("POST", "/events"), Some(RouteKind::Event));
        assert_eq!(table.resolve("POST", "/menus"), Some(RouteKind::Menu));
        assert_eq!(table.resolve("POST", "/slash.deploy"), Some(RouteKind::Slash));
        assert_eq!(
            table.resolve("POST", "/slash.to-do_list"),
            Some(RouteKind::Slash)
        );
    }

    #[test]
    fn unmatched_paths_and_methods_resolve_to_none() {
        let table = RouteTable::standard();
        assert_eq!(table.resolve("GET", "/fizz"), None);
        assert_eq!(table.resolve("GET", "/callbacks"), None);
        assert_eq!(table.resolve("POST", "/callbacks/extra"), None);
        assert_eq!(table.resolve("POST", "/slash."), None);
        assert_eq!(table.resolve("POST", "/slash.123"), None);
        assert_eq!(table.resolve("PATCH", "/health"), None);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let table = RouteTable::standard();
        assert_eq!(table.resolve("GET", "/HEALTH"), Some(RouteKind::Health));
        assert_eq!(table.resolve("POST", "/Events"), Some(RouteKind::Event));
        assert_eq!(table.resolve("POST", "/SLASH.Deploy"), Some(RouteKind::Slash));
    }

    #[test]
    fn first_registered_pattern_wins() {
        let mut table = RouteTable::new();
        table.register_any(RoutePattern::Prefix("/call"), RouteKind::Health);
        table.register_post(RoutePattern::Full("/callbacks"), RouteKind::Callback);

        // Both patterns match; registration order decides.
        assert_eq!(table.resolve("POST", "/callbacks"), Some(RouteKind::Health));
    }

    #[test]
    fn first_match_method_set_is_final() {
        let mut table = RouteTable::new();
        table.register_post(RoutePattern::Prefix("/events"), RouteKind::Event);
        table.register_any(RoutePattern::Prefix("/ev"), RouteKind::Health);

        // /events matches the first entry; its method set rejects GET and no
        // later entry is consulted.
        assert_eq!(table.resolve("GET", "/events"), None);
        assert_eq!(table.resolve("GET", "/everything"), Some(RouteKind::Health));
    }

    #[test]
    fn reregistering_a_pattern_replaces_its_methods_wholesale() {
        let mut table = RouteTable::new();
        table.register_any(RoutePattern::Full("/events"), RouteKind::Event);
        table.register(RoutePattern::Full("/events"), &[Method::Put], RouteKind::Event);

        assert_eq!(table.resolve("PUT", "/events"), Some(RouteKind::Event));
        assert_eq!(table.resolve("POST", "/events"), None);
        assert_eq!(table.resolve("GET", "/events"), None);
    }
}
