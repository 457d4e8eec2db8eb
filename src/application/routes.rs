//! URL-to-route matching and per-route component resolution.
//!
//! A front end mounts the blog under a base path; everything below it maps to
//! one [`RouteType`]. Each route type has a page, loading and error component
//! and any of the three can be overridden. Components are opaque to this
//! module, so the same table works for template names, handler ids or
//! closures.

use std::collections::HashMap;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteType {
    Home,
    Post,
    Tag,
    Drafts,
    New,
    Edit,
    Unknown,
}

impl RouteType {
    pub const ALL: [RouteType; 7] = [
        RouteType::Home,
        RouteType::Post,
        RouteType::Tag,
        RouteType::Drafts,
        RouteType::New,
        RouteType::Edit,
        RouteType::Unknown,
    ];

    fn index(self) -> usize {
        match self {
            RouteType::Home => 0,
            RouteType::Post => 1,
            RouteType::Tag => 2,
            RouteType::Drafts => 3,
            RouteType::New => 4,
            RouteType::Edit => 5,
            RouteType::Unknown => 6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteMatch {
    pub route_type: RouteType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl RouteMatch {
    fn bare(route_type: RouteType) -> Self {
        Self {
            route_type,
            slug: None,
            tag: None,
        }
    }

    fn with_slug(route_type: RouteType, slug: &str) -> Self {
        Self {
            route_type,
            slug: Some(slug.to_string()),
            tag: None,
        }
    }
}

/// Classify path segments already stripped of the base path.
///
/// `drafts` and `new` are reserved and shadow posts with those slugs.
pub fn match_segments(segments: &[&str]) -> RouteMatch {
    match segments {
        [] => RouteMatch::bare(RouteType::Home),
        ["drafts"] => RouteMatch::bare(RouteType::Drafts),
        ["new"] => RouteMatch::bare(RouteType::New),
        ["tag", tag] => RouteMatch {
            route_type: RouteType::Tag,
            slug: None,
            tag: Some((*tag).to_string()),
        },
        [slug, "edit"] => RouteMatch::with_slug(RouteType::Edit, slug),
        [slug] => RouteMatch::with_slug(RouteType::Post, slug),
        _ => RouteMatch::bare(RouteType::Unknown),
    }
}

/// Match a request path against routes mounted at `base_path`.
///
/// Query strings and fragments are ignored, as are empty segments, so
/// `/blog/`, `/blog//` and `/blog?page=2` are all the home route. Paths
/// outside the base resolve to [`RouteType::Unknown`].
pub fn match_route(path: &str, base_path: &str) -> RouteMatch {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let base = base_path.trim_end_matches('/');

    let Some(rest) = path.strip_prefix(base) else {
        return RouteMatch::bare(RouteType::Unknown);
    };
    if !rest.is_empty() && !rest.starts_with('/') {
        // `/blogroll` is not under `/blog`
        return RouteMatch::bare(RouteType::Unknown);
    }

    let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
    match_segments(&segments)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentSlot {
    Page,
    Loading,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentSet<C> {
    pub page: C,
    pub loading: C,
    pub error: C,
}

impl<C> ComponentSet<C> {
    pub fn get(&self, slot: ComponentSlot) -> &C {
        match slot {
            ComponentSlot::Page => &self.page,
            ComponentSlot::Loading => &self.loading,
            ComponentSlot::Error => &self.error,
        }
    }
}

/// Default components indexed by route type, plus sparse overrides.
#[derive(Debug, Clone)]
pub struct RouteComponents<C> {
    defaults: [ComponentSet<C>; 7],
    overrides: HashMap<(RouteType, ComponentSlot), C>,
}

impl<C> RouteComponents<C> {
    pub fn from_fn(defaults: impl FnMut(RouteType) -> ComponentSet<C>) -> Self {
        Self {
            defaults: RouteType::ALL.map(defaults),
            overrides: HashMap::new(),
        }
    }

    pub fn with_override(mut self, route: RouteType, slot: ComponentSlot, component: C) -> Self {
        self.set_override(route, slot, component);
        self
    }

    pub fn set_override(&mut self, route: RouteType, slot: ComponentSlot, component: C) {
        self.overrides.insert((route, slot), component);
    }

    pub fn clear_override(&mut self, route: RouteType, slot: ComponentSlot) -> Option<C> {
        self.overrides.remove(&(route, slot))
    }

    /// The override for `(route, slot)` if one is set, the default otherwise.
    pub fn resolve(&self, route: RouteType, slot: ComponentSlot) -> &C {
        self.overrides
            .get(&(route, slot))
            .unwrap_or_else(|| self.defaults[route.index()].get(slot))
    }

    pub fn resolve_match(&self, route: &RouteMatch, slot: ComponentSlot) -> &C {
        self.resolve(route.route_type, slot)
    }

    pub fn resolve_set(&self, route: RouteType) -> ComponentSet<&C> {
        ComponentSet {
            page: self.resolve(route, ComponentSlot::Page),
            loading: self.resolve(route, ComponentSlot::Loading),
            error: self.resolve(route, ComponentSlot::Error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RouteComponents<String> {
        RouteComponents::from_fn(|route| {
            let name = format!("{route:?}");
            ComponentSet {
                page: format!("{name}Page"),
                loading: format!("{name}Loading"),
                error: "DefaultError".to_string(),
            }
        })
    }

    #[test]
    fn segments_map_to_route_types() {
        let cases: [(&[&str], RouteType); 8] = [
            (&[], RouteType::Home),
            (&["drafts"], RouteType::Drafts),
            (&["new"], RouteType::New),
            (&["tag", "intro"], RouteType::Tag),
            (&["hello-world", "edit"], RouteType::Edit),
            (&["hello-world"], RouteType::Post),
            (&["tag"], RouteType::Post),
            (&["a", "b", "c"], RouteType::Unknown),
        ];
        for (segments, expected) in cases {
            assert_eq!(
                match_segments(segments).route_type,
                expected,
                "segments {segments:?}"
            );
        }
    }

    #[test]
    fn match_route_extracts_params() {
        let post = match_route("/blog/hello-world", "/blog");
        assert_eq!(post.route_type, RouteType::Post);
        assert_eq!(post.slug.as_deref(), Some("hello-world"));

        let tag = match_route("/blog/tag/news?page=2", "/blog/");
        assert_eq!(tag.route_type, RouteType::Tag);
        assert_eq!(tag.tag.as_deref(), Some("news"));

        let edit = match_route("/blog/hello-world/edit/", "/blog");
        assert_eq!(edit.route_type, RouteType::Edit);
        assert_eq!(edit.slug.as_deref(), Some("hello-world"));
    }

    #[test]
    fn match_route_handles_base_boundaries() {
        assert_eq!(match_route("/blog", "/blog").route_type, RouteType::Home);
        assert_eq!(match_route("/blog//", "/blog").route_type, RouteType::Home);
        assert_eq!(match_route("/", "/").route_type, RouteType::Home);
        assert_eq!(
            match_route("/blogroll", "/blog").route_type,
            RouteType::Unknown
        );
        assert_eq!(
            match_route("/docs/intro", "/blog").route_type,
            RouteType::Unknown
        );
    }

    #[test]
    fn defaults_apply_without_overrides() {
        let components = table();
        for route in RouteType::ALL {
            let set = components.resolve_set(route);
            assert_eq!(set.page, &format!("{route:?}Page"));
            assert_eq!(set.loading, &format!("{route:?}Loading"));
            assert_eq!(set.error, "DefaultError");
        }
    }

    #[test]
    fn overrides_take_precedence_per_slot() {
        let mut components = table()
            .with_override(RouteType::Post, ComponentSlot::Page, "CustomPost".into())
            .with_override(RouteType::Tag, ComponentSlot::Error, "TagError".into());

        assert_eq!(
            components.resolve(RouteType::Post, ComponentSlot::Page),
            "CustomPost"
        );
        assert_eq!(
            components.resolve(RouteType::Post, ComponentSlot::Loading),
            "PostLoading"
        );
        assert_eq!(
            components.resolve(RouteType::Tag, ComponentSlot::Error),
            "TagError"
        );
        assert_eq!(
            components.resolve(RouteType::Home, ComponentSlot::Error),
            "DefaultError"
        );

        let matched = match_route("/blog/hello-world", "/blog");
        assert_eq!(
            components.resolve_match(&matched, ComponentSlot::Page),
            "CustomPost"
        );

        assert_eq!(
            components.clear_override(RouteType::Post, ComponentSlot::Page),
            Some("CustomPost".to_string())
        );
        assert_eq!(
            components.resolve(RouteType::Post, ComponentSlot::Page),
            "PostPage"
        );
    }
}
