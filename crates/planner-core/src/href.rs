//! Hyperlink ("href") resolution.
//!
//! Every linkable field in a representation is described by an
//! [`HrefDescriptor`]: a named endpoint plus the rules that fill in the
//! endpoint's path parameters. The [`HrefResolver`] turns a descriptor and an
//! entity into the wire shape `{"href": "<url>"}`, or `[{"href": ..., "count": n}]`
//! for deferred collections.
//!
//! # Lookup chains
//!
//! Nested URLs such as `/notes/boards/{boards_pk}/groups/{groups_pk}/notes/{pk}/`
//! need values that do not live on the entity itself. Each extra parameter is
//! produced by a [`Locator`]: either a dotted attribute path
//! (`"parent.board.id"`) or a named [`Derivation`]. Chains are capped at
//! [`MAX_LOOKUP_CHAIN`] entries; longer chains are rejected when the
//! descriptor is built, so a misconfigured schema never reaches a request.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::resource::{Attr, Resource};

/// Maximum number of extra path parameters a descriptor may derive.
pub const MAX_LOOKUP_CHAIN: usize = 3;

/// Default URL parameter that receives the entity's own identity.
pub const DEFAULT_IDENTITY_PARAM: &str = "pk";

// ============================================================================
// Errors
// ============================================================================

/// Errors raised while configuring or resolving hrefs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HrefError {
    /// A descriptor was declared with more than [`MAX_LOOKUP_CHAIN`] lookups.
    #[error(
        "lookup chain for '{endpoint}' has {len} entries; at most {MAX_LOOKUP_CHAIN} are allowed"
    )]
    ChainTooLong { endpoint: String, len: usize },

    /// The entity cannot be linked (unsaved, or a chain attribute is unset).
    #[error("cannot link to '{endpoint}': {reason}")]
    LinkResolution { endpoint: String, reason: String },

    /// The endpoint name is not registered in the routing table.
    #[error("no route named '{0}' is registered")]
    RouteNotFound(String),

    /// A route pattern could not be compiled.
    #[error("invalid route pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// A collection counter did not resolve to something countable.
    #[error("'{0}' does not resolve to a countable value")]
    NotCountable(String),
}

impl HrefError {
    fn link(endpoint: &str, reason: impl Into<String>) -> Self {
        Self::LinkResolution {
            endpoint: endpoint.to_string(),
            reason: reason.into(),
        }
    }
}

// ============================================================================
// Locators
// ============================================================================

/// A named function that derives a URL parameter from an entity.
///
/// Derivations are plain function pointers with a registered name so that
/// every non-attribute lookup in a schema can be audited by name.
#[derive(Clone, Copy)]
pub struct Derivation {
    name: &'static str,
    func: fn(&dyn Resource) -> Option<String>,
}

impl Derivation {
    pub const fn new(name: &'static str, func: fn(&dyn Resource) -> Option<String>) -> Self {
        Self { name, func }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn derive(&self, entity: &dyn Resource) -> Option<String> {
        (self.func)(entity)
    }
}

impl fmt::Debug for Derivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Derivation({})", self.name)
    }
}

/// How a single path parameter is obtained from an entity.
#[derive(Debug, Clone)]
pub enum Locator {
    /// Dotted attribute traversal, e.g. `parent.board.id`.
    AttributePath(String),
    /// A registered derivation.
    Derived(Derivation),
}

impl Locator {
    pub fn path(path: impl Into<String>) -> Self {
        Self::AttributePath(path.into())
    }

    fn locate(&self, entity: &dyn Resource) -> Option<String> {
        match self {
            Self::AttributePath(path) => scalar_string(traverse(entity, path)),
            Self::Derived(derivation) => derivation.derive(entity),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::AttributePath(path) => format!("attribute '{}'", path),
            Self::Derived(d) => format!("derivation '{}'", d.name()),
        }
    }
}

impl From<&str> for Locator {
    fn from(path: &str) -> Self {
        Self::path(path)
    }
}

impl From<Derivation> for Locator {
    fn from(d: Derivation) -> Self {
        Self::Derived(d)
    }
}

/// Follows a dotted attribute path through related objects.
///
/// Every segment but the last must resolve to an object.
pub fn traverse<'a>(entity: &'a dyn Resource, path: &str) -> Attr<'a> {
    let mut current = entity;
    let mut segments = path.split('.').peekable();
    while let Some(segment) = segments.next() {
        let attr = current.attr(segment);
        if segments.peek().is_none() {
            return attr;
        }
        match attr {
            Attr::Object(next) => current = next,
            _ => return Attr::Missing,
        }
    }
    Attr::Missing
}

/// Renders an attribute as a URL parameter value.
fn scalar_string(attr: Attr<'_>) -> Option<String> {
    match attr {
        Attr::Value(Value::String(s)) if !s.is_empty() => Some(s),
        Attr::Value(Value::Number(n)) => Some(n.to_string()),
        Attr::Value(Value::Bool(b)) => Some(b.to_string()),
        Attr::Object(obj) => obj.identity(),
        _ => None,
    }
}

// ============================================================================
// Descriptors
// ============================================================================

/// Declarative description of one linkable field.
#[derive(Debug, Clone)]
pub struct HrefDescriptor {
    endpoint: String,
    identity_param: Option<String>,
    chain: Vec<(String, Locator)>,
    fragment: Option<String>,
}

impl HrefDescriptor {
    /// Links to `endpoint`, passing the entity identity as `pk`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            identity_param: Some(DEFAULT_IDENTITY_PARAM.to_string()),
            chain: Vec::new(),
            fragment: None,
        }
    }

    /// Passes the entity identity under a different parameter name.
    pub fn identity_as(mut self, param: impl Into<String>) -> Self {
        self.identity_param = Some(param.into());
        self
    }

    /// Does not pass the entity identity at all (list endpoints).
    pub fn without_identity(mut self) -> Self {
        self.identity_param = None;
        self
    }

    /// Appends lookups to the chain.
    ///
    /// Fails with [`HrefError::ChainTooLong`] once the chain would exceed
    /// [`MAX_LOOKUP_CHAIN`] entries.
    pub fn with_chain<I, K, L>(mut self, lookups: I) -> Result<Self, HrefError>
    where
        I: IntoIterator<Item = (K, L)>,
        K: Into<String>,
        L: Into<Locator>,
    {
        self.chain
            .extend(lookups.into_iter().map(|(k, l)| (k.into(), l.into())));
        if self.chain.len() > MAX_LOOKUP_CHAIN {
            return Err(HrefError::ChainTooLong {
                endpoint: self.endpoint,
                len: self.chain.len(),
            });
        }
        Ok(self)
    }

    /// Attaches a `#fragment` naming the field that refers to this link.
    pub fn referring_field(mut self, field: impl Into<String>) -> Self {
        self.fragment = Some(field.into());
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The parameter names this descriptor will supply, identity first.
    pub fn params(&self) -> Vec<&str> {
        self.identity_param
            .as_deref()
            .into_iter()
            .chain(self.chain.iter().map(|(k, _)| k.as_str()))
            .collect()
    }

    fn collect_params(&self, entity: &dyn Resource) -> Result<Vec<(String, String)>, HrefError> {
        let mut params = Vec::with_capacity(self.chain.len() + 1);
        if let Some(param) = &self.identity_param {
            let id = entity
                .identity()
                .ok_or_else(|| HrefError::link(&self.endpoint, "entity has no identity"))?;
            params.push((param.clone(), id));
        }
        for (param, locator) in &self.chain {
            let value = locator.locate(entity).ok_or_else(|| {
                HrefError::link(
                    &self.endpoint,
                    format!("{} for '{}' is missing or null", locator.describe(), param),
                )
            })?;
            params.push((param.clone(), value));
        }
        Ok(params)
    }
}

/// What a deferred collection counts.
#[derive(Debug, Clone)]
pub enum Counter {
    /// A precomputed length.
    Length(usize),
    /// An explicit sequence.
    Sequence(Vec<Value>),
    /// An attribute holding a collection or a count. If the attribute holds
    /// a string, that string is followed once more as an attribute path.
    Attribute(String),
}

impl Counter {
    pub fn attribute(path: impl Into<String>) -> Self {
        Self::Attribute(path.into())
    }

    fn count(&self, entity: &dyn Resource) -> Result<usize, HrefError> {
        match self {
            Self::Length(n) => Ok(*n),
            Self::Sequence(items) => Ok(items.len()),
            Self::Attribute(path) => count_attr(entity, path, traverse(entity, path), 1),
        }
    }
}

fn count_attr(
    entity: &dyn Resource,
    path: &str,
    attr: Attr<'_>,
    indirections: u8,
) -> Result<usize, HrefError> {
    match attr {
        Attr::Many(items) => Ok(items.len()),
        Attr::Value(Value::Array(items)) => Ok(items.len()),
        Attr::Value(Value::Number(n)) => n
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| HrefError::NotCountable(path.to_string())),
        Attr::Value(Value::String(next)) if indirections > 0 => {
            count_attr(entity, &next, traverse(entity, &next), indirections - 1)
        }
        _ => Err(HrefError::NotCountable(path.to_string())),
    }
}

// ============================================================================
// Routing table
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

#[derive(Debug, Clone)]
struct RoutePattern {
    segments: Vec<Segment>,
}

impl RoutePattern {
    fn compile(pattern: &str) -> Result<Self, HrefError> {
        let invalid = |reason: &str| HrefError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };
        let mut segments = Vec::new();
        let mut rest = pattern;
        while let Some(start) = rest.find('{') {
            let end = rest[start..]
                .find('}')
                .map(|i| start + i)
                .ok_or_else(|| invalid("unclosed '{'"))?;
            let name = &rest[start + 1..end];
            if name.is_empty() || name.contains('{') {
                return Err(invalid("empty or nested parameter"));
            }
            if start > 0 {
                segments.push(Segment::Literal(rest[..start].to_string()));
            }
            segments.push(Segment::Param(name.to_string()));
            rest = &rest[end + 1..];
        }
        if rest.contains('}') {
            return Err(invalid("unmatched '}'"));
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }
        Ok(Self { segments })
    }

    fn params(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(p) => Some(p.as_str()),
            Segment::Literal(_) => None,
        })
    }
}

/// Named URL patterns, compiled once and shared for the process lifetime.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    base: Option<String>,
    routes: HashMap<String, RoutePattern>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every resolved href absolute against `base`.
    pub fn with_base_url(mut self, base: &Url) -> Self {
        self.base = Some(base.as_str().trim_end_matches('/').to_string());
        self
    }

    /// Registers a pattern such as `/notes/boards/{pk}/`.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        pattern: &str,
    ) -> Result<&mut Self, HrefError> {
        let compiled = RoutePattern::compile(pattern)?;
        self.routes.insert(name.into(), compiled);
        Ok(self)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.routes.contains_key(name)
    }

    /// Checks that `descriptor` names a registered route and supplies exactly
    /// its parameters.
    pub fn check(&self, descriptor: &HrefDescriptor) -> Result<(), HrefError> {
        let route = self
            .routes
            .get(descriptor.endpoint())
            .ok_or_else(|| HrefError::RouteNotFound(descriptor.endpoint().to_string()))?;
        let mut expected: Vec<&str> = route.params().collect();
        let mut supplied = descriptor.params();
        expected.sort_unstable();
        supplied.sort_unstable();
        if expected != supplied {
            return Err(HrefError::link(
                descriptor.endpoint(),
                format!("route expects {:?}, descriptor supplies {:?}", expected, supplied),
            ));
        }
        Ok(())
    }

    /// Builds the URL for `name` from parameter values.
    pub fn reverse(&self, name: &str, params: &[(String, String)]) -> Result<String, HrefError> {
        let route = self
            .routes
            .get(name)
            .ok_or_else(|| HrefError::RouteNotFound(name.to_string()))?;
        if params.len() != route.params().count() {
            return Err(HrefError::link(
                name,
                format!("expected {} parameters, got {}", route.params().count(), params.len()),
            ));
        }

        let mut path = String::new();
        for segment in &route.segments {
            match segment {
                Segment::Literal(lit) => path.push_str(lit),
                Segment::Param(p) => {
                    let (_, value) = params
                        .iter()
                        .find(|(k, _)| k == p)
                        .ok_or_else(|| HrefError::link(name, format!("missing parameter '{}'", p)))?;
                    if value.contains(['/', '?', '#']) {
                        return Err(HrefError::link(
                            name,
                            format!("parameter '{}' is not a single path segment", p),
                        ));
                    }
                    path.push_str(value);
                }
            }
        }

        Ok(match &self.base {
            Some(base) => format!("{}{}", base, path),
            None => path,
        })
    }
}

// ============================================================================
// Resolver
// ============================================================================

/// Wire shape of a single link. `href` is `null` only when an unknown route
/// was tolerated outside strict mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Href {
    pub href: Option<String>,
}

/// Wire shape of one element of a deferred collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountedHref {
    pub href: Option<String>,
    pub count: usize,
}

/// Resolves descriptors against a routing table.
#[derive(Debug, Clone)]
pub struct HrefResolver {
    routes: RouteTable,
    strict: bool,
}

impl HrefResolver {
    /// In strict mode an unknown route is an error; otherwise it is logged and
    /// rendered as a null href.
    pub fn new(routes: RouteTable, strict: bool) -> Self {
        Self { routes, strict }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn resolve(
        &self,
        entity: &dyn Resource,
        descriptor: &HrefDescriptor,
    ) -> Result<Href, HrefError> {
        self.url_for(entity, descriptor).map(|href| Href { href })
    }

    /// Resolves a deferred collection as a single-element list.
    pub fn resolve_collection(
        &self,
        entity: &dyn Resource,
        descriptor: &HrefDescriptor,
        counter: &Counter,
    ) -> Result<Vec<CountedHref>, HrefError> {
        let href = self.url_for(entity, descriptor)?;
        let count = counter.count(entity)?;
        Ok(vec![CountedHref { href, count }])
    }

    fn url_for(
        &self,
        entity: &dyn Resource,
        descriptor: &HrefDescriptor,
    ) -> Result<Option<String>, HrefError> {
        let params = descriptor.collect_params(entity)?;
        let url = match self.routes.reverse(descriptor.endpoint(), &params) {
            Ok(url) => url,
            Err(HrefError::RouteNotFound(name)) if !self.strict => {
                tracing::error!(endpoint = %name, "Href points at an unregistered route");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        Ok(Some(match &descriptor.fragment {
            Some(fragment) => attach_fragment(&url, fragment),
            None => url,
        }))
    }
}

fn attach_fragment(url: &str, fragment: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(fragment.as_bytes()).collect();
    let base = url.split('#').next().unwrap_or(url);
    format!("{}#{}", base, encoded)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BoardId, GroupId, NoteParent};

    struct Thing {
        id: Option<i64>,
        parent: NoteParent,
        tags: Vec<BoardId>,
        alias: &'static str,
    }

    impl Resource for Thing {
        fn identity(&self) -> Option<String> {
            self.id.map(|id| id.to_string())
        }

        fn attr(&self, name: &str) -> Attr<'_> {
            match name {
                "parent" => Attr::Object(&self.parent),
                "tags" => Attr::Many(self.tags.iter().map(|t| t as &dyn Resource).collect()),
                "alias" => Attr::value(self.alias),
                "nothing" => Attr::Value(Value::Null),
                _ => Attr::Missing,
            }
        }
    }

    fn thing() -> Thing {
        Thing {
            id: Some(11),
            parent: NoteParent::Group {
                board: BoardId(3),
                group: GroupId(5),
            },
            tags: vec![BoardId(1), BoardId(2)],
            alias: "tags",
        }
    }

    fn routes() -> RouteTable {
        let mut table = RouteTable::new();
        table
            .register("boards-detail", "/notes/boards/{pk}/")
            .unwrap()
            .register("boards-list", "/notes/boards/")
            .unwrap()
            .register(
                "groups-notes",
                "/notes/boards/{boards_pk}/groups/{groups_pk}/notes/{pk}/",
            )
            .unwrap();
        table
    }

    fn board_of(entity: &dyn Resource) -> Option<String> {
        match entity.attr("parent") {
            Attr::Object(parent) => match parent.attr("board") {
                Attr::Object(board) => board.identity(),
                _ => None,
            },
            _ => None,
        }
    }

    #[test]
    fn test_resolve_identity_only() {
        let resolver = HrefResolver::new(routes(), true);
        let href = resolver
            .resolve(&thing(), &HrefDescriptor::new("boards-detail"))
            .unwrap();
        assert_eq!(href.href.as_deref(), Some("/notes/boards/11/"));
    }

    #[test]
    fn test_resolve_with_chain_and_derivation() {
        let resolver = HrefResolver::new(routes(), true);
        let descriptor = HrefDescriptor::new("groups-notes")
            .with_chain([
                ("boards_pk", Locator::from(Derivation::new("board_of", board_of))),
                ("groups_pk", Locator::path("parent.id")),
            ])
            .unwrap();
        let href = resolver.resolve(&thing(), &descriptor).unwrap();
        assert_eq!(
            href.href.as_deref(),
            Some("/notes/boards/3/groups/5/notes/11/")
        );
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let resolver = HrefResolver::new(routes(), true);
        let descriptor = HrefDescriptor::new("boards-detail").referring_field("notes");
        let a = resolver.resolve(&thing(), &descriptor).unwrap();
        let b = resolver.resolve(&thing(), &descriptor).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.href.as_deref(), Some("/notes/boards/11/#notes"));
    }

    #[test]
    fn test_fragment_is_form_encoded() {
        assert_eq!(attach_fragment("/a/", "my notes"), "/a/#my+notes");
        assert_eq!(attach_fragment("/a/#old", "new"), "/a/#new");
    }

    #[test]
    fn test_four_entry_chain_rejected_at_construction() {
        let err = HrefDescriptor::new("boards-detail")
            .with_chain([("a", "x"), ("b", "y"), ("c", "z"), ("d", "w")])
            .unwrap_err();
        assert_eq!(
            err,
            HrefError::ChainTooLong {
                endpoint: "boards-detail".into(),
                len: 4
            }
        );
    }

    #[test]
    fn test_three_entry_chain_accepted() {
        assert!(
            HrefDescriptor::new("x")
                .with_chain([("a", "x"), ("b", "y"), ("c", "z")])
                .is_ok()
        );
    }

    #[test]
    fn test_unsaved_entity_fails() {
        let resolver = HrefResolver::new(routes(), true);
        let mut unsaved = thing();
        unsaved.id = None;
        let err = resolver
            .resolve(&unsaved, &HrefDescriptor::new("boards-detail"))
            .unwrap_err();
        assert!(matches!(err, HrefError::LinkResolution { .. }));
    }

    #[test]
    fn test_null_chain_attribute_fails() {
        let resolver = HrefResolver::new(routes(), true);
        let descriptor = HrefDescriptor::new("groups-notes")
            .with_chain([("boards_pk", "nothing"), ("groups_pk", "parent.id")])
            .unwrap();
        let err = resolver.resolve(&thing(), &descriptor).unwrap_err();
        assert!(matches!(err, HrefError::LinkResolution { .. }));
    }

    #[test]
    fn test_unknown_route_strict_vs_lenient() {
        let descriptor = HrefDescriptor::new("nowhere");
        let strict = HrefResolver::new(routes(), true);
        assert_eq!(
            strict.resolve(&thing(), &descriptor).unwrap_err(),
            HrefError::RouteNotFound("nowhere".into())
        );

        let lenient = HrefResolver::new(routes(), false);
        assert_eq!(
            lenient.resolve(&thing(), &descriptor).unwrap(),
            Href { href: None }
        );
    }

    #[test]
    fn test_collection_counters() {
        let resolver = HrefResolver::new(routes(), true);
        let descriptor = HrefDescriptor::new("boards-list").without_identity();

        let by_len = resolver
            .resolve_collection(&thing(), &descriptor, &Counter::Length(4))
            .unwrap();
        assert_eq!(
            by_len,
            vec![CountedHref {
                href: Some("/notes/boards/".into()),
                count: 4
            }]
        );

        let by_seq = resolver
            .resolve_collection(
                &thing(),
                &descriptor,
                &Counter::Sequence(vec![Value::from(1), Value::from(2), Value::from(3)]),
            )
            .unwrap();
        assert_eq!(by_seq[0].count, 3);

        let by_attr = resolver
            .resolve_collection(&thing(), &descriptor, &Counter::attribute("tags"))
            .unwrap();
        assert_eq!(by_attr[0].count, 2);

        // "alias" holds the name of another attribute; it is followed once.
        let indirect = resolver
            .resolve_collection(&thing(), &descriptor, &Counter::attribute("alias"))
            .unwrap();
        assert_eq!(indirect[0].count, 2);

        let err = resolver
            .resolve_collection(&thing(), &descriptor, &Counter::attribute("parent"))
            .unwrap_err();
        assert_eq!(err, HrefError::NotCountable("parent".into()));
    }

    #[test]
    fn test_absolute_base_url() {
        let base = Url::parse("https://api.example.com/").unwrap();
        let resolver = HrefResolver::new(routes().with_base_url(&base), true);
        let href = resolver
            .resolve(&thing(), &HrefDescriptor::new("boards-detail"))
            .unwrap();
        assert_eq!(
            href.href.as_deref(),
            Some("https://api.example.com/notes/boards/11/")
        );
    }

    #[test]
    fn test_check_descriptor_params() {
        let table = routes();
        assert!(table.check(&HrefDescriptor::new("boards-detail")).is_ok());
        assert!(matches!(
            table.check(&HrefDescriptor::new("boards-list")),
            Err(HrefError::LinkResolution { .. })
        ));
        assert_eq!(
            table.check(&HrefDescriptor::new("missing")),
            Err(HrefError::RouteNotFound("missing".into()))
        );
    }

    #[test]
    fn test_invalid_patterns() {
        let mut table = RouteTable::new();
        assert!(table.register("a", "/x/{pk/").is_err());
        assert!(table.register("b", "/x/{}/").is_err());
        assert!(table.register("c", "/x/pk}/").is_err());
    }
}
