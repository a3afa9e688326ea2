//! Declarative entity representations.
//!
//! A [`Schema`] is an ordered table of output keys to [`FieldSpec`]s. The same
//! table drives both directions:
//!
//! - **read**: [`Schema::represent`] walks the table in declared order and
//!   produces a JSON object, recursing into nested schemas and delegating
//!   link fields to the [`HrefResolver`];
//! - **write**: [`Schema::validate`] checks a client payload against the
//!   writable scalar fields, fills hidden server-side defaults and runs the
//!   schema's cross-field rules.
//!
//! Hidden fields are never taken from client input, even when the payload
//! contains a key of the same name.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::href::{Counter, HrefDescriptor, HrefError, HrefResolver};
use crate::resource::{Attr, Resource};
use crate::types::{HexColor, UserId};

// ============================================================================
// Write context and errors
// ============================================================================

/// Server-side facts available to hidden field producers and rules.
#[derive(Debug, Clone, Copy)]
pub struct WriteContext {
    pub user: UserId,
    pub now: DateTime<Utc>,
}

impl WriteContext {
    pub fn new(user: UserId) -> Self {
        Self {
            user,
            now: Utc::now(),
        }
    }
}

/// Whether missing required fields are an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Create or full replace: required fields must be present.
    Full,
    /// PATCH: only supplied fields are validated.
    Partial,
}

/// A rejected client payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{detail}")]
pub struct ValidationError {
    /// The offending input key, if the error is tied to one.
    pub field: Option<String>,
    pub detail: String,
    /// Lowercase snake_case error code.
    pub code: &'static str,
}

impl ValidationError {
    pub fn field(field: impl Into<String>, code: &'static str, detail: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            detail: detail.into(),
            code,
        }
    }

    pub fn non_field(code: &'static str, detail: impl Into<String>) -> Self {
        Self {
            field: None,
            detail: detail.into(),
            code,
        }
    }
}

// ============================================================================
// Field descriptors
// ============================================================================

/// Which directions a scalar field participates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadWrite,
    ReadOnly,
    WriteOnly,
}

/// Input validation and output formatting for a scalar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Text {
        min: Option<usize>,
        max: Option<usize>,
        allow_blank: bool,
    },
    Integer,
    Boolean,
    /// A UUID string of the given version.
    Uuid { version: usize },
    /// `#rgb` / `#rrggbb` on the wire, packed integer internally.
    HexColor,
    /// A list of integer primary keys.
    IdList { allow_empty: bool },
    /// Passed through unchanged.
    Any,
}

impl FieldKind {
    pub const fn text() -> Self {
        Self::Text {
            min: None,
            max: None,
            allow_blank: false,
        }
    }

    fn to_internal(&self, key: &str, value: &Value) -> Result<Value, ValidationError> {
        match self {
            Self::Text {
                min,
                max,
                allow_blank,
            } => {
                let text = match value {
                    Value::String(s) => s.trim().to_string(),
                    Value::Number(n) => n.to_string(),
                    _ => return Err(ValidationError::field(key, "invalid", "Not a valid string.")),
                };
                if text.is_empty() {
                    if *allow_blank {
                        return Ok(Value::String(text));
                    }
                    return Err(ValidationError::field(
                        key,
                        "blank",
                        "This field may not be blank.",
                    ));
                }
                let chars = text.chars().count();
                if let Some(min) = min.filter(|m| chars < *m) {
                    return Err(ValidationError::field(
                        key,
                        "min_length",
                        format!("Ensure this field has at least {} characters.", min),
                    ));
                }
                if let Some(max) = max.filter(|m| chars > *m) {
                    return Err(ValidationError::field(
                        key,
                        "max_length",
                        format!("Ensure this field has no more than {} characters.", max),
                    ));
                }
                Ok(Value::String(text))
            }
            Self::Integer => as_integer(value)
                .map(Value::from)
                .ok_or_else(|| ValidationError::field(key, "invalid", "A valid integer is required.")),
            Self::Boolean => as_bool(value)
                .map(Value::Bool)
                .ok_or_else(|| ValidationError::field(key, "invalid", "Must be a valid boolean.")),
            Self::Uuid { version } => value
                .as_str()
                .and_then(|s| Uuid::parse_str(s).ok())
                .filter(|u| u.get_version_num() == *version)
                .map(|u| Value::String(u.hyphenated().to_string()))
                .ok_or_else(|| {
                    ValidationError::field(
                        key,
                        "invalid",
                        format!("Must be a valid UUID of version {}.", version),
                    )
                }),
            Self::HexColor => value
                .as_str()
                .and_then(HexColor::parse)
                .map(|c| Value::from(c.packed()))
                .ok_or_else(|| {
                    ValidationError::field(key, "incorrect_format", "Incorrect hex color format.")
                }),
            Self::IdList { allow_empty } => {
                let Value::Array(items) = value else {
                    return Err(ValidationError::field(
                        key,
                        "not_a_list",
                        format!(
                            "Expected a list of items but got type \"{}\".",
                            json_type(value)
                        ),
                    ));
                };
                if items.is_empty() && !allow_empty {
                    return Err(ValidationError::field(
                        key,
                        "empty",
                        "This list may not be empty.",
                    ));
                }
                items
                    .iter()
                    .map(|item| {
                        as_integer(item).map(Value::from).ok_or_else(|| {
                            ValidationError::field(
                                key,
                                "incorrect_type",
                                format!(
                                    "Incorrect type. Expected pk value, received {}.",
                                    json_type(item)
                                ),
                            )
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array)
            }
            Self::Any => Ok(value.clone()),
        }
    }

    fn to_representation(&self, value: Value) -> Value {
        if let (Self::HexColor, Some(packed)) = (self, value.as_i64()) {
            if let Some(color) = HexColor::from_packed(packed) {
                return Value::String(color.to_string());
            }
        }
        value
    }
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => parse_bool(s),
        _ => None,
    }
}

/// Parses the boolean spellings accepted in payloads and query strings.
pub fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

/// A scalar attribute copied between entity and wire.
#[derive(Debug, Clone)]
pub struct ScalarField {
    source: String,
    kind: FieldKind,
    access: Access,
    required: bool,
    default: Option<Value>,
}

impl ScalarField {
    /// A required read/write field reading `source` off the entity.
    pub fn new(source: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            source: source.into(),
            kind,
            access: Access::ReadWrite,
            required: true,
            default: None,
        }
    }

    pub fn text(source: impl Into<String>, min: Option<usize>, max: Option<usize>) -> Self {
        Self::new(
            source,
            FieldKind::Text {
                min,
                max,
                allow_blank: false,
            },
        )
    }

    pub fn read_only(mut self) -> Self {
        self.access = Access::ReadOnly;
        self
    }

    pub fn write_only(mut self) -> Self {
        self.access = Access::WriteOnly;
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Value used on full writes when the key is absent.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self.required = false;
        self
    }
}

/// A named server-side value producer for hidden fields.
#[derive(Clone, Copy)]
pub struct Producer {
    name: &'static str,
    func: fn(&WriteContext) -> Value,
}

impl Producer {
    /// The request timestamp, RFC 3339.
    pub const NOW: Producer = Producer::new("now", |ctx| Value::String(ctx.now.to_rfc3339()));

    /// The authenticated user's primary key.
    pub const CURRENT_USER: Producer =
        Producer::new("current_user", |ctx| Value::from(ctx.user.get()));

    pub const fn new(name: &'static str, func: fn(&WriteContext) -> Value) -> Self {
        Self { name, func }
    }

    pub fn produce(&self, ctx: &WriteContext) -> Value {
        (self.func)(ctx)
    }
}

impl fmt::Debug for Producer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Producer({})", self.name)
    }
}

/// One field of a schema.
#[derive(Debug, Clone)]
pub enum FieldSpec {
    Scalar(ScalarField),
    Nested {
        source: String,
        schema: Arc<Schema>,
        many: bool,
    },
    Href(HrefDescriptor),
    DeferredCollection {
        descriptor: HrefDescriptor,
        counter: Counter,
    },
    /// Write-only value computed server-side; client input is ignored.
    HiddenDefault(Producer),
}

/// A cross-field rule run after per-field validation.
#[derive(Clone, Copy)]
pub struct Rule {
    name: &'static str,
    check: fn(&mut Map<String, Value>, &WriteContext, WriteMode) -> Result<(), ValidationError>,
}

impl Rule {
    pub const fn new(
        name: &'static str,
        check: fn(&mut Map<String, Value>, &WriteContext, WriteMode) -> Result<(), ValidationError>,
    ) -> Self {
        Self { name, check }
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rule({})", self.name)
    }
}

// ============================================================================
// Schema
// ============================================================================

/// An ordered field table for one entity representation.
#[derive(Debug, Clone)]
pub struct Schema {
    name: &'static str,
    fields: Vec<(String, FieldSpec)>,
    rules: Vec<Rule>,
}

impl Schema {
    pub fn builder(name: &'static str) -> SchemaBuilder {
        SchemaBuilder {
            schema: Schema {
                name,
                fields: Vec::new(),
                rules: Vec::new(),
            },
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    /// Every href descriptor reachable from this schema, nested ones included.
    pub fn descriptors(&self) -> Vec<&HrefDescriptor> {
        let mut out = Vec::new();
        for (_, spec) in &self.fields {
            match spec {
                FieldSpec::Href(d) | FieldSpec::DeferredCollection { descriptor: d, .. } => {
                    out.push(d)
                }
                FieldSpec::Nested { schema, .. } => out.extend(schema.descriptors()),
                FieldSpec::Scalar(_) | FieldSpec::HiddenDefault(_) => {}
            }
        }
        out
    }

    /// Builds the read representation of `entity`.
    pub fn represent(
        &self,
        entity: &dyn Resource,
        resolver: &HrefResolver,
    ) -> Result<Value, HrefError> {
        let mut out = Map::with_capacity(self.fields.len());
        for (key, spec) in &self.fields {
            let value = match spec {
                FieldSpec::Scalar(field) => {
                    if field.access == Access::WriteOnly {
                        continue;
                    }
                    match entity.attr(&field.source) {
                        Attr::Value(v) => field.kind.to_representation(v),
                        Attr::Object(o) => o.identity().map(Value::String).unwrap_or(Value::Null),
                        Attr::Many(items) => Value::Array(
                            items
                                .iter()
                                .map(|o| o.identity().map(Value::String).unwrap_or(Value::Null))
                                .collect(),
                        ),
                        Attr::Missing => Value::Null,
                    }
                }
                FieldSpec::Nested {
                    source,
                    schema,
                    many,
                } => match entity.attr(source) {
                    Attr::Object(o) if *many => Value::Array(vec![schema.represent(o, resolver)?]),
                    Attr::Object(o) => schema.represent(o, resolver)?,
                    Attr::Many(items) => Value::Array(
                        items
                            .into_iter()
                            .map(|o| schema.represent(o, resolver))
                            .collect::<Result<_, _>>()?,
                    ),
                    _ if *many => Value::Array(Vec::new()),
                    _ => Value::Null,
                },
                FieldSpec::Href(descriptor) => to_json(resolver.resolve(entity, descriptor)?),
                FieldSpec::DeferredCollection {
                    descriptor,
                    counter,
                } => to_json(resolver.resolve_collection(entity, descriptor, counter)?),
                FieldSpec::HiddenDefault(_) => continue,
            };
            out.insert(key.clone(), value);
        }
        Ok(Value::Object(out))
    }

    /// Represents a sequence of entities as a JSON array.
    pub fn represent_many<'a, I>(&self, entities: I, resolver: &HrefResolver) -> Result<Value, HrefError>
    where
        I: IntoIterator<Item = &'a dyn Resource>,
    {
        entities
            .into_iter()
            .map(|e| self.represent(e, resolver))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }

    /// Validates a client payload and returns the accepted values, keyed by
    /// output key, with hidden defaults filled in.
    pub fn validate(
        &self,
        payload: &Value,
        ctx: &WriteContext,
        mode: WriteMode,
    ) -> Result<Map<String, Value>, ValidationError> {
        let empty = Map::new();
        let input = match payload {
            Value::Object(map) => map,
            Value::Null => &empty,
            other => {
                return Err(ValidationError::non_field(
                    "invalid",
                    format!(
                        "Invalid data. Expected a dictionary, but got {}.",
                        json_type(other)
                    ),
                ));
            }
        };

        let mut data = Map::new();
        for (key, spec) in &self.fields {
            match spec {
                FieldSpec::Scalar(field) if field.access != Access::ReadOnly => {
                    match input.get(key) {
                        None => match (&field.default, mode) {
                            (Some(default), WriteMode::Full) => {
                                data.insert(key.clone(), default.clone());
                            }
                            (None, WriteMode::Full) if field.required => {
                                return Err(ValidationError::field(
                                    key,
                                    "required",
                                    "This field is required.",
                                ));
                            }
                            _ => {}
                        },
                        Some(Value::Null) => {
                            return Err(ValidationError::field(
                                key,
                                "null",
                                "This field may not be null.",
                            ));
                        }
                        Some(value) => {
                            data.insert(key.clone(), field.kind.to_internal(key, value)?);
                        }
                    }
                }
                FieldSpec::HiddenDefault(producer) => {
                    data.insert(key.clone(), producer.produce(ctx));
                }
                _ => {}
            }
        }

        for rule in &self.rules {
            (rule.check)(&mut data, ctx, mode)?;
        }
        Ok(data)
    }
}

fn to_json(value: impl serde::Serialize) -> Value {
    // Href shapes hold only strings and integers.
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Incrementally declares a [`Schema`].
#[derive(Debug)]
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    /// Adds or replaces a field; replacing keeps the original position.
    pub fn field(mut self, key: impl Into<String>, spec: FieldSpec) -> Self {
        let key = key.into();
        match self.schema.fields.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = spec,
            None => self.schema.fields.push((key, spec)),
        }
        self
    }

    pub fn scalar(self, key: impl Into<String>, field: ScalarField) -> Self {
        self.field(key, FieldSpec::Scalar(field))
    }

    pub fn nested(
        self,
        key: impl Into<String>,
        source: impl Into<String>,
        schema: Arc<Schema>,
        many: bool,
    ) -> Self {
        self.field(
            key,
            FieldSpec::Nested {
                source: source.into(),
                schema,
                many,
            },
        )
    }

    pub fn href(self, key: impl Into<String>, descriptor: HrefDescriptor) -> Self {
        self.field(key, FieldSpec::Href(descriptor))
    }

    pub fn deferred(self, key: impl Into<String>, descriptor: HrefDescriptor, counter: Counter) -> Self {
        self.field(
            key,
            FieldSpec::DeferredCollection {
                descriptor,
                counter,
            },
        )
    }

    pub fn hidden(self, key: impl Into<String>, producer: Producer) -> Self {
        self.field(key, FieldSpec::HiddenDefault(producer))
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.schema.rules.push(rule);
        self
    }

    pub fn build(self) -> Schema {
        self.schema
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::href::RouteTable;
    use crate::types::{BoardId, User};

    struct Card {
        id: i64,
        title: String,
        color: u32,
        owner: User,
        helpers: Vec<User>,
    }

    impl Resource for Card {
        fn identity(&self) -> Option<String> {
            Some(self.id.to_string())
        }

        fn attr(&self, name: &str) -> Attr<'_> {
            match name {
                "title" => Attr::value(self.title.as_str()),
                "color" => Attr::value(self.color),
                "owner" => Attr::Object(&self.owner),
                "helpers" => Attr::Many(self.helpers.iter().map(|u| u as &dyn Resource).collect()),
                "secret" => Attr::value("hunter2"),
                _ => Attr::Missing,
            }
        }
    }

    fn user(id: i64) -> User {
        User {
            id: UserId(id),
            email: format!("u{}@example.com", id),
            first_name: None,
            last_name: None,
        }
    }

    fn resolver() -> HrefResolver {
        let mut routes = RouteTable::new();
        routes
            .register("users:user-detail", "/users/{pk}/")
            .unwrap()
            .register("cards:detail", "/cards/{pk}/")
            .unwrap();
        HrefResolver::new(routes, true)
    }

    fn user_schema() -> Arc<Schema> {
        Arc::new(
            Schema::builder("user")
                .href("self", HrefDescriptor::new("users:user-detail"))
                .scalar("email", ScalarField::new("email", FieldKind::text()))
                .build(),
        )
    }

    fn card_schema() -> Schema {
        Schema::builder("card")
            .href("self", HrefDescriptor::new("cards:detail"))
            .scalar("title", ScalarField::text("title", Some(2), Some(10)))
            .scalar("color", ScalarField::new("color", FieldKind::HexColor).optional())
            .scalar("secret", ScalarField::new("secret", FieldKind::text()).write_only().optional())
            .nested("owner", "owner", user_schema(), false)
            .nested("helpers", "helpers", user_schema(), true)
            .deferred(
                "helper_count",
                HrefDescriptor::new("cards:detail").referring_field("helpers"),
                Counter::attribute("helpers"),
            )
            .hidden("edited_by", Producer::CURRENT_USER)
            .build()
    }

    fn card() -> Card {
        Card {
            id: 4,
            title: "Packing".into(),
            color: 0x00ff00,
            owner: user(1),
            helpers: vec![user(2), user(3)],
        }
    }

    #[test]
    fn test_represent_in_declared_order() {
        let value = card_schema().represent(&card(), &resolver()).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["self", "title", "color", "owner", "helpers", "helper_count"]
        );
        assert_eq!(value["self"]["href"], "/cards/4/");
        assert_eq!(value["color"], "#00ff00");
        assert_eq!(value["owner"]["self"]["href"], "/users/1/");
        assert_eq!(value["helpers"].as_array().unwrap().len(), 2);
        assert_eq!(value["helper_count"][0]["href"], "/cards/4/#helpers");
        assert_eq!(value["helper_count"][0]["count"], 2);
    }

    #[test]
    fn test_write_only_and_hidden_fields_not_rendered() {
        let value = card_schema().represent(&card(), &resolver()).unwrap();
        assert!(value.get("secret").is_none());
        assert!(value.get("edited_by").is_none());
    }

    #[test]
    fn test_hidden_field_ignores_client_value() {
        let ctx = WriteContext::new(UserId(42));
        let payload = serde_json::json!({"title": "Trip", "edited_by": 999});
        let data = card_schema()
            .validate(&payload, &ctx, WriteMode::Full)
            .unwrap();
        assert_eq!(data["edited_by"], 42);
        assert_eq!(data["title"], "Trip");
    }

    #[test]
    fn test_read_only_fields_are_ignored_on_write() {
        let schema = Schema::builder("x")
            .scalar("id", ScalarField::new("id", FieldKind::Integer).read_only())
            .build();
        let data = schema
            .validate(&serde_json::json!({"id": 5}), &WriteContext::new(UserId(1)), WriteMode::Full)
            .unwrap();
        assert!(data.is_empty());
    }

    #[test]
    fn test_required_and_length_validation() {
        let ctx = WriteContext::new(UserId(1));
        let schema = card_schema();

        let err = schema
            .validate(&serde_json::json!({}), &ctx, WriteMode::Full)
            .unwrap_err();
        assert_eq!(err.code, "required");
        assert_eq!(err.field.as_deref(), Some("title"));

        let err = schema
            .validate(&serde_json::json!({"title": "x"}), &ctx, WriteMode::Full)
            .unwrap_err();
        assert_eq!(err.code, "min_length");

        let err = schema
            .validate(&serde_json::json!({"title": "x".repeat(11)}), &ctx, WriteMode::Full)
            .unwrap_err();
        assert_eq!(err.code, "max_length");

        let err = schema
            .validate(&serde_json::json!({"title": null}), &ctx, WriteMode::Full)
            .unwrap_err();
        assert_eq!(err.code, "null");
    }

    #[test]
    fn test_partial_mode_skips_required() {
        let ctx = WriteContext::new(UserId(1));
        let data = card_schema()
            .validate(&serde_json::json!({"color": "#fff"}), &ctx, WriteMode::Partial)
            .unwrap();
        assert_eq!(data["color"], 0xffffff);
        assert!(data.get("title").is_none());
    }

    #[test]
    fn test_hex_color_errors() {
        let ctx = WriteContext::new(UserId(1));
        let err = card_schema()
            .validate(
                &serde_json::json!({"title": "Trip", "color": "white"}),
                &ctx,
                WriteMode::Full,
            )
            .unwrap_err();
        assert_eq!(err.code, "incorrect_format");
        assert!(err.detail.ends_with('.'));
    }

    #[test]
    fn test_field_kinds() {
        let list = FieldKind::IdList { allow_empty: false };
        assert_eq!(
            list.to_internal("m", &serde_json::json!([1, "2"])).unwrap(),
            serde_json::json!([1, 2])
        );
        assert_eq!(list.to_internal("m", &serde_json::json!([])).unwrap_err().code, "empty");
        assert_eq!(
            list.to_internal("m", &serde_json::json!("1")).unwrap_err().code,
            "not_a_list"
        );
        assert_eq!(
            list.to_internal("m", &serde_json::json!([true])).unwrap_err().code,
            "incorrect_type"
        );

        let v4 = FieldKind::Uuid { version: 4 };
        let id = Uuid::new_v4().to_string();
        assert_eq!(v4.to_internal("id", &Value::from(id.clone())).unwrap(), Value::from(id));
        assert!(v4.to_internal("id", &Value::from("nope")).is_err());

        assert_eq!(
            FieldKind::Boolean.to_internal("b", &Value::from("false")).unwrap(),
            Value::Bool(false)
        );
        assert_eq!(
            FieldKind::text().to_internal("t", &Value::from("  padded  ")).unwrap(),
            Value::from("padded")
        );
        assert_eq!(
            FieldKind::text().to_internal("t", &Value::from("   ")).unwrap_err().code,
            "blank"
        );
    }

    #[test]
    fn test_rules_run_after_fields() {
        fn upper(
            data: &mut Map<String, Value>,
            _: &WriteContext,
            _: WriteMode,
        ) -> Result<(), ValidationError> {
            if let Some(Value::String(s)) = data.get_mut("title") {
                *s = s.to_uppercase();
            }
            Ok(())
        }

        let schema = Schema::builder("x")
            .scalar("title", ScalarField::text("title", None, None))
            .rule(Rule::new("upper", upper))
            .build();
        let data = schema
            .validate(
                &serde_json::json!({"title": "trip"}),
                &WriteContext::new(UserId(1)),
                WriteMode::Full,
            )
            .unwrap();
        assert_eq!(data["title"], "TRIP");
    }

    #[test]
    fn test_non_object_payload_rejected() {
        let err = card_schema()
            .validate(&serde_json::json!([1]), &WriteContext::new(UserId(1)), WriteMode::Full)
            .unwrap_err();
        assert_eq!(err.code, "invalid");
        assert!(err.field.is_none());
    }

    #[test]
    fn test_descriptors_include_nested() {
        let schema = card_schema();
        let endpoints: Vec<&str> = schema.descriptors().iter().map(|d| d.endpoint()).collect();
        assert!(endpoints.contains(&"users:user-detail"));
        assert!(endpoints.contains(&"cards:detail"));
    }

    #[test]
    fn test_represent_many_and_missing_nested() {
        let schema = Schema::builder("ids")
            .href("self", HrefDescriptor::new("users:user-detail"))
            .nested("friends", "friends", user_schema(), true)
            .build();
        let ids = [BoardId(1), BoardId(2)];
        let value = schema
            .represent_many(ids.iter().map(|b| b as &dyn Resource), &resolver())
            .unwrap();
        assert_eq!(value[1]["self"]["href"], "/users/2/");
        assert_eq!(value[0]["friends"], serde_json::json!([]));
    }
}
