//! Attribute access for anything that can be represented or linked.
//!
//! Both the href resolver and the representation builder read entities
//! through this one trait: a lookup by attribute name that yields a plain
//! JSON value, a related object, or a collection of related objects.

use serde_json::Value;

use crate::types::{BoardId, GroupId, Note, NoteParent, User, UserId};

/// The result of reading one attribute off a [`Resource`].
pub enum Attr<'a> {
    /// The entity has no such attribute.
    Missing,
    /// A scalar (or already serialized) value. `Value::Null` means unset.
    Value(Value),
    /// A single related entity.
    Object(&'a dyn Resource),
    /// A collection of related entities.
    Many(Vec<&'a dyn Resource>),
}

impl Attr<'_> {
    /// Shorthand for wrapping anything serializable as a scalar attribute.
    pub fn value(v: impl Into<Value>) -> Self {
        Attr::Value(v.into())
    }

    /// Whether the attribute is absent or explicitly null.
    pub fn is_empty(&self) -> bool {
        matches!(self, Attr::Missing | Attr::Value(Value::Null))
    }
}

impl std::fmt::Debug for Attr<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Attr::Missing => f.write_str("Missing"),
            Attr::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Attr::Object(o) => f.debug_tuple("Object").field(&o.identity()).finish(),
            Attr::Many(items) => f.debug_tuple("Many").field(&items.len()).finish(),
        }
    }
}

/// An entity with an identity and named attributes.
pub trait Resource {
    /// The identifier used as the default `pk` URL parameter.
    ///
    /// `None` for entities that have not been persisted yet.
    fn identity(&self) -> Option<String>;

    /// Reads a single attribute by name (no dots).
    fn attr(&self, name: &str) -> Attr<'_>;
}

macro_rules! id_resource {
    ($($id:ty),*) => {$(
        impl Resource for $id {
            fn identity(&self) -> Option<String> {
                Some(self.to_string())
            }

            fn attr(&self, name: &str) -> Attr<'_> {
                match name {
                    "id" | "pk" => Attr::value(self.get()),
                    _ => Attr::Missing,
                }
            }
        }
    )*};
}

id_resource!(UserId, BoardId, GroupId);

impl Resource for User {
    fn identity(&self) -> Option<String> {
        Some(self.id.to_string())
    }

    fn attr(&self, name: &str) -> Attr<'_> {
        match name {
            "id" | "pk" => Attr::value(self.id.get()),
            "email" => Attr::value(self.email.as_str()),
            // Blank names are reported as unset.
            "first_name" => Attr::Value(non_blank(self.first_name.as_deref())),
            "last_name" => Attr::Value(non_blank(self.last_name.as_deref())),
            _ => Attr::Missing,
        }
    }
}

fn non_blank(s: Option<&str>) -> Value {
    match s {
        Some(s) if !s.is_empty() => Value::from(s),
        _ => Value::Null,
    }
}

impl Resource for NoteParent {
    fn identity(&self) -> Option<String> {
        Some(match self {
            NoteParent::Board { board } => board.to_string(),
            NoteParent::Group { group, .. } => group.to_string(),
        })
    }

    fn attr(&self, name: &str) -> Attr<'_> {
        match (name, self) {
            ("id" | "pk", NoteParent::Board { board }) => Attr::value(board.get()),
            ("id" | "pk", NoteParent::Group { group, .. }) => Attr::value(group.get()),
            ("kind", NoteParent::Board { .. }) => Attr::value("board"),
            ("kind", NoteParent::Group { .. }) => Attr::value("group"),
            ("board", NoteParent::Board { board } | NoteParent::Group { board, .. }) => {
                Attr::Object(board)
            }
            ("group", NoteParent::Group { group, .. }) => Attr::Object(group),
            _ => Attr::Missing,
        }
    }
}

impl Resource for Note {
    fn identity(&self) -> Option<String> {
        Some(self.id.to_string())
    }

    fn attr(&self, name: &str) -> Attr<'_> {
        match name {
            "id" | "pk" => Attr::value(self.id.to_string()),
            "parent" => Attr::Object(&self.parent),
            "content" => Attr::value(self.content.as_str()),
            "created" => Attr::value(self.created.to_rfc3339()),
            "last_edited" => Attr::value(self.last_edited.to_rfc3339()),
            "edited_by" => Attr::Object(&self.edited_by),
            _ => Attr::Missing,
        }
    }
}
