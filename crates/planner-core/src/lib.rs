//! planner-core: Domain layer for the notes board API
//!
//! This crate provides:
//! - Board, group, note and user types with their identifiers
//! - Href resolution: named routes, lookup chains and deferred collections
//! - Declarative representation schemas used for both output and input
//! - The board access policy
//!
//! Nothing in this crate performs I/O; storage lives in `planner-store` and
//! the HTTP surface in `planner-server`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use planner_core::{HrefDescriptor, HrefResolver, RouteTable};
//!
//! let mut routes = RouteTable::new();
//! routes.register("notes:boards-detail", "/notes/boards/{pk}/")?;
//! let resolver = HrefResolver::new(routes, true);
//!
//! let link = resolver.resolve(&board, &HrefDescriptor::new("notes:boards-detail"))?;
//! ```

pub mod access;
pub mod href;
pub mod representation;
pub mod resource;
pub mod types;

pub use access::{AccessError, BoardAction, authorize, check_member_removal};
pub use href::{
    Counter, CountedHref, Derivation, Href, HrefDescriptor, HrefError, HrefResolver, Locator,
    RouteTable,
};
pub use representation::{
    FieldKind, FieldSpec, Producer, Rule, ScalarField, Schema, ValidationError, WriteContext,
    WriteMode,
};
pub use resource::{Attr, Resource};
pub use types::*;
