//! Route names and the representation schemas of every API resource.
//!
//! Schemas are built once at startup. [`Schemas::build`] fails if any
//! descriptor is misconfigured, and [`crate::state::AppState::new`] checks
//! every descriptor against the route table before the server accepts
//! traffic.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::{Map, Value};
use url::Url;

use planner_core::{
    Attr, Board, Counter, Derivation, FieldKind, Group, HrefDescriptor, HrefError, Locator,
    Producer, Resource, RouteTable, Rule, ScalarField, Schema, UserId, ValidationError,
    WriteContext, WriteMode,
};

/// Registered endpoint names.
pub mod endpoint {
    pub const USER_DETAIL: &str = "users:user-detail";
    pub const BOARDS_LIST: &str = "notes:boards-list";
    pub const BOARDS_DETAIL: &str = "notes:boards-detail";
    pub const BOARDS_MEMBERS: &str = "notes:boards-members";
    pub const GROUPS_LIST: &str = "notes:groups-list";
    pub const GROUPS_DETAIL: &str = "notes:groups-detail";
    pub const BOARDS_NOTES: &str = "notes:boards-notes";
    pub const GROUPS_NOTES: &str = "notes:groups-notes";
}

/// Endpoint name to URL pattern, in the syntax shared with the axum router.
pub const ROUTES: &[(&str, &str)] = &[
    (endpoint::USER_DETAIL, "/users/{pk}/"),
    (endpoint::BOARDS_LIST, "/notes/boards/"),
    (endpoint::BOARDS_DETAIL, "/notes/boards/{pk}/"),
    (endpoint::BOARDS_MEMBERS, "/notes/boards/{boards_pk}/members/"),
    (endpoint::GROUPS_LIST, "/notes/boards/{boards_pk}/groups/"),
    (endpoint::GROUPS_DETAIL, "/notes/boards/{boards_pk}/groups/{pk}/"),
    (endpoint::BOARDS_NOTES, "/notes/boards/{boards_pk}/notes/{pk}/"),
    (
        endpoint::GROUPS_NOTES,
        "/notes/boards/{boards_pk}/groups/{groups_pk}/notes/{pk}/",
    ),
];

/// Compiles [`ROUTES`], optionally making every href absolute.
pub fn route_table(base: Option<&Url>) -> Result<RouteTable, HrefError> {
    let mut routes = RouteTable::new();
    for (name, pattern) in ROUTES {
        routes.register(*name, pattern)?;
    }
    Ok(match base {
        Some(base) => routes.with_base_url(base),
        None => routes,
    })
}

/// The group a note lives in, for group-note links.
fn note_group(entity: &dyn Resource) -> Option<String> {
    match entity.attr("parent") {
        Attr::Object(parent) => match parent.attr("group") {
            Attr::Object(group) => group.identity(),
            _ => None,
        },
        _ => None,
    }
}

pub const NOTE_GROUP: Derivation = Derivation::new("note_group", note_group);

/// The creator always ends up in `members`, listed once.
fn owner_in_members(
    data: &mut Map<String, Value>,
    _: &WriteContext,
    _: WriteMode,
) -> Result<(), ValidationError> {
    let Some(owner) = data.get("owner").and_then(Value::as_i64) else {
        return Ok(());
    };
    let mut ids = vec![owner];
    if let Some(Value::Array(items)) = data.get("members") {
        ids.extend(items.iter().filter_map(Value::as_i64));
    }
    let mut seen = BTreeSet::new();
    ids.retain(|id| seen.insert(*id));
    data.insert("members".to_string(), Value::from(ids));
    Ok(())
}

/// Reads an id list accepted by an [`FieldKind::IdList`] field.
pub fn user_ids(data: &Map<String, Value>, key: &str) -> Vec<UserId> {
    data.get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_i64).map(UserId).collect())
        .unwrap_or_default()
}

/// Every schema the API renders or validates with.
#[derive(Debug)]
pub struct Schemas {
    pub user: Arc<Schema>,
    pub board_list: Arc<Schema>,
    pub board_detail: Arc<Schema>,
    pub board_create: Arc<Schema>,
    pub members: Arc<Schema>,
    pub member_write: Arc<Schema>,
    pub group_list: Arc<Schema>,
    pub group_detail: Arc<Schema>,
    pub board_note: Arc<Schema>,
    pub group_note: Arc<Schema>,
    pub note_write: Arc<Schema>,
}

impl Schemas {
    pub fn build() -> Result<Self, HrefError> {
        let user = Arc::new(
            Schema::builder("user")
                .href("self", HrefDescriptor::new(endpoint::USER_DETAIL))
                .scalar("email", ScalarField::new("email", FieldKind::text()).read_only())
                .scalar(
                    "first_name",
                    ScalarField::new("first_name", FieldKind::text()).read_only(),
                )
                .scalar(
                    "last_name",
                    ScalarField::new("last_name", FieldKind::text()).read_only(),
                )
                .build(),
        );

        let content = ScalarField::new(
            "content",
            FieldKind::Text {
                min: None,
                max: None,
                allow_blank: true,
            },
        );
        let last_edited = ScalarField::new("last_edited", FieldKind::Any).read_only();

        let board_note = Arc::new(
            Schema::builder("board_note")
                .href(
                    "self",
                    HrefDescriptor::new(endpoint::BOARDS_NOTES)
                        .with_chain([("boards_pk", "parent.board.id")])?,
                )
                .scalar("content", content.clone())
                .nested("edited_by", "edited_by", user.clone(), false)
                .scalar("last_edited", last_edited.clone())
                .build(),
        );

        let group_note = Arc::new(
            Schema::builder("group_note")
                .href(
                    "self",
                    HrefDescriptor::new(endpoint::GROUPS_NOTES).with_chain([
                        ("boards_pk", Locator::path("parent.board.id")),
                        ("groups_pk", Locator::from(NOTE_GROUP)),
                    ])?,
                )
                .scalar("content", content.clone())
                .nested("edited_by", "edited_by", user.clone(), false)
                .scalar("last_edited", last_edited)
                .build(),
        );

        let note_write = Arc::new(
            Schema::builder("note_write")
                .scalar(
                    "id",
                    ScalarField::new("id", FieldKind::Uuid { version: 4 }).write_only(),
                )
                .scalar("content", content.default_value(""))
                .hidden("edited_by", Producer::CURRENT_USER)
                .build(),
        );

        let group_self = HrefDescriptor::new(endpoint::GROUPS_DETAIL)
            .with_chain([("boards_pk", "board.id")])?;
        let group_title = ScalarField::text("title", None, Some(Group::TITLE_MAX));
        let group_color = ScalarField::new("color", FieldKind::HexColor);

        let group_list = Arc::new(
            Schema::builder("group_list")
                .href("self", group_self.clone())
                .scalar("title", group_title.clone())
                .scalar("color", group_color.clone())
                .deferred(
                    "notes",
                    group_self.clone().referring_field("notes"),
                    Counter::attribute("note_count"),
                )
                .build(),
        );

        let group_detail = Arc::new(
            Schema::builder("group_detail")
                .href("self", group_self)
                .scalar("title", group_title)
                .scalar("color", group_color)
                .nested("notes", "notes", group_note.clone(), true)
                .build(),
        );

        let board_title = ScalarField::text("title", Some(Board::TITLE_MIN), Some(Board::TITLE_MAX));
        let board_self = HrefDescriptor::new(endpoint::BOARDS_DETAIL);

        let board_list = Arc::new(
            Schema::builder("board_list")
                .href("self", board_self.clone())
                .scalar("title", board_title.clone())
                .nested("owner", "owner", user.clone(), false)
                .nested("members", "members", user.clone(), true)
                .deferred(
                    "notes",
                    board_self.clone().referring_field("notes"),
                    Counter::attribute("note_count"),
                )
                .deferred(
                    "groups",
                    board_self.clone().referring_field("groups"),
                    Counter::attribute("group_count"),
                )
                .build(),
        );

        let board_detail = Arc::new(
            Schema::builder("board_detail")
                .href("self", board_self)
                .scalar("title", board_title.clone())
                .nested("owner", "owner", user.clone(), false)
                .nested("members", "members", user.clone(), true)
                .nested("notes", "notes", board_note.clone(), true)
                .nested("groups", "groups", group_list.clone(), true)
                .build(),
        );

        let board_create = Arc::new(
            Schema::builder("board_create")
                .scalar("title", board_title)
                .scalar(
                    "members",
                    ScalarField::new("members", FieldKind::IdList { allow_empty: true })
                        .default_value(Value::Array(Vec::new())),
                )
                .hidden("owner", Producer::CURRENT_USER)
                .rule(Rule::new("owner_in_members", owner_in_members))
                .build(),
        );

        let members = Arc::new(
            Schema::builder("members")
                .nested("members", "members", user.clone(), true)
                .build(),
        );

        let member_write = Arc::new(
            Schema::builder("member_write")
                .scalar(
                    "members",
                    ScalarField::new("members", FieldKind::IdList { allow_empty: true }),
                )
                .build(),
        );

        Ok(Self {
            user,
            board_list,
            board_detail,
            board_create,
            members,
            member_write,
            group_list,
            group_detail,
            board_note,
            group_note,
            note_write,
        })
    }

    pub fn all(&self) -> [&Arc<Schema>; 11] {
        [
            &self.user,
            &self.board_list,
            &self.board_detail,
            &self.board_create,
            &self.members,
            &self.member_write,
            &self.group_list,
            &self.group_detail,
            &self.board_note,
            &self.group_note,
            &self.note_write,
        ]
    }

    /// Checks every descriptor of every schema against `routes`.
    pub fn check(&self, routes: &RouteTable) -> Result<(), HrefError> {
        for schema in self.all() {
            for descriptor in schema.descriptors() {
                routes.check(descriptor)?;
            }
        }
        Ok(())
    }
}
