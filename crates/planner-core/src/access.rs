//! Board access policy.
//!
//! Every request that touches a board, its groups or its notes is checked
//! here. Users outside a board are told the board does not exist; members
//! that lack the required role get a permission error with a fixed message.

use crate::types::{Board, UserId};

/// Detail returned when a member attempts an owner-only action.
pub const OWNER_ONLY: &str = "Only the board owner may perform this action.";

/// Detail returned when a membership removal includes the owner.
pub const OWNER_NOT_REMOVABLE: &str = "The board owner cannot be removed.";

/// Why a request against a board was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    /// The board is hidden from this user.
    #[error("Not found.")]
    NotFound,

    #[error("{0}")]
    Forbidden(&'static str),
}

/// Something a user may try to do with a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardAction {
    /// Read the board, its groups and its notes.
    View,
    /// Create, update or delete groups and notes.
    EditContent,
    /// Change the board's own fields or delete it.
    ChangeSettings,
    /// Add or remove members. The owner itself is never removable.
    ManageMembers,
}

pub fn can_view(user: UserId, board: &Board) -> bool {
    board.is_member(user)
}

pub fn can_edit_content(user: UserId, board: &Board) -> bool {
    board.is_member(user)
}

pub fn can_mutate_settings(user: UserId, board: &Board) -> bool {
    board.is_owner(user)
}

pub fn can_manage_membership(user: UserId, board: &Board) -> bool {
    board.is_owner(user)
}

/// Checks `action` for `user`, hiding the board from non-members.
pub fn authorize(user: UserId, board: &Board, action: BoardAction) -> Result<(), AccessError> {
    if !can_view(user, board) {
        return Err(AccessError::NotFound);
    }
    let allowed = match action {
        BoardAction::View => true,
        BoardAction::EditContent => can_edit_content(user, board),
        BoardAction::ChangeSettings => can_mutate_settings(user, board),
        BoardAction::ManageMembers => can_manage_membership(user, board),
    };
    if allowed {
        Ok(())
    } else {
        Err(AccessError::Forbidden(OWNER_ONLY))
    }
}

/// Rejects a removal set that contains the board owner.
pub fn check_member_removal(board: &Board, removed: &[UserId]) -> Result<(), AccessError> {
    if removed.contains(&board.owner) {
        return Err(AccessError::Forbidden(OWNER_NOT_REMOVABLE));
    }
    Ok(())
}
