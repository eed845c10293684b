//! Pure capability checks mapping (actor role, action) to allowed/denied.
//!
//! Stateless on purpose: services load the actor's membership, ask the guard,
//! and translate a denial into the matching error. Self-service operations
//! (leave, cancel own request, answer own invitation) are identity checks in
//! the services and never pass through here.

use crate::models::Role;

/// A guarded action within a community.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Change the community's profile fields (name, description, visibility,
    /// images).
    UpdateCommunity,
    /// Change any member's role.
    ChangeRole,
    /// Remove the member currently holding `target`.
    RemoveMember { target: Role },
    /// Invite a user, singly or in bulk.
    Invite,
    /// Accept or reject pending join requests, or list them.
    HandleRequests,
}

pub fn permitted(actor: Role, action: Action) -> bool {
    match action {
        Action::UpdateCommunity | Action::ChangeRole => actor == Role::Admin,
        Action::RemoveMember { target } => match actor {
            Role::Admin => true,
            Role::Moderator => target == Role::User,
            Role::User => false,
        },
        Action::Invite | Action::HandleRequests => actor >= Role::Moderator,
    }
}
