//! Authorization policy for project, task and file resources.
//!
//! Pure decision functions: callers load the relationship facts (ownership,
//! uploader, creator) and ask whether an already-authenticated actor may
//! perform an action. Missing authentication is handled before this layer;
//! the policy never emits an "unauthorized" outcome, only denials.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    #[error("insufficient role for this action")]
    InsufficientRole,
    #[error("not the owner of this resource")]
    NotResourceOwner,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Role {
    Admin,
    TeamLeader,
    Member,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::TeamLeader => "team_leader",
            Role::Member => "member",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Role::Admin),
            "team_leader" => Some(Role::TeamLeader),
            "member" => Some(Role::Member),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

/// Every verb a handler can ask about. Closed set: adding a route means
/// adding a variant, and the match in [`can_perform`] must account for it.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Action {
    ViewProject,
    CreateProject,
    UpdateProject,
    DeleteProject,
    AddMember,
    RemoveMember,
    ViewTask,
    CreateTask,
    UpdateTask,
    DeleteTask,
    CreateComment,
    UploadFile,
    ViewFile,
    DeleteFile,
    ViewActivity,
}

/// Relationship facts about the resource an action targets.
#[derive(Copy, Clone, Debug)]
pub enum Resource {
    Project {
        owner_id: Uuid,
    },
    Task {
        creator_id: Uuid,
        project_owner_id: Uuid,
    },
    File {
        uploaded_by: Uuid,
        project_owner_id: Option<Uuid>,
    },
    /// Creates, reads and other actions with no ownership component.
    None,
}

pub fn can_perform(actor: &Actor, action: Action, resource: &Resource) -> Result<(), Denial> {
    if actor.role == Role::Admin {
        return Ok(());
    }
    match action {
        // Role gate first, ownership second; the gate failing reports the
        // role denial, not the ownership one.
        Action::AddMember | Action::RemoveMember => {
            if actor.role != Role::TeamLeader {
                return Err(Denial::InsufficientRole);
            }
            require_project_owner(actor, resource)
        }
        Action::UpdateProject | Action::DeleteProject => require_project_owner(actor, resource),
        Action::DeleteTask => match resource {
            Resource::Task {
                creator_id,
                project_owner_id,
            } if actor.id == *creator_id || actor.id == *project_owner_id => Ok(()),
            _ => Err(Denial::NotResourceOwner),
        },
        Action::DeleteFile => match resource {
            Resource::File {
                uploaded_by,
                project_owner_id,
            } if actor.id == *uploaded_by || *project_owner_id == Some(actor.id) => Ok(()),
            _ => Err(Denial::NotResourceOwner),
        },
        Action::ViewProject
        | Action::CreateProject
        | Action::ViewTask
        | Action::CreateTask
        | Action::UpdateTask
        | Action::CreateComment
        | Action::UploadFile
        | Action::ViewFile
        | Action::ViewActivity => Ok(()),
    }
}

fn require_project_owner(actor: &Actor, resource: &Resource) -> Result<(), Denial> {
    match resource {
        Resource::Project { owner_id } if actor.id == *owner_id => Ok(()),
        _ => Err(Denial::NotResourceOwner),
    }
}
