//! `volunteerdesk-auth`: identity model and the role/area-scoped policy.
//!
//! Pure: no storage, no transport. Stores hand in `Subject`s and `Target`s,
//! the `Policy` answers allow/deny.

pub mod area;
pub mod explain;
pub mod policy;
pub mod resource;
pub mod roles;
pub mod scope;
pub mod subject;
pub mod user;

pub use area::{NewWorkArea, WorkArea, WorkAreaPatch};
pub use explain::{AuthorizationExplanation, DenialReason, SubjectState};
pub use policy::{AuthzError, Decision, DenialKind, Policy};
pub use resource::{Action, ResourceKind, Target, UserTarget, Visibility};
pub use roles::Role;
pub use scope::{ScopeResolver, UnresolvedScope};
pub use subject::Subject;
pub use user::{NewUser, User, UserPatch};
