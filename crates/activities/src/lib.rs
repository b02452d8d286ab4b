//! `volunteerdesk-activities`: area-scoped scheduling records.
//!
//! Activities belong to a work area directly; shifts belong to an activity and
//! inherit its area.

pub mod activity;
pub mod resolver;
pub mod shift;

pub use activity::{Activity, ActivityPatch, DEFAULT_ACTIVITY_COLOR, NewActivity};
pub use resolver::{ActivityLookup, AreaResolver};
pub use shift::{NewShift, Shift, ShiftPatch};
