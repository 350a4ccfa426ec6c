//! Hierarchical policy assignment and resolution for HR time tracking.
//!
//! Policies (change policies, vacation policies, work schedules, ...) are bound
//! to an organization, a team or a single employee. [`resolver`] picks the one
//! that applies to an employee; [`window`] turns a resolved change policy and an
//! entry date into an edit permission; [`service`] wraps both with the admin
//! operations that create and retire policies and assignments.

pub mod approvals;
pub mod assignment;
pub mod authz;
pub mod clock;
pub mod config;
pub mod directory;
pub mod error;
pub mod ids;
pub mod model;
pub mod resolver;
pub mod routing;
pub mod service;
pub mod snapshot;
pub mod store;
pub mod window;

pub use assignment::{Assignment, NewAssignment, Scope, ScopeType, Subject};
pub use error::{ErrorKind, MutationOutcome, PolicyError};
pub use model::{
    ChangePolicy, ChangePolicyInput, ChangePolicyPatch, ChangePolicyRules, NewPolicy, Policy,
    PolicyFamily, PolicyPatch, PolicyRules,
};
pub use resolver::AssignmentResolver;
pub use service::{EditDecision, PolicyService};
pub use window::{PermissionClass, WindowClassifier};
