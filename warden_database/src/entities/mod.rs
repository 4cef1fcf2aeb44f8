pub mod permission;
pub mod role;
pub mod role_permission;
pub mod subject_permission;
pub mod subject_role;
