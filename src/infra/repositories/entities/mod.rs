//! SeaORM entity definitions
//!
//! These are database-specific entities separate from domain models.

pub mod generated_code;
pub mod incremental_config;
pub mod organization;
pub mod permission;
pub mod role;
pub mod role_permission;
pub mod system_variable;
pub mod system_variable_group;
pub mod system_variable_value;
pub mod user;
pub mod user_role;
