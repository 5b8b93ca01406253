//! Bootstrap command - Creates the first super administrator.
//!
//! The account joins the SYSTEM organization with the built-in Super Admin
//! role. It refuses to run once any user holds that role.

use std::sync::Arc;

use crate::cli::args::BootstrapArgs;
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::infra::{Database, NewUserRecord, Persistence, UnitOfWork};
use domain::{
    normalize_email, validate_user_name, Password, User, SUPER_ADMIN_ROLE_ID,
    SYSTEM_ORGANIZATION_ID,
};

/// Execute the bootstrap command
pub async fn execute(args: BootstrapArgs, config: Config) -> AppResult<()> {
    let db = Database::connect(&config).await?;
    let uow = Arc::new(Persistence::new(db.get_connection()));

    let admin = create_super_admin(uow.as_ref(), args).await?;

    tracing::info!(user_id = %admin.id, email = %admin.email, "Super administrator created");
    println!("Created super administrator {} ({})", admin.email, admin.id);
    Ok(())
}

pub async fn create_super_admin<U: UnitOfWork>(uow: &U, args: BootstrapArgs) -> AppResult<User> {
    if uow.roles().count_assignments(SUPER_ADMIN_ROLE_ID).await? > 0 {
        return Err(AppError::validation(
            "A super administrator already exists; manage further accounts through the API",
        ));
    }

    let email = normalize_email(&args.email);
    if uow.users().find_by_email_with_deleted(&email).await?.is_some() {
        return Err(AppError::conflict("Email"));
    }

    let record = NewUserRecord {
        organization_id: SYSTEM_ORGANIZATION_ID,
        email,
        password_hash: Password::new(&args.password)?.into_string(),
        name: validate_user_name(&args.name)?,
        is_active: true,
    };

    uow.transaction(|ctx| {
        Box::pin(async move { ctx.users().create(record, &[SUPER_ADMIN_ROLE_ID]).await })
    })
    .await
}
