//! User commands: registration, invitations, session tokens and plans.

use serde::Serialize;

use super::{format_millis, parse_enum, print_json, Context};
use crate::cli::UserCommands;
use crate::error::{Error, Result};
use crate::model::{Plan, SubscriptionStatus, User, UserRole, UserSubscription};
use crate::server::auth::{issue_session, SESSION_TTL_DAYS};
use crate::storage::SqliteStorage;

#[derive(Serialize)]
struct MeOutput {
    #[serde(flatten)]
    user: User,
    subscription: UserSubscription,
}

#[derive(Serialize)]
struct TokenOutput<'a> {
    email: &'a str,
    token: String,
    expires_in_days: i64,
}

/// Execute a user command.
///
/// # Errors
///
/// Returns an error if the user doesn't exist (or already exists for `add`
/// and `invite`), or a role, plan or status doesn't parse.
pub fn execute(command: &UserCommands, ctx: &Context<'_>) -> Result<()> {
    let mut storage = ctx.open()?;

    match command {
        UserCommands::Me => {
            let user = ctx.current_user(&storage)?;
            let subscription = storage.get_subscription(&user.email)?;
            if ctx.json {
                return print_json(&MeOutput { user, subscription });
            }
            print_user(&user);
            println!("  Plan: {} ({})", subscription.plan, subscription.status);
            Ok(())
        }
        UserCommands::List => {
            let users = storage.list_users()?;
            if crate::is_silent() {
                for u in &users {
                    println!("{}", u.email);
                }
            } else if ctx.json {
                print_json(&serde_json::json!({ "users": users, "count": users.len() }))?;
            } else if users.is_empty() {
                println!("No users yet.");
                println!("\nRegister one with: vt user add <email>");
            } else {
                for u in &users {
                    println!(
                        "  {:<32} {:<6} {:<8} {}",
                        u.email,
                        u.role,
                        u.status,
                        u.full_name.as_deref().unwrap_or("")
                    );
                }
            }
            Ok(())
        }
        UserCommands::Add { email, name, role } => {
            let mut user = User::new(email);
            user.full_name = name.clone();
            user.role = parse_enum::<UserRole>("user role", role)?;
            create(&mut storage, ctx, &user, "Registered")
        }
        UserCommands::Invite { email, role } => {
            let role = parse_enum::<UserRole>("user role", role)?;
            let inviter = ctx.actor();
            let user = User::invited(email, role, &inviter);
            create(&mut storage, ctx, &user, "Invited")?;
            tracing::info!(email = %user.email, invited_by = %inviter, "invitation recorded");
            Ok(())
        }
        UserCommands::Token { email } => {
            let email = email.to_lowercase();
            let token = issue_session(&mut storage, &email, &ctx.actor())?;
            if crate::is_silent() {
                println!("{token}");
            } else if ctx.json {
                print_json(&TokenOutput {
                    email: &email,
                    token,
                    expires_in_days: SESSION_TTL_DAYS,
                })?;
            } else {
                println!("Session token for {email} (valid {SESSION_TTL_DAYS} days):");
                println!("  {token}");
                println!();
                println!("Send it as `Authorization: Bearer <token>`. It is not shown again.");
            }
            Ok(())
        }
        UserCommands::Plan { email, set, status } => {
            let email = email.to_lowercase();
            if storage.get_user(&email)?.is_none() {
                return Err(Error::not_found("User", &email));
            }
            let subscription = match set {
                Some(plan) => {
                    let plan = parse_enum::<Plan>("plan", plan)?;
                    let status = parse_enum::<SubscriptionStatus>("subscription status", status)?;
                    storage.set_plan(&email, plan, status, &ctx.actor())?
                }
                None => storage.get_subscription(&email)?,
            };

            if ctx.json {
                print_json(&subscription)?;
            } else if !crate::is_silent() {
                println!("{email}: {} ({})", subscription.plan, subscription.status);
            }
            Ok(())
        }
    }
}

fn create(storage: &mut SqliteStorage, ctx: &Context<'_>, user: &User, verb: &str) -> Result<()> {
    storage.create_user(user, &ctx.actor())?;

    if crate::is_silent() {
        println!("{}", user.email);
    } else if ctx.json {
        print_json(user)?;
    } else {
        println!("{verb} {} as {}", user.email, user.role);
    }
    Ok(())
}

fn print_user(user: &User) {
    println!("{}", user.full_name.as_deref().unwrap_or(&user.email));
    println!("  Email: {}", user.email);
    println!("  Role: {}", user.role);
    println!("  Status: {}", user.status);
    if let Some(inviter) = &user.invited_by {
        println!("  Invited by: {inviter}");
    }
    println!("  Since: {}", format_millis(user.created_at));
}
