//! User command - account administration.

use anyhow::Result;
use clap::{Args, Subcommand};

use super::Context;

#[derive(Args, Debug)]
pub struct UserArgs {
    #[command(subcommand)]
    pub command: UserCommand,
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    /// Create a user
    Add {
        username: String,

        /// Initial password
        #[arg(long, env = "KB_PASSWORD")]
        password: String,
    },

    /// Check whether a user exists
    Exists { username: String },
}

/// Run the user command.
pub async fn run(args: UserArgs, ctx: &Context) -> Result<()> {
    let store = ctx.admin_store()?;

    match args.command {
        UserCommand::Add { username, password } => {
            anyhow::ensure!(
                !username.is_empty() && !password.is_empty(),
                "username and password both must be non-empty"
            );
            store.create_user(&username, &password)?;
            println!("Created user {}", username);
        }
        UserCommand::Exists { username } => {
            if store.user_exists(&username)? {
                println!("{} exists", username);
            } else {
                anyhow::bail!("no such user: {}", username);
            }
        }
    }
    Ok(())
}
