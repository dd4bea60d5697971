//! Org command - organization administration.

use anyhow::Result;
use clap::{Args, Subcommand};

use super::Context;

#[derive(Args, Debug)]
pub struct OrgArgs {
    #[command(subcommand)]
    pub command: OrgCommand,
}

#[derive(Subcommand, Debug)]
pub enum OrgCommand {
    /// Create an organization
    Add { name: String },

    /// Add a user to an organization, or change their role
    Member {
        organization: String,
        username: String,

        /// Grant admin rights
        #[arg(long)]
        admin: bool,
    },

    /// List an organization's members
    Members {
        organization: String,

        /// Only list admins
        #[arg(long)]
        admins: bool,
    },
}

/// Run the org command.
pub async fn run(args: OrgArgs, ctx: &Context) -> Result<()> {
    let store = ctx.admin_store()?;

    match args.command {
        OrgCommand::Add { name } => {
            store.create_organization(&name)?;
            println!("Created organization {}", name);
        }
        OrgCommand::Member {
            organization,
            username,
            admin,
        } => {
            store.add_organization_member(&organization, &username, admin)?;
            let role = if admin { "admin" } else { "member" };
            println!("{} is now {} of {}", username, role, organization);
        }
        OrgCommand::Members {
            organization,
            admins,
        } => {
            for username in store.organization_members(&organization, admins)? {
                println!("{}", username);
            }
        }
    }
    Ok(())
}
