//! Team command - team administration.

use anyhow::Result;
use clap::{Args, Subcommand};

use super::Context;

#[derive(Args, Debug)]
pub struct TeamArgs {
    #[command(subcommand)]
    pub command: TeamCommand,
}

#[derive(Subcommand, Debug)]
pub enum TeamCommand {
    /// Create a team inside an organization
    Add { organization: String, team: String },

    /// Add a user to a team, or change their role
    Member {
        organization: String,
        team: String,
        username: String,

        /// Grant admin rights
        #[arg(long)]
        admin: bool,
    },

    /// List a team's members
    Members {
        organization: String,
        team: String,

        /// Only list admins
        #[arg(long)]
        admins: bool,
    },
}

/// Run the team command.
pub async fn run(args: TeamArgs, ctx: &Context) -> Result<()> {
    let store = ctx.admin_store()?;

    match args.command {
        TeamCommand::Add { organization, team } => {
            store.create_team(&organization, &team)?;
            println!("Created team {}/{}", organization, team);
        }
        TeamCommand::Member {
            organization,
            team,
            username,
            admin,
        } => {
            store.add_team_member(&organization, &team, &username, admin)?;
            let role = if admin { "admin" } else { "member" };
            println!("{} is now {} of {}/{}", username, role, organization, team);
        }
        TeamCommand::Members {
            organization,
            team,
            admins,
        } => {
            for username in store.team_members(&organization, &team, admins)? {
                println!("{}", username);
            }
        }
    }
    Ok(())
}
