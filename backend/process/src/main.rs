use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the catalog snapshot the server falls back to
    Snapshot {
        #[arg(long, env = "STORE_URL", default_value = "http://localhost:54321")]
        store_url: String,

        #[arg(long, env = "STORE_KEY", hide_env_values = true)]
        store_key: String,

        #[arg(long, default_value = "catalog.json")]
        out: PathBuf,
    },

    /// Print an argon2 hash for an admin_users row
    HashPassword { password: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    match Args::parse().command {
        Command::Snapshot {
            store_url,
            store_key,
            out,
        } => process::write_snapshot(&store_url, &store_key, &out).await,
        Command::HashPassword { password } => {
            println!("{}", process::hash_password(&password)?);
            Ok(())
        }
    }
}
