//! Mints bearer tokens for the todo APIs, standing in for a real identity
//! provider during local runs and benchmarks.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

#[derive(Parser)]
#[command(name = "make-token")]
#[command(about = "Create a signed bearer token for the todo APIs")]
struct Cli {
    /// Subject (user name) to put in the token
    #[arg(long, default_value = "dev-user")]
    name: String,

    /// Role claims to include; repeat for multiple roles
    #[arg(long)]
    role: Vec<String>,

    /// Token lifetime in seconds
    #[arg(long, default_value_t = 60 * 60 * 24 * 90)]
    valid_for_secs: u64,

    /// Generate fresh signing key material instead of reading JWT_SIGNING_KEY
    #[arg(long)]
    new_key: bool,

    /// Also write the token to this file (e.g. .authtoken for todo-client)
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let key_b64 = if cli.new_key {
        let key = todo_auth::generate_key_material();
        eprintln!("New signing key generated. Export it for the API processes:");
        eprintln!("  export {}={}", todo_auth::SIGNING_KEY_ENV, key);
        key
    } else {
        std::env::var(todo_auth::SIGNING_KEY_ENV)
            .map_err(|_| todo_auth::AuthError::MissingKey)?
    };

    let token = todo_auth::create_token(&key_b64, &cli.name, &cli.role, cli.valid_for_secs)?;

    if let Some(path) = &cli.out {
        let mut file = std::fs::File::create(path)
            .with_context(|| format!("could not create token file '{}'", path.display()))?;
        writeln!(file, "{token}")?;
        eprintln!("Token written to '{}'", path.display());
    }

    println!("{token}");
    Ok(())
}
