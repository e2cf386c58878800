//! Operator CLI for gatelock.
//!
//! Lists currently claimed locks and resolves pending approvals. This
//! tool is the only writer of `approved=true`; the resource binary can
//! only claim, release, and force rejections.

use clap::{Parser, Subcommand};
use gatelock::error::Result;
use gatelock::exit_codes;
use gatelock::logging;
use gatelock::operator;
use gatelock::repository::LockRepository;
use gatelock::store::{DEFAULT_STORE_DIR, DirStore};
use std::path::PathBuf;
use std::process::ExitCode;

/// Gatelock operator tool.
#[derive(Parser, Debug)]
#[command(name = "gatelock-admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Root directory of the record store.
    #[arg(long, default_value = DEFAULT_STORE_DIR)]
    store_dir: PathBuf,

    /// Increase output verbosity.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: AdminCommand,
}

/// Available operator commands.
#[derive(Subcommand, Debug)]
enum AdminCommand {
    /// List all currently claimed locks.
    List,

    /// Approve a claimed lock, letting its waiters proceed.
    Approve(IdArgs),

    /// Reject a claimed lock, failing its waiters.
    Reject(IdArgs),
}

/// Arguments naming a lock by identity.
#[derive(Parser, Debug)]
struct IdArgs {
    /// Identity of the lock to decide on.
    #[arg(long)]
    id: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match dispatch(cli) {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::from(err.exit_code() as u8)
        }
    }
}

fn dispatch(cli: Cli) -> Result<()> {
    let repo = LockRepository::new(DirStore::new(cli.store_dir));

    match cli.command {
        AdminCommand::List => {
            let locks = repo.find_claimed()?;
            if locks.is_empty() {
                println!("There is no waiting approval");
            } else {
                println!("{}", operator::render_claimed(&locks));
            }
            Ok(())
        }
        AdminCommand::Approve(args) => {
            let lock = operator::approve(&repo, &args.id)?;
            println!("The lock {} has been approved", lock.id);
            Ok(())
        }
        AdminCommand::Reject(args) => {
            let lock = operator::reject(&repo, &args.id)?;
            println!("The lock {} has been rejected", lock.id);
            Ok(())
        }
    }
}
