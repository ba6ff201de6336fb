extern crate mail_cleaner;
extern crate chrono;
extern crate clap;
extern crate env_logger;
#[macro_use]
extern crate log;

use std::io;
use std::path::PathBuf;
use std::process;
use chrono::Local;
use clap::Parser;
use mail_cleaner::cleaner;
use mail_cleaner::config::AccountConfig;
use mail_cleaner::errors::*;

/// Cleanup old mails from IMAP folder
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Path to the YAML configuration holding a mail.receive section
    #[clap(long)]
    config: PathBuf,

    /// Delete mails which are older than this number of days
    #[clap(long)]
    days: u32,

    /// Do not really delete the mails
    #[clap(long)]
    dry_run: bool,
}

fn run(args: &Args) -> Result<()> {
    let account = AccountConfig::load(&args.config)?;
    let today = Local::now().date_naive();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    cleaner::run(&account, args.days, args.dry_run, today, &mut out)?;
    Ok(())
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    trace!("{:?}", args);

    if let Err(e) = run(&args) {
        for cause in e.iter().skip(1) {
            debug!("caused by: {}", cause);
        }
        eprintln!("{}", e);
        process::exit(1);
    }
}
