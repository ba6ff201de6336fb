use std::io::{Read, Write};
use chrono::NaiveDate;
use imap::Session;
use config::AccountConfig;
use errors::*;
use utils;
use IMAPConnection;
use IMAPSession;

/// The operations the cleanup needs from a selected folder.
pub trait Mailbox {
    /// UIDs of all messages received before `date`, an IMAP date token,
    /// in ascending order.
    fn search_before(&mut self, date: &str) -> Result<Vec<u32>>;
    fn flag_deleted(&mut self, uid: u32) -> Result<()>;
    fn expunge(&mut self) -> Result<()>;
}

impl<T: Read + Write> Mailbox for Session<T> {
    fn search_before(&mut self, date: &str) -> Result<Vec<u32>> {
        let mut uids: Vec<u32> = self.uid_search(format!("BEFORE {}", date))?
            .into_iter()
            .collect();
        uids.sort();
        Ok(uids)
    }

    fn flag_deleted(&mut self, uid: u32) -> Result<()> {
        let _ = self.uid_store(uid.to_string(), "+FLAGS (\\Deleted)")?;
        Ok(())
    }

    fn expunge(&mut self) -> Result<()> {
        let _ = Session::expunge(self)?;
        Ok(())
    }
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Outcome {
    DryRun,
    NothingToDelete,
    Deleted,
}

#[derive(Debug)]
pub struct CleanupReport {
    pub cutoff: String,
    pub uids: Vec<u32>,
    pub outcome: Outcome,
}

/// Searches for messages received before `cutoff` and, unless `dry_run`,
/// flags each of them deleted and expunges once all flags are set.
pub fn clean<M: Mailbox, W: Write>(mailbox: &mut M,
                                   cutoff: NaiveDate,
                                   days: u32,
                                   dry_run: bool,
                                   out: &mut W)
                                   -> Result<CleanupReport> {
    let date = utils::imap_date(cutoff);
    trace!("Searching for messages received before {}", date);
    let uids = mailbox.search_before(&date).chain_err(|| ErrorKind::SearchError)?;
    writeln!(out, "Number of messages received before {} ({} days): {}", date, days, uids.len())?;

    let outcome = if dry_run {
        writeln!(out, "NOT deleted - dry run.")?;
        Outcome::DryRun
    } else if uids.is_empty() {
        writeln!(out, "Nothing to delete.")?;
        Outcome::NothingToDelete
    } else {
        for &uid in &uids {
            mailbox.flag_deleted(uid).chain_err(|| ErrorKind::DeletionError(uid))?;
        }
        mailbox.expunge().chain_err(|| ErrorKind::ExpungeError(uids.len()))?;
        writeln!(out, "Deleted.")?;
        Outcome::Deleted
    };
    debug!("Outcome::{:?}", outcome);

    Ok(CleanupReport {
        cutoff: date,
        uids: uids,
        outcome: outcome,
    })
}

/// One complete run: connect, log in, open the configured folder, clean
/// it and disconnect. A failure after logging in still sends LOGOUT.
///
/// A dry run opens the folder with EXAMINE. The folder is then read-only, so
/// the final CLOSE cannot expunge messages another client flagged deleted.
pub fn run<W: Write>(account: &AccountConfig,
                     days: u32,
                     dry_run: bool,
                     today: NaiveDate,
                     out: &mut W)
                     -> Result<CleanupReport> {
    let cutoff = match utils::cutoff_date(today, days) {
        Some(cutoff) => cutoff,
        None => bail!(ErrorKind::AgeOutOfRange(days)),
    };

    let connection = IMAPConnection::new(account.clone())
        .chain_err(|| ErrorKind::ConnectionError)?;
    let mut session = connection.login().chain_err(|| ErrorKind::AuthenticationError)?;

    let report = match clean_folder(&mut session, &account.folder, cutoff, days, dry_run, out) {
        Ok(report) => report,
        Err(e) => {
            if let Err(logout) = session.logout() {
                debug!("LOGOUT after failure: {}", logout);
            }
            return Err(e);
        }
    };

    if let Err(e) = session.close() {
        warn!("Closing {} failed: {}", account.folder, e);
    }
    if let Err(e) = session.logout() {
        warn!("Logout failed: {}", e);
    }
    Ok(report)
}

fn clean_folder<W: Write>(session: &mut IMAPSession,
                          folder: &str,
                          cutoff: NaiveDate,
                          days: u32,
                          dry_run: bool,
                          out: &mut W)
                          -> Result<CleanupReport> {
    let mailbox = if dry_run {
        trace!("Cmd: EXAMINE");
        session.examine(folder)
    } else {
        trace!("Cmd: SELECT");
        session.select(folder)
    };
    let mailbox = mailbox.chain_err(|| ErrorKind::FolderError(folder.to_string()))?;
    debug!("{} holds {} messages", folder, mailbox.exists);
    clean(session, cutoff, days, dry_run, out)
}
