//! Transaction helpers shared by the table facade

use crate::observability::Logger;
use crate::session::{StorageResult, StorageSession};
use crate::status::ResultStatus;

/// Begins a transaction unless one is already open
pub fn begin_transaction<S: StorageSession>(session: &mut S) -> StorageResult<()> {
    if session.in_transaction() {
        return Ok(());
    }
    session.begin()
}

/// Commits when `status` is a success, rolls back otherwise
pub fn finalise_transaction<S: StorageSession>(
    session: &mut S,
    status: &ResultStatus,
) -> StorageResult<()> {
    if status.is_ok() {
        session.commit()
    } else {
        session.rollback()
    }
}

/// Runs `op`, owning the transaction when `auto_session` is set and none is
/// open yet. Any error becomes a 500 status.
pub(crate) fn run_with_session<S, F>(
    session: &mut S,
    auto_session: bool,
    event: &str,
    op: F,
) -> ResultStatus
where
    S: StorageSession,
    F: FnOnce(&mut S) -> StorageResult<ResultStatus>,
{
    let owns_transaction = auto_session && !session.in_transaction();
    if owns_transaction {
        if let Err(e) = session.begin() {
            Logger::error(event, &[("reason", &e.to_string())]);
            return ResultStatus::from(&e);
        }
    }

    let status = match op(session) {
        Ok(status) => status,
        Err(e) => {
            Logger::error(event, &[("reason", &e.to_string())]);
            ResultStatus::from(&e)
        }
    };

    if owns_transaction {
        if let Err(e) = finalise_transaction(session, &status) {
            Logger::error(event, &[("reason", &e.to_string())]);
            // commit failed; release the transaction before reporting
            let _ = session.rollback();
            return ResultStatus::from(&e);
        }
    }
    status
}
