//! Error taxonomy for the autochanger core.
//!
//! Five kinds of failure are distinguished. Configuration, helper, and
//! lock errors are genuinely distinct outcomes callers branch on;
//! plugin veto and busy-drive eviction are folded in as well so every
//! failure path funnels through one enum instead of ad-hoc
//! `anyhow::bail!` strings that callers would have to pattern match on
//! message text.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AutochangerFault {
    /// Missing `changer_name`/`changer_command` at init, or missing
    /// required template fields at call time.
    #[error("configuration error: {0}")]
    Config(String),

    /// Non-zero helper exit or unparseable output. The drive cache has
    /// already been reset to `Unknown` by the time this is returned.
    #[error("helper command failed: {0}")]
    Helper(String),

    /// Write-lock acquisition returned an OS error. This is fatal to
    /// the process -- this library does not call `process::exit`, it
    /// propagates the error and leaves termination to the binary that
    /// links it.
    #[error("fatal: changer lock acquisition failed: {0}")]
    Lock(String),

    /// A plugin vetoed `ChangerLock`. Operation-level failure, not
    /// fatal.
    #[error("changer lock vetoed by plugin")]
    Veto,

    /// A sibling drive remained busy after the eviction retry budget.
    #[error("drive busy, could not evict slot after retries")]
    Busy,
}

pub type Result<T> = std::result::Result<T, anyhow::Error>;
