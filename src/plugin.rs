//! Plugin notification bus. Two events fire around Changer lock
//! acquisition/release; the bus itself is an out-of-scope collaborator,
//! injected at `Changer` construction rather than reached through
//! process-wide state.

/// Events the lock protocol fires, in order: `ChangerLock` after the
/// write lock is taken but before any helper runs, `ChangerUnlock`
/// before releasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginEvent {
    ChangerLock,
    ChangerUnlock,
}

/// Context handed to the plugin for an event -- just enough for a
/// plugin to know which changer/job/drive this concerns.
#[derive(Debug, Clone)]
pub struct PluginEventContext {
    pub changer_name: String,
    pub job_name: String,
    pub drive_index: u32,
}

/// A plugin's verdict on an event. Only `ChangerLock` can be vetoed;
/// `ChangerUnlock` is fire-and-forget notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginVerdict {
    Ok,
    Vetoed,
}

pub trait PluginBus: Send + Sync {
    fn emit_event(&self, kind: PluginEvent, ctx: &PluginEventContext) -> PluginVerdict;
}

/// A plugin bus with no plugins attached: never vetoes.
pub struct NullPluginBus;

impl PluginBus for NullPluginBus {
    fn emit_event(&self, _kind: PluginEvent, _ctx: &PluginEventContext) -> PluginVerdict {
        PluginVerdict::Ok
    }
}
