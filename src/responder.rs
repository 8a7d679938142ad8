//! Operator responder surface: the opaque line-oriented operator
//! console socket this core sends progress/diagnostic lines to. The
//! socket itself is out of scope; `Responder` is the one interface
//! this crate needs from it, and the response codes are centralized
//! here so they're grep-able in one place instead of scattered as
//! magic numbers through the engine.

/// Response codes observed by operators and their tests.
pub mod codes {
    pub const LOADED_PROBE_ISSUED: u32 = 3301;
    pub const LOADED_PROBE_RESULT: u32 = 3302;
    pub const LOAD_ISSUED: u32 = 3304;
    pub const LOAD_OK: u32 = 3305;
    pub const GENERIC_COMMAND_ISSUED: u32 = 3306;
    pub const UNLOAD_ISSUED: u32 = 3307;
    pub const TRANSFER_OK: u32 = 3308;
    pub const BAD_LOADED_PROBE: u32 = 3991;
    pub const LOAD_FAILED: u32 = 3992;
    pub const NOT_AN_AUTOCHANGER: u32 = 3993;
    pub const BAD_UNLOAD: u32 = 3995;
    pub const OPEN_PIPE_FAILED: u32 = 3996;
    pub const BAD_UNLOAD_SIBLING: u32 = 3997;
    pub const GENERIC_CHANGER_ERROR: u32 = 3998;
}

/// The operator console socket collaborator: opaque line send, out of
/// scope beyond this.
pub trait Responder: Send + Sync {
    fn send_line(&self, line: &str);
}

/// A `Responder` that does nothing -- useful when an operation isn't
/// driven from the operator console (e.g. an ordinary backup job).
pub struct NullResponder;

impl Responder for NullResponder {
    fn send_line(&self, _line: &str) {}
}

/// Collects lines in order, for tests.
#[derive(Default)]
pub struct RecordingResponder {
    lines: std::sync::Mutex<Vec<String>>,
}

impl RecordingResponder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl Responder for RecordingResponder {
    fn send_line(&self, line: &str) {
        self.lines.lock().unwrap().push(line.to_string());
    }
}
