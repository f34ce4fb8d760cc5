//! Constants used throughout schemapress

/// Default per-case solver time limit in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Upper bound on mined dictionary entries (one key letter each)
pub const MAX_DICTIONARY_ENTRIES: usize = 26;

/// Default number of mined dictionary entries
pub const DEFAULT_DICTIONARY_ENTRIES: usize = 16;

/// Shortest identifier prefix considered for a dictionary entry
pub const DEFAULT_MIN_PREFIX_LEN: usize = 3;

/// Sigils tried, in order, as the first character of mined dictionary keys
pub const KEY_SIGILS: &[char] = &['$', '~', '@', '%', '&', '§'];

/// Separator between a dictionary key and its expansion in the legend
pub const DEFINITION_SEPARATOR: &str = "=";

/// Terminator of one legend definition
pub const DEFINITION_TERMINATOR: &str = ";";

/// Solver nodes explored between wall-clock checks
pub const TIME_CHECK_INTERVAL: u64 = 64;

/// Tolerance used when comparing fractional bounds against integral objectives
pub const BOUND_EPSILON: f64 = 1e-6;
