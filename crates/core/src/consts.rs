//! Shared constants for the galley pipeline.

/// Default entry document file name.
pub const DEFAULT_ENTRY: &str = "main.tex";

/// Default work directory, relative to the project root.
pub const DEFAULT_WORK_DIR: &str = "build";

/// Prefix identifying the partial-build directive in the entry document.
pub const PARTIAL_DIRECTIVE: &str = "\\includeonly";

/// Flag handed to the engine when dynamic execution is allowed.
pub const SHELL_ESCAPE_FLAG: &str = "-shell-escape";

/// File the captured engine output is written to inside the work dir.
pub const BUILD_LOG_FILE: &str = "galley-build.log";

/// Environment variable the release token is read from by default.
pub const DEFAULT_TOKEN_ENV: &str = "GALLEY_TOKEN";

/// Fixed epoch handed to the engine so embedded timestamps are
/// reproducible across runs (value is January 1, 1980 00:00:00 UTC).
pub const SOURCE_DATE_EPOCH: &str = "315532800";

/// User agent presented to the release-hosting API.
pub const USER_AGENT: &str = concat!("galley/", env!("CARGO_PKG_VERSION"));
