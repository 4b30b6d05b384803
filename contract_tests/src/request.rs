//! Request envelope contract tests

// ===== Field Names =====
pub const FIELD_METHOD_PATH: &str = "methodPath";
pub const FIELD_POSITIONAL_ARGS: &str = "positionalArgs";
pub const FIELD_NAMED_ARGS: &str = "namedArgs";

pub const REQUEST_FIELDS: [&str; 3] = [FIELD_METHOD_PATH, FIELD_POSITIONAL_ARGS, FIELD_NAMED_ARGS];
