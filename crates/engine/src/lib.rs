pub mod amount;
pub mod classify;
pub mod config;
pub mod dates;
pub mod normalize;
pub mod pipeline;
pub mod predicate;
pub mod session;

pub use amount::parse_amount;
pub use classify::Classifier;
pub use config::{export_rules, import_rules, ConfigError, RuleConfig};
pub use dates::{parse_date, DateParseError};
pub use normalize::{has_amount_cell, normalize_row};
pub use pipeline::{apply_rules, ApplyOutcome};
pub use predicate::{compile, validate_rule, CompileError, CompiledPredicate, EvalError};
pub use session::{RuleUpdate, Session};
