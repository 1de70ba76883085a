mod convert;
mod diff;
mod path;
mod project;

pub use convert::{convert_text, from_json, infer, to_text};
pub use diff::{Change, ChangeKind, diff};
pub use path::{Path, PathSegment, get, get_mut, set};
pub use project::{ClassRule, ProjectionOptions, to_json};
