pub mod logging;
pub mod text;

pub use logging::truncate_text;
pub use text::{is_transient, normalize, shares_keywords, tokenize};
