pub mod page;
pub mod types;

pub use page::{InputElement, InputKind, Page, PageError, ResultsPanel, SharedPage, Table};
pub use types::*;
