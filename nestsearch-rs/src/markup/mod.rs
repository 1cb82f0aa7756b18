//! Parsers for outliner markup inside block text.

pub mod block_ref;
pub mod code;
pub mod daily;
pub mod page_ref;

pub use block_ref::parse_block_refs;
pub use code::{find_code_spans, is_in_code_span, CodeSpan};
pub use daily::{is_daily_title, parse_daily_title};
pub use page_ref::parse_page_refs;
