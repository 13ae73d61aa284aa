//! EPUB package resolution: container, package document, navigation.

mod nav;
mod parser;
mod reader;

pub use nav::parse_nav;
pub use parser::{OpfData, parse_container_xml, parse_ncx, parse_opf};
pub use reader::Publication;
