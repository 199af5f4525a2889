//! XML utilities for navigating catalogue responses and writing requests.

mod utils;
mod writer;

pub use utils::{
    character_string, code_list_value, element_children, find_by_path, find_child,
    find_children, get_tag_name, get_text, matches_name, text_at,
};
pub use writer::XmlWriter;
