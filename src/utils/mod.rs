pub mod error;
pub mod profile_parser;
pub mod rating_utils;
pub mod table_renderer;
