pub mod cat;
pub mod insert;
pub mod list;
