pub mod actions;
pub mod fs_atomic;
pub mod paths;
pub mod url_template;
