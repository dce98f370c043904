pub mod drives;
pub mod path_filter;
pub mod walker;
