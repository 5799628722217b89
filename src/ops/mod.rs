pub mod generate;
pub mod list_ops;
pub mod view_ops;
