pub mod config;
pub mod item;
pub mod list;
pub mod text;
pub mod view_mode;

pub use config::*;
pub use item::*;
pub use list::*;
pub use text::*;
pub use view_mode::*;
