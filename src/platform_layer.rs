pub mod console;
pub mod error;
pub mod types;

pub use console::ConsolePlatform;
pub use error::{PlatformError, Result as PlatformResult};
pub use types::{
    AppEvent, MenuAction, MenuItemConfig, MessageSeverity, PlatformCommand, PlatformEventHandler,
    TreeItemDescriptor, TreeItemId,
};
