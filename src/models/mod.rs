mod account;
mod admin;
mod chat;
mod device;
mod plugin;

pub use account::*;
pub use admin::*;
pub use chat::*;
pub use device::*;
pub use plugin::*;
