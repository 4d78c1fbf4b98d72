//! 数据结构定义
//!
//! 定义账户、权限、事件等持久化数据结构

pub mod account;
pub mod permission;
pub mod event;

pub use account::{Account, EMPTY_CODE_HASH};
pub use permission::{Permissions, PermFlag, CONTRACT_PERMISSIONS};
pub use event::{Event, EventContext};
