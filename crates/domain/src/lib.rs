//! 课堂提问系统核心领域模型
//!
//! 包含课堂会话、提问等核心实体，以及可见性、状态流转和房间命名等业务规则。

pub mod errors;
pub mod question;
pub mod room;
pub mod session;
pub mod value_objects;

// 重新导出常用类型
pub use errors::*;
pub use question::*;
pub use room::*;
pub use session::*;
pub use value_objects::*;
