pub use crate::actor::Actor;
pub use crate::file::{FileCategory, FileStatus, FileType, Visibility};
pub use crate::id::Id;
pub use crate::role::{ChatRole, Role};
pub use crate::scope::ScopeIds;
pub use crate::time::Timestamp;
