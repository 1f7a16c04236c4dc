pub use crate::{codes, ErrorBuilder, ErrorCode, ErrorObj, PublicErrorView};
