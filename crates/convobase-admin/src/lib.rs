pub mod errors;
pub mod password;
pub mod service;

pub use errors::AdminError;
pub use service::{
    AdminService, CreateUserRequest, CreatedUser, SignInResult, SignUpResult,
};
