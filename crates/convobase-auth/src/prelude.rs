pub use crate::authn::{
    BearerResolver, CognitoConfig, CognitoIdentityProvider, IdentityProvider,
    MemoryIdentityProvider, SignInTokens, SignUpOutcome, SubjectBearerResolver,
};
pub use crate::errors::AuthError;
pub use crate::policy::{
    allowed_visibilities, can_access_file, can_create_user, can_see_user, visibility_allowed,
};
