use async_trait::async_trait;
use aws_sdk_cognitoidentityprovider::types::{AttributeType, AuthFlowType, MessageActionType};
use aws_sdk_cognitoidentityprovider::Client;

use crate::authn::{IdentityProvider, SignInTokens, SignUpOutcome};
use crate::errors::AuthError;

#[derive(Clone, Debug)]
pub struct CognitoConfig {
    pub user_pool_id: String,
    pub client_id: String,
    pub region: Option<String>,
}

#[derive(Clone)]
pub struct CognitoIdentityProvider {
    client: Client,
    user_pool_id: String,
    client_id: String,
}

impl CognitoIdentityProvider {
    pub async fn new(
        sdk_config: &aws_config::SdkConfig,
        config: CognitoConfig,
    ) -> Result<Self, AuthError> {
        let mut builder = aws_sdk_cognitoidentityprovider::config::Builder::from(sdk_config);
        if let Some(region) = config.region {
            builder =
                builder.region(aws_sdk_cognitoidentityprovider::config::Region::new(region));
        }
        Ok(Self {
            client: Client::from_conf(builder.build()),
            user_pool_id: config.user_pool_id,
            client_id: config.client_id,
        })
    }

    fn attr(name: &str, value: &str) -> Result<AttributeType, AuthError> {
        AttributeType::builder()
            .name(name)
            .value(value)
            .build()
            .map_err(|e| AuthError::provider(&format!("cognito attribute build: {e}")))
    }
}

#[async_trait]
impl IdentityProvider for CognitoIdentityProvider {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<SignUpOutcome, AuthError> {
        let response = self
            .client
            .sign_up()
            .client_id(&self.client_id)
            .username(email)
            .password(password)
            .user_attributes(Self::attr("email", email)?)
            .user_attributes(Self::attr("name", name)?)
            .send()
            .await
            .map_err(|e| AuthError::provider(&format!("cognito SignUp failed: {e}")))?;
        Ok(SignUpOutcome {
            subject_id: response.user_sub().to_string(),
            confirmed: response.user_confirmed(),
        })
    }

    async fn confirm_sign_up(&self, email: &str, code: &str) -> Result<(), AuthError> {
        self.client
            .confirm_sign_up()
            .client_id(&self.client_id)
            .username(email)
            .confirmation_code(code)
            .send()
            .await
            .map_err(|e| AuthError::validation(&format!("confirmation failed: {e}")))?;
        Ok(())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<SignInTokens, AuthError> {
        let response = self
            .client
            .initiate_auth()
            .auth_flow(AuthFlowType::UserPasswordAuth)
            .client_id(&self.client_id)
            .auth_parameters("USERNAME", email)
            .auth_parameters("PASSWORD", password)
            .send()
            .await
            .map_err(|e| AuthError::unauthenticated(&format!("cognito InitiateAuth: {e}")))?;
        let result = response
            .authentication_result()
            .ok_or_else(|| AuthError::unauthenticated("no authentication result"))?;
        Ok(SignInTokens {
            access_token: result.access_token().unwrap_or_default().to_string(),
            id_token: result.id_token().unwrap_or_default().to_string(),
            refresh_token: result.refresh_token().unwrap_or_default().to_string(),
            expires_in: result.expires_in(),
        })
    }

    async fn admin_create_user(
        &self,
        email: &str,
        name: &str,
        temporary_password: &str,
    ) -> Result<String, AuthError> {
        let response = self
            .client
            .admin_create_user()
            .user_pool_id(&self.user_pool_id)
            .username(email)
            .temporary_password(temporary_password)
            .message_action(MessageActionType::Suppress)
            .user_attributes(Self::attr("email", email)?)
            .user_attributes(Self::attr("email_verified", "true")?)
            .user_attributes(Self::attr("name", name)?)
            .send()
            .await
            .map_err(|e| AuthError::provider(&format!("cognito AdminCreateUser failed: {e}")))?;
        response
            .user()
            .and_then(|user| {
                user.attributes()
                    .iter()
                    .find(|attr| attr.name() == "sub")
                    .and_then(|attr| attr.value())
                    .map(str::to_string)
            })
            .ok_or_else(|| AuthError::provider("cognito response missing subject id"))
    }

    async fn update_attributes(&self, email: &str, name: &str) -> Result<(), AuthError> {
        self.client
            .admin_update_user_attributes()
            .user_pool_id(&self.user_pool_id)
            .username(email)
            .user_attributes(Self::attr("name", name)?)
            .send()
            .await
            .map_err(|e| {
                AuthError::provider(&format!("cognito AdminUpdateUserAttributes failed: {e}"))
            })?;
        Ok(())
    }
}
