//! [`IdentityDirectory`] backed by the Amazon Cognito user pool administration API.

// std
use std::collections::BTreeSet;
// crates.io
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_cognitoidentityprovider::{
	Client,
	types::{
		ExplicitAuthFlowsType, IdentityProviderTypeType, OAuthFlowType, PasswordPolicyType,
		UserPoolClientType, UserPoolMfaType, UserPoolPolicyType, UsernameAttributeType,
		VerifiedAttributeType,
	},
};
// self
use crate::{
	_prelude::*,
	auth::{AppClientId, ScopeSet, UserPoolId},
	provision::{
		AppClientSpec, AppClientState, DirectoryFuture, DomainStatus, FederatedProviderSpec,
		HostedDomainSpec, HostedDomainState, IdentityDirectory, MfaMode, ProvisionError,
		UserPoolSpec,
	},
};

const PAGE_SIZE: i32 = 60;
const DETAIL_CLIENT_ID: &str = "client_id";
const DETAIL_CLIENT_SECRET: &str = "client_secret";
const DETAIL_AUTHORIZE_SCOPES: &str = "authorize_scopes";

/// Cognito administration client scoped to one region.
#[derive(Clone, Debug)]
pub struct CognitoDirectory {
	client: Client,
}
impl CognitoDirectory {
	/// Loads credentials from the default AWS provider chain and targets `region`.
	pub async fn from_env(region: impl Into<String>) -> Self {
		let config = aws_config::defaults(BehaviorVersion::latest())
			.region(Region::new(region.into()))
			.load()
			.await;

		Self::new(&config)
	}

	/// Builds a directory from an already loaded SDK configuration.
	pub fn new(config: &SdkConfig) -> Self {
		Self { client: Client::new(config) }
	}

	async fn find_user_pool_now(&self, name: &str) -> Result<Option<UserPoolId>, ProvisionError> {
		const OPERATION: &str = "ListUserPools";

		let mut next_token = None;

		loop {
			let page = self
				.client
				.list_user_pools()
				.max_results(PAGE_SIZE)
				.set_next_token(next_token)
				.send()
				.await
				.map_err(|e| ProvisionError::api(OPERATION, e))?;

			if let Some(pool) = page.user_pools().iter().find(|pool| pool.name() == Some(name)) {
				let id = pool
					.id()
					.ok_or(ProvisionError::InvalidResponse { operation: OPERATION, field: "Id" })?;

				return Ok(Some(UserPoolId::new(id)?));
			}

			match page.next_token() {
				Some(token) if !token.is_empty() => next_token = Some(token.to_owned()),
				_ => return Ok(None),
			}
		}
	}

	async fn create_user_pool_now(
		&self,
		spec: &UserPoolSpec,
	) -> Result<UserPoolId, ProvisionError> {
		const OPERATION: &str = "CreateUserPool";

		let policy = &spec.password_policy;
		let password_policy = PasswordPolicyType::builder()
			.minimum_length(i32::from(policy.minimum_length))
			.require_uppercase(policy.require_uppercase)
			.require_lowercase(policy.require_lowercase)
			.require_numbers(policy.require_numbers)
			.require_symbols(policy.require_symbols)
			.build();
		let mut request = self
			.client
			.create_user_pool()
			.pool_name(&spec.name)
			.policies(UserPoolPolicyType::builder().password_policy(password_policy).build())
			.mfa_configuration(match spec.mfa {
				MfaMode::Off => UserPoolMfaType::Off,
				MfaMode::Optional => UserPoolMfaType::Optional,
				MfaMode::On => UserPoolMfaType::On,
			});

		if spec.auto_verify_email {
			request = request.auto_verified_attributes(VerifiedAttributeType::Email);
		}
		if spec.email_as_username {
			request = request.username_attributes(UsernameAttributeType::Email);
		}

		let output = request.send().await.map_err(|e| ProvisionError::api(OPERATION, e))?;
		let id = output
			.user_pool()
			.and_then(|pool| pool.id())
			.ok_or(ProvisionError::InvalidResponse { operation: OPERATION, field: "UserPool.Id" })?;

		Ok(UserPoolId::new(id)?)
	}

	async fn find_app_client_now(
		&self,
		pool: &UserPoolId,
		name: &str,
	) -> Result<Option<AppClientState>, ProvisionError> {
		const OPERATION: &str = "ListUserPoolClients";

		let mut next_token = None;

		loop {
			let page = self
				.client
				.list_user_pool_clients()
				.user_pool_id(pool.as_ref())
				.max_results(PAGE_SIZE)
				.set_next_token(next_token)
				.send()
				.await
				.map_err(|e| ProvisionError::api(OPERATION, e))?;
			let found = page
				.user_pool_clients()
				.iter()
				.find(|client| client.client_name() == Some(name))
				.and_then(|client| client.client_id());

			if let Some(client_id) = found {
				let id = AppClientId::new(client_id)?;
				let spec = self.describe_app_client(pool, &id).await?;

				return Ok(Some(AppClientState { id, spec }));
			}

			match page.next_token() {
				Some(token) if !token.is_empty() => next_token = Some(token.to_owned()),
				_ => return Ok(None),
			}
		}
	}

	async fn describe_app_client(
		&self,
		pool: &UserPoolId,
		client: &AppClientId,
	) -> Result<AppClientSpec, ProvisionError> {
		const OPERATION: &str = "DescribeUserPoolClient";

		let output = self
			.client
			.describe_user_pool_client()
			.user_pool_id(pool.as_ref())
			.client_id(client.as_ref())
			.send()
			.await
			.map_err(|e| ProvisionError::api(OPERATION, e))?;
		let current = output
			.user_pool_client()
			.ok_or(ProvisionError::InvalidResponse {
				operation: OPERATION,
				field: "UserPoolClient",
			})?;

		app_client_spec(current)
	}

	async fn create_app_client_now(
		&self,
		pool: &UserPoolId,
		spec: &AppClientSpec,
	) -> Result<AppClientId, ProvisionError> {
		const OPERATION: &str = "CreateUserPoolClient";

		let output = self
			.client
			.create_user_pool_client()
			.user_pool_id(pool.as_ref())
			.client_name(&spec.name)
			.generate_secret(spec.generate_secret)
			.set_explicit_auth_flows(Some(explicit_auth_flows(spec)))
			.allowed_o_auth_flows_user_pool_client(true)
			.set_allowed_o_auth_flows(Some(oauth_flows(spec)))
			.set_allowed_o_auth_scopes(Some(spec.scopes.iter().map(str::to_owned).collect()))
			.set_callback_ur_ls(Some(spec.callback_urls.iter().cloned().collect()))
			.set_logout_ur_ls(Some(spec.logout_urls.iter().cloned().collect()))
			.set_supported_identity_providers(Some(
				spec.supported_identity_providers.iter().cloned().collect(),
			))
			.send()
			.await
			.map_err(|e| ProvisionError::api(OPERATION, e))?;
		let id = output
			.user_pool_client()
			.and_then(|client| client.client_id())
			.ok_or(ProvisionError::InvalidResponse {
				operation: OPERATION,
				field: "UserPoolClient.ClientId",
			})?;

		Ok(AppClientId::new(id)?)
	}

	async fn update_app_client_now(
		&self,
		pool: &UserPoolId,
		client: &AppClientId,
		spec: &AppClientSpec,
	) -> Result<(), ProvisionError> {
		self.client
			.update_user_pool_client()
			.user_pool_id(pool.as_ref())
			.client_id(client.as_ref())
			.client_name(&spec.name)
			.set_explicit_auth_flows(Some(explicit_auth_flows(spec)))
			.allowed_o_auth_flows_user_pool_client(true)
			.set_allowed_o_auth_flows(Some(oauth_flows(spec)))
			.set_allowed_o_auth_scopes(Some(spec.scopes.iter().map(str::to_owned).collect()))
			.set_callback_ur_ls(Some(spec.callback_urls.iter().cloned().collect()))
			.set_logout_ur_ls(Some(spec.logout_urls.iter().cloned().collect()))
			.set_supported_identity_providers(Some(
				spec.supported_identity_providers.iter().cloned().collect(),
			))
			.send()
			.await
			.map_err(|e| ProvisionError::api("UpdateUserPoolClient", e))?;

		Ok(())
	}

	async fn describe_identity_provider_now(
		&self,
		pool: &UserPoolId,
		provider_name: &str,
	) -> Result<Option<FederatedProviderSpec>, ProvisionError> {
		let result = self
			.client
			.describe_identity_provider()
			.user_pool_id(pool.as_ref())
			.provider_name(provider_name)
			.send()
			.await;
		let output = match result {
			Ok(output) => output,
			Err(e)
				if e.as_service_error().is_some_and(|err| err.is_resource_not_found_exception()) =>
				return Ok(None),
			Err(e) => return Err(ProvisionError::api("DescribeIdentityProvider", e)),
		};
		let Some(provider) = output.identity_provider() else {
			return Ok(None);
		};
		let details = provider.provider_details().cloned().unwrap_or_default();
		let detail = |key: &str| details.get(key).cloned().unwrap_or_default();

		Ok(Some(FederatedProviderSpec {
			provider_name: provider.provider_name().unwrap_or(provider_name).to_owned(),
			provider_type: provider
				.provider_type()
				.map(|kind| kind.as_str().to_owned())
				.unwrap_or_default(),
			client_id: detail(DETAIL_CLIENT_ID),
			client_secret: detail(DETAIL_CLIENT_SECRET),
			authorize_scopes: detail(DETAIL_AUTHORIZE_SCOPES),
			attribute_mapping: provider
				.attribute_mapping()
				.map(|mapping| mapping.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
				.unwrap_or_default(),
		}))
	}

	async fn create_identity_provider_now(
		&self,
		pool: &UserPoolId,
		spec: &FederatedProviderSpec,
	) -> Result<(), ProvisionError> {
		self.client
			.create_identity_provider()
			.user_pool_id(pool.as_ref())
			.provider_name(&spec.provider_name)
			.provider_type(IdentityProviderTypeType::from(spec.provider_type.as_str()))
			.set_provider_details(Some(provider_details(spec)))
			.set_attribute_mapping(Some(attribute_mapping(spec)))
			.send()
			.await
			.map_err(|e| ProvisionError::api("CreateIdentityProvider", e))?;

		Ok(())
	}

	async fn update_identity_provider_now(
		&self,
		pool: &UserPoolId,
		spec: &FederatedProviderSpec,
	) -> Result<(), ProvisionError> {
		self.client
			.update_identity_provider()
			.user_pool_id(pool.as_ref())
			.provider_name(&spec.provider_name)
			.set_provider_details(Some(provider_details(spec)))
			.set_attribute_mapping(Some(attribute_mapping(spec)))
			.send()
			.await
			.map_err(|e| ProvisionError::api("UpdateIdentityProvider", e))?;

		Ok(())
	}

	async fn describe_domain_now(
		&self,
		prefix: &str,
	) -> Result<Option<HostedDomainState>, ProvisionError> {
		let output = self
			.client
			.describe_user_pool_domain()
			.domain(prefix)
			.send()
			.await
			.map_err(|e| ProvisionError::api("DescribeUserPoolDomain", e))?;
		// An unknown prefix yields an empty description rather than an error.
		let Some(description) = output.domain_description() else {
			return Ok(None);
		};
		let Some(pool) = description.user_pool_id().filter(|id| !id.is_empty()) else {
			return Ok(None);
		};
		let status = match description.status().map(|status| status.as_str()) {
			Some("ACTIVE") => DomainStatus::Active,
			Some("CREATING") => DomainStatus::Creating,
			Some("UPDATING") => DomainStatus::Updating,
			Some("DELETING") => DomainStatus::Deleting,
			Some("FAILED") => DomainStatus::Failed,
			other => DomainStatus::Other(other.unwrap_or_default().to_owned()),
		};

		Ok(Some(HostedDomainState { user_pool_id: UserPoolId::new(pool)?, status }))
	}

	async fn create_domain_now(
		&self,
		pool: &UserPoolId,
		spec: &HostedDomainSpec,
	) -> Result<(), ProvisionError> {
		self.client
			.create_user_pool_domain()
			.domain(&spec.prefix)
			.user_pool_id(pool.as_ref())
			.send()
			.await
			.map_err(|e| ProvisionError::api("CreateUserPoolDomain", e))?;

		Ok(())
	}
}
impl IdentityDirectory for CognitoDirectory {
	fn find_user_pool<'a>(&'a self, name: &'a str) -> DirectoryFuture<'a, Option<UserPoolId>> {
		Box::pin(self.find_user_pool_now(name))
	}

	fn create_user_pool<'a>(&'a self, spec: &'a UserPoolSpec) -> DirectoryFuture<'a, UserPoolId> {
		Box::pin(self.create_user_pool_now(spec))
	}

	fn find_app_client<'a>(
		&'a self,
		pool: &'a UserPoolId,
		name: &'a str,
	) -> DirectoryFuture<'a, Option<AppClientState>> {
		Box::pin(self.find_app_client_now(pool, name))
	}

	fn create_app_client<'a>(
		&'a self,
		pool: &'a UserPoolId,
		spec: &'a AppClientSpec,
	) -> DirectoryFuture<'a, AppClientId> {
		Box::pin(self.create_app_client_now(pool, spec))
	}

	fn update_app_client<'a>(
		&'a self,
		pool: &'a UserPoolId,
		client: &'a AppClientId,
		spec: &'a AppClientSpec,
	) -> DirectoryFuture<'a, ()> {
		Box::pin(self.update_app_client_now(pool, client, spec))
	}

	fn describe_identity_provider<'a>(
		&'a self,
		pool: &'a UserPoolId,
		provider_name: &'a str,
	) -> DirectoryFuture<'a, Option<FederatedProviderSpec>> {
		Box::pin(self.describe_identity_provider_now(pool, provider_name))
	}

	fn create_identity_provider<'a>(
		&'a self,
		pool: &'a UserPoolId,
		spec: &'a FederatedProviderSpec,
	) -> DirectoryFuture<'a, ()> {
		Box::pin(self.create_identity_provider_now(pool, spec))
	}

	fn update_identity_provider<'a>(
		&'a self,
		pool: &'a UserPoolId,
		spec: &'a FederatedProviderSpec,
	) -> DirectoryFuture<'a, ()> {
		Box::pin(self.update_identity_provider_now(pool, spec))
	}

	fn describe_domain<'a>(
		&'a self,
		prefix: &'a str,
	) -> DirectoryFuture<'a, Option<HostedDomainState>> {
		Box::pin(self.describe_domain_now(prefix))
	}

	fn create_domain<'a>(
		&'a self,
		pool: &'a UserPoolId,
		spec: &'a HostedDomainSpec,
	) -> DirectoryFuture<'a, ()> {
		Box::pin(self.create_domain_now(pool, spec))
	}
}

fn app_client_spec(current: &UserPoolClientType) -> Result<AppClientSpec, ProvisionError> {
	let strings = |values: &[String]| values.iter().cloned().collect::<BTreeSet<_>>();
	let scopes = ScopeSet::new(current.allowed_o_auth_scopes().iter().cloned()).map_err(|_| {
		ProvisionError::InvalidResponse {
			operation: "DescribeUserPoolClient",
			field: "AllowedOAuthScopes",
		}
	})?;

	Ok(AppClientSpec {
		name: current.client_name().unwrap_or_default().to_owned(),
		generate_secret: current.client_secret().is_some(),
		explicit_auth_flows: current
			.explicit_auth_flows()
			.iter()
			.map(|flow| flow.as_str().to_owned())
			.collect(),
		allowed_oauth_flows: current
			.allowed_o_auth_flows()
			.iter()
			.map(|flow| flow.as_str().to_owned())
			.collect(),
		scopes,
		callback_urls: strings(current.callback_ur_ls()),
		logout_urls: strings(current.logout_ur_ls()),
		supported_identity_providers: strings(current.supported_identity_providers()),
	})
}

fn explicit_auth_flows(spec: &AppClientSpec) -> Vec<ExplicitAuthFlowsType> {
	spec.explicit_auth_flows.iter().map(|flow| ExplicitAuthFlowsType::from(flow.as_str())).collect()
}

fn oauth_flows(spec: &AppClientSpec) -> Vec<OAuthFlowType> {
	spec.allowed_oauth_flows.iter().map(|flow| OAuthFlowType::from(flow.as_str())).collect()
}

fn provider_details(spec: &FederatedProviderSpec) -> HashMap<String, String> {
	HashMap::from([
		(DETAIL_CLIENT_ID.to_owned(), spec.client_id.clone()),
		(DETAIL_CLIENT_SECRET.to_owned(), spec.client_secret.clone()),
		(DETAIL_AUTHORIZE_SCOPES.to_owned(), spec.authorize_scopes.clone()),
	])
}

fn attribute_mapping(spec: &FederatedProviderSpec) -> HashMap<String, String> {
	spec.attribute_mapping.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}
