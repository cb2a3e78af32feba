//! Idempotent provisioning of the identity provider's resources.
//!
//! [`IdentityDirectory`] is the administrative API seam; [`Provisioner`] layers
//! "create if absent, reconcile if divergent" semantics on top of it, one `ensure_*` operation per
//! resource kind. Running the same [`SetupPlan`] twice creates each resource once.

pub mod memory;
#[cfg(feature = "aws")] pub mod cognito;

pub use memory::MemoryDirectory;
#[cfg(feature = "aws")] pub use cognito::CognitoDirectory;

// std
use std::collections::BTreeSet;
// self
use crate::{
	_prelude::*,
	auth::{AppClientId, ScopeSet, UserPoolId},
	obs,
	provider::hosted_domain_url,
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Boxed future returned by [`IdentityDirectory`] operations.
pub type DirectoryFuture<'a, T> =
	Pin<Box<dyn Future<Output = Result<T, ProvisionError>> + 'a + Send>>;

/// Built-in identity provider name accepted by every app client.
pub const BUILTIN_IDENTITY_PROVIDER: &str = "COGNITO";
/// Provider name and type used for Google federation.
pub const GOOGLE_IDENTITY_PROVIDER: &str = "Google";
/// User pool name used when none is configured.
pub const DEFAULT_USER_POOL_NAME: &str = "HostedLoginUserPool";
/// App client name used when none is configured.
pub const DEFAULT_APP_CLIENT_NAME: &str = "HostedLoginClient";

/// Administrative API of a managed identity provider.
///
/// Lookups return `Ok(None)` for resources that do not exist; only genuine API failures are
/// errors.
pub trait IdentityDirectory
where
	Self: Send + Sync,
{
	/// Finds a user pool by name.
	fn find_user_pool<'a>(&'a self, name: &'a str) -> DirectoryFuture<'a, Option<UserPoolId>>;

	/// Creates a user pool and returns its identifier.
	fn create_user_pool<'a>(&'a self, spec: &'a UserPoolSpec) -> DirectoryFuture<'a, UserPoolId>;

	/// Finds an app client by name and returns its current settings.
	fn find_app_client<'a>(
		&'a self,
		pool: &'a UserPoolId,
		name: &'a str,
	) -> DirectoryFuture<'a, Option<AppClientState>>;

	/// Creates an app client and returns its identifier.
	fn create_app_client<'a>(
		&'a self,
		pool: &'a UserPoolId,
		spec: &'a AppClientSpec,
	) -> DirectoryFuture<'a, AppClientId>;

	/// Replaces an app client's settings.
	fn update_app_client<'a>(
		&'a self,
		pool: &'a UserPoolId,
		client: &'a AppClientId,
		spec: &'a AppClientSpec,
	) -> DirectoryFuture<'a, ()>;

	/// Returns the current settings of a federated identity provider.
	fn describe_identity_provider<'a>(
		&'a self,
		pool: &'a UserPoolId,
		provider_name: &'a str,
	) -> DirectoryFuture<'a, Option<FederatedProviderSpec>>;

	/// Registers a federated identity provider.
	fn create_identity_provider<'a>(
		&'a self,
		pool: &'a UserPoolId,
		spec: &'a FederatedProviderSpec,
	) -> DirectoryFuture<'a, ()>;

	/// Replaces a federated identity provider's details and attribute mapping.
	fn update_identity_provider<'a>(
		&'a self,
		pool: &'a UserPoolId,
		spec: &'a FederatedProviderSpec,
	) -> DirectoryFuture<'a, ()>;

	/// Looks up a hosted domain prefix.
	fn describe_domain<'a>(&'a self, prefix: &'a str)
	-> DirectoryFuture<'a, Option<HostedDomainState>>;

	/// Binds a hosted domain prefix to a user pool.
	fn create_domain<'a>(
		&'a self,
		pool: &'a UserPoolId,
		spec: &'a HostedDomainSpec,
	) -> DirectoryFuture<'a, ()>;
}

/// Errors raised while provisioning.
#[derive(Debug, ThisError)]
pub enum ProvisionError {
	/// A step that needs an existing user pool could not find it.
	#[error("User pool `{name}` does not exist; create it first.")]
	UserPoolNotFound {
		/// Pool name that was looked up.
		name: String,
	},
	/// The hosted domain prefix is already bound to another user pool.
	#[error("Hosted domain `{prefix}` is already bound to user pool `{owner}`.")]
	DomainConflict {
		/// Requested domain prefix.
		prefix: String,
		/// Pool that currently owns the prefix.
		owner: UserPoolId,
	},
	/// The administrative API call failed.
	#[error("Identity directory call `{operation}` failed.")]
	Api {
		/// API operation name.
		operation: &'static str,
		/// Underlying SDK failure.
		#[source]
		source: BoxError,
	},
	/// The administrative API answered without a field the operation depends on.
	#[error("Identity directory call `{operation}` returned no `{field}`.")]
	InvalidResponse {
		/// API operation name.
		operation: &'static str,
		/// Missing field.
		field: &'static str,
	},
	/// A value returned by the API is not a valid identifier.
	#[error(transparent)]
	InvalidIdentifier(#[from] crate::auth::IdentifierError),
	/// The hosted domain URL could not be derived.
	#[error(transparent)]
	Config(#[from] crate::error::ConfigError),
}
impl ProvisionError {
	/// Wraps an SDK failure for `operation`.
	pub fn api(
		operation: &'static str,
		src: impl 'static + Send + Sync + std::error::Error,
	) -> Self {
		Self::Api { operation, source: Box::new(src) }
	}
}

/// Password requirements for a user pool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordPolicy {
	/// Minimum password length.
	pub minimum_length: u8,
	/// Require at least one uppercase letter.
	pub require_uppercase: bool,
	/// Require at least one lowercase letter.
	pub require_lowercase: bool,
	/// Require at least one digit.
	pub require_numbers: bool,
	/// Require at least one symbol.
	pub require_symbols: bool,
}
impl Default for PasswordPolicy {
	fn default() -> Self {
		Self {
			minimum_length: 8,
			require_uppercase: true,
			require_lowercase: true,
			require_numbers: true,
			require_symbols: false,
		}
	}
}

/// Multi-factor authentication setting of a user pool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MfaMode {
	#[default]
	/// MFA disabled.
	Off,
	/// MFA available to users who opt in.
	Optional,
	/// MFA required for every user.
	On,
}

/// Desired user pool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPoolSpec {
	/// Pool name; used as the lookup key.
	pub name: String,
	/// Password requirements.
	pub password_policy: PasswordPolicy,
	/// Users sign in with their email address.
	pub email_as_username: bool,
	/// Email addresses are verified automatically.
	pub auto_verify_email: bool,
	/// MFA setting.
	pub mfa: MfaMode,
}
impl UserPoolSpec {
	/// Email-based pool with the default password policy and MFA off.
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			password_policy: PasswordPolicy::default(),
			email_as_username: true,
			auto_verify_email: true,
			mfa: MfaMode::Off,
		}
	}
}

/// Desired app client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppClientSpec {
	/// Client name; used as the lookup key.
	pub name: String,
	/// Whether the provider generates a client secret.
	pub generate_secret: bool,
	/// Explicit (non-OAuth) authentication flows.
	pub explicit_auth_flows: BTreeSet<String>,
	/// Allowed OAuth flows (`code` for the authorization-code grant).
	pub allowed_oauth_flows: BTreeSet<String>,
	/// Allowed OAuth scopes.
	pub scopes: ScopeSet,
	/// Registered redirect URIs.
	pub callback_urls: BTreeSet<String>,
	/// Registered post-logout URIs.
	pub logout_urls: BTreeSet<String>,
	/// Identity providers offered on the hosted login page.
	pub supported_identity_providers: BTreeSet<String>,
}
impl AppClientSpec {
	/// Public authorization-code client with the default scopes and the built-in provider.
	pub fn new(
		name: impl Into<String>,
		callback_url: impl Into<String>,
		logout_url: impl Into<String>,
	) -> Self {
		Self {
			name: name.into(),
			generate_secret: false,
			explicit_auth_flows: [
				"ALLOW_CUSTOM_AUTH",
				"ALLOW_REFRESH_TOKEN_AUTH",
				"ALLOW_USER_PASSWORD_AUTH",
				"ALLOW_USER_SRP_AUTH",
			]
			.into_iter()
			.map(str::to_owned)
			.collect(),
			allowed_oauth_flows: BTreeSet::from(["code".to_owned()]),
			scopes: ScopeSet::openid_defaults(),
			callback_urls: BTreeSet::from([callback_url.into()]),
			logout_urls: BTreeSet::from([logout_url.into()]),
			supported_identity_providers: BTreeSet::from([BUILTIN_IDENTITY_PROVIDER.to_owned()]),
		}
	}

	/// Offers `provider_name` on the hosted login page as well.
	pub fn with_identity_provider(mut self, provider_name: impl Into<String>) -> Self {
		self.supported_identity_providers.insert(provider_name.into());

		self
	}

	/// Returns `true` when `current` differs from this spec in any provider-visible setting.
	///
	/// `generate_secret` is ignored: it can only be chosen at creation time.
	pub fn diverges_from(&self, current: &AppClientSpec) -> bool {
		self.explicit_auth_flows != current.explicit_auth_flows
			|| self.allowed_oauth_flows != current.allowed_oauth_flows
			|| self.scopes != current.scopes
			|| self.callback_urls != current.callback_urls
			|| self.logout_urls != current.logout_urls
			|| self.supported_identity_providers != current.supported_identity_providers
	}
}

/// An app client as it currently exists in the directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppClientState {
	/// Directory-assigned identifier.
	pub id: AppClientId,
	/// Current settings.
	pub spec: AppClientSpec,
}

/// Desired federated identity provider.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FederatedProviderSpec {
	/// Provider name shown on the hosted login page.
	pub provider_name: String,
	/// Provider type understood by the directory (`Google`, `OIDC`, ...).
	pub provider_type: String,
	/// OAuth client identifier issued by the external provider.
	pub client_id: String,
	/// OAuth client secret issued by the external provider.
	pub client_secret: String,
	/// Space-delimited scopes requested from the external provider.
	pub authorize_scopes: String,
	/// Pool attribute to external claim mapping.
	pub attribute_mapping: BTreeMap<String, String>,
}
impl FederatedProviderSpec {
	/// Google federation with the standard OpenID attribute mapping.
	pub fn google(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
		Self {
			provider_name: GOOGLE_IDENTITY_PROVIDER.into(),
			provider_type: GOOGLE_IDENTITY_PROVIDER.into(),
			client_id: client_id.into(),
			client_secret: client_secret.into(),
			authorize_scopes: "openid email profile".into(),
			attribute_mapping: [
				("email", "email"),
				("family_name", "family_name"),
				("given_name", "given_name"),
				("username", "sub"),
			]
			.into_iter()
			.map(|(attribute, claim)| (attribute.to_owned(), claim.to_owned()))
			.collect(),
		}
	}

	/// Returns `true` when `current` carries different credentials, scopes, or mapping.
	pub fn diverges_from(&self, current: &FederatedProviderSpec) -> bool {
		self.client_id != current.client_id
			|| self.client_secret != current.client_secret
			|| self.authorize_scopes != current.authorize_scopes
			|| self.attribute_mapping != current.attribute_mapping
	}
}
impl Debug for FederatedProviderSpec {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("FederatedProviderSpec")
			.field("provider_name", &self.provider_name)
			.field("provider_type", &self.provider_type)
			.field("client_id", &self.client_id)
			.field("client_secret", &"<redacted>")
			.field("authorize_scopes", &self.authorize_scopes)
			.field("attribute_mapping", &self.attribute_mapping)
			.finish()
	}
}

/// Desired hosted login domain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostedDomainSpec {
	/// Domain prefix (`{prefix}.auth.{region}.amazoncognito.com`).
	pub prefix: String,
}
impl HostedDomainSpec {
	/// Creates a spec for `prefix`.
	pub fn new(prefix: impl Into<String>) -> Self {
		Self { prefix: prefix.into() }
	}
}

/// Lifecycle status of a hosted domain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainStatus {
	/// Being provisioned.
	Creating,
	/// Serving the hosted login pages.
	Active,
	/// Being updated.
	Updating,
	/// Being removed.
	Deleting,
	/// Provisioning failed.
	Failed,
	/// Status reported by a newer API version.
	Other(String),
}

/// A hosted domain as it currently exists in the directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostedDomainState {
	/// Pool the prefix is bound to.
	pub user_pool_id: UserPoolId,
	/// Lifecycle status.
	pub status: DomainStatus,
}

/// How to treat an existing resource whose settings differ from the desired spec.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DivergencePolicy {
	#[default]
	/// Overwrite the existing settings.
	Update,
	/// Leave the resource alone and report it as unchanged.
	Report,
}

/// Result of an `ensure_*` operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EnsureOutcome<T> {
	/// The resource did not exist and was created.
	Created(T),
	/// The resource existed with different settings and was updated.
	Updated(T),
	/// The resource already matched (or divergence was only reported).
	Unchanged(T),
}
impl<T> EnsureOutcome<T> {
	/// Borrows the resource handle.
	pub fn value(&self) -> &T {
		match self {
			EnsureOutcome::Created(value)
			| EnsureOutcome::Updated(value)
			| EnsureOutcome::Unchanged(value) => value,
		}
	}

	/// Consumes the outcome and returns the resource handle.
	pub fn into_value(self) -> T {
		match self {
			EnsureOutcome::Created(value)
			| EnsureOutcome::Updated(value)
			| EnsureOutcome::Unchanged(value) => value,
		}
	}

	/// Returns a stable label suitable for logs and metrics.
	pub const fn label(&self) -> &'static str {
		match self {
			EnsureOutcome::Created(_) => "created",
			EnsureOutcome::Updated(_) => "updated",
			EnsureOutcome::Unchanged(_) => "unchanged",
		}
	}

	/// Returns `true` if the directory was modified.
	pub const fn is_changed(&self) -> bool {
		!matches!(self, EnsureOutcome::Unchanged(_))
	}
}

/// Everything a full setup run should converge to.
#[derive(Clone, Debug)]
pub struct SetupPlan {
	/// User pool.
	pub user_pool: UserPoolSpec,
	/// App client.
	pub app_client: AppClientSpec,
	/// Optional federated provider; its name is added to the client's supported providers.
	pub federated_provider: Option<FederatedProviderSpec>,
	/// Optional hosted login domain.
	pub hosted_domain: Option<HostedDomainSpec>,
	/// Divergence handling for the client and federated provider.
	pub policy: DivergencePolicy,
}
impl SetupPlan {
	/// Plan with a pool and client only.
	pub fn new(user_pool: UserPoolSpec, app_client: AppClientSpec) -> Self {
		Self {
			user_pool,
			app_client,
			federated_provider: None,
			hosted_domain: None,
			policy: DivergencePolicy::Update,
		}
	}

	/// Adds a federated identity provider.
	pub fn with_federated_provider(mut self, spec: FederatedProviderSpec) -> Self {
		self.federated_provider = Some(spec);

		self
	}

	/// Adds a hosted login domain.
	pub fn with_hosted_domain(mut self, spec: HostedDomainSpec) -> Self {
		self.hosted_domain = Some(spec);

		self
	}

	/// Overrides the divergence policy.
	pub fn with_policy(mut self, policy: DivergencePolicy) -> Self {
		self.policy = policy;

		self
	}
}

/// One resource touched by [`Provisioner::apply`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SetupStep {
	/// Resource kind (`user_pool`, `identity_provider`, `app_client`, `hosted_domain`).
	pub resource: &'static str,
	/// Resource name or prefix.
	pub name: String,
	/// `created`, `updated`, or `unchanged`.
	pub outcome: &'static str,
}

/// Summary of a setup run, printed by the CLI as JSON.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SetupReport {
	/// Pool identifier.
	pub user_pool_id: UserPoolId,
	/// App client identifier (the `CLIENT_ID` of the login flow).
	pub app_client_id: AppClientId,
	/// Hosted domain root, when a domain was part of the plan.
	pub hosted_domain_url: Option<Url>,
	/// Per-resource outcomes in execution order.
	pub steps: Vec<SetupStep>,
}
impl SetupReport {
	/// Returns `true` if any step modified the directory.
	pub fn changed(&self) -> bool {
		self.steps.iter().any(|step| step.outcome != "unchanged")
	}
}

/// Applies resource specs to an [`IdentityDirectory`] idempotently.
pub struct Provisioner<D>
where
	D: ?Sized + IdentityDirectory,
{
	/// Directory the provisioner operates on.
	pub directory: Arc<D>,
	/// Region used to derive hosted domain URLs.
	pub region: String,
}
impl<D> Provisioner<D>
where
	D: ?Sized + IdentityDirectory,
{
	/// Creates a provisioner for `directory` in `region`.
	pub fn new(directory: impl Into<Arc<D>>, region: impl Into<String>) -> Self {
		Self { directory: directory.into(), region: region.into() }
	}

	/// Looks up the pool by name and creates it if absent.
	pub async fn ensure_user_pool(
		&self,
		spec: &UserPoolSpec,
	) -> Result<EnsureOutcome<UserPoolId>, ProvisionError> {
		observe("user_pool", &spec.name, self.converge_user_pool(spec).await)
	}

	/// Looks up the pool by name and fails if it does not exist.
	pub async fn require_user_pool(&self, name: &str) -> Result<UserPoolId, ProvisionError> {
		self.directory
			.find_user_pool(name)
			.await?
			.ok_or_else(|| ProvisionError::UserPoolNotFound { name: name.to_owned() })
	}

	/// Looks up the client by name; creates it if absent and reconciles it per `policy`.
	pub async fn ensure_app_client(
		&self,
		pool: &UserPoolId,
		spec: &AppClientSpec,
		policy: DivergencePolicy,
	) -> Result<EnsureOutcome<AppClientId>, ProvisionError> {
		observe("app_client", &spec.name, self.converge_app_client(pool, spec, policy).await)
	}

	/// Describes the provider; creates it if absent and reconciles it per `policy`.
	pub async fn ensure_identity_provider(
		&self,
		pool: &UserPoolId,
		spec: &FederatedProviderSpec,
		policy: DivergencePolicy,
	) -> Result<EnsureOutcome<String>, ProvisionError> {
		observe(
			"identity_provider",
			&spec.provider_name,
			self.converge_identity_provider(pool, spec, policy).await,
		)
	}

	/// Describes the prefix; binds it to `pool` if free.
	///
	/// A prefix already bound to `pool` is left alone whatever its status; a prefix bound to any
	/// other pool is a [`ProvisionError::DomainConflict`].
	pub async fn ensure_hosted_domain(
		&self,
		pool: &UserPoolId,
		spec: &HostedDomainSpec,
	) -> Result<EnsureOutcome<Url>, ProvisionError> {
		observe("hosted_domain", &spec.prefix, self.converge_hosted_domain(pool, spec).await)
	}

	/// Converges the directory to `plan`.
	///
	/// Order: user pool, federated provider, app client (with the federated provider enabled on
	/// the hosted login page), hosted domain. The provider must exist before a client can
	/// reference it.
	pub async fn apply(&self, plan: &SetupPlan) -> Result<SetupReport, ProvisionError> {
		let mut steps = Vec::new();
		let pool = self.ensure_user_pool(&plan.user_pool).await?;

		steps.push(step("user_pool", &plan.user_pool.name, &pool));

		let pool = pool.into_value();
		let mut client_spec = plan.app_client.clone();

		if let Some(federated) = &plan.federated_provider {
			let provider = self.ensure_identity_provider(&pool, federated, plan.policy).await?;

			steps.push(step("identity_provider", &federated.provider_name, &provider));

			client_spec = client_spec.with_identity_provider(provider.into_value());
		}

		let client = self.ensure_app_client(&pool, &client_spec, plan.policy).await?;

		steps.push(step("app_client", &client_spec.name, &client));

		let hosted_domain_url = match &plan.hosted_domain {
			Some(domain) => {
				let outcome = self.ensure_hosted_domain(&pool, domain).await?;

				steps.push(step("hosted_domain", &domain.prefix, &outcome));

				Some(outcome.into_value())
			},
			None => None,
		};

		Ok(SetupReport {
			user_pool_id: pool,
			app_client_id: client.into_value(),
			hosted_domain_url,
			steps,
		})
	}

	async fn converge_user_pool(
		&self,
		spec: &UserPoolSpec,
	) -> Result<EnsureOutcome<UserPoolId>, ProvisionError> {
		match self.directory.find_user_pool(&spec.name).await? {
			Some(id) => Ok(EnsureOutcome::Unchanged(id)),
			None => Ok(EnsureOutcome::Created(self.directory.create_user_pool(spec).await?)),
		}
	}

	async fn converge_app_client(
		&self,
		pool: &UserPoolId,
		spec: &AppClientSpec,
		policy: DivergencePolicy,
	) -> Result<EnsureOutcome<AppClientId>, ProvisionError> {
		let Some(current) = self.directory.find_app_client(pool, &spec.name).await? else {
			return Ok(EnsureOutcome::Created(self.directory.create_app_client(pool, spec).await?));
		};

		if !spec.diverges_from(&current.spec) {
			return Ok(EnsureOutcome::Unchanged(current.id));
		}

		match policy {
			DivergencePolicy::Update => {
				self.directory.update_app_client(pool, &current.id, spec).await?;

				Ok(EnsureOutcome::Updated(current.id))
			},
			DivergencePolicy::Report => {
				obs::record_provision_outcome("app_client", &spec.name, "diverged");

				Ok(EnsureOutcome::Unchanged(current.id))
			},
		}
	}

	async fn converge_identity_provider(
		&self,
		pool: &UserPoolId,
		spec: &FederatedProviderSpec,
		policy: DivergencePolicy,
	) -> Result<EnsureOutcome<String>, ProvisionError> {
		let name = spec.provider_name.clone();
		let Some(current) =
			self.directory.describe_identity_provider(pool, &spec.provider_name).await?
		else {
			self.directory.create_identity_provider(pool, spec).await?;

			return Ok(EnsureOutcome::Created(name));
		};

		if !spec.diverges_from(&current) {
			return Ok(EnsureOutcome::Unchanged(name));
		}

		match policy {
			DivergencePolicy::Update => {
				self.directory.update_identity_provider(pool, spec).await?;

				Ok(EnsureOutcome::Updated(name))
			},
			DivergencePolicy::Report => {
				obs::record_provision_outcome("identity_provider", &name, "diverged");

				Ok(EnsureOutcome::Unchanged(name))
			},
		}
	}

	async fn converge_hosted_domain(
		&self,
		pool: &UserPoolId,
		spec: &HostedDomainSpec,
	) -> Result<EnsureOutcome<Url>, ProvisionError> {
		let url = hosted_domain_url(&spec.prefix, &self.region)?;

		match self.directory.describe_domain(&spec.prefix).await? {
			None => {
				self.directory.create_domain(pool, spec).await?;

				Ok(EnsureOutcome::Created(url))
			},
			Some(state) if &state.user_pool_id == pool => Ok(EnsureOutcome::Unchanged(url)),
			Some(state) => Err(ProvisionError::DomainConflict {
				prefix: spec.prefix.clone(),
				owner: state.user_pool_id,
			}),
		}
	}
}
impl<D> Debug for Provisioner<D>
where
	D: ?Sized + IdentityDirectory,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Provisioner").field("region", &self.region).finish_non_exhaustive()
	}
}

fn observe<T>(
	resource: &'static str,
	name: &str,
	result: Result<EnsureOutcome<T>, ProvisionError>,
) -> Result<EnsureOutcome<T>, ProvisionError> {
	match &result {
		Ok(outcome) => obs::record_provision_outcome(resource, name, outcome.label()),
		Err(_) => obs::record_provision_outcome(resource, name, "failed"),
	}

	result
}

fn step<T>(resource: &'static str, name: &str, outcome: &EnsureOutcome<T>) -> SetupStep {
	SetupStep { resource, name: name.to_owned(), outcome: outcome.label() }
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn default_specs_follow_the_hosted_login_setup() {
		let pool = UserPoolSpec::new(DEFAULT_USER_POOL_NAME);

		assert_eq!(pool.password_policy.minimum_length, 8);
		assert!(!pool.password_policy.require_symbols);
		assert!(pool.email_as_username && pool.auto_verify_email);
		assert_eq!(pool.mfa, MfaMode::Off);

		let client = AppClientSpec::new(
			DEFAULT_APP_CLIENT_NAME,
			"http://localhost:8501",
			"http://localhost:8501/logout",
		);

		assert!(!client.generate_secret);
		assert_eq!(client.explicit_auth_flows.len(), 4);
		assert!(client.allowed_oauth_flows.contains("code"));
		assert_eq!(client.scopes.normalized(), "email openid profile");
		assert!(client.supported_identity_providers.contains(BUILTIN_IDENTITY_PROVIDER));
	}

	#[test]
	fn app_client_divergence_ignores_secret_generation() {
		let base =
			AppClientSpec::new("client", "http://localhost:8501", "http://localhost:8501/logout");
		let mut secret = base.clone();

		secret.generate_secret = true;

		assert!(!base.diverges_from(&secret));
		assert!(base.clone().with_identity_provider(GOOGLE_IDENTITY_PROVIDER).diverges_from(&base));
	}

	#[test]
	fn federated_divergence_tracks_credentials_and_mapping() {
		let google = FederatedProviderSpec::google("gid", "gsecret");

		assert_eq!(google.attribute_mapping.get("username").map(String::as_str), Some("sub"));
		assert!(!google.diverges_from(&google.clone()));
		assert!(FederatedProviderSpec::google("gid", "rotated").diverges_from(&google));

		let mut remapped = google.clone();

		remapped.attribute_mapping.remove("family_name");

		assert!(remapped.diverges_from(&google));
		assert!(!format!("{google:?}").contains("gsecret"));
	}

	#[test]
	fn outcome_labels_are_stable() {
		assert_eq!(EnsureOutcome::Created(()).label(), "created");
		assert_eq!(EnsureOutcome::Updated(()).label(), "updated");
		assert!(!EnsureOutcome::Unchanged(()).is_changed());
		assert_eq!(EnsureOutcome::Updated(7).into_value(), 7);
	}
}
