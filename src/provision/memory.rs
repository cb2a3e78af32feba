//! Thread-safe in-memory [`IdentityDirectory`] for local development, demos, and tests.

// self
use crate::{
	_prelude::*,
	auth::{AppClientId, UserPoolId},
	provision::{
		AppClientSpec, AppClientState, DirectoryFuture, DomainStatus, FederatedProviderSpec,
		HostedDomainSpec, HostedDomainState, IdentityDirectory, ProvisionError, UserPoolSpec,
	},
};

type DirectoryMap = Arc<RwLock<DirectoryState>>;

#[derive(Debug, Default)]
struct DirectoryState {
	pools: BTreeMap<UserPoolId, PoolRecord>,
	domains: BTreeMap<String, HostedDomainState>,
	next_id: u64,
	writes: usize,
	fail_on: Option<&'static str>,
}

#[derive(Debug)]
struct PoolRecord {
	spec: UserPoolSpec,
	clients: BTreeMap<AppClientId, AppClientSpec>,
	providers: BTreeMap<String, FederatedProviderSpec>,
}

/// Error injected by [`MemoryDirectory::fail_on`].
#[derive(Debug, ThisError)]
#[error("Injected failure.")]
pub struct InjectedFailure;

/// Directory that keeps every resource in-process.
///
/// Identifiers are assigned sequentially (`{region}_local{n}` for pools, `client{n}` for app
/// clients). Clones share state.
#[derive(Clone, Debug)]
pub struct MemoryDirectory {
	region: String,
	state: DirectoryMap,
}
impl MemoryDirectory {
	/// Creates an empty directory for `region`.
	pub fn new(region: impl Into<String>) -> Self {
		Self { region: region.into(), state: Default::default() }
	}

	/// Makes every call to `operation` (e.g. `CreateUserPoolDomain`) fail with an API error.
	pub fn fail_on(self, operation: &'static str) -> Self {
		self.state.write().fail_on = Some(operation);

		self
	}

	/// Number of mutating calls served so far.
	pub fn writes(&self) -> usize {
		self.state.read().writes
	}

	/// Number of user pools.
	pub fn user_pool_count(&self) -> usize {
		self.state.read().pools.len()
	}

	/// Number of app clients in `pool`.
	pub fn app_client_count(&self, pool: &UserPoolId) -> usize {
		self.state.read().pools.get(pool).map(|record| record.clients.len()).unwrap_or_default()
	}

	/// Current settings of the app client `client` in `pool`.
	pub fn app_client(&self, pool: &UserPoolId, client: &AppClientId) -> Option<AppClientSpec> {
		self.state.read().pools.get(pool).and_then(|record| record.clients.get(client).cloned())
	}

	/// Seeds a hosted domain bound to `pool`, as if another tool had created it.
	pub fn seed_domain(&self, prefix: impl Into<String>, pool: UserPoolId, status: DomainStatus) {
		self.state
			.write()
			.domains
			.insert(prefix.into(), HostedDomainState { user_pool_id: pool, status });
	}

	fn guard(state: &DirectoryState, operation: &'static str) -> Result<(), ProvisionError> {
		match state.fail_on {
			Some(failing) if failing == operation =>
				Err(ProvisionError::api(operation, InjectedFailure)),
			_ => Ok(()),
		}
	}

	fn pool_mut<'s>(
		state: &'s mut DirectoryState,
		pool: &UserPoolId,
	) -> Result<&'s mut PoolRecord, ProvisionError> {
		state
			.pools
			.get_mut(pool)
			.ok_or_else(|| ProvisionError::UserPoolNotFound { name: pool.to_string() })
	}

	fn find_user_pool_now(
		map: DirectoryMap,
		name: &str,
	) -> Result<Option<UserPoolId>, ProvisionError> {
		let state = map.read();

		Self::guard(&state, "ListUserPools")?;

		Ok(state
			.pools
			.iter()
			.find(|(_, record)| record.spec.name == name)
			.map(|(id, _)| id.clone()))
	}

	fn create_user_pool_now(
		map: DirectoryMap,
		region: &str,
		spec: &UserPoolSpec,
	) -> Result<UserPoolId, ProvisionError> {
		let mut state = map.write();

		Self::guard(&state, "CreateUserPool")?;

		state.next_id += 1;
		state.writes += 1;

		let id = UserPoolId::new(format!("{region}_local{}", state.next_id))?;

		state.pools.insert(
			id.clone(),
			PoolRecord { spec: spec.clone(), clients: BTreeMap::new(), providers: BTreeMap::new() },
		);

		Ok(id)
	}

	fn find_app_client_now(
		map: DirectoryMap,
		pool: &UserPoolId,
		name: &str,
	) -> Result<Option<AppClientState>, ProvisionError> {
		let state = map.read();

		Self::guard(&state, "ListUserPoolClients")?;

		Ok(state.pools.get(pool).and_then(|record| {
			record
				.clients
				.iter()
				.find(|(_, spec)| spec.name == name)
				.map(|(id, spec)| AppClientState { id: id.clone(), spec: spec.clone() })
		}))
	}

	fn create_app_client_now(
		map: DirectoryMap,
		pool: &UserPoolId,
		spec: &AppClientSpec,
	) -> Result<AppClientId, ProvisionError> {
		let mut state = map.write();

		Self::guard(&state, "CreateUserPoolClient")?;

		state.next_id += 1;
		state.writes += 1;

		let id = AppClientId::new(format!("client{}", state.next_id))?;

		Self::pool_mut(&mut state, pool)?.clients.insert(id.clone(), spec.clone());

		Ok(id)
	}

	fn update_app_client_now(
		map: DirectoryMap,
		pool: &UserPoolId,
		client: &AppClientId,
		spec: &AppClientSpec,
	) -> Result<(), ProvisionError> {
		let mut state = map.write();

		Self::guard(&state, "UpdateUserPoolClient")?;

		state.writes += 1;

		let record = Self::pool_mut(&mut state, pool)?;
		let current = record.clients.get_mut(client).ok_or(ProvisionError::InvalidResponse {
			operation: "UpdateUserPoolClient",
			field: "ClientId",
		})?;
		let generate_secret = current.generate_secret;

		*current = AppClientSpec { generate_secret, ..spec.clone() };

		Ok(())
	}

	fn describe_identity_provider_now(
		map: DirectoryMap,
		pool: &UserPoolId,
		provider_name: &str,
	) -> Result<Option<FederatedProviderSpec>, ProvisionError> {
		let state = map.read();

		Self::guard(&state, "DescribeIdentityProvider")?;

		Ok(state.pools.get(pool).and_then(|record| record.providers.get(provider_name).cloned()))
	}

	fn put_identity_provider_now(
		map: DirectoryMap,
		operation: &'static str,
		pool: &UserPoolId,
		spec: &FederatedProviderSpec,
	) -> Result<(), ProvisionError> {
		let mut state = map.write();

		Self::guard(&state, operation)?;

		state.writes += 1;

		Self::pool_mut(&mut state, pool)?
			.providers
			.insert(spec.provider_name.clone(), spec.clone());

		Ok(())
	}

	fn describe_domain_now(
		map: DirectoryMap,
		prefix: &str,
	) -> Result<Option<HostedDomainState>, ProvisionError> {
		let state = map.read();

		Self::guard(&state, "DescribeUserPoolDomain")?;

		Ok(state.domains.get(prefix).cloned())
	}

	fn create_domain_now(
		map: DirectoryMap,
		pool: &UserPoolId,
		spec: &HostedDomainSpec,
	) -> Result<(), ProvisionError> {
		let mut state = map.write();

		Self::guard(&state, "CreateUserPoolDomain")?;
		Self::pool_mut(&mut state, pool)?;

		if let Some(existing) = state.domains.get(&spec.prefix) {
			return Err(ProvisionError::DomainConflict {
				prefix: spec.prefix.clone(),
				owner: existing.user_pool_id.clone(),
			});
		}

		state.writes += 1;
		state.domains.insert(
			spec.prefix.clone(),
			HostedDomainState { user_pool_id: pool.clone(), status: DomainStatus::Active },
		);

		Ok(())
	}
}
impl IdentityDirectory for MemoryDirectory {
	fn find_user_pool<'a>(&'a self, name: &'a str) -> DirectoryFuture<'a, Option<UserPoolId>> {
		let map = self.state.clone();

		Box::pin(async move { Self::find_user_pool_now(map, name) })
	}

	fn create_user_pool<'a>(&'a self, spec: &'a UserPoolSpec) -> DirectoryFuture<'a, UserPoolId> {
		let map = self.state.clone();

		Box::pin(async move { Self::create_user_pool_now(map, &self.region, spec) })
	}

	fn find_app_client<'a>(
		&'a self,
		pool: &'a UserPoolId,
		name: &'a str,
	) -> DirectoryFuture<'a, Option<AppClientState>> {
		let map = self.state.clone();

		Box::pin(async move { Self::find_app_client_now(map, pool, name) })
	}

	fn create_app_client<'a>(
		&'a self,
		pool: &'a UserPoolId,
		spec: &'a AppClientSpec,
	) -> DirectoryFuture<'a, AppClientId> {
		let map = self.state.clone();

		Box::pin(async move { Self::create_app_client_now(map, pool, spec) })
	}

	fn update_app_client<'a>(
		&'a self,
		pool: &'a UserPoolId,
		client: &'a AppClientId,
		spec: &'a AppClientSpec,
	) -> DirectoryFuture<'a, ()> {
		let map = self.state.clone();

		Box::pin(async move { Self::update_app_client_now(map, pool, client, spec) })
	}

	fn describe_identity_provider<'a>(
		&'a self,
		pool: &'a UserPoolId,
		provider_name: &'a str,
	) -> DirectoryFuture<'a, Option<FederatedProviderSpec>> {
		let map = self.state.clone();

		Box::pin(async move { Self::describe_identity_provider_now(map, pool, provider_name) })
	}

	fn create_identity_provider<'a>(
		&'a self,
		pool: &'a UserPoolId,
		spec: &'a FederatedProviderSpec,
	) -> DirectoryFuture<'a, ()> {
		let map = self.state.clone();

		Box::pin(async move {
			Self::put_identity_provider_now(map, "CreateIdentityProvider", pool, spec)
		})
	}

	fn update_identity_provider<'a>(
		&'a self,
		pool: &'a UserPoolId,
		spec: &'a FederatedProviderSpec,
	) -> DirectoryFuture<'a, ()> {
		let map = self.state.clone();

		Box::pin(async move {
			Self::put_identity_provider_now(map, "UpdateIdentityProvider", pool, spec)
		})
	}

	fn describe_domain<'a>(
		&'a self,
		prefix: &'a str,
	) -> DirectoryFuture<'a, Option<HostedDomainState>> {
		let map = self.state.clone();

		Box::pin(async move { Self::describe_domain_now(map, prefix) })
	}

	fn create_domain<'a>(
		&'a self,
		pool: &'a UserPoolId,
		spec: &'a HostedDomainSpec,
	) -> DirectoryFuture<'a, ()> {
		let map = self.state.clone();

		Box::pin(async move { Self::create_domain_now(map, pool, spec) })
	}
}
