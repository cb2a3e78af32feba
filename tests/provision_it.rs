// std
use std::sync::Arc;
// self
use hosted_login::{
	auth::UserPoolId,
	provision::{
		AppClientSpec, DivergencePolicy, DomainStatus, EnsureOutcome, FederatedProviderSpec,
		HostedDomainSpec, IdentityDirectory, MemoryDirectory, ProvisionError, Provisioner,
		SetupPlan, UserPoolSpec,
	},
};

const REGION: &str = "us-east-1";

fn plan() -> SetupPlan {
	SetupPlan::new(
		UserPoolSpec::new("PoolIt"),
		AppClientSpec::new("ClientIt", "http://localhost:8501", "http://localhost:8501/logout"),
	)
	.with_federated_provider(FederatedProviderSpec::google("google-id", "google-secret"))
	.with_hosted_domain(HostedDomainSpec::new("pool-it"))
}

#[tokio::test]
async fn setup_plan_converges_through_a_shared_directory() {
	let memory = MemoryDirectory::new(REGION);
	let directory: Arc<dyn IdentityDirectory> = Arc::new(memory.clone());
	let provisioner: Provisioner<dyn IdentityDirectory> = Provisioner::new(directory, REGION);
	let report = provisioner.apply(&plan()).await.expect("Setup should succeed.");

	assert_eq!(
		report.hosted_domain_url.as_ref().map(|url| url.as_str()),
		Some("https://pool-it.auth.us-east-1.amazoncognito.com/")
	);
	assert!(report.steps.iter().all(|step| step.outcome == "created"));
	assert_eq!(memory.user_pool_count(), 1);
	assert_eq!(memory.app_client_count(&report.user_pool_id), 1);

	let rerun = provisioner.apply(&plan()).await.expect("Second setup should succeed.");

	assert!(!rerun.changed());
	assert_eq!(rerun.app_client_id, report.app_client_id);

	let json = serde_json::to_value(&rerun).expect("Setup report should serialize.");

	assert_eq!(json["steps"][0]["outcome"], "unchanged");
	assert_eq!(json["user_pool_id"], report.user_pool_id.to_string());
}

#[tokio::test]
async fn rotated_federation_secret_is_updated_in_place() {
	let memory = MemoryDirectory::new(REGION);
	let provisioner: Provisioner<MemoryDirectory> = Provisioner::new(memory.clone(), REGION);
	let pool = provisioner
		.ensure_user_pool(&UserPoolSpec::new("PoolIt"))
		.await
		.expect("Pool should be created.")
		.into_value();
	let created = provisioner
		.ensure_identity_provider(
			&pool,
			&FederatedProviderSpec::google("google-id", "old"),
			DivergencePolicy::Update,
		)
		.await
		.expect("Provider should be created.");
	let rotated = provisioner
		.ensure_identity_provider(
			&pool,
			&FederatedProviderSpec::google("google-id", "new"),
			DivergencePolicy::Update,
		)
		.await
		.expect("Provider should be updated.");

	assert_eq!(created, EnsureOutcome::Created("Google".to_owned()));
	assert_eq!(rotated, EnsureOutcome::Updated("Google".to_owned()));
}

#[tokio::test]
async fn foreign_domain_aborts_setup_after_pool_and_client() {
	let memory = MemoryDirectory::new(REGION);
	let provisioner: Provisioner<MemoryDirectory> = Provisioner::new(memory.clone(), REGION);

	memory.seed_domain(
		"pool-it",
		UserPoolId::new("us-east-1_foreign").expect("Pool fixture should be valid."),
		DomainStatus::Active,
	);

	let err = provisioner.apply(&plan()).await.expect_err("Domain conflict should abort setup.");

	assert!(matches!(err, ProvisionError::DomainConflict { prefix, .. } if prefix == "pool-it"));
	assert_eq!(memory.user_pool_count(), 1);
}
