//! Dry run of the full provisioning plan against the in-memory directory.
//!
//! Applies the plan twice and prints both reports: the first run creates every resource, the
//! second finds them all unchanged.

// crates.io
use color_eyre::Result;
// self
use hosted_login::provision::{
	AppClientSpec, DEFAULT_APP_CLIENT_NAME, DEFAULT_USER_POOL_NAME, FederatedProviderSpec,
	HostedDomainSpec, MemoryDirectory, Provisioner, SetupPlan, UserPoolSpec,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let directory = MemoryDirectory::new("eu-central-1");
	let provisioner: Provisioner<MemoryDirectory> =
		Provisioner::new(directory.clone(), "eu-central-1");
	let plan = SetupPlan::new(
		UserPoolSpec::new(DEFAULT_USER_POOL_NAME),
		AppClientSpec::new(
			DEFAULT_APP_CLIENT_NAME,
			"http://localhost:8501",
			"http://localhost:8501/logout",
		),
	)
	.with_federated_provider(FederatedProviderSpec::google("google-client-id", "google-secret"))
	.with_hosted_domain(HostedDomainSpec::new("my-app"));

	for run in 1..=2 {
		let report = provisioner.apply(&plan).await?;

		println!("Run {run}:\n{}", serde_json::to_string_pretty(&report)?);
	}

	println!("Directory writes: {}.", directory.writes());

	Ok(())
}
