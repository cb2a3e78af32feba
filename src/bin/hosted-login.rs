//! Command-line front end: print hosted login/logout URLs, complete a redirect, and provision the
//! identity provider's resources.

// std
use std::process::ExitCode;
// crates.io
use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::{Result, eyre::eyre};
use serde_json::json;
use tracing_subscriber::EnvFilter;
use url::Url;
// self
use hosted_login::{
	auth::UserPoolId,
	config::{DEFAULT_LOGOUT_URI, LoginConfig},
	flows::{LoginFlow, LoginState},
	provision::{
		AppClientSpec, CognitoDirectory, DEFAULT_APP_CLIENT_NAME, DEFAULT_USER_POOL_NAME,
		DivergencePolicy, EnsureOutcome, FederatedProviderSpec, GOOGLE_IDENTITY_PROVIDER,
		HostedDomainSpec, Provisioner, SetupPlan, UserPoolSpec,
	},
};

#[derive(Debug, Parser)]
#[command(
	name = "hosted-login",
	version = env!("CARGO_PKG_VERSION"),
	author = env!("CARGO_PKG_AUTHORS"),
	about = "Authorization-code login against a hosted identity provider."
)]
struct Options {
	#[command(subcommand)]
	command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
	/// Print the hosted login page URL.
	LoginUrl,
	/// Print the hosted logout URL.
	LogoutUrl,
	/// Exchange the code carried by a redirect URL for tokens.
	Callback {
		/// Full redirect URL, e.g. `http://localhost:8501/?code=...`.
		redirect_url: Url,
		/// Print the raw tokens instead of a redacted summary.
		#[arg(long)]
		show_tokens: bool,
	},
	/// Create or reconcile identity provider resources.
	Provision(ProvisionArgs),
}

#[derive(Debug, clap::Args)]
struct ProvisionArgs {
	/// Which resource to converge.
	#[arg(value_enum)]
	target: Target,
	/// AWS region hosting the user pool.
	#[arg(long, env = "AWS_REGION")]
	region: String,
	/// User pool name.
	#[arg(long, env = "POOL_NAME", default_value = DEFAULT_USER_POOL_NAME)]
	pool_name: String,
	/// App client name.
	#[arg(long, env = "CLIENT_NAME", default_value = DEFAULT_APP_CLIENT_NAME)]
	client_name: String,
	/// Redirect URI registered on the app client.
	#[arg(long, env = "REDIRECT_URI", default_value = "http://localhost:8501")]
	redirect_uri: String,
	/// Post-logout URI registered on the app client.
	#[arg(long, env = "LOGOUT_URI", default_value = DEFAULT_LOGOUT_URI)]
	logout_uri: String,
	/// Hosted domain prefix.
	#[arg(long, env = "DOMAIN_PREFIX")]
	domain_prefix: Option<String>,
	/// Google OAuth client identifier.
	#[arg(long, env = "GOOGLE_CLIENT_ID")]
	google_client_id: Option<String>,
	/// Google OAuth client secret.
	#[arg(long, env = "GOOGLE_CLIENT_SECRET", hide_env_values = true)]
	google_client_secret: Option<String>,
	/// Report divergent resources instead of updating them.
	#[arg(long)]
	report_only: bool,
}
impl ProvisionArgs {
	fn policy(&self) -> DivergencePolicy {
		if self.report_only { DivergencePolicy::Report } else { DivergencePolicy::Update }
	}

	fn client_spec(&self) -> AppClientSpec {
		AppClientSpec::new(&self.client_name, &self.redirect_uri, &self.logout_uri)
	}

	fn google(&self) -> Result<FederatedProviderSpec> {
		match (&self.google_client_id, &self.google_client_secret) {
			(Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() =>
				Ok(FederatedProviderSpec::google(id, secret)),
			_ => Err(eyre!("GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET are required.")),
		}
	}

	fn domain(&self) -> Result<HostedDomainSpec> {
		self.domain_prefix
			.as_deref()
			.filter(|prefix| !prefix.is_empty())
			.map(HostedDomainSpec::new)
			.ok_or_else(|| eyre!("DOMAIN_PREFIX is required."))
	}
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Target {
	/// User pool.
	Pool,
	/// App client in an existing pool.
	AppClient,
	/// Google federation in an existing pool.
	Google,
	/// Hosted domain for an existing pool.
	Domain,
	/// Offer Google on the hosted login page of an existing client.
	LoginPages,
	/// Everything above, in dependency order.
	All,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
	color_eyre::install()?;
	dotenvy::dotenv().ok();
	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
		)
		.with_writer(std::io::stderr)
		.init();

	let options = Options::parse();

	match options.command {
		Command::LoginUrl => {
			println!("{}", LoginFlow::new(LoginConfig::from_env()?)?.login_url());

			Ok(ExitCode::SUCCESS)
		},
		Command::LogoutUrl => {
			println!("{}", LoginFlow::new(LoginConfig::from_env()?)?.logout_url());

			Ok(ExitCode::SUCCESS)
		},
		Command::Callback { redirect_url, show_tokens } =>
			callback(LoginFlow::new(LoginConfig::from_env()?)?, &redirect_url, show_tokens).await,
		Command::Provision(args) => {
			provision(&args).await?;

			Ok(ExitCode::SUCCESS)
		},
	}
}

async fn callback(
	flow: hosted_login::flows::ReqwestLoginFlow,
	redirect_url: &Url,
	show_tokens: bool,
) -> Result<ExitCode> {
	let state = flow.handle_redirect_url(redirect_url).await;

	println!("{}", state.headline());

	match state {
		LoginState::Unauthenticated { login_url } => {
			println!("{login_url}");

			Ok(ExitCode::FAILURE)
		},
		LoginState::Authenticated(tokens) => {
			let summary = if show_tokens {
				json!({
					"access_token": tokens.access_token.expose(),
					"id_token": tokens.id_token.expose(),
					"expires_at": tokens.expires_at.map(|at| at.unix_timestamp()),
				})
			} else {
				json!({
					"access_token": tokens.access_token.to_string(),
					"id_token": tokens.id_token.to_string(),
					"expires_at": tokens.expires_at.map(|at| at.unix_timestamp()),
				})
			};

			println!("{}", serde_json::to_string_pretty(&summary)?);

			Ok(ExitCode::SUCCESS)
		},
		LoginState::AuthFailed(err) => {
			tracing::error!(error = %err, "token exchange failed");

			Ok(ExitCode::FAILURE)
		},
		LoginState::CodePresent(_) => Err(eyre!("Redirect handling stopped before the exchange.")),
	}
}

async fn provision(args: &ProvisionArgs) -> Result<()> {
	let directory = CognitoDirectory::from_env(args.region.clone()).await;
	let provisioner: Provisioner<CognitoDirectory> =
		Provisioner::new(directory, args.region.clone());

	match args.target {
		Target::Pool => {
			let outcome = provisioner.ensure_user_pool(&UserPoolSpec::new(&args.pool_name)).await?;

			print_outcome("user_pool", &args.pool_name, &outcome)
		},
		Target::AppClient => {
			let pool = provisioner.require_user_pool(&args.pool_name).await?;
			let outcome =
				provisioner.ensure_app_client(&pool, &args.client_spec(), args.policy()).await?;

			print_outcome("app_client", &args.client_name, &outcome)
		},
		Target::Google => {
			let pool = provisioner.require_user_pool(&args.pool_name).await?;
			let outcome =
				provisioner.ensure_identity_provider(&pool, &args.google()?, args.policy()).await?;

			print_outcome("identity_provider", GOOGLE_IDENTITY_PROVIDER, &outcome)
		},
		Target::Domain => {
			let domain = args.domain()?;
			let pool = provisioner.require_user_pool(&args.pool_name).await?;
			let outcome = provisioner.ensure_hosted_domain(&pool, &domain).await?;

			print_outcome("hosted_domain", &domain.prefix, &outcome)
		},
		Target::LoginPages => {
			let pool: UserPoolId = provisioner.require_user_pool(&args.pool_name).await?;
			let spec = args.client_spec().with_identity_provider(GOOGLE_IDENTITY_PROVIDER);
			let outcome = provisioner.ensure_app_client(&pool, &spec, args.policy()).await?;

			print_outcome("app_client", &args.client_name, &outcome)
		},
		Target::All => {
			let mut plan = SetupPlan::new(UserPoolSpec::new(&args.pool_name), args.client_spec())
				.with_policy(args.policy());

			if args.google_client_id.is_some() {
				plan = plan.with_federated_provider(args.google()?);
			}
			if args.domain_prefix.is_some() {
				plan = plan.with_hosted_domain(args.domain()?);
			}

			let report = provisioner.apply(&plan).await?;

			println!("{}", serde_json::to_string_pretty(&report)?);

			Ok(())
		},
	}
}

fn print_outcome<T>(resource: &str, name: &str, outcome: &EnsureOutcome<T>) -> Result<()>
where
	T: serde::Serialize,
{
	let summary = json!({
		"resource": resource,
		"name": name,
		"outcome": outcome.label(),
		"value": outcome.value(),
	});

	println!("{}", serde_json::to_string_pretty(&summary)?);

	Ok(())
}
