//! Interactive walkthrough of the hosted login round trip.
//!
//! The example prompts for the app client settings, prints the hosted login URL, waits for the
//! user to paste the URL the browser was redirected to, exchanges the code, and prints the
//! resulting state plus the hosted logout URL.

// std
use std::io::{self, Write};
// crates.io
use color_eyre::Result;
// self
use hosted_login::{
	config::LoginConfig,
	flows::{LoginFlow, LoginState},
	provider::ProviderEndpoints,
	url::Url,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let client_id = prompt_with_default("App client ID", Some("demo-client"))?;
	let redirect_uri = prompt_with_default("Redirect URI", Some("http://localhost:8501"))?;
	let domain_prefix = prompt_with_default("Hosted domain prefix", Some("my-app"))?;
	let region = prompt_with_default("Region", Some("eu-central-1"))?;
	let endpoints = ProviderEndpoints::hosted(&domain_prefix, &region)?;
	let flow = LoginFlow::new(LoginConfig::new(client_id, redirect_uri, endpoints))?;

	println!("{}", LoginState::Unauthenticated { login_url: flow.login_url() }.headline());
	println!("Login URL: {}", flow.login_url());
	println!("After signing in, copy the full URL the browser landed on and paste it here.");

	let Some(redirect) = prompt_optional("Redirect URL (leave blank to stop here)")? else {
		println!("No redirect URL provided; skipping the token exchange.");

		return Ok(());
	};
	let state = flow.handle_redirect_url(&Url::parse(&redirect)?).await;

	println!("{}", state.headline());

	match state {
		LoginState::Authenticated(tokens) => {
			println!("Access token: {}.", tokens.access_token);
			println!("ID token: {}.", tokens.id_token);

			if let Some(expires_at) = tokens.expires_at {
				println!("Expires at: {expires_at}.");
			}
		},
		LoginState::AuthFailed(e) => println!("Details for the operator: {e}."),
		LoginState::Unauthenticated { login_url } =>
			println!("No code found; start at {login_url}."),
		LoginState::CodePresent(_) => (),
	}

	println!("Logout URL: {}", flow.logout_url());

	Ok(())
}

fn prompt_with_default(message: &str, default: Option<&str>) -> Result<String> {
	loop {
		if let Some(value) = default {
			print!("{message} [{value}]: ");
		} else {
			print!("{message}: ");
		}

		io::stdout().flush()?;

		let mut input = String::new();

		io::stdin().read_line(&mut input)?;

		let trimmed = input.trim();

		if trimmed.is_empty() {
			if let Some(value) = default {
				return Ok(value.to_owned());
			}
		} else {
			return Ok(trimmed.to_owned());
		}
	}
}

fn prompt_optional(message: &str) -> Result<Option<String>> {
	print!("{message}: ");

	io::stdout().flush()?;

	let mut input = String::new();

	io::stdin().read_line(&mut input)?;

	let trimmed = input.trim();

	if trimmed.is_empty() { Ok(None) } else { Ok(Some(trimmed.to_owned())) }
}
