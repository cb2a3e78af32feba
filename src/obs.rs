//! Optional observability helpers for the login flow and provisioning.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `hosted_login.flow` with the `flow` and
//!   `stage` (call site) fields, plus one `info` event per provisioning decision.
//! - Enable `metrics` to increment the `hosted_login_flow_total` counter for every
//!   attempt/success/failure, labeled by `flow` + `outcome`, and the
//!   `hosted_login_provision_total` counter labeled by `resource` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Login flow stages observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Handling of the browser redirect (code detection plus exchange).
	Redirect,
	/// The token endpoint call itself.
	Exchange,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::Redirect => "redirect",
			FlowKind::Exchange => "exchange",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a flow helper.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Records a provisioning decision as a tracing event and a counter increment.
///
/// `outcome` is one of `created`, `updated`, `unchanged`, or `failed`.
pub fn record_provision_outcome(resource: &'static str, name: &str, outcome: &'static str) {
	trace_provision_outcome(resource, name, outcome);
	count_provision_outcome(resource, outcome);
}
