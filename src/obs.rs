//! Optional metrics hooks for client operations.
//!
//! Enable the `metrics` cargo feature to increment the
//! `restream_client_operation_total` counter for every recorded outcome,
//! labeled by `operation` and `outcome`. Without the feature every hook
//! compiles to a no-op; structured logging via `tracing` is always on.

// self
use crate::_prelude::*;

/// Operations observed by the client runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
	/// Authorization-code exchange at the token endpoint.
	CodeExchange,
	/// Refresh-token grant at the token endpoint.
	TokenRefresh,
	/// Authenticated or public REST call.
	ApiRequest,
	/// WebSocket subscription connect attempt.
	MonitorConnect,
}
impl Operation {
	/// Returns a stable label suitable for metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Operation::CodeExchange => "code_exchange",
			Operation::TokenRefresh => "token_refresh",
			Operation::ApiRequest => "api_request",
			Operation::MonitorConnect => "monitor_connect",
		}
	}
}
impl Display for Operation {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded per operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl Outcome {
	/// Returns a stable label suitable for metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Outcome::Success => "success",
			Outcome::Failure => "failure",
		}
	}
}
impl Display for Outcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Records an operation outcome via the global metrics recorder (when enabled).
pub fn record_operation(operation: Operation, outcome: Outcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"restream_client_operation_total",
			"operation" => operation.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (operation, outcome);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn record_operation_noop_without_metrics() {
		record_operation(Operation::TokenRefresh, Outcome::Failure);
	}

	#[test]
	fn labels_are_stable() {
		assert_eq!(Operation::CodeExchange.to_string(), "code_exchange");
		assert_eq!(Outcome::Success.to_string(), "success");
	}
}
