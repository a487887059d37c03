//! Default interface discovery.

use crate::command::{self, ShellRunner};

/// Prints the device of the first default IPv4 route, i.e. the token following `dev`.
pub const DEFAULT_ROUTE_QUERY: &str = concat!(
    "ip -4 route show default | ",
    "awk '/^default/ { for (i = 1; i < NF; i++) if ($i == \"dev\") { print $(i + 1); exit } }'",
);

#[derive(Debug, thiserror::Error)]
pub enum InterfaceError {
    #[error("there was an error getting the default interface:\n\n{0}")]
    Query(String),
    #[error("no default IPv4 route found")]
    NoDefaultRoute,
    #[error("failed to run route query: {0}")]
    Command(#[from] command::Error),
}

/// Resolves the interface carrying the default IPv4 route.
///
/// The result is never cached: the active interface can change between calls (e.g. switching
/// from ethernet to Wi-Fi).
pub async fn default_interface<S: ShellRunner + ?Sized>(
    shell: &S,
) -> Result<String, InterfaceError> {
    let output = shell.shell(DEFAULT_ROUTE_QUERY).await?;
    let interface = output.stdout.trim();

    if interface.is_empty() {
        if !output.stderr.trim().is_empty() {
            return Err(InterfaceError::Query(output.stderr));
        }
        return Err(InterfaceError::NoDefaultRoute);
    }

    if !output.stderr.trim().is_empty() {
        tracing::warn!(stderr = output.stderr.trim(), interface, "route query printed to stderr");
    }

    tracing::debug!(interface, "resolved default interface");

    Ok(interface.to_string())
}
