//! Command-line arguments.

use std::time::Duration;

use clap::{Parser, Subcommand};
use tandem_core::{Endpoint, LinkConfig};

/// Point-to-point text messaging over TCP.
#[derive(Debug, Parser)]
#[command(name = "tandem", version, about)]
pub struct Cli {
    /// Name shown next to your own messages.
    #[arg(long, default_value = "me", global = true)]
    pub name: String,

    /// Seconds to wait for a connection to open.
    #[arg(long, default_value_t = 10, global = true)]
    pub connect_timeout: u64,

    /// Which side of the link to run.
    #[command(subcommand)]
    pub role: Role,
}

/// Side of the link.
#[derive(Debug, Subcommand)]
pub enum Role {
    /// Wait for a peer to connect.
    Listen {
        /// Address to accept connections on.
        #[arg(long, default_value = "0.0.0.0:7000")]
        bind: String,

        /// Send every received message straight back.
        #[arg(long)]
        echo: bool,
    },

    /// Connect to a listening peer.
    Connect {
        /// Peer to connect to right away (`host:port`). Use `/connect` later
        /// if omitted.
        endpoint: Option<Endpoint>,
    },
}

impl Cli {
    /// Link configuration derived from the arguments.
    pub fn link_config(&self) -> LinkConfig {
        LinkConfig {
            connect_timeout: Duration::from_secs(self.connect_timeout),
            ..LinkConfig::with_username(self.name.as_str())
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn arguments_are_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn connect_with_endpoint() {
        let cli =
            Cli::try_parse_from(["tandem", "--name", "bob", "connect", "example.org:7000"]).unwrap();
        assert_eq!(cli.name, "bob");
        assert!(matches!(
            cli.role,
            Role::Connect { endpoint: Some(ref endpoint) } if *endpoint == Endpoint::new("example.org", 7000)
        ));
        assert_eq!(cli.link_config().username, "bob");
    }

    #[test]
    fn connect_without_endpoint() {
        let cli = Cli::try_parse_from(["tandem", "connect"]).unwrap();
        assert!(matches!(cli.role, Role::Connect { endpoint: None }));
        assert_eq!(cli.link_config().username, "me");
    }

    #[test]
    fn listen_defaults() {
        let cli = Cli::try_parse_from(["tandem", "listen"]).unwrap();
        assert!(matches!(cli.role, Role::Listen { ref bind, echo: false } if bind == "0.0.0.0:7000"));
    }

    #[test]
    fn global_options_after_subcommand() {
        let cli =
            Cli::try_parse_from(["tandem", "listen", "--echo", "--connect-timeout", "3"]).unwrap();
        assert!(matches!(cli.role, Role::Listen { echo: true, .. }));
        assert_eq!(cli.link_config().connect_timeout, Duration::from_secs(3));
    }

    #[test]
    fn bad_endpoint_is_rejected() {
        assert!(Cli::try_parse_from(["tandem", "connect", "no-port"]).is_err());
    }
}
