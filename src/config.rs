use clap::Parser;
use std::path::PathBuf;

/// Vortex Dashboard — drives and observes the external VPN endpoint tester.
#[derive(Parser, Debug, Clone)]
#[command(name = "vortex-dashboard")]
pub struct CliArgs {
    /// Dashboard HTTP port
    #[arg(long = "port", default_value_t = DEFAULT_DASHBOARD_PORT)]
    pub port: u16,

    /// Base URL of the external tester service
    #[arg(long = "tester-url", default_value = DEFAULT_TESTER_URL)]
    pub tester_url: String,

    /// Directory for the local database (defaults to the platform data dir)
    #[arg(long = "data-dir")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub port: u16,
    pub tester_url: String,
    pub data_dir: PathBuf,
}

pub const DEFAULT_DASHBOARD_PORT: u16 = 9870;
pub const DEFAULT_TESTER_URL: &str = "http://127.0.0.1:9871";

// Collaborator call timeouts
pub const HTTP_CLIENT_TIMEOUT_SECS: u64 = 10;
pub const STORE_CALL_TIMEOUT_SECS: u64 = 30;

// Channel / buffer sizing
pub const LOG_BUFFER_SIZE: usize = 500;
pub const INTENT_CHANNEL_SIZE: usize = 256;

// Invalid links are echoed back truncated to this many characters.
pub const INVALID_LINK_DISPLAY_LEN: usize = 50;

impl DashboardConfig {
    pub fn from_args(args: CliArgs) -> Self {
        let data_dir = args.data_dir.unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("vortex-dashboard")
        });

        DashboardConfig {
            port: args.port,
            tester_url: args.tester_url.trim_end_matches('/').to_string(),
            data_dir,
        }
    }
}
