use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Kindred realtime relay server
#[derive(Parser, Serialize, Deserialize, Clone, Debug)]
#[command(name = "kindred-server", version, about = "Kindred realtime relay server")]
pub struct Config {
    /// TCP port the relay listens on
    #[arg(long, env = "KINDRED_PORT", default_value = "4801")]
    pub port: u16,

    /// Interface to bind
    #[arg(long, env = "KINDRED_BIND_ADDRESS", default_value = "0.0.0.0")]
    pub bind_address: String,

    /// TOML config file location
    #[arg(long, default_value = "./kindred.toml")]
    pub config: String,

    /// Emit JSON log lines instead of pretty output
    #[arg(long, env = "KINDRED_JSON_LOGS")]
    pub json_logs: bool,

    /// Print a commented config template and exit
    #[arg(long)]
    pub generate_config: bool,

    /// Directory for the SQLite database and the JWT signing key
    #[arg(long, env = "KINDRED_DATA_DIR", default_value = "./data")]
    pub data_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 4801,
            bind_address: "0.0.0.0".to_string(),
            config: "./kindred.toml".to_string(),
            json_logs: false,
            generate_config: false,
            data_dir: "./data".to_string(),
        }
    }
}

impl Config {
    /// Layered load: built-in defaults, then the TOML file, then `KINDRED_*`
    /// env vars, then CLI flags. Later layers win.
    pub fn load() -> Result<Self, figment::Error> {
        let cli = Config::parse();
        let config_path = cli.config.clone();

        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_path))
            .merge(Env::prefixed("KINDRED_"))
            .merge(Serialized::defaults(cli))
            .extract()
    }
}

/// Commented template for `--generate-config`.
pub fn generate_config_template() -> String {
    r#"# Kindred relay server configuration.
# Read from ./kindred.toml by default; point elsewhere with --config <path>.
# Every setting also answers to KINDRED_* env vars and CLI flags, which win
# over this file.

# TCP port the relay listens on (default: 4801)
# port = 4801

# Interface to bind (default: all interfaces)
# bind_address = "0.0.0.0"

# Emit JSON log lines instead of pretty output
# json_logs = false

# Directory for the SQLite database and the JWT signing key
# data_dir = "./data"
"#
    .to_string()
}
