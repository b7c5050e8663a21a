use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3000;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Presentation assets served next to the relay
    pub static_dir: PathBuf,
    /// Rooms older than this are deleted by the sweep
    pub max_room_age: Duration,
    pub sweep_interval: Duration,
    pub max_connections: usize,
    /// Per-connection queue of pending shots
    pub shot_buffer: usize,
    /// Seed for room codes; `None` draws from OS entropy
    pub rng_seed: Option<u64>,
    /// Tell both room members when their room expires
    pub notify_on_expiry: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: format!("0.0.0.0:{}", DEFAULT_PORT),
            static_dir: PathBuf::from("public"),
            max_room_age: Duration::from_secs(30 * 60), // 30 minutes
            sweep_interval: Duration::from_secs(10 * 60), // 10 minutes
            max_connections: 1000,
            shot_buffer: 64,
            rng_seed: None,
            notify_on_expiry: true,
        }
    }
}

impl ServerConfig {
    /// Defaults with `PORT` and `ICEAGE_STATIC_DIR` overrides from the environment.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(port) = lookup("PORT").filter(|v| !v.is_empty()) {
            match port.parse::<u16>() {
                Ok(port) => config.listen_addr = format!("0.0.0.0:{}", port),
                Err(_) => tracing::warn!("Ignoring invalid PORT {:?}", port),
            }
        }
        if let Some(dir) = lookup("ICEAGE_STATIC_DIR").filter(|v| !v.is_empty()) {
            config.static_dir = PathBuf::from(dir);
        }

        config
    }

    pub fn validate(&self) -> Result<(), String> {
        if self
            .listen_addr
            .parse::<std::net::SocketAddr>()
            .is_err()
        {
            return Err(format!(
                "listen_addr {:?} is not a valid socket address",
                self.listen_addr
            ));
        }
        if self.max_room_age.is_zero() {
            return Err("max_room_age must be > 0".to_string());
        }
        if self.sweep_interval.is_zero() {
            return Err("sweep_interval must be > 0".to_string());
        }
        if self.max_connections == 0 {
            return Err("max_connections must be > 0".to_string());
        }
        if self.shot_buffer == 0 {
            return Err("shot_buffer must be > 0".to_string());
        }
        Ok(())
    }
}
