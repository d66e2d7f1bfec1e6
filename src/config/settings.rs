use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::env;
use std::env::current_dir;
use std::path::PathBuf;
use std::sync::RwLock;

pub static GLOBAL_CONFIG: Lazy<Config> = Lazy::new(Config::new);

static DEFAULT_NODE_ADDR: &str = "0.0.0.0:9888";

const NODE_ADDRESS_KEY: &str = "NODE_ADDRESS";
const LEDGER_PATH_KEY: &str = "LEDGER_PATH";

/// Process-level settings read once from the environment.
pub struct Config {
    inner: RwLock<HashMap<String, String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Config {
        let mut map = HashMap::new();

        let node_addr = env::var(NODE_ADDRESS_KEY).unwrap_or_else(|_| DEFAULT_NODE_ADDR.to_string());
        map.insert(String::from(NODE_ADDRESS_KEY), node_addr);

        if let Ok(path) = env::var(LEDGER_PATH_KEY) {
            map.insert(String::from(LEDGER_PATH_KEY), path);
        }

        Config {
            inner: RwLock::new(map),
        }
    }

    pub fn get_node_addr(&self) -> String {
        let inner = self
            .inner
            .read()
            .expect("Failed to acquire read lock on config - this should never happen");
        inner
            .get(NODE_ADDRESS_KEY)
            .cloned()
            .unwrap_or_else(|| DEFAULT_NODE_ADDR.to_string())
    }

    pub fn set_node_addr(&self, addr: String) {
        let mut inner = self
            .inner
            .write()
            .expect("Failed to acquire write lock on config - this should never happen");
        inner.insert(String::from(NODE_ADDRESS_KEY), addr);
    }

    /// Ledger location, `./data/ledger` unless `LEDGER_PATH` says otherwise
    pub fn get_ledger_path(&self) -> PathBuf {
        let inner = self
            .inner
            .read()
            .expect("Failed to acquire read lock on config - this should never happen");
        match inner.get(LEDGER_PATH_KEY) {
            Some(path) => PathBuf::from(path),
            None => current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join("data")
                .join("ledger"),
        }
    }

    pub fn set_ledger_path(&self, path: PathBuf) {
        let mut inner = self
            .inner
            .write()
            .expect("Failed to acquire write lock on config - this should never happen");
        inner.insert(
            String::from(LEDGER_PATH_KEY),
            path.to_string_lossy().into_owned(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_take_effect() {
        let config = Config::new();
        config.set_node_addr("127.0.0.1:7000".to_string());
        config.set_ledger_path(PathBuf::from("/tmp/other-ledger"));

        assert_eq!(config.get_node_addr(), "127.0.0.1:7000");
        assert_eq!(config.get_ledger_path(), PathBuf::from("/tmp/other-ledger"));
    }

    #[test]
    fn test_default_ledger_path_ends_in_data_ledger() {
        let config = Config {
            inner: RwLock::new(HashMap::new()),
        };
        assert!(config.get_ledger_path().ends_with("data/ledger"));
        assert_eq!(config.get_node_addr(), DEFAULT_NODE_ADDR);
    }
}
