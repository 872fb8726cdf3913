/// Persisted registry of every trend token ever seen

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::core::types::TrendToken;

/// Keyed collection of trend tokens backed by a JSON file.
///
/// The key set doubles as the poller's dedup set, so entries are never
/// removed: forgetting an address would re-admit it on the next poll.
pub struct TokenRegistry {
    tokens: RwLock<HashMap<String, TrendToken>>,
    file_path: PathBuf,
}

impl TokenRegistry {
    /// Opens the registry at `path`, loading any previously persisted state.
    /// A missing file starts an empty registry.
    pub fn load<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let file_path = path.into();
        let tokens = if file_path.exists() {
            let json = fs::read_to_string(&file_path)
                .with_context(|| format!("failed to read {}", file_path.display()))?;
            serde_json::from_str(&json)
                .with_context(|| format!("failed to parse {}", file_path.display()))?
        } else {
            debug!(path = %file_path.display(), "no persisted registry, starting empty");
            HashMap::new()
        };

        Ok(Self {
            tokens: RwLock::new(tokens),
            file_path,
        })
    }

    pub fn contains(&self, address: &str) -> bool {
        self.tokens.read().unwrap().contains_key(address)
    }

    pub fn get(&self, address: &str) -> Option<TrendToken> {
        self.tokens.read().unwrap().get(address).cloned()
    }

    pub fn insert(&self, token: TrendToken) {
        let mut tokens = self.tokens.write().unwrap();
        tokens.insert(token.token_address.clone(), token);
        drop(tokens);

        if let Err(error) = self.save() {
            warn!(%error, "failed to persist registry after insert");
        }
    }

    /// Applies `apply` to the entry for `address`, persisting the change.
    /// Returns false when the address is unknown.
    pub fn update<F>(&self, address: &str, apply: F) -> bool
    where
        F: FnOnce(&mut TrendToken),
    {
        let mut tokens = self.tokens.write().unwrap();
        let Some(token) = tokens.get_mut(address) else {
            return false;
        };
        apply(token);
        drop(tokens);

        if let Err(error) = self.save() {
            warn!(%error, "failed to persist registry after update");
        }
        true
    }

    pub fn snapshot(&self) -> Vec<TrendToken> {
        self.tokens.read().unwrap().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tokens.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn save(&self) -> Result<()> {
        let tokens = self.tokens.read().unwrap();
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&*tokens)?;
        fs::write(&self.file_path, json)
            .with_context(|| format!("failed to write {}", self.file_path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use crate::core::types::TREND_WINDOW_MINUTES;

    fn token(address: &str) -> TrendToken {
        let create_time = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        TrendToken {
            id: 1,
            token_name: format!("tok-{address}"),
            liquidity: 10_000.0,
            token_address: address.to_string(),
            initial_price: 0.001,
            m1_price: 0.0012,
            create_time,
            close_deadline: create_time + Duration::minutes(TREND_WINDOW_MINUTES),
            bought_in: None,
            sold_out: None,
        }
    }

    #[test]
    fn missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let registry = TokenRegistry::load(dir.path().join("tokens.json")).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn addresses_and_flags_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");

        let registry = TokenRegistry::load(&path).unwrap();
        registry.insert(token("AAA"));
        registry.insert(token("BBB"));
        registry.update("AAA", |t| t.bought_in = Some(true));
        registry.update("AAA", |t| t.sold_out = Some(false));
        registry.save().unwrap();

        let reloaded = TokenRegistry::load(&path).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.contains("AAA"));
        assert!(reloaded.contains("BBB"));

        let aaa = reloaded.get("AAA").unwrap();
        assert_eq!(aaa.bought_in, Some(true));
        assert_eq!(aaa.sold_out, Some(false));

        let bbb = reloaded.get("BBB").unwrap();
        assert_eq!(bbb.bought_in, None);
        assert_eq!(bbb.sold_out, None);
    }

    #[test]
    fn update_unknown_address_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let registry = TokenRegistry::load(dir.path().join("tokens.json")).unwrap();
        assert!(!registry.update("missing", |t| t.bought_in = Some(true)));
    }
}
