//! Theme document logic for the wallet theme studio: patching, preview state,
//! palettes, presets and element mapping. Nothing in here touches the network
//! or the database.

use serde_json::Value;

pub mod analyzer;
pub mod elements;
pub mod generate;
pub mod palette;
pub mod patch;
pub mod preset;
pub mod probe;
pub mod store;
pub mod vision;

pub use patch::ThemeError;
pub use store::ThemeStore;

const DEFAULT_THEME_JSON: &str = include_str!("../assets/default_theme.json");
const WALLET_ELEMENTS_JSON: &str = include_str!("../assets/wallet_elements.json");

/// Baseline theme every preset patch is written against.
pub fn default_theme() -> Value {
    serde_json::from_str(DEFAULT_THEME_JSON).unwrap_or_else(|error| {
        tracing::error!(%error, "bundled default theme is not valid JSON");
        Value::Object(Default::default())
    })
}

/// Catalog of customizable wallet elements shipped with the studio.
pub fn builtin_wallet_elements() -> Vec<shared::domain::WalletElement> {
    serde_json::from_str(WALLET_ELEMENTS_JSON).unwrap_or_else(|error| {
        tracing::error!(%error, "bundled wallet element catalog is not valid JSON");
        Vec::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_assets_parse() {
        let theme = default_theme();
        assert!(theme.pointer("/homeLayer/backgroundColor").is_some());
        let elements = builtin_wallet_elements();
        assert!(elements.len() > 10);
        assert!(elements.iter().any(|e| !e.customizable));
    }
}
