//! Environment-driven configuration.
//!
//! `ROWFN_NO_CACHE` turns the adapter cache off:
//!
//! - set and empty, `1`, `true` or `all`: every family
//! - a comma-separated list of `foreach`, `scan`, `stmt`: the named families
//!
//! Unknown names are ignored with a warning.

use tracing::warn;

use crate::Registries;

/// Environment variable listing the cache families to disable.
pub const NO_CACHE_VAR: &str = "ROWFN_NO_CACHE";

/// Which cache families start disabled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Config {
    pub no_cache_for_each: bool,
    pub no_cache_scan: bool,
    pub no_cache_stmt: bool,
}

impl Config {
    /// Every family disabled.
    pub fn no_cache() -> Self {
        Config {
            no_cache_for_each: true,
            no_cache_scan: true,
            no_cache_stmt: true,
        }
    }

    /// Read [`NO_CACHE_VAR`]. An unset variable yields the default.
    pub fn from_env() -> Self {
        match std::env::var(NO_CACHE_VAR) {
            Ok(value) => Self::parse(&value),
            Err(_) => Config::default(),
        }
    }

    /// Parse a `ROWFN_NO_CACHE` value.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty()
            || value == "1"
            || value.eq_ignore_ascii_case("true")
            || value.eq_ignore_ascii_case("all")
        {
            return Self::no_cache();
        }

        let mut config = Config::default();
        for name in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match name.to_ascii_lowercase().as_str() {
                "foreach" | "for_each" => config.no_cache_for_each = true,
                "scan" => config.no_cache_scan = true,
                "stmt" | "statement" => config.no_cache_stmt = true,
                other => warn!(var = NO_CACHE_VAR, family = other, "unknown cache family"),
            }
        }
        config
    }

    /// Apply the disable switches to `registries`.
    pub fn apply(&self, registries: &Registries) {
        registries.for_each.disable(self.no_cache_for_each);
        registries.scan.disable(self.no_cache_scan);
        registries.statement.disable(self.no_cache_stmt);
    }
}
