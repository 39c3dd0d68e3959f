//! Caller identity resolution.
//!
//! Every shipment is owned by whoever created it, and every read is scoped to
//! the caller, so each command needs to know who is asking. Identity is
//! resolved through a chain:
//!
//! 1. `--as <identity>` — explicit per-command override
//! 2. `WAYBILL_IDENTITY` env var — process/session level
//! 3. `identity` in `~/.waybill/config.toml` — global default

use std::env;

use crate::config::Config;

/// Error message shown when identity cannot be resolved.
pub const IDENTITY_REQUIRED: &str = "identity required: pass --as <identity>, \
    set WAYBILL_IDENTITY, or add `identity = \"...\"` to ~/.waybill/config.toml";

/// Resolve the acting identity from the tiered resolution chain.
pub fn resolve_identity(explicit: Option<&str>, config: &Config) -> Result<String, String> {
    resolve_from(
        explicit,
        env::var("WAYBILL_IDENTITY").ok().as_deref(),
        config.identity.as_deref(),
    )
}

/// The resolution chain over already-read sources. Blank values are skipped.
fn resolve_from(
    explicit: Option<&str>,
    from_env: Option<&str>,
    from_config: Option<&str>,
) -> Result<String, String> {
    [explicit, from_env, from_config]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|id| !id.is_empty())
        .map(String::from)
        .ok_or_else(|| IDENTITY_REQUIRED.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_wins() {
        let id = resolve_from(Some("alice"), Some("bob"), Some("carol")).unwrap();
        assert_eq!(id, "alice");
    }

    #[test]
    fn env_beats_config() {
        let id = resolve_from(None, Some("bob"), Some("carol")).unwrap();
        assert_eq!(id, "bob");
    }

    #[test]
    fn falls_back_to_config() {
        let id = resolve_from(None, None, Some("carol")).unwrap();
        assert_eq!(id, "carol");
    }

    #[test]
    fn blank_values_are_skipped() {
        let id = resolve_from(Some("  "), Some(""), Some("carol")).unwrap();
        assert_eq!(id, "carol");
    }

    #[test]
    fn nothing_set_is_an_error() {
        let err = resolve_from(None, None, None).unwrap_err();
        assert_eq!(err, IDENTITY_REQUIRED);
    }
}
