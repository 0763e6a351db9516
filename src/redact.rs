//! Redaction of key material in logs and `Debug` output.
//!
//! [`Redacted`] formats as `"<redacted>"` whatever it wraps, so a private key
//! or a config struct holding one can be passed to `tracing` or `{:?}`
//! without leaking.

use std::fmt::{self, Debug, Display};

/// Wrapper that hides its inner value when formatted.
///
/// ```ignore
/// use bridge_deployer::redact::Redacted;
///
/// tracing::debug!(key = %Redacted(&raw_key), "Loaded deployment key");
/// // Logs: key = <redacted>
/// ```
#[derive(Clone, Copy)]
pub struct Redacted<T>(pub T);

impl<T> Debug for Redacted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

impl<T> Display for Redacted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacted_hides_value() {
        let secret = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
        assert_eq!(format!("{}", Redacted(secret)), "<redacted>");
        assert_eq!(format!("{:?}", Redacted(secret)), "<redacted>");
    }
}
