use once_cell::sync::Lazy;

/// Directory under the user's home holding config, stores, and logs.
pub const DATA_DIR: &str = ".rondo";

// Reputation probe protocol. The settle/retry waits are part of the oracle
// interaction, not incidental timeouts: the oracle needs a few seconds to
// answer, and a restricted verdict can lift between attempts.
pub const PROBE_MAX_RETRIES: u32 = 5;
pub const PROBE_SETTLE_SECS: u64 = 5;
pub const PROBE_RETRY_DELAY_SECS: u64 = 10;
pub const PROBE_COMMAND: &str = "/start";

/// An oracle reply containing any of these (case-insensitive) marks the
/// identity restricted. Positive phrasing varies too much to match on, so
/// absence of all keywords is read as healthy.
pub const RESTRICTION_KEYWORDS: &[&str] = &["restricted", "limited", "sorry"];

/// Evidence recorded when the oracle never answered within the retry budget.
pub const NO_REPLY_EVIDENCE: &str = "No reply received from reputation oracle.";

/// User agent presented to the protocol gateway.
pub static USER_AGENT: Lazy<String> = Lazy::new(|| {
    format!(
        "rondo/{} {}/{}",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
});
