//! Crate-wide constants shared by the hashing service, the registry and the event log.

/// Collection name reported by the registry.
pub const COLLECTION_NAME: &str = "EduVault Degree";

/// Collection symbol reported by the registry.
pub const COLLECTION_SYMBOL: &str = "EVD";

/// First token ID handed out by the registry.
///
/// IDs are assigned densely from here: the first credential ever minted is token 0.
pub const FIRST_TOKEN_ID: u64 = 0;

// Domain separators.
//
// Each commitment kind hashes under its own tag so a credential commitment can never
// be replayed as a claim commitment (or vice versa), even for identical payload bytes.
pub const CREDENTIAL_DOMAIN: &[u8] = b"eduvault.credential.v1";
pub const CLAIM_DOMAIN: &[u8] = b"eduvault.claim.v1";
pub const EVENT_DOMAIN: &[u8] = b"eduvault.event.v1";

/// Upper bound on a single canonicalized field, in bytes.
pub const MAX_FIELD_BYTES: usize = 4096;

/// Salt length produced by [`crate::types::Salt::generate`].
pub const SALT_LEN: usize = 32;

/// Minimum accepted salt length (128 bits).
pub const MIN_SALT_LEN: usize = 16;

/// Maximum accepted salt length.
pub const MAX_SALT_LEN: usize = 64;

/// Hash chain anchor: the `prev_hash` of the very first event.
pub const GENESIS_HASH: [u8; 32] = [0u8; 32];

/// Buffer size of the event broadcast channel. Slow subscribers past this lag and
/// must catch up from the log itself.
pub const EVENT_CHANNEL_CAPACITY: usize = 1024;
