//! # Identigo
//!
//! Single-tenant account identity and session service.
//!
//! - Account ids come from a mutex-serialized, bit-packed generator
//!   ([`idgen`]); each running instance must own a distinct
//!   (worker id, datacenter id) pair.
//! - Credentials are stored as unsalted SHA-1 digests for compatibility with
//!   existing rows ([`domain::hasher`]); plaintext secrets never hit a log
//!   line or the database.
//! - Sessions and registration tokens live in expiring in-memory caches
//!   ([`cache`], [`session`]) with fixed (non-sliding) TTLs, which makes
//!   sessions process-local: multi-instance deployments need a shared
//!   session store behind the same cache contract.

pub mod api;
pub mod bootstrap;
pub mod cache;
pub mod cli;
pub mod domain;
pub mod idgen;
pub mod session;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
    }
}
