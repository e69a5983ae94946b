//! Mirror-aware artwork URL resolution.
//!
//! Artwork is published on a primary host plus an ordered list of mirror
//! hosts serving identical content at the same path. Resolution is a pure
//! function of the artwork set, the wanted size and an attempt index:
//!
//! - attempt 0 is the primary URL, untouched
//! - attempt `i` (1..=mirrors) is the primary URL with its host replaced by
//!   the host of `mirrors[i - 1]` (and its port, when the mirror names a
//!   non-default one)
//! - anything past the last mirror resolves to `None` (exhausted)
//!
//! The attempt counter itself belongs to whoever displays the image; see
//! [`MirrorCursor`].

use reqwest::Url;

use crate::model::{ArtworkSet, ArtworkSize};

/// Resolve the candidate URL for one attempt.
///
/// Returns `None` when there is no primary URL for `size`, when `attempt`
/// is past the last mirror, or when either URL fails to parse.
pub fn resolve(artwork: &ArtworkSet, size: ArtworkSize, attempt: usize) -> Option<String> {
    let primary = artwork.primary(size)?;

    if attempt == 0 {
        return Some(primary.to_string());
    }

    let mirror = artwork.mirrors().get(attempt - 1)?;

    let mut url = Url::parse(primary).ok()?;
    let mirror = Url::parse(mirror).ok()?;

    // Only the authority changes; scheme, path and query stay the primary's.
    // A mirror without an explicit port keeps the primary's.
    url.set_host(mirror.host_str()).ok()?;
    if let Some(port) = mirror.port() {
        url.set_port(Some(port)).ok()?;
    }

    Some(url.to_string())
}

/// Per-image attempt counter.
///
/// Starts at the primary URL. Every load failure advances exactly one
/// attempt; once resolution yields nothing the cursor is exhausted for
/// good and never goes back.
#[derive(Debug, Clone)]
pub struct MirrorCursor<'a> {
    artwork: &'a ArtworkSet,
    size: ArtworkSize,
    attempt: usize,
    exhausted: bool,
}

impl<'a> MirrorCursor<'a> {
    pub fn new(artwork: &'a ArtworkSet, size: ArtworkSize) -> Self {
        let mut cursor = Self {
            artwork,
            size,
            attempt: 0,
            exhausted: false,
        };
        if cursor.current().is_none() {
            cursor.exhausted = true;
        }
        cursor
    }

    /// Zero-based attempt index (0 = primary).
    pub fn attempt(&self) -> usize {
        self.attempt
    }

    /// Primary plus one attempt per mirror.
    pub fn max_attempts(&self) -> usize {
        self.artwork.mirrors().len() + 1
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// URL for the current attempt, or `None` once exhausted.
    pub fn current(&self) -> Option<String> {
        if self.exhausted || self.attempt >= self.max_attempts() {
            return None;
        }
        resolve(self.artwork, self.size, self.attempt)
    }

    /// Record a load failure and move to the next candidate.
    pub fn advance(&mut self) -> Option<String> {
        if self.exhausted {
            return None;
        }
        if self.attempt + 1 >= self.max_attempts() {
            self.exhausted = true;
            return None;
        }

        self.attempt += 1;
        let next = self.current();
        if next.is_none() {
            self.exhausted = true;
        }
        next
    }
}


/// Property-based tests using proptest
#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn host() -> impl Strategy<Value = String> {
        prop::string::string_regex("[a-z][a-z0-9]{0,10}(\\.[a-z]{2,5})?").unwrap()
    }

    fn path() -> impl Strategy<Value = String> {
        prop::string::string_regex("(/[a-zA-Z0-9_-]{1,8}){1,4}\\.jpg").unwrap()
    }

    fn query() -> impl Strategy<Value = Option<String>> {
        proptest::option::of(prop::string::string_regex("[a-z]{1,5}=[a-z0-9]{1,5}").unwrap())
    }

    proptest! {
        /// Every attempt in 0..=k resolves, nothing past k does
        #[test]
        fn resolves_exactly_k_plus_one_attempts(
            primary_host in host(),
            path in path(),
            mirrors in prop::collection::vec(host(), 0..6),
        ) {
            let primary = format!("https://{primary_host}{path}");
            let mirror_urls: Vec<String> = mirrors.iter().map(|h| format!("https://{h}")).collect();
            let k = mirror_urls.len();
            let art = ArtworkSet::new([(ArtworkSize::Medium, primary)], mirror_urls);

            for attempt in 0..=k {
                prop_assert!(resolve(&art, ArtworkSize::Medium, attempt).is_some());
            }
            for attempt in (k + 1)..(k + 4) {
                prop_assert!(resolve(&art, ArtworkSize::Medium, attempt).is_none());
            }
        }

        /// Attempt 0 is the primary URL, byte for byte
        #[test]
        fn attempt_zero_is_untouched(primary_host in host(), path in path(), q in query()) {
            let primary = match q {
                Some(q) => format!("https://{primary_host}{path}?{q}"),
                None => format!("https://{primary_host}{path}"),
            };
            let art = ArtworkSet::new([(ArtworkSize::Small, primary.clone())], vec!["https://m".to_string()]);
            prop_assert_eq!(resolve(&art, ArtworkSize::Small, 0), Some(primary));
        }

        /// Mirror attempts swap the host and keep path and query
        #[test]
        fn mirror_attempt_swaps_host_only(
            primary_host in host(),
            path in path(),
            q in query(),
            mirrors in prop::collection::vec(host(), 1..5),
        ) {
            let primary = match &q {
                Some(q) => format!("https://{primary_host}{path}?{q}"),
                None => format!("https://{primary_host}{path}"),
            };
            let mirror_urls: Vec<String> = mirrors.iter().map(|h| format!("https://{h}")).collect();
            let art = ArtworkSet::new([(ArtworkSize::Large, primary.clone())], mirror_urls.clone());
            let original = Url::parse(&primary).unwrap();

            for i in 1..=mirror_urls.len() {
                let resolved = resolve(&art, ArtworkSize::Large, i).unwrap();
                let resolved = Url::parse(&resolved).unwrap();
                let mirror = Url::parse(&mirror_urls[i - 1]).unwrap();
                prop_assert_eq!(resolved.host_str(), mirror.host_str());
                prop_assert_eq!(resolved.path(), original.path());
                prop_assert_eq!(resolved.query(), original.query());
                prop_assert_eq!(resolved.scheme(), original.scheme());
            }
        }
    }
}
