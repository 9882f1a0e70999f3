//! Property-based tests for cache slot derivation and provider URLs.
//!
//! These tests use proptest to generate random library names and slices and
//! verify that invariants hold for all of them.

#[cfg(test)]
mod proptest_tests {
    use crate::cache::CacheStore;
    use crate::config::VersionSpec;
    use crate::provider::{resolve, FetchReference};
    use proptest::prelude::*;
    use std::path::{Component, Path};

    // ============================================================================
    // slot_for property tests
    // ============================================================================

    proptest! {
        /// Property: an accepted name always maps to a direct child of the root
        #[test]
        fn slot_is_direct_child_of_root(name in "\\PC{0,40}") {
            let store = CacheStore::new("/cache");
            if let Ok(slot) = store.slot_for(&name) {
                prop_assert_eq!(slot.path.parent(), Some(Path::new("/cache")));
                let last = slot.path.components().last();
                prop_assert!(matches!(last, Some(Component::Normal(_))));
            }
        }

        /// Property: slot_for is deterministic
        #[test]
        fn slot_for_is_deterministic(name in "[A-Za-z0-9 _-]{1,30}") {
            let store = CacheStore::new("/cache");
            prop_assert_eq!(store.slot_for(&name).unwrap(), store.slot_for(&name).unwrap());
        }

        /// Property: distinct accepted names never share a slot
        #[test]
        fn distinct_names_get_distinct_slots(
            a in "[A-Za-z0-9_-]{1,20}",
            b in "[A-Za-z0-9_-]{1,20}",
        ) {
            prop_assume!(a != b);
            let store = CacheStore::new("/cache");
            prop_assert_ne!(store.slot_for(&a).unwrap().path, store.slot_for(&b).unwrap().path);
        }

        /// Property: names containing a separator are always rejected
        #[test]
        fn names_with_separators_are_rejected(
            head in "[a-z]{0,5}",
            sep in "[/\\\\]",
            tail in "[a-z]{0,5}",
        ) {
            let store = CacheStore::new("/cache");
            let name = format!("{}{}{}", head, sep, tail);
            prop_assert!(store.slot_for(&name).is_err());
        }
    }

    // ============================================================================
    // resolve property tests
    // ============================================================================

    proptest! {
        /// Property: hosted providers always embed the slice and the tag
        #[test]
        fn github_urls_embed_slice_and_tag(
            owner in "[a-z][a-z0-9-]{0,15}",
            repo in "[a-z][a-z0-9._-]{0,15}",
            tag in "[a-z0-9][a-z0-9.]{0,10}",
        ) {
            let version = VersionSpec { tag: Some(tag.clone()), branch: None };
            let slice = format!("{}/{}", owner, repo);
            let reference = resolve("github", &slice, &version).unwrap();
            let FetchReference::Archive { primary, fallback } = reference else {
                panic!("github must resolve to an archive");
            };
            let expected = format!("https://github.com/{}/tarball/{}", slice, tag);
            prop_assert_eq!(primary.url, expected);
            prop_assert!(fallback.is_some());
        }

        /// Property: repo URLs pass through untouched
        #[test]
        fn repo_urls_are_verbatim(url in "\\PC{1,60}") {
            let reference = resolve("repo", &url, &VersionSpec::default()).unwrap();
            let FetchReference::Clone { url: resolved, .. } = reference else {
                panic!("repo must resolve to a clone");
            };
            prop_assert_eq!(resolved, url);
        }
    }
}
