//! Property-based tests for exclusion and traversal ordering.
//!
//! These tests use proptest to generate arbitrary key trees and rule sets
//! and verify that the archive always matches an independent model of the
//! depth-first, keys-before-subfolders walk.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use proptest::prelude::*;
use s3zip_core::ArchiveConfig;
use s3zip_core::ArchiveProducer;
use s3zip_core::ExclusionMatcher;
use s3zip_core::MemoryStore;
use s3zip_core::produce_archive;
use std::collections::BTreeSet;
use std::io::Cursor;
use zip::ZipArchive;

/// Reference walk over a sorted key set.
fn model_order(keys: &BTreeSet<String>, prefix: &str, matcher: &ExclusionMatcher, out: &mut Vec<String>) {
    if matcher.is_excluded(prefix) {
        return;
    }

    let mut children = BTreeSet::new();
    for key in keys.iter().filter(|k| k.starts_with(prefix)) {
        let rest = &key[prefix.len()..];
        match rest.find('/') {
            Some(pos) => {
                children.insert(key[..prefix.len() + pos + 1].to_string());
            }
            None if key != prefix && !matcher.is_excluded(key) => out.push(key.clone()),
            None => {}
        }
    }

    for child in children {
        model_order(keys, &child, matcher, out);
    }
}

fn key_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-c]{1,2}", 1..5).prop_map(|parts| parts.join("/"))
}

fn archive_names(archive: &[u8]) -> Vec<String> {
    let mut zip = ZipArchive::new(Cursor::new(archive)).expect("valid archive");
    (0..zip.len())
        .map(|i| zip.by_index(i).unwrap().name().to_string())
        .collect()
}

proptest! {
    /// Exclusion is a pure function of rules and path.
    #[test]
    fn prop_exclusion_is_deterministic(
        patterns in prop::collection::vec("[a-c/^$.]{1,4}", 0..4),
        path in "[a-c/]{0,12}"
    ) {
        let Ok(matcher) = ExclusionMatcher::new(&patterns) else {
            return Ok(());
        };
        let first = matcher.is_excluded(&path);
        prop_assert_eq!(first, matcher.is_excluded(&path));
        prop_assert_eq!(first, matcher.first_match(&path).is_some());
    }

    /// An empty rule set excludes nothing.
    #[test]
    fn prop_empty_rules_exclude_nothing(path in ".{0,40}") {
        let matcher = ExclusionMatcher::default();
        prop_assert!(!matcher.is_excluded(&path));
    }

    /// Archive entries follow the depth-first, keys-before-subfolders order
    /// for any tree, page size and rule set.
    #[test]
    fn prop_archive_matches_model(
        keys in prop::collection::btree_set(key_strategy(), 1..25),
        page_size in 1usize..6,
        rule in prop::option::of("[a-c]{1,2}/"),
    ) {
        let mut store = MemoryStore::new("b").with_page_size(page_size);
        for key in &keys {
            store.insert(key.clone(), key.as_bytes().to_vec());
        }
        let patterns: Vec<String> = rule.into_iter().collect();
        let config = ArchiveConfig::new("b")
            .with_exclude_patterns(patterns.clone())
            .with_compression_level(0);

        let matcher = ExclusionMatcher::new(&patterns).unwrap();
        let mut expected = Vec::new();
        model_order(&keys, "", &matcher, &mut expected);

        let mut archive = Vec::new();
        let report = produce_archive(&store, &config, &mut archive).unwrap();

        prop_assert_eq!(archive_names(&archive), expected.clone());
        prop_assert_eq!(report.entries_added, expected.len());
        prop_assert!(report.is_complete());
    }

    /// Excluded subtrees are never listed.
    #[test]
    fn prop_pruned_prefixes_are_never_listed(
        keys in prop::collection::btree_set(key_strategy(), 1..25),
        excluded in "[a-c]{1,2}",
    ) {
        let mut store = MemoryStore::new("b");
        for key in &keys {
            store.insert(key.clone(), "x");
        }
        let pruned = format!("{excluded}/");
        let config = ArchiveConfig::new("b")
            .with_exclude_patterns(vec![format!("^{pruned}")]);

        let producer = ArchiveProducer::new(&store, &config).unwrap();
        let _ = producer.plan().unwrap();

        prop_assert!(store.listed_prefixes().iter().all(|p| !p.starts_with(&pruned)));
        prop_assert!(store.opened_keys().is_empty());
    }
}
