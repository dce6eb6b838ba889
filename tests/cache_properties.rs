//! Embedding-cache round-trip and eviction properties over randomly
//! generated vectors, using `proptest` rather than the fixed cases already
//! covered by `cache::mod`'s unit tests.

use anteater::cache::EmbeddingCache;
use proptest::prelude::*;

proptest! {
    #[test]
    fn put_then_get_with_matching_hash_always_returns_the_same_vector(
        values in prop::collection::vec(-1000.0f32..1000.0, 1..16),
    ) {
        let mut cache = EmbeddingCache::new(8);
        cache.put("id", "hash-a", values.clone());
        prop_assert_eq!(cache.get("id", "hash-a"), Some(values));
    }

    #[test]
    fn save_then_load_preserves_every_entry_as_an_id_hash_vector_set(
        entries in prop::collection::vec(("[a-z]{1,8}", "[a-f0-9]{4}", prop::collection::vec(-10.0f32..10.0, 1..4)), 1..6),
    ) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let mut cache = EmbeddingCache::new(entries.len());
        for (id, hash, vector) in &entries {
            cache.put(id.clone(), hash.clone(), vector.clone());
        }
        cache.save(&path).unwrap();

        let mut reloaded = EmbeddingCache::load(&path, entries.len());
        for (id, hash, vector) in &entries {
            prop_assert_eq!(reloaded.get(id, hash), Some(vector.clone()));
        }
    }
}

#[test]
fn lru_eviction_never_keeps_more_than_max_entries_under_repeated_inserts() {
    let mut cache = EmbeddingCache::new(3);
    for i in 0..20 {
        cache.put(format!("id-{i}"), "h", vec![i as f32]);
        assert!(cache.len() <= 3);
    }
}
