use linkbinder_core::{ArticleRef, Collection, CollectionStore, MemoryStore, StoreError};
use pretty_assertions::assert_eq;

fn sample(name: &str) -> Collection {
    Collection {
        name: name.to_string(),
        articles: vec![
            ArticleRef {
                url: "https://blog.test/one".into(),
                title: "One".into(),
            },
            ArticleRef {
                url: "https://blog.test/two".into(),
                title: "Two".into(),
            },
        ],
    }
}

#[test]
fn set_get_roundtrip_preserves_order() {
    let mut store = MemoryStore::new();
    store.set("https://blog.test/", sample("reading")).unwrap();

    let loaded = store.get("https://blog.test/").unwrap().unwrap();
    assert_eq!(loaded.name, "reading");
    assert_eq!(
        loaded.urls(),
        vec![
            "https://blog.test/one".to_string(),
            "https://blog.test/two".to_string()
        ]
    );
}

#[test]
fn invalid_collection_is_rejected_on_write() {
    let mut store = MemoryStore::new();
    let bad = Collection::new("   ");
    let err = store.set("k", bad).unwrap_err();
    assert!(matches!(err, StoreError::Invalid { .. }));
}

#[test]
fn keys_lists_known_collections() {
    let mut store = MemoryStore::new();
    store.set("https://b.test/", sample("b")).unwrap();
    store.set("https://a.test/", sample("a")).unwrap();
    assert_eq!(
        store.keys().unwrap(),
        vec!["https://a.test/".to_string(), "https://b.test/".to_string()]
    );

    store.remove("https://a.test/").unwrap();
    assert_eq!(store.keys().unwrap(), vec!["https://b.test/".to_string()]);
    assert!(store.get("https://a.test/").unwrap().is_none());
}

#[test]
fn collection_serde_shape_is_stable() {
    let json = serde_json::to_string(&sample("reading")).unwrap();
    let back: Collection = serde_json::from_str(&json).unwrap();
    assert_eq!(back, sample("reading"));
}
