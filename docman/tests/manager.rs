use bson::{Bson, doc, oid::ObjectId};
use docman::{memory::MemoryConnector, prelude::*};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Person {
    name: String,
    age: i32,
}

async fn people(cache: &ClientCache) -> DocumentClass {
    DocumentClass::builder("Person")
        .database(DatabaseSettings::new("memory://localhost", "docman_test"))
        .default_value("active", true)
        .declare(cache)
        .await
        .unwrap()
}

async fn seeded(cache: &ClientCache) -> DocumentClass {
    let class = people(cache).await;
    let mut documents = vec![
        class.create_document(doc! { "name": "Alice", "age": 30 }),
        class.create_document(doc! { "name": "Bob", "age": 25 }),
        class.create_document(doc! { "name": "Carol", "age": 35 }),
    ];

    class.documents().unwrap().insert_many(&mut documents).await.unwrap();
    class
}

#[tokio::test]
async fn test_create_applies_defaults_and_assigns_id() {
    let cache = ClientCache::new(MemoryConnector::new());
    let class = people(&cache).await;
    let manager = class.documents().unwrap();

    let alice = manager.create(doc! { "name": "Alice" }).await.unwrap();

    assert!(matches!(alice.id(), Some(Bson::ObjectId(_))));
    assert_eq!(alice.get("active").unwrap(), &Bson::Boolean(true));
    assert_eq!(manager.count(Filter::All).await.unwrap(), 1);
}

#[tokio::test]
async fn test_insert_many_records_ids() {
    let cache = ClientCache::new(MemoryConnector::new());
    let class = people(&cache).await;
    let mut documents = vec![
        class.create_document(doc! { "name": "Alice" }),
        class.create_document(doc! { "_id": 7, "name": "Bob" }),
    ];

    let ids = class.documents().unwrap().insert_many(&mut documents).await.unwrap();

    assert_eq!(ids.len(), 2);
    assert_eq!(documents[0].id(), Some(&ids[0]));
    assert_eq!(documents[1].id(), Some(&Bson::Int32(7)));
}

#[tokio::test]
async fn test_find_wraps_results_in_the_class() {
    let cache = ClientCache::new(MemoryConnector::new());
    let class = seeded(&cache).await;

    let found = class
        .documents()
        .unwrap()
        .find(
            Query::builder()
                .filter(Filter::gte("age", 30))
                .sort("age", SortDirection::Desc)
                .build(),
        )
        .await
        .unwrap();

    let names = found
        .iter()
        .map(|doc| doc.get_as::<String>("name").unwrap())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["Carol", "Alice"]);
    assert!(found.iter().all(|doc| doc.class() == &class));
}

#[tokio::test]
async fn test_find_without_filter_keeps_insertion_order() {
    let cache = ClientCache::new(MemoryConnector::new());
    let class = seeded(&cache).await;

    let found = class.documents().unwrap().find(Filter::All).await.unwrap();

    assert_eq!(found.len(), 3);
    assert_eq!(found[1].get_as::<String>("name").unwrap(), "Bob");
}

#[tokio::test]
async fn test_get_missing_document() {
    let cache = ClientCache::new(MemoryConnector::new());
    let class = seeded(&cache).await;

    let err = class
        .documents()
        .unwrap()
        .get(Filter::eq("name", "Nobody"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DocumentError::DoesNotExist { ref collection, .. } if collection == "person"
    ));
}

#[tokio::test]
async fn test_update_and_delete() {
    let cache = ClientCache::new(MemoryConnector::new());
    let class = seeded(&cache).await;
    let manager = class.documents().unwrap();

    let outcome = manager
        .update_many(Filter::lt("age", 35), Update::new().inc("age", 1))
        .await
        .unwrap();
    assert_eq!(outcome.modified, 2);

    let bob = manager.get(Filter::eq("name", "Bob")).await.unwrap();
    assert_eq!(bob.get_as::<i32>("age").unwrap(), 26);

    assert_eq!(manager.delete_one(Filter::eq("name", "Bob")).await.unwrap(), 1);
    assert_eq!(manager.delete_many(Filter::All).await.unwrap(), 2);
    assert_eq!(manager.count(Filter::All).await.unwrap(), 0);
}

#[tokio::test]
async fn test_save_refresh_and_delete_instance() {
    let cache = ClientCache::new(MemoryConnector::new());
    let class = people(&cache).await;
    let manager = class.documents().unwrap();

    let mut alice = class.create_document(doc! { "name": "Alice", "age": 30 });
    alice.save().await.unwrap();
    let id = alice.id().cloned().unwrap();

    alice.set("age", 31);
    alice.save().await.unwrap();
    assert_eq!(manager.count(Filter::All).await.unwrap(), 1);

    manager
        .update_one(Filter::id(id.clone()), Update::new().set("age", 40))
        .await
        .unwrap();
    alice.refresh().await.unwrap();
    assert_eq!(alice.get_as::<i32>("age").unwrap(), 40);

    assert_eq!(alice.delete().await.unwrap(), 1);
    assert!(matches!(
        alice.refresh().await,
        Err(DocumentError::DoesNotExist { .. })
    ));
}

#[tokio::test]
async fn test_save_with_preset_id_upserts() {
    let cache = ClientCache::new(MemoryConnector::new());
    let class = people(&cache).await;
    let id = ObjectId::new();

    let mut document = class.create_document(doc! { "_id": id, "name": "Dave" });
    document.save().await.unwrap();

    let stored = class.documents().unwrap().get(Filter::id(id)).await.unwrap();
    assert_eq!(stored.get_as::<String>("name").unwrap(), "Dave");
}

#[tokio::test]
async fn test_replace_one() {
    let cache = ClientCache::new(MemoryConnector::new());
    let class = seeded(&cache).await;
    let manager = class.documents().unwrap();

    let outcome = manager
        .replace_one(Filter::eq("name", "Bob"), doc! { "name": "Robert", "age": 26 }, false)
        .await
        .unwrap();

    assert_eq!(outcome.matched, 1);
    assert_eq!(manager.count(Filter::eq("name", "Robert")).await.unwrap(), 1);
    assert_eq!(manager.count(Filter::exists("active")).await.unwrap(), 2);
}

#[tokio::test]
async fn test_serde_round_trip() {
    let cache = ClientCache::new(MemoryConnector::new());
    let class = people(&cache).await;
    let alice = Person { name: "Alice".into(), age: 30 };

    let mut document = class.from_serialize(&alice).unwrap();
    document.save().await.unwrap();

    let stored = class.documents().unwrap().get(Filter::eq("name", "Alice")).await.unwrap();
    assert_eq!(stored.deserialize::<Person>().unwrap(), alice);
    assert_eq!(stored.to_json().unwrap()["age"], serde_json::json!(30));
}

#[tokio::test]
async fn test_classes_sharing_settings_share_storage() {
    let cache = ClientCache::new(MemoryConnector::new());
    let first = people(&cache).await;
    let second = DocumentClass::builder("PersonView")
        .database(DatabaseSettings::new("memory://localhost", "docman_test"))
        .collection_name("person")
        .declare(&cache)
        .await
        .unwrap();

    first.documents().unwrap().create(doc! { "name": "Alice" }).await.unwrap();

    assert_eq!(second.documents().unwrap().count(Filter::All).await.unwrap(), 1);
}

#[tokio::test]
async fn test_drop_collection() {
    let cache = ClientCache::new(MemoryConnector::new());
    let class = seeded(&cache).await;
    let manager = class.documents().unwrap();

    manager.drop_collection().await.unwrap();

    assert_eq!(manager.count(Filter::All).await.unwrap(), 0);
    assert_eq!(manager.collection().namespace().database, "docman_test");
}

#[tokio::test]
async fn test_shutdown_empties_cache() {
    let cache = ClientCache::new(MemoryConnector::new());
    people(&cache).await;

    cache.shutdown().await.unwrap();

    assert!(cache.is_empty().await);
}
