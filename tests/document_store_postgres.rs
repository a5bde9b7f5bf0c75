use serde_json::json;
use sqlx::PgPool;
use subscription_backend::store::{DocumentStore, Filter, PgDocumentStore, WriteBatch};

// key: document-store-postgres-tests -> JSONB collection semantics
#[sqlx::test]
#[ignore = "requires DATABASE_URL with Postgres server"]
async fn batch_commit_preserves_order_and_filters_by_containment(pool: PgPool) {
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    let store = PgDocumentStore::new(pool);

    let mut batch = WriteBatch::new("subscriptionPlans");
    batch.set("b", json!({"serviceId": 2, "name": "Monthly"})).unwrap();
    batch.set("a", json!({"serviceId": 2, "name": "Yearly"})).unwrap();
    batch.set("c", json!({"serviceId": 3, "name": "Monthly"})).unwrap();
    store.commit(batch).await.unwrap();

    let ids: Vec<_> = store
        .query("subscriptionPlans", &Filter::new().eq("serviceId", 2))
        .await
        .unwrap()
        .into_iter()
        .map(|doc| doc.id)
        .collect();
    assert_eq!(ids, vec!["b", "a"]);

    let all = store
        .query("subscriptionPlans", &Filter::new())
        .await
        .unwrap();
    assert_eq!(all.len(), 3);

    let other = store
        .query("userSubscriptions", &Filter::new())
        .await
        .unwrap();
    assert!(other.is_empty());
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL with Postgres server"]
async fn update_merges_fields_and_requires_existing_document(pool: PgPool) {
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    let store = PgDocumentStore::new(pool);

    let mut batch = WriteBatch::new("userSubscriptions");
    batch
        .set(
            "sub-1",
            json!({"userId": "0xabc", "autoRenew": true, "endTime": 100, "pendingTransactionHash": "0x1"}),
        )
        .unwrap();
    store.commit(batch).await.unwrap();

    store
        .update(
            "userSubscriptions",
            "sub-1",
            json!({"autoRenew": false, "pendingTransactionHash": null, "updatedAt": 90}),
        )
        .await
        .unwrap();

    let docs = store
        .query(
            "userSubscriptions",
            &Filter::new().eq("userId", "0xabc").eq("autoRenew", false),
        )
        .await
        .unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].data["endTime"], json!(100));
    assert_eq!(docs[0].data["updatedAt"], json!(90));
    assert!(docs[0].data["pendingTransactionHash"].is_null());

    assert!(store
        .update("userSubscriptions", "ghost", json!({"autoRenew": false}))
        .await
        .is_err());
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL with Postgres server"]
async fn delete_removes_single_document(pool: PgPool) {
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    let store = PgDocumentStore::new(pool);

    let mut batch = WriteBatch::new("subscriptionPlans");
    batch.set("keep", json!({"serviceId": 1})).unwrap();
    batch.set("drop", json!({"serviceId": 1})).unwrap();
    store.commit(batch).await.unwrap();

    store.delete("subscriptionPlans", "drop").await.unwrap();

    let remaining = store
        .query("subscriptionPlans", &Filter::new())
        .await
        .unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, "keep");
}
