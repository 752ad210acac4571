use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;
use storefront_core::db::{open_db_in_memory, SharedConnection};
use storefront_core::model::attribute::AttributeKind;
use storefront_core::repo::attribute_repo::{AttributeStore, SqliteAttributeRepository};
use storefront_core::repo::product_repo::{ProductStore, SqliteProductRepository};
use storefront_core::{
    AttributeEntity, Product, ProductDraft, ProductPatch, ProductService, ProductServiceError,
    ReconcileError, RepoError, RepoResult, RequestContext, StorefrontConfig, ValidationError,
};
use uuid::Uuid;

fn shared() -> SharedConnection {
    Mutex::new(open_db_in_memory().unwrap())
}

fn config(workers: usize) -> StorefrontConfig {
    StorefrontConfig {
        reconcile_workers: workers,
        ..StorefrontConfig::default()
    }
}

fn draft(colours: &[&str], materials: &[&str]) -> ProductDraft {
    ProductDraft {
        name: "Linen shirt".to_string(),
        description: Some("Soft summer shirt".to_string()),
        price: "49.90".to_string(),
        stock: 5,
        sub_category_id: Uuid::new_v4().to_string(),
        brand: Some("Acme".to_string()),
        colours: colours.iter().map(|c| c.to_string()).collect(),
        materials: materials.iter().map(|m| m.to_string()).collect(),
        ..ProductDraft::default()
    }
}

/// Delegates to SQLite but fails lookups for one key.
struct FailingLookup<'conn> {
    inner: SqliteAttributeRepository<'conn>,
    fail_key: &'static str,
}

impl AttributeStore for FailingLookup<'_> {
    fn find_by_key(&self, kind: AttributeKind, key: &str) -> RepoResult<AttributeEntity> {
        if key == self.fail_key {
            return Err(RepoError::InvalidData(format!("lookup failed: {key}")));
        }
        self.inner.find_by_key(kind, key)
    }

    fn create(&self, kind: AttributeKind, label: &str) -> RepoResult<AttributeEntity> {
        self.inner.create(kind, label)
    }

    fn count(&self, kind: AttributeKind) -> RepoResult<i64> {
        self.inner.count(kind)
    }

    fn list(&self, kind: AttributeKind, offset: i32, limit: i32) -> RepoResult<Vec<AttributeEntity>> {
        self.inner.list(kind, offset, limit)
    }
}

#[test]
fn create_links_every_colour_and_material() {
    let conn = shared();
    let products = SqliteProductRepository::new(&conn);
    let attributes = SqliteAttributeRepository::new(&conn);
    let service = ProductService::new(&products, &attributes, &attributes, &config(5));
    let colours = ["#000000", "#111111", "#222222", "#333333", "#444444", "#555555"];
    let materials = ["cotton", "linen", "silk", "wool"];

    let product = service
        .create_product(&RequestContext::new(), &draft(&colours, &materials))
        .unwrap();

    let linked_colours = service
        .list_product_attributes(AttributeKind::Colour, product.id, 1, 100)
        .unwrap();
    assert_eq!(linked_colours.total_count, 6);
    let labels: HashSet<_> = linked_colours.data.iter().map(|e| e.label.clone()).collect();
    let expected: HashSet<_> = colours.iter().map(|c| c.to_string()).collect();
    assert_eq!(labels, expected);

    let linked_materials = service
        .list_product_attributes(AttributeKind::Material, product.id, 1, 100)
        .unwrap();
    assert_eq!(linked_materials.total_count, 4);
}

#[test]
fn duplicate_colour_in_one_request_creates_one_entity_and_two_links() {
    let conn = shared();
    let products = SqliteProductRepository::new(&conn);
    let attributes = SqliteAttributeRepository::new(&conn);
    let service = ProductService::new(&products, &attributes, &attributes, &config(5));

    let product = service
        .create_product(&RequestContext::new(), &draft(&["#FF0000", " #ff0000 "], &[]))
        .unwrap();

    assert_eq!(attributes.count(AttributeKind::Colour).unwrap(), 1);
    let entity = attributes
        .find_by_key(AttributeKind::Colour, "#ff0000")
        .unwrap();
    let links = service
        .list_product_attributes(AttributeKind::Colour, product.id, 1, 10)
        .unwrap();
    assert_eq!(links.total_count, 2);
    assert!(links.data.iter().all(|linked| linked.id == entity.id));
}

#[test]
fn materials_are_shared_across_products_regardless_of_case() {
    let conn = shared();
    let products = SqliteProductRepository::new(&conn);
    let attributes = SqliteAttributeRepository::new(&conn);
    let service = ProductService::new(&products, &attributes, &attributes, &config(3));
    let ctx = RequestContext::new();

    let first = service.create_product(&ctx, &draft(&[], &["Cotton"])).unwrap();
    let second = service.create_product(&ctx, &draft(&[], &["cotton"])).unwrap();

    assert_eq!(attributes.count(AttributeKind::Material).unwrap(), 1);
    let first_links = service
        .list_product_attributes(AttributeKind::Material, first.id, 1, 10)
        .unwrap();
    let second_links = service
        .list_product_attributes(AttributeKind::Material, second.id, 1, 10)
        .unwrap();
    assert_eq!(first_links.data[0].id, second_links.data[0].id);
    assert_eq!(first_links.data[0].label, "Cotton");
}

#[test]
fn invalid_request_fails_before_anything_is_stored() {
    let conn = shared();
    let products = SqliteProductRepository::new(&conn);
    let attributes = SqliteAttributeRepository::new(&conn);
    let service = ProductService::new(&products, &attributes, &attributes, &config(2));
    let ctx = RequestContext::new();

    let mut bad_category = draft(&["#ffffff"], &[]);
    bad_category.sub_category_id = "not-a-uuid".to_string();
    let err = service.create_product(&ctx, &bad_category).unwrap_err();
    assert!(matches!(
        err,
        ProductServiceError::Validation(ValidationError::InvalidCategoryId(_))
    ));

    let blank_material = draft(&["#ffffff"], &["wool", "   "]);
    let err = service.create_product(&ctx, &blank_material).unwrap_err();
    assert!(matches!(
        err,
        ProductServiceError::Validation(ValidationError::BlankAttributeLabel {
            kind: AttributeKind::Material,
            index: 1
        })
    ));

    assert_eq!(products.count_products().unwrap(), 0);
    assert_eq!(attributes.count(AttributeKind::Colour).unwrap(), 0);
}

#[test]
fn reconciliation_failure_keeps_product_and_can_be_retried() {
    let conn = shared();
    let products = SqliteProductRepository::new(&conn);
    let attributes = SqliteAttributeRepository::new(&conn);
    let failing = FailingLookup {
        inner: SqliteAttributeRepository::new(&conn),
        fail_key: "wool",
    };
    let flaky_service = ProductService::new(&products, &failing, &attributes, &config(1));
    let service = ProductService::new(&products, &attributes, &attributes, &config(1));
    let ctx = RequestContext::new();

    let err = flaky_service
        .create_product(&ctx, &draft(&["#000000"], &["wool"]))
        .unwrap_err();
    let product_id = match err {
        ProductServiceError::Reconciliation {
            product_id,
            source: ReconcileError::Task { task, source },
        } => {
            assert_eq!(task.label, "wool");
            assert!(matches!(source, RepoError::InvalidData(_)));
            product_id
        }
        other => panic!("unexpected error: {other}"),
    };

    let stored = service.get_product(product_id).unwrap();
    assert_eq!(stored.name, "Linen shirt");

    let report = service
        .reconcile_attributes(&ctx, product_id, &[], &["wool".to_string()])
        .unwrap();
    assert_eq!(report.links_created, 1);
    assert_eq!(report.attributes_created, 1);
    let colours = service
        .list_product_attributes(AttributeKind::Colour, product_id, 1, 10)
        .unwrap();
    let materials = service
        .list_product_attributes(AttributeKind::Material, product_id, 1, 10)
        .unwrap();
    assert_eq!(colours.total_count, 1);
    assert_eq!(materials.total_count, 1);
}

#[test]
fn update_applies_patch_and_keeps_missing_fields() {
    let conn = shared();
    let products = SqliteProductRepository::new(&conn);
    let attributes = SqliteAttributeRepository::new(&conn);
    let service = ProductService::new(&products, &attributes, &attributes, &config(4));
    let ctx = RequestContext::new().with_actor(Uuid::new_v4());

    let created = service.create_product(&ctx, &draft(&["#000000"], &[])).unwrap();
    assert_eq!(created.last_updated, None);

    let patch = ProductPatch {
        name: Some("Linen shirt v2".to_string()),
        brand: Some("   ".to_string()),
        stock: Some(0),
        review_count: Some(12),
        colours: vec!["#000000".to_string(), "#ffffff".to_string()],
        ..ProductPatch::default()
    };
    let updated = service.update_product(&ctx, created.id, &patch).unwrap();

    assert_eq!(updated.name, "Linen shirt v2");
    // Zero counts mean "not supplied".
    assert_eq!(updated.stock, 5);
    assert_eq!(updated.review_count, 12);
    assert_eq!(updated.brand, created.brand);
    assert_eq!(updated.description, created.description);
    assert_eq!(updated.price, created.price);
    assert_eq!(updated.sub_category_id, created.sub_category_id);
    assert_eq!(updated.created_at, created.created_at);
    assert!(updated.last_updated.is_some());

    // Links are appended, never deduplicated.
    let colours = service
        .list_product_attributes(AttributeKind::Colour, created.id, 1, 10)
        .unwrap();
    assert_eq!(colours.total_count, 3);
    assert_eq!(attributes.count(AttributeKind::Colour).unwrap(), 2);
}

#[test]
fn blank_update_changes_nothing_but_last_updated() {
    let conn = shared();
    let products = SqliteProductRepository::new(&conn);
    let attributes = SqliteAttributeRepository::new(&conn);
    let service = ProductService::new(&products, &attributes, &attributes, &config(2));
    let ctx = RequestContext::new();

    let mut full = draft(&[], &[]);
    full.image_url = Some("https://cdn.example.com/shirt.png".to_string());
    full.keywords = Some("summer linen".to_string());
    let created = service.create_product(&ctx, &full).unwrap();

    let blank = ProductPatch {
        name: Some(String::new()),
        description: Some("  ".to_string()),
        image_url: Some(String::new()),
        price: Some(" ".to_string()),
        stock: Some(0),
        sub_category_id: Some(String::new()),
        brand: Some(String::new()),
        rating: Some(String::new()),
        review_count: Some(0),
        discount_rate: Some(String::new()),
        keywords: Some(" ".to_string()),
        is_active: None,
        ..ProductPatch::default()
    };
    let updated = service.update_product(&ctx, created.id, &blank).unwrap();

    assert_eq!(
        Product {
            last_updated: None,
            ..updated.clone()
        },
        Product {
            last_updated: None,
            ..created.clone()
        }
    );
    assert!(created.last_updated.is_none());
    assert!(updated.last_updated.unwrap() >= updated.created_at);
}

#[test]
fn every_update_refreshes_last_updated() {
    let conn = shared();
    let products = SqliteProductRepository::new(&conn);
    let attributes = SqliteAttributeRepository::new(&conn);
    let service = ProductService::new(&products, &attributes, &attributes, &config(1));
    let ctx = RequestContext::new();
    let created = service.create_product(&ctx, &draft(&[], &[])).unwrap();

    let first = service
        .update_product(&ctx, created.id, &ProductPatch::default())
        .unwrap();
    std::thread::sleep(Duration::from_millis(20));
    let second = service
        .update_product(&ctx, created.id, &ProductPatch::default())
        .unwrap();

    assert!(second.last_updated.unwrap() > first.last_updated.unwrap());
}

#[test]
fn product_attributes_are_listed_in_link_order() {
    let conn = shared();
    let products = SqliteProductRepository::new(&conn);
    let attributes = SqliteAttributeRepository::new(&conn);
    let service = ProductService::new(&products, &attributes, &attributes, &config(1));
    let order = ["#333333", "#111111", "#222222", "#111111"];

    let product = service
        .create_product(&RequestContext::new(), &draft(&order, &[]))
        .unwrap();

    let linked = service
        .list_product_attributes(AttributeKind::Colour, product.id, 1, 10)
        .unwrap();
    let labels: Vec<_> = linked.data.iter().map(|e| e.label.as_str()).collect();
    assert_eq!(labels, order);
}

#[test]
fn update_rejects_unknown_product_and_invalid_fields() {
    let conn = shared();
    let products = SqliteProductRepository::new(&conn);
    let attributes = SqliteAttributeRepository::new(&conn);
    let service = ProductService::new(&products, &attributes, &attributes, &config(2));
    let ctx = RequestContext::new();

    let missing = Uuid::new_v4();
    let err = service
        .update_product(&ctx, missing, &ProductPatch::default())
        .unwrap_err();
    assert!(matches!(err, ProductServiceError::ProductNotFound(id) if id == missing));

    let created = service.create_product(&ctx, &draft(&[], &[])).unwrap();
    let patch = ProductPatch {
        price: Some("abc".to_string()),
        ..ProductPatch::default()
    };
    let err = service.update_product(&ctx, created.id, &patch).unwrap_err();
    assert!(matches!(
        err,
        ProductServiceError::Validation(ValidationError::InvalidDecimal { .. })
    ));
    assert_eq!(service.get_product(created.id).unwrap(), created);
}

#[test]
fn delete_removes_product_and_links() {
    let conn = shared();
    let products = SqliteProductRepository::new(&conn);
    let attributes = SqliteAttributeRepository::new(&conn);
    let service = ProductService::new(&products, &attributes, &attributes, &config(2));
    let ctx = RequestContext::new();

    let product = service
        .create_product(&ctx, &draft(&["#123456"], &["denim"]))
        .unwrap();
    service.delete_product(&ctx, product.id).unwrap();

    assert!(matches!(
        service.get_product(product.id),
        Err(ProductServiceError::ProductNotFound(_))
    ));
    let links = service
        .list_product_attributes(AttributeKind::Colour, product.id, 1, 10)
        .unwrap();
    assert_eq!(links.total_count, 0);
    // Attribute entities outlive the product.
    assert_eq!(attributes.count(AttributeKind::Colour).unwrap(), 1);
    assert!(matches!(
        service.delete_product(&ctx, product.id),
        Err(ProductServiceError::ProductNotFound(_))
    ));
}

#[test]
fn expired_deadline_is_reported_as_reconciliation_failure() {
    let conn = shared();
    let products = SqliteProductRepository::new(&conn);
    let attributes = SqliteAttributeRepository::new(&conn);
    let service = ProductService::new(&products, &attributes, &attributes, &config(2));
    let ctx = RequestContext::new().with_timeout(Duration::ZERO);

    let err = service
        .create_product(&ctx, &draft(&["#abcdef"], &[]))
        .unwrap_err();

    assert!(matches!(
        err,
        ProductServiceError::Reconciliation {
            source: ReconcileError::DeadlineExceeded,
            ..
        }
    ));
    assert_eq!(products.count_products().unwrap(), 1);
    assert_eq!(attributes.count(AttributeKind::Colour).unwrap(), 0);
}
