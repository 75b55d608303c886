//! Path normalization rules across tenants and path shapes.

use averzo_livedata::path::{LogicalPath, PathNormalizer, PathScope};
use averzo_livedata::tenant::TenantId;

fn normalize(raw: &str, tenant: Option<&str>) -> String {
    let tenant = tenant.map(TenantId::new);
    PathNormalizer::default()
        .normalize(&LogicalPath::parse(raw), tenant.as_ref())
        .to_string()
}

#[test]
fn test_products_scenario() {
    let physical = PathNormalizer::default().normalize(
        &LogicalPath::new(["products"]),
        Some(&TenantId::new("proj1")),
    );
    assert_eq!(physical.to_string(), "artifacts/proj1/public/data/products");
}

#[test]
fn test_payment_methods_scenario() {
    let physical = PathNormalizer::default().normalize(
        &LogicalPath::new(["users", "u123", "paymentMethods"]),
        Some(&TenantId::new("proj1")),
    );
    assert_eq!(physical.to_string(), "artifacts/proj1/users/u123/paymentMethods");
}

#[test]
fn test_namespaced_paths_are_unchanged() {
    for raw in [
        "artifacts",
        "artifacts/proj1/public/data/products",
        "artifacts/other-tenant/users/u1/orders",
    ] {
        assert_eq!(normalize(raw, Some("proj1")), raw);
    }
}

#[test]
fn test_user_paths_keep_every_segment() {
    let cases = [
        ("users/u1", "artifacts/t/users/u1"),
        ("users/u1/orders", "artifacts/t/users/u1/orders"),
        ("users/u1/orders/o9/items", "artifacts/t/users/u1/orders/o9/items"),
    ];
    for (logical, expected) in cases {
        assert_eq!(normalize(logical, Some("t")), expected);
    }
}

#[test]
fn test_other_paths_are_public() {
    let cases = [
        ("products", "artifacts/t/public/data/products"),
        ("orders/o1/lines", "artifacts/t/public/data/orders/o1/lines"),
        ("users", "artifacts/t/public/data/users"),
        ("usersettings/x", "artifacts/t/public/data/usersettings/x"),
    ];
    for (logical, expected) in cases {
        assert_eq!(normalize(logical, Some("t")), expected);
    }
}

#[test]
fn test_no_tenant_is_identity() {
    for raw in ["", "products", "users/u1/orders", "artifacts/x", "a/b/c/d"] {
        assert_eq!(normalize(raw, None), raw);
    }
}

#[test]
fn test_classification() {
    let normalizer = PathNormalizer::default();
    let tenant = TenantId::new("proj1");
    let classify = |raw: &str| normalizer.classify(&LogicalPath::parse(raw), Some(&tenant));

    assert_eq!(classify(""), PathScope::Unscoped);
    assert_eq!(classify("artifacts/proj1"), PathScope::AlreadyPhysical);
    assert_eq!(classify("users/u1"), PathScope::UserPrivate);
    assert_eq!(classify("products"), PathScope::Public);
}

#[test]
fn test_document_paths_follow_parent_collection() {
    let normalizer = PathNormalizer::default();
    let tenant = TenantId::new("proj1");

    let order = normalizer.normalize_document(&"users/u1/orders".into(), "o1", Some(&tenant));
    assert_eq!(order.to_string(), "artifacts/proj1/users/u1/orders/o1");

    // The bare users collection is not user-private, so neither are its documents.
    let profile = normalizer.normalize_document(&"users".into(), "u1", Some(&tenant));
    assert_eq!(profile.to_string(), "artifacts/proj1/public/data/users/u1");
}
