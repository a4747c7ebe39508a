mod common;

use common::{canonical_order, dec, item, MemoryRepo};
use marketplace_fulfillment::application::assignment_service::AssignmentService;
use marketplace_fulfillment::application::fulfillment_service::FulfillmentService;
use marketplace_fulfillment::domain::assignment::{AssignVendor, AssignmentStatus, AssignmentType};
use marketplace_fulfillment::domain::errors::DomainError;
use marketplace_fulfillment::domain::order::{OrderStatus, OrderWithItems};
use marketplace_fulfillment::domain::ports::AssignmentRepository;
use marketplace_fulfillment::domain::store::StorePlatform;
use uuid::Uuid;

fn two_item_order(repo: &MemoryRepo) -> OrderWithItems {
    let store = repo.add_store(StorePlatform::Shopify);
    repo.seed_order(
        store.id,
        canonical_order(
            "5001",
            "40.00",
            vec![
                item("li-1", "p-1", None, "25.00"),
                item("li-2", "p-2", None, "15.00"),
            ],
        ),
    )
}

fn partial(order: &OrderWithItems, vendor_id: Uuid, item_ids: Vec<Uuid>) -> AssignVendor {
    AssignVendor {
        order_id: order.order.id,
        vendor_id,
        assignment_type: AssignmentType::Partial,
        item_ids,
        notes: None,
    }
}

fn full(order_id: Uuid, vendor_id: Uuid) -> AssignVendor {
    AssignVendor {
        order_id,
        vendor_id,
        assignment_type: AssignmentType::Full,
        item_ids: Vec::new(),
        notes: Some("rush".to_string()),
    }
}

#[test]
fn full_assignment_commission_is_a_share_of_the_order_total() {
    let repo = MemoryRepo::new();
    let store = repo.add_store(StorePlatform::Etsy);
    let order = repo.seed_order(
        store.id,
        canonical_order("5002", "100.00", vec![item("li-1", "p-1", None, "100.00")]),
    );
    let vendor = repo.add_vendor("Print Co", "15");

    let created = AssignmentService::new(repo.clone())
        .assign_vendor(full(order.order.id, vendor.id))
        .unwrap();

    assert_eq!(created.assignment.commission_amount, dec("15.00"));
    assert_eq!(created.assignment.status, AssignmentStatus::Assigned);
    assert!(created.items.is_empty());
}

#[test]
fn partial_assignment_commission_sums_selected_items() {
    let repo = MemoryRepo::new();
    let order = two_item_order(&repo);
    let vendor = repo.add_vendor("Print Co", "15");
    let ids = order.items.iter().map(|i| i.id).collect();

    let created = AssignmentService::new(repo.clone())
        .assign_vendor(partial(&order, vendor.id, ids))
        .unwrap();

    assert_eq!(created.assignment.commission_amount, dec("6.00"));
    assert_eq!(created.items.len(), 2);
}

#[test]
fn second_assignment_of_the_same_vendor_is_rejected() {
    let repo = MemoryRepo::new();
    let order = two_item_order(&repo);
    let vendor = repo.add_vendor("Print Co", "15");
    let service = AssignmentService::new(repo.clone());

    service.assign_vendor(full(order.order.id, vendor.id)).unwrap();
    let err = service
        .assign_vendor(full(order.order.id, vendor.id))
        .unwrap_err();

    assert!(matches!(err, DomainError::DuplicateAssignment { .. }));
    assert_eq!(repo.state().assignments.len(), 1);
}

#[test]
fn an_item_can_belong_to_only_one_live_assignment() {
    let repo = MemoryRepo::new();
    let order = two_item_order(&repo);
    let first = repo.add_vendor("Mugs Inc", "10");
    let second = repo.add_vendor("Print Co", "15");
    let shared = order.items[0].id;
    let service = AssignmentService::new(repo.clone());

    service
        .assign_vendor(partial(&order, first.id, vec![shared]))
        .unwrap();
    let err = service
        .assign_vendor(partial(&order, second.id, vec![shared, order.items[1].id]))
        .unwrap_err();

    assert!(matches!(err, DomainError::ItemAlreadyAssigned(id) if id == shared));
    assert!(repo
        .find_assignment_for(order.order.id, second.id)
        .unwrap()
        .is_none());
}

#[test]
fn cancelling_an_assignment_frees_its_items() {
    let repo = MemoryRepo::new();
    let order = two_item_order(&repo);
    let first = repo.add_vendor("Mugs Inc", "10");
    let second = repo.add_vendor("Print Co", "15");
    let shared = order.items[0].id;
    let assignments = AssignmentService::new(repo.clone());

    let taken = assignments
        .assign_vendor(partial(&order, first.id, vec![shared]))
        .unwrap();
    FulfillmentService::new(repo.clone())
        .transition_assignment(taken.assignment.id, AssignmentStatus::Cancelled)
        .unwrap();
    let reassigned = assignments
        .assign_vendor(partial(&order, second.id, vec![shared]))
        .unwrap();

    assert_eq!(reassigned.items[0].order_item_id, shared);
}

#[test]
fn partial_assignment_validates_its_items() {
    let repo = MemoryRepo::new();
    let order = two_item_order(&repo);
    let vendor = repo.add_vendor("Print Co", "15");
    let service = AssignmentService::new(repo.clone());

    let empty = service.assign_vendor(partial(&order, vendor.id, Vec::new()));
    let foreign = service.assign_vendor(partial(&order, vendor.id, vec![Uuid::new_v4()]));
    let repeated = service.assign_vendor(partial(
        &order,
        vendor.id,
        vec![order.items[0].id, order.items[0].id],
    ));

    for result in [empty, foreign, repeated] {
        assert!(matches!(result, Err(DomainError::InvalidInput(_))));
    }
}

#[test]
fn full_assignment_rejects_item_ids() {
    let repo = MemoryRepo::new();
    let order = two_item_order(&repo);
    let vendor = repo.add_vendor("Print Co", "15");
    let mut request = full(order.order.id, vendor.id);
    request.item_ids = vec![order.items[0].id];

    let err = AssignmentService::new(repo.clone())
        .assign_vendor(request)
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidInput(_)));
}

#[test]
fn inactive_vendor_and_cancelled_order_cannot_be_assigned() {
    let repo = MemoryRepo::new();
    let order = two_item_order(&repo);
    let retired = repo.add_vendor("Retired", "10");
    repo.state().vendors[0].is_active = false;
    let vendor = repo.add_vendor("Print Co", "15");
    let service = AssignmentService::new(repo.clone());

    assert!(matches!(
        service.assign_vendor(full(order.order.id, retired.id)),
        Err(DomainError::InvalidInput(_))
    ));

    FulfillmentService::new(repo.clone())
        .transition_order(order.order.id, OrderStatus::Cancelled, "ops", None)
        .unwrap();
    assert!(matches!(
        service.assign_vendor(full(order.order.id, vendor.id)),
        Err(DomainError::InvalidInput(_))
    ));
}

#[test]
fn bulk_assignment_reports_per_order_failures() {
    let repo = MemoryRepo::new();
    let store = repo.add_store(StorePlatform::WooCommerce);
    let vendor = repo.add_vendor("Print Co", "10");
    let a = repo.seed_order(store.id, canonical_order("6001", "50.00", vec![item("a", "p", None, "50.00")]));
    let b = repo.seed_order(store.id, canonical_order("6002", "80.00", vec![item("b", "p", None, "80.00")]));
    let missing = Uuid::new_v4();
    let service = AssignmentService::new(repo.clone());
    service.assign_vendor(full(b.order.id, vendor.id)).unwrap();

    let report = service
        .bulk_assign_vendor(&[a.order.id, b.order.id, missing], vendor.id, None)
        .unwrap();

    assert_eq!(report.assigned.len(), 1);
    assert_eq!(report.assigned[0].assignment.order_id, a.order.id);
    assert_eq!(report.assigned[0].assignment.commission_amount, dec("5.00"));
    assert_eq!(report.failures.len(), 2);
    assert!(report
        .failures
        .iter()
        .any(|f| f.order_id == b.order.id && matches!(f.error, DomainError::DuplicateAssignment { .. })));
    assert!(report
        .failures
        .iter()
        .any(|f| f.order_id == missing && matches!(f.error, DomainError::NotFound(_))));
}

#[test]
fn bulk_assignment_to_unknown_vendor_fails_outright() {
    let repo = MemoryRepo::new();
    let order = two_item_order(&repo);

    let err = AssignmentService::new(repo.clone())
        .bulk_assign_vendor(&[order.order.id], Uuid::new_v4(), None)
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound(_)));
}

#[test]
fn removing_an_item_keeps_the_parent_assignment() {
    let repo = MemoryRepo::new();
    let order = two_item_order(&repo);
    let vendor = repo.add_vendor("Print Co", "15");
    let service = AssignmentService::new(repo.clone());
    let created = service
        .assign_vendor(partial(&order, vendor.id, vec![order.items[0].id]))
        .unwrap();
    let link_id = created.items[0].id;

    let removed = service.remove_item_assignment(link_id).unwrap();

    assert_eq!(removed.order_item_id, order.items[0].id);
    let remaining = repo.assignments_for_order(order.order.id).unwrap();
    assert_eq!(remaining.len(), 1);
    assert!(remaining[0].items.is_empty());
    assert!(matches!(
        service.remove_item_assignment(link_id),
        Err(DomainError::NotFound(_))
    ));
}

#[test]
fn linking_a_vendor_requires_known_product_and_vendor() {
    let repo = MemoryRepo::new();
    let vendor = repo.add_vendor("Print Co", "15");

    let err = AssignmentService::new(repo.clone())
        .link_product_vendor(Uuid::new_v4(), vendor.id, true)
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound(_)));
}
