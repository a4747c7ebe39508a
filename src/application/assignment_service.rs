use std::collections::HashSet;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::assignment::{
    full_commission, partial_commission, AssignVendor, AssignmentType, AssignmentWithItems,
    AutoAssignFailure, AutoAssignReport, BulkAssignFailure, BulkAssignReport, ItemAssignment,
    NewAssignment, Vendor,
};
use crate::domain::errors::DomainError;
use crate::domain::order::{Order, OrderItem, OrderWithItems};
use crate::domain::ports::{
    AssignmentRepository, CatalogRepository, OrderRepository, VendorRepository,
};
use crate::domain::store::ProductVendor;

pub struct AssignmentService<R> {
    repo: R,
}

impl<R> AssignmentService<R>
where
    R: OrderRepository + VendorRepository + AssignmentRepository + CatalogRepository,
{
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn assign_vendor(&self, request: AssignVendor) -> Result<AssignmentWithItems, DomainError> {
        let order = self.order(request.order_id)?;
        let vendor = self.active_vendor(request.vendor_id)?;
        self.assign(
            &order,
            &vendor,
            request.assignment_type,
            request.item_ids,
            request.notes,
        )
    }

    /// Deletes only the item linkage. The parent assignment stays open even
    /// when it ends up with no items.
    pub fn remove_item_assignment(&self, id: Uuid) -> Result<ItemAssignment, DomainError> {
        let link = self
            .repo
            .find_item_assignment(id)?
            .ok_or_else(|| DomainError::not_found("Item assignment", id))?;
        if !self.repo.delete_item_assignment(id)? {
            return Err(DomainError::not_found("Item assignment", id));
        }
        log::info!(
            "Removed item {} from assignment {}",
            link.order_item_id,
            link.vendor_assignment_id
        );
        Ok(link)
    }

    /// Full assignment of every order to one vendor. Per-order failures are
    /// collected; only an unusable vendor fails the whole call.
    pub fn bulk_assign_vendor(
        &self,
        order_ids: &[Uuid],
        vendor_id: Uuid,
        notes: Option<String>,
    ) -> Result<BulkAssignReport, DomainError> {
        let vendor = self.active_vendor(vendor_id)?;
        let mut report = BulkAssignReport::default();
        for &order_id in order_ids {
            let outcome = self.order(order_id).and_then(|order| {
                self.assign(
                    &order,
                    &vendor,
                    AssignmentType::Full,
                    Vec::new(),
                    notes.clone(),
                )
            });
            match outcome {
                Ok(assignment) => report.assigned.push(assignment),
                Err(error) => {
                    log::warn!("Bulk assignment of order {} failed: {}", order_id, error);
                    report.failures.push(BulkAssignFailure { order_id, error });
                }
            }
        }
        log::info!(
            "Bulk assigned vendor {}: {} assigned, {} failed",
            vendor_id,
            report.assigned.len(),
            report.failures.len()
        );
        Ok(report)
    }

    /// Assign freshly ingested items to their products' default vendors.
    ///
    /// A single usable vendor covering every item gets a full assignment;
    /// otherwise each vendor gets a partial assignment over its own items.
    /// Items whose product has no default vendor, or whose default vendor is
    /// inactive or gone, are left unassigned.
    pub fn auto_assign(
        &self,
        store_id: Uuid,
        order: &OrderWithItems,
    ) -> Result<AutoAssignReport, DomainError> {
        let mut groups: Vec<(Uuid, Vec<Uuid>)> = Vec::new();
        for item in &order.items {
            let vendor = self.repo.default_vendor_for(
                store_id,
                item.external_product_id.as_deref(),
                item.sku.as_deref(),
            )?;
            let Some(vendor_id) = vendor else { continue };
            match groups.iter_mut().find(|(v, _)| *v == vendor_id) {
                Some((_, items)) => items.push(item.id),
                None => groups.push((vendor_id, vec![item.id])),
            }
        }

        let mut report = AutoAssignReport::default();
        let mut usable = Vec::with_capacity(groups.len());
        for (vendor_id, item_ids) in groups {
            match self.active_vendor(vendor_id) {
                Ok(vendor) => usable.push((vendor, item_ids)),
                Err(error) => {
                    log::warn!(
                        "Order {}: default vendor {} skipped: {}",
                        order.order.id,
                        vendor_id,
                        error
                    );
                    report.failures.push(AutoAssignFailure { vendor_id, error });
                }
            }
        }

        let covers_everything = usable.len() == 1 && usable[0].1.len() == order.items.len();
        for (vendor, item_ids) in usable {
            let (assignment_type, item_ids) = if covers_everything {
                (AssignmentType::Full, Vec::new())
            } else {
                (AssignmentType::Partial, item_ids)
            };
            match self.assign(
                &order.order,
                &vendor,
                assignment_type,
                item_ids,
                Some("auto-assigned to default vendor".to_string()),
            ) {
                Ok(created) => report.created.push(created),
                Err(error) => {
                    log::warn!(
                        "Order {}: auto-assignment to vendor {} failed: {}",
                        order.order.id,
                        vendor.id,
                        error
                    );
                    report.failures.push(AutoAssignFailure {
                        vendor_id: vendor.id,
                        error,
                    });
                }
            }
        }
        Ok(report)
    }

    pub fn link_product_vendor(
        &self,
        product_id: Uuid,
        vendor_id: Uuid,
        is_default: bool,
    ) -> Result<ProductVendor, DomainError> {
        self.repo
            .find_product(product_id)?
            .ok_or_else(|| DomainError::not_found("Product", product_id))?;
        self.repo
            .find_vendor(vendor_id)?
            .ok_or_else(|| DomainError::not_found("Vendor", vendor_id))?;
        self.repo.link_product_vendor(product_id, vendor_id, is_default)
    }

    pub fn assignments_for_order(
        &self,
        order_id: Uuid,
    ) -> Result<Vec<AssignmentWithItems>, DomainError> {
        self.order(order_id)?;
        self.repo.assignments_for_order(order_id)
    }

    fn order(&self, id: Uuid) -> Result<Order, DomainError> {
        self.repo
            .find_order(id)?
            .ok_or_else(|| DomainError::not_found("Order", id))
    }

    fn active_vendor(&self, id: Uuid) -> Result<Vendor, DomainError> {
        let vendor = self
            .repo
            .find_vendor(id)?
            .ok_or_else(|| DomainError::not_found("Vendor", id))?;
        if !vendor.is_active {
            return Err(DomainError::InvalidInput(format!(
                "vendor {} is inactive",
                id
            )));
        }
        Ok(vendor)
    }

    fn assign(
        &self,
        order: &Order,
        vendor: &Vendor,
        assignment_type: AssignmentType,
        item_ids: Vec<Uuid>,
        notes: Option<String>,
    ) -> Result<AssignmentWithItems, DomainError> {
        if order.status.is_terminal() {
            return Err(DomainError::InvalidInput(format!(
                "order {} is {} and cannot be assigned",
                order.id, order.status
            )));
        }
        if self.repo.find_assignment_for(order.id, vendor.id)?.is_some() {
            return Err(DomainError::DuplicateAssignment {
                order_id: order.id,
                vendor_id: vendor.id,
            });
        }

        let commission_amount = match assignment_type {
            AssignmentType::Full => {
                if !item_ids.is_empty() {
                    return Err(DomainError::InvalidInput(
                        "full assignments cover the whole order and take no item ids".to_string(),
                    ));
                }
                full_commission(&order.total_amount, &vendor.commission_rate)
            }
            AssignmentType::Partial => {
                let items = self.partial_items(order.id, &item_ids)?;
                partial_commission(items.iter().map(|i| &i.total_price), &vendor.commission_rate)
            }
        };

        let created = self.repo.insert_assignment(NewAssignment {
            order_id: order.id,
            vendor_id: vendor.id,
            assignment_type,
            commission_amount,
            notes,
            order_item_ids: item_ids,
            assigned_at: Utc::now(),
        })?;
        log::info!(
            "Assigned order {} to vendor {} ({}, commission {})",
            order.id,
            vendor.id,
            assignment_type,
            created.assignment.commission_amount
        );
        Ok(created)
    }

    /// Resolve and validate the items of a partial assignment.
    fn partial_items(&self, order_id: Uuid, item_ids: &[Uuid]) -> Result<Vec<OrderItem>, DomainError> {
        if item_ids.is_empty() {
            return Err(DomainError::InvalidInput(
                "partial assignments need at least one item".to_string(),
            ));
        }
        let mut seen = HashSet::with_capacity(item_ids.len());
        if let Some(dup) = item_ids.iter().find(|id| !seen.insert(**id)) {
            return Err(DomainError::InvalidInput(format!(
                "item {} is listed more than once",
                dup
            )));
        }

        let order_items = self.repo.order_items(order_id)?;
        let mut selected = Vec::with_capacity(item_ids.len());
        for id in item_ids {
            let item = order_items.iter().find(|i| i.id == *id).ok_or_else(|| {
                DomainError::InvalidInput(format!(
                    "item {} does not belong to order {}",
                    id, order_id
                ))
            })?;
            if self.repo.active_item_assignment(*id)?.is_some() {
                return Err(DomainError::ItemAlreadyAssigned(*id));
            }
            selected.push(item.clone());
        }
        Ok(selected)
    }
}
