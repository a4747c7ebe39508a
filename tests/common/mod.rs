//! In-memory doubles for the repository ports and the connector factory.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use marketplace_fulfillment::connectors::{
    ConnectorError, ConnectorFactory, FetchedOrders, RejectedOrder, StoreConnector,
};
use marketplace_fulfillment::domain::assignment::{
    AssignmentStatus, AssignmentWithItems, ItemAssignment, NewAssignment, Vendor, VendorAssignment,
};
use marketplace_fulfillment::domain::errors::DomainError;
use marketplace_fulfillment::domain::events::{self, OutboxMessage};
use marketplace_fulfillment::domain::monitor::{Alert, MonitorThresholds};
use marketplace_fulfillment::domain::order::{
    NewOrder, Order, OrderItem, OrderStatus, OrderStatusChange, OrderStatusHistory, OrderWithItems,
};
use marketplace_fulfillment::domain::ports::{
    AssignmentRepository, CatalogRepository, MonitorRepository, OrderRepository, ProofRepository,
    StoreRepository, TrackingRepository, VendorRepository,
};
use marketplace_fulfillment::domain::proof::{
    NewProof, OrderProductionStatus, ProductionProofState, ProofApproval, ProofDecision,
    ProofResponse, ProofResponseLog, ProofStatus, ProofType,
};
use marketplace_fulfillment::domain::store::{
    CanonicalItem, CanonicalOrder, CanonicalProduct, ConnectionCheck, CustomerContact,
    ItemCustomization, Product, ProductVendor, Store, StorePlatform,
};
use marketplace_fulfillment::domain::tracking::{NewTracking, ShipmentTracking, TrackingStatus};

pub fn dec(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).expect("valid decimal")
}

#[derive(Default)]
pub struct MemoryState {
    pub stores: Vec<Store>,
    pub vendors: Vec<Vendor>,
    pub products: Vec<Product>,
    pub product_vendors: Vec<ProductVendor>,
    pub orders: Vec<Order>,
    pub items: Vec<OrderItem>,
    pub history: Vec<OrderStatusHistory>,
    pub assignments: Vec<VendorAssignment>,
    pub item_links: Vec<ItemAssignment>,
    pub tracking: Vec<ShipmentTracking>,
    pub proofs: Vec<ProofApproval>,
    pub responses: Vec<ProofResponseLog>,
    pub production: Vec<OrderProductionStatus>,
    pub alerts: Vec<Alert>,
    pub thresholds: Option<MonitorThresholds>,
    pub outbox: Vec<OutboxMessage>,
    /// Assignment statuses whose candidate reads fail.
    pub failing_reads: HashSet<AssignmentStatus>,
    /// Number of upcoming order inserts that fail before touching state.
    pub failing_order_inserts: usize,
    /// Number of upcoming status updates that a concurrent writer wins. The
    /// other writer's change is applied and the caller's swap reports a loss.
    pub lost_status_swaps: usize,
    gate: Option<SweepGate>,
}

impl MemoryState {
    fn take_lost_swap(&mut self) -> bool {
        if self.lost_status_swaps == 0 {
            return false;
        }
        self.lost_status_swaps -= 1;
        true
    }
}

struct SweepGate {
    entered: Sender<()>,
    release: Receiver<()>,
}

/// Repository double sharing one state across clones, like a connection pool.
#[derive(Clone, Default)]
pub struct MemoryRepo {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().expect("state lock poisoned")
    }

    pub fn add_store(&self, platform: StorePlatform) -> Store {
        let store = Store {
            id: Uuid::new_v4(),
            name: format!("{} shop", platform),
            platform,
            base_url: "https://shop.example.com".to_string(),
            api_key: "key".to_string(),
            api_secret: Some("secret".to_string()),
            shop_id: Some("42".to_string()),
            is_active: true,
            last_sync_at: None,
        };
        self.state().stores.push(store.clone());
        store
    }

    pub fn add_vendor(&self, name: &str, commission_rate: &str) -> Vendor {
        let vendor = Vendor {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: None,
            commission_rate: dec(commission_rate),
            is_active: true,
        };
        self.state().vendors.push(vendor.clone());
        vendor
    }

    /// Insert an order straight into the store, as if it had been ingested.
    pub fn seed_order(&self, store_id: Uuid, order: CanonicalOrder) -> OrderWithItems {
        self.insert_order(NewOrder { store_id, order })
            .expect("insert order")
            .expect("order is new")
    }

    pub fn outbox_events(&self, event_type: &str) -> Vec<OutboxMessage> {
        self.state()
            .outbox
            .iter()
            .filter(|m| m.event_type == event_type)
            .cloned()
            .collect()
    }

    /// Make the next unassigned-orders read block until the returned sender
    /// fires. The receiver signals once the read has been entered.
    pub fn hold_next_sweep(&self) -> (Sender<()>, Receiver<()>) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        self.state().gate = Some(SweepGate {
            entered: entered_tx,
            release: release_rx,
        });
        (release_tx, entered_rx)
    }

    fn live_link(state: &MemoryState, order_item_id: Uuid) -> Option<ItemAssignment> {
        state
            .item_links
            .iter()
            .find(|link| {
                link.order_item_id == order_item_id
                    && state.assignments.iter().any(|a| {
                        a.id == link.vendor_assignment_id && a.status != AssignmentStatus::Cancelled
                    })
            })
            .cloned()
    }
}

pub fn item(external_id: &str, product_id: &str, sku: Option<&str>, total: &str) -> CanonicalItem {
    CanonicalItem {
        external_item_id: external_id.to_string(),
        external_product_id: Some(product_id.to_string()),
        name: format!("Product {}", product_id),
        sku: sku.map(str::to_string),
        quantity: 1,
        unit_price: dec(total),
        total_price: dec(total),
        customization: ItemCustomization::default(),
    }
}

pub fn canonical_order(external_id: &str, total: &str, items: Vec<CanonicalItem>) -> CanonicalOrder {
    CanonicalOrder {
        external_order_id: external_id.to_string(),
        order_number: Some(format!("#{}", external_id)),
        customer: CustomerContact {
            name: "Ada Lovelace".to_string(),
            email: Some("ada@example.com".to_string()),
            phone: None,
        },
        shipping_address: None,
        total_amount: dec(total),
        currency: "USD".to_string(),
        status: OrderStatus::Pending,
        fulfillment_status: None,
        payment_status: Some("paid".to_string()),
        order_date: Utc::now(),
        tags: Vec::new(),
        notes: None,
        items,
    }
}

// ── Ports ────────────────────────────────────────────────────────────────────

impl StoreRepository for MemoryRepo {
    fn find_store(&self, id: Uuid) -> Result<Option<Store>, DomainError> {
        Ok(self.state().stores.iter().find(|s| s.id == id).cloned())
    }

    fn list_active_stores(&self) -> Result<Vec<Store>, DomainError> {
        Ok(self
            .state()
            .stores
            .iter()
            .filter(|s| s.is_active)
            .cloned()
            .collect())
    }

    fn mark_synced(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), DomainError> {
        if let Some(store) = self.state().stores.iter_mut().find(|s| s.id == id) {
            store.last_sync_at = Some(at);
        }
        Ok(())
    }
}

impl CatalogRepository for MemoryRepo {
    fn upsert_product(
        &self,
        store_id: Uuid,
        product: &CanonicalProduct,
    ) -> Result<Product, DomainError> {
        let mut state = self.state();
        if let Some(existing) = state.products.iter_mut().find(|p| {
            p.store_id == store_id && p.external_product_id == product.external_product_id
        }) {
            existing.name = product.name.clone();
            existing.sku = product.sku.clone();
            existing.price = product.price.clone();
            return Ok(existing.clone());
        }
        let created = Product {
            id: Uuid::new_v4(),
            store_id,
            external_product_id: product.external_product_id.clone(),
            name: product.name.clone(),
            sku: product.sku.clone(),
            price: product.price.clone(),
        };
        state.products.push(created.clone());
        Ok(created)
    }

    fn find_product(&self, id: Uuid) -> Result<Option<Product>, DomainError> {
        Ok(self.state().products.iter().find(|p| p.id == id).cloned())
    }

    fn default_vendor_for(
        &self,
        store_id: Uuid,
        external_product_id: Option<&str>,
        sku: Option<&str>,
    ) -> Result<Option<Uuid>, DomainError> {
        let state = self.state();
        let default_for = |product: &Product| {
            state
                .product_vendors
                .iter()
                .find(|pv| pv.product_id == product.id && pv.is_default)
                .map(|pv| pv.vendor_id)
        };
        let by_id = external_product_id.and_then(|pid| {
            state
                .products
                .iter()
                .filter(|p| p.store_id == store_id && p.external_product_id == pid)
                .find_map(default_for)
        });
        if by_id.is_some() {
            return Ok(by_id);
        }
        Ok(sku.and_then(|sku| {
            state
                .products
                .iter()
                .filter(|p| p.store_id == store_id && p.sku.as_deref() == Some(sku))
                .find_map(default_for)
        }))
    }

    fn link_product_vendor(
        &self,
        product_id: Uuid,
        vendor_id: Uuid,
        is_default: bool,
    ) -> Result<ProductVendor, DomainError> {
        let mut state = self.state();
        if is_default {
            for pv in state
                .product_vendors
                .iter_mut()
                .filter(|pv| pv.product_id == product_id)
            {
                pv.is_default = false;
            }
        }
        if let Some(pv) = state
            .product_vendors
            .iter_mut()
            .find(|pv| pv.product_id == product_id && pv.vendor_id == vendor_id)
        {
            pv.is_default = is_default;
            return Ok(pv.clone());
        }
        let link = ProductVendor {
            id: Uuid::new_v4(),
            product_id,
            vendor_id,
            is_default,
        };
        state.product_vendors.push(link.clone());
        Ok(link)
    }
}

impl VendorRepository for MemoryRepo {
    fn find_vendor(&self, id: Uuid) -> Result<Option<Vendor>, DomainError> {
        Ok(self.state().vendors.iter().find(|v| v.id == id).cloned())
    }
}

impl OrderRepository for MemoryRepo {
    fn find_order(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        Ok(self.state().orders.iter().find(|o| o.id == id).cloned())
    }

    fn find_order_by_external(
        &self,
        store_id: Uuid,
        external_order_id: &str,
    ) -> Result<Option<Order>, DomainError> {
        Ok(self
            .state()
            .orders
            .iter()
            .find(|o| o.store_id == store_id && o.external_order_id == external_order_id)
            .cloned())
    }

    fn order_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>, DomainError> {
        Ok(self
            .state()
            .items
            .iter()
            .filter(|i| i.order_id == order_id)
            .cloned()
            .collect())
    }

    fn insert_order(&self, new_order: NewOrder) -> Result<Option<OrderWithItems>, DomainError> {
        let mut state = self.state();
        if state.failing_order_inserts > 0 {
            state.failing_order_inserts -= 1;
            return Err(DomainError::Internal("connection reset".to_string()));
        }
        let NewOrder { store_id, order: c } = new_order;
        if state
            .orders
            .iter()
            .any(|o| o.store_id == store_id && o.external_order_id == c.external_order_id)
        {
            return Ok(None);
        }
        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4(),
            store_id,
            external_order_id: c.external_order_id,
            order_number: c.order_number,
            customer: c.customer,
            shipping_address: c.shipping_address,
            total_amount: c.total_amount,
            currency: c.currency,
            status: c.status,
            fulfillment_status: c.fulfillment_status,
            payment_status: c.payment_status,
            order_date: c.order_date,
            tags: c.tags,
            notes: c.notes,
            created_at: now,
            updated_at: now,
        };
        let items: Vec<OrderItem> = c
            .items
            .into_iter()
            .map(|i| OrderItem {
                id: Uuid::new_v4(),
                order_id: order.id,
                external_item_id: i.external_item_id,
                external_product_id: i.external_product_id,
                product_name: i.name,
                sku: i.sku,
                quantity: i.quantity,
                unit_price: i.unit_price,
                total_price: i.total_price,
                customization: i.customization,
            })
            .collect();
        state.orders.push(order.clone());
        state.items.extend(items.iter().cloned());
        state.outbox.push(events::order_created(&order, items.len()));
        Ok(Some(OrderWithItems { order, items }))
    }

    fn update_order_status(
        &self,
        change: &OrderStatusChange,
    ) -> Result<Option<Order>, DomainError> {
        let mut state = self.state();
        let lost = state.take_lost_swap();
        let Some(order) = state
            .orders
            .iter_mut()
            .find(|o| o.id == change.order_id && o.status == change.from)
        else {
            return Ok(None);
        };
        order.status = change.to;
        order.updated_at = change.at;
        let updated = order.clone();
        state.history.push(OrderStatusHistory {
            id: Uuid::new_v4(),
            order_id: change.order_id,
            old_status: change.from,
            new_status: change.to,
            actor: change.actor.clone(),
            notes: change.notes.clone(),
            created_at: change.at,
        });
        state.outbox.push(events::order_status_changed(change));
        Ok((!lost).then_some(updated))
    }

    fn order_history(&self, order_id: Uuid) -> Result<Vec<OrderStatusHistory>, DomainError> {
        Ok(self
            .state()
            .history
            .iter()
            .filter(|h| h.order_id == order_id)
            .cloned()
            .collect())
    }
}

impl AssignmentRepository for MemoryRepo {
    fn find_assignment(&self, id: Uuid) -> Result<Option<VendorAssignment>, DomainError> {
        Ok(self.state().assignments.iter().find(|a| a.id == id).cloned())
    }

    fn find_assignment_for(
        &self,
        order_id: Uuid,
        vendor_id: Uuid,
    ) -> Result<Option<VendorAssignment>, DomainError> {
        Ok(self
            .state()
            .assignments
            .iter()
            .find(|a| a.order_id == order_id && a.vendor_id == vendor_id)
            .cloned())
    }

    fn assignments_for_order(
        &self,
        order_id: Uuid,
    ) -> Result<Vec<AssignmentWithItems>, DomainError> {
        let state = self.state();
        Ok(state
            .assignments
            .iter()
            .filter(|a| a.order_id == order_id)
            .map(|a| AssignmentWithItems {
                assignment: a.clone(),
                items: state
                    .item_links
                    .iter()
                    .filter(|l| l.vendor_assignment_id == a.id)
                    .cloned()
                    .collect(),
            })
            .collect())
    }

    fn active_item_assignment(
        &self,
        order_item_id: Uuid,
    ) -> Result<Option<ItemAssignment>, DomainError> {
        Ok(Self::live_link(&self.state(), order_item_id))
    }

    fn insert_assignment(&self, new: NewAssignment) -> Result<AssignmentWithItems, DomainError> {
        let mut state = self.state();
        if state
            .assignments
            .iter()
            .any(|a| a.order_id == new.order_id && a.vendor_id == new.vendor_id)
        {
            return Err(DomainError::DuplicateAssignment {
                order_id: new.order_id,
                vendor_id: new.vendor_id,
            });
        }
        for item_id in &new.order_item_ids {
            if Self::live_link(&state, *item_id).is_some() {
                return Err(DomainError::ItemAlreadyAssigned(*item_id));
            }
        }
        let assignment = VendorAssignment {
            id: Uuid::new_v4(),
            order_id: new.order_id,
            vendor_id: new.vendor_id,
            assignment_type: new.assignment_type,
            status: AssignmentStatus::Assigned,
            commission_amount: new.commission_amount,
            notes: new.notes,
            assigned_at: new.assigned_at,
            accepted_at: None,
            started_at: None,
            completed_at: None,
            cancelled_at: None,
            updated_at: new.assigned_at,
        };
        let items: Vec<ItemAssignment> = new
            .order_item_ids
            .iter()
            .map(|item_id| ItemAssignment {
                id: Uuid::new_v4(),
                vendor_assignment_id: assignment.id,
                order_item_id: *item_id,
                created_at: new.assigned_at,
            })
            .collect();
        state.assignments.push(assignment.clone());
        state.item_links.extend(items.iter().cloned());
        Ok(AssignmentWithItems { assignment, items })
    }

    fn find_item_assignment(&self, id: Uuid) -> Result<Option<ItemAssignment>, DomainError> {
        Ok(self.state().item_links.iter().find(|l| l.id == id).cloned())
    }

    fn delete_item_assignment(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut state = self.state();
        let before = state.item_links.len();
        state.item_links.retain(|l| l.id != id);
        Ok(state.item_links.len() < before)
    }

    fn update_assignment_status(
        &self,
        id: Uuid,
        from: AssignmentStatus,
        to: AssignmentStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<VendorAssignment>, DomainError> {
        let mut state = self.state();
        let lost = state.take_lost_swap();
        let Some(a) = state
            .assignments
            .iter_mut()
            .find(|a| a.id == id && a.status == from)
        else {
            return Ok(None);
        };
        a.status = to;
        a.updated_at = at;
        match to {
            AssignmentStatus::Accepted => a.accepted_at = Some(at),
            AssignmentStatus::InProgress => a.started_at = Some(at),
            AssignmentStatus::Completed => a.completed_at = Some(at),
            AssignmentStatus::Cancelled => a.cancelled_at = Some(at),
            AssignmentStatus::Assigned => {}
        }
        Ok((!lost).then(|| a.clone()))
    }
}

impl TrackingRepository for MemoryRepo {
    fn insert_tracking(&self, new: NewTracking) -> Result<ShipmentTracking, DomainError> {
        let tracking = ShipmentTracking {
            id: Uuid::new_v4(),
            order_id: new.order_id,
            vendor_assignment_id: new.vendor_assignment_id,
            carrier: new.carrier,
            tracking_number: new.tracking_number,
            status: TrackingStatus::LabelCreated,
            created_at: new.created_at,
            updated_at: new.created_at,
        };
        self.state().tracking.push(tracking.clone());
        Ok(tracking)
    }

    fn find_tracking(&self, id: Uuid) -> Result<Option<ShipmentTracking>, DomainError> {
        Ok(self.state().tracking.iter().find(|t| t.id == id).cloned())
    }

    fn update_tracking_status(
        &self,
        id: Uuid,
        status: TrackingStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<ShipmentTracking>, DomainError> {
        let mut state = self.state();
        let Some(t) = state.tracking.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };
        t.status = status;
        t.updated_at = at;
        Ok(Some(t.clone()))
    }
}

impl ProofRepository for MemoryRepo {
    fn insert_proof(&self, new: NewProof) -> Result<ProofApproval, DomainError> {
        let proof = ProofApproval {
            id: Uuid::new_v4(),
            order_id: new.order_id,
            order_item_id: new.order_item_id,
            vendor_assignment_id: new.vendor_assignment_id,
            proof_type: new.proof_type,
            approval_token: new.approval_token,
            status: ProofStatus::Pending,
            image_urls: new.image_urls,
            customer_notes: None,
            created_at: new.created_at,
            expires_at: new.expires_at,
            responded_at: None,
        };
        let mut state = self.state();
        state.proofs.push(proof.clone());
        state.outbox.push(events::proof_created(&proof));
        Ok(proof)
    }

    fn find_proof_by_token(&self, token: &str) -> Result<Option<ProofApproval>, DomainError> {
        Ok(self
            .state()
            .proofs
            .iter()
            .find(|p| p.approval_token == token)
            .cloned())
    }

    fn record_proof_response(
        &self,
        response: &ProofResponse,
    ) -> Result<Option<ProofApproval>, DomainError> {
        let mut state = self.state();
        let Some(proof) = state.proofs.iter_mut().find(|p| {
            p.id == response.proof_id
                && p.status == ProofStatus::Pending
                && p.expires_at >= response.responded_at
        }) else {
            return Ok(None);
        };
        proof.status = ProofStatus::from(response.decision);
        proof.customer_notes = response.notes.clone();
        proof.responded_at = Some(response.responded_at);
        let proof = proof.clone();

        state.responses.push(ProofResponseLog {
            id: Uuid::new_v4(),
            proof_approval_id: proof.id,
            decision: response.decision,
            notes: response.notes.clone(),
            responder_ip: response.requester.ip.clone(),
            user_agent: response.requester.user_agent.clone(),
            created_at: response.responded_at,
        });

        if response.decision == ProofDecision::Approved {
            let index = state.production.iter().position(|s| {
                s.order_id == proof.order_id && s.vendor_assignment_id == proof.vendor_assignment_id
            });
            let index = index.unwrap_or_else(|| {
                state.production.push(OrderProductionStatus {
                    id: Uuid::new_v4(),
                    order_id: proof.order_id,
                    vendor_assignment_id: proof.vendor_assignment_id,
                    design_proof_status: ProductionProofState::Pending,
                    production_proof_status: ProductionProofState::Pending,
                    updated_at: response.responded_at,
                });
                state.production.len() - 1
            });
            let status = &mut state.production[index];
            match proof.proof_type {
                ProofType::DesignProof => status.design_proof_status = ProductionProofState::Approved,
                ProofType::ProductionProof => {
                    status.production_proof_status = ProductionProofState::Approved
                }
            }
            status.updated_at = response.responded_at;
        }
        state
            .outbox
            .push(events::proof_responded(proof.order_id, response));
        Ok(Some(proof))
    }

    fn proof_responses(&self, proof_id: Uuid) -> Result<Vec<ProofResponseLog>, DomainError> {
        Ok(self
            .state()
            .responses
            .iter()
            .filter(|r| r.proof_approval_id == proof_id)
            .cloned()
            .collect())
    }

    fn production_status(
        &self,
        order_id: Uuid,
        vendor_assignment_id: Option<Uuid>,
    ) -> Result<Option<OrderProductionStatus>, DomainError> {
        Ok(self
            .state()
            .production
            .iter()
            .find(|s| s.order_id == order_id && s.vendor_assignment_id == vendor_assignment_id)
            .cloned())
    }
}

impl MonitorRepository for MemoryRepo {
    fn open_unassigned_orders(&self) -> Result<Vec<Order>, DomainError> {
        let gate = self.state().gate.take();
        if let Some(gate) = gate {
            let _ = gate.entered.send(());
            let _ = gate.release.recv();
        }
        let state = self.state();
        Ok(state
            .orders
            .iter()
            .filter(|o| o.status.awaits_assignment())
            .filter(|o| {
                !state
                    .assignments
                    .iter()
                    .any(|a| a.order_id == o.id && a.status != AssignmentStatus::Cancelled)
            })
            .cloned()
            .collect())
    }

    fn assignments_with_status(
        &self,
        status: AssignmentStatus,
    ) -> Result<Vec<VendorAssignment>, DomainError> {
        let state = self.state();
        if state.failing_reads.contains(&status) {
            return Err(DomainError::Internal(format!(
                "simulated failure reading {} assignments",
                status
            )));
        }
        Ok(state
            .assignments
            .iter()
            .filter(|a| a.status == status)
            .cloned()
            .collect())
    }

    fn assignments_with_tracking(
        &self,
        assignment_ids: &[Uuid],
    ) -> Result<HashSet<Uuid>, DomainError> {
        Ok(self
            .state()
            .tracking
            .iter()
            .map(|t| t.vendor_assignment_id)
            .filter(|id| assignment_ids.contains(id))
            .collect())
    }

    fn undelivered_tracking(&self) -> Result<Vec<ShipmentTracking>, DomainError> {
        Ok(self
            .state()
            .tracking
            .iter()
            .filter(|t| t.status != TrackingStatus::Delivered)
            .cloned()
            .collect())
    }

    fn pending_proofs(&self) -> Result<Vec<ProofApproval>, DomainError> {
        Ok(self
            .state()
            .proofs
            .iter()
            .filter(|p| p.status == ProofStatus::Pending)
            .cloned()
            .collect())
    }

    fn record_alerts(&self, alerts: &[Alert]) -> Result<(), DomainError> {
        let mut state = self.state();
        for alert in alerts {
            state.outbox.push(events::alert_raised(alert));
        }
        state.alerts.extend(alerts.iter().cloned());
        Ok(())
    }

    fn recent_alerts(&self, limit: i64) -> Result<Vec<Alert>, DomainError> {
        let mut alerts = self.state().alerts.clone();
        alerts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        alerts.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(alerts)
    }

    fn load_thresholds(&self) -> Result<Option<MonitorThresholds>, DomainError> {
        Ok(self.state().thresholds)
    }

    fn save_thresholds(&self, thresholds: &MonitorThresholds) -> Result<(), DomainError> {
        self.state().thresholds = Some(*thresholds);
        Ok(())
    }
}

// ── Connectors ───────────────────────────────────────────────────────────────

/// What a scripted store returns from its next fetch.
#[derive(Clone)]
pub enum Feed {
    Orders(Vec<CanonicalOrder>),
    /// Decodable orders plus external ids the platform sent in a shape that
    /// does not decode.
    WithRejects(Vec<CanonicalOrder>, Vec<String>),
    Unreachable,
}

/// Connector factory serving scripted feeds per store.
#[derive(Clone, Default)]
pub struct ScriptedConnectors {
    feeds: Arc<Mutex<HashMap<Uuid, Feed>>>,
    products: Arc<Mutex<HashMap<Uuid, Vec<CanonicalProduct>>>>,
    /// `since` values passed to `fetch_orders`, per store.
    pub requested_since: Arc<Mutex<Vec<(Uuid, Option<DateTime<Utc>>)>>>,
}

impl ScriptedConnectors {
    pub fn set_feed(&self, store_id: Uuid, feed: Feed) {
        self.feeds.lock().expect("feeds lock").insert(store_id, feed);
    }

    pub fn set_products(&self, store_id: Uuid, products: Vec<CanonicalProduct>) {
        self.products
            .lock()
            .expect("products lock")
            .insert(store_id, products);
    }
}

struct ScriptedConnector {
    store: Store,
    feed: Feed,
    products: Vec<CanonicalProduct>,
    requested_since: Arc<Mutex<Vec<(Uuid, Option<DateTime<Utc>>)>>>,
}

impl StoreConnector for ScriptedConnector {
    fn platform(&self) -> StorePlatform {
        self.store.platform
    }

    fn test_connection(&self) -> ConnectionCheck {
        match self.feed {
            Feed::Unreachable => ConnectionCheck {
                ok: false,
                message: "connection refused".to_string(),
            },
            _ => ConnectionCheck {
                ok: true,
                message: "connected".to_string(),
            },
        }
    }

    fn fetch_orders(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<FetchedOrders, ConnectorError> {
        self.requested_since
            .lock()
            .expect("since lock")
            .push((self.store.id, since));
        match &self.feed {
            Feed::Orders(orders) => Ok(FetchedOrders {
                orders: orders.clone(),
                rejected: Vec::new(),
            }),
            Feed::WithRejects(orders, rejected) => Ok(FetchedOrders {
                orders: orders.clone(),
                rejected: rejected
                    .iter()
                    .map(|id| RejectedOrder {
                        external_id: id.clone(),
                        error: ConnectorError::Decode(format!("unknown status on order {}", id)),
                    })
                    .collect(),
            }),
            Feed::Unreachable => Err(ConnectorError::Transport("connection refused".to_string())),
        }
    }

    fn fetch_products(&self) -> Result<Vec<CanonicalProduct>, ConnectorError> {
        match self.feed {
            Feed::Unreachable => Err(ConnectorError::Transport("connection refused".to_string())),
            _ => Ok(self.products.clone()),
        }
    }
}

impl ConnectorFactory for ScriptedConnectors {
    fn connector_for(&self, store: &Store) -> Result<Box<dyn StoreConnector>, ConnectorError> {
        let feed = self
            .feeds
            .lock()
            .expect("feeds lock")
            .get(&store.id)
            .cloned()
            .unwrap_or(Feed::Orders(Vec::new()));
        let products = self
            .products
            .lock()
            .expect("products lock")
            .get(&store.id)
            .cloned()
            .unwrap_or_default();
        Ok(Box::new(ScriptedConnector {
            store: store.clone(),
            feed,
            products,
            requested_since: Arc::clone(&self.requested_since),
        }))
    }
}
