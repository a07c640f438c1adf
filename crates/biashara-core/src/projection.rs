//! # Balance Projector
//!
//! Pure, deterministic left fold of the event log into [`ProjectedState`].
//!
//! ## Fold
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  for event in log.read_all():                                           │
//! │      ├── EventReversed { target }                                       │
//! │      │       delta = journal.applied[target].inverse()                  │
//! │      │       unlink target from the dependency index                    │
//! │      │                                                                  │
//! │      └── anything else                                                  │
//! │              delta = reduce(event, &state)   (one reducer per kind)     │
//! │              link event to what it references                           │
//! │                                                                         │
//! │      delta.apply(&mut views)          (all-or-nothing)                  │
//! │      journal.applied[event.id] = delta                                  │
//! │                                                                         │
//! │  ProjectedState = LedgerViews (what users see)                          │
//! │                 + JournalIndex (applied deltas, reversals, links)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `project(events)` and repeated `apply` produce the same state; the tenant
//! service uses `apply` to keep its projection current after each append.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::delta::{Delta, Effect};
use crate::depreciation;
use crate::error::{CoreError, CoreResult};
use crate::event::{Event, EventId, EventKind, Reference, VatAdjustment};
use crate::money::Money;
use crate::payroll;
use crate::validation::line_total;
use crate::types::{
    AssetStatus, EmployeeId, Location, ObligationKind, ObligationStatus, PaymentMethod,
    PayrollPeriod, ProductId, ShopId,
};
use crate::views::{
    Account, Asset, Employee, LedgerViews, Payable, PayrollRun, PendingExpense, Product,
    Receivable, Sale,
};

// =============================================================================
// Journal Index
// =============================================================================

/// Bookkeeping the projector needs for reversals and idempotency checks.
/// Not part of the user-facing views.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JournalIndex {
    applied: BTreeMap<EventId, Delta>,
    /// target -> the EventReversed that compensated it
    reversed: BTreeMap<EventId, EventId>,
    /// event -> live events that reference it
    dependents: BTreeMap<EventId, BTreeSet<EventId>>,
    /// event -> events it references (resolved)
    links: BTreeMap<EventId, Vec<EventId>>,
    product_listings: BTreeMap<ProductId, EventId>,
    employee_registrations: BTreeMap<EmployeeId, EventId>,
    payroll_periods: BTreeMap<(PayrollPeriod, Option<ShopId>), EventId>,
    /// sale -> live VAT adjustments, oldest first
    vat_adjustments: BTreeMap<EventId, Vec<EventId>>,
    /// VAT correction -> the reversal appended with it
    vat_pairs: BTreeMap<EventId, EventId>,
}

impl JournalIndex {
    fn resolve(&self, reference: &Reference) -> Option<EventId> {
        match reference {
            Reference::Event(id) => Some(*id),
            Reference::Product(product) => self.product_listings.get(product).copied(),
            Reference::Employee(employee) => self.employee_registrations.get(employee).copied(),
        }
    }

    fn link(&mut self, event: EventId, targets: Vec<EventId>) {
        for target in &targets {
            self.dependents.entry(*target).or_default().insert(event);
        }
        if !targets.is_empty() {
            self.links.insert(event, targets);
        }
    }

    fn unlink(&mut self, event: EventId) {
        for target in self.links.remove(&event).unwrap_or_default() {
            if let Some(set) = self.dependents.get_mut(&target) {
                set.remove(&event);
                if set.is_empty() {
                    self.dependents.remove(&target);
                }
            }
        }
    }
}

// =============================================================================
// Projected State
// =============================================================================

/// Views plus journal index, as of the last applied event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectedState {
    views: LedgerViews,
    journal: JournalIndex,
    last_event: Option<EventId>,
}

/// Folds events (in insertion order) into a projection.
///
/// ## Errors
/// `CorruptLog` if the sequence is out of order or an event refers to
/// something that does not exist at that point of the log.
pub fn project<'a, I>(events: I) -> CoreResult<ProjectedState>
where
    I: IntoIterator<Item = &'a Event>,
{
    let mut state = ProjectedState::default();
    for event in events {
        state.apply(event)?;
    }
    Ok(state)
}

impl ProjectedState {
    pub fn new() -> Self {
        ProjectedState::default()
    }

    /// User-facing read models.
    pub fn views(&self) -> &LedgerViews {
        &self.views
    }

    pub fn into_views(self) -> LedgerViews {
        self.views
    }

    /// Id of the last applied event.
    pub fn last_event_id(&self) -> Option<EventId> {
        self.last_event
    }

    // -------------------------------------------------------------------------
    // Apply
    // -------------------------------------------------------------------------

    /// Applies the next event of the log.
    ///
    /// On error the state is unchanged.
    pub fn apply(&mut self, event: &Event) -> CoreResult<()> {
        let expected = self
            .last_event
            .map(|id| id.next())
            .unwrap_or_else(|| EventId::new(1));
        if event.id != expected {
            return Err(CoreError::CorruptLog(format!(
                "expected event {} but found event {}",
                expected, event.id
            )));
        }

        let delta = match &event.kind {
            EventKind::EventReversed { target, .. } => self.compensation(*target)?,
            _ => self.reduce(event)?,
        };
        delta.apply(&mut self.views)?;

        match &event.kind {
            EventKind::EventReversed { target, .. } => {
                self.release(*target);
                self.journal.reversed.insert(*target, event.id);
            }
            _ => self.index(event),
        }
        self.journal.applied.insert(event.id, delta);
        self.last_event = Some(event.id);
        Ok(())
    }

    fn compensation(&self, target: EventId) -> CoreResult<Delta> {
        let applied = self.journal.applied.get(&target).ok_or_else(|| {
            CoreError::CorruptLog(format!("reversal of unknown event {}", target))
        })?;
        if self.journal.reversed.contains_key(&target) {
            return Err(CoreError::CorruptLog(format!(
                "event {} is reversed twice",
                target
            )));
        }
        if self.journal.reversed.values().any(|id| *id == target) {
            return Err(CoreError::CorruptLog(format!(
                "event {} is a reversal and cannot be reversed",
                target
            )));
        }
        Ok(applied.inverse())
    }

    /// Drops the links and idempotency keys a reversed event held.
    fn release(&mut self, target: EventId) {
        let journal = &mut self.journal;
        journal.unlink(target);
        journal.product_listings.retain(|_, id| *id != target);
        journal.employee_registrations.retain(|_, id| *id != target);
        journal.payroll_periods.retain(|_, id| *id != target);
        for chain in journal.vat_adjustments.values_mut() {
            chain.retain(|id| *id != target);
        }
        journal.vat_adjustments.retain(|_, chain| !chain.is_empty());
        journal.vat_pairs.remove(&target);
    }

    /// Records what the event references and the idempotency keys it claims.
    fn index(&mut self, event: &Event) {
        let journal = &mut self.journal;
        let mut targets: Vec<EventId> = event
            .kind
            .references()
            .iter()
            .filter_map(|r| journal.resolve(r))
            .collect();

        match &event.kind {
            EventKind::ProductListed { product_id, .. } => {
                journal.product_listings.insert(product_id.clone(), event.id);
            }
            EventKind::EmployeeRegistered { employee_id, .. } => {
                journal
                    .employee_registrations
                    .insert(employee_id.clone(), event.id);
            }
            EventKind::PayrollProcessed { period, .. } => {
                journal
                    .payroll_periods
                    .insert((period.clone(), event.shop_id.clone()), event.id);
            }
            EventKind::VatAdjusted {
                sale, adjustment, ..
            } => {
                let chain = journal.vat_adjustments.entry(*sale).or_default();
                if let Some(previous) = chain.last().copied() {
                    targets.push(previous);
                    if *adjustment == VatAdjustment::Correction {
                        journal.vat_pairs.insert(event.id, previous);
                    }
                }
                chain.push(event.id);
            }
            _ => {}
        }

        targets.sort();
        targets.dedup();
        journal.link(event.id, targets);
    }

    // -------------------------------------------------------------------------
    // Reducers
    // -------------------------------------------------------------------------

    fn reduce(&self, event: &Event) -> CoreResult<Delta> {
        let shop = event.shop_id.as_ref();
        let mut delta = Delta::new();

        match &event.kind {
            EventKind::ProductListed {
                product_id,
                name,
                selling_price,
                cost_price,
                vat_rate,
            } => {
                delta.push(Effect::ProductAdded(Product {
                    id: product_id.clone(),
                    name: name.clone(),
                    selling_price: *selling_price,
                    cost_price: *cost_price,
                    vat_rate: *vat_rate,
                }));
            }

            EventKind::StockReceived {
                product_id,
                quantity,
                unit_cost,
                supplier,
                method,
            } => {
                self.listed(product_id, event)?;
                delta.push(Effect::Stock {
                    product: product_id.clone(),
                    location: event.location(),
                    quantity: *quantity,
                });
                let total = line_total("receipt total", *unit_cost, *quantity)?;
                self.settle_outflow(&mut delta, event, *method, total, supplier);
            }

            EventKind::SaleRecorded {
                customer,
                product_id,
                quantity,
                unit_price,
                unit_cost,
                vat_rate,
                vat,
                method,
            } => {
                self.listed(product_id, event)?;
                let net = line_total("sale total", *unit_price, *quantity)?;
                let cost = line_total("sale cost", *unit_cost, *quantity)?;
                let gross = net + *vat;
                delta
                    .push(Effect::SaleAdded(Sale {
                        id: event.id,
                        customer: customer.clone(),
                        product_id: product_id.clone(),
                        quantity: *quantity,
                        net,
                        vat_charged: *vat,
                        vat_rate: *vat_rate,
                        vat: *vat,
                        method: *method,
                        shop_id: event.shop_id.clone(),
                        business_date: event.business_date,
                    }))
                    .push(Effect::Stock {
                        product: product_id.clone(),
                        location: event.location(),
                        quantity: -quantity,
                    })
                    .post(Account::Revenue, net)
                    .post(Account::CostOfSales, cost)
                    .post(Account::OutputVat, *vat);
                match method.cash_account() {
                    Some(account) => {
                        delta.cash(shop, account, gross);
                    }
                    None => {
                        delta.push(Effect::ReceivableOpened(Receivable {
                            origin_event_id: event.id,
                            customer: customer.clone(),
                            amount: gross,
                            paid: Money::zero(),
                            status: ObligationStatus::Open,
                        }));
                    }
                }
            }

            EventKind::PaymentReceived {
                receivable,
                amount,
                method,
            } => {
                if !self.views.receivables.contains_key(receivable) {
                    return Err(corrupt(event, "payment against unknown receivable"));
                }
                delta.push(Effect::ReceivablePaid {
                    receivable: *receivable,
                    amount: *amount,
                });
                if let Some(account) = method.cash_account() {
                    delta.cash(shop, account, *amount);
                }
            }

            EventKind::PaymentMade {
                payable,
                amount,
                method,
            } => {
                if !self.views.payables.contains_key(payable) {
                    return Err(corrupt(event, "payment against unknown payable"));
                }
                delta.push(Effect::PayablePaid {
                    payable: *payable,
                    amount: *amount,
                });
                if let Some(account) = method.cash_account() {
                    delta.cash(shop, account, -*amount);
                }
            }

            EventKind::ExpensePosted {
                category,
                description,
                supplier,
                amount,
                method,
            } => {
                delta.push(Effect::ExpensePending(PendingExpense {
                    id: event.id,
                    category: category.clone(),
                    description: description.clone(),
                    supplier: supplier.clone(),
                    amount: *amount,
                    method: *method,
                }));
            }

            EventKind::ExpenseApproved {
                expense,
                category,
                supplier,
                amount,
                method,
            } => {
                let pending = self
                    .views
                    .pending_expenses
                    .get(expense)
                    .ok_or_else(|| corrupt(event, "approval of unknown expense"))?;
                delta
                    .push(Effect::ExpenseCleared(pending.clone()))
                    .push(Effect::Expense {
                        category: category.clone(),
                        amount: *amount,
                    });
                self.settle_outflow(&mut delta, event, *method, *amount, supplier);
            }

            EventKind::StockTransferred {
                product_id,
                from,
                to,
                quantity,
            } => {
                self.listed(product_id, event)?;
                delta
                    .push(Effect::Stock {
                        product: product_id.clone(),
                        location: from.clone(),
                        quantity: -quantity,
                    })
                    .push(Effect::Stock {
                        product: product_id.clone(),
                        location: to.clone(),
                        quantity: *quantity,
                    });
            }

            EventKind::StockDamaged {
                product_id,
                quantity,
                unit_cost,
                ..
            } => {
                self.listed(product_id, event)?;
                delta
                    .push(Effect::Stock {
                        product: product_id.clone(),
                        location: event.location(),
                        quantity: -quantity,
                    })
                    .post(
                        Account::StockLosses,
                        line_total("loss total", *unit_cost, *quantity)?,
                    );
            }

            EventKind::AssetAcquired {
                name,
                cost,
                depreciation_rate,
                supplier,
                method,
            } => {
                delta.push(Effect::AssetAdded(Asset {
                    id: event.id,
                    name: name.clone(),
                    cost: *cost,
                    acquisition_date: event.business_date,
                    depreciation_rate: *depreciation_rate,
                    status: AssetStatus::Active,
                }));
                self.settle_outflow(&mut delta, event, *method, *cost, supplier);
            }

            EventKind::AssetSold {
                asset,
                price,
                net_book_value,
                method,
                ..
            } => {
                let current = self.active_asset(*asset, event)?;
                delta
                    .push(Effect::AssetStatusChanged {
                        asset: *asset,
                        from: AssetStatus::Active,
                        to: AssetStatus::Sold,
                    })
                    .post(Account::DisposalGains, *price - *net_book_value)
                    .post(Account::RealizedDepreciation, current.cost - *net_book_value);
                if let Some(account) = method.cash_account() {
                    delta.cash(shop, account, *price);
                }
            }

            EventKind::AssetWrittenOff {
                asset,
                net_book_value,
                ..
            } => {
                let current = self.active_asset(*asset, event)?;
                delta
                    .push(Effect::AssetStatusChanged {
                        asset: *asset,
                        from: AssetStatus::Active,
                        to: AssetStatus::WrittenOff,
                    })
                    .post(Account::AssetWriteOffs, *net_book_value)
                    .post(Account::RealizedDepreciation, current.cost - *net_book_value);
            }

            EventKind::CapitalContributed { amount, method, .. } => {
                delta.post(Account::ShareCapital, *amount);
                self.settle_inflow(&mut delta, shop, *method, *amount);
            }

            EventKind::DrawingMade { amount, method, .. } => {
                delta.post(Account::Drawings, *amount);
                self.settle_inflow(&mut delta, shop, *method, -*amount);
            }

            EventKind::LoanReceived {
                lender,
                amount,
                method,
            } => {
                delta.push(Effect::Loan {
                    lender: lender.trim().to_string(),
                    amount: *amount,
                });
                self.settle_inflow(&mut delta, shop, *method, *amount);
            }

            EventKind::LoanRepaid {
                lender,
                amount,
                method,
            } => {
                delta.push(Effect::Loan {
                    lender: lender.trim().to_string(),
                    amount: -*amount,
                });
                self.settle_inflow(&mut delta, shop, *method, -*amount);
            }

            EventKind::EmployeeRegistered {
                employee_id,
                name,
                gross_salary,
            } => {
                delta.push(Effect::EmployeeAdded(Employee {
                    id: employee_id.clone(),
                    name: name.clone(),
                    gross_salary: *gross_salary,
                    shop_id: event.shop_id.clone(),
                }));
            }

            EventKind::PayrollProcessed {
                period,
                lines,
                method,
            } => {
                let totals = payroll::totals(lines);
                delta
                    .push(Effect::PayrollRunAdded(PayrollRun {
                        id: event.id,
                        period: period.clone(),
                        shop_id: event.shop_id.clone(),
                        lines: lines.clone(),
                    }))
                    .post(Account::Salaries, totals.gross)
                    .post(Account::NssfPayable, totals.nssf)
                    .post(Account::PayePayable, totals.paye);
                self.settle_inflow(&mut delta, shop, *method, -totals.net);
            }

            EventKind::VatAdjusted {
                sale,
                adjustment,
                rate,
                amount,
            } => {
                let current = self
                    .views
                    .sales
                    .get(sale)
                    .ok_or_else(|| corrupt(event, "VAT adjustment of unknown sale"))?;
                let from = (current.vat_rate, current.vat);
                match adjustment {
                    VatAdjustment::Reversal => {
                        delta
                            .push(Effect::SaleVatChanged {
                                sale: *sale,
                                from,
                                to: (current.vat_rate, Money::zero()),
                            })
                            .post(Account::OutputVat, -*amount)
                            .post(Account::Revenue, *amount);
                    }
                    VatAdjustment::Correction => {
                        delta
                            .push(Effect::SaleVatChanged {
                                sale: *sale,
                                from,
                                to: (*rate, *amount),
                            })
                            .post(Account::OutputVat, *amount)
                            .post(Account::Revenue, -*amount);
                    }
                }
            }

            EventKind::EventReversed { .. } => {
                return Err(corrupt(event, "reversal routed to a reducer"));
            }
        }

        Ok(delta)
    }

    fn listed(&self, product: &ProductId, event: &Event) -> CoreResult<()> {
        if self.views.products.contains_key(product) {
            Ok(())
        } else {
            Err(corrupt(event, &format!("unknown product {}", product)))
        }
    }

    fn active_asset(&self, asset: EventId, event: &Event) -> CoreResult<&Asset> {
        match self.views.assets.get(&asset) {
            Some(a) if a.status == AssetStatus::Active => Ok(a),
            Some(_) => Err(corrupt(event, "disposal of an inactive asset")),
            None => Err(corrupt(event, "disposal of an unknown asset")),
        }
    }

    /// Money leaving the business: cash moves now, or a payable opens.
    fn settle_outflow(
        &self,
        delta: &mut Delta,
        event: &Event,
        method: PaymentMethod,
        amount: Money,
        supplier: &str,
    ) {
        match method.cash_account() {
            Some(account) => {
                delta.cash(event.shop_id.as_ref(), account, -amount);
            }
            None => {
                delta.push(Effect::PayableOpened(Payable {
                    origin_event_id: event.id,
                    supplier: supplier.to_string(),
                    amount,
                    paid: Money::zero(),
                    status: ObligationStatus::Open,
                }));
            }
        }
    }

    /// Signed cash movement for events that always settle immediately.
    fn settle_inflow(
        &self,
        delta: &mut Delta,
        shop: Option<&ShopId>,
        method: PaymentMethod,
        amount: Money,
    ) {
        if let Some(account) = method.cash_account() {
            delta.cash(shop, account, amount);
        }
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    pub fn product(&self, id: &ProductId) -> Option<&Product> {
        self.views.products.get(id)
    }

    /// Quantity on hand of a product at a location.
    pub fn available_stock(&self, product: &ProductId, location: &Location) -> i64 {
        self.views
            .stock
            .get(product)
            .map(|s| s.at(location))
            .unwrap_or(0)
    }

    pub fn receivable(&self, id: EventId) -> Option<&Receivable> {
        self.views.receivables.get(&id)
    }

    pub fn payable(&self, id: EventId) -> Option<&Payable> {
        self.views.payables.get(&id)
    }

    /// Which side an open obligation id belongs to, if it is live.
    pub fn obligation_kind(&self, id: EventId) -> Option<ObligationKind> {
        if self.views.receivables.contains_key(&id) {
            Some(ObligationKind::Receivable)
        } else if self.views.payables.contains_key(&id) {
            Some(ObligationKind::Payable)
        } else {
            None
        }
    }

    /// Lifecycle status of a receivable or payable, including obligations
    /// whose originating event was reversed.
    pub fn obligation_status(&self, id: EventId) -> Option<ObligationStatus> {
        if let Some(r) = self.views.receivables.get(&id) {
            return Some(r.status);
        }
        if let Some(p) = self.views.payables.get(&id) {
            return Some(p.status);
        }
        let opened = self
            .journal
            .applied
            .get(&id)
            .is_some_and(Delta::opens_obligation);
        if opened && self.is_reversed(id) {
            Some(ObligationStatus::Reversed)
        } else {
            None
        }
    }

    pub fn pending_expense(&self, id: EventId) -> Option<&PendingExpense> {
        self.views.pending_expenses.get(&id)
    }

    pub fn asset(&self, id: EventId) -> Option<&Asset> {
        self.views.assets.get(&id)
    }

    /// Net book value of an asset on a date (None for unknown assets).
    pub fn net_book_value(&self, id: EventId, as_of: NaiveDate) -> Option<Money> {
        self.asset(id).map(|a| {
            depreciation::net_book_value(a.cost, a.depreciation_rate, a.acquisition_date, as_of)
        })
    }

    pub fn sale(&self, id: EventId) -> Option<&Sale> {
        self.views.sales.get(&id)
    }

    pub fn employee(&self, id: &EmployeeId) -> Option<&Employee> {
        self.views.employees.get(id)
    }

    /// Registered employees of a shop (None = headquarters staff).
    pub fn employees_at(&self, shop: Option<&ShopId>) -> Vec<&Employee> {
        self.views
            .employees
            .values()
            .filter(|e| e.shop_id.as_ref() == shop)
            .collect()
    }

    /// The live payroll run for a period and shop, if one exists.
    pub fn payroll_run_for(&self, period: &PayrollPeriod, shop: Option<&ShopId>) -> Option<EventId> {
        self.journal
            .payroll_periods
            .get(&(period.clone(), shop.cloned()))
            .copied()
    }

    /// Whether an `EventReversed` targets this event.
    pub fn is_reversed(&self, id: EventId) -> bool {
        self.journal.reversed.contains_key(&id)
    }

    /// Whether an event with this id has been applied.
    pub fn contains(&self, id: EventId) -> bool {
        self.journal.applied.contains_key(&id)
    }

    /// Delta recorded for an applied event.
    pub fn applied_delta(&self, id: EventId) -> Option<&Delta> {
        self.journal.applied.get(&id)
    }

    /// Whether the event is itself an `EventReversed`.
    pub fn is_reversal(&self, id: EventId) -> bool {
        self.journal.reversed.values().any(|r| *r == id)
    }

    /// Most recent live event after `after` that took stock of `product`
    /// out of `location`.
    pub fn latest_stock_consumer(
        &self,
        after: EventId,
        product: &ProductId,
        location: &Location,
    ) -> Option<EventId> {
        self.journal
            .applied
            .range(after.next()..)
            .rev()
            .filter(|(id, _)| !self.is_reversed(**id) && !self.is_reversal(**id))
            .find(|(_, delta)| {
                delta
                    .stock_moves()
                    .any(|(p, l, q)| p == product && l == location && q < 0)
            })
            .map(|(id, _)| *id)
    }

    /// Most recent live event after `after` that repaid principal to
    /// `lender`.
    pub fn latest_loan_repayment(&self, after: EventId, lender: &str) -> Option<EventId> {
        self.journal
            .applied
            .range(after.next()..)
            .rev()
            .filter(|(id, _)| !self.is_reversed(**id) && !self.is_reversal(**id))
            .find(|(_, delta)| {
                delta
                    .loan_moves()
                    .any(|(l, amount)| l == lender && amount.is_negative())
            })
            .map(|(id, _)| *id)
    }

    /// Outstanding principal owed to a lender.
    pub fn loan_balance(&self, lender: &str) -> Money {
        self.views.totals.loan_from(lender.trim())
    }

    /// The VAT reversal appended together with a live VAT correction.
    pub fn vat_reversal_paired_with(&self, correction: EventId) -> Option<EventId> {
        self.journal.vat_pairs.get(&correction).copied()
    }

    /// Live events that reference `id`, oldest first.
    pub fn dependents(&self, id: EventId) -> impl Iterator<Item = EventId> + '_ {
        self.journal
            .dependents
            .get(&id)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// Earliest live event that references `id`.
    pub fn first_dependent(&self, id: EventId) -> Option<EventId> {
        self.dependents(id).next()
    }
}

fn corrupt(event: &Event, reason: &str) -> CoreError {
    CoreError::CorruptLog(format!("event {} ({}): {}", event.id, event.kind.name(), reason))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::EventLog;
    use crate::event::EventDraft;
    use crate::types::{CashAccount, Rate};

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    fn draft(kind: EventKind) -> EventDraft {
        EventDraft::new(day(), None, kind)
    }

    fn mchele() -> ProductId {
        ProductId::new("mchele")
    }

    fn opening_log() -> EventLog {
        let mut log = EventLog::new();
        log.append_all(vec![
            draft(EventKind::ProductListed {
                product_id: mchele(),
                name: "Mchele 1kg".to_string(),
                selling_price: Money::from_major(3_000),
                cost_price: Money::from_major(2_200),
                vat_rate: Rate::from_bps(1800),
            }),
            draft(EventKind::StockReceived {
                product_id: mchele(),
                quantity: 80,
                unit_cost: Money::from_major(2_200),
                supplier: "Azam Mills".to_string(),
                method: PaymentMethod::Credit,
            }),
        ])
        .unwrap();
        log
    }

    fn credit_sale(quantity: i64) -> EventKind {
        let net = Money::from_major(3_000).multiply_quantity(quantity);
        EventKind::SaleRecorded {
            customer: "Duka la Juma".to_string(),
            product_id: mchele(),
            quantity,
            unit_price: Money::from_major(3_000),
            unit_cost: Money::from_major(2_200),
            vat_rate: Rate::from_bps(1800),
            vat: net.apply_rate(Rate::from_bps(1800)),
            method: PaymentMethod::Credit,
        }
    }

    #[test]
    fn test_project_is_deterministic() {
        let mut log = opening_log();
        log.append(draft(credit_sale(5))).unwrap();

        let first = project(log.read_all()).unwrap();
        let second = project(log.read_all()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.available_stock(&mchele(), &Location::Main), 75);
    }

    #[test]
    fn test_apply_matches_project() {
        let mut log = opening_log();
        log.append(draft(credit_sale(5))).unwrap();

        let mut incremental = ProjectedState::new();
        for event in log.read_all() {
            incremental.apply(event).unwrap();
        }
        assert_eq!(incremental, project(&log).unwrap());
    }

    #[test]
    fn test_credit_receipt_opens_payable() {
        let state = project(&opening_log()).unwrap();
        let payable = state.payable(EventId::new(2)).unwrap();
        assert_eq!(payable.amount, Money::from_major(176_000));
        assert_eq!(payable.status, ObligationStatus::Open);
        assert_eq!(state.views().consolidated_cash().total(), Money::zero());
    }

    #[test]
    fn test_reversal_restores_views_and_reports_status() {
        let log = opening_log();
        let before = project(&log).unwrap();

        let mut log = log;
        let sale = log.append(draft(credit_sale(5))).unwrap();
        log.append(draft(EventKind::EventReversed {
            target: sale,
            reason: "entered twice".to_string(),
        }))
        .unwrap();

        let after = project(&log).unwrap();
        assert_eq!(after.views(), before.views());
        assert!(after.is_reversed(sale));
        assert_eq!(
            after.obligation_status(sale),
            Some(ObligationStatus::Reversed)
        );
    }

    #[test]
    fn test_dependents_are_tracked_and_released() {
        let mut log = opening_log();
        let sale = log.append(draft(credit_sale(5))).unwrap();
        let payment = log
            .append(draft(EventKind::PaymentReceived {
                receivable: sale,
                amount: Money::from_major(1_000),
                method: PaymentMethod::Mobile,
            }))
            .unwrap();

        let state = project(&log).unwrap();
        assert_eq!(state.first_dependent(sale), Some(payment));
        assert_eq!(state.first_dependent(EventId::new(1)), Some(EventId::new(2)));
        assert_eq!(
            state.views().headquarters.get(CashAccount::Mobile),
            Money::from_major(1_000)
        );

        log.append(draft(EventKind::EventReversed {
            target: payment,
            reason: "wrong customer".to_string(),
        }))
        .unwrap();
        let state = project(&log).unwrap();
        assert_eq!(state.first_dependent(sale), None);
        assert_eq!(
            state.receivable(sale).unwrap().outstanding(),
            state.receivable(sale).unwrap().amount
        );
    }

    #[test]
    fn test_rejects_out_of_order_and_unknown_references() {
        let log = opening_log();
        let events: Vec<Event> = log.read_all().cloned().collect();

        let mut state = ProjectedState::new();
        assert!(matches!(
            state.apply(&events[1]),
            Err(CoreError::CorruptLog(_))
        ));

        let mut log = EventLog::new();
        log.append(draft(credit_sale(1))).unwrap();
        assert!(matches!(project(&log), Err(CoreError::CorruptLog(_))));
    }

    #[test]
    fn test_reversing_a_reversal_is_corrupt() {
        let mut log = opening_log();
        let sale = log.append(draft(credit_sale(1))).unwrap();
        let reversal = log
            .append(draft(EventKind::EventReversed {
                target: sale,
                reason: "typo".to_string(),
            }))
            .unwrap();
        log.append(draft(EventKind::EventReversed {
            target: reversal,
            reason: "undo".to_string(),
        }))
        .unwrap();
        assert!(matches!(project(&log), Err(CoreError::CorruptLog(_))));
    }
}
