//! # Deltas
//!
//! Every reducer returns a [`Delta`]: the ordered list of [`Effect`]s its
//! event had on the views. The applied delta is kept in the journal index so
//! a reversal can apply the exact inverse instead of re-deriving it.
//!
//! ## Inversion
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Effect                        inverse()                                │
//! │  ───────────────────────────   ───────────────────────────────────      │
//! │  Cash { +x }                   Cash { −x }                              │
//! │  Stock { +q }                  Stock { −q }                             │
//! │  Post(Account, +x)             Post(Account, −x)                        │
//! │  ReceivableOpened(r)           ReceivableRemoved(r)                     │
//! │  AssetStatus { a ─► b }        AssetStatus { b ─► a }                   │
//! │  ...                                                                    │
//! │                                                                         │
//! │  Delta [e1, e2, e3]  ──inverse──►  [e3⁻¹, e2⁻¹, e1⁻¹]                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Insert/remove pairs carry the whole record so the inverse restores it
//! verbatim, including any payments applied to it before the removal.
//!
//! Applying a delta is all-or-nothing: if one effect would push a balance
//! out of range, the effects already applied are undone and the views are
//! left as they were.

use serde::{Deserialize, Serialize};

use crate::event::EventId;
use crate::money::Money;
use crate::types::{AssetStatus, CashAccount, EmployeeId, Location, ProductId, Rate, ShopId};
use crate::validation::ValidationResult;
use crate::views::{
    Account, Asset, Employee, LedgerViews, Payable, PayrollRun, PendingExpense, Product,
    ProductStock, Receivable, Sale,
};

/// One invertible change to the views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum Effect {
    Cash {
        shop: Option<ShopId>,
        account: CashAccount,
        amount: Money,
    },
    Stock {
        product: ProductId,
        location: Location,
        quantity: i64,
    },
    Post {
        account: Account,
        amount: Money,
    },
    Expense {
        category: String,
        amount: Money,
    },
    /// Principal received from (+) or repaid to (−) a lender.
    Loan {
        lender: String,
        amount: Money,
    },
    ProductAdded(Product),
    ProductRemoved(Product),
    SaleAdded(Sale),
    SaleRemoved(Sale),
    SaleVatChanged {
        sale: EventId,
        from: (Rate, Money),
        to: (Rate, Money),
    },
    ReceivableOpened(Receivable),
    ReceivableRemoved(Receivable),
    ReceivablePaid {
        receivable: EventId,
        amount: Money,
    },
    PayableOpened(Payable),
    PayableRemoved(Payable),
    PayablePaid {
        payable: EventId,
        amount: Money,
    },
    ExpensePending(PendingExpense),
    ExpenseCleared(PendingExpense),
    AssetAdded(Asset),
    AssetRemoved(Asset),
    AssetStatusChanged {
        asset: EventId,
        from: AssetStatus,
        to: AssetStatus,
    },
    EmployeeAdded(Employee),
    EmployeeRemoved(Employee),
    PayrollRunAdded(PayrollRun),
    PayrollRunRemoved(PayrollRun),
}

impl Effect {
    /// The effect that undoes this one.
    pub fn inverse(&self) -> Effect {
        match self.clone() {
            Effect::Cash {
                shop,
                account,
                amount,
            } => Effect::Cash {
                shop,
                account,
                amount: -amount,
            },
            Effect::Stock {
                product,
                location,
                quantity,
            } => Effect::Stock {
                product,
                location,
                quantity: -quantity,
            },
            Effect::Post { account, amount } => Effect::Post {
                account,
                amount: -amount,
            },
            Effect::Expense { category, amount } => Effect::Expense {
                category,
                amount: -amount,
            },
            Effect::Loan { lender, amount } => Effect::Loan {
                lender,
                amount: -amount,
            },
            Effect::ProductAdded(p) => Effect::ProductRemoved(p),
            Effect::ProductRemoved(p) => Effect::ProductAdded(p),
            Effect::SaleAdded(s) => Effect::SaleRemoved(s),
            Effect::SaleRemoved(s) => Effect::SaleAdded(s),
            Effect::SaleVatChanged { sale, from, to } => Effect::SaleVatChanged {
                sale,
                from: to,
                to: from,
            },
            Effect::ReceivableOpened(r) => Effect::ReceivableRemoved(r),
            Effect::ReceivableRemoved(r) => Effect::ReceivableOpened(r),
            Effect::ReceivablePaid { receivable, amount } => Effect::ReceivablePaid {
                receivable,
                amount: -amount,
            },
            Effect::PayableOpened(p) => Effect::PayableRemoved(p),
            Effect::PayableRemoved(p) => Effect::PayableOpened(p),
            Effect::PayablePaid { payable, amount } => Effect::PayablePaid {
                payable,
                amount: -amount,
            },
            Effect::ExpensePending(e) => Effect::ExpenseCleared(e),
            Effect::ExpenseCleared(e) => Effect::ExpensePending(e),
            Effect::AssetAdded(a) => Effect::AssetRemoved(a),
            Effect::AssetRemoved(a) => Effect::AssetAdded(a),
            Effect::AssetStatusChanged { asset, from, to } => Effect::AssetStatusChanged {
                asset,
                from: to,
                to: from,
            },
            Effect::EmployeeAdded(e) => Effect::EmployeeRemoved(e),
            Effect::EmployeeRemoved(e) => Effect::EmployeeAdded(e),
            Effect::PayrollRunAdded(r) => Effect::PayrollRunRemoved(r),
            Effect::PayrollRunRemoved(r) => Effect::PayrollRunAdded(r),
        }
    }

    /// Applies the effect to the views. A failed effect changes nothing.
    pub fn apply(&self, views: &mut LedgerViews) -> ValidationResult<()> {
        match self {
            Effect::Cash {
                shop,
                account,
                amount,
            } => views.adjust_cash(shop.as_ref(), *account, *amount)?,
            Effect::Stock {
                product,
                location,
                quantity,
            } => {
                let stock = views.stock.entry(product.clone()).or_default();
                stock.adjust(location, *quantity);
            }
            Effect::Post { account, amount } => views.totals.add(*account, *amount)?,
            Effect::Expense { category, amount } => views.totals.add_expense(category, *amount)?,
            Effect::Loan { lender, amount } => views.totals.add_loan(lender, *amount)?,
            Effect::ProductAdded(p) => {
                views.products.insert(p.id.clone(), p.clone());
                views.stock.entry(p.id.clone()).or_insert_with(ProductStock::default);
            }
            Effect::ProductRemoved(p) => {
                views.products.remove(&p.id);
                if views
                    .stock
                    .get(&p.id)
                    .is_some_and(|s| *s == ProductStock::default())
                {
                    views.stock.remove(&p.id);
                }
            }
            Effect::SaleAdded(s) => {
                views.sales.insert(s.id, s.clone());
            }
            Effect::SaleRemoved(s) => {
                views.sales.remove(&s.id);
            }
            Effect::SaleVatChanged { sale, to, .. } => {
                if let Some(s) = views.sales.get_mut(sale) {
                    s.vat_rate = to.0;
                    s.vat = to.1;
                }
            }
            Effect::ReceivableOpened(r) => {
                views.receivables.insert(r.origin_event_id, r.clone());
            }
            Effect::ReceivableRemoved(r) => {
                views.receivables.remove(&r.origin_event_id);
            }
            Effect::ReceivablePaid { receivable, amount } => {
                if let Some(r) = views.receivables.get_mut(receivable) {
                    r.record_payment(*amount)?;
                }
            }
            Effect::PayableOpened(p) => {
                views.payables.insert(p.origin_event_id, p.clone());
            }
            Effect::PayableRemoved(p) => {
                views.payables.remove(&p.origin_event_id);
            }
            Effect::PayablePaid { payable, amount } => {
                if let Some(p) = views.payables.get_mut(payable) {
                    p.record_payment(*amount)?;
                }
            }
            Effect::ExpensePending(e) => {
                views.pending_expenses.insert(e.id, e.clone());
            }
            Effect::ExpenseCleared(e) => {
                views.pending_expenses.remove(&e.id);
            }
            Effect::AssetAdded(a) => {
                views.assets.insert(a.id, a.clone());
            }
            Effect::AssetRemoved(a) => {
                views.assets.remove(&a.id);
            }
            Effect::AssetStatusChanged { asset, to, .. } => {
                if let Some(a) = views.assets.get_mut(asset) {
                    a.status = *to;
                }
            }
            Effect::EmployeeAdded(e) => {
                views.employees.insert(e.id.clone(), e.clone());
            }
            Effect::EmployeeRemoved(e) => {
                views.employees.remove(&e.id);
            }
            Effect::PayrollRunAdded(r) => {
                views.payroll_runs.insert(r.id, r.clone());
            }
            Effect::PayrollRunRemoved(r) => {
                views.payroll_runs.remove(&r.id);
            }
        }
        Ok(())
    }
}

/// The ordered effects of one event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delta {
    effects: Vec<Effect>,
}

impl Delta {
    pub fn new() -> Self {
        Delta::default()
    }

    pub fn push(&mut self, effect: Effect) -> &mut Self {
        self.effects.push(effect);
        self
    }

    /// Adds a cash movement unless the amount is zero.
    pub fn cash(&mut self, shop: Option<&ShopId>, account: CashAccount, amount: Money) -> &mut Self {
        if !amount.is_zero() {
            self.effects.push(Effect::Cash {
                shop: shop.cloned(),
                account,
                amount,
            });
        }
        self
    }

    /// Adds an accumulator posting unless the amount is zero.
    pub fn post(&mut self, account: Account, amount: Money) -> &mut Self {
        if !amount.is_zero() {
            self.effects.push(Effect::Post { account, amount });
        }
        self
    }

    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Undo delta: inverted effects in reverse order.
    pub fn inverse(&self) -> Delta {
        Delta {
            effects: self.effects.iter().rev().map(Effect::inverse).collect(),
        }
    }

    /// Applies every effect in order, or none of them.
    pub fn apply(&self, views: &mut LedgerViews) -> ValidationResult<()> {
        for (applied, effect) in self.effects.iter().enumerate() {
            if let Err(err) = effect.apply(views) {
                for done in self.effects[..applied].iter().rev() {
                    // Undoing an effect that just succeeded restores the
                    // previous value, which was in range.
                    let _ = done.inverse().apply(views);
                }
                return Err(err);
            }
        }
        Ok(())
    }

    /// Stock movements this delta makes, as (product, location, quantity).
    pub fn stock_moves(&self) -> impl Iterator<Item = (&ProductId, &Location, i64)> + '_ {
        self.effects.iter().filter_map(|effect| match effect {
            Effect::Stock {
                product,
                location,
                quantity,
            } => Some((product, location, *quantity)),
            _ => None,
        })
    }

    /// Loan principal this delta moves, as (lender, amount).
    pub fn loan_moves(&self) -> impl Iterator<Item = (&str, Money)> + '_ {
        self.effects.iter().filter_map(|effect| match effect {
            Effect::Loan { lender, amount } => Some((lender.as_str(), *amount)),
            _ => None,
        })
    }

    /// Whether this delta opened a receivable or payable.
    pub fn opens_obligation(&self) -> bool {
        self.effects
            .iter()
            .any(|e| matches!(e, Effect::ReceivableOpened(_) | Effect::PayableOpened(_)))
    }

    /// Employee added by this delta, if any.
    pub fn registered_employee(&self) -> Option<&EmployeeId> {
        self.effects.iter().find_map(|effect| match effect {
            Effect::EmployeeAdded(e) => Some(&e.id),
            _ => None,
        })
    }
}
