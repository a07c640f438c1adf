//! # Ledger Views
//!
//! The current-state read models folded from the event log. Nothing here is
//! ever stored; every value is rebuilt by the projector.
//!
//! ## View Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  LedgerViews                                                            │
//! │  ├── headquarters  CashBalances { cash, bank, mobile }                  │
//! │  ├── shops         ShopId ──► CashBalances                              │
//! │  ├── products      ProductId ──► Product (catalogue)                    │
//! │  ├── stock         ProductId ──► ProductStock { main, by shop }         │
//! │  ├── sales         EventId ──► Sale (current VAT portion)               │
//! │  ├── receivables   EventId ──► Receivable  (id = sale event)            │
//! │  ├── payables      EventId ──► Payable     (id = opening event)         │
//! │  ├── pending       EventId ──► PendingExpense (posted, not approved)    │
//! │  ├── assets        EventId ──► Asset                                    │
//! │  ├── employees     EmployeeId ──► Employee                              │
//! │  ├── payroll_runs  EventId ──► PayrollRun                               │
//! │  └── totals        Accumulators (revenue, VAT, capital, loans, ...)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Zero-valued partitions (shop cash, shop stock, expense categories) are
//! pruned so that a view folded with and without a reversed pair compares
//! equal.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

use crate::event::{EventId, PayrollLine};
use crate::money::Money;
use crate::validation::{bounded_add, ValidationResult};
use crate::types::{
    AssetStatus, CashAccount, EmployeeId, Location, ObligationStatus, PaymentMethod, PayrollPeriod,
    ProductId, Rate, ShopId,
};

// =============================================================================
// Cash
// =============================================================================

/// Liquid balances of one partition (headquarters or a shop).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CashBalances {
    pub cash: Money,
    pub bank: Money,
    pub mobile: Money,
}

impl CashBalances {
    pub fn get(&self, account: CashAccount) -> Money {
        match account {
            CashAccount::Cash => self.cash,
            CashAccount::Bank => self.bank,
            CashAccount::Mobile => self.mobile,
        }
    }

    /// Moves money in or out of one account. Fails, leaving the balance
    /// unchanged, if the result would leave the accepted range.
    pub fn add(&mut self, account: CashAccount, amount: Money) -> ValidationResult<()> {
        let slot = match account {
            CashAccount::Cash => &mut self.cash,
            CashAccount::Bank => &mut self.bank,
            CashAccount::Mobile => &mut self.mobile,
        };
        *slot = bounded_add(account.as_str(), *slot, amount)?;
        Ok(())
    }

    pub fn total(&self) -> Money {
        self.cash + self.bank + self.mobile
    }

    pub fn is_zero(&self) -> bool {
        self.cash.is_zero() && self.bank.is_zero() && self.mobile.is_zero()
    }

    /// Sum of two partitions.
    pub fn merge(&self, other: &CashBalances) -> CashBalances {
        CashBalances {
            cash: self.cash + other.cash,
            bank: self.bank + other.bank,
            mobile: self.mobile + other.mobile,
        }
    }
}

// =============================================================================
// Catalogue & Stock
// =============================================================================

/// A listed product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub selling_price: Money,
    pub cost_price: Money,
    pub vat_rate: Rate,
}

/// Quantity on hand per location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductStock {
    pub main_stock: i64,
    pub stock_by_shop: BTreeMap<ShopId, i64>,
}

impl ProductStock {
    pub fn at(&self, location: &Location) -> i64 {
        match location {
            Location::Main => self.main_stock,
            Location::Shop(shop) => self.stock_by_shop.get(shop).copied().unwrap_or(0),
        }
    }

    pub fn adjust(&mut self, location: &Location, quantity: i64) {
        match location {
            Location::Main => self.main_stock += quantity,
            Location::Shop(shop) => {
                let entry = self.stock_by_shop.entry(shop.clone()).or_insert(0);
                *entry += quantity;
                if *entry == 0 {
                    self.stock_by_shop.remove(shop);
                }
            }
        }
    }

    /// Quantity across every location.
    pub fn total(&self) -> i64 {
        self.main_stock + self.stock_by_shop.values().sum::<i64>()
    }
}

// =============================================================================
// Sales & Obligations
// =============================================================================

/// A recorded sale with its current VAT portion.
///
/// `net` and `vat_charged` are fixed at sale time; VAT adjustments only
/// move `vat_rate` and `vat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Sale {
    pub id: EventId,
    pub customer: String,
    pub product_id: ProductId,
    pub quantity: i64,
    /// Taxable base: quantity × unit price.
    pub net: Money,
    /// VAT on the customer's receipt.
    pub vat_charged: Money,
    pub vat_rate: Rate,
    pub vat: Money,
    pub method: PaymentMethod,
    pub shop_id: Option<ShopId>,
    pub business_date: NaiveDate,
}

impl Sale {
    /// What the customer pays: net plus the VAT charged at sale time.
    pub fn gross(&self) -> Money {
        self.net + self.vat_charged
    }

    /// Revenue this sale currently contributes. A VAT adjustment moves the
    /// difference between `vat_charged` and `vat` into revenue.
    pub fn revenue(&self) -> Money {
        self.gross() - self.vat
    }
}

/// Money owed to the business.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Receivable {
    pub origin_event_id: EventId,
    pub customer: String,
    pub amount: Money,
    pub paid: Money,
    pub status: ObligationStatus,
}

/// Money the business owes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Payable {
    pub origin_event_id: EventId,
    pub supplier: String,
    pub amount: Money,
    pub paid: Money,
    pub status: ObligationStatus,
}

fn status_for(amount: Money, paid: Money) -> ObligationStatus {
    if paid >= amount {
        ObligationStatus::Settled
    } else {
        ObligationStatus::Open
    }
}

impl Receivable {
    pub fn outstanding(&self) -> Money {
        self.amount - self.paid
    }

    pub(crate) fn record_payment(&mut self, amount: Money) -> ValidationResult<()> {
        self.paid = bounded_add("receivable paid", self.paid, amount)?;
        self.status = status_for(self.amount, self.paid);
        Ok(())
    }
}

impl Payable {
    pub fn outstanding(&self) -> Money {
        self.amount - self.paid
    }

    pub(crate) fn record_payment(&mut self, amount: Money) -> ValidationResult<()> {
        self.paid = bounded_add("payable paid", self.paid, amount)?;
        self.status = status_for(self.amount, self.paid);
        Ok(())
    }
}

/// An expense that was posted but not yet approved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PendingExpense {
    pub id: EventId,
    pub category: String,
    pub description: String,
    pub supplier: String,
    pub amount: Money,
    pub method: PaymentMethod,
}

// =============================================================================
// Assets
// =============================================================================

/// Fixed asset register entry. Depreciation is derived, see
/// [`crate::depreciation`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Asset {
    pub id: EventId,
    pub name: String,
    pub cost: Money,
    pub acquisition_date: NaiveDate,
    pub depreciation_rate: Rate,
    pub status: AssetStatus,
}

// =============================================================================
// People
// =============================================================================

/// A registered employee. `shop_id` None = headquarters staff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Employee {
    pub id: EmployeeId,
    pub name: String,
    pub gross_salary: Money,
    pub shop_id: Option<ShopId>,
}

/// A processed payroll run. Deductions are recomputed from gross salary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollRun {
    pub id: EventId,
    pub period: PayrollPeriod,
    pub shop_id: Option<ShopId>,
    pub lines: Vec<PayrollLine>,
}

// =============================================================================
// Accumulators
// =============================================================================

/// Named running totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Account {
    Revenue,
    CostOfSales,
    OutputVat,
    StockLosses,
    Salaries,
    NssfPayable,
    PayePayable,
    ShareCapital,
    Drawings,
    LoanBalance,
    /// Sale price minus net book value, summed (negative = net loss).
    DisposalGains,
    /// Net book value written off.
    AssetWriteOffs,
    /// Depreciation already charged on assets that left the register.
    RealizedDepreciation,
}

/// P&L and equity running totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Accumulators {
    pub revenue: Money,
    pub cost_of_sales: Money,
    pub output_vat: Money,
    pub stock_losses: Money,
    pub expenses_by_category: BTreeMap<String, Money>,
    pub salaries: Money,
    pub nssf_payable: Money,
    pub paye_payable: Money,
    pub share_capital: Money,
    pub drawings: Money,
    pub loan_balance: Money,
    /// Outstanding loan principal per lender. Sums to `loan_balance`.
    pub loans_by_lender: BTreeMap<String, Money>,
    pub disposal_gains: Money,
    pub asset_write_offs: Money,
    pub realized_depreciation: Money,
}

impl Account {
    pub fn as_str(&self) -> &'static str {
        match self {
            Account::Revenue => "revenue",
            Account::CostOfSales => "cost_of_sales",
            Account::OutputVat => "output_vat",
            Account::StockLosses => "stock_losses",
            Account::Salaries => "salaries",
            Account::NssfPayable => "nssf_payable",
            Account::PayePayable => "paye_payable",
            Account::ShareCapital => "share_capital",
            Account::Drawings => "drawings",
            Account::LoanBalance => "loan_balance",
            Account::DisposalGains => "disposal_gains",
            Account::AssetWriteOffs => "asset_write_offs",
            Account::RealizedDepreciation => "realized_depreciation",
        }
    }
}

impl Accumulators {
    pub fn get(&self, account: Account) -> Money {
        match account {
            Account::Revenue => self.revenue,
            Account::CostOfSales => self.cost_of_sales,
            Account::OutputVat => self.output_vat,
            Account::StockLosses => self.stock_losses,
            Account::Salaries => self.salaries,
            Account::NssfPayable => self.nssf_payable,
            Account::PayePayable => self.paye_payable,
            Account::ShareCapital => self.share_capital,
            Account::Drawings => self.drawings,
            Account::LoanBalance => self.loan_balance,
            Account::DisposalGains => self.disposal_gains,
            Account::AssetWriteOffs => self.asset_write_offs,
            Account::RealizedDepreciation => self.realized_depreciation,
        }
    }

    pub(crate) fn add(&mut self, account: Account, amount: Money) -> ValidationResult<()> {
        let slot = match account {
            Account::Revenue => &mut self.revenue,
            Account::CostOfSales => &mut self.cost_of_sales,
            Account::OutputVat => &mut self.output_vat,
            Account::StockLosses => &mut self.stock_losses,
            Account::Salaries => &mut self.salaries,
            Account::NssfPayable => &mut self.nssf_payable,
            Account::PayePayable => &mut self.paye_payable,
            Account::ShareCapital => &mut self.share_capital,
            Account::Drawings => &mut self.drawings,
            Account::LoanBalance => &mut self.loan_balance,
            Account::DisposalGains => &mut self.disposal_gains,
            Account::AssetWriteOffs => &mut self.asset_write_offs,
            Account::RealizedDepreciation => &mut self.realized_depreciation,
        };
        *slot = bounded_add(account.as_str(), *slot, amount)?;
        Ok(())
    }

    pub(crate) fn add_expense(&mut self, category: &str, amount: Money) -> ValidationResult<()> {
        let current = self
            .expenses_by_category
            .get(category)
            .copied()
            .unwrap_or_default();
        let updated = bounded_add("expenses", current, amount)?;
        if updated.is_zero() {
            self.expenses_by_category.remove(category);
        } else {
            self.expenses_by_category
                .insert(category.to_string(), updated);
        }
        Ok(())
    }

    /// Principal received from (positive) or repaid to (negative) a lender.
    pub(crate) fn add_loan(&mut self, lender: &str, amount: Money) -> ValidationResult<()> {
        let current = self.loan_from(lender);
        let updated = bounded_add("loan", current, amount)?;
        self.loan_balance = bounded_add("loan_balance", self.loan_balance, amount)?;
        if updated.is_zero() {
            self.loans_by_lender.remove(lender);
        } else {
            self.loans_by_lender.insert(lender.to_string(), updated);
        }
        Ok(())
    }

    /// Outstanding principal owed to one lender.
    pub fn loan_from(&self, lender: &str) -> Money {
        self.loans_by_lender.get(lender).copied().unwrap_or_default()
    }

    /// Sum of approved operating expenses across categories.
    pub fn operating_expenses(&self) -> Money {
        self.expenses_by_category.values().sum()
    }
}

// =============================================================================
// Ledger Views
// =============================================================================

/// Everything the presentation layer reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerViews {
    pub headquarters: CashBalances,
    pub shops: BTreeMap<ShopId, CashBalances>,
    pub products: BTreeMap<ProductId, Product>,
    pub stock: BTreeMap<ProductId, ProductStock>,
    pub sales: BTreeMap<EventId, Sale>,
    pub receivables: BTreeMap<EventId, Receivable>,
    pub payables: BTreeMap<EventId, Payable>,
    pub pending_expenses: BTreeMap<EventId, PendingExpense>,
    pub assets: BTreeMap<EventId, Asset>,
    pub employees: BTreeMap<EmployeeId, Employee>,
    pub payroll_runs: BTreeMap<EventId, PayrollRun>,
    pub totals: Accumulators,
}

impl LedgerViews {
    /// Cash balances of one partition (zero if the shop never moved cash).
    pub fn cash_at(&self, shop: Option<&ShopId>) -> CashBalances {
        match shop {
            None => self.headquarters,
            Some(id) => self.shops.get(id).copied().unwrap_or_default(),
        }
    }

    /// Merge of headquarters and every shop partition.
    pub fn consolidated_cash(&self) -> CashBalances {
        self.shops
            .values()
            .fold(self.headquarters, |acc, shop| acc.merge(shop))
    }

    pub(crate) fn adjust_cash(
        &mut self,
        shop: Option<&ShopId>,
        account: CashAccount,
        amount: Money,
    ) -> ValidationResult<()> {
        match shop {
            None => self.headquarters.add(account, amount),
            Some(id) => {
                let mut balances = self.cash_at(Some(id));
                balances.add(account, amount)?;
                if balances.is_zero() {
                    self.shops.remove(id);
                } else {
                    self.shops.insert(id.clone(), balances);
                }
                Ok(())
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
