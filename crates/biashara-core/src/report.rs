//! # Reports
//!
//! Derived read models over the projection. No state of their own: every
//! figure is computed from [`LedgerViews`] and an `as_of` date.
//!
//! ## Reports
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ProfitAndLoss   revenue − cost of sales − expenses − depreciation ...  │
//! │  BalanceSheet    cash, receivables, stock, fixed assets                 │
//! │                  payables, loans, VAT/NSSF/PAYE owed, equity            │
//! │  VatSummary      output VAT by rate                                     │
//! │  FinancialReport all three, rendered as plain text for the AI flows     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Totals are lifetime-to-date. Depreciation on assets still on the
//! register is evaluated at `as_of`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use ts_rs::TS;

use crate::money::Money;
use crate::types::{AssetStatus, ObligationStatus, Rate};
use crate::views::{CashBalances, LedgerViews};
use crate::MAX_BALANCE;

// =============================================================================
// Profit & Loss
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProfitAndLoss {
    pub as_of: NaiveDate,
    pub revenue: Money,
    pub cost_of_sales: Money,
    pub gross_profit: Money,
    pub expenses_by_category: BTreeMap<String, Money>,
    pub operating_expenses: Money,
    pub salaries: Money,
    pub stock_losses: Money,
    pub depreciation: Money,
    pub asset_write_offs: Money,
    pub disposal_gains: Money,
    pub net_profit: Money,
}

impl ProfitAndLoss {
    pub fn from_views(views: &LedgerViews, as_of: NaiveDate) -> Self {
        let totals = &views.totals;
        let gross_profit = totals.revenue - totals.cost_of_sales;
        let operating_expenses = totals.operating_expenses();
        let depreciation = totals.realized_depreciation
            + views
                .assets
                .values()
                .filter(|a| a.status == AssetStatus::Active)
                .map(|a| a.accumulated_depreciation(as_of))
                .sum::<Money>();

        let net_profit = gross_profit - operating_expenses - totals.salaries - totals.stock_losses
            - depreciation
            - totals.asset_write_offs
            + totals.disposal_gains;

        ProfitAndLoss {
            as_of,
            revenue: totals.revenue,
            cost_of_sales: totals.cost_of_sales,
            gross_profit,
            expenses_by_category: totals.expenses_by_category.clone(),
            operating_expenses,
            salaries: totals.salaries,
            stock_losses: totals.stock_losses,
            depreciation,
            asset_write_offs: totals.asset_write_offs,
            disposal_gains: totals.disposal_gains,
            net_profit,
        }
    }
}

// =============================================================================
// Balance Sheet
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BalanceSheet {
    pub as_of: NaiveDate,
    // assets
    pub cash: CashBalances,
    pub receivables: Money,
    pub inventory: Money,
    pub fixed_assets: Money,
    pub total_assets: Money,
    // liabilities
    pub payables: Money,
    pub loans: Money,
    pub vat_payable: Money,
    pub nssf_payable: Money,
    pub paye_payable: Money,
    pub total_liabilities: Money,
    // equity
    pub share_capital: Money,
    pub drawings: Money,
    /// Share capital minus operating expenses. Kept for screens that show
    /// it; `retained_earnings` is the figure derived from the P&L.
    pub owners_equity: Money,
    pub retained_earnings: Money,
}

impl BalanceSheet {
    pub fn from_views(views: &LedgerViews, as_of: NaiveDate) -> Self {
        let totals = &views.totals;
        let cash = views.consolidated_cash();

        let receivables = views
            .receivables
            .values()
            .filter(|r| r.status == ObligationStatus::Open)
            .map(|r| r.outstanding())
            .sum::<Money>();
        let payables = views
            .payables
            .values()
            .filter(|p| p.status == ObligationStatus::Open)
            .map(|p| p.outstanding())
            .sum::<Money>();

        let inventory = views
            .stock
            .iter()
            .filter_map(|(id, stock)| {
                views
                    .products
                    .get(id)
                    .map(|p| p.cost_price.saturating_multiply_quantity(stock.total()))
                    .map(|value| value.min(Money::from_cents(MAX_BALANCE)))
            })
            .sum::<Money>();
        let fixed_assets = views
            .assets
            .values()
            .filter(|a| a.status == AssetStatus::Active)
            .map(|a| a.net_book_value(as_of))
            .sum::<Money>();

        let total_assets = cash.total() + receivables + inventory + fixed_assets;
        let total_liabilities = payables
            + totals.loan_balance
            + totals.output_vat
            + totals.nssf_payable
            + totals.paye_payable;

        BalanceSheet {
            as_of,
            cash,
            receivables,
            inventory,
            fixed_assets,
            total_assets,
            payables,
            loans: totals.loan_balance,
            vat_payable: totals.output_vat,
            nssf_payable: totals.nssf_payable,
            paye_payable: totals.paye_payable,
            total_liabilities,
            share_capital: totals.share_capital,
            drawings: totals.drawings,
            owners_equity: totals.share_capital - totals.operating_expenses(),
            retained_earnings: ProfitAndLoss::from_views(views, as_of).net_profit,
        }
    }

    pub fn net_assets(&self) -> Money {
        self.total_assets - self.total_liabilities
    }
}

// =============================================================================
// VAT Summary
// =============================================================================

/// Output VAT for one rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct VatLine {
    pub rate: Rate,
    pub sales: u32,
    pub net: Money,
    pub vat: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct VatSummary {
    pub lines: Vec<VatLine>,
    pub taxable_sales: Money,
    pub zero_rated_sales: Money,
    pub output_vat: Money,
}

impl VatSummary {
    pub fn from_views(views: &LedgerViews) -> Self {
        let mut by_rate: BTreeMap<Rate, VatLine> = BTreeMap::new();
        for sale in views.sales.values() {
            let line = by_rate.entry(sale.vat_rate).or_insert(VatLine {
                rate: sale.vat_rate,
                sales: 0,
                net: Money::zero(),
                vat: Money::zero(),
            });
            line.sales += 1;
            line.net += sale.revenue();
            line.vat += sale.vat;
        }

        let lines: Vec<VatLine> = by_rate.into_values().collect();
        let (zero_rated, taxable): (Vec<&VatLine>, Vec<&VatLine>) =
            lines.iter().partition(|l| l.rate.is_zero());

        VatSummary {
            taxable_sales: taxable.iter().map(|l| l.net).sum(),
            zero_rated_sales: zero_rated.iter().map(|l| l.net).sum(),
            output_vat: views.totals.output_vat,
            lines,
        }
    }
}

// =============================================================================
// Financial Report
// =============================================================================

/// Everything the AI flows get to see, in one bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FinancialReport {
    pub profit_and_loss: ProfitAndLoss,
    pub balance_sheet: BalanceSheet,
    pub vat: VatSummary,
}

impl FinancialReport {
    pub fn from_views(views: &LedgerViews, as_of: NaiveDate) -> Self {
        FinancialReport {
            profit_and_loss: ProfitAndLoss::from_views(views, as_of),
            balance_sheet: BalanceSheet::from_views(views, as_of),
            vat: VatSummary::from_views(views),
        }
    }

    /// Plain-text rendering used as AI flow input.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FinancialReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pnl = &self.profit_and_loss;
        let bs = &self.balance_sheet;

        writeln!(f, "FINANCIAL REPORT as of {}", pnl.as_of)?;
        writeln!(f)?;
        writeln!(f, "PROFIT AND LOSS")?;
        writeln!(f, "  Revenue: {}", pnl.revenue)?;
        writeln!(f, "  Cost of sales: {}", pnl.cost_of_sales)?;
        writeln!(f, "  Gross profit: {}", pnl.gross_profit)?;
        for (category, amount) in &pnl.expenses_by_category {
            writeln!(f, "  Expense ({}): {}", category, amount)?;
        }
        writeln!(f, "  Salaries: {}", pnl.salaries)?;
        writeln!(f, "  Stock losses: {}", pnl.stock_losses)?;
        writeln!(f, "  Depreciation: {}", pnl.depreciation)?;
        writeln!(f, "  Asset write-offs: {}", pnl.asset_write_offs)?;
        writeln!(f, "  Gains on disposal: {}", pnl.disposal_gains)?;
        writeln!(f, "  Net profit: {}", pnl.net_profit)?;
        writeln!(f)?;
        writeln!(f, "BALANCE SHEET")?;
        writeln!(
            f,
            "  Cash: {} (cash {}, bank {}, mobile {})",
            bs.cash.total(),
            bs.cash.cash,
            bs.cash.bank,
            bs.cash.mobile
        )?;
        writeln!(f, "  Receivables: {}", bs.receivables)?;
        writeln!(f, "  Inventory: {}", bs.inventory)?;
        writeln!(f, "  Fixed assets: {}", bs.fixed_assets)?;
        writeln!(f, "  Total assets: {}", bs.total_assets)?;
        writeln!(f, "  Payables: {}", bs.payables)?;
        writeln!(f, "  Loans: {}", bs.loans)?;
        writeln!(f, "  VAT payable: {}", bs.vat_payable)?;
        writeln!(f, "  NSSF payable: {}", bs.nssf_payable)?;
        writeln!(f, "  PAYE payable: {}", bs.paye_payable)?;
        writeln!(f, "  Total liabilities: {}", bs.total_liabilities)?;
        writeln!(f, "  Share capital: {}", bs.share_capital)?;
        writeln!(f, "  Drawings: {}", bs.drawings)?;
        writeln!(f, "  Owner's equity: {}", bs.owners_equity)?;
        writeln!(f, "  Retained earnings: {}", bs.retained_earnings)?;
        writeln!(f)?;
        writeln!(f, "VAT")?;
        for line in &self.vat.lines {
            writeln!(
                f,
                "  {}%: {} sales, net {}, VAT {}",
                line.rate.percentage(),
                line.sales,
                line.net,
                line.vat
            )?;
        }
        write!(f, "  Output VAT: {}", self.vat.output_vat)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{handle, Command, CommandEnvelope};
    use crate::projection::ProjectedState;
    use crate::log::EventLog;
    use crate::types::{PaymentMethod, ProductId};

    fn ledger(commands: Vec<(NaiveDate, Command)>) -> ProjectedState {
        let mut log = EventLog::new();
        let mut state = ProjectedState::new();
        for (date, command) in commands {
            let drafts = handle(&CommandEnvelope::new(date, command), &state).unwrap();
            for id in log.append_all(drafts).unwrap() {
                state.apply(log.get(id).unwrap()).unwrap();
            }
        }
        state
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample() -> ProjectedState {
        ledger(sample_commands())
    }

    fn sample_commands() -> Vec<(NaiveDate, Command)> {
        let d = date(2025, 1, 10);
        vec![
            (
                d,
                Command::ContributeCapital {
                    contributor: "Owner".to_string(),
                    amount: Money::from_major(3_000_000),
                    method: PaymentMethod::Bank,
                },
            ),
            (
                d,
                Command::ListProduct {
                    product_id: ProductId::new("sukari"),
                    name: "Sukari 1kg".to_string(),
                    selling_price: Money::from_major(3_500),
                    cost_price: Money::from_major(3_000),
                    vat_rate: Rate::from_bps(1800),
                },
            ),
            (
                d,
                Command::ReceiveStock {
                    product_id: ProductId::new("sukari"),
                    quantity: 100,
                    unit_cost: Money::from_major(3_000),
                    supplier: "Kilombero Sugar".to_string(),
                    method: PaymentMethod::Bank,
                },
            ),
            (
                d,
                Command::RecordSale {
                    customer: "Walk-in".to_string(),
                    product_id: ProductId::new("sukari"),
                    quantity: 20,
                    method: PaymentMethod::Cash,
                },
            ),
            (
                d,
                Command::PostExpense {
                    category: "rent".to_string(),
                    description: "January".to_string(),
                    supplier: "Landlord".to_string(),
                    amount: Money::from_major(200_000),
                    method: PaymentMethod::Cash,
                },
            ),
            (d, Command::ApproveExpense { expense: crate::event::EventId::new(5) }),
            (
                d,
                Command::AcquireAsset {
                    name: "Shelving".to_string(),
                    cost: Money::from_major(400_000),
                    depreciation_rate: Rate::from_bps(2500),
                    supplier: "Fundi".to_string(),
                    method: PaymentMethod::Bank,
                },
            ),
        ]
    }

    #[test]
    fn test_profit_and_loss() {
        let state = sample();
        let pnl = ProfitAndLoss::from_views(state.views(), date(2026, 1, 10));

        assert_eq!(pnl.revenue, Money::from_major(70_000));
        assert_eq!(pnl.cost_of_sales, Money::from_major(60_000));
        assert_eq!(pnl.gross_profit, Money::from_major(10_000));
        assert_eq!(pnl.operating_expenses, Money::from_major(200_000));
        // one year at 25% on 400,000
        assert_eq!(pnl.depreciation, Money::from_major(100_000));
        assert_eq!(pnl.net_profit, Money::from_major(-290_000));
    }

    #[test]
    fn test_balance_sheet() {
        let state = sample();
        let bs = BalanceSheet::from_views(state.views(), date(2026, 1, 10));

        // bank: 3,000,000 − 300,000 − 400,000; cash: 82,600 − 200,000
        assert_eq!(bs.cash.bank, Money::from_major(2_300_000));
        assert_eq!(bs.cash.cash, Money::from_major(-117_400));
        assert_eq!(bs.inventory, Money::from_major(240_000));
        assert_eq!(bs.fixed_assets, Money::from_major(300_000));
        assert_eq!(bs.vat_payable, Money::from_major(12_600));
        assert_eq!(bs.owners_equity, Money::from_major(2_800_000));
        assert_eq!(bs.retained_earnings, Money::from_major(-290_000));
    }

    #[test]
    fn test_vat_summary() {
        let state = sample();
        let vat = VatSummary::from_views(state.views());
        assert_eq!(vat.lines.len(), 1);
        assert_eq!(vat.taxable_sales, Money::from_major(70_000));
        assert_eq!(vat.zero_rated_sales, Money::zero());
        assert_eq!(vat.output_vat, Money::from_major(12_600));
    }

    #[test]
    fn test_vat_summary_follows_vat_adjustments() {
        let mut commands = sample_commands();
        commands.push((
            date(2025, 2, 1),
            Command::AdjustVat {
                sale: crate::event::EventId::new(4),
                new_rate: Rate::zero(),
            },
        ));
        let state = ledger(commands);

        let pnl = ProfitAndLoss::from_views(state.views(), date(2026, 1, 10));
        let vat = VatSummary::from_views(state.views());
        // 70,000 net + 12,600 VAT now all recognised as zero-rated revenue.
        assert_eq!(pnl.revenue, Money::from_major(82_600));
        assert_eq!(vat.zero_rated_sales, pnl.revenue);
        assert_eq!(vat.taxable_sales, Money::zero());
        assert_eq!(vat.output_vat, Money::zero());
    }

    #[test]
    fn test_render_contains_headline_figures() {
        let state = sample();
        let text = FinancialReport::from_views(state.views(), date(2026, 1, 10)).render();
        assert!(text.starts_with("FINANCIAL REPORT as of 2026-01-10"));
        assert!(text.contains("Revenue: TSh 70,000.00"));
        assert!(text.contains("Expense (rent): TSh 200,000.00"));
        assert!(text.contains("Output VAT: TSh 12,600.00"));
    }
}
