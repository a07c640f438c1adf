//! # Command Handlers
//!
//! One handler per business operation. A handler reads the current
//! projection, checks its preconditions and returns the events to append.
//! It never mutates anything.
//!
//! ## Command Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CommandEnvelope { shop_id, business_date, command }                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  handle(envelope, &state)                                               │
//! │       ├── field validation      → ValidationError                       │
//! │       ├── business rules        → InsufficientStock, Overpayment, ...   │
//! │       │   (against the projection)                                      │
//! │       └── OK → Vec<EventDraft>  (usually one, AdjustVat emits two)      │
//! │                                                                         │
//! │  Rejected commands leave the log untouched.                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::event::{EventDraft, EventId, EventKind, PayrollLine, VatAdjustment};
use crate::money::Money;
use crate::projection::ProjectedState;
use crate::reversal;
use crate::types::{
    AssetStatus, EmployeeId, Location, ObligationKind, ObligationStatus, PaymentMethod,
    PayrollPeriod, ProductId, Rate, ShopId,
};
use crate::validation::{
    line_total, validate_amount, validate_name, validate_quantity, validate_rate,
    validate_settling_method,
};
use crate::views::Product;

// =============================================================================
// Commands
// =============================================================================

/// A business operation requested by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    ListProduct {
        product_id: ProductId,
        name: String,
        selling_price: Money,
        cost_price: Money,
        vat_rate: Rate,
    },
    ReceiveStock {
        product_id: ProductId,
        quantity: i64,
        unit_cost: Money,
        supplier: String,
        method: PaymentMethod,
    },
    RecordSale {
        customer: String,
        product_id: ProductId,
        quantity: i64,
        method: PaymentMethod,
    },
    /// Settles a receivable (money in) or a payable (money out).
    ApprovePayment {
        obligation: EventId,
        amount: Money,
        method: PaymentMethod,
    },
    PostExpense {
        category: String,
        description: String,
        supplier: String,
        amount: Money,
        method: PaymentMethod,
    },
    ApproveExpense {
        expense: EventId,
    },
    TransferStock {
        product_id: ProductId,
        from: Location,
        to: Location,
        quantity: i64,
    },
    RecordDamage {
        product_id: ProductId,
        quantity: i64,
        reason: String,
    },
    AcquireAsset {
        name: String,
        cost: Money,
        depreciation_rate: Rate,
        supplier: String,
        method: PaymentMethod,
    },
    SellAsset {
        asset: EventId,
        buyer: String,
        price: Money,
        method: PaymentMethod,
    },
    WriteOffAsset {
        asset: EventId,
        reason: String,
    },
    ContributeCapital {
        contributor: String,
        amount: Money,
        method: PaymentMethod,
    },
    RecordDrawing {
        owner: String,
        amount: Money,
        method: PaymentMethod,
    },
    ReceiveLoan {
        lender: String,
        amount: Money,
        method: PaymentMethod,
    },
    RepayLoan {
        lender: String,
        amount: Money,
        method: PaymentMethod,
    },
    RegisterEmployee {
        employee_id: EmployeeId,
        name: String,
        gross_salary: Money,
    },
    ProcessPayroll {
        period: PayrollPeriod,
        method: PaymentMethod,
    },
    AdjustVat {
        sale: EventId,
        new_rate: Rate,
    },
    ReverseEvent {
        event_id: EventId,
        reason: String,
    },
}

impl Command {
    /// snake_case command name, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::ListProduct { .. } => "list_product",
            Command::ReceiveStock { .. } => "receive_stock",
            Command::RecordSale { .. } => "record_sale",
            Command::ApprovePayment { .. } => "approve_payment",
            Command::PostExpense { .. } => "post_expense",
            Command::ApproveExpense { .. } => "approve_expense",
            Command::TransferStock { .. } => "transfer_stock",
            Command::RecordDamage { .. } => "record_damage",
            Command::AcquireAsset { .. } => "acquire_asset",
            Command::SellAsset { .. } => "sell_asset",
            Command::WriteOffAsset { .. } => "write_off_asset",
            Command::ContributeCapital { .. } => "contribute_capital",
            Command::RecordDrawing { .. } => "record_drawing",
            Command::ReceiveLoan { .. } => "receive_loan",
            Command::RepayLoan { .. } => "repay_loan",
            Command::RegisterEmployee { .. } => "register_employee",
            Command::ProcessPayroll { .. } => "process_payroll",
            Command::AdjustVat { .. } => "adjust_vat",
            Command::ReverseEvent { .. } => "reverse_event",
        }
    }
}

/// A command plus the context every event needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    /// None = headquarters.
    pub shop_id: Option<ShopId>,
    pub business_date: NaiveDate,
    pub command: Command,
}

impl CommandEnvelope {
    /// Headquarters command.
    pub fn new(business_date: NaiveDate, command: Command) -> Self {
        CommandEnvelope {
            shop_id: None,
            business_date,
            command,
        }
    }

    /// Same command issued from a shop.
    pub fn at_shop(mut self, shop: ShopId) -> Self {
        self.shop_id = Some(shop);
        self
    }

    pub fn location(&self) -> Location {
        Location::from_shop(self.shop_id.as_ref())
    }

    fn draft(&self, kind: EventKind) -> EventDraft {
        EventDraft::new(self.business_date, self.shop_id.clone(), kind)
    }
}

// =============================================================================
// Dispatch
// =============================================================================

/// Validates a command against the projection and returns the events to
/// append.
pub fn handle(envelope: &CommandEnvelope, state: &ProjectedState) -> CoreResult<Vec<EventDraft>> {
    let kind = match &envelope.command {
        Command::ListProduct {
            product_id,
            name,
            selling_price,
            cost_price,
            vat_rate,
        } => list_product(state, product_id, name, *selling_price, *cost_price, *vat_rate)?,

        Command::ReceiveStock {
            product_id,
            quantity,
            unit_cost,
            supplier,
            method,
        } => {
            listed_product(state, product_id)?;
            EventKind::StockReceived {
                product_id: product_id.clone(),
                quantity: *quantity,
                unit_cost: *unit_cost,
                supplier: supplier.clone(),
                method: *method,
            }
        }

        Command::RecordSale {
            customer,
            product_id,
            quantity,
            method,
        } => record_sale(envelope, state, customer, product_id, *quantity, *method)?,

        Command::ApprovePayment {
            obligation,
            amount,
            method,
        } => approve_payment(state, *obligation, *amount, *method)?,

        Command::PostExpense {
            category,
            description,
            supplier,
            amount,
            method,
        } => EventKind::ExpensePosted {
            category: category.trim().to_lowercase(),
            description: description.clone(),
            supplier: supplier.clone(),
            amount: *amount,
            method: *method,
        },

        Command::ApproveExpense { expense } => {
            let pending = state
                .pending_expense(*expense)
                .ok_or_else(|| CoreError::not_found("expense", expense))?;
            EventKind::ExpenseApproved {
                expense: *expense,
                category: pending.category.clone(),
                supplier: pending.supplier.clone(),
                amount: pending.amount,
                method: pending.method,
            }
        }

        Command::TransferStock {
            product_id,
            from,
            to,
            quantity,
        } => {
            listed_product(state, product_id)?;
            validate_quantity(*quantity)?;
            ensure_stock(state, product_id, from, *quantity)?;
            EventKind::StockTransferred {
                product_id: product_id.clone(),
                from: from.clone(),
                to: to.clone(),
                quantity: *quantity,
            }
        }

        Command::RecordDamage {
            product_id,
            quantity,
            reason,
        } => {
            let product = listed_product(state, product_id)?;
            validate_quantity(*quantity)?;
            ensure_stock(state, product_id, &envelope.location(), *quantity)?;
            EventKind::StockDamaged {
                product_id: product_id.clone(),
                quantity: *quantity,
                unit_cost: product.cost_price,
                reason: reason.clone(),
            }
        }

        Command::AcquireAsset {
            name,
            cost,
            depreciation_rate,
            supplier,
            method,
        } => EventKind::AssetAcquired {
            name: name.clone(),
            cost: *cost,
            depreciation_rate: *depreciation_rate,
            supplier: supplier.clone(),
            method: *method,
        },

        Command::SellAsset {
            asset,
            buyer,
            price,
            method,
        } => {
            let net_book_value = active_asset_value(envelope, state, *asset)?;
            EventKind::AssetSold {
                asset: *asset,
                buyer: buyer.clone(),
                price: *price,
                net_book_value,
                method: *method,
            }
        }

        Command::WriteOffAsset { asset, reason } => {
            let net_book_value = active_asset_value(envelope, state, *asset)?;
            EventKind::AssetWrittenOff {
                asset: *asset,
                net_book_value,
                reason: reason.clone(),
            }
        }

        Command::ContributeCapital {
            contributor,
            amount,
            method,
        } => EventKind::CapitalContributed {
            contributor: contributor.clone(),
            amount: *amount,
            method: *method,
        },

        Command::RecordDrawing {
            owner,
            amount,
            method,
        } => EventKind::DrawingMade {
            owner: owner.clone(),
            amount: *amount,
            method: *method,
        },

        Command::ReceiveLoan {
            lender,
            amount,
            method,
        } => EventKind::LoanReceived {
            lender: lender.clone(),
            amount: *amount,
            method: *method,
        },

        Command::RepayLoan {
            lender,
            amount,
            method,
        } => {
            validate_amount("amount", *amount)?;
            let outstanding = state.loan_balance(lender);
            if *amount > outstanding {
                return Err(CoreError::Overpayment {
                    obligation: format!("loan from {}", lender),
                    outstanding,
                    attempted: *amount,
                });
            }
            EventKind::LoanRepaid {
                lender: lender.clone(),
                amount: *amount,
                method: *method,
            }
        }

        Command::RegisterEmployee {
            employee_id,
            name,
            gross_salary,
        } => {
            if state.employee(employee_id).is_some() {
                return Err(ValidationError::Duplicate {
                    field: "employee".to_string(),
                    value: employee_id.to_string(),
                }
                .into());
            }
            EventKind::EmployeeRegistered {
                employee_id: employee_id.clone(),
                name: name.clone(),
                gross_salary: *gross_salary,
            }
        }

        Command::ProcessPayroll { period, method } => {
            process_payroll(envelope, state, period, *method)?
        }

        Command::AdjustVat { sale, new_rate } => return adjust_vat(envelope, state, *sale, *new_rate),

        Command::ReverseEvent { event_id, reason } => {
            return reversal::reverse(state, *event_id, reason)?
                .into_iter()
                .map(|kind| {
                    kind.validate()?;
                    Ok(envelope.draft(kind))
                })
                .collect();
        }
    };

    // Same structural checks the log runs, surfaced before anything is sent
    // to persistence.
    kind.validate()?;
    Ok(vec![envelope.draft(kind)])
}

// =============================================================================
// Handlers
// =============================================================================

fn listed_product<'a>(state: &'a ProjectedState, id: &ProductId) -> CoreResult<&'a Product> {
    state
        .product(id)
        .ok_or_else(|| CoreError::not_found("product", id))
}

fn ensure_stock(
    state: &ProjectedState,
    product: &ProductId,
    location: &Location,
    requested: i64,
) -> CoreResult<()> {
    let available = state.available_stock(product, location);
    if requested > available {
        return Err(CoreError::InsufficientStock {
            product: product.clone(),
            location: location.clone(),
            available,
            requested,
        });
    }
    Ok(())
}

fn list_product(
    state: &ProjectedState,
    product_id: &ProductId,
    name: &str,
    selling_price: Money,
    cost_price: Money,
    vat_rate: Rate,
) -> CoreResult<EventKind> {
    validate_name("product_id", product_id.as_str())?;
    if state.product(product_id).is_some() {
        return Err(ValidationError::Duplicate {
            field: "product".to_string(),
            value: product_id.to_string(),
        }
        .into());
    }
    Ok(EventKind::ProductListed {
        product_id: product_id.clone(),
        name: name.trim().to_string(),
        selling_price,
        cost_price,
        vat_rate,
    })
}

/// ## Pricing
/// ```text
/// net   = quantity × selling price
/// vat   = net × product VAT rate   (rounded to the cent)
/// gross = net + vat                ──► cash account, or receivable on Credit
/// ```
fn record_sale(
    envelope: &CommandEnvelope,
    state: &ProjectedState,
    customer: &str,
    product_id: &ProductId,
    quantity: i64,
    method: PaymentMethod,
) -> CoreResult<EventKind> {
    validate_name("customer", customer)?;
    validate_quantity(quantity)?;
    let product = listed_product(state, product_id)?;
    ensure_stock(state, product_id, &envelope.location(), quantity)?;

    let net = line_total("sale total", product.selling_price, quantity)?;
    Ok(EventKind::SaleRecorded {
        customer: customer.trim().to_string(),
        product_id: product_id.clone(),
        quantity,
        unit_price: product.selling_price,
        unit_cost: product.cost_price,
        vat_rate: product.vat_rate,
        vat: net.apply_rate(product.vat_rate),
        method,
    })
}

fn approve_payment(
    state: &ProjectedState,
    obligation: EventId,
    amount: Money,
    method: PaymentMethod,
) -> CoreResult<EventKind> {
    validate_amount("amount", amount)?;
    validate_settling_method(method)?;

    let kind = state
        .obligation_kind(obligation)
        .ok_or_else(|| CoreError::not_found("obligation", obligation))?;
    let (status, outstanding) = match kind {
        ObligationKind::Receivable => state
            .receivable(obligation)
            .map(|r| (r.status, r.outstanding())),
        ObligationKind::Payable => state.payable(obligation).map(|p| (p.status, p.outstanding())),
    }
    .ok_or_else(|| CoreError::not_found("obligation", obligation))?;

    if status != ObligationStatus::Open {
        return Err(CoreError::AlreadySettled { kind, obligation });
    }
    if amount > outstanding {
        return Err(CoreError::Overpayment {
            obligation: format!("{} {}", kind, obligation),
            outstanding,
            attempted: amount,
        });
    }

    Ok(match kind {
        ObligationKind::Receivable => EventKind::PaymentReceived {
            receivable: obligation,
            amount,
            method,
        },
        ObligationKind::Payable => EventKind::PaymentMade {
            payable: obligation,
            amount,
            method,
        },
    })
}

/// Net book value at the envelope's business date of an asset that is
/// still on the register.
fn active_asset_value(
    envelope: &CommandEnvelope,
    state: &ProjectedState,
    asset: EventId,
) -> CoreResult<Money> {
    let current = state
        .asset(asset)
        .ok_or_else(|| CoreError::not_found("asset", asset))?;
    if current.status != AssetStatus::Active {
        return Err(CoreError::InvalidAssetStatus {
            asset,
            status: current.status,
        });
    }
    Ok(current.net_book_value(envelope.business_date))
}

fn process_payroll(
    envelope: &CommandEnvelope,
    state: &ProjectedState,
    period: &PayrollPeriod,
    method: PaymentMethod,
) -> CoreResult<EventKind> {
    let shop = envelope.shop_id.as_ref();
    if state.payroll_run_for(period, shop).is_some() {
        return Err(CoreError::AlreadyProcessed {
            period: period.clone(),
            shop: shop.cloned(),
        });
    }
    validate_settling_method(method)?;

    let lines: Vec<PayrollLine> = state
        .employees_at(shop)
        .into_iter()
        .map(|e| PayrollLine {
            employee_id: e.id.clone(),
            name: e.name.clone(),
            gross_salary: e.gross_salary,
        })
        .collect();
    if lines.is_empty() {
        return Err(ValidationError::Required {
            field: "employees".to_string(),
        }
        .into());
    }

    Ok(EventKind::PayrollProcessed {
        period: period.clone(),
        lines,
        method,
    })
}

/// Emits the reversal of the sale's current VAT portion followed by the
/// correction at the new rate.
fn adjust_vat(
    envelope: &CommandEnvelope,
    state: &ProjectedState,
    sale_id: EventId,
    new_rate: Rate,
) -> CoreResult<Vec<EventDraft>> {
    validate_rate("new_rate", new_rate)?;
    let sale = state
        .sale(sale_id)
        .ok_or_else(|| CoreError::not_found("sale", sale_id))?;
    if sale.vat_rate == new_rate {
        return Err(ValidationError::InvalidFormat {
            field: "new_rate".to_string(),
            reason: format!("sale {} is already at {}%", sale_id, new_rate.percentage()),
        }
        .into());
    }

    let kinds = [
        EventKind::VatAdjusted {
            sale: sale_id,
            adjustment: VatAdjustment::Reversal,
            rate: sale.vat_rate,
            amount: sale.vat,
        },
        EventKind::VatAdjusted {
            sale: sale_id,
            adjustment: VatAdjustment::Correction,
            rate: new_rate,
            amount: sale.net.apply_rate(new_rate),
        },
    ];
    kinds
        .into_iter()
        .map(|kind| {
            kind.validate()?;
            Ok(envelope.draft(kind))
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::EventLog;
    use crate::projection::project;
    use crate::types::CashAccount;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    fn mchele() -> ProductId {
        ProductId::new("mchele")
    }

    fn kariakoo() -> ShopId {
        ShopId::new("kariakoo")
    }

    /// Runs commands in order, appending their events.
    struct Harness {
        log: EventLog,
        state: ProjectedState,
    }

    impl Harness {
        fn new() -> Self {
            Harness {
                log: EventLog::new(),
                state: ProjectedState::new(),
            }
        }

        fn try_run(&mut self, envelope: CommandEnvelope) -> CoreResult<Vec<EventId>> {
            let drafts = handle(&envelope, &self.state)?;
            let ids = self.log.append_all(drafts)?;
            for id in &ids {
                let event = self.log.get(*id).unwrap().clone();
                self.state.apply(&event)?;
            }
            Ok(ids)
        }

        fn run(&mut self, command: Command) -> EventId {
            self.try_run(CommandEnvelope::new(day(), command)).unwrap()[0]
        }

        fn stocked() -> Self {
            let mut h = Harness::new();
            h.run(Command::ListProduct {
                product_id: mchele(),
                name: "Mchele 1kg".to_string(),
                selling_price: Money::from_major(3_000),
                cost_price: Money::from_major(2_200),
                vat_rate: Rate::from_bps(1800),
            });
            h.run(Command::ReceiveStock {
                product_id: mchele(),
                quantity: 80,
                unit_cost: Money::from_major(2_200),
                supplier: "Azam Mills".to_string(),
                method: PaymentMethod::Cash,
            });
            h
        }
    }

    #[test]
    fn test_cash_sale_then_reversal() {
        let mut h = Harness::stocked();
        let cash_before = h.state.views().headquarters.cash;

        let sale = h.run(Command::RecordSale {
            customer: "Walk-in".to_string(),
            product_id: mchele(),
            quantity: 10,
            method: PaymentMethod::Cash,
        });
        assert_eq!(h.state.available_stock(&mchele(), &Location::Main), 70);
        // 10 × 3,000 = 30,000 + 18% VAT = 35,400
        assert_eq!(
            h.state.views().headquarters.cash - cash_before,
            Money::from_major(35_400)
        );
        assert!(h.state.views().receivables.is_empty());

        h.run(Command::ReverseEvent {
            event_id: sale,
            reason: "customer returned goods".to_string(),
        });
        assert_eq!(h.state.available_stock(&mchele(), &Location::Main), 80);
        assert_eq!(h.state.views().headquarters.cash, cash_before);
    }

    #[test]
    fn test_sale_rejects_insufficient_stock() {
        let mut h = Harness::stocked();
        let before = h.log.len();
        let result = h.try_run(CommandEnvelope::new(
            day(),
            Command::RecordSale {
                customer: "Walk-in".to_string(),
                product_id: mchele(),
                quantity: 81,
                method: PaymentMethod::Cash,
            },
        ));
        assert!(matches!(
            result,
            Err(CoreError::InsufficientStock {
                available: 80,
                requested: 81,
                ..
            })
        ));
        assert_eq!(h.log.len(), before);
    }

    #[test]
    fn test_credit_sale_settled_by_bank() {
        let mut h = Harness::stocked();
        let sale = h.run(Command::RecordSale {
            customer: "Duka la Juma".to_string(),
            product_id: mchele(),
            quantity: 5,
            method: PaymentMethod::Credit,
        });
        let receivable = h.state.receivable(sale).unwrap().clone();
        assert_eq!(receivable.status, ObligationStatus::Open);
        assert_eq!(receivable.amount, Money::from_major(17_700));

        let bank_before = h.state.views().headquarters.bank;
        h.run(Command::ApprovePayment {
            obligation: sale,
            amount: receivable.amount,
            method: PaymentMethod::Bank,
        });
        assert_eq!(
            h.state.obligation_status(sale),
            Some(ObligationStatus::Settled)
        );
        assert_eq!(
            h.state.views().headquarters.bank - bank_before,
            receivable.amount
        );

        let again = h.try_run(CommandEnvelope::new(
            day(),
            Command::ApprovePayment {
                obligation: sale,
                amount: Money::from_major(1),
                method: PaymentMethod::Bank,
            },
        ));
        assert!(matches!(again, Err(CoreError::AlreadySettled { .. })));
    }

    #[test]
    fn test_overpayment_and_credit_settlement_rejected() {
        let mut h = Harness::stocked();
        let sale = h.run(Command::RecordSale {
            customer: "Duka la Juma".to_string(),
            product_id: mchele(),
            quantity: 1,
            method: PaymentMethod::Credit,
        });

        let over = handle(
            &CommandEnvelope::new(
                day(),
                Command::ApprovePayment {
                    obligation: sale,
                    amount: Money::from_major(10_000),
                    method: PaymentMethod::Cash,
                },
            ),
            &h.state,
        );
        assert!(matches!(over, Err(CoreError::Overpayment { .. })));

        let credit = handle(
            &CommandEnvelope::new(
                day(),
                Command::ApprovePayment {
                    obligation: sale,
                    amount: Money::from_major(100),
                    method: PaymentMethod::Credit,
                },
            ),
            &h.state,
        );
        assert!(matches!(credit, Err(CoreError::Validation(_))));

        let unknown = handle(
            &CommandEnvelope::new(
                day(),
                Command::ApprovePayment {
                    obligation: EventId::new(99),
                    amount: Money::from_major(100),
                    method: PaymentMethod::Cash,
                },
            ),
            &h.state,
        );
        assert!(matches!(unknown, Err(CoreError::NotFound { .. })));
    }

    #[test]
    fn test_transfer_leaves_cash_unchanged() {
        let mut h = Harness::stocked();
        let cash_before = h.state.views().consolidated_cash();

        h.run(Command::TransferStock {
            product_id: mchele(),
            from: Location::Main,
            to: Location::Shop(kariakoo()),
            quantity: 30,
        });

        assert_eq!(h.state.views().consolidated_cash(), cash_before);
        assert_eq!(h.state.available_stock(&mchele(), &Location::Main), 50);
        assert_eq!(
            h.state
                .available_stock(&mchele(), &Location::Shop(kariakoo())),
            30
        );

        let too_many = handle(
            &CommandEnvelope::new(
                day(),
                Command::TransferStock {
                    product_id: mchele(),
                    from: Location::Shop(kariakoo()),
                    to: Location::Main,
                    quantity: 31,
                },
            ),
            &h.state,
        );
        assert!(matches!(too_many, Err(CoreError::InsufficientStock { .. })));
    }

    #[test]
    fn test_shop_sale_moves_shop_partition() {
        let mut h = Harness::stocked();
        h.run(Command::TransferStock {
            product_id: mchele(),
            from: Location::Main,
            to: Location::Shop(kariakoo()),
            quantity: 10,
        });
        h.try_run(
            CommandEnvelope::new(
                day(),
                Command::RecordSale {
                    customer: "Walk-in".to_string(),
                    product_id: mchele(),
                    quantity: 2,
                    method: PaymentMethod::Mobile,
                },
            )
            .at_shop(kariakoo()),
        )
        .unwrap();

        let shop_cash = h.state.views().cash_at(Some(&kariakoo()));
        assert_eq!(shop_cash.get(CashAccount::Mobile), Money::from_major(7_080));
        assert_eq!(
            h.state
                .available_stock(&mchele(), &Location::Shop(kariakoo())),
            8
        );
    }

    #[test]
    fn test_sell_asset_records_gain() {
        let mut h = Harness::new();
        let acquired = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let asset = h
            .try_run(CommandEnvelope::new(
                acquired,
                Command::AcquireAsset {
                    name: "Delivery pickup".to_string(),
                    cost: Money::from_major(2_500_000),
                    depreciation_rate: Rate::from_bps(2500),
                    supplier: "Toyota Tanzania".to_string(),
                    method: PaymentMethod::Credit,
                },
            ))
            .unwrap()[0];

        let sold_on = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        assert_eq!(
            h.state.net_book_value(asset, sold_on),
            Some(Money::from_major(1_406_250))
        );

        h.try_run(CommandEnvelope::new(
            sold_on,
            Command::SellAsset {
                asset,
                buyer: "Bakari Transport".to_string(),
                price: Money::from_major(1_500_000),
                method: PaymentMethod::Bank,
            },
        ))
        .unwrap();

        let totals = &h.state.views().totals;
        assert_eq!(totals.disposal_gains, Money::from_major(93_750));
        assert_eq!(h.state.asset(asset).unwrap().status, AssetStatus::Sold);

        let again = handle(
            &CommandEnvelope::new(
                sold_on,
                Command::WriteOffAsset {
                    asset,
                    reason: "lost".to_string(),
                },
            ),
            &h.state,
        );
        assert!(matches!(
            again,
            Err(CoreError::InvalidAssetStatus {
                status: AssetStatus::Sold,
                ..
            })
        ));
    }

    #[test]
    fn test_payroll_is_idempotent() {
        let mut h = Harness::new();
        h.run(Command::ContributeCapital {
            contributor: "Owner".to_string(),
            amount: Money::from_major(5_000_000),
            method: PaymentMethod::Bank,
        });
        h.run(Command::RegisterEmployee {
            employee_id: EmployeeId::new("asha"),
            name: "Asha Mwinyi".to_string(),
            gross_salary: Money::from_major(600_000),
        });

        let period = PayrollPeriod::new(2026, 2).unwrap();
        h.run(Command::ProcessPayroll {
            period: period.clone(),
            method: PaymentMethod::Bank,
        });
        let snapshot = h.state.clone();

        let second = h.try_run(CommandEnvelope::new(
            day(),
            Command::ProcessPayroll {
                period,
                method: PaymentMethod::Bank,
            },
        ));
        assert!(matches!(second, Err(CoreError::AlreadyProcessed { .. })));
        assert_eq!(h.state, snapshot);

        // gross 600,000: nssf 60,000, taxable 540,000 -> paye 24,000
        let totals = &h.state.views().totals;
        assert_eq!(totals.nssf_payable, Money::from_major(60_000));
        assert_eq!(totals.paye_payable, Money::from_major(24_000));
        assert_eq!(
            h.state.views().headquarters.bank,
            Money::from_major(5_000_000 - 516_000)
        );
    }

    #[test]
    fn test_adjust_vat_emits_reversal_and_correction() {
        let mut h = Harness::stocked();
        let sale = h.run(Command::RecordSale {
            customer: "Walk-in".to_string(),
            product_id: mchele(),
            quantity: 10,
            method: PaymentMethod::Cash,
        });
        let revenue_and_vat = {
            let t = &h.state.views().totals;
            t.revenue + t.output_vat
        };

        let ids = h
            .try_run(CommandEnvelope::new(
                day(),
                Command::AdjustVat {
                    sale,
                    new_rate: Rate::zero(),
                },
            ))
            .unwrap();
        assert_eq!(ids.len(), 2);

        let totals = &h.state.views().totals;
        assert_eq!(totals.output_vat, Money::zero());
        assert_eq!(totals.revenue + totals.output_vat, revenue_and_vat);
        assert_eq!(h.state.sale(sale).unwrap().vat, Money::zero());
        assert_eq!(h.state.sale(sale).unwrap().vat_rate, Rate::zero());
    }

    #[test]
    fn test_loan_repayment_cannot_exceed_balance() {
        let mut h = Harness::new();
        h.run(Command::ReceiveLoan {
            lender: "CRDB Bank".to_string(),
            amount: Money::from_major(1_000_000),
            method: PaymentMethod::Bank,
        });
        h.run(Command::RepayLoan {
            lender: "CRDB Bank".to_string(),
            amount: Money::from_major(400_000),
            method: PaymentMethod::Bank,
        });
        assert_eq!(
            h.state.views().totals.loan_balance,
            Money::from_major(600_000)
        );

        let over = handle(
            &CommandEnvelope::new(
                day(),
                Command::RepayLoan {
                    lender: "CRDB Bank".to_string(),
                    amount: Money::from_major(600_001),
                    method: PaymentMethod::Bank,
                },
            ),
            &h.state,
        );
        assert!(matches!(over, Err(CoreError::Overpayment { .. })));

        // Principal owed to one lender cannot be repaid to another.
        let wrong_lender = handle(
            &CommandEnvelope::new(
                day(),
                Command::RepayLoan {
                    lender: "NMB Bank".to_string(),
                    amount: Money::from_major(1_000),
                    method: PaymentMethod::Bank,
                },
            ),
            &h.state,
        );
        assert!(matches!(wrong_lender, Err(CoreError::Overpayment { .. })));
    }

    #[test]
    fn test_oversized_amounts_are_rejected_not_folded() {
        let mut h = Harness::new();
        let huge = h.try_run(CommandEnvelope::new(
            day(),
            Command::ContributeCapital {
                contributor: "Owner".to_string(),
                amount: Money::from_cents(i64::MAX - 1),
                method: PaymentMethod::Bank,
            },
        ));
        assert!(matches!(huge, Err(CoreError::Validation(_))));
        assert!(h.log.is_empty());

        // Each contribution is in range; the running total eventually is not.
        let max = Money::from_cents(crate::MAX_AMOUNT);
        let per_balance = crate::MAX_BALANCE / crate::MAX_AMOUNT;
        for _ in 0..per_balance {
            h.run(Command::ContributeCapital {
                contributor: "Owner".to_string(),
                amount: max,
                method: PaymentMethod::Bank,
            });
        }
        let snapshot = h.state.clone();
        let drafts = handle(
            &CommandEnvelope::new(
                day(),
                Command::ContributeCapital {
                    contributor: "Owner".to_string(),
                    amount: Money::from_cents(10),
                    method: PaymentMethod::Bank,
                },
            ),
            &h.state,
        )
        .unwrap();
        let ids = h.log.append_all(drafts).unwrap();
        let event = h.log.get(ids[0]).unwrap().clone();
        assert!(matches!(
            h.state.apply(&event),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
        assert_eq!(h.state, snapshot);
    }

    #[test]
    fn test_sale_total_beyond_ceiling_is_rejected() {
        let mut h = Harness::new();
        h.run(Command::ListProduct {
            product_id: ProductId::new("gold"),
            name: "Gold bar".to_string(),
            selling_price: Money::from_cents(crate::MAX_AMOUNT),
            cost_price: Money::zero(),
            vat_rate: Rate::zero(),
        });
        h.run(Command::ReceiveStock {
            product_id: ProductId::new("gold"),
            quantity: 2,
            unit_cost: Money::from_major(1),
            supplier: "Mint".to_string(),
            method: PaymentMethod::Credit,
        });

        let sale = handle(
            &CommandEnvelope::new(
                day(),
                Command::RecordSale {
                    customer: "Walk-in".to_string(),
                    product_id: ProductId::new("gold"),
                    quantity: 2,
                    method: PaymentMethod::Cash,
                },
            ),
            &h.state,
        );
        assert!(matches!(
            sale,
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
    }

    #[test]
    fn test_expense_approval_flow() {
        let mut h = Harness::new();
        let posted = h.run(Command::PostExpense {
            category: "Rent".to_string(),
            description: "March rent".to_string(),
            supplier: "Mwenge Properties".to_string(),
            amount: Money::from_major(400_000),
            method: PaymentMethod::Credit,
        });
        assert!(h.state.pending_expense(posted).is_some());
        assert!(h.state.views().totals.expenses_by_category.is_empty());

        let approved = h.run(Command::ApproveExpense { expense: posted });
        assert!(h.state.pending_expense(posted).is_none());
        assert_eq!(
            h.state.views().totals.expenses_by_category["rent"],
            Money::from_major(400_000)
        );
        assert_eq!(
            h.state.payable(approved).unwrap().amount,
            Money::from_major(400_000)
        );
    }

    #[test]
    fn test_project_of_handled_log_matches_incremental_state() {
        let mut h = Harness::stocked();
        h.run(Command::RecordSale {
            customer: "Walk-in".to_string(),
            product_id: mchele(),
            quantity: 3,
            method: PaymentMethod::Cash,
        });
        assert_eq!(project(&h.log).unwrap(), h.state);
    }
}
