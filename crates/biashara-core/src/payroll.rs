//! # Payroll Deductions
//!
//! Statutory deductions derived from gross monthly salary. Never stored:
//! payroll events carry gross pay only and everything below is recomputed.
//!
//! ## Deduction Flow
//! ```text
//! gross ──► NSSF (10% employee share)
//!   │
//!   └─► taxable = gross − NSSF ──► PAYE (monthly bands)
//!
//! net = gross − NSSF − PAYE
//!
//! PAYE bands (TSh / month, on taxable pay)
//!   0         – 270,000     0%
//!   270,000   – 520,000     8% of excess over 270,000
//!   520,000   – 760,000     20,000  + 20% of excess over 520,000
//!   760,000   – 1,000,000   68,000  + 25% of excess over 760,000
//!   1,000,000 +             128,000 + 30% of excess over 1,000,000
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::event::PayrollLine;
use crate::money::Money;
use crate::types::Rate;

/// Employee NSSF contribution rate.
pub const NSSF_RATE: Rate = Rate::from_bps(1000);

struct PayeBand {
    lower: Money,
    base: Money,
    rate: Rate,
}

const PAYE_BANDS: [PayeBand; 4] = [
    PayeBand {
        lower: Money::from_major(1_000_000),
        base: Money::from_major(128_000),
        rate: Rate::from_bps(3000),
    },
    PayeBand {
        lower: Money::from_major(760_000),
        base: Money::from_major(68_000),
        rate: Rate::from_bps(2500),
    },
    PayeBand {
        lower: Money::from_major(520_000),
        base: Money::from_major(20_000),
        rate: Rate::from_bps(2000),
    },
    PayeBand {
        lower: Money::from_major(270_000),
        base: Money::zero(),
        rate: Rate::from_bps(800),
    },
];

/// NSSF employee contribution.
pub fn nssf(gross: Money) -> Money {
    gross.apply_rate(NSSF_RATE)
}

/// PAYE on taxable (post-NSSF) pay.
pub fn paye(taxable: Money) -> Money {
    PAYE_BANDS
        .iter()
        .find(|band| taxable > band.lower)
        .map(|band| band.base + (taxable - band.lower).apply_rate(band.rate))
        .unwrap_or_default()
}

/// One employee's derived pay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Deductions {
    pub gross: Money,
    pub nssf: Money,
    pub paye: Money,
    pub net: Money,
}

impl Deductions {
    pub fn for_gross(gross: Money) -> Self {
        let nssf = nssf(gross);
        let paye = paye(gross - nssf);
        Deductions {
            gross,
            nssf,
            paye,
            net: gross - nssf - paye,
        }
    }
}

/// Totals of a payroll run.
pub fn totals(lines: &[PayrollLine]) -> Deductions {
    lines
        .iter()
        .map(|line| Deductions::for_gross(line.gross_salary))
        .fold(
            Deductions {
                gross: Money::zero(),
                nssf: Money::zero(),
                paye: Money::zero(),
                net: Money::zero(),
            },
            |acc, d| Deductions {
                gross: acc.gross + d.gross,
                nssf: acc.nssf + d.nssf,
                paye: acc.paye + d.paye,
                net: acc.net + d.net,
            },
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EmployeeId;

    #[test]
    fn test_below_threshold_pays_no_paye() {
        let d = Deductions::for_gross(Money::from_major(300_000));
        assert_eq!(d.nssf, Money::from_major(30_000));
        // taxable 270,000: exactly on the threshold
        assert_eq!(d.paye, Money::zero());
        assert_eq!(d.net, Money::from_major(270_000));
    }

    #[test]
    fn test_paye_band_boundaries_are_continuous() {
        assert_eq!(paye(Money::from_major(520_000)), Money::from_major(20_000));
        assert_eq!(paye(Money::from_major(760_000)), Money::from_major(68_000));
        assert_eq!(paye(Money::from_major(1_000_000)), Money::from_major(128_000));
    }

    #[test]
    fn test_top_band() {
        // gross 1,500,000: nssf 150,000, taxable 1,350,000
        // paye = 128,000 + 30% of 350,000 = 233,000
        let d = Deductions::for_gross(Money::from_major(1_500_000));
        assert_eq!(d.nssf, Money::from_major(150_000));
        assert_eq!(d.paye, Money::from_major(233_000));
        assert_eq!(d.net, Money::from_major(1_117_000));
    }

    #[test]
    fn test_totals() {
        let lines = vec![
            PayrollLine {
                employee_id: EmployeeId::new("e1"),
                name: "Asha".to_string(),
                gross_salary: Money::from_major(300_000),
            },
            PayrollLine {
                employee_id: EmployeeId::new("e2"),
                name: "Baraka".to_string(),
                gross_salary: Money::from_major(1_500_000),
            },
        ];
        let t = totals(&lines);
        assert_eq!(t.gross, Money::from_major(1_800_000));
        assert_eq!(t.nssf, Money::from_major(180_000));
        assert_eq!(t.net, t.gross - t.nssf - t.paye);
    }
}
