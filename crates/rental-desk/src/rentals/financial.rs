use chrono::NaiveDate;
use serde::Serialize;

use super::domain::{PaymentStatus, RentalTerms, TermsRevision};

/// Validation errors for rental periods and money terms.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TermsError {
    #[error("invalid financial terms: {detail}")]
    InvalidFinancialTerms { detail: String },
    #[error("rental period must end after it starts (start {start}, end {end})")]
    InvalidRentalPeriod { start: NaiveDate, end: NaiveDate },
}

impl TermsError {
    pub(crate) fn financial(detail: impl Into<String>) -> Self {
        Self::InvalidFinancialTerms {
            detail: detail.into(),
        }
    }
}

/// Rent, deposit, and advance for one request, with the derived total.
///
/// The invariants `total = rent + deposit` and `advance <= total` hold for every
/// constructed value, so accessors never re-check them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialTerms {
    rent_amount: i64,
    security_deposit: i64,
    advance_payment: i64,
    total_amount: i64,
}

impl FinancialTerms {
    pub fn new(
        rent_amount: i64,
        security_deposit: i64,
        advance_payment: i64,
    ) -> Result<Self, TermsError> {
        for (field, value) in [
            ("rentAmount", rent_amount),
            ("securityDeposit", security_deposit),
            ("advancePayment", advance_payment),
        ] {
            if value < 0 {
                return Err(TermsError::financial(format!(
                    "{field} must not be negative (found {value})"
                )));
            }
        }

        let total_amount = rent_amount
            .checked_add(security_deposit)
            .ok_or_else(|| TermsError::financial("total amount overflows"))?;

        if advance_payment > total_amount {
            return Err(TermsError::financial(format!(
                "advance payment {advance_payment} exceeds total amount {total_amount}"
            )));
        }

        Ok(Self {
            rent_amount,
            security_deposit,
            advance_payment,
            total_amount,
        })
    }

    pub fn rent_amount(&self) -> i64 {
        self.rent_amount
    }

    pub fn security_deposit(&self) -> i64 {
        self.security_deposit
    }

    pub fn advance_payment(&self) -> i64 {
        self.advance_payment
    }

    pub fn total_amount(&self) -> i64 {
        self.total_amount
    }

    pub fn balance_due(&self) -> i64 {
        self.total_amount - self.advance_payment
    }

    /// Deposit still owed back to the customer. Advance refunds are not modelled.
    pub fn refundable_amount(&self, payment_status: PaymentStatus) -> i64 {
        if payment_status == PaymentStatus::Refunded {
            0
        } else {
            self.security_deposit
        }
    }
}

/// Start and end dates of a rental, end strictly after start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RentalPeriod {
    start_date: NaiveDate,
    end_date: NaiveDate,
}

impl RentalPeriod {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Result<Self, TermsError> {
        if end_date <= start_date {
            return Err(TermsError::InvalidRentalPeriod {
                start: start_date,
                end: end_date,
            });
        }

        Ok(Self {
            start_date,
            end_date,
        })
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    pub fn duration_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days()
    }
}

impl RentalTerms {
    pub fn new(period: RentalPeriod, financials: FinancialTerms) -> Self {
        Self {
            start_date: period.start_date(),
            end_date: period.end_date(),
            duration_days: period.duration_days(),
            rent_amount: financials.rent_amount(),
            security_deposit: financials.security_deposit(),
            advance_payment: financials.advance_payment(),
            total_amount: financials.total_amount(),
        }
    }

    /// Re-derive the financial model, rejecting stored totals that drifted.
    pub fn financials(&self) -> Result<FinancialTerms, TermsError> {
        let financials =
            FinancialTerms::new(self.rent_amount, self.security_deposit, self.advance_payment)?;
        if financials.total_amount() != self.total_amount {
            return Err(TermsError::financial(format!(
                "stored total {} does not equal rent plus deposit {}",
                self.total_amount,
                financials.total_amount()
            )));
        }
        Ok(financials)
    }

    pub fn balance_due(&self) -> Result<i64, TermsError> {
        Ok(self.financials()?.balance_due())
    }

    /// Produce new terms with the revision applied and every derived field recomputed.
    pub fn revise(&self, revision: &TermsRevision) -> Result<Self, TermsError> {
        let period = RentalPeriod::new(
            revision.start_date.unwrap_or(self.start_date),
            revision.end_date.unwrap_or(self.end_date),
        )?;
        let financials = FinancialTerms::new(
            revision.rent_amount.unwrap_or(self.rent_amount),
            revision.security_deposit.unwrap_or(self.security_deposit),
            revision.advance_payment.unwrap_or(self.advance_payment),
        )?;
        Ok(Self::new(period, financials))
    }
}
