//! Default validation rule set shared by every engine
//!
//! Engines layer their own checks on top. A layered check only runs when the
//! state is still `CanExecute` or `InvalidAmount`, so a more specific failure
//! recorded by an inner engine is never overwritten by a generic one.

use super::pending::{PendingTransaction, ValidationState};
use crate::money::MoneyError;

/// Whether a state leaves room for the default rules to run
pub fn defers_to_default_rules(state: &ValidationState) -> bool {
    matches!(
        state,
        ValidationState::CanExecute | ValidationState::InvalidAmount
    )
}

/// Combine two verdicts without ever loosening an existing failure
pub fn tighten(current: ValidationState, next: ValidationState) -> ValidationState {
    match (current, next) {
        (current, ValidationState::CanExecute) => current,
        (_, next) => next,
    }
}

/// Amount against balance: zero is invalid, more than `available` is
/// insufficient. `available` already has the fee reserved.
pub fn validate_balance(pending: &PendingTransaction) -> Result<ValidationState, MoneyError> {
    if pending.amount.is_zero() {
        return Ok(ValidationState::InvalidAmount);
    }
    if pending.amount.is_greater_than(&pending.available)? {
        return Ok(ValidationState::InsufficientFunds);
    }
    Ok(ValidationState::CanExecute)
}

/// Amount against the trade limits carried on the transaction
pub fn validate_limits(pending: &PendingTransaction) -> Result<ValidationState, MoneyError> {
    if let Some(minimum) = &pending.minimum_limit {
        if pending.amount.is_less_than(minimum)? {
            return Ok(ValidationState::BelowMinimumLimit);
        }
    }
    if let Some(maximum) = &pending.maximum_limit {
        if pending.amount.is_greater_than(maximum)? {
            return Ok(ValidationState::AboveMaximumLimit);
        }
    }
    if let Some(personal) = &pending.maximum_personal_limit {
        if pending.amount.is_greater_than(personal)? {
            return Ok(ValidationState::OverMaximumPersonalLimit);
        }
    }
    Ok(ValidationState::CanExecute)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::{CryptoCurrency, FeeLevel, FiatCurrency, MoneyValue};

    fn pending(amount: u128, available: u128) -> PendingTransaction {
        PendingTransaction::new(
            MoneyValue::from_minor(amount, CryptoCurrency::Bitcoin),
            MoneyValue::from_minor(available, CryptoCurrency::Bitcoin),
            MoneyValue::zero(CryptoCurrency::Bitcoin),
            FeeLevel::Regular,
            FiatCurrency::Usd,
        )
    }

    #[test]
    fn test_balance_rules() {
        assert_eq!(
            validate_balance(&pending(0, 10)).unwrap(),
            ValidationState::InvalidAmount
        );
        assert_eq!(
            validate_balance(&pending(11, 10)).unwrap(),
            ValidationState::InsufficientFunds
        );
        assert_eq!(
            validate_balance(&pending(10, 10)).unwrap(),
            ValidationState::CanExecute
        );
    }

    #[test]
    fn test_limit_rules() {
        let mut tx = pending(5, 100);
        tx.minimum_limit = Some(MoneyValue::from_minor(10, CryptoCurrency::Bitcoin));
        tx.maximum_limit = Some(MoneyValue::from_minor(50, CryptoCurrency::Bitcoin));
        tx.maximum_personal_limit = Some(MoneyValue::from_minor(30, CryptoCurrency::Bitcoin));
        assert_eq!(
            validate_limits(&tx).unwrap(),
            ValidationState::BelowMinimumLimit
        );

        tx.amount = MoneyValue::from_minor(60, CryptoCurrency::Bitcoin);
        assert_eq!(
            validate_limits(&tx).unwrap(),
            ValidationState::AboveMaximumLimit
        );

        tx.amount = MoneyValue::from_minor(40, CryptoCurrency::Bitcoin);
        assert_eq!(
            validate_limits(&tx).unwrap(),
            ValidationState::OverMaximumPersonalLimit
        );

        tx.amount = MoneyValue::from_minor(20, CryptoCurrency::Bitcoin);
        assert_eq!(validate_limits(&tx).unwrap(), ValidationState::CanExecute);
    }

    #[test]
    fn test_tighten_never_loosens() {
        assert_eq!(
            tighten(ValidationState::InvalidAmount, ValidationState::CanExecute),
            ValidationState::InvalidAmount
        );
        assert_eq!(
            tighten(
                ValidationState::InvalidAmount,
                ValidationState::BelowMinimumLimit
            ),
            ValidationState::BelowMinimumLimit
        );
        assert_eq!(
            tighten(ValidationState::CanExecute, ValidationState::AboveMaximumLimit),
            ValidationState::AboveMaximumLimit
        );
        assert!(defers_to_default_rules(&ValidationState::InvalidAmount));
        assert!(!defers_to_default_rules(&ValidationState::InsufficientFunds));
    }
}
