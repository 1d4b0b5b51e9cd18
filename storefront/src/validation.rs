//! Business-rule validation for order drafts and notification records.
//!
//! Validation never short-circuits: every rule runs and every violation is
//! reported, in rule order, so the caller can show all problems at once.
//! Nothing in here performs I/O or mutates its input.

use crate::notifications::NotificationRecord;
use crate::order::{OrderDraft, PaymentMethod};
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

static EMAIL_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok());

// Local mobile format: 09 followed by nine digits, no country code
static PHONE_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^09\d{9}$").ok());

/// A single broken business rule
///
/// The `Display` output is the message shown to the customer.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Violation {
    /// The draft has no items
    #[error("Order must contain at least one item")]
    EmptyOrder,

    /// An item without a product reference
    #[error("Item {position}: product is required")]
    MissingProduct {
        /// 1-based item position
        position: usize,
    },

    /// An item with quantity below one
    #[error("Item {position}: quantity must be at least 1")]
    InvalidQuantity {
        /// 1-based item position
        position: usize,
    },

    /// An item with a negative unit price
    #[error("Item {position}: price cannot be negative")]
    NegativePrice {
        /// 1-based item position
        position: usize,
    },

    /// A blank required shipping field
    #[error("{field} is required")]
    MissingShippingField {
        /// Display label of the field
        field: &'static str,
    },

    /// Email does not look like `name@domain.tld`
    #[error("Email address is invalid")]
    InvalidEmail,

    /// Phone is not an 11-digit number starting with 09
    #[error("Phone number must be 11 digits starting with 09")]
    InvalidPhone,

    /// Payment method outside the accepted set
    #[error("Invalid payment method '{method}'. Valid methods: {}", PaymentMethod::valid_names())]
    UnknownPaymentMethod {
        /// The rejected name
        method: String,
    },

    /// Bank transfer without a bank account
    #[error("Bank account is required for bank transfer")]
    MissingBankAccount,

    /// Subtotal below zero
    #[error("Subtotal cannot be negative")]
    NegativeSubtotal,

    /// Shipping fee below zero
    #[error("Shipping fee cannot be negative")]
    NegativeShippingFee,

    /// Total of zero or less
    #[error("Order total must be greater than zero")]
    NonPositiveTotal,

    /// Notification without a title
    #[error("Notification {id} has no title")]
    NotificationMissingTitle {
        /// Notification identifier
        id: u64,
    },

    /// Notification without a message
    #[error("Notification {id} has no message")]
    NotificationMissingMessage {
        /// Notification identifier
        id: u64,
    },
}

/// Validate an order draft, returning every violation found
///
/// An empty result means the draft may be submitted.
#[must_use]
pub fn validate_order(draft: &OrderDraft) -> Vec<Violation> {
    let mut violations = Vec::new();

    check_items(draft, &mut violations);
    check_shipping(draft, &mut violations);
    check_payment(draft, &mut violations);
    check_amounts(draft, &mut violations);

    violations
}

/// Validate a notification record received from the backend
#[must_use]
pub fn validate_notification(record: &NotificationRecord) -> Vec<Violation> {
    let id = record.id.value();
    let mut violations = Vec::new();

    if record.title.trim().is_empty() {
        violations.push(Violation::NotificationMissingTitle { id });
    }
    if record.message.trim().is_empty() {
        violations.push(Violation::NotificationMissingMessage { id });
    }

    violations
}

/// Render violations as display strings
#[must_use]
pub fn violation_messages(violations: &[Violation]) -> Vec<String> {
    violations.iter().map(ToString::to_string).collect()
}

fn check_items(draft: &OrderDraft, violations: &mut Vec<Violation>) {
    if draft.items.is_empty() {
        violations.push(Violation::EmptyOrder);
        return;
    }

    for (index, item) in draft.items.iter().enumerate() {
        let position = index + 1;
        if item.product_id.is_none() {
            violations.push(Violation::MissingProduct { position });
        }
        if item.quantity < 1 {
            violations.push(Violation::InvalidQuantity { position });
        }
        if item.price.is_negative() {
            violations.push(Violation::NegativePrice { position });
        }
    }
}

fn check_shipping(draft: &OrderDraft, violations: &mut Vec<Violation>) {
    let info = &draft.shipping_info;

    for (field, value) in info.required_fields() {
        if value.trim().is_empty() {
            violations.push(Violation::MissingShippingField { field });
        }
    }

    // A blank value was already reported as missing above
    let email = info.email.trim();
    if !email.is_empty() && !matches_pattern(&EMAIL_PATTERN, email) {
        violations.push(Violation::InvalidEmail);
    }

    let phone = info.phone.trim();
    if !phone.is_empty() && !matches_pattern(&PHONE_PATTERN, phone) {
        violations.push(Violation::InvalidPhone);
    }
}

fn check_payment(draft: &OrderDraft, violations: &mut Vec<Violation>) {
    match draft.payment_method.parse::<PaymentMethod>() {
        Ok(PaymentMethod::BankTransfer) => {
            let has_account = draft
                .payment_details
                .bank_account
                .as_deref()
                .is_some_and(|account| !account.trim().is_empty());
            if !has_account {
                violations.push(Violation::MissingBankAccount);
            }
        },
        Ok(_) => {},
        Err(unknown) => violations.push(Violation::UnknownPaymentMethod { method: unknown.0 }),
    }
}

fn check_amounts(draft: &OrderDraft, violations: &mut Vec<Violation>) {
    if draft.subtotal.is_negative() {
        violations.push(Violation::NegativeSubtotal);
    }
    if draft.shipping_fee.is_negative() {
        violations.push(Violation::NegativeShippingFee);
    }
    if !draft.total.is_positive() {
        violations.push(Violation::NonPositiveTotal);
    }
}

fn matches_pattern(pattern: &LazyLock<Option<Regex>>, value: &str) -> bool {
    pattern.as_ref().is_some_and(|regex| regex.is_match(value))
}
