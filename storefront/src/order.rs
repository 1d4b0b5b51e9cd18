//! The order draft assembled at checkout and its parts.
//!
//! A draft is built transiently from a cart snapshot plus the shipping form,
//! validated, submitted, then discarded. Nothing here is persisted locally.

use crate::cart::CartState;
use crate::types::{Money, ProductId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One ordered product
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    /// Catalog product, absent only in malformed drafts
    pub product_id: Option<ProductId>,
    /// Units ordered
    pub quantity: u32,
    /// Unit price at add-time
    pub price: Money,
}

/// Shipping fields exactly as the customer entered them
///
/// Any field may be missing; [`ShippingInfo::from_form`] fills the gaps.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[allow(missing_docs)]
pub struct ShippingForm {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub barangay: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub region: Option<String>,
    pub zip_code: Option<String>,
}

/// Shipping block of an order draft; every key is always present
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[allow(missing_docs)]
pub struct ShippingInfo {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub barangay: String,
    pub city: String,
    pub province: String,
    pub region: String,
    pub zip_code: String,
}

impl ShippingInfo {
    /// Copies the form, defaulting every missing field to an empty string
    #[must_use]
    pub fn from_form(form: ShippingForm) -> Self {
        Self {
            first_name: form.first_name.unwrap_or_default(),
            last_name: form.last_name.unwrap_or_default(),
            email: form.email.unwrap_or_default(),
            phone: form.phone.unwrap_or_default(),
            address: form.address.unwrap_or_default(),
            barangay: form.barangay.unwrap_or_default(),
            city: form.city.unwrap_or_default(),
            province: form.province.unwrap_or_default(),
            region: form.region.unwrap_or_default(),
            zip_code: form.zip_code.unwrap_or_default(),
        }
    }

    /// Required fields with their display labels, in form order
    #[must_use]
    pub fn required_fields(&self) -> [(&'static str, &str); 10] {
        [
            ("First name", self.first_name.as_str()),
            ("Last name", self.last_name.as_str()),
            ("Email", self.email.as_str()),
            ("Phone", self.phone.as_str()),
            ("Address", self.address.as_str()),
            ("Barangay", self.barangay.as_str()),
            ("City", self.city.as_str()),
            ("Province", self.province.as_str()),
            ("Region", self.region.as_str()),
            ("ZIP code", self.zip_code.as_str()),
        ]
    }
}

/// Accepted payment methods
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash on delivery
    Cod,
    /// `GCash` e-wallet
    Gcash,
    /// Maya e-wallet
    Maya,
    /// Direct bank transfer; needs a bank account reference
    BankTransfer,
}

impl PaymentMethod {
    /// Every accepted method, in display order
    pub const ALL: [Self; 4] = [Self::Cod, Self::Gcash, Self::Maya, Self::BankTransfer];

    /// Wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cod => "cod",
            Self::Gcash => "gcash",
            Self::Maya => "maya",
            Self::BankTransfer => "bank_transfer",
        }
    }

    /// Comma separated wire names, for messages
    #[must_use]
    pub fn valid_names() -> String {
        Self::ALL
            .iter()
            .map(|method| method.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing a name outside [`PaymentMethod::ALL`]
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("Unknown payment method: {0}")]
pub struct UnknownPaymentMethod(pub String);

impl FromStr for PaymentMethod {
    type Err = UnknownPaymentMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|method| method.as_str() == s)
            .ok_or_else(|| UnknownPaymentMethod(s.to_string()))
    }
}

/// Method-dependent payment fields
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentDetails {
    /// Account the customer pays from (bank transfer)
    pub bank_account: Option<String>,
    /// Name on the account
    pub account_name: Option<String>,
    /// Transfer or e-wallet reference number
    pub reference_number: Option<String>,
}

impl PaymentDetails {
    /// Details for a bank transfer from `account`
    #[must_use]
    pub fn bank_account(account: impl Into<String>) -> Self {
        Self {
            bank_account: Some(account.into()),
            ..Self::default()
        }
    }

    /// True when no field is set
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bank_account.is_none() && self.account_name.is_none() && self.reference_number.is_none()
    }
}

/// The not-yet-submitted order payload
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    /// Ordered products
    pub items: Vec<OrderItem>,
    /// Where to ship
    pub shipping_info: ShippingInfo,
    /// Raw method name; unknown values are reported by name during validation
    pub payment_method: String,
    /// Method-dependent details
    #[serde(default, skip_serializing_if = "PaymentDetails::is_empty")]
    pub payment_details: PaymentDetails,
    /// Sum of line totals
    pub subtotal: Money,
    /// Shipping charge
    pub shipping_fee: Money,
    /// `subtotal + shipping_fee`
    pub total: Money,
}

impl OrderDraft {
    /// Builds a draft from a cart snapshot and the entered form
    #[must_use]
    pub fn from_cart(
        cart: &CartState,
        form: ShippingForm,
        payment_method: String,
        payment_details: PaymentDetails,
        shipping_fee: Money,
    ) -> Self {
        let items = cart
            .items()
            .iter()
            .map(|line| OrderItem {
                product_id: Some(line.product_id),
                quantity: line.quantity,
                price: line.price,
            })
            .collect();

        let subtotal = cart.total();

        Self {
            items,
            shipping_info: ShippingInfo::from_form(form),
            payment_method,
            payment_details,
            subtotal,
            shipping_fee,
            total: subtotal + shipping_fee,
        }
    }
}
