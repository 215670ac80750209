//! Invoice / quotation aggregate.
//!
//! Line items can only be added through [`DocumentAggregate::add_item`], which re-derives
//! subtotal, tax and total every time. Nothing outside this module can leave the totals
//! out of step with the items.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use time::Date;

use crate::money::{self, MoneyError};
use crate::templates::{self, TemplateDescriptor};

/// Largest tax rate a `NUMERIC(5,2)` column holds.
const MAX_TAX_RATE: Decimal = Decimal::from_parts(99999, 0, 0, false, 2);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("line item {index}: {reason}")]
    InvalidLineItem { index: usize, reason: String },
    #[error("unknown document type {0:?}, expected invoice or quotation")]
    InvalidDocumentType(String),
    #[error("invalid tax rate: {0}")]
    InvalidTaxRate(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Invoice,
    Quotation,
}

impl DocumentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Invoice => "invoice",
            Self::Quotation => "quotation",
        }
    }
}

impl FromStr for DocumentType {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "invoice" => Ok(Self::Invoice),
            "quotation" => Ok(Self::Quotation),
            _ => Err(DocumentError::InvalidDocumentType(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientInfo {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Everything on a document that is not a line item or a derived total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentHeader {
    pub document_type: DocumentType,
    pub document_number: String,
    pub issue_date: Date,
    pub client: ClientInfo,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineItem {
    description: String,
    quantity: Decimal,
    price: Decimal,
    amount: Decimal,
}

impl LineItem {
    pub fn description(&self) -> &str {
        &self.description
    }
    pub fn quantity(&self) -> Decimal {
        self.quantity
    }
    pub fn price(&self) -> Decimal {
        self.price
    }
    pub fn amount(&self) -> Decimal {
        self.amount
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone)]
pub struct DocumentAggregate {
    header: DocumentHeader,
    template: &'static TemplateDescriptor,
    tax_rate: Decimal,
    items: Vec<LineItem>,
    totals: Totals,
}

pub fn validate_tax_rate(rate: Decimal) -> Result<Decimal, DocumentError> {
    if rate.is_sign_negative() && !rate.is_zero() {
        return Err(DocumentError::InvalidTaxRate("must not be negative".into()));
    }
    if !money::fits_money_scale(rate) {
        return Err(DocumentError::InvalidTaxRate(
            "at most 2 decimal places".into(),
        ));
    }
    if rate > MAX_TAX_RATE {
        return Err(DocumentError::InvalidTaxRate(format!(
            "must not exceed {MAX_TAX_RATE}"
        )));
    }
    Ok(rate)
}

impl DocumentAggregate {
    /// Starts an empty document. Unknown template ids fall back to the default template.
    pub fn new(
        header: DocumentHeader,
        template_id: i32,
        tax_rate: Decimal,
    ) -> Result<Self, DocumentError> {
        let tax_rate = validate_tax_rate(tax_rate)?;
        Ok(Self {
            header,
            template: templates::resolve(template_id),
            tax_rate,
            items: Vec::new(),
            totals: Totals::default(),
        })
    }

    /// Appends a line item with `amount = quantity * price` and re-derives the totals.
    pub fn add_item(
        &mut self,
        description: &str,
        quantity: Decimal,
        price: Decimal,
    ) -> Result<&LineItem, DocumentError> {
        let index = self.items.len();
        let invalid = |reason: &str| DocumentError::InvalidLineItem {
            index,
            reason: reason.to_string(),
        };

        let description = description.trim();
        if description.is_empty() {
            return Err(invalid("description is required"));
        }
        if quantity.is_sign_negative() && !quantity.is_zero() {
            return Err(invalid("quantity must not be negative"));
        }
        if price.is_sign_negative() && !price.is_zero() {
            return Err(invalid("price must not be negative"));
        }
        if !money::fits_money_scale(quantity) || !money::fits_money_scale(price) {
            return Err(invalid("quantity and price take at most 2 decimal places"));
        }
        if !money::within_money_bounds(quantity) || !money::within_money_bounds(price) {
            return Err(invalid(&format!(
                "quantity and price must not exceed {}",
                money::MAX_MONEY
            )));
        }
        let amount = money::line_amount(quantity, price)
            .ok()
            .filter(|a| money::within_money_bounds(*a))
            .ok_or_else(|| invalid(&format!("amount must not exceed {}", money::MAX_MONEY)))?;

        let candidate = LineItem {
            description: description.to_string(),
            quantity,
            price,
            amount,
        };
        let totals = Self::derive_totals(
            self.items.iter().chain(std::iter::once(&candidate)),
            self.tax_rate,
        )
        .map_err(|_| invalid(&format!("document total must not exceed {}", money::MAX_MONEY)))?;

        self.items.push(candidate);
        self.totals = totals;
        Ok(&self.items[index])
    }

    /// Re-derives subtotal, tax and total from the current items.
    pub fn recompute_totals(&mut self) -> Result<Totals, MoneyError> {
        self.totals = Self::derive_totals(self.items.iter(), self.tax_rate)?;
        Ok(self.totals)
    }

    /// Fails with `Overflow` when any derived figure leaves the money column range.
    fn derive_totals<'a>(
        mut items: impl Iterator<Item = &'a LineItem>,
        tax_rate: Decimal,
    ) -> Result<Totals, MoneyError> {
        let subtotal = items.try_fold(Decimal::ZERO, |acc, item| {
            acc.checked_add(item.amount).ok_or(MoneyError::Overflow)
        })?;
        let tax_amount = money::tax_amount(subtotal, tax_rate)?;
        let total = subtotal
            .checked_add(tax_amount)
            .ok_or(MoneyError::Overflow)?;
        if ![subtotal, tax_amount, total]
            .into_iter()
            .all(money::within_money_bounds)
        {
            return Err(MoneyError::Overflow);
        }
        Ok(Totals {
            subtotal,
            tax_amount,
            total,
        })
    }

    pub fn header(&self) -> &DocumentHeader {
        &self.header
    }

    pub fn template(&self) -> &'static TemplateDescriptor {
        self.template
    }

    pub fn tax_rate(&self) -> Decimal {
        self.tax_rate
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn totals(&self) -> Totals {
        self.totals
    }
}
