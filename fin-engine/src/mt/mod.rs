//! Typed payloads, one variant per MT family
//!
//! Every family owns its tag order and conditional-field rules: it
//! validates its own fields into a shared [`ValidationReport`] and renders
//! its block 4 field list. The assembler only dispatches over [`MtPayload`].

mod customer_transfer;
mod free_format;
mod institution_transfer;
mod securities;
mod trade;
mod treasury;

pub use customer_transfer::{BankOperationCode, ChargeBearer, CustomerTransfer};
pub use free_format::{CancellationRequest, FreeFormat, NARRATIVE_MAX_LENGTH};
pub use institution_transfer::InstitutionTransfer;
pub use securities::{SecuritiesSettlement, SettlementKind};
pub use trade::{CreditForm, DocumentaryCredit};
pub use treasury::{FxConfirmation, OperationType};

use crate::config::ValidationConfig;
use crate::types::{MtType, TagValue};
use crate::validation::{self, ValidationCode, ValidationReport};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Message payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum MtPayload {
    /// MT103
    CustomerTransfer(CustomerTransfer),
    /// MT202
    InstitutionTransfer(InstitutionTransfer),
    /// MT300
    FxConfirmation(FxConfirmation),
    /// MT700
    DocumentaryCredit(DocumentaryCredit),
    /// MT540 - MT543
    SecuritiesSettlement(SecuritiesSettlement),
    /// MTn99
    FreeFormat(FreeFormat),
    /// MTn92
    CancellationRequest(CancellationRequest),
}

/// How a family treats field :21
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelatedReference {
    /// Must be present
    Mandatory,
    /// Rendered when non-blank
    Optional,
    /// Never rendered; a supplied value is reported as a warning
    NotAllowed,
}

/// References handed to a family when it renders block 4
#[derive(Debug, Clone, Copy)]
pub struct References<'a> {
    /// Field :20
    pub transaction: &'a str,
    /// Field :21, already filtered to non-blank and allowed
    pub related: Option<&'a str>,
}

impl MtPayload {
    /// MT type this payload renders as
    pub fn mt_type(&self) -> MtType {
        match self {
            MtPayload::CustomerTransfer(_) => MtType::MT103,
            MtPayload::InstitutionTransfer(_) => MtType::MT202,
            MtPayload::FxConfirmation(_) => MtType::MT300,
            MtPayload::DocumentaryCredit(_) => MtType::MT700,
            MtPayload::SecuritiesSettlement(p) => p.kind.mt_type(),
            MtPayload::FreeFormat(p) => MtType::from_category(p.category, 99),
            MtPayload::CancellationRequest(p) => MtType::from_category(p.category, 92),
        }
    }

    /// Field :21 rule of this family
    pub fn related_reference(&self) -> RelatedReference {
        match self {
            MtPayload::InstitutionTransfer(_) | MtPayload::CancellationRequest(_) => RelatedReference::Mandatory,
            MtPayload::FxConfirmation(_) | MtPayload::FreeFormat(_) => RelatedReference::Optional,
            MtPayload::CustomerTransfer(_)
            | MtPayload::DocumentaryCredit(_)
            | MtPayload::SecuritiesSettlement(_) => RelatedReference::NotAllowed,
        }
    }

    /// Straight-through-processing marker for block 3
    pub fn stp(&self) -> bool {
        matches!(self, MtPayload::CustomerTransfer(p) if p.stp)
    }

    pub(crate) fn validate(&self, refs: &References<'_>, checks: &mut Checks<'_>) {
        match self {
            MtPayload::CustomerTransfer(p) => p.validate(checks),
            MtPayload::InstitutionTransfer(p) => p.validate(checks),
            MtPayload::FxConfirmation(p) => p.validate(refs, checks),
            MtPayload::DocumentaryCredit(p) => p.validate(checks),
            MtPayload::SecuritiesSettlement(p) => p.validate(checks),
            MtPayload::FreeFormat(p) => p.validate(checks),
            MtPayload::CancellationRequest(p) => p.validate(checks),
        }
    }

    pub(crate) fn text_fields(&self, refs: &References<'_>) -> Vec<TagValue> {
        match self {
            MtPayload::CustomerTransfer(p) => p.text_fields(refs),
            MtPayload::InstitutionTransfer(p) => p.text_fields(refs),
            MtPayload::FxConfirmation(p) => p.text_fields(refs),
            MtPayload::DocumentaryCredit(p) => p.text_fields(refs),
            MtPayload::SecuritiesSettlement(p) => p.text_fields(refs),
            MtPayload::FreeFormat(p) => p.text_fields(refs),
            MtPayload::CancellationRequest(p) => p.text_fields(refs),
        }
    }
}

/// Tag prefixes an inbound message of `mt` must carry.
///
/// Prefixes match any letter option (`50` matches `50K`).
pub fn mandatory_tags(mt: MtType) -> &'static [&'static str] {
    match mt.code() {
        103 => &["20", "23B", "32A", "50", "59", "71A"],
        202 => &["20", "21", "32A", "58"],
        300 => &["15A", "20", "22A", "22C", "82", "87", "15B", "30T", "30V", "36", "32B", "33B"],
        700 => &["27", "40A", "20", "31C", "40E", "31D", "50", "59", "32B", "45A", "46A"],
        540..=543 => &["16R", "20C", "23G", "98", "35B", "36B", "97", "16S"],
        _ => match mt.suffix() {
            92 => &["20", "21", "11S"],
            99 => &["20", "79"],
            _ => &[],
        },
    }
}

/// Amount with its ISO 4217 currency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Currency code
    pub currency: String,
    /// Positive amount
    pub amount: Decimal,
}

impl Money {
    /// Create an amount
    pub fn new(currency: impl Into<String>, amount: Decimal) -> Self {
        Self {
            currency: currency.into(),
            amount,
        }
    }

    /// `EUR1000,5`
    pub fn render(&self) -> String {
        format!("{}{}", self.currency, validation::format_amount(self.amount))
    }
}

/// Account line of a party field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountId {
    /// International bank account number
    Iban(String),
    /// Any other account identifier (up to 34 characters)
    Other(String),
}

impl AccountId {
    fn render(&self) -> String {
        match self {
            AccountId::Iban(iban) => validation::normalize_code(iban),
            AccountId::Other(account) => account.trim().to_string(),
        }
    }
}

/// Customer or applicant: optional `/account` line plus up to 4×35 of name and address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    /// Account line
    #[serde(default)]
    pub account: Option<AccountId>,
    /// Name and address lines
    pub name_and_address: String,
}

impl Party {
    /// Party without an account line
    pub fn named(name_and_address: impl Into<String>) -> Self {
        Self {
            account: None,
            name_and_address: name_and_address.into(),
        }
    }

    /// Party with an IBAN account line
    pub fn with_iban(iban: impl Into<String>, name_and_address: impl Into<String>) -> Self {
        Self {
            account: Some(AccountId::Iban(iban.into())),
            name_and_address: name_and_address.into(),
        }
    }

    pub(crate) fn render(&self) -> String {
        let name = self.name_and_address.replace("\r\n", "\n");
        match &self.account {
            Some(account) => format!("/{}\n{}", account.render(), name),
            None => name,
        }
    }
}

/// Validation context shared by every family
pub(crate) struct Checks<'a> {
    report: &'a mut ValidationReport,
    config: &'a ValidationConfig,
}

impl<'a> Checks<'a> {
    pub(crate) fn new(report: &'a mut ValidationReport, config: &'a ValidationConfig) -> Self {
        Self { report, config }
    }

    pub(crate) fn error(&mut self, field: &str, code: ValidationCode, message: impl Into<String>) {
        self.report.add_error(field, code, message);
    }

    pub(crate) fn warning(&mut self, field: &str, code: ValidationCode, message: impl Into<String>) {
        self.report.add_warning(field, code, message);
    }

    /// Blank check; true when a value is present
    pub(crate) fn present(&mut self, field: &str, value: &str) -> bool {
        if value.trim().is_empty() {
            self.error(field, ValidationCode::Empty, "field is required");
            return false;
        }
        true
    }

    /// Multiline narrative: hard limit plus layout warnings
    pub(crate) fn narrative(&mut self, field: &str, value: &str, max_length: usize, lines: usize, width: usize) {
        let outcome = validation::validate_free_text(field, value, max_length);
        self.with_layout(field, value, outcome, lines, width);
    }

    /// Narrative rendered below another line of the same field
    pub(crate) fn continuation(&mut self, field: &str, value: &str, max_length: usize, lines: usize, width: usize) {
        let outcome = validation::validate_continuation_text(field, value, max_length);
        self.with_layout(field, value, outcome, lines, width);
    }

    pub(crate) fn required_narrative(&mut self, field: &str, value: &str, max_length: usize, lines: usize, width: usize) {
        if self.present(field, value) {
            self.narrative(field, value, max_length, lines, width);
        }
    }

    pub(crate) fn optional_narrative(
        &mut self,
        field: &str,
        value: &Option<String>,
        max_length: usize,
        lines: usize,
        width: usize,
    ) {
        if let Some(value) = non_blank(value) {
            self.narrative(field, value, max_length, lines, width);
        }
    }

    pub(crate) fn optional_continuation(
        &mut self,
        field: &str,
        value: &Option<String>,
        max_length: usize,
        lines: usize,
        width: usize,
    ) {
        if let Some(value) = non_blank(value) {
            self.continuation(field, value, max_length, lines, width);
        }
    }

    fn with_layout(
        &mut self,
        field: &str,
        value: &str,
        outcome: Result<(), validation::ValidationError>,
        lines: usize,
        width: usize,
    ) {
        if self.report.check(outcome).is_some() && self.config.layout_warnings {
            let findings = validation::check_line_layout(field, value, lines, width);
            self.report.extend_warnings(findings);
        }
    }

    pub(crate) fn required_text(&mut self, field: &str, value: &str, max_length: usize) {
        if self.present(field, value) {
            self.report.check(validation::validate_text(field, value, max_length));
        }
    }

    pub(crate) fn bic(&mut self, field: &str, value: &str) {
        self.report.check(validation::validate_bic(field, value));
    }

    pub(crate) fn optional_bic(&mut self, field: &str, value: &Option<String>) {
        if let Some(value) = non_blank(value) {
            self.bic(field, value);
        }
    }

    pub(crate) fn money(&mut self, field: &str, money: &Money) {
        self.report.check(validation::validate_currency(field, &money.currency));
        self.report.check(validation::validate_amount(field, money.amount));
    }

    pub(crate) fn positive(&mut self, field: &str, value: Decimal) {
        self.report.check(validation::validate_amount(field, value));
    }

    pub(crate) fn isin(&mut self, field: &str, value: &str) {
        self.report.check(validation::validate_isin(field, value));
    }

    /// `later` must not fall before `earlier`
    pub(crate) fn date_order(&mut self, field: &str, earlier: NaiveDate, later: NaiveDate, message: &str) {
        if later < earlier {
            self.error(field, ValidationCode::InvalidDate, format!("{} ({} < {})", message, later, earlier));
        }
    }

    pub(crate) fn party(&mut self, field: &str, party: &Party) {
        match &party.account {
            Some(AccountId::Iban(iban)) => {
                let verify = self.config.verify_iban_checksum;
                self.report.check(validation::validate_iban(field, iban, verify));
            }
            Some(AccountId::Other(account)) => self.required_text(field, account, 34),
            None => {}
        }
        if !self.present(field, &party.name_and_address) {
            return;
        }
        if party.account.is_some() {
            self.continuation(field, &party.name_and_address, 140, 4, 35);
        } else {
            self.narrative(field, &party.name_and_address, 140, 4, 35);
        }
    }
}

/// `Some(value)` unless absent or blank
pub(crate) fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

pub(crate) fn field(tag: &str, value: impl AsRef<str>) -> TagValue {
    TagValue::new(tag, value.as_ref())
}

pub(crate) fn bic_field(tag: &str, bic: &str) -> TagValue {
    field(tag, validation::normalize_code(bic))
}

pub(crate) fn yymmdd(date: NaiveDate) -> String {
    date.format("%y%m%d").to_string()
}

pub(crate) fn yyyymmdd(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mt_type_dispatch() {
        let payload = MtPayload::FreeFormat(FreeFormat {
            category: 2,
            narrative: "Hello".to_string(),
        });
        assert_eq!(payload.mt_type().code(), 299);
        assert_eq!(payload.related_reference(), RelatedReference::Optional);
        assert!(!payload.stp());
    }

    #[test]
    fn test_payload_json_shape() {
        let json = r#"{"family":"free_format","category":1,"narrative":"Test message"}"#;
        let payload: MtPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.mt_type(), MtType::from_category(1, 99));
    }

    #[test]
    fn test_party_render() {
        let party = Party::with_iban("de89 3704 0044 0532 0130 00", "JOHN DOE\r\nMAIN STREET 1");
        assert_eq!(party.render(), "/DE89370400440532013000\nJOHN DOE\nMAIN STREET 1");
        assert_eq!(Party::named("ACME").render(), "ACME");
    }

    #[test]
    fn test_party_name_below_account_line() {
        let config = ValidationConfig::default();
        let check = |party: &Party| {
            let mut report = ValidationReport::new();
            Checks::new(&mut report, &config).party(":50K", party);
            report.errors.iter().map(|e| e.code).collect::<Vec<_>>()
        };

        assert!(check(&Party::named(":20:ACME")).is_empty());
        assert_eq!(
            check(&Party::with_iban("GB29NWBK60161331926819", ":20:ACME")),
            vec![ValidationCode::BadLineStart]
        );
        assert_eq!(
            check(&Party::with_iban("GB29NWBK60161331926819", "ACME\r")),
            vec![ValidationCode::BadCharset]
        );
    }

    #[test]
    fn test_mandatory_tags_by_family() {
        assert_eq!(mandatory_tags(MtType::from_category(7, 99)), &["20", "79"]);
        assert!(mandatory_tags(MtType::MT202).contains(&"21"));
        assert!(mandatory_tags(MtType::new(101).unwrap()).is_empty());
    }
}
