//! MT103 single customer credit transfer

use super::{bic_field, field, non_blank, yymmdd, Checks, Money, Party, References};
use crate::types::TagValue;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Field 23B
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BankOperationCode {
    /// Normal credit transfer
    #[default]
    Cred,
    /// Test message
    Crts,
    /// SWIFTPay service level
    Spay,
    /// Priority service level
    Spri,
    /// Standard service level
    Sstd,
}

impl BankOperationCode {
    /// Wire code
    pub fn as_str(&self) -> &'static str {
        match self {
            BankOperationCode::Cred => "CRED",
            BankOperationCode::Crts => "CRTS",
            BankOperationCode::Spay => "SPAY",
            BankOperationCode::Spri => "SPRI",
            BankOperationCode::Sstd => "SSTD",
        }
    }
}

/// Field 71A
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChargeBearer {
    /// All charges borne by the ordering customer
    Our,
    /// Charges shared
    #[default]
    Sha,
    /// All charges borne by the beneficiary
    Ben,
}

impl ChargeBearer {
    /// Wire code
    pub fn as_str(&self) -> &'static str {
        match self {
            ChargeBearer::Our => "OUR",
            ChargeBearer::Sha => "SHA",
            ChargeBearer::Ben => "BEN",
        }
    }
}

/// MT103 payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerTransfer {
    /// 23B
    #[serde(default)]
    pub bank_operation_code: BankOperationCode,

    /// 32A value date
    pub value_date: NaiveDate,

    /// 32A currency and interbank settled amount
    pub settlement_amount: Money,

    /// 50K
    pub ordering_customer: Party,

    /// 52A
    #[serde(default)]
    pub ordering_institution: Option<String>,

    /// 57A
    #[serde(default)]
    pub account_with_institution: Option<String>,

    /// 59
    pub beneficiary: Party,

    /// 70, up to 4×35
    #[serde(default)]
    pub remittance_information: Option<String>,

    /// 71A
    #[serde(default)]
    pub details_of_charges: ChargeBearer,

    /// 72, up to 6×35
    #[serde(default)]
    pub sender_to_receiver_information: Option<String>,

    /// Flag the message for straight-through processing
    #[serde(default)]
    pub stp: bool,
}

impl CustomerTransfer {
    pub(super) fn validate(&self, checks: &mut Checks<'_>) {
        checks.money(":32A", &self.settlement_amount);
        checks.party(":50K", &self.ordering_customer);
        checks.optional_bic(":52A", &self.ordering_institution);
        checks.optional_bic(":57A", &self.account_with_institution);
        checks.party(":59", &self.beneficiary);
        checks.optional_narrative(":70", &self.remittance_information, 140, 4, 35);
        checks.optional_narrative(":72", &self.sender_to_receiver_information, 210, 6, 35);
    }

    pub(super) fn text_fields(&self, refs: &References<'_>) -> Vec<TagValue> {
        let mut fields = vec![
            field("20", refs.transaction),
            field("23B", self.bank_operation_code.as_str()),
            field("32A", format!("{}{}", yymmdd(self.value_date), self.settlement_amount.render())),
            field("50K", self.ordering_customer.render()),
        ];
        if let Some(bic) = non_blank(&self.ordering_institution) {
            fields.push(bic_field("52A", bic));
        }
        if let Some(bic) = non_blank(&self.account_with_institution) {
            fields.push(bic_field("57A", bic));
        }
        fields.push(field("59", self.beneficiary.render()));
        if let Some(text) = non_blank(&self.remittance_information) {
            fields.push(field("70", text));
        }
        fields.push(field("71A", self.details_of_charges.as_str()));
        if let Some(text) = non_blank(&self.sender_to_receiver_information) {
            fields.push(field("72", text));
        }
        fields
    }
}
