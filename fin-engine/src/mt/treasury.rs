//! MT300 foreign exchange confirmation

use super::{bic_field, field, yyyymmdd, Checks, Money, References};
use crate::types::TagValue;
use crate::validation::{self, ValidationCode};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Field 22A
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationType {
    /// New confirmation
    #[default]
    Newt,
    /// Amendment of a previous confirmation
    Amnd,
    /// Cancellation of a previous confirmation
    Canc,
}

impl OperationType {
    /// Wire code
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Newt => "NEWT",
            OperationType::Amnd => "AMND",
            OperationType::Canc => "CANC",
        }
    }

    /// Amendments and cancellations point at the confirmation they replace
    pub fn requires_related_reference(&self) -> bool {
        !matches!(self, OperationType::Newt)
    }
}

/// MT300 payload (sequence A general information, sequence B transaction details)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FxConfirmation {
    /// 22A
    #[serde(default)]
    pub operation: OperationType,

    /// 22C common reference
    pub common_reference: String,

    /// 82A party A
    pub party_a: String,

    /// 87A party B
    pub party_b: String,

    /// 30T
    pub trade_date: NaiveDate,

    /// 30V
    pub value_date: NaiveDate,

    /// 36
    pub exchange_rate: Decimal,

    /// 32B currency and amount bought by party A
    pub bought: Money,

    /// 57A receiving agent of the bought amount
    pub receiving_agent: String,

    /// 33B currency and amount sold by party A
    pub sold: Money,

    /// 57A delivery agent of the sold amount
    pub delivery_agent: String,
}

impl FxConfirmation {
    pub(super) fn validate(&self, refs: &References<'_>, checks: &mut Checks<'_>) {
        if self.operation.requires_related_reference() && refs.related.is_none() {
            checks.error(
                ":21",
                ValidationCode::MissingField,
                format!("related reference is required for {}", self.operation.as_str()),
            );
        }
        checks.required_text(":22C", &self.common_reference, 16);
        checks.bic(":82A", &self.party_a);
        checks.bic(":87A", &self.party_b);
        checks.date_order(":30V", self.trade_date, self.value_date, "value date precedes trade date");
        checks.positive(":36", self.exchange_rate);
        checks.money(":32B", &self.bought);
        checks.bic(":57A", &self.receiving_agent);
        checks.money(":33B", &self.sold);
        checks.bic(":57A", &self.delivery_agent);
        if self.bought.currency == self.sold.currency {
            checks.error(":33B", ValidationCode::InvalidCurrency, "sold and bought currencies are equal");
        }
    }

    pub(super) fn text_fields(&self, refs: &References<'_>) -> Vec<TagValue> {
        let mut fields = vec![field("15A", ""), field("20", refs.transaction)];
        if let Some(related) = refs.related {
            fields.push(field("21", related));
        }
        fields.extend([
            field("22A", self.operation.as_str()),
            field("22C", self.common_reference.trim()),
            bic_field("82A", &self.party_a),
            bic_field("87A", &self.party_b),
            field("15B", ""),
            field("30T", yyyymmdd(self.trade_date)),
            field("30V", yyyymmdd(self.value_date)),
            field("36", validation::format_amount(self.exchange_rate)),
            field("32B", self.bought.render()),
            bic_field("57A", &self.receiving_agent),
            field("33B", self.sold.render()),
            bic_field("57A", &self.delivery_agent),
        ]);
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidationConfig;
    use crate::validation::ValidationReport;

    fn confirmation() -> FxConfirmation {
        FxConfirmation {
            operation: OperationType::Newt,
            common_reference: "BANKAB1234BANKCD".to_string(),
            party_a: "BANKGB2L".to_string(),
            party_b: "BANKUS33".to_string(),
            trade_date: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
            value_date: NaiveDate::from_ymd_opt(2024, 5, 6).unwrap(),
            exchange_rate: Decimal::new(10825, 4),
            bought: Money::new("EUR", Decimal::new(1_000_000, 0)),
            receiving_agent: "BANKDEFF".to_string(),
            sold: Money::new("USD", Decimal::new(1_082_500, 0)),
            delivery_agent: "BANKUS33".to_string(),
        }
    }

    fn validate(payload: &FxConfirmation, related: Option<&str>) -> ValidationReport {
        let mut report = ValidationReport::new();
        let config = ValidationConfig::default();
        let refs = References {
            transaction: "FX1",
            related,
        };
        payload.validate(&refs, &mut Checks::new(&mut report, &config));
        report
    }

    #[test]
    fn test_sequences_and_repeated_agent_tag() {
        let fields = confirmation().text_fields(&References {
            transaction: "FX1",
            related: None,
        });
        let tags: Vec<&str> = fields.iter().map(|f| f.tag.as_str()).collect();
        assert_eq!(
            tags,
            vec!["15A", "20", "22A", "22C", "82A", "87A", "15B", "30T", "30V", "36", "32B", "57A", "33B", "57A"]
        );
        assert_eq!(fields[0].value(), "");
        assert_eq!(fields[9].value(), "1,0825");
        assert_eq!(fields[7].value(), "20240502");
    }

    #[test]
    fn test_amendment_needs_related_reference() {
        let mut payload = confirmation();
        payload.operation = OperationType::Amnd;
        assert!(validate(&payload, None).errors.iter().any(|e| e.field == ":21"));
        assert!(validate(&payload, Some("FX0")).errors.is_empty());
    }

    #[test]
    fn test_value_date_before_trade_date() {
        let mut payload = confirmation();
        payload.value_date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let report = validate(&payload, None);
        assert_eq!(report.errors[0].code, ValidationCode::InvalidDate);
    }
}
