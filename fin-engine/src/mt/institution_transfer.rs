//! MT202 general financial institution transfer

use super::{bic_field, field, non_blank, yymmdd, Checks, Money, References};
use crate::types::TagValue;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// MT202 payload; the related reference (:21) is mandatory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstitutionTransfer {
    /// 32A value date
    pub value_date: NaiveDate,

    /// 32A currency and amount
    pub settlement_amount: Money,

    /// 52A
    #[serde(default)]
    pub ordering_institution: Option<String>,

    /// 57A
    #[serde(default)]
    pub account_with_institution: Option<String>,

    /// 58A
    pub beneficiary_institution: String,

    /// 72, up to 6×35
    #[serde(default)]
    pub sender_to_receiver_information: Option<String>,
}

impl InstitutionTransfer {
    pub(super) fn validate(&self, checks: &mut Checks<'_>) {
        checks.money(":32A", &self.settlement_amount);
        checks.optional_bic(":52A", &self.ordering_institution);
        checks.optional_bic(":57A", &self.account_with_institution);
        checks.bic(":58A", &self.beneficiary_institution);
        checks.optional_narrative(":72", &self.sender_to_receiver_information, 210, 6, 35);
    }

    pub(super) fn text_fields(&self, refs: &References<'_>) -> Vec<TagValue> {
        let mut fields = vec![field("20", refs.transaction)];
        if let Some(related) = refs.related {
            fields.push(field("21", related));
        }
        fields.push(field(
            "32A",
            format!("{}{}", yymmdd(self.value_date), self.settlement_amount.render()),
        ));
        if let Some(bic) = non_blank(&self.ordering_institution) {
            fields.push(bic_field("52A", bic));
        }
        if let Some(bic) = non_blank(&self.account_with_institution) {
            fields.push(bic_field("57A", bic));
        }
        fields.push(bic_field("58A", &self.beneficiary_institution));
        if let Some(text) = non_blank(&self.sender_to_receiver_information) {
            fields.push(field("72", text));
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_cover_fields() {
        let payload = InstitutionTransfer {
            value_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            settlement_amount: Money::new("USD", Decimal::new(1_000_000, 0)),
            ordering_institution: Some("DEUTDEFF".to_string()),
            account_with_institution: None,
            beneficiary_institution: "chasus33xxx".to_string(),
            sender_to_receiver_information: Some("/BNF/COVER".to_string()),
        };
        let fields = payload.text_fields(&References {
            transaction: "COV1",
            related: Some("REL1"),
        });
        let rendered: Vec<String> = fields.iter().map(|f| f.to_string()).collect();
        assert_eq!(
            rendered,
            vec![
                ":20:COV1",
                ":21:REL1",
                ":32A:240102USD1000000,",
                ":52A:DEUTDEFF",
                ":58A:CHASUS33XXX",
                ":72:/BNF/COVER",
            ]
        );
    }
}
