//! MT700 issue of a documentary credit

use super::{field, non_blank, yymmdd, Checks, Money, Party, References};
use crate::types::TagValue;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Applicable rules carried in 40E
const APPLICABLE_RULES: &str = "UCP LATEST VERSION";

/// Field 40A
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditForm {
    /// IRREVOCABLE
    #[default]
    Irrevocable,
    /// IRREVOCABLE TRANSFERABLE
    IrrevocableTransferable,
}

impl CreditForm {
    /// Wire text
    pub fn as_str(&self) -> &'static str {
        match self {
            CreditForm::Irrevocable => "IRREVOCABLE",
            CreditForm::IrrevocableTransferable => "IRREVOCABLE TRANSFERABLE",
        }
    }
}

/// MT700 payload, single message (27 = 1/1)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentaryCredit {
    /// 40A
    #[serde(default)]
    pub form: CreditForm,

    /// 31C
    pub date_of_issue: NaiveDate,

    /// 31D date
    pub expiry_date: NaiveDate,

    /// 31D place
    pub expiry_place: String,

    /// 50
    pub applicant: Party,

    /// 59
    pub beneficiary: Party,

    /// 32B
    pub amount: Money,

    /// 45A
    pub goods_description: String,

    /// 46A
    pub documents_required: String,

    /// 47A
    #[serde(default)]
    pub additional_conditions: Option<String>,
}

impl DocumentaryCredit {
    pub(super) fn validate(&self, checks: &mut Checks<'_>) {
        checks.date_order(":31D", self.date_of_issue, self.expiry_date, "credit expires before it is issued");
        checks.required_text(":31D", &self.expiry_place, 29);
        checks.party(":50", &self.applicant);
        checks.party(":59", &self.beneficiary);
        checks.money(":32B", &self.amount);
        checks.required_narrative(":45A", &self.goods_description, 6500, 100, 65);
        checks.required_narrative(":46A", &self.documents_required, 6500, 100, 65);
        checks.optional_narrative(":47A", &self.additional_conditions, 6500, 100, 65);
    }

    pub(super) fn text_fields(&self, refs: &References<'_>) -> Vec<TagValue> {
        let mut fields = vec![
            field("27", "1/1"),
            field("40A", self.form.as_str()),
            field("20", refs.transaction),
            field("31C", yymmdd(self.date_of_issue)),
            field("40E", APPLICABLE_RULES),
            field("31D", format!("{}{}", yymmdd(self.expiry_date), self.expiry_place.trim())),
            field("50", self.applicant.render()),
            field("59", self.beneficiary.render()),
            field("32B", self.amount.render()),
            field("45A", &self.goods_description),
            field("46A", &self.documents_required),
        ];
        if let Some(text) = non_blank(&self.additional_conditions) {
            fields.push(field("47A", text));
        }
        fields
    }
}
