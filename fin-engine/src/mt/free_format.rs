//! Common group messages: MTn99 free format and MTn92 request for cancellation

use super::{field, yymmdd, Checks, References};
use crate::types::{MtType, TagValue};
use crate::validation::ValidationCode;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Maximum length of the :79 narrative
pub const NARRATIVE_MAX_LENGTH: usize = 3500;

fn check_category(checks: &mut Checks<'_>, category: u8) {
    if !(1..=9).contains(&category) {
        checks.error(
            "mtType",
            ValidationCode::UnsupportedMtType,
            format!("category {} is outside 1-9", category),
        );
    }
}

/// MTn99 payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeFormat {
    /// Message category (1-9), e.g. 1 for MT199
    pub category: u8,

    /// :79, up to 35×50
    pub narrative: String,
}

impl FreeFormat {
    pub(super) fn validate(&self, checks: &mut Checks<'_>) {
        check_category(checks, self.category);
        checks.required_narrative(":79", &self.narrative, NARRATIVE_MAX_LENGTH, 35, 50);
    }

    pub(super) fn text_fields(&self, refs: &References<'_>) -> Vec<TagValue> {
        let mut fields = vec![field("20", refs.transaction)];
        if let Some(related) = refs.related {
            fields.push(field("21", related));
        }
        fields.push(field("79", &self.narrative));
        fields
    }
}

/// MTn92 payload; :21 carries the reference of the message to cancel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationRequest {
    /// Message category (1-9)
    pub category: u8,

    /// 11S MT type of the original message
    pub original_mt: MtType,

    /// 11S date of the original message
    pub original_date: NaiveDate,

    /// :79 reason or copy of the original fields
    #[serde(default)]
    pub narrative: Option<String>,
}

impl CancellationRequest {
    pub(super) fn validate(&self, checks: &mut Checks<'_>) {
        check_category(checks, self.category);
        checks.optional_narrative(":79", &self.narrative, NARRATIVE_MAX_LENGTH, 35, 50);
    }

    pub(super) fn text_fields(&self, refs: &References<'_>) -> Vec<TagValue> {
        let mut fields = vec![field("20", refs.transaction)];
        if let Some(related) = refs.related {
            fields.push(field("21", related));
        }
        fields.push(field(
            "11S",
            format!("{:03}\n{}", self.original_mt.code(), yymmdd(self.original_date)),
        ));
        if let Some(text) = super::non_blank(&self.narrative) {
            fields.push(field("79", text));
        }
        fields
    }
}
