//! MT540-MT543 settlement instructions
//!
//! Sequences are framed by `16R`/`16S` and generic fields carry their
//! qualifier as `:QUAL//value`, e.g. `:20C::SEME//REF`.

use super::{bic_field, field, yyyymmdd, Checks, Money, References};
use crate::types::{MtType, TagValue};
use crate::validation::{self, ValidationCode};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Instruction kind; selects the MT type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementKind {
    /// MT540
    ReceiveFree,
    /// MT541
    ReceiveAgainstPayment,
    /// MT542
    DeliverFree,
    /// MT543
    DeliverAgainstPayment,
}

impl SettlementKind {
    /// MT type of the instruction
    pub fn mt_type(&self) -> MtType {
        match self {
            SettlementKind::ReceiveFree => MtType::MT540,
            SettlementKind::ReceiveAgainstPayment => MtType::MT541,
            SettlementKind::DeliverFree => MtType::MT542,
            SettlementKind::DeliverAgainstPayment => MtType::MT543,
        }
    }

    /// Settlement moves cash as well as securities
    pub fn against_payment(&self) -> bool {
        matches!(self, SettlementKind::ReceiveAgainstPayment | SettlementKind::DeliverAgainstPayment)
    }

    fn is_receive(&self) -> bool {
        matches!(self, SettlementKind::ReceiveFree | SettlementKind::ReceiveAgainstPayment)
    }

    /// Counterparty agent qualifier: we receive from the delivering agent
    /// or deliver to the receiving agent
    fn agent_qualifier(&self) -> &'static str {
        if self.is_receive() {
            "DEAG"
        } else {
            "REAG"
        }
    }
}

/// MT54x payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecuritiesSettlement {
    /// Instruction kind
    pub kind: SettlementKind,

    /// 98A::TRAD
    pub trade_date: NaiveDate,

    /// 98A::SETT
    pub settlement_date: NaiveDate,

    /// 35B identifier
    pub isin: String,

    /// 35B description, up to 3×35
    #[serde(default)]
    pub security_description: Option<String>,

    /// 36B::SETT//UNIT
    pub quantity: Decimal,

    /// 97A::SAFE
    pub safekeeping_account: String,

    /// 95P::DEAG or 95P::REAG
    pub counterparty_agent: String,

    /// 19A::SETT, against-payment kinds only
    #[serde(default)]
    pub settlement_amount: Option<Money>,
}

impl SecuritiesSettlement {
    pub(super) fn validate(&self, checks: &mut Checks<'_>) {
        checks.date_order(":98A", self.trade_date, self.settlement_date, "settlement date precedes trade date");
        checks.isin(":35B", &self.isin);
        checks.optional_continuation(":35B", &self.security_description, 105, 3, 35);
        checks.positive(":36B", self.quantity);
        checks.required_text(":97A", &self.safekeeping_account, 35);
        checks.bic(":95P", &self.counterparty_agent);
        match (&self.settlement_amount, self.kind.against_payment()) {
            (Some(amount), true) => checks.money(":19A", amount),
            (None, true) => checks.error(
                ":19A",
                ValidationCode::MissingField,
                "settlement amount is required against payment",
            ),
            (Some(_), false) => checks.warning(
                ":19A",
                ValidationCode::FieldNotAllowed,
                "settlement amount ignored for a free of payment instruction",
            ),
            (None, false) => {}
        }
    }

    pub(super) fn text_fields(&self, refs: &References<'_>) -> Vec<TagValue> {
        let mut identification = format!("ISIN {}", validation::normalize_code(&self.isin));
        if let Some(description) = super::non_blank(&self.security_description) {
            identification.push('\n');
            identification.push_str(description);
        }

        let mut fields = vec![
            field("16R", "GENL"),
            field("20C", format!(":SEME//{}", refs.transaction)),
            field("23G", "NEWM"),
            field("16S", "GENL"),
            field("16R", "TRADDET"),
            field("98A", format!(":SETT//{}", yyyymmdd(self.settlement_date))),
            field("98A", format!(":TRAD//{}", yyyymmdd(self.trade_date))),
            field("35B", identification),
            field("16S", "TRADDET"),
            field("16R", "FIAC"),
            field("36B", format!(":SETT//UNIT/{}", validation::format_amount(self.quantity))),
            field("97A", format!(":SAFE//{}", self.safekeeping_account.trim())),
            field("16S", "FIAC"),
            field("16R", "SETDET"),
            field("22F", ":SETR//TRAD"),
            field("16R", "SETPRTY"),
        ];
        let agent = bic_field("95P", &self.counterparty_agent);
        fields.push(field("95P", format!(":{}//{}", self.kind.agent_qualifier(), agent.value())));
        fields.push(field("16S", "SETPRTY"));
        if let (true, Some(amount)) = (self.kind.against_payment(), &self.settlement_amount) {
            fields.push(field("16R", "AMT"));
            fields.push(field("19A", format!(":SETT//{}", amount.render())));
            fields.push(field("16S", "AMT"));
        }
        fields.push(field("16S", "SETDET"));
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidationConfig;
    use crate::validation::ValidationReport;

    fn instruction(kind: SettlementKind) -> SecuritiesSettlement {
        SecuritiesSettlement {
            kind,
            trade_date: NaiveDate::from_ymd_opt(2024, 4, 8).unwrap(),
            settlement_date: NaiveDate::from_ymd_opt(2024, 4, 10).unwrap(),
            isin: "US0378331005".to_string(),
            security_description: Some("APPLE INC".to_string()),
            quantity: Decimal::new(1500, 0),
            safekeeping_account: "SAFE-001".to_string(),
            counterparty_agent: "CITIUS33".to_string(),
            settlement_amount: Some(Money::new("USD", Decimal::new(25_650_000, 2))),
        }
    }

    fn validate(payload: &SecuritiesSettlement) -> ValidationReport {
        let mut report = ValidationReport::new();
        let config = ValidationConfig::default();
        payload.validate(&mut Checks::new(&mut report, &config));
        report
    }

    #[test]
    fn test_against_payment_sequences() {
        let payload = instruction(SettlementKind::DeliverAgainstPayment);
        assert_eq!(payload.kind.mt_type(), MtType::MT543);
        let fields = payload.text_fields(&References {
            transaction: "SEC1",
            related: None,
        });
        let rendered: Vec<String> = fields.iter().map(|f| f.to_string()).collect();
        assert_eq!(rendered[1], ":20C::SEME//SEC1");
        assert!(rendered.contains(&":95P::REAG//CITIUS33".to_string()));
        assert!(rendered.contains(&":19A::SETT//USD256500,".to_string()));
        assert!(rendered.contains(&":35B:ISIN US0378331005\nAPPLE INC".to_string()));
        assert_eq!(rendered.last().map(String::as_str), Some(":16S:SETDET"));
        assert!(validate(&payload).errors.is_empty());
    }

    #[test]
    fn test_free_of_payment_ignores_amount() {
        let payload = instruction(SettlementKind::ReceiveFree);
        let fields = payload.text_fields(&References {
            transaction: "SEC2",
            related: None,
        });
        assert!(fields.iter().all(|f| f.tag != "19A"));
        assert!(fields.iter().any(|f| f.value() == ":DEAG//CITIUS33"));

        let report = validate(&payload);
        assert!(report.errors.is_empty());
        assert_eq!(report.warnings[0].code, ValidationCode::FieldNotAllowed);
    }

    #[test]
    fn test_invalid_isin_and_dates() {
        let mut payload = instruction(SettlementKind::ReceiveAgainstPayment);
        payload.isin = "US03783310".to_string();
        payload.settlement_date = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        payload.settlement_amount = None;
        let codes: Vec<ValidationCode> = validate(&payload).errors.iter().map(|e| e.code).collect();
        assert_eq!(
            codes,
            vec![ValidationCode::InvalidDate, ValidationCode::InvalidIsin, ValidationCode::MissingField]
        );
    }

    #[test]
    fn test_description_lines_cannot_open_a_tag() {
        for description in [":20:X", "-X", "APPLE INC\n:20:X"] {
            let mut payload = instruction(SettlementKind::DeliverAgainstPayment);
            payload.security_description = Some(description.to_string());
            let report = validate(&payload);
            assert_eq!(report.errors.len(), 1, "{:?}", description);
            assert_eq!(report.errors[0].field, ":35B");
            assert_eq!(report.errors[0].code, ValidationCode::BadLineStart);
        }
    }
}
