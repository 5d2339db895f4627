//! Message assembly: validate a typed payload, resolve auto fields, render FIN
//!
//! Assembly is a pure transformation apart from the session/sequence counter
//! it draws from. Validation always runs to completion so the caller sees
//! every error in one pass; nothing is rendered unless it comes back clean.

use crate::auto_fields::{self, AutoFieldGenerator, AutoFields, MAX_SEQUENCE, MAX_SESSION};
use crate::blocks::{ApplicationHeader, BasicHeader, BlockBuilder, Trailer, UserHeader};
use crate::config::{Config, OriginatorConfig, ValidationConfig};
use crate::error::ValidationFailure;
use crate::mt::{Checks, MtPayload, References, RelatedReference};
use crate::types::{SwiftHeader, TagValue};
use crate::validation::{self, ValidationCode, ValidationError, ValidationReport};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Everything needed to assemble one message
#[derive(Debug, Clone, Copy)]
pub struct AssemblyRequest<'a> {
    /// Field :20
    pub transaction_reference: &'a str,
    /// Field :21
    pub related_reference: Option<&'a str>,
    /// Typed payload
    pub payload: &'a MtPayload,
    /// Header context
    pub header: &'a SwiftHeader,
    /// Generate missing session/sequence/UETR and the MUR
    pub with_auto_fields: bool,
}

/// Rendered message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssembledMessage {
    /// Complete FIN text, blocks 1-5
    pub fin_message: String,

    /// Machine-generated header values
    pub auto_fields: AutoFields,

    /// Trailer checksum carried in block 5
    pub chk: String,

    /// Block 4 fields in wire order
    pub fields: Vec<TagValue>,

    /// Non-blocking findings
    pub warnings: Vec<ValidationError>,
}

/// Per-MT orchestration of validation, auto fields and block rendering
#[derive(Debug, Clone)]
pub struct MessageAssembler {
    originator: OriginatorConfig,
    validation: ValidationConfig,
    generator: Arc<AutoFieldGenerator>,
}

impl MessageAssembler {
    /// Create an assembler with its own sequence counters
    pub fn new(config: &Config) -> Self {
        let generator = Arc::new(AutoFieldGenerator::new(config.sequencing.clone()));
        Self::with_generator(config, generator)
    }

    /// Create an assembler sharing an existing generator
    pub fn with_generator(config: &Config, generator: Arc<AutoFieldGenerator>) -> Self {
        Self {
            originator: config.originator.clone(),
            validation: config.validation.clone(),
            generator,
        }
    }

    /// Sequence counter source
    pub fn generator(&self) -> &Arc<AutoFieldGenerator> {
        &self.generator
    }

    /// Originator defaults in use
    pub fn originator(&self) -> &OriginatorConfig {
        &self.originator
    }

    /// Run every applicable check and collect errors and warnings
    pub fn validate(&self, request: &AssemblyRequest<'_>) -> ValidationReport {
        let mut report = ValidationReport::new();
        let header = request.header;

        report.check(validation::validate_ref20(request.transaction_reference));
        let related = related_reference(request);
        match request.payload.related_reference() {
            RelatedReference::Mandatory if related.is_none() => {
                report.add_error(":21", ValidationCode::MissingField, "related reference is required");
            }
            RelatedReference::Mandatory | RelatedReference::Optional => {
                if let Some(value) = related {
                    report.check(validation::validate_ref21(value));
                }
            }
            RelatedReference::NotAllowed => {
                if related.is_some() {
                    report.add_warning(
                        ":21",
                        ValidationCode::FieldNotAllowed,
                        format!("{} carries no related reference; value ignored", request.payload.mt_type()),
                    );
                }
            }
        }

        report.check(validation::validate_bic("receiverBic", &header.receiver_bic));
        report.check(validation::validate_bic("senderBic", self.sender_bic(header)));

        let terminal = self.logical_terminal(header);
        if !terminal.is_ascii_uppercase() && !terminal.is_ascii_digit() {
            report.add_error(
                "logicalTerminal",
                ValidationCode::BadCharset,
                format!("terminal code {:?} must be an uppercase letter or digit", terminal),
            );
        }
        if let Some(session) = header.session_number {
            if !(1..=MAX_SESSION).contains(&session) {
                report.add_error(
                    "sessionNumber",
                    ValidationCode::OutOfRange,
                    format!("session {} outside 1-{}", session, MAX_SESSION),
                );
            }
        }
        if let Some(sequence) = header.sequence_number {
            if !(1..=MAX_SEQUENCE).contains(&sequence) {
                report.add_error(
                    "sequenceNumber",
                    ValidationCode::OutOfRange,
                    format!("sequence {} outside 1-{}", sequence, MAX_SEQUENCE),
                );
            }
        }
        if let Some(chk) = &header.chk {
            if !auto_fields::is_chk_shaped(chk) {
                report.add_error("chk", ValidationCode::BadCharset, "CHK must be 12 uppercase hex characters");
            }
        }

        let refs = References {
            transaction: request.transaction_reference,
            related: rendered_related(request),
        };
        request
            .payload
            .validate(&refs, &mut Checks::new(&mut report, &self.validation));
        report
    }

    /// Validate, then render the complete FIN text
    pub fn assemble(&self, request: &AssemblyRequest<'_>) -> Result<AssembledMessage, ValidationFailure> {
        let report = self.validate(request);
        let mt_type = request.payload.mt_type();
        if report.has_errors() {
            warn!(
                mt_type = %mt_type,
                reference = request.transaction_reference,
                errors = report.errors.len(),
                "Message failed validation"
            );
            return Err(report.into_failure());
        }

        let header = request.header;
        let sender_bic = validation::normalize_code(self.sender_bic(header));
        let receiver_bic = auto_fields::bic11(&validation::normalize_code(&header.receiver_bic));
        let sender_lt = auto_fields::logical_terminal_address(&sender_bic, self.logical_terminal(header));

        let numbers = self
            .generator
            .resolve(header, &sender_lt, request.with_auto_fields);
        let mur = request
            .with_auto_fields
            .then(|| request.transaction_reference.to_string());
        let stp = request.payload.stp();

        let refs = References {
            transaction: request.transaction_reference,
            related: rendered_related(request),
        };
        let fields = request.payload.text_fields(&refs);

        let builder = BlockBuilder::new()
            .basic_header(&BasicHeader {
                application_id: self.originator.application_id,
                service_id: &self.originator.service_id,
                logical_terminal: &sender_lt,
                session_number: numbers.session_number,
                sequence_number: numbers.sequence_number,
            })
            .application_header(&ApplicationHeader {
                mt_type,
                receiver_bic: &receiver_bic,
                priority: header.message_priority,
            })
            .user_header(&UserHeader {
                mur: mur.as_deref(),
                stp,
                uetr: numbers.uetr,
            })
            .text_block(&fields);

        let computed = auto_fields::compute_chk(builder.body());
        let chk = match &header.chk {
            Some(supplied) => {
                if *supplied != computed {
                    warn!(
                        reference = request.transaction_reference,
                        supplied = %supplied,
                        computed = %computed,
                        "Supplied CHK does not match message body; keeping supplied value"
                    );
                }
                supplied.clone()
            }
            None => computed,
        };

        let fin_message = builder.trailer(&Trailer {
            chk: &chk,
            test_message: self.originator.test_mode,
        });

        debug!(
            mt_type = %mt_type,
            reference = request.transaction_reference,
            session = ?numbers.session_number,
            sequence = ?numbers.sequence_number,
            "Assembled FIN message"
        );

        Ok(AssembledMessage {
            fin_message,
            auto_fields: AutoFields {
                sender_lt,
                application_id: self.originator.application_id,
                session_number: numbers.session_number,
                sequence_number: numbers.sequence_number,
                uetr: numbers.uetr,
                mur,
                stp,
            },
            chk,
            fields,
            warnings: report.warnings,
        })
    }

    fn sender_bic<'h>(&'h self, header: &'h SwiftHeader) -> &'h str {
        header
            .sender_bic
            .as_deref()
            .filter(|bic| !bic.trim().is_empty())
            .unwrap_or(&self.originator.sender_bic)
    }

    fn logical_terminal(&self, header: &SwiftHeader) -> char {
        header.logical_terminal.unwrap_or(self.originator.logical_terminal)
    }
}

fn related_reference<'a>(request: &AssemblyRequest<'a>) -> Option<&'a str> {
    request.related_reference.filter(|value| !value.trim().is_empty())
}

/// :21 as it appears in block 4; dropped for families that carry none
fn rendered_related<'a>(request: &AssemblyRequest<'a>) -> Option<&'a str> {
    match request.payload.related_reference() {
        RelatedReference::NotAllowed => None,
        _ => related_reference(request),
    }
}
