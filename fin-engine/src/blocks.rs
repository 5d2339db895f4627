//! Five-block FIN envelope rendering
//!
//! ```text
//! {1:F01SIMUGB2LAXXX0001000001}{2:I199COBADEFFXXXN}{3:{121:...}}{4:
//! :20:REF123456
//! :79:Test message
//! -}{5:{CHK:0123456789AB}}
//! ```
//!
//! Blocks are written strictly in the order 1, 2, 3 (optional), 4, 5. The
//! trailer is appended last because its CHK covers everything before it.

use crate::types::{MessagePriority, MtType, TagValue};
use uuid::Uuid;

/// Block 1 content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicHeader<'a> {
    /// Application identifier (`F`)
    pub application_id: char,
    /// Service identifier (`01`)
    pub service_id: &'a str,
    /// 12 character sender logical terminal address
    pub logical_terminal: &'a str,
    /// Session number; zeros when unassigned
    pub session_number: Option<u32>,
    /// Sequence number; zeros when unassigned
    pub sequence_number: Option<u32>,
}

/// Block 2 content (input direction)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationHeader<'a> {
    /// Message type
    pub mt_type: MtType,
    /// 11 character receiver address
    pub receiver_bic: &'a str,
    /// Priority flag
    pub priority: MessagePriority,
}

/// Block 3 sub-fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserHeader<'a> {
    /// `{108:}` message user reference
    pub mur: Option<&'a str>,
    /// `{119:STP}`
    pub stp: bool,
    /// `{121:}` UETR
    pub uetr: Option<Uuid>,
}

impl UserHeader<'_> {
    /// No sub-field to carry; block 3 is omitted
    pub fn is_empty(&self) -> bool {
        self.mur.is_none() && !self.stp && self.uetr.is_none()
    }
}

/// Block 5 content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trailer<'a> {
    /// Checksum over blocks 1-4
    pub chk: &'a str,
    /// Test and training marker
    pub test_message: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Stage {
    Empty,
    Basic,
    Application,
    User,
    Text,
}

/// Sequential FIN writer.
///
/// Each method consumes the builder and appends one block; calling them
/// out of order is a programming error.
#[derive(Debug)]
pub struct BlockBuilder {
    out: String,
    stage: Stage,
}

impl BlockBuilder {
    /// Start an empty message
    pub fn new() -> Self {
        Self {
            out: String::with_capacity(512),
            stage: Stage::Empty,
        }
    }

    fn enter(&mut self, next: Stage) {
        debug_assert!(self.stage < next, "FIN block {:?} written after {:?}", next, self.stage);
        self.stage = next;
    }

    /// Block 1
    pub fn basic_header(mut self, header: &BasicHeader<'_>) -> Self {
        self.enter(Stage::Basic);
        debug_assert_eq!(header.logical_terminal.len(), 12);
        self.out.push_str(&format!(
            "{{1:{}{}{}{:04}{:06}}}",
            header.application_id,
            header.service_id,
            header.logical_terminal,
            header.session_number.unwrap_or(0),
            header.sequence_number.unwrap_or(0),
        ));
        self
    }

    /// Block 2
    pub fn application_header(mut self, header: &ApplicationHeader<'_>) -> Self {
        self.enter(Stage::Application);
        self.out.push_str(&format!(
            "{{2:I{:03}{}{}}}",
            header.mt_type.code(),
            header.receiver_bic,
            header.priority.as_char(),
        ));
        self
    }

    /// Block 3, skipped entirely when there is nothing to carry
    pub fn user_header(mut self, header: &UserHeader<'_>) -> Self {
        self.enter(Stage::User);
        if header.is_empty() {
            return self;
        }
        self.out.push_str("{3:");
        if let Some(mur) = header.mur {
            self.out.push_str(&format!("{{108:{}}}", mur));
        }
        if header.stp {
            self.out.push_str("{119:STP}");
        }
        if let Some(uetr) = header.uetr {
            self.out.push_str(&format!("{{121:{}}}", uetr));
        }
        self.out.push('}');
        self
    }

    /// Block 4: one `:TAG:` line per field, continuation lines unprefixed
    pub fn text_block(mut self, fields: &[TagValue]) -> Self {
        self.enter(Stage::Text);
        self.out.push_str("{4:\n");
        for field in fields {
            self.out.push(':');
            self.out.push_str(&field.tag);
            self.out.push(':');
            self.out.push_str(&field.value_lines.join("\n"));
            self.out.push('\n');
        }
        self.out.push_str("-}");
        self
    }

    /// Blocks 1-4 written so far; the CHK input
    pub fn body(&self) -> &str {
        debug_assert_eq!(self.stage, Stage::Text, "body read before block 4 was closed");
        &self.out
    }

    /// Append block 5 and return the complete message
    pub fn trailer(mut self, trailer: &Trailer<'_>) -> String {
        debug_assert_eq!(self.stage, Stage::Text, "trailer written before block 4");
        self.out.push_str(&format!("{{5:{{CHK:{}}}", trailer.chk));
        if trailer.test_message {
            self.out.push_str("{TNG:}");
        }
        self.out.push('}');
        self.out
    }
}

impl Default for BlockBuilder {
    fn default() -> Self {
        Self::new()
    }
}
