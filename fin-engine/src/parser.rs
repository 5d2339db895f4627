//! Tolerant inbound FIN parser
//!
//! The parser never fails: every problem is recorded as a [`ParseError`]
//! next to whatever could be decoded. Header blocks are read only from the
//! text before `{4:` and the trailer only from the text after `-}`, so
//! braces inside a malformed text block cannot be mistaken for headers.

use crate::auto_fields::{self, CHK_LENGTH};
use crate::mt;
use crate::types::{MessagePriority, MtType, TagValue};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

static TAG_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^:(\d{2}[A-Z]?):(.*)$").expect("tag line pattern compiles"));

static SUB_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([0-9A-Z]{3}):([^{}]*)\}").expect("sub-field pattern compiles"));

const TEXT_BLOCK_START: &str = "{4:";
const TEXT_BLOCK_END: &str = "\n-}";

/// Block 2 direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Sent to the network (`I`)
    Input,
    /// Delivered by the network (`O`)
    Output,
}

/// Parse error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParseErrorCode {
    /// No `{4:` marker; nothing to extract
    MissingTextBlock,
    /// `{4:` without the closing `-}`
    UnterminatedBlock,
    /// Text before the first tag line
    OrphanLine,
    /// Block 1, 2, 3 or 5 does not have the expected shape
    MalformedHeader,
    /// MT code missing or not modelled
    UnknownMtType,
    /// A tag the MT type requires is absent
    MissingMandatoryTag,
    /// Payload exceeds the configured scan limit
    PayloadTooLarge,
}

impl ParseErrorCode {
    /// Stable code
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseErrorCode::MissingTextBlock => "MISSING_TEXT_BLOCK",
            ParseErrorCode::UnterminatedBlock => "UNTERMINATED_BLOCK",
            ParseErrorCode::OrphanLine => "ORPHAN_LINE",
            ParseErrorCode::MalformedHeader => "MALFORMED_HEADER",
            ParseErrorCode::UnknownMtType => "UNKNOWN_MT_TYPE",
            ParseErrorCode::MissingMandatoryTag => "MISSING_MANDATORY_TAG",
            ParseErrorCode::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
        }
    }
}

impl fmt::Display for ParseErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parse finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseError {
    /// Stable code
    pub code: ParseErrorCode,
    /// Detail
    pub message: String,
}

impl ParseError {
    fn new(code: ParseErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Everything decoded from one raw payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedMessage {
    /// Block 2 direction
    pub direction: Option<Direction>,
    /// MT type from block 2
    pub mt_type: Option<MtType>,
    /// Sending institution
    pub sender_bic: Option<String>,
    /// Receiving institution
    pub receiver_bic: Option<String>,
    /// Session number
    pub session_number: Option<u32>,
    /// Sequence number
    pub sequence_number: Option<u32>,
    /// Block 2 priority
    pub priority: Option<MessagePriority>,
    /// `{121:}`
    pub uetr: Option<Uuid>,
    /// `{108:}`
    pub mur: Option<String>,
    /// `{CHK:}`
    pub chk: Option<String>,
    /// `{TNG:}` present
    pub test_message: bool,
    /// Carried CHK equals the digest of blocks 1-4
    pub checksum_verified: bool,
    /// Block 4 fields in input order, repetitions kept
    pub tags: Vec<TagValue>,
    /// Raw block 4 content
    pub text_block: Option<String>,
    /// Everything that went wrong
    pub errors: Vec<ParseError>,
}

impl ParsedMessage {
    /// First occurrence of `tag`
    pub fn tag(&self, tag: &str) -> Option<&TagValue> {
        self.tags.iter().find(|t| t.tag == tag)
    }

    /// Transaction reference from :20, or the SEME reference of :20C
    pub fn reference(&self) -> Option<String> {
        if let Some(tag) = self.tag("20") {
            return Some(tag.value());
        }
        self.tags
            .iter()
            .filter(|t| t.tag == "20C")
            .find_map(|t| t.value().strip_prefix(":SEME//").map(str::to_string))
    }

    /// Related reference from :21
    pub fn related_reference(&self) -> Option<String> {
        self.tag("21").map(TagValue::value)
    }

    /// Tags rendered back as `:TAG:value` lines
    pub fn normalized_text(&self) -> String {
        self.tags
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn error(&mut self, code: ParseErrorCode, message: impl Into<String>) {
        self.errors.push(ParseError::new(code, message));
    }
}

/// Decoder from raw payload to [`ParsedMessage`]
pub trait InboundParser: Send + Sync {
    /// Parse `raw`; never fails
    fn parse(&self, raw: &str) -> ParsedMessage;
}

/// Line-oriented scanner: tag lines open a field, every other line continues it
#[derive(Debug, Clone)]
pub struct LineScanner {
    max_parse_bytes: usize,
}

impl LineScanner {
    /// Scanner refusing payloads above `max_parse_bytes`
    pub fn new(max_parse_bytes: usize) -> Self {
        Self { max_parse_bytes }
    }
}

impl Default for LineScanner {
    fn default() -> Self {
        Self::new(crate::config::InboundConfig::default().max_parse_bytes)
    }
}

impl InboundParser for LineScanner {
    fn parse(&self, raw: &str) -> ParsedMessage {
        let mut parsed = ParsedMessage::default();
        if raw.len() > self.max_parse_bytes {
            parsed.error(
                ParseErrorCode::PayloadTooLarge,
                format!("{} bytes exceed the {} byte limit", raw.len(), self.max_parse_bytes),
            );
            return parsed;
        }

        let text = raw.replace("\r\n", "\n");
        let Some(start) = text.find(TEXT_BLOCK_START) else {
            parse_headers(&text, &mut parsed);
            parsed.error(ParseErrorCode::MissingTextBlock, "no {4: block; payload kept as unstructured text");
            return parsed;
        };

        parse_headers(&text[..start], &mut parsed);

        let body_start = start + TEXT_BLOCK_START.len();
        let (body, trailer) = match text[body_start..].find(TEXT_BLOCK_END) {
            Some(offset) => {
                let end = body_start + offset;
                let blocks_end = end + TEXT_BLOCK_END.len();
                let first_block = text.find("{1:").filter(|i| *i < start).unwrap_or(0);
                let trailer = &text[blocks_end..];
                parse_trailer(trailer, &mut parsed);
                if let Some(chk) = &parsed.chk {
                    parsed.checksum_verified = auto_fields::compute_chk(&text[first_block..blocks_end]) == *chk;
                }
                (&text[body_start..end], Some(trailer))
            }
            None => {
                parsed.error(ParseErrorCode::UnterminatedBlock, "{4: block is not closed by -}");
                (&text[body_start..], None)
            }
        };

        scan_text_block(body, &mut parsed);
        parsed.text_block = Some(body.to_string());
        if trailer.is_some() {
            check_mandatory_tags(&mut parsed);
        }
        parsed
    }
}

/// Parse with the default scanner
pub fn parse(raw: &str) -> ParsedMessage {
    LineScanner::default().parse(raw)
}

fn scan_text_block(body: &str, parsed: &mut ParsedMessage) {
    let mut lines = body.split('\n').peekable();
    if lines.peek() == Some(&"") {
        lines.next();
    }
    for line in lines {
        if let Some(caps) = TAG_LINE.captures(line) {
            parsed.tags.push(TagValue {
                tag: caps[1].to_string(),
                value_lines: vec![caps[2].to_string()],
            });
        } else if let Some(current) = parsed.tags.last_mut() {
            current.value_lines.push(line.to_string());
        } else {
            parsed.error(ParseErrorCode::OrphanLine, format!("text before the first tag: {:?}", line));
        }
    }
}

fn check_mandatory_tags(parsed: &mut ParsedMessage) {
    let Some(mt) = parsed.mt_type.filter(MtType::is_supported) else {
        return;
    };
    let missing: Vec<&str> = mt::mandatory_tags(mt)
        .iter()
        .copied()
        .filter(|prefix| !parsed.tags.iter().any(|t| t.tag.starts_with(*prefix)))
        .collect();
    for tag in missing {
        parsed.error(
            ParseErrorCode::MissingMandatoryTag,
            format!("{} requires :{}:", mt, tag),
        );
    }
}

/// Content of `{n:...}` for blocks without nested braces
fn simple_block<'t>(text: &'t str, marker: &str) -> Option<&'t str> {
    let start = text.find(marker)? + marker.len();
    let end = text[start..].find('}')?;
    Some(&text[start..start + end])
}

fn parse_headers(text: &str, parsed: &mut ParsedMessage) {
    let basic = simple_block(text, "{1:");
    if text.contains("{1:") && basic.is_none() {
        parsed.error(ParseErrorCode::MalformedHeader, "block 1 is not closed");
    }
    let lt = basic.and_then(|content| parse_basic_header(content, parsed));

    match simple_block(text, "{2:") {
        Some(content) => parse_application_header(content, lt, parsed),
        None => {
            if let Some(lt) = lt {
                parsed.sender_bic = Some(bic_from_lt(&lt));
            }
            parsed.error(ParseErrorCode::UnknownMtType, "no application header; MT type unknown");
        }
    }

    if let Some(start) = text.find("{3:") {
        let user = &text[start + 3..];
        for caps in SUB_FIELD.captures_iter(user) {
            match &caps[1] {
                "108" => parsed.mur = Some(caps[2].to_string()),
                "121" => match Uuid::parse_str(&caps[2]) {
                    Ok(uetr) => parsed.uetr = Some(uetr),
                    Err(_) => parsed.error(ParseErrorCode::MalformedHeader, format!("invalid UETR {:?}", &caps[2])),
                },
                _ => {}
            }
        }
    }
}

/// Block 1: `F01` + LT(12) + session(4) + sequence(6); returns the LT
fn parse_basic_header(content: &str, parsed: &mut ParsedMessage) -> Option<String> {
    let well_formed = content.len() == 25
        && content.is_ascii()
        && content[15..].chars().all(|c| c.is_ascii_digit())
        && content[3..15].chars().all(|c| c.is_ascii_alphanumeric());
    if !well_formed {
        parsed.error(
            ParseErrorCode::MalformedHeader,
            format!("block 1 {:?} is not F01 + LT(12) + session(4) + sequence(6)", content),
        );
        return None;
    }
    parsed.session_number = content[15..19].parse().ok();
    parsed.sequence_number = content[19..25].parse().ok();
    Some(content[3..15].to_string())
}

fn parse_application_header(content: &str, basic_lt: Option<String>, parsed: &mut ParsedMessage) {
    if !content.is_ascii() || content.len() < 4 {
        parsed.error(ParseErrorCode::MalformedHeader, format!("block 2 {:?} is too short", content));
        return;
    }
    let code = &content[1..4];
    match code.parse::<u16>().ok().and_then(MtType::new) {
        Some(mt) => {
            parsed.mt_type = Some(mt);
            if !mt.is_supported() {
                parsed.error(ParseErrorCode::UnknownMtType, format!("{} is not a supported message type", mt));
            }
        }
        None => parsed.error(ParseErrorCode::UnknownMtType, format!("invalid MT code {:?}", code)),
    }

    let rest = &content[4..];
    match &content[..1] {
        "I" => {
            parsed.direction = Some(Direction::Input);
            parsed.sender_bic = basic_lt.as_deref().map(bic_from_lt);
            let (address, priority) = match rest.len() {
                11 => (rest.to_string(), None),
                12 if rest.ends_with(|c| matches!(c, 'N' | 'U' | 'S')) => (rest[..11].to_string(), rest[11..].chars().next()),
                12 => (bic_from_lt(rest), None),
                n if n >= 13 => (bic_from_lt(&rest[..12]), rest[12..].chars().next()),
                _ => {
                    parsed.error(ParseErrorCode::MalformedHeader, format!("block 2 receiver {:?} too short", rest));
                    return;
                }
            };
            parsed.receiver_bic = Some(address);
            parsed.priority = priority.and_then(MessagePriority::from_char);
        }
        "O" => {
            parsed.direction = Some(Direction::Output);
            parsed.receiver_bic = basic_lt.as_deref().map(bic_from_lt);
            // input time(4) + MIR: date(6) LT(12) session(4) sequence(6) + output date(6) time(4) + priority
            if rest.len() < 42 {
                parsed.error(ParseErrorCode::MalformedHeader, format!("block 2 output header {:?} too short", rest));
                return;
            }
            parsed.sender_bic = Some(bic_from_lt(&rest[10..22]));
            parsed.priority = rest[42..].chars().next().and_then(MessagePriority::from_char);
        }
        other => parsed.error(ParseErrorCode::MalformedHeader, format!("unknown direction {:?}", other)),
    }
}

fn parse_trailer(trailer: &str, parsed: &mut ParsedMessage) {
    let Some(start) = trailer.find("{5:") else {
        return;
    };
    for caps in SUB_FIELD.captures_iter(&trailer[start + 3..]) {
        match &caps[1] {
            "CHK" => {
                let chk = caps[2].to_string();
                if chk.len() != CHK_LENGTH {
                    parsed.error(ParseErrorCode::MalformedHeader, format!("CHK {:?} is not 12 characters", chk));
                }
                parsed.chk = Some(chk);
            }
            "TNG" => parsed.test_message = true,
            _ => {}
        }
    }
}

/// 11 character BIC from a 12 character logical terminal address (terminal code dropped)
fn bic_from_lt(lt: &str) -> String {
    match (lt.get(..8), lt.get(9..12)) {
        (Some(bic8), Some(branch)) => format!("{}{}", bic8, branch),
        _ => lt.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "{1:F01SIMUGB2LAXXX0001000001}{2:I199COBADEFFXXXN}{3:{108:REF123456}\
{121:8f3d3c2e-5b7a-4c1e-9d2f-0a1b2c3d4e5f}}{4:\n:20:REF123456\n:79:Line one\nLine two\n-}{5:{CHK:000000000000}}";

    #[test]
    fn test_headers_and_tags() {
        let parsed = parse(SAMPLE);
        assert_eq!(parsed.direction, Some(Direction::Input));
        assert_eq!(parsed.mt_type.map(|m| m.code()), Some(199));
        assert_eq!(parsed.sender_bic.as_deref(), Some("SIMUGB2LXXX"));
        assert_eq!(parsed.receiver_bic.as_deref(), Some("COBADEFFXXX"));
        assert_eq!(parsed.priority, Some(MessagePriority::Normal));
        assert_eq!(parsed.session_number, Some(1));
        assert_eq!(parsed.sequence_number, Some(1));
        assert_eq!(parsed.mur.as_deref(), Some("REF123456"));
        assert!(parsed.uetr.is_some());
        assert_eq!(parsed.tags.len(), 2);
        assert_eq!(parsed.tags[1].value_lines, vec!["Line one", "Line two"]);
        assert_eq!(parsed.reference().as_deref(), Some("REF123456"));
        assert!(parsed.errors.is_empty());
        assert!(!parsed.checksum_verified);
    }

    #[test]
    fn test_crlf_and_repeated_tags() {
        let raw = "{2:I300BANKDEFFXXXN}{4:\r\n:57A:AAAAGB2L\r\n:57A:BBBBUS33\r\n-}";
        let parsed = parse(raw);
        assert_eq!(parsed.tags.len(), 2);
        assert!(parsed.tags.iter().all(|t| t.tag == "57A"));
        assert!(parsed.errors.iter().any(|e| e.code == ParseErrorCode::MissingMandatoryTag));
    }

    #[test]
    fn test_missing_text_block() {
        let raw = "just some text\nwithout blocks";
        let parsed = parse(raw);
        assert!(parsed.tags.is_empty());
        assert!(parsed.text_block.is_none());
        assert!(parsed.errors.iter().any(|e| e.code == ParseErrorCode::MissingTextBlock));
    }

    #[test]
    fn test_unterminated_block_scans_to_end() {
        let parsed = parse("{2:I199COBADEFFXXXN}{4:\n:20:ABC\n:79:cut off");
        assert_eq!(parsed.tags.len(), 2);
        assert!(parsed.errors.iter().any(|e| e.code == ParseErrorCode::UnterminatedBlock));
    }

    #[test]
    fn test_orphan_line_and_unknown_type() {
        let parsed = parse("{2:I101COBADEFFXXXN}{4:\nstray\n:20:ABC\n-}");
        let codes: Vec<ParseErrorCode> = parsed.errors.iter().map(|e| e.code).collect();
        assert!(codes.contains(&ParseErrorCode::UnknownMtType));
        assert!(codes.contains(&ParseErrorCode::OrphanLine));
        assert_eq!(parsed.tags.len(), 1);
    }

    #[test]
    fn test_output_direction_header() {
        let raw = "{1:F01COBADEFFAXXX0002000123}\
{2:O1031200240315SIMUGB2LAXXX00010000012403151201N}{4:\n:20:X\n-}";
        let parsed = parse(raw);
        assert_eq!(parsed.direction, Some(Direction::Output));
        assert_eq!(parsed.sender_bic.as_deref(), Some("SIMUGB2LXXX"));
        assert_eq!(parsed.receiver_bic.as_deref(), Some("COBADEFFXXX"));
        assert_eq!(parsed.priority, Some(MessagePriority::Normal));
    }

    #[test]
    fn test_oversized_payload() {
        let parsed = LineScanner::new(16).parse(SAMPLE);
        assert_eq!(parsed.errors[0].code, ParseErrorCode::PayloadTooLarge);
        assert!(parsed.tags.is_empty());
    }
}
