use std::collections::HashMap;

use tracing::debug;

use super::lexer::FIELD_SEPARATOR;
use super::lexer::HEADER_MARKER;
use super::lexer::HEADER_SEPARATOR;
use super::lexer::LOCATION_LABEL;
use super::lexer::Token;
use super::lexer::split_header;
use super::lexer::tokenize;
use super::mapping::RenameMapping;
use crate::registry::ActionableRecord;

/// Written as `device_id` for entities without a device; never renamed
pub const NO_DEVICE_ID: &str = "NO_DEVICE_ID";

/// Keys written under each header, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::AsRefStr, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Field {
    Type,
    DeviceId,
    EntityId,
    Domain,
}

/// Action recorded for every block.
///
/// The snapshot lists what could be done to each entity, not its current
/// state, so this is the same for every record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Action {
    #[default]
    TurnOff,
}

/// Renders one record as a snapshot block, trailing blank line included
pub struct Block<'a>(pub &'a ActionableRecord);

impl std::fmt::Display for Block<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let r = self.0;
        writeln!(
            f,
            "{}{}{}{}{}",
            HEADER_MARKER, r.display_name, HEADER_SEPARATOR, LOCATION_LABEL, r.location_name
        )?;
        let device_id = r.device_id.as_deref().unwrap_or(NO_DEVICE_ID);
        for (field, value) in [
            (Field::Type, Action::default().to_string()),
            (Field::DeviceId, device_id.to_string()),
            (Field::EntityId, r.entity_id.clone()),
            (Field::Domain, r.domain.clone()),
        ] {
            writeln!(f, "{}{}{}", field, FIELD_SEPARATOR, value)?;
        }
        writeln!(f)
    }
}

/// Render records as snapshot text, one block each, in order
pub fn serialize(records: &[ActionableRecord]) -> String {
    records
        .iter()
        .map(|r| Block(r).to_string())
        .collect()
}

/// A block the parser skipped or overrode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotWarning {
    /// Header line without ` | ` between name and location
    MissingSeparator { line: usize },

    /// Header with nothing before the separator
    EmptyName { line: usize },

    /// Block without a `device_id` field
    MissingDeviceId { line: usize, name: String },

    /// A later block named the same device; the later name wins
    Superseded {
        line: usize,
        device_id: String,
        previous: String,
        name: String,
    },
}

impl SnapshotWarning {
    /// 1-based line of the block header
    pub fn line(&self) -> usize {
        match self {
            SnapshotWarning::MissingSeparator { line }
            | SnapshotWarning::EmptyName { line }
            | SnapshotWarning::MissingDeviceId { line, .. }
            | SnapshotWarning::Superseded { line, .. } => *line,
        }
    }

    /// What happened to the block, without the line number
    pub fn reason(&self) -> String {
        match self {
            SnapshotWarning::MissingSeparator { .. } => {
                format!("header has no '{}', block skipped", HEADER_SEPARATOR.trim())
            }
            SnapshotWarning::EmptyName { .. } => {
                "header has an empty name, block skipped".to_string()
            }
            SnapshotWarning::MissingDeviceId { name, .. } => {
                format!("'{}' has no device_id, block skipped", name)
            }
            SnapshotWarning::Superseded {
                device_id,
                previous,
                name,
                ..
            } => format!(
                "device {} renamed to '{}', replacing earlier '{}'",
                device_id, name, previous
            ),
        }
    }
}

impl std::fmt::Display for SnapshotWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line(), self.reason())
    }
}

/// Render warnings against the snapshot text they came from.
///
/// Each warning becomes an ariadne report pointing at its header line.
pub fn render_warnings(warnings: &[SnapshotWarning], source: &str, filename: &str) -> String {
    use ariadne::Color;
    use ariadne::Config;
    use ariadne::Label;
    use ariadne::Report;
    use ariadne::ReportKind;
    use ariadne::Source;

    let lines: Vec<_> = tokenize(source).map(|s| s.span).collect();

    let mut output = Vec::new();
    for warning in warnings {
        let span = lines
            .get(warning.line().saturating_sub(1))
            .map_or(0..0, |span| span.start..span.end);
        let report = Report::build(ReportKind::Warning, (filename, span.clone()))
            .with_config(Config::default().with_color(false))
            .with_message(warning.reason())
            .with_label(
                Label::new((filename, span))
                    .with_message(warning.reason())
                    .with_color(Color::Yellow),
            )
            .finish();

        report
            .write((filename, Source::from(source)), &mut output)
            .ok();
    }
    String::from_utf8_lossy(&output).to_string()
}

/// Result of parsing a snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parsed {
    pub mapping: RenameMapping,
    pub warnings: Vec<SnapshotWarning>,
}

/// A block being accumulated
struct OpenBlock<'a> {
    line: usize,
    header: &'a str,
    fields: HashMap<&'a str, &'a str>,
}

impl OpenBlock<'_> {
    fn finish(self, parsed: &mut Parsed) {
        let Some((name, _location)) = split_header(self.header) else {
            parsed
                .warnings
                .push(SnapshotWarning::MissingSeparator { line: self.line });
            return;
        };
        if name.is_empty() {
            parsed
                .warnings
                .push(SnapshotWarning::EmptyName { line: self.line });
            return;
        }

        let device_id = match self.fields.get(Field::DeviceId.as_ref()) {
            Some(&id) if id == NO_DEVICE_ID => {
                debug!("line {}: '{}' has no device, skipped", self.line, name);
                return;
            }
            Some(&id) if !id.is_empty() => id,
            _ => {
                parsed.warnings.push(SnapshotWarning::MissingDeviceId {
                    line: self.line,
                    name: name.to_string(),
                });
                return;
            }
        };

        if let Some(previous) = parsed
            .mapping
            .insert(device_id.to_string(), name.to_string())
        {
            if previous != name {
                parsed.warnings.push(SnapshotWarning::Superseded {
                    line: self.line,
                    device_id: device_id.to_string(),
                    previous,
                    name: name.to_string(),
                });
            }
        }
    }
}

/// Parse snapshot text into a rename mapping, reporting skipped blocks.
///
/// Text before the first header is ignored. Inside a block, lines without
/// a `key: value` shape are ignored. A later block for the same device
/// replaces the name from an earlier one.
pub fn parse_with_warnings(text: &str) -> Parsed {
    let mut parsed = Parsed::default();
    let mut open: Option<OpenBlock<'_>> = None;

    for spanned in tokenize(text) {
        match spanned.token {
            Token::Header(header) => {
                if let Some(block) = open.take() {
                    block.finish(&mut parsed);
                }
                open = Some(OpenBlock {
                    line: spanned.line,
                    header,
                    fields: HashMap::new(),
                });
            }
            Token::Field { key, value } => {
                if let Some(block) = open.as_mut() {
                    block.fields.insert(key, value);
                }
            }
            Token::Blank | Token::Text(_) => {}
        }
    }
    if let Some(block) = open {
        block.finish(&mut parsed);
    }

    parsed
}

/// Parse snapshot text into a rename mapping
pub fn parse(text: &str) -> RenameMapping {
    parse_with_warnings(text).mapping
}
