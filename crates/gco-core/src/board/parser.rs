//! Line-classifying parser for `tasks.md`.
//!
//! Every line is first classified into a [`Line`] variant, then fed to an
//! accumulator whose only state is the task being built and the [`Region`]
//! (which multi-line field, if any, continuation lines belong to).
//!
//! # Block boundaries
//!
//! A task starts at a header line `## TASK-<n> [STATUS:<s>] [ASSIGNED:<@h>]`
//! and ends at the next `#`/`##` heading of any kind, or the end of input.
//! A `## TASK-` heading that does not fit the header grammar (for example an
//! unknown status) closes the previous task. Its block is kept line for line
//! as a [`RawBlock`] so a rewrite neither drops it nor reuses its ID.
//!
//! # Escapes
//!
//! Description and notes lines that would read as structure (a heading, a
//! `---` separator, a field label, the `(vacío)` placeholder) are written
//! with a leading `\`. The parser strips one leading `\` from every
//! continuation line of those two fields.
//!
//! # Placeholders
//!
//! `Ninguna` (dependencies) and `(vacío)` (notes, completion time, last sync)
//! are the writer's spelling of "empty" and parse back to empty strings.

use tracing::{debug, warn};

use super::labels;
use super::{Board, BoardMetadata, RawBlock};
use crate::model::task::{Criterion, Status, TASK_ID_PREFIX, Task, is_handle};

/// Leading marker on an escaped description or notes line.
pub(crate) const ESCAPE: char = '\\';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Description,
    Criteria,
    Dependencies,
    Notes,
    Completed,
    BlockedSince,
    BlockReason,
    GithubIssue,
}

const FIELDS: [(Field, &str); 9] = [
    (Field::Title, labels::TITLE),
    (Field::Description, labels::DESCRIPTION),
    (Field::Criteria, labels::CRITERIA),
    (Field::Dependencies, labels::DEPENDENCIES),
    (Field::Notes, labels::NOTES),
    (Field::Completed, labels::COMPLETED),
    (Field::BlockedSince, labels::BLOCKED_SINCE),
    (Field::BlockReason, labels::BLOCK_REASON),
    (Field::GithubIssue, labels::GITHUB_ISSUE),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Line<'a> {
    TaskHeader {
        id: &'a str,
        status: Status,
        assigned: &'a str,
    },
    MalformedTaskHeader,
    Heading,
    Field(Field, &'a str),
    Checkbox {
        done: bool,
        text: &'a str,
    },
    Separator,
    Blank,
    Text,
}

/// Which multi-line field continuation lines are appended to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Region {
    #[default]
    None,
    Description,
    Criteria,
    Notes,
}

fn classify(line: &str) -> Line<'_> {
    if line.trim().is_empty() {
        return Line::Blank;
    }
    if line.starts_with("## TASK-") {
        return parse_task_header(line).map_or(Line::MalformedTaskHeader, |(id, status, assigned)| {
            Line::TaskHeader {
                id,
                status,
                assigned,
            }
        });
    }
    if line.starts_with("# ") || line.starts_with("## ") {
        return Line::Heading;
    }
    if line.trim_end() == "---" {
        return Line::Separator;
    }
    for (field, label) in FIELDS {
        if let Some(rest) = line.strip_prefix(label) {
            return Line::Field(field, rest.trim());
        }
    }
    if let Some((done, text)) = parse_checkbox(line) {
        return Line::Checkbox { done, text };
    }
    Line::Text
}

fn parse_task_header(line: &str) -> Option<(&str, Status, &str)> {
    let rest = line.strip_prefix("## ")?;
    let digits = rest
        .strip_prefix(TASK_ID_PREFIX)?
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits == 0 {
        return None;
    }
    let (id, rest) = rest.split_at(TASK_ID_PREFIX.len() + digits);

    let rest = skip_required_space(rest)?.strip_prefix("[STATUS:")?;
    let (status, rest) = rest.split_once(']')?;
    let status = Status::from_label(status)?;

    let rest = skip_required_space(rest)?.strip_prefix("[ASSIGNED:")?;
    let (assigned, _) = rest.split_once(']')?;
    is_handle(assigned).then_some((id, status, assigned))
}

fn skip_required_space(s: &str) -> Option<&str> {
    let trimmed = s.trim_start();
    (trimmed.len() < s.len()).then_some(trimmed)
}

/// `true` if `line`, written as a description or notes continuation line,
/// would not read back as plain text.
pub(crate) fn needs_escape(line: &str) -> bool {
    line.starts_with(ESCAPE)
        || line.trim() == labels::EMPTY
        || !matches!(
            classify(line),
            Line::Text | Line::Checkbox { .. } | Line::Blank
        )
}

fn unescape(line: &str) -> &str {
    line.strip_prefix(ESCAPE).unwrap_or(line)
}

pub(crate) fn parse_checkbox(line: &str) -> Option<(bool, &str)> {
    let rest = line.strip_prefix("- [")?;
    let done = match rest.as_bytes().first()? {
        b' ' => false,
        b'x' => true,
        _ => return None,
    };
    let text = rest[1..].strip_prefix(']')?.trim();
    (!text.is_empty()).then_some((done, text))
}

fn parse_issue_number(value: &str) -> Option<u64> {
    let value = value.strip_prefix('#').unwrap_or(value);
    let len = value.bytes().take_while(u8::is_ascii_digit).count();
    value[..len].parse().ok()
}

fn unless_placeholder(value: &str, placeholder: &str) -> String {
    if value == placeholder {
        String::new()
    } else {
        value.to_string()
    }
}

fn push_continuation(target: &mut String, line: &str) {
    if target.is_empty() {
        if !line.trim().is_empty() {
            target.push_str(line);
        }
        return;
    }
    target.push('\n');
    target.push_str(line);
}

fn trim_trailing_blank_lines(value: &mut String) {
    let trimmed_len = value.trim_end().len();
    value.truncate(trimmed_len);
}

/// The writer closes every block with a blank line and `---`.
fn trim_block_tail(lines: &mut Vec<String>) {
    while lines
        .last()
        .is_some_and(|l| l.trim().is_empty() || l.trim_end() == "---")
    {
        lines.pop();
    }
}

fn raw_block(header: &str) -> RawBlock {
    let id = header
        .strip_prefix("## ")
        .and_then(|rest| rest.split_whitespace().next())
        .unwrap_or_default();
    RawBlock {
        id: id.to_string(),
        lines: vec![header.to_string()],
    }
}

#[derive(Default)]
struct Accumulator {
    tasks: Vec<Task>,
    unreadable: Vec<RawBlock>,
    current: Option<Task>,
    raw: Option<RawBlock>,
    region: Region,
}

impl Accumulator {
    fn in_block(&self) -> bool {
        self.current.is_some() || self.raw.is_some()
    }

    fn finish_task(&mut self) {
        if let Some(mut task) = self.current.take() {
            trim_trailing_blank_lines(&mut task.description);
            trim_trailing_blank_lines(&mut task.notes);
            self.tasks.push(task);
        }
        if let Some(mut block) = self.raw.take() {
            trim_block_tail(&mut block.lines);
            self.unreadable.push(block);
        }
        self.region = Region::None;
    }

    fn feed(&mut self, raw: &str, line: Line<'_>) {
        match line {
            Line::TaskHeader {
                id,
                status,
                assigned,
            } => {
                self.finish_task();
                let mut task = Task::new(id, "");
                task.status = status;
                task.assigned = assigned.to_string();
                self.current = Some(task);
            }
            Line::MalformedTaskHeader => {
                self.finish_task();
                warn!(line = raw, "keeping task block with unreadable header as is");
                self.raw = Some(raw_block(raw));
            }
            Line::Heading => self.finish_task(),
            _ => {
                if let Some(block) = self.raw.as_mut() {
                    block.lines.push(raw.to_string());
                } else if let Some(task) = self.current.as_mut() {
                    self.region = apply_line(task, self.region, raw, line);
                }
            }
        }
    }
}

fn apply_line(task: &mut Task, region: Region, raw: &str, line: Line<'_>) -> Region {
    match line {
        Line::Field(field, value) => apply_field(task, field, value, raw),
        Line::Checkbox { done, text } if region == Region::Criteria => {
            task.criteria.push(Criterion {
                done,
                text: text.to_string(),
            });
            region
        }
        Line::Separator => Region::None,
        Line::Blank => {
            match region {
                Region::Description => push_continuation(&mut task.description, ""),
                Region::Notes => push_continuation(&mut task.notes, ""),
                Region::Criteria | Region::None => {}
            }
            region
        }
        Line::Text | Line::Checkbox { .. } => {
            match region {
                Region::Description => push_continuation(&mut task.description, unescape(raw)),
                Region::Notes if raw.trim() == labels::EMPTY => {}
                Region::Notes => push_continuation(&mut task.notes, unescape(raw)),
                Region::Criteria | Region::None => task.extra_lines.push(raw.to_string()),
            }
            region
        }
        Line::TaskHeader { .. } | Line::MalformedTaskHeader | Line::Heading => region,
    }
}

fn apply_field(task: &mut Task, field: Field, value: &str, raw: &str) -> Region {
    match field {
        Field::Title => {
            task.title = value.to_string();
            Region::None
        }
        Field::Description => {
            task.description = value.to_string();
            Region::Description
        }
        Field::Criteria => Region::Criteria,
        Field::Dependencies => {
            task.dependencies = unless_placeholder(value, labels::NO_DEPENDENCIES);
            Region::None
        }
        Field::Notes => {
            task.notes = unless_placeholder(value, labels::EMPTY);
            Region::Notes
        }
        Field::Completed => {
            task.completed = unless_placeholder(value, labels::EMPTY);
            Region::None
        }
        Field::BlockedSince => {
            task.blocked_since = value.to_string();
            Region::None
        }
        Field::BlockReason => {
            task.block_reason = value.to_string();
            Region::None
        }
        Field::GithubIssue => {
            match parse_issue_number(value) {
                Some(number) => task.github_issue = Some(number),
                None => task.extra_lines.push(raw.to_string()),
            }
            Region::None
        }
    }
}

fn parse_metadata_line(line: &str, metadata: &mut BoardMetadata) {
    let Some(body) = line.strip_prefix('>') else {
        return;
    };
    let body = body.trim();

    if let Some(value) = body.strip_prefix(labels::LAST_SYNC) {
        let value = value.trim();
        metadata.last_sync = (!value.is_empty() && value != labels::EMPTY).then(|| value.to_string());
        return;
    }

    if !body.starts_with(labels::TOTAL) {
        return;
    }
    for part in body.split('|') {
        let part = part.trim();
        let counters = [
            (labels::TOTAL, &mut metadata.total),
            (labels::COMPLETED_COUNT, &mut metadata.completed),
            (labels::IN_PROGRESS_COUNT, &mut metadata.in_progress),
            (labels::PENDING_COUNT, &mut metadata.pending),
        ];
        for (label, slot) in counters {
            if let Some(value) = part.strip_prefix(label) {
                *slot = value.trim().parse().ok();
            }
        }
    }
}

/// Parse a board document. Never fails; see the module docs for how
/// unrecognized content is handled.
#[must_use]
pub fn parse_board(content: &str) -> Board {
    let mut acc = Accumulator::default();
    let mut metadata = BoardMetadata::default();

    for raw in content.lines() {
        let line = classify(raw);
        if !acc.in_block() && line == Line::Text {
            parse_metadata_line(raw, &mut metadata);
        }
        acc.feed(raw, line);
    }
    acc.finish_task();

    debug!(
        tasks = acc.tasks.len(),
        unreadable = acc.unreadable.len(),
        "parsed task board"
    );
    Board {
        tasks: acc.tasks,
        unreadable: acc.unreadable,
        metadata,
    }
}
