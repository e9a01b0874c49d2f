//! Standard markdown to Telegram MarkdownV2.
//!
//! [`to_markdown_v2`] parses the reply with `pulldown_cmark` and re-emits it with Telegram
//! entities: bold, italic, strikethrough, links, inline code and fenced blocks. Headings become
//! bold lines, list items get `•` or `N.` markers and block quotes keep their `>` prefix.
//! Special characters are escaped only inside text runs, so formatting survives.
//! [`split_markdown`] cuts a long reply on top-level block boundaries of the same parse.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag};

/// Telegram rejects longer message texts.
pub const TELEGRAM_MESSAGE_MAX_LENGTH: usize = 4096;

const SPECIAL: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
    '\\',
];
const FENCE: &str = "```";
const RULE: &str = "───";

fn options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options
}

fn is_special(c: char) -> bool {
    SPECIAL.contains(&c)
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        if is_special(c) {
            out.push('\\');
        }
        out.push(c);
    }
}

fn escape_code(code: &str, out: &mut String) {
    for c in code.chars() {
        if c == '`' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
}

fn escape_url(url: &str, out: &mut String) {
    for c in url.chars() {
        if c == ')' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
}

/// Open container, closed by the matching `End` event.
enum Open {
    Strong,
    Emphasis,
    Strikethrough,
    Link(String),
    CodeBlock,
    List,
    Item,
    /// Byte offset in the output where the quote starts.
    BlockQuote(usize),
    Other,
}

#[derive(Default)]
struct Renderer {
    out: String,
    open: Vec<Open>,
    /// Next number per open list; `None` for bullet lists.
    lists: Vec<Option<u64>>,
    bold: usize,
    italic: usize,
    strike: usize,
    in_code_block: bool,
    at_item_start: bool,
}

impl Renderer {
    /// Start of the output segment the current block belongs to.
    fn segment_start(&self) -> usize {
        self.open
            .iter()
            .rev()
            .find_map(|o| match o {
                Open::BlockQuote(start) => Some(*start),
                _ => None,
            })
            .unwrap_or(0)
    }

    fn ensure_newline(&mut self) {
        if self.out.len() > self.segment_start() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
    }

    fn start_block(&mut self) {
        if self.at_item_start {
            self.at_item_start = false;
            return;
        }
        if self.out.len() == self.segment_start() {
            return;
        }
        if self.lists.is_empty() {
            while !self.out.ends_with("\n\n") {
                self.out.push('\n');
            }
        } else {
            self.ensure_newline();
        }
    }

    fn toggle(&mut self, marker: char, opening: bool) {
        let depth = match marker {
            '*' => &mut self.bold,
            '_' => &mut self.italic,
            _ => &mut self.strike,
        };
        let edge = if opening {
            *depth += 1;
            *depth == 1
        } else {
            *depth = depth.saturating_sub(1);
            *depth == 0
        };
        if edge {
            self.out.push(marker);
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        let open = match tag {
            Tag::Paragraph => {
                self.start_block();
                Open::Other
            }
            Tag::Heading { .. } => {
                self.start_block();
                self.toggle('*', true);
                Open::Strong
            }
            Tag::BlockQuote(_) => {
                self.start_block();
                Open::BlockQuote(self.out.len())
            }
            Tag::CodeBlock(kind) => {
                self.start_block();
                self.out.push_str(FENCE);
                if let CodeBlockKind::Fenced(lang) = kind {
                    let lang = lang.split_whitespace().next().unwrap_or("");
                    escape_code(lang, &mut self.out);
                }
                self.out.push('\n');
                self.in_code_block = true;
                Open::CodeBlock
            }
            Tag::List(first) => {
                self.start_block();
                self.lists.push(first);
                Open::List
            }
            Tag::Item => {
                self.at_item_start = false;
                self.ensure_newline();
                let indent = "  ".repeat(self.lists.len().saturating_sub(1));
                self.out.push_str(&indent);
                match self.lists.last_mut() {
                    Some(Some(n)) => {
                        self.out.push_str(&format!("{}\\. ", n));
                        *n += 1;
                    }
                    _ => self.out.push_str("• "),
                }
                self.at_item_start = true;
                Open::Item
            }
            Tag::Strong => {
                self.toggle('*', true);
                Open::Strong
            }
            Tag::Emphasis => {
                self.toggle('_', true);
                Open::Emphasis
            }
            Tag::Strikethrough => {
                self.toggle('~', true);
                Open::Strikethrough
            }
            Tag::Link { dest_url, .. } | Tag::Image { dest_url, .. } => {
                self.out.push('[');
                Open::Link(dest_url.into_string())
            }
            _ => {
                self.start_block();
                Open::Other
            }
        };
        self.open.push(open);
    }

    fn end(&mut self) {
        match self.open.pop() {
            Some(Open::Strong) => self.toggle('*', false),
            Some(Open::Emphasis) => self.toggle('_', false),
            Some(Open::Strikethrough) => self.toggle('~', false),
            Some(Open::Link(url)) => {
                self.out.push_str("](");
                escape_url(&url, &mut self.out);
                self.out.push(')');
            }
            Some(Open::CodeBlock) => {
                self.ensure_newline();
                self.out.push_str(FENCE);
                self.in_code_block = false;
            }
            Some(Open::List) => {
                self.lists.pop();
            }
            Some(Open::BlockQuote(start)) => {
                let body = self.out.split_off(start);
                let quoted: Vec<String> = body
                    .trim_end_matches('\n')
                    .lines()
                    .map(|line| format!(">{}", line))
                    .collect();
                self.out.push_str(&quoted.join("\n"));
            }
            Some(Open::Item) => self.at_item_start = false,
            Some(Open::Other) | None => {}
        }
    }

    fn text(&mut self, text: &str) {
        self.at_item_start = false;
        if self.in_code_block {
            escape_code(text, &mut self.out);
        } else {
            escape_text(text, &mut self.out);
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(_) => self.end(),
            Event::Text(text) | Event::Html(text) | Event::InlineHtml(text) => self.text(&text),
            Event::Code(code) => {
                self.at_item_start = false;
                self.out.push('`');
                escape_code(&code, &mut self.out);
                self.out.push('`');
            }
            Event::SoftBreak | Event::HardBreak => self.out.push('\n'),
            Event::Rule => {
                self.start_block();
                self.out.push_str(RULE);
            }
            _ => {}
        }
    }
}

/// Converts standard markdown into Telegram MarkdownV2.
pub fn to_markdown_v2(text: &str) -> String {
    let mut renderer = Renderer::default();
    for event in Parser::new_ext(text, options()) {
        renderer.event(event);
    }
    renderer.out.trim_end_matches('\n').to_string()
}

fn rendered_width(text: &str) -> usize {
    to_markdown_v2(text).chars().count()
}

/// Upper bound of the rendered width of plain text, in chars.
fn escaped_width(text: &str) -> usize {
    text.chars().map(|c| if is_special(c) { 2 } else { 1 }).sum()
}

/// Source slices of the top-level blocks (paragraphs, headings, lists, quotes, code, rules).
fn blocks(text: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut depth = 0usize;
    for (event, range) in Parser::new_ext(text, options()).into_offset_iter() {
        match event {
            Event::Start(_) => {
                if depth == 0 {
                    blocks.push(text[range].trim_end());
                }
                depth += 1;
            }
            Event::End(_) => depth = depth.saturating_sub(1),
            _ if depth == 0 => blocks.push(text[range].trim_end()),
            _ => {}
        }
    }
    blocks.retain(|b| !b.is_empty());
    blocks
}

/// Splits an oversized fenced code block into smaller fenced blocks.
fn split_code_block(block: &str, limit: usize, chunks: &mut Vec<String>) -> bool {
    let mut lines = block.lines();
    let Some(header) = lines.next().filter(|l| l.trim_start().starts_with(FENCE)) else {
        return false;
    };
    let mut body: Vec<&str> = lines.collect();
    if body.last().is_some_and(|l| l.trim_start().starts_with(FENCE)) {
        body.pop();
    }
    let wrap = |lines: &[&str]| format!("{}\n{}\n{}", header, lines.join("\n"), FENCE);

    let mut current: Vec<&str> = Vec::new();
    for line in body {
        current.push(line);
        if current.len() > 1 && rendered_width(&wrap(&current)) > limit {
            current.pop();
            chunks.push(wrap(&current));
            current = vec![line];
        }
    }
    if !current.is_empty() {
        chunks.push(wrap(&current));
    }
    true
}

/// Splits an oversized block by lines, and an oversized line by chars.
fn split_block(block: &str, limit: usize, chunks: &mut Vec<String>) {
    if split_code_block(block, limit, chunks) {
        return;
    }
    let mut current = String::new();
    for line in block.lines() {
        let candidate = if current.is_empty() {
            line.to_string()
        } else {
            format!("{}\n{}", current, line)
        };
        if rendered_width(&candidate) <= limit {
            current = candidate;
            continue;
        }
        if !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }
        if rendered_width(line) <= limit {
            current.push_str(line);
            continue;
        }
        let mut width = 0;
        for c in line.chars() {
            let w = escaped_width(c.encode_utf8(&mut [0; 4]));
            if width + w > limit && !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                width = 0;
            }
            current.push(c);
            width += w;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
}

/// Splits markdown `text` into source chunks whose MarkdownV2 rendering fits `limit` chars.
///
/// Chunks break between top-level blocks. A block is only cut when it alone is too long:
/// code blocks by lines, each piece re-fenced; other blocks by lines, then by chars.
pub fn split_markdown(text: &str, limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for block in blocks(text) {
        let candidate = if current.is_empty() {
            block.to_string()
        } else {
            format!("{}\n\n{}", current, block)
        };
        if rendered_width(&candidate) <= limit {
            current = candidate;
            continue;
        }
        if !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }
        if rendered_width(block) <= limit {
            current = block.to_string();
        } else {
            split_block(block, limit, &mut chunks);
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
