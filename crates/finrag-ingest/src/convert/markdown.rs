//! Markdown parsing via the `pulldown-cmark` event stream

use super::normalize_whitespace;
use finrag_domain::{DocItem, ItemLabel};
use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};

#[derive(Default)]
struct State {
    items: Vec<DocItem>,
    buffer: String,
    list_depth: usize,
    in_code: bool,
    table_rows: Vec<String>,
    table_cells: Vec<String>,
}

impl State {
    fn take_buffer(&mut self) -> String {
        std::mem::take(&mut self.buffer)
    }

    fn emit(&mut self, label: ItemLabel) {
        let raw = self.take_buffer();
        let text = if label == ItemLabel::Code {
            raw.trim_end().to_string()
        } else {
            normalize_whitespace(&raw)
        };
        if !text.trim().is_empty() {
            self.items.push(DocItem::body(label, text));
        }
    }
}

pub(crate) fn parse(source: &str) -> Vec<DocItem> {
    let mut state = State::default();
    let parser = Parser::new_ext(source, Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH);

    for event in parser {
        match event {
            Event::Start(Tag::Heading { .. }) => {
                state.buffer.clear();
            }
            Event::End(TagEnd::Heading(level)) => {
                let text = normalize_whitespace(&state.take_buffer());
                if !text.is_empty() {
                    state.items.push(DocItem::heading(text, level as u8));
                }
            }
            Event::Start(Tag::Paragraph) if state.list_depth == 0 => {
                state.buffer.clear();
            }
            Event::End(TagEnd::Paragraph) => {
                if state.list_depth == 0 {
                    state.emit(ItemLabel::Paragraph);
                } else {
                    state.buffer.push(' ');
                }
            }
            Event::Start(Tag::Item) => {
                // a nested list closes the parent item's own text
                if state.list_depth > 0 {
                    state.emit(ItemLabel::ListItem);
                }
                state.list_depth += 1;
            }
            Event::End(TagEnd::Item) => {
                state.emit(ItemLabel::ListItem);
                state.list_depth = state.list_depth.saturating_sub(1);
            }
            Event::Start(Tag::CodeBlock(_)) => {
                state.buffer.clear();
                state.in_code = true;
            }
            Event::End(TagEnd::CodeBlock) => {
                state.in_code = false;
                state.emit(ItemLabel::Code);
            }
            Event::Start(Tag::Table(_)) => {
                state.table_rows.clear();
            }
            Event::End(TagEnd::TableCell) => {
                let cell = normalize_whitespace(&state.take_buffer());
                state.table_cells.push(cell);
            }
            Event::End(TagEnd::TableHead) | Event::End(TagEnd::TableRow) => {
                let row = std::mem::take(&mut state.table_cells).join(" | ");
                state.table_rows.push(row);
            }
            Event::End(TagEnd::Table) => {
                let table = std::mem::take(&mut state.table_rows).join("\n");
                if !table.trim().is_empty() {
                    state.items.push(DocItem::body(ItemLabel::Table, table));
                }
            }
            Event::Text(text) | Event::Code(text) => state.buffer.push_str(&text),
            Event::SoftBreak | Event::HardBreak => {
                state.buffer.push(if state.in_code { '\n' } else { ' ' });
            }
            _ => {}
        }
    }

    // text left over from an unterminated construct
    if !state.buffer.trim().is_empty() {
        state.emit(ItemLabel::Paragraph);
    }
    state.items
}
