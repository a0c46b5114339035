//! HTML parsing via `scraper`

use super::normalize_whitespace;
use crate::error::ConvertError;
use finrag_domain::{DocItem, ItemLabel};
use scraper::{ElementRef, Html, Selector};

const BLOCK_SELECTOR: &str = "title, h1, h2, h3, h4, h5, h6, p, li, pre, table";

/// Elements whose text is already captured by an enclosing block
const CONTAINERS: [&str; 3] = ["li", "pre", "table"];

pub(crate) fn parse(source: &str) -> Result<Vec<DocItem>, ConvertError> {
    let document = Html::parse_document(source);
    let blocks = selector(BLOCK_SELECTOR)?;

    let mut items = Vec::new();
    for element in document.select(&blocks) {
        if inside_container(&element) {
            continue;
        }

        let name = element.value().name();
        let item = match name {
            "title" => DocItem::title(element_text(&element)),
            "p" => DocItem::paragraph(element_text(&element)),
            "li" => DocItem::body(ItemLabel::ListItem, element_text(&element)),
            "pre" => DocItem::body(
                ItemLabel::Code,
                element.text().collect::<String>().trim_end().to_string(),
            ),
            "table" => DocItem::body(ItemLabel::Table, table_text(&element)?),
            heading => match heading.strip_prefix('h').and_then(|n| n.parse::<u8>().ok()) {
                Some(level) => DocItem::heading(element_text(&element), level),
                None => continue,
            },
        };
        if !item.text.trim().is_empty() {
            items.push(item);
        }
    }

    // pages that keep their text outside block elements
    if items.iter().all(|i| i.label.is_heading()) {
        let body = selector("body")?;
        if let Some(body) = document.select(&body).next() {
            let text = element_text(&body);
            if !text.is_empty() {
                items.push(DocItem::paragraph(text));
            }
        }
    }

    Ok(items)
}

fn selector(css: &str) -> Result<Selector, ConvertError> {
    Selector::parse(css).map_err(|e| ConvertError::Conversion(format!("invalid selector '{}': {}", css, e)))
}

fn element_text(element: &ElementRef<'_>) -> String {
    normalize_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

fn inside_container(element: &ElementRef<'_>) -> bool {
    element.ancestors().any(|node| {
        node.value()
            .as_element()
            .is_some_and(|e| CONTAINERS.contains(&e.name()))
    })
}

fn table_text(table: &ElementRef<'_>) -> Result<String, ConvertError> {
    let row_selector = selector("tr")?;
    let cell_selector = selector("th, td")?;

    let rows: Vec<String> = table
        .select(&row_selector)
        .map(|row| {
            row.select(&cell_selector)
                .map(|cell| element_text(&cell))
                .collect::<Vec<_>>()
                .join(" | ")
        })
        .filter(|row| !row.trim().is_empty())
        .collect();
    Ok(rows.join("\n"))
}
