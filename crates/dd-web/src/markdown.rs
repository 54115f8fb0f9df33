//! HTML to lightweight markdown conversion.
//!
//! Produces headings, list items, paragraphs, links and preformatted blocks.
//! Page chrome (scripts, styles, navigation, headers, footers) is dropped.

use scraper::{ElementRef, Html, Node, Selector};

const SKIPPED_TAGS: &[&str] = &[
    "script", "style", "nav", "footer", "header", "aside", "noscript", "svg", "form", "iframe",
    "template",
];

const BLOCK_TAGS: &[&str] = &[
    "p", "div", "section", "article", "main", "blockquote", "table", "tr", "ul", "ol", "dl",
    "figure", "figcaption", "dd", "dt", "body",
];

const MAIN_CONTENT_SELECTOR: &str = "main, article, .content, #content, .post, .entry";

/// Convert an HTML document to markdown.
///
/// Main-content containers are preferred over `body`. The page `<title>` is
/// prepended as a top-level heading when the content has none.
pub fn html_to_markdown(html: &str) -> String {
    let document = Html::parse_document(html);

    let mut out = String::new();
    let main_selector = Selector::parse(MAIN_CONTENT_SELECTOR).ok();
    let body_selector = Selector::parse("body").ok();

    let main_content: Vec<ElementRef> = main_selector
        .as_ref()
        .map(|s| document.select(s).collect())
        .unwrap_or_default();

    if !main_content.is_empty() {
        // Nested matches (article inside main) would render twice
        for el in outermost(main_content) {
            render_element(el, &mut out);
            ensure_blank_line(&mut out);
        }
    } else if let Some(body) = body_selector
        .as_ref()
        .and_then(|s| document.select(s).next())
    {
        render_element(body, &mut out);
    } else {
        render_element(document.root_element(), &mut out);
    }

    let mut markdown = tidy(&out);

    if !markdown.starts_with("# ") {
        if let Some(title) = page_title(&document) {
            markdown = if markdown.is_empty() {
                format!("# {}", title)
            } else {
                format!("# {}\n\n{}", title, markdown)
            };
        }
    }

    markdown
}

fn page_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    let title = document.select(&selector).next()?;
    let text = collapse_whitespace(&title.text().collect::<String>());
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn outermost(elements: Vec<ElementRef<'_>>) -> Vec<ElementRef<'_>> {
    let ids: Vec<_> = elements.iter().map(|e| e.id()).collect();
    elements
        .into_iter()
        .filter(|el| !el.ancestors().any(|a| ids.contains(&a.id())))
        .collect()
}

fn render_children(element: ElementRef, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => push_inline(out, text),
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    render_element(child_el, out);
                }
            }
            _ => {}
        }
    }
}

fn render_element(element: ElementRef, out: &mut String) {
    let tag = element.value().name();

    if SKIPPED_TAGS.contains(&tag) {
        return;
    }

    match tag {
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = tag[1..].parse::<usize>().unwrap_or(1);
            let text = inline_text(element);
            if !text.is_empty() {
                ensure_blank_line(out);
                out.push_str(&"#".repeat(level));
                out.push(' ');
                out.push_str(&text);
                out.push_str("\n\n");
            }
        }
        "li" => {
            ensure_newline(out);
            out.push_str("- ");
            render_children(element, out);
            ensure_newline(out);
        }
        "pre" => {
            let code: String = element.text().collect();
            let code = code.trim_matches('\n');
            if !code.trim().is_empty() {
                ensure_blank_line(out);
                out.push_str("```\n");
                out.push_str(code);
                out.push_str("\n```\n\n");
            }
        }
        "code" => {
            let text = inline_text(element);
            if !text.is_empty() {
                push_inline(out, &format!("`{}`", text));
            }
        }
        "a" => {
            let text = inline_text(element);
            let href = element.value().attr("href").unwrap_or_default();
            if text.is_empty() {
                return;
            }
            if href.starts_with("http://") || href.starts_with("https://") {
                push_inline(out, &format!("[{}]({})", text, href));
            } else {
                push_inline(out, &text);
            }
        }
        "br" => out.push('\n'),
        "hr" => {
            ensure_blank_line(out);
            out.push_str("---\n\n");
        }
        "td" | "th" => {
            render_children(element, out);
            out.push_str(" | ");
        }
        _ if BLOCK_TAGS.contains(&tag) => {
            ensure_blank_line(out);
            render_children(element, out);
            ensure_blank_line(out);
        }
        _ => render_children(element, out),
    }
}

/// Visible text of an element on one line, skipping chrome tags.
fn inline_text(element: ElementRef) -> String {
    let mut text = String::new();
    for node in element.descendants() {
        if let Some(t) = node.value().as_text() {
            let hidden = node.ancestors().any(|a| {
                a.value()
                    .as_element()
                    .map_or(false, |e| SKIPPED_TAGS.contains(&e.name()))
            });
            if !hidden {
                text.push_str(t);
                text.push(' ');
            }
        }
    }
    collapse_whitespace(&text)
}

fn push_inline(out: &mut String, text: &str) {
    let collapsed = collapse_whitespace(text);
    if collapsed.is_empty() {
        return;
    }
    let starts_with_space = text.starts_with(char::is_whitespace);
    if !out.is_empty()
        && !out.ends_with(&['\n', ' '][..])
        && (starts_with_space || needs_space(&collapsed))
    {
        out.push(' ');
    }
    out.push_str(&collapsed);
    if text.ends_with(char::is_whitespace) {
        out.push(' ');
    }
}

fn needs_space(text: &str) -> bool {
    !text.starts_with(&['.', ',', ';', ':', '!', '?', ')'][..])
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn ensure_newline(out: &mut String) {
    while out.ends_with(' ') {
        out.pop();
    }
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

fn ensure_blank_line(out: &mut String) {
    ensure_newline(out);
    if !out.is_empty() && !out.ends_with("\n\n") {
        out.push('\n');
    }
}

/// Trim trailing spaces per line and collapse runs of blank lines.
fn tidy(text: &str) -> String {
    let mut result = String::new();
    let mut blank_run = 0;
    let mut in_fence = false;

    for line in text.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
        }
        let line = if in_fence { line.trim_end() } else { line.trim() };
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        result.push_str(line);
        result.push('\n');
    }

    result.trim().to_string()
}
