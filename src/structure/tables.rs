//! Table flattening helpers.

/// Flatten a table into a pipe-delimited text rendering.
///
/// Prefers the HTML rendering produced by the partitioner: each `<tr>` becomes
/// one `| cell | cell |` line and all other markup is dropped. Falls back to
/// the plain-text rendering when no usable HTML is available.
pub fn flatten_table(html: Option<&str>, fallback_text: &str) -> String {
    if let Some(html) = html {
        let flattened = flatten_html_table(html);
        if !flattened.trim().is_empty() {
            return flattened;
        }
    }
    fallback_text.trim().to_string()
}

fn flatten_html_table(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut chars = html.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '<' {
            out.push(c);
            continue;
        }

        let mut tag = String::new();
        for inner in chars.by_ref() {
            if inner == '>' {
                break;
            }
            tag.push(inner);
        }

        // Tag name only; attributes such as colspan are irrelevant here.
        let name = tag
            .trim_start_matches('/')
            .split_whitespace()
            .next()
            .unwrap_or("")
            .to_lowercase();
        let closing = tag.starts_with('/');

        match (name.as_str(), closing) {
            ("tr", false) => out.push_str("\n| "),
            ("tr", true) => (),
            ("td" | "th", false) => (),
            ("td" | "th", true) => out.push_str(" | "),
            _ => (),
        }
    }

    let lines: Vec<String> = out
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect();
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_table_flattens_to_pipe_rows() {
        let html = "<table><tr><td>City</td><td>Population</td></tr>\
                    <tr><td>Lisbon</td><td>545000</td></tr></table>";
        let flattened = flatten_table(Some(html), "unused");
        assert_eq!(flattened, "| City | Population |\n| Lisbon | 545000 |");
    }

    #[test]
    fn attributes_and_nested_sections_are_ignored() {
        let html = "<table class=\"wide\"><thead><tr><th colspan=\"2\">Header</th></tr></thead>\
                    <tbody><tr><td>a</td><td>b</td></tr></tbody></table>";
        let flattened = flatten_table(Some(html), "unused");
        assert_eq!(flattened, "| Header |\n| a | b |");
    }

    #[test]
    fn empty_html_falls_back_to_plain_text() {
        assert_eq!(flatten_table(Some("<table></table>"), "a  b"), "a  b");
        assert_eq!(flatten_table(None, " plain rendering "), "plain rendering");
    }
}
