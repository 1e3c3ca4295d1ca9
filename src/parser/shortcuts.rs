use regex::Regex;

use crate::catalog::ParameterCatalog;

/// Replace every registered shortcut that appears as a whole word with its
/// canonical name.
///
/// A word touching a `.` is already part of a qualified name and is left
/// alone, as is anything between single or double quotes. This makes the
/// substitution idempotent since every canonical name contains a `.`.
pub fn substitute_shortcuts(text: &str, catalog: &ParameterCatalog) -> String {
    let mut out = text.to_string();

    for (short, canonical) in catalog.shortcuts() {
        if !out.to_ascii_lowercase().contains(short.as_str()) {
            continue;
        }
        let Ok(re) = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(short))) else {
            continue;
        };

        let mut replaced = String::with_capacity(out.len());
        let mut last = 0;
        for m in re.find_iter(&out) {
            let before = out[..m.start()].chars().next_back();
            let after = out[m.end()..].chars().next();
            if before == Some('.') || after == Some('.') || in_quotes(&out, m.start()) {
                continue;
            }
            replaced.push_str(&out[last..m.start()]);
            replaced.push_str(canonical);
            last = m.end();
        }
        replaced.push_str(&out[last..]);
        out = replaced;
    }

    out
}

fn in_quotes(text: &str, index: usize) -> bool {
    let mut quote: Option<char> = None;
    for c in text[..index].chars() {
        match quote {
            Some(q) if c == q => quote = None,
            None if c == '\'' || c == '"' => quote = Some(c),
            _ => {}
        }
    }
    quote.is_some()
}
