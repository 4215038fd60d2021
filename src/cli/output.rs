use terminal_size::{terminal_size, Height, Width};

const HEADER_ON: &str = "\x1b[32m";
const RESET: &str = "\x1b[0m";

/// Render rows as an ASCII table no wider than `termw` visible columns.
/// An empty row set renders as `(no rows)` so callers never print a bare header.
pub fn render_table(columns: &[&str], rows: &[Vec<String>], termw: usize) -> String {
    if rows.is_empty() {
        return "(no rows)".to_string();
    }
    crate::tprintln!("[cli.output] rendering {} rows at width {}", rows.len(), termw);

    let mut widths: Vec<usize> = columns.iter().map(|c| visible_len(c).min(termw)).collect();
    for r in rows {
        for (i, cell) in r.iter().enumerate().take(columns.len()) {
            let w = visible_len(cell);
            if w > widths[i] { widths[i] = w.min(termw); }
        }
    }

    let sep = build_separator(&widths);
    let mut out = Vec::with_capacity(rows.len() + 5);
    out.push(fit_line_to_width(&sep, termw));
    out.push(fit_line_to_width(&build_header(columns, &widths), termw));
    out.push(fit_line_to_width(&sep, termw));
    for r in rows {
        out.push(fit_line_to_width(&build_row(r, &widths), termw));
    }
    out.push(fit_line_to_width(&sep, termw));
    out.push(format!("rows: {}", rows.len()));
    out.join("\n")
}

/// `label: value` lines with labels padded to a common width.
pub fn render_fields(fields: &[(&str, String)]) -> String {
    let pad = fields.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    fields
        .iter()
        .map(|(k, v)| format!("{:<pad$}  {}", format!("{}:", k), v, pad = pad + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn terminal_width() -> usize {
    match terminal_size() {
        Some((Width(w), Height(_))) if w > 20 => (w - 4) as usize,
        _ => 80,
    }
}

fn build_separator(widths: &[usize]) -> String {
    let mut s = String::from("+");
    for w in widths {
        s.push_str(&"-".repeat(*w + 2));
        s.push('+');
    }
    s
}

fn build_row(cells: &[String], widths: &[usize]) -> String {
    let mut s = String::from("|");
    for (i, w) in widths.iter().enumerate() {
        let cell = cells.get(i).map(|c| c.as_str()).unwrap_or("");
        let text = truncate(cell, *w);
        let pad = " ".repeat(w.saturating_sub(visible_len(&text)));
        s.push(' ');
        if is_numeric_like(cell) {
            s.push_str(&pad);
            s.push_str(&text);
        } else {
            s.push_str(&text);
            s.push_str(&pad);
        }
        s.push_str(" |");
    }
    s
}

// header names in green, padded by visible width
fn build_header(columns: &[&str], widths: &[usize]) -> String {
    let mut s = String::from("|");
    for (i, w) in widths.iter().enumerate() {
        let text = truncate(columns.get(i).copied().unwrap_or(""), *w);
        s.push(' ');
        s.push_str(HEADER_ON);
        s.push_str(&text);
        s.push_str(RESET);
        s.push_str(&" ".repeat(w.saturating_sub(visible_len(&text))));
        s.push_str(" |");
    }
    s
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max { return s.to_string(); }
    if max <= 1 { return "…".to_string(); }
    s.chars().take(max - 1).collect::<String>() + "…"
}

fn is_numeric_like(s: &str) -> bool {
    let st = s.trim();
    !st.is_empty()
        && st.chars().any(|c| c.is_ascii_digit())
        && st.chars().all(|c| c.is_ascii_digit() || "-+.".contains(c))
}

fn fit_line_to_width(s: &str, maxw: usize) -> String {
    if visible_len(s) <= maxw { return s.to_string(); }
    elide_middle(s, maxw)
}

/// Split into (is_escape, text) runs. Only CSI sequences (`ESC [ ... letter`) are recognised.
fn tokenize(s: &str) -> Vec<(bool, &str)> {
    let mut toks = Vec::new();
    let mut rest = s;
    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix("\x1b[") {
            let end = after.find(|c: char| c.is_ascii_alphabetic()).map(|i| i + 1).unwrap_or(after.len());
            let (esc, tail) = rest.split_at(2 + end);
            toks.push((true, esc));
            rest = tail;
        } else {
            let end = rest.find('\x1b').filter(|i| *i > 0).unwrap_or(rest.len());
            let (text, tail) = rest.split_at(end);
            toks.push((false, text));
            rest = tail;
        }
    }
    toks
}

fn visible_len(s: &str) -> usize {
    tokenize(s).into_iter().filter(|(esc, _)| !esc).map(|(_, t)| t.chars().count()).sum()
}

fn elide_middle(s: &str, maxw: usize) -> String {
    if maxw <= 3 { return "…".repeat(maxw.min(1)); }
    let budget = maxw - 3;
    let front_keep = budget / 2;
    let back_keep = budget - front_keep;
    let toks = tokenize(s);

    let mut front = String::new();
    let mut taken = 0usize;
    for (esc, text) in &toks {
        if *esc {
            front.push_str(text);
            continue;
        }
        let room = front_keep - taken;
        let n = text.chars().count();
        if n <= room {
            front.push_str(text);
            taken += n;
        } else {
            front.extend(text.chars().take(room));
            break;
        }
    }

    let mut back: Vec<String> = Vec::new();
    let mut taken = 0usize;
    for (esc, text) in toks.iter().rev() {
        if *esc {
            back.push(text.to_string());
            continue;
        }
        let room = back_keep - taken;
        let n = text.chars().count();
        if n <= room {
            back.push(text.to_string());
            taken += n;
        } else {
            back.push(text.chars().skip(n - room).collect());
            break;
        }
    }
    back.reverse();

    // reset in case an escape was cut off
    format!("{}...{}{}", front, back.concat(), RESET)
}
