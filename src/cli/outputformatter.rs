use serde_json::Value;

use terminal_size::{terminal_size, Width};

// Render a list of records (enrollments, rooms, progress, profiles) as an
// ASCII table sized to the terminal. Returns true if a table was printed;
// false means the caller should fall back to pretty JSON.
pub fn print_records(val: &Value) -> bool {
    // Honor env override to force JSON output
    if std::env::var("BACLI_OUTPUT").map(|v| v.eq_ignore_ascii_case("json")).unwrap_or(false) {
        return false;
    }

    let Some((cols, rows)) = tabulate(val) else { return false };
    if rows.is_empty() {
        return false;
    }

    let termw = get_terminal_width();
    crate::tprintln!("[cli.outputformatter] detected terminal width={} columns", termw);

    let mut widths: Vec<usize> = cols.iter().map(|s| s.chars().count().min(termw)).collect();
    for r in &rows {
        for (i, cell) in r.iter().enumerate().take(cols.len()) {
            let w = display_len(cell);
            if w > widths[i] { widths[i] = w.min(termw); }
        }
    }

    let sep = build_separator(&widths);
    println!("{}", fit_line_to_width(&sep, termw));
    println!("{}", fit_line_to_width(&build_row(&cols, &widths), termw));
    println!("{}", fit_line_to_width(&sep, termw));
    for r in &rows {
        println!("{}", fit_line_to_width(&build_row(r, &widths), termw));
    }
    println!("{}", fit_line_to_width(&sep, termw));
    println!("rows: {}, cols: {}", rows.len(), cols.len());

    true
}

// Turn a top-level array into (columns, rows).
// - Objects: columns are the union of keys across all records (sorted).
// - Scalars: a single column named "value".
fn tabulate(val: &Value) -> Option<(Vec<String>, Vec<Vec<String>>)> {
    let Value::Array(arr) = val else { return None };
    if arr.is_empty() {
        return None;
    }
    let mut all_keys: Vec<String> = Vec::new();
    let mut is_all_objects = true;
    for el in arr {
        if let Value::Object(map) = el {
            for k in map.keys() {
                if !all_keys.contains(k) { all_keys.push(k.clone()); }
            }
        } else {
            is_all_objects = false;
        }
    }
    if is_all_objects && !all_keys.is_empty() {
        all_keys.sort();
        let rows = arr
            .iter()
            .filter_map(|el| match el {
                Value::Object(map) => Some(
                    all_keys
                        .iter()
                        .map(|k| to_cell_string(map.get(k).unwrap_or(&Value::Null)))
                        .collect::<Vec<String>>(),
                ),
                _ => None,
            })
            .collect();
        Some((all_keys, rows))
    } else {
        let rows = arr.iter().map(|el| vec![to_cell_string(el)]).collect();
        Some((vec!["value".to_string()], rows))
    }
}

fn to_cell_string(v: &Value) -> String {
    match v {
        Value::Null => String::from("NULL"),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        // keep nested objects/arrays compact JSON
        other => other.to_string(),
    }
}

fn get_terminal_width() -> usize {
    match terminal_size() {
        Some((Width(w), _)) => (w as usize).max(20),
        None => 120,
    }
}

fn display_len(s: &str) -> usize { s.chars().count() }

fn build_separator(widths: &[usize]) -> String {
    let mut s = String::new();
    s.push('+');
    for w in widths {
        s.push_str(&"-".repeat(*w + 2));
        s.push('+');
    }
    s
}

fn build_row(cells: &[String], widths: &[usize]) -> String {
    let mut s = String::new();
    s.push('|');
    for (i, w) in widths.iter().enumerate() {
        let cell = cells.get(i).cloned().unwrap_or_default();
        let text = truncate(&cell, *w);
        let pad = w.saturating_sub(display_len(&text));
        s.push(' ');
        if is_numeric_like(&cell) {
            s.push_str(&" ".repeat(pad));
            s.push_str(&text);
        } else {
            s.push_str(&text);
            s.push_str(&" ".repeat(pad));
        }
        s.push(' ');
        s.push('|');
    }
    s
}

fn fit_line_to_width(line: &str, max: usize) -> String {
    if display_len(line) <= max { line.to_string() } else { truncate(line, max) }
}

fn truncate(s: &str, max: usize) -> String {
    let len = s.chars().count();
    if len <= max { return s.to_string(); }
    if max <= 1 { return "…".to_string(); }
    let take = max - 1;
    s.chars().take(take).collect::<String>() + "…"
}

fn is_numeric_like(s: &str) -> bool {
    // crude detection for aligning numbers to the right
    let st = s.trim();
    if st.is_empty() { return false; }
    let mut has_digit = false;
    for ch in st.chars() {
        if ch.is_ascii_digit() { has_digit = true; continue; }
        if ".-+eE,_".contains(ch) { continue; }
        return false;
    }
    has_digit
}
