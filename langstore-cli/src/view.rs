use langstore::TranslationStore;
use unicode_width::UnicodeWidthChar;

const MAX_WIDTH: usize = 50;

/// Print one `location<TAB>value` line per unit.
pub fn print_view(store: &TranslationStore, full: bool) {
    for line in view_lines(store, full) {
        println!("{}", line);
    }
}

pub fn view_lines(store: &TranslationStore, full: bool) -> Vec<String> {
    store
        .units()
        .iter()
        .map(|unit| {
            let value = unit.target().to_string().replace('\n', "\\n");
            let value = if full { value } else { truncate(&value, MAX_WIDTH) };
            format!("{}\t{}", unit.id, value)
        })
        .collect()
}

/// Cuts `value` to at most `width` terminal columns, marking the cut with `...`.
fn truncate(value: &str, width: usize) -> String {
    let mut used = 0;
    for (offset, c) in value.char_indices() {
        used += c.width().unwrap_or(0);
        if used > width {
            return format!("{}...", &value[..offset]);
        }
    }
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_counts_columns() {
        assert_eq!(truncate("hello", 5), "hello");
        assert_eq!(truncate("hello!", 5), "hello...");
        assert_eq!(truncate("你好世界", 4), "你好...");
    }
}
