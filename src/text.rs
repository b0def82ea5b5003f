use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

static RE_SPANISH_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d{1,2})\s+de\s+(\w+)\s+de\s+(\d{4})").unwrap());

static RE_FILENAME_FORBIDDEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[<>:"/\\|?*\x00-\x1f\x7f]"#).unwrap());

/// Truncate text to at most `max_chars` characters, appending `suffix` when cut
pub fn truncate_text(text: &str, max_chars: usize, suffix: &str) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let keep = max_chars.saturating_sub(suffix.chars().count());
    let mut truncated: String = text.chars().take(keep).collect();
    truncated.push_str(suffix);
    truncated
}

/// Parse the first long-form Spanish date ("15 de enero de 2025") found in `text`
pub fn parse_spanish_date(text: &str) -> Option<NaiveDate> {
    let caps = RE_SPANISH_DATE.captures(text)?;
    let day: u32 = caps[1].parse().ok()?;
    let month = spanish_month(&caps[2])?;
    let year: i32 = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn spanish_month(name: &str) -> Option<u32> {
    let month = match name.to_lowercase().as_str() {
        "enero" => 1,
        "febrero" => 2,
        "marzo" => 3,
        "abril" => 4,
        "mayo" => 5,
        "junio" => 6,
        "julio" => 7,
        "agosto" => 8,
        "septiembre" | "setiembre" => 9,
        "octubre" => 10,
        "noviembre" => 11,
        "diciembre" => 12,
        _ => return None,
    };
    Some(month)
}

/// Format an amount the Spanish way: `1.234,56 €`
pub fn format_currency(amount: f64) -> String {
    let cents = (amount * 100.0).round() as i64;
    let negative = cents < 0;
    let cents = cents.abs();
    let units = (cents / 100).to_string();
    let decimals = cents % 100;

    let mut grouped = String::with_capacity(units.len() + units.len() / 3);
    for (idx, digit) in units.chars().enumerate() {
        if idx > 0 && (units.len() - idx) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    format!("{}{},{:02} €", if negative { "-" } else { "" }, grouped, decimals)
}

/// Make a file name safe for the filesystem, keeping the extension when shortening
pub fn clean_filename(name: &str, max_chars: usize) -> String {
    let cleaned = RE_FILENAME_FORBIDDEN.replace_all(name, "").replace(' ', "_");

    if cleaned.chars().count() <= max_chars {
        return cleaned;
    }

    let (stem, ext) = match cleaned.rfind('.') {
        Some(idx) if idx > 0 => (&cleaned[..idx], &cleaned[idx..]),
        _ => (cleaned.as_str(), ""),
    };
    let keep = max_chars.saturating_sub(ext.chars().count());
    let mut shortened: String = stem.chars().take(keep).collect();
    shortened.push_str(ext);
    shortened
}
