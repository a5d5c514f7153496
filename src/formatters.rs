use serde::Serialize;
use serde_json::Value;

/// Discord embed payload, shaped to the REST API's JSON.
#[derive(Debug, Clone, Serialize)]
pub struct Embed {
    pub title: String,
    pub color: u32,
    pub fields: Vec<EmbedField>,
    pub footer: EmbedFooter,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

const COLOR_ONLINE: u32 = 0x00ff00;
const COLOR_OFFLINE: u32 = 0xff0000;

/// Coerce a stats field to a number. The API is loose here: values arrive
/// as JSON numbers, numeric strings, or null depending on the player.
pub fn to_number(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Round to an integer and group digits in threes with `.` as separator.
pub fn format_thousands(value: f64) -> String {
    let n = value.round() as i64;
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    if n < 0 {
        format!("-{}", out)
    } else {
        out
    }
}

pub fn now_hms() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

fn stat_field(name: &str, stats: &Value, key: &str) -> EmbedField {
    EmbedField {
        name: name.to_string(),
        value: format_thousands(to_number(stats.get(key))),
        inline: true,
    }
}

pub fn status_embed(name: &str, online: bool, stats: &Value) -> Embed {
    let glyph = if online { "\u{1F7E2}" } else { "\u{1F534}" };
    Embed {
        title: format!("{} Player: {}", glyph, name),
        color: if online { COLOR_ONLINE } else { COLOR_OFFLINE },
        fields: vec![
            EmbedField {
                name: "Status".to_string(),
                value: if online { "ONLINE\u{2714}" } else { "OFFLINE\u{274C}" }.to_string(),
                inline: false,
            },
            stat_field("\u{1F4B0} Money", stats, "money"),
            stat_field("\u{1F6D2} Shop Spent", stats, "money_spent_on_shop"),
            stat_field("\u{1F4E6} Sell Earnings", stats, "money_made_from_sell"),
            stat_field("\u{1F52E} Shards", stats, "shards"),
        ],
        footer: EmbedFooter {
            text: format!("Last updated {}", now_hms()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_thousands_grouping() {
        assert_eq!(format_thousands(1234567.0), "1.234.567");
        assert_eq!(format_thousands(1000.0), "1.000");
        assert_eq!(format_thousands(999.0), "999");
        assert_eq!(format_thousands(0.0), "0");
    }

    #[test]
    fn test_format_thousands_rounds() {
        assert_eq!(format_thousands(1234.6), "1.235");
        assert_eq!(format_thousands(-1234567.0), "-1.234.567");
    }

    #[test]
    fn test_to_number_coercion() {
        assert_eq!(to_number(Some(&json!(500))), 500.0);
        assert_eq!(to_number(Some(&json!("12.5"))), 12.5);
        assert_eq!(to_number(Some(&json!(" 7 "))), 7.0);
        assert_eq!(to_number(Some(&json!(null))), 0.0);
        assert_eq!(to_number(Some(&json!("garbage"))), 0.0);
        assert_eq!(to_number(None), 0.0);
    }

    #[test]
    fn test_null_stat_renders_zero() {
        let stats = json!({ "money": null });
        let embed = status_embed("alice", true, &stats);
        assert_eq!(embed.fields[1].value, "0");
    }

    #[test]
    fn test_status_embed_online() {
        let stats = json!({
            "money": 500,
            "money_spent_on_shop": "1234567",
            "shards": 3,
        });
        let embed = status_embed("alice", true, &stats);
        assert!(embed.title.contains("Player: alice"));
        assert!(embed.title.starts_with('\u{1F7E2}'));
        assert_eq!(embed.color, COLOR_ONLINE);
        assert_eq!(embed.fields[0].value, "ONLINE\u{2714}");
        assert_eq!(embed.fields[1].value, "500");
        assert_eq!(embed.fields[2].value, "1.234.567");
        assert!(embed.footer.text.starts_with("Last updated "));
    }

    #[test]
    fn test_status_embed_offline() {
        let embed = status_embed("bob", false, &json!({}));
        assert!(embed.title.starts_with('\u{1F534}'));
        assert_eq!(embed.color, COLOR_OFFLINE);
        assert_eq!(embed.fields[0].value, "OFFLINE\u{274C}");
        assert_eq!(embed.fields[4].value, "0");
    }
}
