//! Field-level coercion, checking and sanitising of raw input values.
//!
//! A [`FieldReader`] walks the fields of one record, collecting a
//! [`FieldDefect`] for every field that fails. Absent or blank fields are
//! `required` defects; present but malformed fields are `validity` defects.
//! Nothing here touches the store.

use serde_json::{Number, Value};
use song_store::{Pace, SongId};
use url::Url;

use crate::outcome::FieldDefect;

/// Longest accepted textual song id.
pub const MAX_SONG_ID_LEN: usize = 10;

/// A raw value after coercion to text.
#[derive(Debug, PartialEq)]
enum Raw {
    Absent,
    Text(String),
    Malformed,
}

fn number_text(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        // 10.0 reads as "10", like the clients that send it expect
        Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

fn coerce(value: Option<&Value>) -> Raw {
    let text = match value {
        None | Some(Value::Null) => return Raw::Absent,
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => number_text(n),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => return Raw::Malformed,
    };
    if text.is_empty() {
        Raw::Absent
    } else {
        Raw::Text(text)
    }
}

/// HTML-escape text destined for storage.
pub fn escape_markup(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '/' => out.push_str("&#x2F;"),
            '\\' => out.push_str("&#x5C;"),
            '`' => out.push_str("&#96;"),
            _ => out.push(c),
        }
    }
    out
}

fn parse_decimal(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_song_id(text: &str) -> Option<SongId> {
    if text.len() > MAX_SONG_ID_LEN || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse::<i64>().ok().map(SongId)
}

fn parse_pace(text: &str) -> Option<Pace> {
    match text.as_bytes() {
        [d] if d.is_ascii_digit() => Pace::new(d - b'0'),
        _ => None,
    }
}

fn parse_web_url(text: &str) -> Option<String> {
    let url = Url::parse(text).ok()?;
    let web = matches!(url.scheme(), "http" | "https") && url.host().is_some();
    web.then(|| text.to_string())
}

// ------------------------------------------------------------------ //
//  FieldReader                                                        //
// ------------------------------------------------------------------ //

/// Collects defects for the fields of `collection[index]`.
#[derive(Debug)]
pub struct FieldReader<'a> {
    collection: &'a str,
    index: usize,
    defects: Vec<FieldDefect>,
}

impl<'a> FieldReader<'a> {
    pub fn new(collection: &'a str, index: usize) -> Self {
        Self {
            collection,
            index,
            defects: Vec::new(),
        }
    }

    fn param(&self, field: &str) -> String {
        format!("{}[{}].{}", self.collection, self.index, field)
    }

    /// Shared flow: absent → required (unless optional), malformed or
    /// rejected by `parse` → validity. Optional fields treat blank as absent.
    fn read<T>(
        &mut self,
        field: &str,
        value: Option<&Value>,
        optional: bool,
        parse: impl FnOnce(&str) -> Option<T>,
    ) -> Option<T> {
        let value = value.filter(|v| !v.is_null());
        match coerce(value) {
            Raw::Absent if optional => None,
            Raw::Absent => {
                let param = self.param(field);
                self.defects.push(FieldDefect::required(param, value));
                None
            }
            Raw::Malformed => {
                let param = self.param(field);
                self.defects.push(FieldDefect::validity(param, value));
                None
            }
            Raw::Text(text) => {
                let parsed = parse(&text);
                if parsed.is_none() {
                    let param = self.param(field);
                    self.defects.push(FieldDefect::validity(param, value));
                }
                parsed
            }
        }
    }

    /// Required free text, trimmed and markup-escaped.
    pub fn text(&mut self, field: &str, value: Option<&Value>) -> Option<String> {
        self.read(field, value, false, |t| Some(escape_markup(t)))
    }

    pub fn decimal(&mut self, field: &str, value: Option<&Value>) -> Option<f64> {
        self.read(field, value, false, parse_decimal)
    }

    pub fn integer(&mut self, field: &str, value: Option<&Value>) -> Option<i32> {
        self.read(field, value, false, |t| t.parse().ok())
    }

    /// Optional integer; missing, `null` and blank all read as absent.
    pub fn optional_integer(&mut self, field: &str, value: Option<&Value>) -> Option<i32> {
        self.read(field, value, true, |t| t.parse().ok())
    }

    /// Optional absolute http(s) URL.
    pub fn optional_url(&mut self, field: &str, value: Option<&Value>) -> Option<String> {
        self.read(field, value, true, parse_web_url)
    }

    /// Numeric surrogate song id, at most [`MAX_SONG_ID_LEN`] digits.
    pub fn song_id(&mut self, field: &str, value: Option<&Value>) -> Option<SongId> {
        self.read(field, value, false, parse_song_id)
    }

    /// Single-digit pace category.
    pub fn pace(&mut self, field: &str, value: Option<&Value>) -> Option<Pace> {
        self.read(field, value, false, parse_pace)
    }

    pub fn is_clean(&self) -> bool {
        self.defects.is_empty()
    }

    pub fn into_defects(self) -> Vec<FieldDefect> {
        self.defects
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::DefectKind;
    use serde_json::json;

    fn kinds(reader: FieldReader<'_>) -> Vec<(String, DefectKind)> {
        reader
            .into_defects()
            .into_iter()
            .map(|d| (d.param, d.kind))
            .collect()
    }

    #[test]
    fn text_is_trimmed_and_escaped() {
        let mut r = FieldReader::new("songs", 0);
        let v = json!("  <b>Rock & Roll</b> ");
        assert_eq!(
            r.text("name", Some(&v)).as_deref(),
            Some("&lt;b&gt;Rock &amp; Roll&lt;&#x2F;b&gt;")
        );
        assert!(r.is_clean());
    }

    #[test]
    fn blank_or_missing_text_is_required() {
        let mut r = FieldReader::new("songs", 2);
        assert!(r.text("name", Some(&json!("   "))).is_none());
        assert!(r.text("album_genre", None).is_none());
        assert!(r.text("spotify_song_id", Some(&Value::Null)).is_none());
        assert_eq!(
            kinds(r),
            vec![
                ("songs[2].name".to_string(), DefectKind::Required),
                ("songs[2].album_genre".to_string(), DefectKind::Required),
                ("songs[2].spotify_song_id".to_string(), DefectKind::Required),
            ]
        );
    }

    #[test]
    fn objects_and_arrays_are_validity_defects() {
        let mut r = FieldReader::new("songs", 0);
        assert!(r.text("name", Some(&json!({"a": 1}))).is_none());
        assert!(r.decimal("tempo", Some(&json!([1.0]))).is_none());
        assert!(kinds(r).iter().all(|(_, k)| *k == DefectKind::Validity));
    }

    #[test]
    fn decimals_accept_numbers_and_numeric_strings() {
        let mut r = FieldReader::new("songs", 0);
        assert_eq!(r.decimal("tempo", Some(&json!(120.5))), Some(120.5));
        assert_eq!(r.decimal("loudness", Some(&json!(" -5.25 "))), Some(-5.25));
        assert_eq!(r.decimal("loudness", Some(&json!(0))), Some(0.0));
        assert!(r.is_clean());
    }

    #[test]
    fn decimals_never_coerce_garbage() {
        let mut r = FieldReader::new("songs", 0);
        assert!(r.decimal("tempo", Some(&json!("fast"))).is_none());
        assert!(r.decimal("tempo", Some(&json!("NaN"))).is_none());
        assert!(r.decimal("tempo", Some(&json!("inf"))).is_none());
        assert!(r.decimal("tempo", Some(&json!(true))).is_none());
        assert_eq!(r.into_defects().len(), 4);
    }

    #[test]
    fn integral_floats_read_as_integers() {
        let mut r = FieldReader::new("songs", 0);
        assert_eq!(r.integer("popularity", Some(&json!(10.0))), Some(10));
        assert_eq!(r.integer("popularity", Some(&json!("42"))), Some(42));
        assert!(r.integer("popularity", Some(&json!(10.5))).is_none());
        assert_eq!(
            kinds(r),
            vec![("songs[0].popularity".to_string(), DefectKind::Validity)]
        );
    }

    #[test]
    fn optional_fields_may_be_missing_or_null() {
        let mut r = FieldReader::new("songs", 0);
        assert!(r.optional_integer("duration", None).is_none());
        assert!(r.optional_url("img", Some(&Value::Null)).is_none());
        assert!(r.is_clean());

        assert!(r.optional_url("img", Some(&json!("not a url"))).is_none());
        assert!(r.optional_url("img", Some(&json!("ftp://host/a.png"))).is_none());
        assert_eq!(r.into_defects().len(), 2);
    }

    #[test]
    fn web_urls_are_kept_verbatim() {
        let mut r = FieldReader::new("songs", 0);
        let v = json!(" https://i.scdn.co/image/ab67 ");
        assert_eq!(
            r.optional_url("img", Some(&v)).as_deref(),
            Some("https://i.scdn.co/image/ab67")
        );
    }

    #[test]
    fn song_ids_are_bounded_digit_strings() {
        let mut r = FieldReader::new("songs", 1);
        assert_eq!(r.song_id("song_id", Some(&json!(17))), Some(SongId(17)));
        assert_eq!(r.song_id("song_id", Some(&json!(" 0042 "))), Some(SongId(42)));
        assert!(r.is_clean());

        assert!(r.song_id("song_id", Some(&json!("12345678901"))).is_none());
        assert!(r.song_id("song_id", Some(&json!("-3"))).is_none());
        assert!(r.song_id("song_id", Some(&json!("1.5"))).is_none());
        assert!(r.song_id("song_id", None).is_none());

        let defects = r.into_defects();
        assert_eq!(defects.len(), 4);
        assert_eq!(defects[3].kind, DefectKind::Required);
    }

    #[test]
    fn pace_is_one_digit() {
        let mut r = FieldReader::new("songs", 0);
        assert_eq!(r.pace("pace", Some(&json!(3))).map(Pace::get), Some(3));
        assert_eq!(r.pace("pace", Some(&json!("0"))).map(Pace::get), Some(0));
        assert!(r.pace("pace", Some(&json!(12))).is_none());
        assert!(r.pace("pace", Some(&json!("a"))).is_none());
        assert_eq!(r.into_defects().len(), 2);
    }

    #[test]
    fn escape_covers_every_markup_character() {
        assert_eq!(
            escape_markup(r#"&<>"'/\`"#),
            "&amp;&lt;&gt;&quot;&#x27;&#x2F;&#x5C;&#96;"
        );
        assert_eq!(escape_markup("plain"), "plain");
    }
}
