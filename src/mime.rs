use chrono::{Local, NaiveDate, NaiveDateTime};
use mail_parser::{HeaderName, Message, MessageParser, MimeHeaders, PartType};

use crate::models::{AttachmentData, Candidate, DateMode};

/// Parse a fetched message far enough to decide whether it is a match.
///
/// Fails when the bytes are not a message or when the `Date` header is
/// missing or unparsable; the error carries the raw header for reporting.
pub fn parse_candidate(id: u32, raw: Vec<u8>, mode: DateMode) -> Result<Candidate, String> {
    let (timestamp, date, subject) = {
        let message = MessageParser::default()
            .parse(&raw)
            .ok_or_else(|| format!("message {id} could not be parsed"))?;

        let date = message
            .header_raw(HeaderName::Date)
            .map(|d| d.trim().to_string());
        let timestamp = match message.date() {
            Some(d) => to_timestamp(d, mode),
            None => date.as_deref().and_then(parse_zoneless),
        }
        .ok_or_else(|| {
            format!(
                "Could not parse date: {}",
                date.as_deref().unwrap_or("<missing>")
            )
        })?;
        let subject = message.subject().unwrap_or_default().to_string();

        (timestamp, date.unwrap_or_default(), subject)
    };

    Ok(Candidate {
        id,
        timestamp,
        date,
        subject,
        raw,
    })
}

fn to_timestamp(date: &mail_parser::DateTime, mode: DateMode) -> Option<NaiveDateTime> {
    match mode {
        DateMode::Naive => NaiveDate::from_ymd_opt(
            i32::from(date.year),
            u32::from(date.month),
            u32::from(date.day),
        )?
        .and_hms_opt(
            u32::from(date.hour),
            u32::from(date.minute),
            u32::from(date.second),
        ),
        DateMode::Local => chrono::DateTime::from_timestamp(date.to_timestamp(), 0)
            .map(|utc| utc.with_timezone(&Local).naive_local()),
    }
}

/// `Date` values without a zone are already local wall-clock time.
const ZONELESS_FORMATS: [&str; 4] = [
    "%a, %d %b %Y %H:%M:%S",
    "%d %b %Y %H:%M:%S",
    "%a, %d %b %Y %H:%M",
    "%d %b %Y %H:%M",
];

fn parse_zoneless(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    ZONELESS_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}

/// Walk the MIME tree depth-first and collect every image part that carries a
/// `Content-Disposition` header and a filename.
pub fn image_attachments(raw: &[u8]) -> Result<Vec<AttachmentData>, String> {
    let message = MessageParser::default()
        .parse(raw)
        .ok_or("Failed to parse message")?;
    let mut found = Vec::new();
    walk(&message, 0, &mut found);
    Ok(found)
}

fn walk(message: &Message<'_>, part_id: usize, found: &mut Vec<AttachmentData>) {
    let Some(part) = message.parts.get(part_id) else {
        return;
    };
    match &part.body {
        PartType::Multipart(children) => {
            for child in children {
                walk(message, *child as usize, found);
            }
        }
        PartType::Message(inner) => walk(inner, 0, found),
        _ => {
            if let Some(attachment) = image_part(part) {
                found.push(attachment);
            }
        }
    }
}

fn image_part(part: &mail_parser::MessagePart<'_>) -> Option<AttachmentData> {
    let (ctype, subtype) = match part.content_type() {
        Some(ct) => (
            ct.ctype().to_ascii_lowercase(),
            ct.subtype().map(str::to_ascii_lowercase),
        ),
        None => ("text".to_string(), Some("plain".to_string())),
    };
    if ctype == "multipart" {
        return None;
    }
    // An empty `Content-Disposition:` still counts as present.
    if !part
        .headers
        .iter()
        .any(|h| matches!(h.name, HeaderName::ContentDisposition))
    {
        return None;
    }
    if ctype != "image" {
        return None;
    }
    let mime_type = format!("{ctype}/{}", subtype.unwrap_or_default());

    let Some(name) = part.attachment_name() else {
        log::debug!("Skipping {mime_type} part without a filename");
        return None;
    };

    Some(AttachmentData {
        filename: name.to_string(),
        mime_type,
        data: part.contents().to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_IMAGES: &[u8] = include_bytes!("../tests/fixtures/two_images.eml");
    const INLINE_PARTS: &[u8] = include_bytes!("../tests/fixtures/inline_parts.eml");
    const NESTED: &[u8] = include_bytes!("../tests/fixtures/nested.eml");
    const NO_DATE: &[u8] = include_bytes!("../tests/fixtures/no_date.eml");
    const ZONELESS: &[u8] = include_bytes!("../tests/fixtures/zoneless_date.eml");
    const ODD_NAMES: &[u8] = include_bytes!("../tests/fixtures/odd_names.eml");

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn names(attachments: &[AttachmentData]) -> Vec<&str> {
        attachments.iter().map(|a| a.filename.as_str()).collect()
    }

    // ── parse_candidate ──────────────────────────────────────────

    #[test]
    fn candidate_keeps_wall_clock_time_in_naive_mode() {
        let c = parse_candidate(7, TWO_IMAGES.to_vec(), DateMode::Naive).unwrap();
        assert_eq!(c.id, 7);
        assert_eq!(c.timestamp, at(12, 25, 0));
        assert_eq!(c.date, "Tue, 05 Mar 2024 12:25:00 +0100");
    }

    #[test]
    fn candidate_converts_to_local_zone_in_local_mode() {
        let c = parse_candidate(1, TWO_IMAGES.to_vec(), DateMode::Local).unwrap();
        let expected = chrono::DateTime::parse_from_rfc2822("Tue, 05 Mar 2024 12:25:00 +0100")
            .unwrap()
            .with_timezone(&Local)
            .naive_local();
        assert_eq!(c.timestamp, expected);
    }

    #[test]
    fn candidate_subject_joins_mixed_encodings() {
        let c = parse_candidate(1, TWO_IMAGES.to_vec(), DateMode::Naive).unwrap();
        assert!(c.subject.starts_with("IBM wins the bid"), "{}", c.subject);
        assert!(c.subject.contains('—'));
        assert!(c.subject.contains("café edition"));
    }

    fn with_headers(date: &str, subject: &str) -> Vec<u8> {
        format!("Date: {date}\r\nSubject: {subject}\r\n\r\nbody\r\n").into_bytes()
    }

    #[test]
    fn plain_ascii_subject_is_unchanged() {
        let raw = with_headers("Tue, 05 Mar 2024 12:25:00 +0000", "Quarterly report");
        let c = parse_candidate(1, raw, DateMode::Naive).unwrap();
        assert_eq!(c.subject, "Quarterly report");
    }

    #[test]
    fn subject_decodes_latin1_word() {
        let raw = with_headers(
            "Tue, 05 Mar 2024 12:25:00 +0000",
            "=?ISO-8859-1?Q?Andr=E9?= Pirard",
        );
        let c = parse_candidate(1, raw, DateMode::Naive).unwrap();
        assert_eq!(c.subject, "André Pirard");
    }

    #[test]
    fn subject_decodes_base64_word_followed_by_text() {
        let raw = with_headers("Tue, 05 Mar 2024 12:25:00 +0000", "=?UTF-8?B?SUJN?= wins");
        let c = parse_candidate(1, raw, DateMode::Naive).unwrap();
        assert_eq!(c.subject, "IBM wins");
    }

    #[test]
    fn zoneless_date_is_read_as_local_wall_clock() {
        for mode in [DateMode::Naive, DateMode::Local] {
            let c = parse_candidate(1, ZONELESS.to_vec(), mode).unwrap();
            assert_eq!(c.timestamp, at(12, 26, 0));
            assert_eq!(c.date, "Tue, 05 Mar 2024 12:26:00");
        }
        let raw = with_headers("5 Mar 2024 12:25", "IBM wins");
        let c = parse_candidate(1, raw, DateMode::Naive).unwrap();
        assert_eq!(c.timestamp, at(12, 25, 0));
    }

    #[test]
    fn garbage_date_is_an_error() {
        let raw = with_headers("sometime last week", "IBM wins");
        let err = parse_candidate(1, raw, DateMode::Naive).unwrap_err();
        assert_eq!(err, "Could not parse date: sometime last week");
    }

    #[test]
    fn missing_date_is_an_error() {
        let err = parse_candidate(1, NO_DATE.to_vec(), DateMode::Naive).unwrap_err();
        assert!(err.contains("Could not parse date"), "{err}");
    }

    // ── image_attachments ────────────────────────────────────────

    #[test]
    fn only_image_parts_are_extracted() {
        let found = image_attachments(TWO_IMAGES).unwrap();
        assert_eq!(names(&found), vec!["photo.png", "über.jpg"]);
        assert_eq!(found[0].mime_type, "image/png");
        assert_eq!(found[0].data, b"\x89PNG\r\n\x1a\n");
        assert!(found.iter().all(AttachmentData::is_image));
    }

    #[test]
    fn parts_without_disposition_or_filename_are_skipped() {
        let found = image_attachments(INLINE_PARTS).unwrap();
        assert_eq!(names(&found), vec!["dot.gif"]);
        assert_eq!(found[0].data, b"GIF89a");
    }

    #[test]
    fn empty_disposition_counts_and_names_decode_once() {
        let found = image_attachments(ODD_NAMES).unwrap();
        assert_eq!(names(&found), vec!["blank.png", "=?UTF-8?B?SUJN?=.png"]);
    }

    #[test]
    fn walks_into_multipart_and_attached_messages() {
        let found = image_attachments(NESTED).unwrap();
        assert_eq!(names(&found), vec!["outer.png", "inner.png"]);
    }

    #[test]
    fn text_only_message_has_no_images() {
        assert!(image_attachments(NO_DATE).unwrap().is_empty());
    }
}
