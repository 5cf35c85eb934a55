use std::io::{Cursor, Read, Write};

use wbxml::{Record, Streamable, marshal, unmarshal, unmarshal_reader};

// Sync envelope fields live on page 0, per-item email properties on page 2,
// options on page 1.
#[derive(Debug, PartialEq, Record)]
struct SyncEnvelope {
    #[wbxml(tag = 0x05)]
    collection_id: String,
    #[wbxml(tag = 0x06)]
    window_size: i32,
    #[wbxml(tag = 0x07)]
    more_available: bool,
    #[wbxml(tag = 0x08)]
    items: Vec<EmailItem>,
    #[wbxml(tag = 0x09)]
    categories: Vec<String>,
    #[wbxml(tag = 0x0A)]
    pending_codes: Vec<i32>,
    #[wbxml(tag = 0x0B)]
    options: Option<SyncOptions>,
}

#[derive(Debug, PartialEq, Record)]
struct EmailItem {
    #[wbxml(tag = 0x85)]
    server_id: String,
    #[wbxml(tag = 0x86)]
    importance: Option<i32>,
    #[wbxml(tag = 0x87, stream)]
    mime_body: Option<Vec<u8>>,
}

#[derive(Debug, PartialEq, Record)]
struct SyncOptions {
    #[wbxml(tag = 0x45)]
    filter_type: i32,
    #[wbxml(tag = 0x46)]
    truncation: Option<String>,
}

fn sample_envelope() -> SyncEnvelope {
    SyncEnvelope {
        collection_id: "inbox".to_string(),
        window_size: 25,
        more_available: true,
        items: vec![
            EmailItem {
                server_id: "1:12".to_string(),
                importance: Some(2),
                mime_body: Some(b"From: a@example.com".to_vec()),
            },
            EmailItem {
                server_id: "1:13".to_string(),
                importance: None,
                mime_body: None,
            },
        ],
        categories: vec!["work".to_string(), "travel".to_string()],
        pending_codes: vec![1, -7, 200],
        options: Some(SyncOptions {
            filter_type: 3,
            truncation: Some("all".to_string()),
        }),
    }
}

#[test]
fn test_full_envelope_roundtrip() {
    let original = sample_envelope();
    let payload = marshal(&original).expect("marshal failed");
    let decoded: SyncEnvelope = unmarshal(&payload).expect("unmarshal failed");
    assert_eq!(decoded, original);
}

#[test]
fn test_default_envelope_roundtrip() {
    let original = SyncEnvelope {
        collection_id: String::new(),
        window_size: 0,
        more_available: false,
        items: Vec::new(),
        categories: Vec::new(),
        pending_codes: Vec::new(),
        options: None,
    };
    let payload = marshal(&original).expect("marshal failed");
    let decoded: SyncEnvelope = unmarshal(&payload).expect("unmarshal failed");
    assert_eq!(decoded, original);
}

#[test]
fn test_boolean_presence_semantics() {
    let mut record = sample_envelope();
    record.more_available = false;
    let absent = marshal(&record).expect("marshal failed");
    record.more_available = true;
    let present = marshal(&record).expect("marshal failed");

    // true is a single empty-form token; false contributes nothing.
    assert_eq!(present.len(), absent.len() + 1);

    let decoded: SyncEnvelope = unmarshal(&absent).expect("unmarshal failed");
    assert!(!decoded.more_available);
    let decoded: SyncEnvelope = unmarshal(&present).expect("unmarshal failed");
    assert!(decoded.more_available);
}

#[test]
fn test_lists_preserve_document_order() {
    let original = sample_envelope();
    let payload = marshal(&original).expect("marshal failed");
    let decoded: SyncEnvelope = unmarshal(&payload).expect("unmarshal failed");
    assert_eq!(decoded.categories, ["work", "travel"]);
    assert_eq!(decoded.pending_codes, [1, -7, 200]);
    assert_eq!(decoded.items[0].server_id, "1:12");
    assert_eq!(decoded.items[1].server_id, "1:13");
}

#[test]
fn test_marshal_is_deterministic() {
    let record = sample_envelope();
    let first = marshal(&record).expect("marshal failed");
    let second = marshal(&record).expect("marshal failed");
    assert_eq!(first, second);
}

#[test]
fn test_unmarshal_reader_drains_the_source() {
    let original = sample_envelope();
    let payload = marshal(&original).expect("marshal failed");
    let decoded: SyncEnvelope =
        unmarshal_reader(Cursor::new(payload)).expect("unmarshal_reader failed");
    assert_eq!(decoded, original);
}

// A record carrying only a subset of the envelope's tags: everything else
// in the document must be skipped without affecting the result.
#[derive(Debug, PartialEq, Record)]
struct CollectionOnly {
    #[wbxml(tag = 0x05)]
    collection_id: String,
}

#[test]
fn test_schema_subset_ignores_unknown_elements() {
    let payload = marshal(&sample_envelope()).expect("marshal failed");
    let decoded: CollectionOnly = unmarshal(&payload).expect("unmarshal failed");
    assert_eq!(decoded.collection_id, "inbox");

    let bare = marshal(&CollectionOnly {
        collection_id: "inbox".to_string(),
    })
    .expect("marshal failed");
    let baseline: CollectionOnly = unmarshal(&bare).expect("unmarshal failed");
    assert_eq!(decoded, baseline);
}

/// A streamable value with its own wire text form: bytes are hex-encoded on
/// the way out and decoded on the way in.
#[derive(Debug, PartialEq)]
struct HexDigest(Vec<u8>);

impl Streamable for HexDigest {
    fn read_from(src: &mut dyn Read) -> std::io::Result<Self> {
        let mut text = String::new();
        src.read_to_string(&mut text)?;
        hex::decode(&text).map(HexDigest).map_err(std::io::Error::other)
    }

    fn write_to(&self, dst: &mut dyn Write) -> std::io::Result<()> {
        dst.write_all(hex::encode(&self.0).as_bytes())
    }
}

#[derive(Debug, PartialEq, Record)]
struct SignedNote {
    #[wbxml(tag = 0x45)]
    subject: String,
    #[wbxml(tag = 0x46, stream)]
    digest: Option<HexDigest>,
}

#[test]
fn test_custom_streamable_roundtrip() {
    let original = SignedNote {
        subject: "signed".to_string(),
        digest: Some(HexDigest(vec![0x00, 0xDE, 0xAD, 0xBE, 0xEF])),
    };
    let payload = marshal(&original).expect("marshal failed");
    let decoded: SignedNote = unmarshal(&payload).expect("unmarshal failed");
    assert_eq!(decoded, original);
}

#[test]
fn test_absent_streamable_roundtrip() {
    let original = SignedNote {
        subject: "unsigned".to_string(),
        digest: None,
    };
    let payload = marshal(&original).expect("marshal failed");
    let decoded: SignedNote = unmarshal(&payload).expect("unmarshal failed");
    assert_eq!(decoded, original);
}

#[test]
fn test_optional_scalars_distinguish_absent_from_empty() {
    let with_empty = EmailItem {
        server_id: String::new(),
        importance: Some(0),
        mime_body: None,
    };
    let payload = marshal(&with_empty).expect("marshal failed");
    let decoded: EmailItem = unmarshal(&payload).expect("unmarshal failed");
    assert_eq!(decoded.importance, Some(0));

    let without = EmailItem {
        server_id: String::new(),
        importance: None,
        mime_body: None,
    };
    let payload = marshal(&without).expect("marshal failed");
    let decoded: EmailItem = unmarshal(&payload).expect("unmarshal failed");
    assert_eq!(decoded.importance, None);
}
