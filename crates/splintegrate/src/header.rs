//! FITS header cards and the ordered, editable [`Header`] store.

use std::str;

use crate::block::{BLOCK_SIZE, CARDS_PER_BLOCK, CARD_SIZE, HEADER_PAD_BYTE};
use crate::error::{Error, Result};
use crate::value::{format_value, parse_value, Value};

// ── Types ──

/// A parsed FITS header card (one 80-byte keyword record).
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    /// The 8-byte keyword name, ASCII, left-justified, space-padded.
    pub keyword: [u8; 8],
    /// The parsed value, if this card has a value indicator (`= ` in bytes 8..10).
    pub value: Option<Value>,
    /// An optional comment string. For commentary cards this is the free text.
    pub comment: Option<String>,
}

impl Card {
    /// Build a value card.
    pub fn new(keyword: &str, value: impl Into<Value>, comment: Option<&str>) -> Self {
        Card {
            keyword: make_keyword(keyword),
            value: Some(value.into()),
            comment: comment.map(String::from),
        }
    }

    /// Build a `COMMENT` card carrying free text.
    pub fn comment(text: &str) -> Self {
        Card {
            keyword: make_keyword("COMMENT"),
            value: None,
            comment: Some(String::from(text)),
        }
    }

    /// Return the keyword as a trimmed UTF-8 string.
    pub fn keyword_str(&self) -> &str {
        let end = self
            .keyword
            .iter()
            .rposition(|&b| b != b' ')
            .map(|i| i + 1)
            .unwrap_or(0);
        str::from_utf8(&self.keyword[..end]).unwrap_or("")
    }

    /// Returns `true` if this card is the END keyword.
    pub fn is_end(&self) -> bool {
        &self.keyword == b"END     "
    }

    /// Returns `true` if this card carries no value (COMMENT, HISTORY, blank,
    /// CONTINUE and other free-text records).
    pub fn is_commentary(&self) -> bool {
        self.value.is_none()
    }
}

/// Pad a keyword name to 8 bytes with trailing ASCII spaces.
pub fn make_keyword(name: &str) -> [u8; 8] {
    let mut kw = [b' '; 8];
    let bytes = name.as_bytes();
    let len = bytes.len().min(8);
    kw[..len].copy_from_slice(&bytes[..len]);
    kw
}

// ── Parsing ──

const COMMENTARY_KEYWORDS: [&[u8; 8]; 3] = [b"COMMENT ", b"HISTORY ", b"        "];

/// Parse a single 80-byte FITS header card.
pub fn parse_card(card_bytes: &[u8; CARD_SIZE]) -> Result<Card> {
    let mut keyword = [b' '; 8];
    keyword.copy_from_slice(&card_bytes[..8]);

    if !keyword
        .iter()
        .all(|b| matches!(b, b'A'..=b'Z' | b'0'..=b'9' | b' ' | b'-' | b'_'))
    {
        return Err(Error::InvalidKeyword);
    }

    let has_value = &card_bytes[8..10] == b"= " && !COMMENTARY_KEYWORDS.contains(&&keyword);
    if has_value {
        let (value, comment) = parse_value(&card_bytes[10..]);
        return Ok(Card {
            keyword,
            value: Some(value),
            comment,
        });
    }

    let text = str::from_utf8(&card_bytes[8..])
        .map_err(|_| Error::InvalidHeader("non-ASCII commentary card"))?
        .trim_end();
    Ok(Card {
        keyword,
        value: None,
        comment: (!text.is_empty()).then(|| String::from(text)),
    })
}

/// Parse consecutive 2880-byte header blocks until the END card is found.
///
/// The returned cards exclude the END card itself.
pub fn parse_header_blocks(data: &[u8]) -> Result<Vec<Card>> {
    let mut cards = Vec::new();
    for chunk in data.chunks_exact(CARD_SIZE) {
        let card_bytes: &[u8; CARD_SIZE] = chunk
            .try_into()
            .map_err(|_| Error::InvalidHeader("short card"))?;
        let card = parse_card(card_bytes)?;
        if card.is_end() {
            return Ok(cards);
        }
        cards.push(card);
    }
    Err(Error::UnexpectedEof)
}

/// Return the number of bytes consumed by the header (always a multiple of
/// [`BLOCK_SIZE`]).
pub fn header_byte_len(data: &[u8]) -> Result<usize> {
    let num_blocks = data.len() / BLOCK_SIZE;
    for block_idx in 0..num_blocks {
        let block_start = block_idx * BLOCK_SIZE;
        for card_idx in 0..CARDS_PER_BLOCK {
            let card_start = block_start + card_idx * CARD_SIZE;
            if &data[card_start..card_start + 8] == b"END     " {
                return Ok((block_idx + 1) * BLOCK_SIZE);
            }
        }
    }
    Err(Error::UnexpectedEof)
}

// ── Writing ──

/// Serialize a [`Card`] into an 80-byte FITS card image.
pub fn format_card(card: &Card) -> [u8; CARD_SIZE] {
    let mut buf = [b' '; CARD_SIZE];
    buf[..8].copy_from_slice(&card.keyword);

    match (&card.value, &card.comment) {
        (Some(value), comment) => {
            buf[8] = b'=';
            let mut field = format_value(value);
            if let Some(comment) = comment {
                insert_comment(&mut field, comment);
            }
            buf[10..].copy_from_slice(&field);
        }
        (None, Some(text)) => {
            let len = text.len().min(72);
            buf[8..8 + len].copy_from_slice(&text.as_bytes()[..len]);
        }
        (None, None) => {}
    }
    buf
}

/// Append ` / comment` after the value text in a 70-byte value field.
fn insert_comment(field: &mut [u8; 70], comment: &str) {
    let content_end = if field[0] == b'\'' {
        // Closing quote of the string, skipping doubled quotes.
        let mut i = 1;
        while i < 70 {
            if field[i] == b'\'' {
                if field.get(i + 1) == Some(&b'\'') {
                    i += 2;
                    continue;
                }
                break;
            }
            i += 1;
        }
        i + 1
    } else {
        let used = field.iter().rposition(|&b| b != b' ').map_or(0, |i| i + 1);
        used.max(20)
    };

    let sep = content_end + 1;
    if sep + 3 >= 70 {
        return;
    }
    field[sep] = b'/';
    let start = sep + 2;
    let len = comment.len().min(70 - start);
    field[start..start + len].copy_from_slice(&comment.as_bytes()[..len]);
}

/// Create the standard FITS END card.
pub fn format_end_card() -> [u8; CARD_SIZE] {
    let mut buf = [b' '; CARD_SIZE];
    buf[..3].copy_from_slice(b"END");
    buf
}

/// Serialize header cards into complete FITS header blocks.
///
/// Appends the END card and pads the final block with blanks. The returned
/// length is always a multiple of [`BLOCK_SIZE`].
pub fn serialize_header(cards: &[Card]) -> Vec<u8> {
    let total_blocks = (cards.len() + 1).div_ceil(CARDS_PER_BLOCK);
    let mut buf = Vec::with_capacity(total_blocks * BLOCK_SIZE);
    for card in cards {
        buf.extend_from_slice(&format_card(card));
    }
    buf.extend_from_slice(&format_end_card());
    buf.resize(total_blocks * BLOCK_SIZE, HEADER_PAD_BYTE);
    buf
}

// ── Ordered header store ──

/// Keywords that describe the data layout of an HDU rather than its content.
fn is_structural(keyword: &str) -> bool {
    matches!(
        keyword,
        "SIMPLE" | "XTENSION" | "BITPIX" | "NAXIS" | "PCOUNT" | "GCOUNT" | "GROUPS"
    ) || keyword
        .strip_prefix("NAXIS")
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

/// An ordered FITS header supporting positional edits.
///
/// Value keywords are unique: inserting or setting a keyword that is already
/// present replaces it. Commentary cards (COMMENT, HISTORY, ...) may repeat.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    cards: Vec<Card>,
}

impl Header {
    pub fn new() -> Self {
        Header::default()
    }

    /// Build a header from parsed cards. Any END card is dropped.
    pub fn from_cards(cards: Vec<Card>) -> Self {
        Header {
            cards: cards.into_iter().filter(|c| !c.is_end()).collect(),
        }
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Index of the first value card named `keyword`.
    pub fn position(&self, keyword: &str) -> Option<usize> {
        self.cards
            .iter()
            .position(|c| c.value.is_some() && c.keyword_str() == keyword)
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.position(keyword).is_some()
    }

    pub fn get(&self, keyword: &str) -> Option<&Value> {
        self.position(keyword)
            .and_then(|i| self.cards[i].value.as_ref())
    }

    pub fn card(&self, keyword: &str) -> Option<&Card> {
        self.position(keyword).map(|i| &self.cards[i])
    }

    pub fn integer(&self, keyword: &str) -> Option<i64> {
        self.get(keyword).and_then(Value::as_integer)
    }

    pub fn float(&self, keyword: &str) -> Option<f64> {
        self.get(keyword).and_then(Value::as_float)
    }

    pub fn string(&self, keyword: &str) -> Option<&str> {
        self.get(keyword).and_then(Value::as_str)
    }

    pub fn logical(&self, keyword: &str) -> Option<bool> {
        self.get(keyword).and_then(Value::as_logical)
    }

    /// Set `keyword` to `value`, keeping its position and comment if present,
    /// otherwise appending a new card.
    pub fn set(&mut self, keyword: &str, value: impl Into<Value>) {
        match self.position(keyword) {
            Some(i) => self.cards[i].value = Some(value.into()),
            None => self.cards.push(Card::new(keyword, value, None)),
        }
    }

    /// Like [`Header::set`] but also replaces the comment.
    pub fn set_with_comment(&mut self, keyword: &str, value: impl Into<Value>, comment: &str) {
        match self.position(keyword) {
            Some(i) => {
                self.cards[i].value = Some(value.into());
                self.cards[i].comment = Some(String::from(comment));
            }
            None => self.cards.push(Card::new(keyword, value, Some(comment))),
        }
    }

    /// Insert `card` immediately after the value card `anchor`.
    ///
    /// An existing card with the same keyword is removed first. If `anchor`
    /// is absent the card is appended.
    pub fn insert_after(&mut self, anchor: &str, card: Card) {
        self.insert_relative(anchor, card, 1);
    }

    /// Insert `card` immediately before the value card `anchor`.
    pub fn insert_before(&mut self, anchor: &str, card: Card) {
        self.insert_relative(anchor, card, 0);
    }

    fn insert_relative(&mut self, anchor: &str, card: Card, offset: usize) {
        if card.value.is_some() {
            self.remove(card.keyword_str());
        }
        match self.position(anchor) {
            Some(i) => self.cards.insert(i + offset, card),
            None => self.cards.push(card),
        }
    }

    /// Remove the value card named `keyword`, returning it.
    pub fn remove(&mut self, keyword: &str) -> Option<Card> {
        self.position(keyword).map(|i| self.cards.remove(i))
    }

    /// Append a `COMMENT` card.
    pub fn push_comment(&mut self, text: &str) {
        self.cards.push(Card::comment(text));
    }

    /// Return a copy laid out as a primary HDU holding an image with the
    /// given BITPIX and axes (NAXIS1 first).
    ///
    /// The mandatory SIMPLE/BITPIX/NAXIS/NAXISn prefix is rebuilt and every
    /// other structural keyword (XTENSION, PCOUNT, GCOUNT, stale NAXISn) is
    /// dropped; all other cards keep their order.
    pub fn with_image_structure(&self, bitpix: i64, naxes: &[usize]) -> Header {
        let mut cards = Vec::with_capacity(self.cards.len() + naxes.len() + 3);
        cards.push(Card::new("SIMPLE", true, Some("conforms to FITS standard")));
        cards.push(Card::new("BITPIX", bitpix, Some("array data type")));
        cards.push(Card::new("NAXIS", naxes.len(), Some("number of array dimensions")));
        for (i, &dim) in naxes.iter().enumerate() {
            cards.push(Card::new(&format!("NAXIS{}", i + 1), dim, None));
        }
        cards.extend(
            self.cards
                .iter()
                .filter(|c| c.is_commentary() || !is_structural(c.keyword_str()))
                .cloned(),
        );
        Header { cards }
    }

    /// Serialize to padded header blocks, END card included.
    pub fn to_bytes(&self) -> Vec<u8> {
        serialize_header(&self.cards)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_card(s: &str) -> [u8; CARD_SIZE] {
        let mut buf = [b' '; CARD_SIZE];
        let len = s.len().min(CARD_SIZE);
        buf[..len].copy_from_slice(&s.as_bytes()[..len]);
        buf
    }

    fn keywords(header: &Header) -> Vec<&str> {
        header.cards().iter().map(Card::keyword_str).collect()
    }

    fn sample() -> Header {
        Header::from_cards(vec![
            Card::new("SIMPLE", true, None),
            Card::new("NINTS", 3i64, Some("number of integrations")),
            Card::new("TIME-OBS", "12:00:00", None),
            Card::new("DETECTOR", "NRCA1", None),
        ])
    }

    #[test]
    fn parse_value_card() {
        let card = parse_card(&make_card("NINTS   =                    3 / ints")).unwrap();
        assert_eq!(card.keyword_str(), "NINTS");
        assert_eq!(card.value, Some(Value::Integer(3)));
        assert_eq!(card.comment.as_deref(), Some("ints"));
    }

    #[test]
    fn parse_comment_card_keeps_text() {
        let card = parse_card(&make_card("COMMENT   hello world")).unwrap();
        assert!(card.is_commentary());
        assert_eq!(card.comment.as_deref(), Some("  hello world"));
    }

    #[test]
    fn parse_continue_card_is_commentary() {
        let card = parse_card(&make_card("CONTINUE  'more text&'")).unwrap();
        assert!(card.value.is_none());
        assert_eq!(format_card(&card), make_card("CONTINUE  'more text&'"));
    }

    #[test]
    fn parse_lowercase_keyword_fails() {
        assert!(matches!(
            parse_card(&make_card("simple  =                    T")),
            Err(Error::InvalidKeyword)
        ));
    }

    #[test]
    fn card_round_trip_with_comment() {
        let card = Card::new("TOT_NINT", 3i64, Some("Total number of NINT in original exposure"));
        let parsed = parse_card(&format_card(&card)).unwrap();
        assert_eq!(parsed, card);
    }

    #[test]
    fn string_card_round_trip_with_comment() {
        let card = Card::new("DETECTOR", "NRCALONG", Some("detector name"));
        let parsed = parse_card(&format_card(&card)).unwrap();
        assert_eq!(parsed, card);
    }

    #[test]
    fn serialize_is_block_aligned_and_ends() {
        let bytes = sample().to_bytes();
        assert_eq!(bytes.len(), BLOCK_SIZE);
        assert_eq!(header_byte_len(&bytes).unwrap(), BLOCK_SIZE);
        let cards = parse_header_blocks(&bytes).unwrap();
        assert_eq!(cards.len(), 4);
    }

    #[test]
    fn serialize_full_block_spills_to_next() {
        let cards: Vec<Card> = (0..CARDS_PER_BLOCK)
            .map(|i| Card::new(&format!("KEY{i}"), i, None))
            .collect();
        let bytes = serialize_header(&cards);
        assert_eq!(bytes.len(), 2 * BLOCK_SIZE);
        assert_eq!(parse_header_blocks(&bytes).unwrap().len(), CARDS_PER_BLOCK);
    }

    #[test]
    fn parse_without_end_fails() {
        let data = vec![b' '; BLOCK_SIZE];
        assert!(matches!(header_byte_len(&data), Err(Error::UnexpectedEof)));
    }

    #[test]
    fn set_keeps_position_and_comment() {
        let mut h = sample();
        h.set("NINTS", 1i64);
        assert_eq!(h.position("NINTS"), Some(1));
        assert_eq!(h.integer("NINTS"), Some(1));
        assert_eq!(
            h.card("NINTS").unwrap().comment.as_deref(),
            Some("number of integrations")
        );
    }

    #[test]
    fn set_appends_missing_keyword() {
        let mut h = sample();
        h.set("FLIP2DET", true);
        assert_eq!(keywords(&h).last(), Some(&"FLIP2DET"));
    }

    #[test]
    fn insert_after_chain_keeps_order() {
        let mut h = sample();
        h.insert_after("NINTS", Card::new("ON_NINT", 1i64, None));
        h.insert_after("ON_NINT", Card::new("TOT_NINT", 3i64, None));
        h.insert_after("TOT_NINT", Card::new("SEGNINT", 3i64, None));
        assert_eq!(
            keywords(&h),
            ["SIMPLE", "NINTS", "ON_NINT", "TOT_NINT", "SEGNINT", "TIME-OBS", "DETECTOR"]
        );
    }

    #[test]
    fn insert_before_places_card_ahead() {
        let mut h = sample();
        h.insert_before("NINTS", Card::new("NINT", 1i64, None));
        assert_eq!(keywords(&h)[1..3], ["NINT", "NINTS"]);
    }

    #[test]
    fn insert_replaces_existing_keyword() {
        let mut h = sample();
        h.insert_after("NINTS", Card::new("DETECTOR", "NRCB1", None));
        assert_eq!(keywords(&h), ["SIMPLE", "NINTS", "DETECTOR", "TIME-OBS"]);
        assert_eq!(h.string("DETECTOR"), Some("NRCB1"));
    }

    #[test]
    fn insert_with_missing_anchor_appends() {
        let mut h = sample();
        h.insert_after("NOPE", Card::new("BJDMID", 1.5, None));
        assert_eq!(keywords(&h).last(), Some(&"BJDMID"));
    }

    #[test]
    fn comments_may_repeat() {
        let mut h = sample();
        h.push_comment("first");
        h.push_comment("second");
        assert_eq!(keywords(&h).iter().filter(|k| **k == "COMMENT").count(), 2);
    }

    #[test]
    fn clone_is_independent() {
        let original = sample();
        let mut copy = original.clone();
        copy.set("NINTS", 1i64);
        assert_eq!(original.integer("NINTS"), Some(3));
    }

    #[test]
    fn image_structure_rebuilds_prefix() {
        let h = Header::from_cards(vec![
            Card::new("SIMPLE", true, None),
            Card::new("BITPIX", 8i64, None),
            Card::new("NAXIS", 0i64, None),
            Card::new("EXTEND", true, None),
            Card::new("NINTS", 3i64, None),
            Card::new("NAXIS3", 7i64, None),
            Card::new("PCOUNT", 0i64, None),
        ]);
        let out = h.with_image_structure(-32, &[4, 5]);
        assert_eq!(
            keywords(&out),
            ["SIMPLE", "BITPIX", "NAXIS", "NAXIS1", "NAXIS2", "EXTEND", "NINTS"]
        );
        assert_eq!(out.integer("BITPIX"), Some(-32));
        assert_eq!(out.integer("NAXIS2"), Some(5));
    }

    #[test]
    fn naxis_prefix_match_is_exact() {
        assert!(is_structural("NAXIS12"));
        assert!(!is_structural("NAXISX"));
        assert!(!is_structural("NINTS"));
    }
}
