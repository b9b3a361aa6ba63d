//! zstd compression for persisted transcripts.

use crate::{DataChatError, Result};
use datachat_types::Message;

/// Default zstd level (fast, decent ratio for chat JSON).
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// Reversible text compression used before writes and after reads.
#[derive(Debug, Clone, Copy)]
pub struct TranscriptCodec {
    level: i32,
}

impl Default for TranscriptCodec {
    fn default() -> Self {
        Self::new(DEFAULT_COMPRESSION_LEVEL)
    }
}

impl TranscriptCodec {
    pub fn new(level: i32) -> Self {
        Self { level }
    }

    pub fn level(&self) -> i32 {
        self.level
    }

    /// Compress text into an opaque token.
    pub fn compress(&self, text: &str) -> Result<Vec<u8>> {
        zstd::encode_all(text.as_bytes(), self.level)
            .map_err(|e| DataChatError::Compression(e.to_string()))
    }

    /// Inverse of [`compress`](Self::compress).
    ///
    /// Fails with [`DataChatError::Corruption`] when the token was not produced
    /// by this codec or has been damaged.
    pub fn decompress(&self, token: &[u8]) -> Result<String> {
        let bytes = zstd::decode_all(token).map_err(|e| DataChatError::Corruption(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| DataChatError::Corruption(e.to_string()))
    }

    /// Serialize a transcript to JSON and compress it.
    pub fn encode_messages(&self, messages: &[Message]) -> Result<Vec<u8>> {
        let json = serde_json::to_string(messages)?;
        self.compress(&json)
    }

    /// Decompress and parse a transcript. Any failure is reported as corruption.
    pub fn decode_messages(&self, token: &[u8]) -> Result<Vec<Message>> {
        let json = self.decompress(token)?;
        serde_json::from_str(&json).map_err(|e| DataChatError::Corruption(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_text() {
        let codec = TranscriptCodec::default();
        let token = codec.compress("").unwrap();
        assert_eq!(codec.decompress(&token).unwrap(), "");
    }

    #[test]
    fn test_large_transcript_shrinks() {
        let codec = TranscriptCodec::default();
        let messages: Vec<Message> = (0..200)
            .map(|i| Message::new(format!("how many orders on day {}?", i), "SELECT count(*) FROM orders"))
            .collect();
        let token = codec.encode_messages(&messages).unwrap();
        let json = serde_json::to_string(&messages).unwrap();
        assert!(token.len() < json.len());
        assert_eq!(codec.decode_messages(&token).unwrap(), messages);
    }

    #[test]
    fn test_garbage_is_corruption() {
        let codec = TranscriptCodec::default();
        let err = codec.decompress(b"definitely not zstd").unwrap_err();
        assert!(matches!(err, DataChatError::Corruption(_)));
    }

    #[test]
    fn test_valid_zstd_but_not_a_transcript() {
        let codec = TranscriptCodec::default();
        let token = codec.compress("{\"not\":\"an array\"}").unwrap();
        let err = codec.decode_messages(&token).unwrap_err();
        assert!(matches!(err, DataChatError::Corruption(_)));
    }

    proptest! {
        #[test]
        fn prop_text_round_trip(text in ".*") {
            let codec = TranscriptCodec::default();
            let token = codec.compress(&text).unwrap();
            prop_assert_eq!(codec.decompress(&token).unwrap(), text);
        }

        #[test]
        fn prop_transcript_round_trip(
            turns in prop::collection::vec((".{0,40}", ".{0,80}"), 0..20)
        ) {
            let codec = TranscriptCodec::default();
            let messages: Vec<Message> = turns
                .into_iter()
                .map(|(p, r)| Message::new(p, r))
                .collect();
            let serialized = serde_json::to_string(&messages).unwrap();
            let token = codec.compress(&serialized).unwrap();
            prop_assert_eq!(codec.decompress(&token).unwrap(), serialized);
            prop_assert_eq!(codec.decode_messages(&token).unwrap(), messages);
        }
    }
}
