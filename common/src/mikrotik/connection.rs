//! RouterOS API framing: length-prefixed words grouped into sentences that
//! end with an empty word.

use std::collections::HashMap;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::RouterOsError;

/// Longest word accepted from a router; a real reply word is a single attribute.
pub const MAX_WORD_LEN: usize = 1 << 20;

pub fn encode_length(len: usize) -> Vec<u8> {
    let len = len as u32;
    if len < 0x80 {
        vec![len as u8]
    } else if len < 0x4000 {
        (len | 0x8000).to_be_bytes()[2..].to_vec()
    } else if len < 0x20_0000 {
        (len | 0xC0_0000).to_be_bytes()[1..].to_vec()
    } else if len < 0x1000_0000 {
        (len | 0xE000_0000).to_be_bytes().to_vec()
    } else {
        let mut out = vec![0xF0];
        out.extend_from_slice(&len.to_be_bytes());
        out
    }
}

async fn read_length<S: AsyncRead + Unpin>(stream: &mut S) -> Result<usize, RouterOsError> {
    let first = stream.read_u8().await?;
    let (extra, mut len) = if first & 0x80 == 0 {
        (0, first as u32)
    } else if first & 0xC0 == 0x80 {
        (1, (first & 0x3F) as u32)
    } else if first & 0xE0 == 0xC0 {
        (2, (first & 0x1F) as u32)
    } else if first & 0xF0 == 0xE0 {
        (3, (first & 0x0F) as u32)
    } else if first == 0xF0 {
        (4, 0)
    } else {
        return Err(RouterOsError::Protocol(format!(
            "invalid length prefix 0x{first:02x}"
        )));
    };
    for _ in 0..extra {
        len = (len << 8) | stream.read_u8().await? as u32;
    }
    Ok(len as usize)
}

pub async fn write_sentence<S, W>(stream: &mut S, words: &[W]) -> Result<(), RouterOsError>
where
    S: AsyncWrite + Unpin,
    W: AsRef<str>,
{
    let mut buf = Vec::new();
    for word in words {
        let word = word.as_ref().as_bytes();
        buf.extend(encode_length(word.len()));
        buf.extend_from_slice(word);
    }
    buf.push(0);
    stream.write_all(&buf).await?;
    stream.flush().await?;
    Ok(())
}

pub async fn read_sentence<S: AsyncRead + Unpin>(
    stream: &mut S,
) -> Result<Vec<String>, RouterOsError> {
    let mut words = Vec::new();
    loop {
        let len = read_length(stream).await?;
        if len == 0 {
            return Ok(words);
        }
        if len > MAX_WORD_LEN {
            return Err(RouterOsError::Protocol(format!(
                "word of {len} bytes exceeds the {MAX_WORD_LEN} byte limit"
            )));
        }
        let mut word = vec![0u8; len];
        stream.read_exact(&mut word).await?;
        let word = String::from_utf8(word)
            .map_err(|e| RouterOsError::Protocol(format!("non UTF-8 word: {e}")))?;
        words.push(word);
    }
}

/// One reply sentence: `!re`, `!done`, `!trap` or `!fatal` plus its attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    pub kind: String,
    pub attributes: HashMap<String, String>,
}

impl Sentence {
    pub fn parse(words: Vec<String>) -> Result<Self, RouterOsError> {
        let mut words = words.into_iter();
        let kind = words
            .next()
            .ok_or_else(|| RouterOsError::Protocol("empty reply sentence".into()))?;

        let mut attributes = HashMap::new();
        for word in words {
            // `=key=value`, where value may itself contain `=`
            if let Some(rest) = word.strip_prefix('=') {
                let (key, value) = rest.split_once('=').unwrap_or((rest, ""));
                attributes.insert(key.to_string(), value.to_string());
            } else if let Some(tag) = word.strip_prefix(".tag=") {
                attributes.insert(".tag".to_string(), tag.to_string());
            } else if kind == "!fatal" {
                // `!fatal` carries its reason as a bare word
                attributes.insert("message".to_string(), word.clone());
            }
        }
        Ok(Sentence { kind, attributes })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_length_boundaries() {
        assert_eq!(encode_length(0x7F), vec![0x7F]);
        assert_eq!(encode_length(0x80), vec![0x80, 0x80]);
        assert_eq!(encode_length(0x3FFF), vec![0xBF, 0xFF]);
        assert_eq!(encode_length(0x4000), vec![0xC0, 0x40, 0x00]);
        assert_eq!(encode_length(0x20_0000), vec![0xE0, 0x20, 0x00, 0x00]);
        assert_eq!(
            encode_length(0x1000_0000),
            vec![0xF0, 0x10, 0x00, 0x00, 0x00]
        );
    }

    #[tokio::test]
    async fn long_words_survive_the_wire() {
        let long = "x".repeat(300);
        let words = vec!["/ip/hotspot/user/add".to_string(), format!("=comment={long}")];

        let (mut client, mut server) = tokio::io::duplex(4096);
        write_sentence(&mut client, &words).await.unwrap();
        let read = read_sentence(&mut server).await.unwrap();
        assert_eq!(read, words);
    }

    #[tokio::test]
    async fn oversized_word_is_rejected_before_allocation() {
        let (mut client, mut server) = tokio::io::duplex(64);
        // 0xF0 prefix announcing a ~4 GiB word
        client
            .write_all(&[0xF0, 0xFF, 0xFF, 0xFF, 0xFF])
            .await
            .unwrap();
        let err = read_sentence(&mut server).await.unwrap_err();
        assert!(matches!(err, RouterOsError::Protocol(ref m) if m.contains("limit")));
    }

    #[test]
    fn fatal_keeps_its_bare_reason() {
        let sentence =
            Sentence::parse(vec!["!fatal".into(), "session terminated on request".into()])
                .unwrap();
        assert_eq!(sentence.get("message"), Some("session terminated on request"));
    }

    #[test]
    fn parses_attributes_with_equals_in_value() {
        let sentence = Sentence::parse(vec![
            "!re".into(),
            "=comment=a=b".into(),
            "=.id=*1".into(),
        ])
        .unwrap();
        assert_eq!(sentence.kind, "!re");
        assert_eq!(sentence.get("comment"), Some("a=b"));
        assert_eq!(sentence.get(".id"), Some("*1"));
    }
}
