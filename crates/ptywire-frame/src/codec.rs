use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};
use crate::mnemonic::{has_payload, is_valid_mnemonic, DELIMITER};

/// Default maximum payload size: 16 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// Longest token (mnemonic + digits) accepted before the delimiter.
pub const MAX_TOKEN_LEN: usize = 32;

/// Upper bound on the buffer reserved up front for a pending payload.
const MAX_PREALLOC: usize = 64 * 1024;

/// A parsed `Mnemonic Digit+ ':'` token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub mnemonic: u8,
    pub arg: u64,
}

/// A decoded protocol frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A bare command; the argument is the value itself.
    Bare(Token),
    /// A payload-bearing command with its complete payload.
    Payload { mnemonic: u8, payload: Bytes },
}

impl Frame {
    /// Create a bare frame.
    pub fn bare(mnemonic: u8, arg: u64) -> Self {
        Self::Bare(Token { mnemonic, arg })
    }

    /// Create a payload frame.
    pub fn payload(mnemonic: u8, payload: impl Into<Bytes>) -> Self {
        Self::Payload {
            mnemonic,
            payload: payload.into(),
        }
    }

    /// The mnemonic this frame was tagged with.
    pub fn mnemonic(&self) -> u8 {
        match self {
            Frame::Bare(token) => token.mnemonic,
            Frame::Payload { mnemonic, .. } => *mnemonic,
        }
    }

    /// The total wire size of this frame (token + payload).
    pub fn wire_size(&self) -> usize {
        match self {
            Frame::Bare(token) => token_len(token.arg),
            Frame::Payload { payload, .. } => token_len(payload.len() as u64) + payload.len(),
        }
    }
}

fn token_len(arg: u64) -> usize {
    let digits = arg.checked_ilog10().unwrap_or(0) as usize + 1;
    1 + digits + 1
}

/// Encode a bare token into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────┬──────────────┬─────┐
/// │ Mnemonic │ Digits       │ ':' │
/// │ (1B)     │ (decimal)    │     │
/// └──────────┴──────────────┴─────┘
/// ```
pub fn encode_token(mnemonic: u8, arg: u64, dst: &mut BytesMut) -> Result<()> {
    if !is_valid_mnemonic(mnemonic) || has_payload(mnemonic) {
        return Err(FrameError::WrongFrameKind {
            mnemonic: mnemonic as char,
        });
    }
    put_token(mnemonic, arg, dst);
    Ok(())
}

/// Encode a payload-bearing token followed by its raw payload.
pub fn encode_payload(mnemonic: u8, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if !has_payload(mnemonic) {
        return Err(FrameError::WrongFrameKind {
            mnemonic: mnemonic as char,
        });
    }
    dst.reserve(token_len(payload.len() as u64) + payload.len());
    put_token(mnemonic, payload.len() as u64, dst);
    dst.put_slice(payload);
    Ok(())
}

/// Encode any frame into the wire format.
pub fn encode_frame(frame: &Frame, dst: &mut BytesMut) -> Result<()> {
    match frame {
        Frame::Bare(token) => encode_token(token.mnemonic, token.arg, dst),
        Frame::Payload { mnemonic, payload } => encode_payload(*mnemonic, payload, dst),
    }
}

fn put_token(mnemonic: u8, arg: u64, dst: &mut BytesMut) {
    dst.put_u8(mnemonic);
    dst.put_slice(arg.to_string().as_bytes());
    dst.put_u8(DELIMITER);
}

/// Configuration for the frame decoder.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes. Default: 16 MiB.
    pub max_payload_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }
}

/// Payload announced by a token but not fully received yet.
#[derive(Debug)]
struct PendingPayload {
    mnemonic: u8,
    expected: usize,
    accumulated: BytesMut,
}

impl PendingPayload {
    fn remaining(&self) -> usize {
        self.expected - self.accumulated.len()
    }

    fn into_frame(self) -> Frame {
        Frame::Payload {
            mnemonic: self.mnemonic,
            payload: self.accumulated.freeze(),
        }
    }
}

/// Incremental decoder for the helper's output stream.
///
/// Chunks may be split anywhere: inside a token, right before the
/// delimiter, or inside a payload. All partial state lives here between
/// calls to [`FrameDecoder::decode`].
#[derive(Debug, Default)]
pub struct FrameDecoder {
    token: Vec<u8>,
    pending: Option<PendingPayload>,
    config: FrameConfig,
}

impl FrameDecoder {
    /// Create a decoder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a decoder with explicit configuration.
    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            token: Vec::with_capacity(MAX_TOKEN_LEN),
            pending: None,
            config,
        }
    }

    /// Decode one chunk, appending every completed frame to `out`.
    ///
    /// Frames completed before an error are still appended. After an error
    /// the decoder is out of sync and must not be fed again.
    pub fn decode(&mut self, chunk: &[u8], out: &mut Vec<Frame>) -> Result<()> {
        let mut rest = chunk;
        while !rest.is_empty() {
            if let Some(pending) = self.pending.as_mut() {
                let remaining = pending.remaining();
                if rest.len() < remaining {
                    pending.accumulated.extend_from_slice(rest);
                    return Ok(());
                }
                let (head, tail) = rest.split_at(remaining);
                pending.accumulated.extend_from_slice(head);
                rest = tail;
                if let Some(done) = self.pending.take() {
                    out.push(done.into_frame());
                }
                continue;
            }

            match rest.iter().position(|&b| b == DELIMITER) {
                Some(idx) => {
                    self.push_token_bytes(&rest[..idx])?;
                    rest = &rest[idx + 1..];
                    self.end_token(out)?;
                }
                None => {
                    self.push_token_bytes(rest)?;
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    /// Convenience wrapper around [`FrameDecoder::decode`] returning the frames.
    pub fn decode_chunk(&mut self, chunk: &[u8]) -> Result<Vec<Frame>> {
        let mut out = Vec::new();
        self.decode(chunk, &mut out)?;
        Ok(out)
    }

    /// True while a token or payload is partially received.
    pub fn has_residual_state(&self) -> bool {
        let pending_bytes = self
            .pending
            .as_ref()
            .is_some_and(|pending| !pending.accumulated.is_empty());
        self.pending.is_some() || pending_bytes || !self.token.is_empty()
    }

    /// Check the decoder at end of output.
    ///
    /// Returns `Err(FrameError::ProtocolDesync)` if the stream stopped in
    /// the middle of a frame.
    pub fn finish(&self) -> Result<()> {
        if self.has_residual_state() {
            tracing::debug!(
                token_len = self.token.len(),
                pending = ?self.pending.as_ref().map(|p| (p.mnemonic as char, p.expected, p.accumulated.len())),
                "decoder holds a partial frame at end of output"
            );
            return Err(FrameError::ProtocolDesync);
        }
        Ok(())
    }

    /// Drop any partial token or payload.
    pub fn reset(&mut self) {
        self.token.clear();
        self.pending = None;
    }

    fn push_token_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        if self.token.len() + bytes.len() > MAX_TOKEN_LEN {
            let mut seen = std::mem::take(&mut self.token);
            seen.extend_from_slice(&bytes[..bytes.len().min(MAX_TOKEN_LEN)]);
            return Err(FrameError::malformed(&seen));
        }
        self.token.extend_from_slice(bytes);
        Ok(())
    }

    fn end_token(&mut self, out: &mut Vec<Frame>) -> Result<()> {
        let token = parse_token(&self.token)?;
        self.token.clear();

        if !has_payload(token.mnemonic) {
            out.push(Frame::Bare(token));
            return Ok(());
        }

        let expected = usize::try_from(token.arg)
            .ok()
            .filter(|len| *len <= self.config.max_payload_size)
            .ok_or(FrameError::PayloadTooLarge {
                size: token.arg,
                max: self.config.max_payload_size,
            })?;

        if expected == 0 {
            out.push(Frame::payload(token.mnemonic, Bytes::new()));
            return Ok(());
        }

        tracing::trace!(mnemonic = %(token.mnemonic as char), expected, "awaiting payload");
        self.pending = Some(PendingPayload {
            mnemonic: token.mnemonic,
            expected,
            accumulated: BytesMut::with_capacity(expected.min(MAX_PREALLOC)),
        });
        Ok(())
    }
}

/// Parse the bytes collected before a delimiter as `Mnemonic Digit+`.
pub fn parse_token(raw: &[u8]) -> Result<Token> {
    let Some((&mnemonic, digits)) = raw.split_first() else {
        return Err(FrameError::malformed(raw));
    };
    if !is_valid_mnemonic(mnemonic) || digits.is_empty() {
        return Err(FrameError::malformed(raw));
    }

    let arg = digits
        .iter()
        .try_fold(0u64, |acc, &digit| {
            if !digit.is_ascii_digit() {
                return None;
            }
            acc.checked_mul(10)?.checked_add(u64::from(digit - b'0'))
        })
        .ok_or_else(|| FrameError::malformed(raw))?;

    Ok(Token { mnemonic, arg })
}
