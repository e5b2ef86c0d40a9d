use base64::Engine;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid base64 audio payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
    #[error("PCM payload has {0} bytes, not a whole number of 16-bit samples")]
    TruncatedSample(usize),
}

/// Convert normalized float samples to 16-bit signed PCM.
///
/// Each sample is scaled by 32768 and clamped to the representable range,
/// so out-of-range input saturates rather than wraps.
pub fn float_to_int16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| (s * 32768.0).clamp(-32768.0, 32767.0) as i16)
        .collect()
}

/// Convert 16-bit signed PCM to normalized float samples in [-1, 1).
pub fn int16_to_float(samples: &[i16]) -> Vec<f32> {
    samples.iter().map(|&s| s as f32 / 32768.0).collect()
}

/// Decode a base64 payload of little-endian 16-bit PCM samples.
///
/// An empty payload decodes to an empty sample vector.
pub fn decode_base64_pcm(payload: &str) -> Result<Vec<i16>, CodecError> {
    let bytes = base64::engine::general_purpose::STANDARD.decode(payload)?;
    if bytes.len() % 2 != 0 {
        return Err(CodecError::TruncatedSample(bytes.len()));
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

/// Encode 16-bit PCM samples as base64 of their little-endian bytes.
pub fn encode_pcm_base64(samples: &[i16]) -> String {
    let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
    base64::engine::general_purpose::STANDARD.encode(bytes)
}
