//! QVM server client.
//!
//! The QVM speaks JSON over a single POST endpoint; the `type` field picks
//! the request. Multishot answers with the requested classical registers,
//! one row per trial. Wavefunction answers with raw big-endian doubles,
//! real then imaginary part of each amplitude.

use std::collections::HashMap;
use std::time::Duration;

use num_complex::Complex64;
use reqwest::{Client, Response};
use serde_json::{json, Value};
use tracing::trace;

use crate::error::{ForestError, ForestResult};

/// Default address of a locally started `qvm -S`.
pub const DEFAULT_URL: &str = "http://127.0.0.1:5000";

/// Client for one QVM server.
#[derive(Debug)]
pub struct QvmClient {
    client: Client,
    url: String,
}

impl QvmClient {
    pub fn new(url: impl Into<String>) -> ForestResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("qisjob/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(300))
            .build()?;
        Ok(Self {
            client,
            url: url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Server address.
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn post(&self, body: &Value) -> ForestResult<Response> {
        trace!(url = %self.url, kind = %body["type"], "POST");
        let response = self.client.post(&self.url).json(body).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(ForestError::Qvm {
            status: status.as_u16(),
            message: message.trim().to_string(),
        })
    }

    /// Server version string.
    pub async fn version(&self) -> ForestResult<String> {
        let response = self.post(&json!({"type": "version"})).await?;
        Ok(response.text().await?.trim().to_string())
    }

    /// Run `quil` for `trials` shots and return the `ro` register per shot.
    pub async fn multishot(
        &self,
        quil: &str,
        trials: u32,
        seed: Option<u64>,
    ) -> ForestResult<Vec<Vec<u8>>> {
        let mut body = json!({
            "type": "multishot",
            "addresses": {"ro": true},
            "trials": trials,
            "compiled-quil": quil,
        });
        if let Some(seed) = seed {
            body["rng-seed"] = json!(seed);
        }
        let bytes = self.post(&body).await?.bytes().await?;
        let mut registers: HashMap<String, Vec<Vec<u8>>> = serde_json::from_slice(&bytes)?;
        Ok(registers.remove("ro").unwrap_or_default())
    }

    /// Final amplitudes of `quil`, which must not read classical memory.
    pub async fn wavefunction(&self, quil: &str, seed: Option<u64>) -> ForestResult<Vec<Complex64>> {
        let mut body = json!({
            "type": "wavefunction",
            "compiled-quil": quil,
        });
        if let Some(seed) = seed {
            body["rng-seed"] = json!(seed);
        }
        let bytes = self.post(&body).await?.bytes().await?;
        decode_wavefunction(&bytes)
    }
}

pub(crate) fn decode_wavefunction(bytes: &[u8]) -> ForestResult<Vec<Complex64>> {
    if bytes.len() % 16 != 0 {
        return Err(ForestError::Wavefunction(bytes.len()));
    }
    Ok(bytes
        .chunks_exact(16)
        .map(|chunk| {
            let (re, im) = chunk.split_at(8);
            Complex64::new(f64_be(re), f64_be(im))
        })
        .collect())
}

fn f64_be(bytes: &[u8]) -> f64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(bytes);
    f64::from_be_bytes(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_wavefunction() {
        let half = std::f64::consts::FRAC_1_SQRT_2;
        let mut bytes = Vec::new();
        for (re, im) in [(half, 0.0), (0.0, 0.0), (0.0, 0.0), (0.0, -half)] {
            bytes.extend_from_slice(&f64::to_be_bytes(re));
            bytes.extend_from_slice(&f64::to_be_bytes(im));
        }
        let amplitudes = decode_wavefunction(&bytes).unwrap();
        assert_eq!(amplitudes.len(), 4);
        assert_eq!(amplitudes[0], Complex64::new(half, 0.0));
        assert_eq!(amplitudes[3], Complex64::new(0.0, -half));
    }

    #[test]
    fn test_truncated_wavefunction() {
        assert!(matches!(
            decode_wavefunction(&[0u8; 20]),
            Err(ForestError::Wavefunction(20))
        ));
    }

    #[test]
    fn test_url_is_normalized() {
        let client = QvmClient::new("http://localhost:5000/").unwrap();
        assert_eq!(client.url(), "http://localhost:5000");
    }
}
