use base64::{URL_SAFE_NO_PAD, decode_config, encode_config};
use jwt_simple::prelude::ES256KeyPair;
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};

use crate::config::AppConfig;
use crate::types::push::VapidConfig;

/// A freshly generated VAPID key pair, both halves URL-safe base64 without padding.
#[derive(Debug, Clone)]
pub struct VapidKeys {
    pub private_key: String,
    pub public_key: String,
}

#[derive(Debug, Clone)]
pub(crate) enum VapidConfigStatus {
    Missing,
    Incomplete,
    Ready(VapidConfig),
}

/// Push is enabled only when all three VAPID settings are present and non-blank.
pub(crate) fn load_vapid_config(config: &AppConfig) -> VapidConfigStatus {
    let present = |value: &Option<String>| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };
    let private_key = present(&config.vapid_private_key);
    let public_key = present(&config.vapid_public_key);
    let subject = present(&config.vapid_subject);

    match (private_key, public_key, subject) {
        (Some(private_key), Some(public_key), Some(subject)) => {
            VapidConfigStatus::Ready(VapidConfig {
                private_key,
                public_key,
                subject,
            })
        }
        (None, None, None) => VapidConfigStatus::Missing,
        _ => VapidConfigStatus::Incomplete,
    }
}

pub fn generate_vapid_keys() -> Result<VapidKeys, web_push::WebPushError> {
    generate_vapid_keys_with_rng(&mut OsRng)
}

pub(crate) fn generate_vapid_keys_with_rng<R: RngCore + CryptoRng>(
    rng: &mut R,
) -> Result<VapidKeys, web_push::WebPushError> {
    let key_pair = loop {
        let mut secret = [0u8; 32];
        rng.fill_bytes(&mut secret);
        if let Ok(key_pair) = ES256KeyPair::from_bytes(&secret) {
            break key_pair;
        }
    };
    let private_key = encode_config(key_pair.to_bytes(), URL_SAFE_NO_PAD);
    let public_key =
        web_push::VapidSignatureBuilder::from_base64_no_sub(&private_key, URL_SAFE_NO_PAD)?
            .get_public_key();

    Ok(VapidKeys {
        private_key,
        public_key: encode_config(public_key, URL_SAFE_NO_PAD),
    })
}

/// Uncompressed P-256 point: 65 bytes with a leading 0x04.
pub(crate) fn is_valid_public_key(public_key: &str) -> bool {
    match decode_config(public_key, URL_SAFE_NO_PAD) {
        Ok(bytes) => bytes.len() == 65 && bytes[0] == 0x04,
        Err(_) => false,
    }
}
