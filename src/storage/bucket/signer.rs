//! Request signing for the COS-style object storage XML API
//! (`q-sign-algorithm=sha1`).

use hmac::{Hmac, Mac};
use sha1::{Digest, Sha1};
use std::collections::BTreeMap;
use urlencoding::encode;

type HmacSha1 = Hmac<Sha1>;

/// Signs one request. Header and query keys are lower-cased and sorted.
pub struct Signer<'a> {
    method: &'a str,
    url_path: &'a str,
    headers: BTreeMap<String, String>,
    query: BTreeMap<String, String>,
}

impl<'a> Signer<'a> {
    pub fn new(method: &'a str, url_path: &'a str) -> Self {
        Self {
            method,
            url_path,
            headers: BTreeMap::new(),
            query: BTreeMap::new(),
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .insert(encode(name).to_lowercase(), encode(value).into_owned());
        self
    }

    #[cfg(test)]
    pub fn query(mut self, name: &str, value: &str) -> Self {
        self.query
            .insert(encode(name).to_lowercase(), encode(value).into_owned());
        self
    }

    fn key_list(map: &BTreeMap<String, String>) -> String {
        map.keys().cloned().collect::<Vec<_>>().join(";")
    }

    fn pairs(map: &BTreeMap<String, String>) -> String {
        map.iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&")
    }

    fn http_string(&self) -> String {
        format!(
            "{}\n{}\n{}\n{}\n",
            self.method.to_lowercase(),
            self.url_path,
            Self::pairs(&self.query),
            Self::pairs(&self.headers)
        )
    }

    fn string_to_sign(&self, key_time: &str) -> String {
        let digest = Sha1::digest(self.http_string().as_bytes());
        format!("sha1\n{}\n{}\n", key_time, to_hex(&digest))
    }

    /// Authorization value valid from `start` (unix seconds) for `valid_secs`
    pub fn sign_at(&self, secret_id: &str, secret_key: &str, start: i64, valid_secs: u32) -> String {
        let key_time = format!("{};{}", start, start + i64::from(valid_secs));
        let sign_key = hmac_hex(secret_key.as_bytes(), &key_time);
        let signature = hmac_hex(sign_key.as_bytes(), &self.string_to_sign(&key_time));
        format!(
            "q-sign-algorithm=sha1&q-ak={}&q-sign-time={}&q-key-time={}&q-header-list={}&q-url-param-list={}&q-signature={}",
            secret_id,
            key_time,
            key_time,
            Self::key_list(&self.headers),
            Self::key_list(&self.query),
            signature
        )
    }

    pub fn sign(&self, secret_id: &str, secret_key: &str, valid_secs: u32) -> String {
        self.sign_at(secret_id, secret_key, chrono::Utc::now().timestamp(), valid_secs)
    }
}

fn hmac_hex(key: &[u8], message: &str) -> String {
    let mut mac = HmacSha1::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(message.as_bytes());
    to_hex(&mac.finalize().into_bytes())
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
