//! Gateway Client
//!
//! Pure functions over configuration: builds the signed redirect URL for
//! payment initiation and verifies inbound callback signatures. No network
//! I/O happens here; the gateway round trip travels through the
//! customer's browser.
//!
//! # Signing scheme
//!
//! Parameters are canonicalized (keys sorted bytewise ascending, values
//! percent-encoded, joined as `k=v&...`), then HMAC-SHA512 signed with the
//! shared secret. Verification strips the hash parameters, recomputes over
//! the rest and compares constant-time. The same encoder is used for URL
//! building and verification so both sides agree byte-for-byte.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha512;

type HmacSha512 = Hmac<Sha512>;

// ==================== 网关参数名 ====================

pub const PARAM_VERSION: &str = "vnp_Version";
pub const PARAM_COMMAND: &str = "vnp_Command";
pub const PARAM_TMN_CODE: &str = "vnp_TmnCode";
pub const PARAM_AMOUNT: &str = "vnp_Amount";
pub const PARAM_CURR_CODE: &str = "vnp_CurrCode";
pub const PARAM_TXN_REF: &str = "vnp_TxnRef";
pub const PARAM_ORDER_INFO: &str = "vnp_OrderInfo";
pub const PARAM_LOCALE: &str = "vnp_Locale";
pub const PARAM_RETURN_URL: &str = "vnp_ReturnUrl";
pub const PARAM_CREATE_DATE: &str = "vnp_CreateDate";
pub const PARAM_RESPONSE_CODE: &str = "vnp_ResponseCode";
pub const PARAM_TRANSACTION_NO: &str = "vnp_TransactionNo";
pub const PARAM_SECURE_HASH: &str = "vnp_SecureHash";
pub const PARAM_SECURE_HASH_TYPE: &str = "vnp_SecureHashType";

/// Gateway response code meaning "payment succeeded"
pub const RESPONSE_CODE_SUCCESS: &str = "00";

/// 网关报价约定：金额 ×100 传输
///
/// 入站时立即在边界处还原，再做任何比较或存储。
pub const AMOUNT_SCALE: i64 = 100;

/// 网关配置（商户号、共享密钥、回调与落地页地址）
///
/// 全部来自环境配置，本模块视为不透明输入。
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Merchant code issued by the gateway
    pub tmn_code: String,
    /// Shared HMAC secret
    pub hash_secret: String,
    /// Gateway checkout page
    pub pay_url: String,
    /// Our callback endpoint, embedded into the redirect URL
    pub return_url: String,
    /// Browser landing targets after the callback resolves
    pub landing_success: String,
    pub landing_failure: String,
    pub landing_error: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            tmn_code: "DINEDEMO".into(),
            hash_secret: "dine-server-dev-gateway-secret".into(),
            pay_url: "https://sandbox.gateway.example/paymentv2/vpcpay.html".into(),
            return_url: "http://localhost:3000/api/payments/callback".into(),
            landing_success: "http://localhost:5173/payment/success".into(),
            landing_failure: "http://localhost:5173/payment/failure".into(),
            landing_error: "http://localhost:5173/payment/error".into(),
        }
    }
}

/// Gateway client - URL building and callback verification
#[derive(Debug, Clone)]
pub struct GatewayClient {
    config: GatewayConfig,
}

impl GatewayClient {
    pub fn new(config: GatewayConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Build the signed redirect URL for a payment initiation
    ///
    /// `amount` is in minor currency units; the gateway's ×100 convention
    /// is applied here and undone again on the way back in.
    pub fn build_payment_url(
        &self,
        order_id: i64,
        amount: i64,
        txn_ref: &str,
        create_date: DateTime<Utc>,
    ) -> String {
        let mut params = BTreeMap::new();
        params.insert(PARAM_VERSION.to_string(), "2.1.0".to_string());
        params.insert(PARAM_COMMAND.to_string(), "pay".to_string());
        params.insert(PARAM_TMN_CODE.to_string(), self.config.tmn_code.clone());
        params.insert(
            PARAM_AMOUNT.to_string(),
            (amount * AMOUNT_SCALE).to_string(),
        );
        params.insert(PARAM_CURR_CODE.to_string(), "VND".to_string());
        params.insert(PARAM_TXN_REF.to_string(), txn_ref.to_string());
        params.insert(
            PARAM_ORDER_INFO.to_string(),
            format!("Thanh toan don hang {order_id}"),
        );
        params.insert(PARAM_LOCALE.to_string(), "vn".to_string());
        params.insert(
            PARAM_RETURN_URL.to_string(),
            self.config.return_url.clone(),
        );
        params.insert(
            PARAM_CREATE_DATE.to_string(),
            create_date.format("%Y%m%d%H%M%S").to_string(),
        );

        let canonical = canonicalize(&params);
        let signature = self.sign(&canonical);
        format!(
            "{}?{}&{}={}",
            self.config.pay_url, canonical, PARAM_SECURE_HASH, signature
        )
    }

    /// Verify the signature of an inbound callback
    ///
    /// Constant-time comparison; hex case from the gateway is accepted
    /// either way. Returns false on a missing hash.
    pub fn verify_callback(&self, params: &HashMap<String, String>) -> bool {
        let Some(supplied) = params.get(PARAM_SECURE_HASH) else {
            return false;
        };

        let filtered: BTreeMap<String, String> = params
            .iter()
            .filter(|(k, _)| {
                k.as_str() != PARAM_SECURE_HASH && k.as_str() != PARAM_SECURE_HASH_TYPE
            })
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let expected = self.sign(&canonicalize(&filtered));
        let supplied = supplied.to_ascii_lowercase();
        ring::constant_time::verify_slices_are_equal(expected.as_bytes(), supplied.as_bytes())
            .is_ok()
    }

    /// HMAC-SHA512 over the canonical string, lowercase hex
    pub(crate) fn sign(&self, canonical: &str) -> String {
        let mut mac = HmacSha512::new_from_slice(self.config.hash_secret.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(canonical.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Sign an already-sorted parameter set (tests and tooling)
    pub(crate) fn sign_params(&self, params: &BTreeMap<String, String>) -> String {
        self.sign(&canonicalize(params))
    }
}

/// Deterministic canonical form: sorted keys, encoded values, `k=v&...`
fn canonicalize(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Percent-encode everything outside the unreserved set
///
/// This alphabet is part of the signing contract: both the URL builder and
/// the verifier must produce identical bytes for identical values.
fn urlencode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            other => {
                out.push('%');
                out.push_str(&format!("{:02X}", other));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GatewayClient {
        GatewayClient::new(GatewayConfig {
            hash_secret: "test-gateway-secret".into(),
            ..GatewayConfig::default()
        })
    }

    fn signed_callback(client: &GatewayClient, entries: &[(&str, &str)]) -> HashMap<String, String> {
        let sorted: BTreeMap<String, String> = entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let signature = client.sign_params(&sorted);
        let mut params: HashMap<String, String> = sorted.into_iter().collect();
        params.insert(PARAM_SECURE_HASH.to_string(), signature);
        params
    }

    #[test]
    fn test_urlencode_passes_unreserved() {
        assert_eq!(urlencode("abc-XYZ_0.9~"), "abc-XYZ_0.9~");
        assert_eq!(urlencode("a b"), "a%20b");
        assert_eq!(urlencode("Thanh toan"), "Thanh%20toan");
        assert_eq!(urlencode("x&y=z"), "x%26y%3Dz");
    }

    #[test]
    fn test_canonicalize_sorts_keys() {
        let mut params = BTreeMap::new();
        params.insert("b".to_string(), "2".to_string());
        params.insert("a".to_string(), "1".to_string());
        params.insert("c".to_string(), "3".to_string());
        assert_eq!(canonicalize(&params), "a=1&b=2&c=3");
    }

    #[test]
    fn test_verify_roundtrip() {
        let client = client();
        let params = signed_callback(
            &client,
            &[
                (PARAM_AMOUNT, "13000000"),
                (PARAM_TXN_REF, "42-1700000000"),
                (PARAM_RESPONSE_CODE, "00"),
                (PARAM_TRANSACTION_NO, "GW123"),
            ],
        );
        assert!(client.verify_callback(&params));
    }

    #[test]
    fn test_verify_accepts_uppercase_hash() {
        let client = client();
        let mut params = signed_callback(&client, &[(PARAM_TXN_REF, "1"), (PARAM_AMOUNT, "100")]);
        let upper = params[PARAM_SECURE_HASH].to_ascii_uppercase();
        params.insert(PARAM_SECURE_HASH.to_string(), upper);
        assert!(client.verify_callback(&params));
    }

    #[test]
    fn test_verify_ignores_hash_type_param() {
        let client = client();
        let mut params = signed_callback(&client, &[(PARAM_TXN_REF, "1"), (PARAM_AMOUNT, "100")]);
        params.insert(PARAM_SECURE_HASH_TYPE.to_string(), "HmacSHA512".to_string());
        assert!(client.verify_callback(&params));
    }

    #[test]
    fn test_tampered_value_rejected() {
        let client = client();
        let mut params = signed_callback(
            &client,
            &[
                (PARAM_AMOUNT, "13000000"),
                (PARAM_TXN_REF, "42-1700000000"),
                (PARAM_RESPONSE_CODE, "00"),
            ],
        );
        params.insert(PARAM_AMOUNT.to_string(), "13000001".to_string());
        assert!(!client.verify_callback(&params));
    }

    #[test]
    fn test_added_param_rejected() {
        let client = client();
        let mut params = signed_callback(&client, &[(PARAM_TXN_REF, "1"), (PARAM_AMOUNT, "100")]);
        params.insert("vnp_BankCode".to_string(), "NCB".to_string());
        assert!(!client.verify_callback(&params));
    }

    #[test]
    fn test_missing_hash_rejected() {
        let client = client();
        let mut params = signed_callback(&client, &[(PARAM_TXN_REF, "1")]);
        params.remove(PARAM_SECURE_HASH);
        assert!(!client.verify_callback(&params));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let params = signed_callback(&client(), &[(PARAM_TXN_REF, "1"), (PARAM_AMOUNT, "100")]);
        let other = GatewayClient::new(GatewayConfig {
            hash_secret: "another-secret".into(),
            ..GatewayConfig::default()
        });
        assert!(!other.verify_callback(&params));
    }

    #[test]
    fn test_build_payment_url_embeds_scaled_amount_and_signature() {
        let client = client();
        let create_date = chrono::DateTime::parse_from_rfc3339("2026-08-07T10:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let url = client.build_payment_url(42, 130_000, "421700000000", create_date);

        assert!(url.starts_with(client.config().pay_url.as_str()));
        assert!(url.contains("vnp_Amount=13000000"));
        assert!(url.contains("vnp_TxnRef=421700000000"));
        assert!(url.contains("vnp_CreateDate=20260807103000"));
        assert!(url.contains("vnp_SecureHash="));

        // The query itself must verify with the same scheme the callback uses
        let query = url.split_once('?').unwrap().1;
        let params: HashMap<String, String> = query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        // NB: values in `params` are still percent-encoded; decode the ones
        // the signer encodes before re-verifying
        let decoded: HashMap<String, String> = params
            .into_iter()
            .map(|(k, v)| (k, percent_decode(&v)))
            .collect();
        assert!(client.verify_callback(&decoded));
    }

    fn percent_decode(value: &str) -> String {
        let bytes = value.as_bytes();
        let mut out = Vec::with_capacity(bytes.len());
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'%' && i + 2 < bytes.len() {
                let hi = (bytes[i + 1] as char).to_digit(16).unwrap() as u8;
                let lo = (bytes[i + 2] as char).to_digit(16).unwrap() as u8;
                out.push(hi * 16 + lo);
                i += 3;
            } else {
                out.push(bytes[i]);
                i += 1;
            }
        }
        String::from_utf8(out).unwrap()
    }
}
