use crate::config::AcquirerConfig;
use crate::domain::amount::Amount;
use crate::domain::canonical::canonicalize;
use crate::domain::params::{ParameterSet, SIGN, SIGN_TYPE};
use crate::domain::protocol::{Protocol, SignatureScheme};
use crate::domain::signature::{MerchantKey, sign_with_key};
use crate::error::{GatewayError, Result};
use chrono::{Local, NaiveDateTime};
use serde_json::{Map, Value};
use tracing::info;

/// Keys signed by the legacy protocol. Anything else in the outbound set
/// travels unsigned.
pub const LEGACY_SIGNED_KEYS: [&str; 11] = [
    "service",
    "partner",
    "_input_charset",
    "return_url",
    "notify_url",
    "out_trade_no",
    "subject",
    "payment_type",
    "total_fee",
    "seller_id",
    "body",
];

/// Key wrapping the business fields in the open API protocol.
pub const BIZ_CONTENT: &str = "biz_content";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Typed business fields of a payment request.
///
/// The host fills this in; it is flattened into a [`ParameterSet`] only when
/// the request is built, so a missing reference or amount is a compile error
/// rather than a rejected payment.
#[derive(Debug, Clone, PartialEq)]
pub struct BusinessFields {
    /// Merchant reference, sent as `out_trade_no`.
    pub reference: String,
    pub subject: String,
    pub amount: Amount,
    pub body: Option<String>,
    /// Additional acquirer fields, nested values allowed.
    pub extra: Map<String, Value>,
}

impl BusinessFields {
    pub fn new(reference: impl Into<String>, subject: impl Into<String>, amount: Amount) -> Self {
        Self {
            reference: reference.into(),
            subject: subject.into(),
            amount,
            body: None,
            extra: Map::new(),
        }
    }

    /// Fields for a shop order, with the subject `<company>: <reference>`.
    pub fn for_order(reference: &str, amount: Amount, company_name: Option<&str>) -> Self {
        let subject = match company_name {
            Some(company) => format!("{}: {}", company, reference),
            None => reference.to_string(),
        };
        Self::new(reference, subject, amount)
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Flattens the fields using the key names of `protocol`.
    pub fn into_params(self, protocol: Protocol, product_code: &str) -> ParameterSet {
        let mut params: ParameterSet = self.extra.into_iter().collect();

        params.insert("out_trade_no", self.reference);
        params.insert("subject", self.subject);
        match protocol {
            Protocol::Legacy => {
                params.insert("total_fee", self.amount.to_wire());
                params.insert("body", self.body.unwrap_or_default());
            }
            Protocol::Modern => {
                params.insert("total_amount", self.amount.to_wire());
                params.insert("product_code", product_code);
                if let Some(body) = self.body {
                    params.insert("body", body);
                }
            }
        }
        params
    }
}

/// Assembles and signs an outbound payment request.
///
/// `defaults` holds the protocol fields, `business` the order fields; the
/// latter win on key collision. The legacy protocol signs the
/// [`LEGACY_SIGNED_KEYS`] subset with empty values dropped. The modern
/// protocol moves every business field that is not a protocol key into
/// `biz_content` and signs the whole flat set, empty values included.
///
/// # Errors
///
/// [`GatewayError::ConfigurationError`] when the private key is missing or
/// cannot be parsed. Nothing is signed in that case.
pub fn build_signed_request(
    business: ParameterSet,
    defaults: ParameterSet,
    private_key_pem: Option<&str>,
    scheme: SignatureScheme,
    protocol: Protocol,
) -> Result<ParameterSet> {
    let pem = private_key_pem
        .ok_or_else(|| GatewayError::ConfigurationError("No private key configured".to_string()))?;
    let key = MerchantKey::from_pem(pem).map_err(|e| match e {
        GatewayError::SigningError(msg) => GatewayError::ConfigurationError(msg),
        other => other,
    })?;

    let mut params = match protocol {
        Protocol::Legacy => {
            let mut params = defaults;
            params.merge(business);
            params
        }
        Protocol::Modern => wrap_biz_content(business, defaults),
    };
    params.remove(SIGN);
    params.remove(SIGN_TYPE);

    let options = protocol.canonical_options();
    let content = match protocol {
        Protocol::Legacy => canonicalize(&params.subset(&LEGACY_SIGNED_KEYS), &options),
        Protocol::Modern => canonicalize(&params, &options),
    };

    let signature = sign_with_key(&content, &key, scheme)?;
    params.insert(SIGN, signature);
    params.insert(SIGN_TYPE, scheme.label());
    Ok(params)
}

fn wrap_biz_content(business: ParameterSet, mut defaults: ParameterSet) -> ParameterSet {
    let mut biz = Map::new();
    for (key, value) in business {
        if defaults.contains_key(&key) {
            defaults.insert(key, value);
        } else {
            biz.insert(key, value.to_json());
        }
    }
    defaults.insert(BIZ_CONTENT, Value::Object(biz));
    defaults
}

/// Builds signed requests for one acquirer account.
pub struct RequestBuilder<'a> {
    config: &'a AcquirerConfig,
}

impl<'a> RequestBuilder<'a> {
    pub fn new(config: &'a AcquirerConfig) -> Self {
        Self { config }
    }

    /// Protocol fields for a request issued at `now`.
    pub fn protocol_defaults(&self, now: NaiveDateTime) -> Result<ParameterSet> {
        let config = self.config;
        let mut defaults = ParameterSet::new();
        defaults.insert("return_url", config.return_url()?.to_string());
        defaults.insert("notify_url", config.notify_url()?.to_string());

        match config.protocol {
            Protocol::Legacy => {
                defaults.insert("service", config.service.as_str());
                defaults.insert("partner", config.partner.clone().unwrap_or_default());
                defaults.insert("_input_charset", config.charset.as_str());
                defaults.insert("payment_type", config.payment_type.as_str());
                if let Some(seller) = &config.seller_id {
                    defaults.insert("seller_id", seller.as_str());
                    defaults.insert("seller_email", seller.as_str());
                    defaults.insert("seller_account_name", seller.as_str());
                }
            }
            Protocol::Modern => {
                defaults.insert("app_id", config.app_id.clone().unwrap_or_default());
                defaults.insert("method", config.method.as_str());
                defaults.insert("charset", config.charset.as_str());
                defaults.insert("timestamp", now.format(TIMESTAMP_FORMAT).to_string());
                defaults.insert("version", config.version.as_str());
            }
        }
        Ok(defaults)
    }

    /// Signed request stamped with the current local time.
    pub fn build(&self, fields: BusinessFields) -> Result<ParameterSet> {
        self.build_at(fields, Local::now().naive_local())
    }

    pub fn build_at(&self, fields: BusinessFields, now: NaiveDateTime) -> Result<ParameterSet> {
        let config = self.config;
        let private_key = config.private_key_pem()?;
        let reference = fields.reference.clone();

        let business = fields.into_params(config.protocol, &config.product_code);
        let defaults = self.protocol_defaults(now)?;
        let params = build_signed_request(
            business,
            defaults,
            Some(&private_key),
            config.sign_type,
            config.protocol,
        )?;

        info!(
            reference = %reference,
            protocol = ?config.protocol,
            sign_type = %config.sign_type,
            "Built signed payment request"
        );
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeySource;
    use crate::domain::canonical::{CanonicalOptions, canonical_string};
    use crate::domain::signature::verify;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use serde_json::json;

    const MERCHANT_PRIVATE: &str = include_str!("../../tests/fixtures/merchant_private.pem");
    const MERCHANT_PUBLIC: &str = include_str!("../../tests/fixtures/merchant_public.pem");

    fn config(protocol: &str, sign_type: &str) -> AcquirerConfig {
        let mut config = AcquirerConfig::from_toml_str(&format!(
            r#"
            protocol = "{protocol}"
            sign_type = "{sign_type}"
            app_id = "2016000000000000"
            partner = "2088000000000000"
            seller_id = "seller@example.com"
            base_url = "https://shop.example.com"
            company_name = "Example Ltd"
            "#
        ))
        .unwrap();
        config.private_key = Some(KeySource::Inline(MERCHANT_PRIVATE.to_string()));
        config
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2017, 3, 1)
            .unwrap()
            .and_hms_opt(8, 5, 9)
            .unwrap()
    }

    fn order() -> BusinessFields {
        BusinessFields::for_order("SO1001", Amount::new(dec!(88.8)).unwrap(), Some("Example Ltd"))
    }

    #[test]
    fn test_legacy_signs_whitelist_only() {
        let config = config("legacy", "RSA");
        let params = RequestBuilder::new(&config).build_at(order(), now()).unwrap();

        assert_eq!(params.get_str("sign_type"), Some("RSA"));
        assert_eq!(params.get_str("total_fee"), Some("88.80"));
        assert_eq!(params.get_str("subject"), Some("Example Ltd: SO1001"));
        assert_eq!(params.get_str("seller_email"), Some("seller@example.com"));
        assert!(!params.contains_key("timestamp"));

        let signed = canonical_string(
            &params.subset(&LEGACY_SIGNED_KEYS),
            &CanonicalOptions::dropping_empty(),
        );
        assert!(!signed.contains("seller_email"));
        assert!(!signed.contains("body="));
        assert!(signed.starts_with("_input_charset=utf-8&notify_url="));

        let signature = params.get_str("sign").unwrap();
        assert!(verify(
            signed.as_bytes(),
            signature,
            MERCHANT_PUBLIC,
            SignatureScheme::RsaSha1
        ));
    }

    #[test]
    fn test_modern_wraps_biz_content_and_signs_everything() {
        let config = config("modern", "RSA2");
        let fields = order().with_extra("promo", json!({"code": "A1", "pct": 10}));
        let params = RequestBuilder::new(&config).build_at(fields, now()).unwrap();

        assert_eq!(params.get_str("timestamp"), Some("2017-03-01 08:05:09"));
        assert_eq!(params.get_str("app_id"), Some("2016000000000000"));
        assert!(!params.contains_key("out_trade_no"));

        let biz = params.get(BIZ_CONTENT).unwrap().to_string();
        assert_eq!(
            biz,
            r#"{"out_trade_no":"SO1001","product_code":"FAST_INSTANT_TRADE_PAY","promo":{"code":"A1","pct":10},"subject":"Example Ltd: SO1001","total_amount":"88.80"}"#
        );

        let content = canonical_string(&params, &CanonicalOptions::keeping_empty());
        assert!(content.starts_with("app_id=2016000000000000&biz_content={"));
        assert!(verify(
            content.as_bytes(),
            params.get_str("sign").unwrap(),
            MERCHANT_PUBLIC,
            SignatureScheme::RsaSha256
        ));
    }

    #[test]
    fn test_business_fields_win_on_collision() {
        let business: ParameterSet = [
            ("notify_url", "https://other.example.com/notify"),
            ("out_trade_no", "SO1"),
        ]
        .into_iter()
        .collect();
        let defaults: ParameterSet = [
            ("notify_url", "https://shop.example.com/notify"),
            ("app_id", "1"),
        ]
        .into_iter()
        .collect();

        let params = build_signed_request(
            business,
            defaults,
            Some(MERCHANT_PRIVATE),
            SignatureScheme::RsaSha256,
            Protocol::Modern,
        )
        .unwrap();

        assert_eq!(
            params.get_str("notify_url"),
            Some("https://other.example.com/notify")
        );
        assert_eq!(params.get(BIZ_CONTENT).unwrap().to_string(), r#"{"out_trade_no":"SO1"}"#);
    }

    #[test]
    fn test_incoming_sign_keys_are_replaced() {
        let business: ParameterSet = [("out_trade_no", "SO1"), ("sign", "forged"), ("sign_type", "RSA")]
            .into_iter()
            .collect();
        let params = build_signed_request(
            business,
            [("partner", "2088")].into_iter().collect(),
            Some(MERCHANT_PRIVATE),
            SignatureScheme::RsaSha256,
            Protocol::Legacy,
        )
        .unwrap();

        assert_ne!(params.get_str("sign"), Some("forged"));
        assert_eq!(params.get_str("sign_type"), Some("RSA2"));
    }

    #[test]
    fn test_missing_private_key_is_configuration_error() {
        let mut config = config("legacy", "RSA");
        config.private_key = None;

        let result = RequestBuilder::new(&config).build_at(order(), now());
        assert!(matches!(result, Err(GatewayError::ConfigurationError(_))));
    }

    #[test]
    fn test_invalid_private_key_is_configuration_error() {
        let result = build_signed_request(
            [("out_trade_no", "SO1")].into_iter().collect(),
            ParameterSet::new(),
            Some(MERCHANT_PUBLIC),
            SignatureScheme::RsaSha256,
            Protocol::Modern,
        );
        assert!(matches!(result, Err(GatewayError::ConfigurationError(_))));

        let result = build_signed_request(
            ParameterSet::new(),
            ParameterSet::new(),
            None,
            SignatureScheme::RsaSha256,
            Protocol::Modern,
        );
        assert!(matches!(result, Err(GatewayError::ConfigurationError(_))));
    }
}
