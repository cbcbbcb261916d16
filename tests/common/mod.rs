#![allow(dead_code)]

use alipay_gateway::domain::canonical::canonicalize;
use alipay_gateway::domain::params::{ParameterSet, SIGN, SIGN_TYPE};
use alipay_gateway::domain::protocol::{Protocol, SignatureScheme};
use alipay_gateway::domain::signature::sign;
use alipay_gateway::interfaces::form::encode_query;
use std::fs;
use std::path::{Path, PathBuf};

pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn read_fixture(name: &str) -> String {
    fs::read_to_string(fixture(name)).unwrap()
}

/// Writes a config for `protocol` with the fixture keys and any `extra` TOML.
pub fn write_config(dir: &Path, protocol: &str, sign_type: &str, extra: &str) -> PathBuf {
    let contents = format!(
        r#"
protocol = "{protocol}"
sign_type = "{sign_type}"
app_id = "2016000000000000"
partner = "2088000000000000"
seller_id = "seller@example.com"
base_url = "https://shop.example.com"
company_name = "Shop"
country = "CN"
private_key = {{ path = "{private}" }}
public_key = {{ path = "{public}" }}
{extra}
"#,
        private = fixture("merchant_private.pem").display(),
        public = fixture("acquirer_public.pem").display(),
    );
    let path = dir.join("gateway.toml");
    fs::write(&path, contents).unwrap();
    path
}

pub fn write_transactions(dir: &Path, rows: &[(u64, &str, &str)]) -> PathBuf {
    let path = dir.join("transactions.csv");
    let mut wtr = csv::Writer::from_path(&path).unwrap();
    wtr.write_record(["id", "reference", "amount"]).unwrap();
    for (id, reference, amount) in rows {
        wtr.write_record([id.to_string().as_str(), *reference, *amount]).unwrap();
    }
    wtr.flush().unwrap();
    path
}

/// Parameters signed the way the acquirer signs a notification.
pub fn acquirer_signed(protocol: Protocol, scheme: SignatureScheme, pairs: &[(&str, &str)]) -> ParameterSet {
    let mut params: ParameterSet = pairs.iter().copied().collect();
    let content = canonicalize(&params, &protocol.canonical_options());
    let signature = sign(&content, &read_fixture("acquirer_private.pem"), scheme).unwrap();
    params.insert(SIGN, signature);
    params.insert(SIGN_TYPE, scheme.label());
    params
}

pub fn write_notifications(dir: &Path, notifications: &[ParameterSet]) -> PathBuf {
    let path = dir.join("notifications.txt");
    let body: Vec<String> = notifications.iter().map(encode_query).collect();
    fs::write(&path, body.join("\n")).unwrap();
    path
}
