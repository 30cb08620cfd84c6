use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde_json::{Map, Value};

use crate::config::TwilioConfig;
use crate::error::{Error, Result};

/// Outcome of a submitted message. Rejections are reported here, not as errors.
#[derive(Debug, Clone, PartialEq)]
pub enum SendResult {
    Accepted {
        sid: Option<String>,
        fields: Map<String, Value>,
    },
    Rejected {
        status: StatusCode,
        message: Option<String>,
    },
}

impl SendResult {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SendResult::Accepted { .. })
    }
}

pub struct TwilioClient {
    http: Client,
    config: TwilioConfig,
}

impl TwilioClient {
    pub fn new(config: TwilioConfig) -> Result<Self> {
        Ok(Self {
            http: Client::builder().build()?,
            config,
        })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/Accounts/{}/Messages.json",
            self.config.base_url, self.config.account_sid
        )
    }

    /// Only a transport failure is an `Err`.
    pub fn send(&self, phone_number: &str, body: &str) -> Result<SendResult> {
        let form = [
            ("To", phone_number),
            ("From", self.config.phone_number.as_str()),
            ("Body", body),
        ];

        let resp = self
            .http
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&form)
            .send()
            .map_err(|e| Error::Sms(format!("unable to reach twilio: {e}")))?;

        let status = resp.status();
        let data = resp
            .text()
            .ok()
            .and_then(|s| serde_json::from_str::<Map<String, Value>>(&s).ok());

        if status.is_success() {
            let fields = data.unwrap_or_default();
            let sid = fields.get("sid").and_then(Value::as_str).map(str::to_string);
            match &sid {
                Some(sid) => log::info!("Twilio message SID: {sid}"),
                None => log::warn!("Twilio accepted the message but returned no SID"),
            }
            Ok(SendResult::Accepted { sid, fields })
        } else {
            let message = data
                .as_ref()
                .and_then(|d| d.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string);
            match &message {
                Some(m) => log::warn!("Twilio returned status: {status} ({m})"),
                None => log::warn!("Twilio returned status: {status}"),
            }
            Ok(SendResult::Rejected { status, message })
        }
    }
}
