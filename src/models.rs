//! Request bodies sent by the client.
//!
//! Responses are passed through as `serde_json::Value`; only what we send is
//! typed here.

use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct LoginBody<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// A wire transfer as entered by the user. Amount is in cents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferDraft {
    pub recipient: String,
    pub iban: String,
    pub amount: u64,
    pub note: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmTransferBody<'a> {
    pub authorization_token: &'a str,
    #[serde(flatten)]
    pub transfer: &'a TransferDraft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Reoccurrence {
    Monthly,
    Quarterly,
    EverySixMonths,
    Annually,
}

impl Reoccurrence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reoccurrence::Monthly => "MONTHLY",
            Reoccurrence::Quarterly => "QUARTERLY",
            Reoccurrence::EverySixMonths => "EVERY_SIX_MONTHS",
            Reoccurrence::Annually => "ANNUALLY",
        }
    }
}

impl fmt::Display for Reoccurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Reoccurrence {
    type Err = anyhow::Error;

    // accepts MONTHLY, monthly, every-six-months, ...
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "MONTHLY" => Ok(Reoccurrence::Monthly),
            "QUARTERLY" => Ok(Reoccurrence::Quarterly),
            "EVERY_SIX_MONTHS" => Ok(Reoccurrence::EverySixMonths),
            "ANNUALLY" => Ok(Reoccurrence::Annually),
            _ => Err(anyhow!(
                "Invalid reoccurrence '{}'. Expected MONTHLY, QUARTERLY, EVERY_SIX_MONTHS or ANNUALLY",
                s
            )),
        }
    }
}

/// A standing order as entered by the user. Amount is in cents,
/// `first_execution_date` e.g. `2018-08-29T00:00:00+00:00`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandingOrderDraft {
    pub recipient: String,
    pub iban: String,
    pub amount: u64,
    pub note: String,
    pub reoccurrence: Reoccurrence,
    pub first_execution_date: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StandingOrderBody<'a> {
    pub amount: u64,
    pub e2e_id: Option<&'a str>,
    pub first_execution_date: &'a str,
    pub iban: &'a str,
    pub note: &'a str,
    pub recipient: &'a str,
    pub reoccurrence: Reoccurrence,
    pub standing_order_toggle: bool,
}

impl<'a> From<&'a StandingOrderDraft> for StandingOrderBody<'a> {
    fn from(draft: &'a StandingOrderDraft) -> Self {
        Self {
            amount: draft.amount,
            e2e_id: None,
            first_execution_date: &draft.first_execution_date,
            iban: &draft.iban,
            note: &draft.note,
            recipient: &draft.recipient,
            reoccurrence: draft.reoccurrence,
            standing_order_toggle: true,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmStandingOrderBody<'a> {
    pub authorization_token: &'a str,
    pub request_id: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn draft() -> TransferDraft {
        TransferDraft {
            recipient: "Jane Doe".into(),
            iban: "DE89370400440532013000".into(),
            amount: 1250,
            note: "rent".into(),
        }
    }

    #[test]
    fn confirm_transfer_body_is_flat() {
        let transfer = draft();
        let body = serde_json::to_value(ConfirmTransferBody {
            authorization_token: "123456",
            transfer: &transfer,
        })
        .unwrap();
        assert_eq!(
            body,
            json!({
                "authorizationToken": "123456",
                "recipient": "Jane Doe",
                "iban": "DE89370400440532013000",
                "amount": 1250,
                "note": "rent"
            })
        );
    }

    #[test]
    fn standing_order_body_shape() {
        let order = StandingOrderDraft {
            recipient: "Landlord".into(),
            iban: "DE89370400440532013000".into(),
            amount: 90000,
            note: "rent".into(),
            reoccurrence: Reoccurrence::EverySixMonths,
            first_execution_date: "2018-08-29T00:00:00+00:00".into(),
        };
        let body = serde_json::to_value(StandingOrderBody::from(&order)).unwrap();
        assert_eq!(
            body,
            json!({
                "amount": 90000,
                "e2eId": null,
                "firstExecutionDate": "2018-08-29T00:00:00+00:00",
                "iban": "DE89370400440532013000",
                "note": "rent",
                "recipient": "Landlord",
                "reoccurrence": "EVERY_SIX_MONTHS",
                "standingOrderToggle": true
            })
        );
    }

    #[test]
    fn parse_reoccurrence() {
        assert_eq!("MONTHLY".parse::<Reoccurrence>().unwrap(), Reoccurrence::Monthly);
        assert_eq!("quarterly".parse::<Reoccurrence>().unwrap(), Reoccurrence::Quarterly);
        assert_eq!(
            "every-six-months".parse::<Reoccurrence>().unwrap(),
            Reoccurrence::EverySixMonths
        );
        assert_eq!(
            "EVERY_SIX_MONTHS".parse::<Reoccurrence>().unwrap(),
            Reoccurrence::EverySixMonths
        );
        assert!("weekly".parse::<Reoccurrence>().is_err());
    }

    #[test]
    fn reoccurrence_display_matches_wire() {
        for r in [
            Reoccurrence::Monthly,
            Reoccurrence::Quarterly,
            Reoccurrence::EverySixMonths,
            Reoccurrence::Annually,
        ] {
            assert_eq!(serde_json::to_value(r).unwrap(), json!(r.to_string()));
        }
    }
}
