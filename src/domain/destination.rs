use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKey {
    Apns,
    Firebase,
    Sms,
    Email,
}

impl ServiceKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKey::Apns => "apns",
            ServiceKey::Firebase => "firebase",
            ServiceKey::Sms => "sms",
            ServiceKey::Email => "email",
        }
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a note should be delivered. The `service` tag selects the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "service", rename_all = "lowercase")]
pub enum NotificationDestination {
    Apns {
        token: String,
    },
    Firebase {
        token: String,
    },
    #[serde(rename_all = "camelCase")]
    Sms {
        phone_number: String,
    },
    Email {
        email: String,
    },
}

impl NotificationDestination {
    pub fn service(&self) -> ServiceKey {
        match self {
            NotificationDestination::Apns { .. } => ServiceKey::Apns,
            NotificationDestination::Firebase { .. } => ServiceKey::Firebase,
            NotificationDestination::Sms { .. } => ServiceKey::Sms,
            NotificationDestination::Email { .. } => ServiceKey::Email,
        }
    }

    /// Recipient rendered for logs.
    pub fn redacted(&self) -> String {
        match self {
            NotificationDestination::Apns { token } | NotificationDestination::Firebase { token } => {
                mask_token(token)
            }
            NotificationDestination::Sms { phone_number } => mask_phone_number(phone_number),
            NotificationDestination::Email { email } => mask_email(email),
        }
    }
}

const E164_MIN_DIGITS: usize = 7;
const E164_MAX_DIGITS: usize = 15;

/// E.164: a leading `+`, a non-zero country code digit, 7 to 15 digits.
pub fn is_e164(phone: &str) -> bool {
    let Some(digits) = phone.strip_prefix('+') else {
        return false;
    };
    if !(E164_MIN_DIGITS..=E164_MAX_DIGITS).contains(&digits.len()) {
        return false;
    }
    digits.starts_with(|c: char| ('1'..='9').contains(&c))
        && digits.chars().all(|c| c.is_ascii_digit())
}

pub fn is_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') || email.chars().any(char::is_whitespace) {
        return false;
    }
    domain.contains('.') && domain.split('.').all(|label| !label.is_empty())
}

pub fn mask_phone_number(phone: &str) -> String {
    let chars: Vec<char> = phone.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let visible: String = chars[chars.len() - 4..].iter().collect();
    if phone.starts_with('+') {
        format!("+{}{}", "*".repeat(chars.len() - 5), visible)
    } else {
        format!("{}{}", "*".repeat(chars.len() - 4), visible)
    }
}

pub fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let first: String = local.chars().take(1).collect();
            format!("{}***@{}", first, domain)
        }
        None => "***".to_string(),
    }
}

pub fn mask_identifier(identifier: &str) -> String {
    if identifier.contains('@') {
        mask_email(identifier)
    } else {
        mask_phone_number(identifier)
    }
}

fn mask_token(token: &str) -> String {
    let prefix: String = token.chars().take(6).collect();
    format!("{}...", prefix)
}
