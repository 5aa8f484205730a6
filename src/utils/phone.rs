use sha2::{Digest, Sha256};
use uuid::Uuid;

pub fn digits_only(phone: &str) -> String {
    phone.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Merchant-salted one-way phone digest: SHA-256("{merchant_id}:{digits}").
/// Stable per (merchant, phone) pair so the same person always resolves to
/// the same customer row, without the raw number ever being stored.
pub fn hash_phone(merchant_id: Uuid, phone: &str) -> String {
    let digits = digits_only(phone);
    let mut hasher = Sha256::new();
    hasher.update(format!("{}:{}", merchant_id, digits).as_bytes());
    hex::encode(hasher.finalize())
}

pub fn last_4(phone: &str) -> String {
    let digits = digits_only(phone);
    digits[digits.len().saturating_sub(4)..].to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_only_strips_formatting() {
        assert_eq!(digits_only("+1 (555) 010-1234"), "15550101234");
        assert_eq!(digits_only("555.010.1234"), "5550101234");
        assert_eq!(digits_only("no digits here"), "");
    }

    #[test]
    fn hash_is_stable_across_formatting() {
        let merchant = Uuid::new_v4();
        let a = hash_phone(merchant, "+1 (555) 010-1234");
        let b = hash_phone(merchant, "15550101234");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn hash_differs_per_merchant() {
        let a = hash_phone(Uuid::new_v4(), "5550101234");
        let b = hash_phone(Uuid::new_v4(), "5550101234");
        assert_ne!(a, b);
    }

    #[test]
    fn last_4_handles_short_numbers() {
        assert_eq!(last_4("(555) 010-1234"), "1234");
        assert_eq!(last_4("12"), "12");
        assert_eq!(last_4(""), "");
    }
}
